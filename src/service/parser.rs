use crate::config::ParserConfig;
use crate::error::ParseError;
use crate::models::{
    parse_quantity, parse_weight, LineItem, ParsedReport, PositionNormalizer, ReportLayout,
    SkipReason, SkippedLine,
};
use indexmap::IndexMap;
use regex::Regex;

/// 列位置: 位置号 / 数量 / 型材 / 重量
const COL_POSITION: usize = 0;
const COL_QUANTITY: usize = 1;
const COL_PROFILE: usize = 3;
const COL_WEIGHT: usize = 5;

/// 页眉版式至少需要的列数 (重量列可缺失)
const MIN_HEADER_SKIP_COLUMNS: usize = 4;
/// 标记行 / 前缀版式必须满足的列数，不足即整体失败
const MIN_STRICT_COLUMNS: usize = 6;

/// XSR 报表解析器
pub struct ReportParser {
    config: ParserConfig,
    normalizer: PositionNormalizer,
    /// 标记行之后的数据行: 位置号 整数 x 型材 小数 小数
    row_pattern: Regex,
    prefix_pattern: Option<Regex>,
}

impl ReportParser {
    pub fn new(config: ParserConfig) -> Result<Self, ParseError> {
        let row_pattern = Regex::new(r"^\S+\s+\d+\s+\S+\s+\S+\s+\d+(\.\d+)?\s+\d+(\.\d+)?$")?;
        let prefix_pattern = if config.record_prefixes.is_empty() {
            None
        } else {
            let alternatives: Vec<String> = config
                .record_prefixes
                .iter()
                .map(|p| regex::escape(p))
                .collect();
            Some(Regex::new(&format!("^(?:{})", alternatives.join("|")))?)
        };

        Ok(Self {
            normalizer: config.normalizer(),
            config,
            row_pattern,
            prefix_pattern,
        })
    }

    pub fn normalizer(&self) -> &PositionNormalizer {
        &self.normalizer
    }

    /// 识别版式：有表头标记 -> 标记行版式；有记录前缀 -> 前缀版式；否则页眉版式
    pub fn detect_layout(&self, lines: &[&str]) -> ReportLayout {
        if lines.iter().any(|l| l.contains(&self.config.header_marker)) {
            return ReportLayout::MarkerLine;
        }
        if lines.iter().any(|l| self.has_record_prefix(l.trim())) {
            return ReportLayout::LinePrefix;
        }
        ReportLayout::HeaderSkip
    }

    /// 解析整份报表
    ///
    /// 唯一的失败情形是标记行 / 前缀版式里列数不足的行 (`MalformedLine`)，
    /// 其余不合格的行都记录到 `skipped` 后跳过。
    pub fn parse(&self, raw: &str, project_name: &str) -> Result<ParsedReport, ParseError> {
        if raw.trim().is_empty() {
            return Err(ParseError::EmptyInput);
        }

        let lines: Vec<&str> = raw
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .collect();
        let layout = self.detect_layout(&lines);

        let mut records = Vec::new();
        let mut skipped = Vec::new();
        match layout {
            ReportLayout::HeaderSkip => {
                self.parse_header_skip(&lines, project_name, &mut records, &mut skipped)
            }
            ReportLayout::MarkerLine => {
                self.parse_marker_line(&lines, project_name, &mut records, &mut skipped)?
            }
            ReportLayout::LinePrefix => {
                self.parse_line_prefix(&lines, project_name, &mut records, &mut skipped)?
            }
        }

        let duplicates = self.find_duplicates(&records);
        for posno in &duplicates {
            tracing::warn!("Position {} appears more than once in report for {}", posno, project_name);
        }

        tracing::info!(
            "Parsed report for {}: layout {:?}, {} records, {} lines skipped",
            project_name,
            layout,
            records.len(),
            skipped.len()
        );

        Ok(ParsedReport {
            layout,
            records,
            skipped,
            duplicates,
        })
    }

    fn parse_header_skip(
        &self,
        lines: &[&str],
        project_name: &str,
        records: &mut Vec<LineItem>,
        skipped: &mut Vec<SkippedLine>,
    ) {
        let start = self.config.header_lines;
        let end = lines.len().saturating_sub(self.config.footer_lines);
        if start >= end {
            return;
        }

        for (idx, line) in lines.iter().enumerate().take(end).skip(start) {
            let line_no = idx + 1;
            let columns: Vec<&str> = line.split_whitespace().collect();
            if columns.is_empty() {
                skip(skipped, line_no, SkipReason::EmptyPosition);
                continue;
            }
            if columns.len() < MIN_HEADER_SKIP_COLUMNS {
                skip(skipped, line_no, SkipReason::TooFewColumns { found: columns.len() });
                continue;
            }
            records.push(build_record(&columns, project_name));
        }
    }

    fn parse_marker_line(
        &self,
        lines: &[&str],
        project_name: &str,
        records: &mut Vec<LineItem>,
        skipped: &mut Vec<SkippedLine>,
    ) -> Result<(), ParseError> {
        let Some(marker_idx) = lines
            .iter()
            .position(|l| l.contains(&self.config.header_marker))
        else {
            return Ok(());
        };

        for (idx, line) in lines.iter().enumerate().skip(marker_idx + 1) {
            let line_no = idx + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let columns = strict_columns(line, line_no)?;
            if !self.row_pattern.is_match(line) {
                skip(skipped, line_no, SkipReason::PatternMismatch);
                continue;
            }
            records.push(build_record(&columns, project_name));
        }
        Ok(())
    }

    fn parse_line_prefix(
        &self,
        lines: &[&str],
        project_name: &str,
        records: &mut Vec<LineItem>,
        skipped: &mut Vec<SkippedLine>,
    ) -> Result<(), ParseError> {
        for (idx, line) in lines.iter().enumerate() {
            let line_no = idx + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if !self.has_record_prefix(line) {
                skip(skipped, line_no, SkipReason::NoRecordPrefix);
                continue;
            }
            let columns = strict_columns(line, line_no)?;
            records.push(build_record(&columns, project_name));
        }
        Ok(())
    }

    fn has_record_prefix(&self, line: &str) -> bool {
        self.prefix_pattern
            .as_ref()
            .is_some_and(|p| p.is_match(line))
    }

    fn find_duplicates(&self, records: &[LineItem]) -> Vec<String> {
        let mut counts: IndexMap<String, usize> = IndexMap::new();
        for r in records {
            *counts.entry(self.normalizer.normalize(&r.position_number)).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(k, _)| k)
            .collect()
    }
}

fn skip(skipped: &mut Vec<SkippedLine>, line: usize, reason: SkipReason) {
    tracing::debug!("Skipping line {}: {:?}", line, reason);
    skipped.push(SkippedLine { line, reason });
}

fn strict_columns(line: &str, line_no: usize) -> Result<Vec<&str>, ParseError> {
    let columns: Vec<&str> = line.split_whitespace().collect();
    if columns.len() < MIN_STRICT_COLUMNS {
        return Err(ParseError::MalformedLine {
            line: line_no,
            content: line.to_string(),
        });
    }
    Ok(columns)
}

/// 数字读不出来按 0 处理
fn build_record(columns: &[&str], project_name: &str) -> LineItem {
    let column = |i: usize| columns.get(i).copied().unwrap_or_default();
    LineItem::new(
        column(COL_POSITION),
        parse_quantity(column(COL_QUANTITY)).unwrap_or(0),
        column(COL_PROFILE),
        parse_weight(column(COL_WEIGHT)).unwrap_or(0.0),
        project_name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn parser() -> ReportParser {
        ReportParser::new(ParserConfig::default()).unwrap()
    }

    fn header_skip_report(body: &[&str]) -> String {
        let mut lines = vec![
            "XSR export",
            "Project: Hall 7",
            "Date: 2026-10-01",
            "",
            "Pos Qty Name Profile Len Weight",
        ];
        lines.extend_from_slice(body);
        lines.push("----");
        lines.push("Total weight 9999");
        lines.join("\n")
    }

    #[rstest]
    fn header_skip_reads_columns_0_1_3_5(parser: ReportParser) {
        let report = header_skip_report(&["1234/ 10 X PR-50 Y 2.5"]);
        let parsed = parser.parse(&report, "Hall 7").unwrap();
        assert_eq!(parsed.layout, ReportLayout::HeaderSkip);
        assert_eq!(parsed.records.len(), 1);
        let record = &parsed.records[0];
        assert_eq!(record.position_number, "1234/");
        assert_eq!(record.quantity_ordered, 10);
        assert_eq!(record.profile_name, "PR-50");
        assert_eq!(record.weight, 2.5);
        assert_eq!(record.project_name, "Hall 7");
        assert_eq!(record.quantity_completed, 0);
        assert!(record.document_url.is_none());
    }

    #[rstest]
    fn header_skip_discards_boilerplate_regardless_of_content(parser: ReportParser) {
        let lines = [
            "1 1 x H1 y 1.0",
            "2 1 x H2 y 1.0",
            "3 1 x H3 y 1.0",
            "4 1 x H4 y 1.0",
            "5 1 x H5 y 1.0",
            "6 1 x B6 y 1.0",
            "7 1 x B7 y 1.0",
            "8 1 x F8 y 1.0",
            "9 1 x F9 y 1.0",
        ];
        let parsed = parser.parse(&lines.join("\n"), "P").unwrap();
        let positions: Vec<&str> = parsed.records.iter().map(|r| r.position_number.as_str()).collect();
        assert_eq!(positions, vec!["6", "7"]);
    }

    #[rstest]
    fn header_skip_silently_drops_short_lines(parser: ReportParser) {
        let report = header_skip_report(&["1 2 3", "", "77 4 x HEA200", "88 abc x IPE100 y n/a"]);
        let parsed = parser.parse(&report, "P").unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].position_number, "77");
        assert_eq!(parsed.records[0].weight, 0.0);
        assert_eq!(parsed.records[1].quantity_ordered, 0);
        assert_eq!(parsed.records[1].weight, 0.0);
        assert_eq!(parsed.skipped_count(), 2);
        assert_eq!(
            parsed.skipped[0],
            SkippedLine {
                line: 6,
                reason: SkipReason::TooFewColumns { found: 3 }
            }
        );
    }

    #[rstest]
    fn header_skip_with_too_few_lines_is_empty(parser: ReportParser) {
        let parsed = parser.parse("a\nb\nc\nd\ne\nf", "P").unwrap();
        assert!(parsed.records.is_empty());
    }

    #[rstest]
    fn marker_line_reads_matching_rows(parser: ReportParser) {
        let report = "Some header\nAsmbly Pos.  Qty  Name  Profile  Length  Weight\n\
                      1234/  10  BEAM  PR-50  1200.0  2.5\n\
                      note: this row has many words in it\n\
                      \n\
                      1300  2  COL  HEA200  3000  41.25\n";
        let parsed = parser.parse(report, "Hall 7").unwrap();
        assert_eq!(parsed.layout, ReportLayout::MarkerLine);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[1].position_number, "1300");
        assert_eq!(parsed.records[1].weight, 41.25);
        assert_eq!(
            parsed.skipped,
            vec![SkippedLine {
                line: 4,
                reason: SkipReason::PatternMismatch
            }]
        );
    }

    #[rstest]
    fn marker_line_short_row_is_a_hard_error(parser: ReportParser) {
        let report = "Asmbly Pos. Qty Name Profile Length Weight\n1234 10 BEAM PR-50 1200\n";
        match parser.parse(report, "P") {
            Err(ParseError::MalformedLine { line, content }) => {
                assert_eq!(line, 2);
                assert_eq!(content, "1234 10 BEAM PR-50 1200");
            }
            other => panic!("expected MalformedLine, got {other:?}"),
        }
    }

    #[rstest]
    fn line_prefix_reads_prefixed_rows(parser: ReportParser) {
        let report = "Report\nA/1 3 x HEA200 y 12.5\r\nsummary line\nB/7 1 x IPE100 y 3\n";
        let parsed = parser.parse(report, "P").unwrap();
        assert_eq!(parsed.layout, ReportLayout::LinePrefix);
        let positions: Vec<&str> = parsed.records.iter().map(|r| r.position_number.as_str()).collect();
        assert_eq!(positions, vec!["A/1", "B/7"]);
        assert_eq!(parsed.records[0].weight, 12.5);
    }

    #[rstest]
    fn line_prefix_short_row_is_a_hard_error(parser: ReportParser) {
        let report = "A/1 3 x HEA200 y 12.5\nC/2 1 x\n";
        assert!(matches!(
            parser.parse(report, "P"),
            Err(ParseError::MalformedLine { line: 2, .. })
        ));
    }

    #[rstest]
    #[case("")]
    #[case("   \n\n  ")]
    fn empty_input_is_refused(parser: ReportParser, #[case] raw: &str) {
        assert!(matches!(parser.parse(raw, "P"), Err(ParseError::EmptyInput)));
    }

    #[rstest]
    fn reports_duplicate_positions(parser: ReportParser) {
        let report = "A/1 3 x HEA200 y 12.5\nA/1/ 1 x IPE100 y 3\nA/2 1 x IPE100 y 3\n";
        let parsed = parser.parse(report, "P").unwrap();
        assert_eq!(parsed.duplicates, vec!["A1".to_string()]);
        assert_eq!(parsed.records.len(), 3);
    }

    #[test]
    fn custom_prefixes_are_escaped() {
        let config = ParserConfig {
            record_prefixes: vec!["P.".to_string()],
            ..ParserConfig::default()
        };
        let parser = ReportParser::new(config).unwrap();
        let parsed = parser.parse("P.1 2 x HEA y 1\nPX1 2 x HEA y 1\n", "P").unwrap();
        assert_eq!(parsed.layout, ReportLayout::LinePrefix);
        assert_eq!(parsed.records.len(), 1);
    }
}
