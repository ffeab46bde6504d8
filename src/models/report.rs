use super::LineItem;
use serde::Serialize;

/// 报表版式 (按内容识别，不靠参数指定)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReportLayout {
    /// 固定丢弃前 5 行和后 2 行
    HeaderSkip,
    /// 从表头标记行之后开始读取
    MarkerLine,
    /// 只读取以记录类型前缀开头的行
    LinePrefix,
}

/// 被跳过的行及原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    /// 源文本行号 (从 1 开始)
    pub line: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    TooFewColumns { found: usize },
    EmptyPosition,
    PatternMismatch,
    NoRecordPrefix,
}

/// 解析结果
#[derive(Debug, Clone, Serialize)]
pub struct ParsedReport {
    pub layout: ReportLayout,
    pub records: Vec<LineItem>,
    pub skipped: Vec<SkippedLine>,
    /// 出现多次的归一化位置号
    pub duplicates: Vec<String>,
}

impl ParsedReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}
