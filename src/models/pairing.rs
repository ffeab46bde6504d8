use super::LineItem;
use serde::Serialize;

/// 同一明细命中多个文档 (按先到先得取了第一个)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairingConflict {
    pub position_number: String,
    /// 按迭代顺序排列，第一个即被选中的文档
    pub candidates: Vec<String>,
}

/// 配对结果
#[derive(Debug, Clone, Serialize)]
pub struct PairingOutcome {
    pub records: Vec<LineItem>,
    pub conflicts: Vec<PairingConflict>,
    /// 未被任何明细使用的文档名
    pub unused: Vec<String>,
}

impl PairingOutcome {
    pub fn matched_count(&self) -> usize {
        self.records.iter().filter(|r| r.document_url.is_some()).count()
    }
}
