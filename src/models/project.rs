use super::{LineItem, PositionNormalizer, ProgressTotals};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 项目ID (存储层 push 生成的 key)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// 项目：独占其明细序列
///
/// 明细顺序即解析顺序，同时也是后续局部更新的下标，创建后只允许原地修改或追加。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "projectName")]
    pub name: String,
    #[serde(default)]
    pub records: Vec<LineItem>,
}

impl Project {
    pub fn new(name: impl Into<String>, records: Vec<LineItem>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }

    /// 从当前明细全量重算汇总
    pub fn totals(&self) -> ProgressTotals {
        ProgressTotals::from_records(&self.records)
    }

    /// 按归一化位置号查找第一条明细的下标
    pub fn find_position(&self, position: &str, normalizer: &PositionNormalizer) -> Option<usize> {
        let key = normalizer.normalize(position);
        self.records
            .iter()
            .position(|r| normalizer.normalize(&r.position_number) == key)
    }
}

/// 项目概要 (列表展示用)
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
    pub record_count: usize,
    pub totals: ProgressTotals,
    pub percent: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_position_by_normalized_key() {
        let project = Project::new(
            "Hall 7",
            vec![
                LineItem::new("1000/", 1, "A", 0.0, "Hall 7"),
                LineItem::new("1234/", 1, "B", 0.0, "Hall 7"),
            ],
        );
        let normalizer = PositionNormalizer::default();
        assert_eq!(project.find_position("1234", &normalizer), Some(1));
        assert_eq!(project.find_position("1234/", &normalizer), Some(1));
        assert_eq!(project.find_position("9999", &normalizer), None);
    }

    #[test]
    fn missing_records_deserialize_as_empty() {
        let project: Project = serde_json::from_value(json!({ "projectName": "Empty" })).unwrap();
        assert!(project.records.is_empty());
        assert_eq!(project.totals().progress_ratio(), 0.0);
    }
}
