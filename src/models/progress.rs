use super::LineItem;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 项目进度汇总
///
/// 总是当前明细的纯函数，缓存后任何明细变更都必须重算。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressTotals {
    pub total_ordered: u64,
    pub total_completed: u64,
    pub total_shipped: u64,
}

impl ProgressTotals {
    pub fn from_records(records: &[LineItem]) -> Self {
        records.iter().fold(Self::default(), |mut acc, r| {
            acc.total_ordered += u64::from(r.quantity_ordered);
            acc.total_completed += u64::from(r.quantity_completed);
            acc.total_shipped += u64::from(r.quantity_shipped);
            acc
        })
    }

    /// 完成率 = 已完成 / 订购，订购为 0 时为 0 (不产生 NaN / Infinity)
    pub fn progress_ratio(&self) -> f64 {
        if self.total_ordered == 0 {
            return 0.0;
        }
        self.total_completed as f64 / self.total_ordered as f64
    }

    /// 百分比 (四舍五入)
    pub fn percent(&self) -> u32 {
        (self.progress_ratio() * 100.0).round() as u32
    }
}

/// 可由操作员修改的数量字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuantityField {
    #[serde(rename = "QuantityDone")]
    Completed,
    #[serde(rename = "QuantitySent")]
    Shipped,
}

impl QuantityField {
    /// 存储里的字段名
    pub fn key(self) -> &'static str {
        match self {
            QuantityField::Completed => "QuantityDone",
            QuantityField::Shipped => "QuantitySent",
        }
    }
}

/// 单条明细的局部更新 (写回存储用)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordPatch {
    /// 如 `projects/{id}/records/{index}`
    pub path: String,
    pub fields: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(ordered: u32, completed: u32, shipped: u32) -> LineItem {
        let mut item = LineItem::new("1", ordered, "P", 1.0, "X");
        item.quantity_completed = completed;
        item.quantity_shipped = shipped;
        item
    }

    #[test]
    fn sums_every_record() {
        let totals = ProgressTotals::from_records(&[item(20, 10, 5), item(10, 5, 0), item(0, 0, 0)]);
        assert_eq!(totals.total_ordered, 30);
        assert_eq!(totals.total_completed, 15);
        assert_eq!(totals.total_shipped, 5);
        assert_eq!(totals.progress_ratio(), 0.5);
        assert_eq!(totals.percent(), 50);
    }

    #[test]
    fn zero_ordered_never_divides() {
        let totals = ProgressTotals {
            total_ordered: 0,
            total_completed: 7,
            total_shipped: 0,
        };
        assert_eq!(totals.progress_ratio(), 0.0);
        assert_eq!(ProgressTotals::default().percent(), 0);
    }

    #[test]
    fn field_keys_match_persisted_names() {
        assert_eq!(QuantityField::Completed.key(), "QuantityDone");
        assert_eq!(
            serde_json::to_value(QuantityField::Shipped).unwrap(),
            serde_json::json!("QuantitySent")
        );
    }
}
