use super::numeric::lenient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 报表明细行 (持久化字段名沿用导出格式: POSNO / Quantity / Profile ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// 位置号 (原始 token，未归一化)
    #[serde(rename = "POSNO")]
    pub position_number: String,
    #[serde(rename = "Quantity", deserialize_with = "lenient::u32_or_zero")]
    pub quantity_ordered: u32,
    #[serde(rename = "Profile")]
    pub profile_name: String,
    #[serde(rename = "Weight", deserialize_with = "lenient::f64_or_zero")]
    pub weight: f64,
    #[serde(rename = "ProjectName", default)]
    pub project_name: String,
    /// 已完成数量 (操作员录入)
    #[serde(rename = "QuantityDone", default, deserialize_with = "lenient::u32_or_zero")]
    pub quantity_completed: u32,
    /// 已发货数量 (操作员录入)
    #[serde(rename = "QuantitySent", default, deserialize_with = "lenient::u32_or_zero")]
    pub quantity_shipped: u32,
    /// 已完成数量最后一次变更时间
    #[serde(rename = "Date", default, skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "PdfFileName", default)]
    pub document_name: Option<String>,
    #[serde(rename = "PdfFileURL", default)]
    pub document_url: Option<String>,
}

impl LineItem {
    pub fn new(
        position_number: impl Into<String>,
        quantity_ordered: u32,
        profile_name: impl Into<String>,
        weight: f64,
        project_name: impl Into<String>,
    ) -> Self {
        Self {
            position_number: position_number.into(),
            quantity_ordered,
            profile_name: profile_name.into(),
            weight,
            project_name: project_name.into(),
            quantity_completed: 0,
            quantity_shipped: 0,
            last_updated_at: None,
            document_name: None,
            document_url: None,
        }
    }

    /// 单行完成率，订购数量为 0 时为 0
    pub fn progress_ratio(&self) -> f64 {
        if self.quantity_ordered == 0 {
            return 0.0;
        }
        f64::from(self.quantity_completed) / f64::from(self.quantity_ordered)
    }

    /// 剩余未完成数量
    pub fn remaining(&self) -> u32 {
        self.quantity_ordered.saturating_sub(self.quantity_completed)
    }

    pub fn has_document(&self) -> bool {
        self.document_url.is_some()
    }
}
