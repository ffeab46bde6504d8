//! 数值解析
//!
//! 报表和操作员输入里的数字都可能是脏数据。这里的函数只负责"能不能读出一个数"，
//! 读不出来时返回 `None`，由调用方决定是按 0 处理还是拒绝。

use serde::{Deserialize, Deserializer};

/// 读取 token 开头的非负整数前缀 (`"10pcs"` -> 10)
///
/// 负数、空串、非数字开头都返回 `None`。
pub fn parse_quantity(token: &str) -> Option<u32> {
    let token = token.trim_start();
    let token = token.strip_prefix('+').unwrap_or(token);
    let end = leading_digits(token);
    if end == 0 {
        return None;
    }
    token[..end].parse().ok()
}

/// 读取 token 开头的非负小数前缀 (`"2.5kg"` -> 2.5)
pub fn parse_weight(token: &str) -> Option<f64> {
    let token = token.trim_start();
    let token = token.strip_prefix('+').unwrap_or(token);
    let int_end = leading_digits(token);
    let mut end = int_end;
    if let Some(frac) = token[int_end..].strip_prefix('.') {
        let frac_len = leading_digits(frac);
        if frac_len > 0 {
            end = int_end + 1 + frac_len;
        }
    }
    if end == 0 {
        return None;
    }
    token[..end].parse().ok()
}

/// 操作员输入的生产数量：整串必须是非负整数
pub fn parse_amount(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn leading_digits(s: &str) -> usize {
    s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len())
}

/// 存储里的数量字段历史上既有数字也有字符串
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// 宽松反序列化：数字 / 数字字符串 / null 都接受，读不出来按 0
pub mod lenient {
    use super::*;

    pub fn u32_or_zero<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<NumberOrText>::deserialize(deserializer)?;
        Ok(match raw {
            Some(NumberOrText::Number(n)) if n.is_finite() && n >= 0.0 => n.trunc() as u32,
            Some(NumberOrText::Number(_)) => 0,
            Some(NumberOrText::Text(t)) => parse_quantity(&t).unwrap_or(0),
            None => 0,
        })
    }

    pub fn f64_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<NumberOrText>::deserialize(deserializer)?;
        Ok(match raw {
            Some(NumberOrText::Number(n)) if n.is_finite() && n >= 0.0 => n,
            Some(NumberOrText::Number(_)) => 0.0,
            Some(NumberOrText::Text(t)) => parse_weight(&t).unwrap_or(0.0),
            None => 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("10", Some(10))]
    #[case("  7", Some(7))]
    #[case("+3", Some(3))]
    #[case("10pcs", Some(10))]
    #[case("abc", None)]
    #[case("", None)]
    #[case("-5", None)]
    #[case("99999999999", None)]
    fn quantity_reads_leading_integer(#[case] token: &str, #[case] expected: Option<u32>) {
        assert_eq!(parse_quantity(token), expected);
    }

    #[rstest]
    #[case("2.5", Some(2.5))]
    #[case("12", Some(12.0))]
    #[case("3.", Some(3.0))]
    #[case(".75", Some(0.75))]
    #[case("1.25kg", Some(1.25))]
    #[case("X", None)]
    #[case(".", None)]
    #[case("-1.0", None)]
    fn weight_reads_leading_decimal(#[case] token: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_weight(token), expected);
    }

    #[rstest]
    #[case("5", Some(5))]
    #[case(" 12 ", Some(12))]
    #[case("", None)]
    #[case("   ", None)]
    #[case("abc", None)]
    #[case("5abc", None)]
    #[case("2.5", None)]
    #[case("-1", None)]
    fn amount_must_be_a_whole_number(#[case] text: &str, #[case] expected: Option<u32>) {
        assert_eq!(parse_amount(text), expected);
    }

    #[derive(Deserialize)]
    struct Row {
        #[serde(deserialize_with = "lenient::u32_or_zero")]
        qty: u32,
        #[serde(deserialize_with = "lenient::f64_or_zero")]
        weight: f64,
    }

    #[rstest]
    #[case(r#"{"qty": 4, "weight": 1.5}"#, 4, 1.5)]
    #[case(r#"{"qty": "4", "weight": "1.5"}"#, 4, 1.5)]
    #[case(r#"{"qty": "", "weight": "n/a"}"#, 0, 0.0)]
    #[case(r#"{"qty": null, "weight": null}"#, 0, 0.0)]
    #[case(r#"{"qty": -3, "weight": -2.0}"#, 0, 0.0)]
    fn lenient_fields_fall_back_to_zero(#[case] json: &str, #[case] qty: u32, #[case] weight: f64) {
        let row: Row = serde_json::from_str(json).unwrap();
        assert_eq!(row.qty, qty);
        assert_eq!(row.weight, weight);
    }
}
