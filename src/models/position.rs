use serde::{Deserialize, Serialize};

/// 位置号归一化规则：去掉编号里的分隔符 (`"1234/"` -> `"1234"`)
///
/// 归一化结果只用作匹配键，原始位置号保留用于展示。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionNormalizer {
    separators: Vec<char>,
}

impl PositionNormalizer {
    pub fn new(separators: impl IntoIterator<Item = char>) -> Self {
        Self {
            separators: separators.into_iter().collect(),
        }
    }

    /// 去掉所有分隔符。幂等：再次归一化结果不变。
    pub fn normalize(&self, raw: &str) -> String {
        raw.chars().filter(|c| !self.separators.contains(c)).collect()
    }

    pub fn separators(&self) -> &[char] {
        &self.separators
    }
}

impl Default for PositionNormalizer {
    fn default() -> Self {
        Self::new(['/'])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1234/", "1234")]
    #[case("A/12/3", "A123")]
    #[case("1234", "1234")]
    #[case("//", "")]
    fn strips_every_separator(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(PositionNormalizer::default().normalize(raw), expected);
    }

    #[test]
    fn custom_separators() {
        let normalizer = PositionNormalizer::new(['/', '-']);
        assert_eq!(normalizer.normalize("12-34/5"), "12345");
    }
}
