use crate::models::PositionNormalizer;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub parser: ParserConfig,
    pub board: BoardConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 新建项目时上传请求体的上限 (字节)
    pub max_upload_bytes: usize,
}

/// 报表解析参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// 页眉版式：丢弃的开头行数
    pub header_lines: usize,
    /// 页眉版式：丢弃的结尾行数
    pub footer_lines: usize,
    /// 标记行版式的表头标记
    pub header_marker: String,
    /// 前缀版式的记录类型前缀
    pub record_prefixes: Vec<String>,
    /// 位置号里的分隔符
    pub position_separators: Vec<char>,
}

impl ParserConfig {
    pub fn normalizer(&self) -> PositionNormalizer {
        PositionNormalizer::new(self.position_separators.iter().copied())
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            header_lines: 5,
            footer_lines: 2,
            header_marker: "Asmbly Pos.".to_string(),
            record_prefixes: vec!["A/".to_string(), "B/".to_string(), "C/".to_string()],
            position_separators: vec!['/'],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    pub page_size: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self { page_size: 5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 项目列表在文档存储里的路径
    pub projects_path: String,
    /// 图纸在对象存储里的前缀
    pub documents_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            projects_path: "projects".to_string(),
            documents_prefix: "pdfs".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                max_upload_bytes: 50 * 1024 * 1024,
            },
            parser: ParserConfig::default(),
            board: BoardConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl AppConfig {
    /// 默认值 -> `xsr-progress.toml` (可选) -> 环境变量 (`XSR_SERVER__PORT=9000`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(File::with_name("xsr-progress").required(false))
    }

    /// 指定配置文件来源加载
    pub fn load<S>(file: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix("XSR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn defaults_match_report_export() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.parser.header_lines, 5);
        assert_eq!(cfg.parser.footer_lines, 2);
        assert_eq!(cfg.parser.header_marker, "Asmbly Pos.");
        assert_eq!(cfg.board.page_size, 5);
        assert_eq!(cfg.parser.normalizer().normalize("12/3"), "123");
    }

    #[test]
    fn file_overrides_defaults() {
        let toml = r#"
            [board]
            page_size = 20

            [parser]
            header_marker = "Pos. No."
        "#;
        let cfg = AppConfig::load(File::from_str(toml, FileFormat::Toml)).unwrap();
        assert_eq!(cfg.board.page_size, 20);
        assert_eq!(cfg.parser.header_marker, "Pos. No.");
        assert_eq!(cfg.parser.footer_lines, 2);
        assert_eq!(cfg.storage.projects_path, "projects");
    }
}
