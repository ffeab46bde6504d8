use serde::{Deserialize, Serialize};

/// 已上传的图纸文档
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub file_name: String,
    pub url: String,
}

impl Document {
    pub fn new(file_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            url: url.into(),
        }
    }

    /// 匹配键：文件名第一个空白字符之前的部分 (`"1234 rev2.pdf"` -> `"1234"`)
    pub fn match_key(&self) -> &str {
        self.file_name
            .split(char::is_whitespace)
            .next()
            .unwrap_or_default()
    }
}

/// 待上传的文档内容
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}
