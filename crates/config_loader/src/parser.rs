//! 会话文件解析
//!
//! 只负责反序列化为 `SessionBlueprint`；缺省字段由各结构的 serde 默认值补齐，
//! 合法性检查留给 validator。

use contracts::{ContractError, SessionBlueprint};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.toml`
    Toml,
    /// `.json`，结构与 TOML 相同
    Json,
}

impl ConfigFormat {
    /// 扩展名 (不区分大小写) 到格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 会话文件
pub fn parse_toml(content: &str) -> Result<SessionBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 会话文件
pub fn parse_json(content: &str) -> Result<SessionBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse(content: &str, format: ConfigFormat) -> Result<SessionBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}
