//! URL 验证模块
//!
//! Accepts only syntactically valid absolute URLs with a host, and blocks
//! script-bearing protocols outright. The input must already be exact: keys
//! are derived from its raw bytes, so padding that the parser would silently
//! strip is rejected instead.

use url::Url;

/// URL 验证错误
#[derive(Debug)]
pub enum UrlValidationError {
    EmptyUrl,
    SurroundingWhitespace,
    DangerousProtocol(String),
    MissingHost,
    InvalidFormat(String),
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "URL cannot be empty"),
            Self::SurroundingWhitespace => {
                write!(f, "URL must not start or end with whitespace")
            }
            Self::DangerousProtocol(proto) => {
                write!(f, "Dangerous protocol blocked: {}", proto)
            }
            Self::MissingHost => write!(f, "URL must be absolute and name a host"),
            Self::InvalidFormat(msg) => write!(f, "Invalid URL format: {}", msg),
        }
    }
}

impl std::error::Error for UrlValidationError {}

/// 危险协议列表
const DANGEROUS_PROTOCOLS: &[&str] = &["javascript:", "data:", "vbscript:", "blob:"];

/// 验证 URL
///
/// 检查项目：
/// 1. URL 不为空
/// 2. 首尾无空白字符
/// 3. 不是危险协议（javascript:, data: 等）
/// 4. 可解析为绝对 URL
/// 5. 含有非空主机名
pub fn validate_url(url: &str) -> Result<Url, UrlValidationError> {
    if url.trim().is_empty() {
        return Err(UrlValidationError::EmptyUrl);
    }

    if url.trim() != url {
        return Err(UrlValidationError::SurroundingWhitespace);
    }

    let url_lower = url.to_lowercase();
    for proto in DANGEROUS_PROTOCOLS {
        if url_lower.starts_with(proto) {
            return Err(UrlValidationError::DangerousProtocol(proto.to_string()));
        }
    }

    let parsed = Url::parse(url).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(parsed),
        _ => Err(UrlValidationError::MissingHost),
    }
}
