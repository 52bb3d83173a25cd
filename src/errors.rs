use std::fmt;

/// 错误分类
///
/// Every failure that crosses a module boundary is tagged with exactly one of
/// these kinds. Callers branch on the kind, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input, rejected before storage is touched
    InvalidInput,
    /// Key already exists on write
    Conflict,
    /// Key absent
    NotFound,
    /// Key present but soft-deleted
    Gone,
    /// Backend I/O failure
    StorageUnavailable,
    /// Missing or invalid identity
    Unauthorized,
    /// Deadline exceeded on a bound call
    Timeout,
}

impl ErrorKind {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "E001",
            ErrorKind::Conflict => "E002",
            ErrorKind::NotFound => "E003",
            ErrorKind::Gone => "E004",
            ErrorKind::StorageUnavailable => "E005",
            ErrorKind::Unauthorized => "E006",
            ErrorKind::Timeout => "E007",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "Invalid Input",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::NotFound => "Not Found",
            ErrorKind::Gone => "Gone",
            ErrorKind::StorageUnavailable => "Storage Unavailable",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::Timeout => "Timeout",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShortenerError {
    kind: ErrorKind,
    message: String,
}

impl ShortenerError {
    pub fn new<T: Into<String>>(kind: ErrorKind, msg: T) -> Self {
        Self {
            kind,
            message: msg.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn error_type(&self) -> &'static str {
        self.kind.error_type()
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 格式化为彩色输出
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for ShortenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for ShortenerError {}

// 便捷的构造函数
impl ShortenerError {
    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        Self::new(ErrorKind::InvalidInput, msg)
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        Self::new(ErrorKind::Conflict, msg)
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }

    pub fn gone<T: Into<String>>(msg: T) -> Self {
        Self::new(ErrorKind::Gone, msg)
    }

    pub fn storage_unavailable<T: Into<String>>(msg: T) -> Self {
        Self::new(ErrorKind::StorageUnavailable, msg)
    }

    pub fn unauthorized<T: Into<String>>(msg: T) -> Self {
        Self::new(ErrorKind::Unauthorized, msg)
    }

    pub fn timeout<T: Into<String>>(msg: T) -> Self {
        Self::new(ErrorKind::Timeout, msg)
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for ShortenerError {
    fn from(err: sea_orm::DbErr) -> Self {
        ShortenerError::storage_unavailable(err.to_string())
    }
}

impl From<std::io::Error> for ShortenerError {
    fn from(err: std::io::Error) -> Self {
        ShortenerError::storage_unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for ShortenerError {
    fn from(err: serde_json::Error) -> Self {
        ShortenerError::storage_unavailable(format!("malformed record: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, ShortenerError>;
