//! エラーハンドリングシステム
//!
//! blockcaret 全体で使用される統一されたエラー型とユーティリティを定義
//! 永続化の失敗は楽観的更新のロールバックで吸収し、プロセスを止めない

use thiserror::Error;

/// アプリケーション全体のエラー型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlockcaretError {
    /// ブロック操作エラー
    #[error("Block operation failed: {0}")]
    Block(#[from] BlockError),

    /// 永続化エラー
    #[error("Persistence failed: {0}")]
    Persistence(#[from] PersistenceError),

    /// 設定エラー
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// UI操作エラー
    #[error("UI operation failed: {0}")]
    Ui(#[from] UiError),

    /// アプリケーション論理エラー
    #[error("Application error: {0}")]
    Application(String),
}

/// ブロック・行操作固有のエラー
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlockError {
    #[error("Block not found: {id}")]
    NotFound { id: String },

    #[error("Row not found: {index}")]
    RowNotFound { index: usize },

    #[error("Invalid order key: {key}")]
    InvalidOrderKey { key: String },

    #[error("Order keys out of order: {before} >= {after}")]
    OrderKeyRange { before: String, after: String },

    #[error("Block {id} is not a {expected} block")]
    KindMismatch { id: String, expected: String },
}

/// 永続化層（外部トランスポート）のエラー
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistenceError {
    #[error("{operation} rejected: {reason}")]
    Rejected { operation: String, reason: String },

    #[error("Backend unavailable")]
    Unavailable,
}

/// 設定固有のエラー
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid configuration file {path}: {message}")]
    InvalidFile { path: String, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("IO error: {message}")]
    Io { message: String },
}

/// UI操作固有のエラー
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UiError {
    #[error("Terminal initialization failed")]
    TerminalInit,

    #[error("Rendering failed: {component}")]
    RenderingFailed { component: String },
}

/// エラーレベル分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorLevel {
    Info,
    Warning,
    Error,
    Fatal,
}

impl BlockcaretError {
    /// エラーの重大度
    ///
    /// 永続化失敗はロールバックで回復できるため警告扱い
    pub fn level(&self) -> ErrorLevel {
        match self {
            BlockcaretError::Persistence(_) => ErrorLevel::Warning,
            BlockcaretError::Block(BlockError::NotFound { .. }) => ErrorLevel::Warning,
            BlockcaretError::Block(_) => ErrorLevel::Error,
            BlockcaretError::Config(_) => ErrorLevel::Error,
            BlockcaretError::Ui(UiError::TerminalInit) => ErrorLevel::Fatal,
            BlockcaretError::Ui(_) => ErrorLevel::Error,
            BlockcaretError::Application(_) => ErrorLevel::Error,
        }
    }

    /// 重大度に応じて `log` に出力する
    pub fn report(&self, context: &str) {
        match self.level() {
            ErrorLevel::Info => log::info!("{} in {}", self, context),
            ErrorLevel::Warning => log::warn!("{} in {}", self, context),
            ErrorLevel::Error | ErrorLevel::Fatal => log::error!("{} in {}", self, context),
        }
    }

    pub fn rejected(operation: &str, reason: impl Into<String>) -> Self {
        BlockcaretError::Persistence(PersistenceError::Rejected {
            operation: operation.to_string(),
            reason: reason.into(),
        })
    }
}

/// パニックハンドラの設定
pub fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        // 端末がrawモードのままにならないように戻す
        let _ = crossterm::terminal::disable_raw_mode();

        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());

        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s
        } else {
            "Unknown panic payload"
        };

        log::error!("PANIC at {}: {}", location, message);
        eprintln!("PANIC at {}: {}", location, message);
        eprintln!("Stack trace: {}", std::backtrace::Backtrace::capture());
        std::process::exit(1);
    }));
}

// std::io::Error から BlockcaretError への変換
impl From<std::io::Error> for BlockcaretError {
    fn from(error: std::io::Error) -> Self {
        BlockcaretError::Config(ConfigError::Io {
            message: error.to_string(),
        })
    }
}

/// プロジェクト標準のResult型
pub type Result<T> = std::result::Result<T, BlockcaretError>;
