//! blockcaret - Caret coordination and keyboard decisions for block editors
//!
//! ブロック構造のエディタで、キャレット位置・フォーカス・Enter/Backspace の
//! 判定・楽観的なブロック操作を扱うコア

// コアモジュール
pub mod config;
pub mod error;
pub mod frontend;
pub mod logging;

// データ層
pub mod model;
pub mod text;

// 編集面と状態
pub mod session;
pub mod surface;

// ロジック層
pub mod command;
pub mod keyboard;

// 編集層
pub mod editor;

// 公開API
pub use command::{BlockBackend, BlockCommandService, MemoryBackend};
pub use config::EditorConfig;
pub use editor::DocumentEditor;
pub use error::{BlockcaretError, Result};
pub use frontend::TuiApplication;
pub use session::EditorSession;
