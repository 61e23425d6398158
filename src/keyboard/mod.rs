//! キーボード
//!
//! キー表現と、Enter/Backspace の判定エンジン

pub mod decision;
pub mod key;

pub use decision::{decide, KeyIntent, KeyboardAction, KeyboardContext, ListKind};
pub use key::{Key, KeyCode, KeyModifiers};
