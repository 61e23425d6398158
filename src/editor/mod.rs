//! エディタモジュール
//!
//! ブロック編集プリミティブ、行コレクション、文書全体の統合

pub mod commit_buffer;
pub mod document;
pub mod primitive;
pub mod rows;

// 公開API
pub use commit_buffer::CommitBuffer;
pub use document::{BlockSlot, BlockView, DocumentEditor};
pub use primitive::{BlockEditor, ClickOutcome, KeyOutcome, Navigation};
pub use rows::{RowController, RowFlavor, RowHost, RowKeyOutcome};
