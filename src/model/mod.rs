//! データモデル
//!
//! ブロック・内容・順序キー

pub mod block;
pub mod content;
pub mod order;

pub use block::{clamp_heading_level, Block, BlockId, ClientId, RenderableBlock};
pub use content::{
    content_to_value, default_content, derive_paragraph_text, new_row_id, normalize_content,
    parse_block_content, serialize_block_content, BlockContent, BlockKind, CalloutContent,
    CodeContent, ListContent, ListItem, PanelContent, QuoteContent, RowItem, TextContent,
    TodoContent, TodoItem,
};
pub use order::{key_between, n_keys_between, validate_key};
