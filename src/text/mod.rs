//! テキストユーティリティ
//!
//! 論理オフセットはすべて文字（`char`）単位

pub mod flatten;
pub mod shortcut;

pub use flatten::{flatten_surface_text, has_visible_text};
pub use shortcut::{detect_markdown_shortcut, insert_soft_break_at, MarkdownShortcut, SoftBreak};

/// 文字数
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// 文字位置をバイト位置に変換（範囲外は末尾）
pub fn byte_index(text: &str, char_pos: usize) -> usize {
    text.char_indices()
        .nth(char_pos)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

/// 文字位置で二分割
pub fn split_at_char(text: &str, char_pos: usize) -> (&str, &str) {
    text.split_at(byte_index(text, char_pos))
}
