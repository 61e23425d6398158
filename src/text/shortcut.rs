//! 入力ショートカット
//!
//! Markdown 記法によるブロック変換と、ブロック内の改行（ソフトブレーク）

use super::{byte_index, char_len};
use crate::model::BlockKind;
use regex::Regex;
use std::sync::OnceLock;

/// 検出された Markdown ショートカット
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkdownShortcut {
    pub kind: BlockKind,
    pub heading_level: Option<u8>,
    /// 記号部分の文字数（キャレット位置と一致する）
    pub marker_len: usize,
    /// `[x]` で始めた TODO
    pub checked: bool,
}

struct MarkerRule {
    pattern: Regex,
    kind: BlockKind,
    checked: bool,
}

fn marker_rules() -> &'static [MarkerRule] {
    static RULES: OnceLock<Vec<MarkerRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        let table: [(&str, BlockKind, bool); 9] = [
            (r"^(?:-\s?)?\[\s?\]$", BlockKind::TodoList, false),
            (r"^(?:-\s?)?\[[xX]\]$", BlockKind::TodoList, true),
            (r"^[-*+]$", BlockKind::BulletedList, false),
            (r"^\d{1,3}[.)]$", BlockKind::NumberedList, false),
            (r"^#{1,3}$", BlockKind::Heading, false),
            (r"^>$", BlockKind::Quote, false),
            (r"^!>$", BlockKind::Callout, false),
            (r"^```$", BlockKind::Code, false),
            (r"^---$", BlockKind::Divider, false),
        ];
        table
            .iter()
            .filter_map(|(pattern, kind, checked)| match Regex::new(pattern) {
                Ok(pattern) => Some(MarkerRule {
                    pattern,
                    kind: *kind,
                    checked: *checked,
                }),
                Err(err) => {
                    log::error!("invalid marker pattern {}: {}", pattern, err);
                    None
                }
            })
            .collect()
    })
}

/// キャレット直前のテキストが記号だけなら対応するブロック種別を返す
///
/// キャレットが記号の末尾にない場合は `None`
pub fn detect_markdown_shortcut(text: &str, caret: usize) -> Option<MarkdownShortcut> {
    if caret == 0 || caret > char_len(text) {
        return None;
    }
    let prefix = &text[..byte_index(text, caret)];
    marker_rules()
        .iter()
        .find(|rule| rule.pattern.is_match(prefix))
        .map(|rule| MarkdownShortcut {
            kind: rule.kind,
            heading_level: match rule.kind {
                BlockKind::Heading => Some(prefix.len() as u8),
                _ => None,
            },
            marker_len: caret,
            checked: rule.checked,
        })
}

/// ソフトブレーク挿入結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftBreak {
    pub text: String,
    pub caret_offset: usize,
}

/// 指定位置（省略時は末尾）に `\n` を挿入する。位置は範囲内に丸める
pub fn insert_soft_break_at(text: &str, offset: Option<usize>) -> SoftBreak {
    let len = char_len(text);
    let at = offset.unwrap_or(len).min(len);
    let split = byte_index(text, at);
    let mut out = String::with_capacity(text.len() + 1);
    out.push_str(&text[..split]);
    out.push('\n');
    out.push_str(&text[split..]);
    SoftBreak {
        text: out,
        caret_offset: at + 1,
    }
}
