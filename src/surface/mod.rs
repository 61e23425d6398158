//! 編集面
//!
//! ブロック一つ分の編集可能領域を `TextSurface` として抽象化する。
//! ノードツリーを持つ実装と、テスト用の文字列だけの実装がある

pub mod layout;
pub mod memory;
pub mod native;
pub mod translate;
pub mod tree;

pub use layout::SurfaceLayout;
pub use memory::MemorySurface;
pub use native::TreeSurface;
pub use tree::{DomPosition, NativeSelection, NodeId, NodeKind, SurfaceTree};

use crate::text::{byte_index, char_len};

/// 画面上のセル座標
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: u16,
    pub y: u16,
}

impl Point {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// キャレットの描画矩形
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaretRect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

/// 編集面のポート
///
/// オフセットはすべて論理オフセット（文字単位）。位置が解決できない
/// 操作は `None` を返す
pub trait TextSurface {
    /// 面に書かれている生のテキスト
    fn raw_text(&self) -> String;

    /// 内容を書き換える。選択範囲は失われる
    fn replace_text(&mut self, text: &str);

    /// 選択範囲 `(開始, 終了)`
    fn selection_offsets(&self) -> Option<(usize, usize)>;

    /// アンカー位置
    fn caret_offset(&self) -> Option<usize>;

    /// キャレットを置き、実際に適用したオフセットを返す
    fn place_caret(&mut self, offset: usize) -> usize;

    /// 範囲を選択し、適用した範囲を返す
    fn select_range(&mut self, start: usize, end: usize) -> (usize, usize);

    fn clear_selection(&mut self);

    /// 画面上の点に対応するオフセット
    fn offset_at_point(&self, point: Point) -> Option<usize>;

    /// 現在のキャレット矩形
    fn caret_rect(&self) -> Option<CaretRect>;

    /// 描画原点
    fn origin(&self) -> Point;

    fn set_origin(&mut self, origin: Point);

    /// 編集不可の先頭マーカー（箇条書き記号など）。持たない面では何もしない
    fn set_marker(&mut self, _marker: &str) {}

    fn text_length(&self) -> usize {
        char_len(&self.raw_text())
    }

    /// 選択範囲（なければ末尾）を `text` で置き換え、新しいキャレット位置を返す
    fn insert_at_selection(&mut self, text: &str) -> usize {
        let current = self.raw_text();
        let len = char_len(&current);
        let (start, end) = self.selection_offsets().unwrap_or((len, len));
        let (start_byte, end_byte) = (byte_index(&current, start), byte_index(&current, end));

        let mut next = String::with_capacity(current.len() + text.len());
        next.push_str(&current[..start_byte]);
        next.push_str(text);
        next.push_str(&current[end_byte..]);
        self.replace_text(&next);
        self.place_caret(start + char_len(text))
    }

    /// 選択範囲、なければキャレット直前の一文字を削除する
    fn delete_backward(&mut self) -> bool {
        let current = self.raw_text();
        let Some((start, end)) = self.selection_offsets() else {
            return false;
        };
        let start = if start == end {
            if start == 0 {
                return false;
            }
            start - 1
        } else {
            start
        };
        let (start_byte, end_byte) = (byte_index(&current, start), byte_index(&current, end));

        let mut next = String::with_capacity(current.len());
        next.push_str(&current[..start_byte]);
        next.push_str(&current[end_byte..]);
        self.replace_text(&next);
        self.place_caret(start);
        true
    }

    /// キャレットを左右に動かす。端では止まる
    fn move_caret(&mut self, delta: isize) -> usize {
        let current = self.caret_offset().unwrap_or(0);
        let target = current.saturating_add_signed(delta);
        self.place_caret(target)
    }
}
