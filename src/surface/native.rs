//! ノードツリーを持つ編集面
//!
//! ホスト要素の下に、編集不可のマーカー（箇条書き記号やチェックボックス）と
//! 編集可能なルートを並べる

use super::layout::{self, SurfaceLayout};
use super::translate;
use super::tree::{NativeSelection, NodeId, SurfaceTree};
use super::{CaretRect, Point, TextSurface};

#[derive(Debug, Clone)]
pub struct TreeSurface {
    tree: SurfaceTree,
    host: NodeId,
    marker: NodeId,
    root: NodeId,
    selection: Option<NativeSelection>,
    origin: Point,
}

impl TreeSurface {
    pub fn new() -> Self {
        Self::with_marker("")
    }

    /// 先頭に編集不可のマーカー文字列を持つ面
    pub fn with_marker(marker: &str) -> Self {
        let mut tree = SurfaceTree::new();
        let host = tree.create_element(false);
        let span = tree.create_element(false);
        let marker = tree.create_text(marker);
        let root = tree.create_element(true);
        tree.append_child(host, span);
        tree.append_child(span, marker);
        tree.append_child(host, root);

        Self {
            tree,
            host,
            marker,
            root,
            selection: None,
            origin: Point::default(),
        }
    }

    pub fn marker(&self) -> &str {
        self.tree.text(self.marker).unwrap_or("")
    }

    pub fn tree(&self) -> &SurfaceTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut SurfaceTree {
        &mut self.tree
    }

    pub fn host(&self) -> NodeId {
        self.host
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn native_selection(&self) -> Option<NativeSelection> {
        self.selection
    }

    /// ネイティブ選択を直接設定（他の面を指していてもよい）
    pub fn set_native_selection(&mut self, selection: Option<NativeSelection>) {
        self.selection = selection;
    }

    pub fn layout(&self) -> SurfaceLayout {
        SurfaceLayout::build(&self.tree, self.host, self.origin)
    }
}

impl Default for TreeSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl TextSurface for TreeSurface {
    fn raw_text(&self) -> String {
        self.tree.text_content(self.root)
    }

    fn replace_text(&mut self, text: &str) {
        self.tree.set_content_from_text(self.root, text);
        self.selection = None;
    }

    fn selection_offsets(&self) -> Option<(usize, usize)> {
        translate::get_selection_offsets_within(&self.tree, self.root, self.selection.as_ref())
    }

    fn caret_offset(&self) -> Option<usize> {
        translate::get_caret_offset_within(&self.tree, self.root, self.selection.as_ref())
    }

    fn place_caret(&mut self, offset: usize) -> usize {
        translate::place_caret_at_text_offset(&mut self.tree, self.root, &mut self.selection, offset)
    }

    fn select_range(&mut self, start: usize, end: usize) -> (usize, usize) {
        translate::select_text_range(&mut self.tree, self.root, &mut self.selection, start, end)
    }

    fn clear_selection(&mut self) {
        self.selection = None;
    }

    fn offset_at_point(&self, point: Point) -> Option<usize> {
        translate::offset_from_point(&self.tree, self.root, &self.layout(), point)
    }

    fn caret_rect(&self) -> Option<CaretRect> {
        let selection = self.selection?;
        if !self.tree.contains(self.root, selection.focus.node) {
            return None;
        }
        layout::caret_rect(&self.tree, self.host, self.origin, selection.focus)
    }

    fn origin(&self) -> Point {
        self.origin
    }

    fn set_origin(&mut self, origin: Point) {
        self.origin = origin;
    }

    fn set_marker(&mut self, marker: &str) {
        self.tree.set_text(self.marker, marker);
    }

    fn text_length(&self) -> usize {
        translate::text_length(&self.tree, self.root)
    }
}
