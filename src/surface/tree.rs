//! 編集面のノードツリー
//!
//! 要素・テキスト・改行の三種類のノードからなるアリーナ。
//! 位置は `(ノード, オフセット)` で表し、テキストノードでは文字単位、
//! 要素では子の添字を意味する

use crate::text::char_len;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element { editable: bool },
    Text(String),
    /// ソフトブレーク。論理テキストでは `\n` 一文字
    LineBreak,
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// ツリー内の位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomPosition {
    pub node: NodeId,
    pub offset: usize,
}

impl DomPosition {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// ネイティブ選択範囲（アンカーとフォーカス）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeSelection {
    pub anchor: DomPosition,
    pub focus: DomPosition,
}

impl NativeSelection {
    pub fn collapsed(position: DomPosition) -> Self {
        Self {
            anchor: position,
            focus: position,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

#[derive(Debug, Clone, Default)]
pub struct SurfaceTree {
    nodes: Vec<Node>,
}

impl SurfaceTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn create_element(&mut self, editable: bool) -> NodeId {
        self.push(NodeKind::Element { editable })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    pub fn create_line_break(&mut self) -> NodeId {
        self.push(NodeKind::LineBreak)
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let NodeKind::Text(existing) = &mut self.nodes[id.0].kind {
            *existing = text.into();
        }
    }

    pub fn is_text_bearing(&self, id: NodeId) -> bool {
        matches!(
            self.nodes[id.0].kind,
            NodeKind::Text(_) | NodeKind::LineBreak
        )
    }

    /// ノードの長さ（テキストは文字数、要素は子の数、改行は0）
    pub fn node_len(&self, id: NodeId) -> usize {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => char_len(text),
            NodeKind::Element { .. } => self.nodes[id.0].children.len(),
            NodeKind::LineBreak => 0,
        }
    }

    fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.nodes[child.0].parent.take() {
            self.nodes[parent.0].children.retain(|id| *id != child);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
    }

    /// 子をすべて切り離す（アリーナからは消えない）
    pub fn clear_children(&mut self, parent: NodeId) {
        let children = std::mem::take(&mut self.nodes[parent.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    /// `node` が `ancestor` 自身かその子孫か
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// 行きがけ順の子孫（自身を含む）
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            for child in self.children(id).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// テキストを持つ子孫（行きがけ順）
    pub fn text_bearing_descendants(&self, root: NodeId) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| self.is_text_bearing(*id))
            .collect()
    }

    pub fn text_content(&self, root: NodeId) -> String {
        let mut out = String::new();
        for id in self.text_bearing_descendants(root) {
            match self.kind(id) {
                NodeKind::Text(text) => out.push_str(text),
                NodeKind::LineBreak => out.push('\n'),
                NodeKind::Element { .. } => {}
            }
        }
        out
    }

    /// 子を作り直し、`\n` を改行ノードとして展開する
    pub fn set_content_from_text(&mut self, root: NodeId, text: &str) {
        self.clear_children(root);
        for (index, line) in text.split('\n').enumerate() {
            if index > 0 {
                let br = self.create_line_break();
                self.append_child(root, br);
            }
            if !line.is_empty() {
                let node = self.create_text(line);
                self.append_child(root, node);
            }
        }
    }

    /// 範囲 `[root の先頭, boundary)` の文字列化
    pub(crate) fn collect_until(&self, node: NodeId, boundary: DomPosition, out: &mut String) -> bool {
        if node == boundary.node {
            match self.kind(node) {
                NodeKind::Text(text) => {
                    out.extend(text.chars().take(boundary.offset));
                }
                NodeKind::LineBreak => {}
                NodeKind::Element { .. } => {
                    let limit = boundary.offset.min(self.children(node).len());
                    for child in &self.children(node)[..limit] {
                        out.push_str(&self.text_content(*child));
                    }
                }
            }
            return true;
        }

        match self.kind(node) {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::LineBreak => out.push('\n'),
            NodeKind::Element { .. } => {
                for child in self.children(node) {
                    if self.collect_until(*child, boundary, out) {
                        return true;
                    }
                }
            }
        }
        false
    }
}
