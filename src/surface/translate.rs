//! テキストオフセット変換
//!
//! ネイティブな `(ノード, オフセット)` 位置と、編集面一つ分の
//! 平坦な論理オフセットとを相互に変換する。
//! 失敗は `None` で返し、呼び出し側は次のイベントで再試行する

use super::layout::SurfaceLayout;
use super::tree::{DomPosition, NativeSelection, NodeId, NodeKind, SurfaceTree};
use super::Point;
use crate::text::char_len;

/// 編集ルートの論理テキスト長
pub fn text_length(tree: &SurfaceTree, root: NodeId) -> usize {
    char_len(&tree.text_content(root))
}

/// 論理オフセットに対応するテキスト位置を探す
///
/// 範囲外は末尾に丸める。テキストを持つノードが一つもなければ `None`
pub fn find_text_position(tree: &SurfaceTree, root: NodeId, offset: usize) -> Option<DomPosition> {
    let mut accumulated = 0usize;
    let mut last = None;

    for id in tree.text_bearing_descendants(root) {
        match tree.kind(id) {
            NodeKind::Text(text) => {
                let len = char_len(text);
                if offset <= accumulated + len {
                    return Some(DomPosition::new(id, offset - accumulated));
                }
                accumulated += len;
                last = Some(DomPosition::new(id, len));
            }
            NodeKind::LineBreak => {
                let parent = tree.parent(id)?;
                let index = tree.index_in_parent(id)?;
                if offset == accumulated {
                    return Some(DomPosition::new(parent, index));
                }
                accumulated += 1;
                last = Some(DomPosition::new(parent, index + 1));
            }
            NodeKind::Element { .. } => {}
        }
    }

    last
}

/// `find_text_position` と同じだが、テキストが無ければ空テキストノードを作る
pub fn ensure_text_position(tree: &mut SurfaceTree, root: NodeId, offset: usize) -> DomPosition {
    if let Some(position) = find_text_position(tree, root, offset) {
        return position;
    }
    let node = tree.create_text("");
    tree.append_child(root, node);
    DomPosition::new(node, 0)
}

/// ルート先頭から `position` までの文字列。`position` がルート外なら `None`
pub fn text_before(tree: &SurfaceTree, root: NodeId, position: DomPosition) -> Option<String> {
    if !tree.contains(root, position.node) {
        return None;
    }
    let mut out = String::new();
    tree.collect_until(root, position, &mut out);
    Some(out)
}

/// 位置を論理オフセットに変換
pub fn logical_offset_of(tree: &SurfaceTree, root: NodeId, position: DomPosition) -> Option<usize> {
    text_before(tree, root, position).map(|text| char_len(&text))
}

/// 選択範囲のアンカーの論理オフセット
///
/// 選択がルート内に無ければ `None`
pub fn get_caret_offset_within(
    tree: &SurfaceTree,
    root: NodeId,
    selection: Option<&NativeSelection>,
) -> Option<usize> {
    let selection = selection?;
    logical_offset_of(tree, root, selection.anchor)
}

/// 選択範囲を `(開始, 終了)` の論理オフセットで返す
pub fn get_selection_offsets_within(
    tree: &SurfaceTree,
    root: NodeId,
    selection: Option<&NativeSelection>,
) -> Option<(usize, usize)> {
    let selection = selection?;
    let anchor = logical_offset_of(tree, root, selection.anchor)?;
    let focus = logical_offset_of(tree, root, selection.focus)?;
    Some((anchor.min(focus), anchor.max(focus)))
}

/// 論理オフセットにキャレットを置き、実際に適用したオフセットを返す
pub fn place_caret_at_text_offset(
    tree: &mut SurfaceTree,
    root: NodeId,
    selection: &mut Option<NativeSelection>,
    offset: usize,
) -> usize {
    let clamped = offset.min(text_length(tree, root));
    let position = ensure_text_position(tree, root, clamped);
    *selection = Some(NativeSelection::collapsed(position));
    logical_offset_of(tree, root, position).unwrap_or(0)
}

/// 論理範囲を選択し、適用した範囲を返す
pub fn select_text_range(
    tree: &mut SurfaceTree,
    root: NodeId,
    selection: &mut Option<NativeSelection>,
    start: usize,
    end: usize,
) -> (usize, usize) {
    let len = text_length(tree, root);
    let (start, end) = (start.min(len), end.min(len));
    let anchor = ensure_text_position(tree, root, start);
    let focus = ensure_text_position(tree, root, end);
    *selection = Some(NativeSelection { anchor, focus });
    (
        logical_offset_of(tree, root, anchor).unwrap_or(0),
        logical_offset_of(tree, root, focus).unwrap_or(0),
    )
}

/// 画面上の点を論理オフセットに変換
///
/// 厳密なヒットテストを優先し、外れたら行内の最寄り位置で代替する。
/// 得られたノードが `root` の外なら `None`
pub fn offset_from_point(
    tree: &SurfaceTree,
    root: NodeId,
    layout: &SurfaceLayout,
    point: Point,
) -> Option<usize> {
    let position = layout
        .position_at(point)
        .or_else(|| layout.nearest_position(point))?;
    if !tree.contains(root, position.node) {
        return None;
    }
    logical_offset_of(tree, root, position)
}
