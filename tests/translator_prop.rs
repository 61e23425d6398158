//! テキストオフセット変換の性質テスト
//!
//! ノードツリーの編集面に対して、キャレットを置いてから読み戻すと
//! 同じ論理オフセットになることを確認する

use blockcaret::surface::translate::{
    find_text_position, get_caret_offset_within, logical_offset_of, place_caret_at_text_offset,
    text_length,
};
use blockcaret::surface::{DomPosition, NativeSelection, SurfaceTree, TextSurface, TreeSurface};
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

/// 改行を含みやすい短い文字列
fn surface_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            3 => proptest::char::range('a', 'z'),
            1 => Just('\n'),
            1 => Just('é'),
            1 => Just('字'),
        ],
        0..32,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn prop_place_then_read_back(text in surface_text(), extra in 0usize..8) {
        let mut tree = SurfaceTree::new();
        let root = tree.create_element(true);
        tree.set_content_from_text(root, &text);
        let len = text.chars().count();
        prop_assert_eq!(text_length(&tree, root), len);

        let mut selection = None;
        for k in 0..=len + extra {
            let applied = place_caret_at_text_offset(&mut tree, root, &mut selection, k);
            prop_assert_eq!(applied, k.min(len));
            prop_assert_eq!(get_caret_offset_within(&tree, root, selection.as_ref()), Some(k.min(len)));
        }
    }

    #[test]
    fn prop_positions_map_back_to_offsets(text in surface_text()) {
        let mut tree = SurfaceTree::new();
        let root = tree.create_element(true);
        tree.set_content_from_text(root, &text);

        for k in 0..=text.chars().count() {
            if let Some(position) = find_text_position(&tree, root, k) {
                prop_assert_eq!(logical_offset_of(&tree, root, position), Some(k));
            }
        }
    }

    #[test]
    fn prop_surface_round_trip_with_marker(text in surface_text(), offset in 0usize..40) {
        let mut surface = TreeSurface::with_marker("• ");
        surface.replace_text(&text);
        prop_assert_eq!(surface.raw_text(), text.clone());

        let applied = surface.place_caret(offset);
        prop_assert_eq!(applied, offset.min(text.chars().count()));
        prop_assert_eq!(surface.caret_offset(), Some(applied));
    }
}

#[test]
fn test_selection_on_marker_is_outside_root() {
    let mut surface = TreeSurface::with_marker("1. ");
    surface.replace_text("alpha");
    let marker_text = surface
        .tree()
        .text_bearing_descendants(surface.host())
        .into_iter()
        .find(|node| surface.tree().text(*node) == Some("1. "))
        .expect("marker node should exist");

    surface.set_native_selection(Some(NativeSelection::collapsed(DomPosition::new(marker_text, 2))));
    assert_eq!(surface.caret_offset(), None);
    assert_eq!(surface.selection_offsets(), None);
}

#[test]
fn test_empty_surface_accepts_caret() {
    let mut surface = TreeSurface::new();
    assert_eq!(surface.caret_offset(), None);
    assert_eq!(surface.place_caret(7), 0);
    assert_eq!(surface.caret_offset(), Some(0));
}
