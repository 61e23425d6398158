//! キー判定と入力ショートカットの公開APIテスト

use blockcaret::keyboard::{decide, KeyIntent, KeyboardAction, KeyboardContext, ListKind};
use blockcaret::model::BlockKind;
use blockcaret::text::{detect_markdown_shortcut, insert_soft_break_at};
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

fn intent_strategy() -> impl Strategy<Value = KeyIntent> {
    prop_oneof![Just(KeyIntent::Enter), Just(KeyIntent::Backspace)]
}

fn list_kind_strategy() -> impl Strategy<Value = ListKind> {
    prop_oneof![Just(ListKind::Bulleted), Just(ListKind::Numbered)]
}

fn non_text_kind_strategy() -> impl Strategy<Value = BlockKind> {
    proptest::sample::select(
        BlockKind::ALL
            .iter()
            .copied()
            .filter(|kind| !kind.is_text_block())
            .collect::<Vec<_>>(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn prop_non_text_blocks_never_act(
        intent in intent_strategy(),
        kind in non_text_kind_strategy(),
        flags in any::<[bool; 5]>(),
    ) {
        let context = KeyboardContext::Block {
            block_kind: kind,
            is_block_empty: flags[0],
            has_inline_text: flags[1],
            caret_at_start: flags[2],
            caret_at_end: flags[3],
            prefer_exit_for_lonely_empty: flags[4],
        };
        prop_assert_eq!(decide(intent, &context), KeyboardAction::Noop);
    }

    #[test]
    fn prop_backspace_on_first_empty_item_exits(
        list_kind in list_kind_strategy(),
        is_last_item in any::<bool>(),
        all_items_empty in any::<bool>(),
    ) {
        let context = KeyboardContext::ListItem {
            list_kind,
            is_item_empty: true,
            is_first_item: true,
            is_last_item,
            all_items_empty,
        };
        prop_assert_eq!(decide(KeyIntent::Backspace, &context), KeyboardAction::ListExit);
    }

    #[test]
    fn prop_enter_on_filled_item_inserts(
        list_kind in list_kind_strategy(),
        flags in any::<[bool; 3]>(),
    ) {
        let context = KeyboardContext::ListItem {
            list_kind,
            is_item_empty: false,
            is_first_item: flags[0],
            is_last_item: flags[1],
            all_items_empty: flags[2],
        };
        prop_assert_eq!(decide(KeyIntent::Enter, &context), KeyboardAction::ListInsertItem);

        let todo = KeyboardContext::TodoItem {
            is_item_empty: false,
            is_first_item: flags[0],
            is_last_item: flags[1],
            all_items_empty: flags[2],
        };
        prop_assert_eq!(decide(KeyIntent::Enter, &todo), KeyboardAction::TodoInsertItem);
    }

    #[test]
    fn prop_soft_break_adds_one_char(
        text in "[a-zA-Zあ-ん ]{0,24}",
        offset in proptest::option::of(0usize..40),
    ) {
        let result = insert_soft_break_at(&text, offset);
        let len = text.chars().count();
        let at = offset.unwrap_or(len).min(len);
        prop_assert_eq!(result.text.chars().count(), len + 1);
        prop_assert_eq!(result.caret_offset, at + 1);
        prop_assert_eq!(result.text.chars().nth(at), Some('\n'));
        prop_assert_eq!(result.text.replacen('\n', "", 1), text);
    }
}

#[test]
fn test_lonely_empty_paragraph_prefers_exit() {
    let context = KeyboardContext::Block {
        block_kind: BlockKind::Paragraph,
        is_block_empty: true,
        has_inline_text: false,
        caret_at_start: true,
        caret_at_end: true,
        prefer_exit_for_lonely_empty: true,
    };
    assert_eq!(decide(KeyIntent::Enter, &context), KeyboardAction::ExitEdit);
    assert_eq!(decide(KeyIntent::Backspace, &context), KeyboardAction::DeleteBlock);
}

#[test]
fn test_heading_with_text_splits() {
    let context = KeyboardContext::Block {
        block_kind: BlockKind::Heading,
        is_block_empty: false,
        has_inline_text: true,
        caret_at_start: false,
        caret_at_end: true,
        prefer_exit_for_lonely_empty: false,
    };
    assert_eq!(decide(KeyIntent::Enter, &context), KeyboardAction::Split);
    assert_eq!(decide(KeyIntent::Backspace, &context), KeyboardAction::Noop);
}

#[test]
fn test_soft_break_examples() {
    let middle = insert_soft_break_at("abcDEF", Some(3));
    assert_eq!(middle.text, "abc\nDEF");
    assert_eq!(middle.caret_offset, 4);

    let end = insert_soft_break_at("todo", None);
    assert_eq!(end.text, "todo\n");
    assert_eq!(end.caret_offset, 5);
}

#[test]
fn test_markdown_shortcut_examples() {
    let todo = detect_markdown_shortcut("- [ ]", 5).expect("todo marker should match");
    assert_eq!(todo.kind, BlockKind::TodoList);
    assert!(!todo.checked);

    assert_eq!(detect_markdown_shortcut("> text", 2), None);
    assert_eq!(
        detect_markdown_shortcut(">", 1).map(|shortcut| shortcut.kind),
        Some(BlockKind::Quote)
    );
}
