//! キー判定
//!
//! キー意図と編集文脈から、実行すべき操作を決める純関数

use crate::model::BlockKind;
use serde::{Deserialize, Serialize};

/// 判定対象のキー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyIntent {
    Enter,
    Backspace,
}

/// 番号付きかどうか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Bulleted,
    Numbered,
}

impl ListKind {
    pub fn block_kind(self) -> BlockKind {
        match self {
            ListKind::Bulleted => BlockKind::BulletedList,
            ListKind::Numbered => BlockKind::NumberedList,
        }
    }
}

/// キーイベントごとに作られる編集文脈
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum KeyboardContext {
    Block {
        block_kind: BlockKind,
        is_block_empty: bool,
        has_inline_text: bool,
        caret_at_start: bool,
        caret_at_end: bool,
        #[serde(default)]
        prefer_exit_for_lonely_empty: bool,
    },
    ListItem {
        list_kind: ListKind,
        is_item_empty: bool,
        is_first_item: bool,
        is_last_item: bool,
        all_items_empty: bool,
    },
    TodoItem {
        is_item_empty: bool,
        is_first_item: bool,
        is_last_item: bool,
        all_items_empty: bool,
    },
}

/// 判定結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyboardAction {
    Noop,
    Split,
    CreateBelow,
    ExitEdit,
    DeleteBlock,
    ListInsertItem,
    ListRemoveItem,
    ListExit,
    TodoInsertItem,
    TodoRemoveItem,
    TodoExit,
}

impl KeyboardAction {
    pub fn is_noop(self) -> bool {
        self == KeyboardAction::Noop
    }
}

/// 行単位の操作（リストと TODO で共通）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowAction {
    Noop,
    Insert,
    Remove,
    Exit,
}

fn decide_row(
    intent: KeyIntent,
    is_item_empty: bool,
    is_first_item: bool,
    is_last_item: bool,
    all_items_empty: bool,
) -> RowAction {
    match intent {
        KeyIntent::Enter => {
            if !is_item_empty {
                RowAction::Insert
            } else if all_items_empty {
                RowAction::Exit
            } else if is_last_item {
                RowAction::Insert
            } else {
                RowAction::Remove
            }
        }
        KeyIntent::Backspace => {
            if !is_item_empty {
                RowAction::Noop
            } else if all_items_empty || is_first_item {
                RowAction::Exit
            } else {
                RowAction::Remove
            }
        }
    }
}

/// キー意図と文脈から操作を決める
pub fn decide(intent: KeyIntent, context: &KeyboardContext) -> KeyboardAction {
    match *context {
        KeyboardContext::Block {
            block_kind,
            is_block_empty,
            has_inline_text,
            caret_at_start,
            caret_at_end,
            prefer_exit_for_lonely_empty,
        } => {
            if !block_kind.is_text_block() {
                return KeyboardAction::Noop;
            }
            match intent {
                KeyIntent::Backspace if is_block_empty && caret_at_start => KeyboardAction::DeleteBlock,
                KeyIntent::Backspace => KeyboardAction::Noop,
                KeyIntent::Enter if !is_block_empty || has_inline_text => KeyboardAction::Split,
                KeyIntent::Enter if prefer_exit_for_lonely_empty && caret_at_start && caret_at_end => {
                    KeyboardAction::ExitEdit
                }
                KeyIntent::Enter => KeyboardAction::CreateBelow,
            }
        }
        KeyboardContext::ListItem {
            is_item_empty,
            is_first_item,
            is_last_item,
            all_items_empty,
            ..
        } => match decide_row(intent, is_item_empty, is_first_item, is_last_item, all_items_empty) {
            RowAction::Noop => KeyboardAction::Noop,
            RowAction::Insert => KeyboardAction::ListInsertItem,
            RowAction::Remove => KeyboardAction::ListRemoveItem,
            RowAction::Exit => KeyboardAction::ListExit,
        },
        KeyboardContext::TodoItem {
            is_item_empty,
            is_first_item,
            is_last_item,
            all_items_empty,
        } => match decide_row(intent, is_item_empty, is_first_item, is_last_item, all_items_empty) {
            RowAction::Noop => KeyboardAction::Noop,
            RowAction::Insert => KeyboardAction::TodoInsertItem,
            RowAction::Remove => KeyboardAction::TodoRemoveItem,
            RowAction::Exit => KeyboardAction::TodoExit,
        },
    }
}
