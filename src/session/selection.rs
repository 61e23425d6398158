//! 選択スナップショット
//!
//! フォーカス中のブロックのキャレット位置を一つだけ保持する

use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSnapshot {
    pub block_id: String,
    pub offset: usize,
    pub text_length: usize,
    pub updated_at: Instant,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionStore {
    current: Option<SelectionSnapshot>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// スナップショットを上書きする。オフセットは長さに丸める
    pub fn update(&mut self, block_id: &str, offset: usize, text_length: usize, now: Instant) {
        self.current = Some(SelectionSnapshot {
            block_id: block_id.to_string(),
            offset: offset.min(text_length),
            text_length,
            updated_at: now,
        });
    }

    /// `block_id` が持ち主のときだけ消去する
    pub fn clear_if_owner(&mut self, block_id: &str) -> bool {
        if self.is_caret_inside(block_id) {
            self.current = None;
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn get(&self) -> Option<&SelectionSnapshot> {
        self.current.as_ref()
    }

    pub fn is_caret_inside(&self, block_id: &str) -> bool {
        self.current
            .as_ref()
            .is_some_and(|snapshot| snapshot.block_id == block_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_slot_overwrite_and_owner_clear() {
        let mut store = SelectionStore::new();
        let now = Instant::now();
        store.update("a", 3, 5, now);
        store.update("b", 9, 4, now);

        let snapshot = store.get().unwrap();
        assert_eq!(snapshot.block_id, "b");
        assert_eq!(snapshot.offset, 4);
        assert!(!store.is_caret_inside("a"));

        assert!(!store.clear_if_owner("a"));
        assert!(store.clear_if_owner("b"));
        assert!(store.get().is_none());
    }
}
