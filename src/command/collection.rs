//! ローカルのブロックコレクション
//!
//! 常に順序キー順に並べて保持する

use crate::error::{BlockError, Result};
use crate::model::{key_between, Block, BlockId, ClientId, RenderableBlock};

/// 挿入・移動先
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockPosition {
    Start,
    End,
    Before(BlockId),
    After(BlockId),
}

#[derive(Debug, Clone, Default)]
pub struct BlockCollection {
    blocks: Vec<RenderableBlock>,
    next_client_id: u64,
}

impl BlockCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut collection = Self::new();
        for block in blocks {
            collection.insert(block);
        }
        collection
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[RenderableBlock] {
        &self.blocks
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderableBlock> {
        self.blocks.iter()
    }

    pub fn index_of(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|block| block.id() == id)
    }

    pub fn get(&self, id: &BlockId) -> Option<&RenderableBlock> {
        self.blocks.iter().find(|block| block.id() == id)
    }

    pub fn get_mut(&mut self, id: &BlockId) -> Option<&mut RenderableBlock> {
        self.blocks.iter_mut().find(|block| block.id() == id)
    }

    pub fn require(&self, id: &BlockId) -> Result<&RenderableBlock> {
        self.get(id).ok_or_else(|| not_found(id))
    }

    pub fn require_mut(&mut self, id: &BlockId) -> Result<&mut RenderableBlock> {
        self.get_mut(id).ok_or_else(|| not_found(id))
    }

    pub fn by_client(&self, client_id: ClientId) -> Option<&RenderableBlock> {
        self.blocks.iter().find(|block| block.client_id == client_id)
    }

    pub fn previous(&self, id: &BlockId) -> Option<&RenderableBlock> {
        let index = self.index_of(id)?;
        index.checked_sub(1).and_then(|index| self.blocks.get(index))
    }

    pub fn next(&self, id: &BlockId) -> Option<&RenderableBlock> {
        let index = self.index_of(id)?;
        self.blocks.get(index + 1)
    }

    /// 新しい描画キーを割り当てて挿入する
    pub fn insert(&mut self, block: Block) -> ClientId {
        self.next_client_id += 1;
        let client_id = ClientId(self.next_client_id);
        self.restore(RenderableBlock { client_id, block });
        client_id
    }

    /// 描画キーを保ったまま挿入する（ロールバック用）
    pub fn restore(&mut self, block: RenderableBlock) {
        let at = self
            .blocks
            .partition_point(|existing| existing.block.order_key < block.block.order_key);
        self.blocks.insert(at, block);
    }

    pub fn remove(&mut self, id: &BlockId) -> Option<RenderableBlock> {
        let index = self.index_of(id)?;
        Some(self.blocks.remove(index))
    }

    /// 順序キーを変えた後に並べ直す
    pub fn resort(&mut self) {
        self.blocks
            .sort_by(|a, b| a.block.order_key.cmp(&b.block.order_key));
    }

    /// 位置の前後にあるブロックの順序キー。`exclude` は存在しないものとして扱う
    pub fn neighbor_keys(
        &self,
        position: &BlockPosition,
        exclude: Option<&BlockId>,
    ) -> Result<(Option<String>, Option<String>)> {
        let keys: Vec<(&BlockId, &str)> = self
            .blocks
            .iter()
            .filter(|block| Some(block.id()) != exclude)
            .map(|block| (block.id(), block.block.order_key.as_str()))
            .collect();
        let find = |id: &BlockId| {
            keys.iter()
                .position(|(candidate, _)| *candidate == id)
                .ok_or_else(|| not_found(id))
        };
        let key_at = |index: usize| keys.get(index).map(|(_, key)| key.to_string());

        Ok(match position {
            BlockPosition::Start => (None, key_at(0)),
            BlockPosition::End => (keys.last().map(|(_, key)| key.to_string()), None),
            BlockPosition::After(id) => {
                let index = find(id)?;
                (key_at(index), key_at(index + 1))
            }
            BlockPosition::Before(id) => {
                let index = find(id)?;
                (index.checked_sub(1).and_then(key_at), key_at(index))
            }
        })
    }

    /// 位置に入る新しい順序キー
    pub fn key_for(&self, position: &BlockPosition, exclude: Option<&BlockId>) -> Result<String> {
        let (before, after) = self.neighbor_keys(position, exclude)?;
        key_between(before.as_deref(), after.as_deref())
    }
}

fn not_found(id: &BlockId) -> crate::error::BlockcaretError {
    BlockError::NotFound {
        id: id.as_str().to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockContent;

    fn collection() -> BlockCollection {
        BlockCollection::from_blocks(vec![
            Block::new("c", BlockContent::paragraph("c"), "X"),
            Block::new("a", BlockContent::paragraph("a"), "F"),
            Block::new("b", BlockContent::paragraph("b"), "P"),
        ])
    }

    fn ids(collection: &BlockCollection) -> Vec<&str> {
        collection.iter().map(|block| block.id().as_str()).collect()
    }

    #[test]
    fn test_sorted_on_insert() {
        let collection = collection();
        assert_eq!(ids(&collection), vec!["a", "b", "c"]);
        assert_eq!(collection.previous(&BlockId::new("b")).map(|b| b.id().as_str()), Some("a"));
        assert_eq!(collection.next(&BlockId::new("c")), None);
    }

    #[test]
    fn test_key_for_positions() {
        let collection = collection();
        let after_a = collection.key_for(&BlockPosition::After(BlockId::new("a")), None).unwrap();
        assert!(after_a.as_str() > "F" && after_a.as_str() < "P");

        let start = collection.key_for(&BlockPosition::Start, None).unwrap();
        assert!(start.as_str() < "F");
        let end = collection.key_for(&BlockPosition::End, None).unwrap();
        assert!(end.as_str() > "X");

        let before_a = collection.key_for(&BlockPosition::Before(BlockId::new("a")), None).unwrap();
        assert!(before_a.as_str() < "F");
    }

    #[test]
    fn test_exclude_moving_block() {
        let collection = collection();
        let (before, after) = collection
            .neighbor_keys(&BlockPosition::After(BlockId::new("a")), Some(&BlockId::new("b")))
            .unwrap();
        assert_eq!(before.as_deref(), Some("F"));
        assert_eq!(after.as_deref(), Some("X"));
    }

    #[test]
    fn test_unknown_anchor() {
        let collection = collection();
        assert!(collection
            .key_for(&BlockPosition::After(BlockId::new("zz")), None)
            .is_err());
    }

    #[test]
    fn test_restore_keeps_client_id() {
        let mut collection = collection();
        let removed = collection.remove(&BlockId::new("b")).unwrap();
        let client_id = removed.client_id;
        collection.restore(removed);
        assert_eq!(ids(&collection), vec!["a", "b", "c"]);
        assert_eq!(collection.get(&BlockId::new("b")).map(|b| b.client_id), Some(client_id));
    }
}
