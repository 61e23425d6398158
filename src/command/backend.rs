//! 永続化ポート
//!
//! ブロックの作成・更新・削除・並べ替えを外部へ送る。
//! `MemoryBackend` はプロセス内で完結する実装で、失敗の注入ができる

use crate::error::{BlockcaretError, PersistenceError, Result};
use crate::model::{parse_block_content, Block, BlockId, BlockKind};
use std::collections::HashMap;

/// 更新内容。`None` の項目は変更しない
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockPatch {
    pub kind: Option<BlockKind>,
    /// 文字列化済みの内容
    pub content: Option<String>,
    pub heading_level: Option<u8>,
}

pub trait BlockBackend {
    fn create_block(
        &mut self,
        book_id: &str,
        kind: BlockKind,
        serialized_content: &str,
        heading_level: Option<u8>,
        order_key: &str,
    ) -> Result<Block>;

    fn update_block(&mut self, id: &BlockId, patch: &BlockPatch) -> Result<Block>;

    fn delete_block(&mut self, id: &BlockId) -> Result<()>;

    fn reorder_block(&mut self, id: &BlockId, order_key: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    Create,
    Update,
    Delete,
    Reorder,
}

impl BackendOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendOp::Create => "create",
            BackendOp::Update => "update",
            BackendOp::Delete => "delete",
            BackendOp::Reorder => "reorder",
        }
    }
}

/// 受け付けた呼び出しの記録
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCall {
    pub op: BackendOp,
    pub id: String,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    blocks: HashMap<String, Block>,
    book_id: Option<String>,
    next_id: u64,
    simulate_write_error: bool,
    fail_next: Vec<BackendOp>,
    calls: Vec<BackendCall>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 既存のブロックを持った状態で作る
    pub fn with_blocks(blocks: Vec<Block>) -> Self {
        let mut backend = Self::new();
        for block in blocks {
            backend.blocks.insert(block.id.as_str().to_string(), block);
        }
        backend
    }

    /// すべての書き込みを失敗させる
    pub fn set_simulate_write_error(&mut self, simulate: bool) {
        self.simulate_write_error = simulate;
    }

    /// 次の `op` 呼び出しを一度だけ失敗させる
    pub fn fail_next(&mut self, op: BackendOp) {
        self.fail_next.push(op);
    }

    /// 成功した呼び出しの履歴
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.get(id.as_str())
    }

    pub fn book_id(&self) -> Option<&str> {
        self.book_id.as_deref()
    }

    /// 順序キー順のブロック一覧
    pub fn blocks(&self) -> Vec<Block> {
        let mut blocks: Vec<Block> = self.blocks.values().cloned().collect();
        blocks.sort_by(|a, b| a.order_key.cmp(&b.order_key));
        blocks
    }

    fn check(&mut self, op: BackendOp) -> Result<()> {
        if self.simulate_write_error {
            return Err(BlockcaretError::rejected(op.as_str(), "simulated write error"));
        }
        if let Some(position) = self.fail_next.iter().position(|pending| *pending == op) {
            self.fail_next.remove(position);
            return Err(BlockcaretError::rejected(op.as_str(), "simulated failure"));
        }
        Ok(())
    }

    fn record(&mut self, op: BackendOp, id: &str) {
        self.calls.push(BackendCall {
            op,
            id: id.to_string(),
        });
    }

    fn missing(op: BackendOp, id: &BlockId) -> BlockcaretError {
        PersistenceError::Rejected {
            operation: op.as_str().to_string(),
            reason: format!("unknown block {}", id),
        }
        .into()
    }
}

impl BlockBackend for MemoryBackend {
    fn create_block(
        &mut self,
        book_id: &str,
        kind: BlockKind,
        serialized_content: &str,
        heading_level: Option<u8>,
        order_key: &str,
    ) -> Result<Block> {
        self.check(BackendOp::Create)?;
        self.next_id += 1;
        let id = format!("blk-{}", self.next_id);

        let mut block = Block::new(
            id.as_str(),
            parse_block_content(kind, serialized_content),
            order_key,
        );
        if heading_level.is_some() {
            block.heading_level = heading_level;
        }
        self.book_id = Some(book_id.to_string());
        self.blocks.insert(id.clone(), block.clone());
        self.record(BackendOp::Create, &id);
        Ok(block)
    }

    fn update_block(&mut self, id: &BlockId, patch: &BlockPatch) -> Result<Block> {
        self.check(BackendOp::Update)?;
        let block = self
            .blocks
            .get_mut(id.as_str())
            .ok_or_else(|| Self::missing(BackendOp::Update, id))?;

        let kind = patch.kind.unwrap_or_else(|| block.kind());
        if let Some(serialized) = &patch.content {
            block.content = parse_block_content(kind, serialized);
        }
        if patch.heading_level.is_some() {
            block.heading_level = patch.heading_level;
        }
        let block = block.clone();
        self.record(BackendOp::Update, id.as_str());
        Ok(block)
    }

    fn delete_block(&mut self, id: &BlockId) -> Result<()> {
        self.check(BackendOp::Delete)?;
        self.blocks
            .remove(id.as_str())
            .ok_or_else(|| Self::missing(BackendOp::Delete, id))?;
        self.record(BackendOp::Delete, id.as_str());
        Ok(())
    }

    fn reorder_block(&mut self, id: &BlockId, order_key: &str) -> Result<()> {
        self.check(BackendOp::Reorder)?;
        let block = self
            .blocks
            .get_mut(id.as_str())
            .ok_or_else(|| Self::missing(BackendOp::Reorder, id))?;
        block.order_key = order_key.to_string();
        self.record(BackendOp::Reorder, id.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{serialize_block_content, BlockContent};

    #[test]
    fn test_create_assigns_server_id() {
        let mut backend = MemoryBackend::new();
        let content = serialize_block_content(&BlockContent::paragraph("hi"));
        let block = backend
            .create_block("book", BlockKind::Paragraph, &content, None, "V")
            .unwrap();
        assert_eq!(block.id.as_str(), "blk-1");
        assert_eq!(block.content, BlockContent::paragraph("hi"));
        assert_eq!(backend.book_id(), Some("book"));
        assert_eq!(backend.calls().len(), 1);
    }

    #[test]
    fn test_fail_next_is_one_shot() {
        let mut backend = MemoryBackend::with_blocks(vec![Block::new("a", BlockContent::paragraph(""), "V")]);
        backend.fail_next(BackendOp::Delete);
        let id = BlockId::new("a");
        assert!(matches!(
            backend.delete_block(&id),
            Err(BlockcaretError::Persistence(PersistenceError::Rejected { .. }))
        ));
        assert!(backend.delete_block(&id).is_ok());
        assert!(backend.get(&id).is_none());
    }

    #[test]
    fn test_simulated_write_error() {
        let mut backend = MemoryBackend::with_blocks(vec![Block::new("a", BlockContent::paragraph(""), "V")]);
        backend.set_simulate_write_error(true);
        assert!(backend.reorder_block(&BlockId::new("a"), "W").is_err());
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_update_reparses_with_new_kind() {
        let mut backend = MemoryBackend::with_blocks(vec![Block::new("a", BlockContent::paragraph("x"), "V")]);
        let patch = BlockPatch {
            kind: Some(BlockKind::Quote),
            content: Some(r#"{"text":"x"}"#.to_string()),
            heading_level: None,
        };
        let block = backend.update_block(&BlockId::new("a"), &patch).unwrap();
        assert_eq!(block.kind(), BlockKind::Quote);
    }
}
