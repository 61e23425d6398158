//! 楽観的更新のコマンドオブジェクト
//!
//! どの変更も `apply`（ローカルへ即時反映）→ `request`（永続化）→
//! `confirm` または `rollback` の順に流れる。ロールバックは
//! `apply` が記録した直前の状態だけを使って元に戻す

use super::backend::{BlockBackend, BlockPatch};
use super::collection::{BlockCollection, BlockPosition};
use crate::error::{BlockError, Result};
use crate::model::{
    clamp_heading_level, default_content, serialize_block_content, Block, BlockContent, BlockId,
    BlockKind, RenderableBlock,
};

pub trait BlockMutation {
    /// ログ用の名前
    fn label(&self) -> &'static str;

    /// ローカルコレクションへ楽観的に反映する
    fn apply(&mut self, collection: &mut BlockCollection) -> Result<()>;

    /// 永続化要求。応答のブロックがあれば返す
    fn request(&mut self, backend: &mut dyn BlockBackend, book_id: &str) -> Result<Option<Block>>;

    /// 応答をローカルへ取り込む
    fn confirm(&mut self, collection: &mut BlockCollection, response: Option<Block>);

    /// `apply` を取り消す
    fn rollback(&mut self, collection: &mut BlockCollection);
}

fn heading_level_for(kind: BlockKind, requested: Option<u8>) -> Option<u8> {
    match kind {
        BlockKind::Heading => Some(clamp_heading_level(requested.unwrap_or(1))),
        _ => None,
    }
}

/// 一時 ID で先に挿入し、確定後にサーバー ID へ差し替える
#[derive(Debug, Clone)]
pub struct CreateMutation {
    temp_id: BlockId,
    server_id: Option<BlockId>,
    content: BlockContent,
    heading_level: Option<u8>,
    position: BlockPosition,
    order_key: Option<String>,
}

impl CreateMutation {
    pub fn new(kind: BlockKind, content: Option<BlockContent>, position: BlockPosition) -> Self {
        let content = content
            .filter(|content| content.kind() == kind)
            .unwrap_or_else(|| default_content(kind));
        Self {
            temp_id: BlockId::temporary(),
            server_id: None,
            content,
            heading_level: heading_level_for(kind, None),
            position,
            order_key: None,
        }
    }

    pub fn with_heading_level(mut self, level: Option<u8>) -> Self {
        self.heading_level = heading_level_for(self.content.kind(), level);
        self
    }

    pub fn temp_id(&self) -> &BlockId {
        &self.temp_id
    }

    /// 確定していればサーバー ID、まだなら一時 ID
    pub fn id(&self) -> &BlockId {
        self.server_id.as_ref().unwrap_or(&self.temp_id)
    }

    pub fn is_confirmed(&self) -> bool {
        self.server_id.is_some()
    }

    pub fn kind(&self) -> BlockKind {
        self.content.kind()
    }

    pub fn order_key(&self) -> Option<&str> {
        self.order_key.as_deref()
    }
}

impl BlockMutation for CreateMutation {
    fn label(&self) -> &'static str {
        "create_block"
    }

    fn apply(&mut self, collection: &mut BlockCollection) -> Result<()> {
        let order_key = collection.key_for(&self.position, None)?;
        collection.insert(Block {
            id: self.temp_id.clone(),
            content: self.content.clone(),
            order_key: order_key.clone(),
            heading_level: self.heading_level,
        });
        self.order_key = Some(order_key);
        Ok(())
    }

    fn request(&mut self, backend: &mut dyn BlockBackend, book_id: &str) -> Result<Option<Block>> {
        let order_key = self.order_key.as_deref().unwrap_or_default();
        let created = backend.create_block(
            book_id,
            self.content.kind(),
            &serialize_block_content(&self.content),
            self.heading_level,
            order_key,
        )?;
        Ok(Some(created))
    }

    fn confirm(&mut self, collection: &mut BlockCollection, response: Option<Block>) {
        let Some(created) = response else {
            return;
        };
        if let Some(local) = collection.get_mut(&self.temp_id) {
            // 描画キーはそのまま、ID だけ付け替える
            local.block.id = created.id.clone();
        }
        log::debug!("block {} confirmed as {}", self.temp_id, created.id);
        self.server_id = Some(created.id);
    }

    fn rollback(&mut self, collection: &mut BlockCollection) {
        if collection.remove(&self.temp_id).is_some() {
            log::debug!("speculative block {} removed", self.temp_id);
        }
    }
}

/// ブロック削除。唯一のブロックなら先に空段落を作る
#[derive(Debug, Clone)]
pub struct DeleteMutation {
    id: BlockId,
    removed: Option<RenderableBlock>,
    replacement: Option<CreateMutation>,
    replacement_created: Option<Block>,
}

impl DeleteMutation {
    pub fn new(id: BlockId) -> Self {
        Self {
            id,
            removed: None,
            replacement: None,
            replacement_created: None,
        }
    }

    pub fn id(&self) -> &BlockId {
        &self.id
    }

    /// 代わりに作った段落の ID
    pub fn replacement_id(&self) -> Option<&BlockId> {
        self.replacement.as_ref().map(CreateMutation::id)
    }

    pub fn removed(&self) -> Option<&RenderableBlock> {
        self.removed.as_ref()
    }
}

impl BlockMutation for DeleteMutation {
    fn label(&self) -> &'static str {
        "delete_block"
    }

    fn apply(&mut self, collection: &mut BlockCollection) -> Result<()> {
        collection.require(&self.id)?;
        if collection.len() == 1 {
            let mut replacement = CreateMutation::new(
                BlockKind::Paragraph,
                None,
                BlockPosition::After(self.id.clone()),
            );
            replacement.apply(collection)?;
            self.replacement = Some(replacement);
        }
        self.removed = collection.remove(&self.id);
        Ok(())
    }

    fn request(&mut self, backend: &mut dyn BlockBackend, book_id: &str) -> Result<Option<Block>> {
        if let Some(replacement) = self.replacement.as_mut() {
            self.replacement_created = replacement.request(backend, book_id)?;
        }
        if let Err(err) = backend.delete_block(&self.id) {
            // 代わりの段落だけがサーバーに残らないよう取り消す
            if let Some(created) = self.replacement_created.take() {
                if let Err(cleanup) = backend.delete_block(&created.id) {
                    log::warn!("orphaned replacement block {}: {}", created.id, cleanup);
                }
            }
            return Err(err);
        }
        Ok(None)
    }

    fn confirm(&mut self, collection: &mut BlockCollection, _response: Option<Block>) {
        if let Some(replacement) = self.replacement.as_mut() {
            replacement.confirm(collection, self.replacement_created.take());
        }
    }

    fn rollback(&mut self, collection: &mut BlockCollection) {
        if let Some(replacement) = self.replacement.as_mut() {
            replacement.rollback(collection);
        }
        if let Some(removed) = self.removed.take() {
            collection.restore(removed);
        }
    }
}

/// 種別の変換
#[derive(Debug, Clone)]
pub struct TransformMutation {
    id: BlockId,
    content: BlockContent,
    heading_level: Option<u8>,
    prior: Option<(BlockContent, Option<u8>)>,
}

impl TransformMutation {
    /// `content` が `kind` と食い違う場合は既定内容を使う
    pub fn new(
        id: BlockId,
        kind: BlockKind,
        content: Option<BlockContent>,
        heading_level: Option<u8>,
    ) -> Self {
        let content = content
            .filter(|content| content.kind() == kind)
            .unwrap_or_else(|| default_content(kind));
        Self {
            id,
            content,
            heading_level: heading_level_for(kind, heading_level),
            prior: None,
        }
    }

    pub fn id(&self) -> &BlockId {
        &self.id
    }

    pub fn kind(&self) -> BlockKind {
        self.content.kind()
    }

    pub fn prior_kind(&self) -> Option<BlockKind> {
        self.prior.as_ref().map(|(content, _)| content.kind())
    }
}

impl BlockMutation for TransformMutation {
    fn label(&self) -> &'static str {
        "transform_block"
    }

    fn apply(&mut self, collection: &mut BlockCollection) -> Result<()> {
        let local = collection.require_mut(&self.id)?;
        let prior_content = std::mem::replace(&mut local.block.content, self.content.clone());
        let prior_level = std::mem::replace(&mut local.block.heading_level, self.heading_level);
        self.prior = Some((prior_content, prior_level));
        Ok(())
    }

    fn request(&mut self, backend: &mut dyn BlockBackend, _book_id: &str) -> Result<Option<Block>> {
        let patch = BlockPatch {
            kind: Some(self.content.kind()),
            content: Some(serialize_block_content(&self.content)),
            heading_level: self.heading_level,
        };
        backend.update_block(&self.id, &patch).map(Some)
    }

    fn confirm(&mut self, collection: &mut BlockCollection, response: Option<Block>) {
        let (Some(updated), Some(local)) = (response, collection.get_mut(&self.id)) else {
            return;
        };
        if local.kind() != updated.kind() {
            log::debug!(
                "discarding {} response for {}: local kind is now {}",
                updated.kind(),
                self.id,
                local.kind()
            );
            return;
        }
        if local.block.content == self.content {
            local.block.content = updated.content;
        }
        local.block.heading_level = updated.heading_level;
    }

    fn rollback(&mut self, collection: &mut BlockCollection) {
        let Some((content, level)) = self.prior.take() else {
            return;
        };
        if let Some(local) = collection.get_mut(&self.id) {
            local.block.content = content;
            local.block.heading_level = level;
        }
    }
}

/// 同じ種別のまま内容を書き換える（確定済みテキストの保存）
#[derive(Debug, Clone)]
pub struct UpdateContentMutation {
    id: BlockId,
    content: BlockContent,
    prior: Option<BlockContent>,
}

impl UpdateContentMutation {
    pub fn new(id: BlockId, content: BlockContent) -> Self {
        Self {
            id,
            content,
            prior: None,
        }
    }

    pub fn id(&self) -> &BlockId {
        &self.id
    }
}

impl BlockMutation for UpdateContentMutation {
    fn label(&self) -> &'static str {
        "update_content"
    }

    fn apply(&mut self, collection: &mut BlockCollection) -> Result<()> {
        let local = collection.require_mut(&self.id)?;
        if local.kind() != self.content.kind() {
            return Err(BlockError::KindMismatch {
                id: self.id.to_string(),
                expected: self.content.kind().as_str().to_string(),
            }
            .into());
        }
        self.prior = Some(std::mem::replace(
            &mut local.block.content,
            self.content.clone(),
        ));
        Ok(())
    }

    fn request(&mut self, backend: &mut dyn BlockBackend, _book_id: &str) -> Result<Option<Block>> {
        let patch = BlockPatch {
            kind: None,
            content: Some(serialize_block_content(&self.content)),
            heading_level: None,
        };
        backend.update_block(&self.id, &patch).map(Some)
    }

    fn confirm(&mut self, collection: &mut BlockCollection, response: Option<Block>) {
        let (Some(updated), Some(local)) = (response, collection.get_mut(&self.id)) else {
            return;
        };
        if local.kind() != updated.kind() {
            log::debug!(
                "discarding stale {} response for {} (local kind {})",
                updated.kind(),
                self.id,
                local.kind()
            );
            return;
        }
        // 後続の編集で内容が変わっていれば上書きしない
        if local.block.content == self.content {
            local.block.content = updated.content;
        }
    }

    fn rollback(&mut self, collection: &mut BlockCollection) {
        let Some(prior) = self.prior.take() else {
            return;
        };
        match collection.get_mut(&self.id) {
            Some(local) if local.block.content == self.content => local.block.content = prior,
            _ => log::debug!("update of {} superseded, nothing to roll back", self.id),
        }
    }
}

/// 並べ替え。順序キーだけを差し替える
#[derive(Debug, Clone)]
pub struct ReorderMutation {
    id: BlockId,
    position: BlockPosition,
    order_key: Option<String>,
    prior_key: Option<String>,
}

impl ReorderMutation {
    pub fn new(id: BlockId, position: BlockPosition) -> Self {
        Self {
            id,
            position,
            order_key: None,
            prior_key: None,
        }
    }

    pub fn order_key(&self) -> Option<&str> {
        self.order_key.as_deref()
    }
}

impl BlockMutation for ReorderMutation {
    fn label(&self) -> &'static str {
        "reorder_block"
    }

    fn apply(&mut self, collection: &mut BlockCollection) -> Result<()> {
        let order_key = collection.key_for(&self.position, Some(&self.id))?;
        let local = collection.require_mut(&self.id)?;
        self.prior_key = Some(std::mem::replace(
            &mut local.block.order_key,
            order_key.clone(),
        ));
        self.order_key = Some(order_key);
        collection.resort();
        Ok(())
    }

    fn request(&mut self, backend: &mut dyn BlockBackend, _book_id: &str) -> Result<Option<Block>> {
        let order_key = self.order_key.as_deref().unwrap_or_default();
        backend.reorder_block(&self.id, order_key)?;
        Ok(None)
    }

    fn confirm(&mut self, _collection: &mut BlockCollection, _response: Option<Block>) {}

    fn rollback(&mut self, collection: &mut BlockCollection) {
        let Some(prior_key) = self.prior_key.take() else {
            return;
        };
        if let Some(local) = collection.get_mut(&self.id) {
            local.block.order_key = prior_key;
        }
        collection.resort();
    }
}
