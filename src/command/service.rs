//! ブロックコマンドサービス
//!
//! 作成・削除・変換・更新・並べ替えを楽観的に反映し、永続化に失敗したら
//! 補償ロールバックする。フォーカス意図の発行もここで行う

use super::backend::BlockBackend;
use super::collection::{BlockCollection, BlockPosition};
use super::mutation::{
    BlockMutation, CreateMutation, DeleteMutation, ReorderMutation, TransformMutation,
    UpdateContentMutation,
};
use crate::error::Result;
use crate::model::{
    default_content, derive_paragraph_text, Block, BlockContent, BlockId, BlockKind,
};
use crate::session::{CaretEdge, FocusIntentBus, FocusKind, FocusPayload};

/// 削除後などにキャレットを移す先
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusTarget {
    pub id: BlockId,
    pub payload: FocusPayload,
}

impl FocusTarget {
    pub fn start(id: BlockId) -> Self {
        Self {
            id,
            payload: FocusPayload::edge(CaretEdge::Start),
        }
    }

    pub fn end(id: BlockId) -> Self {
        Self {
            id,
            payload: FocusPayload::edge(CaretEdge::End),
        }
    }
}

/// ガード付き削除の呼び出し側の意図
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardIntent {
    /// 特殊種別を削除せず段落へ格下げしてよいか
    pub allow_downgrade: bool,
    pub fallback: Option<FocusTarget>,
}

impl Default for GuardIntent {
    fn default() -> Self {
        Self {
            allow_downgrade: true,
            fallback: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// 唯一の空段落。何もしない
    Noop,
    /// 唯一の段落の内容を空にした
    Cleared,
    /// 段落へ格下げした
    Downgraded,
    Deleted,
}

/// `apply` 済みで永続化待ちの変更
#[derive(Debug)]
pub struct Staged<M> {
    mutation: M,
}

impl<M> Staged<M> {
    pub fn mutation(&self) -> &M {
        &self.mutation
    }
}

#[derive(Debug)]
pub struct BlockCommandService<B: BlockBackend> {
    backend: B,
    collection: BlockCollection,
    book_id: String,
}

impl<B: BlockBackend> BlockCommandService<B> {
    pub fn new(backend: B, book_id: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self {
            backend,
            collection: BlockCollection::from_blocks(blocks),
            book_id: book_id.into(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn collection(&self) -> &BlockCollection {
        &self.collection
    }

    pub fn book_id(&self) -> &str {
        &self.book_id
    }

    /// ローカルへ反映だけ行う
    pub fn stage<M: BlockMutation>(&mut self, mut mutation: M) -> Result<Staged<M>> {
        mutation.apply(&mut self.collection)?;
        log::debug!("{} applied locally", mutation.label());
        Ok(Staged { mutation })
    }

    /// 永続化し、結果に応じて確定またはロールバックする
    pub fn finish<M: BlockMutation>(&mut self, staged: Staged<M>) -> Result<M> {
        let mut mutation = staged.mutation;
        match mutation.request(&mut self.backend, &self.book_id) {
            Ok(response) => {
                mutation.confirm(&mut self.collection, response);
                Ok(mutation)
            }
            Err(err) => {
                mutation.rollback(&mut self.collection);
                err.report(mutation.label());
                Err(err)
            }
        }
    }

    pub fn execute<M: BlockMutation>(&mut self, mutation: M) -> Result<M> {
        let staged = self.stage(mutation)?;
        self.finish(staged)
    }

    /// 新しいブロックを作り、その端へフォーカス意図を出す
    pub fn create_block(
        &mut self,
        focus: &mut FocusIntentBus,
        kind: Option<BlockKind>,
        content: Option<BlockContent>,
        position: BlockPosition,
        edge: Option<CaretEdge>,
    ) -> Result<BlockId> {
        let kind = kind
            .or_else(|| content.as_ref().map(BlockContent::kind))
            .unwrap_or(BlockKind::Paragraph);
        let staged = self.stage(CreateMutation::new(kind, content, position))?;
        let token = focus.issue(
            FocusKind::Keyboard,
            Some(staged.mutation().temp_id().as_str()),
            Some(FocusPayload::edge(edge.unwrap_or(CaretEdge::Start))),
            Some("create_block"),
        );

        match self.finish(staged) {
            Ok(created) => {
                retarget(focus, token, created.id());
                Ok(created.id().clone())
            }
            Err(err) => {
                focus.clear(Some(token));
                Err(err)
            }
        }
    }

    /// ブロックを削除し、`fallback` へフォーカス意図を出す
    ///
    /// 唯一のブロックなら代わりの空段落を作り、そちらへ移す
    pub fn delete_block(
        &mut self,
        focus: &mut FocusIntentBus,
        id: &BlockId,
        fallback: Option<FocusTarget>,
    ) -> Result<()> {
        let staged = self.stage(DeleteMutation::new(id.clone()))?;
        let target = staged
            .mutation()
            .replacement_id()
            .map(|replacement| FocusTarget::start(replacement.clone()))
            .or(fallback);
        let token = target.as_ref().map(|target| {
            focus.issue(
                FocusKind::Keyboard,
                Some(target.id.as_str()),
                Some(target.payload),
                Some("delete_block"),
            )
        });

        match self.finish(staged) {
            Ok(deleted) => {
                if let (Some(token), Some(replacement)) = (token, deleted.replacement_id()) {
                    retarget(focus, token, replacement);
                }
                Ok(())
            }
            Err(err) => {
                if let Some(token) = token {
                    focus.clear(Some(token));
                }
                Err(err)
            }
        }
    }

    /// 文書が空にならないよう削除を「消去」「格下げ」に読み替える
    pub fn delete_block_with_guard(
        &mut self,
        focus: &mut FocusIntentBus,
        id: &BlockId,
        intent: GuardIntent,
    ) -> Result<GuardOutcome> {
        let block = self.collection.require(id)?;
        let kind = block.kind();
        let sole = self.collection.len() == 1;

        if sole && kind == BlockKind::Paragraph {
            if block.block.content.is_empty() {
                return Ok(GuardOutcome::Noop);
            }
            self.update_content(id, default_content(BlockKind::Paragraph))?;
            announce(focus, id, CaretEdge::Start, "delete_guard");
            return Ok(GuardOutcome::Cleared);
        }

        if kind.is_special() && (sole || intent.allow_downgrade) {
            let text = derive_paragraph_text(&block.block.content);
            self.transform_block(
                id,
                BlockKind::Paragraph,
                Some(BlockContent::paragraph(text)),
                None,
            )?;
            announce(focus, id, CaretEdge::Start, "delete_guard");
            return Ok(GuardOutcome::Downgraded);
        }

        self.delete_block(focus, id, intent.fallback)?;
        Ok(GuardOutcome::Deleted)
    }

    /// 種別を変える。内容を省略すると種別の既定内容になる
    pub fn transform_block(
        &mut self,
        id: &BlockId,
        kind: BlockKind,
        content: Option<BlockContent>,
        heading_level: Option<u8>,
    ) -> Result<()> {
        self.execute(TransformMutation::new(
            id.clone(),
            kind,
            content,
            heading_level,
        ))?;
        Ok(())
    }

    /// 確定したテキストなどを保存する
    pub fn update_content(&mut self, id: &BlockId, content: BlockContent) -> Result<()> {
        self.execute(UpdateContentMutation::new(id.clone(), content))?;
        Ok(())
    }

    pub fn move_block(&mut self, id: &BlockId, position: BlockPosition) -> Result<()> {
        self.execute(ReorderMutation::new(id.clone(), position))?;
        Ok(())
    }
}

fn announce(focus: &mut FocusIntentBus, id: &BlockId, edge: CaretEdge, source: &str) -> u64 {
    focus.issue(
        FocusKind::Keyboard,
        Some(id.as_str()),
        Some(FocusPayload::edge(edge)),
        Some(source),
    )
}

/// 一時 ID 宛ての意図がまだ有効なら確定 ID 宛てに出し直す
fn retarget(focus: &mut FocusIntentBus, token: u64, id: &BlockId) {
    let Some(intent) = focus.current().filter(|intent| intent.token == token) else {
        return;
    };
    if intent.targets(id.as_str()) {
        return;
    }
    let (kind, payload, source) = (intent.kind, intent.payload, intent.source.clone());
    focus.issue(kind, Some(id.as_str()), payload, source.as_deref());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::backend::{BackendOp, MemoryBackend};
    use crate::model::RowItem;
    use crate::session::ManualClock;
    use std::rc::Rc;

    fn bus() -> FocusIntentBus {
        FocusIntentBus::new(Rc::new(ManualClock::new()), None)
    }

    fn service(blocks: Vec<Block>) -> BlockCommandService<MemoryBackend> {
        BlockCommandService::new(MemoryBackend::with_blocks(blocks.clone()), "book", blocks)
    }

    fn two_paragraphs() -> Vec<Block> {
        vec![
            Block::new("a", BlockContent::paragraph("alpha"), "F"),
            Block::new("b", BlockContent::paragraph("beta"), "P"),
        ]
    }

    #[test]
    fn test_create_block_announces_server_id() {
        let mut focus = bus();
        let mut service = service(two_paragraphs());
        let id = service
            .create_block(
                &mut focus,
                None,
                None,
                BlockPosition::After(BlockId::new("a")),
                Some(CaretEdge::End),
            )
            .unwrap();

        assert!(!id.is_temporary());
        assert_eq!(service.collection().index_of(&id), Some(1));
        let intent = focus.current().unwrap();
        assert!(intent.targets(id.as_str()));
        assert_eq!(intent.payload, Some(FocusPayload::edge(CaretEdge::End)));
    }

    #[test]
    fn test_create_block_failure_clears_intent() {
        let mut focus = bus();
        let mut service = service(two_paragraphs());
        service.backend_mut().fail_next(BackendOp::Create);
        let result = service.create_block(&mut focus, None, None, BlockPosition::End, None);
        assert!(result.is_err());
        assert!(focus.current().is_none());
        assert_eq!(service.collection().len(), 2);
    }

    #[test]
    fn test_delete_block_focuses_fallback() {
        let mut focus = bus();
        let mut service = service(two_paragraphs());
        service
            .delete_block(
                &mut focus,
                &BlockId::new("b"),
                Some(FocusTarget::end(BlockId::new("a"))),
            )
            .unwrap();
        assert_eq!(service.collection().len(), 1);
        assert!(focus.current().unwrap().targets("a"));
    }

    #[test]
    fn test_delete_block_failure_restores() {
        let mut focus = bus();
        let mut service = service(two_paragraphs());
        service.backend_mut().fail_next(BackendOp::Delete);
        let result = service.delete_block(
            &mut focus,
            &BlockId::new("b"),
            Some(FocusTarget::end(BlockId::new("a"))),
        );
        assert!(result.is_err());
        assert_eq!(service.collection().len(), 2);
        assert!(focus.current().is_none());
    }

    #[test]
    fn test_delete_sole_block_focuses_replacement() {
        let mut focus = bus();
        let mut service = service(vec![Block::new("only", default_content(BlockKind::Code), "V")]);
        service.delete_block(&mut focus, &BlockId::new("only"), None).unwrap();

        let remaining = &service.collection().blocks()[0];
        assert_eq!(remaining.kind(), BlockKind::Paragraph);
        assert!(focus.current().unwrap().targets(remaining.id().as_str()));
    }

    #[test]
    fn test_guard_sole_empty_paragraph_is_noop() {
        let mut focus = bus();
        let mut service = service(vec![Block::new("only", BlockContent::paragraph(" "), "V")]);
        let outcome = service
            .delete_block_with_guard(&mut focus, &BlockId::new("only"), GuardIntent::default())
            .unwrap();
        assert_eq!(outcome, GuardOutcome::Noop);
        assert!(service.backend().calls().is_empty());
    }

    #[test]
    fn test_guard_sole_paragraph_is_cleared() {
        let mut focus = bus();
        let mut service = service(vec![Block::new("only", BlockContent::paragraph("text"), "V")]);
        let outcome = service
            .delete_block_with_guard(&mut focus, &BlockId::new("only"), GuardIntent::default())
            .unwrap();
        assert_eq!(outcome, GuardOutcome::Cleared);
        let block = service.collection().get(&BlockId::new("only")).unwrap();
        assert_eq!(block.block.content, BlockContent::paragraph(""));
    }

    #[test]
    fn test_guard_sole_todo_is_downgraded() {
        let mut focus = bus();
        let todo = default_content(BlockKind::TodoList).with_rows(vec![
            RowItem::with_text("one"),
            RowItem::empty(),
            RowItem::with_text("two"),
        ]);
        let mut service = service(vec![Block::new("only", todo, "V")]);
        let outcome = service
            .delete_block_with_guard(
                &mut focus,
                &BlockId::new("only"),
                GuardIntent {
                    allow_downgrade: false,
                    fallback: None,
                },
            )
            .unwrap();

        assert_eq!(outcome, GuardOutcome::Downgraded);
        assert_eq!(service.collection().len(), 1);
        let block = service.collection().get(&BlockId::new("only")).unwrap();
        assert_eq!(block.block.content, BlockContent::paragraph("one\ntwo"));
    }

    #[test]
    fn test_guard_special_without_downgrade_deletes() {
        let mut focus = bus();
        let mut blocks = two_paragraphs();
        blocks.push(Block::new("q", BlockContent::with_text(BlockKind::Quote, "said"), "X"));
        let mut service = service(blocks);
        let outcome = service
            .delete_block_with_guard(
                &mut focus,
                &BlockId::new("q"),
                GuardIntent {
                    allow_downgrade: false,
                    fallback: Some(FocusTarget::end(BlockId::new("b"))),
                },
            )
            .unwrap();
        assert_eq!(outcome, GuardOutcome::Deleted);
        assert!(service.collection().get(&BlockId::new("q")).is_none());
    }

    #[test]
    fn test_guard_special_downgrades_by_default() {
        let mut focus = bus();
        let mut blocks = two_paragraphs();
        blocks.push(Block::new("q", BlockContent::with_text(BlockKind::Quote, "said"), "X"));
        let mut service = service(blocks);
        let outcome = service
            .delete_block_with_guard(&mut focus, &BlockId::new("q"), GuardIntent::default())
            .unwrap();
        assert_eq!(outcome, GuardOutcome::Downgraded);
        let block = service.collection().get(&BlockId::new("q")).unwrap();
        assert_eq!(block.block.content, BlockContent::paragraph("said"));
    }

    #[test]
    fn test_transform_failure_rolls_back() {
        let mut service = service(two_paragraphs());
        service.backend_mut().set_simulate_write_error(true);
        let result = service.transform_block(&BlockId::new("a"), BlockKind::BulletedList, None, None);
        assert!(result.is_err());
        assert_eq!(
            service.collection().get(&BlockId::new("a")).unwrap().kind(),
            BlockKind::Paragraph
        );
    }

    #[test]
    fn test_staged_create_is_visible_before_finish() {
        let mut service = service(two_paragraphs());
        let staged = service
            .stage(CreateMutation::new(BlockKind::Paragraph, None, BlockPosition::Start))
            .unwrap();
        let temp = staged.mutation().temp_id().clone();
        assert_eq!(service.collection().blocks()[0].id(), &temp);

        let created = service.finish(staged).unwrap();
        assert_eq!(service.collection().blocks()[0].id(), created.id());
    }
}
