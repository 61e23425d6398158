//! 文書エディタ
//!
//! ブロックごとのビューを持ち、キー判定の結果をブロックコマンドへつなぐ。
//! 編集中のブロックは常に一つで、それ以外は読み取り専用で描画される

use super::primitive::{BlockEditor, ClickOutcome, KeyOutcome, Navigation};
use super::rows::{RowController, RowFlavor, RowHost, RowKeyOutcome};
use crate::command::{BlockBackend, BlockCommandService, BlockCollection, BlockPosition, FocusTarget, GuardIntent, GuardOutcome};
use crate::config::EditorConfig;
use crate::error::Result;
use crate::keyboard::{decide, Key, KeyCode, KeyboardAction};
use crate::model::{default_content, BlockContent, BlockId, BlockKind, ClientId, RenderableBlock, RowItem};
use crate::session::{CaretEdge, EditorSession, FocusKind, FocusPayload};
use crate::surface::{CaretRect, Point, TextSurface};
use crate::text::{char_len, detect_markdown_shortcut};
use std::collections::{HashMap, HashSet};

/// ブロック一つ分のビュー
#[derive(Debug)]
pub enum BlockView<S> {
    Text { kind: BlockKind, editor: BlockEditor<S> },
    Rows(RowController<S>),
    Divider,
}

impl<S: TextSurface + Default> BlockView<S> {
    fn build(block: &RenderableBlock, config: &EditorConfig) -> Self {
        let delay = config.commit_debounce();
        let kind = block.kind();
        if let Some(flavor) = RowFlavor::from_kind(kind) {
            let rows = block.block.content.rows().unwrap_or_default();
            return BlockView::Rows(RowController::new(
                block.id().clone(),
                flavor,
                rows,
                config.confirm_list_exit,
                delay,
            ));
        }
        if kind == BlockKind::Divider {
            return BlockView::Divider;
        }
        let id = block.id().as_str();
        let text = block.block.content.primary_text().unwrap_or_default();
        BlockView::Text {
            kind,
            editor: BlockEditor::new(id, id, S::default(), text, delay),
        }
    }

    fn matches(&self, kind: BlockKind) -> bool {
        match self {
            BlockView::Text { kind: current, .. } => *current == kind,
            BlockView::Rows(rows) => rows.flavor().block_kind() == kind,
            BlockView::Divider => kind == BlockKind::Divider,
        }
    }

    /// 同一性が変わったときだけ面を書き直す
    fn sync(&mut self, block: &RenderableBlock) {
        match self {
            BlockView::Text { editor, .. } => {
                let id = block.id().as_str();
                let text = block.block.content.primary_text().unwrap_or_default();
                editor.sync_external(id, id, text);
            }
            BlockView::Rows(rows) => {
                rows.rebind(block.id().clone());
                if let Some(items) = block.block.content.rows() {
                    rows.sync_rows(items);
                }
            }
            BlockView::Divider => {}
        }
    }

    fn set_read_only(&mut self, read_only: bool) {
        match self {
            BlockView::Text { editor, .. } => editor.set_read_only(read_only),
            BlockView::Rows(rows) => rows.set_read_only(read_only),
            BlockView::Divider => {}
        }
    }

    /// 保留中のコミットを捨てて破棄する
    fn discard(&mut self, session: &mut EditorSession) {
        match self {
            BlockView::Text { editor, .. } => {
                editor.blur(session);
            }
            BlockView::Rows(rows) => rows.blur_all(session, &mut RowEffects::default()),
            BlockView::Divider => {}
        }
    }

    /// 描画に使う行数
    pub fn height(&self) -> u16 {
        let lines = match self {
            BlockView::Text { editor, .. } => line_count(editor.text()),
            BlockView::Rows(rows) => rows
                .editors()
                .iter()
                .map(|editor| line_count(editor.text()))
                .sum(),
            BlockView::Divider => 1,
        };
        u16::try_from(lines).unwrap_or(u16::MAX)
    }

    fn place(&mut self, y: u16) {
        match self {
            BlockView::Text { editor, .. } => editor.surface_mut().set_origin(Point::new(0, y)),
            BlockView::Rows(rows) => {
                let mut row_y = y;
                for index in 0..rows.editors().len() {
                    if let Some(editor) = rows.editor_mut(index) {
                        editor.surface_mut().set_origin(Point::new(0, row_y));
                        let height = u16::try_from(line_count(editor.text())).unwrap_or(u16::MAX);
                        row_y = row_y.saturating_add(height);
                    }
                }
            }
            BlockView::Divider => {}
        }
    }

    pub fn caret_rect(&self) -> Option<CaretRect> {
        match self {
            BlockView::Text { editor, .. } => editor.caret_rect(),
            BlockView::Rows(rows) => rows
                .active_row()
                .and_then(|index| rows.editors().get(index))
                .and_then(BlockEditor::caret_rect),
            BlockView::Divider => None,
        }
    }

    /// 編集中の最新テキスト。行は改行でつなぐ
    pub fn text(&self) -> String {
        match self {
            BlockView::Text { editor, .. } => editor.text().to_string(),
            BlockView::Rows(rows) => rows
                .editors()
                .iter()
                .map(BlockEditor::text)
                .collect::<Vec<_>>()
                .join("\n"),
            BlockView::Divider => String::new(),
        }
    }
}

fn line_count(text: &str) -> usize {
    text.split('\n').count()
}

/// 画面上のブロックの位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSlot {
    pub client_id: ClientId,
    pub y: u16,
    pub height: u16,
}

/// 行コントローラーからの依頼を溜めておき、後でまとめて実行する
#[derive(Debug, Default)]
struct RowEffects {
    persist: Option<Vec<RowItem>>,
    exit_edit: bool,
    delete_empty: bool,
    create_below: bool,
    navigate: Option<Navigation>,
}

impl RowHost for RowEffects {
    fn persist_items(&mut self, _block_id: &BlockId, rows: &[RowItem]) {
        self.persist = Some(rows.to_vec());
    }

    fn exit_edit(&mut self, _block_id: &BlockId) {
        self.exit_edit = true;
    }

    fn delete_empty_block(&mut self, _block_id: &BlockId) {
        self.delete_empty = true;
    }

    fn create_sibling_below(&mut self, _block_id: &BlockId) {
        self.create_below = true;
    }

    fn navigate(&mut self, _block_id: &BlockId, direction: Navigation) {
        self.navigate = Some(direction);
    }
}

#[derive(Debug)]
enum PendingCommit {
    Text(String),
    Rows(Vec<RowItem>),
}

/// ビューでキーを処理した後に文書側で行うこと
#[derive(Debug)]
enum Step {
    Done,
    Action(KeyboardAction),
    Typed { text: String, caret: usize },
    Navigate(Navigation),
    Replay(Key),
    Rows(RowEffects),
}

#[derive(Debug)]
pub struct DocumentEditor<B: BlockBackend, S> {
    session: EditorSession,
    service: BlockCommandService<B>,
    views: HashMap<ClientId, BlockView<S>>,
    layout: Vec<BlockSlot>,
    active: Option<ClientId>,
    last_active: Option<ClientId>,
}

impl<B: BlockBackend, S: TextSurface + Default> DocumentEditor<B, S> {
    pub fn new(session: EditorSession, service: BlockCommandService<B>) -> Self {
        let mut editor = Self {
            session,
            service,
            views: HashMap::new(),
            layout: Vec::new(),
            active: None,
            last_active: None,
        };
        editor.sync_views();
        editor
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EditorSession {
        &mut self.session
    }

    pub fn service(&self) -> &BlockCommandService<B> {
        &self.service
    }

    pub fn collection(&self) -> &BlockCollection {
        self.service.collection()
    }

    pub fn view(&self, client_id: ClientId) -> Option<&BlockView<S>> {
        self.views.get(&client_id)
    }

    pub fn layout(&self) -> &[BlockSlot] {
        &self.layout
    }

    pub fn active_block(&self) -> Option<&RenderableBlock> {
        self.active.and_then(|client| self.collection().by_client(client))
    }

    pub fn is_editing(&self) -> bool {
        self.active.is_some()
    }

    /// 編集中のテキスト（未コミット分を含む）
    pub fn text_of(&self, id: &BlockId) -> Option<String> {
        let block = self.collection().get(id)?;
        self.views.get(&block.client_id).map(BlockView::text)
    }

    pub fn caret_rect(&self) -> Option<CaretRect> {
        self.active
            .and_then(|client| self.views.get(&client))
            .and_then(BlockView::caret_rect)
    }

    /// ブロックの端へキャレットを置く
    pub fn focus_block(&mut self, id: &BlockId, edge: CaretEdge) -> Result<bool> {
        self.session.focus.issue(
            FocusKind::Initial,
            Some(id.as_str()),
            Some(FocusPayload::edge(edge)),
            Some("focus_block"),
        );
        self.apply_focus()
    }

    /// 現在のフォーカス意図を宛先のビューへ適用する
    pub fn apply_focus(&mut self) -> Result<bool> {
        let Some(target) = self
            .session
            .focus
            .current()
            .and_then(|intent| intent.target.clone())
        else {
            return Ok(false);
        };
        let Some(client) = self.client_for_target(&target) else {
            return Ok(false);
        };

        let result = self.activate(client);
        let applied = match self.views.get_mut(&client) {
            Some(BlockView::Text { editor, .. }) => {
                editor.consume_focus_intent(&mut self.session).is_some()
            }
            Some(BlockView::Rows(rows)) => rows.apply_focus(&mut self.session),
            Some(BlockView::Divider) => self.session.focus.take_for(&target).is_some(),
            None => false,
        };
        result.map(|_| applied)
    }

    fn client_for_target(&self, target: &str) -> Option<ClientId> {
        if let Some(block) = self.collection().get(&BlockId::from(target)) {
            return Some(block.client_id);
        }
        self.views.iter().find_map(|(client, view)| match view {
            BlockView::Rows(rows) if rows.index_of(target).is_some() => Some(*client),
            _ => None,
        })
    }

    pub fn handle_key(&mut self, key: Key) -> Result<()> {
        let Some(client) = self.active.or(self.last_active) else {
            return Ok(());
        };
        let Some(block) = self.collection().by_client(client).cloned() else {
            return Ok(());
        };
        let prefer_exit = self.session.config().prefer_exit_for_lonely_empty;

        let step = match self.views.get_mut(&client) {
            Some(BlockView::Text { editor, .. }) => match editor.handle_key(key, &mut self.session) {
                KeyOutcome::Intent(intent) => {
                    let action = decide(intent, &editor.block_context(block.kind(), prefer_exit));
                    if action.is_noop() {
                        editor.apply_default(intent, &mut self.session);
                        Step::Done
                    } else {
                        Step::Action(action)
                    }
                }
                KeyOutcome::Edited(Some(text)) if key.code == KeyCode::Char(' ') => Step::Typed {
                    text,
                    caret: editor.caret_offset().unwrap_or(0),
                },
                KeyOutcome::Navigate(direction) => Step::Navigate(direction),
                KeyOutcome::RequestEdit { replay } => Step::Replay(replay),
                KeyOutcome::Edited(_) | KeyOutcome::Ignored => Step::Done,
            },
            Some(BlockView::Rows(rows)) => {
                let mut effects = RowEffects::default();
                match rows.handle_key(key, &mut self.session, &mut effects) {
                    RowKeyOutcome::RequestEdit { replay } => Step::Replay(replay),
                    RowKeyOutcome::Handled(_) => Step::Rows(effects),
                }
            }
            Some(BlockView::Divider) => match key.code {
                KeyCode::Backspace | KeyCode::Delete => Step::Action(KeyboardAction::DeleteBlock),
                KeyCode::Enter => Step::Action(KeyboardAction::CreateBelow),
                KeyCode::Up => Step::Navigate(Navigation::Previous),
                KeyCode::Down => Step::Navigate(Navigation::Next),
                _ => Step::Done,
            },
            None => Step::Done,
        };

        let result = match step {
            Step::Done => Ok(()),
            Step::Action(action) => self.run_action(client, &block, action),
            Step::Typed { text, caret } => self.apply_shortcut(&block, &text, caret).map(|_| ()),
            Step::Navigate(direction) => {
                self.navigate(block.id(), direction);
                Ok(())
            }
            Step::Replay(replay) => return self.enter_edit_and_replay(client, &block, replay),
            Step::Rows(effects) => self.run_row_effects(&block, effects),
        };
        self.sync_views();
        let focused = self.apply_focus();
        result.and(focused.map(|_| ()))
    }

    /// 読み取り専用で受けたキーを、編集を始めてから再送する
    fn enter_edit_and_replay(&mut self, client: ClientId, block: &RenderableBlock, replay: Key) -> Result<()> {
        log::debug!("entering edit mode on {} to replay {:?}", block.id(), replay.code);
        self.activate(client)?;
        self.session.focus.issue(
            FocusKind::Keyboard,
            Some(block.id().as_str()),
            Some(FocusPayload::edge(CaretEdge::End)),
            Some("request_edit"),
        );
        self.apply_focus()?;
        self.handle_key(replay)
    }

    fn run_action(&mut self, client: ClientId, block: &RenderableBlock, action: KeyboardAction) -> Result<()> {
        let id = block.id().clone();
        match action {
            KeyboardAction::Split => {
                let Some(BlockView::Text { editor, .. }) = self.views.get_mut(&client) else {
                    return Ok(());
                };
                let (before, after) = editor.split_at_caret();
                let full = editor.text().to_string();
                editor.set_text(&before);

                // 新しいブロックができるまで元のブロックは書き換えない
                let created = self.service.create_block(
                    &mut self.session.focus,
                    Some(BlockKind::Paragraph),
                    Some(BlockContent::paragraph(after)),
                    BlockPosition::After(id),
                    Some(CaretEdge::Start),
                );
                match created {
                    Ok(_) => self.commit(client, PendingCommit::Text(before)),
                    Err(err) => {
                        log::warn!("split of {} failed, restoring text", block.id());
                        if let Some(BlockView::Text { editor, .. }) = self.views.get_mut(&client) {
                            editor.set_text(&full);
                            editor.place_caret(char_len(&before), &mut self.session);
                        }
                        self.commit(client, PendingCommit::Text(full))?;
                        Err(err)
                    }
                }
            }
            KeyboardAction::CreateBelow => {
                self.create_below(&id)?;
                Ok(())
            }
            KeyboardAction::ExitEdit => self.exit_edit(),
            KeyboardAction::DeleteBlock => self.guarded_delete(&id, true).map(|_| ()),
            _ => Ok(()),
        }
    }

    fn create_below(&mut self, id: &BlockId) -> Result<BlockId> {
        self.service.create_block(
            &mut self.session.focus,
            Some(BlockKind::Paragraph),
            None,
            BlockPosition::After(id.clone()),
            Some(CaretEdge::Start),
        )
    }

    /// 段落の先頭で記号の直後に空白を打ったらブロックを変換する
    fn apply_shortcut(&mut self, block: &RenderableBlock, text: &str, caret: usize) -> Result<bool> {
        if block.kind() != BlockKind::Paragraph || caret == 0 {
            return Ok(false);
        }
        if text.chars().nth(caret - 1) != Some(' ') {
            return Ok(false);
        }
        let marker: String = text.chars().take(caret - 1).collect();
        let Some(shortcut) = detect_markdown_shortcut(&marker, caret - 1) else {
            return Ok(false);
        };
        let rest: String = text.chars().skip(caret).collect();
        log::debug!("markdown shortcut {:?} on {}", shortcut.kind, block.id());

        let content = match shortcut.kind {
            kind if kind.has_rows() => {
                let mut row = RowItem::with_text(rest.clone());
                row.checked = shortcut.checked;
                default_content(kind).with_rows(vec![row])
            }
            BlockKind::Divider => BlockContent::Divider,
            kind => BlockContent::with_text(kind, rest.clone()),
        };
        self.service.transform_block(
            block.id(),
            shortcut.kind,
            Some(content),
            shortcut.heading_level,
        )?;

        if shortcut.kind == BlockKind::Divider {
            self.service.create_block(
                &mut self.session.focus,
                Some(BlockKind::Paragraph),
                Some(BlockContent::paragraph(rest)),
                BlockPosition::After(block.id().clone()),
                Some(CaretEdge::Start),
            )?;
        } else {
            self.session.focus.issue(
                FocusKind::Keyboard,
                Some(block.id().as_str()),
                Some(FocusPayload::edge(CaretEdge::Start)),
                Some("markdown_shortcut"),
            );
        }
        Ok(true)
    }

    fn run_row_effects(&mut self, block: &RenderableBlock, effects: RowEffects) -> Result<()> {
        let id = block.id().clone();
        let mut result = Ok(());
        if let Some(rows) = effects.persist {
            result = self.commit(block.client_id, PendingCommit::Rows(rows));
        }
        if effects.exit_edit {
            result = result.and(self.exit_edit());
        }
        if effects.delete_empty {
            result = result.and(self.guarded_delete(&id, false).map(|_| ()));
        }
        if effects.create_below {
            result = result.and(self.create_below(&id).map(|_| ()));
        }
        if let Some(direction) = effects.navigate {
            self.navigate(&id, direction);
        }
        result
    }

    /// 文書が空にならないよう守りつつ削除する
    ///
    /// フォーカスは前のブロックの末尾、なければ次のブロックの先頭へ
    fn guarded_delete(&mut self, id: &BlockId, allow_downgrade: bool) -> Result<GuardOutcome> {
        let collection = self.collection();
        let fallback = collection
            .previous(id)
            .map(|block| FocusTarget::end(block.id().clone()))
            .or_else(|| collection.next(id).map(|block| FocusTarget::start(block.id().clone())));

        let outcome = self.service.delete_block_with_guard(
            &mut self.session.focus,
            id,
            GuardIntent {
                allow_downgrade,
                fallback,
            },
        )?;
        if outcome == GuardOutcome::Cleared {
            let client = self.collection().get(id).map(|block| block.client_id);
            if let Some(BlockView::Text { editor, .. }) = client.and_then(|client| self.views.get_mut(&client)) {
                editor.set_text("");
            }
        }
        log::debug!("guarded delete of {}: {:?}", id, outcome);
        Ok(outcome)
    }

    fn navigate(&mut self, id: &BlockId, direction: Navigation) {
        let collection = self.collection();
        let target = match direction {
            Navigation::Previous => collection
                .previous(id)
                .map(|block| FocusTarget::end(block.id().clone())),
            Navigation::Next => collection
                .next(id)
                .map(|block| FocusTarget::start(block.id().clone())),
        };
        if let Some(target) = target {
            self.session.focus.issue(
                FocusKind::Keyboard,
                Some(target.id.as_str()),
                Some(target.payload),
                Some("block_navigate"),
            );
        }
    }

    /// 画面上の点でのクリック。読み取り専用のブロックは編集を始めてから置き直す
    pub fn click(&mut self, point: Point) -> Result<ClickOutcome> {
        let Some(slot) = self
            .layout
            .iter()
            .find(|slot| point.y >= slot.y && point.y < slot.y.saturating_add(slot.height))
            .copied()
        else {
            return Ok(ClickOutcome::Missed);
        };

        let outcome = self.click_view(slot.client_id, point);
        if outcome != ClickOutcome::RequestEdit {
            return Ok(outcome);
        }
        self.activate(slot.client_id)?;
        Ok(self.click_view(slot.client_id, point))
    }

    fn click_view(&mut self, client: ClientId, point: Point) -> ClickOutcome {
        match self.views.get_mut(&client) {
            Some(BlockView::Text { editor, .. }) => editor.click(point, &mut self.session),
            Some(BlockView::Rows(rows)) => match rows.row_at(point) {
                Some(index) => rows.click_row(index, point, &mut self.session),
                None => ClickOutcome::Missed,
            },
            Some(BlockView::Divider) if self.active == Some(client) => ClickOutcome::Placed(0),
            Some(BlockView::Divider) => ClickOutcome::RequestEdit,
            None => ClickOutcome::Missed,
        }
    }

    /// 編集中の TODO 行のチェックを反転する
    pub fn toggle_checked(&mut self) -> Result<Option<bool>> {
        let Some(client) = self.active else {
            return Ok(None);
        };
        let mut effects = RowEffects::default();
        let toggled = match self.views.get_mut(&client) {
            Some(BlockView::Rows(rows)) => rows
                .active_row()
                .and_then(|index| rows.toggle_checked(index, &mut effects)),
            _ => None,
        };
        if let Some(rows) = effects.persist {
            self.commit(client, PendingCommit::Rows(rows))?;
        }
        Ok(toggled)
    }

    /// 編集中のブロックを上下へ移動する
    pub fn move_active(&mut self, direction: Navigation) -> Result<bool> {
        let Some(block) = self.active_block().cloned() else {
            return Ok(false);
        };
        let collection = self.collection();
        let position = match direction {
            Navigation::Previous => collection
                .previous(block.id())
                .map(|neighbor| BlockPosition::Before(neighbor.id().clone())),
            Navigation::Next => collection
                .next(block.id())
                .map(|neighbor| BlockPosition::After(neighbor.id().clone())),
        };
        let Some(position) = position else {
            return Ok(false);
        };
        let result = self.service.move_block(block.id(), position);
        self.sync_views();
        result.map(|_| true)
    }

    /// 遅延コミットの期限処理と、期限切れの意図の掃除
    pub fn tick(&mut self) -> Result<()> {
        let now = self.session.now();
        let mut pending = Vec::new();
        for (client, view) in self.views.iter_mut() {
            match view {
                BlockView::Text { editor, .. } => {
                    if let Some(text) = editor.poll_commit(now) {
                        pending.push((*client, PendingCommit::Text(text)));
                    }
                }
                BlockView::Rows(rows) => {
                    let mut effects = RowEffects::default();
                    rows.tick(&mut self.session, &mut effects);
                    if let Some(items) = effects.persist {
                        pending.push((*client, PendingCommit::Rows(items)));
                    }
                }
                BlockView::Divider => {}
            }
        }

        let mut result = Ok(());
        for (client, commit) in pending {
            result = result.and(self.commit(client, commit));
        }
        self.session.focus.expire();
        result.and(self.apply_focus().map(|_| ()))
    }

    /// 編集を終える。保留中のコミットは永続化する
    pub fn exit_edit(&mut self) -> Result<()> {
        let Some(client) = self.active.take() else {
            return Ok(());
        };
        let pending = match self.views.get_mut(&client) {
            Some(BlockView::Text { editor, .. }) => {
                let pending = editor.blur(&mut self.session).map(PendingCommit::Text);
                editor.set_read_only(true);
                pending
            }
            Some(BlockView::Rows(rows)) => {
                let mut effects = RowEffects::default();
                rows.blur_all(&mut self.session, &mut effects);
                rows.set_read_only(true);
                effects.persist.map(PendingCommit::Rows)
            }
            _ => None,
        };
        match pending {
            Some(commit) => self.commit(client, commit),
            None => Ok(()),
        }
    }

    fn activate(&mut self, client: ClientId) -> Result<()> {
        if self.active == Some(client) {
            return Ok(());
        }
        let result = self.exit_edit();
        self.active = Some(client);
        self.last_active = Some(client);
        if let Some(view) = self.views.get_mut(&client) {
            view.set_read_only(false);
        }
        result
    }

    fn commit(&mut self, client: ClientId, pending: PendingCommit) -> Result<()> {
        let Some(block) = self.collection().by_client(client).cloned() else {
            return Ok(());
        };
        let content = match pending {
            PendingCommit::Text(text) => {
                let mut content = block.block.content.clone();
                if !content.replace_primary_text(text) {
                    log::debug!("dropping text commit for {} block {}", block.kind(), block.id());
                    return Ok(());
                }
                content
            }
            PendingCommit::Rows(rows) if block.kind().has_rows() => block.block.content.clone().with_rows(rows),
            PendingCommit::Rows(_) => return Ok(()),
        };
        if content == block.block.content {
            return Ok(());
        }
        let result = self.service.update_content(block.id(), content);
        self.sync_views();
        result
    }

    /// コレクションとビューを突き合わせ、配置を計算し直す
    fn sync_views(&mut self) {
        let blocks = self.service.collection().blocks().to_vec();
        let live: HashSet<ClientId> = blocks.iter().map(|block| block.client_id).collect();

        let session = &mut self.session;
        self.views.retain(|client, view| {
            let keep = live.contains(client);
            if !keep {
                view.discard(session);
            }
            keep
        });
        if self.active.is_some_and(|client| !live.contains(&client)) {
            self.active = None;
        }
        if self.last_active.is_some_and(|client| !live.contains(&client)) {
            self.last_active = None;
        }

        for block in &blocks {
            let stale = self
                .views
                .get(&block.client_id)
                .map_or(true, |view| !view.matches(block.kind()));
            if stale {
                if let Some(mut old) = self.views.remove(&block.client_id) {
                    old.discard(&mut self.session);
                }
                self.views
                    .insert(block.client_id, BlockView::build(block, self.session.config()));
            } else if let Some(view) = self.views.get_mut(&block.client_id) {
                view.sync(block);
            }
        }

        self.layout.clear();
        let mut y = 0u16;
        for block in &blocks {
            let read_only = self.active != Some(block.client_id);
            if let Some(view) = self.views.get_mut(&block.client_id) {
                view.set_read_only(read_only);
                view.place(y);
                let height = view.height();
                self.layout.push(BlockSlot {
                    client_id: block.client_id,
                    y,
                    height,
                });
                y = y.saturating_add(height);
            }
        }
    }
}
