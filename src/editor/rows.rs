//! 行コレクション（リスト・TODO）
//!
//! 行ごとに編集プリミティブを持ち、判定エンジンの結果を
//! 行の挿入・削除・退出に変換する。行間のキャレット移動は
//! フォーカス意図バス経由で行う

use super::primitive::{BlockEditor, ClickOutcome, KeyOutcome, Navigation};
use crate::keyboard::{decide, Key, KeyIntent, KeyboardAction, KeyboardContext, ListKind};
use crate::model::{BlockId, BlockKind, RowItem};
use crate::session::{CaretEdge, EditorSession, FocusKind, FocusPayload};
use crate::surface::{Point, TextSurface};
use std::time::Duration;

/// 行コントローラーから所有者への呼び出し
pub trait RowHost {
    /// 行一覧を永続化する
    fn persist_items(&mut self, block_id: &BlockId, rows: &[RowItem]);
    fn exit_edit(&mut self, block_id: &BlockId);
    /// 空になったブロックを削除する
    fn delete_empty_block(&mut self, block_id: &BlockId);
    /// 下に兄弟ブロックを作り、フォーカスを移す
    fn create_sibling_below(&mut self, block_id: &BlockId);
    /// 先頭行より上、末尾行より下への移動
    fn navigate(&mut self, block_id: &BlockId, direction: Navigation);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFlavor {
    List(ListKind),
    Todo,
}

impl RowFlavor {
    pub fn from_kind(kind: BlockKind) -> Option<Self> {
        match kind {
            BlockKind::BulletedList => Some(RowFlavor::List(ListKind::Bulleted)),
            BlockKind::NumberedList => Some(RowFlavor::List(ListKind::Numbered)),
            BlockKind::TodoList => Some(RowFlavor::Todo),
            _ => None,
        }
    }

    pub fn block_kind(self) -> BlockKind {
        match self {
            RowFlavor::List(list_kind) => list_kind.block_kind(),
            RowFlavor::Todo => BlockKind::TodoList,
        }
    }
}

/// 描画待ちの行へのキーボードフォーカス
#[derive(Debug, Clone, PartialEq, Eq)]
struct QueuedFocus {
    row_id: String,
    token: u64,
}

/// 行コントローラーのキー処理結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKeyOutcome {
    Handled(KeyboardAction),
    RequestEdit { replay: Key },
}

#[derive(Debug)]
pub struct RowController<S> {
    block_id: BlockId,
    flavor: RowFlavor,
    rows: Vec<RowItem>,
    editors: Vec<BlockEditor<S>>,
    active: Option<usize>,
    /// 全行が空のリストで一度目の Enter を受けた
    pending_exit: bool,
    queued_focus: Option<QueuedFocus>,
    /// 行の切り替えで確定したが、まだ永続化していないテキストがある
    unsaved: bool,
    confirm_exit: bool,
    commit_delay: Duration,
    read_only: bool,
}

impl<S: TextSurface + Default> RowController<S> {
    pub fn new(
        block_id: BlockId,
        flavor: RowFlavor,
        rows: Vec<RowItem>,
        confirm_exit: bool,
        commit_delay: Duration,
    ) -> Self {
        let rows = if rows.is_empty() { vec![RowItem::empty()] } else { rows };
        let mut controller = Self {
            block_id,
            flavor,
            rows: Vec::new(),
            editors: Vec::new(),
            active: None,
            pending_exit: false,
            queued_focus: None,
            unsaved: false,
            confirm_exit,
            commit_delay,
            read_only: false,
        };
        controller.replace_rows(rows);
        controller
    }

    pub fn block_id(&self) -> &BlockId {
        &self.block_id
    }

    pub fn flavor(&self) -> RowFlavor {
        self.flavor
    }

    pub fn rows(&self) -> &[RowItem] {
        &self.rows
    }

    pub fn texts(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.text.as_str()).collect()
    }

    pub fn editors(&self) -> &[BlockEditor<S>] {
        &self.editors
    }

    pub fn editor_mut(&mut self, index: usize) -> Option<&mut BlockEditor<S>> {
        self.editors.get_mut(index)
    }

    pub fn active_row(&self) -> Option<usize> {
        self.active
    }

    pub fn is_pending_exit(&self) -> bool {
        self.pending_exit
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
        for editor in &mut self.editors {
            editor.set_read_only(read_only);
        }
    }

    /// 行の表示用マーカー
    pub fn marker_for(&self, index: usize) -> String {
        match self.flavor {
            RowFlavor::List(ListKind::Bulleted) => "• ".to_string(),
            RowFlavor::List(ListKind::Numbered) => format!("{}. ", index + 1),
            RowFlavor::Todo => {
                let checked = self.rows.get(index).is_some_and(|row| row.checked);
                if checked { "[x] " } else { "[ ] " }.to_string()
            }
        }
    }

    /// 外部から行一覧を同期する。行 ID が変わった行だけ面を書き直す
    pub fn sync_rows(&mut self, rows: Vec<RowItem>) {
        if rows.is_empty() {
            return;
        }
        let same_shape = rows.len() == self.rows.len()
            && rows.iter().zip(&self.rows).all(|(next, current)| next.id == current.id);
        if same_shape {
            for (index, row) in rows.iter().enumerate() {
                self.rows[index].checked = row.checked;
                self.rows[index].promoted = row.promoted;
            }
            self.refresh_markers();
        } else {
            self.replace_rows(rows);
        }
    }

    fn replace_rows(&mut self, rows: Vec<RowItem>) {
        let editors = rows.iter().map(|row| self.new_editor(row)).collect();
        self.editors = editors;
        self.rows = rows;
        self.active = self.active.filter(|index| *index < self.rows.len());
        self.refresh_markers();
    }

    fn refresh_markers(&mut self) {
        for index in 0..self.editors.len() {
            let marker = self.marker_for(index);
            self.editors[index].surface_mut().set_marker(&marker);
        }
    }

    fn new_editor(&self, row: &RowItem) -> BlockEditor<S> {
        let mut editor = BlockEditor::new(
            &row.id,
            self.block_id.as_str(),
            S::default(),
            &row.text,
            self.commit_delay,
        );
        editor.set_read_only(self.read_only);
        editor
    }

    pub fn index_of(&self, row_id: &str) -> Option<usize> {
        self.rows.iter().position(|row| row.id == row_id)
    }

    /// 画面上の点を含む行（原点が点より上にある最後の行）
    pub fn row_at(&self, point: Point) -> Option<usize> {
        self.editors
            .iter()
            .rposition(|editor| editor.surface().origin().y <= point.y)
    }

    /// `index` 行の判定文脈
    pub fn keyboard_context(&self, index: usize) -> Option<KeyboardContext> {
        let row = self.rows.get(index)?;
        let is_item_empty = row.is_empty();
        let is_first_item = index == 0;
        let is_last_item = index + 1 == self.rows.len();
        let all_items_empty = self.rows.iter().all(RowItem::is_empty);
        Some(match self.flavor {
            RowFlavor::List(list_kind) => KeyboardContext::ListItem {
                list_kind,
                is_item_empty,
                is_first_item,
                is_last_item,
                all_items_empty,
            },
            RowFlavor::Todo => KeyboardContext::TodoItem {
                is_item_empty,
                is_first_item,
                is_last_item,
                all_items_empty,
            },
        })
    }

    /// アクティブ行でのキー入力
    pub fn handle_key(&mut self, key: Key, session: &mut EditorSession, host: &mut dyn RowHost) -> RowKeyOutcome {
        // 編集中の行がなければ、所有者に編集開始と再送を頼む
        let active = self.active.filter(|index| *index < self.editors.len());
        let Some(index) = active.filter(|_| !self.read_only) else {
            return if key.starts_edit() {
                RowKeyOutcome::RequestEdit { replay: key }
            } else {
                RowKeyOutcome::Handled(KeyboardAction::Noop)
            };
        };

        match self.editors[index].handle_key(key, session) {
            KeyOutcome::RequestEdit { replay } => RowKeyOutcome::RequestEdit { replay },
            KeyOutcome::Intent(intent) => {
                let action = self
                    .keyboard_context(index)
                    .map(|context| decide(intent, &context))
                    .unwrap_or(KeyboardAction::Noop);
                if action.is_noop() {
                    if let Some(text) = self.editors[index].apply_default(intent, session) {
                        self.text_changed(index, text);
                    }
                } else {
                    self.apply_decision(index, intent, action, session, host);
                }
                RowKeyOutcome::Handled(action)
            }
            KeyOutcome::Edited(Some(text)) => {
                self.text_changed(index, text);
                RowKeyOutcome::Handled(KeyboardAction::Noop)
            }
            KeyOutcome::Navigate(direction) => {
                self.navigate(index, direction, session, host);
                RowKeyOutcome::Handled(KeyboardAction::Noop)
            }
            KeyOutcome::Edited(None) | KeyOutcome::Ignored => RowKeyOutcome::Handled(KeyboardAction::Noop),
        }
    }

    fn text_changed(&mut self, index: usize, text: String) {
        if !text.trim().is_empty() {
            self.pending_exit = false;
        }
        if let Some(row) = self.rows.get_mut(index) {
            row.text = text;
        }
    }

    fn navigate(&mut self, index: usize, direction: Navigation, session: &mut EditorSession, host: &mut dyn RowHost) {
        let target = match direction {
            Navigation::Previous if index > 0 => Some((index - 1, CaretEdge::End)),
            Navigation::Next if index + 1 < self.rows.len() => Some((index + 1, CaretEdge::Start)),
            _ => None,
        };
        match target {
            Some((target, edge)) => {
                self.focus_row(target, FocusPayload::edge(edge), "row-navigate", session);
            }
            None => host.navigate(&self.block_id, direction),
        }
    }

    /// 判定結果を行操作として実行する
    pub fn apply_decision(
        &mut self,
        index: usize,
        intent: KeyIntent,
        action: KeyboardAction,
        session: &mut EditorSession,
        host: &mut dyn RowHost,
    ) {
        match action {
            KeyboardAction::ListInsertItem | KeyboardAction::TodoInsertItem => {
                self.pending_exit = false;
                self.insert_item(index, session, host);
            }
            KeyboardAction::ListRemoveItem | KeyboardAction::TodoRemoveItem => {
                self.pending_exit = false;
                self.remove_item(index, session, host);
            }
            KeyboardAction::ListExit | KeyboardAction::TodoExit => {
                self.exit(index, intent, session, host);
            }
            _ => {}
        }
    }

    /// `index` の直後に空行を入れ、そこへフォーカスを移す
    pub fn insert_item(&mut self, index: usize, session: &mut EditorSession, host: &mut dyn RowHost) {
        let at = (index + 1).min(self.rows.len());
        let row = RowItem::empty();
        let editor = self.new_editor(&row);
        self.rows.insert(at, row);
        self.editors.insert(at, editor);
        self.refresh_markers();
        host.persist_items(&self.block_id, &self.rows);
        self.focus_row(at, FocusPayload::edge(CaretEdge::Start), "row-insert", session);
    }

    /// `index` 行を削除する。唯一の行なら空行に置き換える
    pub fn remove_item(&mut self, index: usize, session: &mut EditorSession, host: &mut dyn RowHost) {
        if index >= self.rows.len() {
            return;
        }
        self.blur_row(index, session);
        if self.rows.len() == 1 {
            let row = RowItem::empty();
            self.editors[0] = self.new_editor(&row);
            self.rows[0] = row;
            self.refresh_markers();
            host.persist_items(&self.block_id, &self.rows);
            self.focus_row(0, FocusPayload::edge(CaretEdge::Start), "row-remove", session);
            return;
        }

        self.rows.remove(index);
        self.editors.remove(index);
        self.refresh_markers();
        host.persist_items(&self.block_id, &self.rows);
        let target = index.min(self.rows.len() - 1);
        self.focus_row(target, FocusPayload::edge(CaretEdge::End), "row-remove", session);
    }

    fn exit(&mut self, index: usize, intent: KeyIntent, session: &mut EditorSession, host: &mut dyn RowHost) {
        let all_empty = self.rows.iter().all(RowItem::is_empty);
        if !all_empty {
            self.pending_exit = false;
            self.blur_row(index, session);
            if self.rows.len() > 1 {
                self.rows.remove(index);
                self.editors.remove(index);
                self.refresh_markers();
                host.persist_items(&self.block_id, &self.rows);
            }
            self.active = None;
            host.exit_edit(&self.block_id);
            host.create_sibling_below(&self.block_id);
            return;
        }

        if intent == KeyIntent::Enter && self.confirm_exit && !self.pending_exit {
            let last = self.rows.len() - 1;
            self.insert_item(last, session, host);
            self.pending_exit = true;
            return;
        }

        self.pending_exit = false;
        self.blur_row(index, session);
        if self.rows.len() > 1 {
            self.rows.pop();
            self.editors.pop();
            host.persist_items(&self.block_id, &self.rows);
        }
        self.active = None;
        host.exit_edit(&self.block_id);
        host.delete_empty_block(&self.block_id);
    }

    fn blur_row(&mut self, index: usize, session: &mut EditorSession) {
        if let Some(editor) = self.editors.get_mut(index) {
            if let Some(text) = editor.blur(session) {
                self.rows[index].text = text;
                self.unsaved = true;
            }
        }
    }

    /// 行へのキーボードフォーカスを発行し、描画待ちとして記録する
    fn focus_row(&mut self, index: usize, payload: FocusPayload, source: &str, session: &mut EditorSession) {
        let Some(row_id) = self.rows.get(index).map(|row| row.id.clone()) else {
            return;
        };
        let token = session
            .focus
            .issue(FocusKind::Keyboard, Some(&row_id), Some(payload), Some(source));
        self.queued_focus = Some(QueuedFocus { row_id, token });
    }

    /// 自分の行またはブロック宛ての意図があれば適用する
    pub fn apply_focus(&mut self, session: &mut EditorSession) -> bool {
        if let Some(queued) = &self.queued_focus {
            let superseded = session
                .focus
                .current()
                .map_or(true, |intent| intent.token != queued.token);
            if superseded {
                self.queued_focus = None;
            }
        }

        let Some(intent) = session.focus.current().cloned() else {
            return false;
        };

        if intent.targets(self.block_id.as_str()) {
            session.focus.clear(Some(intent.token));
            let (index, edge) = match intent.payload.and_then(|payload| payload.edge) {
                Some(CaretEdge::End) => (self.rows.len() - 1, CaretEdge::End),
                _ => (0, CaretEdge::Start),
            };
            self.activate(index, FocusPayload::edge(edge).resolve(self.rows[index].text.chars().count()), session);
            return true;
        }

        let Some(index) = intent.target.as_deref().and_then(|id| self.index_of(id)) else {
            return false;
        };
        // 前の行の blur が選択スナップショットを消すので、先に切り替える
        self.switch_active(index, session);
        let Some(offset) = self.editors[index].consume_focus_intent(session) else {
            return false;
        };
        self.queued_focus = None;
        log::debug!("row {} focused at {}", index, offset);
        true
    }

    fn activate(&mut self, index: usize, offset: usize, session: &mut EditorSession) {
        self.switch_active(index, session);
        self.editors[index].focus(offset, session);
    }

    fn switch_active(&mut self, index: usize, session: &mut EditorSession) {
        if let Some(previous) = self.active.filter(|previous| *previous != index) {
            self.blur_row(previous, session);
        }
        self.active = Some(index);
    }

    /// 行のクリック。ポインター意図を先に発行し、他の行への描画待ちフォーカスを捨てる
    pub fn click_row(&mut self, index: usize, point: Point, session: &mut EditorSession) -> ClickOutcome {
        let Some(editor) = self.editors.get(index) else {
            return ClickOutcome::Missed;
        };
        if self.read_only {
            return ClickOutcome::RequestEdit;
        }
        let offset = editor.offset_from_point(point).unwrap_or(0);
        let row_id = self.rows[index].id.clone();

        if self
            .queued_focus
            .as_ref()
            .is_some_and(|queued| queued.row_id != row_id)
        {
            log::debug!("pointer on row {} drops queued keyboard focus", index);
            self.queued_focus = None;
        }
        session
            .focus
            .issue(FocusKind::Pointer, Some(&row_id), Some(FocusPayload::offset(offset)), Some("row-click"));

        self.switch_active(index, session);
        match self.editors[index].consume_focus_intent(session) {
            Some(applied) => ClickOutcome::Placed(applied),
            None => ClickOutcome::Missed,
        }
    }

    /// TODO 行のチェックを反転する
    pub fn toggle_checked(&mut self, index: usize, host: &mut dyn RowHost) -> Option<bool> {
        if self.flavor != RowFlavor::Todo {
            return None;
        }
        let row = self.rows.get_mut(index)?;
        row.checked = !row.checked;
        let checked = row.checked;
        self.refresh_markers();
        host.persist_items(&self.block_id, &self.rows);
        Some(checked)
    }

    /// 遅延コミットの期限が来た行があれば永続化する
    pub fn tick(&mut self, session: &mut EditorSession, host: &mut dyn RowHost) {
        let now = session.now();
        let mut committed = false;
        for (index, editor) in self.editors.iter_mut().enumerate() {
            if let Some(text) = editor.poll_commit(now) {
                self.rows[index].text = text;
                committed = true;
            }
        }
        if std::mem::take(&mut self.unsaved) || committed {
            host.persist_items(&self.block_id, &self.rows);
        }
    }

    /// 編集終了。保留中のコミットをすべて吐き出す
    pub fn blur_all(&mut self, session: &mut EditorSession, host: &mut dyn RowHost) {
        let mut committed = false;
        for (index, editor) in self.editors.iter_mut().enumerate() {
            if let Some(text) = editor.blur(session) {
                self.rows[index].text = text;
                committed = true;
            }
        }
        self.active = None;
        self.queued_focus = None;
        if std::mem::take(&mut self.unsaved) || committed {
            host.persist_items(&self.block_id, &self.rows);
        }
    }

    /// 同一性の変化（ブロック ID の確定など）
    pub fn rebind(&mut self, block_id: BlockId) {
        if self.block_id == block_id {
            return;
        }
        let rows = self.rows.clone();
        self.block_id = block_id;
        for (editor, row) in self.editors.iter_mut().zip(&rows) {
            editor.sync_external(&row.id, self.block_id.as_str(), &row.text);
        }
    }
}
