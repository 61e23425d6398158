//! ブロック編集プリミティブ
//!
//! 編集面一つと論理テキストの橋渡しをする。入力ごとに平坦化したテキストを
//! 即座に保持し、遅延コミットを予約する。外部の値で面を書き直すのは
//! ブロックの同一性が変わったときだけ

use super::commit_buffer::CommitBuffer;
use crate::keyboard::{Key, KeyCode, KeyIntent, KeyboardContext};
use crate::model::BlockKind;
use crate::session::{EditorSession, FocusKind, FocusPayload};
use crate::surface::{CaretRect, Point, TextSurface};
use crate::text::{char_len, flatten_surface_text, has_visible_text, insert_soft_break_at, split_at_char};
use std::time::{Duration, Instant};

/// 上下の隣接要素
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Previous,
    Next,
}

/// キー入力の処理結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Ignored,
    /// 既定の編集を行った。テキストが変わったときは新しいテキスト
    Edited(Option<String>),
    /// 判定エンジンへ回す
    Intent(KeyIntent),
    /// 端からはみ出す上下移動
    Navigate(Navigation),
    /// 読み取り専用のため、所有者に編集開始を依頼する
    RequestEdit { replay: Key },
}

/// クリックの処理結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// 面の外
    Missed,
    Placed(usize),
    RequestEdit,
}

#[derive(Debug)]
pub struct BlockEditor<S> {
    /// フォーカス意図の宛先
    id: String,
    /// 選択スナップショットの持ち主
    owner: String,
    surface: S,
    text: String,
    commit: CommitBuffer,
    read_only: bool,
    focused: bool,
}

impl<S: TextSurface> BlockEditor<S> {
    pub fn new(id: &str, owner: &str, mut surface: S, text: &str, commit_delay: Duration) -> Self {
        surface.replace_text(text);
        Self {
            id: id.to_string(),
            owner: owner.to_string(),
            surface,
            text: flatten_surface_text(text),
            commit: CommitBuffer::new(commit_delay),
            read_only: false,
            focused: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// 現在のテキスト（同じティック内でも最新）
    pub fn text(&self) -> &str {
        &self.text
    }

    /// 空白以外の文字を含むか
    pub fn has_text(&self) -> bool {
        has_visible_text(&self.text)
    }

    pub fn text_length(&self) -> usize {
        char_len(&self.text)
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn has_pending_commit(&self) -> bool {
        self.commit.is_pending()
    }

    pub fn caret_offset(&self) -> Option<usize> {
        self.surface.caret_offset()
    }

    pub fn is_caret_at_start(&self) -> bool {
        self.surface
            .selection_offsets()
            .is_some_and(|(start, _)| start == 0)
    }

    pub fn is_caret_at_end(&self) -> bool {
        let len = self.surface.text_length();
        self.surface
            .selection_offsets()
            .is_some_and(|(_, end)| end == len)
    }

    /// 面が変更された後に呼ぶ。テキストが変わったら新しいテキストを返す
    pub fn on_input(&mut self, session: &mut EditorSession) -> Option<String> {
        let raw = self.surface.raw_text();
        let flattened = flatten_surface_text(&raw);
        if flattened != raw {
            // 面を平坦化後のテキストに揃え、キャレットを対応する位置へ写す
            let caret = self.surface.caret_offset().map(|offset| {
                let prefix: String = raw.chars().take(offset).collect();
                char_len(&flatten_surface_text(&prefix))
            });
            self.surface.replace_text(&flattened);
            if let Some(caret) = caret {
                self.surface.place_caret(caret);
            }
        }
        self.update_snapshot(session);
        if flattened == self.text {
            return None;
        }
        self.text = flattened.clone();
        self.commit.schedule(flattened.clone(), session.now());
        Some(flattened)
    }

    /// コミット時刻を過ぎていればコミットするテキストを返す
    pub fn poll_commit(&mut self, now: Instant) -> Option<String> {
        self.commit.take_due(now)
    }

    pub fn flush_commit(&mut self) -> Option<String> {
        self.commit.flush()
    }

    /// フォーカスを得てキャレットを置く
    pub fn focus(&mut self, offset: usize, session: &mut EditorSession) -> usize {
        self.focused = true;
        self.place_caret(offset, session)
    }

    /// フォーカスを失う。保留中のコミットを返す
    pub fn blur(&mut self, session: &mut EditorSession) -> Option<String> {
        self.focused = false;
        self.surface.clear_selection();
        session.selection.clear_if_owner(&self.owner);
        self.commit.flush()
    }

    /// 破棄する。保留中のコミットを返す
    pub fn unmount(mut self, session: &mut EditorSession) -> Option<String> {
        self.blur(session)
    }

    /// 外部の値と同期する。同一性が変わったときだけ面を書き直す
    pub fn sync_external(&mut self, id: &str, owner: &str, text: &str) -> bool {
        if self.id == id {
            return false;
        }
        let caret = self.surface.caret_offset();
        self.commit.cancel();
        self.id = id.to_string();
        self.owner = owner.to_string();
        self.surface.replace_text(text);
        self.text = flatten_surface_text(text);
        if let Some(caret) = caret.filter(|_| self.focused) {
            self.surface.place_caret(caret);
        }
        true
    }

    /// プログラムからテキストを設定する。保留中のコミットは破棄する
    pub fn set_text(&mut self, text: &str) {
        self.commit.cancel();
        self.surface.replace_text(text);
        self.text = flatten_surface_text(text);
    }

    pub fn place_caret(&mut self, offset: usize, session: &mut EditorSession) -> usize {
        let applied = self.surface.place_caret(offset);
        self.update_snapshot(session);
        applied
    }

    pub fn caret_rect(&self) -> Option<CaretRect> {
        self.surface.caret_rect()
    }

    pub fn offset_from_point(&self, point: Point) -> Option<usize> {
        self.surface.offset_at_point(point)
    }

    /// 段落・見出しなど単一テキストのブロック文脈
    pub fn block_context(&self, block_kind: BlockKind, prefer_exit_for_lonely_empty: bool) -> KeyboardContext {
        KeyboardContext::Block {
            block_kind,
            is_block_empty: !self.has_text(),
            has_inline_text: !self.text.is_empty(),
            caret_at_start: self.is_caret_at_start(),
            caret_at_end: self.is_caret_at_end(),
            prefer_exit_for_lonely_empty,
        }
    }

    /// キャレット位置でテキストを二分する
    pub fn split_at_caret(&self) -> (String, String) {
        let caret = self.caret_offset().unwrap_or_else(|| self.text_length());
        let (before, after) = split_at_char(&self.text, caret);
        (before.to_string(), after.to_string())
    }

    pub fn handle_key(&mut self, key: Key, session: &mut EditorSession) -> KeyOutcome {
        if self.read_only {
            return if key.starts_edit() {
                KeyOutcome::RequestEdit { replay: key }
            } else {
                KeyOutcome::Ignored
            };
        }

        if key.is_soft_break() {
            return KeyOutcome::Edited(self.insert_soft_break(session));
        }
        if let Some(intent) = key.intent() {
            return KeyOutcome::Intent(intent);
        }

        match key.code {
            KeyCode::Up if self.is_caret_at_start() => KeyOutcome::Navigate(Navigation::Previous),
            KeyCode::Down if self.is_caret_at_end() => KeyOutcome::Navigate(Navigation::Next),
            KeyCode::Up | KeyCode::Home => {
                self.place_caret(0, session);
                KeyOutcome::Edited(None)
            }
            KeyCode::Down | KeyCode::End => {
                let len = self.text_length();
                self.place_caret(len, session);
                KeyOutcome::Edited(None)
            }
            KeyCode::Left => {
                self.surface.move_caret(-1);
                self.update_snapshot(session);
                KeyOutcome::Edited(None)
            }
            KeyCode::Right => {
                self.surface.move_caret(1);
                self.update_snapshot(session);
                KeyOutcome::Edited(None)
            }
            KeyCode::Delete => {
                let caret = self.caret_offset().unwrap_or(0);
                let (start, end) = self.surface.selection_offsets().unwrap_or((caret, caret));
                if start == end {
                    self.surface.select_range(start, start + 1);
                }
                self.surface.delete_backward();
                KeyOutcome::Edited(self.on_input(session))
            }
            _ => match key.printable() {
                Some(ch) => {
                    let mut buf = [0u8; 4];
                    self.surface.insert_at_selection(ch.encode_utf8(&mut buf));
                    KeyOutcome::Edited(self.on_input(session))
                }
                None => KeyOutcome::Ignored,
            },
        }
    }

    /// 判定エンジンが何もしなかったキーの既定動作
    pub fn apply_default(&mut self, intent: KeyIntent, session: &mut EditorSession) -> Option<String> {
        match intent {
            KeyIntent::Backspace => {
                if self.surface.delete_backward() {
                    self.on_input(session)
                } else {
                    None
                }
            }
            KeyIntent::Enter => self.insert_soft_break(session),
        }
    }

    /// キャレット位置に改行を入れる
    pub fn insert_soft_break(&mut self, session: &mut EditorSession) -> Option<String> {
        let result = insert_soft_break_at(&self.text, self.caret_offset());
        self.surface.replace_text(&result.text);
        self.surface.place_caret(result.caret_offset);
        self.on_input(session)
    }

    /// 自分宛てのフォーカス意図があれば消費してキャレットを置く
    pub fn consume_focus_intent(&mut self, session: &mut EditorSession) -> Option<usize> {
        let intent = session.focus.take_for(&self.id)?;
        let offset = intent.resolve_offset(self.text_length());
        Some(self.focus(offset, session))
    }

    /// 画面上の点でのクリック
    pub fn click(&mut self, point: Point, session: &mut EditorSession) -> ClickOutcome {
        if self.read_only {
            return ClickOutcome::RequestEdit;
        }
        let Some(offset) = self.offset_from_point(point) else {
            return ClickOutcome::Missed;
        };
        // ポインター意図で、描画待ちのキーボード意図を置き換える
        session.focus.issue(
            FocusKind::Pointer,
            Some(&self.id),
            Some(FocusPayload::offset(offset)),
            Some("block-click"),
        );
        match self.consume_focus_intent(session) {
            Some(applied) => ClickOutcome::Placed(applied),
            None => ClickOutcome::Missed,
        }
    }

    fn update_snapshot(&self, session: &mut EditorSession) {
        if !self.focused {
            return;
        }
        if let Some(offset) = self.surface.caret_offset() {
            let now = session.now();
            session
                .selection
                .update(&self.owner, offset, self.surface.text_length(), now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::session::{FocusKind, FocusPayload, ManualClock};
    use crate::surface::MemorySurface;
    use std::rc::Rc;

    fn session() -> (EditorSession, Rc<ManualClock>) {
        let clock = Rc::new(ManualClock::new());
        (EditorSession::new(EditorConfig::default(), clock.clone()), clock)
    }

    fn editor(text: &str) -> BlockEditor<MemorySurface> {
        BlockEditor::new("b1", "b1", MemorySurface::new(), text, Duration::from_millis(220))
    }

    fn type_str(editor: &mut BlockEditor<MemorySurface>, text: &str, session: &mut EditorSession) {
        for ch in text.chars() {
            editor.handle_key(Key::char(ch), session);
        }
    }

    #[test]
    fn test_input_updates_text_immediately_and_debounces_commit() {
        let (mut session, clock) = session();
        let mut editor = editor("");
        editor.focus(0, &mut session);

        type_str(&mut editor, "ab", &mut session);
        assert_eq!(editor.text(), "ab");
        clock.advance_ms(200);
        type_str(&mut editor, "c", &mut session);
        clock.advance_ms(200);
        assert_eq!(editor.poll_commit(session.now()), None);
        clock.advance_ms(20);
        assert_eq!(editor.poll_commit(session.now()), Some("abc".to_string()));
        assert_eq!(editor.poll_commit(session.now()), None);
    }

    #[test]
    fn test_blur_flushes_and_clears_snapshot() {
        let (mut session, _) = session();
        let mut editor = editor("x");
        editor.focus(1, &mut session);
        type_str(&mut editor, "y", &mut session);
        assert!(session.selection.is_caret_inside("b1"));

        assert_eq!(editor.blur(&mut session), Some("xy".to_string()));
        assert!(session.selection.get().is_none());
        assert!(!editor.has_pending_commit());
    }

    #[test]
    fn test_flattening_normalizes_surface_text() {
        let (mut session, _) = session();
        let mut editor = editor("");
        editor.surface_mut().replace_text("a\u{00A0}b\u{200B}\r\nc");
        assert_eq!(editor.on_input(&mut session), Some("a b\nc".to_string()));
        assert_eq!(editor.on_input(&mut session), None);
    }

    #[test]
    fn test_zero_width_input_keeps_caret_aligned() {
        let (mut session, _) = session();
        let mut editor = editor("abc");
        editor.focus(0, &mut session);
        type_str(&mut editor, "\u{200B}", &mut session);
        assert_eq!(editor.surface().raw_text(), "abc");
        assert_eq!(editor.caret_offset(), Some(0));

        editor.place_caret(1, &mut session);
        type_str(&mut editor, "\u{00A0}", &mut session);
        assert_eq!(editor.surface().raw_text(), "a bc");
        assert_eq!(editor.caret_offset(), Some(2));
        assert_eq!(editor.split_at_caret(), ("a ".to_string(), "bc".to_string()));
    }

    #[test]
    fn test_sync_external_only_on_identity_change() {
        let (mut session, _) = session();
        let mut editor = editor("draft");
        editor.focus(5, &mut session);
        type_str(&mut editor, "!", &mut session);

        assert!(!editor.sync_external("b1", "b1", "server value"));
        assert_eq!(editor.text(), "draft!");
        assert_eq!(editor.caret_offset(), Some(6));

        assert!(editor.sync_external("b2", "b2", "other"));
        assert_eq!(editor.text(), "other");
        assert!(!editor.has_pending_commit());
    }

    #[test]
    fn test_read_only_requests_edit_with_replay() {
        let (mut session, _) = session();
        let mut editor = editor("text");
        editor.set_read_only(true);
        assert_eq!(
            editor.handle_key(Key::char('z'), &mut session),
            KeyOutcome::RequestEdit { replay: Key::char('z') }
        );
        assert_eq!(editor.click(Point::new(0, 0), &mut session), ClickOutcome::RequestEdit);
        assert_eq!(editor.text(), "text");
    }

    #[test]
    fn test_edges_and_navigation() {
        let (mut session, _) = session();
        let mut editor = editor("abc");
        editor.focus(0, &mut session);
        assert!(editor.is_caret_at_start());
        assert!(!editor.is_caret_at_end());
        assert_eq!(editor.handle_key(Key::arrow_up(), &mut session), KeyOutcome::Navigate(Navigation::Previous));
        assert_eq!(editor.handle_key(Key::arrow_down(), &mut session), KeyOutcome::Edited(None));
        assert!(editor.is_caret_at_end());
        assert_eq!(editor.handle_key(Key::arrow_down(), &mut session), KeyOutcome::Navigate(Navigation::Next));
    }

    #[test]
    fn test_soft_break_at_caret() {
        let (mut session, _) = session();
        let mut editor = editor("abcDEF");
        editor.focus(3, &mut session);
        assert_eq!(
            editor.handle_key(Key::shift_enter(), &mut session),
            KeyOutcome::Edited(Some("abc\nDEF".to_string()))
        );
        assert_eq!(editor.caret_offset(), Some(4));
    }

    #[test]
    fn test_consume_focus_intent() {
        let (mut session, _) = session();
        let mut editor = editor("hello");
        session
            .focus
            .issue(FocusKind::Keyboard, Some("other"), None, None);
        assert_eq!(editor.consume_focus_intent(&mut session), None);

        session
            .focus
            .issue(FocusKind::Keyboard, Some("b1"), Some(FocusPayload::offset(2)), None);
        assert_eq!(editor.consume_focus_intent(&mut session), Some(2));
        assert!(editor.is_focused());
        assert!(session.focus.current().is_none());
        assert_eq!(session.selection.get().map(|s| s.offset), Some(2));
    }

    #[test]
    fn test_backspace_default_and_context() {
        let (mut session, _) = session();
        let mut editor = editor("ab");
        editor.focus(2, &mut session);
        assert_eq!(editor.handle_key(Key::backspace(), &mut session), KeyOutcome::Intent(KeyIntent::Backspace));
        assert_eq!(editor.apply_default(KeyIntent::Backspace, &mut session), Some("a".to_string()));

        let context = editor.block_context(BlockKind::Paragraph, false);
        assert_eq!(
            context,
            KeyboardContext::Block {
                block_kind: BlockKind::Paragraph,
                is_block_empty: false,
                has_inline_text: true,
                caret_at_start: false,
                caret_at_end: true,
                prefer_exit_for_lonely_empty: false,
            }
        );
        assert_eq!(editor.split_at_caret(), ("a".to_string(), String::new()));
    }
}
