//! キー入力の内部表現

use super::decision::KeyIntent;
use crossterm::event::{KeyCode as CrosstermKeyCode, KeyEvent, KeyModifiers as CrosstermModifiers};

/// キー入力
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    pub modifiers: KeyModifiers,
    pub code: KeyCode,
}

/// 修飾キーの組み合わせ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KeyModifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

/// 基本キーコード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Enter,
    Backspace,
    Delete,
    Tab,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Esc,
    Unknown,
}

impl Key {
    pub fn plain(code: KeyCode) -> Self {
        Self {
            modifiers: KeyModifiers::default(),
            code,
        }
    }

    pub fn char(ch: char) -> Self {
        Self::plain(KeyCode::Char(ch))
    }

    pub fn enter() -> Self {
        Self::plain(KeyCode::Enter)
    }

    pub fn shift_enter() -> Self {
        Self {
            modifiers: KeyModifiers {
                shift: true,
                ..KeyModifiers::default()
            },
            code: KeyCode::Enter,
        }
    }

    pub fn backspace() -> Self {
        Self::plain(KeyCode::Backspace)
    }

    pub fn arrow_up() -> Self {
        Self::plain(KeyCode::Up)
    }

    pub fn arrow_down() -> Self {
        Self::plain(KeyCode::Down)
    }

    pub fn ctrl(ch: char) -> Self {
        Self {
            modifiers: KeyModifiers {
                ctrl: true,
                ..KeyModifiers::default()
            },
            code: KeyCode::Char(ch),
        }
    }

    /// 判定エンジンに渡すキー意図。Shift+Enter はソフトブレークなので対象外
    pub fn intent(&self) -> Option<KeyIntent> {
        if self.modifiers.ctrl || self.modifiers.alt {
            return None;
        }
        match self.code {
            KeyCode::Enter if !self.modifiers.shift => Some(KeyIntent::Enter),
            KeyCode::Backspace => Some(KeyIntent::Backspace),
            _ => None,
        }
    }

    pub fn is_soft_break(&self) -> bool {
        self.code == KeyCode::Enter && self.modifiers.shift && !self.modifiers.ctrl
    }

    /// 読み取り専用の面で受けたとき、編集開始を依頼すべきキー
    pub fn starts_edit(&self) -> bool {
        matches!(
            self.code,
            KeyCode::Char(_) | KeyCode::Enter | KeyCode::Backspace | KeyCode::Delete
        ) && !self.modifiers.ctrl
            && !self.modifiers.alt
    }

    /// 挿入される文字（修飾なし、または Shift のみ）
    pub fn printable(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(ch) if !self.modifiers.ctrl && !self.modifiers.alt => Some(ch),
            _ => None,
        }
    }
}

impl From<KeyEvent> for Key {
    fn from(event: KeyEvent) -> Self {
        let modifiers = KeyModifiers {
            ctrl: event.modifiers.contains(CrosstermModifiers::CONTROL),
            alt: event.modifiers.contains(CrosstermModifiers::ALT),
            shift: event.modifiers.contains(CrosstermModifiers::SHIFT),
        };

        let code = match event.code {
            CrosstermKeyCode::Char(c) => KeyCode::Char(c),
            CrosstermKeyCode::Enter => KeyCode::Enter,
            CrosstermKeyCode::Backspace => KeyCode::Backspace,
            CrosstermKeyCode::Delete => KeyCode::Delete,
            CrosstermKeyCode::Tab => KeyCode::Tab,
            CrosstermKeyCode::Up => KeyCode::Up,
            CrosstermKeyCode::Down => KeyCode::Down,
            CrosstermKeyCode::Left => KeyCode::Left,
            CrosstermKeyCode::Right => KeyCode::Right,
            CrosstermKeyCode::Home => KeyCode::Home,
            CrosstermKeyCode::End => KeyCode::End,
            CrosstermKeyCode::Esc => KeyCode::Esc,
            _ => KeyCode::Unknown,
        };

        Key { modifiers, code }
    }
}
