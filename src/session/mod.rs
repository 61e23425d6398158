//! 編集セッション
//!
//! エディタのルートが所有し、各ブロック・行のコンポーネントへ
//! 引数として渡す共有状態

pub mod clock;
pub mod focus;
pub mod selection;

pub use clock::{Clock, ManualClock, SystemClock};
pub use focus::{CaretEdge, FocusIntent, FocusIntentBus, FocusKind, FocusPayload, ListenerId};
pub use selection::{SelectionSnapshot, SelectionStore};

use crate::config::EditorConfig;
use std::rc::Rc;
use std::time::Instant;

#[derive(Debug)]
pub struct EditorSession {
    pub focus: FocusIntentBus,
    pub selection: SelectionStore,
    clock: Rc<dyn Clock>,
    config: EditorConfig,
}

impl EditorSession {
    pub fn new(config: EditorConfig, clock: Rc<dyn Clock>) -> Self {
        Self {
            focus: FocusIntentBus::new(clock.clone(), config.focus_intent_ttl()),
            selection: SelectionStore::new(),
            clock,
            config,
        }
    }

    pub fn with_system_clock(config: EditorConfig) -> Self {
        Self::new(config, Rc::new(SystemClock))
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    pub fn clock(&self) -> Rc<dyn Clock> {
        self.clock.clone()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }
}
