//! フォーカス意図バス
//!
//! 「ブロック X の位置 Y にキャレットを置いてほしい」という要求を
//! 一つだけ保持し、購読者へ同期的に通知する。
//! 意図の消去はトークンが一致したときだけ行う

use super::clock::Clock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// リスナーの一意識別子
pub type ListenerId = usize;

/// 意図の発生元
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusKind {
    /// ユーザーのクリック
    Pointer,
    Keyboard,
    Initial,
}

/// キャレットを置く端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaretEdge {
    Start,
    End,
}

/// キャレット位置の指定。`offset` が `edge` より優先される
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FocusPayload {
    pub edge: Option<CaretEdge>,
    pub offset: Option<usize>,
}

impl FocusPayload {
    pub fn edge(edge: CaretEdge) -> Self {
        Self {
            edge: Some(edge),
            offset: None,
        }
    }

    pub fn offset(offset: usize) -> Self {
        Self {
            edge: None,
            offset: Some(offset),
        }
    }

    /// テキスト長 `len` の中での具体的なオフセット
    pub fn resolve(&self, len: usize) -> usize {
        match (self.offset, self.edge) {
            (Some(offset), _) => offset.min(len),
            (None, Some(CaretEdge::Start)) => 0,
            (None, Some(CaretEdge::End)) | (None, None) => len,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusIntent {
    pub kind: FocusKind,
    /// ブロック ID または行 ID
    pub target: Option<String>,
    pub token: u64,
    pub issued_at: Instant,
    pub payload: Option<FocusPayload>,
    pub source: Option<String>,
    pub expires_at: Option<Instant>,
}

impl FocusIntent {
    pub fn targets(&self, id: &str) -> bool {
        self.target.as_deref() == Some(id)
    }

    /// テキスト長 `len` の中で置くべきオフセット（指定なしは末尾）
    pub fn resolve_offset(&self, len: usize) -> usize {
        self.payload.unwrap_or_default().resolve(len)
    }
}

type Listener = Box<dyn FnMut(Option<&FocusIntent>)>;

pub struct FocusIntentBus {
    current: Option<FocusIntent>,
    next_token: u64,
    default_ttl: Option<Duration>,
    listeners: HashMap<ListenerId, Listener>,
    next_listener_id: ListenerId,
    clock: Rc<dyn Clock>,
}

impl FocusIntentBus {
    pub fn new(clock: Rc<dyn Clock>, default_ttl: Option<Duration>) -> Self {
        Self {
            current: None,
            next_token: 1,
            default_ttl,
            listeners: HashMap::new(),
            next_listener_id: 0,
            clock,
        }
    }

    /// 意図を発行し、トークンを返す。以前の意図は置き換わる
    pub fn issue(
        &mut self,
        kind: FocusKind,
        target: Option<&str>,
        payload: Option<FocusPayload>,
        source: Option<&str>,
    ) -> u64 {
        let ttl = self.default_ttl;
        self.issue_with_ttl(kind, target, payload, source, ttl)
    }

    pub fn issue_with_ttl(
        &mut self,
        kind: FocusKind,
        target: Option<&str>,
        payload: Option<FocusPayload>,
        source: Option<&str>,
        ttl: Option<Duration>,
    ) -> u64 {
        let token = self.next_token;
        self.next_token += 1;

        let issued_at = self.clock.now();
        self.current = Some(FocusIntent {
            kind,
            target: target.map(str::to_string),
            token,
            issued_at,
            payload,
            source: source.map(str::to_string),
            expires_at: ttl.map(|ttl| issued_at + ttl),
        });
        log::debug!("focus intent #{} {:?} -> {:?}", token, kind, target);

        self.notify();
        token
    }

    /// トークンが一致する（または省略された）ときだけ消去する
    pub fn clear(&mut self, token: Option<u64>) -> bool {
        let matches = match (&self.current, token) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(intent), Some(token)) => intent.token == token,
        };
        if matches {
            self.current = None;
            self.notify();
        }
        matches
    }

    pub fn current(&self) -> Option<&FocusIntent> {
        self.current.as_ref()
    }

    /// 期限切れの意図を消去する
    pub fn expire(&mut self) -> bool {
        let now = self.clock.now();
        let expired = self
            .current
            .as_ref()
            .filter(|intent| intent.expires_at.is_some_and(|at| at <= now))
            .map(|intent| intent.token);
        match expired {
            Some(token) => {
                log::debug!("focus intent #{} expired", token);
                self.clear(Some(token))
            }
            None => false,
        }
    }

    /// `target` 宛ての意図があれば消費して返す
    pub fn take_for(&mut self, target: &str) -> Option<FocusIntent> {
        let intent = self.current.as_ref().filter(|intent| intent.targets(target))?.clone();
        self.clear(Some(intent.token));
        Some(intent)
    }

    pub fn subscribe(&mut self, listener: impl FnMut(Option<&FocusIntent>) + 'static) -> ListenerId {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners.insert(id, Box::new(listener));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    fn notify(&mut self) {
        let current = self.current.as_ref();
        for listener in self.listeners.values_mut() {
            listener(current);
        }
    }
}

impl fmt::Debug for FocusIntentBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusIntentBus")
            .field("current", &self.current)
            .field("next_token", &self.next_token)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::clock::ManualClock;
    use std::cell::RefCell;

    fn bus(ttl_ms: Option<u64>) -> (FocusIntentBus, Rc<ManualClock>) {
        let clock = Rc::new(ManualClock::new());
        let bus = FocusIntentBus::new(clock.clone(), ttl_ms.map(Duration::from_millis));
        (bus, clock)
    }

    #[test]
    fn test_tokens_increase_and_supersede() {
        let (mut bus, _) = bus(None);
        let first = bus.issue(FocusKind::Keyboard, Some("a"), None, None);
        let second = bus.issue(FocusKind::Pointer, Some("b"), None, Some("click"));
        assert!(second > first);
        assert_eq!(bus.current().map(|intent| intent.token), Some(second));
        assert_eq!(bus.current().and_then(|intent| intent.source.clone()), Some("click".into()));
    }

    #[test]
    fn test_stale_token_cannot_clear() {
        let (mut bus, _) = bus(None);
        let stale = bus.issue(FocusKind::Keyboard, Some("a"), None, None);
        let fresh = bus.issue(FocusKind::Keyboard, Some("b"), None, None);

        assert!(!bus.clear(Some(stale)));
        assert_eq!(bus.current().map(|intent| intent.token), Some(fresh));
        assert!(bus.clear(Some(fresh)));
        assert!(!bus.clear(Some(fresh)));
        assert!(!bus.clear(None));
    }

    #[test]
    fn test_unconsumed_intent_expires() {
        let (mut bus, clock) = bus(Some(1500));
        bus.issue(FocusKind::Initial, Some("a"), None, None);
        clock.advance_ms(1499);
        assert!(!bus.expire());
        clock.advance_ms(1);
        assert!(bus.expire());
        assert!(bus.current().is_none());
    }

    #[test]
    fn test_superseded_expiry_is_noop() {
        let (mut bus, clock) = bus(None);
        bus.issue_with_ttl(FocusKind::Keyboard, Some("a"), None, None, Some(Duration::from_millis(10)));
        let fresh = bus.issue(FocusKind::Keyboard, Some("b"), None, None);
        clock.advance_ms(50);
        assert!(!bus.expire());
        assert_eq!(bus.current().map(|intent| intent.token), Some(fresh));
    }

    #[test]
    fn test_take_for_only_matching_target() {
        let (mut bus, _) = bus(None);
        bus.issue(FocusKind::Keyboard, Some("a"), Some(FocusPayload::edge(CaretEdge::Start)), None);
        assert!(bus.take_for("b").is_none());
        let intent = bus.take_for("a").unwrap();
        assert_eq!(intent.resolve_offset(10), 0);
        assert!(bus.current().is_none());
    }

    #[test]
    fn test_listeners_notified_synchronously() {
        let (mut bus, _) = bus(None);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let id = bus.subscribe(move |intent| sink.borrow_mut().push(intent.map(|intent| intent.token)));

        let token = bus.issue(FocusKind::Keyboard, Some("a"), None, None);
        bus.clear(Some(token));
        assert_eq!(*seen.borrow(), vec![Some(token), None]);

        assert!(bus.unsubscribe(id));
        bus.issue(FocusKind::Keyboard, Some("a"), None, None);
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn test_payload_resolution() {
        assert_eq!(FocusPayload::offset(40).resolve(5), 5);
        assert_eq!(FocusPayload::offset(2).resolve(5), 2);
        assert_eq!(FocusPayload::edge(CaretEdge::End).resolve(5), 5);
        assert_eq!(FocusPayload::default().resolve(5), 5);
    }
}
