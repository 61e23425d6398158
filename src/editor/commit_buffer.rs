//! 遅延コミットバッファ
//!
//! 連続入力をまとめ、最後の入力から一定時間後に一度だけコミットする

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct CommitBuffer {
    /// コミット待ちのテキスト
    pending: Option<String>,
    /// コミット予定時刻
    due_at: Option<Instant>,
    delay: Duration,
}

impl CommitBuffer {
    pub fn new(delay: Duration) -> Self {
        Self {
            pending: None,
            due_at: None,
            delay,
        }
    }

    /// 予約済みのコミットを取り消して予約し直す
    pub fn schedule(&mut self, text: String, now: Instant) {
        self.pending = Some(text);
        self.due_at = Some(now + self.delay);
    }

    /// コミット時刻を過ぎたか
    pub fn should_flush(&self, now: Instant) -> bool {
        self.pending.is_some() && self.due_at.is_some_and(|due| now >= due)
    }

    /// 時刻を過ぎていれば取り出す
    pub fn take_due(&mut self, now: Instant) -> Option<String> {
        if self.should_flush(now) {
            self.flush()
        } else {
            None
        }
    }

    /// 時刻に関係なく取り出す
    pub fn flush(&mut self) -> Option<String> {
        self.due_at = None;
        self.pending.take()
    }

    /// 予約を破棄する
    pub fn cancel(&mut self) -> bool {
        self.due_at = None;
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn peek(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rescheduling_coalesces() {
        let start = Instant::now();
        let mut buffer = CommitBuffer::new(Duration::from_millis(220));
        buffer.schedule("a".into(), start);
        buffer.schedule("ab".into(), start + Duration::from_millis(200));

        assert_eq!(buffer.take_due(start + Duration::from_millis(300)), None);
        assert_eq!(
            buffer.take_due(start + Duration::from_millis(420)),
            Some("ab".to_string())
        );
        assert!(!buffer.is_pending());
    }

    #[test]
    fn test_flush_and_cancel() {
        let now = Instant::now();
        let mut buffer = CommitBuffer::new(Duration::from_millis(220));
        buffer.schedule("x".into(), now);
        assert_eq!(buffer.peek(), Some("x"));
        assert_eq!(buffer.flush(), Some("x".to_string()));
        assert_eq!(buffer.flush(), None);

        buffer.schedule("y".into(), now);
        assert!(buffer.cancel());
        assert!(!buffer.should_flush(now + Duration::from_secs(1)));
    }
}
