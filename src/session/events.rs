use tokio::sync::broadcast;

/// Why the session token was invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A previously accepted token was rejected on an ordinary call.
    TokenExpired,
    /// The login call itself was rejected.
    Unauthorized,
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEvent::TokenExpired => write!(f, "session expired"),
            SessionEvent::Unauthorized => write!(f, "unauthorized"),
        }
    }
}

/// Broadcast bus for session invalidation notices.
///
/// Publishing never fails: with no subscribers the event is simply dropped.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: SessionEvent) {
        // SendError only means nobody is listening.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_events() {
        let events = SessionEvents::default();
        let mut rx = events.subscribe();
        events.publish(SessionEvent::TokenExpired);
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::TokenExpired);
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let events = SessionEvents::default();
        assert_eq!(events.subscriber_count(), 0);
        events.publish(SessionEvent::Unauthorized);
    }
}
