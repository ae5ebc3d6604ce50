mod auth;
mod events;
mod store;

pub use auth::{AuthApi, LoginRequest, LoginResponse};
pub use events::{SessionEvent, SessionEvents};
pub use store::TokenStore;

/// Token store plus the bus its invalidations are announced on.
///
/// Handed to the transport client instead of living in a global.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub tokens: TokenStore,
    pub events: SessionEvents,
}

impl Session {
    pub fn new(tokens: TokenStore) -> Self {
        Self {
            tokens,
            events: SessionEvents::default(),
        }
    }

    /// Clear the token and publish exactly one notice.
    pub fn invalidate(&self, event: SessionEvent) {
        self.tokens.clear();
        self.events.publish(event);
    }
}
