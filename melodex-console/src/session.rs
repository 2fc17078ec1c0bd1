//! Session token holder
//!
//! The HTTP client reads the bearer token from here on every request and
//! clears it when the backend answers 401/403.

use std::sync::RwLock;

pub trait SessionStore: Send + Sync {
    fn token(&self) -> Option<String>;
    fn set_token(&self, token: Option<String>);
    fn clear(&self) {
        self.set_token(None);
    }
}

/// Session kept in memory for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemorySession {
    token: RwLock<Option<String>>,
}

impl MemorySession {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }
}

impl SessionStore for MemorySession {
    fn token(&self) -> Option<String> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_token(&self, token: Option<String>) {
        match self.token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }
}
