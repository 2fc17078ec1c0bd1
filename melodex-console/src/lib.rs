//! Melodex management console
//!
//! Headless list-view controllers for the music catalog backend: fetch,
//! filter, paginate, render and act on records, one controller per screen.

pub mod actions;
pub mod client;
pub mod controller;
pub mod filter;
pub mod form;
pub mod pagination;
pub mod render;
pub mod screens;
pub mod session;
pub mod source;

use melodex_common::config::ClientConfig;
use melodex_common::{EventBus, Result};
use std::sync::Arc;

pub use actions::{ActionKind, AutoConfirm, Confirm};
pub use client::ApiClient;
pub use controller::{ActionResult, ListController, LoadOutcome, Snapshot};
pub use filter::Criteria;
pub use screens::{Portal, ScreenSpec};
pub use session::{MemorySession, SessionStore};
pub use source::{HttpSource, RecordSource};

/// Everything a set of screens share: one HTTP client and one event bus
pub struct Console {
    client: Arc<ApiClient>,
    events: EventBus,
    confirm: Arc<dyn Confirm>,
}

impl Console {
    /// Build from resolved configuration; a configured token seeds the session
    pub fn new(config: &ClientConfig, confirm: Arc<dyn Confirm>) -> Result<Self> {
        let session = Arc::new(MemorySession::new(config.token.clone()));
        Ok(Self {
            client: Arc::new(ApiClient::new(config, session)?),
            events: EventBus::default(),
            confirm,
        })
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Controller for one screen, optionally scoped to a parent id
    pub fn open(
        &self,
        screen: &'static ScreenSpec,
        scope: Option<String>,
    ) -> ListController<HttpSource> {
        let source = Arc::new(HttpSource::new(self.client.clone(), screen, scope));
        ListController::new(screen, source, self.events.clone(), self.confirm.clone())
    }
}
