//! # Melodex Common Library
//!
//! Shared code for the Melodex catalog client:
//! - Catalog records (untyped field maps)
//! - Backend envelope normalization
//! - Error taxonomy
//! - Client configuration loading
//! - View events and the EventBus

pub mod config;
pub mod envelope;
pub mod error;
pub mod events;
pub mod record;

pub use envelope::{PageMeta, Payload};
pub use error::{Error, ErrorKind, Result};
pub use events::{EventBus, NoticeLevel, Phase, ViewEvent};
pub use record::Record;
