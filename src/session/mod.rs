//! Translation session management
//!
//! This module provides the `TranslationSession` abstraction that manages:
//! - Validated session configuration (languages, voice, credentials)
//! - Audio input ownership for the session's lifetime
//! - The backend handle and its start/stop lifecycle
//! - Ordered event delivery to the caller's sink
//! - Session statistics

mod config;
mod session;
mod stats;

pub use config::{Credentials, SessionConfig};
pub use session::{SessionState, TranslationSession};
pub use stats::SessionStats;
