//! Recognition events and the sinks that observe them
//!
//! A translation backend reports everything through a single typed event
//! stream (`RecognitionEvent`). The session forwards that stream, in order,
//! to one `EventSink`:
//! - `ConsoleSink` prints the human-readable console lines
//! - `EventLogSink` appends JSON lines for later replay
//! - `FanoutSink` combines several sinks

mod event;
mod render;
mod sink;

pub use event::{
    AudioChunk, CancellationErrorCode, CancellationReason, RecognitionEvent, ResultReason,
    Translations,
};
pub use render::render_event;
pub use sink::{ConsoleSink, EventLogSink, EventSink, FanoutSink};
