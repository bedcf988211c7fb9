//! Stream Processing Module
//!
//! Incremental tag-delimited stream handling: extraction of complete
//! tagged segments from chunked model output, per-session buffering,
//! and SSE forwarding to the live client connection.

pub mod extractor;
pub mod forwarder;
pub mod session;

pub use extractor::{extract_tag, TagMatch};
pub use forwarder::{ForwardError, SseForwarder};
pub use session::{StreamEvent, StreamSession};
