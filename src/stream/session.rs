//! Streaming session - buffer ownership and the extraction loop
//!
//! One session owns the text buffer for one client-facing exchange. Chunks
//! arrive in arbitrary sizes and split points; after each append the buffer
//! is rescanned and every newly completed tagged segment (plus the untagged
//! prose in front of it) comes back as discrete events, in stream order.
//! The buffer always holds exactly the suffix not yet emitted.

use serde::{Deserialize, Serialize};

use super::extractor::extract_tag;

/// A discrete unit forwarded to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Untagged prose surrounding tagged segments
    Text { content: String },
    /// A completed tagged segment, e.g. a thinking aside or tool call
    Tag { name: String, content: String },
    /// End of stream
    Done,
}

/// Per-session stream processor
pub struct StreamSession {
    buffer: String,
    tags: Vec<String>,
}

impl StreamSession {
    /// Create a session scanning for the given tag names.
    pub fn new(tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            buffer: String::new(),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Append an upstream chunk and return the events it completed.
    pub fn push_chunk(&mut self, chunk: &str) -> Vec<StreamEvent> {
        self.buffer.push_str(chunk);
        self.drain_complete()
    }

    /// Final pass at end of stream: one more scan, then flush whatever
    /// unmatched text remains as a trailing event. A permanently
    /// unterminated tag surfaces here as plain text.
    pub fn finish(mut self) -> Vec<StreamEvent> {
        let mut events = self.drain_complete();
        let trailing = self.buffer.trim();
        if !trailing.is_empty() {
            events.push(StreamEvent::Text {
                content: trailing.to_string(),
            });
        }
        events
    }

    /// Text accumulated but not yet emitted.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    fn drain_complete(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        loop {
            // Earliest complete match across all configured tag names.
            let best = self
                .tags
                .iter()
                .filter_map(|tag| {
                    let m = extract_tag(tag, &self.buffer)?;
                    let start = m.start_in(&self.buffer)?;
                    Some((start, m))
                })
                .min_by_key(|(start, _)| *start);

            let Some((start, m)) = best else {
                break;
            };

            let leading = self.buffer[..start].trim();
            if !leading.is_empty() {
                events.push(StreamEvent::Text {
                    content: leading.to_string(),
                });
            }
            events.push(StreamEvent::Tag {
                name: m.tag_name.clone(),
                content: m.content.clone(),
            });

            self.buffer.drain(..start + m.full_match.len());
        }

        events
    }
}
