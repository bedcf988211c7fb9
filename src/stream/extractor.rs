//! Tag extraction over an accumulating stream buffer
//!
//! Finds the first complete, non-empty `<tag>...</tag>` span in whatever
//! text has arrived so far. Absence of a match is the normal outcome while
//! the stream is still in flight, so this never errors: an opening
//! delimiter without its closer is simply pending, and the caller retries
//! once more data has been appended.
//!
//! The scan pairs each opening delimiter with the nearest following closer
//! (shortest match). Improperly nested same-named tags therefore mis-pair;
//! that is a documented limitation, not something corrected here.

/// A complete tagged segment located in the buffer
///
/// `full_match` is the entire delimited span including both delimiters,
/// which is exactly how much of the buffer the caller should consume.
/// `content` is the interior text with surrounding whitespace trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatch {
    pub tag_name: String,
    pub full_match: String,
    pub content: String,
}

impl TagMatch {
    /// Byte offset of the match within the buffer it was extracted from.
    pub fn start_in(&self, buffer: &str) -> Option<usize> {
        buffer.find(&self.full_match)
    }
}

/// Find the first complete, non-empty occurrence of `<tag>...</tag>`.
///
/// Returns `None` when no such occurrence exists yet: either the tag has
/// not appeared, its closing delimiter has not arrived (pending), or every
/// complete occurrence so far has a whitespace-only interior (suppressed).
/// Tag names are case-sensitive.
pub fn extract_tag(tag: &str, buffer: &str) -> Option<TagMatch> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);

    let mut from = 0;
    while let Some(rel) = buffer[from..].find(&open) {
        let open_at = from + rel;
        let interior_start = open_at + open.len();

        let Some(rel_close) = buffer[interior_start..].find(&close) else {
            // Opened but not yet closed: pending, not an error.
            return None;
        };
        let close_at = interior_start + rel_close;
        let end = close_at + close.len();

        let content = buffer[interior_start..close_at].trim();
        if content.is_empty() {
            // Empty tag never produces an event; keep scanning past it.
            from = end;
            continue;
        }

        return Some(TagMatch {
            tag_name: tag.to_string(),
            full_match: buffer[open_at..end].to_string(),
            content: content.to_string(),
        });
    }

    None
}
