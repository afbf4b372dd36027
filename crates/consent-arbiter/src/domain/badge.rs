//! Badge text for the queue counter.

/// Counter text for `pending` queued requests; `None` clears the badge.
pub fn badge_text(pending: usize) -> Option<String> {
    (pending > 0).then(|| pending.to_string())
}
