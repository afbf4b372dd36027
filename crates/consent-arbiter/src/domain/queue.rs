//! In-memory view of the durable consent queue.
//!
//! Ordering rule: a new request goes right after the last queued request of
//! the same type, or at the end when none exists. Same-type requests stay
//! contiguous and in insertion order.

use super::entities::{ConsentRequest, ConsentType, RequestId};

/// Ordered pending requests plus the id counter.
#[derive(Debug, Clone, Default)]
pub struct ConsentQueue {
    requests: Vec<ConsentRequest>,
    next_id: RequestId,
}

impl ConsentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted requests.
    ///
    /// The counter is recomputed as `max(id) + 1`, or 0 for an empty queue.
    pub fn restore(requests: Vec<ConsentRequest>) -> Self {
        let next_id = requests
            .iter()
            .map(|r| r.id)
            .max()
            .map_or(0, |max| max.saturating_add(1));
        Self { requests, next_id }
    }

    /// Take the next id. Ids are never handed out twice.
    pub fn allocate_id(&mut self) -> RequestId {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    pub fn next_id(&self) -> RequestId {
        self.next_id
    }

    /// Position a request of `kind` would be inserted at.
    pub fn insertion_index(&self, kind: ConsentType) -> usize {
        self.requests
            .iter()
            .rposition(|r| r.kind() == kind)
            .map_or(self.requests.len(), |last| last + 1)
    }

    /// Insert by the grouping rule; returns the position used.
    pub fn insert(&mut self, request: ConsentRequest) -> usize {
        let index = self.insertion_index(request.kind());
        self.requests.insert(index, request);
        index
    }

    pub fn remove(&mut self, id: RequestId) -> Option<ConsentRequest> {
        let index = self.requests.iter().position(|r| r.id == id)?;
        Some(self.requests.remove(index))
    }

    /// Remove every request of `kind`, or all requests when `None`.
    pub fn drain_matching(&mut self, kind: Option<ConsentType>) -> Vec<ConsentRequest> {
        let (drained, kept) = std::mem::take(&mut self.requests)
            .into_iter()
            .partition(|r| kind.map_or(true, |k| r.kind() == k));
        self.requests = kept;
        drained
    }

    pub fn get(&self, id: RequestId) -> Option<&ConsentRequest> {
        self.requests.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn requests(&self) -> &[ConsentRequest] {
        &self.requests
    }

    pub fn snapshot(&self) -> Vec<ConsentRequest> {
        self.requests.clone()
    }
}
