//! Captured requests, kept in a fixed-capacity ring buffer.
//!
//! Captured requests are serialized in the rule wire format so a capture
//! can be edited and posted back as a rule.

use crate::rule::{MatchRequest, RuleDefinition};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Number of requests kept when no capacity is configured.
pub const DEFAULT_CAPACITY: usize = 40;

/// A request as received, in the rule wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedRequest {
    #[serde(flatten)]
    pub definition: RuleDefinition,
    pub timestamp: DateTime<Utc>,
}

impl CapturedRequest {
    pub fn from_request(request: &MatchRequest) -> Self {
        Self {
            definition: request.to_definition(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug)]
struct Ring {
    entries: Vec<CapturedRequest>,
    // Index of the slot the next push writes once the buffer is full.
    cursor: usize,
}

/// The most recent requests, oldest first. Capacity 0 disables capture.
#[derive(Debug)]
pub struct RequestLog {
    capacity: usize,
    ring: Mutex<Ring>,
}

impl Default for RequestLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RequestLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ring: Mutex::new(Ring {
                entries: Vec::with_capacity(capacity),
                cursor: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Store a request, overwriting the oldest one when full.
    pub fn push(&self, request: CapturedRequest) {
        if self.capacity == 0 {
            return;
        }
        let mut ring = self.ring.lock();
        if ring.entries.len() < self.capacity {
            ring.entries.push(request);
            return;
        }
        let cursor = ring.cursor;
        ring.entries[cursor] = request;
        ring.cursor = (cursor + 1) % self.capacity;
    }

    /// Copy of the stored requests, oldest first.
    pub fn snapshot(&self) -> Vec<CapturedRequest> {
        let ring = self.ring.lock();
        let (newer, older) = ring.entries.split_at(ring.cursor);
        older.iter().chain(newer).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.ring.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
