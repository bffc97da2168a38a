//! Correlation table
//!
//! Tracks every request the bridge has submitted and every reply that came
//! back for one. Entries stay until the caller consumes the reply, so a reply
//! that lands after the caller gave up can still be picked up by re-polling.
//! [`CorrelationTable::sweep`] bounds how long that window lasts: unclaimed
//! replies and timed-out requests older than the retention are removed.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use types::{CorrelationId, SummaryResponse};

/// What the caller asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// A sales spec entering the pipeline
    Submission,
    /// A read of the summarizer's stored results
    SummaryRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    /// A reply is waiting in the reply table
    Fulfilled,
    /// The caller stopped waiting; a late reply is still accepted
    TimedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub correlation_id: CorrelationId,
    pub kind: RequestKind,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    /// Last status change, used for retention
    pub updated_at: Instant,
}

#[derive(Debug)]
struct StoredReply {
    reply: SummaryResponse,
    received_at: Instant,
}

/// What one [`CorrelationTable::sweep`] removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub replies: usize,
    pub requests: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.replies == 0 && self.requests == 0
    }
}

#[derive(Debug, Default)]
pub struct CorrelationTable {
    requests: HashMap<CorrelationId, PendingRequest>,
    replies: HashMap<CorrelationId, StoredReply>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new request under an id not in use by any entry or reply
    pub fn open(&mut self, kind: RequestKind) -> CorrelationId {
        let mut id = CorrelationId::new();
        while self.requests.contains_key(&id) || self.replies.contains_key(&id) {
            id = CorrelationId::new();
        }
        self.requests.insert(
            id,
            PendingRequest {
                correlation_id: id,
                kind,
                status: RequestStatus::Pending,
                created_at: Utc::now(),
                updated_at: Instant::now(),
            },
        );
        id
    }

    /// Store a reply. Returns false when no request is known for `id`.
    pub fn store_reply(&mut self, id: CorrelationId, reply: SummaryResponse) -> bool {
        let now = Instant::now();
        self.replies.insert(
            id,
            StoredReply {
                reply,
                received_at: now,
            },
        );
        match self.requests.get_mut(&id) {
            Some(request) => {
                request.status = RequestStatus::Fulfilled;
                request.updated_at = now;
                true
            }
            None => false,
        }
    }

    /// Remove and return the reply for `id` along with its request entry
    pub fn take_reply(&mut self, id: &CorrelationId) -> Option<SummaryResponse> {
        let stored = self.replies.remove(id)?;
        self.requests.remove(id);
        Some(stored.reply)
    }

    pub fn mark_timed_out(&mut self, id: &CorrelationId) {
        if let Some(request) = self.requests.get_mut(id) {
            if request.status == RequestStatus::Pending {
                request.status = RequestStatus::TimedOut;
                request.updated_at = Instant::now();
            }
        }
    }

    pub fn get(&self, id: &CorrelationId) -> Option<&PendingRequest> {
        self.requests.get(id)
    }

    /// Requests still waiting for a reply
    pub fn pending_count(&self) -> usize {
        self.requests
            .values()
            .filter(|r| r.status == RequestStatus::Pending)
            .count()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn reply_count(&self) -> usize {
        self.replies.len()
    }

    /// Drop replies nobody collected within `retention` of arriving, together
    /// with their requests, and timed-out requests that stayed unanswered for
    /// `retention`. Pending requests are never swept.
    pub fn sweep(&mut self, retention: Duration, now: Instant) -> SweepReport {
        let expired = |at: Instant| now.saturating_duration_since(at) >= retention;

        let stale: Vec<CorrelationId> = self
            .replies
            .iter()
            .filter(|(_, stored)| expired(stored.received_at))
            .map(|(id, _)| *id)
            .collect();
        let mut report = SweepReport {
            replies: stale.len(),
            requests: 0,
        };
        for id in &stale {
            self.replies.remove(id);
            if self.requests.remove(id).is_some() {
                report.requests += 1;
            }
        }

        let before = self.requests.len();
        self.requests.retain(|_, request| {
            !(request.status == RequestStatus::TimedOut && expired(request.updated_at))
        });
        report.requests += before - self.requests.len();
        report
    }
}
