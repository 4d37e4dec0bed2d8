use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::domain::{RequestId, ResponsePayload};
use crate::error::BridgeError;

/// Success payload, or the human-readable reason delivered through `sendError`.
pub type RequestOutcome = Result<ResponsePayload, String>;

/// Identifies one registration. Page-issued ids restart after a reload, so the id alone
/// cannot tell an orphaned flow apart from a new request reusing the same number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket {
    pub id: RequestId,
    seq: u64,
}

impl RequestTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug)]
struct PendingRequest {
    seq: u64,
    created_at: Instant,
    sender: oneshot::Sender<RequestOutcome>,
}

/// Tracks in-flight requests. Each registration is settled at most once, and only by the
/// holder of its ticket; settling a stale or unknown ticket is a no-op so late results
/// after teardown are discarded quietly.
#[derive(Debug, Default)]
pub struct RequestCorrelator {
    pending: Mutex<HashMap<RequestId, PendingRequest>>,
    next_seq: AtomicU64,
}

#[derive(Debug)]
pub struct ResponseWaiter {
    ticket: RequestTicket,
    receiver: oneshot::Receiver<RequestOutcome>,
}

impl ResponseWaiter {
    pub fn id(&self) -> RequestId {
        self.ticket.id
    }

    pub fn ticket(&self) -> RequestTicket {
        self.ticket
    }

    /// `None` when the request was orphaned by teardown.
    pub async fn wait(self) -> Option<RequestOutcome> {
        self.receiver.await.ok()
    }
}

impl RequestCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<RequestId, PendingRequest>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, id: RequestId) -> Result<ResponseWaiter, BridgeError> {
        let mut pending = self.pending();
        if pending.contains_key(&id) {
            return Err(BridgeError::DuplicateRequest(id));
        }
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();
        pending.insert(
            id,
            PendingRequest {
                seq,
                created_at: Instant::now(),
                sender,
            },
        );
        Ok(ResponseWaiter {
            ticket: RequestTicket { id, seq },
            receiver,
        })
    }

    pub fn resolve(&self, ticket: RequestTicket, payload: ResponsePayload) -> bool {
        self.settle(ticket, Ok(payload))
    }

    pub fn reject(&self, ticket: RequestTicket, reason: impl Into<String>) -> bool {
        self.settle(ticket, Err(reason.into()))
    }

    fn settle(&self, ticket: RequestTicket, outcome: RequestOutcome) -> bool {
        let request = {
            let mut pending = self.pending();
            match pending.get(&ticket.id) {
                Some(request) if request.seq == ticket.seq => pending.remove(&ticket.id),
                _ => None,
            }
        };
        let Some(request) = request else {
            tracing::debug!(
                id = ticket.id,
                seq = ticket.seq,
                "no waiter for ticket; result discarded"
            );
            return false;
        };
        // The waiter may already be gone; that is equivalent to an orphan.
        request.sender.send(outcome).is_ok()
    }

    pub fn is_pending(&self, ticket: RequestTicket) -> bool {
        self.pending()
            .get(&ticket.id)
            .is_some_and(|r| r.seq == ticket.seq)
    }

    pub fn pending_count(&self) -> usize {
        self.pending().len()
    }

    pub fn age_of(&self, id: RequestId) -> Option<Duration> {
        self.pending().get(&id).map(|r| r.created_at.elapsed())
    }

    /// Drops every pending registration. Returns how many were orphaned.
    pub fn clear(&self) -> usize {
        let drained: Vec<_> = self.pending().drain().collect();
        drained.len()
    }
}
