//! Outstanding request table
//!
//! One entry per correlation ID still waiting for its reply. An entry is
//! settled exactly once: resolved, rejected, expired by its deadline, or
//! failed when the connection goes away. Settling removes it, so a second
//! reply for the same ID finds nothing and is ignored.

use std::collections::HashMap;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::RequestError;
use crate::protocol::ServiceName;

/// Final result delivered to a waiting caller
pub type Settlement = Result<Value, RequestError>;

struct PendingRequest {
    destination: ServiceName,
    seq: u64,
    sent_at: Instant,
    tx: oneshot::Sender<Settlement>,
}

/// Correlation ID to waiting caller
#[derive(Default)]
pub struct PendingTable {
    entries: HashMap<String, PendingRequest>,
    next_seq: u64,
    closed: bool,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a request
    ///
    /// Fails once the table has been closed by a connection loss.
    pub fn insert(
        &mut self,
        correlation_id: String,
        destination: ServiceName,
    ) -> Result<oneshot::Receiver<Settlement>, RequestError> {
        if self.closed {
            return Err(RequestError::ConnectionClosed);
        }

        let (tx, rx) = oneshot::channel();
        let seq = self.next_seq;
        self.next_seq += 1;

        self.entries.insert(
            correlation_id,
            PendingRequest {
                destination,
                seq,
                sent_at: Instant::now(),
                tx,
            },
        );
        Ok(rx)
    }

    /// Deliver an outcome to the matching request
    ///
    /// Returns `false` when no request is waiting under that ID.
    pub fn settle(&mut self, correlation_id: &str, outcome: Settlement) -> bool {
        match self.entries.remove(correlation_id) {
            Some(entry) => {
                tracing::trace!(
                    correlation_id = correlation_id,
                    destination = %entry.destination,
                    elapsed_ms = entry.sent_at.elapsed().as_millis() as u64,
                    ok = outcome.is_ok(),
                    "Request settled"
                );
                // The caller may have given up already
                let _ = entry.tx.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Reject the oldest request addressed to `destination`
    ///
    /// Used for bus `NK` replies, which name the destination but carry no
    /// correlation ID.
    pub fn reject_oldest_for(
        &mut self,
        destination: &ServiceName,
        error: RequestError,
    ) -> Option<String> {
        let oldest = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.destination == *destination)
            .min_by_key(|(_, entry)| entry.seq)
            .map(|(id, _)| id.clone())?;

        self.settle(&oldest, Err(error));
        Some(oldest)
    }

    /// Forget a request whose deadline passed
    pub fn expire(&mut self, correlation_id: &str) -> bool {
        self.entries.remove(correlation_id).is_some()
    }

    /// Fail every waiting request and refuse new ones
    pub fn close(&mut self, error: RequestError) -> usize {
        self.closed = true;
        let count = self.entries.len();
        for (_, entry) in self.entries.drain() {
            let _ = entry.tx.send(Err(error.clone()));
        }
        count
    }

    /// Whether `correlation_id` is still waiting
    pub fn contains(&self, correlation_id: &str) -> bool {
        self.entries.contains_key(correlation_id)
    }

    /// Number of waiting requests
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is waiting
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the connection behind this table is gone
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn name(s: &str) -> ServiceName {
        ServiceName::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_settle_reaches_only_matching_caller() {
        let mut table = PendingTable::new();
        let mut x1 = table.insert("x1".into(), name("alpha")).unwrap();
        let mut x2 = table.insert("x2".into(), name("alpha")).unwrap();

        assert!(table.settle("x1", Ok(json!({"msg": "pong"}))));

        assert_eq!(x1.try_recv().unwrap(), Ok(json!({"msg": "pong"})));
        assert!(x2.try_recv().is_err());
        assert!(table.contains("x2"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_second_reply_ignored() {
        let mut table = PendingTable::new();
        let _rx = table.insert("x1".into(), name("alpha")).unwrap();

        assert!(table.settle("x1", Ok(json!(1))));
        assert!(!table.settle("x1", Ok(json!(2))));
    }

    #[test]
    fn test_unknown_id_not_matched() {
        let mut table = PendingTable::new();
        assert!(!table.settle("nope", Ok(Value::Null)));
    }

    #[test]
    fn test_expired_request_drops_late_reply() {
        let mut table = PendingTable::new();
        let _rx = table.insert("x1".into(), name("alpha")).unwrap();

        assert!(table.expire("x1"));
        assert!(!table.settle("x1", Ok(json!("late"))));
        assert!(table.is_empty());
    }

    #[test]
    fn test_close_fails_everything() {
        let mut table = PendingTable::new();
        let mut a = table.insert("a".into(), name("alpha")).unwrap();
        let mut b = table.insert("b".into(), name("beta")).unwrap();

        assert_eq!(table.close(RequestError::ConnectionClosed), 2);

        assert_eq!(a.try_recv().unwrap(), Err(RequestError::ConnectionClosed));
        assert_eq!(b.try_recv().unwrap(), Err(RequestError::ConnectionClosed));
        assert!(table.is_closed());
        assert_eq!(
            table.insert("c".into(), name("alpha")).unwrap_err(),
            RequestError::ConnectionClosed
        );
    }

    #[test]
    fn test_reject_oldest_for_destination() {
        let mut table = PendingTable::new();
        let mut first = table.insert("first".into(), name("ghost")).unwrap();
        let _other = table.insert("other".into(), name("alpha")).unwrap();
        let mut second = table.insert("second".into(), name("ghost")).unwrap();

        let error = RequestError::RouteNotFound {
            destination: "ghost".into(),
            message: "not registered".into(),
        };
        assert_eq!(
            table.reject_oldest_for(&name("ghost"), error.clone()),
            Some("first".to_string())
        );

        assert_eq!(first.try_recv().unwrap(), Err(error));
        assert!(second.try_recv().is_err());
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.reject_oldest_for(&name("nobody"), RequestError::ConnectionClosed),
            None
        );
    }
}
