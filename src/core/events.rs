//! Ledger events for live displays and other observers.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    /// A transaction was admitted to the mempool
    Transaction {
        payer: String,
        payee: String,
        amount: u64,
        fee: u64,
    },
    MiningStarted {
        miner: String,
        height: usize,
        transactions: usize,
    },
    MiningCompleted {
        height: usize,
        hash: String,
        attempts: u64,
        elapsed_ms: u128,
    },
    Error {
        message: String,
    },
}

/// Fan-out of events to every live subscriber.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<LedgerEvent>>>,
}

impl EventBus {
    pub fn new() -> EventBus {
        EventBus::default()
    }

    pub fn subscribe(&self) -> Receiver<LedgerEvent> {
        let (sender, receiver) = unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sender);
        receiver
    }

    /// Sends to all subscribers, dropping the ones whose receiver is gone.
    pub fn publish(&self, event: LedgerEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|sender| sender.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_subscribers() {
        let bus = EventBus::new();
        let first = bus.subscribe();
        let second = bus.subscribe();

        bus.publish(LedgerEvent::Error {
            message: "boom".to_string(),
        });

        assert!(matches!(first.try_recv(), Ok(LedgerEvent::Error { .. })));
        assert!(matches!(second.try_recv(), Ok(LedgerEvent::Error { .. })));
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());

        bus.publish(LedgerEvent::Error {
            message: "x".to_string(),
        });

        assert_eq!(bus.subscriber_count(), 1);
        assert!(kept.try_recv().is_ok());
    }
}
