//! Typed event bus between connector adapters and the session.
//!
//! Adapters translate wallet-specific notifications into [`WalletEvent`]s and
//! publish them through an [`EventSink`]. Each sink is stamped with the
//! connection generation it was issued for, so the session can drop events
//! coming from a handle it has already replaced.

use std::cell::RefCell;

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};

use crate::config::EVENT_NAMESPACE;

/// Wallet notification in normalized form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletEvent {
    /// The exposed account list changed. Empty means the wallet locked or revoked access.
    AccountsChanged { accounts: Vec<String> },
    ChainChanged { chain_id: u64 },
    Disconnected { reason: Option<String> },
}

/// An event tagged with the connection generation that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub generation: u64,
    pub event: WalletEvent,
}

/// Publishing half handed to a connector on connect.
#[derive(Clone, Debug)]
pub struct EventSink {
    generation: u64,
    tx: UnboundedSender<Envelope>,
}

impl EventSink {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn publish(&self, event: WalletEvent) {
        log::debug!(target: EVENT_NAMESPACE, "publish {event:?} (generation {})", self.generation);
        let envelope = Envelope {
            generation: self.generation,
            event,
        };
        if self.tx.unbounded_send(envelope).is_err() {
            log::debug!(target: EVENT_NAMESPACE, "event bus closed, dropping event");
        }
    }
}

/// Single-consumer bus owned by the session.
#[derive(Debug)]
pub struct EventBus {
    tx: UnboundedSender<Envelope>,
    rx: RefCell<Option<UnboundedReceiver<Envelope>>>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx: RefCell::new(Some(rx)),
        }
    }

    /// Create a sink for the given connection generation.
    pub fn sink(&self, generation: u64) -> EventSink {
        EventSink {
            generation,
            tx: self.tx.clone(),
        }
    }

    /// Take the receiving half. Only the first call gets it.
    pub fn take_receiver(&self) -> Option<UnboundedReceiver<Envelope>> {
        self.rx.borrow_mut().take()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_sink_stamps_generation() {
        let bus = EventBus::new();
        let mut rx = bus.take_receiver().unwrap();
        bus.sink(3).publish(WalletEvent::ChainChanged { chain_id: 137 });

        let envelope = futures::executor::block_on(rx.next()).unwrap();
        assert_eq!(envelope.generation, 3);
        assert_eq!(envelope.event, WalletEvent::ChainChanged { chain_id: 137 });
    }

    #[test]
    fn test_receiver_taken_once() {
        let bus = EventBus::new();
        assert!(bus.take_receiver().is_some());
        assert!(bus.take_receiver().is_none());
    }

    #[test]
    fn test_publish_after_close_is_silent() {
        let bus = EventBus::new();
        drop(bus.take_receiver());
        bus.sink(1).publish(WalletEvent::Disconnected { reason: None });
    }
}
