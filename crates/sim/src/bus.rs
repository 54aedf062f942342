//! Broadcast-channel event bus for single-process mode
//!
//! Events are passed directly, without serialization. A slow listener that
//! falls behind skips the events it missed.

use async_trait::async_trait;
use log::{debug, trace};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use vantage_core::EngineEvent;
use vantage_ports::{EventBus, EventSubscriber, SourceError, SourceResult};

/// Event bus backed by a `tokio::sync::broadcast` channel
pub struct ChannelEventBus {
    /// `None` once the bus has been closed
    tx: RwLock<Option<broadcast::Sender<EngineEvent>>>,
    capacity: usize,
}

impl ChannelEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx: RwLock::new(Some(tx)),
            capacity,
        }
    }

    /// Publish an event to every listener; returns how many received it
    pub fn publish(&self, event: EngineEvent) -> usize {
        let guard = self.tx.read();
        match guard.as_ref() {
            Some(tx) => {
                let name = event.name();
                let delivered = tx.send(event).unwrap_or(0);
                trace!("Published {} to {} listeners", name, delivered);
                delivered
            }
            None => 0,
        }
    }

    /// Number of attached listeners
    pub fn listener_count(&self) -> usize {
        self.tx.read().as_ref().map_or(0, |tx| tx.receiver_count())
    }

    /// Close the bus; listeners see `ChannelClosed` once drained
    pub fn close(&self) {
        if self.tx.write().take().is_some() {
            debug!("Event bus closed");
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ChannelEventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus for ChannelEventBus {
    fn listen(&self) -> Box<dyn EventSubscriber> {
        let rx = match self.tx.read().as_ref() {
            Some(tx) => tx.subscribe(),
            None => {
                // Closed bus: hand out a receiver whose sender is already gone
                let (_, rx) = broadcast::channel(1);
                rx
            }
        };
        Box::new(ChannelEventSubscriber { rx })
    }
}

/// One listener on a [`ChannelEventBus`]
pub struct ChannelEventSubscriber {
    rx: broadcast::Receiver<EngineEvent>,
}

#[async_trait]
impl EventSubscriber for ChannelEventSubscriber {
    async fn next(&mut self) -> SourceResult<EngineEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Ok(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Listener lagged, skipped {} events", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(SourceError::ChannelClosed);
                }
            }
        }
    }

    fn try_next(&mut self) -> SourceResult<Option<EngineEvent>> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Ok(Some(event)),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SourceError::ChannelClosed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use vantage_core::PriceMap;

    fn prices(symbol: &str) -> EngineEvent {
        let mut map = PriceMap::new();
        map.insert(symbol.to_string(), dec!(1));
        EngineEvent::PricesUpdated(map)
    }

    #[tokio::test]
    async fn test_every_listener_receives() {
        let bus = ChannelEventBus::new(8);
        let mut a = bus.listen();
        let mut b = bus.listen();
        assert_eq!(bus.listener_count(), 2);

        assert_eq!(bus.publish(prices("BTC-USD")), 2);
        assert_eq!(a.next().await.unwrap(), prices("BTC-USD"));
        assert_eq!(b.next().await.unwrap(), prices("BTC-USD"));
    }

    #[tokio::test]
    async fn test_dropping_listener_detaches() {
        let bus = ChannelEventBus::new(8);
        let listener = bus.listen();
        drop(listener);
        assert_eq!(bus.listener_count(), 0);
        assert_eq!(bus.publish(prices("BTC-USD")), 0);
    }

    #[tokio::test]
    async fn test_try_next_empty_then_event() {
        let bus = ChannelEventBus::new(8);
        let mut listener = bus.listen();
        assert_eq!(listener.try_next().unwrap(), None);

        bus.publish(prices("ETH-USD"));
        assert_eq!(listener.try_next().unwrap(), Some(prices("ETH-USD")));
    }

    #[tokio::test]
    async fn test_lagged_listener_skips_to_latest() {
        let bus = ChannelEventBus::new(2);
        let mut listener = bus.listen();
        for symbol in ["A", "B", "C", "D"] {
            bus.publish(prices(symbol));
        }

        assert_eq!(listener.next().await.unwrap(), prices("C"));
        assert_eq!(listener.next().await.unwrap(), prices("D"));
    }

    #[tokio::test]
    async fn test_close_ends_listeners() {
        let bus = ChannelEventBus::new(8);
        let mut listener = bus.listen();
        bus.close();

        assert_eq!(listener.next().await, Err(SourceError::ChannelClosed));
        let mut late = bus.listen();
        assert_eq!(late.next().await, Err(SourceError::ChannelClosed));
    }
}
