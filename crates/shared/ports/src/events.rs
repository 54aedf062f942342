use async_trait::async_trait;
use vantage_core::EngineEvent;

use crate::error::SourceResult;

/// Receives engine events from a bus subscription
#[async_trait]
pub trait EventSubscriber: Send {
    /// Wait for the next event
    async fn next(&mut self) -> SourceResult<EngineEvent>;

    /// Try to receive without blocking (returns None if no event available)
    fn try_next(&mut self) -> SourceResult<Option<EngineEvent>>;
}

/// Port for the engine's push-based event bus
///
/// Every call to `listen` attaches a new handler; dropping the returned
/// subscriber detaches it.
pub trait EventBus: Send + Sync {
    fn listen(&self) -> Box<dyn EventSubscriber>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Ensure traits are object-safe
    fn _assert_bus_object_safe(_: &dyn EventBus) {}
    fn _assert_subscriber_object_safe(_: &mut dyn EventSubscriber) {}
}
