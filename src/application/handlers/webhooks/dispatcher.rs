//! Event-type keyed dispatcher.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::billing::{BillingEventType, ReconciliationHandler, WebhookDispatcher};
use crate::ports::AccountResolver;

use super::{CheckoutCompletedHandler, CreditTopUpHandler, SubscriptionSyncHandler};

/// Routes events to handlers by their parsed event type.
pub struct EventTypeDispatcher {
    handlers: HashMap<BillingEventType, Arc<dyn ReconciliationHandler>>,
}

impl EventTypeDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers a handler for every event type it declares.
    pub fn register(&mut self, handler: Arc<dyn ReconciliationHandler>) {
        for event_type in handler.handles() {
            self.handlers.insert(event_type, handler.clone());
        }
    }

    /// Builds the production dispatcher with all event handlers wired.
    pub fn with_default_handlers(resolver: Arc<dyn AccountResolver>) -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register(Arc::new(CheckoutCompletedHandler::new(resolver.clone())));
        dispatcher.register(Arc::new(SubscriptionSyncHandler::new(resolver.clone())));
        dispatcher.register(Arc::new(CreditTopUpHandler::new(resolver)));
        dispatcher
    }
}

impl Default for EventTypeDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl WebhookDispatcher for EventTypeDispatcher {
    fn get_handler(&self, event_type: BillingEventType) -> Option<&dyn ReconciliationHandler> {
        self.handlers.get(&event_type).map(|h| h.as_ref())
    }
}
