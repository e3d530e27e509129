use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::app::domain::messages::Message;
use crate::app::infrastructure::error::{AppError, HandlerError, Result};

/// Handle returned by [`Publisher::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

type Handler<M> = dyn Fn(&M) -> std::result::Result<(), HandlerError>;

struct Subscription {
    id: SubscriptionId,
    /// Always an `Rc<Handler<M>>` for the `M` this entry is filed under.
    handler: Box<dyn Any>,
}

/// Synchronous, type-routed publish/subscribe bus.
///
/// One instance per editing session, shared through `Rc`. Handlers for a
/// message type run in subscription order. The handler list is copied
/// before dispatch, so handlers may subscribe or unsubscribe freely while a
/// message is being delivered; changes apply from the next `publish`.
///
/// The bus is not thread-safe.
#[derive(Default)]
pub struct Publisher {
    subscriptions: RefCell<HashMap<TypeId, Vec<Subscription>>>,
    next_id: Cell<u64>,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<M, F>(&self, handler: F) -> SubscriptionId
    where
        M: Message,
        F: Fn(&M) -> std::result::Result<(), HandlerError> + 'static,
    {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let handler: Rc<Handler<M>> = Rc::new(handler);
        self.subscriptions
            .borrow_mut()
            .entry(TypeId::of::<M>())
            .or_default()
            .push(Subscription {
                id,
                handler: Box::new(handler),
            });
        tracing::debug!(topic = M::TOPIC, subscription = id.0, "subscribed");
        id
    }

    /// Remove a subscription. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.borrow_mut();
        for entries in subscriptions.values_mut() {
            if let Some(pos) = entries.iter().position(|s| s.id == id) {
                entries.remove(pos);
                return true;
            }
        }
        false
    }

    pub fn subscriber_count<M: Message>(&self) -> usize {
        self.subscriptions
            .borrow()
            .get(&TypeId::of::<M>())
            .map_or(0, Vec::len)
    }

    /// Deliver `message` to every handler subscribed to its type.
    ///
    /// The first failing handler stops delivery and its error is returned.
    /// Whatever state change led to the message is not undone.
    pub fn publish<M: Message>(&self, message: &M) -> Result<()> {
        let handlers: Vec<Rc<Handler<M>>> = {
            let subscriptions = self.subscriptions.borrow();
            match subscriptions.get(&TypeId::of::<M>()) {
                Some(entries) => entries
                    .iter()
                    .filter_map(|s| s.handler.downcast_ref::<Rc<Handler<M>>>())
                    .cloned()
                    .collect(),
                None => Vec::new(),
            }
        };

        tracing::trace!(topic = M::TOPIC, handlers = handlers.len(), "publish");
        for handler in handlers {
            handler(message).map_err(|source| AppError::Handler {
                topic: M::TOPIC,
                source,
            })?;
        }
        Ok(())
    }
}
