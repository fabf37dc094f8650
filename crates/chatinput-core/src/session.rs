//! Per-user session holding at most one active context.
//!
//! The session only stores state. Cancelling timeouts and invoking handlers
//! of a context that leaves the slot is the coordinator's job; every mutation
//! hands the previous occupant back to the caller for exactly that purpose.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::context::RequestContext;
use crate::types::{ContextId, UserId};

#[derive(Debug, Default)]
struct Slot {
    active: Option<Arc<RequestContext>>,
    closed: bool,
}

#[derive(Debug)]
pub struct UserSession {
    owner: UserId,
    slot: Mutex<Slot>,
}

impl UserSession {
    pub fn new(owner: UserId) -> Self {
        Self {
            owner,
            slot: Mutex::new(Slot::default()),
        }
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    /// Atomically store `context` and return the previous one. A closed
    /// session refuses and hands `context` back as the error.
    pub(crate) fn set_active_context(
        &self,
        context: Arc<RequestContext>,
    ) -> Result<Option<Arc<RequestContext>>, Arc<RequestContext>> {
        let mut slot = self.slot.lock();
        if slot.closed {
            return Err(context);
        }
        Ok(slot.active.replace(context))
    }

    /// Atomically empty the slot and return what was in it.
    pub(crate) fn clear_context(&self) -> Option<Arc<RequestContext>> {
        self.slot.lock().active.take()
    }

    /// Empty the slot only if it still holds the context `id`.
    pub(crate) fn clear_if(&self, id: ContextId) -> Option<Arc<RequestContext>> {
        let mut slot = self.slot.lock();
        if slot.active.as_ref().is_some_and(|ctx| ctx.id() == id) {
            slot.active.take()
        } else {
            None
        }
    }

    /// Refuse further contexts and return the active one.
    pub(crate) fn close(&self) -> Option<Arc<RequestContext>> {
        let mut slot = self.slot.lock();
        slot.closed = true;
        slot.active.take()
    }

    pub fn is_closed(&self) -> bool {
        self.slot.lock().closed
    }

    pub fn has_active_context(&self) -> bool {
        self.slot.lock().active.is_some()
    }

    /// Snapshot of the active context.
    pub fn active_context(&self) -> Option<Arc<RequestContext>> {
        self.slot.lock().active.clone()
    }
}
