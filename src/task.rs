//! Single-shot tasks whose completion is dropped once the owner is gone.
//!
//! An owning component holds a [`TaskScope`]. Issuing a task yields the
//! owner-side [`Task`] and a [`Completer`] that travels with the work. The
//! completer only delivers while the task is uncancelled and the scope is
//! alive, so a late resolution after teardown never writes stale state.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

#[derive(Debug)]
pub struct TaskScope {
    alive: Rc<Cell<bool>>,
}

impl TaskScope {
    pub fn new() -> Self {
        Self {
            alive: Rc::new(Cell::new(true)),
        }
    }

    pub fn issue<T>(&self) -> (Task<T>, Completer<T>) {
        let slot = Rc::new(RefCell::new(None));
        let cancelled = Rc::new(Cell::new(false));
        let completer = Completer {
            slot: Rc::downgrade(&slot),
            scope: Rc::downgrade(&self.alive),
            cancelled: Rc::clone(&cancelled),
        };
        let task = Task {
            slot,
            scope: Rc::downgrade(&self.alive),
            cancelled,
        };
        (task, completer)
    }

    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }

    /// Cancels every task issued from this scope.
    pub fn teardown(&self) {
        self.alive.set(false);
    }
}

impl Default for TaskScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskScope {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Owner side of an issued task.
#[derive(Debug)]
pub struct Task<T> {
    slot: Rc<RefCell<Option<T>>>,
    scope: Weak<Cell<bool>>,
    cancelled: Rc<Cell<bool>>,
}

impl<T> Task<T> {
    pub fn cancel(&self) {
        self.cancelled.set(true);
        self.slot.borrow_mut().take();
    }

    /// True once cancelled directly or through its scope's teardown.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get() || !self.scope.upgrade().is_some_and(|alive| alive.get())
    }

    pub fn is_ready(&self) -> bool {
        self.slot.borrow().is_some()
    }

    pub fn take(&self) -> Option<T> {
        self.slot.borrow_mut().take()
    }
}

/// Worker side of an issued task.
#[derive(Debug)]
pub struct Completer<T> {
    slot: Weak<RefCell<Option<T>>>,
    scope: Weak<Cell<bool>>,
    cancelled: Rc<Cell<bool>>,
}

impl<T> Completer<T> {
    pub fn is_live(&self) -> bool {
        !self.cancelled.get()
            && self.slot.strong_count() > 0
            && self.scope.upgrade().is_some_and(|alive| alive.get())
    }

    /// Delivers the result. Returns false, dropping the value, when the
    /// task was cancelled or its owner is gone.
    pub fn complete(self, value: T) -> bool {
        if !self.is_live() {
            tracing::debug!("task resolved after cancellation, result discarded");
            return false;
        }
        match self.slot.upgrade() {
            Some(slot) => {
                *slot.borrow_mut() = Some(value);
                true
            }
            None => false,
        }
    }
}
