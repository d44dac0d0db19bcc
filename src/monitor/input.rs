//! Input event seam between platform hooks and the statistics engine.
//!
//! Platform hook callbacks execute in the OS input pipeline and must stay
//! fast: they push into an [`InputHub`], which fans the event out to every
//! subscribed [`InputListener`] without blocking on anything but a read lock.

use crate::error::SubscribeError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Receiver of raw input notifications. Calls are fire-and-forget.
pub trait InputListener: Send + Sync {
    /// Input that carries no countable payload.
    fn action_notify(&self);

    /// Pointer moved to `(x, y)`; `wheel` is the wheel delta, 0 if none.
    fn mouse_notify(&self, x: i32, y: i32, wheel: i32);

    fn button_notify(&self, is_press: bool);

    /// `repeat` marks an auto-repeat of a held key.
    fn keyboard_notify(&self, repeat: bool);
}

/// Something listeners can subscribe to for input notifications.
pub trait InputSource: Send + Sync {
    fn subscribe(&self, listener: Arc<dyn InputListener>) -> Result<(), SubscribeError>;
}

/// Fan-out [`InputSource`] that platform hooks call into.
pub struct InputHub {
    listeners: RwLock<Vec<Arc<dyn InputListener>>>,
    enabled: AtomicBool,
}

impl Default for InputHub {
    fn default() -> Self {
        Self::new()
    }
}

impl InputHub {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            enabled: AtomicBool::new(true),
        }
    }

    /// Pauses or resumes delivery. Events while paused are dropped.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn action(&self) {
        self.dispatch(|l| l.action_notify());
    }

    pub fn mouse(&self, x: i32, y: i32, wheel: i32) {
        self.dispatch(|l| l.mouse_notify(x, y, wheel));
    }

    pub fn button(&self, is_press: bool) {
        self.dispatch(|l| l.button_notify(is_press));
    }

    pub fn keyboard(&self, repeat: bool) {
        self.dispatch(|l| l.keyboard_notify(repeat));
    }

    fn dispatch(&self, event: impl Fn(&dyn InputListener)) {
        if !self.is_enabled() {
            return;
        }
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            event(listener.as_ref());
        }
    }
}

impl InputSource for InputHub {
    fn subscribe(&self, listener: Arc<dyn InputListener>) -> Result<(), SubscribeError> {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
        tracing::debug!(listeners = self.listener_count(), "Input listener subscribed");
        Ok(())
    }
}
