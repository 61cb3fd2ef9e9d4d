use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use parking_lot::Mutex;

use crate::utils::error::{LrError, LrResult};

type Listener = Box<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct ShutdownState {
    requested: AtomicBool,
    reason: Mutex<Option<String>>,
    listeners: Mutex<Vec<Listener>>,
}

impl std::fmt::Debug for ShutdownState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownState")
            .field("requested", &self.requested)
            .field("reason", &self.reason)
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}

/// Cooperative cancellation flag shared between an analysis and whoever may stop it.
///
/// Clones share the same state. A request is permanent; the first reason wins.
#[derive(Debug, Clone, Default)]
pub struct ShutdownNotifier {
    state: Arc<ShutdownState>,
}

impl ShutdownNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_shutdown(&self, reason: impl Into<String>) {
        let reason = {
            let mut slot = self.state.reason.lock();
            if slot.is_some() {
                return;
            }
            let reason = reason.into();
            *slot = Some(reason.clone());
            reason
        };
        self.state.requested.store(true, Ordering::Release);

        let listeners = std::mem::take(&mut *self.state.listeners.lock());
        for listener in &listeners {
            listener(&reason);
        }
    }

    /// Run `listener` once when a shutdown is requested, from the requesting thread.
    /// Runs immediately when the request already happened.
    pub fn register(&self, listener: impl Fn(&str) + Send + Sync + 'static) {
        {
            let mut listeners = self.state.listeners.lock();
            if !self.should_shutdown() {
                listeners.push(Box::new(listener));
                return;
            }
        }
        listener(&self.reason().unwrap_or_default());
    }

    pub fn should_shutdown(&self) -> bool {
        self.state.requested.load(Ordering::Acquire)
    }

    pub fn reason(&self) -> Option<String> {
        self.state.reason.lock().clone()
    }

    /// `Err(Interrupted)` once a shutdown was requested.
    pub fn check(&self) -> LrResult<()> {
        if self.should_shutdown() {
            Err(self.interruption())
        } else {
            Ok(())
        }
    }

    pub(crate) fn interruption(&self) -> LrError {
        LrError::Interrupted(
            self.reason()
                .unwrap_or_else(|| "shutdown requested".to_string()),
        )
    }
}
