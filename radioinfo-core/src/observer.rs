//! Synchronous change listeners for [`ScheduleStore`](crate::ScheduleStore).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// Callback fired after every store mutation
pub type Observer = Arc<dyn Fn() + Send + Sync>;

type ObserverList = RwLock<Vec<(u64, Observer)>>;

/// Ordered list of observers.
///
/// Observers run on the notifying thread, in registration order. The list
/// is copied before calling out, so an observer may register or unregister
/// others (or itself) without deadlocking.
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: AtomicU64,
    observers: Arc<ObserverList>,
}

impl ObserverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer, returning the handle that removes it again
    pub fn register(&self, observer: Observer) -> ObserverHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));

        ObserverHandle {
            id,
            observers: Arc::downgrade(&self.observers),
        }
    }

    /// Call every registered observer in registration order
    pub fn notify(&self) {
        let observers: Vec<Observer> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in observers {
            observer();
        }
    }

    /// Number of registered observers
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.len())
            .finish()
    }
}

/// Registration of one observer.
///
/// Dropping the handle keeps the observer registered; call
/// [`ObserverHandle::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct ObserverHandle {
    id: u64,
    observers: Weak<ObserverList>,
}

impl ObserverHandle {
    /// Remove the observer from its registry.
    ///
    /// Returns `false` if the registry no longer exists.
    pub fn unsubscribe(self) -> bool {
        let Some(observers) = self.observers.upgrade() else {
            return false;
        };
        let mut observers = observers.write().unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(id, _)| *id != self.id);
        observers.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_notifies_in_registration_order() {
        let registry = ObserverRegistry::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let calls = Arc::clone(&calls);
            let _handle = registry.register(Arc::new(move || calls.lock().unwrap().push(name)));
        }

        registry.notify();
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let registry = ObserverRegistry::new();
        let count = Arc::new(AtomicU64::new(0));

        let counter = Arc::clone(&count);
        let handle = registry.register(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        registry.notify();
        assert!(handle.unsubscribe());
        registry.notify();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unsubscribe_after_registry_dropped() {
        let registry = ObserverRegistry::new();
        let handle = registry.register(Arc::new(|| {}));
        drop(registry);
        assert!(!handle.unsubscribe());
    }

    #[test]
    fn test_observer_can_register_during_notify() {
        let registry = Arc::new(ObserverRegistry::new());
        let inner = Arc::clone(&registry);
        let _handle = registry.register(Arc::new(move || {
            let _nested = inner.register(Arc::new(|| {}));
        }));

        registry.notify();
        assert_eq!(registry.len(), 2);
    }
}
