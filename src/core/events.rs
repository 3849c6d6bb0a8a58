//! Notifications and the scene event queue
//!
//! Two mechanisms live here:
//!
//! - [`Event`]: a multicast observer list. Listeners fire in registration
//!   order and can be removed by the [`ListenerId`] returned on subscription,
//!   so a component being detached mid-frame never leaves a dangling callback.
//! - [`EventQueue`]: a double-buffered queue of [`SceneEvent`]s written by
//!   components during a frame and read by the scene manager afterwards.
//!
//! # Example
//!
//! ```ignore
//! let mut finished = Event::<()>::new();
//! let id = finished.subscribe(|_| log::info!("animation done"));
//! finished.emit(&());
//! finished.unsubscribe(id);
//! ```

use std::collections::VecDeque;
use std::fmt;

// ============================================================================
// Observer List
// ============================================================================

/// Identifies a listener registered on an [`Event`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<A> = Box<dyn FnMut(&A) + Send + Sync>;

/// Multicast notification with a defined firing order (registration order).
pub struct Event<A> {
    listeners: Vec<(ListenerId, Listener<A>)>,
    next_id: u64,
}

impl<A> Event<A> {
    /// Create an event with no listeners
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a listener. It fires after every previously registered one.
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&A) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        if let Some(pos) = self.listeners.iter().position(|(lid, _)| *lid == id) {
            self.listeners.remove(pos);
            true
        } else {
            false
        }
    }

    /// Invoke every listener with the given argument
    pub fn emit(&mut self, arg: &A) {
        for (_, listener) in &mut self.listeners {
            listener(arg);
        }
    }

    /// Remove every listener
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Number of registered listeners
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listener is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<A> Default for Event<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for Event<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

// ============================================================================
// Scene Events
// ============================================================================

/// Requests raised from inside a scene for the host to act on.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SceneEvent {
    /// Swap to another scene once the current frame is done.
    ChangeRequested {
        /// Key of the scene creator to invoke
        key: String,
        /// Arguments handed to the scene creator
        args: Vec<String>,
    },
}

/// Double-buffered event queue for frame-consistent event processing.
///
/// Events pushed during frame N are available for reading after `swap()`.
#[derive(Debug)]
pub struct EventQueue {
    /// Events being written this frame
    pending: VecDeque<SceneEvent>,
    /// Events from the previous frame, ready for processing
    processing: VecDeque<SceneEvent>,
}

impl EventQueue {
    const DEFAULT_CAPACITY: usize = 8;

    /// Create a new event queue
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: VecDeque::with_capacity(Self::DEFAULT_CAPACITY),
            processing: VecDeque::with_capacity(Self::DEFAULT_CAPACITY),
        }
    }

    /// Push an event to be processed after the next swap
    #[inline]
    pub fn push(&mut self, event: SceneEvent) {
        self.pending.push_back(event);
    }

    /// Swap the pending and processing queues
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.processing);
        self.pending.clear();
    }

    /// Iterate over swapped-in events
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &SceneEvent> {
        self.processing.iter()
    }

    /// Drain all swapped-in events
    #[inline]
    pub fn drain(&mut self) -> impl Iterator<Item = SceneEvent> + '_ {
        self.processing.drain(..)
    }

    /// Whether there is nothing to process
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processing.is_empty()
    }

    /// Number of events pending for the next swap
    #[must_use]
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Clear both buffers
    pub fn clear(&mut self) {
        self.pending.clear();
        self.processing.clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_event_fires_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut event = Event::<u32>::new();

        let first = Arc::clone(&log);
        event.subscribe(move |v| first.lock().unwrap().push(("first", *v)));
        let second = Arc::clone(&log);
        event.subscribe(move |v| second.lock().unwrap().push(("second", *v)));

        event.emit(&7);
        assert_eq!(*log.lock().unwrap(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn test_event_unsubscribe() {
        let count = Arc::new(Mutex::new(0));
        let mut event = Event::<()>::new();

        let counter = Arc::clone(&count);
        let id = event.subscribe(move |_| *counter.lock().unwrap() += 1);

        event.emit(&());
        assert!(event.unsubscribe(id));
        assert!(!event.unsubscribe(id));
        event.emit(&());

        assert_eq!(*count.lock().unwrap(), 1);
        assert!(event.is_empty());
    }

    #[test]
    fn test_event_queue_push_and_swap() {
        let mut queue = EventQueue::new();

        queue.push(SceneEvent::ChangeRequested {
            key: "title".into(),
            args: vec![],
        });
        assert!(queue.is_empty(), "Events should not be visible before swap");

        queue.swap();
        let events: Vec<_> = queue.drain().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], SceneEvent::ChangeRequested { key, .. } if key == "title"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_event_queue_clear() {
        let mut queue = EventQueue::new();
        queue.push(SceneEvent::ChangeRequested {
            key: "a".into(),
            args: vec![],
        });
        queue.swap();
        queue.push(SceneEvent::ChangeRequested {
            key: "b".into(),
            args: vec![],
        });

        queue.clear();

        assert!(queue.is_empty());
        assert_eq!(queue.pending_count(), 0);
    }
}
