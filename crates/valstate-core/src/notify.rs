//! # Change Notification
//!
//! Every handler owns a [`Notifier`]. Mutations call [`Notifier::emit`],
//! which invokes the handler's listeners synchronously and then forwards the
//! event to the parent notifier with the child's key prepended to the
//! event path. A listener registered on the root handler therefore sees
//! every mutation in the tree.
//!
//! ## Batching
//!
//! A composite that mutates several children in one operation takes a
//! [`HoldGuard`] first. While held, events arriving from children are
//! absorbed instead of forwarded; on release the composite learns whether
//! anything changed below it and emits a single event of its own.
//!
//! ## Invariants
//!
//! 1. Listeners are notified in registration order.
//! 2. No borrow of the notifier is held while a listener runs, so listeners
//!    may subscribe or drop subscriptions re-entrantly.
//! 3. Dropping a [`Subscription`] removes the listener before the next
//!    notification; dead entries are pruned lazily.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::path::{FieldKey, FieldPath};

type ListenerRc = Rc<dyn Fn(&ChangeEvent)>;
type ListenerWeak = Weak<dyn Fn(&ChangeEvent)>;

/// What part of a handler's state changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// The value changed (including structural changes to an array).
    Value,
    /// Errors or validity changed as a result of `validate()`.
    Validation,
    /// The handler was reset to a baseline value.
    Reset,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Value => "value",
            Self::Validation => "validation",
            Self::Reset => "reset",
        };
        f.write_str(s)
    }
}

/// A change notification delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// The kind of change.
    pub kind: ChangeKind,
    /// Path from the observed handler to the handler that changed.
    pub path: FieldPath,
}

struct NotifierInner {
    listeners: Vec<ListenerWeak>,
    /// Parent notifier and the key this handler occupies in it.
    parent: Option<(Weak<RefCell<NotifierInner>>, FieldKey)>,
    /// Depth of active holds.
    holds: u32,
    /// Whether a child event was absorbed during the current hold.
    absorbed: bool,
    /// Number of events dispatched to this notifier's listeners.
    version: u64,
}

/// Per-handler change notifier.
///
/// Cloning creates another handle to the same listener list.
#[derive(Clone)]
pub struct Notifier {
    inner: Rc<RefCell<NotifierInner>>,
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Notifier")
            .field("listeners", &inner.listeners.len())
            .field("attached", &inner.parent.is_some())
            .field("version", &inner.version)
            .finish()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    /// Create a detached notifier with no listeners.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(NotifierInner {
                listeners: Vec::new(),
                parent: None,
                holds: 0,
                absorbed: false,
                version: 0,
            })),
        }
    }

    /// Register a listener. Dropping the returned guard unsubscribes it.
    pub fn subscribe(&self, listener: impl Fn(&ChangeEvent) + 'static) -> Subscription {
        let strong: ListenerRc = Rc::new(listener);
        self.inner
            .borrow_mut()
            .listeners
            .push(Rc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Link this notifier under `parent` at `key`. Replaces any previous link.
    pub fn attach(&self, parent: &Notifier, key: FieldKey) {
        self.inner.borrow_mut().parent = Some((Rc::downgrade(&parent.inner), key));
    }

    /// Remove the parent link.
    pub fn detach(&self) {
        self.inner.borrow_mut().parent = None;
    }

    /// Notify listeners that this handler changed, then forward upward.
    pub fn emit(&self, kind: ChangeKind) {
        self.dispatch(ChangeEvent {
            kind,
            path: FieldPath::root(),
        });
    }

    /// Start absorbing child events until the guard is released or dropped.
    pub fn hold(&self) -> HoldGuard {
        self.inner.borrow_mut().holds += 1;
        HoldGuard {
            notifier: Some(self.clone()),
        }
    }

    /// Number of events delivered to this notifier, including bubbled ones.
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Returns true if both values are handles to the same notifier.
    ///
    /// Handlers own exactly one notifier for their lifetime, so this also
    /// identifies the handler across moves.
    pub fn ptr_eq(&self, other: &Notifier) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of registered listeners, including dead ones not yet pruned.
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    fn dispatch(&self, event: ChangeEvent) {
        let (listeners, parent) = {
            let mut inner = self.inner.borrow_mut();
            inner.version += 1;
            inner.listeners.retain(|w| w.strong_count() > 0);
            let live: Vec<ListenerRc> = inner.listeners.iter().filter_map(Weak::upgrade).collect();
            (live, inner.parent.clone())
        };

        for listener in &listeners {
            listener(&event);
        }

        if let Some((parent, key)) = parent {
            if let Some(inner) = parent.upgrade() {
                Notifier { inner }.receive(key, event);
            }
        }
    }

    fn receive(&self, key: FieldKey, mut event: ChangeEvent) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.holds > 0 {
                inner.absorbed = true;
                return;
            }
        }
        event.path.prepend(key);
        self.dispatch(event);
    }

    fn release(&self) -> bool {
        let mut inner = self.inner.borrow_mut();
        inner.holds = inner.holds.saturating_sub(1);
        if inner.holds == 0 {
            std::mem::take(&mut inner.absorbed)
        } else {
            inner.absorbed
        }
    }
}

/// Guard returned by [`Notifier::hold`].
#[must_use = "dropping the guard immediately ends the hold"]
pub struct HoldGuard {
    notifier: Option<Notifier>,
}

impl HoldGuard {
    /// End the hold. Returns true if a child event was absorbed.
    pub fn release(mut self) -> bool {
        self.notifier.take().is_some_and(|n| n.release())
    }
}

impl Drop for HoldGuard {
    fn drop(&mut self) {
        if let Some(n) = self.notifier.take() {
            n.release();
        }
    }
}

impl fmt::Debug for HoldGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HoldGuard")
            .field("active", &self.notifier.is_some())
            .finish()
    }
}

/// RAII guard for a listener registration.
///
/// Holds the only strong reference to the listener closure; the notifier
/// keeps a `Weak`, so dropping this guard makes the listener unreachable.
pub struct Subscription {
    _guard: Box<dyn std::any::Any>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn recorder(notifier: &Notifier) -> (Rc<RefCell<Vec<ChangeEvent>>>, Subscription) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let sub = notifier.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        (log, sub)
    }

    #[test]
    fn clones_share_identity() {
        let a = Notifier::new();
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Notifier::new()));
    }

    #[test]
    fn emit_reaches_listener() {
        let n = Notifier::new();
        let (log, _sub) = recorder(&n);
        n.emit(ChangeKind::Value);
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(log.borrow()[0].kind, ChangeKind::Value);
        assert!(log.borrow()[0].path.is_root());
        assert_eq!(n.version(), 1);
    }

    #[test]
    fn events_bubble_with_key_prepended() {
        let root = Notifier::new();
        let mid = Notifier::new();
        let leaf = Notifier::new();
        mid.attach(&root, FieldKey::from("address"));
        leaf.attach(&mid, FieldKey::Index(2));

        let (log, _sub) = recorder(&root);
        leaf.emit(ChangeKind::Validation);

        let events = log.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].path.to_string(), "address.2");
        assert_eq!(events[0].kind, ChangeKind::Validation);
    }

    #[test]
    fn hold_absorbs_child_events() {
        let parent = Notifier::new();
        let child = Notifier::new();
        child.attach(&parent, FieldKey::from("a"));
        let (log, _sub) = recorder(&parent);

        let guard = parent.hold();
        child.emit(ChangeKind::Value);
        child.emit(ChangeKind::Value);
        assert!(log.borrow().is_empty());
        assert!(guard.release());

        let guard = parent.hold();
        assert!(!guard.release());
    }

    #[test]
    fn nested_holds_release_at_outermost() {
        let parent = Notifier::new();
        let child = Notifier::new();
        child.attach(&parent, FieldKey::from("a"));

        let outer = parent.hold();
        let inner = parent.hold();
        child.emit(ChangeKind::Value);
        assert!(inner.release());
        child.emit(ChangeKind::Value);
        assert!(outer.release());
    }

    #[test]
    fn dropped_guard_ends_hold() {
        let parent = Notifier::new();
        let child = Notifier::new();
        child.attach(&parent, FieldKey::from("a"));
        let (log, _sub) = recorder(&parent);
        {
            let _guard = parent.hold();
            child.emit(ChangeKind::Value);
        }
        child.emit(ChangeKind::Value);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn detach_stops_bubbling() {
        let parent = Notifier::new();
        let child = Notifier::new();
        child.attach(&parent, FieldKey::from("a"));
        child.detach();
        let (log, _sub) = recorder(&parent);
        child.emit(ChangeKind::Value);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn subscription_drop_unsubscribes() {
        let n = Notifier::new();
        let count = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&count);
        let sub = n.subscribe(move |_| c.set(c.get() + 1));
        n.emit(ChangeKind::Value);
        drop(sub);
        n.emit(ChangeKind::Value);
        assert_eq!(count.get(), 1);
        assert_eq!(n.listener_count(), 0);
    }

    #[test]
    fn notification_order_is_registration_order() {
        let n = Notifier::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = Rc::clone(&log);
        let _s1 = n.subscribe(move |_| a.borrow_mut().push('A'));
        let b = Rc::clone(&log);
        let _s2 = n.subscribe(move |_| b.borrow_mut().push('B'));
        n.emit(ChangeKind::Reset);
        assert_eq!(*log.borrow(), vec!['A', 'B']);
    }

    #[test]
    fn dropped_parent_is_ignored() {
        let child = Notifier::new();
        {
            let parent = Notifier::new();
            child.attach(&parent, FieldKey::from("a"));
        }
        child.emit(ChangeKind::Value);
        assert_eq!(child.version(), 1);
    }
}
