#![forbid(unsafe_code)]

//! `changed` and `rendered` notifications.

use std::fmt;

use opcut_core::Value;

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Which signal a subscriber listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// A commit pass produced an observable difference.
    Changed,
    /// The DOM was patched.
    Rendered,
}

type Callback = Box<dyn FnMut(&Value)>;

/// Subscriber table for both signals.
#[derive(Default)]
pub(crate) struct Notifier {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Signal, Callback)>,
}

impl Notifier {
    pub(crate) fn subscribe(&mut self, signal: Signal, f: Callback) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscribers.push((id, signal, f));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Call every subscriber of `signal`, in subscription order.
    pub(crate) fn emit(&mut self, signal: Signal, state: &Value) {
        tracing::trace!(?signal, "notify");
        for (_, _, f) in self.subscribers.iter_mut().filter(|(_, s, _)| *s == signal) {
            f(state);
        }
    }

    pub(crate) fn len(&self, signal: Signal) -> usize {
        self.subscribers.iter().filter(|(_, s, _)| *s == signal).count()
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("changed", &self.len(Signal::Changed))
            .field("rendered", &self.len(Signal::Rendered))
            .finish()
    }
}
