#![forbid(unsafe_code)]

//! Completion signals for queued mutations.
//!
//! Every enqueue returns a [`Completion`]. The renderer keeps the matching
//! [`Resolver`] and settles it once the mutation committed (and, when the
//! commit made a render due, once that render finished). A completion can
//! be polled as a future on a single-threaded executor or inspected
//! directly with [`Completion::result`].

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::error::RendererError;

/// Outcome of a mutation.
pub type Outcome = Result<(), RendererError>;

#[derive(Debug, Default)]
struct Slot {
    outcome: Option<Outcome>,
    waker: Option<Waker>,
}

/// Receiving side of a mutation's outcome.
#[derive(Debug, Clone)]
#[must_use = "a completion reports whether the mutation was applied"]
pub struct Completion {
    slot: Rc<RefCell<Slot>>,
}

/// Settling side, held by the renderer.
#[derive(Debug)]
pub(crate) struct Resolver {
    slot: Rc<RefCell<Slot>>,
}

impl Completion {
    pub(crate) fn pair() -> (Self, Resolver) {
        let slot = Rc::new(RefCell::new(Slot::default()));
        (
            Self {
                slot: Rc::clone(&slot),
            },
            Resolver { slot },
        )
    }

    /// A completion that is already settled.
    pub fn ready(outcome: Outcome) -> Self {
        let (completion, resolver) = Self::pair();
        resolver.settle(outcome);
        completion
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.slot.borrow().outcome.is_some()
    }

    /// The outcome, once settled.
    #[must_use]
    pub fn result(&self) -> Option<Outcome> {
        self.slot.borrow().outcome.clone()
    }
}

impl Future for Completion {
    type Output = Outcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.slot.borrow_mut();
        match &slot.outcome {
            Some(outcome) => Poll::Ready(outcome.clone()),
            None => {
                slot.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl Resolver {
    /// Settle the completion. Only the first outcome is kept.
    pub(crate) fn settle(self, outcome: Outcome) {
        let waker = {
            let mut slot = self.slot.borrow_mut();
            if slot.outcome.is_some() {
                return;
            }
            slot.outcome = Some(outcome);
            slot.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}
