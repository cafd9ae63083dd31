#![forbid(unsafe_code)]

//! The renderer: one state tree, a mutation queue, and a throttled render
//! loop driven by the host.
//!
//! # Lifecycle
//!
//! 1. [`Renderer::init`] seeds the state and registers the view.
//! 2. Event handlers enqueue mutations through [`Renderer::set`],
//!    [`Renderer::change`] or a cloned [`RendererHandle`].
//! 3. The host calls [`Renderer::step`] from its event loop (after each
//!    handler turn and whenever [`Renderer::next_deadline`] passes). A step
//!    commits every queued mutation in one pass and renders if the frame
//!    timer is due.
//!
//! ```
//! use opcut_core::{path, Value};
//! use opcut_runtime::{DeterministicClock, Renderer, RendererConfig};
//! use opcut_vdom::h;
//!
//! let mut r = Renderer::headless(DeterministicClock::new(), RendererConfig::default());
//! r.init(Value::from(serde_json::json!({"count": 0})), |state| {
//!     let count = state.as_map().and_then(|m| m.get("count")).cloned().unwrap_or_default();
//!     h("p").child(count.to_string()).into()
//! });
//! for _ in 0..3 {
//!     let _ = r.change(path!["count"], |v| Value::from(v.as_f64().unwrap_or(0.0) + 1.0));
//! }
//! r.run_until_idle().unwrap();
//! assert_eq!(r.get(path!["count"]), Some(Value::from(3)));
//! assert_eq!(r.dom().inner_html(r.dom().body()), "<p>3</p>");
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::rc::Rc;
use std::time::Duration;

use opcut_core::{Path, Value, ops};
use opcut_vdom::{Description, Dom, DomEvent, MemoryDom, PatchStats, Reconciler, build};

use crate::clock::Clock;
use crate::completion::{Completion, Outcome, Resolver};
use crate::config::RendererConfig;
use crate::error::RendererError;
use crate::notify::{Notifier, Signal, SubscriptionId};
use crate::persistence::{PersistedPath, StorageBackend};
use crate::throttle::FrameThrottle;

type Transform = Box<dyn FnOnce(&Value) -> Result<Value, RendererError>>;
type View = Box<dyn Fn(&Value) -> Description>;

/// Where the renderer is in its commit/render cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// `init` has not been called.
    Uninitialized,
    /// Nothing queued and no render pending.
    Idle,
    /// Mutations are waiting for the next commit pass.
    MutationQueued,
    /// A commit pass is running.
    Committing,
    /// A render timer is armed.
    RenderScheduled,
    /// The view is being built and applied.
    Rendering,
}

/// Outcome of one commit pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Mutations applied to the state.
    pub applied: usize,
    /// Mutations rejected with an error.
    pub failed: usize,
    /// Whether any applied mutation changed the value at its path.
    pub changed: bool,
}

/// Result of a single [`Renderer::step`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepResult {
    /// Mutations committed during this step.
    pub committed: usize,
    /// Whether a frame was rendered during this step.
    pub rendered: bool,
    /// Phase after the step.
    pub phase: Phase,
}

struct Mutation {
    path: Path,
    transform: Transform,
    resolver: Resolver,
}

/// State and queue shared between the renderer and its handles.
#[derive(Default)]
struct Shared {
    state: Value,
    queue: VecDeque<Mutation>,
}

/// Cloneable enqueue/read access to a renderer, for event handlers.
///
/// Handles read the committed state and queue mutations; they never commit
/// or render themselves.
#[derive(Clone)]
pub struct RendererHandle {
    shared: Rc<RefCell<Shared>>,
}

impl RendererHandle {
    /// Committed value at `path`.
    #[must_use]
    pub fn get(&self, path: impl Into<Path>) -> Option<Value> {
        ops::get(&path.into(), &self.shared.borrow().state).cloned()
    }

    /// The whole committed state.
    #[must_use]
    pub fn state(&self) -> Value {
        self.shared.borrow().state.clone()
    }

    pub fn set(&self, path: impl Into<Path>, value: impl Into<Value>) -> Completion {
        let value = value.into();
        self.enqueue(path.into(), Box::new(move |_: &Value| Ok(value)))
    }

    pub fn change<F>(&self, path: impl Into<Path>, f: F) -> Completion
    where
        F: FnOnce(&Value) -> Value + 'static,
    {
        self.enqueue(path.into(), Box::new(move |old: &Value| Ok(f(old))))
    }

    /// Like [`change`](Self::change), but the transform may reject the
    /// update; its error settles the completion as
    /// [`RendererError::MutationFailure`].
    pub fn try_change<F, E>(&self, path: impl Into<Path>, f: F) -> Completion
    where
        F: FnOnce(&Value) -> Result<Value, E> + 'static,
        E: fmt::Display,
    {
        self.enqueue(
            path.into(),
            Box::new(move |old: &Value| f(old).map_err(|e| RendererError::MutationFailure(e.to_string()))),
        )
    }

    /// Number of mutations waiting for the next commit pass.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.borrow().queue.len()
    }

    fn enqueue(&self, path: Path, transform: Transform) -> Completion {
        let (completion, resolver) = Completion::pair();
        tracing::trace!(path = %path, "mutation queued");
        self.shared.borrow_mut().queue.push_back(Mutation {
            path,
            transform,
            resolver,
        });
        completion
    }
}

impl fmt::Debug for RendererHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererHandle")
            .field("pending", &self.pending())
            .finish()
    }
}

/// State store and render loop for one mount point.
pub struct Renderer<D: Dom, C: Clock> {
    dom: D,
    clock: C,
    config: RendererConfig,
    handle: RendererHandle,
    view: Option<View>,
    reconciler: Reconciler<D::Node>,
    throttle: FrameThrottle,
    awaiting_render: Vec<Resolver>,
    notifier: Notifier,
    initialized: bool,
    active: Option<Phase>,
    frame_idx: u64,
    last_stats: PatchStats,
}

impl<C: Clock> Renderer<MemoryDom, C> {
    /// Renderer over a fresh [`MemoryDom`], mounted at its body.
    #[must_use]
    pub fn headless(clock: C, config: RendererConfig) -> Self {
        let dom = MemoryDom::new();
        let mount = dom.body();
        Self::with_config(dom, mount, clock, config)
    }
}

impl<D: Dom, C: Clock> Renderer<D, C> {
    /// Renderer with the default configuration.
    #[must_use]
    pub fn new(dom: D, mount: D::Node, clock: C) -> Self {
        Self::with_config(dom, mount, clock, RendererConfig::default())
    }

    #[must_use]
    pub fn with_config(dom: D, mount: D::Node, clock: C, config: RendererConfig) -> Self {
        Self {
            dom,
            clock,
            config,
            handle: RendererHandle {
                shared: Rc::new(RefCell::new(Shared::default())),
            },
            view: None,
            reconciler: Reconciler::new(mount),
            throttle: FrameThrottle::new(config.frame_interval()),
            awaiting_render: Vec::new(),
            notifier: Notifier::default(),
            initialized: false,
            active: None,
            frame_idx: 0,
            last_stats: PatchStats::default(),
        }
    }

    // --- Lifecycle ---

    /// Reset everything and seed the state with `initial`, rendering with
    /// `view`.
    ///
    /// Completions still pending from a previous session settle with
    /// [`RendererError::Reset`]. A `null` initial state commits nothing and
    /// returns an already settled completion.
    pub fn init<F>(&mut self, initial: impl Into<Value>, view: F) -> Completion
    where
        F: Fn(&Value) -> Description + 'static,
    {
        self.reset(Some(Box::new(view)), initial.into())
    }

    /// Like [`init`](Self::init) without a view: state only, nothing is
    /// rendered.
    pub fn init_state(&mut self, initial: impl Into<Value>) -> Completion {
        self.reset(None, initial.into())
    }

    fn reset(&mut self, view: Option<View>, initial: Value) -> Completion {
        let stale: Vec<Resolver> = {
            let mut shared = self.handle.shared.borrow_mut();
            shared.state = Value::Null;
            shared.queue.drain(..).map(|m| m.resolver).collect()
        };
        for resolver in stale.into_iter().chain(self.awaiting_render.drain(..)) {
            resolver.settle(Err(RendererError::Reset));
        }
        self.throttle.reset();
        self.last_stats = self.reconciler.teardown(&mut self.dom);
        self.view = view;
        self.initialized = true;
        self.active = None;
        tracing::debug!(with_view = self.view.is_some(), "renderer initialized");

        if initial.is_null() {
            return Completion::ready(Ok(()));
        }
        self.handle.set(Path::root(), initial)
    }

    // --- State access ---

    /// Committed value at `path`. Queued mutations are not visible until
    /// they are committed.
    #[must_use]
    pub fn get(&self, path: impl Into<Path>) -> Option<Value> {
        self.handle.get(path)
    }

    #[must_use]
    pub fn state(&self) -> Value {
        self.handle.state()
    }

    pub fn set(&self, path: impl Into<Path>, value: impl Into<Value>) -> Completion {
        self.handle.set(path, value)
    }

    pub fn change<F>(&self, path: impl Into<Path>, f: F) -> Completion
    where
        F: FnOnce(&Value) -> Value + 'static,
    {
        self.handle.change(path, f)
    }

    pub fn try_change<F, E>(&self, path: impl Into<Path>, f: F) -> Completion
    where
        F: FnOnce(&Value) -> Result<Value, E> + 'static,
        E: fmt::Display,
    {
        self.handle.try_change(path, f)
    }

    /// Cloneable handle for event handlers and subscribers.
    #[must_use]
    pub fn handle(&self) -> RendererHandle {
        self.handle.clone()
    }

    // --- Host-driven loop ---

    /// Run one commit pass over everything queued, including mutations that
    /// are queued while the pass runs.
    pub fn flush(&mut self) -> CommitReport {
        let mut report = CommitReport::default();
        if self.handle.pending() == 0 {
            return report;
        }
        self.active = Some(Phase::Committing);
        let span = tracing::debug_span!("commit_pass", mutations = self.handle.pending());
        let guard = span.enter();

        let mut committed = Vec::new();
        loop {
            let next = self.handle.shared.borrow_mut().queue.pop_front();
            let Some(Mutation {
                path,
                transform,
                resolver,
            }) = next
            else {
                break;
            };
            let old = self.handle.state();
            match ops::try_change(&path, &old, transform) {
                Ok(new) => {
                    let changed = ops::get(&path, &old) != ops::get(&path, &new);
                    tracing::trace!(path = %path, changed, "mutation applied");
                    self.handle.shared.borrow_mut().state = new;
                    report.applied += 1;
                    report.changed |= changed;
                    committed.push(resolver);
                }
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "mutation failed");
                    report.failed += 1;
                    resolver.settle(Err(e));
                }
            }
        }
        drop(guard);

        self.active = None;
        if report.changed {
            let state = self.handle.state();
            self.notifier.emit(Signal::Changed, &state);
        }
        if report.changed && self.view.is_some() {
            self.awaiting_render.extend(committed);
            let now = self.clock.now();
            if let Some(deadline) = self.throttle.request(now) {
                tracing::debug!(
                    delay_ms = deadline.saturating_sub(now).as_millis() as u64,
                    "render scheduled"
                );
            }
        } else {
            settle_all(committed, &Ok(()));
        }
        report
    }

    /// Commit queued mutations, then render if the frame timer is due.
    pub fn step(&mut self) -> Result<StepResult, RendererError> {
        let report = self.flush();
        let rendered = if self.throttle.is_due(self.clock.now()) {
            self.render_frame()?;
            true
        } else {
            false
        };
        Ok(StepResult {
            committed: report.applied,
            rendered,
            phase: self.phase(),
        })
    }

    /// Step until nothing is queued and no render is due at the current
    /// time. A render timer further in the future stays armed.
    pub fn run_until_idle(&mut self) -> Result<StepResult, RendererError> {
        let mut total = StepResult {
            committed: 0,
            rendered: false,
            phase: self.phase(),
        };
        loop {
            let step = self.step()?;
            total.committed += step.committed;
            total.rendered |= step.rendered;
            total.phase = step.phase;
            if self.handle.pending() == 0 && !self.throttle.is_due(self.clock.now()) {
                return Ok(total);
            }
        }
    }

    /// When the armed render timer fires, on this renderer's clock.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.throttle.deadline()
    }

    fn render_frame(&mut self) -> Result<(), RendererError> {
        let now = self.clock.now();
        self.throttle.fired(now);
        let waiting = mem::take(&mut self.awaiting_render);
        let Some(view) = &self.view else {
            settle_all(waiting, &Ok(()));
            return Ok(());
        };
        self.active = Some(Phase::Rendering);
        let span = tracing::debug_span!("render", frame = self.frame_idx);
        let guard = span.enter();

        let state = self.handle.state();
        let tree = match build(view(&state)) {
            Ok(tree) => tree,
            Err(e) => {
                tracing::error!(error = %e, "view produced an invalid tree");
                self.active = None;
                let err = RendererError::Build(e);
                settle_all(waiting, &Err(err.clone()));
                return Err(err);
            }
        };
        self.last_stats = self.reconciler.render(&mut self.dom, tree);
        self.frame_idx += 1;
        self.active = None;
        tracing::debug!(
            frame = self.frame_idx,
            dom_writes = self.last_stats.dom_writes(),
            "rendered"
        );
        drop(guard);

        self.notifier.emit(Signal::Rendered, &state);
        settle_all(waiting, &Ok(()));
        Ok(())
    }

    // --- Events and notifications ---

    /// Deliver a host event to the listener bound on `node`.
    ///
    /// Returns whether a listener ran. Mutations it queues are committed by
    /// the next [`step`](Self::step).
    pub fn dispatch_event(&self, node: D::Node, name: &str, payload: Value) -> bool {
        self.reconciler.dispatch(node, &DomEvent::new(name, payload))
    }

    /// Called with the committed state after every commit pass that changed
    /// something.
    pub fn on_changed(&mut self, f: impl FnMut(&Value) + 'static) -> SubscriptionId {
        self.notifier.subscribe(Signal::Changed, Box::new(f))
    }

    /// Called with the rendered state after every render.
    pub fn on_rendered(&mut self, f: impl FnMut(&Value) + 'static) -> SubscriptionId {
        self.notifier.subscribe(Signal::Rendered, Box::new(f))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// Save `binding`'s sub-state to `storage` whenever it changes.
    ///
    /// Save failures are logged and retried on the next change.
    pub fn persist(
        &mut self,
        binding: PersistedPath,
        storage: Rc<dyn StorageBackend>,
    ) -> SubscriptionId {
        let mut saved = ops::get(&binding.path, &self.state()).cloned();
        self.on_changed(move |state| {
            let current = ops::get(&binding.path, state);
            if current == saved.as_ref() {
                return;
            }
            match binding.save(storage.as_ref(), state) {
                Ok(()) => saved = current.cloned(),
                Err(e) => tracing::warn!(
                    key = %binding.key,
                    backend = storage.name(),
                    error = %e,
                    "failed to persist state"
                ),
            }
        })
    }

    // --- Introspection ---

    #[must_use]
    pub fn phase(&self) -> Phase {
        if let Some(active) = self.active {
            return active;
        }
        if !self.initialized {
            Phase::Uninitialized
        } else if self.handle.pending() > 0 {
            Phase::MutationQueued
        } else if self.throttle.is_pending() {
            Phase::RenderScheduled
        } else {
            Phase::Idle
        }
    }

    #[must_use]
    pub const fn config(&self) -> RendererConfig {
        self.config
    }

    /// Number of frames rendered since construction.
    #[must_use]
    pub const fn frame_idx(&self) -> u64 {
        self.frame_idx
    }

    /// DOM writes of the most recent render or teardown.
    #[must_use]
    pub const fn last_stats(&self) -> PatchStats {
        self.last_stats
    }

    #[must_use]
    pub fn root_nodes(&self) -> Vec<D::Node> {
        self.reconciler.root_nodes()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    /// Mutable host access, e.g. to simulate user input. Structural changes
    /// under the mount point are overwritten by the next render.
    pub fn dom_mut(&mut self) -> &mut D {
        &mut self.dom
    }
}

fn settle_all(resolvers: Vec<Resolver>, outcome: &Outcome) {
    for resolver in resolvers {
        resolver.settle(outcome.clone());
    }
}

impl<D, C> fmt::Debug for Renderer<D, C>
where
    D: Dom + fmt::Debug,
    C: Clock + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("phase", &self.phase())
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("frame_idx", &self.frame_idx)
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::DeterministicClock;
    use opcut_core::path;
    use opcut_vdom::h;
    use serde_json::json;

    fn renderer() -> Renderer<MemoryDom, DeterministicClock> {
        Renderer::headless(DeterministicClock::new(), RendererConfig::default())
    }

    fn text_view(state: &Value) -> Description {
        h("p").child(state.to_string()).into()
    }

    #[test]
    fn phases_follow_the_cycle() {
        let mut r = renderer();
        assert_eq!(r.phase(), Phase::Uninitialized);
        let done = r.init(Value::from(1), text_view);
        assert_eq!(r.phase(), Phase::MutationQueued);
        r.flush();
        assert_eq!(r.phase(), Phase::RenderScheduled);
        assert!(!done.is_settled());
        r.step().unwrap();
        assert_eq!(r.phase(), Phase::Idle);
        assert_eq!(done.result(), Some(Ok(())));
    }

    #[test]
    fn get_sees_only_committed_state() {
        let mut r = renderer();
        let _ = r.init_state(Value::from(json!({"a": 1})));
        r.flush();
        let _ = r.set(path!["a"], 2);
        assert_eq!(r.get(path!["a"]), Some(Value::from(1)));
        r.flush();
        assert_eq!(r.get(path!["a"]), Some(Value::from(2)));
    }

    #[test]
    fn null_initial_state_settles_immediately() {
        let mut r = renderer();
        let done = r.init(Value::Null, text_view);
        assert_eq!(done.result(), Some(Ok(())));
        assert!(!r.step().unwrap().rendered);
        assert_eq!(r.frame_idx(), 0);
    }

    #[test]
    fn reinit_resets_pending_completions() {
        let mut r = renderer();
        let first = r.init(Value::from(1), text_view);
        let queued = r.set(path!["x"], 1);
        let second = r.init(Value::from(2), text_view);
        assert_eq!(first.result(), Some(Err(RendererError::Reset)));
        assert_eq!(queued.result(), Some(Err(RendererError::Reset)));
        r.run_until_idle().unwrap();
        assert_eq!(second.result(), Some(Ok(())));
        assert_eq!(r.state(), Value::from(2));
    }

    #[test]
    fn without_view_completions_settle_at_end_of_pass() {
        let mut r = renderer();
        let done = r.init_state(Value::from(json!({"n": 0})));
        r.flush();
        assert_eq!(done.result(), Some(Ok(())));
        assert_eq!(r.next_deadline(), None);
    }
}
