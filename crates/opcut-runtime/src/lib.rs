#![forbid(unsafe_code)]

//! opcut runtime
//!
//! Ties the state store in `opcut-core` and the virtual tree in `opcut-vdom`
//! into a renderer that batches mutations, detects changes, throttles
//! rendering and reports back to callers.
//!
//! # Key Components
//!
//! - [`Renderer`] - state tree, mutation queue and host-driven render loop
//! - [`RendererHandle`] - cloneable enqueue/read access for event handlers
//! - [`Completion`] - per-mutation outcome, usable as a future
//! - [`FrameThrottle`] - max-FPS render scheduling
//! - [`Clock`] - injected time source ([`DeterministicClock`], [`SystemClock`])
//! - [`PersistedPath`] / [`StorageBackend`] - save and restore sub-state
//! - [`default`] - thread-local shared renderer
//!
//! # How it fits together
//! The host owns the event loop. Handlers enqueue mutations, the host calls
//! [`Renderer::step`] after each handler turn and when
//! [`Renderer::next_deadline`] passes, and the renderer commits, diffs and
//! patches the host [`opcut_vdom::Dom`].

pub mod clock;
pub mod completion;
pub mod config;
pub mod default;
pub mod error;
pub mod notify;
pub mod persistence;
pub mod renderer;
pub mod throttle;

pub use clock::{Clock, DeterministicClock, SystemClock};
pub use completion::{Completion, Outcome};
pub use config::{DEFAULT_MAX_FPS, MAX_FPS_ENV, RendererConfig};
pub use error::RendererError;
pub use notify::{Signal, SubscriptionId};
#[cfg(feature = "state-persistence")]
pub use persistence::FileStorage;
pub use persistence::{
    MemoryStorage, PersistedPath, StorageBackend, StorageError, StorageResult,
};
pub use renderer::{CommitReport, Phase, Renderer, RendererHandle, StepResult};
pub use throttle::FrameThrottle;
