#![forbid(unsafe_code)]

//! Process-wide default renderer.
//!
//! Hosts with a single mount point can share one renderer through [`with`]
//! instead of threading a `Renderer` value through every handler. The
//! instance is thread-local and created on first use over a
//! [`MemoryDom`] with [`RendererConfig::from_env`].
//!
//! Calling [`with`] from inside a closure already running under [`with`]
//! panics; event handlers should capture a [`RendererHandle`] instead.
//!
//! [`RendererHandle`]: crate::RendererHandle

use std::cell::RefCell;

use opcut_vdom::MemoryDom;

use crate::clock::SystemClock;
use crate::config::RendererConfig;
use crate::renderer::Renderer;

/// The default renderer type.
pub type DefaultRenderer = Renderer<MemoryDom, SystemClock>;

thread_local! {
    static DEFAULT: RefCell<Option<DefaultRenderer>> = const { RefCell::new(None) };
}

/// Run `f` with the default renderer, creating it on first use.
pub fn with<R>(f: impl FnOnce(&mut DefaultRenderer) -> R) -> R {
    DEFAULT.with(|cell| {
        let mut slot = cell.borrow_mut();
        let renderer = slot.get_or_insert_with(|| {
            tracing::debug!("creating default renderer");
            Renderer::headless(SystemClock::new(), RendererConfig::from_env())
        });
        f(renderer)
    })
}

/// Replace the default renderer, returning the previous one.
pub fn install(renderer: DefaultRenderer) -> Option<DefaultRenderer> {
    DEFAULT.with(|cell| cell.borrow_mut().replace(renderer))
}

/// Drop the default renderer; the next [`with`] creates a fresh one.
pub fn take() -> Option<DefaultRenderer> {
    DEFAULT.with(|cell| cell.borrow_mut().take())
}
