#![forbid(unsafe_code)]

//! opcut public facade crate.
//!
//! Re-exports the value/path layer, the virtual tree and (with the default
//! `runtime` feature) the renderer, plus a prelude for view code.
//!
//! ```
//! use opcut::prelude::*;
//! use serde_json::json;
//!
//! let mut r = Renderer::headless(DeterministicClock::new(), RendererConfig::default());
//! let _ = r.init(Value::from(json!({"panels": ["top", "side"]})), |state| {
//!     let panels = ops::get_or_null(&path!["panels"], state);
//!     h("ul")
//!         .children(panels.as_list().unwrap_or_default().iter().map(|p| {
//!             let name = p.as_str().unwrap_or_default();
//!             h("li").data(Data::new().key(name)).child(name)
//!         }))
//!         .into()
//! });
//! r.run_until_idle().unwrap();
//! assert_eq!(r.dom().inner_html(r.dom().body()), "<ul><li>top</li><li>side</li></ul>");
//! ```

// --- Core re-exports -------------------------------------------------------

pub use opcut_core::{Error, Map, Path, Segment, Value, ValueKind, collection, ops, parse, path};

// --- Virtual tree re-exports -----------------------------------------------

pub use opcut_vdom::{
    BuildError, Data, Description, Dom, DomEvent, Element, ElementBuilder, Listener, MemoryDom,
    NodeId, PatchStats, Reconciler, Selector, VNode, build, h,
};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "runtime")]
pub use opcut_runtime::{
    Clock, CommitReport, Completion, DeterministicClock, MemoryStorage, PersistedPath, Phase,
    Renderer, RendererConfig, RendererError, RendererHandle, StepResult, StorageBackend,
    StorageError, SubscriptionId, SystemClock,
};
#[cfg(feature = "state-persistence")]
pub use opcut_runtime::FileStorage;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{Data, Description, Path, Value, h, ops, path};

    #[cfg(feature = "runtime")]
    pub use crate::{
        Completion, DeterministicClock, Renderer, RendererConfig, RendererError, RendererHandle,
    };

    pub use crate::{core, vdom};
    #[cfg(feature = "runtime")]
    pub use crate::runtime;
}

pub use opcut_core as core;
#[cfg(feature = "runtime")]
pub use opcut_runtime as runtime;
pub use opcut_vdom as vdom;
