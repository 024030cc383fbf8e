//! Chat organizer: user-defined, persistent groups of conversation turns
//! injected into a third-party chat page.
//!
//! The core (`index`, `state`, `sync`, `export`, `storage`) is written against
//! the [`host::HostDocument`] seam and runs under plain `cargo test`; `dom` and
//! `app` bind it to the live page.

mod app;
pub mod config;
pub mod dom;
pub mod error;
pub mod export;
pub mod host;
pub mod index;
pub mod models;
pub mod session;
pub mod state;
pub mod storage;
pub mod sync;
pub mod util;

pub use config::OrganizerConfig;
pub use error::{ExportError, HostError, OrganizerError, StoreError};
pub use export::{export_group, render_transcript, ExportConfig, ExportReport, Transcript};
pub use host::HostDocument;
pub use index::{OrdinalIndex, Universe};
pub use models::{Role, SaveRequest, SavedGroup, SessionKey};
pub use state::{Organizer, Transition};
pub use storage::{GroupStore, KeyValueStore, LocalStorageStore, MemoryStore};
pub use sync::{reconcile, ReconcileOutcome, SettleConfig, SettleEvent, SettleWatcher};

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;


// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    app::start();
}
