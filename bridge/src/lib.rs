//! The gobridge CLAP shim.
//!
//! This crate is the native half of a gobridge plugin bundle. Built as a
//! `.clap` dynamic library, it exposes the standard `clap_entry` symbol; at
//! init it discovers JSON manifests next to the bundle (and in the standard
//! manifest directories), loads each declared Go shared object exactly once,
//! and resolves every standardized `GoBridge_*` export into a per-entry
//! [symbol cache](symbols::SymbolCache). From then on the host talks to a
//! fully conformant CLAP plugin whose vtables dispatch through those cached
//! function pointers.
//!
//! Layout:
//!
//! - [`entry`] / [`factory`] — the CLAP entry point and plugin factory.
//! - [`instance`] — the per-instance control block and core plugin vtable.
//! - [`ext`] — one static vtable per supported CLAP extension.
//! - [`events`] / [`audio`] — the zero-allocation realtime bridge.
//! - [`host`] — facades over the host-provided extensions.
//! - [`stream`] — `Read`/`Write` adapters over CLAP streams.

pub mod audio;
pub mod events;
pub mod host;
pub mod stream;
pub mod symbols;

mod descriptor;
mod entry;
mod ext;
mod factory;
mod instance;
mod util;

pub use entry::clap_entry;
pub use symbols::{ExtensionSupport, SymbolCache, SYMBOL_PREFIX};
