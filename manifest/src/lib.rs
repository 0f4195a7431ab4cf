//! Manifest loading for gobridge plugin bundles.
//!
//! A gobridge bundle is a directory holding the native `.clap` shim, a Go
//! shared object implementing the plugin, and a JSON manifest describing the
//! plugin's identity, declared extensions and parameters. This crate owns the
//! manifest side of that contract: the serde data model, validation, and the
//! filesystem discovery that turns a set of search directories into an
//! ordered, de-duplicated list of loadable entries.
//!
//! Nothing in this crate touches the CLAP ABI or loads any code; it only
//! produces the [`Manifest`] values the bridge runtime builds its plugin
//! entries from.

mod discover;
mod error;
mod schema;

pub use discover::{discover, discover_in, Discovered, Discovery, MANIFEST_PATH_ENV};
pub use error::ManifestError;
pub use schema::{
    BuildInfo, ExtensionDecl, Manifest, ParameterDecl, PluginInfo, RECOGNIZED_EXTENSIONS,
    SCHEMA_VERSION,
};
