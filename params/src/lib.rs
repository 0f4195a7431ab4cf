//! Parameter and state services for gobridge plugins.
//!
//! This crate is the pure-Rust half of the bridge's parameter handling: a
//! thread-safe [`ParamRegistry`] with lock-free value slots, typed
//! [binders](binder) for building common parameter shapes, format-aware
//! [text conversion](format), the versioned binary [state codec](state), and
//! the fixed-capacity [`SyncPool`] the runtime leans on wherever the audio
//! thread must not allocate.
//!
//! Nothing here touches the CLAP ABI beyond reusing its parameter flag and
//! state-context constants; the FFI dispatch lives in the `gobridge` crate.

pub mod binder;
pub mod format;
pub mod pool;
pub mod state;

mod info;
mod registry;
mod value;

pub use info::{ParamFlags, ParamFormat, ParamId, ParamInfo};
pub use pool::{PoolLease, SyncPool};
pub use registry::{ListenerId, ParamError, ParamRegistry};
pub use state::{StateBlob, StateContext, StateError, STATE_SCHEMA_VERSION};
pub use value::AtomicF64;
