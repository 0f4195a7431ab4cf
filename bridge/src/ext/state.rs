//! The state and state-context extension vtables.
//!
//! The wire format is the versioned parameter block of
//! [`gobridge_params::state`]: the bridge serializes the registry itself,
//! and the managed side's own state bytes travel inside the block as the
//! opaque custom payload. Managed save/load exports therefore never touch
//! the host stream directly; they get a memory-backed sub-stream.

use crate::instance::{shim_from, InstanceShim};
use crate::stream::{HostInputStream, HostOutputStream, ReaderStream, WriterStream};
use crate::util::fenced;
use clap_sys::ext::state::clap_plugin_state;
use clap_sys::ext::state_context::{
    clap_plugin_state_context, clap_plugin_state_context_type,
};
use clap_sys::plugin::clap_plugin;
use clap_sys::stream::{clap_istream, clap_ostream};
use gobridge_params::state::{load_state, save_state};
use gobridge_params::StateContext;
use std::io::Cursor;

pub(crate) static VTABLE: clap_plugin_state = clap_plugin_state {
    save: Some(save),
    load: Some(load),
};

pub(crate) static CONTEXT_VTABLE: clap_plugin_state_context = clap_plugin_state_context {
    save: Some(save_with_context),
    load: Some(load_with_context),
};

fn save_instance(
    shim: &mut InstanceShim,
    stream: *const clap_ostream,
    context: StateContext,
) -> bool {
    shim.host.debug_assert_main_thread();
    // SAFETY: the host stream is valid for the duration of this call.
    let Some(mut host_stream) = (unsafe { HostOutputStream::from_raw(stream) }) else {
        return false;
    };

    // Collect the plugin-defined payload first; it rides inside the block.
    let mut custom = Vec::new();
    let saved = {
        let writer = WriterStream::new(&mut custom);
        match (
            shim.entry.symbols.state_save_with_context,
            shim.entry.symbols.state_save,
        ) {
            (Some(save_ctx_fn), _) => {
                // SAFETY: cached export; the sub-stream is live.
                unsafe { save_ctx_fn(shim.handle, writer.as_raw(), context.as_raw()) }
            }
            // SAFETY: as above.
            (None, Some(save_fn)) => unsafe { save_fn(shim.handle, writer.as_raw()) },
            (None, None) => true, // parameters only
        }
    };
    if !saved {
        return false;
    }

    save_state(&shim.registry, &mut host_stream, &custom).is_ok()
}

fn load_instance(
    shim: &mut InstanceShim,
    stream: *const clap_istream,
    context: StateContext,
) -> bool {
    shim.host.debug_assert_main_thread();
    // SAFETY: the host stream is valid for the duration of this call.
    let Some(mut host_stream) = (unsafe { HostInputStream::from_raw(stream) }) else {
        return false;
    };

    let blob = match load_state(&shim.registry, &mut host_stream) {
        Ok(blob) => blob,
        Err(error) => {
            shim.host
                .log_error(&format!("state load failed: {error}"));
            return false;
        }
    };

    let mut cursor = Cursor::new(blob.custom);
    let reader = ReaderStream::new(&mut cursor);
    match (
        shim.entry.symbols.state_load_with_context,
        shim.entry.symbols.state_load,
    ) {
        (Some(load_ctx_fn), _) => {
            // SAFETY: cached export; the sub-stream is live.
            unsafe { load_ctx_fn(shim.handle, reader.as_raw(), context.as_raw()) }
        }
        // SAFETY: as above.
        (None, Some(load_fn)) => unsafe { load_fn(shim.handle, reader.as_raw()) },
        (None, None) => true, // parameters only
    }
}

unsafe extern "C" fn save(plugin: *const clap_plugin, stream: *const clap_ostream) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        save_instance(shim, stream, StateContext::default())
    })
}

unsafe extern "C" fn load(plugin: *const clap_plugin, stream: *const clap_istream) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        load_instance(shim, stream, StateContext::default())
    })
}

unsafe extern "C" fn save_with_context(
    plugin: *const clap_plugin,
    stream: *const clap_ostream,
    context_type: clap_plugin_state_context_type,
) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        let context = StateContext::from_raw(context_type).unwrap_or_default();
        save_instance(shim, stream, context)
    })
}

unsafe extern "C" fn load_with_context(
    plugin: *const clap_plugin,
    stream: *const clap_istream,
    context_type: clap_plugin_state_context_type,
) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        let context = StateContext::from_raw(context_type).unwrap_or_default();
        load_instance(shim, stream, context)
    })
}
