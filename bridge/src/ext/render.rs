//! The render extension: realtime/offline mode switching.
//!
//! Mode is a lifecycle hint; the managed side may trade block sizes or
//! quality against it. The shim tracks the current mode so a rejected
//! switch leaves the previous one in place.

use crate::instance::shim_from;
use crate::util::fenced;
use clap_sys::ext::render::{
    clap_plugin_render, clap_plugin_render_mode, CLAP_RENDER_OFFLINE, CLAP_RENDER_REALTIME,
};
use clap_sys::plugin::clap_plugin;

pub(crate) static VTABLE: clap_plugin_render = clap_plugin_render {
    has_hard_realtime_requirement: Some(has_hard_realtime_requirement),
    set: Some(set),
};

unsafe extern "C" fn has_hard_realtime_requirement(plugin: *const clap_plugin) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        let Some(query_fn) = shim.entry.symbols.render_has_hard_realtime else {
            return false;
        };
        // SAFETY: cached export; handle is live.
        unsafe { query_fn(shim.handle) }
    })
}

unsafe extern "C" fn set(plugin: *const clap_plugin, mode: clap_plugin_render_mode) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        if mode != CLAP_RENDER_REALTIME && mode != CLAP_RENDER_OFFLINE {
            return false;
        }
        let Some(set_fn) = shim.entry.symbols.render_set else {
            return false;
        };

        // SAFETY: cached export; handle is live.
        if !unsafe { set_fn(shim.handle, mode) } {
            return false;
        }
        shim.render_mode = mode;
        true
    })
}
