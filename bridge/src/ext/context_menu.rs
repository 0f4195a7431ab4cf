use crate::instance::shim_from;
use crate::util::fenced;
use clap_sys::ext::context_menu::{
    clap_context_menu_builder, clap_context_menu_target, clap_plugin_context_menu,
};
use clap_sys::id::{clap_id, CLAP_INVALID_ID};
use clap_sys::plugin::clap_plugin;

pub(crate) static VTABLE: clap_plugin_context_menu = clap_plugin_context_menu {
    populate: Some(populate),
    perform: Some(perform),
};

/// A null target means the global (plugin-level) context menu.
fn target_parts(target: *const clap_context_menu_target) -> (u32, clap_id) {
    // SAFETY: the host passes either null or a valid target struct.
    match unsafe { target.as_ref() } {
        Some(target) => (target.kind, target.id),
        None => (0, CLAP_INVALID_ID),
    }
}

unsafe extern "C" fn populate(
    plugin: *const clap_plugin,
    target: *const clap_context_menu_target,
    builder: *const clap_context_menu_builder,
) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        let Some(populate_fn) = shim.entry.symbols.context_menu_populate else {
            // A plugin that only performs actions still advertises the
            // extension; an empty menu is a valid population.
            return true;
        };

        let (kind, id) = target_parts(target);
        // SAFETY: cached export; the builder pointer is only valid for this
        // call and is treated as opaque by the managed side.
        unsafe { populate_fn(shim.handle, kind, id, builder.cast()) }
    })
}

unsafe extern "C" fn perform(
    plugin: *const clap_plugin,
    target: *const clap_context_menu_target,
    action_id: clap_id,
) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        let Some(perform_fn) = shim.entry.symbols.context_menu_perform else {
            return false;
        };

        let (kind, id) = target_parts(target);
        // SAFETY: cached export; handle is live.
        unsafe { perform_fn(shim.handle, kind, id, action_id) }
    })
}
