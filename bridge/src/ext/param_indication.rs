use crate::instance::shim_from;
use crate::util::fenced;
use clap_sys::color::clap_color;
use clap_sys::ext::param_indication::clap_plugin_param_indication;
use clap_sys::id::clap_id;
use clap_sys::plugin::clap_plugin;
use std::ffi::c_char;

pub(crate) static VTABLE: clap_plugin_param_indication = clap_plugin_param_indication {
    set_mapping: Some(set_mapping),
    set_automation: Some(set_automation),
};

/// Packs a host color into one word for the managed side (`0` = no color).
fn pack_color(color: *const clap_color) -> u32 {
    // SAFETY: the host passes either null or a valid color struct.
    match unsafe { color.as_ref() } {
        Some(color) => {
            u32::from(color.alpha) << 24
                | u32::from(color.red) << 16
                | u32::from(color.green) << 8
                | u32::from(color.blue)
        }
        None => 0,
    }
}

unsafe extern "C" fn set_mapping(
    plugin: *const clap_plugin,
    param_id: clap_id,
    has_mapping: bool,
    color: *const clap_color,
    label: *const c_char,
    description: *const c_char,
) {
    fenced((), || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else { return };
        if let Some(set_mapping_fn) = shim.entry.symbols.param_indication_set_mapping {
            // SAFETY: cached export; label/description are host-provided
            // and may be null.
            unsafe {
                set_mapping_fn(
                    shim.handle,
                    param_id,
                    has_mapping,
                    pack_color(color),
                    label,
                    description,
                );
            }
        }
    })
}

unsafe extern "C" fn set_automation(
    plugin: *const clap_plugin,
    param_id: clap_id,
    automation_state: u32,
    color: *const clap_color,
) {
    fenced((), || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else { return };
        if let Some(set_automation_fn) = shim.entry.symbols.param_indication_set_automation {
            // SAFETY: cached export; handle is live.
            unsafe { set_automation_fn(shim.handle, param_id, automation_state, pack_color(color)) };
        }
    })
}
