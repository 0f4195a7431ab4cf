use crate::instance::{shim_from, Lifecycle};
use crate::util::fenced;
use clap_sys::ext::audio_ports_activation::clap_plugin_audio_ports_activation;
use clap_sys::plugin::clap_plugin;

pub(crate) static VTABLE: clap_plugin_audio_ports_activation =
    clap_plugin_audio_ports_activation {
        can_activate_while_processing: Some(can_activate_while_processing),
        set_active: Some(set_active),
    };

unsafe extern "C" fn can_activate_while_processing(plugin: *const clap_plugin) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        let Some(query_fn) = shim.entry.symbols.ports_activation_can_activate else {
            return false;
        };
        // SAFETY: cached export; handle is live.
        unsafe { query_fn(shim.handle) }
    })
}

unsafe extern "C" fn set_active(
    plugin: *const clap_plugin,
    is_input: bool,
    port_index: u32,
    is_active: bool,
    sample_size: u32,
) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        let Some(set_fn) = shim.entry.symbols.ports_activation_set_active else {
            return false;
        };

        // Unless the plugin opted into live switching, port activation is
        // only legal while deactivated.
        let live_capable = shim
            .entry
            .symbols
            .ports_activation_can_activate
            // SAFETY: cached export; handle is live.
            .map(|query_fn| unsafe { query_fn(shim.handle) })
            .unwrap_or(false);
        let deactivated = matches!(shim.lifecycle, Lifecycle::Created | Lifecycle::Initialized);
        if !live_capable && !deactivated {
            return false;
        }

        // SAFETY: cached export; handle is live.
        unsafe { set_fn(shim.handle, is_input, port_index, is_active, sample_size) }
    })
}
