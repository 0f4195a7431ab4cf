use crate::instance::shim_from;
use crate::util::fenced;
use clap_sys::ext::surround::clap_plugin_surround;
use clap_sys::plugin::clap_plugin;

pub(crate) static VTABLE: clap_plugin_surround = clap_plugin_surround {
    is_channel_mask_supported: Some(is_channel_mask_supported),
    get_channel_map: Some(get_channel_map),
};

unsafe extern "C" fn is_channel_mask_supported(
    plugin: *const clap_plugin,
    channel_mask: u64,
) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        let Some(query_fn) = shim.entry.symbols.surround_mask_supported else {
            // A plugin serving channel maps without a mask filter accepts
            // whatever layout the host proposes.
            return true;
        };
        // SAFETY: cached export; handle is live.
        unsafe { query_fn(shim.handle, channel_mask) }
    })
}

unsafe extern "C" fn get_channel_map(
    plugin: *const clap_plugin,
    is_input: bool,
    port_index: u32,
    channel_map: *mut u8,
    channel_map_capacity: u32,
) -> u32 {
    fenced(0, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else { return 0 };
        if channel_map.is_null() {
            return 0;
        }
        let Some(map_fn) = shim.entry.symbols.surround_channel_map else {
            return 0;
        };
        // SAFETY: cached export; the host provides a buffer of the given
        // capacity.
        unsafe {
            map_fn(
                shim.handle,
                is_input,
                port_index,
                channel_map,
                channel_map_capacity,
            )
        }
    })
}
