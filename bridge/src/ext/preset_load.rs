use crate::instance::shim_from;
use crate::util::fenced;
use clap_sys::ext::preset_load::clap_plugin_preset_load;
use clap_sys::factory::preset_discovery::clap_preset_discovery_location_kind;
use clap_sys::plugin::clap_plugin;
use std::ffi::c_char;

pub(crate) static VTABLE: clap_plugin_preset_load = clap_plugin_preset_load {
    from_location: Some(from_location),
};

unsafe extern "C" fn from_location(
    plugin: *const clap_plugin,
    location_kind: clap_preset_discovery_location_kind,
    location: *const c_char,
    load_key: *const c_char,
) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        shim.host.debug_assert_main_thread();
        let Some(load_fn) = shim.entry.symbols.preset_load_from_location else {
            return false;
        };
        // SAFETY: cached export; location/load_key are host-provided and
        // may be null for plugin-internal locations.
        unsafe { load_fn(shim.handle, location_kind, location, load_key) }
    })
}
