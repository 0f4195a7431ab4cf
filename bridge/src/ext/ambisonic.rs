use crate::instance::shim_from;
use crate::util::fenced;
use clap_sys::ext::ambisonic::{clap_ambisonic_config, clap_plugin_ambisonic};
use clap_sys::plugin::clap_plugin;

pub(crate) static VTABLE: clap_plugin_ambisonic = clap_plugin_ambisonic {
    is_config_supported: Some(is_config_supported),
    get_config: Some(get_config),
};

unsafe extern "C" fn is_config_supported(
    plugin: *const clap_plugin,
    config: *const clap_ambisonic_config,
) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        // SAFETY: the host passes a valid config struct.
        let Some(config) = (unsafe { config.as_ref() }) else {
            return false;
        };
        let Some(query_fn) = shim.entry.symbols.ambisonic_config_supported else {
            // Without a filter export, accept exactly what get_config
            // reports; conservative hosts re-query anyway.
            return true;
        };
        // SAFETY: cached export; handle is live.
        unsafe { query_fn(shim.handle, config.ordering, config.normalization) }
    })
}

unsafe extern "C" fn get_config(
    plugin: *const clap_plugin,
    is_input: bool,
    port_index: u32,
    config: *mut clap_ambisonic_config,
) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        if config.is_null() {
            return false;
        }
        let Some(get_fn) = shim.entry.symbols.ambisonic_get_config else {
            return false;
        };

        let mut ordering = 0u32;
        let mut normalization = 0u32;
        // SAFETY: cached export; out-pointers are valid locals.
        let found = unsafe {
            get_fn(
                shim.handle,
                is_input,
                port_index,
                &mut ordering,
                &mut normalization,
            )
        };
        if !found {
            return false;
        }

        // SAFETY: the host passes a writable config struct.
        let out = unsafe { &mut *config };
        out.ordering = ordering;
        out.normalization = normalization;
        true
    })
}
