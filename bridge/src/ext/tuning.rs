use crate::instance::shim_from;
use crate::util::fenced;
use clap_sys::ext::draft::tuning::clap_plugin_tuning_t;
use clap_sys::plugin::clap_plugin;

pub(crate) static VTABLE: clap_plugin_tuning_t = clap_plugin_tuning_t {
    changed: Some(changed),
};

unsafe extern "C" fn changed(plugin: *const clap_plugin) {
    fenced((), || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else { return };
        if let Some(changed_fn) = shim.entry.symbols.tuning_changed {
            // SAFETY: cached export; handle is live.
            unsafe { changed_fn(shim.handle) };
        }
    })
}
