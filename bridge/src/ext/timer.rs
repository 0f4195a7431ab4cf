use crate::instance::shim_from;
use crate::util::fenced;
use clap_sys::ext::timer_support::clap_plugin_timer_support;
use clap_sys::id::clap_id;
use clap_sys::plugin::clap_plugin;

pub(crate) static VTABLE: clap_plugin_timer_support = clap_plugin_timer_support {
    on_timer: Some(on_timer),
};

unsafe extern "C" fn on_timer(plugin: *const clap_plugin, timer_id: clap_id) {
    fenced((), || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else { return };
        if let Some(on_timer_fn) = shim.entry.symbols.on_timer {
            // SAFETY: cached export; handle is live.
            unsafe { on_timer_fn(shim.handle, timer_id) };
        }
    })
}
