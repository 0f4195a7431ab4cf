use crate::instance::shim_from;
use crate::util::fenced;
use clap_sys::ext::tail::clap_plugin_tail;
use clap_sys::plugin::clap_plugin;

pub(crate) static VTABLE: clap_plugin_tail = clap_plugin_tail { get: Some(get) };

unsafe extern "C" fn get(plugin: *const clap_plugin) -> u32 {
    fenced(0, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else { return 0 };
        let Some(get_fn) = shim.entry.symbols.tail_get else {
            return 0;
        };
        // SAFETY: cached export; handle is live.
        unsafe { get_fn(shim.handle) }
    })
}
