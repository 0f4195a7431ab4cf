use crate::instance::shim_from;
use crate::symbols::BridgeNoteName;
use crate::util::fenced;
use clap_sys::ext::note_name::{clap_note_name, clap_plugin_note_name};
use clap_sys::plugin::clap_plugin;

pub(crate) static VTABLE: clap_plugin_note_name = clap_plugin_note_name {
    count: Some(count),
    get: Some(get),
};

unsafe extern "C" fn count(plugin: *const clap_plugin) -> u32 {
    fenced(0, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else { return 0 };
        let Some(count_fn) = shim.entry.symbols.note_name_count else {
            return 0;
        };
        // SAFETY: cached export; handle is live.
        unsafe { count_fn(shim.handle) }
    })
}

unsafe extern "C" fn get(
    plugin: *const clap_plugin,
    index: u32,
    note_name: *mut clap_note_name,
) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        if note_name.is_null() {
            return false;
        }
        let Some(get_fn) = shim.entry.symbols.note_name_get else {
            return false;
        };

        let mut bridge_name = BridgeNoteName::default();
        // SAFETY: cached export; bridge_name is a valid out-struct.
        if !unsafe { get_fn(shim.handle, index, &mut bridge_name) } {
            return false;
        }

        // SAFETY: the host passes a writable note name struct.
        let out = unsafe { &mut *note_name };
        out.name = bridge_name.name;
        out.name[out.name.len() - 1] = 0;
        out.port = bridge_name.port;
        out.key = bridge_name.key;
        out.channel = bridge_name.channel;
        true
    })
}
