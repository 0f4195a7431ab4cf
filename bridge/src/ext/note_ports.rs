use crate::instance::shim_from;
use crate::symbols::BridgeNotePortInfo;
use crate::util::fenced;
use clap_sys::ext::note_ports::{clap_note_port_info, clap_plugin_note_ports};
use clap_sys::plugin::clap_plugin;

pub(crate) static VTABLE: clap_plugin_note_ports = clap_plugin_note_ports {
    count: Some(count),
    get: Some(get),
};

unsafe extern "C" fn count(plugin: *const clap_plugin, is_input: bool) -> u32 {
    fenced(0, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else { return 0 };
        let Some(count_fn) = shim.entry.symbols.note_ports_count else {
            return 0;
        };
        // SAFETY: cached export; handle is live.
        unsafe { count_fn(shim.handle, is_input) }
    })
}

unsafe extern "C" fn get(
    plugin: *const clap_plugin,
    index: u32,
    is_input: bool,
    info: *mut clap_note_port_info,
) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        if info.is_null() {
            return false;
        }
        let Some(get_fn) = shim.entry.symbols.note_ports_get else {
            return false;
        };

        let mut bridge_info = BridgeNotePortInfo::default();
        // SAFETY: cached export; bridge_info is a valid out-struct.
        if !unsafe { get_fn(shim.handle, index, is_input, &mut bridge_info) } {
            return false;
        }

        // SAFETY: the host passes a writable info struct.
        let out = unsafe { &mut *info };
        out.id = bridge_info.id;
        out.supported_dialects = bridge_info.supported_dialects;
        out.preferred_dialect = bridge_info.preferred_dialect;
        out.name = bridge_info.name;
        out.name[out.name.len() - 1] = 0;
        true
    })
}
