use crate::instance::shim_from;
use crate::symbols::BridgeVoiceInfo;
use crate::util::fenced;
use clap_sys::ext::voice_info::{clap_plugin_voice_info, clap_voice_info};
use clap_sys::plugin::clap_plugin;

pub(crate) static VTABLE: clap_plugin_voice_info = clap_plugin_voice_info { get: Some(get) };

unsafe extern "C" fn get(plugin: *const clap_plugin, info: *mut clap_voice_info) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        if info.is_null() {
            return false;
        }
        let Some(get_fn) = shim.entry.symbols.voice_info_get else {
            return false;
        };

        let mut bridge_info = BridgeVoiceInfo::default();
        // SAFETY: cached export; bridge_info is a valid out-struct.
        if !unsafe { get_fn(shim.handle, &mut bridge_info) } {
            return false;
        }

        // SAFETY: the host passes a writable info struct.
        let out = unsafe { &mut *info };
        out.voice_count = bridge_info.voice_count;
        out.voice_capacity = bridge_info.voice_capacity;
        out.flags = bridge_info.flags;
        true
    })
}
