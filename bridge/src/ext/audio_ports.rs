use crate::instance::shim_from;
use crate::symbols::{
    BridgeAudioPortInfo, PORT_TYPE_AMBISONIC, PORT_TYPE_MONO, PORT_TYPE_STEREO,
    PORT_TYPE_SURROUND,
};
use crate::util::fenced;
use clap_sys::ext::ambisonic::CLAP_PORT_AMBISONIC;
use clap_sys::ext::audio_ports::{clap_audio_port_info, clap_plugin_audio_ports};
use clap_sys::ext::surround::CLAP_PORT_SURROUND;
use clap_sys::plugin::clap_plugin;
use std::ffi::{c_char, CStr};

pub(crate) static VTABLE: clap_plugin_audio_ports = clap_plugin_audio_ports {
    count: Some(count),
    get: Some(get),
};

/// Maps a bridge port type code to the CLAP port type string.
pub(crate) fn port_type_str(code: u32) -> *const c_char {
    use clap_sys::ext::audio_ports::{CLAP_PORT_MONO, CLAP_PORT_STEREO};

    let id: &CStr = match code {
        PORT_TYPE_MONO => CLAP_PORT_MONO,
        PORT_TYPE_STEREO => CLAP_PORT_STEREO,
        PORT_TYPE_SURROUND => CLAP_PORT_SURROUND,
        PORT_TYPE_AMBISONIC => CLAP_PORT_AMBISONIC,
        _ => return std::ptr::null(),
    };
    id.as_ptr()
}

/// Copies a bridge port record into the CLAP info struct.
pub(crate) fn fill_port_info(out: &mut clap_audio_port_info, info: &BridgeAudioPortInfo) {
    out.id = info.id;
    out.flags = info.flags;
    out.channel_count = info.channel_count;
    out.port_type = port_type_str(info.port_type);
    out.in_place_pair = info.in_place_pair;
    out.name = info.name;
    out.name[out.name.len() - 1] = 0;
}

unsafe extern "C" fn count(plugin: *const clap_plugin, is_input: bool) -> u32 {
    fenced(0, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else { return 0 };
        let Some(count_fn) = shim.entry.symbols.audio_ports_count else {
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
    info: *mut clap_audio_port_info,
) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        if info.is_null() {
            return false;
        }
        let Some(get_fn) = shim.entry.symbols.audio_ports_get else {
            return false;
        };

        let mut bridge_info = BridgeAudioPortInfo::default();
        // SAFETY: cached export; bridge_info is a valid out-struct.
        if !unsafe { get_fn(shim.handle, index, is_input, &mut bridge_info) } {
            return false;
        }

        // SAFETY: the host passes a writable info struct.
        fill_port_info(unsafe { &mut *info }, &bridge_info);
        true
    })
}
