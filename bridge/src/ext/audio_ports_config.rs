//! Whole-plugin audio port configurations.
//!
//! Selecting a configuration is a main-thread operation and requires the
//! plugin to be deactivated; the shim enforces the lifecycle side of that
//! before the managed side ever sees the call.

use super::audio_ports::{fill_port_info, port_type_str};
use crate::instance::{shim_from, Lifecycle};
use crate::symbols::{BridgeAudioPortInfo, BridgeAudioPortsConfig};
use crate::util::fenced;
use clap_sys::ext::audio_ports::clap_audio_port_info;
use clap_sys::ext::audio_ports_config::{
    clap_audio_ports_config, clap_plugin_audio_ports_config,
    clap_plugin_audio_ports_config_info,
};
use clap_sys::id::{clap_id, CLAP_INVALID_ID};
use clap_sys::plugin::clap_plugin;

pub(crate) static VTABLE: clap_plugin_audio_ports_config = clap_plugin_audio_ports_config {
    count: Some(count),
    get: Some(get),
    select: Some(select),
};

pub(crate) static INFO_VTABLE: clap_plugin_audio_ports_config_info =
    clap_plugin_audio_ports_config_info {
        current_config: Some(current_config),
        get: Some(info_get),
    };

unsafe extern "C" fn count(plugin: *const clap_plugin) -> u32 {
    fenced(0, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else { return 0 };
        let Some(count_fn) = shim.entry.symbols.ports_config_count else {
            return 0;
        };
        // SAFETY: cached export; handle is live.
        unsafe { count_fn(shim.handle) }
    })
}

unsafe extern "C" fn get(
    plugin: *const clap_plugin,
    index: u32,
    config: *mut clap_audio_ports_config,
) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        if config.is_null() {
            return false;
        }
        let Some(get_fn) = shim.entry.symbols.ports_config_get else {
            return false;
        };

        let mut bridge_config = BridgeAudioPortsConfig::default();
        // SAFETY: cached export; bridge_config is a valid out-struct.
        if !unsafe { get_fn(shim.handle, index, &mut bridge_config) } {
            return false;
        }

        // SAFETY: the host passes a writable config struct.
        let out = unsafe { &mut *config };
        out.id = bridge_config.id;
        out.name = bridge_config.name;
        out.name[out.name.len() - 1] = 0;
        out.input_port_count = bridge_config.input_port_count;
        out.output_port_count = bridge_config.output_port_count;
        out.has_main_input = bridge_config.has_main_input;
        out.main_input_channel_count = bridge_config.main_input_channel_count;
        out.main_input_port_type = port_type_str(bridge_config.main_input_port_type);
        out.has_main_output = bridge_config.has_main_output;
        out.main_output_channel_count = bridge_config.main_output_channel_count;
        out.main_output_port_type = port_type_str(bridge_config.main_output_port_type);
        true
    })
}

unsafe extern "C" fn select(plugin: *const clap_plugin, config_id: clap_id) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        shim.host.debug_assert_main_thread();
        // Configuration switches rewire the port layout; only legal while
        // deactivated.
        if !matches!(shim.lifecycle, Lifecycle::Created | Lifecycle::Initialized) {
            return false;
        }
        let Some(select_fn) = shim.entry.symbols.ports_config_select else {
            return false;
        };
        // SAFETY: cached export; handle is live.
        unsafe { select_fn(shim.handle, config_id) }
    })
}

unsafe extern "C" fn current_config(plugin: *const clap_plugin) -> clap_id {
    fenced(CLAP_INVALID_ID, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return CLAP_INVALID_ID;
        };
        let Some(current_fn) = shim.entry.symbols.ports_config_current else {
            return CLAP_INVALID_ID;
        };
        // SAFETY: cached export; handle is live.
        unsafe { current_fn(shim.handle) }
    })
}

unsafe extern "C" fn info_get(
    plugin: *const clap_plugin,
    config_id: clap_id,
    port_index: u32,
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
        let Some(info_get_fn) = shim.entry.symbols.ports_config_info_get else {
            return false;
        };

        let mut bridge_info = BridgeAudioPortInfo::default();
        // SAFETY: cached export; bridge_info is a valid out-struct.
        if !unsafe { info_get_fn(shim.handle, config_id, port_index, is_input, &mut bridge_info) } {
            return false;
        }

        // SAFETY: the host passes a writable info struct.
        fill_port_info(unsafe { &mut *info }, &bridge_info);
        true
    })
}
