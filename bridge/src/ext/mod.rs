//! Static vtables for every supported CLAP extension.
//!
//! Each submodule owns one statically allocated extension struct whose
//! function pointers are module-local dispatchers. [`lookup`] is the single
//! `get_extension` table: it returns a vtable only when the instance's
//! support bitmap says the matching managed exports were present at load
//! time, and always the same pointer for the same id, as hosts require.

use crate::symbols::ExtensionSupport;
use clap_sys::ext::ambisonic::{CLAP_EXT_AMBISONIC, CLAP_EXT_AMBISONIC_COMPAT};
use clap_sys::ext::audio_ports::CLAP_EXT_AUDIO_PORTS;
use clap_sys::ext::audio_ports_activation::{
    CLAP_EXT_AUDIO_PORTS_ACTIVATION, CLAP_EXT_AUDIO_PORTS_ACTIVATION_COMPAT,
};
use clap_sys::ext::audio_ports_config::{
    CLAP_EXT_AUDIO_PORTS_CONFIG, CLAP_EXT_AUDIO_PORTS_CONFIG_INFO,
    CLAP_EXT_AUDIO_PORTS_CONFIG_INFO_COMPAT,
};
use clap_sys::ext::context_menu::{CLAP_EXT_CONTEXT_MENU, CLAP_EXT_CONTEXT_MENU_COMPAT};
use clap_sys::ext::latency::CLAP_EXT_LATENCY;
use clap_sys::ext::note_name::CLAP_EXT_NOTE_NAME;
use clap_sys::ext::note_ports::CLAP_EXT_NOTE_PORTS;
use clap_sys::ext::param_indication::{
    CLAP_EXT_PARAM_INDICATION, CLAP_EXT_PARAM_INDICATION_COMPAT,
};
use clap_sys::ext::params::CLAP_EXT_PARAMS;
use clap_sys::ext::preset_load::{CLAP_EXT_PRESET_LOAD, CLAP_EXT_PRESET_LOAD_COMPAT};
use clap_sys::ext::remote_controls::{
    CLAP_EXT_REMOTE_CONTROLS, CLAP_EXT_REMOTE_CONTROLS_COMPAT,
};
use clap_sys::ext::render::CLAP_EXT_RENDER;
use clap_sys::ext::state::CLAP_EXT_STATE;
use clap_sys::ext::state_context::CLAP_EXT_STATE_CONTEXT;
use clap_sys::ext::surround::{CLAP_EXT_SURROUND, CLAP_EXT_SURROUND_COMPAT};
use clap_sys::ext::tail::CLAP_EXT_TAIL;
use clap_sys::ext::timer_support::CLAP_EXT_TIMER_SUPPORT;
use clap_sys::ext::track_info::{CLAP_EXT_TRACK_INFO, CLAP_EXT_TRACK_INFO_COMPAT};
use clap_sys::ext::voice_info::CLAP_EXT_VOICE_INFO;
use clap_sys::ext::draft::tuning::CLAP_EXT_TUNING;
use std::ffi::{c_void, CStr};

pub(crate) mod ambisonic;
pub(crate) mod audio_ports;
pub(crate) mod audio_ports_activation;
pub(crate) mod audio_ports_config;
pub(crate) mod context_menu;
pub(crate) mod latency;
pub(crate) mod note_name;
pub(crate) mod note_ports;
pub(crate) mod param_indication;
pub(crate) mod params;
pub(crate) mod preset_load;
pub(crate) mod remote_controls;
pub(crate) mod render;
pub(crate) mod state;
pub(crate) mod surround;
pub(crate) mod tail;
pub(crate) mod timer;
pub(crate) mod track_info;
pub(crate) mod tuning;
pub(crate) mod voice_info;

/// Maps an extension id to its static vtable, gated by the support bitmap.
pub(crate) fn lookup(support: ExtensionSupport, id: &CStr) -> *const c_void {
    struct Slot {
        ids: &'static [&'static CStr],
        flag: ExtensionSupport,
        vtable: *const c_void,
    }

    let slots = [
        Slot {
            ids: &[CLAP_EXT_PARAMS],
            flag: ExtensionSupport::PARAMS,
            vtable: (&params::VTABLE as *const clap_sys::ext::params::clap_plugin_params).cast(),
        },
        Slot {
            ids: &[CLAP_EXT_STATE],
            flag: ExtensionSupport::STATE,
            vtable: (&state::VTABLE as *const clap_sys::ext::state::clap_plugin_state).cast(),
        },
        Slot {
            ids: &[CLAP_EXT_STATE_CONTEXT],
            flag: ExtensionSupport::STATE_CONTEXT,
            vtable: (&state::CONTEXT_VTABLE
                as *const clap_sys::ext::state_context::clap_plugin_state_context)
                .cast(),
        },
        Slot {
            ids: &[CLAP_EXT_AUDIO_PORTS],
            flag: ExtensionSupport::AUDIO_PORTS,
            vtable: (&audio_ports::VTABLE
                as *const clap_sys::ext::audio_ports::clap_plugin_audio_ports)
                .cast(),
        },
        Slot {
            ids: &[CLAP_EXT_AUDIO_PORTS_CONFIG],
            flag: ExtensionSupport::AUDIO_PORTS_CONFIG,
            vtable: (&audio_ports_config::VTABLE
                as *const clap_sys::ext::audio_ports_config::clap_plugin_audio_ports_config)
                .cast(),
        },
        Slot {
            ids: &[
                CLAP_EXT_AUDIO_PORTS_CONFIG_INFO,
                CLAP_EXT_AUDIO_PORTS_CONFIG_INFO_COMPAT,
            ],
            flag: ExtensionSupport::AUDIO_PORTS_CONFIG_INFO,
            vtable: (&audio_ports_config::INFO_VTABLE
                as *const clap_sys::ext::audio_ports_config::clap_plugin_audio_ports_config_info)
                .cast(),
        },
        Slot {
            ids: &[
                CLAP_EXT_AUDIO_PORTS_ACTIVATION,
                CLAP_EXT_AUDIO_PORTS_ACTIVATION_COMPAT,
            ],
            flag: ExtensionSupport::AUDIO_PORTS_ACTIVATION,
            vtable: (&audio_ports_activation::VTABLE
                as *const clap_sys::ext::audio_ports_activation::clap_plugin_audio_ports_activation)
                .cast(),
        },
        Slot {
            ids: &[CLAP_EXT_NOTE_PORTS],
            flag: ExtensionSupport::NOTE_PORTS,
            vtable: (&note_ports::VTABLE
                as *const clap_sys::ext::note_ports::clap_plugin_note_ports)
                .cast(),
        },
        Slot {
            ids: &[CLAP_EXT_NOTE_NAME],
            flag: ExtensionSupport::NOTE_NAME,
            vtable: (&note_name::VTABLE as *const clap_sys::ext::note_name::clap_plugin_note_name)
                .cast(),
        },
        Slot {
            ids: &[CLAP_EXT_LATENCY],
            flag: ExtensionSupport::LATENCY,
            vtable: (&latency::VTABLE as *const clap_sys::ext::latency::clap_plugin_latency).cast(),
        },
        Slot {
            ids: &[CLAP_EXT_TAIL],
            flag: ExtensionSupport::TAIL,
            vtable: (&tail::VTABLE as *const clap_sys::ext::tail::clap_plugin_tail).cast(),
        },
        Slot {
            ids: &[CLAP_EXT_RENDER],
            flag: ExtensionSupport::RENDER,
            vtable: (&render::VTABLE as *const clap_sys::ext::render::clap_plugin_render).cast(),
        },
        Slot {
            ids: &[CLAP_EXT_VOICE_INFO],
            flag: ExtensionSupport::VOICE_INFO,
            vtable: (&voice_info::VTABLE
                as *const clap_sys::ext::voice_info::clap_plugin_voice_info)
                .cast(),
        },
        Slot {
            ids: &[CLAP_EXT_SURROUND, CLAP_EXT_SURROUND_COMPAT],
            flag: ExtensionSupport::SURROUND,
            vtable: (&surround::VTABLE as *const clap_sys::ext::surround::clap_plugin_surround)
                .cast(),
        },
        Slot {
            ids: &[CLAP_EXT_AMBISONIC, CLAP_EXT_AMBISONIC_COMPAT],
            flag: ExtensionSupport::AMBISONIC,
            vtable: (&ambisonic::VTABLE as *const clap_sys::ext::ambisonic::clap_plugin_ambisonic)
                .cast(),
        },
        Slot {
            ids: &[CLAP_EXT_TIMER_SUPPORT],
            flag: ExtensionSupport::TIMER,
            vtable: (&timer::VTABLE
                as *const clap_sys::ext::timer_support::clap_plugin_timer_support)
                .cast(),
        },
        Slot {
            ids: &[CLAP_EXT_TRACK_INFO, CLAP_EXT_TRACK_INFO_COMPAT],
            flag: ExtensionSupport::TRACK_INFO,
            vtable: (&track_info::VTABLE
                as *const clap_sys::ext::track_info::clap_plugin_track_info)
                .cast(),
        },
        Slot {
            ids: &[CLAP_EXT_TUNING],
            flag: ExtensionSupport::TUNING,
            vtable: (&tuning::VTABLE
                as *const clap_sys::ext::draft::tuning::clap_plugin_tuning_t)
                .cast(),
        },
        Slot {
            ids: &[CLAP_EXT_PRESET_LOAD, CLAP_EXT_PRESET_LOAD_COMPAT],
            flag: ExtensionSupport::PRESET_LOAD,
            vtable: (&preset_load::VTABLE
                as *const clap_sys::ext::preset_load::clap_plugin_preset_load)
                .cast(),
        },
        Slot {
            ids: &[CLAP_EXT_REMOTE_CONTROLS, CLAP_EXT_REMOTE_CONTROLS_COMPAT],
            flag: ExtensionSupport::REMOTE_CONTROLS,
            vtable: (&remote_controls::VTABLE
                as *const clap_sys::ext::remote_controls::clap_plugin_remote_controls)
                .cast(),
        },
        Slot {
            ids: &[CLAP_EXT_PARAM_INDICATION, CLAP_EXT_PARAM_INDICATION_COMPAT],
            flag: ExtensionSupport::PARAM_INDICATION,
            vtable: (&param_indication::VTABLE
                as *const clap_sys::ext::param_indication::clap_plugin_param_indication)
                .cast(),
        },
        Slot {
            ids: &[CLAP_EXT_CONTEXT_MENU, CLAP_EXT_CONTEXT_MENU_COMPAT],
            flag: ExtensionSupport::CONTEXT_MENU,
            vtable: (&context_menu::VTABLE
                as *const clap_sys::ext::context_menu::clap_plugin_context_menu)
                .cast(),
        },
    ];

    for slot in slots {
        if slot.ids.iter().any(|candidate| *candidate == id) {
            return if support.contains(slot.flag) {
                slot.vtable
            } else {
                std::ptr::null()
            };
        }
    }

    std::ptr::null()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vtables_are_gated_by_support() {
        let latency_only = ExtensionSupport::LATENCY;

        assert!(!lookup(latency_only, CLAP_EXT_LATENCY).is_null());
        assert!(lookup(latency_only, CLAP_EXT_TAIL).is_null());
        assert!(lookup(latency_only, CLAP_EXT_PARAMS).is_null());
        assert!(lookup(latency_only, c"clap.not-an-extension").is_null());
    }

    #[test]
    fn vtable_pointers_are_stable() {
        let support = ExtensionSupport::all();
        let first = lookup(support, CLAP_EXT_PARAMS);
        let second = lookup(support, CLAP_EXT_PARAMS);
        assert!(!first.is_null());
        assert_eq!(first, second);
    }

    #[test]
    fn compat_ids_resolve_to_the_same_vtable() {
        let support = ExtensionSupport::all();
        assert_eq!(
            lookup(support, CLAP_EXT_TRACK_INFO),
            lookup(support, CLAP_EXT_TRACK_INFO_COMPAT)
        );
    }
}
