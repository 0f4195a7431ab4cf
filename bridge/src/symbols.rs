//! The managed export ABI and the per-entry symbol cache.
//!
//! A Go plugin shared object exposes C-callable symbols whose names are the
//! [`SYMBOL_PREFIX`] followed by a standardized operation name. All of them
//! are optional except `CreatePlugin`: an absent symbol simply disables the
//! corresponding CLAP extension for every plugin served by that entry.
//!
//! Symbols are resolved exactly once, when the entry loads the shared
//! object, and cached as plain function pointers ("crossing guard"). No
//! `dlsym` happens on any hot path; debug builds assert this by sealing the
//! resolver after entry initialization.

use bitflags::bitflags;
use clap_sys::audio_buffer::clap_audio_buffer;
use clap_sys::events::{clap_input_events, clap_output_events};
use clap_sys::host::clap_host;
use clap_sys::stream::{clap_istream, clap_ostream};
use clap_sys::string_sizes::{CLAP_NAME_SIZE, CLAP_PATH_SIZE};
use libloading::Library;
use std::ffi::{c_char, c_void};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Prefix of every managed export name.
pub const SYMBOL_PREFIX: &str = "GoBridge_";

/// Number of parameter id slots in a remote controls page.
pub const REMOTE_CONTROLS_PARAM_COUNT: usize = 8;

// Audio port type codes crossing the boundary; the C layer maps them to the
// CLAP port type strings.
pub const PORT_TYPE_NONE: u32 = 0;
pub const PORT_TYPE_MONO: u32 = 1;
pub const PORT_TYPE_STEREO: u32 = 2;
pub const PORT_TYPE_SURROUND: u32 = 3;
pub const PORT_TYPE_AMBISONIC: u32 = 4;

/// Parameter descriptor as reported by the managed side.
///
/// Mirrors `clap_param_info` field-for-field, with fixed-capacity char
/// arrays so no ownership crosses the boundary.
#[repr(C)]
pub struct BridgeParamInfo {
    pub id: u32,
    pub flags: u32,
    pub min_value: f64,
    pub max_value: f64,
    pub default_value: f64,
    pub cookie: *mut c_void,
    pub name: [c_char; CLAP_NAME_SIZE],
    pub module: [c_char; CLAP_PATH_SIZE],
}

impl Default for BridgeParamInfo {
    fn default() -> Self {
        Self {
            id: 0,
            flags: 0,
            min_value: 0.0,
            max_value: 1.0,
            default_value: 0.0,
            cookie: std::ptr::null_mut(),
            name: [0; CLAP_NAME_SIZE],
            module: [0; CLAP_PATH_SIZE],
        }
    }
}

/// Audio port descriptor as reported by the managed side.
#[repr(C)]
pub struct BridgeAudioPortInfo {
    pub id: u32,
    pub channel_count: u32,
    pub flags: u32,
    /// One of the `PORT_TYPE_*` codes.
    pub port_type: u32,
    /// Paired output/input port id, or `CLAP_INVALID_ID`.
    pub in_place_pair: u32,
    pub name: [c_char; CLAP_NAME_SIZE],
}

impl Default for BridgeAudioPortInfo {
    fn default() -> Self {
        Self {
            id: 0,
            channel_count: 0,
            flags: 0,
            port_type: PORT_TYPE_NONE,
            in_place_pair: u32::MAX,
            name: [0; CLAP_NAME_SIZE],
        }
    }
}

/// Note port descriptor as reported by the managed side.
#[repr(C)]
pub struct BridgeNotePortInfo {
    pub id: u32,
    /// `CLAP_NOTE_DIALECT_*` bitmask.
    pub supported_dialects: u32,
    pub preferred_dialect: u32,
    pub name: [c_char; CLAP_NAME_SIZE],
}

impl Default for BridgeNotePortInfo {
    fn default() -> Self {
        Self {
            id: 0,
            supported_dialects: 0,
            preferred_dialect: 0,
            name: [0; CLAP_NAME_SIZE],
        }
    }
}

/// Voice capability report.
#[repr(C)]
#[derive(Default)]
pub struct BridgeVoiceInfo {
    pub voice_count: u32,
    pub voice_capacity: u32,
    pub flags: u64,
}

/// One named key, as reported by the note-name extension.
#[repr(C)]
pub struct BridgeNoteName {
    pub name: [c_char; CLAP_NAME_SIZE],
    pub port: i16,
    pub key: i16,
    pub channel: i16,
}

impl Default for BridgeNoteName {
    fn default() -> Self {
        Self {
            name: [0; CLAP_NAME_SIZE],
            port: -1,
            key: -1,
            channel: -1,
        }
    }
}

/// A whole-plugin audio port configuration.
#[repr(C)]
pub struct BridgeAudioPortsConfig {
    pub id: u32,
    pub input_port_count: u32,
    pub output_port_count: u32,
    pub has_main_input: bool,
    pub main_input_channel_count: u32,
    pub main_input_port_type: u32,
    pub has_main_output: bool,
    pub main_output_channel_count: u32,
    pub main_output_port_type: u32,
    pub name: [c_char; CLAP_NAME_SIZE],
}

impl Default for BridgeAudioPortsConfig {
    fn default() -> Self {
        Self {
            id: 0,
            input_port_count: 0,
            output_port_count: 0,
            has_main_input: false,
            main_input_channel_count: 0,
            main_input_port_type: PORT_TYPE_NONE,
            has_main_output: false,
            main_output_channel_count: 0,
            main_output_port_type: PORT_TYPE_NONE,
            name: [0; CLAP_NAME_SIZE],
        }
    }
}

/// One page of remote control mappings.
#[repr(C)]
pub struct BridgeRemoteControlsPage {
    pub section_name: [c_char; CLAP_NAME_SIZE],
    pub page_id: u32,
    pub page_name: [c_char; CLAP_NAME_SIZE],
    /// Unused slots hold `CLAP_INVALID_ID`.
    pub param_ids: [u32; REMOTE_CONTROLS_PARAM_COUNT],
    pub is_for_preset: bool,
}

impl Default for BridgeRemoteControlsPage {
    fn default() -> Self {
        Self {
            section_name: [0; CLAP_NAME_SIZE],
            page_id: 0,
            page_name: [0; CLAP_NAME_SIZE],
            param_ids: [u32::MAX; REMOTE_CONTROLS_PARAM_COUNT],
            is_for_preset: false,
        }
    }
}

// Signatures of the managed exports. The first argument is always the
// opaque instance handle returned by `CreatePlugin` (except for
// `CreatePlugin` itself).

pub type CreatePluginFn =
    unsafe extern "C" fn(host: *const clap_host, plugin_id: *const c_char) -> *mut c_void;
pub type PluginVoidFn = unsafe extern "C" fn(handle: *mut c_void);
pub type PluginBoolFn = unsafe extern "C" fn(handle: *mut c_void) -> bool;
pub type PluginU32Fn = unsafe extern "C" fn(handle: *mut c_void) -> u32;
pub type PluginActivateFn = unsafe extern "C" fn(
    handle: *mut c_void,
    sample_rate: f64,
    min_frames: u32,
    max_frames: u32,
) -> bool;
pub type PluginProcessFn = unsafe extern "C" fn(
    handle: *mut c_void,
    steady_time: i64,
    frames_count: u32,
    audio_inputs: *const clap_audio_buffer,
    audio_inputs_count: u32,
    audio_outputs: *mut clap_audio_buffer,
    audio_outputs_count: u32,
    in_events: *const clap_input_events,
    out_events: *const clap_output_events,
) -> i32;

pub type ParamsGetInfoFn =
    unsafe extern "C" fn(handle: *mut c_void, index: u32, info: *mut BridgeParamInfo) -> bool;
pub type ParamsGetValueFn =
    unsafe extern "C" fn(handle: *mut c_void, param_id: u32, value: *mut f64) -> bool;
pub type ParamsValueToTextFn = unsafe extern "C" fn(
    handle: *mut c_void,
    param_id: u32,
    value: f64,
    display: *mut c_char,
    size: u32,
) -> bool;
pub type ParamsTextToValueFn = unsafe extern "C" fn(
    handle: *mut c_void,
    param_id: u32,
    display: *const c_char,
    value: *mut f64,
) -> bool;
pub type ParamsFlushFn = unsafe extern "C" fn(
    handle: *mut c_void,
    in_events: *const clap_input_events,
    out_events: *const clap_output_events,
);

pub type StateSaveFn = unsafe extern "C" fn(handle: *mut c_void, stream: *const clap_ostream) -> bool;
pub type StateLoadFn = unsafe extern "C" fn(handle: *mut c_void, stream: *const clap_istream) -> bool;
pub type StateSaveContextFn =
    unsafe extern "C" fn(handle: *mut c_void, stream: *const clap_ostream, context: u32) -> bool;
pub type StateLoadContextFn =
    unsafe extern "C" fn(handle: *mut c_void, stream: *const clap_istream, context: u32) -> bool;

pub type OnTimerFn = unsafe extern "C" fn(handle: *mut c_void, timer_id: u32);
pub type PortCountFn = unsafe extern "C" fn(handle: *mut c_void, is_input: bool) -> u32;
pub type AudioPortsGetFn = unsafe extern "C" fn(
    handle: *mut c_void,
    index: u32,
    is_input: bool,
    info: *mut BridgeAudioPortInfo,
) -> bool;
pub type NotePortsGetFn = unsafe extern "C" fn(
    handle: *mut c_void,
    index: u32,
    is_input: bool,
    info: *mut BridgeNotePortInfo,
) -> bool;
pub type VoiceInfoGetFn =
    unsafe extern "C" fn(handle: *mut c_void, info: *mut BridgeVoiceInfo) -> bool;
pub type NoteNameGetFn =
    unsafe extern "C" fn(handle: *mut c_void, index: u32, name: *mut BridgeNoteName) -> bool;
pub type PortsActivationSetActiveFn = unsafe extern "C" fn(
    handle: *mut c_void,
    is_input: bool,
    port_index: u32,
    is_active: bool,
    sample_size: u32,
) -> bool;
pub type RenderSetFn = unsafe extern "C" fn(handle: *mut c_void, mode: i32) -> bool;
pub type SurroundMaskSupportedFn =
    unsafe extern "C" fn(handle: *mut c_void, channel_mask: u64) -> bool;
pub type SurroundChannelMapFn = unsafe extern "C" fn(
    handle: *mut c_void,
    is_input: bool,
    port_index: u32,
    channel_map: *mut u8,
    channel_map_capacity: u32,
) -> u32;
pub type AmbisonicConfigSupportedFn =
    unsafe extern "C" fn(handle: *mut c_void, ordering: u32, normalization: u32) -> bool;
pub type AmbisonicGetConfigFn = unsafe extern "C" fn(
    handle: *mut c_void,
    is_input: bool,
    port_index: u32,
    ordering: *mut u32,
    normalization: *mut u32,
) -> bool;
pub type PortsConfigGetFn =
    unsafe extern "C" fn(handle: *mut c_void, index: u32, config: *mut BridgeAudioPortsConfig) -> bool;
pub type PortsConfigSelectFn = unsafe extern "C" fn(handle: *mut c_void, config_id: u32) -> bool;
pub type PortsConfigInfoGetFn = unsafe extern "C" fn(
    handle: *mut c_void,
    config_id: u32,
    port_index: u32,
    is_input: bool,
    info: *mut BridgeAudioPortInfo,
) -> bool;
pub type RemoteControlsGetFn = unsafe extern "C" fn(
    handle: *mut c_void,
    index: u32,
    page: *mut BridgeRemoteControlsPage,
) -> bool;
pub type ParamIndicationMappingFn = unsafe extern "C" fn(
    handle: *mut c_void,
    param_id: u32,
    has_mapping: bool,
    color_argb: u32,
    label: *const c_char,
    description: *const c_char,
);
pub type ParamIndicationAutomationFn = unsafe extern "C" fn(
    handle: *mut c_void,
    param_id: u32,
    automation_state: u32,
    color_argb: u32,
);
pub type PresetLoadFn = unsafe extern "C" fn(
    handle: *mut c_void,
    location_kind: u32,
    location: *const c_char,
    load_key: *const c_char,
) -> bool;
pub type ContextMenuPopulateFn = unsafe extern "C" fn(
    handle: *mut c_void,
    target_kind: u32,
    target_id: u32,
    builder: *const c_void,
) -> bool;
pub type ContextMenuPerformFn = unsafe extern "C" fn(
    handle: *mut c_void,
    target_kind: u32,
    target_id: u32,
    action_id: u32,
) -> bool;

static RESOLVE_CALLS: AtomicUsize = AtomicUsize::new(0);
static RESOLUTION_SEALED: AtomicBool = AtomicBool::new(false);

/// Number of symbol lookups performed so far in this process.
pub fn resolve_call_count() -> usize {
    RESOLVE_CALLS.load(Ordering::Relaxed)
}

/// Marks entry initialization as finished. Debug builds assert that no
/// lookup happens afterwards.
pub(crate) fn seal_resolution() {
    RESOLUTION_SEALED.store(true, Ordering::Release);
}

pub(crate) fn unseal_resolution() {
    RESOLUTION_SEALED.store(false, Ordering::Release);
}

/// # Safety
///
/// `T` must match the actual signature of the exported symbol.
unsafe fn resolve<T: Copy>(library: &Library, name: &[u8]) -> Option<T> {
    debug_assert!(
        !RESOLUTION_SEALED.load(Ordering::Acquire),
        "symbol lookup after entry initialization"
    );
    RESOLVE_CALLS.fetch_add(1, Ordering::Relaxed);

    library.get::<T>(name).map(|symbol| *symbol).ok()
}

macro_rules! symbol_cache {
    ($( $field:ident : $ty:ty = $name:literal, )+) => {
        /// All managed exports of one shared object, resolved once at load
        /// time. `None` means the export is absent.
        #[derive(Default)]
        pub struct SymbolCache {
            $( pub $field: Option<$ty>, )+
        }

        impl SymbolCache {
            /// Resolves every standardized export name against the library.
            ///
            /// # Safety
            ///
            /// The library's exports must follow the gobridge ABI: any
            /// present symbol must have the documented signature.
            pub unsafe fn resolve(library: &Library) -> Self {
                Self {
                    $( $field: resolve::<$ty>(
                        library,
                        concat!("GoBridge_", $name, "\0").as_bytes(),
                    ), )+
                }
            }
        }
    };
}

symbol_cache! {
    create_plugin: CreatePluginFn = "CreatePlugin",
    plugin_init: PluginBoolFn = "PluginInit",
    plugin_destroy: PluginVoidFn = "PluginDestroy",
    plugin_activate: PluginActivateFn = "PluginActivate",
    plugin_deactivate: PluginVoidFn = "PluginDeactivate",
    plugin_start_processing: PluginBoolFn = "PluginStartProcessing",
    plugin_stop_processing: PluginVoidFn = "PluginStopProcessing",
    plugin_reset: PluginVoidFn = "PluginReset",
    plugin_on_main_thread: PluginVoidFn = "PluginOnMainThread",
    plugin_process: PluginProcessFn = "PluginProcess",
    params_count: PluginU32Fn = "PluginParamsCount",
    params_get_info: ParamsGetInfoFn = "PluginParamsGetInfo",
    params_get_value: ParamsGetValueFn = "PluginParamsGetValue",
    params_value_to_text: ParamsValueToTextFn = "PluginParamsValueToText",
    params_text_to_value: ParamsTextToValueFn = "PluginParamsTextToValue",
    params_flush: ParamsFlushFn = "PluginParamsFlush",
    state_save: StateSaveFn = "PluginStateSave",
    state_load: StateLoadFn = "PluginStateLoad",
    state_save_with_context: StateSaveContextFn = "PluginStateSaveWithContext",
    state_load_with_context: StateLoadContextFn = "PluginStateLoadWithContext",
    latency_get: PluginU32Fn = "PluginLatencyGet",
    tail_get: PluginU32Fn = "PluginTailGet",
    on_timer: OnTimerFn = "PluginOnTimer",
    note_name_count: PluginU32Fn = "PluginNoteNameCount",
    note_name_get: NoteNameGetFn = "PluginNoteNameGet",
    track_info_changed: PluginVoidFn = "PluginTrackInfoChanged",
    tuning_changed: PluginVoidFn = "PluginTuningChanged",
    audio_ports_count: PortCountFn = "PluginAudioPortsCount",
    audio_ports_get: AudioPortsGetFn = "PluginAudioPortsGet",
    note_ports_count: PortCountFn = "PluginNotePortsCount",
    note_ports_get: NotePortsGetFn = "PluginNotePortsGet",
    voice_info_get: VoiceInfoGetFn = "PluginVoiceInfoGet",
    ports_activation_can_activate: PluginBoolFn = "PluginAudioPortsActivationCanActivateWhileProcessing",
    ports_activation_set_active: PortsActivationSetActiveFn = "PluginAudioPortsActivationSetActive",
    render_has_hard_realtime: PluginBoolFn = "PluginRenderHasHardRealtimeRequirement",
    render_set: RenderSetFn = "PluginRenderSet",
    surround_mask_supported: SurroundMaskSupportedFn = "PluginSurroundIsChannelMaskSupported",
    surround_channel_map: SurroundChannelMapFn = "PluginSurroundGetChannelMap",
    ambisonic_config_supported: AmbisonicConfigSupportedFn = "PluginAmbisonicIsConfigSupported",
    ambisonic_get_config: AmbisonicGetConfigFn = "PluginAmbisonicGetConfig",
    ports_config_count: PluginU32Fn = "PluginAudioPortsConfigCount",
    ports_config_get: PortsConfigGetFn = "PluginAudioPortsConfigGet",
    ports_config_select: PortsConfigSelectFn = "PluginAudioPortsConfigSelect",
    ports_config_current: PluginU32Fn = "PluginAudioPortsConfigCurrent",
    ports_config_info_get: PortsConfigInfoGetFn = "PluginAudioPortsConfigInfoGet",
    remote_controls_count: PluginU32Fn = "PluginRemoteControlsCount",
    remote_controls_get: RemoteControlsGetFn = "PluginRemoteControlsGet",
    param_indication_set_mapping: ParamIndicationMappingFn = "PluginParamIndicationSetMapping",
    param_indication_set_automation: ParamIndicationAutomationFn = "PluginParamIndicationSetAutomation",
    preset_load_from_location: PresetLoadFn = "PluginPresetLoadFromLocation",
    context_menu_populate: ContextMenuPopulateFn = "PluginContextMenuPopulate",
    context_menu_perform: ContextMenuPerformFn = "PluginContextMenuPerform",
}

bitflags! {
    /// Which CLAP extensions an entry can serve, latched from non-null
    /// symbol lookups at load time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ExtensionSupport: u32 {
        const PARAMS = 1 << 0;
        const STATE = 1 << 1;
        const STATE_CONTEXT = 1 << 2;
        const AUDIO_PORTS = 1 << 3;
        const AUDIO_PORTS_CONFIG = 1 << 4;
        const AUDIO_PORTS_CONFIG_INFO = 1 << 5;
        const AUDIO_PORTS_ACTIVATION = 1 << 6;
        const NOTE_PORTS = 1 << 7;
        const NOTE_NAME = 1 << 8;
        const LATENCY = 1 << 9;
        const TAIL = 1 << 10;
        const RENDER = 1 << 11;
        const VOICE_INFO = 1 << 12;
        const SURROUND = 1 << 13;
        const AMBISONIC = 1 << 14;
        const TIMER = 1 << 15;
        const TRACK_INFO = 1 << 16;
        const TUNING = 1 << 17;
        const PRESET_LOAD = 1 << 18;
        const REMOTE_CONTROLS = 1 << 19;
        const PARAM_INDICATION = 1 << 20;
        const CONTEXT_MENU = 1 << 21;
    }
}

impl SymbolCache {
    /// Latches the extension support bitmap from the resolved symbols.
    pub fn support(&self) -> ExtensionSupport {
        let mut support = ExtensionSupport::empty();
        let mut latch = |flag, present: bool| {
            if present {
                support |= flag;
            }
        };

        latch(
            ExtensionSupport::PARAMS,
            self.params_count.is_some()
                && self.params_get_info.is_some()
                && self.params_get_value.is_some(),
        );
        latch(
            ExtensionSupport::STATE,
            self.state_save.is_some() && self.state_load.is_some(),
        );
        latch(
            ExtensionSupport::STATE_CONTEXT,
            self.state_save_with_context.is_some() && self.state_load_with_context.is_some(),
        );
        latch(
            ExtensionSupport::AUDIO_PORTS,
            self.audio_ports_count.is_some() && self.audio_ports_get.is_some(),
        );
        latch(
            ExtensionSupport::AUDIO_PORTS_CONFIG,
            self.ports_config_count.is_some()
                && self.ports_config_get.is_some()
                && self.ports_config_select.is_some(),
        );
        latch(
            ExtensionSupport::AUDIO_PORTS_CONFIG_INFO,
            self.ports_config_info_get.is_some(),
        );
        latch(
            ExtensionSupport::AUDIO_PORTS_ACTIVATION,
            self.ports_activation_set_active.is_some(),
        );
        latch(
            ExtensionSupport::NOTE_PORTS,
            self.note_ports_count.is_some() && self.note_ports_get.is_some(),
        );
        latch(
            ExtensionSupport::NOTE_NAME,
            self.note_name_count.is_some() && self.note_name_get.is_some(),
        );
        latch(ExtensionSupport::LATENCY, self.latency_get.is_some());
        latch(ExtensionSupport::TAIL, self.tail_get.is_some());
        latch(ExtensionSupport::RENDER, self.render_set.is_some());
        latch(ExtensionSupport::VOICE_INFO, self.voice_info_get.is_some());
        latch(
            ExtensionSupport::SURROUND,
            self.surround_channel_map.is_some(),
        );
        latch(
            ExtensionSupport::AMBISONIC,
            self.ambisonic_get_config.is_some(),
        );
        latch(ExtensionSupport::TIMER, self.on_timer.is_some());
        latch(
            ExtensionSupport::TRACK_INFO,
            self.track_info_changed.is_some(),
        );
        latch(ExtensionSupport::TUNING, self.tuning_changed.is_some());
        latch(
            ExtensionSupport::PRESET_LOAD,
            self.preset_load_from_location.is_some(),
        );
        latch(
            ExtensionSupport::REMOTE_CONTROLS,
            self.remote_controls_count.is_some() && self.remote_controls_get.is_some(),
        );
        latch(
            ExtensionSupport::PARAM_INDICATION,
            self.param_indication_set_mapping.is_some()
                || self.param_indication_set_automation.is_some(),
        );
        latch(
            ExtensionSupport::CONTEXT_MENU,
            self.context_menu_populate.is_some() || self.context_menu_perform.is_some(),
        );

        support
    }
}

#[cfg(test)]
mod tests {
    extern crate static_assertions as sa;
    use super::*;
    use clap_sys::ext::params::clap_param_info;

    // The bridge record is a field-for-field mirror of the CLAP struct.
    sa::assert_eq_size!(BridgeParamInfo, clap_param_info);

    #[test]
    fn empty_cache_supports_nothing() {
        let cache = SymbolCache::default();
        assert_eq!(cache.support(), ExtensionSupport::empty());
    }

    #[test]
    fn support_latches_per_extension() {
        unsafe extern "C" fn get(_: *mut c_void) -> u32 {
            42
        }

        let cache = SymbolCache {
            latency_get: Some(get),
            ..Default::default()
        };

        let support = cache.support();
        assert!(support.contains(ExtensionSupport::LATENCY));
        assert!(!support.contains(ExtensionSupport::TAIL));
        assert!(!support.contains(ExtensionSupport::PARAMS));
    }

    #[test]
    fn params_need_the_full_core_set() {
        unsafe extern "C" fn count(_: *mut c_void) -> u32 {
            0
        }

        let cache = SymbolCache {
            params_count: Some(count),
            ..Default::default()
        };
        assert!(!cache.support().contains(ExtensionSupport::PARAMS));
    }
}
