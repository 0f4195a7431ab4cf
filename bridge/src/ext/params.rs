//! The params extension vtable.
//!
//! When the managed side exports the params surface, it is authoritative
//! for count, info and values. Plugins that only declare parameters in
//! their manifest are served from the native registry instead, including
//! format-aware text conversion, so hosts always see a working parameter
//! surface whenever the extension is advertised.

use crate::events::{InputEvents, ParamApplier};
use crate::instance::shim_from;
use crate::symbols::BridgeParamInfo;
use crate::util::{fenced, slice_from_external_parts_mut, write_to_array_buf, CBufWriter};
use clap_sys::events::{clap_input_events, clap_output_events};
use clap_sys::ext::params::{clap_param_info, clap_plugin_params};
use clap_sys::id::clap_id;
use clap_sys::plugin::clap_plugin;
use gobridge_params::{format, ParamId};
use std::ffi::{c_char, CStr};

pub(crate) static VTABLE: clap_plugin_params = clap_plugin_params {
    count: Some(count),
    get_info: Some(get_info),
    get_value: Some(get_value),
    value_to_text: Some(value_to_text),
    text_to_value: Some(text_to_value),
    flush: Some(flush),
};

unsafe extern "C" fn count(plugin: *const clap_plugin) -> u32 {
    fenced(0, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else { return 0 };

        if let Some(count_fn) = shim.entry.symbols.params_count {
            // SAFETY: cached export; handle is live.
            return unsafe { count_fn(shim.handle) };
        }
        u32::try_from(shim.registry.count()).unwrap_or(0)
    })
}

unsafe extern "C" fn get_info(
    plugin: *const clap_plugin,
    param_index: u32,
    param_info: *mut clap_param_info,
) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        if param_info.is_null() {
            return false;
        }
        // SAFETY: the host passes a writable, possibly uninitialized struct.
        let out = unsafe { &mut *param_info };

        if let Some(get_info_fn) = shim.entry.symbols.params_get_info {
            let mut info = BridgeParamInfo::default();
            // SAFETY: cached export; info is a valid out-struct.
            if !unsafe { get_info_fn(shim.handle, param_index, &mut info) } {
                return false;
            }

            out.id = info.id;
            out.flags = info.flags;
            out.cookie = info.cookie;
            out.min_value = info.min_value;
            out.max_value = info.max_value;
            out.default_value = info.default_value;
            out.name = info.name;
            out.module = info.module;
            // The managed side fills fixed arrays; make the truncation
            // guarantee hold even if it filled every byte.
            out.name[out.name.len() - 1] = 0;
            out.module[out.module.len() - 1] = 0;
            return true;
        }

        let Some(info) = shim.registry.info_by_index(param_index as usize) else {
            return false;
        };

        out.id = info.id.get();
        out.flags = info.flags.to_clap();
        out.cookie = std::ptr::null_mut();
        out.min_value = info.min;
        out.max_value = info.max;
        out.default_value = info.default;
        // SAFETY: out points at valid fixed-size arrays.
        unsafe { write_to_array_buf(&mut out.name, info.name.as_bytes()) };
        // SAFETY: as above.
        unsafe { write_to_array_buf(&mut out.module, info.module.as_bytes()) };
        true
    })
}

unsafe extern "C" fn get_value(
    plugin: *const clap_plugin,
    param_id: clap_id,
    out_value: *mut f64,
) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        if out_value.is_null() {
            return false;
        }

        if let Some(get_value_fn) = shim.entry.symbols.params_get_value {
            // SAFETY: cached export; out_value is a valid out-pointer.
            return unsafe { get_value_fn(shim.handle, param_id, out_value) };
        }

        match shim.registry.get(ParamId::new(param_id)) {
            Some(value) => {
                // SAFETY: null-checked above.
                unsafe { *out_value = value };
                true
            }
            None => false,
        }
    })
}

unsafe extern "C" fn value_to_text(
    plugin: *const clap_plugin,
    param_id: clap_id,
    value: f64,
    out_buffer: *mut c_char,
    out_buffer_capacity: u32,
) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        if out_buffer.is_null() || out_buffer_capacity == 0 {
            return false;
        }

        if let Some(value_to_text_fn) = shim.entry.symbols.params_value_to_text {
            // SAFETY: cached export; the buffer is host-provided.
            return unsafe { value_to_text_fn(shim.handle, param_id, value, out_buffer, out_buffer_capacity) };
        }

        let Some(info) = shim.registry.info(ParamId::new(param_id)) else {
            return false;
        };

        // SAFETY: the host provides a writable buffer of the given capacity.
        let buffer = unsafe {
            slice_from_external_parts_mut(out_buffer.cast::<u8>(), out_buffer_capacity as usize)
        };
        let mut writer = CBufWriter::new(buffer);
        if format::write_value(&info, value, &mut writer).is_err() {
            return false;
        }
        writer.finish()
    })
}

unsafe extern "C" fn text_to_value(
    plugin: *const clap_plugin,
    param_id: clap_id,
    param_value_text: *const c_char,
    out_value: *mut f64,
) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        if param_value_text.is_null() || out_value.is_null() {
            return false;
        }

        if let Some(text_to_value_fn) = shim.entry.symbols.params_text_to_value {
            // SAFETY: cached export; pointers are host-provided.
            return unsafe { text_to_value_fn(shim.handle, param_id, param_value_text, out_value) };
        }

        let Some(info) = shim.registry.info(ParamId::new(param_id)) else {
            return false;
        };
        // SAFETY: the host passes a NUL-terminated string.
        let Ok(text) = (unsafe { CStr::from_ptr(param_value_text) }).to_str() else {
            return false;
        };

        match format::text_to_value(&info, text) {
            Some(value) => {
                // SAFETY: null-checked above.
                unsafe { *out_value = value };
                true
            }
            None => false,
        }
    })
}

unsafe extern "C" fn flush(
    plugin: *const clap_plugin,
    in_events: *const clap_input_events,
    out_events: *const clap_output_events,
) {
    fenced((), || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else { return };

        // Same path as process, minus the audio: keep the registry and any
        // bound slots in step with the host's parameter events.
        // SAFETY: the host's event list stays valid for this call.
        if let Some(events) = unsafe { InputEvents::from_raw(in_events) } {
            let mut applier = ParamApplier::new(&shim.registry);
            events.dispatch(&mut applier);
        }

        if let Some(flush_fn) = shim.entry.symbols.params_flush {
            // SAFETY: cached export; queues are host-provided.
            unsafe { flush_fn(shim.handle, in_events, out_events) };
        }
    })
}
