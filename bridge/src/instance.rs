//! The per-instance control block and the core plugin vtable.
//!
//! `create_plugin` boxes an [`InstanceShim`] holding the opaque managed
//! handle, the owning entry, the support bitmap and the parameter registry,
//! and stores it in `clap_plugin.plugin_data`. Every vtable slot recovers
//! the shim, checks the lifecycle, and forwards to the cached managed
//! export.
//!
//! Lifecycle transitions are main-thread and never concurrent with
//! `process`, `start_processing` or `stop_processing` per the CLAP thread
//! contract; that contract is what makes handing out `&mut InstanceShim`
//! from a single raw pointer sound here.

use crate::audio::AudioPorts;
use crate::entry::PluginEntry;
use crate::events::{InputEvents, ParamApplier};
use crate::ext;
use crate::host::HostHandle;
use crate::symbols::ExtensionSupport;
use crate::util::fenced;
use clap_sys::ext::render::CLAP_RENDER_REALTIME;
use clap_sys::host::clap_host;
use clap_sys::plugin::clap_plugin;
use clap_sys::process::{
    clap_process, clap_process_status, CLAP_PROCESS_CONTINUE, CLAP_PROCESS_ERROR,
};
use gobridge_params::{ParamFlags, ParamInfo, ParamRegistry};
use std::ffi::{c_char, c_void, CStr};
use std::sync::Arc;

/// Where an instance is in its CLAP lifecycle.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Lifecycle {
    Created,
    Initialized,
    Activated,
    Processing,
}

impl Lifecycle {
    fn after_init(self) -> Option<Self> {
        (self == Self::Created).then_some(Self::Initialized)
    }

    fn after_activate(self) -> Option<Self> {
        (self == Self::Initialized).then_some(Self::Activated)
    }

    fn after_deactivate(self) -> Option<Self> {
        (self == Self::Activated).then_some(Self::Initialized)
    }

    fn after_start_processing(self) -> Option<Self> {
        (self == Self::Activated).then_some(Self::Processing)
    }

    fn after_stop_processing(self) -> Option<Self> {
        (self == Self::Processing).then_some(Self::Activated)
    }

    fn can_process(self) -> bool {
        self == Self::Processing
    }
}

/// The sample configuration latched at activation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct Activation {
    pub sample_rate: f64,
    pub min_frames: u32,
    pub max_frames: u32,
}

/// The native control block of one plugin instance.
///
/// Lives exactly as long as the host holds the CLAP plugin pointer; the
/// managed handle is released on destroy only.
pub(crate) struct InstanceShim {
    /// Opaque handle owning the managed plugin object.
    pub(crate) handle: *mut c_void,
    pub(crate) entry: Arc<PluginEntry>,
    pub(crate) support: ExtensionSupport,
    pub(crate) host: HostHandle,
    pub(crate) registry: Arc<ParamRegistry>,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) activation: Option<Activation>,
    pub(crate) render_mode: i32,
}

/// Builds a new instance for the host. Returns NULL if the managed create
/// export refuses.
pub(crate) fn create(entry: Arc<PluginEntry>, host: *const clap_host) -> *const clap_plugin {
    let Some(create_plugin) = entry.symbols.create_plugin else {
        return std::ptr::null();
    };
    // SAFETY: the factory already null-checked the host pointer.
    let Some(host_handle) = (unsafe { HostHandle::new(host) }) else {
        return std::ptr::null();
    };

    // SAFETY: cached export with the documented signature; id is the
    // entry's NUL-terminated plugin id.
    let handle = unsafe { create_plugin(host, entry.id().as_ptr()) };
    if handle.is_null() {
        return std::ptr::null();
    }

    let registry = Arc::new(ParamRegistry::new());
    for decl in &entry.manifest().parameters {
        let mut flags = ParamFlags::from_names(&decl.flags);
        if flags.is_empty() {
            flags = ParamFlags::default();
        }
        let info = ParamInfo::new(
            decl.id,
            decl.name.clone(),
            decl.min_value,
            decl.max_value,
            decl.default_value,
        )
        .with_flags(flags);
        // Duplicates were rejected at manifest validation.
        let _ = registry.register(info);
    }

    let shim = Box::new(InstanceShim {
        handle,
        support: entry.support,
        entry,
        host: host_handle,
        registry,
        lifecycle: Lifecycle::Created,
        activation: None,
        render_mode: CLAP_RENDER_REALTIME,
    });

    let plugin = Box::new(clap_plugin {
        desc: shim.entry.descriptor_raw(),
        plugin_data: Box::into_raw(shim).cast(),
        init: Some(init),
        destroy: Some(destroy),
        activate: Some(activate),
        deactivate: Some(deactivate),
        start_processing: Some(start_processing),
        stop_processing: Some(stop_processing),
        reset: Some(reset),
        process: Some(process),
        get_extension: Some(get_extension),
        on_main_thread: Some(on_main_thread),
    });

    Box::into_raw(plugin)
}

/// Recovers the control block from a vtable's plugin pointer.
///
/// # Safety
///
/// `plugin` must be a pointer previously returned by [`create`] and not yet
/// destroyed. Exclusivity of the returned reference rests on the CLAP
/// thread contract: lifecycle calls are serialized by the host.
pub(crate) unsafe fn shim_from<'a>(plugin: *const clap_plugin) -> Option<&'a mut InstanceShim> {
    let plugin = plugin.as_ref()?;
    (plugin.plugin_data as *mut InstanceShim).as_mut()
}

unsafe extern "C" fn init(plugin: *const clap_plugin) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        let Some(next) = shim.lifecycle.after_init() else {
            return false;
        };

        // Earliest point the CLAP contract allows host extension queries.
        shim.host.resolve_extensions();
        shim.host.debug_assert_main_thread();

        if let Some(init_fn) = shim.entry.symbols.plugin_init {
            // SAFETY: cached export; handle is live.
            if !unsafe { init_fn(shim.handle) } {
                return false;
            }
        }

        shim.lifecycle = next;
        true
    })
}

unsafe extern "C" fn destroy(plugin: *const clap_plugin) {
    fenced((), || {
        if plugin.is_null() {
            return;
        }
        // SAFETY: the pointer was created by Box::into_raw in create() and
        // the host promises not to use it after destroy.
        let plugin = unsafe { Box::from_raw(plugin as *mut clap_plugin) };
        if plugin.plugin_data.is_null() {
            return;
        }
        // SAFETY: as above, for the control block.
        let shim = unsafe { Box::from_raw(plugin.plugin_data as *mut InstanceShim) };

        if let Some(destroy_fn) = shim.entry.symbols.plugin_destroy {
            // SAFETY: cached export; this is the handle's final use.
            unsafe { destroy_fn(shim.handle) };
        }
    })
}

unsafe extern "C" fn activate(
    plugin: *const clap_plugin,
    sample_rate: f64,
    min_frames: u32,
    max_frames: u32,
) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        shim.host.debug_assert_main_thread();
        let Some(next) = shim.lifecycle.after_activate() else {
            return false;
        };

        if let Some(activate_fn) = shim.entry.symbols.plugin_activate {
            // SAFETY: cached export; handle is live.
            if !unsafe { activate_fn(shim.handle, sample_rate, min_frames, max_frames) } {
                return false;
            }
        }

        shim.activation = Some(Activation {
            sample_rate,
            min_frames,
            max_frames,
        });
        shim.lifecycle = next;
        true
    })
}

unsafe extern "C" fn deactivate(plugin: *const clap_plugin) {
    fenced((), || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else { return };
        shim.host.debug_assert_main_thread();
        let Some(next) = shim.lifecycle.after_deactivate() else {
            return;
        };

        if let Some(deactivate_fn) = shim.entry.symbols.plugin_deactivate {
            // SAFETY: cached export; handle is live.
            unsafe { deactivate_fn(shim.handle) };
        }

        shim.activation = None;
        shim.lifecycle = next;
    })
}

unsafe extern "C" fn start_processing(plugin: *const clap_plugin) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        let Some(next) = shim.lifecycle.after_start_processing() else {
            return false;
        };

        if let Some(start_fn) = shim.entry.symbols.plugin_start_processing {
            // SAFETY: cached export; handle is live.
            if !unsafe { start_fn(shim.handle) } {
                return false;
            }
        }

        shim.lifecycle = next;
        true
    })
}

unsafe extern "C" fn stop_processing(plugin: *const clap_plugin) {
    fenced((), || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else { return };
        let Some(next) = shim.lifecycle.after_stop_processing() else {
            return;
        };

        if let Some(stop_fn) = shim.entry.symbols.plugin_stop_processing {
            // SAFETY: cached export; handle is live.
            unsafe { stop_fn(shim.handle) };
        }

        shim.lifecycle = next;
    })
}

unsafe extern "C" fn reset(plugin: *const clap_plugin) {
    fenced((), || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else { return };
        if let Some(reset_fn) = shim.entry.symbols.plugin_reset {
            // SAFETY: cached export; handle is live.
            unsafe { reset_fn(shim.handle) };
        }
    })
}

unsafe extern "C" fn process(
    plugin: *const clap_plugin,
    process: *const clap_process,
) -> clap_process_status {
    fenced(CLAP_PROCESS_ERROR, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return CLAP_PROCESS_ERROR;
        };
        shim.host.debug_assert_audio_thread();
        if !shim.lifecycle.can_process() {
            return CLAP_PROCESS_ERROR;
        }
        // SAFETY: the host passes a valid process struct for this call.
        let Some(process) = (unsafe { process.as_ref() }) else {
            return CLAP_PROCESS_ERROR;
        };
        if let Some(activation) = shim.activation {
            debug_assert!(
                process.frames_count <= activation.max_frames,
                "block exceeds the activated maximum frame count"
            );
        }

        // Run the input queue through the registry first, so parameter
        // slots and bound atomics reflect this block's events regardless of
        // how the managed side consumes the queue.
        // SAFETY: the host's event list stays valid for this call.
        if let Some(events) = unsafe { InputEvents::from_raw(process.in_events) } {
            let mut applier = ParamApplier::new(&shim.registry);
            events.dispatch(&mut applier);
        }

        let Some(process_fn) = shim.entry.symbols.plugin_process else {
            // No managed audio path: hand the host silence.
            // SAFETY: the process struct is valid for this call.
            let mut ports = unsafe { AudioPorts::from_process(process) };
            ports.silence_outputs();
            return CLAP_PROCESS_CONTINUE;
        };

        // SAFETY: cached export; all pointers come straight from the host's
        // process struct and stay valid for the duration of this call.
        let status = unsafe {
            process_fn(
                shim.handle,
                process.steady_time,
                process.frames_count,
                process.audio_inputs,
                process.audio_inputs_count,
                process.audio_outputs,
                process.audio_outputs_count,
                process.in_events,
                process.out_events,
            )
        };

        if status == CLAP_PROCESS_ERROR {
            // The host may keep playing these buffers; never leave garbage.
            // SAFETY: the process struct is valid for this call.
            let mut ports = unsafe { AudioPorts::from_process(process) };
            ports.silence_outputs();
        }

        status
    })
}

unsafe extern "C" fn get_extension(
    plugin: *const clap_plugin,
    identifier: *const c_char,
) -> *const c_void {
    fenced(std::ptr::null(), || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return std::ptr::null();
        };
        if identifier.is_null() {
            return std::ptr::null();
        }
        // SAFETY: the host passes a valid NUL-terminated extension id.
        let identifier = unsafe { CStr::from_ptr(identifier) };

        ext::lookup(shim.support, identifier)
    })
}

unsafe extern "C" fn on_main_thread(plugin: *const clap_plugin) {
    fenced((), || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else { return };
        if let Some(callback) = shim.entry.symbols.plugin_on_main_thread {
            // SAFETY: cached export; handle is live.
            unsafe { callback(shim.handle) };
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_follows_the_clap_state_machine() {
        let created = Lifecycle::Created;
        let initialized = created.after_init().unwrap();
        let activated = initialized.after_activate().unwrap();
        let processing = activated.after_start_processing().unwrap();

        assert_eq!(initialized, Lifecycle::Initialized);
        assert_eq!(activated, Lifecycle::Activated);
        assert_eq!(processing, Lifecycle::Processing);
        assert!(processing.can_process());

        assert_eq!(
            processing.after_stop_processing().unwrap(),
            Lifecycle::Activated
        );
        assert_eq!(
            activated.after_deactivate().unwrap(),
            Lifecycle::Initialized
        );
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        assert!(Lifecycle::Created.after_activate().is_none());
        assert!(Lifecycle::Initialized.after_init().is_none());
        assert!(Lifecycle::Initialized.after_start_processing().is_none());
        assert!(Lifecycle::Activated.after_stop_processing().is_none());
        assert!(Lifecycle::Processing.after_deactivate().is_none());
        assert!(!Lifecycle::Activated.can_process());
    }
}
