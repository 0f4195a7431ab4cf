//! The CLAP plugin factory vtable.
//!
//! Main-thread-only, per the CLAP spec. The factory serves whatever entries
//! survived manifest discovery and symbol resolution; unknown plugin ids
//! yield NULL rather than an error.

use crate::entry::with_entries;
use crate::instance;
use crate::util::fenced;
use clap_sys::factory::plugin_factory::clap_plugin_factory;
use clap_sys::host::clap_host;
use clap_sys::plugin::{clap_plugin, clap_plugin_descriptor};
use std::ffi::{c_char, CStr};

pub(crate) static PLUGIN_FACTORY: clap_plugin_factory = clap_plugin_factory {
    get_plugin_count: Some(get_plugin_count),
    get_plugin_descriptor: Some(get_plugin_descriptor),
    create_plugin: Some(create_plugin),
};

unsafe extern "C" fn get_plugin_count(_factory: *const clap_plugin_factory) -> u32 {
    fenced(0, || {
        with_entries(|entries| u32::try_from(entries.len()).unwrap_or(0)).unwrap_or(0)
    })
}

unsafe extern "C" fn get_plugin_descriptor(
    _factory: *const clap_plugin_factory,
    index: u32,
) -> *const clap_plugin_descriptor {
    fenced(std::ptr::null(), || {
        with_entries(|entries| {
            entries
                .get(index as usize)
                .map(|entry| entry.descriptor_raw())
                .unwrap_or(std::ptr::null())
        })
        .unwrap_or(std::ptr::null())
    })
}

unsafe extern "C" fn create_plugin(
    _factory: *const clap_plugin_factory,
    host: *const clap_host,
    plugin_id: *const c_char,
) -> *const clap_plugin {
    fenced(std::ptr::null(), || {
        if host.is_null() || plugin_id.is_null() {
            return std::ptr::null();
        }
        // SAFETY: the host passes a valid NUL-terminated plugin id.
        let plugin_id = unsafe { CStr::from_ptr(plugin_id) };

        let entry = with_entries(|entries| {
            entries
                .iter()
                .find(|entry| entry.id() == plugin_id)
                .cloned()
        });

        match entry {
            Some(Some(entry)) => instance::create(entry, host),
            _ => std::ptr::null(),
        }
    })
}
