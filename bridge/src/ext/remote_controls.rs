use crate::instance::shim_from;
use crate::symbols::BridgeRemoteControlsPage;
use crate::util::fenced;
use clap_sys::ext::remote_controls::{clap_plugin_remote_controls, clap_remote_controls_page};
use clap_sys::id::CLAP_INVALID_ID;
use clap_sys::plugin::clap_plugin;

pub(crate) static VTABLE: clap_plugin_remote_controls = clap_plugin_remote_controls {
    count: Some(count),
    get: Some(get),
};

unsafe extern "C" fn count(plugin: *const clap_plugin) -> u32 {
    fenced(0, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else { return 0 };
        let Some(count_fn) = shim.entry.symbols.remote_controls_count else {
            return 0;
        };
        // SAFETY: cached export; handle is live.
        unsafe { count_fn(shim.handle) }
    })
}

unsafe extern "C" fn get(
    plugin: *const clap_plugin,
    page_index: u32,
    page: *mut clap_remote_controls_page,
) -> bool {
    fenced(false, || {
        // SAFETY: the host calls this dispatcher with the pointer it owns.
        let Some(shim) = (unsafe { shim_from(plugin) }) else {
            return false;
        };
        if page.is_null() {
            return false;
        }
        let Some(get_fn) = shim.entry.symbols.remote_controls_get else {
            return false;
        };

        let mut bridge_page = BridgeRemoteControlsPage::default();
        // SAFETY: cached export; bridge_page is a valid out-struct.
        if !unsafe { get_fn(shim.handle, page_index, &mut bridge_page) } {
            return false;
        }

        // SAFETY: the host passes a writable page struct.
        let out = unsafe { &mut *page };
        out.section_name = bridge_page.section_name;
        out.section_name[out.section_name.len() - 1] = 0;
        out.page_id = bridge_page.page_id;
        out.page_name = bridge_page.page_name;
        out.page_name[out.page_name.len() - 1] = 0;
        out.is_for_preset = bridge_page.is_for_preset;

        // The page's id slots are fixed on both sides; unused entries stay
        // CLAP_INVALID_ID.
        for slot in out.param_ids.iter_mut() {
            *slot = CLAP_INVALID_ID;
        }
        for (dst, src) in out.param_ids.iter_mut().zip(bridge_page.param_ids.iter()) {
            *dst = *src;
        }
        true
    })
}
