//! Drives the exported `clap_entry` the way a host would.
//!
//! Without a real Go shared object to load, discovery-level behavior is
//! still fully observable: entries whose library cannot be resolved are
//! reported and omitted, and the factory keeps serving (an empty) plugin
//! list rather than failing the bundle.

use clap_sys::factory::plugin_factory::{clap_plugin_factory, CLAP_PLUGIN_FACTORY_ID};
use gobridge::clap_entry;
use std::ffi::CString;
use std::fs;

#[test]
fn init_survives_unloadable_manifests_and_refcounts() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("ghost.json"),
        r#"{
            "schemaVersion": "1.0",
            "plugin": {"id": "com.example.ghost", "name": "Ghost", "vendor": "V", "version": "1.0"},
            "build": {"goSharedLibrary": "libghost.so"}
        }"#,
    )
    .unwrap();
    fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

    let bundle_path = CString::new(dir.path().to_str().unwrap()).unwrap();

    // SAFETY: clap_entry's callbacks are the bundle's own entry points.
    unsafe {
        let init = clap_entry.init.unwrap();
        assert!(init(bundle_path.as_ptr()));
        // Reentrant init is reference-counted, not re-run.
        assert!(init(bundle_path.as_ptr()));

        let get_factory = clap_entry.get_factory.unwrap();
        assert!(get_factory(c"not.a.factory".as_ptr()).is_null());

        let factory = get_factory(CLAP_PLUGIN_FACTORY_ID.as_ptr());
        assert!(!factory.is_null());
        let factory = factory as *const clap_plugin_factory;

        // Both manifests were rejected (missing library, parse error), so
        // the factory serves zero plugins but stays functional.
        assert_eq!(((*factory).get_plugin_count.unwrap())(factory), 0);
        assert!(((*factory).get_plugin_descriptor.unwrap())(factory, 0).is_null());

        let deinit = clap_entry.deinit.unwrap();
        deinit();
        deinit();
    }
}
