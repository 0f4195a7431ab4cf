use clap_sys::plugin::clap_plugin_descriptor;
use clap_sys::version::CLAP_VERSION;
use gobridge_manifest::Manifest;
use std::ffi::{c_char, CStr, CString};

/// A CLAP plugin descriptor synthesized from a manifest.
///
/// The descriptor's strings are copied into an arena of `CString`s owned by
/// this struct, and the raw descriptor points into that arena. The heap
/// allocations behind `CString` and `Vec` are address-stable, so the struct
/// can be moved freely; the raw descriptor pointer itself must only be taken
/// once the owning entry has its final address.
pub(crate) struct PluginDescriptor {
    id: CString,
    _strings: Vec<CString>,
    _feature_ptrs: Vec<*const c_char>,
    raw: clap_plugin_descriptor,
}

// SAFETY: immutable after construction; all pointers target owned,
// address-stable allocations.
unsafe impl Send for PluginDescriptor {}
// SAFETY: as above.
unsafe impl Sync for PluginDescriptor {}

fn arena_string(value: &str) -> CString {
    CString::new(value.replace('\0', "")).unwrap_or_default()
}

impl PluginDescriptor {
    pub(crate) fn from_manifest(manifest: &Manifest) -> Self {
        let plugin = &manifest.plugin;

        let id = arena_string(&plugin.id);
        let strings: Vec<CString> = [
            &plugin.name,
            &plugin.vendor,
            &plugin.url,
            &plugin.manual_url,
            &plugin.support_url,
            &plugin.version,
            &plugin.description,
        ]
        .into_iter()
        .map(|s| arena_string(s))
        .collect();

        let features: Vec<CString> = plugin.features.iter().map(|s| arena_string(s)).collect();
        let mut feature_ptrs: Vec<*const c_char> =
            features.iter().map(|s| s.as_ptr()).collect();
        feature_ptrs.push(std::ptr::null());

        let raw = clap_plugin_descriptor {
            clap_version: CLAP_VERSION,
            id: id.as_ptr(),
            name: strings[0].as_ptr(),
            vendor: strings[1].as_ptr(),
            url: strings[2].as_ptr(),
            manual_url: strings[3].as_ptr(),
            support_url: strings[4].as_ptr(),
            version: strings[5].as_ptr(),
            description: strings[6].as_ptr(),
            features: feature_ptrs.as_ptr(),
        };

        let mut all_strings = strings;
        all_strings.extend(features);

        Self {
            id,
            _strings: all_strings,
            _feature_ptrs: feature_ptrs,
            raw,
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> &CStr {
        &self.id
    }

    #[inline]
    pub(crate) fn as_raw(&self) -> *const clap_plugin_descriptor {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> Manifest {
        Manifest::from_json(
            r#"{
                "schemaVersion": "1.0",
                "plugin": {
                    "id": "com.example.gain",
                    "name": "Example Gain",
                    "vendor": "Example Audio",
                    "version": "1.2.0",
                    "description": "Gain",
                    "features": ["audio-effect", "stereo"]
                },
                "build": {"goSharedLibrary": "libgain.so"}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn descriptor_copies_identity_strings() {
        let descriptor = PluginDescriptor::from_manifest(&manifest());
        // SAFETY: as_raw points into the live descriptor.
        let raw = unsafe { &*descriptor.as_raw() };

        // SAFETY: descriptor strings are NUL-terminated arena copies.
        unsafe {
            assert_eq!(CStr::from_ptr(raw.id).to_str(), Ok("com.example.gain"));
            assert_eq!(CStr::from_ptr(raw.name).to_str(), Ok("Example Gain"));
            assert_eq!(CStr::from_ptr(raw.vendor).to_str(), Ok("Example Audio"));
            assert_eq!(CStr::from_ptr(raw.version).to_str(), Ok("1.2.0"));
        }
    }

    #[test]
    fn features_array_is_null_terminated() {
        let descriptor = PluginDescriptor::from_manifest(&manifest());
        // SAFETY: as_raw points into the live descriptor.
        let raw = unsafe { &*descriptor.as_raw() };

        let mut features = Vec::new();
        let mut cursor = raw.features;
        // SAFETY: the features array ends with a null pointer.
        unsafe {
            while !(*cursor).is_null() {
                features.push(CStr::from_ptr(*cursor).to_str().unwrap().to_string());
                cursor = cursor.add(1);
            }
        }
        assert_eq!(features, ["audio-effect", "stereo"]);
    }

    #[test]
    fn descriptor_survives_moves() {
        let descriptor = PluginDescriptor::from_manifest(&manifest());
        let moved = Box::new(descriptor);
        // SAFETY: as_raw points into the boxed descriptor.
        let raw = unsafe { &*moved.as_raw() };
        // SAFETY: id points into the arena owned by `moved`.
        assert_eq!(unsafe { CStr::from_ptr(raw.id) }, moved.id());
    }
}
