//! The bundle's CLAP entry point and its process-global state.
//!
//! `init` runs once per process (the host may call it reentrantly; calls
//! are reference-counted like any well-behaved entry): it scans for
//! manifests, loads each Go shared object exactly once, resolves the whole
//! symbol cache per entry, and synthesizes the CLAP descriptors. Entries
//! that fail to load are reported and omitted; the factory keeps serving
//! the rest. Everything built here is read-only until `deinit` drops it.

use crate::descriptor::PluginDescriptor;
use crate::factory::PLUGIN_FACTORY;
use crate::symbols::{self, ExtensionSupport, SymbolCache};
use crate::util::fenced;
use clap_sys::entry::clap_plugin_entry;
use clap_sys::factory::plugin_factory::CLAP_PLUGIN_FACTORY_ID;
use clap_sys::plugin::clap_plugin_descriptor;
use clap_sys::version::CLAP_VERSION;
use gobridge_manifest::{discover, Discovered, Manifest, ManifestError};
use libloading::Library;
use std::ffi::{c_char, c_void, CStr};
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One loadable plugin: its manifest, its resident shared object, the
/// resolved symbol cache and the synthesized CLAP descriptor.
pub(crate) struct PluginEntry {
    manifest: Manifest,
    directory: PathBuf,
    /// Keeps the shared object resident for the entry's lifetime.
    _library: Library,
    pub(crate) symbols: SymbolCache,
    pub(crate) support: ExtensionSupport,
    descriptor: PluginDescriptor,
}

// SAFETY: read-only after construction; the library stays loaded and the
// symbol cache holds plain function pointers.
unsafe impl Send for PluginEntry {}
// SAFETY: as above.
unsafe impl Sync for PluginEntry {}

impl PluginEntry {
    fn load(discovered: &Discovered) -> Result<Self, EntryLoadError> {
        let manifest = discovered.manifest.clone();
        let library_path = manifest
            .resolve_library(&discovered.directory)
            .map_err(EntryLoadError::Manifest)?;

        // SAFETY: loading the declared shared object is the entire point of
        // the bridge; the manifest vouches for it being a gobridge plugin.
        let library =
            unsafe { Library::new(&library_path) }.map_err(EntryLoadError::Library)?;
        // SAFETY: present symbols follow the gobridge export ABI.
        let symbols = unsafe { SymbolCache::resolve(&library) };

        if symbols.create_plugin.is_none() {
            return Err(EntryLoadError::SymbolMissing("GoBridge_CreatePlugin"));
        }

        let mut support = symbols.support();
        // Manifest-declared parameters are served by the native registry
        // even when the managed side exports no params surface, and the
        // registry alone is enough to persist them.
        if !manifest.parameters.is_empty() {
            support |= ExtensionSupport::PARAMS | ExtensionSupport::STATE;
        }

        let descriptor = PluginDescriptor::from_manifest(&manifest);

        Ok(Self {
            directory: discovered.directory.clone(),
            manifest,
            _library: library,
            symbols,
            support,
            descriptor,
        })
    }

    #[inline]
    pub(crate) fn id(&self) -> &CStr {
        self.descriptor.id()
    }

    #[inline]
    pub(crate) fn descriptor_raw(&self) -> *const clap_plugin_descriptor {
        self.descriptor.as_raw()
    }

    #[inline]
    pub(crate) fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    #[allow(dead_code)]
    pub(crate) fn directory(&self) -> &Path {
        &self.directory
    }
}

#[derive(Debug)]
enum EntryLoadError {
    Manifest(ManifestError),
    Library(libloading::Error),
    SymbolMissing(&'static str),
}

impl Display for EntryLoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manifest(e) => write!(f, "{e}"),
            Self::Library(e) => write!(f, "failed to load shared object: {e}"),
            Self::SymbolMissing(name) => write!(f, "required export {name} is missing"),
        }
    }
}

struct EntryState {
    reference_count: usize,
    entries: Vec<Arc<PluginEntry>>,
}

static STATE: Mutex<Option<EntryState>> = Mutex::new(None);

/// Runs `f` against the loaded entries, or returns `None` before init /
/// after deinit (or if a previous init panicked and poisoned the state).
pub(crate) fn with_entries<R>(f: impl FnOnce(&[Arc<PluginEntry>]) -> R) -> Option<R> {
    let state = STATE.lock().ok()?;
    state.as_ref().map(|state| f(&state.entries))
}

unsafe extern "C" fn entry_init(plugin_path: *const c_char) -> bool {
    fenced(false, || {
        let Ok(mut state) = STATE.lock() else {
            // A poisoned lock means a previous init panicked; the entry is
            // unusable.
            return false;
        };

        if let Some(state) = state.as_mut() {
            state.reference_count += 1;
            return true;
        }

        let bundle_dir = bundle_directory(plugin_path);
        let discovery = discover(&bundle_dir);

        for (path, error) in discovery.rejected.iter().chain(&discovery.duplicates) {
            eprintln!("gobridge: skipping manifest {}: {error}", path.display());
        }

        let mut entries = Vec::with_capacity(discovery.entries.len());
        for discovered in &discovery.entries {
            match PluginEntry::load(discovered) {
                Ok(entry) => entries.push(Arc::new(entry)),
                Err(error) => eprintln!(
                    "gobridge: skipping plugin {:?}: {error}",
                    discovered.manifest.plugin.id
                ),
            }
        }

        // Every dlsym this process will ever need has happened by now.
        symbols::seal_resolution();

        *state = Some(EntryState {
            reference_count: 1,
            entries,
        });
        true
    })
}

unsafe extern "C" fn entry_deinit() {
    fenced((), || {
        let Ok(mut state) = STATE.lock() else { return };

        match state.as_mut() {
            Some(inner) if inner.reference_count > 1 => inner.reference_count -= 1,
            Some(_) => {
                *state = None;
                symbols::unseal_resolution();
            }
            None => {}
        }
    })
}

unsafe extern "C" fn entry_get_factory(identifier: *const c_char) -> *const c_void {
    fenced(std::ptr::null(), || {
        if identifier.is_null() {
            return std::ptr::null();
        }
        // SAFETY: the host passes a valid NUL-terminated identifier.
        let identifier = unsafe { CStr::from_ptr(identifier) };

        if identifier == CLAP_PLUGIN_FACTORY_ID {
            (&PLUGIN_FACTORY as *const clap_sys::factory::plugin_factory::clap_plugin_factory)
                .cast()
        } else {
            std::ptr::null()
        }
    })
}

fn bundle_directory(plugin_path: *const c_char) -> PathBuf {
    if plugin_path.is_null() {
        return PathBuf::from(".");
    }

    // SAFETY: the host passes the NUL-terminated path of this bundle.
    let path = PathBuf::from(unsafe { CStr::from_ptr(plugin_path) }.to_string_lossy().into_owned());
    if path.is_file() {
        path.parent().map(Path::to_path_buf).unwrap_or(path)
    } else {
        path
    }
}

/// The standard CLAP entry symbol for this bundle.
#[allow(non_upper_case_globals)]
#[no_mangle]
pub static clap_entry: clap_plugin_entry = clap_plugin_entry {
    clap_version: CLAP_VERSION,
    init: Some(entry_init),
    deinit: Some(entry_deinit),
    get_factory: Some(entry_get_factory),
};
