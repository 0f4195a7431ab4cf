use crate::{Manifest, ManifestError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Environment variable holding extra manifest search directories, separated
/// like `PATH`.
pub const MANIFEST_PATH_ENV: &str = "GOBRIDGE_MANIFEST_PATH";

/// One successfully discovered manifest, together with where it was found.
#[derive(Debug, Clone)]
pub struct Discovered {
    /// The manifest file itself.
    pub path: PathBuf,
    /// The directory the manifest was found in; shared object paths resolve
    /// against this.
    pub directory: PathBuf,
    pub manifest: Manifest,
}

/// The outcome of a discovery scan.
///
/// Discovery never fails as a whole: unreadable directories are skipped,
/// invalid manifests and duplicate ids are collected into `rejected` and
/// `duplicates` so the runtime can report them through the host log once one
/// exists.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Valid entries, in discovery order. Ids are unique.
    pub entries: Vec<Discovered>,
    /// Manifests that failed to parse or validate.
    pub rejected: Vec<(PathBuf, ManifestError)>,
    /// Manifests that lost a duplicate-id race; first discovery wins.
    pub duplicates: Vec<(PathBuf, ManifestError)>,
}

/// Returns the standard manifest search directories for a bundle installed
/// at `bundle_dir`, in priority order.
///
/// The bundle's own directory always comes first, followed by any directories
/// named by [`MANIFEST_PATH_ENV`], the per-user manifests directory, and
/// finally the system-wide locations.
pub fn standard_search_paths(bundle_dir: &Path) -> Vec<PathBuf> {
    let mut paths = vec![bundle_dir.to_path_buf()];

    if let Some(env_var) = std::env::var_os(MANIFEST_PATH_ENV) {
        paths.extend(std::env::split_paths(&env_var));
    }

    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".gobridge/manifests"));
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(val) = std::env::var_os("CommonProgramFiles") {
            paths.push(PathBuf::from(val).join("GoBridge\\manifests"));
        }
    }

    #[cfg(target_os = "macos")]
    {
        paths.push(PathBuf::from("/Library/Audio/Plug-Ins/GoBridge/manifests"));
    }

    #[cfg(all(target_family = "unix", not(target_os = "macos")))]
    {
        paths.push("/usr/lib/gobridge/manifests".into());
        paths.push("/usr/local/lib/gobridge/manifests".into());
    }

    paths
}

/// Scans the standard search paths for the given bundle directory.
pub fn discover(bundle_dir: &Path) -> Discovery {
    discover_in(standard_search_paths(bundle_dir))
}

/// Scans an explicit, ordered list of directories for plugin manifests.
///
/// Every `.json` file found is parsed and validated; directories that do not
/// exist or cannot be read are skipped. When two manifests declare the same
/// plugin id, the first one by scan order wins and the loser is reported in
/// [`Discovery::duplicates`].
pub fn discover_in(paths: impl IntoIterator<Item = PathBuf>) -> Discovery {
    let mut discovery = Discovery::default();
    let mut first_by_id: HashMap<String, PathBuf> = HashMap::new();

    for dir in paths {
        // Walk one level deep only: a manifests directory may group bundles
        // in per-plugin subdirectories, but nothing nests further.
        for entry in WalkDir::new(&dir).max_depth(2).follow_links(true) {
            let Ok(entry) = entry else {
                continue;
            };

            if !entry.file_type().is_file() || !is_manifest_file(entry.path()) {
                continue;
            }

            let path = entry.path().to_path_buf();
            let manifest = match Manifest::from_path(&path) {
                Ok(manifest) => manifest,
                Err(e) => {
                    discovery.rejected.push((path, e));
                    continue;
                }
            };

            let id = manifest.plugin.id.clone();
            if let Some(first) = first_by_id.get(&id) {
                discovery.duplicates.push((
                    path,
                    ManifestError::DuplicateId {
                        id,
                        first: first.clone(),
                    },
                ));
                continue;
            }

            first_by_id.insert(id, path.clone());
            discovery.entries.push(Discovered {
                directory: path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| dir.clone()),
                path,
                manifest,
            });
        }
    }

    discovery
}

fn is_manifest_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}
