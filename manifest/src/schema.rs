use crate::ManifestError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// The manifest schema version this crate reads and writes.
pub const SCHEMA_VERSION: &str = "1.0";

/// Extension ids a manifest may declare with `supported: true`.
///
/// This is the CLAP extension surface the bridge runtime implements. Ids
/// outside this set are tolerated as long as they are declared unsupported,
/// so manifests written against a newer runtime still load.
pub const RECOGNIZED_EXTENSIONS: &[&str] = &[
    "clap.params",
    "clap.state",
    "clap.state-context",
    "clap.audio-ports",
    "clap.audio-ports-config",
    "clap.audio-ports-config-info",
    "clap.audio-ports-activation",
    "clap.note-ports",
    "clap.note-name",
    "clap.latency",
    "clap.tail",
    "clap.render",
    "clap.voice-info",
    "clap.surround",
    "clap.ambisonic",
    "clap.remote-controls",
    "clap.context-menu",
    "clap.param-indication",
    "clap.preset-load",
    "clap.track-info",
    "clap.tuning",
    "clap.timer-support",
];

/// A parsed, validated plugin manifest.
///
/// Manifests are immutable once loaded. Unknown fields at every level are
/// preserved in the flattened `extra` maps, so re-serializing a manifest does
/// not lose data written by newer tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub schema_version: String,
    pub plugin: PluginInfo,
    pub build: BuildInfo,
    #[serde(default)]
    pub extensions: Vec<ExtensionDecl>,
    #[serde(default)]
    pub parameters: Vec<ParameterDecl>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The plugin identity block of a manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfo {
    pub id: String,
    pub name: String,
    pub vendor: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub manual_url: String,
    #[serde(default)]
    pub support_url: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The build block: which shared object implements the plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    /// Path of the Go shared object, relative to the manifest's directory.
    pub go_shared_library: String,
    #[serde(default)]
    pub entry_point: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A declared CLAP extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionDecl {
    pub id: String,
    #[serde(default)]
    pub supported: bool,
}

/// A parameter declared up-front by the manifest.
///
/// Declared parameters are pre-registered into the instance's parameter
/// registry at create time, so hosts see a stable parameter list even before
/// the managed side reports one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDecl {
    pub id: u32,
    pub name: String,
    pub min_value: f64,
    pub max_value: f64,
    pub default_value: f64,
    #[serde(default)]
    pub flags: Vec<String>,
}

impl Manifest {
    /// Reads and validates a manifest from a file.
    pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ManifestError::NotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        Self::from_reader(BufReader::new(file))
    }

    /// Reads and validates a manifest from an arbitrary reader.
    pub fn from_reader(reader: impl Read) -> Result<Self, ManifestError> {
        let manifest: Manifest = serde_json::from_reader(reader)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Parses and validates a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = serde_json::from_str(json)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Resolves the declared shared object against the manifest's directory.
    ///
    /// Returns [`ManifestError::LibraryMissing`] if the resolved file does
    /// not exist.
    pub fn resolve_library(&self, manifest_dir: &Path) -> Result<PathBuf, ManifestError> {
        let path = manifest_dir.join(&self.build.go_shared_library);
        if path.is_file() {
            Ok(path)
        } else {
            Err(ManifestError::LibraryMissing(path))
        }
    }

    fn validate(&self) -> Result<(), ManifestError> {
        let major = self
            .schema_version
            .split('.')
            .next()
            .unwrap_or_default();
        if self.schema_version.is_empty() {
            return Err(invalid("schemaVersion is missing or empty"));
        }
        if major != "1" {
            return Err(invalid(format!(
                "unsupported schemaVersion {:?} (expected 1.x)",
                self.schema_version
            )));
        }

        for (field, value) in [
            ("plugin.id", &self.plugin.id),
            ("plugin.name", &self.plugin.name),
            ("plugin.vendor", &self.plugin.vendor),
            ("plugin.version", &self.plugin.version),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(format!("{field} is missing or empty")));
            }
        }

        if self.build.go_shared_library.trim().is_empty() {
            return Err(invalid("build.goSharedLibrary is missing or empty"));
        }

        for ext in &self.extensions {
            if ext.supported && !RECOGNIZED_EXTENSIONS.contains(&ext.id.as_str()) {
                return Err(invalid(format!(
                    "extension {:?} is declared supported but is not recognized",
                    ext.id
                )));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for param in &self.parameters {
            if !seen.insert(param.id) {
                return Err(invalid(format!("duplicate parameter id {}", param.id)));
            }
            if !(param.min_value <= param.default_value && param.default_value <= param.max_value)
            {
                return Err(invalid(format!(
                    "parameter {} bounds are inconsistent: {} <= {} <= {} does not hold",
                    param.id, param.min_value, param.default_value, param.max_value
                )));
            }
        }

        Ok(())
    }

    /// Returns `true` if the manifest declares the given extension as supported.
    pub fn declares_extension(&self, id: &str) -> bool {
        self.extensions
            .iter()
            .any(|ext| ext.supported && ext.id == id)
    }
}

fn invalid(msg: impl Into<String>) -> ManifestError {
    ManifestError::InvalidManifest(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAIN: &str = r#"{
        "schemaVersion": "1.0",
        "plugin": {
            "id": "com.example.gain",
            "name": "Example Gain",
            "vendor": "Example Audio",
            "version": "1.2.0",
            "description": "A gain plugin",
            "url": "https://example.com",
            "features": ["audio-effect", "stereo"]
        },
        "build": {
            "goSharedLibrary": "libgain.so",
            "entryPoint": "main",
            "dependencies": []
        },
        "extensions": [
            {"id": "clap.params", "supported": true},
            {"id": "clap.latency", "supported": true},
            {"id": "clap.vendor-custom", "supported": false}
        ],
        "parameters": [
            {"id": 0, "name": "Gain", "minValue": -60.0, "maxValue": 12.0,
             "defaultValue": 0.0, "flags": ["automatable"]}
        ]
    }"#;

    #[test]
    fn parses_a_complete_manifest() {
        let manifest = Manifest::from_json(GAIN).unwrap();

        assert_eq!(manifest.schema_version, "1.0");
        assert_eq!(manifest.plugin.id, "com.example.gain");
        assert_eq!(manifest.plugin.features, ["audio-effect", "stereo"]);
        assert_eq!(manifest.build.go_shared_library, "libgain.so");
        assert!(manifest.declares_extension("clap.params"));
        assert!(!manifest.declares_extension("clap.vendor-custom"));
        assert_eq!(manifest.parameters.len(), 1);
    }

    #[test]
    fn preserves_unknown_fields() {
        let json = r#"{
            "schemaVersion": "1.0",
            "futureTopLevel": {"a": 1},
            "plugin": {"id": "a.b", "name": "n", "vendor": "v", "version": "1",
                       "futureNested": true},
            "build": {"goSharedLibrary": "lib.so"}
        }"#;

        let manifest = Manifest::from_json(json).unwrap();
        assert!(manifest.extra.contains_key("futureTopLevel"));
        assert!(manifest.plugin.extra.contains_key("futureNested"));

        // Round-trips through serde without dropping the unknown keys.
        let round = serde_json::to_string(&manifest).unwrap();
        assert!(round.contains("futureTopLevel"));
        assert!(round.contains("futureNested"));
    }

    #[test]
    fn rejects_missing_identity() {
        let json = r#"{
            "schemaVersion": "1.0",
            "plugin": {"id": "", "name": "n", "vendor": "v", "version": "1"},
            "build": {"goSharedLibrary": "lib.so"}
        }"#;

        assert!(matches!(
            Manifest::from_json(json),
            Err(ManifestError::InvalidManifest(_))
        ));
    }

    #[test]
    fn rejects_unsupported_schema_major() {
        let json = GAIN.replacen("1.0", "2.0", 1);
        assert!(matches!(
            Manifest::from_json(&json),
            Err(ManifestError::InvalidManifest(_))
        ));
    }

    #[test]
    fn accepts_newer_minor_schema() {
        let json = GAIN.replacen("1.0", "1.7", 1);
        assert!(Manifest::from_json(&json).is_ok());
    }

    #[test]
    fn rejects_unknown_supported_extension() {
        let json = GAIN.replace("clap.latency", "clap.not-a-thing");
        assert!(matches!(
            Manifest::from_json(&json),
            Err(ManifestError::InvalidManifest(_))
        ));
    }

    #[test]
    fn rejects_inconsistent_parameter_bounds() {
        let json = GAIN.replace("\"defaultValue\": 0.0", "\"defaultValue\": 100.0");
        assert!(matches!(
            Manifest::from_json(&json),
            Err(ManifestError::InvalidManifest(_))
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            Manifest::from_json("{ not json"),
            Err(ManifestError::Parse(_))
        ));
    }
}
