use gobridge_manifest::{discover_in, Manifest, ManifestError};
use std::fs;
use std::path::Path;

fn write_manifest(dir: &Path, file: &str, id: &str, lib: &str) {
    let json = format!(
        r#"{{
            "schemaVersion": "1.0",
            "plugin": {{"id": "{id}", "name": "Test", "vendor": "V", "version": "1.0"}},
            "build": {{"goSharedLibrary": "{lib}"}}
        }}"#
    );
    fs::write(dir.join(file), json).unwrap();
}

#[test]
fn finds_manifests_in_order() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();

    write_manifest(a.path(), "gain.json", "com.example.gain", "libgain.so");
    write_manifest(b.path(), "synth.json", "com.example.synth", "libsynth.so");

    let discovery = discover_in([a.path().to_path_buf(), b.path().to_path_buf()]);

    assert_eq!(discovery.entries.len(), 2);
    assert_eq!(discovery.entries[0].manifest.plugin.id, "com.example.gain");
    assert_eq!(discovery.entries[1].manifest.plugin.id, "com.example.synth");
    assert!(discovery.rejected.is_empty());
    assert!(discovery.duplicates.is_empty());
}

#[test]
fn first_discovered_id_wins() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();

    write_manifest(a.path(), "gain.json", "com.example.gain", "liba.so");
    write_manifest(b.path(), "gain.json", "com.example.gain", "libb.so");

    let discovery = discover_in([a.path().to_path_buf(), b.path().to_path_buf()]);

    assert_eq!(discovery.entries.len(), 1);
    assert_eq!(
        discovery.entries[0].manifest.build.go_shared_library,
        "liba.so"
    );
    assert_eq!(discovery.duplicates.len(), 1);
    assert!(matches!(
        discovery.duplicates[0].1,
        ManifestError::DuplicateId { .. }
    ));
}

#[test]
fn invalid_manifests_are_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();

    write_manifest(dir.path(), "good.json", "com.example.good", "lib.so");
    fs::write(dir.path().join("bad.json"), "{ broken").unwrap();
    fs::write(dir.path().join("ignored.txt"), "not a manifest").unwrap();

    let discovery = discover_in([dir.path().to_path_buf()]);

    assert_eq!(discovery.entries.len(), 1);
    assert_eq!(discovery.rejected.len(), 1);
}

#[test]
fn descends_into_per_plugin_subdirectories() {
    let root = tempfile::tempdir().unwrap();
    let nested = root.path().join("gain");
    fs::create_dir(&nested).unwrap();
    write_manifest(&nested, "gain.json", "com.example.gain", "libgain.so");

    let discovery = discover_in([root.path().to_path_buf()]);

    assert_eq!(discovery.entries.len(), 1);
    assert_eq!(discovery.entries[0].directory, nested);
}

#[test]
fn library_resolution_is_relative_to_the_manifest() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(dir.path(), "gain.json", "com.example.gain", "libgain.so");

    let manifest = Manifest::from_path(&dir.path().join("gain.json")).unwrap();

    assert!(matches!(
        manifest.resolve_library(dir.path()),
        Err(ManifestError::LibraryMissing(_))
    ));

    fs::write(dir.path().join("libgain.so"), b"").unwrap();
    let resolved = manifest.resolve_library(dir.path()).unwrap();
    assert_eq!(resolved, dir.path().join("libgain.so"));
}
