//! Versioned binary persistence for parameter values.
//!
//! The wire format is little-endian and self-describing:
//!
//! ```text
//! u32 schema_version      // currently 1
//! u32 parameter_count
//! repeated { u32 parameter_id; f64 value }
//! u32 custom_payload_length
//! bytes custom_payload    // opaque, plugin-defined
//! ```
//!
//! Loading tolerates unknown parameter ids (skipped) and missing parameters
//! (current values kept), so presets survive plugins gaining or losing
//! parameters between versions.

use crate::{ParamId, ParamRegistry};
use clap_sys::ext::state_context::{
    clap_plugin_state_context_type, CLAP_STATE_CONTEXT_FOR_DUPLICATE,
    CLAP_STATE_CONTEXT_FOR_PRESET, CLAP_STATE_CONTEXT_FOR_PROJECT,
};
use std::io::{Read, Write};
use thiserror::Error;

/// The state schema version written by [`save_state`].
pub const STATE_SCHEMA_VERSION: u32 = 1;

/// Why a state save or load is happening.
///
/// `Project` is the conservative default: persist all parameters and voice
/// identity choices, discard ephemeral UI state. `Preset` permits the plugin
/// to reset voices and transient state; `Duplicate` preserves everything
/// including transient state.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum StateContext {
    Preset,
    Duplicate,
    #[default]
    Project,
}

impl StateContext {
    pub fn from_raw(raw: clap_plugin_state_context_type) -> Option<Self> {
        match raw {
            CLAP_STATE_CONTEXT_FOR_PRESET => Some(Self::Preset),
            CLAP_STATE_CONTEXT_FOR_DUPLICATE => Some(Self::Duplicate),
            CLAP_STATE_CONTEXT_FOR_PROJECT => Some(Self::Project),
            _ => None,
        }
    }

    pub fn as_raw(self) -> clap_plugin_state_context_type {
        match self {
            Self::Preset => CLAP_STATE_CONTEXT_FOR_PRESET,
            Self::Duplicate => CLAP_STATE_CONTEXT_FOR_DUPLICATE,
            Self::Project => CLAP_STATE_CONTEXT_FOR_PROJECT,
        }
    }
}

/// Errors raised by the state codec.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("unknown state schema version {found}")]
    VersionMismatch { found: u32 },
    #[error("state stream ended early")]
    Truncated,
    #[error("state stream I/O failed: {0}")]
    StreamIo(std::io::Error),
}

/// The plugin-defined payload carried alongside the parameter block.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StateBlob {
    pub custom: Vec<u8>,
}

/// Writes the registry's current values plus an opaque custom payload.
pub fn save_state(
    registry: &ParamRegistry,
    writer: &mut impl Write,
    custom: &[u8],
) -> Result<(), StateError> {
    write_u32(writer, STATE_SCHEMA_VERSION)?;

    let ids = registry.ids();
    write_u32(writer, len_u32(ids.len())?)?;
    for id in ids {
        // A registered id always has a value.
        let value = registry.get(id).unwrap_or_default();
        write_u32(writer, id.get())?;
        writer
            .write_all(&value.to_le_bytes())
            .map_err(StateError::StreamIo)?;
    }

    write_u32(writer, len_u32(custom.len())?)?;
    writer.write_all(custom).map_err(StateError::StreamIo)?;
    Ok(())
}

/// Reads a state block and applies it to the registry.
///
/// Values pass through [`ParamRegistry::set`], so they clamp into the
/// currently declared ranges. The custom payload is returned for the plugin
/// to consume.
pub fn load_state(
    registry: &ParamRegistry,
    reader: &mut impl Read,
) -> Result<StateBlob, StateError> {
    let version = read_u32(reader)?;
    if version != STATE_SCHEMA_VERSION {
        return Err(StateError::VersionMismatch { found: version });
    }

    let count = read_u32(reader)?;
    for _ in 0..count {
        let id = read_u32(reader)?;
        let value = read_f64(reader)?;
        // Unknown ids are skipped: set only what is still registered.
        let _ = registry.set(ParamId::new(id), value);
    }

    let custom_len = read_u32(reader)? as usize;
    let mut custom = vec![0; custom_len];
    reader.read_exact(&mut custom).map_err(map_read_err)?;

    Ok(StateBlob { custom })
}

fn len_u32(len: usize) -> Result<u32, StateError> {
    u32::try_from(len).map_err(|_| StateError::StreamIo(std::io::ErrorKind::InvalidInput.into()))
}

fn write_u32(writer: &mut impl Write, value: u32) -> Result<(), StateError> {
    writer
        .write_all(&value.to_le_bytes())
        .map_err(StateError::StreamIo)
}

fn read_u32(reader: &mut impl Read) -> Result<u32, StateError> {
    let mut buf = [0; 4];
    reader.read_exact(&mut buf).map_err(map_read_err)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_f64(reader: &mut impl Read) -> Result<f64, StateError> {
    let mut buf = [0; 8];
    reader.read_exact(&mut buf).map_err(map_read_err)?;
    Ok(f64::from_le_bytes(buf))
}

fn map_read_err(e: std::io::Error) -> StateError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        StateError::Truncated
    } else {
        StateError::StreamIo(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{binder, ParamInfo};
    use std::io::Cursor;

    fn registry() -> ParamRegistry {
        let registry = ParamRegistry::new();
        registry
            .register(binder::hertz_log(7u32, "Cutoff", 20.0, 20_000.0, 440.0))
            .unwrap();
        registry
            .register(binder::percentage(8u32, "Mix", 100.0))
            .unwrap();
        registry
    }

    #[test]
    fn save_load_round_trips_registered_params() {
        let source = registry();
        source.set(ParamId::new(7), 1234.5).unwrap();
        source.set(ParamId::new(8), 42.0).unwrap();

        let mut buf = Vec::new();
        save_state(&source, &mut buf, b"voice-data").unwrap();

        let target = registry();
        let blob = load_state(&target, &mut Cursor::new(&buf)).unwrap();

        assert_eq!(target.get(ParamId::new(7)), Some(1234.5));
        assert_eq!(target.get(ParamId::new(8)), Some(42.0));
        assert_eq!(blob.custom, b"voice-data");
    }

    #[test]
    fn unknown_ids_are_skipped_and_missing_params_keep_values() {
        let source = ParamRegistry::new();
        source
            .register(ParamInfo::new(99u32, "Gone", 0.0, 1.0, 0.5))
            .unwrap();

        let mut buf = Vec::new();
        save_state(&source, &mut buf, b"").unwrap();

        let target = registry();
        target.set(ParamId::new(7), 555.0).unwrap();
        load_state(&target, &mut Cursor::new(&buf)).unwrap();

        // 99 was skipped, 7 kept its pre-load value.
        assert_eq!(target.get(ParamId::new(7)), Some(555.0));
    }

    #[test]
    fn loaded_values_clamp_into_declared_ranges() {
        let source = ParamRegistry::new();
        source
            .register(ParamInfo::new(8u32, "Mix", 0.0, 100_000.0, 0.0))
            .unwrap();
        source.set(ParamId::new(8), 90_000.0).unwrap();

        let mut buf = Vec::new();
        save_state(&source, &mut buf, b"").unwrap();

        let target = registry(); // declares 8 as 0..100
        load_state(&target, &mut Cursor::new(&buf)).unwrap();
        assert_eq!(target.get(ParamId::new(8)), Some(100.0));
    }

    #[test]
    fn version_mismatch_is_detected_before_any_write() {
        let target = registry();
        let mut buf = Vec::new();
        save_state(&target, &mut buf, b"").unwrap();
        buf[0] = 9; // clobber the version field

        assert!(matches!(
            load_state(&target, &mut Cursor::new(&buf)),
            Err(StateError::VersionMismatch { found: 9 })
        ));
    }

    #[test]
    fn short_reads_are_truncation_errors() {
        let source = registry();
        let mut buf = Vec::new();
        save_state(&source, &mut buf, b"tail").unwrap();
        buf.truncate(buf.len() - 2);

        assert!(matches!(
            load_state(&source, &mut Cursor::new(&buf)),
            Err(StateError::Truncated)
        ));
    }

    #[test]
    fn context_raw_values_round_trip() {
        for ctx in [
            StateContext::Preset,
            StateContext::Duplicate,
            StateContext::Project,
        ] {
            assert_eq!(StateContext::from_raw(ctx.as_raw()), Some(ctx));
        }
        assert_eq!(StateContext::from_raw(0), None);
        assert_eq!(StateContext::default(), StateContext::Project);
    }
}
