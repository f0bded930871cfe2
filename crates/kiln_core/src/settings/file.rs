//! Binary light settings files (`.lts`).
//!
//! Layout, little endian:
//!
//! ```text
//! u64 record_count
//! record_count * { u64 name_len, name_len bytes UTF-8 name, u64 data_size }
//! data blobs, tightly packed, in record order
//! ```
//!
//! Records with an unknown name or a size that doesn't match the parameter
//! are skipped by consuming exactly `data_size` bytes.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::registry::Registry;
use super::{ParamValue, SettingsError, SettingsResult};

/// Names longer than this are treated as corruption rather than allocated.
const MAX_NAME_LEN: u64 = 1024;

/// One header record as stored in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingRecord {
    pub name: String,
    pub data_size: u64,
}

/// Outcome of a load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

/// Writes the named parameters to `writer`.
pub fn write_settings<W: Write>(registry: &Registry, names: &[&str], writer: &mut W) -> SettingsResult<()> {
    let mut params = Vec::with_capacity(names.len());
    for name in names {
        let p = registry
            .param(name)
            .ok_or_else(|| SettingsError::UnknownParameter(name.to_string()))?;
        params.push(p);
    }

    writer.write_all(&(params.len() as u64).to_le_bytes())?;
    for p in &params {
        let name = p.name().as_bytes();
        writer.write_all(&(name.len() as u64).to_le_bytes())?;
        writer.write_all(name)?;
        writer.write_all(&(p.spec().serialized_size() as u64).to_le_bytes())?;
    }
    let mut blob = Vec::new();
    for p in &params {
        p.spec().encode(&p.value(), &mut blob);
    }
    writer.write_all(&blob)?;
    Ok(())
}

fn read_u64<R: Read>(reader: &mut R) -> SettingsResult<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Reads a settings file and applies it to `registry`.
///
/// Everything is parsed into a staging list first; on any I/O or format
/// error the registry is left untouched.
pub fn read_settings<R: Read>(registry: &mut Registry, reader: &mut R) -> SettingsResult<LoadReport> {
    let count = read_u64(reader)?;
    let mut records = Vec::new();
    for _ in 0..count {
        let len = read_u64(reader)?;
        if len > MAX_NAME_LEN {
            return Err(SettingsError::Corrupt(format!("setting name length {}", len)));
        }
        let mut name = vec![0u8; len as usize];
        reader.read_exact(&mut name)?;
        let name = String::from_utf8(name)
            .map_err(|_| SettingsError::Corrupt("setting name is not UTF-8".to_string()))?;
        let data_size = read_u64(reader)?;
        records.push(SettingRecord { name, data_size });
    }

    let mut staged: Vec<(String, ParamValue)> = Vec::new();
    let mut report = LoadReport::default();
    for record in records {
        let expected = registry
            .param(&record.name)
            .map(|p| p.spec().serialized_size() as u64);
        if expected != Some(record.data_size) {
            // consume exactly the recorded size without interpreting it
            let skipped = std::io::copy(&mut reader.by_ref().take(record.data_size), &mut std::io::sink())?;
            if skipped != record.data_size {
                return Err(SettingsError::Corrupt(format!(
                    "truncated data for '{}'",
                    record.name
                )));
            }
            log::debug!("skipping setting '{}' ({} bytes)", record.name, record.data_size);
            report.skipped.push(record.name);
            continue;
        }

        let mut blob = vec![0u8; record.data_size as usize];
        reader.read_exact(&mut blob)?;
        let decoded = registry
            .param(&record.name)
            .and_then(|p| p.spec().decode(&blob));
        match decoded {
            Some(value) => staged.push((record.name, value)),
            None => {
                log::warn!("setting '{}' has an invalid value, skipped", record.name);
                report.skipped.push(record.name);
            }
        }
    }

    for (name, value) in staged {
        registry.set(&name, value)?;
        report.applied.push(name);
    }
    registry.update_ui_state();
    Ok(report)
}

pub fn save_settings(registry: &Registry, names: &[&str], path: impl AsRef<Path>) -> SettingsResult<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    write_settings(registry, names, &mut writer)?;
    writer.flush()?;
    log::info!("saved {} settings to {}", names.len(), path.as_ref().display());
    Ok(())
}

pub fn load_settings(registry: &mut Registry, path: impl AsRef<Path>) -> SettingsResult<LoadReport> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);
    let report = read_settings(registry, &mut reader)?;
    log::info!(
        "loaded {} settings from {} ({} skipped)",
        report.applied.len(),
        path.as_ref().display(),
        report.skipped.len()
    );
    Ok(report)
}
