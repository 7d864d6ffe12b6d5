//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [general] section
    if let Some(section) = ini.section(Some("general")) {
        if let Some(v) = section.get("workers") {
            config.general.workers = parse_positive(v, "general", "workers")?;
        }
        if let Some(v) = section.get("queue_factor") {
            config.general.queue_factor = parse_positive(v, "general", "queue_factor")?;
        }
    }

    // [tiles] section
    if let Some(section) = ini.section(Some("tiles")) {
        if let Some(v) = section.get("blank_tiles") {
            config.tiles.blank_tiles = parse_bool(v, "tiles", "blank_tiles")?;
        }
    }

    // [priority] section
    if let Some(section) = ini.section(Some("priority")) {
        config.priority.file = optional_path(section, "file");
    }

    // [downsample] section
    if let Some(section) = ini.section(Some("downsample")) {
        if let Some(v) = section.get("filter") {
            config.downsample.filter =
                v.parse().map_err(|reason| ConfigFileError::InvalidValue {
                    section: "downsample".to_string(),
                    key: "filter".to_string(),
                    value: v.to_string(),
                    reason,
                })?;
        }
    }

    // [calculator] section
    if let Some(section) = ini.section(Some("calculator")) {
        if let Some(v) = section.get("binary") {
            let v = v.trim();
            if !v.is_empty() {
                config.calculator.binary = v.to_string();
            }
        }
        if let Some(path) = optional_path(section, "sdf_dir") {
            config.calculator.sdf_dir = path;
        }
        if let Some(v) = section.get("rx_height") {
            let height: f64 = parse_value(v, "calculator", "rx_height", "must be a number")?;
            if !height.is_finite() || height < 0.0 {
                return Err(invalid(
                    "calculator",
                    "rx_height",
                    v,
                    "must be a non-negative number (metres)",
                ));
            }
            config.calculator.rx_height = height;
        }
        if let Some(v) = section.get("extra_args") {
            config.calculator.extra_args = v.split_whitespace().map(str::to_string).collect();
        }
    }

    Ok(config)
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

fn optional_path(section: &Properties, key: &str) -> Option<PathBuf> {
    section
        .get(key)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(expand_tilde)
}

fn parse_positive(v: &str, section: &str, key: &str) -> Result<usize, ConfigFileError> {
    let value: usize = parse_value(v, section, key, "must be a positive integer")?;
    if value == 0 {
        return Err(invalid(section, key, v, "must be a positive integer"));
    }
    Ok(value)
}

fn parse_bool(v: &str, section: &str, key: &str) -> Result<bool, ConfigFileError> {
    match v.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(section, key, v, "must be true or false")),
    }
}

fn parse_value<T: FromStr>(
    v: &str,
    section: &str,
    key: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    v.trim().parse().map_err(|_| invalid(section, key, v, reason))
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
