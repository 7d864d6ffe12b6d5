//! INI serialization logic for converting `ConfigFile` → INI string.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let priority_file = config
        .priority
        .file
        .as_deref()
        .map(path_to_string)
        .unwrap_or_default();

    format!(
        r#"[general]
; Worker threads for splitting, merging and downsampling
; (default: number of CPUs)
workers = {}
; Backlog slots per worker while merging. The directory walk pauses when
; workers * queue_factor tiles are waiting to start (default: 4)
queue_factor = {}

[tiles]
; Also write tiles that carry no coverage (default: false)
blank_tiles = {}

[priority]
; Signal color file with one "LEVEL: R, G, B" entry per line.
; Stronger levels win when pyramids overlap.
; If empty, the built-in 13-level table is used.
file = {}

[downsample]
; Filter used to halve tiles:
;   nearest - top-left pixel of each 2x2 block, keeps signal colors exact
;   box     - average of each 2x2 block
filter = {}

[calculator]
; Coverage calculator executable
binary = {}
; Directory with terrain (SDF) files
sdf_dir = {}
; Receiver height above ground in metres
rx_height = {}
; Extra arguments passed to every calculator run
extra_args = {}
"#,
        config.general.workers,
        config.general.queue_factor,
        config.tiles.blank_tiles,
        priority_file,
        config.downsample.filter,
        config.calculator.binary,
        path_to_string(&config.calculator.sdf_dir),
        config.calculator.rx_height,
        config.calculator.extra_args.join(" "),
    )
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
