//! Common types and utilities shared across CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rftiles::config::ConfigFile;
use rftiles::executor::ExecutorStats;
use rftiles::priority::PriorityTable;
use rftiles::zoom::ZoomLevels;

use crate::error::CliError;

/// Resolve zoom levels from `-z` tokens, or fall back to `default`.
pub fn resolve_zooms(
    tokens: &[String],
    default: impl FnOnce() -> Result<ZoomLevels, CliError>,
) -> Result<ZoomLevels, CliError> {
    if tokens.is_empty() {
        default()
    } else {
        Ok(ZoomLevels::parse(tokens)?)
    }
}

/// Resolve the priority table from `--scf`, then config, then the built-in
/// table.
pub fn resolve_priority(
    cli_scf: Option<&Path>,
    config: &ConfigFile,
) -> Result<Arc<PriorityTable>, CliError> {
    let table = match cli_scf {
        Some(path) => PriorityTable::from_file(path)?,
        None => config.priority.table()?,
    };
    Ok(Arc::new(table))
}

/// Create `dir` and its parents.
pub fn ensure_dir(dir: &Path) -> Result<(), CliError> {
    std::fs::create_dir_all(dir).map_err(|error| CliError::OutputDir {
        path: dir.to_path_buf(),
        error,
    })
}

/// Output directory for one of several inputs: `<out>/<input stem>`.
pub fn per_input_dir(out: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "raster".to_string());
    out.join(stem)
}

/// Print the recorded task failures, if any.
pub fn print_failures(stats: &ExecutorStats) {
    if stats.failures().is_empty() {
        return;
    }
    println!("  Failures:");
    for failure in stats.failures() {
        println!("    {}: {}", failure.label, failure.reason);
    }
    let unlisted = (stats.failed + stats.panicked).saturating_sub(stats.failures().len() as u64);
    if unlisted > 0 {
        println!("    ... and {} more (see log)", unlisted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_input_dir_uses_stem() {
        assert_eq!(
            per_input_dir(Path::new("out"), Path::new("/data/site-a.ppm")),
            PathBuf::from("out/site-a")
        );
    }

    #[test]
    fn test_resolve_zooms_default_and_explicit() {
        let default = resolve_zooms(&[], || Ok(ZoomLevels::default_split())).unwrap();
        assert_eq!(default, ZoomLevels::default_split());

        let tokens = vec!["3".to_string(), "1-2".to_string()];
        let explicit = resolve_zooms(&tokens, || unreachable!()).unwrap();
        assert_eq!(explicit.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_resolve_zooms_rejects_inverted_range() {
        let tokens = vec!["5-2".to_string()];
        assert!(matches!(
            resolve_zooms(&tokens, || Ok(ZoomLevels::default_split())),
            Err(CliError::Zoom(_))
        ));
    }

    #[test]
    fn test_resolve_priority_default() {
        let table = resolve_priority(None, &ConfigFile::default()).unwrap();
        assert_eq!(table.len(), PriorityTable::default().len());
    }
}
