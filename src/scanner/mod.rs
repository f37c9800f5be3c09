//! Run directory discovery.
//!
//! A batch input directory holds one sub-directory per simulation run. A
//! directory counts as a run when it contains the record file; its
//! `config.xml`, if any, is picked up later by the grouping step.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// One discovered run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedRun {
    /// Run directory name, used as the base name of its output file.
    pub name: String,
    /// Path to the run's record file.
    pub record_path: PathBuf,
}

impl ScannedRun {
    /// Output file of this run inside `output_dir`.
    pub fn output_file(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(format!("{}.csv", self.name))
    }
}

/// Scanner for run directories.
pub struct RunScanner {
    input_dir: PathBuf,
    record_file: String,
}

impl RunScanner {
    /// Create a new run scanner.
    pub fn new(input_dir: PathBuf, record_file: impl Into<String>) -> Self {
        Self {
            input_dir,
            record_file: record_file.into(),
        }
    }

    /// Scan for runs, sorted by name.
    pub fn scan(&self) -> Result<Vec<ScannedRun>> {
        if !self.input_dir.is_dir() {
            return Err(anyhow::anyhow!(
                "Input directory not found: {}",
                self.input_dir.display()
            ));
        }

        let mut runs = Vec::new();
        let entries = WalkDir::new(&self.input_dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }

            let record_path = entry.path().join(&self.record_file);
            if !record_path.is_file() {
                debug!("Skipping {}: no {}", entry.path().display(), self.record_file);
                continue;
            }

            runs.push(ScannedRun { name, record_path });
        }

        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scan_runs() {
        let temp = TempDir::new().unwrap();
        for run in ["run_b", "run_a", ".hidden", "empty"] {
            std::fs::create_dir(temp.path().join(run)).unwrap();
        }
        for run in ["run_b", "run_a", ".hidden"] {
            std::fs::write(temp.path().join(run).join("record.json"), "{}").unwrap();
        }
        std::fs::write(temp.path().join("record.json"), "{}").unwrap();

        let scanner = RunScanner::new(temp.path().to_path_buf(), "record.json");
        let runs = scanner.scan().unwrap();

        let names: Vec<_> = runs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["run_a", "run_b"]);
        assert_eq!(
            runs[0].output_file(Path::new("/out")),
            PathBuf::from("/out/run_a.csv")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_link_skipped() {
        let temp = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        std::fs::write(target.path().join("record.json"), "{}").unwrap();

        std::os::unix::fs::symlink(target.path(), temp.path().join("linked")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("gone"), temp.path().join("broken")).unwrap();

        let scanner = RunScanner::new(temp.path().to_path_buf(), "record.json");
        let runs = scanner.scan().unwrap();

        let names: Vec<_> = runs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["linked"]);
    }

    #[test]
    fn test_missing_input_dir() {
        let scanner = RunScanner::new(PathBuf::from("/definitely/not/here"), "record.json");
        assert!(scanner.scan().is_err());
    }
}
