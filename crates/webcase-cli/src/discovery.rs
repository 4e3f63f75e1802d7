//! Suite discovery and filtering

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;
use webcase_core::TestSuite;

use crate::cli::Selection;
use crate::error::{CliError, Result};

/// A suite file loaded from disk, already filtered by the selection
#[derive(Debug, Clone)]
pub struct LoadedSuite {
    pub name: String,
    pub path: PathBuf,
    pub suite: TestSuite,
}

fn is_suite_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Expand files and directories into a sorted list of suite files
pub fn discover(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.map_err(|e| CliError::Io(e.into()))?;
                if entry.file_type().is_file() && is_suite_file(entry.path()) {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            return Err(CliError::NoSuites(format!("{} (no such file or directory)", path.display())));
        }
    }
    Ok(files)
}

impl Selection {
    fn roots(&self, default_dir: &Path) -> Vec<PathBuf> {
        if self.suites.is_empty() {
            vec![default_dir.to_path_buf()]
        } else {
            self.suites.clone()
        }
    }

    /// Whether `name` survives the `--case` filter
    pub fn wants_case(&self, name: &str) -> bool {
        self.cases.is_empty() || self.cases.iter().any(|c| c == name)
    }

    fn apply(&self, name: &str, suite: &mut TestSuite) {
        if let Some(keyword) = self.keyword.as_deref() {
            if !name.contains(keyword) {
                suite.retain(|case| case.contains(keyword));
            }
        }
        suite.retain(|case| self.wants_case(case));
    }

    /// Discover, load and filter the selected suites
    pub fn load(&self, default_dir: &Path) -> Result<Vec<LoadedSuite>> {
        let roots = self.roots(default_dir);
        let mut loaded = Vec::new();

        for path in discover(&roots)? {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut suite = TestSuite::load(&path)?;
            self.apply(&name, &mut suite);
            if suite.is_empty() {
                debug!("Skipping {}: no selected cases", path.display());
                continue;
            }
            loaded.push(LoadedSuite { name, path, suite });
        }

        if loaded.is_empty() {
            let described: Vec<String> = roots.iter().map(|p| p.display().to_string()).collect();
            return Err(CliError::NoSuites(described.join(", ")));
        }
        Ok(loaded)
    }
}
