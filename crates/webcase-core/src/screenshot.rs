//! Screenshot path normalization and the per-runner path registry

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

const SCREENSHOT_DIR: &str = "screenshot";
const INPUT_PLACEHOLDER: &str = "{input}";

/// Paths of screenshots taken during a run
///
/// Entries are keyed by step number and, for file-like names such as
/// `search_result.png`, by `search_result_path`. Later screenshots with the
/// same key replace earlier ones.
#[derive(Debug, Clone, Default)]
pub struct ScreenshotRegistry {
    by_step: IndexMap<usize, PathBuf>,
    by_name: IndexMap<String, PathBuf>,
    latest: Option<PathBuf>,
}

impl ScreenshotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step_num: usize, requested: &str, path: PathBuf) {
        if let Some(base) = image_base_name(requested) {
            self.by_name.insert(format!("{}_path", base), path.clone());
        }
        self.by_step.insert(step_num, path.clone());
        self.latest = Some(path);
    }

    pub fn path_for_step(&self, step_num: usize) -> Option<&Path> {
        self.by_step.get(&step_num).map(PathBuf::as_path)
    }

    /// Look up by base name (`search_result`), falling back to any recorded
    /// path containing the name.
    pub fn path_for_base_name(&self, base_name: &str) -> Option<&Path> {
        self.by_name
            .get(&format!("{}_path", base_name))
            .or_else(|| {
                self.by_step
                    .values()
                    .find(|path| path.to_string_lossy().contains(base_name))
            })
            .map(PathBuf::as_path)
    }

    pub fn latest(&self) -> Option<&Path> {
        self.latest.as_deref()
    }

    pub fn all_by_step(&self) -> &IndexMap<usize, PathBuf> {
        &self.by_step
    }

    /// Whether a screenshot with this base name was recorded and is on disk
    pub fn exists(&self, base_name: &str) -> bool {
        self.path_for_base_name(base_name)
            .map(Path::exists)
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.by_step.is_empty()
    }
}

/// Place a requested screenshot path under `<artifacts_dir>/screenshot/`.
///
/// Paths already under `<artifacts_dir>/` are kept, a leading `screenshot/`
/// is re-rooted, anything else is nested under the screenshot directory.
/// `{input}` is replaced with the current input value (or `default`).
pub fn normalize_screenshot_path(artifacts_dir: &Path, requested: &str, input_tag: &str) -> PathBuf {
    let tag = if input_tag.is_empty() { "default" } else { input_tag };
    let requested = requested.replace(INPUT_PLACEHOLDER, tag);
    let root = artifacts_dir.to_string_lossy().trim_end_matches('/').to_string();

    if requested.starts_with(&format!("{}/", root)) {
        return PathBuf::from(requested);
    }

    let screenshots = artifacts_dir.join(SCREENSHOT_DIR);
    match requested.strip_prefix("screenshot/") {
        Some(rest) => screenshots.join(rest),
        None => screenshots.join(requested.trim_start_matches('/')),
    }
}

fn image_base_name(requested: &str) -> Option<String> {
    let path = Path::new(requested);
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    if extension != "png" && extension != "jpg" {
        return None;
    }
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_paths() {
        let root = Path::new("test-results");
        assert_eq!(
            normalize_screenshot_path(root, "login.png", ""),
            PathBuf::from("test-results/screenshot/login.png")
        );
        assert_eq!(
            normalize_screenshot_path(root, "screenshot/search/a.png", ""),
            PathBuf::from("test-results/screenshot/search/a.png")
        );
        assert_eq!(
            normalize_screenshot_path(root, "test-results/custom/b.png", ""),
            PathBuf::from("test-results/custom/b.png")
        );
    }

    #[test]
    fn test_input_placeholder() {
        let root = Path::new("out");
        assert_eq!(
            normalize_screenshot_path(root, "search_{input}.png", "alice"),
            PathBuf::from("out/screenshot/search_alice.png")
        );
        assert_eq!(
            normalize_screenshot_path(root, "search_{input}.png", ""),
            PathBuf::from("out/screenshot/search_default.png")
        );
    }

    #[test]
    fn test_registry_lookups() {
        let mut registry = ScreenshotRegistry::new();
        registry.record(2, "import01.png", PathBuf::from("test-results/screenshot/import01.png"));
        registry.record(5, "final", PathBuf::from("test-results/screenshot/final"));

        assert_eq!(
            registry.path_for_step(2),
            Some(Path::new("test-results/screenshot/import01.png"))
        );
        assert_eq!(
            registry.path_for_base_name("import01"),
            Some(Path::new("test-results/screenshot/import01.png"))
        );
        assert_eq!(
            registry.path_for_base_name("final"),
            Some(Path::new("test-results/screenshot/final"))
        );
        assert_eq!(registry.latest(), Some(Path::new("test-results/screenshot/final")));
        assert_eq!(registry.all_by_step().len(), 2);
        assert!(registry.path_for_base_name("missing").is_none());
    }

    #[test]
    fn test_exists_checks_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        std::fs::write(&path, b"png").unwrap();

        let mut registry = ScreenshotRegistry::new();
        registry.record(1, "shot.png", path);
        assert!(registry.exists("shot"));

        registry.record(2, "gone.png", dir.path().join("gone.png"));
        assert!(!registry.exists("gone"));
    }
}
