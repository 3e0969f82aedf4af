//! Read-only view over a materialized repository file tree.
//!
//! Views produced by the hub fetchers own the temporary directory they point
//! into; dropping the view removes the files.

use crate::error::FetchError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

#[derive(Debug)]
pub struct RepoView {
    root: PathBuf,
    _guard: Option<TempDir>,
}

impl RepoView {
    /// View over an existing directory that outlives the view.
    pub fn borrowed(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            _guard: None,
        }
    }

    /// View over a temporary directory, removed when the view drops.
    pub fn owned(dir: TempDir) -> Self {
        Self {
            root: dir.path().to_path_buf(),
            _guard: Some(dir),
        }
    }

    /// View rooted at a subdirectory of a temporary directory.
    pub fn owned_at(dir: TempDir, root: PathBuf) -> Self {
        Self {
            root,
            _guard: Some(dir),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.root.join(rel).exists()
    }

    pub fn read_text(&self, rel: &str) -> Result<String, FetchError> {
        let path = self.root.join(rel);
        if !path.is_file() {
            return Err(FetchError::MissingFile {
                path: PathBuf::from(rel),
            });
        }
        let bytes = std::fs::read(&path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn read_json(&self, rel: &str) -> Result<serde_json::Value, FetchError> {
        Ok(serde_json::from_str(&self.read_text(rel)?)?)
    }

    /// Files matching a glob, as paths relative to the root, sorted.
    ///
    /// `*` does not cross directory boundaries, so `*.bin` only matches
    /// top-level files; use `**/*.bin` to search recursively.
    pub fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>, FetchError> {
        let matcher = globset::GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| FetchError::Pattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?
            .compile_matcher();
        Ok(self
            .files()
            .into_iter()
            .filter(|rel| matcher.is_match(rel))
            .collect())
    }

    /// Every regular file under the root (skipping `.git`), relative and sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.path().strip_prefix(&self.root).ok().map(Path::to_path_buf))
            .collect();
        out.sort();
        out
    }

    pub fn size_bytes(&self, rel: impl AsRef<Path>) -> Result<u64, FetchError> {
        Ok(std::fs::metadata(self.root.join(rel))?.len())
    }

    /// First existing README variant, if any.
    pub fn readme(&self) -> Option<String> {
        ["README.md", "README.rst", "README.txt", "README", "readme.md"]
            .iter()
            .find_map(|name| self.read_text(name).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fixture() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.md"), "# Model\nhello").unwrap();
        std::fs::write(dir.path().join("config.json"), r#"{"hidden_size": 8}"#).unwrap();
        std::fs::write(dir.path().join("pytorch_model.bin"), vec![0u8; 64]).unwrap();
        std::fs::create_dir_all(dir.path().join("onnx")).unwrap();
        std::fs::write(dir.path().join("onnx/model.bin"), vec![0u8; 16]).unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/HEAD"), "ref").unwrap();
        dir
    }

    #[test]
    fn test_read_helpers() {
        let view = RepoView::owned(fixture());
        assert!(view.exists("README.md"));
        assert!(!view.exists("missing.txt"));
        assert!(view.read_text("README.md").unwrap().starts_with("# Model"));
        assert_eq!(view.read_json("config.json").unwrap()["hidden_size"], 8);
        assert_eq!(view.size_bytes("pytorch_model.bin").unwrap(), 64);
        assert!(matches!(
            view.read_text("nope.md"),
            Err(FetchError::MissingFile { .. })
        ));
        assert!(view.readme().is_some());
    }

    #[test]
    fn test_glob_is_top_level_for_single_star() {
        let view = RepoView::owned(fixture());
        assert_eq!(view.glob("*.bin").unwrap(), vec![PathBuf::from("pytorch_model.bin")]);
        assert_eq!(view.glob("**/*.bin").unwrap().len(), 2);
        assert!(view.glob("[").is_err());
    }

    #[test]
    fn test_files_skip_git_dir() {
        let view = RepoView::owned(fixture());
        let files = view.files();
        assert_eq!(files.len(), 4);
        assert!(files.iter().all(|f| !f.starts_with(".git")));
    }

    #[test]
    fn test_owned_view_removes_dir_on_drop() {
        let dir = fixture();
        let root = dir.path().to_path_buf();
        let view = RepoView::owned(dir);
        assert!(root.exists());
        drop(view);
        assert!(!root.exists());
    }
}
