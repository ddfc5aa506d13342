//! Reading manifest inputs from a file or a directory tree.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

/// A file read from an input tree, with its path relative to the input root
#[derive(Debug, Clone)]
pub struct ManifestFile {
    pub relative_path: PathBuf,
    pub content: ManifestContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestContent {
    Text(String),
    /// Not UTF-8 (packaged subcharts and the like), copied through unchanged
    Binary(Vec<u8>),
}

impl ManifestContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ManifestContent::Text(text) => Some(text.as_str()),
            ManifestContent::Binary(_) => None,
        }
    }
}

/// Read a single manifest file, rejecting directories
pub fn read_manifest_file(path: &Path) -> Result<String> {
    if path.is_dir() {
        anyhow::bail!(
            "infile must be a path to a file, not a directory: {}",
            path.display()
        );
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Read every file below `root`, recursing into subdirectories
pub fn read_manifest_tree(root: &Path) -> Result<Vec<ManifestFile>> {
    if !root.is_dir() {
        anyhow::bail!("Input directory does not exist: {}", root.display());
    }

    let mut files = Vec::new();
    collect(root, Path::new(""), &mut files)?;
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(files)
}

fn collect(root: &Path, relative: &Path, files: &mut Vec<ManifestFile>) -> Result<()> {
    let dir = root.join(relative);
    for entry in std::fs::read_dir(&dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let entry_relative = relative.join(entry.file_name());
        let entry_path = entry.path();

        if entry_path.is_dir() {
            collect(root, &entry_relative, files)?;
        } else if entry_path.is_file() {
            let bytes = std::fs::read(&entry_path)
                .with_context(|| format!("Failed to read file: {}", entry_path.display()))?;
            let content = match String::from_utf8(bytes) {
                Ok(text) => ManifestContent::Text(text),
                Err(e) => {
                    warn!(
                        "{} is not UTF-8 text, copying it unchanged",
                        entry_path.display()
                    );
                    ManifestContent::Binary(e.into_bytes())
                }
            };
            files.push(ManifestFile {
                relative_path: entry_relative,
                content,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_read_manifest_file_rejects_directory() {
        let dir = tempdir().unwrap();
        let result = read_manifest_file(dir.path());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("not a directory"));
    }

    #[test]
    fn test_read_manifest_tree_recurses() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("charts/redis")).unwrap();
        fs::write(dir.path().join("values.yaml"), "image: app").unwrap();
        fs::write(dir.path().join("charts/redis/values.yaml"), "image: redis").unwrap();

        let files = read_manifest_tree(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(
            files[0].relative_path,
            PathBuf::from("charts").join("redis").join("values.yaml")
        );
        assert_eq!(files[0].content.as_text(), Some("image: redis"));
        assert_eq!(files[1].relative_path, PathBuf::from("values.yaml"));
    }

    #[test]
    fn test_read_manifest_tree_keeps_binary_files() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("charts")).unwrap();
        fs::write(dir.path().join("values.yaml"), "image: app").unwrap();
        let archive: [u8; 6] = [0x1f, 0x8b, 0x08, 0x00, 0xff, 0xfe];
        fs::write(dir.path().join("charts/redis-17.0.0.tgz"), archive).unwrap();

        let files = read_manifest_tree(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].relative_path, PathBuf::from("charts").join("redis-17.0.0.tgz"));
        assert_eq!(files[0].content, ManifestContent::Binary(archive.to_vec()));
        assert_eq!(files[1].content.as_text(), Some("image: app"));
    }

    #[test]
    fn test_read_manifest_tree_nonexistent_path() {
        let path = PathBuf::from("/nonexistent/path/that/does/not/exist");
        let result = read_manifest_tree(&path);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("does not exist"));
    }
}
