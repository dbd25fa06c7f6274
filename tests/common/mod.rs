#![allow(dead_code)]

use std::{fs, path::{Path, PathBuf}};

use anyhow::Result;
use tempfile::TempDir;

/// A throwaway `projects/` + `blog/` content tree.
pub struct ContentTree {
    pub root: TempDir,
}

impl ContentTree {
    pub fn new() -> Result<Self> {
        let root = tempfile::tempdir()?;
        fs::create_dir_all(root.path().join("projects"))?;
        fs::create_dir_all(root.path().join("blog"))?;
        Ok(Self { root })
    }

    pub fn projects(&self) -> PathBuf {
        self.root.path().join("projects")
    }

    pub fn blog(&self) -> PathBuf {
        self.root.path().join("blog")
    }

    /// Write `contents` to `projects/<id>/<file>` and return its path.
    pub fn project_file(&self, id: &str, file: &str, contents: impl AsRef<[u8]>) -> Result<PathBuf> {
        write_in(&self.projects().join(id), file, contents)
    }

    pub fn post_file(&self, id: &str, file: &str, contents: impl AsRef<[u8]>) -> Result<PathBuf> {
        write_in(&self.blog().join(id), file, contents)
    }
}

fn write_in(dir: &Path, file: &str, contents: impl AsRef<[u8]>) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file);
    fs::write(&path, contents)?;
    Ok(path)
}
