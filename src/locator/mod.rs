//! Simulation unit discovery.
//!
//! A content item `<root>/<identifier>/` owns at most one simulation unit: a
//! file named `*_sim.<ext>`. When several match, the lexically smallest file
//! name wins so repeated lookups over the same tree agree.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    config::EngineConfig,
    content::{Category, ContentReference},
    error::LocateError,
};

pub const UNIT_SUFFIX: &str = "_sim";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationUnit {
    pub path: PathBuf,
    /// Display name derived from the file stem.
    pub identifier: String,
}

impl SimulationUnit {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let base = stem.strip_suffix(UNIT_SUFFIX).unwrap_or(&stem);
        Self { identifier: display_name(base), path }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }
}

#[derive(Debug, Clone)]
pub struct Locator {
    projects_dir: PathBuf,
    blog_dir: PathBuf,
    extensions: Vec<String>,
}

impl Locator {
    pub fn new(projects_dir: impl Into<PathBuf>, blog_dir: impl Into<PathBuf>) -> Self {
        Self {
            projects_dir: projects_dir.into(),
            blog_dir: blog_dir.into(),
            extensions: vec!["py".into()],
        }
    }

    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self::new(&cfg.projects_dir, &cfg.blog_dir).with_extensions(cfg.unit_extensions.clone())
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    pub fn base_dir(&self, category: Category) -> &Path {
        match category {
            Category::Project => &self.projects_dir,
            Category::Post => &self.blog_dir,
        }
    }

    pub fn content_dir(&self, reference: &ContentReference) -> PathBuf {
        self.base_dir(reference.category()).join(reference.identifier())
    }

    /// Resolve the unit for `reference`.
    ///
    /// Returns `Ok(None)` when the content path does not exist, is not a
    /// directory, or holds no matching file. A directory that exists but
    /// cannot be listed is a [`LocateError`].
    pub fn locate(&self, reference: &ContentReference) -> Result<Option<SimulationUnit>, LocateError> {
        if reference.looks_like_traversal() {
            warn!(reference = %reference, "identifier is used verbatim in a filesystem path");
        }
        let dir = self.content_dir(reference);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "content directory absent");
                return Ok(None);
            }
            Err(_) if dir.exists() && !dir.is_dir() => {
                debug!(dir = %dir.display(), "content path is not a directory");
                return Ok(None);
            }
            Err(source) => return Err(LocateError::Unreadable { path: dir, source }),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| LocateError::Unreadable { path: dir.clone(), source })?;
            if !entry.path().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.is_unit_name(&name) {
                names.push(name);
            }
        }
        names.sort();

        let found = names.into_iter().next().map(|n| SimulationUnit::from_path(dir.join(n)));
        match &found {
            Some(unit) => debug!(path = %unit.path.display(), "simulation unit located"),
            None => debug!(dir = %dir.display(), "no simulation unit in content directory"),
        }
        Ok(found)
    }

    fn is_unit_name(&self, name: &str) -> bool {
        let Some((stem, ext)) = name.rsplit_once('.') else {
            return false;
        };
        stem.ends_with(UNIT_SUFFIX)
            && self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// `orbit_decay` -> `Orbit Decay`
pub fn display_name(raw: &str) -> String {
    raw.split(['_', '-'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
