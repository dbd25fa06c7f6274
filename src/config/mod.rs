use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::PathBuf,
    time::Duration,
};

use directories::BaseDirs;

use crate::plot::canvas::MAX_DPI;

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
    read_env: bool,
}

impl Config {
    pub fn load() -> Self {
        let mut map = default_map();
        let config_path = default_config_path();

        // Read .simlabrc if exists
        if config_path.exists() {
            if let Ok(file) = fs::File::open(&config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().map_while(Result::ok) {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        map.insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
            }
        }

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map, config_path, read_env: true }
    }

    /// Defaults plus `overrides`, ignoring the rc file and the environment.
    pub fn from_pairs<I, K, V>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = default_map();
        for (k, v) in overrides {
            map.insert(k.into(), v.into());
        }
        Self { inner: map, config_path: default_config_path(), read_env: false }
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.inner.insert(key.to_string(), value.into());
        // An explicit set must win over a stale environment value.
        self.read_env = false;
    }

    pub fn get(&self, key: &str) -> Option<String> {
        // ENV first
        if self.read_env {
            if let Ok(v) = env::var(key) {
                return Some(v);
            }
        }
        self.inner.get(key).cloned()
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).filter(|v| !v.is_empty()).map(PathBuf::from)
    }

    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().trim_start_matches('.').to_ascii_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Typed view of the keys the engine reads.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub projects_dir: PathBuf,
    pub blog_dir: PathBuf,
    pub unit_extensions: Vec<String>,
    pub python: String,
    pub shell: String,
    pub figure_dpi: u32,
    pub timeout: Option<Duration>,
}

impl EngineConfig {
    pub fn from_config(cfg: &Config) -> Self {
        let dpi = cfg
            .get_u64("SIMLAB_FIGURE_DPI")
            .filter(|d| (1..=MAX_DPI as u64).contains(d))
            .unwrap_or(100) as u32;
        let timeout = cfg
            .get_u64("SIMLAB_TIMEOUT_SECS")
            .filter(|s| *s > 0)
            .map(Duration::from_secs);
        Self {
            projects_dir: cfg.get_path("SIMLAB_PROJECTS_DIR").unwrap_or_else(|| "projects".into()),
            blog_dir: cfg.get_path("SIMLAB_BLOG_DIR").unwrap_or_else(|| "blog".into()),
            unit_extensions: cfg.get_list("SIMLAB_UNIT_EXTENSIONS"),
            python: cfg.get("SIMLAB_PYTHON").unwrap_or_else(|| "python3".into()),
            shell: cfg.get("SIMLAB_SHELL").unwrap_or_else(|| "sh".into()),
            figure_dpi: dpi,
            timeout,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_config(&Config::from_pairs(std::iter::empty::<(String, String)>()))
    }
}

fn is_config_key(k: &str) -> bool {
    k.starts_with("SIMLAB_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("simlab").join(".simlabrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    // Content roots
    m.insert("SIMLAB_PROJECTS_DIR".into(), "projects".into());
    m.insert("SIMLAB_BLOG_DIR".into(), "blog".into());

    // Units
    m.insert("SIMLAB_UNIT_EXTENSIONS".into(), "py,sh".into());
    m.insert("SIMLAB_PYTHON".into(), "python3".into());
    m.insert("SIMLAB_SHELL".into(), "sh".into());

    // Numbers
    m.insert("SIMLAB_FIGURE_DPI".into(), "100".into());

    // Logging
    m.insert("SIMLAB_LOG".into(), "info".into());
    m.insert("SIMLAB_LOG_FORMAT".into(), "text".into());

    m
}
