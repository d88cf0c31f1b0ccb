//! # Config - Dataset Description
//!
//! Describes which files make up a dataset and whether each of them must be
//! present. Every dataset file lives next to a common *base path*: the file
//! for suffix `.nbg_nodes` of base `data/region` is `data/region.nbg_nodes`.
//!
//! Files are split into two groups:
//!
//! - **static** files are produced once when the dataset is built;
//! - **updatable** files may be regenerated (e.g. new traffic weights)
//!   without rebuilding the static part.
//!
//! The allocator consumes both groups through the [`DatasetFiles`] trait and
//! does not care where the description came from.
//!
//! ## Configuration
//!
//! ```text
//! SHOAL_BASE_PATH   dataset base path   (default: "data/dataset")
//! ```

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable holding the dataset base path.
pub const BASE_PATH_ENV: &str = "SHOAL_BASE_PATH";

/// Base path used when [`BASE_PATH_ENV`] is unset.
pub const DEFAULT_BASE_PATH: &str = "data/dataset";

/// Suffix of the spatial-index file. It is not a container and is never
/// mapped; only its absolute path is published.
pub const FILE_INDEX_SUFFIX: &str = ".fileIndex";

const REQUIRED: bool = true;
const OPTIONAL: bool = false;

/// Static dataset files, in load order.
pub const DEFAULT_STATIC_FILES: &[(bool, &str)] = &[
    (OPTIONAL, ".cells"),
    (OPTIONAL, ".partition"),
    (REQUIRED, ".icd"),
    (REQUIRED, ".properties"),
    (REQUIRED, ".nbg_nodes"),
    (REQUIRED, ".ebg_nodes"),
    (REQUIRED, ".tls"),
    (REQUIRED, ".tld"),
    (REQUIRED, ".timestamp"),
    (REQUIRED, ".maneuver_overrides"),
    (REQUIRED, ".edges"),
    (REQUIRED, ".names"),
    (REQUIRED, ".ramIndex"),
];

/// Updatable dataset files, in load order.
pub const DEFAULT_UPDATABLE_FILES: &[(bool, &str)] = &[
    (OPTIONAL, ".mldgr"),
    (OPTIONAL, ".cell_metrics"),
    (OPTIONAL, ".hsgr"),
    (REQUIRED, ".datasource_names"),
    (REQUIRED, ".geometry"),
    (REQUIRED, ".turn_weight_penalties"),
    (REQUIRED, ".turn_duration_penalties"),
];

/// Reads a configuration value from the environment, falling back to `default`.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// One file participating in a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetFile {
    /// If `true`, a missing file aborts loading; otherwise it is skipped.
    pub required: bool,
    pub path: PathBuf,
}

impl DatasetFile {
    pub fn required<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            required: true,
            path: path.into(),
        }
    }

    pub fn optional<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            required: false,
            path: path.into(),
        }
    }
}

/// Source of the dataset file list.
pub trait DatasetFiles {
    /// Files produced once when the dataset is built.
    fn static_files(&self) -> Vec<DatasetFile>;

    /// Files that may be regenerated independently of the static ones.
    fn updatable_files(&self) -> Vec<DatasetFile>;

    /// Path of the spatial-index file (may be relative).
    fn file_index_path(&self) -> PathBuf;

    /// Static files followed by updatable files.
    fn all_files(&self) -> Vec<DatasetFile> {
        let mut files = self.static_files();
        files.extend(self.updatable_files());
        files
    }
}

/// Dataset description rooted at a base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    base_path: PathBuf,
    static_suffixes: Vec<(bool, String)>,
    updatable_suffixes: Vec<(bool, String)>,
}

impl StorageConfig {
    /// Creates a config for `base_path` with the default file lists.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            static_suffixes: to_owned_list(DEFAULT_STATIC_FILES),
            updatable_suffixes: to_owned_list(DEFAULT_UPDATABLE_FILES),
        }
    }

    /// Creates a config from [`BASE_PATH_ENV`], or [`DEFAULT_BASE_PATH`].
    pub fn from_env() -> Self {
        Self::new(env_or(BASE_PATH_ENV, DEFAULT_BASE_PATH))
    }

    /// Replaces the static file list with `(required, suffix)` pairs.
    #[must_use]
    pub fn with_static_files(mut self, files: &[(bool, &str)]) -> Self {
        self.static_suffixes = to_owned_list(files);
        self
    }

    /// Replaces the updatable file list with `(required, suffix)` pairs.
    #[must_use]
    pub fn with_updatable_files(mut self, files: &[(bool, &str)]) -> Self {
        self.updatable_suffixes = to_owned_list(files);
        self
    }

    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Returns `<base_path><suffix>`.
    #[must_use]
    pub fn get_path(&self, suffix: &str) -> PathBuf {
        let mut path: OsString = self.base_path.as_os_str().to_owned();
        path.push(suffix);
        PathBuf::from(path)
    }

    /// Returns every required file that does not exist on disk.
    ///
    /// # Errors
    ///
    /// Fails if existence cannot be determined (e.g. permission denied on a
    /// parent directory).
    pub fn missing_required_files(&self) -> io::Result<Vec<PathBuf>> {
        let mut missing = Vec::new();
        for file in self.all_files() {
            if file.required && !file.path.try_exists()? {
                missing.push(file.path);
            }
        }
        Ok(missing)
    }

    /// Returns `true` if every required file exists.
    pub fn is_valid(&self) -> io::Result<bool> {
        Ok(self.missing_required_files()?.is_empty())
    }

    fn expand(&self, suffixes: &[(bool, String)]) -> Vec<DatasetFile> {
        suffixes
            .iter()
            .map(|(required, suffix)| DatasetFile {
                required: *required,
                path: self.get_path(suffix),
            })
            .collect()
    }
}

impl DatasetFiles for StorageConfig {
    fn static_files(&self) -> Vec<DatasetFile> {
        self.expand(&self.static_suffixes)
    }

    fn updatable_files(&self) -> Vec<DatasetFile> {
        self.expand(&self.updatable_suffixes)
    }

    fn file_index_path(&self) -> PathBuf {
        self.get_path(FILE_INDEX_SUFFIX)
    }
}

fn to_owned_list(files: &[(bool, &str)]) -> Vec<(bool, String)> {
    files
        .iter()
        .map(|(required, suffix)| (*required, (*suffix).to_string()))
        .collect()
}
