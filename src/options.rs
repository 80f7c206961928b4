//! Options of the library itself: which files declare settings and where
//! override values are stored.
//!
//! Options come from `setman.toml` (strict: unknown keys are rejected) and
//! `SETMAN_*` environment variables, which take precedence over the file.
//!
//! ```toml
//! settings_file = "settings.cfg"
//! default_values_file = "defaults.cfg"
//! backend = "file"
//!
//! [settings_files]
//! testapp = "testapp/settings.cfg"
//!
//! [file]
//! filename = "var/settings.json"
//! format = "json"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use confique::Config;
use tracing::{debug, warn};

use crate::backend::{MemoryStorage, Storage};
use crate::error::SetmanError;
use crate::file::{expand_search_paths, load_first_match, resolve_relative};
use crate::filebased::{FileStorage, Format};
use crate::framework::{BaseFramework, Framework};
use crate::types::SearchPath;
use crate::validate::validate_unknown_keys;

/// File name looked up by [`Options::detect`].
pub const OPTIONS_FILE_NAME: &str = "setman.toml";

/// Directories searched for [`OPTIONS_FILE_NAME`], ascending priority.
pub fn default_search_paths() -> Vec<SearchPath> {
    vec![SearchPath::Platform, SearchPath::Cwd]
}

#[derive(Debug, Config)]
pub struct Options {
    /// Project configuration-definition file. `settings.cfg` when unset.
    #[config(env = "SETMAN_SETTINGS_FILE")]
    pub settings_file: Option<PathBuf>,

    /// Namespace name to its configuration-definition file.
    pub settings_files: Option<BTreeMap<String, PathBuf>>,

    /// Flat `name = value` file supplying defaults missing from definitions.
    #[config(env = "SETMAN_DEFAULT_VALUES_FILE")]
    pub default_values_file: Option<PathBuf>,

    /// `file` or `memory`. Unset means the framework's default storage.
    #[config(env = "SETMAN_BACKEND")]
    pub backend: Option<String>,

    /// Framework adapter. Only `base` ships with the library.
    #[config(default = "base")]
    pub framework: String,

    #[config(nested)]
    pub file: FileOptions,
}

#[derive(Debug, Config)]
pub struct FileOptions {
    /// Where the file backend keeps override values.
    #[config(env = "SETMAN_FILENAME")]
    pub filename: Option<PathBuf>,

    /// `ini`, `json`, `toml` or `msgpack`.
    #[config(env = "SETMAN_FORMAT", default = "json")]
    pub format: String,
}

/// Options found by [`Options::detect`], with the directories relative
/// paths in them resolve against.
#[derive(Debug)]
pub struct Detected {
    pub options: Options,
    pub search_paths: Vec<SearchPath>,
}

impl Options {
    /// Options from the environment alone.
    pub fn from_env() -> Result<Self, SetmanError> {
        Ok(Options::builder().env().load()?)
    }

    /// Options from TOML `content` plus the environment. `path` is used in
    /// error messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self, SetmanError> {
        validate_unknown_keys::<Options>(content, path)?;
        let layer: <Options as Config>::Layer =
            toml::from_str(content).map_err(|e| SetmanError::Deserialize {
                path: path.to_path_buf(),
                format: "toml".into(),
                reason: e.to_string(),
            })?;
        Ok(Options::builder().env().preloaded(layer).load()?)
    }

    pub fn load(path: &Path) -> Result<Self, SetmanError> {
        let content = std::fs::read_to_string(path).map_err(|e| SetmanError::io(path, e))?;
        Self::parse(&content, path)
    }

    /// Look for `setman.toml` in the default search paths. Relative paths
    /// in a found file resolve against its directory, otherwise against
    /// the working directory.
    pub fn detect() -> Result<Detected, SetmanError> {
        Self::detect_in(&default_search_paths())
    }

    pub fn detect_in(search_paths: &[SearchPath]) -> Result<Detected, SetmanError> {
        let dirs = expand_search_paths(search_paths, "setman");
        match load_first_match(&dirs, OPTIONS_FILE_NAME)? {
            Some((path, content)) => {
                debug!("Loading options from {}", path.display());
                let options = Self::parse(&content, &path)?;
                let base = path
                    .parent()
                    .map(|dir| SearchPath::Path(dir.to_path_buf()))
                    .unwrap_or(SearchPath::Cwd);
                Ok(Detected {
                    options,
                    search_paths: vec![base],
                })
            }
            None => Ok(Detected {
                options: Self::from_env()?,
                search_paths: vec![SearchPath::Cwd],
            }),
        }
    }

    /// The framework adapter these options describe.
    pub fn build_framework(&self, search_paths: Vec<SearchPath>) -> Result<BaseFramework, SetmanError> {
        if !self.framework.eq_ignore_ascii_case("base") {
            return Err(SetmanError::ImproperlyConfigured(format!(
                "Framework '{}' is not supported.",
                self.framework
            )));
        }

        let mut framework = BaseFramework::new().search_paths(search_paths);
        if let Some(path) = &self.settings_file {
            framework = framework.settings_file(path);
        }
        for (app_name, path) in self.settings_files.iter().flatten() {
            framework = framework.namespace_file(app_name, path);
        }
        if let Some(path) = &self.default_values_file {
            framework = framework.default_values_file(path);
        }
        Ok(framework)
    }

    /// Storage for override values. An unset backend falls back to the
    /// framework's default, then to the file backend when a file name is
    /// configured, then to memory.
    pub fn build_storage(
        &self,
        framework: &dyn Framework,
        search_paths: &[SearchPath],
    ) -> Result<Box<dyn Storage>, SetmanError> {
        match self.backend.as_deref().map(str::to_lowercase).as_deref() {
            Some("file") => self.file_storage(search_paths),
            Some("memory") => Ok(Box::new(MemoryStorage::new())),
            Some(other) => Err(SetmanError::ImproperlyConfigured(format!(
                "Backend '{other}' is not supported."
            ))),
            None => match framework.default_storage() {
                Some(storage) => Ok(storage),
                None if self.file.filename.is_some() => self.file_storage(search_paths),
                None => {
                    warn!("No settings backend configured, override values are kept in memory");
                    Ok(Box::new(MemoryStorage::new()))
                }
            },
        }
    }

    fn file_storage(&self, search_paths: &[SearchPath]) -> Result<Box<dyn Storage>, SetmanError> {
        let filename = self.file.filename.as_deref().ok_or_else(|| {
            SetmanError::ImproperlyConfigured("Please, supply `file.filename` option first.".into())
        })?;
        let format: Format = self.file.format.parse()?;
        let path = resolve_relative(filename, &expand_search_paths(search_paths, "setman"));
        Ok(Box::new(FileStorage::new(path, format)))
    }
}
