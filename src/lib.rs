//! Layered, typed settings for applications whose users change settings at
//! runtime. Declare settings in INI files, store overrides anywhere, read
//! one merged, validated view.
//!
//! ```ignore
//! let settings = setman::init(&Options::load("setman.toml".as_ref())?)?;
//!
//! let workers = settings.resolve("max_processes")?;
//! let debug = settings.namespace("testapp")?.resolve("debug")?;
//!
//! settings.set("max_processes", 8)?;
//! settings.save()?;
//! ```
//!
//! # Configuration-definition files
//!
//! Every section of a definition file declares one setting:
//!
//! ```ini
//! [max_processes]
//! type = int
//! default = 2
//! min_value = 1
//! max_value = 16
//! label = Max processes
//! help_text = Maximum number of worker processes.
//! ```
//!
//! The project has one file (`settings.cfg` by default). Each application
//! namespace may have its own; its settings are read through
//! [`LazySettings::namespace`]. The project file can reconfigure a namespace
//! setting with a dotted section, `[testapp.debug]`, but never change its
//! `type`.
//!
//! Built-in types are `boolean`, `choice`, `decimal`, `float`, `int` and
//! `string`. Additional types implement [`SettingKind`] and are added to the
//! [`Registry`], which also holds the named validators and named choices a
//! definition file may refer to.
//!
//! A broken definition file is logged and skipped, never fatal: a host
//! application keeps running with the settings it could read.
//!
//! # Layer precedence
//!
//! ```text
//! Declared defaults     `default = ...` or the default-values file
//!        ↑ overridden by
//! Host settings         Framework::settings()
//!        ↑ overridden by
//! Override data         Storage (file, memory, or the framework's)
//! ```
//!
//! Override data is sparse and coerced through each setting's type on read.
//! Writes are staged until [`LazySettings::save`], which validates first and
//! refuses to persist anything invalid.
//!
//! # Storage
//!
//! [`FileStorage`] keeps override data as `json` (default), `toml`, `ini`
//! or `msgpack`. TOML writes keep the comments of an existing file.
//! [`MemoryStorage`] is for tests and applications that do not persist.
//! Facades that share a store share an [`InvalidationChannel`] so a save in
//! one drops the cache of the others.
//!
//! # Frameworks
//!
//! [`Framework`] is the seam to a host application: where definition files
//! live, the host's own settings, and how settings become form fields.
//! [`BaseFramework`] is the framework-less adapter configured from
//! [`Options`].
//!
//! # Options
//!
//! The library's own options come from `setman.toml` and `SETMAN_*`
//! environment variables (see [`Options`]). Unknown keys in `setman.toml`
//! are rejected with their line numbers.
//!
//! # Clap adapter
//!
//! The `cli` module (behind the `clap` feature, on by default) offers
//! [`CheckArgs`], a `check` subcommand that lists declared settings and can
//! store their defaults. It converts into an [`Action`] for
//! [`LazySettings::handle`].
//!
//! # Error handling
//!
//! Fallible operations return [`SetmanError`]. Validation failures are
//! [`ValidationError`]s, prefixed with the setting's full name when they come
//! from [`LazySettings::is_valid`].

pub mod error;
pub mod ini;
pub mod types;

mod backend;
mod choices;
#[cfg(feature = "clap")]
mod cli;
mod container;
mod decimal;
mod field;
mod file;
mod filebased;
mod framework;
mod invalidation;
mod kinds;
mod lazy;
mod options;
mod ops;
mod parsing;
mod persist;
mod registry;
mod setting;
mod validate;
mod validators;
mod value;

#[cfg(test)]
mod fixtures;

pub use backend::{Backend, MemoryStorage, Storage};
pub use choices::{Choice, parse_choices};
#[cfg(feature = "clap")]
pub use cli::CheckArgs;
pub use container::{Entry, SettingsContainer};
pub use decimal::Decimal;
pub use error::{SetmanError, ValidationError};
pub use field::{FieldArg, FieldKwargs, FieldSpec, TranslationTable, translate};
pub use filebased::{FileStorage, Format};
pub use framework::{
    BaseFramework, DEFAULT_SETTINGS_FILENAME, Framework, HostSettings, MapHostSettings, PROJECT_KEY,
};
pub use invalidation::{FileChannel, InvalidationChannel, LocalChannel, Subscription};
pub use kinds::{BooleanKind, ChoiceKind, DecimalKind, FloatKind, IntKind, StringKind};
pub use lazy::{LazySettings, Namespace, get_config, init, reset, settings};
pub use ops::{Report, ReportEntry};
pub use options::{Detected, FileOptions, OPTIONS_FILE_NAME, Options};
pub use parsing::{data_to_setting, parse_config, parse_configs};
pub use registry::Registry;
pub use setting::{Fields, Setting, SettingKind, force_bool};
pub use types::{Action, Boundary, SearchPath};
pub use validators::Validator;
pub use value::{Data, Value};
