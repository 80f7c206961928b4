//! The lazy settings facade.
//!
//! [`LazySettings`] parses configuration definitions and touches the storage
//! only when a value is first needed. Reads go through three layers, highest
//! first:
//!
//! ```text
//! Override data        stored values, staged writes
//!        ↓ falls back to
//! Host settings        Framework::settings()
//!        ↓ falls back to
//! Declared default     `default` in the definition file
//! ```
//!
//! A facade that was never configured configures itself from
//! [`Options::detect`] on first use.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::backend::{Backend, Storage};
use crate::container::{Entry, SettingsContainer};
use crate::error::{SetmanError, ValidationError};
use crate::field::FieldSpec;
use crate::framework::{Framework, PROJECT_KEY};
use crate::invalidation::{InvalidationChannel, LocalChannel};
use crate::ops::Report;
use crate::options::Options;
use crate::parsing::parse_configs;
use crate::types::{Action, SearchPath};
use crate::value::{Data, Value};

fn full_name(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) => format!("{ns}.{name}"),
        None => name.to_string(),
    }
}

struct State {
    framework: Arc<dyn Framework>,
    container: Arc<SettingsContainer>,
    backend: Backend,
}

impl State {
    fn new(
        framework: Arc<dyn Framework>,
        storage: Box<dyn Storage>,
        channel: Arc<dyn InvalidationChannel>,
    ) -> Self {
        let container = Arc::new(parse_configs(framework.as_ref()));
        debug!("Found {} available setting(s)", container.len());
        let backend = Backend::with_channel(storage, container.clone(), channel);
        State {
            framework,
            container,
            backend,
        }
    }

    fn lookup(&mut self, namespace: Option<&str>, name: &str) -> Result<Value, SetmanError> {
        let data = self.backend.data()?;
        let staged = match namespace {
            Some(ns) => data.get(ns).and_then(Value::as_map).and_then(|m| m.get(name)),
            None => data.get(name).filter(|value| value.as_map().is_none()),
        };
        if let Some(value) = staged {
            return Ok(value.clone());
        }

        let full_name = full_name(namespace, name);
        if let Some(value) = self.framework.settings().get(&full_name) {
            return Ok(value);
        }

        let declared = match namespace {
            Some(ns) => self.container.namespace(ns).and_then(|c| c.get(name)),
            None => self.container.get(name),
        };
        match declared {
            Some(Entry::Setting(setting)) => Ok(setting.default_value().clone()),
            Some(Entry::Namespace(_)) => Err(SetmanError::SettingDoesNotExist(format!(
                "{name} (a namespace, use namespace(\"{name}\"))"
            ))),
            None => Err(SetmanError::SettingDoesNotExist(full_name)),
        }
    }

    /// Write `value` to the host settings when they define the name, stage
    /// it otherwise.
    fn write(&mut self, namespace: Option<&str>, name: &str, value: Value) -> Result<(), SetmanError> {
        let full_name = full_name(namespace, name);
        let host = self.framework.settings();
        if host.contains(&full_name) {
            if !host.set(&full_name, value) {
                warn!("Host settings refused a new value for {full_name}");
            }
            return Ok(());
        }
        self.stage(namespace, name, Some(value))
    }

    /// Stage `value` in a working copy of the override data.
    fn stage(
        &mut self,
        namespace: Option<&str>,
        name: &str,
        value: Option<Value>,
    ) -> Result<(), SetmanError> {
        let mut data = self.backend.data()?.clone();
        let target = match namespace {
            Some(ns) => {
                let entry = data
                    .entry(ns.to_string())
                    .or_insert_with(|| Value::Map(Data::new()));
                if entry.as_map().is_none() {
                    *entry = Value::Map(Data::new());
                }
                match entry {
                    Value::Map(map) => map,
                    _ => return Ok(()),
                }
            }
            None => &mut data,
        };
        match value {
            Some(value) => {
                target.insert(name.to_string(), value);
            }
            None => {
                target.remove(name);
            }
        }
        self.backend.set_data(data);
        Ok(())
    }
}

/// Lazily configured settings facade. Safe to share between threads.
#[derive(Default)]
pub struct LazySettings {
    state: Mutex<Option<State>>,
}

impl LazySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure from `options`; relative paths resolve against the working
    /// directory.
    pub fn configure(&self, options: &Options) -> Result<(), SetmanError> {
        self.configure_in(options, vec![SearchPath::Cwd])
    }

    /// Configure from `options`; relative paths resolve against `search_paths`.
    pub fn configure_in(
        &self,
        options: &Options,
        search_paths: Vec<SearchPath>,
    ) -> Result<(), SetmanError> {
        let framework = options.build_framework(search_paths.clone())?;
        let storage = options.build_storage(&framework, &search_paths)?;
        self.configure_with(Arc::new(framework), storage)
    }

    pub fn configure_with(
        &self,
        framework: Arc<dyn Framework>,
        storage: Box<dyn Storage>,
    ) -> Result<(), SetmanError> {
        self.configure_with_channel(framework, storage, Arc::new(LocalChannel::new()))
    }

    /// Configure with an invalidation channel shared with other facades.
    pub fn configure_with_channel(
        &self,
        framework: Arc<dyn Framework>,
        storage: Box<dyn Storage>,
        channel: Arc<dyn InvalidationChannel>,
    ) -> Result<(), SetmanError> {
        let mut state = self.state.lock();
        if state.is_some() {
            return Err(SetmanError::ImproperlyConfigured(
                "Settings are already configured.".into(),
            ));
        }
        *state = Some(State::new(framework, storage, channel));
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.state.lock().is_some()
    }

    fn auto_configure() -> Result<State, SetmanError> {
        let detected = Options::detect()?;
        let framework = detected.options.build_framework(detected.search_paths.clone())?;

        let project_exists = framework
            .find_settings_files()
            .iter()
            .any(|(key, path)| key == PROJECT_KEY && path.is_file());
        if !project_exists {
            return Err(SetmanError::ImproperlyConfigured(
                "Settings are not configured and no project settings file was found. \
                 Call configure() first."
                    .into(),
            ));
        }

        let storage = detected
            .options
            .build_storage(&framework, &detected.search_paths)?;
        Ok(State::new(
            Arc::new(framework),
            storage,
            Arc::new(LocalChannel::new()),
        ))
    }

    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut State) -> Result<T, SetmanError>,
    ) -> Result<T, SetmanError> {
        let mut guard = self.state.lock();
        if guard.is_none() {
            *guard = Some(Self::auto_configure()?);
        }
        match guard.as_mut() {
            Some(state) => f(state),
            None => Err(SetmanError::ImproperlyConfigured(
                "Settings are not configured.".into(),
            )),
        }
    }

    pub fn framework(&self) -> Result<Arc<dyn Framework>, SetmanError> {
        self.with_state(|state| Ok(state.framework.clone()))
    }

    /// Every declared setting, namespaces nested.
    pub fn available_settings(&self) -> Result<Arc<SettingsContainer>, SetmanError> {
        self.with_state(|state| Ok(state.container.clone()))
    }

    /// Current value of a project-level setting.
    pub fn resolve(&self, name: &str) -> Result<Value, SetmanError> {
        self.with_state(|state| state.lookup(None, name))
    }

    /// Scoped access to the settings of one namespace.
    pub fn namespace(&self, name: &str) -> Result<Namespace<'_>, SetmanError> {
        self.with_state(|state| match state.container.namespace(name) {
            Some(_) => Ok(()),
            None => Err(SetmanError::SettingDoesNotExist(name.to_string())),
        })?;
        Ok(Namespace {
            settings: self,
            name: name.to_string(),
        })
    }

    /// `resolve(name)`, falling back to `default` when given and the setting
    /// does not exist.
    pub fn get_config(&self, name: &str, default: Option<Value>) -> Result<Value, SetmanError> {
        match (self.resolve(name), default) {
            (Err(SetmanError::SettingDoesNotExist(_)), Some(default)) => Ok(default),
            (result, _) => result,
        }
    }

    /// Set a project-level value. Names the host defines are written to the
    /// host settings; everything else is staged until [`save`](Self::save).
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<(), SetmanError> {
        let value = value.into();
        self.with_state(|state| state.write(None, name, value))
    }

    /// Drop the staged value of `name` so reads fall back to host settings
    /// and the declared default.
    pub fn delete(&self, name: &str) -> Result<(), SetmanError> {
        self.with_state(|state| state.stage(None, name, None))
    }

    /// Validate staged values. The first failure is kept as [`error`](Self::error).
    pub fn is_valid(&self) -> Result<bool, SetmanError> {
        self.with_state(|state| state.backend.is_valid())
    }

    pub fn error(&self) -> Option<ValidationError> {
        self.state
            .lock()
            .as_ref()
            .and_then(|state| state.backend.error().cloned())
    }

    pub fn save(&self) -> Result<(), SetmanError> {
        self.with_state(|state| state.backend.save())
    }

    /// Store and save every declared default.
    pub fn revert(&self) -> Result<Data, SetmanError> {
        self.with_state(|state| state.backend.revert(None))
    }

    /// Drop cached override data and any cached validation error.
    pub fn clear(&self) {
        if let Some(state) = self.state.lock().as_mut() {
            state.backend.clear();
        }
    }

    /// Apply submitted form values, keyed by field name, then save.
    pub fn save_form_fields(&self, data: Data) -> Result<(), SetmanError> {
        let separator = self.framework()?.field_separator().to_string();
        for (key, value) in data {
            match key.split_once(separator.as_str()) {
                Some((app_name, name)) => self.namespace(app_name)?.set(name, value)?,
                None => self.set(&key, value)?,
            }
        }
        self.save()
    }

    /// Form fields for every declared setting, initialised with current values.
    pub fn form_fields(&self) -> Result<Vec<FieldSpec>, SetmanError> {
        self.with_state(|state| {
            let data = state.backend.data()?.clone();
            let host = state.framework.settings();
            let initial = |setting: &crate::setting::Setting| {
                let staged = match setting.app_name() {
                    Some(ns) => data
                        .get(ns)
                        .and_then(Value::as_map)
                        .and_then(|m| m.get(setting.name())),
                    None => data.get(setting.name()),
                };
                staged
                    .cloned()
                    .or_else(|| host.get(&setting.full_name()))
                    .unwrap_or_else(|| setting.default_value().clone())
            };
            state.framework.build_form_fields(&state.container, &initial)
        })
    }

    /// Run a diagnostic action.
    pub fn handle(&self, action: &Action) -> Result<Report, SetmanError> {
        match action {
            Action::Check {
                default_values,
                verbosity,
            } => {
                let container = self.available_settings()?;
                let mut report = Report::new(&container, *verbosity);
                if *default_values {
                    self.revert()?;
                    report.defaults_stored = true;
                }
                Ok(report)
            }
        }
    }
}

impl std::fmt::Debug for LazySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        let mut s = f.debug_struct("LazySettings");
        s.field("configured", &state.is_some());
        if let Some(state) = state.as_ref() {
            s.field("framework", &state.framework)
                .field("backend", &state.backend);
        }
        s.finish()
    }
}

/// Settings of one namespace, borrowed from a [`LazySettings`].
#[derive(Debug)]
pub struct Namespace<'a> {
    settings: &'a LazySettings,
    name: String,
}

impl Namespace<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resolve(&self, name: &str) -> Result<Value, SetmanError> {
        self.settings
            .with_state(|state| state.lookup(Some(self.name.as_str()), name))
    }

    /// Set a value of this namespace. Host-defined names (`namespace.name`)
    /// are written to the host settings.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<(), SetmanError> {
        let value = value.into();
        self.settings
            .with_state(|state| state.write(Some(self.name.as_str()), name, value))
    }

    pub fn delete(&self, name: &str) -> Result<(), SetmanError> {
        self.settings
            .with_state(|state| state.stage(Some(self.name.as_str()), name, None))
    }

    /// Defaults of this namespace. Nothing is stored.
    pub fn revert(&self) -> Result<Data, SetmanError> {
        self.settings
            .with_state(|state| state.backend.revert(Some(self.name.as_str())))
    }
}

static SETTINGS: RwLock<Option<Arc<LazySettings>>> = RwLock::new(None);

/// Configure the process-wide settings from `options`.
pub fn init(options: &Options) -> Result<Arc<LazySettings>, SetmanError> {
    let mut slot = SETTINGS.write();
    if slot.is_some() {
        return Err(SetmanError::ImproperlyConfigured(
            "Settings are already configured; call reset() first.".into(),
        ));
    }
    let settings = Arc::new(LazySettings::new());
    settings.configure(options)?;
    *slot = Some(settings.clone());
    Ok(settings)
}

/// The process-wide settings. Configures itself on first use when
/// [`init`] was never called.
pub fn settings() -> Arc<LazySettings> {
    if let Some(settings) = SETTINGS.read().as_ref() {
        return settings.clone();
    }
    SETTINGS
        .write()
        .get_or_insert_with(|| Arc::new(LazySettings::new()))
        .clone()
}

/// Forget the process-wide settings.
pub fn reset() {
    SETTINGS.write().take();
}

/// Resolve `name` from the process-wide settings, falling back to
/// `default` when given.
pub fn get_config(name: &str, default: Option<Value>) -> Result<Value, SetmanError> {
    settings().get_config(name, default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use crate::backend::MemoryStorage;
    use crate::fixtures::test::{
        CORE_CFG, OVERRIDE_CFG, PROJECT_CFG, TESTAPP_CFG, Workspace, decimal, registry,
    };
    use crate::framework::{BaseFramework, HostSettings, MapHostSettings};

    fn framework(ws: &Workspace) -> BaseFramework {
        BaseFramework::new()
            .search_paths(vec![SearchPath::Path(ws.root().to_path_buf())])
            .with_registry(registry())
            .namespace_file("testapp", "testapp.cfg")
    }

    fn configured(ws: &Workspace, storage: MemoryStorage) -> LazySettings {
        let settings = LazySettings::new();
        settings
            .configure_with(Arc::new(framework(ws)), Box::new(storage))
            .unwrap();
        settings
    }

    fn project() -> Workspace {
        Workspace::new(&[("settings.cfg", PROJECT_CFG), ("testapp.cfg", TESTAPP_CFG)])
    }

    #[test]
    fn defaults_when_nothing_is_stored() {
        let ws = project();
        let settings = configured(&ws, MemoryStorage::new());
        assert_eq!(settings.resolve("max_processes").unwrap(), Value::Int(2));
        assert_eq!(settings.resolve("hourly_rate").unwrap(), decimal("15"));
        assert_eq!(
            settings.namespace("testapp").unwrap().resolve("debug").unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn configure_twice_fails() {
        let ws = project();
        let settings = configured(&ws, MemoryStorage::new());
        let err = settings
            .configure_with(Arc::new(framework(&ws)), Box::new(MemoryStorage::new()))
            .unwrap_err();
        assert!(matches!(err, SetmanError::ImproperlyConfigured(_)));
    }

    #[test]
    fn stored_values_win_and_are_coerced() {
        let ws = project();
        let mut stored = Data::new();
        stored.insert("max_processes".into(), Value::from("8"));
        let settings = configured(&ws, MemoryStorage::with_data(stored));
        assert_eq!(settings.resolve("max_processes").unwrap(), Value::Int(8));
    }

    #[test]
    fn host_settings_shadow_defaults_and_take_writes() {
        let ws = project();
        let mut values = Data::new();
        values.insert("DEBUG".into(), Value::Bool(true));
        values.insert("max_processes".into(), Value::Int(6));
        let host = Arc::new(MapHostSettings::with_values(values));
        let storage = MemoryStorage::new();
        let settings = LazySettings::new();
        settings
            .configure_with(
                Arc::new(framework(&ws).with_host_settings(host.clone())),
                Box::new(storage.clone()),
            )
            .unwrap();

        assert_eq!(settings.resolve("DEBUG").unwrap(), Value::Bool(true));
        assert_eq!(settings.resolve("max_processes").unwrap(), Value::Int(6));

        settings.set("DEBUG", false).unwrap();
        assert_eq!(host.get("DEBUG"), Some(Value::Bool(false)));
        settings.save().unwrap();
        assert!(!storage.read().unwrap().contains_key("DEBUG"));
    }

    #[test]
    fn namespace_writes_reach_host_settings() {
        let ws = project();
        let mut values = Data::new();
        values.insert("testapp.debug".into(), Value::Bool(false));
        let host = Arc::new(MapHostSettings::with_values(values));
        let storage = MemoryStorage::new();
        let settings = LazySettings::new();
        settings
            .configure_with(
                Arc::new(framework(&ws).with_host_settings(host.clone())),
                Box::new(storage.clone()),
            )
            .unwrap();

        let testapp = settings.namespace("testapp").unwrap();
        testapp.set("debug", true).unwrap();
        assert_eq!(host.get("testapp.debug"), Some(Value::Bool(true)));
        assert_eq!(testapp.resolve("debug").unwrap(), Value::Bool(true));

        settings.save().unwrap();
        assert!(!storage.read().unwrap().contains_key("testapp"));
    }

    #[test]
    fn unknown_names() {
        let ws = project();
        let settings = configured(&ws, MemoryStorage::new());
        assert!(matches!(
            settings.resolve("MAX_PROCESSES"),
            Err(SetmanError::SettingDoesNotExist(_))
        ));
        let err = settings.resolve("testapp").unwrap_err();
        assert!(err.to_string().contains("namespace(\"testapp\")"));
        assert!(matches!(
            settings.namespace("nope"),
            Err(SetmanError::SettingDoesNotExist(_))
        ));
        assert!(matches!(
            settings.namespace("testapp").unwrap().resolve("missing"),
            Err(SetmanError::SettingDoesNotExist(name)) if name == "testapp.missing"
        ));
    }

    #[test]
    fn get_config_falls_back_only_with_a_default() {
        let ws = project();
        let settings = configured(&ws, MemoryStorage::new());
        assert_eq!(
            settings.get_config("max_processes", Some(Value::Int(1))).unwrap(),
            Value::Int(2)
        );
        assert_eq!(
            settings.get_config("MISSING", Some(Value::from("x"))).unwrap(),
            Value::from("x")
        );
        assert!(settings.get_config("MISSING", None).is_err());
    }

    #[test]
    fn set_stages_until_save() {
        let ws = project();
        let storage = MemoryStorage::new();
        let settings = configured(&ws, storage.clone());

        settings.set("max_processes", "4").unwrap();
        settings.namespace("testapp").unwrap().set("debug", "yes").unwrap();
        assert_eq!(settings.resolve("max_processes").unwrap(), Value::Int(4));
        assert!(storage.read().unwrap().is_empty());

        settings.save().unwrap();
        let stored = storage.read().unwrap();
        assert_eq!(stored["max_processes"], Value::Int(4));
        assert_eq!(stored["testapp"].as_map().unwrap()["debug"], Value::Bool(true));
    }

    #[test]
    fn delete_falls_back_to_default() {
        let ws = project();
        let settings = configured(&ws, MemoryStorage::new());
        settings.set("max_processes", 4).unwrap();
        settings.delete("max_processes").unwrap();
        settings.delete("never_set").unwrap();
        assert_eq!(settings.resolve("max_processes").unwrap(), Value::Int(2));

        let testapp = settings.namespace("testapp").unwrap();
        testapp.set("debug", true).unwrap();
        testapp.delete("debug").unwrap();
        assert_eq!(testapp.resolve("debug").unwrap(), Value::Bool(false));
    }

    #[test]
    fn invalid_values_block_save() {
        let ws = Workspace::new(&[("settings.cfg", OVERRIDE_CFG), ("core.cfg", CORE_CFG)]);
        let storage = MemoryStorage::new();
        let settings = LazySettings::new();
        settings
            .configure_with(
                Arc::new(
                    BaseFramework::new()
                        .search_paths(vec![SearchPath::Path(ws.root().to_path_buf())])
                        .with_registry(registry())
                        .namespace_file("core", "core.cfg"),
                ),
                Box::new(storage.clone()),
            )
            .unwrap();

        settings.set("INT_SETTING", 40).unwrap();
        assert!(!settings.is_valid().unwrap());
        assert_eq!(
            settings.error().unwrap().message,
            "INT_SETTING: Ensure this value is less than or equal to 32."
        );
        assert!(matches!(settings.save(), Err(SetmanError::InvalidSettings(_))));
        assert!(storage.read().unwrap().is_empty());

        settings.clear();
        assert!(settings.error().is_none());
        assert_eq!(settings.resolve("INT_SETTING").unwrap(), Value::Int(24));
    }

    #[test]
    fn revert_stores_defaults_and_namespace_revert_does_not() {
        let ws = project();
        let storage = MemoryStorage::new();
        let settings = configured(&ws, storage.clone());

        let testapp = settings.namespace("testapp").unwrap().revert().unwrap();
        assert_eq!(testapp["debug"], Value::Bool(false));
        assert!(storage.read().unwrap().is_empty());

        settings.revert().unwrap();
        let stored = storage.read().unwrap();
        assert_eq!(stored["max_processes"], Value::Int(2));
        assert_eq!(stored["hosts_file"], Value::from("/etc/hosts"));
    }

    #[test]
    fn save_form_fields_splits_on_separator() {
        let ws = project();
        let storage = MemoryStorage::new();
        let settings = LazySettings::new();
        settings
            .configure_with(
                Arc::new(framework(&ws).with_field_separator("__")),
                Box::new(storage.clone()),
            )
            .unwrap();

        let mut form = Data::new();
        form.insert("max_processes".into(), Value::from("3"));
        form.insert("testapp__debug".into(), Value::from("on"));
        settings.save_form_fields(form).unwrap();

        let stored = storage.read().unwrap();
        assert_eq!(stored["max_processes"], Value::Int(3));
        assert_eq!(stored["testapp"].as_map().unwrap()["debug"], Value::Bool(true));
    }

    #[test]
    fn form_fields_carry_current_values() {
        let ws = project();
        let settings = LazySettings::new();
        settings
            .configure_with(
                Arc::new(
                    framework(&ws)
                        .with_field_kind("int", "IntegerField")
                        .with_field_kind("string", "TextField")
                        .with_field_kind("decimal", "DecimalField")
                        .with_field_kind("boolean", "BooleanField"),
                ),
                Box::new(MemoryStorage::new()),
            )
            .unwrap();
        settings.set("max_processes", 5).unwrap();

        let fields = settings.form_fields().unwrap();
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["testapp.debug", "max_processes", "hosts_file", "hourly_rate"]
        );
        assert_eq!(
            fields[1].get("initial"),
            Some(&crate::field::FieldArg::Value(Value::Int(5)))
        );
    }

    #[test]
    fn check_report_and_default_values() {
        let ws = project();
        let storage = MemoryStorage::new();
        let settings = configured(&ws, storage.clone());

        let report = settings
            .handle(&Action::Check {
                default_values: false,
                verbosity: 1,
            })
            .unwrap();
        assert_eq!(report.path.as_deref(), Some(ws.path("settings.cfg").as_path()));
        assert!(storage.read().unwrap().is_empty());

        let report = settings
            .handle(&Action::Check {
                default_values: true,
                verbosity: 0,
            })
            .unwrap();
        assert!(report.defaults_stored);
        assert_eq!(storage.read().unwrap()["max_processes"], Value::Int(2));
    }

    #[test]
    fn defaults_are_stored_with_required_settings_unset() {
        let ws = Workspace::new(&[(
            "settings.cfg",
            "[api_key]\ntype = string\n\n[workers]\ntype = int\ndefault = 2\n",
        )]);
        let storage = MemoryStorage::new();
        let settings = LazySettings::new();
        settings
            .configure_with(
                Arc::new(
                    BaseFramework::new()
                        .search_paths(vec![SearchPath::Path(ws.root().to_path_buf())]),
                ),
                Box::new(storage.clone()),
            )
            .unwrap();

        let report = settings
            .handle(&Action::Check {
                default_values: true,
                verbosity: 0,
            })
            .unwrap();
        assert!(report.defaults_stored);
        let stored = storage.read().unwrap();
        assert_eq!(stored["workers"], Value::Int(2));
        assert!(stored["api_key"].is_null());
        assert!(settings.resolve("api_key").unwrap().is_null());
    }

    #[test]
    fn configure_from_options() {
        let ws = Workspace::new(&[
            ("settings.cfg", PROJECT_CFG),
            ("testapp.cfg", TESTAPP_CFG),
        ]);
        let options = Options::parse(
            "backend = \"file\"\n[settings_files]\ntestapp = \"testapp.cfg\"\n\
             [file]\nfilename = \"settings.toml\"\nformat = \"toml\"\n",
            Path::new("setman.toml"),
        )
        .unwrap();
        let settings = LazySettings::new();
        settings
            .configure_in(&options, vec![SearchPath::Path(ws.root().to_path_buf())])
            .unwrap();

        settings.set("max_processes", 7).unwrap();
        settings.save().unwrap();
        let written = std::fs::read_to_string(ws.path("settings.toml")).unwrap();
        assert!(written.contains("max_processes = 7"));
    }

    #[test]
    fn facades_sharing_a_channel_see_saves() {
        let ws = project();
        let storage = MemoryStorage::new();
        let channel: Arc<dyn InvalidationChannel> = Arc::new(LocalChannel::new());
        let writer = LazySettings::new();
        let reader = LazySettings::new();
        for facade in [&writer, &reader] {
            facade
                .configure_with_channel(
                    Arc::new(framework(&ws)),
                    Box::new(storage.clone()),
                    channel.clone(),
                )
                .unwrap();
        }

        assert_eq!(reader.resolve("max_processes").unwrap(), Value::Int(2));
        writer.set("max_processes", 9).unwrap();
        writer.save().unwrap();
        assert_eq!(reader.resolve("max_processes").unwrap(), Value::Int(9));
    }
}
