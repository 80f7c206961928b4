//! The seam between the engine and a host application framework.
//!
//! A [`Framework`] tells the parser where configuration-definition files
//! live, which setting types exist, and exposes the host's own settings. It
//! also turns settings into [`FieldSpec`]s for whatever UI layer the host
//! uses. [`BaseFramework`] is the framework-less implementation.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::backend::Storage;
use crate::container::{Entry, SettingsContainer};
use crate::error::SetmanError;
use crate::field::{FieldSpec, TranslationTable, translate};
use crate::file::{expand_search_paths, resolve_relative};
use crate::registry::Registry;
use crate::setting::Setting;
use crate::types::SearchPath;
use crate::value::{Data, Value};

/// Key of the project-level file in [`Framework::find_settings_files`].
pub const PROJECT_KEY: &str = "__project__";

/// File name of the project configuration-definition file.
pub const DEFAULT_SETTINGS_FILENAME: &str = "settings.cfg";

/// Settings owned by the host application. They shadow declared defaults
/// and receive writes for names they define.
pub trait HostSettings: Send + Sync + fmt::Debug {
    fn get(&self, name: &str) -> Option<Value>;

    /// Store `value` under `name`; false when the host refuses it.
    fn set(&self, name: &str, value: Value) -> bool;

    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// Host settings backed by a map.
#[derive(Debug, Default)]
pub struct MapHostSettings {
    values: RwLock<Data>,
}

impl MapHostSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: Data) -> Self {
        MapHostSettings {
            values: RwLock::new(values),
        }
    }
}

impl HostSettings for MapHostSettings {
    fn get(&self, name: &str) -> Option<Value> {
        self.values.read().get(name).cloned()
    }

    fn set(&self, name: &str, value: Value) -> bool {
        self.values.write().insert(name.to_string(), value);
        true
    }
}

pub trait Framework: Send + Sync + fmt::Debug {
    /// Namespace name to configuration-definition file, including the
    /// [`PROJECT_KEY`] entry. Namespaces are parsed in this order.
    fn find_settings_files(&self) -> Vec<(String, PathBuf)>;

    fn find_default_values_file(&self) -> Option<PathBuf> {
        None
    }

    /// Setting types, named validators and named choices.
    fn registry(&self) -> Arc<Registry>;

    fn settings(&self) -> &dyn HostSettings;

    /// Storage used when none was configured explicitly.
    fn default_storage(&self) -> Option<Box<dyn Storage>> {
        None
    }

    /// Whether the caller described by `context` may edit settings through a
    /// UI. Everyone may unless a framework restricts it.
    fn auth_permitted(&self, _context: &dyn Any) -> bool {
        true
    }

    /// Joins namespace and setting name in field names.
    fn field_separator(&self) -> &str {
        "."
    }

    /// Toolkit field kind for a setting type.
    fn field_kind(&self, _type_name: &str) -> Option<String> {
        None
    }

    fn translation_table(&self) -> TranslationTable {
        TranslationTable::identity()
    }

    /// Describe the form field for `setting`, initialised with `initial`.
    fn setting_to_field(&self, setting: &Setting, initial: Value) -> Result<FieldSpec, SetmanError> {
        let kind = self.field_kind(setting.type_name()).ok_or_else(|| {
            SetmanError::ImproperlyConfigured(format!(
                "no field kind for '{}' settings",
                setting.type_name()
            ))
        })?;
        let kwargs = setting
            .field_kwargs(initial)
            .into_iter()
            .map(|(key, arg)| (key.to_string(), arg))
            .collect();
        let name = match setting.app_name() {
            Some(app) => format!("{app}{}{}", self.field_separator(), setting.name()),
            None => setting.name().to_string(),
        };
        Ok(FieldSpec {
            name,
            app_name: setting.app_name().map(str::to_string),
            kind,
            kwargs: translate(kwargs, &self.translation_table()),
        })
    }

    /// Fields for every setting in `container`, namespaces flattened.
    /// `initial` supplies each field's current value.
    fn build_form_fields(
        &self,
        container: &SettingsContainer,
        initial: &dyn Fn(&Setting) -> Value,
    ) -> Result<Vec<FieldSpec>, SetmanError> {
        let mut fields = Vec::new();
        for entry in container {
            match entry {
                Entry::Setting(setting) => {
                    fields.push(self.setting_to_field(setting, initial(setting))?)
                }
                Entry::Namespace(namespace) => {
                    fields.extend(self.build_form_fields(namespace, initial)?)
                }
            }
        }
        Ok(fields)
    }
}

/// Framework-less adapter: settings files come from explicit paths, relative
/// ones resolved against the search paths.
#[derive(Debug)]
pub struct BaseFramework {
    settings_file: Option<PathBuf>,
    settings_files: Vec<(String, PathBuf)>,
    default_values_file: Option<PathBuf>,
    search_paths: Vec<SearchPath>,
    registry: Arc<Registry>,
    host: Arc<dyn HostSettings>,
    field_kinds: BTreeMap<String, String>,
    separator: String,
    translation: TranslationTable,
}

impl Default for BaseFramework {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseFramework {
    pub fn new() -> Self {
        BaseFramework {
            settings_file: None,
            settings_files: Vec::new(),
            default_values_file: None,
            search_paths: vec![SearchPath::Cwd],
            registry: Arc::new(Registry::new()),
            host: Arc::new(MapHostSettings::new()),
            field_kinds: BTreeMap::new(),
            separator: ".".into(),
            translation: TranslationTable::identity(),
        }
    }

    /// Project configuration-definition file; `settings.cfg` when unset.
    pub fn settings_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_file = Some(path.into());
        self
    }

    /// Configuration-definition file of namespace `app_name`.
    pub fn namespace_file(mut self, app_name: &str, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match self.settings_files.iter_mut().find(|(name, _)| name == app_name) {
            Some((_, existing)) => *existing = path,
            None => self.settings_files.push((app_name.to_string(), path)),
        }
        self
    }

    pub fn default_values_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_values_file = Some(path.into());
        self
    }

    /// Directories searched for relative paths, ascending priority.
    pub fn search_paths(mut self, paths: Vec<SearchPath>) -> Self {
        self.search_paths = paths;
        self
    }

    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_host_settings(mut self, host: Arc<dyn HostSettings>) -> Self {
        self.host = host;
        self
    }

    pub fn with_field_kind(mut self, type_name: &str, kind: &str) -> Self {
        self.field_kinds.insert(type_name.to_lowercase(), kind.to_string());
        self
    }

    pub fn with_field_separator(mut self, separator: &str) -> Self {
        self.separator = separator.to_string();
        self
    }

    pub fn with_translation_table(mut self, table: TranslationTable) -> Self {
        self.translation = table;
        self
    }

    fn resolve(&self, path: &std::path::Path) -> PathBuf {
        resolve_relative(path, &expand_search_paths(&self.search_paths, "setman"))
    }
}

impl Framework for BaseFramework {
    fn find_settings_files(&self) -> Vec<(String, PathBuf)> {
        let mut files: Vec<(String, PathBuf)> = self
            .settings_files
            .iter()
            .filter(|(name, _)| name != PROJECT_KEY)
            .map(|(name, path)| (name.clone(), self.resolve(path)))
            .collect();
        let project = self
            .settings_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILENAME));
        files.push((PROJECT_KEY.to_string(), self.resolve(&project)));
        files
    }

    fn find_default_values_file(&self) -> Option<PathBuf> {
        self.default_values_file.as_deref().map(|p| self.resolve(p))
    }

    fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    fn settings(&self) -> &dyn HostSettings {
        self.host.as_ref()
    }

    fn field_separator(&self) -> &str {
        &self.separator
    }

    fn field_kind(&self, type_name: &str) -> Option<String> {
        self.field_kinds.get(&type_name.to_lowercase()).cloned()
    }

    fn translation_table(&self) -> TranslationTable {
        self.translation.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldArg;
    use crate::fixtures::test::{Workspace, fields, setting};
    use crate::kinds::IntKind;

    fn wtforms() -> BaseFramework {
        BaseFramework::new()
            .with_field_kind("boolean", "BooleanField")
            .with_field_kind("decimal", "DecimalField")
            .with_field_kind("int", "IntegerField")
            .with_field_kind("string", "TextField")
            .with_field_separator("__")
            .with_translation_table(TranslationTable::wtforms())
    }

    #[test]
    fn host_settings_read_and_write() {
        let host = MapHostSettings::new();
        assert!(!host.contains("DEBUG"));
        assert!(host.set("DEBUG", Value::Bool(true)));
        assert_eq!(host.get("DEBUG"), Some(Value::Bool(true)));
    }

    #[test]
    fn project_file_defaults_to_settings_cfg() {
        let ws = Workspace::new(&[("settings.cfg", "")]);
        let framework =
            BaseFramework::new().search_paths(vec![SearchPath::Path(ws.root().to_path_buf())]);
        let files = framework.find_settings_files();
        assert_eq!(files, vec![(PROJECT_KEY.to_string(), ws.path("settings.cfg"))]);
    }

    #[test]
    fn namespace_files_keep_order_and_project_comes_last() {
        let ws = Workspace::new(&[]);
        let framework = BaseFramework::new()
            .search_paths(vec![SearchPath::Path(ws.root().to_path_buf())])
            .namespace_file("testapp", "testapp.cfg")
            .namespace_file("core", "/srv/core/settings.cfg")
            .settings_file("project.cfg");

        let names: Vec<String> = framework
            .find_settings_files()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["testapp", "core", PROJECT_KEY]);
        assert_eq!(framework.find_settings_files()[1].1, PathBuf::from("/srv/core/settings.cfg"));
    }

    #[test]
    fn base_framework_permits_everyone() {
        assert!(BaseFramework::new().auth_permitted(&"admin"));
        assert!(BaseFramework::new().auth_permitted(&()));
    }

    #[test]
    fn setting_to_field_without_kind_fails() {
        let s = setting(&[("name", "debug"), ("type", "boolean")]);
        assert!(matches!(
            BaseFramework::new().setting_to_field(&s, Value::Null),
            Err(SetmanError::ImproperlyConfigured(_))
        ));
    }

    #[test]
    fn setting_to_field_translates_kwargs() {
        let s = setting(&[
            ("name", "hourly_rate"),
            ("app_name", "billing"),
            ("type", "decimal"),
            ("default", "15"),
            ("decimal_places", "2"),
            ("help_text", "Rate per hour"),
        ]);
        let field = wtforms().setting_to_field(&s, Value::Int(10)).unwrap();
        assert_eq!(field.name, "billing__hourly_rate");
        assert_eq!(field.kind, "DecimalField");
        assert_eq!(field.get("places"), Some(&FieldArg::Value(Value::Int(2))));
        assert_eq!(
            field.get("description"),
            Some(&FieldArg::Value(Value::from("Rate per hour")))
        );
        assert_eq!(field.get("default"), Some(&FieldArg::Value(Value::Int(10))));
        assert!(field.get("max_digits").is_none());
        assert!(field.get("required").is_none());
    }

    #[test]
    fn additional_types_keep_their_field_kind() {
        let mut registry = Registry::new();
        registry.register_kind::<IntKind>("port");
        let registry = Arc::new(registry);
        let port = Setting::new(
            registry.kind("port").unwrap(),
            &fields(&[("name", "PORT"), ("type", "Port"), ("default", "80")]),
            registry,
        )
        .unwrap();
        assert_eq!(port.type_name(), "port");

        let field = wtforms()
            .with_field_kind("port", "PortField")
            .setting_to_field(&port, Value::Int(8080))
            .unwrap();
        assert_eq!(field.kind, "PortField");
    }

    #[test]
    fn build_form_fields_flattens_namespaces() {
        let mut top = SettingsContainer::default();
        top.add_setting(setting(&[("name", "max_processes"), ("type", "int"), ("default", "2")]));
        let mut testapp = SettingsContainer::new(None, Some("testapp".into()));
        testapp.add_setting(setting(&[
            ("name", "debug"),
            ("app_name", "testapp"),
            ("type", "boolean"),
        ]));
        top.add_namespace(testapp).unwrap();

        let fields = wtforms()
            .build_form_fields(&top, &|s| s.default_value().clone())
            .unwrap();
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["max_processes", "testapp__debug"]);
    }
}
