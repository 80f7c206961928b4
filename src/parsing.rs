//! Configuration-definition parsing.
//!
//! Each section of a definition file declares one setting. A dotted section
//! (`[app.setting]`) in the project file reconfigures a setting an app
//! namespace already declared. Problems are logged and degrade to an empty
//! or partial container; a broken file must not take the host down.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::container::SettingsContainer;
use crate::error::SetmanError;
use crate::framework::{Framework, PROJECT_KEY};
use crate::ini::Ini;
use crate::registry::Registry;
use crate::setting::{Fields, Setting};

/// Build a setting from a section's fields, dispatching on `type`.
pub fn data_to_setting(fields: &Fields, registry: &Arc<Registry>) -> Result<Setting, SetmanError> {
    let type_name = fields.get("type").map(String::as_str).unwrap_or_default();
    let kind = registry
        .kind(type_name)
        .ok_or_else(|| SetmanError::SettingTypeDoesNotExist(type_name.to_string()))?;
    Setting::new(kind, fields, registry.clone())
}

/// Apply an override section to an already declared setting.
pub fn update_app_setting(setting: &mut Setting, fields: &Fields) -> Result<(), SetmanError> {
    setting.update(fields)
}

fn section_fields(ini: &Ini, section: &str) -> Fields {
    ini.items(section).into_iter().collect()
}

/// Parse one configuration-definition file.
///
/// `default_values` fills in `default` for sections that declare none.
/// Dotted sections update settings of the namespaces in `all_settings`.
pub fn parse_config(
    path: &Path,
    registry: &Arc<Registry>,
    default_values: &Fields,
    app_name: Option<&str>,
    mut all_settings: Option<&mut SettingsContainer>,
) -> SettingsContainer {
    let empty = SettingsContainer::new(Some(path.to_path_buf()), app_name.map(str::to_string));

    let ini = match Ini::read(path) {
        Ok(ini) => ini,
        Err(SetmanError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            warn!("Configuration definition file {} does not exist", path.display());
            return empty;
        }
        Err(e) => {
            error!("Cannot parse configuration definition file: {e}");
            return empty;
        }
    };

    let mut settings = empty.clone();

    for section in ini.sections() {
        if let Some((namespace, name)) = section.split_once('.') {
            let Some(app_settings) = all_settings
                .as_deref_mut()
                .and_then(|all| all.namespace_mut(namespace))
            else {
                error!("Cannot find settings for {namespace:?} app");
                continue;
            };
            let Some(app_setting) = app_settings.setting_mut(name) else {
                error!("Cannot find {namespace:?} app setting {name:?}");
                continue;
            };

            let mut fields = section_fields(&ini, section);
            if !fields.contains_key("default")
                && let Some(default) = default_values.get(section)
            {
                fields.insert("default".into(), default.clone());
            }

            if let Err(e) = update_app_setting(app_setting, &fields) {
                error!("{e}");
                continue;
            }
            debug!("Updated {section} from {}", path.display());
        } else {
            let mut fields = section_fields(&ini, section);
            fields.insert("name".into(), section.to_string());
            if let Some(app) = app_name {
                fields.insert("app_name".into(), app.to_string());
            }
            if !fields.contains_key("default") {
                let scoped = app_name.map(|app| format!("{app}.{section}"));
                let default = scoped
                    .and_then(|key| default_values.get(&key))
                    .or_else(|| default_values.get(section));
                if let Some(default) = default {
                    fields.insert("default".into(), default.clone());
                }
            }

            match data_to_setting(&fields, registry) {
                Ok(setting) => settings.add_setting(setting),
                Err(e) => {
                    error!("Cannot find proper setting class for {section:?}: {e}");
                    return empty;
                }
            }
        }
    }

    settings
}

/// Read the default-values file: one flat `name = value` list, no sections.
fn read_default_values(path: &Path) -> Fields {
    match Ini::read_without_sections(path) {
        Ok(ini) => ini.defaults().iter().cloned().collect(),
        Err(e) => {
            error!("Cannot read default values: {e}");
            Fields::new()
        }
    }
}

/// Parse every definition file the framework knows about: the default
/// values first, then each namespace, then the project file, which may
/// override namespace settings.
pub fn parse_configs(framework: &dyn Framework) -> SettingsContainer {
    let registry = framework.registry();
    let default_values = framework
        .find_default_values_file()
        .map(|path| read_default_values(&path))
        .unwrap_or_default();

    let files = framework.find_settings_files();
    let mut all_settings = SettingsContainer::default();

    for (app_name, path) in files.iter().filter(|(name, _)| name != PROJECT_KEY) {
        let namespace = parse_config(path, &registry, &default_values, Some(app_name), None);
        if let Err(e) = all_settings.add_namespace(namespace) {
            error!("{e}");
        }
    }

    let Some((_, project_path)) = files.iter().find(|(name, _)| name == PROJECT_KEY) else {
        return all_settings;
    };
    let project = parse_config(
        project_path,
        &registry,
        &default_values,
        None,
        Some(&mut all_settings),
    );
    all_settings.set_path(project.path().map(Path::to_path_buf));
    for setting in project.settings() {
        all_settings.add_setting(setting.clone());
    }
    all_settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{
        CORE_CFG, DEFAULTS_CFG, OVERRIDE_CFG, PROJECT_CFG, TESTAPP_CFG, Workspace, decimal, fields,
        registry,
    };
    use crate::framework::BaseFramework;
    use crate::types::SearchPath;
    use crate::value::Value;

    fn parse(ws: &Workspace, name: &str, app_name: Option<&str>) -> SettingsContainer {
        parse_config(&ws.path(name), &registry(), &Fields::new(), app_name, None)
    }

    #[test]
    fn project_file() {
        let ws = Workspace::new(&[("settings.cfg", PROJECT_CFG)]);
        let settings = parse(&ws, "settings.cfg", None);

        assert_eq!(settings.len(), 3);
        assert_eq!(settings.path(), Some(ws.path("settings.cfg").as_path()));
        let max = settings.setting("max_processes").unwrap();
        assert_eq!(max.type_name(), "int");
        assert_eq!(max.default_value(), &Value::Int(2));
        assert_eq!(max.label(), Some("Max processes"));
        assert_eq!(
            settings.setting("hourly_rate").unwrap().default_value(),
            &decimal("15")
        );
    }

    #[test]
    fn namespace_file_sets_app_name() {
        let ws = Workspace::new(&[("testapp.cfg", TESTAPP_CFG)]);
        let settings = parse(&ws, "testapp.cfg", Some("testapp"));
        assert_eq!(settings.app_name(), Some("testapp"));
        let debug = settings.setting("debug").unwrap();
        assert_eq!(debug.full_name(), "testapp.debug");
        assert_eq!(debug.default_value(), &Value::Bool(false));
    }

    #[test]
    fn unknown_type_empties_the_file() {
        let ws = Workspace::new(&[(
            "settings.cfg",
            "[A]\ntype = int\n\n[B]\ntype = complex\n",
        )]);
        let settings = parse(&ws, "settings.cfg", None);
        assert!(settings.is_empty());
        assert_eq!(settings.path(), Some(ws.path("settings.cfg").as_path()));
    }

    #[test]
    fn malformed_or_missing_files_are_empty() {
        let ws = Workspace::new(&[("broken.cfg", "no header = here\n")]);
        assert!(parse(&ws, "broken.cfg", None).is_empty());
        assert!(parse(&ws, "missing.cfg", None).is_empty());
    }

    #[test]
    fn additional_types_are_dispatched() {
        let ws = Workspace::new(&[("settings.cfg", "[PORT]\ntype = Port\ndefault = 80\n")]);
        let mut registry = Registry::new();
        registry.register_kind::<crate::kinds::IntKind>("port");
        let settings = parse_config(
            &ws.path("settings.cfg"),
            &Arc::new(registry),
            &Fields::new(),
            None,
            None,
        );
        let port = settings.setting("PORT").unwrap();
        assert_eq!(port.default_value(), &Value::Int(80));
        assert_eq!(port.type_name(), "port");
        assert_eq!(port.kind().type_name(), "int");
    }

    #[test]
    fn default_values_fill_missing_defaults_only() {
        let ws = Workspace::new(&[("settings.cfg", "[a]\ntype = int\ndefault = 1\n\n[b]\ntype = int\n")]);
        let defaults = fields(&[("a", "10"), ("b", "20")]);
        let settings =
            parse_config(&ws.path("settings.cfg"), &registry(), &defaults, None, None);
        assert_eq!(settings.setting("a").unwrap().default_value(), &Value::Int(1));
        assert_eq!(settings.setting("b").unwrap().default_value(), &Value::Int(20));
    }

    fn override_framework(ws: &Workspace) -> BaseFramework {
        BaseFramework::new()
            .search_paths(vec![SearchPath::Path(ws.root().to_path_buf())])
            .with_registry(registry())
            .namespace_file("core", "core.cfg")
            .default_values_file("defaults.cfg")
    }

    #[test]
    fn project_file_overrides_namespace_settings() {
        let ws = Workspace::new(&[
            ("settings.cfg", OVERRIDE_CFG),
            ("core.cfg", CORE_CFG),
            ("defaults.cfg", DEFAULTS_CFG),
        ]);
        let all = parse_configs(&override_framework(&ws));

        assert_eq!(all.path(), Some(ws.path("settings.cfg").as_path()));
        let core = all.namespace("core").unwrap();
        assert_eq!(core.path(), Some(ws.path("core.cfg").as_path()));

        let app_setting = core.setting("app_setting").unwrap();
        assert_eq!(app_setting.default_value(), &Value::from("hello"));
        assert_eq!(app_setting.label(), Some("App setting"));

        // `type` may not be redefined; the whole section is skipped.
        let validator_setting = core.setting("VALIDATOR_SETTING").unwrap();
        assert_eq!(validator_setting.type_name(), "string");
        assert!(validator_setting.default_value().is_null());

        assert_eq!(all.setting("INT_SETTING").unwrap().default_value(), &Value::Int(24));
    }

    #[test]
    fn namespaces_come_before_project_settings() {
        let ws = Workspace::new(&[("settings.cfg", OVERRIDE_CFG), ("core.cfg", CORE_CFG)]);
        let all = parse_configs(&override_framework(&ws));
        let names: Vec<&str> = all.iter().map(crate::container::Entry::name).collect();
        assert_eq!(names, vec!["core", "INT_SETTING"]);
    }

    #[test]
    fn override_of_unknown_namespace_is_skipped() {
        let ws = Workspace::new(&[(
            "settings.cfg",
            "[X]\ntype = string\n\n[nope.thing]\ndefault = 1\n\n[core.missing]\ndefault = 2\n",
        ), ("core.cfg", CORE_CFG)]);
        let all = parse_configs(&override_framework(&ws));
        assert!(all.setting("X").is_some());
        assert_eq!(all.namespace("core").unwrap().len(), 2);
    }

    #[test]
    fn default_values_file_is_read_without_sections() {
        let ws = Workspace::new(&[
            ("settings.cfg", "[INT_SETTING]\ntype = int\n\n[hosts_file]\ntype = string\n"),
            ("core.cfg", CORE_CFG),
            ("defaults.cfg", DEFAULTS_CFG),
        ]);
        let all = parse_configs(&override_framework(&ws));
        assert_eq!(all.setting("INT_SETTING").unwrap().default_value(), &Value::Int(20));
        assert_eq!(
            all.setting("hosts_file").unwrap().default_value(),
            &Value::from("/etc/hosts.default")
        );
    }
}
