//! The declared shape of all settings: an ordered collection of settings and
//! at most one level of namespace containers.

use std::path::{Path, PathBuf};

use crate::error::SetmanError;
use crate::setting::Setting;
use crate::value::{Data, Value};

#[derive(Debug, Clone)]
pub enum Entry {
    Setting(Setting),
    Namespace(SettingsContainer),
}

impl Entry {
    pub fn name(&self) -> &str {
        match self {
            Entry::Setting(setting) => setting.name(),
            Entry::Namespace(container) => container.app_name().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SettingsContainer {
    path: Option<PathBuf>,
    app_name: Option<String>,
    entries: Vec<Entry>,
}

impl SettingsContainer {
    pub fn new(path: Option<PathBuf>, app_name: Option<String>) -> Self {
        SettingsContainer {
            path,
            app_name,
            entries: Vec::new(),
        }
    }

    /// File the entries were declared in.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn set_path(&mut self, path: Option<PathBuf>) {
        self.path = path;
    }

    /// `Some` for namespace containers.
    pub fn app_name(&self) -> Option<&str> {
        self.app_name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn settings(&self) -> impl Iterator<Item = &Setting> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Setting(setting) => Some(setting),
            Entry::Namespace(_) => None,
        })
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &SettingsContainer> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Namespace(container) => Some(container),
            Entry::Setting(_) => None,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn setting(&self, name: &str) -> Option<&Setting> {
        match self.get(name)? {
            Entry::Setting(setting) => Some(setting),
            Entry::Namespace(_) => None,
        }
    }

    pub(crate) fn setting_mut(&mut self, name: &str) -> Option<&mut Setting> {
        self.entries.iter_mut().find_map(|entry| match entry {
            Entry::Setting(setting) if setting.name() == name => Some(setting),
            _ => None,
        })
    }

    pub fn namespace(&self, name: &str) -> Option<&SettingsContainer> {
        match self.get(name)? {
            Entry::Namespace(container) => Some(container),
            Entry::Setting(_) => None,
        }
    }

    pub(crate) fn namespace_mut(&mut self, name: &str) -> Option<&mut SettingsContainer> {
        self.entries.iter_mut().find_map(|entry| match entry {
            Entry::Namespace(container) if container.app_name() == Some(name) => Some(container),
            _ => None,
        })
    }

    /// Add a setting, replacing any entry of the same name in place.
    pub fn add_setting(&mut self, setting: Setting) {
        self.insert(Entry::Setting(setting));
    }

    /// Nest `container` under its `app_name`. Only top-level containers may
    /// hold namespaces, and a namespace may not itself hold namespaces.
    pub fn add_namespace(&mut self, container: SettingsContainer) -> Result<(), SetmanError> {
        let Some(name) = container.app_name() else {
            return Err(SetmanError::ImproperlyConfigured(
                "namespace container requires an app name".into(),
            ));
        };
        if let Some(parent) = self.app_name() {
            return Err(SetmanError::ImproperlyConfigured(format!(
                "cannot nest namespace '{name}' inside namespace '{parent}'"
            )));
        }
        if container.namespaces().next().is_some() {
            return Err(SetmanError::ImproperlyConfigured(format!(
                "namespace '{name}' cannot contain namespaces"
            )));
        }
        self.insert(Entry::Namespace(container));
        Ok(())
    }

    fn insert(&mut self, entry: Entry) {
        match self.entries.iter().position(|e| e.name() == entry.name()) {
            Some(pos) => self.entries[pos] = entry,
            None => self.entries.push(entry),
        }
    }

    /// Every declared default, namespaces as nested maps.
    pub fn defaults(&self) -> Data {
        self.entries
            .iter()
            .map(|entry| {
                let value = match entry {
                    Entry::Setting(setting) => setting.default_value().clone(),
                    Entry::Namespace(container) => Value::Map(container.defaults()),
                };
                (entry.name().to_string(), value)
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a SettingsContainer {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
