//! Minimal INI reader and writer for configuration-definition files, the
//! default-values file and the `ini` storage format.
//!
//! ```text
//! # comment
//! [section]
//! key = value
//! other: value
//!     continued on the next line
//! ```
//!
//! Items of the `[DEFAULT]` section are inherited by every other section.
//! Values are kept verbatim; there is no interpolation.

use std::fmt;
use std::path::Path;

use crate::error::SetmanError;

pub const DEFAULT_SECTION: &str = "DEFAULT";

type Items = Vec<(String, String)>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ini {
    defaults: Items,
    sections: Vec<(String, Items)>,
}

fn upsert(items: &mut Items, key: &str, value: String) {
    match items.iter_mut().find(|(k, _)| k == key) {
        Some((_, v)) => *v = value,
        None => items.push((key.to_string(), value)),
    }
}

impl Ini {
    /// Parse sectioned text. `path` is only used in error messages.
    pub fn parse(text: &str, path: &Path) -> Result<Self, SetmanError> {
        Self::parse_inner(text, path, false)
    }

    /// Parse text without section headers; every item lands in `DEFAULT`.
    pub fn parse_without_sections(text: &str, path: &Path) -> Result<Self, SetmanError> {
        Self::parse_inner(text, path, true)
    }

    pub fn read(path: &Path) -> Result<Self, SetmanError> {
        let text = std::fs::read_to_string(path).map_err(|e| SetmanError::io(path, e))?;
        Self::parse(&text, path)
    }

    pub fn read_without_sections(path: &Path) -> Result<Self, SetmanError> {
        let text = std::fs::read_to_string(path).map_err(|e| SetmanError::io(path, e))?;
        Self::parse_without_sections(&text, path)
    }

    fn parse_inner(text: &str, path: &Path, no_sections: bool) -> Result<Self, SetmanError> {
        let mut ini = Ini::default();
        let mut section: Option<String> = no_sections.then(|| DEFAULT_SECTION.to_string());
        let mut last_key: Option<String> = None;

        let error = |line: usize, reason: &str| SetmanError::ConfigParse {
            path: path.to_path_buf(),
            line,
            reason: reason.to_string(),
        };

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let trimmed = raw.trim();

            if trimmed.is_empty() {
                last_key = None;
                continue;
            }
            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            if raw.starts_with([' ', '\t'])
                && let (Some(section), Some(key)) = (&section, &last_key)
            {
                let items = ini.items_mut(section);
                if let Some((_, value)) = items.iter_mut().find(|(k, _)| k == key) {
                    value.push('\n');
                    value.push_str(trimmed);
                }
                continue;
            }

            if !no_sections && trimmed.starts_with('[') {
                let Some(name) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) else {
                    return Err(error(line_no, "malformed section header"));
                };
                let name = name.trim().to_string();
                ini.items_mut(&name);
                section = Some(name);
                last_key = None;
                continue;
            }

            let Some(section) = &section else {
                return Err(error(line_no, "item before any section header"));
            };
            let Some(pos) = trimmed.find(['=', ':']) else {
                return Err(error(line_no, "expected `key = value`"));
            };
            let key = trimmed[..pos].trim();
            if key.is_empty() {
                return Err(error(line_no, "empty key"));
            }
            let value = trimmed[pos + 1..].trim().to_string();
            upsert(ini.items_mut(section), key, value);
            last_key = Some(key.to_string());
        }

        Ok(ini)
    }

    fn items_mut(&mut self, section: &str) -> &mut Items {
        if section == DEFAULT_SECTION {
            return &mut self.defaults;
        }
        let pos = match self.sections.iter().position(|(name, _)| name == section) {
            Some(pos) => pos,
            None => {
                self.sections.push((section.to_string(), Vec::new()));
                self.sections.len() - 1
            }
        };
        &mut self.sections[pos].1
    }

    /// Section names in file order, `DEFAULT` excluded.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(name, _)| name.as_str())
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.sections.iter().any(|(name, _)| name == section)
    }

    pub fn defaults(&self) -> &[(String, String)] {
        &self.defaults
    }

    /// Items declared in `section` itself, without inherited defaults.
    pub fn own_items(&self, section: &str) -> &[(String, String)] {
        self.sections
            .iter()
            .find(|(name, _)| name == section)
            .map(|(_, items)| items.as_slice())
            .unwrap_or_default()
    }

    /// Items of `section` with inherited defaults; the section's own values
    /// win. Empty for unknown sections.
    pub fn items(&self, section: &str) -> Vec<(String, String)> {
        let mut items = self.defaults.clone();
        for (key, value) in self.own_items(section) {
            upsert(&mut items, key, value.clone());
        }
        items
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        let items = if section == DEFAULT_SECTION {
            Some(&self.defaults)
        } else {
            self.sections
                .iter()
                .find(|(name, _)| name == section)
                .map(|(_, items)| items)
        };
        items
            .and_then(|items| items.iter().find(|(k, _)| k == key))
            .or_else(|| self.defaults.iter().find(|(k, _)| k == key))
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        upsert(self.items_mut(section), key, value.into());
    }

    pub fn add_section(&mut self, section: &str) {
        self.items_mut(section);
    }
}

fn write_section(f: &mut fmt::Formatter<'_>, name: &str, items: &Items) -> fmt::Result {
    writeln!(f, "[{name}]")?;
    for (key, value) in items {
        writeln!(f, "{key} = {}", value.replace('\n', "\n\t"))?;
    }
    Ok(())
}

impl fmt::Display for Ini {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        if !self.defaults.is_empty() {
            write_section(f, DEFAULT_SECTION, &self.defaults)?;
            first = false;
        }
        for (name, items) in &self.sections {
            if !first {
                writeln!(f)?;
            }
            write_section(f, name, items)?;
            first = false;
        }
        Ok(())
    }
}
