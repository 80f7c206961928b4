//! Diagnostic operations: the `check` report over declared settings.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::container::{Entry, SettingsContainer};

const INDENT: &str = "    ";

/// One line group of a [`Report`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReportEntry {
    /// A project setting rendered as `name = default`.
    Setting(String),
    Namespace {
        app_name: String,
        path: Option<PathBuf>,
        settings: Vec<String>,
    },
}

/// Result of [`Action::Check`](crate::Action::Check). Returned to the caller
/// for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub path: Option<PathBuf>,
    pub entries: Vec<ReportEntry>,
    pub verbosity: u8,
    /// Whether every declared default was persisted.
    pub defaults_stored: bool,
}

impl Report {
    pub fn new(container: &SettingsContainer, verbosity: u8) -> Self {
        let entries = container
            .iter()
            .map(|entry| match entry {
                Entry::Setting(setting) => ReportEntry::Setting(setting.to_string()),
                Entry::Namespace(namespace) => ReportEntry::Namespace {
                    app_name: entry.name().to_string(),
                    path: namespace.path().map(Path::to_path_buf),
                    settings: namespace.settings().map(ToString::to_string).collect(),
                },
            })
            .collect();
        Report {
            path: container.path().map(Path::to_path_buf),
            entries,
            verbosity,
            defaults_stored: false,
        }
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!("{:?}", path.display().to_string()),
        None => "<none>".into(),
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.verbosity > 0 {
            writeln!(f, "Project settings:")?;
            writeln!(
                f,
                "Configuration definition file placed at {}",
                display_path(&self.path)
            )?;
            writeln!(f)?;

            for entry in &self.entries {
                match entry {
                    ReportEntry::Setting(line) => writeln!(f, "{INDENT}{line}")?,
                    ReportEntry::Namespace {
                        app_name,
                        path,
                        settings,
                    } => {
                        writeln!(f, "{INDENT}{app_name:?} settings:")?;
                        writeln!(
                            f,
                            "{INDENT}Configuration definition file placed at {}",
                            display_path(path)
                        )?;
                        for line in settings {
                            writeln!(f, "{INDENT}{INDENT}{line}")?;
                        }
                        writeln!(f)?;
                    }
                }
            }
        }

        if self.defaults_stored {
            if self.verbosity > 0 {
                writeln!(f)?;
            }
            write!(f, "Default values stored well!")?;
        }
        Ok(())
    }
}
