//! File storage for override data in one of several formats.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

use parking_lot::Mutex;
use tracing::debug;

use crate::backend::Storage;
use crate::error::SetmanError;
use crate::ini::{DEFAULT_SECTION, Ini};
use crate::persist::write_document;
use crate::value::{Data, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    Ini,
    #[default]
    Json,
    Toml,
    /// MessagePack, the binary format. `pickle` is accepted as an alias.
    Msgpack,
}

impl Format {
    pub fn name(self) -> &'static str {
        match self {
            Format::Ini => "ini",
            Format::Json => "json",
            Format::Toml => "toml",
            Format::Msgpack => "msgpack",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = SetmanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ini" => Ok(Format::Ini),
            "json" => Ok(Format::Json),
            "toml" => Ok(Format::Toml),
            "msgpack" | "pickle" => Ok(Format::Msgpack),
            other => Err(SetmanError::ImproperlyConfigured(format!(
                "File format '{other}' is not supported."
            ))),
        }
    }
}

#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    format: Format,
    mtime: Mutex<Option<SystemTime>>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>, format: Format) -> Self {
        FileStorage {
            path: path.into(),
            format,
            mtime: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> Format {
        self.format
    }

    fn current_mtime(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }

    fn deserialize_error(&self, reason: impl fmt::Display) -> SetmanError {
        SetmanError::Deserialize {
            path: self.path.clone(),
            format: self.format.to_string(),
            reason: reason.to_string(),
        }
    }

    fn serialize_error(&self, reason: impl fmt::Display) -> SetmanError {
        SetmanError::Serialize {
            format: self.format.to_string(),
            reason: reason.to_string(),
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<Data, SetmanError> {
        match self.format {
            Format::Msgpack if bytes.is_empty() => Ok(Data::new()),
            Format::Msgpack => rmp_serde::from_slice(bytes).map_err(|e| self.deserialize_error(e)),
            Format::Json => self.decode_text(bytes, |text| {
                serde_json::from_str(text).map_err(|e| self.deserialize_error(e))
            }),
            Format::Toml => self.decode_text(bytes, |text| {
                toml::from_str(text).map_err(|e| self.deserialize_error(e))
            }),
            Format::Ini => self.decode_text(bytes, |text| {
                Ok(ini_to_data(&Ini::parse(text, &self.path)?))
            }),
        }
    }

    /// Blank text decodes to an empty map.
    fn decode_text<F>(&self, bytes: &[u8], parse: F) -> Result<Data, SetmanError>
    where
        F: FnOnce(&str) -> Result<Data, SetmanError>,
    {
        let text = std::str::from_utf8(bytes).map_err(|e| self.deserialize_error(e))?;
        if text.trim().is_empty() {
            return Ok(Data::new());
        }
        parse(text)
    }

    fn encode(&self, data: &Data) -> Result<Vec<u8>, SetmanError> {
        match self.format {
            Format::Json => serde_json::to_vec_pretty(data).map_err(|e| self.serialize_error(e)),
            Format::Msgpack => rmp_serde::to_vec(data).map_err(|e| self.serialize_error(e)),
            Format::Ini => Ok(data_to_ini(data).to_string().into_bytes()),
            Format::Toml => {
                let existing = match std::fs::read_to_string(&self.path) {
                    Ok(content) => Some(content),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                    Err(e) => return Err(SetmanError::io(&self.path, e)),
                };
                write_document(existing.as_deref(), data).map(String::into_bytes)
            }
        }
    }
}

/// Top-level items live in `DEFAULT`, namespaces are sections. Sections do
/// not inherit `DEFAULT` here.
fn ini_to_data(ini: &Ini) -> Data {
    let mut data: Data = ini
        .defaults()
        .iter()
        .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
        .collect();
    for section in ini.sections() {
        let own: Data = ini
            .own_items(section)
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
            .collect();
        data.insert(section.to_string(), Value::Map(own));
    }
    data
}

fn ini_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn data_to_ini(data: &Data) -> Ini {
    let mut ini = Ini::default();
    for (key, value) in data {
        match value {
            Value::Map(nested) => {
                ini.add_section(key);
                for (k, v) in nested {
                    ini.set(key, k, ini_value(v));
                }
            }
            scalar => ini.set(DEFAULT_SECTION, key, ini_value(scalar)),
        }
    }
    ini
}

impl Storage for FileStorage {
    fn read(&self) -> Result<Data, SetmanError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No stored settings at {}", self.path.display());
                *self.mtime.lock() = None;
                return Ok(Data::new());
            }
            Err(e) => return Err(SetmanError::io(&self.path, e)),
        };
        *self.mtime.lock() = self.current_mtime();
        self.decode(&bytes)
    }

    fn write(&self, data: &Data) -> Result<(), SetmanError> {
        let bytes = self.encode(data)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| SetmanError::io(parent, e))?;
        }
        std::fs::write(&self.path, bytes).map_err(|e| SetmanError::io(&self.path, e))?;
        *self.mtime.lock() = self.current_mtime();
        debug!("Wrote {} settings to {}", self.format, self.path.display());
        Ok(())
    }

    fn is_stale(&self) -> bool {
        let seen = *self.mtime.lock();
        match (seen, self.current_mtime()) {
            (Some(seen), Some(now)) => seen != now,
            (None, Some(_)) => false,
            (Some(_), None) => true,
            (None, None) => false,
        }
    }
}
