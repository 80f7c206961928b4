//! Override storage and the validating cache in front of it.
//!
//! A [`Storage`] only moves [`Data`] in and out of some medium. The
//! [`Backend`] owns the read-through cache, coerces data against the
//! declared [`SettingsContainer`], validates before persisting and tells
//! other facades about successful saves.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::container::{Entry, SettingsContainer};
use crate::error::{SetmanError, ValidationError};
use crate::invalidation::{InvalidationChannel, LocalChannel, Subscription};
use crate::setting::Setting;
use crate::value::{Data, Value};

pub trait Storage: Send + Sync + fmt::Debug {
    /// Stored override data; an empty map when nothing was stored yet.
    fn read(&self) -> Result<Data, SetmanError>;

    fn write(&self, data: &Data) -> Result<(), SetmanError>;

    /// Whether the medium changed behind this storage's back since the last
    /// read or write.
    fn is_stale(&self) -> bool {
        false
    }
}

/// Override data held in memory. Clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    data: Arc<Mutex<Data>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: Data) -> Self {
        MemoryStorage {
            data: Arc::new(Mutex::new(data)),
        }
    }
}

impl Storage for MemoryStorage {
    fn read(&self) -> Result<Data, SetmanError> {
        Ok(self.data.lock().clone())
    }

    fn write(&self, data: &Data) -> Result<(), SetmanError> {
        *self.data.lock() = data.clone();
        Ok(())
    }
}

/// Run `f` over every declared key of `data`, recursing into namespaces.
/// Undeclared keys are left alone.
fn batch<F>(container: &SettingsContainer, data: &mut Data, f: &mut F) -> Result<(), ValidationError>
where
    F: FnMut(&Setting, &mut Value) -> Result<(), ValidationError>,
{
    for (key, value) in data.iter_mut() {
        match container.get(key) {
            Some(Entry::Setting(setting)) => f(setting, value)?,
            Some(Entry::Namespace(namespace)) => {
                if let Value::Map(nested) = value {
                    batch(namespace, nested, f)?;
                }
            }
            None => {}
        }
    }
    Ok(())
}

/// Coerce declared values; values a setting cannot represent stay as they are.
pub fn coerce(container: &SettingsContainer, mut data: Data) -> Data {
    let _ = batch(container, &mut data, &mut |setting: &Setting, value: &mut Value| {
        if let Some(coerced) = setting.to_python(value) {
            *value = coerced;
        }
        Ok(())
    });
    data
}

/// Validate declared values in place, stopping at the first failure.
pub fn validate(container: &SettingsContainer, data: &mut Data) -> Result<(), ValidationError> {
    batch(container, data, &mut |setting: &Setting, value: &mut Value| {
        *value = setting
            .validate(value)
            .map_err(|e| e.for_setting(&setting.full_name()))?;
        Ok(())
    })
}

pub struct Backend {
    storage: Box<dyn Storage>,
    container: Arc<SettingsContainer>,
    channel: Arc<dyn InvalidationChannel>,
    subscription: Subscription,
    cache: Option<Data>,
    error: Option<ValidationError>,
}

impl Backend {
    /// A backend with a private in-process invalidation channel.
    pub fn new(storage: Box<dyn Storage>, container: Arc<SettingsContainer>) -> Self {
        Self::with_channel(storage, container, Arc::new(LocalChannel::new()))
    }

    pub fn with_channel(
        storage: Box<dyn Storage>,
        container: Arc<SettingsContainer>,
        channel: Arc<dyn InvalidationChannel>,
    ) -> Self {
        Backend {
            storage,
            container,
            subscription: Subscription::new(channel.clone()),
            channel,
            cache: None,
            error: None,
        }
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn container(&self) -> &Arc<SettingsContainer> {
        &self.container
    }

    /// Current override data, read through on first access and after an
    /// invalidation or an outside change to the storage.
    pub fn data(&mut self) -> Result<&Data, SetmanError> {
        if self.subscription.take() || self.storage.is_stale() {
            debug!("Override data invalidated, dropping cache");
            self.cache = None;
        }
        if self.cache.is_none() {
            let data = coerce(&self.container, self.storage.read()?);
            self.cache = Some(data);
        }
        Ok(self.cache.get_or_insert_with(Data::new))
    }

    /// Replace the cached data without persisting it.
    pub fn set_data(&mut self, data: Data) {
        self.cache = Some(coerce(&self.container, data));
    }

    /// Drop cached data and any cached validation error.
    pub fn clear(&mut self) {
        self.cache = None;
        self.error = None;
    }

    /// Validate the current data. The first failure is kept as [`error`](Self::error).
    pub fn is_valid(&mut self) -> Result<bool, SetmanError> {
        let mut data = self.data()?.clone();
        match validate(&self.container, &mut data) {
            Ok(()) => {
                self.cache = Some(data);
                self.error = None;
                Ok(true)
            }
            Err(e) => {
                self.error = Some(e);
                Ok(false)
            }
        }
    }

    pub fn error(&self) -> Option<&ValidationError> {
        self.error.as_ref()
    }

    /// Persist the current data. Refuses while a validation error is cached
    /// or when the data does not validate.
    pub fn save(&mut self) -> Result<(), SetmanError> {
        if let Some(error) = &self.error {
            return Err(SetmanError::InvalidSettings(error.clone()));
        }
        if !self.is_valid()? {
            let error = self.error.clone().unwrap_or_else(|| ValidationError::new("invalid"));
            return Err(SetmanError::InvalidSettings(error));
        }

        let data = self.data()?.clone();
        self.persist(&data)
    }

    fn persist(&mut self, data: &Data) -> Result<(), SetmanError> {
        self.storage.write(data)?;
        debug!("Saved {} override(s)", data.len());
        self.clear();

        if let Err(e) = self.channel.publish() {
            warn!("Cannot publish settings invalidation: {e}");
        }
        Ok(())
    }

    /// Defaults of every declared setting, or of one namespace. The
    /// top-level form also stores them as they are, without validation, so
    /// required settings with no default do not block it.
    pub fn revert(&mut self, prefix: Option<&str>) -> Result<Data, SetmanError> {
        match prefix {
            Some(name) => self
                .container
                .namespace(name)
                .map(SettingsContainer::defaults)
                .ok_or_else(|| SetmanError::SettingDoesNotExist(name.to_string())),
            None => {
                let defaults = self.container.defaults();
                self.persist(&defaults)?;
                Ok(defaults)
            }
        }
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("storage", &self.storage)
            .field("cached", &self.cache.is_some())
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
