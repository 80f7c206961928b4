//! Typed settings: one declared configuration item with its type, default,
//! display metadata and validation chain.
//!
//! The behaviour that differs per type (coercion, constraints, builtin
//! validators) lives behind the [`SettingKind`] trait; the built-in kinds are
//! in [`kinds`](crate::kinds). The shared parts (name, namespace, default,
//! `required` and external validators) live on [`Setting`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::error;

use crate::choices::Choice;
use crate::error::{SetmanError, ValidationError};
use crate::field::FieldArg;
use crate::registry::Registry;
use crate::validators::Validator;
use crate::value::Value;

/// Raw `key = value` fields of one configuration-definition section.
pub type Fields = BTreeMap<String, String>;

/// Fields a setting owns itself; everything else is offered to its kind.
const COMMON_FIELDS: &[&str] = &[
    "name",
    "app_name",
    "type",
    "label",
    "help_text",
    "required",
    "default",
    "validators",
];

/// Type-specific half of a setting.
pub trait SettingKind: fmt::Debug + Send + Sync {
    /// Type tag matched (case-insensitively) against a section's `type` field.
    fn type_name(&self) -> &str;

    /// Whether settings of this kind are required unless the section says otherwise.
    fn default_required(&self) -> bool {
        true
    }

    /// Coerce a raw or stored value. `None` means the value cannot be
    /// represented by this kind. Must be idempotent.
    fn to_python(&self, value: &Value) -> Option<Value>;

    /// Apply the kind-specific fields of a section. Unknown keys are ignored.
    fn update(&mut self, fields: &Fields);

    /// Validators derived from this kind's own constraints.
    fn builtin_validators(&self, _registry: &Registry) -> Vec<Validator> {
        Vec::new()
    }

    /// Type-specific keyword arguments exposed for form field construction.
    fn field_kwargs(&self, _registry: &Registry) -> Vec<(&'static str, FieldArg)> {
        Vec::new()
    }

    /// Parsed choices, for kinds that have them.
    fn choices(&self, _registry: &Registry) -> Option<Vec<Choice>> {
        None
    }

    fn clone_box(&self) -> Box<dyn SettingKind>;
}

impl Clone for Box<dyn SettingKind> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Convert boolean-ish input: `1/yes/true/on` and `0/no/false/off`
/// (case-insensitive), native bools and numbers.
pub fn force_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Int(i) => Some(*i != 0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "1" | "yes" | "true" | "on" => Some(true),
            "0" | "no" | "false" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[derive(Clone)]
pub struct Setting {
    name: String,
    app_name: Option<String>,
    label: Option<String>,
    help_text: Option<String>,
    required: bool,
    default: Value,
    validators_spec: Option<String>,
    /// The type tag the setting was declared with; additional types may
    /// reuse a built-in kind under their own name.
    type_name: String,
    kind: Box<dyn SettingKind>,
    registry: Arc<Registry>,
    builtin_cache: OnceLock<Vec<Validator>>,
    external_cache: OnceLock<Vec<Validator>>,
}

impl Setting {
    /// Build a setting of `kind` from a section's fields. `fields` must carry
    /// `name`; `app_name` is optional. The `type` field, lowercased, becomes
    /// [`type_name`](Self::type_name), falling back to the kind's own name.
    pub fn new(
        kind: Box<dyn SettingKind>,
        fields: &Fields,
        registry: Arc<Registry>,
    ) -> Result<Self, SetmanError> {
        let name = fields.get("name").cloned().ok_or_else(|| {
            SetmanError::ImproperlyConfigured("setting declared without a name".into())
        })?;
        let type_name = fields
            .get("type")
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| kind.type_name().to_string());
        let mut setting = Setting {
            name,
            app_name: None,
            label: None,
            help_text: None,
            required: kind.default_required(),
            default: Value::Null,
            validators_spec: None,
            type_name,
            kind,
            registry,
            builtin_cache: OnceLock::new(),
            external_cache: OnceLock::new(),
        };
        setting.apply(fields);
        Ok(setting)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn app_name(&self) -> Option<&str> {
        self.app_name.as_deref()
    }

    /// `app_name.name` for namespaced settings, `name` otherwise.
    pub fn full_name(&self) -> String {
        match &self.app_name {
            Some(app) => format!("{app}.{}", self.name),
            None => self.name.clone(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn kind(&self) -> &dyn SettingKind {
        self.kind.as_ref()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn help_text(&self) -> Option<&str> {
        self.help_text.as_deref()
    }

    pub fn required(&self) -> bool {
        self.required
    }

    /// Coerced default, [`Value::Null`] when none was declared.
    pub fn default_value(&self) -> &Value {
        &self.default
    }

    pub fn choices(&self) -> Option<Vec<Choice>> {
        self.kind.choices(&self.registry)
    }

    /// Reconfigure this setting from an overriding section. `type` may not be
    /// changed.
    pub fn update(&mut self, fields: &Fields) -> Result<(), SetmanError> {
        if fields.contains_key("type") {
            return Err(SetmanError::TypeRedefinition(self.full_name()));
        }
        self.apply(fields);
        Ok(())
    }

    fn apply(&mut self, fields: &Fields) {
        for (key, value) in fields {
            match key.as_str() {
                "name" => self.name = value.clone(),
                "app_name" => self.app_name = Some(value.clone()).filter(|v| !v.is_empty()),
                "label" => self.label = Some(value.clone()),
                "help_text" => self.help_text = Some(value.clone()),
                "required" => {
                    self.required = force_bool(&Value::from(value.as_str())).unwrap_or(false)
                }
                "validators" => self.validators_spec = Some(value.clone()),
                _ => {}
            }
        }

        let kind_fields: Fields = fields
            .iter()
            .filter(|(key, _)| !COMMON_FIELDS.contains(&key.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.kind.update(&kind_fields);

        let raw_default = match fields.get("default") {
            Some(raw) => Value::from(raw.as_str()),
            None => std::mem::take(&mut self.default),
        };
        self.default = self.kind.to_python(&raw_default).unwrap_or(Value::Null);

        self.builtin_cache = OnceLock::new();
        self.external_cache = OnceLock::new();
    }

    /// Coerce `value` to this setting's type; `None` when not representable.
    pub fn to_python(&self, value: &Value) -> Option<Value> {
        match value {
            Value::Null => None,
            other => self.kind.to_python(other),
        }
    }

    pub fn builtin_validators(&self) -> &[Validator] {
        self.builtin_cache
            .get_or_init(|| self.kind.builtin_validators(&self.registry))
    }

    /// Validators named in the `validators` field, resolved on first use.
    /// Names missing from the registry are logged and skipped.
    pub fn external_validators(&self) -> &[Validator] {
        self.external_cache.get_or_init(|| {
            let Some(spec) = &self.validators_spec else {
                return Vec::new();
            };
            spec.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .filter_map(|item| match self.registry.validator(item) {
                    Some(validator) => Some(validator.clone()),
                    None => {
                        error!("Cannot load {item:?} validator for {} setting.", self.name);
                        None
                    }
                })
                .collect()
        })
    }

    /// Builtin validators followed by external ones, in run order.
    pub fn validators(&self) -> Vec<Validator> {
        self.builtin_validators()
            .iter()
            .chain(self.external_validators())
            .cloned()
            .collect()
    }

    /// Coerce and validate `value`, returning the coerced value.
    pub fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        let has_value = value.is_truthy();
        let coerced = self.to_python(value);

        if !self.required && !coerced.as_ref().is_some_and(Value::is_truthy) {
            return Ok(coerced.unwrap_or(Value::Null));
        }

        let missing = match &coerced {
            None => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        };
        if missing {
            return Err(if has_value {
                ValidationError::new("Enter a valid value.")
            } else {
                ValidationError::new("This setting is required.")
            });
        }

        let mut value = coerced.unwrap_or(Value::Null);
        for validator in self.builtin_validators().iter().chain(self.external_validators()) {
            value = validator.call(value)?;
        }
        Ok(value)
    }

    /// Keyword arguments for building a form field: the common ones first,
    /// then the kind's constraints. `initial` is the given current value.
    pub fn field_kwargs(&self, initial: Value) -> Vec<(&'static str, FieldArg)> {
        let mut kwargs = vec![
            ("label", FieldArg::Value(self.label.clone().into())),
            ("help_text", FieldArg::Value(self.help_text.clone().into())),
            ("initial", FieldArg::Value(initial)),
            ("required", FieldArg::Value(Value::Bool(self.required))),
            ("validators", FieldArg::Validators(self.validators())),
        ];
        kwargs.extend(self.kind.field_kwargs(&self.registry));
        kwargs
    }
}

impl fmt::Debug for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setting")
            .field("name", &self.name)
            .field("app_name", &self.app_name)
            .field("type", &self.type_name())
            .field("default", &self.default)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.default)
    }
}
