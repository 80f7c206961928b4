//! Form-field descriptions for UI layers, and the keyword-argument
//! translation tables that adapt them to a particular form toolkit.

use crate::choices::Choice;
use crate::error::ValidationError;
use crate::validators::{Validator, regex_validator};
use crate::value::Value;

/// One keyword argument of a field constructor.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldArg {
    Value(Value),
    Choices(Vec<Choice>),
    Validators(Vec<Validator>),
}

pub type FieldKwargs = Vec<(String, FieldArg)>;

/// Everything a UI layer needs to build a form field for one setting.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// `app<sep>name` for namespaced settings.
    pub name: String,
    pub app_name: Option<String>,
    /// Toolkit field kind, e.g. `BooleanField`.
    pub kind: String,
    pub kwargs: FieldKwargs,
}

impl FieldSpec {
    pub fn get(&self, key: &str) -> Option<&FieldArg> {
        self.kwargs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Turns a keyword argument's value into a validator, or nothing.
pub type ValidatorTransform = fn(&Value) -> Option<Validator>;

/// Maps the engine's field kwargs onto a toolkit's: renames, kwargs that
/// become validators, and kwargs the toolkit does not accept.
#[derive(Debug, Clone, Default)]
pub struct TranslationTable {
    pub renames: Vec<(&'static str, &'static str)>,
    pub to_validators: Vec<(&'static str, ValidatorTransform)>,
    pub deletes: Vec<&'static str>,
}

impl TranslationTable {
    /// Leaves kwargs untouched.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Table for WTForms-style toolkits.
    pub fn wtforms() -> Self {
        TranslationTable {
            renames: vec![
                ("decimal_places", "places"),
                ("help_text", "description"),
                ("initial", "default"),
            ],
            to_validators: vec![
                ("regex", regex_arg as ValidatorTransform),
                ("required", required_arg as ValidatorTransform),
            ],
            deletes: vec![
                "max_digits",
                "max_length",
                "max_value",
                "min_length",
                "min_value",
            ],
        }
    }
}

fn regex_arg(value: &Value) -> Option<Validator> {
    value.as_str().and_then(regex_validator)
}

fn required_arg(value: &Value) -> Option<Validator> {
    Some(if value.is_truthy() {
        required_validator()
    } else {
        optional_validator()
    })
}

/// Zero is a real value for numeric fields.
fn required_validator() -> Validator {
    Validator::new("required", |value| match value {
        Value::Int(_) | Value::Float(_) | Value::Decimal(_) => Ok(value),
        v if v.is_truthy() => Ok(v),
        _ => Err(ValidationError::new("This field is required.")),
    })
}

fn optional_validator() -> Validator {
    Validator::new("optional", Ok)
}

/// Apply `table` to `kwargs`. Order of the surviving kwargs is kept; the
/// `validators` kwarg is created when a kwarg turns into a validator.
pub fn translate(kwargs: FieldKwargs, table: &TranslationTable) -> FieldKwargs {
    let mut kwargs: FieldKwargs = kwargs
        .into_iter()
        .map(|(key, value)| {
            match table.renames.iter().find(|(from, _)| *from == key) {
                Some((_, to)) => (to.to_string(), value),
                None => (key, value),
            }
        })
        .collect();

    for (key, transform) in &table.to_validators {
        let Some(pos) = kwargs.iter().position(|(k, _)| k == key) else {
            continue;
        };
        let (_, arg) = kwargs.remove(pos);
        let FieldArg::Value(value) = arg else {
            continue;
        };
        let Some(validator) = transform(&value) else {
            continue;
        };
        match kwargs.iter_mut().find(|(k, _)| k == "validators") {
            Some((_, FieldArg::Validators(validators))) => validators.push(validator),
            _ => kwargs.push(("validators".into(), FieldArg::Validators(vec![validator]))),
        }
    }

    kwargs.retain(|(key, _)| !table.deletes.contains(&key.as_str()));
    kwargs
}
