//! Validator functions and the builtin validators derived from setting
//! constraints (`min_value`, `max_length`, `regex`, ...).

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use tracing::error;

use crate::error::ValidationError;
use crate::value::Value;

type ValidatorFn = dyn Fn(Value) -> Result<Value, ValidationError> + Send + Sync;

/// A named check run against an already coerced value. Returns the value
/// (possibly normalized) or a [`ValidationError`] that stops the chain.
#[derive(Clone)]
pub struct Validator {
    name: String,
    builtin: bool,
    func: Arc<ValidatorFn>,
}

impl Validator {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Value) -> Result<Value, ValidationError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            builtin: false,
            func: Arc::new(func),
        }
    }

    fn builtin<F>(name: &str, func: F) -> Self
    where
        F: Fn(Value) -> Result<Value, ValidationError> + Send + Sync + 'static,
    {
        Self {
            builtin: true,
            ..Self::new(name, func)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Builtin validators come from the setting's own constraints rather than
    /// its `validators` field.
    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    pub fn call(&self, value: Value) -> Result<Value, ValidationError> {
        (self.func)(value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("name", &self.name)
            .field("builtin", &self.builtin)
            .finish()
    }
}

impl PartialEq for Validator {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.func, &other.func)
    }
}

/// Order two numeric values of possibly different representations.
fn compare(value: &Value, bound: &Value) -> Option<Ordering> {
    match (value, bound) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
        _ => {
            let a = as_f64(value)?;
            let b = as_f64(bound)?;
            a.partial_cmp(&b)
        }
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::Decimal(d) => Some(d.to_f64()),
        _ => None,
    }
}

fn char_len(value: &Value) -> Option<usize> {
    value.as_str().map(|s| s.chars().count())
}

pub fn decimal_places_validator(decimal_places: u32) -> Validator {
    Validator::builtin("decimal_places", move |value| {
        if let Some(d) = value.as_decimal()
            && d.decimal_places() > decimal_places
        {
            return Err(ValidationError::new(format!(
                "Ensure that there are no more than {decimal_places} decimal places."
            )));
        }
        Ok(value)
    })
}

pub fn max_digits_validator(max_digits: u32) -> Validator {
    Validator::builtin("max_digits", move |value| {
        if let Some(d) = value.as_decimal()
            && d.total_digits() > u64::from(max_digits)
        {
            return Err(ValidationError::new(format!(
                "Ensure that there are no more than {max_digits} digits in total."
            )));
        }
        Ok(value)
    })
}

pub fn max_length_validator(max_length: usize) -> Validator {
    Validator::builtin("max_length", move |value| {
        if char_len(&value).is_some_and(|len| len > max_length) {
            return Err(ValidationError::new(format!(
                "Ensure that length of value is less than or equal to {max_length}."
            )));
        }
        Ok(value)
    })
}

pub fn min_length_validator(min_length: usize) -> Validator {
    Validator::builtin("min_length", move |value| {
        if char_len(&value).is_some_and(|len| len < min_length) {
            return Err(ValidationError::new(format!(
                "Ensure that length of value is greater than or equal to {min_length}."
            )));
        }
        Ok(value)
    })
}

pub fn max_value_validator(max_value: Value) -> Validator {
    Validator::builtin("max_value", move |value| {
        if compare(&value, &max_value) == Some(Ordering::Greater) {
            return Err(ValidationError::new(format!(
                "Ensure this value is less than or equal to {max_value}."
            )));
        }
        Ok(value)
    })
}

pub fn min_value_validator(min_value: Value) -> Validator {
    Validator::builtin("min_value", move |value| {
        if compare(&value, &min_value) == Some(Ordering::Less) {
            return Err(ValidationError::new(format!(
                "Ensure this value is greater than or equal to {min_value}."
            )));
        }
        Ok(value)
    })
}

/// Full-match regex validator. An invalid pattern is logged and yields no
/// validator.
pub fn regex_validator(pattern: &str) -> Option<Validator> {
    let compiled = match Regex::new(&format!("^(?:{pattern})$")) {
        Ok(re) => re,
        Err(e) => {
            error!("Cannot compile regex {pattern:?}: {e}");
            return None;
        }
    };
    Some(Validator::builtin("regex", move |value| {
        match value.as_str() {
            Some(s) if compiled.is_match(s) => Ok(value),
            _ => Err(ValidationError::new("Enter a valid value.")),
        }
    }))
}

pub fn choices_validator(allowed: Vec<String>) -> Validator {
    Validator::builtin("choices", move |value| {
        match value.as_str() {
            Some(s) if allowed.iter().any(|c| c == s) => Ok(value),
            _ => Err(ValidationError::new(format!(
                "Select a valid choice. {value} is not one of the available choices."
            ))),
        }
    })
}
