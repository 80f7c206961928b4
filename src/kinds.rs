//! Built-in setting kinds: boolean, choice, decimal, float, int and string.

use std::sync::OnceLock;

use crate::choices::{Choice, choice_values, parse_choices};
use crate::decimal::Decimal;
use crate::field::FieldArg;
use crate::registry::Registry;
use crate::setting::{Fields, SettingKind, force_bool};
use crate::validators::{
    Validator, choices_validator, decimal_places_validator, max_digits_validator,
    max_length_validator, max_value_validator, min_length_validator, min_value_validator,
    regex_validator,
};
use crate::value::Value;

/// Parse an integer constraint the way an `int` setting would.
fn int_field(fields: &Fields, key: &str) -> Option<Option<i64>> {
    fields
        .get(key)
        .map(|raw| IntKind::default().to_python(&Value::from(raw.as_str())).and_then(|v| v.as_i64()))
}

fn non_negative(value: Option<i64>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

fn optional_arg(value: Option<Value>) -> FieldArg {
    FieldArg::Value(value.unwrap_or(Value::Null))
}

#[derive(Debug, Clone, Default)]
pub struct BooleanKind;

impl SettingKind for BooleanKind {
    fn type_name(&self) -> &str {
        "boolean"
    }

    fn default_required(&self) -> bool {
        false
    }

    fn to_python(&self, value: &Value) -> Option<Value> {
        force_bool(value).map(Value::Bool)
    }

    fn update(&mut self, _fields: &Fields) {}

    fn clone_box(&self) -> Box<dyn SettingKind> {
        Box::new(self.clone())
    }
}

/// Choice values are strings; `choices` is parsed on first access.
#[derive(Debug, Clone, Default)]
pub struct ChoiceKind {
    declaration: Option<String>,
    parsed: OnceLock<Vec<Choice>>,
}

impl ChoiceKind {
    fn parsed(&self, registry: &Registry) -> &[Choice] {
        self.parsed.get_or_init(|| match &self.declaration {
            Some(declaration) => parse_choices(declaration, registry),
            None => Vec::new(),
        })
    }
}

impl SettingKind for ChoiceKind {
    fn type_name(&self) -> &str {
        "choice"
    }

    fn to_python(&self, value: &Value) -> Option<Value> {
        match value {
            Value::Null | Value::Map(_) => None,
            Value::String(_) => Some(value.clone()),
            other => Some(Value::String(other.to_string())),
        }
    }

    fn update(&mut self, fields: &Fields) {
        if let Some(declaration) = fields.get("choices") {
            self.declaration = Some(declaration.clone());
            self.parsed = OnceLock::new();
        }
    }

    fn builtin_validators(&self, registry: &Registry) -> Vec<Validator> {
        let choices = self.parsed(registry);
        if choices.is_empty() {
            return Vec::new();
        }
        vec![choices_validator(choice_values(choices))]
    }

    fn field_kwargs(&self, registry: &Registry) -> Vec<(&'static str, FieldArg)> {
        vec![("choices", FieldArg::Choices(self.parsed(registry).to_vec()))]
    }

    fn choices(&self, registry: &Registry) -> Option<Vec<Choice>> {
        Some(self.parsed(registry).to_vec())
    }

    fn clone_box(&self) -> Box<dyn SettingKind> {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DecimalKind {
    pub decimal_places: Option<u32>,
    pub max_digits: Option<u32>,
    pub max_value: Option<Decimal>,
    pub min_value: Option<Decimal>,
}

impl DecimalKind {
    fn decimal(&self, raw: &str) -> Option<Decimal> {
        self.to_python(&Value::from(raw))
            .and_then(|v| v.as_decimal().cloned())
    }
}

impl SettingKind for DecimalKind {
    fn type_name(&self) -> &str {
        "decimal"
    }

    fn to_python(&self, value: &Value) -> Option<Value> {
        let decimal = match value {
            Value::Decimal(d) => d.clone(),
            Value::Int(i) => Decimal::from(*i),
            Value::Float(f) => Decimal::from_f64(*f)?,
            Value::String(s) => s.parse().ok()?,
            _ => return None,
        };
        Some(Value::Decimal(decimal))
    }

    fn update(&mut self, fields: &Fields) {
        if let Some(places) = int_field(fields, "decimal_places") {
            self.decimal_places = non_negative(places);
        }
        if let Some(digits) = int_field(fields, "max_digits") {
            self.max_digits = non_negative(digits);
        }
        if let Some(raw) = fields.get("max_value") {
            self.max_value = self.decimal(raw);
        }
        if let Some(raw) = fields.get("min_value") {
            self.min_value = self.decimal(raw);
        }
    }

    fn builtin_validators(&self, _registry: &Registry) -> Vec<Validator> {
        let mut validators = Vec::new();
        if let Some(places) = self.decimal_places {
            validators.push(decimal_places_validator(places));
        }
        if let Some(digits) = self.max_digits {
            validators.push(max_digits_validator(digits));
        }
        if let Some(max) = &self.max_value {
            validators.push(max_value_validator(Value::Decimal(max.clone())));
        }
        if let Some(min) = &self.min_value {
            validators.push(min_value_validator(Value::Decimal(min.clone())));
        }
        validators
    }

    fn field_kwargs(&self, _registry: &Registry) -> Vec<(&'static str, FieldArg)> {
        vec![
            (
                "decimal_places",
                optional_arg(self.decimal_places.map(|v| Value::Int(i64::from(v)))),
            ),
            (
                "max_digits",
                optional_arg(self.max_digits.map(|v| Value::Int(i64::from(v)))),
            ),
            ("max_value", optional_arg(self.max_value.clone().map(Value::Decimal))),
            ("min_value", optional_arg(self.min_value.clone().map(Value::Decimal))),
        ]
    }

    fn clone_box(&self) -> Box<dyn SettingKind> {
        Box::new(self.clone())
    }
}

/// Integers; floats and decimals truncate toward zero.
#[derive(Debug, Clone, Default)]
pub struct IntKind {
    pub max_value: Option<i64>,
    pub min_value: Option<i64>,
}

impl SettingKind for IntKind {
    fn type_name(&self) -> &str {
        "int"
    }

    fn to_python(&self, value: &Value) -> Option<Value> {
        let int = match value {
            Value::Int(i) => *i,
            Value::Bool(b) => i64::from(*b),
            Value::Float(f) if f.is_finite() => {
                let truncated = f.trunc();
                if truncated < i64::MIN as f64 || truncated > i64::MAX as f64 {
                    return None;
                }
                truncated as i64
            }
            Value::Decimal(d) => d.trunc_to_i64()?,
            Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        Some(Value::Int(int))
    }

    fn update(&mut self, fields: &Fields) {
        if let Some(max) = int_field(fields, "max_value") {
            self.max_value = max;
        }
        if let Some(min) = int_field(fields, "min_value") {
            self.min_value = min;
        }
    }

    fn builtin_validators(&self, _registry: &Registry) -> Vec<Validator> {
        let mut validators = Vec::new();
        if let Some(max) = self.max_value {
            validators.push(max_value_validator(Value::Int(max)));
        }
        if let Some(min) = self.min_value {
            validators.push(min_value_validator(Value::Int(min)));
        }
        validators
    }

    fn field_kwargs(&self, _registry: &Registry) -> Vec<(&'static str, FieldArg)> {
        vec![
            ("max_value", optional_arg(self.max_value.map(Value::Int))),
            ("min_value", optional_arg(self.min_value.map(Value::Int))),
        ]
    }

    fn clone_box(&self) -> Box<dyn SettingKind> {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FloatKind {
    pub max_value: Option<f64>,
    pub min_value: Option<f64>,
}

impl FloatKind {
    fn float(&self, raw: &str) -> Option<f64> {
        self.to_python(&Value::from(raw)).and_then(|v| v.as_f64())
    }
}

impl SettingKind for FloatKind {
    fn type_name(&self) -> &str {
        "float"
    }

    fn to_python(&self, value: &Value) -> Option<Value> {
        let float = match value {
            Value::Float(f) => *f,
            Value::Int(i) => *i as f64,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Decimal(d) => d.to_f64(),
            Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        Some(Value::Float(float))
    }

    fn update(&mut self, fields: &Fields) {
        if let Some(raw) = fields.get("max_value") {
            self.max_value = self.float(raw);
        }
        if let Some(raw) = fields.get("min_value") {
            self.min_value = self.float(raw);
        }
    }

    fn builtin_validators(&self, _registry: &Registry) -> Vec<Validator> {
        let mut validators = Vec::new();
        if let Some(max) = self.max_value {
            validators.push(max_value_validator(Value::Float(max)));
        }
        if let Some(min) = self.min_value {
            validators.push(min_value_validator(Value::Float(min)));
        }
        validators
    }

    fn field_kwargs(&self, _registry: &Registry) -> Vec<(&'static str, FieldArg)> {
        vec![
            ("max_value", optional_arg(self.max_value.map(Value::Float))),
            ("min_value", optional_arg(self.min_value.map(Value::Float))),
        ]
    }

    fn clone_box(&self) -> Box<dyn SettingKind> {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StringKind {
    pub max_length: Option<usize>,
    pub min_length: Option<usize>,
    pub regex: Option<String>,
}

impl SettingKind for StringKind {
    fn type_name(&self) -> &str {
        "string"
    }

    fn to_python(&self, value: &Value) -> Option<Value> {
        match value {
            Value::Null | Value::Map(_) => None,
            Value::String(_) => Some(value.clone()),
            other => Some(Value::String(other.to_string())),
        }
    }

    fn update(&mut self, fields: &Fields) {
        if let Some(max) = int_field(fields, "max_length") {
            self.max_length = max.and_then(|v| usize::try_from(v).ok());
        }
        if let Some(min) = int_field(fields, "min_length") {
            self.min_length = min.and_then(|v| usize::try_from(v).ok());
        }
        if let Some(regex) = fields.get("regex") {
            self.regex = Some(regex.clone()).filter(|r| !r.is_empty());
        }
    }

    fn builtin_validators(&self, _registry: &Registry) -> Vec<Validator> {
        let mut validators = Vec::new();
        if let Some(max) = self.max_length {
            validators.push(max_length_validator(max));
        }
        if let Some(min) = self.min_length {
            validators.push(min_length_validator(min));
        }
        if let Some(validator) = self.regex.as_deref().and_then(regex_validator) {
            validators.push(validator);
        }
        validators
    }

    fn field_kwargs(&self, _registry: &Registry) -> Vec<(&'static str, FieldArg)> {
        let to_int = |v: Option<usize>| v.and_then(|v| i64::try_from(v).ok()).map(Value::Int);
        let mut kwargs = vec![
            ("max_length", optional_arg(to_int(self.max_length))),
            ("min_length", optional_arg(to_int(self.min_length))),
        ];
        if let Some(regex) = &self.regex {
            kwargs.push(("regex", FieldArg::Value(Value::from(regex.as_str()))));
        }
        kwargs
    }

    fn clone_box(&self) -> Box<dyn SettingKind> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::setting;

    fn dec(s: &str) -> Value {
        Value::Decimal(s.parse().unwrap())
    }

    #[test]
    fn coercion_is_idempotent() {
        let kinds: Vec<(Box<dyn SettingKind>, Value)> = vec![
            (Box::new(BooleanKind), Value::from("yes")),
            (Box::new(ChoiceKind::default()), Value::from("pear")),
            (Box::new(DecimalKind::default()), Value::from("8.50")),
            (Box::new(IntKind::default()), Value::from(" 24 ")),
            (Box::new(FloatKind::default()), Value::from("80.4")),
            (Box::new(StringKind::default()), Value::from("hello")),
        ];
        for (kind, raw) in kinds {
            let once = kind.to_python(&raw).unwrap();
            let twice = kind.to_python(&once).unwrap();
            assert_eq!(once, twice, "{}", kind.type_name());
        }
    }

    #[test]
    fn boolean_rejects_unknown_tokens() {
        assert_eq!(BooleanKind.to_python(&Value::from("perhaps")), None);
    }

    #[test]
    fn int_parsing() {
        let kind = IntKind::default();
        assert_eq!(kind.to_python(&Value::from("16")), Some(Value::Int(16)));
        assert_eq!(kind.to_python(&Value::from("abc")), None);
        assert_eq!(kind.to_python(&Value::from("12.5")), None);
        assert_eq!(kind.to_python(&Value::Float(12.9)), Some(Value::Int(12)));
        assert_eq!(kind.to_python(&Value::Null), None);
    }

    #[test]
    fn float_parsing() {
        let kind = FloatKind::default();
        assert_eq!(kind.to_python(&Value::from("189.2")), Some(Value::Float(189.2)));
        assert_eq!(kind.to_python(&Value::Int(3)), Some(Value::Float(3.0)));
        assert_eq!(kind.to_python(&Value::from("")), None);
    }

    #[test]
    fn decimal_keeps_precision() {
        let kind = DecimalKind::default();
        assert_eq!(kind.to_python(&Value::from("5.33")), Some(dec("5.33")));
        assert_eq!(kind.to_python(&Value::Int(15)), Some(dec("15")));
        assert_eq!(kind.to_python(&Value::from("abc")), None);
    }

    #[test]
    fn decimal_digits_and_places() {
        let s = setting(&[
            ("name", "D"),
            ("type", "decimal"),
            ("max_digits", "4"),
            ("decimal_places", "2"),
        ]);
        assert_eq!(s.validate(&Value::from("12.34")).unwrap(), dec("12.34"));
        assert!(s.validate(&Value::from("123.45")).is_err());
        assert!(s.validate(&Value::from("12.345")).is_err());
    }

    #[test]
    fn decimal_exponent_input_is_constrained() {
        let s = setting(&[("name", "D"), ("type", "decimal"), ("max_digits", "4")]);
        assert!(s.validate(&Value::from("10000")).is_err());
        assert!(s.validate(&Value::from("1e4")).is_err());
        assert_eq!(s.validate(&Value::from("1e3")).unwrap(), dec("1000"));
        assert_eq!(
            s.validate(&Value::from("1e999999999")).unwrap_err().message,
            "Enter a valid value."
        );
    }

    #[test]
    fn decimal_range() {
        let s = setting(&[
            ("name", "DECIMAL_SETTING"),
            ("type", "decimal"),
            ("default", "8.5"),
            ("max_digits", "4"),
            ("decimal_places", "2"),
            ("min_value", "0"),
            ("max_value", "10"),
        ]);
        assert_eq!(s.default_value(), &dec("8.5"));
        assert!(s.validate(&dec("-1")).is_err());
        assert!(s.validate(&dec("12")).is_err());
        assert!(s.validate(&dec("8.3451")).is_err());
        assert!(s.validate(&dec("5.33")).is_ok());
    }

    #[test]
    fn string_constraints() {
        let s = setting(&[
            ("name", "STRING_SETTING"),
            ("type", "string"),
            ("regex", "^[Ss].*"),
            ("max_length", "16"),
        ]);
        assert!(s.validate(&Value::from("setting")).is_ok());
        assert!(s.validate(&Value::from("Not started from s")).is_err());
        assert!(s.validate(&Value::from("something far too long")).is_err());
    }

    #[test]
    fn choice_membership() {
        let s = setting(&[
            ("name", "CHOICE_SETTING"),
            ("type", "choice"),
            ("choices", "apple, grape, peach, pear, waterlemon"),
            ("default", "pear"),
        ]);
        assert_eq!(s.default_value(), &Value::from("pear"));
        assert_eq!(s.choices().unwrap().len(), 5);
        assert!(s.validate(&Value::from("waterlemon")).is_ok());
        assert!(s.validate(&Value::from("pepper")).is_err());
    }

    #[test]
    fn grouped_choice_membership() {
        let s = setting(&[
            ("name", "CHOICE_SETTING_WITH_GROUPS"),
            ("type", "choice"),
            ("choices", "Men { Michael, John }, Women { Kate, Ann }"),
        ]);
        assert!(s.validate(&Value::from("Kate")).is_ok());
        assert!(s.validate(&Value::from("Men")).is_err());
    }

    #[test]
    fn choice_kwargs_carry_parsed_choices() {
        let s = setting(&[("name", "C"), ("type", "choice"), ("choices", "(a, A)")]);
        let kwargs = s.field_kwargs(Value::Null);
        let choices = kwargs.iter().find(|(k, _)| *k == "choices").unwrap();
        assert_eq!(choices.1, FieldArg::Choices(vec![Choice::option("a", "A")]));
    }
}
