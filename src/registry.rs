//! Explicit registry of setting types, named validators and named choices.
//!
//! Configuration files refer to these by string: a section's `type`, the
//! dotted names in its `validators` field, and a dotted `choices` path.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::choices::Choice;
use crate::error::ValidationError;
use crate::kinds::{BooleanKind, ChoiceKind, DecimalKind, FloatKind, IntKind, StringKind};
use crate::setting::SettingKind;
use crate::validators::Validator;
use crate::value::Value;

type KindCtor = Arc<dyn Fn() -> Box<dyn SettingKind> + Send + Sync>;

pub struct Registry {
    types: Vec<(String, KindCtor)>,
    validators: BTreeMap<String, Validator>,
    choices: BTreeMap<String, Vec<Choice>>,
}

impl Registry {
    /// A registry holding the six built-in setting types.
    pub fn new() -> Self {
        let mut registry = Registry {
            types: Vec::new(),
            validators: BTreeMap::new(),
            choices: BTreeMap::new(),
        };
        registry.register_kind::<BooleanKind>("boolean");
        registry.register_kind::<ChoiceKind>("choice");
        registry.register_kind::<DecimalKind>("decimal");
        registry.register_kind::<FloatKind>("float");
        registry.register_kind::<IntKind>("int");
        registry.register_kind::<StringKind>("string");
        registry
    }

    /// Register an additional setting type. Types registered later win over
    /// earlier ones with the same (case-insensitive) name.
    pub fn register_type<F>(&mut self, name: &str, ctor: F) -> &mut Self
    where
        F: Fn() -> Box<dyn SettingKind> + Send + Sync + 'static,
    {
        self.types.push((name.to_lowercase(), Arc::new(ctor)));
        self
    }

    pub fn register_kind<K>(&mut self, name: &str) -> &mut Self
    where
        K: SettingKind + Default + 'static,
    {
        self.register_type(name, || Box::new(K::default()))
    }

    pub fn register_validator<F>(&mut self, name: &str, func: F) -> &mut Self
    where
        F: Fn(Value) -> Result<Value, ValidationError> + Send + Sync + 'static,
    {
        self.validators
            .insert(name.to_string(), Validator::new(name, func));
        self
    }

    pub fn register_choices(&mut self, name: &str, choices: Vec<Choice>) -> &mut Self {
        self.choices.insert(name.to_string(), choices);
        self
    }

    /// A fresh kind for `type_name`, matched case-insensitively.
    pub fn kind(&self, type_name: &str) -> Option<Box<dyn SettingKind>> {
        let wanted = type_name.trim().to_lowercase();
        self.types
            .iter()
            .rev()
            .find(|(name, _)| *name == wanted)
            .map(|(_, ctor)| ctor())
    }

    pub fn validator(&self, name: &str) -> Option<&Validator> {
        self.validators.get(name)
    }

    pub fn choices(&self, name: &str) -> Option<&[Choice]> {
        self.choices.get(name).map(Vec::as_slice)
    }

    /// Registered type names, without duplicates, in registration order.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for (name, _) in &self.types {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.type_names())
            .field("validators", &self.validators.keys().collect::<Vec<_>>())
            .field("choices", &self.choices.keys().collect::<Vec<_>>())
            .finish()
    }
}
