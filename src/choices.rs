//! Parser for the compact choices grammar used by `choice` settings.
//!
//! Supported forms:
//!
//! ```text
//! a, b, c                              flat list, value doubles as label
//! (a, A), (b, B)                       value/label pairs
//! M { a, b }, F { c, d }               groups
//! A { (b, B), (c, C) }, D { (e, E) }   groups of labeled pairs
//! path.to.CHOICES                      named sequence from the registry
//! ```

use std::sync::LazyLock;

use regex::Regex;
use tracing::error;

use crate::registry::Registry;

static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^,]+),\s+([^\)]+)\)").expect("label regex is valid"));

static GROUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^{]+)\{([^}]+)\},?").expect("group regex is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Option { value: String, label: String },
    Group {
        label: String,
        options: Vec<(String, String)>,
    },
}

impl Choice {
    pub fn option(value: impl Into<String>, label: impl Into<String>) -> Self {
        Choice::Option {
            value: value.into(),
            label: label.into(),
        }
    }

    pub fn group(label: impl Into<String>, options: &[(&str, &str)]) -> Self {
        Choice::Group {
            label: label.into(),
            options: options
                .iter()
                .map(|(v, l)| (v.to_string(), l.to_string()))
                .collect(),
        }
    }
}

/// Parse a choices declaration. Malformed input is logged and yields no
/// choices.
pub fn parse_choices(value: &str, registry: &Registry) -> Vec<Choice> {
    let value = value.trim();
    if value.is_empty() {
        return Vec::new();
    }

    if !value.contains(',') && value.contains('.') {
        return match registry.choices(value) {
            Some(choices) => choices.to_vec(),
            None => {
                error!("Cannot load choices from {value:?} path");
                Vec::new()
            }
        };
    }

    if !value.contains('{') && !value.contains('}') {
        return parse_options(value)
            .into_iter()
            .map(|(value, label)| Choice::Option { value, label })
            .collect();
    }

    let groups: Vec<Choice> = GROUP_RE
        .captures_iter(value)
        .map(|caps| Choice::Group {
            label: caps[1].trim().to_string(),
            options: parse_options(caps[2].trim()),
        })
        .collect();

    if groups.is_empty() {
        error!("Cannot parse choices from {value:?}");
    }
    groups
}

fn parse_options(value: &str) -> Vec<(String, String)> {
    let labeled: Vec<(String, String)> = LABEL_RE
        .captures_iter(value)
        .map(|caps| (caps[1].trim().to_string(), caps[2].trim().to_string()))
        .collect();

    if !labeled.is_empty() {
        return labeled;
    }

    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| (item.to_string(), item.to_string()))
        .collect()
}

/// Every selectable value, groups flattened.
pub fn choice_values(choices: &[Choice]) -> Vec<String> {
    let mut values = Vec::new();
    for choice in choices {
        match choice {
            Choice::Option { value, .. } => values.push(value.clone()),
            Choice::Group { options, .. } => {
                values.extend(options.iter().map(|(value, _)| value.clone()));
            }
        }
    }
    values
}
