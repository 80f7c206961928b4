#[cfg(test)]
pub mod test {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use tempfile::TempDir;

    use crate::error::ValidationError;
    use crate::registry::Registry;
    use crate::setting::{Fields, Setting};
    use crate::value::Value;

    /// Build a `Fields` map from literal pairs.
    pub fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn word_validator(registry: &mut Registry, word: &'static str) {
        registry.register_validator(&format!("core.validators.{word}"), move |value| {
            match value.as_str() {
                Some(s) if s.split_whitespace().any(|w| w == word) => Ok(value),
                _ => Err(ValidationError::new(format!(
                    "Value does not contain {word} word."
                ))),
            }
        });
    }

    /// Built-in types plus the `abc`/`xyz` word validators and one named
    /// choices sequence.
    pub fn registry() -> Arc<Registry> {
        let mut registry = Registry::new();
        word_validator(&mut registry, "abc");
        word_validator(&mut registry, "xyz");
        registry.register_choices(
            "core.choices.ROLE_CHOICES",
            vec![
                crate::choices::Choice::option("writer", "Writer"),
                crate::choices::Choice::option("editor", "Editor"),
            ],
        );
        Arc::new(registry)
    }

    /// A setting built from literal fields; `type` picks the kind.
    pub fn setting(pairs: &[(&str, &str)]) -> Setting {
        let registry = registry();
        let fields = fields(pairs);
        let type_name = fields.get("type").map(String::as_str).unwrap_or("string");
        let kind = registry.kind(type_name).expect("fixture uses a known type");
        Setting::new(kind, &fields, registry).expect("fixture setting is valid")
    }

    pub fn decimal(s: &str) -> Value {
        Value::Decimal(s.parse().expect("fixture decimal parses"))
    }

    // -- Configuration-definition files ---------------------------------------

    pub const PROJECT_CFG: &str = "\
[max_processes]
type = int
default = 2
min_value = 1
max_value = 16
label = Max processes
help_text = Maximum number of worker processes.

[hosts_file]
type = string
default = /etc/hosts
regex = /.*
label = Hosts file

[hourly_rate]
type = decimal
default = 15
decimal_places = 2
max_digits = 5
min_value = 1
label = Hourly rate
";

    pub const TESTAPP_CFG: &str = "\
[debug]
type = boolean
default = False
label = Debug
";

    pub const CORE_CFG: &str = "\
[app_setting]
type = string
label = App setting
required = False

[VALIDATOR_SETTING]
type = string
validators = core.validators.abc, core.validators.xyz
required = False
";

    /// Project file that overrides a namespace setting.
    pub const OVERRIDE_CFG: &str = "\
[INT_SETTING]
type = int
default = 24
min_value = 16
max_value = 32

[core.app_setting]
default = hello

[core.VALIDATOR_SETTING]
type = int
default = 42
";

    pub const DEFAULTS_CFG: &str = "\
hosts_file = /etc/hosts.default
INT_SETTING = 20
";

    /// A temporary directory holding the given files.
    pub struct Workspace {
        pub dir: TempDir,
    }

    impl Workspace {
        pub fn new(files: &[(&str, &str)]) -> Self {
            let dir = TempDir::new().expect("temp dir");
            for (name, content) in files {
                std::fs::write(dir.path().join(name), content).expect("write fixture");
            }
            Workspace { dir }
        }

        pub fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        pub fn root(&self) -> &Path {
            self.dir.path()
        }
    }
}
