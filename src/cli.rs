//! Clap adapter for setman.
//!
//! Compiled only with the `clap` Cargo feature (on by default). The only
//! bridge to the core is [`CheckArgs::into_action()`], which converts parsed
//! arguments into an [`Action`](crate::Action) for
//! [`LazySettings::handle()`](crate::LazySettings::handle). Apps using a
//! different CLI parser construct the `Action` directly.

use clap::Args;

use crate::types::Action;

/// Clap-derived args for a `check` subcommand.
///
/// ```ignore
/// #[derive(Subcommand)]
/// enum Commands {
///     /// Check setman configuration or store default values.
///     Check(CheckArgs),
/// }
/// ```
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Store default values of every declared setting.
    #[arg(short, long)]
    pub default_values: bool,

    /// 0 prints only confirmations, 1 or more lists every setting.
    #[arg(short, long, default_value_t = 1)]
    pub verbosity: u8,
}

impl CheckArgs {
    pub fn into_action(self) -> Action {
        Action::Check {
            default_values: self.default_values,
            verbosity: self.verbosity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        check: CheckArgs,
    }

    fn parse(args: &[&str]) -> Action {
        TestCli::try_parse_from(args).unwrap().check.into_action()
    }

    #[test]
    fn bare_check() {
        assert_eq!(
            parse(&["test"]),
            Action::Check {
                default_values: false,
                verbosity: 1
            }
        );
    }

    #[test]
    fn store_defaults_quietly() {
        assert_eq!(
            parse(&["test", "-d", "-v", "0"]),
            Action::Check {
                default_values: true,
                verbosity: 0
            }
        );
    }

    #[test]
    fn long_flags() {
        assert_eq!(
            parse(&["test", "--default-values", "--verbosity", "2"]),
            Action::Check {
                default_values: true,
                verbosity: 2
            }
        );
    }

    #[test]
    fn unknown_flag_errors() {
        assert!(TestCli::try_parse_from(["test", "--scope", "global"]).is_err());
    }
}
