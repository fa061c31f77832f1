//! Tool configuration shared by the language server and the CLI.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Error;

/// Default delay between the last edit and the external syntax check.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// An external command: program plus fixed arguments. Input is always
/// passed on stdin.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ToolCommand {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolCommand {
    #[must_use]
    pub fn new(command: impl Into<String>, args: &[&str]) -> Self {
        Self {
            command: command.into(),
            args: args.iter().map(ToString::to_string).collect(),
        }
    }

    /// `nixfmt`, reading stdin and writing stdout.
    #[must_use]
    pub fn default_formatter() -> Self {
        Self::new("nixfmt", &[])
    }

    /// `nix-instantiate --parse -`: parse only, never evaluate.
    #[must_use]
    pub fn default_parser() -> Self {
        Self::new("nix-instantiate", &["--parse", "-"])
    }

    /// The command line as it would be typed, for messages.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl FromStr for ToolCommand {
    type Err = Error;

    /// Split on whitespace; the first word is the program.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let command = words
            .next()
            .ok_or_else(|| Error::InvalidCommand(s.to_string()))?;
        Ok(Self {
            command: command.to_string(),
            args: words.map(ToString::to_string).collect(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub formatter: ToolCommand,
    pub parser: ToolCommand,
    pub debounce_ms: u64,
}

impl Config {
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            formatter: ToolCommand::default_formatter(),
            parser: ToolCommand::default_parser(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() -> Result<(), serde_json::Error> {
        let config: Config = serde_json::from_value(serde_json::json!({
            "debounceMs": 250,
            "formatter": { "command": "alejandra", "args": ["-q"] }
        }))?;
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(config.formatter, ToolCommand::new("alejandra", &["-q"]));
        assert_eq!(config.parser, ToolCommand::default_parser());
        Ok(())
    }

    #[test]
    fn command_lines_split_on_whitespace() -> Result<(), Error> {
        let command: ToolCommand = "nixfmt  --strict".parse()?;
        assert_eq!(command, ToolCommand::new("nixfmt", &["--strict"]));
        assert_eq!(command.display(), "nixfmt --strict");
        assert!("   ".parse::<ToolCommand>().is_err());
        Ok(())
    }
}
