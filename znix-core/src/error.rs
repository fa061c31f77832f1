use std::fmt;

/// Which external tool an error came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    Formatter,
    Parser,
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Formatter => write!(f, "formatter"),
            Self::Parser => write!(f, "parser"),
        }
    }
}

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to run {tool} `{command}`: {source}")]
    Spawn {
        tool: Tool,
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while running {0}: {1}")]
    Io(Tool, #[source] std::io::Error),

    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: Tool,
        status: String,
        stderr: String,
    },

    #[error("{0} produced no output")]
    EmptyOutput(Tool),

    #[error("{0} produced invalid UTF-8: {1}")]
    InvalidOutput(Tool, #[source] std::string::FromUtf8Error),

    #[error("Invalid tool command: {0}")]
    InvalidCommand(String),
}

impl Error {
    /// The tool involved, if any.
    #[must_use]
    pub fn tool(&self) -> Option<Tool> {
        match self {
            Self::Spawn { tool, .. } | Self::ToolFailed { tool, .. } => Some(*tool),
            Self::Io(tool, _) | Self::EmptyOutput(tool) | Self::InvalidOutput(tool, _) => {
                Some(*tool)
            }
            Self::InvalidCommand(_) => None,
        }
    }
}
