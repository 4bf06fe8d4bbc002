use std::{sync::Arc, time::Instant};

use chrono::{DateTime, Utc};

use crate::engine::{arguments::parsers::ArgValue, commands::commands::{CommandDescriptor, ParsingMode}, options::options::OptionSet};

/// A fully parsed command, ready to run.
#[derive(Debug, Clone)]
pub struct ParsedInvocation {
    pub command: Arc<CommandDescriptor>,
    /// Parent indices of the arguments that were filled from defaults.
    pub omitted: Vec<usize>,
    pub trigger: String,
    /// One value per declared argument, in declaration order.
    pub arguments: Vec<ArgValue>,
    /// What the user typed for each argument, `None` for defaults.
    pub raw_arguments: Vec<Option<String>>,
    pub options: OptionSet,
    pub overflow: Option<String>,
    pub mode: ParsingMode,
    pub started_at: DateTime<Utc>,
    pub started: Instant,
}

impl ParsedInvocation {
    pub fn arg(&self, name: &str) -> Option<&ArgValue> {
        let index = self.command.arguments.iter().position(|a| a.name == name)?;
        self.arguments.get(index)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.arg(name).and_then(ArgValue::as_str)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.arg(name).and_then(ArgValue::as_i64)
    }

    pub fn has_option(&self, name: &str) -> bool {
        self.options.contains(name)
    }

    pub fn path(&self) -> &str {
        &self.command.path
    }
}
