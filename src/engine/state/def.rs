use std::{collections::HashMap, io};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::{arguments::parsers::TypeTag, commands::commands::CommandPolicy, options::options::{DuplicateOptionPolicy, UnknownOptionPolicy}, tokenizer::tokenizer::TrimPolicy};

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct EngineConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    // None means every async command may run at once
    #[serde(default)]
    pub max_workers: Option<usize>,
    #[serde(default = "default_true")]
    pub reply_on_failure: bool,
    #[serde(default = "default_true")]
    pub reply_on_rejection: bool,
    #[serde(default)]
    pub trim: TrimPolicy,
    #[serde(default)]
    pub unknown_options: UnknownOptionPolicy,
    #[serde(default)]
    pub duplicate_options: DuplicateOptionPolicy,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default = "default_max_optional")]
    pub max_optional_arguments: usize,
    //Per-command overrides, keyed by full command path
    #[serde(default)]
    pub overrides: HashMap<String, CommandPolicy>,
}

pub(crate) fn default_prefix() -> String {
    "!".into()
}

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_max_optional() -> usize {
    8
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("JSON deserialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Command `{0}` has an empty trigger")]
    EmptyTrigger(String),
    #[error("Command `{command}`: endless argument `{argument}` must be the last argument")]
    EndlessNotLast { command: String, argument: String },
    #[error("Command `{0}` declares more than one endless argument")]
    MultipleEndless(String),
    #[error("Command `{command}`: argument name `{argument}` is declared twice")]
    DuplicateArgument { command: String, argument: String },
    #[error("Command `{command}`: no parser registered for {tag}")]
    UnknownParser { command: String, tag: TypeTag },
    #[error("Command `{command}` has {count} optional arguments, limit is {limit}")]
    TooManyOptionalArguments { command: String, count: usize, limit: usize },
    #[error("Command `{command}` failed: {reason}")]
    Handler { command: String, reason: String },
    #[error("{0}")]
    Custom(String),
}

/// Match-time failure of a single candidate command.
///
/// These never abort a dispatch on their own; they are collected per candidate and only
/// surface once no candidate parses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("`{raw}` is not a valid {argument}: {reason}")]
    ArgumentParse { argument: String, raw: String, reason: String },
    #[error("missing value for `{argument}`")]
    OutOfContent { argument: String },
    #[error("missing required argument `{argument}`")]
    MissingRequiredArgument { argument: String },
    #[error("expected {expected} arguments but got {actual}")]
    InvalidArgumentCount { expected: usize, actual: usize },
    #[error("unexpected trailing content `{overflow}`")]
    ContentOverflow { overflow: String },
    #[error("unknown option `--{name}`")]
    UnknownOption { name: String },
    #[error("option `--{name}` given more than once")]
    DuplicateOption { name: String },
    #[error("`{trigger}` needs a sub-command")]
    PassiveCommand { trigger: String },
}

impl ParseError {
    /// True for value parse failures, including the out-of-content subtype.
    pub fn is_argument_parse(&self) -> bool {
        matches!(self, ParseError::ArgumentParse { .. } | ParseError::OutOfContent { .. })
    }

    pub fn is_out_of_content(&self) -> bool {
        matches!(self, ParseError::OutOfContent { .. })
    }

    /// An argument parse failure that is not just missing input.
    pub fn is_genuine_argument_error(&self) -> bool {
        matches!(self, ParseError::ArgumentParse { .. })
    }
}
