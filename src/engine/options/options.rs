use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::{arguments::parsers::TypeTag, state::def::ParseError, tokenizer::tokenizer::{TrimPolicy, read_token}};

/// What to do with a ` --name` token that no option of the command answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownOptionPolicy {
    /// Strip it and still report it as present.
    Add,
    /// Leave it in the content as ordinary text.
    #[default]
    Include,
    Ignore,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateOptionPolicy {
    #[default]
    Ignore,
    Fail,
}

#[derive(Debug, Clone)]
pub struct OptionDescriptor {
    pub name: String,
    pub aliases: Vec<String>,
    pub type_tag: TypeTag,
    pub developer_only: bool,
    /// Presence when the option is not given; giving it toggles this.
    pub default: bool,
}

impl OptionDescriptor {
    pub fn flag(name: impl Into<String>) -> Self {
        OptionDescriptor {
            name: name.into().to_lowercase(),
            aliases: Vec::new(),
            type_tag: TypeTag::Boolean,
            developer_only: false,
            default: false,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into().to_lowercase());
        self
    }

    pub fn developer_only(mut self) -> Self {
        self.developer_only = true;
        self
    }

    pub fn present_by_default(mut self) -> Self {
        self.default = true;
        self
    }

    fn answers_to(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSet(BTreeSet<String>);

impl OptionSet {
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(&name.to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn toggle(&mut self, name: &str) {
        let name = name.to_lowercase();
        if !self.0.remove(&name) {
            self.0.insert(name);
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OptionRules {
    pub unknown: UnknownOptionPolicy,
    pub duplicates: DuplicateOptionPolicy,
    pub developer: bool,
}

enum Resolved<'a> {
    Known(&'a OptionDescriptor),
    Unknown,
}

/// Pulls ` --name` tokens out of `content`.
///
/// Quoted spans are left alone. Returns the content with the consumed tokens removed and
/// the set of options that ended up present.
pub fn extract_options(content: &str, table: &[OptionDescriptor], rules: OptionRules) -> Result<(String, OptionSet), ParseError> {
    let bytes = content.as_bytes();
    let mut stripped = String::with_capacity(content.len());
    let mut present = OptionSet::default();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut i = 0;

    for option in table.iter().filter(|o| o.default) {
        present.toggle(&option.name);
    }

    while i < bytes.len() {
        // only a quote the tokenizer would read as one protects its span
        if bytes[i] == b'"' && (i == 0 || bytes[i - 1] == b' ') {
            let token = read_token(&content[i..], TrimPolicy::None, true);
            if token.quoted {
                stripped.push_str(token.raw);
                i += token.raw.len();
                continue;
            }
        }

        if content[i..].starts_with(" --") {
            let name_start = i + 3;
            if name_start < bytes.len() && bytes[name_start] != b' ' {
                let name_end = content[name_start..].find(' ').map(|p| name_start + p).unwrap_or(bytes.len());
                let name = &content[name_start..name_end];

                let resolved = match table.iter().find(|o| o.answers_to(name)) {
                    Some(option) if option.developer_only && !rules.developer => Resolved::Unknown,
                    Some(option) => Resolved::Known(option),
                    None => Resolved::Unknown,
                };

                let keep = match resolved {
                    Resolved::Known(option) => {
                        if !seen.insert(option.name.clone()) {
                            if rules.duplicates == DuplicateOptionPolicy::Fail {
                                return Err(ParseError::DuplicateOption { name: option.name.clone() });
                            }
                        } else {
                            present.toggle(&option.name);
                        }
                        false
                    }
                    Resolved::Unknown => match rules.unknown {
                        UnknownOptionPolicy::Add => {
                            if seen.insert(name.to_lowercase()) {
                                present.toggle(name);
                            }
                            false
                        }
                        UnknownOptionPolicy::Include => true,
                        UnknownOptionPolicy::Ignore => {
                            debug!("Ignoring unknown option --{name}");
                            false
                        }
                        UnknownOptionPolicy::Fail => return Err(ParseError::UnknownOption { name: name.to_string() }),
                    },
                };

                if keep {
                    stripped.push_str(&content[i..name_end]);
                }
                i = name_end;
                continue;
            }
        }

        let Some(ch) = content[i..].chars().next() else {
            break;
        };
        stripped.push(ch);
        i += ch.len_utf8();
    }

    Ok((stripped, present))
}
