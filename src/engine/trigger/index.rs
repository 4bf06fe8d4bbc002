use std::{sync::Arc, time::Instant};

use chrono::Utc;
use tracing::{debug, info};

use crate::engine::{
    arguments::{parsers::{ParseContext, ParserRegistry}, resolver::resolve_arguments, variants::{CommandVariant, generate_variants}},
    chat_event::chat_event::ChatEvent,
    commands::{CommandGroup, commands::{CommandBuilder, CommandDescriptor}, invocation::ParsedInvocation},
    failure::failure::Failure,
    handler::handler::PlatformAdapter,
    options::options::{OptionRules, extract_options},
    state::def::{EngineConfig, EngineResult, ParseError},
    trigger::comparator::compare,
};

struct IndexEntry {
    trigger: String,
    variant: Arc<CommandVariant>,
}

/// A candidate whose trigger prefixes the text. `consumed` is the byte length of the
/// matched trigger in the text.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub trigger: String,
    pub variant: Arc<CommandVariant>,
    pub consumed: usize,
}

#[derive(Debug, Default)]
pub struct MatchOutcome {
    pub invocation: Option<ParsedInvocation>,
    /// Candidates tried before the winner, or all of them when nothing parsed.
    pub failures: Vec<Failure>,
}

impl MatchOutcome {
    /// Whether any trigger matched at all.
    pub fn is_empty(&self) -> bool {
        self.invocation.is_none() && self.failures.is_empty()
    }
}

pub struct TriggerIndex {
    registry: ParserRegistry,
    config: EngineConfig,
    commands: Vec<Arc<CommandDescriptor>>,
    entries: Vec<IndexEntry>,
    next_id: usize,
}

impl TriggerIndex {
    pub fn new(registry: ParserRegistry, config: EngineConfig) -> Self {
        TriggerIndex { registry, config, commands: Vec::new(), entries: Vec::new(), next_id: 0 }
    }

    pub fn registry(&self) -> &ParserRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ParserRegistry {
        &mut self.registry
    }

    pub fn commands(&self) -> &[Arc<CommandDescriptor>] {
        &self.commands
    }

    pub fn find(&self, path: &str) -> Option<&Arc<CommandDescriptor>> {
        self.commands.iter().find(|c| c.path == path)
    }

    /// Registers a command and its sub-commands, deriving every optional variant.
    /// Returns the top-level descriptor.
    pub fn register(&mut self, builder: CommandBuilder) -> EngineResult<Arc<CommandDescriptor>> {
        // build against a scratch counter so a failed build leaves ids untouched
        let mut next_id = self.next_id;
        let built = builder.build_tree(&self.registry, &self.config, &mut next_id)?;
        self.next_id = next_id;

        for command in &built {
            let mut variants = vec![CommandVariant::full(command.clone())];
            variants.extend(generate_variants(command));

            for trigger in &command.triggers {
                for variant in &variants {
                    self.entries.push(IndexEntry { trigger: trigger.clone(), variant: Arc::new(variant.clone()) });
                }
            }

            info!("Registered command `{}` ({} triggers, {} variants)", command.path, command.triggers.len(), variants.len() - 1);
            self.commands.push(command.clone());
        }

        Ok(built[0].clone())
    }

    pub fn register_group(&mut self, group: CommandGroup) -> EngineResult<Vec<Arc<CommandDescriptor>>> {
        debug!("Registering command group `{}`", group.name);
        group.commands.into_iter().map(|builder| self.register(builder)).collect()
    }

    /// Candidates whose trigger prefixes `raw`, most specific first.
    pub fn matches(&self, raw: &str) -> Vec<Candidate> {
        let mut found: Vec<Candidate> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let consumed = match_trigger(raw, &entry.trigger, entry.variant.command.case_sensitive)?;
                Some(Candidate { trigger: entry.trigger.clone(), variant: entry.variant.clone(), consumed })
            })
            .collect();

        found.sort_by(|a, b| compare(&a.trigger, &a.variant, &b.trigger, &b.variant));
        found
    }

    /// Tries candidates in order until one parses completely.
    pub fn resolve(&self, raw: &str, event: &ChatEvent, adapter: &dyn PlatformAdapter) -> MatchOutcome {
        let ctx = ParseContext { event, adapter };
        let developer = event.user_id().is_some_and(|id| adapter.is_developer(id));
        let mut outcome = MatchOutcome::default();

        for candidate in self.matches(raw) {
            let command = &candidate.variant.command;
            let fail = |error: ParseError| Failure { command: command.clone(), trigger: candidate.trigger.clone(), error };

            if command.is_passive() {
                outcome.failures.push(fail(ParseError::PassiveCommand { trigger: candidate.trigger.clone() }));
                continue;
            }

            let rules = OptionRules { unknown: command.unknown_options, duplicates: command.duplicate_options, developer };
            let (content, options) = match extract_options(&raw[candidate.consumed..], &command.options, rules) {
                Ok(extracted) => extracted,
                Err(e) => {
                    outcome.failures.push(fail(e));
                    continue;
                }
            };

            match resolve_arguments(&candidate.variant, &content, &ctx) {
                Ok(resolution) => {
                    let (arguments, raw_arguments) = candidate.variant.reassemble(resolution.values, resolution.raw, event);
                    debug!("Matched `{}` via `{}` ({} failed before it)", command.path, candidate.trigger, outcome.failures.len());
                    outcome.invocation = Some(ParsedInvocation {
                        command: command.clone(),
                        omitted: candidate.variant.omitted().to_vec(),
                        trigger: candidate.trigger.clone(),
                        arguments,
                        raw_arguments,
                        options,
                        overflow: resolution.overflow,
                        mode: resolution.mode,
                        started_at: Utc::now(),
                        started: Instant::now(),
                    });
                    return outcome;
                }
                Err(e) => outcome.failures.push(fail(e)),
            }
        }

        outcome
    }
}

/// Byte length of `trigger` at the start of `raw` if it is followed by a space or the end.
pub fn match_trigger(raw: &str, trigger: &str, case_sensitive: bool) -> Option<usize> {
    let mut chars = raw.char_indices();

    for expected in trigger.chars() {
        let (_, actual) = chars.next()?;
        let same = if case_sensitive {
            actual == expected
        } else {
            actual == expected || actual.to_lowercase().eq(expected.to_lowercase())
        };
        if !same {
            return None;
        }
    }

    match chars.next() {
        None => Some(raw.len()),
        Some((index, ' ')) => Some(index),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_needs_word_boundary() {
        assert_eq!(match_trigger("ping", "ping", false), Some(4));
        assert_eq!(match_trigger("ping me", "ping", false), Some(4));
        assert_eq!(match_trigger("pingme", "ping", false), None);
        assert_eq!(match_trigger("pin", "ping", false), None);
    }

    #[test]
    fn case_handling() {
        assert_eq!(match_trigger("PING x", "ping", false), Some(4));
        assert_eq!(match_trigger("PING x", "ping", true), None);
        assert_eq!(match_trigger("ÜBER", "über", false), Some("ÜBER".len()));
    }
}
