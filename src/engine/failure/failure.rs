use std::{collections::HashSet, sync::Arc};

use crate::engine::{commands::commands::CommandDescriptor, state::def::ParseError};

/// A candidate whose trigger matched but whose arguments did not parse.
#[derive(Debug, Clone)]
pub struct Failure {
    pub command: Arc<CommandDescriptor>,
    pub trigger: String,
    pub error: ParseError,
}

#[derive(Debug, Clone)]
pub enum FailureReport {
    /// One command was meant and one of its arguments was wrong.
    Specific(Failure),
    /// Commands the user may have meant, deduplicated, in failure order.
    Suggestions(Vec<Arc<CommandDescriptor>>),
}

impl FailureReport {
    pub fn suggestions(&self) -> &[Arc<CommandDescriptor>] {
        match self {
            FailureReport::Specific(_) => &[],
            FailureReport::Suggestions(commands) => commands,
        }
    }
}

/// Reduces the failures of a dispatch to something worth showing the user.
pub fn aggregate(failures: &[Failure]) -> Option<FailureReport> {
    if failures.is_empty() {
        return None;
    }

    let distinct: HashSet<usize> = failures.iter().map(|f| f.command.id).collect();
    if distinct.len() == 1 {
        if let Some(failure) = failures.iter().find(|f| f.error.is_genuine_argument_error()) {
            return Some(FailureReport::Specific(failure.clone()));
        }
    }

    let mut seen = HashSet::new();
    let mut suggestions = Vec::new();
    for failure in failures {
        push_suggestion(&failure.command, &mut seen, &mut suggestions);
    }

    Some(FailureReport::Suggestions(suggestions))
}

fn push_suggestion(command: &Arc<CommandDescriptor>, seen: &mut HashSet<usize>, out: &mut Vec<Arc<CommandDescriptor>>) {
    if !seen.insert(command.id) {
        return;
    }

    if command.is_passive() {
        for child in &command.children {
            push_suggestion(child, seen, out);
        }
    } else {
        out.push(command.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{arguments::{argument::ArgumentDescriptor, parsers::ParserRegistry}, commands::commands::CommandBuilder, state::def::EngineConfig};

    fn noop() -> CommandBuilder {
        CommandBuilder::new("noop").handle(|_| Box::pin(async { Ok(()) }))
    }

    fn build(builders: Vec<CommandBuilder>) -> Vec<Arc<CommandDescriptor>> {
        let mut next = 0;
        builders
            .into_iter()
            .flat_map(|b| b.build_tree(&ParserRegistry::with_defaults(), &EngineConfig::default(), &mut next).unwrap())
            .collect()
    }

    fn failure(command: &Arc<CommandDescriptor>, error: ParseError) -> Failure {
        Failure { command: command.clone(), trigger: command.path.clone(), error }
    }

    #[test]
    fn single_command_with_bad_value_is_specific() {
        let cmds = build(vec![CommandBuilder::new("roll").argument(ArgumentDescriptor::integer("dice")).handle(|_| Box::pin(async { Ok(()) }))]);
        let failures = vec![
            failure(&cmds[0], ParseError::OutOfContent { argument: "dice".into() }),
            failure(&cmds[0], ParseError::ArgumentParse { argument: "dice".into(), raw: "x".into(), reason: "nope".into() }),
        ];

        match aggregate(&failures).unwrap() {
            FailureReport::Specific(f) => assert!(f.error.is_genuine_argument_error()),
            other => panic!("expected specific, got {:?}", other),
        }
    }

    #[test]
    fn out_of_content_only_gives_suggestions() {
        let cmds = build(vec![CommandBuilder::new("roll").argument(ArgumentDescriptor::integer("dice")).handle(|_| Box::pin(async { Ok(()) }))]);
        let report = aggregate(&[failure(&cmds[0], ParseError::OutOfContent { argument: "dice".into() })]).unwrap();
        assert_eq!(report.suggestions().len(), 1);
    }

    #[test]
    fn passive_commands_are_replaced_by_children() {
        let cmds = build(vec![
            CommandBuilder::new("queue").sub_command(noop().alias("n")).sub_command(CommandBuilder::new("join").handle(|_| Box::pin(async { Ok(()) }))),
            CommandBuilder::new("queuesize").handle(|_| Box::pin(async { Ok(()) })),
        ]);
        let queue = &cmds[0];
        let size = &cmds[3];

        let failures = vec![
            failure(queue, ParseError::PassiveCommand { trigger: "queue".into() }),
            failure(size, ParseError::ContentOverflow { overflow: "x".into() }),
            failure(queue, ParseError::PassiveCommand { trigger: "queue".into() }),
        ];

        let paths: Vec<String> = aggregate(&failures).unwrap().suggestions().iter().map(|c| c.path.clone()).collect();
        assert_eq!(paths, vec!["queue noop", "queue join", "queuesize"]);
    }

    #[test]
    fn nothing_to_report() {
        assert!(aggregate(&[]).is_none());
    }
}
