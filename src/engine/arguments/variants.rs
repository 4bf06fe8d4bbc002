use std::sync::Arc;

use crate::engine::{arguments::{argument::ArgumentDescriptor, parsers::ArgValue}, chat_event::chat_event::ChatEvent, commands::commands::CommandDescriptor};

/// A command with some defaultable arguments left out.
///
/// `kept[i]` is the index in the parent's argument list of the variant's i-th argument.
/// The command itself is the variant that omits nothing.
#[derive(Debug, Clone)]
pub struct CommandVariant {
    pub command: Arc<CommandDescriptor>,
    kept: Vec<usize>,
    omitted: Vec<usize>,
}

impl CommandVariant {
    pub fn full(command: Arc<CommandDescriptor>) -> Self {
        let kept = (0..command.arguments.len()).collect();
        CommandVariant { command, kept, omitted: Vec::new() }
    }

    pub fn is_variant(&self) -> bool {
        !self.omitted.is_empty()
    }

    pub fn kept(&self) -> &[usize] {
        &self.kept
    }

    pub fn omitted(&self) -> &[usize] {
        &self.omitted
    }

    pub fn arguments(&self) -> impl Iterator<Item = &ArgumentDescriptor> + '_ {
        self.kept.iter().map(move |&i| &self.command.arguments[i])
    }

    pub fn argument_count(&self) -> usize {
        self.kept.len()
    }

    pub fn last_is_endless(&self) -> bool {
        self.arguments().last().is_some_and(ArgumentDescriptor::is_endless)
    }

    /// How far the kept arguments moved from their declared positions.
    pub fn displacement(&self) -> usize {
        self.kept.iter().enumerate().map(|(pos, &parent)| parent.abs_diff(pos)).sum()
    }

    /// Puts parsed values back into declaration order, filling omitted slots from defaults.
    pub fn reassemble(&self, values: Vec<ArgValue>, raw: Vec<String>, event: &ChatEvent) -> (Vec<ArgValue>, Vec<Option<String>>) {
        let total = self.command.arguments.len();
        let mut full_values: Vec<ArgValue> = vec![ArgValue::Null; total];
        let mut full_raw: Vec<Option<String>> = vec![None; total];

        for &index in &self.omitted {
            full_values[index] = self.command.arguments[index].default_for(event);
        }

        for ((&index, value), raw) in self.kept.iter().zip(values).zip(raw) {
            full_values[index] = value;
            full_raw[index] = Some(raw);
        }

        (full_values, full_raw)
    }
}

/// Every way of leaving out a non-empty subset of the defaultable arguments, `2^k - 1`
/// variants for `k` of them, in bitmask order.
pub fn generate_variants(command: &Arc<CommandDescriptor>) -> Vec<CommandVariant> {
    let defaultable: Vec<usize> = command
        .arguments
        .iter()
        .enumerate()
        .filter(|(_, arg)| arg.has_default())
        .map(|(i, _)| i)
        .collect();

    let k = defaultable.len();
    let mut variants = Vec::with_capacity((1usize << k).saturating_sub(1));

    for mask in 1usize..(1 << k) {
        let omitted: Vec<usize> = defaultable
            .iter()
            .enumerate()
            .filter(|(bit, _)| mask & (1 << bit) != 0)
            .map(|(_, &index)| index)
            .collect();

        let kept = (0..command.arguments.len()).filter(|i| !omitted.contains(i)).collect();

        variants.push(CommandVariant { command: command.clone(), kept, omitted });
    }

    variants
}
