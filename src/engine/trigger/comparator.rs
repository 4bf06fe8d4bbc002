use std::cmp::Ordering;

use crate::engine::arguments::variants::CommandVariant;

/// Effective number of arguments a candidate takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgCount {
    Finite(usize),
    Infinite,
}

impl ArgCount {
    pub fn of(variant: &CommandVariant) -> ArgCount {
        let mut count = 0usize;
        for arg in variant.arguments() {
            count += 1;
            if let Some(bounds) = arg.endless {
                match bounds.max {
                    Some(max) => count += max.saturating_sub(1),
                    None => return ArgCount::Infinite,
                }
            }
        }
        ArgCount::Finite(count)
    }
}

/// Orders so that more takes precedence, and unbounded comes after every finite count.
fn more_arguments_first(a: ArgCount, b: ArgCount) -> Ordering {
    match (a, b) {
        (ArgCount::Finite(a), ArgCount::Finite(b)) => b.cmp(&a),
        (ArgCount::Finite(_), ArgCount::Infinite) => Ordering::Less,
        (ArgCount::Infinite, ArgCount::Finite(_)) => Ordering::Greater,
        (ArgCount::Infinite, ArgCount::Infinite) => Ordering::Equal,
    }
}

/// Position by position, lower priority first. When one list is a prefix of the other the
/// longer one goes first.
fn parser_priorities(a: &CommandVariant, b: &CommandVariant) -> Ordering {
    a.arguments()
        .zip(b.arguments())
        .map(|(x, y)| x.effective_priority().cmp(&y.effective_priority()))
        .find(|o| o.is_ne())
        .unwrap_or_else(|| b.argument_count().cmp(&a.argument_count()))
}

/// Most specific first. `Less` means `a` is tried before `b`.
pub fn compare(a_trigger: &str, a: &CommandVariant, b_trigger: &str, b: &CommandVariant) -> Ordering {
    b_trigger
        .chars()
        .count()
        .cmp(&a_trigger.chars().count())
        .then_with(|| more_arguments_first(ArgCount::of(a), ArgCount::of(b)))
        .then_with(|| a.last_is_endless().cmp(&b.last_is_endless()))
        .then_with(|| parser_priorities(a, b))
        .then_with(|| b.command.case_sensitive.cmp(&a.command.case_sensitive))
        .then_with(|| {
            if a.command.id == b.command.id {
                a.displacement().cmp(&b.displacement())
            } else {
                Ordering::Equal
            }
        })
        .then_with(|| a.command.id.cmp(&b.command.id))
        .then_with(|| a.omitted().cmp(b.omitted()))
}
