use std::{sync::Arc, time::Duration};

use crate::engine::{
    commands::commands::CommandDescriptor,
    dispatcher::dispatcher::GateRejection,
    failure::failure::{Failure, FailureReport},
    permissions::permissions::PermissionLevel,
};

pub struct Replies;

impl Replies {
    pub fn cooldown(user: &str, remaining: Duration) -> String {
        let secs = remaining.as_secs_f64().ceil().max(1.0) as u64;
        format!("⏳ {user} slow down! Try again in {secs}s 💜")
    }

    pub fn missing_permission(user: &str, required: PermissionLevel) -> String {
        format!("❌ {user} you need to be {required} to use this command 😔")
    }

    pub fn nsfw_only(user: &str) -> String {
        format!("🔞 {user} this command only works in NSFW channels")
    }

    pub fn developer_only(user: &str) -> String {
        format!("🛠️ {user} this command is for developers only")
    }

    pub fn rejection(rejection: &GateRejection, user: &str) -> String {
        match rejection {
            GateRejection::DeveloperOnly => Self::developer_only(user),
            GateRejection::MissingPermission(level) => Self::missing_permission(user, *level),
            GateRejection::NsfwOnly => Self::nsfw_only(user),
            GateRejection::Cooldown(remaining) => Self::cooldown(user, *remaining),
        }
    }

    pub fn argument_error(failure: &Failure, prefix: &str) -> String {
        format!("❌ {} 👉 usage: {}{}", failure.error, prefix, failure.command.signature())
    }

    pub fn did_you_mean(commands: &[Arc<CommandDescriptor>], prefix: &str) -> String {
        let list = commands
            .iter()
            .map(|c| format!("{}{}", prefix, c.signature()))
            .collect::<Vec<_>>()
            .join(" | ");
        format!("🤔 Did you mean: {list}")
    }

    pub fn failure(report: &FailureReport, prefix: &str) -> String {
        match report {
            FailureReport::Specific(failure) => Self::argument_error(failure, prefix),
            FailureReport::Suggestions(commands) => Self::did_you_mean(commands, prefix),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_rounds_up_to_whole_seconds() {
        assert_eq!(Replies::cooldown("krap", Duration::from_millis(1200)), "⏳ krap slow down! Try again in 2s 💜");
        assert_eq!(Replies::cooldown("krap", Duration::from_millis(10)), "⏳ krap slow down! Try again in 1s 💜");
    }

    #[test]
    fn permission_reply_names_the_level() {
        let reply = Replies::rejection(&GateRejection::MissingPermission(PermissionLevel::Moderator), "krap");
        assert!(reply.contains("moderator"));
    }
}
