use core::fmt;
use std::{collections::HashSet, sync::Arc, time::Duration};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::engine::{
    arguments::{argument::ArgumentDescriptor, parsers::ParserRegistry},
    chat_event::chat_event::ChatEvent,
    commands::invocation::ParsedInvocation,
    cooldown::cooldown::{Cooldown, CooldownScope},
    handler::handler::PlatformAdapter,
    options::options::{DuplicateOptionPolicy, OptionDescriptor, UnknownOptionPolicy},
    permissions::permissions::PermissionLevel,
    state::def::{EngineConfig, EngineError, EngineResult},
    tokenizer::tokenizer::TrimPolicy,
};

pub type OrderingKeyFn = Arc<dyn Fn(&ParsedInvocation, &ChatEvent) -> Option<String> + Send + Sync>;

#[derive(Clone)]
pub enum ExecutionMode {
    /// Awaited by `dispatch` itself.
    Inline,
    /// Handed to the worker pool, no ordering.
    Async,
    /// Handed to the worker pool, sequential per key. A `None` key runs unordered.
    Ordered(OrderingKeyFn),
}

impl fmt::Debug for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Inline => write!(f, "Inline"),
            ExecutionMode::Async => write!(f, "Async"),
            ExecutionMode::Ordered(_) => write!(f, "Ordered"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    #[default]
    Fail,
    /// Keep leftover text on the invocation instead of failing.
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ParsingMode { Positional, Named }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ParsingModes {
    #[serde(default = "default_true")]
    pub positional: bool,
    #[serde(default)]
    pub named: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ParsingModes {
    fn default() -> Self {
        ParsingModes { positional: true, named: false }
    }
}

/// Per-command behaviour. Unset fields fall back to the engine config.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct CommandPolicy {
    #[serde(default)]
    pub cooldown: Option<Cooldown>,
    #[serde(default, rename = "async")]
    pub run_async: Option<bool>,
    #[serde(default)]
    pub overflow: Option<OverflowPolicy>,
    #[serde(default)]
    pub trim: Option<TrimPolicy>,
    #[serde(default)]
    pub modes: Option<ParsingModes>,
    #[serde(default)]
    pub case_sensitive: Option<bool>,
    #[serde(default)]
    pub unknown_options: Option<UnknownOptionPolicy>,
    #[serde(default)]
    pub duplicate_options: Option<DuplicateOptionPolicy>,
    #[serde(default)]
    pub permission: Option<PermissionLevel>,
    #[serde(default)]
    pub nsfw: Option<bool>,
    #[serde(default)]
    pub developer_only: Option<bool>,
}

impl CommandPolicy {
    /// Fields set in `other` win.
    pub fn merge(&mut self, other: &CommandPolicy) {
        macro_rules! take {
            ($($field:ident),+) => {
                $(if other.$field.is_some() { self.$field = other.$field; })+
            };
        }
        take!(cooldown, run_async, overflow, trim, modes, case_sensitive, unknown_options, duplicate_options, permission, nsfw, developer_only);
    }
}

pub trait CommandT: Send + Sync {
    fn execute(&self, ctx: CommandContext) -> BoxFuture<'static, EngineResult<()>>;
}

pub struct CommandContext {
    pub invocation: Arc<ParsedInvocation>,
    pub event: ChatEvent,
    pub adapter: Arc<dyn PlatformAdapter>,
}

impl CommandContext {
    pub async fn reply(&self, message: &str) -> EngineResult<()> {
        self.adapter.send_reply(&self.event, message).await
    }
}

pub struct FnCommand<F> {func: F} impl<F> FnCommand<F>
    where
        F: Fn(CommandContext) -> BoxFuture<'static, EngineResult<()>> + Send + Sync + 'static {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> CommandT for FnCommand<F> where
    F: Fn(CommandContext) -> BoxFuture<'static, EngineResult<()>> + Send + Sync + 'static {
        fn execute(&self, ctx: CommandContext) -> BoxFuture<'static, EngineResult<()>> {
            (self.func)(ctx)
        }
}

/// A registered command. Built by [`CommandBuilder`], never changed afterwards.
pub struct CommandDescriptor {
    pub id: usize,
    pub name: String,
    /// Parent names and this name joined by spaces.
    pub path: String,
    /// Every literal that invokes this command, longest first.
    pub triggers: Vec<String>,
    pub aliases: Vec<String>,
    pub parent: Option<String>,
    pub children: Vec<Arc<CommandDescriptor>>,
    pub description: String,
    pub arguments: Vec<ArgumentDescriptor>,
    pub options: Vec<OptionDescriptor>,
    pub case_sensitive: bool,
    pub cooldown: Option<Cooldown>,
    pub execution: ExecutionMode,
    pub overflow: OverflowPolicy,
    pub modes: ParsingModes,
    pub trim: TrimPolicy,
    pub unknown_options: UnknownOptionPolicy,
    pub duplicate_options: DuplicateOptionPolicy,
    pub permission: PermissionLevel,
    pub nsfw: bool,
    pub developer_only: bool,
    pub handler: Option<Arc<dyn CommandT>>,
}

impl CommandDescriptor {
    /// Only groups sub-commands.
    pub fn is_passive(&self) -> bool {
        self.handler.is_none()
    }

    pub fn signature(&self) -> String {
        let mut out = self.path.clone();
        for arg in &self.arguments {
            out.push(' ');
            out.push_str(&arg.signature());
        }
        out
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("triggers", &self.triggers)
            .field("arguments", &self.arguments)
            .field("execution", &self.execution)
            .field("cooldown", &self.cooldown)
            .field("passive", &self.is_passive())
            .finish()
    }
}

pub struct CommandBuilder {
    name: String,
    aliases: Vec<String>,
    description: String,
    arguments: Vec<ArgumentDescriptor>,
    options: Vec<OptionDescriptor>,
    policy: CommandPolicy,
    ordering: Option<OrderingKeyFn>,
    handler: Option<Arc<dyn CommandT>>,
    children: Vec<CommandBuilder>,
}

impl CommandBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        CommandBuilder {
            name: name.into(),
            aliases: Vec::new(),
            description: String::new(),
            arguments: Vec::new(),
            options: Vec::new(),
            policy: CommandPolicy::default(),
            ordering: None,
            handler: None,
            children: Vec::new(),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn argument(mut self, argument: ArgumentDescriptor) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn option(mut self, option: OptionDescriptor) -> Self {
        self.options.push(option);
        self
    }

    pub fn cooldown(mut self, duration: Duration, scope: CooldownScope) -> Self {
        self.policy.cooldown = Some(Cooldown::new(duration, scope));
        self
    }

    pub fn run_async(mut self) -> Self {
        self.policy.run_async = Some(true);
        self
    }

    /// Async, and sequential for invocations that produce the same key.
    pub fn ordered_by<F>(mut self, key: F) -> Self
    where
        F: Fn(&ParsedInvocation, &ChatEvent) -> Option<String> + Send + Sync + 'static,
    {
        self.policy.run_async = Some(true);
        self.ordering = Some(Arc::new(key));
        self
    }

    pub fn overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.policy.overflow = Some(overflow);
        self
    }

    pub fn trim(mut self, trim: TrimPolicy) -> Self {
        self.policy.trim = Some(trim);
        self
    }

    pub fn modes(mut self, positional: bool, named: bool) -> Self {
        self.policy.modes = Some(ParsingModes { positional, named });
        self
    }

    pub fn case_sensitive(mut self) -> Self {
        self.policy.case_sensitive = Some(true);
        self
    }

    pub fn unknown_options(mut self, policy: UnknownOptionPolicy) -> Self {
        self.policy.unknown_options = Some(policy);
        self
    }

    pub fn duplicate_options(mut self, policy: DuplicateOptionPolicy) -> Self {
        self.policy.duplicate_options = Some(policy);
        self
    }

    pub fn permission(mut self, permission: PermissionLevel) -> Self {
        self.policy.permission = Some(permission);
        self
    }

    pub fn nsfw(mut self) -> Self {
        self.policy.nsfw = Some(true);
        self
    }

    pub fn developer_only(mut self) -> Self {
        self.policy.developer_only = Some(true);
        self
    }

    pub fn policy(mut self, policy: CommandPolicy) -> Self {
        self.policy.merge(&policy);
        self
    }

    pub fn handler(mut self, handler: Arc<dyn CommandT>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn handle<F>(self, func: F) -> Self
    where
        F: Fn(CommandContext) -> BoxFuture<'static, EngineResult<()>> + Send + Sync + 'static,
    {
        self.handler(Arc::new(FnCommand::new(func)))
    }

    pub fn sub_command(mut self, child: CommandBuilder) -> Self {
        self.children.push(child);
        self
    }

    /// Builds this command and all of its sub-commands. The first element is this
    /// command, followed by its descendants depth first.
    pub fn build_tree(self, registry: &ParserRegistry, config: &EngineConfig, next_id: &mut usize) -> EngineResult<Vec<Arc<CommandDescriptor>>> {
        self.build_node(None, registry, config, next_id)
    }

    fn build_node(self, parent: Option<(&str, &[String])>, registry: &ParserRegistry, config: &EngineConfig, next_id: &mut usize) -> EngineResult<Vec<Arc<CommandDescriptor>>> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(EngineError::EmptyTrigger(parent.map(|(p, _)| p.to_string()).unwrap_or_default()));
        }

        let mut aliases: Vec<String> = Vec::new();
        for alias in self.aliases.iter().map(|a| a.trim()) {
            if !alias.is_empty() && alias != name && !aliases.iter().any(|a| a == alias) {
                aliases.push(alias.to_string());
            }
        }
        aliases.sort_by_key(|a| std::cmp::Reverse(a.chars().count()));

        let own: Vec<String> = std::iter::once(name.clone()).chain(aliases.iter().cloned()).collect();
        let (path, mut triggers) = match parent {
            None => (name.clone(), own),
            Some((parent_path, parent_triggers)) => (
                format!("{} {}", parent_path, name),
                parent_triggers.iter().flat_map(|p| own.iter().map(move |o| format!("{} {}", p, o))).collect(),
            ),
        };
        let mut seen = HashSet::new();
        triggers.retain(|t| seen.insert(t.clone()));
        triggers.sort_by_key(|t| std::cmp::Reverse(t.chars().count()));

        let mut policy = self.policy.clone();
        if let Some(overrides) = config.policy_for(&path) {
            policy.merge(overrides);
        }

        let arguments = validate_arguments(&path, self.arguments, registry, config)?;

        let id = *next_id;
        *next_id += 1;

        let mut descendants = Vec::new();
        let mut children = Vec::new();
        for child in self.children {
            let built = child.build_node(Some((path.as_str(), triggers.as_slice())), registry, config, next_id)?;
            children.push(built[0].clone());
            descendants.extend(built);
        }

        let execution = match (policy.run_async, self.ordering) {
            (Some(false), _) | (None, None) => ExecutionMode::Inline,
            (_, Some(key)) => ExecutionMode::Ordered(key),
            (Some(true), None) => ExecutionMode::Async,
        };

        let descriptor = Arc::new(CommandDescriptor {
            id,
            name,
            path,
            triggers,
            aliases,
            parent: parent.map(|(p, _)| p.to_string()),
            children,
            description: self.description,
            arguments,
            options: self.options,
            case_sensitive: policy.case_sensitive.unwrap_or(config.case_sensitive),
            cooldown: policy.cooldown.filter(|c| !c.duration.is_zero()),
            execution,
            overflow: policy.overflow.unwrap_or_default(),
            modes: policy.modes.unwrap_or_default(),
            trim: policy.trim.unwrap_or(config.trim),
            unknown_options: policy.unknown_options.unwrap_or(config.unknown_options),
            duplicate_options: policy.duplicate_options.unwrap_or(config.duplicate_options),
            permission: policy.permission.unwrap_or_default(),
            nsfw: policy.nsfw.unwrap_or(false),
            developer_only: policy.developer_only.unwrap_or(false),
            handler: self.handler,
        });

        let mut out = Vec::with_capacity(descendants.len() + 1);
        out.push(descriptor);
        out.extend(descendants);
        Ok(out)
    }
}

fn validate_arguments(path: &str, mut arguments: Vec<ArgumentDescriptor>, registry: &ParserRegistry, config: &EngineConfig) -> EngineResult<Vec<ArgumentDescriptor>> {
    let endless: Vec<usize> = arguments.iter().enumerate().filter(|(_, a)| a.is_endless()).map(|(i, _)| i).collect();
    if endless.len() > 1 {
        return Err(EngineError::MultipleEndless(path.to_string()));
    }
    if let Some(&index) = endless.first() {
        if index + 1 != arguments.len() {
            return Err(EngineError::EndlessNotLast { command: path.to_string(), argument: arguments[index].name.clone() });
        }
    }

    let mut names = HashSet::new();
    for arg in &mut arguments {
        if !names.insert(arg.name.to_lowercase()) {
            return Err(EngineError::DuplicateArgument { command: path.to_string(), argument: arg.name.clone() });
        }
        if !arg.bind(registry) {
            return Err(EngineError::UnknownParser { command: path.to_string(), tag: arg.type_tag.clone() });
        }
    }

    let optional = arguments.iter().filter(|a| a.has_default()).count();
    if optional > config.max_optional_arguments {
        return Err(EngineError::TooManyOptionalArguments { command: path.to_string(), count: optional, limit: config.max_optional_arguments });
    }

    Ok(arguments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::arguments::argument::ArgumentDescriptor;

    fn build(builder: CommandBuilder) -> EngineResult<Vec<Arc<CommandDescriptor>>> {
        let mut next = 0;
        builder.build_tree(&ParserRegistry::with_defaults(), &EngineConfig::default(), &mut next)
    }

    #[test]
    fn sub_commands_get_every_alias_path() {
        let built = build(
            CommandBuilder::new("queue")
                .alias("q")
                .sub_command(CommandBuilder::new("join").alias("j").handle(|_| Box::pin(async { Ok(()) }))),
        )
        .unwrap();

        let (parent, child) = (&built[0], &built[1]);
        assert!(parent.is_passive());
        assert_eq!(parent.children.len(), 1);
        assert_eq!(child.path, "queue join");
        assert_eq!(child.parent.as_deref(), Some("queue"));
        assert_eq!(child.triggers, vec!["queue join", "queue j", "q join", "q j"]);
        assert!(child.id > parent.id);
    }

    #[test]
    fn aliases_are_longest_first_without_duplicates() {
        let built = build(CommandBuilder::new("p").alias("pi").alias("ping").alias("pi").alias("p")).unwrap();
        assert_eq!(built[0].aliases, vec!["ping", "pi"]);
    }

    #[test]
    fn endless_must_be_last_and_single() {
        let err = build(
            CommandBuilder::new("say")
                .argument(ArgumentDescriptor::text("words").endless(1, None))
                .argument(ArgumentDescriptor::text("tail")),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::EndlessNotLast { .. }));

        let err = build(
            CommandBuilder::new("say")
                .argument(ArgumentDescriptor::text("a").endless(1, None))
                .argument(ArgumentDescriptor::text("b").endless(1, None)),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::MultipleEndless(_)));
    }

    #[test]
    fn unknown_type_tag_is_rejected() {
        let err = build(CommandBuilder::new("x").argument(ArgumentDescriptor::custom("when", "duration"))).unwrap_err();
        assert!(matches!(err, EngineError::UnknownParser { .. }));
    }

    #[test]
    fn config_overrides_builder_policy() {
        let mut config = EngineConfig::default();
        config.overrides.insert(
            "slow".into(),
            CommandPolicy { run_async: Some(false), permission: Some(PermissionLevel::Moderator), ..Default::default() },
        );

        let mut next = 0;
        let built = CommandBuilder::new("slow")
            .run_async()
            .build_tree(&ParserRegistry::with_defaults(), &config, &mut next)
            .unwrap();
        assert!(matches!(built[0].execution, ExecutionMode::Inline));
        assert_eq!(built[0].permission, PermissionLevel::Moderator);
    }

    #[test]
    fn signature_marks_optional_and_endless() {
        let built = build(
            CommandBuilder::new("roll")
                .argument(ArgumentDescriptor::integer("dice"))
                .argument(ArgumentDescriptor::integer("sides").optional())
                .argument(ArgumentDescriptor::text("notes").endless(0, Some(3)).optional()),
        )
        .unwrap();
        assert_eq!(built[0].signature(), "roll <dice> [sides] [notes...]");
    }
}
