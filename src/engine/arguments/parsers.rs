use core::fmt;
use std::{collections::{HashMap, HashSet}, sync::Arc};

use serde::Serialize;

use crate::engine::{chat_event::chat_event::ChatEvent, handler::handler::{EntityKind, EntityRef, PlatformAdapter}};

pub const DEFAULT_PRIORITY: i32 = 50;

/// Identifies which parser turns a token into a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Text,
    Integer,
    Decimal,
    Boolean,
    /// Everything left in the message, spaces included.
    Remainder,
    Entity(EntityKind),
    Custom(String),
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Text => write!(f, "text"),
            TypeTag::Integer => write!(f, "integer"),
            TypeTag::Decimal => write!(f, "number"),
            TypeTag::Boolean => write!(f, "yes/no"),
            TypeTag::Remainder => write!(f, "text"),
            TypeTag::Entity(EntityKind::User) => write!(f, "user"),
            TypeTag::Entity(EntityKind::Channel) => write!(f, "channel"),
            TypeTag::Entity(EntityKind::Role) => write!(f, "role"),
            TypeTag::Custom(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ArgValue {
    Null,
    Text(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Entity(EntityRef),
    List(Vec<ArgValue>),
}

impl ArgValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ArgValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ArgValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArgValue::Decimal(d) => Some(*d),
            ArgValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&EntityRef> {
        match self {
            ArgValue::Entity(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ArgValue]> {
        match self {
            ArgValue::List(l) => Some(l),
            _ => None,
        }
    }
}

pub struct ParseContext<'a> {
    pub event: &'a ChatEvent,
    pub adapter: &'a dyn PlatformAdapter,
}

/// Turns raw argument text into an [`ArgValue`]. `Err` carries a short reason for the user.
pub trait ArgumentParser: Send + Sync {
    fn parse(&self, ctx: &ParseContext<'_>, raw: &str) -> Result<ArgValue, String>;

    /// Lower runs first when two otherwise equal commands compete for the same text.
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Parsers that want the whole remainder instead of a single token.
    fn handles_all(&self) -> bool {
        false
    }

    /// Only called when `handles_all` is true. Returns the value and how many bytes of
    /// `remainder` it used.
    fn parse_all(&self, ctx: &ParseContext<'_>, remainder: &str) -> Result<(ArgValue, usize), String> {
        self.parse(ctx, remainder).map(|value| (value, remainder.len()))
    }
}

pub struct TextParser;

impl ArgumentParser for TextParser {
    fn parse(&self, _ctx: &ParseContext<'_>, raw: &str) -> Result<ArgValue, String> {
        Ok(ArgValue::Text(raw.to_string()))
    }

    fn priority(&self) -> i32 {
        100
    }
}

pub struct IntegerParser;

impl ArgumentParser for IntegerParser {
    fn parse(&self, _ctx: &ParseContext<'_>, raw: &str) -> Result<ArgValue, String> {
        raw.parse::<i64>().map(ArgValue::Integer).map_err(|_| "expected a whole number".to_string())
    }

    fn priority(&self) -> i32 {
        10
    }
}

pub struct DecimalParser;

impl ArgumentParser for DecimalParser {
    fn parse(&self, _ctx: &ParseContext<'_>, raw: &str) -> Result<ArgValue, String> {
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(ArgValue::Decimal(value)),
            _ => Err("expected a number".to_string()),
        }
    }

    fn priority(&self) -> i32 {
        20
    }
}

pub struct BooleanParser;

impl ArgumentParser for BooleanParser {
    fn parse(&self, _ctx: &ParseContext<'_>, raw: &str) -> Result<ArgValue, String> {
        match raw.to_lowercase().as_str() {
            "true" | "yes" | "y" | "on" | "1" | "enable" => Ok(ArgValue::Boolean(true)),
            "false" | "no" | "n" | "off" | "0" | "disable" => Ok(ArgValue::Boolean(false)),
            _ => Err("expected yes or no".to_string()),
        }
    }

    fn priority(&self) -> i32 {
        10
    }
}

/// Swallows the rest of the message. Always tried after everything else.
pub struct RemainderParser;

impl ArgumentParser for RemainderParser {
    fn parse(&self, _ctx: &ParseContext<'_>, raw: &str) -> Result<ArgValue, String> {
        Ok(ArgValue::Text(raw.to_string()))
    }

    fn priority(&self) -> i32 {
        i32::MAX
    }

    fn handles_all(&self) -> bool {
        true
    }
}

/// Resolves mentions, ids and names through the platform. Exactly one hit is valid.
pub struct EntityParser {
    pub kind: EntityKind,
}

impl ArgumentParser for EntityParser {
    fn parse(&self, ctx: &ParseContext<'_>, raw: &str) -> Result<ArgValue, String> {
        let mut found = ctx.adapter.resolve_entity(ctx.event, self.kind, raw);
        match found.len() {
            0 => Err("nothing found".to_string()),
            1 => Ok(ArgValue::Entity(found.remove(0))),
            n => Err(format!("{} matches, be more specific", n)),
        }
    }

    fn priority(&self) -> i32 {
        5
    }
}

/// Accepts one word out of a fixed set, case-insensitively.
pub struct ChoiceParser {
    choices: Vec<String>,
}

impl ChoiceParser {
    pub fn new<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { choices: choices.into_iter().map(|c| c.into().to_lowercase()).collect() }
    }
}

impl ArgumentParser for ChoiceParser {
    fn parse(&self, _ctx: &ParseContext<'_>, raw: &str) -> Result<ArgValue, String> {
        let lowered = raw.to_lowercase();
        if self.choices.contains(&lowered) {
            Ok(ArgValue::Text(lowered))
        } else {
            Err(format!("expected one of: {}", self.choices.join(", ")))
        }
    }

    fn priority(&self) -> i32 {
        15
    }
}

/// Parsers by type tag, with an ordered fallback list per tag.
///
/// Lookups happen once per argument when a command is registered, never per message.
#[derive(Clone, Default)]
pub struct ParserRegistry {
    parsers: HashMap<TypeTag, Arc<dyn ArgumentParser>>,
    fallbacks: HashMap<TypeTag, Vec<TypeTag>>,
}

impl ParserRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(TypeTag::Text, Arc::new(TextParser));
        registry.register(TypeTag::Integer, Arc::new(IntegerParser));
        registry.register(TypeTag::Decimal, Arc::new(DecimalParser));
        registry.register(TypeTag::Boolean, Arc::new(BooleanParser));
        registry.register(TypeTag::Remainder, Arc::new(RemainderParser));
        for kind in [EntityKind::User, EntityKind::Channel, EntityKind::Role] {
            registry.register(TypeTag::Entity(kind), Arc::new(EntityParser { kind }));
        }
        registry
    }

    pub fn register(&mut self, tag: TypeTag, parser: Arc<dyn ArgumentParser>) -> &mut Self {
        self.parsers.insert(tag, parser);
        self
    }

    pub fn fallback(&mut self, tag: TypeTag, order: Vec<TypeTag>) -> &mut Self {
        self.fallbacks.insert(tag, order);
        self
    }

    pub fn contains(&self, tag: &TypeTag) -> bool {
        self.parsers.contains_key(tag)
    }

    /// The parser for `tag`, else the first fallback (depth first) that has one.
    pub fn resolve(&self, tag: &TypeTag) -> Option<Arc<dyn ArgumentParser>> {
        let mut visited = HashSet::new();
        self.resolve_inner(tag, &mut visited)
    }

    fn resolve_inner(&self, tag: &TypeTag, visited: &mut HashSet<TypeTag>) -> Option<Arc<dyn ArgumentParser>> {
        if !visited.insert(tag.clone()) {
            return None;
        }

        if let Some(parser) = self.parsers.get(tag) {
            return Some(parser.clone());
        }

        self.fallbacks
            .get(tag)?
            .iter()
            .find_map(|next| self.resolve_inner(next, visited))
    }
}

#[cfg(test)]
mod tests {
    use futures::future::BoxFuture;

    use super::*;
    use crate::engine::{chat_event::chat_event::Platform, state::def::EngineResult};

    struct Users;

    impl PlatformAdapter for Users {
        fn send_reply<'a>(&'a self, _event: &'a ChatEvent, _message: &'a str) -> BoxFuture<'a, EngineResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn resolve_entity(&self, _event: &ChatEvent, kind: EntityKind, token: &str) -> Vec<EntityRef> {
            ["krapmatt", "krapbott", "kraken"]
                .iter()
                .filter(|name| name.starts_with(token.trim_start_matches('@')))
                .map(|name| EntityRef { kind, id: format!("id-{name}"), name: name.to_string() })
                .collect()
        }
    }

    #[test]
    fn entity_parser_needs_exactly_one_hit() {
        let event = ChatEvent::new(Platform::Discord, "general", "");
        let ctx = ParseContext { event: &event, adapter: &Users };
        let parser = EntityParser { kind: EntityKind::User };

        assert_eq!(parser.parse(&ctx, "@kraken").unwrap().as_entity().unwrap().id, "id-kraken");
        assert!(parser.parse(&ctx, "krap").is_err());
        assert!(parser.parse(&ctx, "nobody").is_err());
    }

    #[test]
    fn fallbacks_resolve_in_order() {
        let mut registry = ParserRegistry::with_defaults();
        registry.fallback(TypeTag::Custom("word".into()), vec![TypeTag::Custom("missing".into()), TypeTag::Text]);
        registry.fallback(TypeTag::Custom("loop".into()), vec![TypeTag::Custom("loop".into())]);

        let parser = registry.resolve(&TypeTag::Custom("word".into())).unwrap();
        assert_eq!(parser.priority(), 100);
        assert!(registry.resolve(&TypeTag::Custom("loop".into())).is_none());
    }

    #[test]
    fn booleans_accept_common_words() {
        let event = ChatEvent::new(Platform::Console, "stdin", "");
        let ctx = ParseContext { event: &event, adapter: &Users };
        assert_eq!(BooleanParser.parse(&ctx, "Yes"), Ok(ArgValue::Boolean(true)));
        assert_eq!(BooleanParser.parse(&ctx, "off"), Ok(ArgValue::Boolean(false)));
        assert!(BooleanParser.parse(&ctx, "maybe").is_err());
    }

    #[test]
    fn choices_match_any_case() {
        let event = ChatEvent::new(Platform::Console, "stdin", "");
        let ctx = ParseContext { event: &event, adapter: &Users };
        let mut registry = ParserRegistry::with_defaults();
        registry.register(TypeTag::Custom("hand".into()), Arc::new(ChoiceParser::new(["rock", "paper", "scissors"])));

        let parser = registry.resolve(&TypeTag::Custom("hand".into())).unwrap();
        assert_eq!(parser.parse(&ctx, "Paper"), Ok(ArgValue::Text("paper".into())));
        assert_eq!(parser.parse(&ctx, "lizard"), Err("expected one of: rock, paper, scissors".to_string()));
        assert_eq!(parser.priority(), 15);
    }
}
