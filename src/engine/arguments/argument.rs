use core::fmt;
use std::sync::Arc;

use crate::engine::{arguments::parsers::{ArgValue, ArgumentParser, ParserRegistry, TypeTag}, chat_event::chat_event::ChatEvent, handler::handler::EntityKind};

pub type DefaultProvider = Arc<dyn Fn(&ChatEvent) -> ArgValue + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndlessBounds {
    pub min: usize,
    pub max: Option<usize>,
}

#[derive(Clone)]
pub struct ArgumentDescriptor {
    pub name: String,
    pub type_tag: TypeTag,
    pub endless: Option<EndlessBounds>,
    pub accept_empty: bool,
    pub accept_quote: bool,
    pub default: Option<DefaultProvider>,
    priority: Option<i32>,
    parser: Option<Arc<dyn ArgumentParser>>,
}

impl ArgumentDescriptor {
    pub fn new(name: impl Into<String>, type_tag: TypeTag) -> Self {
        ArgumentDescriptor {
            name: name.into(),
            type_tag,
            endless: None,
            accept_empty: false,
            accept_quote: true,
            default: None,
            priority: None,
            parser: None,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, TypeTag::Text)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, TypeTag::Integer)
    }

    pub fn decimal(name: impl Into<String>) -> Self {
        Self::new(name, TypeTag::Decimal)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, TypeTag::Boolean)
    }

    pub fn remainder(name: impl Into<String>) -> Self {
        Self::new(name, TypeTag::Remainder)
    }

    pub fn user(name: impl Into<String>) -> Self {
        Self::new(name, TypeTag::Entity(EntityKind::User))
    }

    pub fn custom(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self::new(name, TypeTag::Custom(tag.into()))
    }

    /// Variadic: at least `min` values, at most `max` (unbounded when `None`).
    pub fn endless(mut self, min: usize, max: Option<usize>) -> Self {
        self.endless = Some(EndlessBounds { min, max });
        self
    }

    /// Omittable, filled with `ArgValue::Null` when left out.
    pub fn optional(self) -> Self {
        self.default_with(|_| ArgValue::Null)
    }

    pub fn default_value(self, value: ArgValue) -> Self {
        self.default_with(move |_| value.clone())
    }

    pub fn default_with<F>(mut self, provider: F) -> Self
    where
        F: Fn(&ChatEvent) -> ArgValue + Send + Sync + 'static,
    {
        self.default = Some(Arc::new(provider));
        self
    }

    pub fn accept_empty(mut self) -> Self {
        self.accept_empty = true;
        self
    }

    pub fn no_quotes(mut self) -> Self {
        self.accept_quote = false;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn is_endless(&self) -> bool {
        self.endless.is_some()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn parser(&self) -> Option<&Arc<dyn ArgumentParser>> {
        self.parser.as_ref()
    }

    pub fn effective_priority(&self) -> i32 {
        self.priority
            .or_else(|| self.parser.as_ref().map(|p| p.priority()))
            .unwrap_or(i32::MAX)
    }

    pub fn default_for(&self, event: &ChatEvent) -> ArgValue {
        self.default.as_ref().map(|provider| provider(event)).unwrap_or(ArgValue::Null)
    }

    /// Looks the parser up once. Returns false when nothing handles the tag.
    pub(crate) fn bind(&mut self, registry: &ParserRegistry) -> bool {
        if self.parser.is_none() {
            self.parser = registry.resolve(&self.type_tag);
        }
        self.parser.is_some()
    }

    pub fn with_parser(mut self, parser: Arc<dyn ArgumentParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// `<name>`, `[name]` or `<name...>` for usage lines.
    pub fn signature(&self) -> String {
        let dots = if self.is_endless() { "..." } else { "" };
        if self.has_default() {
            format!("[{}{}]", self.name, dots)
        } else {
            format!("<{}{}>", self.name, dots)
        }
    }
}

impl fmt::Debug for ArgumentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentDescriptor")
            .field("name", &self.name)
            .field("type_tag", &self.type_tag)
            .field("endless", &self.endless)
            .field("accept_empty", &self.accept_empty)
            .field("accept_quote", &self.accept_quote)
            .field("has_default", &self.has_default())
            .field("priority", &self.effective_priority())
            .finish()
    }
}
