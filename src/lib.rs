pub mod engine;

pub use engine::{
    arguments::{argument::ArgumentDescriptor, parsers::{ArgValue, ArgumentParser, ChoiceParser, ParserRegistry, TypeTag}},
    chat_event::chat_event::{ChatEvent, Platform},
    commands::{CommandGroup, commands::{CommandBuilder, CommandContext, CommandT, OverflowPolicy}, invocation::ParsedInvocation},
    cooldown::cooldown::CooldownScope,
    dispatcher::dispatcher::{DispatchListener, DispatchOutcome, Dispatcher, GateRejection},
    handler::handler::{NullAdapter, PlatformAdapter},
    options::options::OptionDescriptor,
    permissions::permissions::PermissionLevel,
    run_event_loop,
    state::def::{EngineConfig, EngineError, EngineResult, ParseError},
};
