use crate::engine::commands::commands::CommandBuilder;

pub mod commands;
pub mod invocation;

/// A named bundle of commands registered together.
pub struct CommandGroup {
    pub name: String,
    pub commands: Vec<CommandBuilder>,
}

impl CommandGroup {
    pub fn new(name: impl Into<String>) -> Self {
        CommandGroup { name: name.into(), commands: Vec::new() }
    }

    pub fn command(mut self, command: CommandBuilder) -> Self {
        self.commands.push(command);
        self
    }
}

#[macro_export]
macro_rules! cmd {
    ($command:expr $(,)?) => {
        $command
    };
    ($command:expr, $($alias:expr),+ $(,)?) => {
        $command$(.alias($alias))+
    };
}
