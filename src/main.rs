use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use krapbott_commands::{
    cmd, ArgValue, ArgumentDescriptor, ChatEvent, ChoiceParser, CommandBuilder, CommandGroup, CooldownScope, Dispatcher, EngineConfig, EngineResult,
    OptionDescriptor, ParserRegistry, PermissionLevel, Platform, PlatformAdapter, TypeTag, run_event_loop,
};
use rand::Rng;
use tokio::{io::{AsyncBufReadExt, BufReader}, sync::mpsc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

struct ConsoleAdapter;

impl PlatformAdapter for ConsoleAdapter {
    fn send_reply<'a>(&'a self, event: &'a ChatEvent, message: &'a str) -> BoxFuture<'a, EngineResult<()>> {
        Box::pin(async move {
            println!("[{}] krapbott: {}", event.channel, message);
            Ok(())
        })
    }

    fn is_developer(&self, user_id: &str) -> bool {
        user_id == "console"
    }
}

fn demo_commands() -> CommandGroup {
    CommandGroup::new("demo")
        .command(cmd!(
            CommandBuilder::new("echo")
                .description("Repeats the message")
                .argument(ArgumentDescriptor::remainder("message"))
                .handle(|ctx| Box::pin(async move {
                    let text = ctx.invocation.text("message").unwrap_or_default().to_string();
                    ctx.reply(&text).await
                })),
            "say"
        ))
        .command(
            CommandBuilder::new("roll")
                .description("Rolls dice")
                .argument(ArgumentDescriptor::integer("dice").default_value(ArgValue::Integer(1)))
                .argument(ArgumentDescriptor::integer("sides").default_value(ArgValue::Integer(6)))
                .option(OptionDescriptor::flag("sum").alias("s"))
                .cooldown(Duration::from_secs(3), CooldownScope::UserChannel)
                .handle(|ctx| Box::pin(async move {
                    let dice = ctx.invocation.integer("dice").unwrap_or(1).clamp(1, 20);
                    let sides = ctx.invocation.integer("sides").unwrap_or(6).max(2);
                    let rolls: Vec<i64> = {
                        let mut rng = rand::thread_rng();
                        (0..dice).map(|_| rng.gen_range(1..=sides)).collect()
                    };
                    let reply = if ctx.invocation.has_option("sum") {
                        format!("🎲 {} rolled {}", ctx.event.display_name(), rolls.iter().sum::<i64>())
                    } else {
                        format!("🎲 {} rolled {:?}", ctx.event.display_name(), rolls)
                    };
                    ctx.reply(&reply).await
                })),
        )
        .command(cmd!(
            CommandBuilder::new("queue")
                .sub_command(
                    CommandBuilder::new("join")
                        .argument(ArgumentDescriptor::text("name").optional())
                        .ordered_by(|_, event| Some(format!("queue:{}", event.channel)))
                        .handle(|ctx| Box::pin(async move {
                            let name = ctx.invocation.text("name").unwrap_or(ctx.event.display_name()).to_string();
                            tokio::time::sleep(Duration::from_millis(200)).await;
                            ctx.reply(&format!("✅ {name} has joined the queue! 🥳")).await
                        })),
                )
                .sub_command(
                    cmd!(CommandBuilder::new("leave"), "l")
                        .ordered_by(|_, event| Some(format!("queue:{}", event.channel)))
                        .handle(|ctx| Box::pin(async move {
                            ctx.reply(&format!("💀 {} has left the queue 😥", ctx.event.display_name())).await
                        })),
                )
                .sub_command(
                    CommandBuilder::new("clear")
                        .permission(PermissionLevel::Moderator)
                        .handle(|ctx| Box::pin(async move { ctx.reply("🧹 The queue is empty").await })),
                ),
            "q"
        ))
        .command(
            CommandBuilder::new("rps")
                .description("Rock, paper, scissors against the bot")
                .argument(ArgumentDescriptor::custom("hand", "hand"))
                .handle(|ctx| Box::pin(async move {
                    let hands = ["rock", "paper", "scissors"];
                    let mine = hands[rand::thread_rng().gen_range(0..hands.len())];
                    let theirs = ctx.invocation.text("hand").unwrap_or_default().to_string();
                    let verdict = match (theirs.as_str(), mine) {
                        (a, b) if a == b => "it's a draw 🤝",
                        ("rock", "scissors") | ("paper", "rock") | ("scissors", "paper") => "you win 🥳",
                        _ => "I win 😈",
                    };
                    ctx.reply(&format!("✊ {} vs {} - {}", theirs, mine, verdict)).await
                })),
        )
        .command(
            CommandBuilder::new("shout")
                .argument(ArgumentDescriptor::text("words").endless(1, Some(5)))
                .modes(true, true)
                .handle(|ctx| Box::pin(async move {
                    let words: Vec<String> = ctx
                        .invocation
                        .arg("words")
                        .and_then(ArgValue::as_list)
                        .unwrap_or_default()
                        .iter()
                        .filter_map(ArgValue::as_str)
                        .map(str::to_uppercase)
                        .collect();
                    ctx.reply(&words.join(" ")).await
                })),
        )
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load command config: {e}");
            return;
        }
    };

    let mut registry = ParserRegistry::with_defaults();
    registry.register(TypeTag::Custom("hand".into()), Arc::new(ChoiceParser::new(["rock", "paper", "scissors"])));

    let dispatcher = Dispatcher::new(config, registry, Arc::new(ConsoleAdapter));
    if let Err(e) = dispatcher.register_group(demo_commands()).await {
        error!("Failed to register commands: {e}");
        return;
    }
    info!("Console ready, prefix is `{}`", dispatcher.config().prefix);

    let (tx, rx) = mpsc::unbounded_channel();
    let event_loop = tokio::spawn(run_event_loop(dispatcher, rx));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let event = ChatEvent::new(Platform::Console, "console", line).with_user("console", "krapmatt", PermissionLevel::Broadcaster);
                if tx.send(event).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read stdin: {e}");
                break;
            }
        }
    }

    drop(tx);
    if let Err(e) = event_loop.await {
        error!("Event loop stopped: {e}");
    }
}
