mod common;

use std::sync::Arc;

use common::{RecordingAdapter, dispatcher, event};
use krapbott_commands::{
    ArgValue, ArgumentDescriptor, ChoiceParser, CommandBuilder, DispatchOutcome, Dispatcher, EngineConfig, OptionDescriptor, OverflowPolicy,
    ParseError, ParserRegistry, TypeTag,
    engine::{commands::commands::ParsingMode, failure::failure::FailureReport},
};

fn noop(name: &str) -> CommandBuilder {
    CommandBuilder::new(name).handle(|_| Box::pin(async { Ok(()) }))
}

async fn send(dispatcher: &Dispatcher, message: &str) -> DispatchOutcome {
    dispatcher.dispatch(message, event("1", message)).await
}

async fn arguments(dispatcher: &Dispatcher, message: &str) -> Vec<ArgValue> {
    match send(dispatcher, message).await {
        DispatchOutcome::Invoked(invocation) => invocation.arguments.clone(),
        other => panic!("`{}` did not invoke: {:?}", message, other),
    }
}

fn text(value: &str) -> ArgValue {
    ArgValue::Text(value.to_string())
}

#[tokio::test]
async fn single_text_argument() {
    let (d, _) = dispatcher(RecordingAdapter::default());
    d.register(noop("cmd").argument(ArgumentDescriptor::text("a"))).await.unwrap();

    assert_eq!(arguments(&d, "!cmd hello").await, vec![text("hello")]);
}

#[tokio::test]
async fn missing_argument_is_out_of_content() {
    let (d, adapter) = dispatcher(RecordingAdapter::default());
    d.register(noop("cmd").argument(ArgumentDescriptor::text("a"))).await.unwrap();

    let outcome = send(&d, "!cmd").await;
    let failures = outcome.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].error.is_out_of_content());
    assert_eq!(adapter.replies(), vec!["🤔 Did you mean: !cmd <a>"]);
}

#[tokio::test]
async fn quoted_arguments() {
    let (d, _) = dispatcher(RecordingAdapter::default());
    d.register(noop("cmd").argument(ArgumentDescriptor::text("a"))).await.unwrap();
    d.register(noop("raw").argument(ArgumentDescriptor::text("a").no_quotes()).overflow(OverflowPolicy::Ignore)).await.unwrap();

    assert_eq!(arguments(&d, "!cmd \"hello world\"").await, vec![text("hello world")]);
    assert_eq!(arguments(&d, "!cmd \"a\"b").await, vec![text("\"a\"b")]);
    assert_eq!(arguments(&d, "!cmd \"say \\\"hi\\\"\"").await, vec![text("say \"hi\"")]);
    assert_eq!(arguments(&d, "!raw \"hello world\"").await, vec![text("\"hello")]);
}

#[tokio::test]
async fn optional_arguments_fill_from_the_left() {
    let (d, _) = dispatcher(RecordingAdapter::default());
    d.register(
        noop("f")
            .argument(ArgumentDescriptor::text("a").optional())
            .argument(ArgumentDescriptor::text("b").optional()),
    )
    .await
    .unwrap();

    assert_eq!(arguments(&d, "!f").await, vec![ArgValue::Null, ArgValue::Null]);
    assert_eq!(arguments(&d, "!f x").await, vec![text("x"), ArgValue::Null]);
    assert_eq!(arguments(&d, "!f x y").await, vec![text("x"), text("y")]);
}

#[tokio::test]
async fn defaults_are_used_for_omitted_arguments() {
    let (d, _) = dispatcher(RecordingAdapter::default());
    d.register(
        noop("roll")
            .argument(ArgumentDescriptor::integer("dice").default_value(ArgValue::Integer(1)))
            .argument(ArgumentDescriptor::integer("sides").default_value(ArgValue::Integer(6))),
    )
    .await
    .unwrap();

    assert_eq!(arguments(&d, "!roll").await, vec![ArgValue::Integer(1), ArgValue::Integer(6)]);
    assert_eq!(arguments(&d, "!roll 3 20").await, vec![ArgValue::Integer(3), ArgValue::Integer(20)]);
}

#[tokio::test]
async fn bounded_endless_overflows() {
    let (d, _) = dispatcher(RecordingAdapter::default());
    d.register(noop("pick").argument(ArgumentDescriptor::text("items").endless(1, Some(2)))).await.unwrap();

    assert_eq!(arguments(&d, "!pick a b").await, vec![ArgValue::List(vec![text("a"), text("b")])]);

    let outcome = send(&d, "!pick a b c").await;
    assert_eq!(outcome.failures().len(), 1);
    assert_eq!(outcome.failures()[0].error, ParseError::ContentOverflow { overflow: "c".into() });
}

#[tokio::test]
async fn endless_minimum_is_enforced() {
    let (d, _) = dispatcher(RecordingAdapter::default());
    d.register(noop("vs").argument(ArgumentDescriptor::text("players").endless(2, None))).await.unwrap();

    let outcome = send(&d, "!vs alice").await;
    assert_eq!(outcome.failures()[0].error, ParseError::InvalidArgumentCount { expected: 2, actual: 1 });
    assert!(matches!(send(&d, "!vs").await.failures()[0].error, ParseError::OutOfContent { .. }));
    assert_eq!(arguments(&d, "!vs a b c").await, vec![ArgValue::List(vec![text("a"), text("b"), text("c")])]);
}

#[tokio::test]
async fn longer_trigger_wins() {
    let (d, _) = dispatcher(RecordingAdapter::default());
    d.register(noop("queue").argument(ArgumentDescriptor::remainder("rest"))).await.unwrap();
    d.register(noop("queue join")).await.unwrap();

    let outcome = send(&d, "!queue join").await;
    assert_eq!(outcome.invocation().unwrap().path(), "queue join");

    let outcome = send(&d, "!queue something else").await;
    let invocation = outcome.invocation().unwrap();
    assert_eq!(invocation.path(), "queue");
    assert_eq!(invocation.text("rest"), Some("something else"));
}

#[tokio::test]
async fn integer_beats_text_on_equal_shape() {
    let (d, _) = dispatcher(RecordingAdapter::default());
    d.register(noop("n").argument(ArgumentDescriptor::text("word"))).await.unwrap();
    let number = d.register(noop("n").argument(ArgumentDescriptor::integer("value"))).await.unwrap();

    assert_eq!(send(&d, "!n 42").await.invocation().unwrap().command.id, number.id);
    assert_ne!(send(&d, "!n many").await.invocation().unwrap().command.id, number.id);
}

#[tokio::test]
async fn endless_candidates_pick_the_same_winner_in_any_order() {
    let (d, _) = dispatcher(RecordingAdapter::default());
    d.register(noop("z").argument(ArgumentDescriptor::text("a")).argument(ArgumentDescriptor::text("b").endless(1, None))).await.unwrap();
    d.register(noop("z").argument(ArgumentDescriptor::text("a").endless(1, None))).await.unwrap();
    let numbers = d
        .register(noop("z").argument(ArgumentDescriptor::text("a")).argument(ArgumentDescriptor::integer("b").endless(1, None)))
        .await
        .unwrap();

    for _ in 0..3 {
        let outcome = send(&d, "!z 1 2").await;
        assert_eq!(outcome.invocation().unwrap().command.id, numbers.id);
    }
    assert_ne!(send(&d, "!z 1 two").await.invocation().unwrap().command.id, numbers.id);
}

#[tokio::test]
async fn matching_is_repeatable() {
    let (d, _) = dispatcher(RecordingAdapter::default());
    d.register(noop("a").argument(ArgumentDescriptor::text("x").optional()).argument(ArgumentDescriptor::text("y").optional())).await.unwrap();
    d.register(noop("a b")).await.unwrap();

    let index = d.index().read().await;
    let describe = |raw: &str| -> Vec<(String, usize, Vec<usize>)> {
        index
            .matches(raw)
            .into_iter()
            .map(|c| (c.trigger, c.variant.command.id, c.variant.omitted().to_vec()))
            .collect()
    };

    let first = describe("a b c");
    assert_eq!(first.len(), 5);
    assert_eq!(first[0].0, "a b");
    assert_eq!(first, describe("a b c"));
}

#[tokio::test]
async fn named_arguments() {
    let (d, _) = dispatcher(RecordingAdapter::default());
    d.register(noop("pair").argument(ArgumentDescriptor::text("a")).argument(ArgumentDescriptor::integer("b")).modes(true, true)).await.unwrap();

    let outcome = send(&d, "!pair b=2 a=\"x y\"").await;
    let invocation = outcome.invocation().unwrap();
    assert_eq!(invocation.mode, ParsingMode::Named);
    assert_eq!(invocation.arguments, vec![text("x y"), ArgValue::Integer(2)]);

    let outcome = send(&d, "!pair x 2").await;
    assert_eq!(outcome.invocation().unwrap().mode, ParsingMode::Positional);
}

#[tokio::test]
async fn named_only_needs_every_key() {
    let (d, _) = dispatcher(RecordingAdapter::default());
    d.register(noop("pair").argument(ArgumentDescriptor::text("a")).argument(ArgumentDescriptor::text("b")).modes(false, true)).await.unwrap();

    let outcome = send(&d, "!pair a=1").await;
    assert_eq!(outcome.failures()[0].error, ParseError::MissingRequiredArgument { argument: "b".into() });
}

#[tokio::test]
async fn ignored_overflow_is_kept() {
    let (d, _) = dispatcher(RecordingAdapter::default());
    d.register(noop("one").argument(ArgumentDescriptor::text("x")).overflow(OverflowPolicy::Ignore)).await.unwrap();

    let outcome = send(&d, "!one x y z").await;
    let invocation = outcome.invocation().unwrap();
    assert_eq!(invocation.text("x"), Some("x"));
    assert_eq!(invocation.overflow.as_deref(), Some("y z"));
}

#[tokio::test]
async fn options_are_stripped_before_arguments() {
    let (d, _) = dispatcher(RecordingAdapter::default());
    d.register(noop("roll").argument(ArgumentDescriptor::integer("dice")).option(OptionDescriptor::flag("sum").alias("s"))).await.unwrap();

    let outcome = send(&d, "!roll 2 --s").await;
    let invocation = outcome.invocation().unwrap();
    assert!(invocation.has_option("sum"));
    assert_eq!(invocation.integer("dice"), Some(2));

    let outcome = send(&d, "!roll 2").await;
    assert!(!outcome.invocation().unwrap().has_option("sum"));
}

#[tokio::test]
async fn stray_quotes_do_not_hide_options() {
    let (d, _) = dispatcher(RecordingAdapter::default());
    d.register(noop("say").argument(ArgumentDescriptor::remainder("words")).option(OptionDescriptor::flag("silent"))).await.unwrap();

    let outcome = send(&d, r#"!say don"t --silent"#).await;
    let invocation = outcome.invocation().unwrap();
    assert!(invocation.has_option("silent"));
    assert_eq!(invocation.text("words"), Some(r#"don"t"#));

    let outcome = send(&d, r#"!say "keep --silent" here"#).await;
    assert!(!outcome.invocation().unwrap().has_option("silent"));
}

#[tokio::test]
async fn custom_choice_arguments() {
    let mut registry = ParserRegistry::with_defaults();
    registry.register(TypeTag::Custom("hand".into()), Arc::new(ChoiceParser::new(["rock", "paper", "scissors"])));
    let adapter = Arc::new(RecordingAdapter::default());
    let d = Dispatcher::new(EngineConfig::default(), registry, adapter.clone());
    d.register(noop("rps").argument(ArgumentDescriptor::custom("hand", "hand"))).await.unwrap();

    assert_eq!(arguments(&d, "!rps Rock").await, vec![text("rock")]);

    let outcome = send(&d, "!rps lizard").await;
    assert!(matches!(outcome, DispatchOutcome::Failed { .. }));
    assert!(outcome.failures()[0].error.is_argument_parse());
    assert_eq!(adapter.replies().len(), 1);
}

#[tokio::test]
async fn passive_command_suggests_children() {
    let (d, adapter) = dispatcher(RecordingAdapter::default());
    d.register(CommandBuilder::new("queue").sub_command(noop("join")).sub_command(noop("leave"))).await.unwrap();

    let outcome = send(&d, "!queue").await;
    let commands = match &outcome {
        DispatchOutcome::Failed { report: Some(report @ FailureReport::Suggestions(_)), .. } => report.suggestions().to_vec(),
        other => panic!("expected suggestions, got {:?}", other),
    };
    let paths: Vec<&str> = commands.iter().map(|c| c.path.as_str()).collect();
    assert_eq!(paths, vec!["queue join", "queue leave"]);
    assert_eq!(adapter.replies(), vec!["🤔 Did you mean: !queue join | !queue leave"]);

    assert_eq!(send(&d, "!queue join").await.invocation().unwrap().path(), "queue join");
}

#[tokio::test]
async fn bad_value_gets_a_specific_reply() {
    let (d, adapter) = dispatcher(RecordingAdapter::default());
    d.register(noop("roll").argument(ArgumentDescriptor::integer("dice"))).await.unwrap();

    let outcome = send(&d, "!roll lots").await;
    assert!(matches!(outcome, DispatchOutcome::Failed { report: Some(FailureReport::Specific(_)), .. }));
    let replies = adapter.replies();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].contains("`lots` is not a valid dice"));
    assert!(replies[0].ends_with("usage: !roll <dice>"));
}
