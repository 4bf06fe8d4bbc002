use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::engine::{
    arguments::{argument::ArgumentDescriptor, parsers::{ArgValue, ArgumentParser, ParseContext}, variants::CommandVariant},
    commands::commands::{OverflowPolicy, ParsingMode},
    state::def::ParseError,
    tokenizer::tokenizer::{TokenError, TrimPolicy, consume_token, is_exhausted, overflow_text, read_token, separate, take_remainder},
};

lazy_static! {
    static ref NAMED_KEY: Regex = Regex::new(r"^(?P<key>[A-Za-z_][A-Za-z0-9_-]*)=").expect("static regex");
}

/// Arguments bound for one candidate, in the candidate's own order.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub values: Vec<ArgValue>,
    pub raw: Vec<String>,
    pub overflow: Option<String>,
    pub mode: ParsingMode,
}

pub fn resolve_arguments(variant: &CommandVariant, content: &str, ctx: &ParseContext<'_>) -> Result<Resolution, ParseError> {
    let command = &variant.command;
    let args: Vec<&ArgumentDescriptor> = variant.arguments().collect();

    if command.modes.named {
        if let Some(bound) = resolve_named(&args, content, command.trim, ctx) {
            let (values, raw) = bound?.into_iter().unzip();
            return Ok(Resolution { values, raw, overflow: None, mode: ParsingMode::Named });
        }

        if !command.modes.positional && !args.is_empty() {
            return Err(ParseError::MissingRequiredArgument { argument: args[0].name.clone() });
        }
    }

    resolve_positional(&args, content, command.trim, command.overflow, ctx)
}

fn parser_of<'a>(arg: &'a ArgumentDescriptor) -> Result<&'a Arc<dyn ArgumentParser>, ParseError> {
    arg.parser().ok_or_else(|| ParseError::ArgumentParse {
        argument: arg.name.clone(),
        raw: String::new(),
        reason: format!("no parser for {}", arg.type_tag),
    })
}

fn run_parser(arg: &ArgumentDescriptor, parser: &Arc<dyn ArgumentParser>, raw: &str, value: &str, ctx: &ParseContext<'_>) -> Result<ArgValue, ParseError> {
    parser.parse(ctx, value).map_err(|reason| ParseError::ArgumentParse {
        argument: arg.name.clone(),
        raw: raw.to_string(),
        reason,
    })
}

fn separator_error(arg: &ArgumentDescriptor, rest: &str) -> ParseError {
    ParseError::ArgumentParse {
        argument: arg.name.clone(),
        raw: rest.to_string(),
        reason: "arguments must be separated by a single space".to_string(),
    }
}

/// `None` when the content is not a `key=value` list for exactly these arguments.
fn resolve_named(args: &[&ArgumentDescriptor], content: &str, trim: TrimPolicy, ctx: &ParseContext<'_>) -> Option<Result<Vec<(ArgValue, String)>, ParseError>> {
    if is_exhausted(content, trim) {
        return None;
    }

    let mut slots: Vec<Option<(String, String)>> = vec![None; args.len()];
    let mut rest = content;

    while !is_exhausted(rest, trim) {
        let body = separate(rest, trim).ok()?;
        let key = NAMED_KEY.captures(body)?.name("key")?.as_str();
        let index = args.iter().position(|a| a.name.eq_ignore_ascii_case(key))?;
        if slots[index].is_some() {
            return None;
        }

        let token = read_token(&body[key.len() + 1..], trim, args[index].accept_quote);
        slots[index] = Some((token.value, token.raw.to_string()));
        rest = token.rest;
    }

    let mut bound = Vec::with_capacity(args.len());
    for (arg, slot) in args.iter().zip(slots) {
        let Some((value, raw)) = slot else {
            return Some(Err(ParseError::MissingRequiredArgument { argument: arg.name.clone() }));
        };

        if value.is_empty() && !arg.accept_empty {
            return Some(Err(ParseError::OutOfContent { argument: arg.name.clone() }));
        }

        let parsed = match parser_of(arg).and_then(|parser| run_parser(arg, parser, &raw, &value, ctx)) {
            Ok(parsed) => parsed,
            Err(e) => return Some(Err(e)),
        };

        let parsed = if arg.is_endless() { ArgValue::List(vec![parsed]) } else { parsed };
        bound.push((parsed, raw));
    }

    Some(Ok(bound))
}

fn resolve_positional(args: &[&ArgumentDescriptor], content: &str, trim: TrimPolicy, overflow: OverflowPolicy, ctx: &ParseContext<'_>) -> Result<Resolution, ParseError> {
    let mut rest = content;
    let mut values = Vec::with_capacity(args.len());
    let mut raws = Vec::with_capacity(args.len());

    for arg in args {
        let parser = parser_of(arg)?;

        if arg.is_endless() {
            let (value, raw, after) = resolve_endless(arg, parser, rest, trim, ctx)?;
            values.push(value);
            raws.push(raw);
            rest = after;
            break;
        }

        if parser.handles_all() {
            let body = take_remainder(rest, trim).map_err(|_| separator_error(arg, rest))?;
            if body.is_empty() && !arg.accept_empty {
                return Err(ParseError::OutOfContent { argument: arg.name.clone() });
            }

            let (value, used) = parser.parse_all(ctx, body).map_err(|reason| ParseError::ArgumentParse {
                argument: arg.name.clone(),
                raw: body.to_string(),
                reason,
            })?;
            let used = if used <= body.len() && body.is_char_boundary(used) { used } else { body.len() };

            values.push(value);
            raws.push(body[..used].to_string());
            rest = &body[used..];
            continue;
        }

        let token = consume_token(rest, trim, arg.accept_quote).map_err(|TokenError::MissingSeparator| separator_error(arg, rest))?;
        if token.value.is_empty() && !arg.accept_empty {
            return Err(ParseError::OutOfContent { argument: arg.name.clone() });
        }

        values.push(run_parser(arg, parser, token.raw, &token.value, ctx)?);
        raws.push(token.raw.to_string());
        rest = token.rest;
    }

    let extra = overflow_text(rest, trim);
    let overflow = if extra.is_empty() {
        None
    } else {
        match overflow {
            OverflowPolicy::Fail => return Err(ParseError::ContentOverflow { overflow: extra.to_string() }),
            OverflowPolicy::Ignore => Some(extra.to_string()),
        }
    };

    if values.len() < args.len() {
        return Err(ParseError::InvalidArgumentCount { expected: args.len(), actual: values.len() });
    }

    Ok(Resolution { values, raw: raws, overflow, mode: ParsingMode::Positional })
}

fn resolve_endless<'a>(arg: &ArgumentDescriptor, parser: &Arc<dyn ArgumentParser>, content: &'a str, trim: TrimPolicy, ctx: &ParseContext<'_>) -> Result<(ArgValue, String, &'a str), ParseError> {
    let bounds = arg.endless.unwrap_or(crate::engine::arguments::argument::EndlessBounds { min: 1, max: None });

    if parser.handles_all() {
        let body = take_remainder(content, trim).map_err(|_| separator_error(arg, content))?;
        if body.is_empty() {
            return if bounds.min == 0 {
                Ok((ArgValue::List(Vec::new()), String::new(), body))
            } else {
                Err(ParseError::OutOfContent { argument: arg.name.clone() })
            };
        }
        let value = run_parser(arg, parser, body, body, ctx)?;
        return Ok((ArgValue::List(vec![value]), body.to_string(), &body[body.len()..]));
    }

    let mut items = Vec::new();
    let mut raws: Vec<&str> = Vec::new();
    let mut rest = content;

    loop {
        if bounds.max.is_some_and(|max| items.len() >= max) || is_exhausted(rest, trim) {
            break;
        }

        let token = consume_token(rest, trim, arg.accept_quote).map_err(|TokenError::MissingSeparator| separator_error(arg, rest))?;
        if token.value.is_empty() && !arg.accept_empty {
            return Err(ParseError::OutOfContent { argument: arg.name.clone() });
        }

        items.push(run_parser(arg, parser, token.raw, &token.value, ctx)?);
        raws.push(token.raw);
        rest = token.rest;
    }

    if items.is_empty() && bounds.min > 0 {
        return Err(ParseError::OutOfContent { argument: arg.name.clone() });
    }
    if items.len() < bounds.min {
        return Err(ParseError::InvalidArgumentCount { expected: bounds.min, actual: items.len() });
    }

    Ok((ArgValue::List(items), raws.join(" "), rest))
}
