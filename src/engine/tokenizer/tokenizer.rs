use serde::{Deserialize, Serialize};

/// How whitespace around (and inside quoted) arguments is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrimPolicy {
    /// Exactly one space between arguments, nothing else touched.
    None,
    #[default]
    Lenient,
    /// Like `Lenient`, and spaces just inside quotes are dropped as well.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub value: String,
    /// The source text of the token, quotes included.
    pub raw: &'a str,
    pub rest: &'a str,
    pub quoted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    MissingSeparator,
}

/// Drops the whitespace that separates the previous argument from the next one.
pub fn separate(remaining: &str, trim: TrimPolicy) -> Result<&str, TokenError> {
    match trim {
        TrimPolicy::None => {
            if remaining.is_empty() {
                Ok(remaining)
            } else {
                remaining.strip_prefix(' ').ok_or(TokenError::MissingSeparator)
            }
        }
        TrimPolicy::Lenient | TrimPolicy::Strict => Ok(remaining.trim_start_matches(' ')),
    }
}

pub fn consume_token(remaining: &str, trim: TrimPolicy, accept_quote: bool) -> Result<Token<'_>, TokenError> {
    let body = separate(remaining, trim)?;
    Ok(read_token(body, trim, accept_quote))
}

/// Reads one token from the very start of `body`, no separator expected.
pub fn read_token(body: &str, trim: TrimPolicy, accept_quote: bool) -> Token<'_> {
    if accept_quote && body.starts_with('"') {
        if let Some(token) = quoted_token(body, trim) {
            return token;
        }
    }

    let end = body.find(' ').unwrap_or(body.len());
    Token {
        value: body[..end].to_string(),
        raw: &body[..end],
        rest: &body[end..],
        quoted: false,
    }
}

fn quoted_token(body: &str, trim: TrimPolicy) -> Option<Token<'_>> {
    let end = closing_quote(body)?;
    let rest = &body[end + 1..];

    // `"a"b` is not a quoted argument
    if !rest.is_empty() && !rest.starts_with(' ') {
        return None;
    }

    let mut value = body[1..end].replace("\\\"", "\"");
    if trim == TrimPolicy::Strict {
        value = value.trim_matches(' ').to_string();
    }

    Some(Token { value, raw: &body[..=end], rest, quoted: true })
}

fn closing_quote(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    (1..bytes.len()).find(|&i| bytes[i] == b'"' && bytes[i - 1] != b'\\')
}

/// Everything left for an argument that takes the whole remainder.
pub fn take_remainder(remaining: &str, trim: TrimPolicy) -> Result<&str, TokenError> {
    let body = separate(remaining, trim)?;
    Ok(match trim {
        TrimPolicy::None => body,
        TrimPolicy::Lenient | TrimPolicy::Strict => body.trim_end_matches(' '),
    })
}

pub fn is_exhausted(remaining: &str, trim: TrimPolicy) -> bool {
    overflow_text(remaining, trim).is_empty()
}

pub fn overflow_text(remaining: &str, trim: TrimPolicy) -> &str {
    match trim {
        TrimPolicy::None => remaining,
        TrimPolicy::Lenient | TrimPolicy::Strict => remaining.trim_matches(' '),
    }
}
