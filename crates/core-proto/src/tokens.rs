//! Command-line tokenizer.
//!
//! An explicit state machine over {Initial, Whitespace, Argument, Final}
//! rather than a regex, because quoting rules interact with escapes:
//! * tokens are separated by space, tab, or CR;
//! * a token starting with `"` runs to the next unescaped `"`;
//! * a token starting with `{` runs to the matching `}`;
//! * inside a quoted token `\` escapes the next character (`\n`, `\r`,
//!   `\t` decode to control characters, anything else is taken literally);
//! * a quote left open at end of line is an error;
//! * more than [`MAX_ARGS`] arguments after the keyword is an error.

/// Maximum number of arguments after the command keyword.
pub const MAX_ARGS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("too many arguments (max {MAX_ARGS})")]
    TooManyArgs,
    #[error("unterminated quote")]
    UnterminatedQuote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initial,
    Whitespace,
    Argument,
    Final,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Double,
    Brace,
}

fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r')
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        other => other,
    }
}

/// Split one command line into tokens. The trailing newline, if present, has
/// already been stripped by the socket layer.
pub fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut state = State::Initial;
    let mut quote = Quote::None;
    let mut chars = line.chars();

    while state != State::Final {
        let c = chars.next();
        match state {
            State::Initial | State::Whitespace => match c {
                None => state = State::Final,
                Some(c) if is_separator(c) => state = State::Whitespace,
                Some('"') => {
                    quote = Quote::Double;
                    state = State::Argument;
                }
                Some('{') => {
                    quote = Quote::Brace;
                    state = State::Argument;
                }
                Some(c) => {
                    quote = Quote::None;
                    current.push(c);
                    state = State::Argument;
                }
            },
            State::Argument => match (quote, c) {
                (Quote::None, None) => {
                    tokens.push(std::mem::take(&mut current));
                    state = State::Final;
                }
                (Quote::None, Some(c)) if is_separator(c) => {
                    tokens.push(std::mem::take(&mut current));
                    state = State::Whitespace;
                }
                (Quote::None, Some(c)) => current.push(c),
                (Quote::Double | Quote::Brace, None) => return Err(ParseError::UnterminatedQuote),
                (Quote::Double, Some('"')) | (Quote::Brace, Some('}')) => {
                    tokens.push(std::mem::take(&mut current));
                    quote = Quote::None;
                    state = State::Whitespace;
                }
                (Quote::Double | Quote::Brace, Some('\\')) => match chars.next() {
                    None => return Err(ParseError::UnterminatedQuote),
                    Some(escaped) => current.push(unescape(escaped)),
                },
                (Quote::Double | Quote::Brace, Some(c)) => current.push(c),
            },
            State::Final => unreachable!(),
        }
        if tokens.len() > MAX_ARGS + 1 {
            return Err(ParseError::TooManyArgs);
        }
    }
    Ok(tokens)
}

/// Quote a token so that tokenizing it yields the original string, for any
/// content free of NUL. Always wraps in double quotes.
pub fn quote(token: &str) -> String {
    let mut out = String::with_capacity(token.len() + 2);
    out.push('"');
    for c in token.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}
