/// `WWW-Authenticate` challenge parser.
///
/// A single explicit state machine over the header characters. A header
/// may carry several comma-separated challenges; within a challenge,
/// parameters are space- or comma-separated `key=value` pairs whose
/// values may be quoted with `\"` and `\\` escapes. A token after a
/// comma or after a completed parameter is ambiguous (next parameter
/// vs. next scheme) until the following character resolves it.
use std::collections::BTreeMap;

/// One parsed challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthScheme {
    /// Scheme token as it appeared, e.g. `Bearer`. Match it
    /// case-insensitively.
    pub scheme: String,
    pub params: BTreeMap<String, String>,
}

impl AuthScheme {
    pub fn is_bearer(&self) -> bool {
        self.scheme.eq_ignore_ascii_case("bearer")
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid WWW-Authenticate header at offset {position}: {message}")]
pub struct WwwAuthenticateError {
    pub position: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    BeforeSchemeOrKey,
    InScheme,
    InSchemeOrKey,
    BeforeKey,
    InKey,
    AfterKey,
    AfterKeyOrScheme,
    BeforeValue,
    InValue,
    InQuotes,
    AfterEscape,
    AfterValue,
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '!' | '#' | '$' | '%' | '&' | '\'' | '*' | '+' | '-' | '.' | '^' | '_' | '`' | '|'
                | '~'
        )
}

fn is_printable(c: char) -> bool {
    !c.is_control()
}

struct Parser {
    schemes: Vec<AuthScheme>,
    current: Option<String>,
    params: BTreeMap<String, String>,
    token: String,
    key: String,
    value: String,
}

impl Parser {
    fn new() -> Self {
        Parser {
            schemes: Vec::new(),
            current: None,
            params: BTreeMap::new(),
            token: String::new(),
            key: String::new(),
            value: String::new(),
        }
    }

    fn commit_param(&mut self) {
        self.params
            .insert(std::mem::take(&mut self.key), std::mem::take(&mut self.value));
    }

    fn commit_scheme(&mut self) {
        if let Some(scheme) = self.current.take() {
            self.schemes.push(AuthScheme {
                scheme,
                params: std::mem::take(&mut self.params),
            });
        }
    }

    /// The pending ambiguous token turned out to be a new scheme.
    fn token_is_scheme(&mut self) {
        self.commit_scheme();
        self.current = Some(std::mem::take(&mut self.token));
    }
}

/// Parse one `WWW-Authenticate` header value.
pub fn parse(header: &str) -> Result<Vec<AuthScheme>, WwwAuthenticateError> {
    let mut p = Parser::new();
    let mut state = State::Start;

    let err = |position: usize, message: &str| WwwAuthenticateError {
        position,
        message: message.to_string(),
    };

    for (i, c) in header.char_indices() {
        if !is_printable(c) {
            return Err(err(i, "non-printable character"));
        }
        state = match state {
            State::Start | State::BeforeSchemeOrKey => match c {
                ' ' | ',' => state,
                '=' => return Err(err(i, "parameter without a scheme")),
                '"' => return Err(err(i, "scheme names cannot be quoted")),
                c if is_token_char(c) => {
                    if state == State::Start {
                        p.current = Some(c.to_string());
                        State::InScheme
                    } else {
                        p.token.push(c);
                        State::InSchemeOrKey
                    }
                }
                _ => return Err(err(i, "unexpected character")),
            },
            State::InScheme => match c {
                c if is_token_char(c) => {
                    p.current.as_mut().expect("scheme started").push(c);
                    State::InScheme
                }
                ' ' => State::BeforeKey,
                ',' => State::BeforeSchemeOrKey,
                '=' => return Err(err(i, "parameter without a scheme")),
                '"' => return Err(err(i, "unexpected quote after scheme")),
                _ => return Err(err(i, "unexpected character")),
            },
            State::BeforeKey => match c {
                ' ' => State::BeforeKey,
                ',' => State::BeforeSchemeOrKey,
                '=' => return Err(err(i, "parameter key must not be empty")),
                '"' => return Err(err(i, "parameter keys cannot be quoted")),
                c if is_token_char(c) => {
                    p.key.push(c);
                    State::InKey
                }
                _ => return Err(err(i, "unexpected character")),
            },
            State::InKey => match c {
                c if is_token_char(c) => {
                    p.key.push(c);
                    State::InKey
                }
                '=' => State::BeforeValue,
                ' ' => State::AfterKey,
                '"' => return Err(err(i, "unexpected quote in parameter key")),
                ',' => return Err(err(i, "parameter key without a value")),
                _ => return Err(err(i, "unexpected character")),
            },
            State::AfterKey => match c {
                ' ' => State::AfterKey,
                '=' => State::BeforeValue,
                _ if is_token_char(c) => {
                    return Err(err(i, "expected '=' or ',' between schemes"))
                }
                ',' => return Err(err(i, "parameter key without a value")),
                _ => return Err(err(i, "unexpected character")),
            },
            State::AfterKeyOrScheme => match c {
                ' ' => State::AfterKeyOrScheme,
                '=' => {
                    // The pending token was a parameter key after all.
                    p.key = std::mem::take(&mut p.token);
                    State::BeforeValue
                }
                c if is_token_char(c) => {
                    p.token_is_scheme();
                    p.key.push(c);
                    State::InKey
                }
                ',' => {
                    p.token_is_scheme();
                    State::BeforeSchemeOrKey
                }
                _ => return Err(err(i, "unexpected character")),
            },
            State::InSchemeOrKey => match c {
                c if is_token_char(c) => {
                    p.token.push(c);
                    State::InSchemeOrKey
                }
                '=' => {
                    p.key = std::mem::take(&mut p.token);
                    State::BeforeValue
                }
                ' ' => State::AfterKeyOrScheme,
                ',' => {
                    p.token_is_scheme();
                    State::BeforeSchemeOrKey
                }
                '"' => return Err(err(i, "unexpected quote in token")),
                _ => return Err(err(i, "unexpected character")),
            },
            State::BeforeValue => match c {
                '"' => State::InQuotes,
                c if is_token_char(c) => {
                    p.value.push(c);
                    State::InValue
                }
                _ => return Err(err(i, "parameter value missing")),
            },
            State::InValue => match c {
                c if is_token_char(c) => {
                    p.value.push(c);
                    State::InValue
                }
                ' ' => {
                    p.commit_param();
                    State::AfterValue
                }
                ',' => {
                    p.commit_param();
                    State::BeforeSchemeOrKey
                }
                _ => return Err(err(i, "unexpected character in value")),
            },
            State::InQuotes => match c {
                '\\' => State::AfterEscape,
                '"' => {
                    p.commit_param();
                    State::AfterValue
                }
                c => {
                    p.value.push(c);
                    State::InQuotes
                }
            },
            State::AfterEscape => {
                p.value.push(c);
                State::InQuotes
            }
            State::AfterValue => match c {
                ' ' => State::AfterValue,
                ',' => State::BeforeSchemeOrKey,
                // Ambiguous: the next parameter key of this scheme, or
                // the name of a new scheme.
                c if is_token_char(c) => {
                    p.token.push(c);
                    State::InSchemeOrKey
                }
                _ => return Err(err(i, "expected separator after value")),
            },
        };
    }

    let end = header.len();
    match state {
        State::Start | State::BeforeSchemeOrKey => p.commit_scheme(),
        State::InScheme | State::BeforeKey => p.commit_scheme(),
        State::InSchemeOrKey | State::AfterKeyOrScheme => {
            p.token_is_scheme();
            p.commit_scheme();
        }
        State::InValue => {
            p.commit_param();
            p.commit_scheme();
        }
        State::AfterValue => p.commit_scheme(),
        State::InKey | State::AfterKey => {
            return Err(err(end, "parameter key without a value at end of header"))
        }
        State::BeforeValue => return Err(err(end, "parameter value missing at end of header")),
        State::InQuotes | State::AfterEscape => {
            return Err(err(end, "unterminated quoted value"))
        }
    }

    Ok(p.schemes)
}
