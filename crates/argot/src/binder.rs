//! Value binding for matched options and arguments.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::descriptor::{ArgumentDescriptor, ArgumentKind, OptionDescriptor, OptionKind};
use crate::error::RuntimeError;

static NEGATIVE_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-\d*\.?\d+$").expect("negative number regex must compile"));

const FALSE_WORDS: [&str; 5] = ["false", "no", "off", "f", "n"];

pub(crate) fn is_negative_number(token: &str) -> bool {
    NEGATIVE_NUMBER_RE.is_match(token)
}

/// `-x`, `--xyz`, `--xyz=v`; not `-`, `--` handled by the caller, nor `-1.5`.
pub(crate) fn is_option_token(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-') && !is_negative_number(token)
}

fn parse_bool(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    !FALSE_WORDS.contains(&lower.as_str())
}

/// Forward-only cursor over the token vector of one resolution.
#[derive(Debug, Clone, Default)]
pub(crate) struct TokenCursor {
    tokens: Vec<String>,
    index: usize,
}

impl TokenCursor {
    pub(crate) fn new(tokens: Vec<String>) -> Self {
        Self { tokens, index: 0 }
    }

    pub(crate) fn peek(&self) -> Option<&str> {
        self.tokens.get(self.index).map(String::as_str)
    }

    pub(crate) fn advance(&mut self) -> Option<String> {
        let token = self.tokens.get(self.index).cloned()?;
        self.index += 1;
        Some(token)
    }

    /// Everything not consumed yet.
    pub(crate) fn drain(&mut self) -> Vec<String> {
        let rest = self.tokens.get(self.index..).unwrap_or_default().to_vec();
        self.index = self.tokens.len();
        rest
    }

    /// Pull the next token as an option value.
    ///
    /// The escape token is never consumed. With `refuse_options`, tokens that
    /// look like options are left in place too.
    pub(crate) fn take_value(&mut self, refuse_options: bool) -> Option<String> {
        let next = self.peek()?;
        if next == "--" || (refuse_options && is_option_token(next)) {
            return None;
        }
        self.advance()
    }
}

/// An option reachable in the current resolution, with its raw binding.
#[derive(Debug, Clone)]
pub struct MatchedOption<'p> {
    option: &'p OptionDescriptor,
    raw: Value,
    dirty: bool,
    accepted: bool,
}

impl<'p> MatchedOption<'p> {
    pub(crate) fn new(option: &'p OptionDescriptor) -> Self {
        let raw = option
            .initial
            .clone()
            .unwrap_or_else(|| option.kind.zero());
        Self {
            option,
            raw,
            dirty: false,
            accepted: false,
        }
    }

    pub fn option(&self) -> &'p OptionDescriptor {
        self.option
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Whether the option appeared in the token stream.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Bind one occurrence of the option.
    ///
    /// `key` is the name the user typed (without dashes), `text` the part after
    /// `=` if any.
    pub(crate) fn accept(
        &mut self,
        cursor: &mut TokenCursor,
        key: &str,
        text: Option<&str>,
    ) -> Result<(), RuntimeError> {
        let option = self.option;
        let long = || option.long.clone();
        match option.kind {
            OptionKind::Boolean => {
                if self.accepted {
                    return Err(RuntimeError::BooleanOptionAcceptOnce { long: long() });
                }
                let mut value = text.map(parse_bool).unwrap_or(true);
                if key.starts_with("no-") && !option.long.starts_with("no-") {
                    value = !value;
                }
                self.raw = Value::Bool(value);
                self.dirty = true;
            }
            OptionKind::Required => {
                if self.accepted {
                    return Err(RuntimeError::RequiredOptionAcceptOnce { long: long() });
                }
                let value = text
                    .map(str::to_string)
                    .or_else(|| cursor.take_value(false));
                // Without a value the initial stands in as the bound value.
                if let Some(value) = value {
                    self.raw = Value::String(value);
                }
                self.dirty = true;
            }
            OptionKind::Optional => {
                if self.accepted {
                    return Err(RuntimeError::OptionalOptionAcceptOnce { long: long() });
                }
                let value = text
                    .map(str::to_string)
                    .or_else(|| cursor.take_value(true));
                self.raw = value.map(Value::String).unwrap_or(Value::Bool(true));
                self.dirty = true;
            }
            OptionKind::Spread => {
                let value = text
                    .map(str::to_string)
                    .or_else(|| cursor.take_value(true));
                if let Some(value) = value {
                    push_spread(&mut self.raw, value);
                }
                self.dirty = true;
            }
        }
        self.accepted = true;
        Ok(())
    }

    /// Typed value: `default` when nothing was bound, else `cast(raw)`.
    pub fn value(&self) -> Value {
        finish(
            self.dirty,
            &self.raw,
            self.option.default.as_ref(),
            self.option.cast.as_ref(),
        )
    }
}

/// A positional argument of the matched command.
#[derive(Debug, Clone)]
pub struct MatchedArgument<'p> {
    argument: &'p ArgumentDescriptor,
    raw: Value,
    dirty: bool,
}

impl<'p> MatchedArgument<'p> {
    pub(crate) fn new(argument: &'p ArgumentDescriptor) -> Self {
        let raw = argument
            .initial
            .clone()
            .unwrap_or_else(|| argument.kind.zero());
        Self {
            argument,
            raw,
            dirty: false,
        }
    }

    pub fn argument(&self) -> &'p ArgumentDescriptor {
        self.argument
    }

    pub fn name(&self) -> &'p str {
        &self.argument.name
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn accept(&mut self, token: String) {
        match self.argument.kind {
            ArgumentKind::Spread => push_spread(&mut self.raw, token),
            ArgumentKind::Required | ArgumentKind::Optional => {
                self.raw = Value::String(token);
            }
        }
        self.dirty = true;
    }

    pub fn value(&self) -> Value {
        finish(
            self.dirty,
            &self.raw,
            self.argument.default.as_ref(),
            self.argument.cast.as_ref(),
        )
    }
}

fn push_spread(raw: &mut Value, token: String) {
    match raw {
        Value::Array(items) => items.push(Value::String(token)),
        Value::Null => *raw = Value::Array(vec![Value::String(token)]),
        other => {
            let previous = other.take();
            *other = Value::Array(vec![previous, Value::String(token)]);
        }
    }
}

fn finish(
    dirty: bool,
    raw: &Value,
    default: Option<&Value>,
    cast: Option<&crate::descriptor::Cast>,
) -> Value {
    if !dirty {
        if let Some(default) = default {
            return default.clone();
        }
    }
    match cast {
        Some(cast) => cast(raw.clone()),
        None => raw.clone(),
    }
}
