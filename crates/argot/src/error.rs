//! Error taxonomy.
//!
//! - [`SpecError`]: a spec string is malformed. Raised by [`App::build`](crate::App::build).
//! - [`AmbiguityError`]: two declarations claim the same token path.
//! - [`RuntimeError`]: a token stream cannot be bound or invoked.
//! - [`UnknownOptionError`]: an option nobody declared or claimed.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error(transparent)]
    Ambiguity(#[from] AmbiguityError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    UnknownOption(#[from] UnknownOptionError),

    /// Raised by an action or middleware.
    #[error("action failed: {0:#}")]
    Action(#[from] anyhow::Error),
}

impl Error {
    pub fn as_spec(&self) -> Option<&SpecError> {
        match self {
            Self::Spec(err) => Some(err),
            _ => None,
        }
    }

    pub fn as_ambiguity(&self) -> Option<&AmbiguityError> {
        match self {
            Self::Ambiguity(err) => Some(err),
            _ => None,
        }
    }

    pub fn as_runtime(&self) -> Option<&RuntimeError> {
        match self {
            Self::Runtime(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SpecErrorKind {
    #[error("invalid argument")]
    InvalidArgument,
    #[error("empty argument name")]
    EmptyArgumentName,
    #[error("required argument after optional argument")]
    RequiredAfterOptional,
    #[error("optional argument after spread argument")]
    OptionalAfterSpread,
    #[error("spread argument can only appear once")]
    SpreadOnlyOnce,
    #[error("sub-command piece after argument start")]
    PieceAfterArgument,
    #[error("group can not declare arguments")]
    ArgumentInGroup,
    #[error("invalid option spec")]
    InvalidOptionSpec,
    #[error("alias can not declare arguments")]
    InvalidAliasFormat,
}

/// A malformed command, group, alias, argument or option spec string.
///
/// `position` is the byte offset of the offending token inside `spec`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at position {position} in `{spec}`")]
pub struct SpecError {
    pub kind: SpecErrorKind,
    pub spec: String,
    pub position: usize,
}

impl SpecError {
    pub(crate) fn new(kind: SpecErrorKind, spec: &str, position: usize) -> Self {
        Self {
            kind,
            spec: spec.to_string(),
            position,
        }
    }

    /// Render the spec with a caret under the offending position.
    pub fn caret(&self) -> String {
        let column = self
            .spec
            .get(..self.position)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(0);
        format!("{}\n{}^", self.spec, " ".repeat(column))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmbiguityError {
    #[error("duplicated default command: `{first}` and `{second}`")]
    DuplicatedDefaultCommand { first: String, second: String },

    #[error("duplicated command `{pieces}`: matched by `{first}` and `{second}`")]
    DuplicatedCommand {
        pieces: String,
        first: String,
        second: String,
    },

    #[error("duplicated group `{pieces}`")]
    DuplicatedGroup { pieces: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("missing required argument: <{name}>")]
    RequiredArgumentMissing { name: String },

    #[error("boolean option --{long} can only be used once")]
    BooleanOptionAcceptOnce { long: String },

    #[error("option --{long} <value> can only be used once")]
    RequiredOptionAcceptOnce { long: String },

    #[error("option --{long} [value] can only be used once")]
    OptionalOptionAcceptOnce { long: String },

    #[error("no action bound to command `{command}`")]
    NoActionBound { command: String },

    #[error("no matched command{}", format_tokens(.unknown))]
    NoMatchedCommand { unknown: Vec<String> },
}

fn format_tokens(tokens: &[String]) -> String {
    if tokens.is_empty() {
        String::new()
    } else {
        format!(": {}", tokens.join(" "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown option: {flag}")]
pub struct UnknownOptionError {
    pub flag: String,
}
