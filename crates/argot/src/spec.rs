//! Spec string parsing.
//!
//! Command specs are whitespace-separated tokens: constant pieces first, then
//! arguments (`<required>`, `[optional]`, `[...spread]`). Option specs follow
//! `-f, --flag <value>`. All positions reported in errors are byte offsets into
//! the original spec string.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::descriptor::{ArgumentKind, OptionKind};
use crate::error::{SpecError, SpecErrorKind};

static OPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:-([A-Za-z]), )?--(no-)?([A-Za-z0-9][\w-]*)(?: (<[\w-]+>|\[(?:\.\.\.)?[\w-]+\]))?$",
    )
    .expect("option spec regex must compile")
});

const BRACKETS: [char; 4] = ['<', '>', '[', ']'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentShape {
    pub kind: ArgumentKind,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandShape {
    pub pieces: Vec<String>,
    pub arguments: Vec<ArgumentShape>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionShape {
    pub long: String,
    pub short: Option<char>,
    pub kind: OptionKind,
    /// Declared as `--no-<long>`.
    pub negated: bool,
    pub placeholder: Option<String>,
}

enum Token<'a> {
    Piece(&'a str),
    Argument(ArgumentShape),
}

/// Split on whitespace, keeping the byte offset of each token.
fn tokenize(spec: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = None;
    for (idx, ch) in spec.char_indices() {
        if ch.is_whitespace() {
            if let Some(begin) = start.take() {
                out.push((begin, &spec[begin..idx]));
            }
        } else if start.is_none() {
            start = Some(idx);
        }
    }
    if let Some(begin) = start {
        out.push((begin, &spec[begin..]));
    }
    out
}

fn classify<'a>(spec: &str, position: usize, token: &'a str) -> Result<Token<'a>, SpecError> {
    let invalid = |kind| SpecError::new(kind, spec, position);

    if let Some(rest) = token.strip_prefix('<') {
        let name = rest
            .strip_suffix('>')
            .ok_or_else(|| invalid(SpecErrorKind::InvalidArgument))?;
        if name.starts_with("...") || name.contains(BRACKETS) {
            return Err(invalid(SpecErrorKind::InvalidArgument));
        }
        if name.is_empty() {
            return Err(invalid(SpecErrorKind::EmptyArgumentName));
        }
        return Ok(Token::Argument(ArgumentShape {
            kind: ArgumentKind::Required,
            name: name.to_string(),
        }));
    }

    if let Some(rest) = token.strip_prefix('[') {
        let inner = rest
            .strip_suffix(']')
            .ok_or_else(|| invalid(SpecErrorKind::InvalidArgument))?;
        let (kind, name) = match inner.strip_prefix("...") {
            Some(name) => (ArgumentKind::Spread, name),
            None => (ArgumentKind::Optional, inner),
        };
        if name.contains(BRACKETS) {
            return Err(invalid(SpecErrorKind::InvalidArgument));
        }
        if name.is_empty() {
            return Err(invalid(SpecErrorKind::EmptyArgumentName));
        }
        return Ok(Token::Argument(ArgumentShape {
            kind,
            name: name.to_string(),
        }));
    }

    if let Some(offset) = token.find(BRACKETS) {
        return Err(SpecError::new(
            SpecErrorKind::InvalidArgument,
            spec,
            position + offset,
        ));
    }
    Ok(Token::Piece(token))
}

/// Validate appending an argument of kind `next` after one of kind `last`.
///
/// Arity kinds must stay ordered `Required* Optional* Spread?`.
pub(crate) fn arity_step(last: Option<ArgumentKind>, next: ArgumentKind) -> Option<SpecErrorKind> {
    use ArgumentKind::*;
    match (last, next) {
        (Some(Spread), Spread) => Some(SpecErrorKind::SpreadOnlyOnce),
        (Some(Spread), Optional) => Some(SpecErrorKind::OptionalAfterSpread),
        (Some(Optional | Spread), Required) => Some(SpecErrorKind::RequiredAfterOptional),
        _ => None,
    }
}

/// Parse a command spec such as `store ls <path> [...rest]`.
pub fn parse_command(spec: &str) -> Result<CommandShape, SpecError> {
    let mut shape = CommandShape::default();
    for (position, token) in tokenize(spec) {
        match classify(spec, position, token)? {
            Token::Piece(piece) => {
                if !shape.arguments.is_empty() {
                    return Err(SpecError::new(
                        SpecErrorKind::PieceAfterArgument,
                        spec,
                        position,
                    ));
                }
                shape.pieces.push(piece.to_string());
            }
            Token::Argument(argument) => {
                let last = shape.arguments.last().map(|arg| arg.kind);
                if let Some(kind) = arity_step(last, argument.kind) {
                    return Err(SpecError::new(kind, spec, position));
                }
                shape.arguments.push(argument);
            }
        }
    }
    Ok(shape)
}

/// Parse a group spec: one or more constant pieces.
pub fn parse_group(spec: &str) -> Result<Vec<String>, SpecError> {
    let mut pieces = Vec::new();
    for (position, token) in tokenize(spec) {
        if token.starts_with(['<', '[']) {
            return Err(SpecError::new(
                SpecErrorKind::ArgumentInGroup,
                spec,
                position,
            ));
        }
        match classify(spec, position, token)? {
            Token::Piece(piece) => pieces.push(piece.to_string()),
            Token::Argument(_) => {
                return Err(SpecError::new(
                    SpecErrorKind::ArgumentInGroup,
                    spec,
                    position,
                ));
            }
        }
    }
    if pieces.is_empty() {
        return Err(SpecError::new(SpecErrorKind::InvalidArgument, spec, 0));
    }
    Ok(pieces)
}

/// Parse an alias spec. Aliases are pieces only; an empty alias makes the
/// command a default command.
pub fn parse_alias(spec: &str) -> Result<Vec<String>, SpecError> {
    if let Some(position) = spec.find(BRACKETS) {
        return Err(SpecError::new(
            SpecErrorKind::InvalidAliasFormat,
            spec,
            position,
        ));
    }
    Ok(tokenize(spec)
        .into_iter()
        .map(|(_, token)| token.to_string())
        .collect())
}

/// Parse a single argument spec (`<name>`, `[name]` or `[...name]`).
pub fn parse_argument(spec: &str) -> Result<ArgumentShape, SpecError> {
    let tokens = tokenize(spec);
    let Some(&(position, token)) = tokens.first() else {
        return Err(SpecError::new(SpecErrorKind::InvalidArgument, spec, 0));
    };
    if let Some(&(extra, _)) = tokens.get(1) {
        return Err(SpecError::new(SpecErrorKind::InvalidArgument, spec, extra));
    }
    match classify(spec, position, token)? {
        Token::Argument(argument) => Ok(argument),
        Token::Piece(_) => Err(SpecError::new(
            SpecErrorKind::InvalidArgument,
            spec,
            position,
        )),
    }
}

/// Parse an option spec such as `-f, --flag <value>` or `--no-color`.
pub fn parse_option(spec: &str) -> Result<OptionShape, SpecError> {
    let trimmed = spec.trim();
    let offset = spec.len() - spec.trim_start().len();
    let caps = OPTION_RE
        .captures(trimmed)
        .ok_or_else(|| SpecError::new(SpecErrorKind::InvalidOptionSpec, spec, offset))?;

    let short = caps.get(1).and_then(|m| m.as_str().chars().next());
    let negated = caps.get(2).is_some();
    let long = caps[3].to_string();

    let (kind, placeholder) = match caps.get(4) {
        None => (OptionKind::Boolean, None),
        Some(m) => {
            if negated {
                return Err(SpecError::new(
                    SpecErrorKind::InvalidOptionSpec,
                    spec,
                    offset + m.start(),
                ));
            }
            let text = m.as_str();
            let kind = if text.starts_with('<') {
                OptionKind::Required
            } else if text.starts_with("[...") {
                OptionKind::Spread
            } else {
                OptionKind::Optional
            };
            (kind, Some(text.to_string()))
        }
    };

    Ok(OptionShape {
        long,
        short,
        kind,
        negated,
        placeholder,
    })
}

pub fn format_argument(kind: ArgumentKind, name: &str) -> String {
    match kind {
        ArgumentKind::Required => format!("<{name}>"),
        ArgumentKind::Optional => format!("[{name}]"),
        ArgumentKind::Spread => format!("[...{name}]"),
    }
}

/// Render a command shape back into spec form.
pub fn format_command(shape: &CommandShape) -> String {
    shape
        .pieces
        .iter()
        .cloned()
        .chain(
            shape
                .arguments
                .iter()
                .map(|arg| format_argument(arg.kind, &arg.name)),
        )
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err_of(result: Result<CommandShape, SpecError>) -> (SpecErrorKind, usize) {
        let err = result.expect_err("spec should be rejected");
        (err.kind, err.position)
    }

    #[test]
    fn parses_pieces_then_arguments() {
        let shape = parse_command("store ls <path> [opt] [...rest]").unwrap();
        assert_eq!(shape.pieces, vec!["store", "ls"]);
        let kinds: Vec<_> = shape.arguments.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ArgumentKind::Required,
                ArgumentKind::Optional,
                ArgumentKind::Spread
            ]
        );
        assert_eq!(shape.arguments[2].name, "rest");
    }

    #[test]
    fn ignores_extra_whitespace() {
        let shape = parse_command("  build \t <dir>   ").unwrap();
        assert_eq!(shape.pieces, vec!["build"]);
        assert_eq!(shape.arguments.len(), 1);
        assert!(parse_command("").unwrap().pieces.is_empty());
    }

    #[test]
    fn arity_errors_carry_offsets() {
        assert_eq!(
            err_of(parse_command("cp [a] <b>")),
            (SpecErrorKind::RequiredAfterOptional, 7)
        );
        assert_eq!(
            err_of(parse_command("x [...a] [b]")),
            (SpecErrorKind::OptionalAfterSpread, 9)
        );
        assert_eq!(
            err_of(parse_command("x [...a] [...b]")),
            (SpecErrorKind::SpreadOnlyOnce, 9)
        );
        assert_eq!(
            err_of(parse_command("x [...a] <b>")),
            (SpecErrorKind::RequiredAfterOptional, 9)
        );
        assert_eq!(
            err_of(parse_command("store <path> ls")),
            (SpecErrorKind::PieceAfterArgument, 13)
        );
    }

    #[test]
    fn malformed_brackets_are_invalid() {
        assert_eq!(
            err_of(parse_command("a <...b>")),
            (SpecErrorKind::InvalidArgument, 2)
        );
        assert_eq!(
            err_of(parse_command("a <b")),
            (SpecErrorKind::InvalidArgument, 2)
        );
        assert_eq!(
            err_of(parse_command("a b<c")),
            (SpecErrorKind::InvalidArgument, 3)
        );
        assert_eq!(
            err_of(parse_command("a []")),
            (SpecErrorKind::EmptyArgumentName, 2)
        );
        assert_eq!(
            err_of(parse_command("a [...]")),
            (SpecErrorKind::EmptyArgumentName, 2)
        );
    }

    #[test]
    fn group_rejects_arguments() {
        assert_eq!(parse_group("store").unwrap(), vec!["store"]);
        let err = parse_group("store <x>").unwrap_err();
        assert_eq!(err.kind, SpecErrorKind::ArgumentInGroup);
        assert_eq!(err.position, 6);
    }

    #[test]
    fn group_needs_a_piece() {
        for spec in ["", "   "] {
            let err = parse_group(spec).unwrap_err();
            assert_eq!(err.kind, SpecErrorKind::InvalidArgument);
            assert_eq!(err.position, 0);
        }
    }

    #[test]
    fn alias_rejects_brackets() {
        assert_eq!(parse_alias("s l").unwrap(), vec!["s", "l"]);
        assert!(parse_alias("").unwrap().is_empty());
        let err = parse_alias("ls [x]").unwrap_err();
        assert_eq!(err.kind, SpecErrorKind::InvalidAliasFormat);
        assert_eq!(err.position, 3);
    }

    #[test]
    fn parses_single_argument() {
        let arg = parse_argument("[...files]").unwrap();
        assert_eq!(arg.kind, ArgumentKind::Spread);
        assert_eq!(arg.name, "files");
        assert_eq!(
            parse_argument("file").unwrap_err().kind,
            SpecErrorKind::InvalidArgument
        );
        assert_eq!(parse_argument("<a> <b>").unwrap_err().position, 4);
    }

    #[test]
    fn parses_option_specs() {
        let opt = parse_option("-f, --flag <value>").unwrap();
        assert_eq!(opt.short, Some('f'));
        assert_eq!(opt.long, "flag");
        assert_eq!(opt.kind, OptionKind::Required);
        assert_eq!(opt.placeholder.as_deref(), Some("<value>"));

        assert_eq!(parse_option("--open").unwrap().kind, OptionKind::Boolean);
        assert_eq!(parse_option("--host [addr]").unwrap().kind, OptionKind::Optional);
        assert_eq!(
            parse_option("--include [...v]").unwrap().kind,
            OptionKind::Spread
        );

        let negated = parse_option("--no-color").unwrap();
        assert!(negated.negated);
        assert_eq!(negated.long, "color");
        assert_eq!(negated.kind, OptionKind::Boolean);
    }

    #[test]
    fn rejects_bad_option_specs() {
        assert_eq!(
            parse_option("flag").unwrap_err().kind,
            SpecErrorKind::InvalidOptionSpec
        );
        assert_eq!(
            parse_option("-ff, --flag").unwrap_err().kind,
            SpecErrorKind::InvalidOptionSpec
        );
        let err = parse_option("--no-x <y>").unwrap_err();
        assert_eq!(err.kind, SpecErrorKind::InvalidOptionSpec);
        assert_eq!(err.position, 7);
    }

    #[test]
    fn format_round_trips() {
        for spec in [
            "store ls <path> [...rest]",
            "  dev   ",
            "<file>",
            "echo <a> [b]",
            "",
        ] {
            let shape = parse_command(spec).unwrap();
            let rendered = format_command(&shape);
            assert_eq!(parse_command(&rendered).unwrap(), shape, "spec: {spec:?}");
        }
        assert_eq!(
            format_command(&parse_command(" store   ls <path> [...rest]").unwrap()),
            "store ls <path> [...rest]"
        );
    }
}
