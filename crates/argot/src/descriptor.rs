//! Resolved, immutable descriptors.
//!
//! Descriptors are produced once by [`App::build`](crate::App::build) and live
//! in the [`Program`](crate::Program) arena. Groups and commands refer to each
//! other through [`GroupId`]/[`CommandId`] rather than references.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::middleware::{Action, Middleware, UnknownOptionHandler};
use crate::spec::{self, ArgumentShape, CommandShape};

/// Converts a raw bound value into the value handed to actions.
pub type Cast = Arc<dyn Fn(Value) -> Value + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionId(pub(crate) usize);

impl CommandId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl GroupId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Where an option was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    App,
    Group(GroupId),
    Command(CommandId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentKind {
    Required,
    Optional,
    Spread,
}

impl ArgumentKind {
    /// Raw value of an argument that never received a token.
    pub fn zero(self) -> Value {
        match self {
            Self::Required | Self::Optional => Value::Null,
            Self::Spread => Value::Array(Vec::new()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Optional => "optional",
            Self::Spread => "spread",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    Boolean,
    Required,
    Optional,
    Spread,
}

impl OptionKind {
    /// Raw value of an option that never received a token.
    pub fn zero(self) -> Value {
        match self {
            Self::Boolean | Self::Optional => Value::Bool(false),
            Self::Required => Value::Null,
            Self::Spread => Value::Array(Vec::new()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Required => "required",
            Self::Optional => "optional",
            Self::Spread => "spread",
        }
    }
}

fn same_cast(a: &Option<Cast>, b: &Option<Cast>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

#[derive(Clone)]
pub struct ArgumentDescriptor {
    pub(crate) kind: ArgumentKind,
    pub(crate) name: String,
    pub(crate) initial: Option<Value>,
    pub(crate) default: Option<Value>,
    pub(crate) cast: Option<Cast>,
}

impl ArgumentDescriptor {
    pub(crate) fn from_shape(shape: ArgumentShape) -> Self {
        Self {
            kind: shape.kind,
            name: shape.name,
            initial: None,
            default: None,
            cast: None,
        }
    }

    pub fn kind(&self) -> ArgumentKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial(&self) -> Option<&Value> {
        self.initial.as_ref()
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn cast(&self) -> Option<&Cast> {
        self.cast.as_ref()
    }

    /// `<name>`, `[name]` or `[...name]`.
    pub fn usage(&self) -> String {
        spec::format_argument(self.kind, &self.name)
    }
}

impl fmt::Debug for ArgumentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentDescriptor")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("initial", &self.initial)
            .field("default", &self.default)
            .field("cast", &self.cast.is_some())
            .finish()
    }
}

impl PartialEq for ArgumentDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.name == other.name
            && self.initial == other.initial
            && self.default == other.default
            && same_cast(&self.cast, &other.cast)
    }
}

#[derive(Clone)]
pub struct OptionDescriptor {
    pub(crate) id: OptionId,
    pub(crate) scope: Scope,
    pub(crate) spec: String,
    pub(crate) long: String,
    pub(crate) short: Option<char>,
    pub(crate) kind: OptionKind,
    pub(crate) negated: bool,
    pub(crate) placeholder: Option<String>,
    pub(crate) description: String,
    pub(crate) initial: Option<Value>,
    pub(crate) default: Option<Value>,
    pub(crate) cast: Option<Cast>,
}

impl OptionDescriptor {
    pub fn id(&self) -> OptionId {
        self.id
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn spec(&self) -> &str {
        &self.spec
    }

    /// Long name without the leading `--` (and without a declared `no-` prefix).
    pub fn long(&self) -> &str {
        &self.long
    }

    pub fn short(&self) -> Option<char> {
        self.short
    }

    pub fn kind(&self) -> OptionKind {
        self.kind
    }

    /// Declared in `--no-<long>` form.
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn initial(&self) -> Option<&Value> {
        self.initial.as_ref()
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn cast(&self) -> Option<&Cast> {
        self.cast.as_ref()
    }

    /// The `no-<long>` name this option answers to, if any.
    ///
    /// Boolean options get one automatically unless an initial or default value
    /// was configured; options declared as `--no-<long>` always have one.
    pub fn negated_name(&self) -> Option<String> {
        if self.kind != OptionKind::Boolean {
            return None;
        }
        if self.negated || (self.initial.is_none() && self.default.is_none()) {
            Some(format!("no-{}", self.long))
        } else {
            None
        }
    }

    /// `-f, --flag <value>` style flag line.
    pub fn flags(&self) -> String {
        let mut out = String::new();
        if let Some(short) = self.short {
            out.push('-');
            out.push(short);
            out.push_str(", ");
        }
        out.push_str("--");
        if self.negated {
            out.push_str("no-");
        }
        out.push_str(&self.long);
        if let Some(placeholder) = &self.placeholder {
            out.push(' ');
            out.push_str(placeholder);
        }
        out
    }
}

impl fmt::Debug for OptionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionDescriptor")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("long", &self.long)
            .field("short", &self.short)
            .field("kind", &self.kind)
            .field("negated", &self.negated)
            .field("initial", &self.initial)
            .field("default", &self.default)
            .field("cast", &self.cast.is_some())
            .finish()
    }
}

impl PartialEq for OptionDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.scope == other.scope
            && self.spec == other.spec
            && self.long == other.long
            && self.short == other.short
            && self.kind == other.kind
            && self.negated == other.negated
            && self.placeholder == other.placeholder
            && self.description == other.description
            && self.initial == other.initial
            && self.default == other.default
            && same_cast(&self.cast, &other.cast)
    }
}

#[derive(Clone)]
pub struct CommandDescriptor {
    pub(crate) id: CommandId,
    pub(crate) group: Option<GroupId>,
    pub(crate) spec: String,
    pub(crate) description: String,
    /// Alias 0 is the command's own pieces.
    pub(crate) aliases: Vec<Vec<String>>,
    pub(crate) arguments: Vec<ArgumentDescriptor>,
    pub(crate) options: Vec<OptionId>,
    pub(crate) middlewares: Vec<Middleware>,
    pub(crate) unknown_option_handlers: Vec<UnknownOptionHandler>,
    pub(crate) action: Option<Action>,
}

impl CommandDescriptor {
    pub fn id(&self) -> CommandId {
        self.id
    }

    pub fn group(&self) -> Option<GroupId> {
        self.group
    }

    pub fn spec(&self) -> &str {
        &self.spec
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Constant pieces, relative to the owning group.
    pub fn pieces(&self) -> &[String] {
        &self.aliases[0]
    }

    /// Every piece sequence this command answers to, its own pieces first.
    pub fn aliases(&self) -> &[Vec<String>] {
        &self.aliases
    }

    pub fn arguments(&self) -> &[ArgumentDescriptor] {
        &self.arguments
    }

    pub fn options(&self) -> &[OptionId] {
        &self.options
    }

    pub fn is_default(&self) -> bool {
        self.aliases.iter().any(|alias| alias.is_empty())
    }

    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    pub(crate) fn shape(&self) -> CommandShape {
        CommandShape {
            pieces: self.pieces().to_vec(),
            arguments: self
                .arguments
                .iter()
                .map(|arg| ArgumentShape {
                    kind: arg.kind,
                    name: arg.name.clone(),
                })
                .collect(),
        }
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("id", &self.id)
            .field("group", &self.group)
            .field("spec", &self.spec)
            .field("aliases", &self.aliases)
            .field("arguments", &self.arguments)
            .field("options", &self.options)
            .field("middlewares", &self.middlewares.len())
            .field("action", &self.action.is_some())
            .finish()
    }
}

impl PartialEq for CommandDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.group == other.group
            && self.spec == other.spec
            && self.description == other.description
            && self.aliases == other.aliases
            && self.arguments == other.arguments
            && self.options == other.options
            && self.middlewares.len() == other.middlewares.len()
            && self.action.is_some() == other.action.is_some()
    }
}

#[derive(Clone)]
pub struct GroupDescriptor {
    pub(crate) id: GroupId,
    pub(crate) spec: String,
    pub(crate) description: String,
    pub(crate) pieces: Vec<String>,
    pub(crate) options: Vec<OptionId>,
    pub(crate) commands: Vec<CommandId>,
    pub(crate) middlewares: Vec<Middleware>,
    pub(crate) unknown_option_handlers: Vec<UnknownOptionHandler>,
}

impl GroupDescriptor {
    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn spec(&self) -> &str {
        &self.spec
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn pieces(&self) -> &[String] {
        &self.pieces
    }

    pub fn options(&self) -> &[OptionId] {
        &self.options
    }

    pub fn commands(&self) -> &[CommandId] {
        &self.commands
    }
}

impl fmt::Debug for GroupDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupDescriptor")
            .field("id", &self.id)
            .field("pieces", &self.pieces)
            .field("options", &self.options)
            .field("commands", &self.commands)
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

impl PartialEq for GroupDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.spec == other.spec
            && self.description == other.description
            && self.pieces == other.pieces
            && self.options == other.options
            && self.commands == other.commands
            && self.middlewares.len() == other.middlewares.len()
    }
}
