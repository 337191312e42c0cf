//! Declaration builders.
//!
//! Builders only record spec strings and settings. Every spec is parsed and
//! validated by [`App::build`], which produces an immutable [`Program`].
//!
//! ```
//! use argot::{App, command, option};
//!
//! let program = App::new("demo")
//!     .option(option("--verbose"))
//!     .command(command("build <dir>").option(option("-o, --out <file>")))
//!     .build()
//!     .unwrap();
//! assert_eq!(program.commands().len(), 1);
//! ```

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use crate::descriptor::{
    ArgumentDescriptor, Cast, CommandDescriptor, CommandId, GroupDescriptor, GroupId,
    OptionDescriptor, OptionId, OptionKind, Scope,
};
use crate::error::{AmbiguityError, Result, SpecError, SpecErrorKind};
use crate::middleware::{
    self, Action, Invocation, Middleware, Next, UnknownOption, UnknownOptionHandler,
};
use crate::program::Program;
use crate::spec;

/// Start an option declaration, e.g. `option("-p, --port <port>")`.
pub fn option(spec: impl Into<String>) -> OptionBuilder {
    OptionBuilder {
        spec: spec.into(),
        description: String::new(),
        initial: None,
        default: None,
        cast: None,
    }
}

/// Start an extra argument declaration, e.g. `argument("[...files]")`.
pub fn argument(spec: impl Into<String>) -> ArgumentBuilder {
    ArgumentBuilder {
        spec: spec.into(),
        initial: None,
        default: None,
        cast: None,
    }
}

pub fn command(spec: impl Into<String>) -> CommandBuilder {
    CommandBuilder {
        spec: spec.into(),
        description: String::new(),
        aliases: Vec::new(),
        arguments: Vec::new(),
        options: Vec::new(),
        middlewares: Vec::new(),
        unknown_option_handlers: Vec::new(),
        action: None,
    }
}

pub fn group(spec: impl Into<String>) -> GroupBuilder {
    GroupBuilder {
        spec: spec.into(),
        description: String::new(),
        options: Vec::new(),
        commands: Vec::new(),
        middlewares: Vec::new(),
        unknown_option_handlers: Vec::new(),
    }
}

#[derive(Clone)]
pub struct OptionBuilder {
    spec: String,
    description: String,
    initial: Option<Value>,
    default: Option<Value>,
    cast: Option<Cast>,
}

impl OptionBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Raw value before any token is bound.
    pub fn initial(mut self, value: impl Into<Value>) -> Self {
        self.initial = Some(value.into());
        self
    }

    /// Value returned verbatim when no token was bound. Not passed through `cast`.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn cast<F>(mut self, cast: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.cast = Some(Arc::new(cast));
        self
    }

    fn build(&self, id: OptionId, scope: Scope) -> Result<OptionDescriptor, SpecError> {
        let shape = spec::parse_option(&self.spec)?;
        let mut initial = self.initial.clone();
        if shape.negated
            && shape.kind == OptionKind::Boolean
            && initial.is_none()
            && self.default.is_none()
        {
            initial = Some(Value::Bool(true));
        }
        Ok(OptionDescriptor {
            id,
            scope,
            spec: self.spec.clone(),
            long: shape.long,
            short: shape.short,
            kind: shape.kind,
            negated: shape.negated,
            placeholder: shape.placeholder,
            description: self.description.clone(),
            initial,
            default: self.default.clone(),
            cast: self.cast.clone(),
        })
    }
}

#[derive(Clone)]
pub struct ArgumentBuilder {
    spec: String,
    initial: Option<Value>,
    default: Option<Value>,
    cast: Option<Cast>,
}

impl ArgumentBuilder {
    pub fn initial(mut self, value: impl Into<Value>) -> Self {
        self.initial = Some(value.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn cast<F>(mut self, cast: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.cast = Some(Arc::new(cast));
        self
    }

    /// Attach to an argument already declared in the command spec, or append
    /// a new one.
    fn apply(&self, arguments: &mut Vec<ArgumentDescriptor>) -> Result<(), SpecError> {
        let shape = spec::parse_argument(&self.spec)?;
        let invalid = |kind| SpecError::new(kind, &self.spec, 0);

        let target = match arguments.iter().position(|arg| arg.name == shape.name) {
            Some(index) => {
                if arguments[index].kind != shape.kind {
                    return Err(invalid(SpecErrorKind::InvalidArgument));
                }
                &mut arguments[index]
            }
            None => {
                let last = arguments.last().map(|arg| arg.kind);
                if let Some(kind) = spec::arity_step(last, shape.kind) {
                    return Err(invalid(kind));
                }
                arguments.push(ArgumentDescriptor::from_shape(shape));
                let end = arguments.len() - 1;
                &mut arguments[end]
            }
        };
        if self.initial.is_some() {
            target.initial = self.initial.clone();
        }
        if self.default.is_some() {
            target.default = self.default.clone();
        }
        if self.cast.is_some() {
            target.cast = self.cast.clone();
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct CommandBuilder {
    spec: String,
    description: String,
    aliases: Vec<String>,
    arguments: Vec<ArgumentBuilder>,
    options: Vec<OptionBuilder>,
    middlewares: Vec<Middleware>,
    unknown_option_handlers: Vec<UnknownOptionHandler>,
    action: Option<Action>,
}

impl CommandBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Another piece sequence for this command. An empty alias makes it the
    /// default command of its scope.
    pub fn alias(mut self, spec: impl Into<String>) -> Self {
        self.aliases.push(spec.into());
        self
    }

    pub fn argument(mut self, argument: ArgumentBuilder) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn option(mut self, option: OptionBuilder) -> Self {
        self.options.push(option);
        self
    }

    pub fn use_middleware<F, Fut>(mut self, middleware: F) -> Self
    where
        F: Fn(Invocation, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.middlewares.push(middleware::into_middleware(middleware));
        self
    }

    pub fn allow_unknown_options(mut self) -> Self {
        self.unknown_option_handlers.push(middleware::accept_all());
        self
    }

    pub fn on_unknown_option<F>(mut self, handler: F) -> Self
    where
        F: Fn(&UnknownOption) -> Option<Value> + Send + Sync + 'static,
    {
        self.unknown_option_handlers.push(Arc::new(handler));
        self
    }

    pub fn action<F, Fut>(mut self, action: F) -> Self
    where
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.action = Some(middleware::into_action(action));
        self
    }
}

#[derive(Clone)]
pub struct GroupBuilder {
    spec: String,
    description: String,
    options: Vec<OptionBuilder>,
    commands: Vec<CommandBuilder>,
    middlewares: Vec<Middleware>,
    unknown_option_handlers: Vec<UnknownOptionHandler>,
}

impl GroupBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn option(mut self, option: OptionBuilder) -> Self {
        self.options.push(option);
        self
    }

    pub fn command(mut self, command: CommandBuilder) -> Self {
        self.commands.push(command);
        self
    }

    pub fn use_middleware<F, Fut>(mut self, middleware: F) -> Self
    where
        F: Fn(Invocation, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.middlewares.push(middleware::into_middleware(middleware));
        self
    }

    pub fn allow_unknown_options(mut self) -> Self {
        self.unknown_option_handlers.push(middleware::accept_all());
        self
    }

    pub fn on_unknown_option<F>(mut self, handler: F) -> Self
    where
        F: Fn(&UnknownOption) -> Option<Value> + Send + Sync + 'static,
    {
        self.unknown_option_handlers.push(Arc::new(handler));
        self
    }
}

/// Application declaration: app options, root commands and groups.
#[derive(Clone)]
pub struct App {
    name: String,
    version: Option<String>,
    description: String,
    options: Vec<OptionBuilder>,
    commands: Vec<CommandBuilder>,
    groups: Vec<GroupBuilder>,
    middlewares: Vec<Middleware>,
    unknown_option_handlers: Vec<UnknownOptionHandler>,
}

impl App {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            description: String::new(),
            options: Vec::new(),
            commands: Vec::new(),
            groups: Vec::new(),
            middlewares: Vec::new(),
            unknown_option_handlers: Vec::new(),
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn option(mut self, option: OptionBuilder) -> Self {
        self.options.push(option);
        self
    }

    pub fn command(mut self, command: CommandBuilder) -> Self {
        self.commands.push(command);
        self
    }

    pub fn group(mut self, group: GroupBuilder) -> Self {
        self.groups.push(group);
        self
    }

    pub fn use_middleware<F, Fut>(mut self, middleware: F) -> Self
    where
        F: Fn(Invocation, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.middlewares.push(middleware::into_middleware(middleware));
        self
    }

    pub fn allow_unknown_options(mut self) -> Self {
        self.unknown_option_handlers.push(middleware::accept_all());
        self
    }

    pub fn on_unknown_option<F>(mut self, handler: F) -> Self
    where
        F: Fn(&UnknownOption) -> Option<Value> + Send + Sync + 'static,
    {
        self.unknown_option_handlers.push(Arc::new(handler));
        self
    }

    /// Parse and validate every declaration.
    ///
    /// Building does not consume the builders; building twice yields equal
    /// programs.
    pub fn build(&self) -> Result<Program> {
        let mut arena = Arena::default();

        let app_options = arena.options(&self.options, Scope::App)?;

        let mut root_commands = Vec::with_capacity(self.commands.len());
        for builder in &self.commands {
            root_commands.push(arena.command(builder, None)?);
        }
        check_single_default(&arena.commands, &root_commands)?;

        let mut groups = Vec::with_capacity(self.groups.len());
        for builder in &self.groups {
            let id = GroupId(arena.groups.len());
            let pieces = spec::parse_group(&builder.spec)?;
            let options = arena.options(&builder.options, Scope::Group(id))?;
            // Reserve the slot so nested command ids can point at it.
            arena.groups.push(GroupDescriptor {
                id,
                spec: builder.spec.clone(),
                description: builder.description.clone(),
                pieces,
                options,
                commands: Vec::new(),
                middlewares: builder.middlewares.clone(),
                unknown_option_handlers: builder.unknown_option_handlers.clone(),
            });
            let mut commands = Vec::with_capacity(builder.commands.len());
            for command in &builder.commands {
                commands.push(arena.command(command, Some(id))?);
            }
            check_single_default(&arena.commands, &commands)?;
            arena.groups[id.0].commands = commands;
            groups.push(id);
        }

        tracing::debug!(
            name = %self.name,
            commands = arena.commands.len(),
            groups = arena.groups.len(),
            options = arena.options.len(),
            "built program"
        );

        Ok(Program {
            name: self.name.clone(),
            version: self.version.clone(),
            description: self.description.clone(),
            options: arena.options,
            commands: arena.commands,
            groups: arena.groups,
            app_options,
            root_commands,
            middlewares: self.middlewares.clone(),
            unknown_option_handlers: self.unknown_option_handlers.clone(),
        })
    }
}

#[derive(Default)]
struct Arena {
    options: Vec<OptionDescriptor>,
    commands: Vec<CommandDescriptor>,
    groups: Vec<GroupDescriptor>,
}

impl Arena {
    fn options(&mut self, builders: &[OptionBuilder], scope: Scope) -> Result<Vec<OptionId>> {
        let mut ids = Vec::with_capacity(builders.len());
        for builder in builders {
            let id = OptionId(self.options.len());
            self.options.push(builder.build(id, scope)?);
            ids.push(id);
        }
        Ok(ids)
    }

    fn command(&mut self, builder: &CommandBuilder, group: Option<GroupId>) -> Result<CommandId> {
        let id = CommandId(self.commands.len());
        let shape = spec::parse_command(&builder.spec)?;

        let mut aliases = Vec::with_capacity(builder.aliases.len() + 1);
        aliases.push(shape.pieces);
        for alias in &builder.aliases {
            aliases.push(spec::parse_alias(alias)?);
        }

        let mut arguments: Vec<ArgumentDescriptor> = shape
            .arguments
            .into_iter()
            .map(ArgumentDescriptor::from_shape)
            .collect();
        for argument in &builder.arguments {
            argument.apply(&mut arguments)?;
        }

        let options = self.options(&builder.options, Scope::Command(id))?;
        self.commands.push(CommandDescriptor {
            id,
            group,
            spec: builder.spec.clone(),
            description: builder.description.clone(),
            aliases,
            arguments,
            options,
            middlewares: builder.middlewares.clone(),
            unknown_option_handlers: builder.unknown_option_handlers.clone(),
            action: builder.action.clone(),
        });
        Ok(id)
    }
}

fn check_single_default(commands: &[CommandDescriptor], scope: &[CommandId]) -> Result<()> {
    let mut defaults = scope
        .iter()
        .map(|id| &commands[id.0])
        .filter(|command| command.is_default());
    if let (Some(first), Some(second)) = (defaults.next(), defaults.next()) {
        return Err(AmbiguityError::DuplicatedDefaultCommand {
            first: first.spec.clone(),
            second: second.spec.clone(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::descriptor::ArgumentKind;
    use crate::error::Error;

    #[test]
    fn build_is_idempotent() {
        let app = App::new("demo")
            .option(option("--verbose").cast(|v| v))
            .command(command("build <dir>").alias("b"))
            .group(group("store").command(command("ls [path]")));
        let first = app.build().unwrap();
        let second = app.build().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn negated_boolean_defaults_to_true() {
        let program = App::new("demo")
            .option(option("--no-color"))
            .build()
            .unwrap();
        let color = &program.options()[0];
        assert_eq!(color.long(), "color");
        assert!(color.is_negated());
        assert_eq!(color.initial(), Some(&json!(true)));
        assert_eq!(color.negated_name().as_deref(), Some("no-color"));
    }

    #[test]
    fn extra_arguments_attach_or_append() {
        let program = App::new("demo")
            .command(
                command("serve <root>")
                    .argument(argument("<root>").default_value("."))
                    .argument(argument("[...rest]")),
            )
            .build()
            .unwrap();
        let args = program.commands()[0].arguments();
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].default_value(), Some(&json!(".")));
        assert_eq!(args[1].kind(), ArgumentKind::Spread);
    }

    #[test]
    fn extra_argument_order_is_checked() {
        let err = App::new("demo")
            .command(command("cp [a]").argument(argument("<b>")))
            .build()
            .unwrap_err();
        let spec = err.as_spec().expect("spec error");
        assert_eq!(spec.kind, SpecErrorKind::RequiredAfterOptional);
        assert_eq!(spec.spec, "<b>");

        let err = App::new("demo")
            .command(command("cp <a>").argument(argument("[a]")))
            .build()
            .unwrap_err();
        assert_eq!(err.as_spec().unwrap().kind, SpecErrorKind::InvalidArgument);
    }

    #[test]
    fn spec_errors_surface_from_build() {
        let err = App::new("demo")
            .command(command("x [...a] [...b]"))
            .build()
            .unwrap_err();
        let spec = err.as_spec().unwrap();
        assert_eq!(spec.kind, SpecErrorKind::SpreadOnlyOnce);
        assert_eq!(spec.position, 9);

        let err = App::new("demo")
            .group(group("store <x>"))
            .build()
            .unwrap_err();
        assert_eq!(err.as_spec().unwrap().kind, SpecErrorKind::ArgumentInGroup);

        let err = App::new("demo")
            .group(group("").command(command("ls")))
            .build()
            .unwrap_err();
        assert_eq!(err.as_spec().unwrap().kind, SpecErrorKind::InvalidArgument);

        let err = App::new("demo")
            .command(command("ls").alias("l <x>"))
            .build()
            .unwrap_err();
        assert_eq!(err.as_spec().unwrap().kind, SpecErrorKind::InvalidAliasFormat);
    }

    #[test]
    fn duplicated_default_is_rejected_per_scope() {
        let err = App::new("demo")
            .command(command("<file>"))
            .command(command("serve").alias(""))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Ambiguity(AmbiguityError::DuplicatedDefaultCommand { .. })
        ));

        // One default at the root and one inside a group is fine.
        App::new("demo")
            .command(command("<file>"))
            .group(group("store").command(command("[path]")))
            .build()
            .unwrap();
    }

    #[test]
    fn group_commands_point_back_to_group() {
        let program = App::new("demo")
            .group(group("store").command(command("ls")).command(command("rm <key>")))
            .build()
            .unwrap();
        let store = &program.groups()[0];
        assert_eq!(store.commands().len(), 2);
        for id in store.commands() {
            assert_eq!(program.command(*id).group(), Some(store.id()));
        }
    }
}
