use std::fmt;

use serde_json::Value;

use crate::descriptor::{
    CommandDescriptor, CommandId, GroupDescriptor, GroupId, OptionDescriptor, OptionId,
};
use crate::error::{Error, Result, RuntimeError};
use crate::matcher::{self, Context};
use crate::middleware::{Middleware, Pipeline, UnknownOptionHandler};
use crate::spec;

/// An immutable, validated set of declarations.
///
/// Produced by [`App::build`](crate::App::build). Resolution never mutates the
/// program, so one instance can serve any number of concurrent calls.
#[derive(Clone)]
pub struct Program {
    pub(crate) name: String,
    pub(crate) version: Option<String>,
    pub(crate) description: String,
    pub(crate) options: Vec<OptionDescriptor>,
    pub(crate) commands: Vec<CommandDescriptor>,
    pub(crate) groups: Vec<GroupDescriptor>,
    pub(crate) app_options: Vec<OptionId>,
    pub(crate) root_commands: Vec<CommandId>,
    pub(crate) middlewares: Vec<Middleware>,
    pub(crate) unknown_option_handlers: Vec<UnknownOptionHandler>,
}

impl Program {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Every option of every scope, indexed by [`OptionId`].
    pub fn options(&self) -> &[OptionDescriptor] {
        &self.options
    }

    pub fn commands(&self) -> &[CommandDescriptor] {
        &self.commands
    }

    pub fn groups(&self) -> &[GroupDescriptor] {
        &self.groups
    }

    pub fn app_options(&self) -> &[OptionId] {
        &self.app_options
    }

    pub fn root_commands(&self) -> &[CommandId] {
        &self.root_commands
    }

    pub fn option(&self, id: OptionId) -> &OptionDescriptor {
        &self.options[id.0]
    }

    pub fn command(&self, id: CommandId) -> &CommandDescriptor {
        &self.commands[id.0]
    }

    pub fn group(&self, id: GroupId) -> &GroupDescriptor {
        &self.groups[id.0]
    }

    /// Usage line of a command, group pieces included.
    pub fn usage(&self, id: CommandId) -> String {
        let command = self.command(id);
        let mut shape = command.shape();
        if let Some(group) = command.group {
            let mut pieces = self.group(group).pieces.clone();
            pieces.append(&mut shape.pieces);
            shape.pieces = pieces;
        }
        spec::format_command(&shape)
    }

    pub(crate) fn default_in(&self, ids: &[CommandId]) -> Option<CommandId> {
        ids.iter()
            .copied()
            .find(|id| self.command(*id).is_default())
    }

    /// The root default command when it is the only thing to match.
    pub(crate) fn sole_default(&self) -> Option<CommandId> {
        match (self.root_commands.as_slice(), self.groups.is_empty()) {
            ([only], true) if self.command(*only).is_default() => Some(*only),
            _ => None,
        }
    }

    /// Match `tokens` and bind arguments and options without running anything.
    ///
    /// A context without a command is not an error here; [`Program::run`]
    /// turns it into [`RuntimeError::NoMatchedCommand`].
    pub fn resolve<I, S>(&self, tokens: I) -> Result<Context<'_>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens = tokens.into_iter().map(Into::into).collect();
        matcher::resolve(self, tokens)
    }

    /// Resolve `tokens` and invoke the matched command's action through the
    /// app, group and command middlewares.
    pub async fn run<I, S>(&self, tokens: I) -> Result<Value>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ctx = self.resolve(tokens)?;
        let Some(command) = ctx.command() else {
            return Err(RuntimeError::NoMatchedCommand {
                unknown: ctx.unknown().to_vec(),
            }
            .into());
        };
        let Some(action) = command.action.clone() else {
            return Err(RuntimeError::NoActionBound {
                command: self.usage(command.id),
            }
            .into());
        };

        let mut middlewares = self.middlewares.clone();
        if let Some(group) = command.group {
            middlewares.extend(self.group(group).middlewares.iter().cloned());
        }
        middlewares.extend(command.middlewares.iter().cloned());

        tracing::debug!(
            command = %command.spec(),
            middlewares = middlewares.len(),
            "running action"
        );
        let invocation = ctx.into_invocation();
        Pipeline::new(middlewares, action)
            .execute(invocation)
            .await
            .map_err(Error::Action)
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("options", &self.options)
            .field("commands", &self.commands)
            .field("groups", &self.groups)
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.version == other.version
            && self.description == other.description
            && self.options == other.options
            && self.commands == other.commands
            && self.groups == other.groups
            && self.app_options == other.app_options
            && self.root_commands == other.root_commands
            && self.middlewares.len() == other.middlewares.len()
            && self.unknown_option_handlers.len() == other.unknown_option_handlers.len()
    }
}
