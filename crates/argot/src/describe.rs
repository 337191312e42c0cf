//! Conversion of a [`Program`] into the `argot-metadata` snapshot.

use argot_metadata::{ArgumentInfo, CommandInfo, GroupInfo, OptionInfo, ProgramInfo};

use crate::descriptor::{ArgumentDescriptor, CommandDescriptor, OptionDescriptor, OptionId};
use crate::program::Program;

impl Program {
    /// Snapshot of every declaration, for help renderers and other tooling.
    pub fn describe(&self) -> ProgramInfo {
        let mut info = ProgramInfo::new(self.name.clone());
        info.version = self.version.clone();
        info.description = self.description.clone();
        info.options = self.option_infos(&self.app_options);
        info.groups = self
            .groups
            .iter()
            .map(|group| GroupInfo {
                pieces: group.pieces.clone(),
                description: group.description.clone(),
                options: self.option_infos(&group.options),
                commands: group.commands.iter().map(|id| self.usage(*id)).collect(),
            })
            .collect();
        info.commands = self
            .commands
            .iter()
            .map(|command| self.command_info(command))
            .collect();
        info
    }

    fn option_infos(&self, ids: &[OptionId]) -> Vec<OptionInfo> {
        ids.iter().map(|id| option_info(self.option(*id))).collect()
    }

    fn command_info(&self, command: &CommandDescriptor) -> CommandInfo {
        CommandInfo {
            usage: self.usage(command.id),
            pieces: command.pieces().to_vec(),
            aliases: command
                .aliases
                .iter()
                .skip(1)
                .map(|alias| alias.join(" "))
                .collect(),
            group: command
                .group
                .map(|id| self.group(id).pieces.join(" ")),
            is_default: command.is_default(),
            has_action: command.has_action(),
            description: command.description.clone(),
            arguments: command.arguments.iter().map(argument_info).collect(),
            options: self.option_infos(&command.options),
        }
    }
}

fn option_info(option: &OptionDescriptor) -> OptionInfo {
    OptionInfo {
        long: option.long.clone(),
        short: option.short.map(String::from),
        kind: option.kind.as_str().to_string(),
        flags: option.flags(),
        negated_name: option.negated_name(),
        description: option.description.clone(),
        initial: option.initial.clone(),
        default_value: option.default.clone(),
        has_cast: option.cast.is_some(),
    }
}

fn argument_info(argument: &ArgumentDescriptor) -> ArgumentInfo {
    ArgumentInfo {
        name: argument.name.clone(),
        kind: argument.kind.as_str().to_string(),
        initial: argument.initial.clone(),
        default_value: argument.default.clone(),
    }
}
