//! Token matching.
//!
//! A [`Context`] walks the token vector once, left to right. Bare tokens are
//! matched against a table of pending piece candidates; the first bare token
//! that matches nothing ends the walk and becomes positional input. Options are
//! looked up in tables rebuilt whenever a group or command is committed, so an
//! option token binds to the innermost scope active when it is read. An outer
//! option that took a token earlier still reports its value until an inner
//! option with the same name takes one.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::Value;

use crate::binder::{MatchedArgument, MatchedOption, TokenCursor, is_option_token};
use crate::descriptor::{
    ArgumentKind, CommandDescriptor, CommandId, GroupDescriptor, GroupId, OptionId,
};
use crate::error::{AmbiguityError, Result, RuntimeError, UnknownOptionError};
use crate::middleware::{Invocation, UnknownOption, UnknownOptionHandler};
use crate::program::Program;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Command(CommandId),
    Group(GroupId),
}

#[derive(Debug, Clone)]
struct Candidate<'p> {
    target: Target,
    pieces: &'p [String],
    next: usize,
}

#[derive(Debug, Clone, Copy)]
enum Seed {
    /// Match root commands and groups.
    Root,
    /// The command is active before any token is read.
    Command(CommandId),
    /// Only the group is matched; committing it activates the command.
    GroupDefault { group: GroupId, command: CommandId },
}

/// One resolution: the matched command, bound options and arguments, and
/// whatever tokens were left over.
#[derive(Debug)]
pub struct Context<'p> {
    program: &'p Program,
    cursor: TokenCursor,
    pieces: Vec<String>,
    group: Option<GroupId>,
    command: Option<CommandId>,
    pending: Vec<Candidate<'p>>,
    group_default: Option<CommandId>,

    slots: Vec<MatchedOption<'p>>,
    slot_by_option: HashMap<OptionId, usize>,
    bound: IndexMap<String, usize>,
    longs: HashMap<String, usize>,
    shorts: HashMap<char, usize>,
    negated: HashMap<String, usize>,
    claimed: IndexMap<String, Value>,
    unknown_options: Vec<UnknownOption>,

    arguments: Vec<MatchedArgument<'p>>,
    queue: Vec<String>,
    unknown: Vec<String>,
    remaining: Vec<String>,
}

pub(crate) fn resolve(program: &Program, tokens: Vec<String>) -> Result<Context<'_>> {
    tracing::debug!(tokens = tokens.len(), "resolving tokens");

    if let Some(id) = program.sole_default() {
        tracing::debug!(command = %program.command(id).spec(), "single default command");
        let mut ctx = Context::new(program, tokens, Seed::Command(id));
        ctx.walk()?;
        return ctx.finish();
    }

    let mut ctx = Context::new(program, tokens.clone(), Seed::Root);
    ctx.walk()?;
    if ctx.command.is_none() {
        if let Some(seed) = ctx.fallback() {
            tracing::debug!(?seed, "no command matched, retrying with default command");
            ctx = Context::new(program, tokens, seed);
            ctx.walk()?;
        }
    }
    ctx.finish()
}

impl<'p> Context<'p> {
    fn new(program: &'p Program, tokens: Vec<String>, seed: Seed) -> Self {
        let mut ctx = Self {
            program,
            cursor: TokenCursor::new(tokens),
            pieces: Vec::new(),
            group: None,
            command: None,
            pending: Vec::new(),
            group_default: None,
            slots: Vec::new(),
            slot_by_option: HashMap::new(),
            bound: IndexMap::new(),
            longs: HashMap::new(),
            shorts: HashMap::new(),
            negated: HashMap::new(),
            claimed: IndexMap::new(),
            unknown_options: Vec::new(),
            arguments: Vec::new(),
            queue: Vec::new(),
            unknown: Vec::new(),
            remaining: Vec::new(),
        };

        match seed {
            Seed::Root => {
                for id in &program.root_commands {
                    ctx.expand(*id);
                }
                for group in &program.groups {
                    ctx.pending.push(Candidate {
                        target: Target::Group(group.id),
                        pieces: &group.pieces,
                        next: 0,
                    });
                }
            }
            Seed::Command(id) => {
                ctx.command = Some(id);
                ctx.group = program.command(id).group;
            }
            Seed::GroupDefault { group, command } => {
                ctx.pending.push(Candidate {
                    target: Target::Group(group),
                    pieces: &program.group(group).pieces,
                    next: 0,
                });
                ctx.group_default = Some(command);
            }
        }
        ctx.relink();
        ctx
    }

    /// Queue every non-empty alias of a command as a candidate.
    fn expand(&mut self, id: CommandId) {
        let program = self.program;
        for alias in program.command(id).aliases.iter() {
            if !alias.is_empty() {
                self.pending.push(Candidate {
                    target: Target::Command(id),
                    pieces: alias,
                    next: 0,
                });
            }
        }
    }

    fn walk(&mut self) -> Result<()> {
        while let Some(token) = self.cursor.advance() {
            tracing::trace!(%token, "token");
            if token == "--" {
                let rest = self.cursor.drain();
                self.remaining.extend(rest);
                break;
            }
            if is_option_token(&token) {
                self.bind_option(&token)?;
            } else {
                self.bare(token)?;
            }
        }
        Ok(())
    }

    fn bind_option(&mut self, token: &str) -> Result<()> {
        let (flag, text) = match token.split_once('=') {
            Some((flag, text)) => (flag, Some(text)),
            None => (token, None),
        };

        let (slot, key) = if let Some(key) = flag.strip_prefix("--") {
            let slot = self
                .longs
                .get(key)
                .or_else(|| self.negated.get(key))
                .copied();
            (slot, key.to_string())
        } else {
            let key = &flag[1..];
            let mut chars = key.chars();
            let slot = match (chars.next(), chars.next()) {
                (Some(short), None) => self.shorts.get(&short).copied(),
                _ => None,
            };
            // Shorts bind under the long name so negation never applies.
            let key = match slot {
                Some(slot) => self.slots[slot].option().long.clone(),
                None => key.to_string(),
            };
            (slot, key)
        };

        match slot {
            Some(slot) => {
                self.slots[slot].accept(&mut self.cursor, &key, text)?;
                let long = self.slots[slot].option().long.clone();
                self.bound.insert(long, slot);
            }
            None => {
                tracing::trace!(%flag, "unknown option");
                self.unknown_options.push(UnknownOption {
                    flag: flag.to_string(),
                    key,
                    value: text.map(str::to_string),
                });
            }
        }
        Ok(())
    }

    fn bare(&mut self, token: String) -> Result<()> {
        let hit = self
            .pending
            .iter()
            .any(|candidate| candidate.pieces[candidate.next] == token);
        if !hit {
            if !self.pending.is_empty() {
                tracing::trace!(%token, "sub-command walk ended");
                self.pending.clear();
            }
            if self.command.is_some() {
                self.queue.push(token);
            } else {
                self.unknown.push(token);
            }
            return Ok(());
        }

        let mut completed: Vec<Target> = Vec::new();
        for mut candidate in std::mem::take(&mut self.pending) {
            if candidate.pieces[candidate.next] != token {
                continue;
            }
            candidate.next += 1;
            if candidate.next == candidate.pieces.len() {
                if !completed.contains(&candidate.target) {
                    completed.push(candidate.target);
                }
            } else {
                self.pending.push(candidate);
            }
        }
        self.pieces.push(token);

        match completed.as_slice() {
            [] => Ok(()),
            [target] => {
                self.commit(*target);
                Ok(())
            }
            [first, second, ..] => Err(self.ambiguity(*first, *second).into()),
        }
    }

    fn commit(&mut self, target: Target) {
        let program = self.program;
        match target {
            Target::Group(id) => {
                tracing::debug!(group = %program.group(id).spec(), "matched group");
                self.group = Some(id);
                self.command = None;
                match self.group_default {
                    Some(command) => {
                        tracing::debug!(command = %program.command(command).spec(), "activated group default");
                        self.command = Some(command);
                    }
                    None => {
                        for command in &program.group(id).commands {
                            self.expand(*command);
                        }
                    }
                }
            }
            Target::Command(id) => {
                let command = program.command(id);
                tracing::debug!(command = %command.spec(), "matched command");
                self.command = Some(id);
                self.group = command.group;
            }
        }
        self.relink();
    }

    fn ambiguity(&self, first: Target, second: Target) -> AmbiguityError {
        let pieces = self.pieces.join(" ");
        match (first, second) {
            (Target::Group(_), Target::Group(_)) => AmbiguityError::DuplicatedGroup { pieces },
            _ => AmbiguityError::DuplicatedCommand {
                pieces,
                first: self.label(first),
                second: self.label(second),
            },
        }
    }

    fn label(&self, target: Target) -> String {
        match target {
            Target::Command(id) => self.program.usage(id),
            Target::Group(id) => self.program.group(id).spec.clone(),
        }
    }

    fn slot_for(&mut self, id: OptionId) -> usize {
        if let Some(&slot) = self.slot_by_option.get(&id) {
            return slot;
        }
        let program = self.program;
        let slot = self.slots.len();
        self.slots.push(MatchedOption::new(program.option(id)));
        self.slot_by_option.insert(id, slot);
        slot
    }

    /// Rebuild the lookup tables from the active scopes.
    ///
    /// Lookups always reach the innermost active option for a name. Slots
    /// persist across relinks, and `bound` keeps reporting a slot that received
    /// a token until a slot active at read time takes the name over.
    fn relink(&mut self) {
        let program = self.program;
        let mut scopes: Vec<&'p [OptionId]> = vec![&program.app_options];
        if let Some(group) = self.group {
            scopes.push(&program.group(group).options);
        }
        if let Some(command) = self.command {
            scopes.push(&program.command(command).options);
        }

        let mut bound: IndexMap<String, usize> = std::mem::take(&mut self.bound)
            .into_iter()
            .filter(|&(_, slot)| self.slots[slot].is_dirty())
            .collect();
        self.longs.clear();
        self.shorts.clear();
        self.negated.clear();
        for ids in scopes {
            for id in ids {
                let slot = self.slot_for(*id);
                let option = program.option(*id);
                let keep = !self.slots[slot].is_dirty()
                    && bound
                        .get(&option.long)
                        .is_some_and(|&earlier| self.slots[earlier].is_dirty());
                if !keep {
                    bound.insert(option.long.clone(), slot);
                }
                self.longs.insert(option.long.clone(), slot);
                if let Some(short) = option.short {
                    self.shorts.insert(short, slot);
                }
                if let Some(name) = option.negated_name() {
                    self.negated.insert(name, slot);
                }
            }
        }
        tracing::trace!(options = bound.len(), "relinked options");
        self.bound = bound;
    }

    fn fallback(&self) -> Option<Seed> {
        let program = self.program;
        if let Some(group) = self.group {
            if let Some(command) = program.default_in(&program.group(group).commands) {
                return Some(Seed::GroupDefault { group, command });
            }
        }
        program.default_in(&program.root_commands).map(Seed::Command)
    }

    fn active_handlers(&self) -> Vec<&'p UnknownOptionHandler> {
        let program = self.program;
        let mut handlers: Vec<&'p UnknownOptionHandler> =
            program.unknown_option_handlers.iter().collect();
        if let Some(group) = self.group {
            handlers.extend(program.group(group).unknown_option_handlers.iter());
        }
        if let Some(command) = self.command {
            handlers.extend(program.command(command).unknown_option_handlers.iter());
        }
        handlers
    }

    fn finish(mut self) -> Result<Self> {
        let program = self.program;

        if let Some(id) = self.command {
            let command = program.command(id);
            let mut queue = std::mem::take(&mut self.queue).into_iter();
            for argument in &command.arguments {
                let mut matched = MatchedArgument::new(argument);
                match argument.kind {
                    ArgumentKind::Required => match queue.next() {
                        Some(token) => matched.accept(token),
                        None => {
                            return Err(RuntimeError::RequiredArgumentMissing {
                                name: argument.name.clone(),
                            }
                            .into());
                        }
                    },
                    ArgumentKind::Optional => {
                        if let Some(token) = queue.next() {
                            matched.accept(token);
                        }
                    }
                    ArgumentKind::Spread => {
                        for token in queue.by_ref() {
                            matched.accept(token);
                        }
                    }
                }
                self.arguments.push(matched);
            }
            let mut leftover: Vec<String> = queue.collect();
            if !leftover.is_empty() {
                leftover.append(&mut self.remaining);
                self.remaining = leftover;
            }
        }

        let handlers = self.active_handlers();
        for unknown in std::mem::take(&mut self.unknown_options) {
            match handlers.iter().find_map(|handler| handler(&unknown)) {
                Some(value) => {
                    self.claimed.insert(unknown.key.clone(), value);
                }
                None => self.unknown_options.push(unknown),
            }
        }

        if self.command.is_some() {
            if let Some(unknown) = self.unknown_options.first() {
                return Err(UnknownOptionError {
                    flag: unknown.flag.clone(),
                }
                .into());
            }
        }

        tracing::debug!(
            command = ?self.command().map(|command| command.spec()),
            pieces = ?self.pieces,
            "resolved"
        );
        Ok(self)
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn command(&self) -> Option<&'p CommandDescriptor> {
        let program = self.program;
        self.command.map(|id| program.command(id))
    }

    pub fn group(&self) -> Option<&'p GroupDescriptor> {
        let program = self.program;
        self.group.map(|id| program.group(id))
    }

    /// Sub-command pieces consumed by the walk.
    pub fn pieces(&self) -> &[String] {
        &self.pieces
    }

    pub fn arguments(&self) -> &[MatchedArgument<'p>] {
        &self.arguments
    }

    pub fn argument(&self, name: &str) -> Option<Value> {
        self.arguments
            .iter()
            .find(|argument| argument.name() == name)
            .map(MatchedArgument::value)
    }

    /// Values of every bound option, keyed by long name, followed by options
    /// claimed by unknown-option handlers.
    pub fn options(&self) -> IndexMap<String, Value> {
        let mut out: IndexMap<String, Value> = self
            .bound
            .iter()
            .map(|(long, &slot)| (long.clone(), self.slots[slot].value()))
            .collect();
        for (key, value) in &self.claimed {
            out.entry(key.clone()).or_insert_with(|| value.clone());
        }
        out
    }

    pub fn option(&self, long: &str) -> Option<Value> {
        if let Some(&slot) = self.bound.get(long) {
            return Some(self.slots[slot].value());
        }
        self.claimed.get(long).cloned()
    }

    pub fn matched_option(&self, long: &str) -> Option<&MatchedOption<'p>> {
        self.bound.get(long).map(|&slot| &self.slots[slot])
    }

    /// Tokens after `--`, preceded by positional tokens no argument took.
    pub fn remaining(&self) -> &[String] {
        &self.remaining
    }

    /// Bare tokens seen while no command was matched.
    pub fn unknown(&self) -> &[String] {
        &self.unknown
    }

    pub fn unknown_options(&self) -> &[UnknownOption] {
        &self.unknown_options
    }

    pub fn into_invocation(self) -> Invocation {
        Invocation {
            command: self.command.map(|id| self.program.usage(id)).unwrap_or_default(),
            pieces: self.pieces.clone(),
            arguments: self.arguments.iter().map(MatchedArgument::value).collect(),
            options: self.options(),
            remaining: self.remaining.clone(),
            data: serde_json::Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::builder::{App, command, group, option};
    use crate::error::{Error, SpecErrorKind};

    fn tokens(args: &[&str]) -> Vec<String> {
        args.iter().map(|arg| arg.to_string()).collect()
    }

    fn to_int(value: Value) -> Value {
        value
            .as_str()
            .and_then(|text| text.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or(value)
    }

    #[test]
    fn default_command_fallback() {
        let program = App::new("site")
            .command(command("<file>"))
            .command(command("dev"))
            .build()
            .unwrap();

        let ctx = program.resolve(tokens(&["dev"])).unwrap();
        assert_eq!(ctx.command().unwrap().spec(), "dev");

        let ctx = program.resolve(tokens(&["readme.md"])).unwrap();
        assert_eq!(ctx.command().unwrap().spec(), "<file>");
        assert_eq!(ctx.argument("file"), Some(json!("readme.md")));
        assert!(ctx.unknown().is_empty());
    }

    #[test]
    fn sole_default_takes_every_token() {
        let program = App::new("echo")
            .command(command("[...words]").option(option("-n, --newline")))
            .build()
            .unwrap();
        let ctx = program.resolve(tokens(&["a", "-n", "b"])).unwrap();
        assert_eq!(ctx.argument("words"), Some(json!(["a", "b"])));
        assert_eq!(ctx.option("newline"), Some(json!(true)));
        assert!(ctx.pieces().is_empty());
    }

    #[test]
    fn resolution_is_idempotent() {
        let program = App::new("demo")
            .command(command("build <dir>").option(option("--release")))
            .build()
            .unwrap();
        let args = tokens(&["build", "src", "--release"]);
        let first = program.resolve(args.clone()).unwrap();
        let second = program.resolve(args).unwrap();
        assert_eq!(first.into_invocation(), second.into_invocation());
    }

    #[test]
    fn negation_forms() {
        let program = App::new("serve")
            .command(command("[root]").option(option("--open")))
            .build()
            .unwrap();
        let open = |args: &[&str]| program.resolve(tokens(args)).unwrap().option("open");
        assert_eq!(open(&["--open"]), Some(json!(true)));
        assert_eq!(open(&["--no-open"]), Some(json!(false)));
        assert_eq!(open(&["--no-open=false"]), Some(json!(true)));
        assert_eq!(open(&[]), Some(json!(false)));
    }

    #[test]
    fn declared_negation_defaults_true() {
        let program = App::new("serve")
            .command(command("[root]").option(option("--no-color")))
            .build()
            .unwrap();
        let color = |args: &[&str]| program.resolve(tokens(args)).unwrap().option("color");
        assert_eq!(color(&[]), Some(json!(true)));
        assert_eq!(color(&["--no-color"]), Some(json!(false)));
        assert_eq!(color(&["--color"]), Some(json!(true)));
    }

    #[test]
    fn spread_option_accumulates() {
        let program = App::new("build")
            .command(command("[dir]").option(option("--include [...v]")))
            .build()
            .unwrap();
        let ctx = program
            .resolve(tokens(&["--include=a", "--include=b"]))
            .unwrap();
        assert_eq!(ctx.option("include"), Some(json!(["a", "b"])));
    }

    #[test]
    fn default_is_not_cast() {
        let program = App::new("serve")
            .command(
                command("[root]").option(
                    option("--port <port>")
                        .default_value("3000")
                        .cast(to_int),
                ),
            )
            .build()
            .unwrap();
        let port = |args: &[&str]| program.resolve(tokens(args)).unwrap().option("port");
        assert_eq!(port(&[]), Some(json!("3000")));
        assert_eq!(port(&["--port", "4000"]), Some(json!(4000)));
        assert_eq!(port(&["--port=4000"]), Some(json!(4000)));
    }

    #[test]
    fn inner_scope_overrides_clean_outer_option() {
        let program = App::new("demo")
            .option(option("--host <host>").default_value("app"))
            .command(command("serve").option(option("--host <host>").default_value("serve")))
            .command(command("other"))
            .build()
            .unwrap();

        let host = |args: &[&str]| program.resolve(tokens(args)).unwrap().option("host");
        assert_eq!(host(&["serve"]), Some(json!("serve")));
        assert_eq!(host(&["other"]), Some(json!("app")));
        assert_eq!(host(&["serve", "--host", "x"]), Some(json!("x")));
        // Bound before the command was matched: the outer option reports it.
        assert_eq!(host(&["--host", "y", "serve"]), Some(json!("y")));
    }

    #[test]
    fn required_option_before_escape_uses_initial() {
        let program = App::new("demo")
            .command(
                command("[file]").option(
                    option("--out <f>")
                        .initial("i")
                        .default_value("d"),
                ),
            )
            .build()
            .unwrap();

        let ctx = program.resolve(tokens(&["--out", "--", "a"])).unwrap();
        assert_eq!(ctx.option("out"), Some(json!("i")));
        assert_eq!(ctx.remaining(), ["a"]);

        let ctx = program.resolve(tokens(&["x"])).unwrap();
        assert_eq!(ctx.option("out"), Some(json!("d")));
    }

    #[test]
    fn option_binds_to_scope_active_when_read() {
        let program = App::new("demo")
            .option(option("-H, --host <host>"))
            .command(command("serve").option(option("-H, --host <host>").cast(to_int)))
            .build()
            .unwrap();

        let ctx = program
            .resolve(tokens(&["--host", "y", "serve", "--host", "8"]))
            .unwrap();
        assert_eq!(ctx.option("host"), Some(json!(8)));
        assert_eq!(ctx.options()["host"], json!(8));

        let ctx = program
            .resolve(tokens(&["-H", "y", "serve", "-H", "9"]))
            .unwrap();
        assert_eq!(ctx.option("host"), Some(json!(9)));

        let ctx = program.resolve(tokens(&["--host", "y", "serve"])).unwrap();
        assert_eq!(ctx.option("host"), Some(json!("y")));

        let err = program
            .resolve(tokens(&["serve", "--host", "1", "--host", "2"]))
            .unwrap_err();
        assert!(matches!(
            err.as_runtime(),
            Some(RuntimeError::RequiredOptionAcceptOnce { .. })
        ));
    }

    #[test]
    fn short_flags_follow_active_scope() {
        let program = App::new("demo")
            .option(option("-v, --verbose"))
            .command(command("show").option(option("-v, --version")))
            .build()
            .unwrap();
        let ctx = program.resolve(tokens(&["show", "-v"])).unwrap();
        assert_eq!(ctx.option("version"), Some(json!(true)));
        assert_eq!(ctx.option("verbose"), Some(json!(false)));

        let ctx = program.resolve(tokens(&["-v", "show"])).unwrap();
        assert_eq!(ctx.option("verbose"), Some(json!(true)));
        assert_eq!(ctx.option("version"), Some(json!(false)));
    }

    #[test]
    fn drains_arguments_and_keeps_leftovers() {
        let program = App::new("demo")
            .command(command("echo <a> [b]"))
            .command(command("noop"))
            .build()
            .unwrap();
        let ctx = program
            .resolve(tokens(&["echo", "x", "y", "z", "--", "w"]))
            .unwrap();
        let values: Vec<Value> = ctx.arguments().iter().map(|arg| arg.value()).collect();
        assert_eq!(values, vec![json!("x"), json!("y")]);
        assert_eq!(ctx.remaining(), ["z", "w"]);

        let err = program.resolve(tokens(&["echo"])).unwrap_err();
        assert_eq!(
            err.as_runtime(),
            Some(&RuntimeError::RequiredArgumentMissing {
                name: "a".to_string()
            })
        );
    }

    #[test]
    fn deeper_command_supersedes() {
        let program = App::new("demo")
            .command(command("store [key]"))
            .command(command("store ls [path]"))
            .build()
            .unwrap();

        let ctx = program.resolve(tokens(&["store", "ls", "a"])).unwrap();
        assert_eq!(ctx.command().unwrap().spec(), "store ls [path]");
        assert_eq!(ctx.argument("path"), Some(json!("a")));

        let ctx = program.resolve(tokens(&["store", "k"])).unwrap();
        assert_eq!(ctx.command().unwrap().spec(), "store [key]");
        assert_eq!(ctx.argument("key"), Some(json!("k")));
    }

    #[test]
    fn groups_expand_their_commands() {
        let program = App::new("demo")
            .group(
                group("store")
                    .option(option("--bucket <name>"))
                    .command(command("ls"))
                    .command(command("rm <key>").alias("del")),
            )
            .build()
            .unwrap();

        let ctx = program
            .resolve(tokens(&["store", "del", "k", "--bucket", "b"]))
            .unwrap();
        assert_eq!(ctx.group().unwrap().spec(), "store");
        assert_eq!(ctx.command().unwrap().spec(), "rm <key>");
        assert_eq!(ctx.pieces(), ["store", "del"]);
        assert_eq!(ctx.option("bucket"), Some(json!("b")));
    }

    #[test]
    fn group_default_fallback() {
        let program = App::new("demo")
            .group(
                group("store")
                    .command(command("ls"))
                    .command(command("[key]")),
            )
            .command(command("other"))
            .build()
            .unwrap();

        let ctx = program.resolve(tokens(&["store", "abc"])).unwrap();
        assert_eq!(ctx.command().unwrap().spec(), "[key]");
        assert_eq!(ctx.argument("key"), Some(json!("abc")));

        let ctx = program.resolve(tokens(&["store"])).unwrap();
        assert_eq!(ctx.command().unwrap().spec(), "[key]");
        assert_eq!(ctx.argument("key"), Some(Value::Null));
    }

    #[test]
    fn duplicated_command_is_detected_while_matching() {
        let program = App::new("demo")
            .command(command("ls"))
            .command(command("list").alias("ls"))
            .build()
            .unwrap();
        let err = program.resolve(tokens(&["ls"])).unwrap_err();
        assert!(matches!(
            err,
            Error::Ambiguity(AmbiguityError::DuplicatedCommand { .. })
        ));
        // Other paths still resolve.
        assert!(program.resolve(tokens(&["list"])).is_ok());

        let program = App::new("demo")
            .group(group("store").command(command("ls")))
            .group(group("store").command(command("rm")))
            .build()
            .unwrap();
        let err = program.resolve(tokens(&["store", "ls"])).unwrap_err();
        assert!(matches!(
            err,
            Error::Ambiguity(AmbiguityError::DuplicatedGroup { .. })
        ));
    }

    #[test]
    fn unknown_options_error_only_with_command() {
        let program = App::new("demo")
            .command(command("build"))
            .build()
            .unwrap();

        let err = program.resolve(tokens(&["build", "--fast"])).unwrap_err();
        assert!(matches!(err, Error::UnknownOption(ref e) if e.flag == "--fast"));

        let ctx = program.resolve(tokens(&["nothing", "--fast"])).unwrap();
        assert!(ctx.command().is_none());
        assert_eq!(ctx.unknown(), ["nothing"]);
        assert_eq!(ctx.unknown_options()[0].key, "fast");
    }

    #[test]
    fn unknown_option_handlers_claim_in_scope_order() {
        let program = App::new("demo")
            .on_unknown_option(|unknown| (unknown.key == "app").then(|| json!("from-app")))
            .command(
                command("build")
                    .on_unknown_option(|_| Some(json!("from-command")))
                    .allow_unknown_options(),
            )
            .build()
            .unwrap();
        let ctx = program
            .resolve(tokens(&["build", "--app", "--cmd=1"]))
            .unwrap();
        assert_eq!(ctx.option("app"), Some(json!("from-app")));
        assert_eq!(ctx.option("cmd"), Some(json!("from-command")));
    }

    #[test]
    fn allow_unknown_options_keeps_raw_values() {
        let program = App::new("demo")
            .command(command("run").allow_unknown_options())
            .build()
            .unwrap();
        let ctx = program
            .resolve(tokens(&["run", "--mode=fast", "-x"]))
            .unwrap();
        assert_eq!(ctx.option("mode"), Some(json!("fast")));
        assert_eq!(ctx.option("x"), Some(json!(true)));
    }

    #[test]
    fn negative_numbers_are_positional() {
        let program = App::new("calc")
            .command(command("add <a> <b>"))
            .command(command("noop"))
            .build()
            .unwrap();
        let ctx = program.resolve(tokens(&["add", "-1", "-2.5"])).unwrap();
        assert_eq!(ctx.argument("a"), Some(json!("-1")));
        assert_eq!(ctx.argument("b"), Some(json!("-2.5")));
    }

    #[test]
    fn double_boolean_is_rejected() {
        let program = App::new("demo")
            .command(command("x").option(option("--force")))
            .build()
            .unwrap();
        let err = program
            .resolve(tokens(&["x", "--force", "--force"]))
            .unwrap_err();
        assert!(matches!(
            err.as_runtime(),
            Some(RuntimeError::BooleanOptionAcceptOnce { .. })
        ));
    }

    #[test]
    fn no_command_returns_context() {
        let program = App::new("demo")
            .command(command("build"))
            .command(command("test"))
            .build()
            .unwrap();
        let ctx = program.resolve(tokens(&[])).unwrap();
        assert!(ctx.command().is_none());
        assert!(ctx.arguments().is_empty());
    }

    #[test]
    fn build_errors_stop_before_matching() {
        let err = App::new("demo")
            .command(command("cp [a] <b>"))
            .build()
            .unwrap_err();
        assert_eq!(err.as_spec().unwrap().kind, SpecErrorKind::RequiredAfterOptional);
        assert_eq!(err.as_spec().unwrap().position, 7);
    }
}
