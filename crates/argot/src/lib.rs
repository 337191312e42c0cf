//! Spec-string driven command resolution.
//!
//! Commands, groups and options are declared with small spec strings:
//!
//! - commands: `"store ls <path> [opt] [...rest]"`
//! - groups: `"store"`
//! - options: `"-f, --flag <value>"`, `"--open"`, `"--include [...v]"`
//!
//! [`App::build`] validates every declaration once and yields an immutable
//! [`Program`]. [`Program::resolve`] matches a token vector against it and
//! binds arguments and options; [`Program::run`] additionally invokes the
//! matched action through the app, group and command middlewares.
//!
//! ```
//! use argot::{App, command, option};
//! use serde_json::json;
//!
//! let program = App::new("site")
//!     .command(command("<file>"))
//!     .command(command("dev").option(option("--port <port>").default_value("3000")))
//!     .build()
//!     .unwrap();
//!
//! let ctx = program.resolve(["readme.md"]).unwrap();
//! assert_eq!(ctx.argument("file"), Some(json!("readme.md")));
//!
//! let ctx = program.resolve(["dev"]).unwrap();
//! assert_eq!(ctx.option("port"), Some(json!("3000")));
//! ```

pub mod binder;
pub mod builder;
pub mod descriptor;
mod describe;
pub mod error;
pub mod matcher;
pub mod middleware;
pub mod program;
pub mod spec;

pub use argot_metadata as metadata;
pub use binder::{MatchedArgument, MatchedOption};
pub use builder::{
    App, ArgumentBuilder, CommandBuilder, GroupBuilder, OptionBuilder, argument, command, group,
    option,
};
pub use descriptor::{
    ArgumentDescriptor, ArgumentKind, CommandDescriptor, CommandId, GroupDescriptor, GroupId,
    OptionDescriptor, OptionId, OptionKind, Scope,
};
pub use error::{
    AmbiguityError, Error, Result, RuntimeError, SpecError, SpecErrorKind, UnknownOptionError,
};
pub use matcher::Context;
pub use middleware::{Invocation, Next, UnknownOption};
pub use program::Program;
