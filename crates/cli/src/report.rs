use argot::Context;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write as _;

/// What a token vector resolved to, without running anything.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionReport {
    pub command: Option<String>,
    pub group: Option<String>,
    pub pieces: Vec<String>,
    pub arguments: IndexMap<String, Value>,
    pub options: IndexMap<String, Value>,
    pub remaining: Vec<String>,
    pub unknown: Vec<String>,
    pub unknown_options: Vec<String>,
}

impl ResolutionReport {
    pub fn from_context(ctx: &Context<'_>) -> Self {
        let program = ctx.program();
        Self {
            command: ctx.command().map(|command| program.usage(command.id())),
            group: ctx.group().map(|group| group.pieces().join(" ")),
            pieces: ctx.pieces().to_vec(),
            arguments: ctx
                .arguments()
                .iter()
                .map(|argument| (argument.name().to_string(), argument.value()))
                .collect(),
            options: ctx.options(),
            remaining: ctx.remaining().to_vec(),
            unknown: ctx.unknown().to_vec(),
            unknown_options: ctx
                .unknown_options()
                .iter()
                .map(|unknown| unknown.flag.clone())
                .collect(),
        }
    }

    /// Plain-text rendering for terminals.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "command: {}",
            self.command.as_deref().unwrap_or("(none)")
        );
        if let Some(group) = &self.group {
            let _ = writeln!(out, "group: {group}");
        }
        if !self.pieces.is_empty() {
            let _ = writeln!(out, "pieces: {}", self.pieces.join(" "));
        }
        render_map(&mut out, "arguments", &self.arguments);
        render_map(&mut out, "options", &self.options);
        render_list(&mut out, "remaining", &self.remaining);
        render_list(&mut out, "unknown", &self.unknown);
        render_list(&mut out, "unknown options", &self.unknown_options);
        out
    }
}

fn render_map(out: &mut String, title: &str, values: &IndexMap<String, Value>) {
    if values.is_empty() {
        return;
    }
    let _ = writeln!(out, "{title}:");
    for (name, value) in values {
        let _ = writeln!(out, "  {name} = {value}");
    }
}

fn render_list(out: &mut String, title: &str, values: &[String]) {
    if !values.is_empty() {
        let _ = writeln!(out, "{title}: {}", values.join(" "));
    }
}
