use anyhow::{Context, Result, bail};
use argot::{App, ArgumentBuilder, CommandBuilder, GroupBuilder, OptionBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MANIFEST_NAME: &str = "argot.json";
pub const SCHEMA_VERSION: u32 = 1;

/// Declarations of one application, as read from `argot.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupEntry>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_unknown_options: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionEntry {
    /// Option spec, e.g. `-p, --port <port>`.
    pub spec: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast: Option<CastName>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentEntry {
    /// Argument spec, e.g. `[...files]`.
    pub spec: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast: Option<CastName>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandEntry {
    /// Command spec, e.g. `build <dir> [...rest]`.
    pub spec: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<ArgumentEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionEntry>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_unknown_options: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupEntry {
    pub spec: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandEntry>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_unknown_options: bool,
}

/// Named value conversions available to manifest declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastName {
    String,
    Integer,
    Number,
    Boolean,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl CastName {
    pub fn apply(self, value: Value) -> Value {
        match (self, value) {
            (_, Value::Array(items)) => {
                Value::Array(items.into_iter().map(|item| self.apply(item)).collect())
            }
            (Self::String, Value::String(text)) => Value::String(text),
            (Self::String, Value::Null) => Value::Null,
            (Self::String, other) => Value::String(other.to_string()),
            (Self::Integer, Value::String(text)) => match text.trim().parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => Value::String(text),
            },
            (Self::Number, Value::String(text)) => text
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::String(text)),
            (Self::Boolean, Value::String(text)) => {
                let lower = text.to_ascii_lowercase();
                Value::Bool(!matches!(
                    lower.as_str(),
                    "" | "false" | "no" | "off" | "f" | "n" | "0"
                ))
            }
            (_, other) => other,
        }
    }
}

impl OptionEntry {
    fn to_builder(&self) -> OptionBuilder {
        let mut builder = argot::option(&self.spec).description(&self.description);
        if let Some(initial) = &self.initial {
            builder = builder.initial(initial.clone());
        }
        if let Some(default) = &self.default {
            builder = builder.default_value(default.clone());
        }
        if let Some(cast) = self.cast {
            builder = builder.cast(move |value| cast.apply(value));
        }
        builder
    }
}

impl ArgumentEntry {
    fn to_builder(&self) -> ArgumentBuilder {
        let mut builder = argot::argument(&self.spec);
        if let Some(initial) = &self.initial {
            builder = builder.initial(initial.clone());
        }
        if let Some(default) = &self.default {
            builder = builder.default_value(default.clone());
        }
        if let Some(cast) = self.cast {
            builder = builder.cast(move |value| cast.apply(value));
        }
        builder
    }
}

impl CommandEntry {
    fn to_builder(&self) -> CommandBuilder {
        let mut builder = argot::command(&self.spec).description(&self.description);
        for alias in &self.aliases {
            builder = builder.alias(alias);
        }
        for argument in &self.arguments {
            builder = builder.argument(argument.to_builder());
        }
        for option in &self.options {
            builder = builder.option(option.to_builder());
        }
        if self.allow_unknown_options {
            builder = builder.allow_unknown_options();
        }
        builder
    }
}

impl GroupEntry {
    fn to_builder<F>(&self, decorate: &F) -> GroupBuilder
    where
        F: Fn(CommandBuilder) -> CommandBuilder,
    {
        let mut builder = argot::group(&self.spec).description(&self.description);
        for option in &self.options {
            builder = builder.option(option.to_builder());
        }
        for command in &self.commands {
            builder = builder.command(decorate(command.to_builder()));
        }
        if self.allow_unknown_options {
            builder = builder.allow_unknown_options();
        }
        builder
    }
}

impl Manifest {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;
        let manifest: Manifest = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse manifest JSON: {}", path.display()))?;
        manifest.check_schema()?;
        Ok(manifest)
    }

    fn check_schema(&self) -> Result<()> {
        match self.schema_version {
            None | Some(SCHEMA_VERSION) => Ok(()),
            Some(other) => bail!(
                "unsupported manifest schemaVersion {other} (expected {SCHEMA_VERSION})"
            ),
        }
    }

    /// Declarations as builders. Nothing is validated until `App::build`.
    ///
    /// `decorate` is applied to every command builder, grouped or not.
    pub fn to_app<F>(&self, decorate: F) -> App
    where
        F: Fn(CommandBuilder) -> CommandBuilder,
    {
        let mut app = App::new(&self.name).description(&self.description);
        if let Some(version) = &self.version {
            app = app.version(version);
        }
        for option in &self.options {
            app = app.option(option.to_builder());
        }
        for command in &self.commands {
            app = app.command(decorate(command.to_builder()));
        }
        for group in &self.groups {
            app = app.group(group.to_builder(&decorate));
        }
        if self.allow_unknown_options {
            app = app.allow_unknown_options();
        }
        app
    }
}

pub fn write_default_manifest(project_dir: &Path) -> Result<PathBuf> {
    let dest = project_dir.join(DEFAULT_MANIFEST_NAME);
    if dest.exists() {
        bail!("{DEFAULT_MANIFEST_NAME} already exists in {}", project_dir.display());
    }

    let project_name = guess_project_name(project_dir).unwrap_or_else(|| "my-cli".to_string());
    let manifest = starter_manifest(project_name);

    let bytes = serde_json::to_vec_pretty(&manifest).context("failed to serialize manifest")?;
    let mut out = String::from_utf8(bytes).context("manifest is not valid UTF-8")?;
    out.push('\n');

    let tmp = dest.with_extension("tmp");
    fs::write(&tmp, out.as_bytes())
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, &dest)
        .with_context(|| format!("failed to move {} into place", dest.display()))?;
    Ok(dest)
}

fn starter_manifest(name: String) -> Manifest {
    Manifest {
        schema_version: Some(SCHEMA_VERSION),
        name,
        version: Some("0.1.0".to_string()),
        description: String::new(),
        options: vec![OptionEntry {
            spec: "-v, --verbose".to_string(),
            description: "Print more output".to_string(),
            ..OptionEntry::default()
        }],
        commands: vec![
            CommandEntry {
                spec: "[...files]".to_string(),
                description: "Process files".to_string(),
                ..CommandEntry::default()
            },
            CommandEntry {
                spec: "dev [root]".to_string(),
                description: "Start a development server".to_string(),
                options: vec![OptionEntry {
                    spec: "-p, --port <port>".to_string(),
                    default: Some(Value::String("3000".to_string())),
                    cast: Some(CastName::Integer),
                    ..OptionEntry::default()
                }],
                ..CommandEntry::default()
            },
        ],
        groups: Vec::new(),
        allow_unknown_options: false,
    }
}

fn guess_project_name(project_dir: &Path) -> Option<String> {
    let usable = |s: &&str| !s.is_empty() && *s != "." && *s != "..";
    if let Some(name) = project_dir.file_name().and_then(|s| s.to_str()).filter(usable) {
        return Some(name.to_string());
    }

    let cwd = std::env::current_dir().ok()?;
    cwd.file_name()
        .and_then(|s| s.to_str())
        .filter(usable)
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn make_temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let pid = std::process::id();
        let dir = std::env::temp_dir().join(format!("argot-{prefix}-{pid}-{nanos}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn manifest_deserializes_camel_case() {
        let json = r#"{
  "schemaVersion": 1,
  "name": "demo",
  "allowUnknownOptions": true,
  "options": [{ "spec": "--verbose" }],
  "groups": [
    {
      "spec": "store",
      "commands": [
        {
          "spec": "get <key>",
          "aliases": ["g"],
          "arguments": [{ "spec": "<key>", "cast": "integer" }]
        }
      ]
    }
  ]
}"#;
        let m: Manifest = serde_json::from_str(json).unwrap();
        assert_eq!(m.schema_version, Some(1));
        assert!(m.allow_unknown_options);
        let get = &m.groups[0].commands[0];
        assert_eq!(get.aliases, vec!["g".to_string()]);
        assert_eq!(get.arguments[0].cast, Some(CastName::Integer));
    }

    #[test]
    fn manifest_builds_and_resolves() {
        let m: Manifest = serde_json::from_value(json!({
            "name": "demo",
            "commands": [
                {
                    "spec": "serve [root]",
                    "options": [
                        { "spec": "--port <port>", "default": "3000", "cast": "integer" }
                    ]
                },
                { "spec": "noop" }
            ]
        }))
        .unwrap();
        let program = m.to_app(|command| command).build().unwrap();

        let ctx = program.resolve(["serve"]).unwrap();
        assert_eq!(ctx.option("port"), Some(json!("3000")));
        let ctx = program.resolve(["serve", "--port", "8080"]).unwrap();
        assert_eq!(ctx.option("port"), Some(json!(8080)));
    }

    #[test]
    fn rejects_unknown_schema_version() {
        let dir = make_temp_dir("manifest-schema");
        let path = dir.join(DEFAULT_MANIFEST_NAME);
        fs::write(&path, r#"{ "schemaVersion": 9, "name": "demo" }"#).unwrap();
        let err = Manifest::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("schemaVersion 9"), "{err}");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn casts_convert_strings() {
        assert_eq!(CastName::Integer.apply(json!("42")), json!(42));
        assert_eq!(CastName::Integer.apply(json!("x")), json!("x"));
        assert_eq!(CastName::Number.apply(json!("2.5")), json!(2.5));
        assert_eq!(CastName::Boolean.apply(json!("off")), json!(false));
        assert_eq!(CastName::Boolean.apply(json!("yes")), json!(true));
        assert_eq!(CastName::String.apply(json!(true)), json!("true"));
        assert_eq!(CastName::Integer.apply(json!(["1", "x"])), json!([1, "x"]));
    }

    #[test]
    fn write_default_manifest_refuses_overwrite() {
        let dir = make_temp_dir("manifest-defaults");
        let dest = write_default_manifest(&dir).unwrap();
        let m = Manifest::from_file(&dest).unwrap();
        let project_name = dir.file_name().unwrap().to_string_lossy();
        assert_eq!(m.name, project_name);
        assert_eq!(m.schema_version, Some(SCHEMA_VERSION));
        m.to_app(|command| command).build().unwrap();

        let err = write_default_manifest(&dir).unwrap_err();
        assert!(err.to_string().contains("already exists"), "{err}");
        let _ = fs::remove_dir_all(&dir);
    }
}
