mod manifest;
mod report;

use anyhow::{Context, Result, bail};
use argot::{CommandBuilder, Invocation, Next, Program};
use clap::Parser;
use serde_json::{Value, json};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing_subscriber::{EnvFilter, fmt};

use crate::manifest::{DEFAULT_MANIFEST_NAME, Manifest};
use crate::report::ResolutionReport;

#[derive(Parser)]
#[command(name = "argot-probe")]
#[command(version, about = "Resolve command lines against an argot manifest", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Write a starter argot.json
    Init(InitArgs),

    /// Validate every spec string in the manifest
    Check(ManifestArgs),

    /// Print the program snapshot as JSON
    Describe(ManifestArgs),

    /// Match tokens against the manifest and print the bindings
    Resolve(ResolveArgs),

    /// Match tokens and run the echo action through the middleware chain
    Run(ResolveArgs),
}

#[derive(Parser)]
struct InitArgs {
    /// Project directory (default: current directory)
    #[arg(value_name = "DIR")]
    dir: Option<PathBuf>,
}

#[derive(Parser)]
struct ManifestArgs {
    /// Path to argot.json manifest
    #[arg(short, long, default_value = DEFAULT_MANIFEST_NAME, value_name = "FILE")]
    manifest: PathBuf,
}

#[derive(Parser)]
struct ResolveArgs {
    #[command(flatten)]
    manifest: ManifestArgs,

    /// Print JSON instead of plain text
    #[arg(long)]
    json: bool,

    /// Tokens to resolve, after `--`
    #[arg(last = true, value_name = "TOKENS")]
    tokens: Vec<String>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async {
            match cli.command {
                Commands::Init(args) => init(args),
                Commands::Check(args) => check(args),
                Commands::Describe(args) => describe(args),
                Commands::Resolve(args) => resolve(args),
                Commands::Run(args) => run(args).await,
            }
        })
}

fn init(args: InitArgs) -> Result<()> {
    let dir = args.dir.unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;

    let path = manifest::write_default_manifest(&dir)?;

    eprintln!("Created: {}", path.display());
    eprintln!("\nNext steps:");
    eprintln!("  1. Edit {DEFAULT_MANIFEST_NAME} to declare your commands");
    eprintln!("  2. Run: argot-probe check");
    eprintln!("  3. Run: argot-probe resolve -- <tokens>");

    Ok(())
}

/// Every manifest command answers with the invocation it received.
fn echo(command: CommandBuilder) -> CommandBuilder {
    command.action(|invocation: Invocation| async move {
        Ok(json!({
            "command": invocation.command,
            "pieces": invocation.pieces,
            "arguments": invocation.arguments,
            "options": invocation.options,
            "remaining": invocation.remaining,
            "data": invocation.data,
        }))
    })
}

fn load_program(path: &Path) -> Result<Program> {
    let manifest = Manifest::from_file(path)?;
    let app = manifest
        .to_app(echo)
        .use_middleware(|invocation: Invocation, next: Next| async move {
            tracing::debug!(command = %invocation.command, "dispatching");
            next.proceed().await
        });

    match app.build() {
        Ok(program) => Ok(program),
        Err(argot::Error::Spec(err)) => {
            eprintln!("{}", err.caret());
            bail!("invalid spec in {}: {err}", path.display())
        }
        Err(err) => Err(err).with_context(|| format!("failed to build {}", path.display())),
    }
}

fn check(args: ManifestArgs) -> Result<()> {
    tracing::debug!("executing check command");

    let program = load_program(&args.manifest)?;
    eprintln!(
        "OK: {} command(s), {} group(s), {} option(s)",
        program.commands().len(),
        program.groups().len(),
        program.options().len()
    );
    Ok(())
}

fn describe(args: ManifestArgs) -> Result<()> {
    tracing::debug!("executing describe command");

    let program = load_program(&args.manifest)?;
    println!("{}", serde_json::to_string_pretty(&program.describe())?);
    Ok(())
}

fn resolve(args: ResolveArgs) -> Result<()> {
    tracing::debug!("executing resolve command");

    let program = load_program(&args.manifest.manifest)?;
    let ctx = program.resolve(args.tokens.iter().cloned())?;
    let report = ResolutionReport::from_context(&ctx);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render());
    }
    Ok(())
}

async fn run(args: ResolveArgs) -> Result<()> {
    tracing::debug!("executing run command");

    let program = load_program(&args.manifest.manifest)?;
    let output: Value = program.run(args.tokens.iter().cloned()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{output}");
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
