use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use profilegen::completion::{BackoffPolicy, HttpCompletionClient};
use profilegen::merge::enabled_tabs;
use profilegen::orchestrator::generate;
use profilegen::schema::{BusinessProfileType, GenerationRequest};
use profilegen::state::GenerationState;
use profilegen::store::{identity_hash, ProfileStore};

#[derive(Parser, Debug)]
#[command(name = "profilegen", version, about = "Specialty profile generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a profile from a request file
    Generate(GenerateArgs),
    /// Print the stored row for a specialty
    Show(ShowArgs),
    /// Print the enabled tabs for a profile type
    Tabs(TabsArgs),
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// Path to a generation request JSON file
    #[arg(long, value_name = "PATH")]
    request: PathBuf,

    /// Store root (defaults to the platform data dir)
    #[arg(long, value_name = "DIR")]
    store: Option<PathBuf>,

    /// Emit the full outcome as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct ShowArgs {
    /// Specialty name as submitted at generation time
    #[arg(long)]
    specialty: String,

    /// Business profile type of the stored row
    #[arg(long, value_name = "TYPE")]
    profile_type: BusinessProfileType,

    /// Store root (defaults to the platform data dir)
    #[arg(long, value_name = "DIR")]
    store: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct TabsArgs {
    #[arg(long, value_name = "TYPE")]
    profile_type: BusinessProfileType,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Generate(args) => cmd_generate(args),
        Commands::Show(args) => cmd_show(args),
        Commands::Tabs(args) => cmd_tabs(args),
    }
}

fn open_store(root: Option<PathBuf>) -> Result<ProfileStore> {
    let root = match root {
        Some(root) => root,
        None => ProfileStore::default_root()
            .ok_or_else(|| anyhow!("no data directory available; pass --store"))?,
    };
    Ok(ProfileStore::new(root))
}

fn cmd_generate(args: GenerateArgs) -> Result<ExitCode> {
    let text = std::fs::read_to_string(&args.request)
        .with_context(|| format!("read request {}", args.request.display()))?;
    let request: GenerationRequest = serde_json::from_str(&text)
        .with_context(|| format!("parse request {}", args.request.display()))?;

    let store = open_store(args.store)?;
    let client = HttpCompletionClient::from_env().context("completion client configuration")?;
    let backoff = BackoffPolicy::default();

    let outcome = generate(&store, &client, &backoff, &request)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!(
            "{} {} score={} mode={} in {}ms",
            request.specialty_name,
            outcome.status,
            outcome.validation_score,
            outcome.mode,
            outcome.response_time_ms
        );
        if let Some(error) = &outcome.error {
            println!("  {error}");
        }
    }

    if outcome.status == GenerationState::Complete {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn cmd_show(args: ShowArgs) -> Result<ExitCode> {
    let store = open_store(args.store)?;
    let hash = identity_hash(&args.specialty, args.profile_type);
    let row = store
        .load(&hash)
        .map_err(|err| anyhow!("{err}"))?
        .ok_or_else(|| anyhow!("no stored profile for '{}'", args.specialty))?;
    println!("{}", serde_json::to_string_pretty(&row)?);
    Ok(ExitCode::SUCCESS)
}

fn cmd_tabs(args: TabsArgs) -> Result<ExitCode> {
    let tabs = enabled_tabs(args.profile_type);
    println!("{}", serde_json::to_string_pretty(&tabs)?);
    Ok(ExitCode::SUCCESS)
}
