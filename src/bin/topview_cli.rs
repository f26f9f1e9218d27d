//! TopView talking-avatar video generation.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mediagen::catalog;
use mediagen::cli;
use mediagen::config::{self, Config, EnvVar};
use mediagen::topview::{self, TopviewClient};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "topview-cli")]
#[command(version, about = "CLI for TopView AI video avatar generation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an avatar video from a portrait and an audio track
    Generate(GenerateArgs),
    /// List available models as JSON
    Models {
        /// Show a single model
        name: Option<String>,
    },
    /// Manage stored credentials
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// Portrait image file (jpg, png, webp)
    #[arg(long)]
    image: PathBuf,

    /// Audio file (mp3, wav, m4a, aac)
    #[arg(long)]
    audio: PathBuf,

    /// Output file path [default: output_<timestamp>.mp4]
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Store the TopView API key
    SetKey { api_key: String },
    /// Store the TopView user id
    SetUid { uid: String },
    /// Show the resolved credentials
    Show,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let opts = Cli::parse();
    cli::init_logging(opts.verbose);

    match opts.command {
        Commands::Generate(args) => generate(args).await,
        Commands::Models { name } => {
            println!("{}", catalog::topview_registry().to_json(name.as_deref())?);
            Ok(())
        }
        Commands::Config { action } => configure(action),
    }
}

fn configure(action: ConfigAction) -> Result<()> {
    let path = Config::default_path();
    match action {
        ConfigAction::SetKey { api_key } => {
            cli::update_config(&path, |c| {
                c.topview.get_or_insert_with(Default::default).api_key = api_key;
            })?;
            println!("TopView API key saved to {}", path.display());
        }
        ConfigAction::SetUid { uid } => {
            cli::update_config(&path, |c| {
                c.topview.get_or_insert_with(Default::default).uid = uid;
            })?;
            println!("TopView UID saved to {}", path.display());
        }
        ConfigAction::Show => {
            let config = Config::load_or_default(&path)?;
            let api_key = config::resolve_api_key(
                &EnvVar::read(config::TOPVIEW_API_KEY),
                config.topview.as_ref(),
            );
            let uid = config::resolve_uid(&EnvVar::read(config::TOPVIEW_UID), config.topview.as_ref());
            println!("Config: {}\n", path.display());
            println!("{}", cli::describe_credential("TopView API Key", api_key.as_ref()));
            if let Some(uid) = uid {
                println!("TopView UID: {} (source: {})", uid.value, uid.source);
            }
        }
    }
    Ok(())
}

async fn generate(args: GenerateArgs) -> Result<()> {
    let config = Config::load_or_default(&Config::default_path())?;
    let api_key = config::resolve_api_key(
        &EnvVar::read(config::TOPVIEW_API_KEY),
        config.topview.as_ref(),
    )
    .ok_or_else(|| {
        cli::missing_credentials(
            "TopView",
            "TOPVIEW_API_KEY=<KEY>",
            "topview-cli config set-key <KEY>",
        )
    })?;
    let uid = config::resolve_uid(&EnvVar::read(config::TOPVIEW_UID), config.topview.as_ref());
    let output = args
        .output
        .unwrap_or_else(|| cli::default_output_path("mp4"));

    let client = TopviewClient::new(&api_key.value, uid.as_ref().map(|u| u.value.as_str()))?;

    let image_file_id = client
        .upload_file(&args.image, topview::image_format(&args.image))
        .await
        .context("uploading image")?;
    info!(file_id = %image_file_id, "image uploaded");
    let audio_file_id = client
        .upload_file(&args.audio, topview::audio_format(&args.audio))
        .await
        .context("uploading audio")?;
    info!(file_id = %audio_file_id, "audio uploaded");

    let submitted = client
        .submit_video_avatar(&image_file_id, &audio_file_id)
        .await
        .context("submitting task")?;
    info!(
        "polling for result (timeout {}s)",
        topview::POLL_POLICY.timeout.as_secs()
    );
    let task = client.wait_for_task(&submitted.id).await?;

    let size = cli::save_artifact(&task, &output)
        .await
        .with_context(|| format!("downloading video to {}", output.display()))?;
    eprintln!("Video saved: {} ({} bytes)", output.display(), size);
    Ok(())
}
