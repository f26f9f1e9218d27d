//! Jimeng action imitation and OmniHuman video generation.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use mediagen::catalog;
use mediagen::cli;
use mediagen::config::Config;
use mediagen::jimeng::{ActionImitationParams, JimengClient, JimengRequest, OmniHumanParams};
use mediagen::{MediaError, MediaSlot};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "jimeng-cli")]
#[command(version, about = "CLI for Jimeng video generation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a video from images, a template video or audio
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
    /// Optional prompt text (jimeng-omnihuman)
    prompt: Vec<String>,

    #[arg(long, default_value = catalog::JIMENG_DEFAULT_MODEL)]
    model: String,

    /// Person or portrait image URL
    #[arg(long)]
    image: Option<String>,

    /// Person or portrait image from a local file
    #[arg(long)]
    image_file: Option<PathBuf>,

    /// Template video URL (jimeng-action-imitation-v2)
    #[arg(long)]
    video: Option<String>,

    /// Cut the first second of the result (jimeng-action-imitation-v2)
    #[arg(long)]
    cut_first_second: Option<bool>,

    /// Audio URL, under 60 seconds (jimeng-omnihuman)
    #[arg(long)]
    audio: Option<String>,

    /// Output resolution: 720 or 1080 (jimeng-omnihuman)
    #[arg(long)]
    resolution: Option<u32>,

    /// Trade quality for speed (jimeng-omnihuman)
    #[arg(long)]
    fast_mode: bool,

    /// Random seed, -1 for random (jimeng-omnihuman)
    #[arg(long, allow_hyphen_values = true)]
    seed: Option<i64>,

    /// Output file path [default: output_<timestamp>.mp4]
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Store the Jimeng access keys
    SetKeys {
        access_key_id: String,
        secret_access_key: String,
    },
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
            println!("{}", catalog::jimeng_registry().to_json(name.as_deref())?);
            Ok(())
        }
        Commands::Config { action } => configure(action),
    }
}

fn configure(action: ConfigAction) -> Result<()> {
    let path = Config::default_path();
    match action {
        ConfigAction::SetKeys {
            access_key_id,
            secret_access_key,
        } => {
            cli::update_config(&path, |c| {
                let jimeng = c.jimeng.get_or_insert_with(Default::default);
                jimeng.access_key_id = access_key_id;
                jimeng.secret_access_key = secret_access_key;
            })?;
            println!("Jimeng access keys saved to {}", path.display());
        }
        ConfigAction::Show => {
            let config = Config::load_or_default(&path)?;
            println!("Config: {}\n", path.display());
            for line in cli::describe_jimeng_keys(&config) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

async fn build_request(args: GenerateArgs) -> Result<JimengRequest> {
    let image = MediaSlot::from_inputs(args.image, args.image_file.as_deref()).await?;
    if image.is_empty() {
        bail!("--image or --image-file is required");
    }

    match args.model.as_str() {
        catalog::JIMENG_DEFAULT_MODEL => {
            let Some(video_url) = args.video.filter(|v| !v.is_empty()) else {
                bail!("--video is required for {}", args.model);
            };
            Ok(JimengRequest::ActionImitation(ActionImitationParams {
                image,
                video_url,
                cut_first_second: args.cut_first_second,
            }))
        }
        "jimeng-omnihuman" => {
            let Some(audio_url) = args.audio.filter(|a| !a.is_empty()) else {
                bail!("--audio is required for {}", args.model);
            };
            Ok(JimengRequest::OmniHuman(OmniHumanParams {
                image,
                audio_url,
                prompt: args.prompt.join(" "),
                seed: args.seed,
                output_resolution: args.resolution,
                fast_mode: args.fast_mode,
            }))
        }
        other => Err(MediaError::UnknownModel(other.to_string()))
            .context("run `jimeng-cli models` to list available models"),
    }
}

async fn generate(args: GenerateArgs) -> Result<()> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| cli::default_output_path("mp4"));
    let config = Config::load_or_default(&Config::default_path())?;
    let keys = cli::jimeng_access_keys(&config, "jimeng-cli")?;
    let request = build_request(args).await?;

    let client = JimengClient::new(keys)?;
    let submitted = client.submit(&request).await.context("submitting task")?;
    let task = client.wait_for_task(&request.product(), &submitted.id).await?;

    let size = cli::save_artifact(&task, &output)
        .await
        .with_context(|| format!("downloading video to {}", output.display()))?;
    eprintln!("Video saved: {} ({} bytes)", output.display(), size);
    Ok(())
}
