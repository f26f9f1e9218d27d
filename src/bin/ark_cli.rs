//! Volcano Ark video generation, with Jimeng 3.0 Pro models routed to Volcano Visual.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mediagen::ark::{self, ArkClient, VideoRequest};
use mediagen::catalog::{self, ArkBackend};
use mediagen::cli;
use mediagen::config::{self, Config, EnvVar};
use mediagen::jimeng::{JimengClient, JimengRequest, VideoParams};
use mediagen::{MediaError, MediaSlot, Task};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "ark-cli")]
#[command(version, about = "CLI for Volcano Ark video generation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a video from a text prompt
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
    /// Prompt text; several words are joined with spaces
    #[arg(required = true)]
    prompt: Vec<String>,

    #[arg(long, default_value = ark::DEFAULT_MODEL)]
    model: String,

    /// Video duration in seconds: 5 or 10 (Ark models)
    #[arg(long, default_value = "5")]
    duration: String,

    /// 720p or 1080p (Ark models)
    #[arg(long, default_value = "720p")]
    resolution: String,

    /// Aspect ratio, e.g. 16:9, 9:16, 1:1
    #[arg(long, default_value = "16:9")]
    ratio: String,

    /// Disable audio generation (Ark models)
    #[arg(long)]
    no_audio: bool,

    /// Total frames: 121 (5s) or 241 (10s) (Jimeng models)
    #[arg(long)]
    frames: Option<u32>,

    /// Random seed, -1 for random (Jimeng models)
    #[arg(long, allow_hyphen_values = true)]
    seed: Option<i64>,

    /// First frame image URL
    #[arg(long)]
    image: Option<String>,

    /// First frame image from a local file
    #[arg(long)]
    image_file: Option<PathBuf>,

    /// Last frame image URL (Jimeng i2v-startend)
    #[arg(long)]
    end_image: Option<String>,

    /// Last frame image from a local file (Jimeng i2v-startend)
    #[arg(long)]
    end_image_file: Option<PathBuf>,

    /// Output file path [default: output_<timestamp>.mp4]
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Store the Ark API key
    SetKey { api_key: String },
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
            println!("{}", catalog::ark_registry().to_json(name.as_deref())?);
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
                c.ark.get_or_insert_with(Default::default).api_key = api_key;
            })?;
            println!("Ark API key saved to {}", path.display());
        }
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
            let api_key =
                config::resolve_api_key(&EnvVar::read(config::ARK_API_KEY), config.ark.as_ref());
            println!("Config: {}\n", path.display());
            println!("{}", cli::describe_credential("Ark API Key", api_key.as_ref()));
            println!();
            for line in cli::describe_jimeng_keys(&config) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

async fn generate(args: GenerateArgs) -> Result<()> {
    let backend = catalog::ark_backend(&args.model)
        .ok_or_else(|| MediaError::UnknownModel(args.model.clone()))
        .context("run `ark-cli models` to see available models")?;
    let config = Config::load_or_default(&Config::default_path())?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| cli::default_output_path("mp4"));
    let prompt = args.prompt.join(" ");
    let first_frame = MediaSlot::from_inputs(args.image.clone(), args.image_file.as_deref()).await?;

    let task = match backend {
        ArkBackend::Ark => {
            let api_key =
                config::resolve_api_key(&EnvVar::read(config::ARK_API_KEY), config.ark.as_ref())
                    .ok_or_else(|| {
                        cli::missing_credentials(
                            "Ark",
                            "ARK_API_KEY=<KEY>",
                            "ark-cli config set-key <KEY>",
                        )
                    })?;
            let client = ArkClient::new(&api_key.value)?;
            let request = VideoRequest {
                model: args.model,
                prompt,
                image: first_frame,
                duration: args.duration,
                resolution: args.resolution,
                ratio: args.ratio,
                with_audio: !args.no_audio,
            };
            let submitted = client.create_task(&request).await.context("creating task")?;
            info!(
                "polling for result (timeout {}s)",
                ark::POLL_POLICY.timeout.as_secs()
            );
            client.wait_for_task(&submitted.id).await?
        }
        ArkBackend::Jimeng => {
            let end_frame =
                MediaSlot::from_inputs(args.end_image, args.end_image_file.as_deref()).await?;
            let params = VideoParams {
                prompt,
                first_frame,
                end_frame,
                aspect_ratio: args.ratio,
                frames: args.frames,
                seed: args.seed,
            };
            catalog::check_jimeng_frames(&args.model, &params)?;
            let keys = cli::jimeng_access_keys(&config, "ark-cli")?;
            let client = JimengClient::new(keys)?;
            let request = JimengRequest::Video(params);
            let submitted = client.submit(&request).await.context("submitting task")?;
            client.wait_for_task(&request.product(), &submitted.id).await?
        }
    };

    save(&task, &output).await
}

async fn save(task: &Task, output: &Path) -> Result<()> {
    let size = cli::save_artifact(task, output)
        .await
        .with_context(|| format!("downloading video to {}", output.display()))?;
    eprintln!("Video saved: {} ({} bytes)", output.display(), size);
    Ok(())
}
