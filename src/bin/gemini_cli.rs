//! Gemini image generation.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mediagen::catalog;
use mediagen::cli;
use mediagen::config::{self, Config, EnvVar};
use mediagen::gemini::{self, GeminiClient, ImageRequest};
use mediagen::InlineMedia;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gemini-cli")]
#[command(version, about = "CLI for Gemini image generation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an image (and text) from a prompt
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

    #[arg(long, default_value = gemini::DEFAULT_MODEL)]
    model: String,

    /// Aspect ratio, e.g. 1:1, 16:9
    #[arg(long, default_value = "1:1")]
    ratio: String,

    /// Image size: 1K, 2K or 4K
    #[arg(long, default_value = "2K")]
    size: String,

    /// Reference image from a local file; may be repeated
    #[arg(long)]
    image_file: Vec<PathBuf>,

    /// Only return text, no image
    #[arg(long)]
    text_only: bool,

    /// Output file path [default: output_<timestamp>.<ext>]
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Store the Gemini API key
    SetKey { api_key: String },
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
            println!("{}", catalog::gemini_registry().to_json(name.as_deref())?);
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
                c.gemini.get_or_insert_with(Default::default).api_key = api_key;
            })?;
            println!("Gemini API key saved to {}", path.display());
        }
        ConfigAction::Show => {
            let config = Config::load_or_default(&path)?;
            let api_key = config::resolve_api_key(
                &EnvVar::read(config::GEMINI_API_KEY),
                config.gemini.as_ref(),
            );
            println!("Config: {}\n", path.display());
            println!("{}", cli::describe_credential("Gemini API Key", api_key.as_ref()));
        }
    }
    Ok(())
}

async fn generate(args: GenerateArgs) -> Result<()> {
    let config = Config::load_or_default(&Config::default_path())?;
    let api_key = config::resolve_api_key(
        &EnvVar::read(config::GEMINI_API_KEY),
        config.gemini.as_ref(),
    )
    .ok_or_else(|| {
        cli::missing_credentials(
            "Gemini",
            "GEMINI_API_KEY=<KEY>",
            "gemini-cli config set-key <KEY>",
        )
    })?;

    let mut reference_images = Vec::with_capacity(args.image_file.len());
    for path in &args.image_file {
        reference_images.push(InlineMedia::from_path(path).await?);
    }
    let mut request = ImageRequest {
        model: args.model,
        prompt: args.prompt.join(" "),
        reference_images,
        aspect_ratio: Some(args.ratio),
        image_size: Some(args.size),
    };
    if args.text_only {
        request = request.text_only();
    }

    let client = GeminiClient::new(&api_key.value)?;
    let content = client
        .generate_content(&request)
        .await
        .context("generating content")?;

    for (index, image) in content.images.iter().enumerate() {
        let path = match (&args.output, index) {
            (Some(output), 0) => output.clone(),
            (Some(output), n) => cli::numbered_path(output, n + 1),
            (None, _) => cli::numbered_path(&cli::default_output_path(image.extension()), index + 1),
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &image.data)
            .await
            .with_context(|| format!("saving image to {}", path.display()))?;
        eprintln!("Image saved: {} ({} bytes)", path.display(), image.data.len());
    }

    if !content.texts.is_empty() {
        println!("{}", content.texts.join("\n"));
    }
    Ok(())
}
