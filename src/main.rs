use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use genai_studio::media::encode_file;
use genai_studio::models::{AspectRatio, ChatModel, Config};
use genai_studio::studio::{DesignSession, DesignStyle, Studio};
use genai_studio::video::{ProgressSender, VideoRequest};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "genai-studio")]
#[command(about = "Edit images, restyle rooms, animate stills and chat with Gemini")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply a text instruction to an image.
    Edit {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        prompt: String,
    },
    /// Restyle a room photo, then optionally refine it step by step.
    Restyle {
        #[arg(long)]
        image: PathBuf,
        #[arg(long, value_parser = parse_style_arg)]
        style: DesignStyle,
        /// Follow-up change; repeat for several refinements.
        #[arg(long = "refine")]
        refinements: Vec<String>,
    },
    /// Generate a short video seeded by an image.
    Video {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        prompt: String,
        #[arg(long, default_value = "16:9", value_parser = parse_aspect_ratio_arg)]
        aspect_ratio: AspectRatio,
    },
    /// Chat on stdin. An empty line or EOF ends the session.
    Chat {
        /// Use the Pro model tier.
        #[arg(long)]
        pro: bool,
        #[arg(long)]
        system: Option<String>,
    },
}

fn parse_style_arg(input: &str) -> std::result::Result<DesignStyle, String> {
    input.parse().map_err(|e: genai_studio::Error| e.to_string())
}

fn parse_aspect_ratio_arg(input: &str) -> std::result::Result<AspectRatio, String> {
    input.parse().map_err(|e: genai_studio::Error| e.to_string())
}

fn create_output_dir(root: &Path) -> Result<PathBuf> {
    let date = Local::now().format("%Y-%m-%d").to_string();
    let output_dir = root.join(format!("{}_{}", date, Uuid::new_v4()));
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;
    info!("Created output directory: {}", output_dir.display());
    Ok(output_dir)
}

fn write_image(dir: &Path, name: &str, image: &genai_studio::media::EncodedMedia) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, image.decode()?)?;
    info!("Saved {}", path.display());
    Ok(path)
}

async fn apply_refinements(
    studio: &Studio,
    session: &mut DesignSession,
    refinements: &[String],
    dir: &Path,
) -> Result<()> {
    for (i, change) in refinements.iter().enumerate() {
        let before = session.current().clone();
        let outcome = studio.refine(session, change).await;

        // The edit can land even when the acknowledgement turn fails.
        if session.current() != &before {
            write_image(dir, &format!("refined_{}.png", i + 1), session.current())?;
        }
        println!("{}", outcome?);
    }
    Ok(())
}

async fn run(studio: Studio, config: &Config, command: Command) -> Result<()> {
    match command {
        Command::Edit { image, prompt } => {
            let source = encode_file(&image).await?;
            let edited = studio.edit_image(&source, &prompt).await?;
            let dir = create_output_dir(&config.output_dir)?;
            write_image(&dir, "edited.png", &edited)?;
        }
        Command::Restyle {
            image,
            style,
            refinements,
        } => {
            let mut session = studio.start_design(encode_file(&image).await?)?;
            studio.restyle(&mut session, style).await?;

            let dir = create_output_dir(&config.output_dir)?;
            write_image(&dir, "restyled.png", session.current())?;

            apply_refinements(&studio, &mut session, &refinements, &dir).await?;
        }
        Command::Video {
            image,
            prompt,
            aspect_ratio,
        } => {
            let request = VideoRequest::new(encode_file(&image).await?, prompt, aspect_ratio);

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, abandoning video generation");
                    on_interrupt.cancel();
                }
            });

            let (progress, mut rx) = ProgressSender::channel();
            let printer = tokio::spawn(async move {
                while let Some(update) = rx.recv().await {
                    info!("{}", update);
                }
            });

            let result = studio.generate_video(&request, &progress, &cancel).await;
            drop(progress);
            let _ = printer.await;

            let video = result?;
            let dir = create_output_dir(&config.output_dir)?;
            let path = video.persist(&dir.join("video.mp4"))?;
            info!("Saved {}", path.display());
        }
        Command::Chat { pro, system } => {
            let model = if pro { ChatModel::Pro } else { ChatModel::Flash };
            let mut session = studio.open_chat(model, system);
            info!("Chatting with {}", session.model_id());

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                if line.trim().is_empty() {
                    break;
                }
                match studio.chat(&mut session, &line).await {
                    Ok(reply) => println!("{}", reply),
                    Err(e) if e.requires_reauth() => return Err(e.into()),
                    Err(e) => error!("{}", e),
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "genai_studio=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let studio = match Studio::from_config(&config) {
        Ok(studio) => studio,
        Err(e) => {
            error!("Failed to initialize studio: {}", e);
            std::process::exit(1);
        }
    };

    match run(studio, &config, args.command).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("{:#}", e);
            let reauth = e
                .downcast_ref::<genai_studio::Error>()
                .is_some_and(genai_studio::Error::requires_reauth);
            if reauth {
                error!("The API key was rejected. Set a valid GEMINI_API_KEY and try again.");
            }
            std::process::exit(1);
        }
    }
}
