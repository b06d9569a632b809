// SYNOID Main Entry Point
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use synoid_story::agent::core::StoryPipeline;
use synoid_story::agent::media::check_dependencies;
use synoid_story::agent::presenter::ConsolePresenter;
use synoid_story::agent::story::{StoryRequest, Tone};
use synoid_story::config::StoryConfig;
use synoid_story::server;
use synoid_story::state::KernelState;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "synoid-story")]
#[command(about = "SYNOID Story Video Generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a narrated story video from a theme and a main character
    Generate {
        /// Story theme (e.g., "Sci-Fi", "Horror")
        #[arg(short, long)]
        theme: String,

        /// Who the story is about
        #[arg(short, long)]
        character: String,

        /// Narration tone: Dramatic, Friendly, Professional or Epic
        #[arg(long, default_value = "Dramatic")]
        tone: String,

        /// Print the full model script once it is ready
        #[arg(long)]
        show_script: bool,
    },

    /// Start the web form and run API
    Serve {
        /// Port to run the server on
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
    },

    /// Check external tools and configuration
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info,hyper=warn,reqwest=warn");
    }

    tracing_subscriber::fmt::init();

    // Global panic handler: log panics instead of crashing silently
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        eprintln!("🚨 [SYNOID PANIC] at {}: {}", location, message);
    }));

    info!("--- SYNOID STORY GENERATOR v{} ---", env!("CARGO_PKG_VERSION"));

    let args = Cli::parse();

    match args.command {
        Commands::Check => {
            let missing = check_dependencies().await;
            if missing.is_empty() {
                println!("✅ ffmpeg and ffprobe found on PATH");
            } else {
                println!("❌ Missing tools: {}", missing.join(", "));
            }

            let config_ok = match StoryConfig::from_env() {
                Ok(config) => {
                    println!("✅ Configuration loaded");
                    println!("   Chat model:  {} @ {}", config.llm_model, config.llm_url);
                    println!("   Video model: {} @ {}", config.video_model, config.video_url);
                    println!(
                        "   Scenes:      {}s each, stop at {}s, cap {}s, {} @ {} fps",
                        config.scene_secs,
                        config.scene_budget_secs,
                        config.max_video_secs,
                        config.resolution,
                        config.fps
                    );
                    match &config.compliance_url {
                        Some(url) => println!("   Compliance:  {}", url),
                        None => println!("   Compliance:  disabled"),
                    }
                    true
                }
                Err(e) => {
                    println!("❌ Configuration error: {}", e);
                    false
                }
            };

            if !missing.is_empty() || !config_ok {
                std::process::exit(1);
            }
        }

        Commands::Generate {
            theme,
            character,
            tone,
            show_script,
        } => {
            let tone: Tone = tone.parse().map_err(|e: String| anyhow!(e))?;
            let request = StoryRequest::new(&theme, &character, tone);
            request.validate()?;

            let config = StoryConfig::from_env().context("failed to load configuration")?;
            warn_missing_tools().await;

            let pipeline = StoryPipeline::from_config(&config)?;
            let run_id = Uuid::new_v4().to_string();
            let presenter = ConsolePresenter { show_script };

            println!("⏳ Writing story for '{}' ({})...", request.theme, request.tone);
            match pipeline.run(&run_id, &request, &presenter).await {
                Ok(output) => {
                    info!("🎬 Run {} complete: {:?}", run_id, output.video.path);
                }
                Err(e) => {
                    error!("Run {} failed: {}", run_id, e);
                    return Err(e.into());
                }
            }
        }

        Commands::Serve { port } => {
            let config = StoryConfig::from_env().context("failed to load configuration")?;
            warn_missing_tools().await;

            let pipeline = Arc::new(StoryPipeline::from_config(&config)?);
            if config.server_api_key.is_none() {
                warn!("[SERVER] STORY_API_KEY not set; the run API is open to anyone who can reach it.");
            }
            let state = Arc::new(KernelState::new(pipeline, config.server_api_key.clone()));
            server::start_server(port, state).await?;
        }
    }

    Ok(())
}

async fn warn_missing_tools() {
    let missing = check_dependencies().await;
    if !missing.is_empty() {
        warn!("⚠️ Missing dependencies: {:?}. Final assembly will fail.", missing);
    }
}
