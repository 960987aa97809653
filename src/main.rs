mod cli;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use pictolog::config::PictologConfig;
use pictolog::diary::{ArtStyle, Mood};

#[derive(Parser)]
#[command(name = "pictolog", version, about = "Picture diary with retrieval-augmented image prompts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a diary entry (text from the argument or stdin)
    Write {
        text: Option<String>,
        /// Logical diary date, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Cyberpunk, WaterColor, Realistic, Pixel Art or Sketch
        #[arg(long)]
        style: ArtStyle,
        /// Happy, Neutral, Sad, Excited or Anxious
        #[arg(long)]
        mood: Mood,
        /// Image to attach (PNG, JPEG, WebP or GIF)
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Show the entries written on a date
    Show {
        /// YYYY-MM-DD (default: today)
        date: Option<NaiveDate>,
    },
    /// Delete an entry and its image
    Delete { id: String },
    /// List past entries related to a query
    Recall {
        query: String,
        #[arg(short)]
        k: Option<usize>,
        #[arg(long)]
        mood: Option<Mood>,
    },
    /// Generate a Stable Diffusion prompt for a scene
    Prompt {
        scene: String,
        #[arg(long)]
        style: ArtStyle,
        #[arg(long)]
        mood: Mood,
        /// Number of past entries to draw on
        #[arg(short)]
        k: Option<usize>,
    },
    /// Write an entry and illustrate it with a generated picture
    Draw {
        scene: String,
        /// Logical diary date, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        style: ArtStyle,
        #[arg(long)]
        mood: Mood,
        /// Candidate pictures to generate (default: image.count)
        #[arg(short = 'n', long)]
        count: Option<usize>,
        /// Keep this candidate (1-based) instead of asking
        #[arg(long)]
        pick: Option<usize>,
        /// Number of past entries to draw on
        #[arg(short)]
        k: Option<usize>,
    },
    /// Export all entries as JSON to stdout
    Export,
    /// Check database health and image files
    Doctor,
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.pictolog/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = PictologConfig::load()?;

    // stderr keeps stdout clean for command output such as `export`
    let filter = EnvFilter::try_new(&config.general.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let today = Local::now().date_naive();

    match cli.command {
        Command::Write {
            text,
            date,
            style,
            mood,
            image,
        } => cli::write::write(
            &config,
            text,
            date.unwrap_or(today),
            style,
            mood,
            image.as_deref(),
        )?,
        Command::Show { date } => cli::show::show(&config, date.unwrap_or(today))?,
        Command::Delete { id } => cli::delete::delete(&config, &id)?,
        Command::Recall { query, k, mood } => cli::recall::recall(&config, &query, k, mood).await?,
        Command::Prompt {
            scene,
            style,
            mood,
            k,
        } => cli::prompt::prompt(&config, &scene, style, mood, k).await?,
        Command::Draw {
            scene,
            date,
            style,
            mood,
            count,
            pick,
            k,
        } => {
            cli::draw::draw(
                &config,
                &scene,
                date.unwrap_or(today),
                style,
                mood,
                count,
                pick,
                k,
            )
            .await?
        }
        Command::Export => cli::export::export(&config)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::Model { action } => match action {
            ModelAction::Download => cli::model_download(&config.embedding).await?,
        },
    }

    Ok(())
}
