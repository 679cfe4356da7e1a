use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gifforge")]
#[command(author, version, about = "Convert short videos to animated GIFs")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a video file to an animated GIF
    Convert {
        /// Input video file
        #[arg(required = true)]
        input: PathBuf,

        /// Target frame rate (1-60; out-of-range values are clamped)
        #[arg(long, allow_hyphen_values = true)]
        fps: Option<String>,

        /// Output path (defaults to converted.gif in the current directory;
        /// a directory receives converted.gif)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Declared MIME type of the input (guessed from the extension if
        /// omitted)
        #[arg(long)]
        mime: Option<String>,
    },

    /// Check that required external tools are available
    CheckTools {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
