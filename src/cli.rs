//! Command line interface built on clap.
//!
//! Subcommands map one-to-one onto workflow entry points; the global flags
//! override values from `autohunt.toml` for a single invocation. `--threshold`
//! only exists on the subcommands that can run a bulk deployment.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::model::CoverLetterStyle;

/// autohunt: autonomous job application workflow.
#[derive(Debug, Parser)]
#[command(name = "autohunt", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Model identifier sent to the LLM API.
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Cover letter tone.
    #[arg(long, global = true)]
    pub style: Option<StyleArg>,

    /// Enable debug output.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Cover letter tone accepted on the command line, mapped to [`CoverLetterStyle`].
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StyleArg {
    Professional,
    Enthusiastic,
    Concise,
    Technical,
    Storytelling,
}

impl From<StyleArg> for CoverLetterStyle {
    fn from(arg: StyleArg) -> Self {
        match arg {
            StyleArg::Professional => CoverLetterStyle::Professional,
            StyleArg::Enthusiastic => CoverLetterStyle::Enthusiastic,
            StyleArg::Concise => CoverLetterStyle::Concise,
            StyleArg::Technical => CoverLetterStyle::Technical,
            StyleArg::Storytelling => CoverLetterStyle::Storytelling,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply to a single job: a raw posting is extracted and scored first,
    /// a structured job goes straight to the cover letter.
    Apply {
        /// Text file containing the raw job posting.
        #[arg(long, conflicts_with = "job", required_unless_present = "job")]
        posting: Option<PathBuf>,

        /// JSON file with an already extracted job.
        #[arg(long)]
        job: Option<PathBuf>,
    },

    /// Apply to every queued job at or above the match threshold.
    Bulk {
        /// JSON array of discovered jobs. Defaults to the last search results.
        #[arg(long)]
        queue: Option<PathBuf>,

        /// Minimum match score (0-100). Defaults to the profile, then the config.
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        threshold: Option<u8>,
    },

    /// Interpret a natural language command (search, pause, resume, strategy, apply).
    Command {
        /// The command text.
        text: String,

        /// Minimum match score (0-100) if the command deploys applications.
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        threshold: Option<u8>,
    },

    /// Lock the risk gate so no new run starts until `resume`.
    Pause {
        #[arg(long)]
        reason: Option<String>,
    },

    /// Unlock the risk gate.
    Resume,

    /// Merge new material (a resume, a project write-up) into the profile.
    Augment {
        /// Text file with the material to merge.
        #[arg(long)]
        source: PathBuf,
    },

    /// Show or import the user profile.
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Print the persisted application log.
    Log,

    /// Show the risk gate and a summary of past applications.
    Status,
}

#[derive(Debug, Subcommand)]
pub enum ProfileAction {
    /// Print the stored profile as JSON.
    Show,
    /// Replace the stored profile with the given JSON file.
    Import { file: PathBuf },
}
