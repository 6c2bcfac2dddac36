//! CLI surface for the `lev-eval` binary.
//!
//! Uses clap for argument parsing, grounded on `dirmacs-ares::cli`'s
//! `Cli`/`Commands` derive shape (`#[command(name, author, version, about,
//! long_about, after_help)]`, global flags on the top-level `Cli`), with
//! the subcommand set replaced per §6's CLI surface (`run`, `validate`,
//! `profiles`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// lev-eval — an evaluation harness for tool-using language-model agents.
///
/// Drives a propose/execute-tools/introspect loop against MCP tool servers
/// and scores the resulting transcripts with a configurable battery of
/// scorers.
#[derive(Parser, Debug)]
#[command(
    name = "lev-eval",
    author = "Dirmacs <build@dirmacs.com>",
    version,
    about = "An evaluation harness for tool-using language-model agents",
    long_about = "lev-eval runs a manifest of questions against MCP tool servers through a\n\
                  propose/execute-tools/introspect loop, then scores each transcript with a\n\
                  configurable battery of scorers (LLM critique, LLM value extraction,\n\
                  substring match, tool-call count/input/output).",
    after_help = "EXAMPLES:\n    \
                  lev-eval run manifest.json                 # Run every eval in a manifest\n    \
                  lev-eval run manifest.json --limit 5        # Run only the first 5 evals\n    \
                  lev-eval validate manifest.json             # Validate a manifest without running it\n    \
                  lev-eval profiles                           # Show the resolved provider profiles"
)]
pub struct Cli {
    /// Path to the provider profiles file (defaults to the search order
    /// described in the profile resolver: EVAL_PROFILES_PATH,
    /// ./provider_profiles.json, ~/.config/eval/provider_profiles.json).
    #[arg(short, long, global = true)]
    pub profiles: Option<PathBuf>,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every eval in a manifest and write scored results to a TSV sink.
    Run {
        /// Path to the eval manifest (JSON).
        manifest: PathBuf,

        /// Where to write the TSV results (defaults to results.tsv next to
        /// the manifest).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to a CSV telemetry log of individual tool invocations.
        #[arg(long)]
        telemetry: Option<PathBuf>,

        /// Only run the first N evals from the manifest.
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Validate a manifest's structure and references without running it.
    Validate {
        /// Path to the eval manifest (JSON).
        manifest: PathBuf,
    },

    /// Show the active provider profile and the resolved configuration for
    /// each role referenced by a manifest.
    Profiles {
        /// Path to the eval manifest whose `llm_config` should be resolved.
        /// If omitted, only the raw profile file is shown.
        manifest: Option<PathBuf>,
    },
}
