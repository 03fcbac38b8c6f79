//! Explorer CLI - builds the Project Explorer demo site.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

use commands::run::Overrides;

#[derive(Parser)]
#[command(name = "explorer")]
#[command(about = "Bundle, render and check the Project Explorer site")]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Task to run; `default` when omitted
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to explorer.toml config file
    #[arg(short, long, global = true, default_value = "explorer.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Keep running tasks that do not depend on a failed one
    #[arg(short, long, global = true)]
    keep_going: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter site in the current directory
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },

    /// Remove the build directory
    Clean,

    /// Bundle the shared libraries into build/shared.js
    BundleShared,

    /// Bundle one page into build/<page>/main.js
    BundlePage {
        /// Page name (directory under pages/)
        page: String,
    },

    /// Render one page into build/<page>/index.html
    RenderPage {
        /// Page name (directory under pages/)
        page: String,
    },

    /// Bundle and render every page
    Bundle,

    /// Bundle, render and minify every page
    Build {
        /// Skip minification
        #[arg(long)]
        no_minify: bool,
    },

    /// Run the whitespace and external linters
    Lint,

    /// Run the linters and the coverage gate
    Test,

    /// Same as `test`
    Default,

    /// Run any registered task by name
    Run {
        /// Task name, e.g. `page:about:bundle`
        task: String,
    },

    /// List registered tasks
    Help,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let mut overrides = Overrides {
        keep_going: cli.keep_going,
        minify: None,
    };

    let task = match cli.command.unwrap_or(Commands::Default) {
        Commands::Init { yes } => return commands::init::run(&cli.config, yes).await,
        Commands::Help => return commands::help::run(&cli.config).await,
        Commands::Clean => "clean".to_string(),
        Commands::BundleShared => "bundle:shared".to_string(),
        Commands::BundlePage { page } => format!("page:{page}:bundle"),
        Commands::RenderPage { page } => format!("page:{page}:build-page"),
        Commands::Bundle => "bundle".to_string(),
        Commands::Build { no_minify } => {
            if no_minify {
                overrides.minify = Some(false);
            }
            "build".to_string()
        }
        Commands::Lint => "lint".to_string(),
        Commands::Test => "test".to_string(),
        Commands::Default => "default".to_string(),
        Commands::Run { task } => task,
    };

    commands::run::run(&cli.config, task, overrides).await
}
