//! swea: run an autonomous coding agent inside a reusable Docker sandbox.
//!
//! The sandbox container is created and provisioned once, then reused by
//! every later invocation. Agent runs are tailed live and abandoned when a
//! tool invocation stops producing output.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod sandbox;
mod templates;

use commands::Target;

#[derive(Parser)]
#[command(name = "swea")]
#[command(
    author,
    version,
    about = "Run an autonomous coding agent inside a reusable Docker sandbox"
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Sandbox container name
    #[arg(long, global = true)]
    name: Option<String>,

    /// Base image for a new sandbox
    #[arg(long, global = true)]
    image: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent on a prompt (read from stdin when omitted)
    Run {
        /// Task for the agent
        prompt: Vec<String>,

        /// Seconds a tool invocation may run without finishing
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Directory the agent works in
        #[arg(short, long)]
        workdir: Option<String>,
    },

    /// Run a command in the sandbox
    Exec {
        /// Working directory inside the sandbox
        #[arg(short, long)]
        workdir: Option<String>,

        /// Environment variable (KEY=VALUE), repeatable
        #[arg(short, long)]
        env: Vec<String>,

        /// User to run as
        #[arg(short, long)]
        user: Option<String>,

        /// Command line; a single argument is run through bash
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Copy a script into the sandbox and run it
    Script {
        /// Script on the host
        file: PathBuf,

        /// Interpreter used to run it
        #[arg(short, long, default_value = "bash")]
        interpreter: String,

        /// Working directory inside the sandbox
        #[arg(short, long)]
        workdir: Option<String>,

        /// Environment variable (KEY=VALUE), repeatable
        #[arg(short, long)]
        env: Vec<String>,
    },

    /// Re-sync workspace, agent config and AGENTS.md into the sandbox
    Reinit,

    /// Show sandbox status
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Stop the sandbox, keeping it for reuse
    Stop,

    /// Remove the sandbox container (the workspace volume is kept)
    Destroy,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("swea=debug")
    } else {
        EnvFilter::new("swea=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let target = Target {
        name: cli.name,
        image: cli.image,
    };

    let success = match cli.command {
        Commands::Run {
            prompt,
            timeout,
            workdir,
        } => commands::run::run(&target, &prompt, timeout, workdir).await?,
        Commands::Exec {
            workdir,
            env,
            user,
            command,
        } => commands::script::exec(&target, &command, workdir, &env, user).await?,
        Commands::Script {
            file,
            interpreter,
            workdir,
            env,
        } => commands::script::script(&target, &file, &interpreter, workdir, &env).await?,
        Commands::Reinit => {
            commands::manage::reinit(&target).await?;
            true
        }
        Commands::Status { json } => {
            commands::status::run(&target, json).await?;
            true
        }
        Commands::Stop => {
            commands::manage::stop(&target).await?;
            true
        }
        Commands::Destroy => {
            commands::manage::destroy(&target).await?;
            true
        }
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
