//! Polyrun CLI
//!
//! Serves the HTTP API, or runs a local file through the same engine.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use polyrun::{Config, EXAMPLE_CONFIG, ExecutionRequest, Runner, TemplateLibrary};
use polyrun_server::{AppState, ExecuteResponse};
use tracing::{Level, debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "polyrun")]
#[command(about = "Run code snippets in twelve languages under time and memory limits")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:8000")]
        bind: SocketAddr,
    },

    /// Run a source file (compile if needed, then execute)
    Run {
        /// Source file to run
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language ID (e.g., python, cpp)
        #[arg(short, long)]
        language: String,

        /// Run timeout in seconds (capped by max_timeout)
        #[arg(short, long)]
        timeout: Option<f64>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List available languages
    Languages,

    /// List templates, or print one
    Templates {
        /// Language ID
        language: Option<String>,

        /// Template type (e.g., hello_world)
        template_type: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "polyrun.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref();
    let load = || {
        match config_path {
            Some(path) => info!(?path, "loading configuration"),
            None => debug!("using default configuration"),
        }
        Config::load(config_path).context("failed to load configuration")
    };

    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::Serve { bind } => serve(load()?, bind).await,
        Commands::Run {
            source,
            language,
            timeout,
            json,
        } => run_source(load()?, &source, language, timeout, json).await,
        Commands::Languages => {
            list_languages(&load()?);
            Ok(())
        }
        Commands::Templates {
            language,
            template_type,
        } => show_templates(language.as_deref(), template_type.as_deref()),
        Commands::ShowConfig => {
            show_config(&load()?);
            Ok(())
        }
    }
}

async fn serve(config: Config, bind: SocketAddr) -> Result<()> {
    let runner = Runner::new(config).context("invalid language configuration")?;
    let templates = TemplateLibrary::builtin().context("failed to load templates")?;

    info!(
        languages = runner.registry().len(),
        workers = runner.workspaces().capacity(),
        root = %runner.workspaces().root().display(),
        "starting server"
    );

    polyrun_server::serve(bind, AppState::new(runner, templates), shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn run_source(
    config: Config,
    source: &Path,
    language: String,
    timeout: Option<f64>,
    json: bool,
) -> Result<()> {
    let code = tokio::fs::read_to_string(source)
        .await
        .with_context(|| format!("failed to read source file '{}'", source.display()))?;

    let runner = Runner::new(config).context("invalid language configuration")?;
    let mut request = ExecutionRequest::new(language, code);
    request.timeout = timeout;

    info!(language = %request.language, "running program");
    let result = runner
        .execute(&request)
        .await
        .context("execution failed")?;

    if json {
        let response = ExecuteResponse::from(result.clone());
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print!("{}", result.stdout());
        if !result.stderr().is_empty() {
            eprint!("{}", result.stderr());
        }
    }

    // Log execution info via tracing (stderr), keeping stdout clean for piping
    info!(
        status = ?result.status(),
        time = format_args!("{:.3}s", result.execution_time()),
        exit_code = result.exit_code(),
        compiled = result.compiled(),
        timeout = result.timeout_occurred(),
        truncated = result.stdout_truncated() || result.stderr_truncated(),
        "execution result"
    );

    if result.is_success() {
        Ok(())
    } else {
        let code = result.exit_code();
        std::process::exit(if code > 0 { code } else { 1 });
    }
}

fn list_languages(config: &Config) {
    println!("Available languages:\n");

    for lang in &config.languages {
        let lang_type = if lang.requires_compilation() {
            "compiled"
        } else {
            "interpreted"
        };
        println!(
            "  {:<12} {:<22} .{:<5} {:>5.1}s  {:>4} MB  ({})",
            lang.id,
            lang.name,
            lang.extension.as_str(),
            lang.timeout,
            lang.memory_limit_mb,
            lang_type
        );
    }
}

fn show_templates(language: Option<&str>, template_type: Option<&str>) -> Result<()> {
    let library = TemplateLibrary::builtin().context("failed to load templates")?;

    match (language, template_type) {
        (Some(language), Some(template_type)) => {
            let code = library
                .get(language, template_type)
                .context("template lookup failed")?;
            print!("{code}");
        }
        (Some(language), None) => {
            for entry in library.entries().iter().filter(|e| e.language == language) {
                println!("{}", entry.template_type);
            }
        }
        _ => {
            println!("Languages: {}", library.list_languages().join(", "));
            println!("Types:     {}", library.list_types().join(", "));
        }
    }
    Ok(())
}

fn show_config(config: &Config) {
    println!("Engine settings:");
    println!("  Workspace root: {}", config.workspace_root.display());
    println!("  Max concurrent executions: {}", config.max_concurrent_executions);
    println!("  Max timeout: {}s", config.max_timeout);
    println!("  Max code size: {} bytes", config.max_code_bytes);
    println!("  Max output per stream: {} bytes", config.max_output_bytes);
    println!("  Kill grace: {}s", config.kill_grace);
    println!("  Inherited environment: {}", config.inherit_env.join(", "));
    println!();
    println!("Languages configured: {}", config.languages.len());
}

async fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}
