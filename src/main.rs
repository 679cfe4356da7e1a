mod cli;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use gf_av::{FfmpegEngine, ToolRegistry};
use gf_core::config::Config;
use gf_core::events::EventPayload;
use gifforge::{parse_frame_rate, Session};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "gifforge=trace,gf_av=debug,gf_core=debug".to_string()
        } else {
            "gifforge=info,gf_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Convert {
            input,
            fps,
            output,
            mime,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert(
                &input,
                fps.as_deref(),
                output,
                mime.as_deref(),
                cli.config.as_deref(),
            ))
        }
        Commands::CheckTools { json } => check_tools(cli.config.as_deref(), json),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("gifforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn convert(
    input: &Path,
    fps: Option<&str>,
    output: Option<PathBuf>,
    mime: Option<&str>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    for warning in config.validate() {
        tracing::warn!("{warning}");
    }

    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }

    let engine = Arc::new(FfmpegEngine::new(
        config.tools.clone(),
        config.engine.clone(),
    ));
    let session = Session::new(engine, &config);

    // Reject bad input before paying for engine startup.
    session
        .select_path(input, mime)
        .await
        .with_context(|| format!("Cannot use {}", input.display()))?;

    if let Some(raw) = fps {
        session.apply_settings(parse_frame_rate(raw).get() as i64);
    }

    eprintln!("{}", session.status());
    session.start().await.context("Failed to load engine")?;

    let mut events = session.subscribe();
    let conversion = session.convert();
    tokio::pin!(conversion);
    let result = loop {
        tokio::select! {
            result = &mut conversion => break result,
            Ok(event) = events.recv() => {
                if let EventPayload::JobProgress { percent, .. } = event.payload {
                    eprint!("\r{percent:>3}%");
                    let _ = std::io::stderr().flush();
                }
            }
        }
    };
    eprintln!("\r{}", session.status());
    let artifact = result?;

    let dest = match output {
        Some(p) if p.is_dir() => p.join(&config.conversion.output_file_name),
        Some(p) => p,
        None => PathBuf::from(&config.conversion.output_file_name),
    };
    let lease = session.handles().open(artifact.handle().id())?;
    let saved = lease.save_to(&dest).await?;

    println!("{} ({} bytes)", saved.display(), artifact.len());
    Ok(())
}

fn check_tools(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    let registry = ToolRegistry::discover(&config.tools);
    let tools = registry.check_all();

    if json {
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }

    println!("Checking external tools...\n");
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg to enable conversion.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            let config = Config::load(p)
                .with_context(|| format!("Failed to load config {}", p.display()))?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Frame rate: {}", config.conversion.default_frame_rate());
    println!(
        "  Scale: {}px ({})",
        config.conversion.scale_width, config.conversion.scale_flags
    );
    println!("  Output: {}", config.conversion.output_file_name);
    println!(
        "  Timeouts: load {}s, exec {}s",
        config.engine.load_timeout_secs, config.engine.exec_timeout_secs
    );

    let warnings = config.validate();
    for warning in &warnings {
        println!("  ⚠ {warning}");
    }

    Ok(())
}
