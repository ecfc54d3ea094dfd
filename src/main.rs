use anyhow::Result;
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use stenogram::cli::{Cli, Commands};
use stenogram::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            if let Err(e) = run_session(cli).await {
                eprintln!("{}", format!("Error: {e}").red());
                std::process::exit(1);
            }
        }
        Some(Commands::Devices) => {
            list_audio_devices()?;
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "stenogram",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/stenogram/config.toml)
/// 3. Built-in defaults
fn load_config(custom_path: Option<&std::path::Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path)?
    } else {
        Config::load_or_default(&default_config_path())?
    };
    Ok(config)
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stenogram")
        .join("config.toml")
}

/// List available audio input devices.
#[cfg(feature = "cpal-audio")]
fn list_audio_devices() -> Result<()> {
    let devices = stenogram::audio::list_devices()?;

    if devices.is_empty() {
        eprintln!("No audio input devices found");
        std::process::exit(1);
    }

    println!("Available audio input devices:");
    for (idx, device) in devices.iter().enumerate() {
        println!("  [{}] {}", idx, device);
    }

    Ok(())
}

#[cfg(not(feature = "cpal-audio"))]
fn list_audio_devices() -> Result<()> {
    anyhow::bail!("this build has no audio backend (cpal-audio feature disabled)")
}

#[cfg(not(feature = "cpal-audio"))]
async fn run_session(_cli: Cli) -> Result<()> {
    anyhow::bail!("this build has no audio backend (cpal-audio feature disabled)")
}

/// Record, transcribe, and summarize until interrupted.
#[cfg(feature = "cpal-audio")]
async fn run_session(cli: Cli) -> Result<()> {
    use std::sync::Arc;
    use stenogram::audio::CpalAudioSource;
    use stenogram::pipeline::events::{ShutdownToken, StderrReporter};
    use stenogram::session::{SessionContext, SessionManager};
    use stenogram::stt::{check_model_dir, VoskConfig, VoskRecognizer};
    use stenogram::summary::build_summarizer;

    let mut config = load_config(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    // Fail on a missing model before the audio device is opened.
    check_model_dir(&config.recognizer.model_path)?;
    let recognizer = VoskRecognizer::new(VoskConfig {
        model_path: config.recognizer.model_path.clone(),
        sample_rate: config.audio.sample_rate,
    })?;

    let source = CpalAudioSource::new(
        config.audio.mic_device_name.as_deref(),
        config.audio.sample_rate,
        config.audio.channels,
    )?;

    let (summarizer, warning) = build_summarizer(&config);
    if let Some(warning) = warning {
        eprintln!("{}", warning.yellow());
    }

    let context = SessionContext::create(&config)?;

    if !cli.quiet {
        println!("Session:    {}", context.session_id);
        println!("Output:     {}", context.folder.display());
        println!("Device:     {}", source.device_name());
        println!("Summarizer: {}", summarizer.mode());
        match config.auto_summary_interval() {
            Some(interval) => println!(
                "Summaries:  every {} plus one at session end",
                humantime::format_duration(interval)
            ),
            None => println!("Summaries:  at session end"),
        }
        if cli.verbose >= 1 {
            println!(
                "Audio:      {} Hz, {} ch, {} ms blocks, queue of {}",
                config.audio.sample_rate,
                config.audio.channels,
                config.audio.block_duration_ms,
                config.audio.queue_capacity_blocks
            );
            println!("Model:      {}", config.recognizer.model_path.display());
        }
        println!();
        println!("Recording. Press Ctrl+C to stop.");
    }

    let token = ShutdownToken::new();
    {
        let token = token.clone();
        let quiet = cli.quiet;
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() && token.request_stop() && !quiet {
                eprintln!("\nStopping...");
            }
        });
    }

    let reporter = Arc::new(StderrReporter::new(cli.quiet));
    let manager = SessionManager::new(context, token, reporter);
    let outcome = tokio::task::spawn_blocking(move || {
        manager.run(Box::new(source), Box::new(recognizer), summarizer)
    })
    .await??;

    if !cli.quiet {
        println!();
        println!("{}", "Session complete".green());
        println!("Transcript: {}", outcome.transcript_path.display());
        if let Some(summary) = &outcome.summary_path {
            println!("Summary:    {}", summary.display());
        }
        println!(
            "Captured {} blocks ({} segments, {} words) in {}",
            outcome.blocks_captured,
            outcome.segments,
            outcome.words,
            humantime::format_duration(std::time::Duration::from_secs(
                outcome.duration_seconds.max(0) as u64
            ))
        );
        if outcome.blocks_dropped > 0 {
            eprintln!(
                "{}",
                format!(
                    "{} blocks were dropped; transcription fell behind capture",
                    outcome.blocks_dropped
                )
                .yellow()
            );
        }
    }

    Ok(())
}
