use anyhow::{Context, Result};
use clap::Parser;
use qs_translator::{
    AudioInputFactory, AudioPlayer, AudioSinkFactory, BackendFactory, Config, ConsoleDriver,
    ConsoleSink, EventLogSink, EventSink, FanoutSink, QuitReason, TranslationSession,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// Live speech translation from the console
#[derive(Debug, Parser)]
#[command(name = "qs-translator", version)]
struct Cli {
    /// Config file, without extension
    #[arg(long, default_value = "config/qs-translator")]
    config: String,

    /// Also write every event as JSON lines to this file
    #[arg(long)]
    record_events: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;
    let session_config = cfg
        .session_config()
        .context("Invalid translation settings")?;

    info!(
        "Translating {} -> {} (voice: {})",
        session_config.source_language(),
        session_config.target_languages().join(", "),
        session_config.synthesis_voice().unwrap_or("none")
    );

    let backend = BackendFactory::create(cfg.backend_kind()?, &session_config)?;
    let input = AudioInputFactory::create(cfg.audio.source(), cfg.audio.input_config())?;
    let player = AudioPlayer::spawn(AudioSinkFactory::create(
        cfg.audio.output(),
        cfg.audio.sample_rate,
    )?);

    let console: Arc<dyn EventSink> = Arc::new(
        ConsoleSink::stdout(session_config.source_language()).with_playback(player.handle()),
    );
    let sink: Arc<dyn EventSink> = match &cli.record_events {
        Some(path) => Arc::new(
            FanoutSink::new()
                .with(console)
                .with(Arc::new(EventLogSink::create(path)?)),
        ),
        None => console,
    };

    let session = TranslationSession::new(session_config, backend, input);

    println!("Say something...");
    session
        .start(sink)
        .await
        .context("Failed to start translation")?;

    let outcome = wait_for_quit().await;

    // Stop regardless of how the wait ended
    let stats = session.stop().await;
    match player.shutdown().await {
        Ok(playback) => info!(
            "Playback finished: {} utterances, {} bytes",
            playback.utterances, playback.bytes
        ),
        Err(e) => error!("Playback shutdown failed: {:#}", e),
    }

    info!(
        "Session {} ran {:.1}s: {} partial, {} final, {} no-match, {} canceled",
        stats.session_id,
        stats.duration_secs,
        stats.partial_results,
        stats.final_results,
        stats.no_matches,
        stats.cancellations
    );
    if let Some(details) = &stats.last_error {
        warn!("Last service error: {}", details);
    }

    outcome.map(|_| ())
}

/// Block on console input in its own thread until the user quits or Ctrl-C
async fn wait_for_quit() -> Result<QuitReason> {
    let (quit_tx, quit_rx) = oneshot::channel();

    // Detached: a pending stdin read must not keep the process alive
    std::thread::spawn(move || {
        let driver = ConsoleDriver::new(io::stdin().lock(), io::stdout());
        let outcome = driver.run(|| info!("Quit requested, stopping session"));
        let _ = quit_tx.send(outcome);
    });

    tokio::select! {
        outcome = quit_rx => {
            let reason = outcome
                .context("Console reader exited unexpectedly")?
                .context("Failed to read console input")?;
            info!("Console loop ended: {:?}", reason);
            Ok(reason)
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("Interrupted");
            Ok(QuitReason::Command)
        }
    }
}
