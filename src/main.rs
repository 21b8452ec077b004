use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use vocala::{
    run_section, ApiClient, ClockedPlayer, Config, QuestionDefaults, QuestionSet, QuestionSource,
    SessionEvent, SessionOptions, SilenceSource,
};

/// Administer one section of a spoken-response assessment
#[derive(Debug, Parser)]
struct Args {
    /// Path to the configuration file
    #[arg(long, default_value = "config/vocala")]
    config: String,

    /// Test identifier on the assessment backend
    test_id: String,

    /// Section type within the test (e.g. "repeat")
    section: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} starting", cfg.service.name);
    info!("Backend: {}", cfg.api.base_url);

    let defaults = QuestionDefaults {
        time_limit_secs: cfg.session.time_limit_secs,
        replay_allowance: cfg.session.replay_allowance,
        post_prompt_delay: Duration::from_secs(cfg.session.post_prompt_delay_secs),
    };
    let client = Arc::new(ApiClient::new(cfg.api.base_url.clone(), defaults));

    let set = client
        .fetch_questions(&args.test_id, &args.section)
        .await
        .context("Failed to load the question set")?;

    // Fetch prompt audio up front so playback can probe local files
    let prompt_dir = std::env::temp_dir().join("vocala-prompts");
    tokio::fs::create_dir_all(&prompt_dir)
        .await
        .context("Failed to create prompt cache dir")?;
    let mut localized = Vec::with_capacity(set.len());
    for question in set.iter() {
        let path = client.download_prompt(&question.id, &prompt_dir).await?;
        let mut question = question.clone();
        question.prompt.audio = Some(path.display().to_string());
        localized.push(question);
    }
    let set = QuestionSet::new(localized);

    let (event_tx, mut event_rx) = mpsc::channel(64);
    let observer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                SessionEvent::Tick { remaining_secs } => info!("{}s remaining", remaining_secs),
                SessionEvent::SubmissionWarning(reason) => warn!("Submission warning: {}", reason),
                other => info!("{:?}", other),
            }
        }
    });

    let sample_rate = cfg.audio.sample_rate;
    let channels = cfg.audio.channels;
    // Batch runs have no user to press play; the shipped config enables
    // auto-start and there is no interactive command source to wait on.
    if !cfg.session.auto_start {
        warn!("auto_start is disabled; batch runs send no Start command");
    }
    let options = SessionOptions {
        auto_start: cfg.session.auto_start,
    };

    let report = run_section(
        set,
        options,
        client,
        |_| Box::new(ClockedPlayer::new()),
        |_| Box::new(SilenceSource::new(sample_rate, channels)),
        event_tx,
    )
    .await?;

    observer.await.ok();

    info!(
        "Section finished: {} answered, {} skipped",
        report.outcomes.len(),
        report.skipped.len()
    );
    for outcome in &report.outcomes {
        info!(
            "  {}: completed={} replays={}{}",
            outcome.question_id,
            outcome.completed,
            outcome.replays_used,
            outcome
                .submission_warning
                .as_deref()
                .map(|w| format!(" warning={}", w))
                .unwrap_or_default()
        );
    }
    for id in &report.skipped {
        warn!("  {}: skipped after error", id);
    }

    Ok(())
}
