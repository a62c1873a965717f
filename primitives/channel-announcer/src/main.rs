use anyhow::Context;
use channel_announcer::{Args, ReconcileReport, SlackPlatform, SqlSeenStore, run_once};
use clap::Parser;
use slack_common::SlackClient;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: &Args) -> anyhow::Result<ReconcileReport> {
    let client = SlackClient::new(args.slack_config()).context("failed to build Slack client")?;
    let platform = SlackPlatform::new(client, args.exclude_archived);

    let store = SqlSeenStore::connect(&args.database_url)
        .await
        .context("failed to connect to seen-set store")?;

    let result = run_once(&platform, &store, &platform, &args.post_target()).await;
    store.close().await;

    Ok(result?)
}

// Sequential by construction; no work is ever spawned.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args.log_level);

    match run(&args).await {
        Ok(report) => {
            info!(
                seen_before = report.seen_before,
                newly_recorded = report.newly_recorded,
                errors = report.error_count(),
                failed = ?report.failed_channel_ids(),
                "reconciliation finished"
            );

            if report.is_failed_run() {
                error!("every new channel failed and none were processed successfully");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
