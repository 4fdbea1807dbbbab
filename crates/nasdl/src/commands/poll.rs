//! `nasdl poll`: keep the task list fresh until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use nasdl_core::{CachedTasks, TaskFetchFailure, TaskPoller};

use crate::error::CliError;
use crate::output;

use super::Context;
use super::tasks::render_tasks;

pub async fn run(ctx: &Context<'_>, interval: Option<u64>) -> Result<(), CliError> {
    let interval = Duration::from_secs(interval.unwrap_or(ctx.defaults.poll_interval).max(1));
    let poller = Arc::new(TaskPoller::new(ctx.client.clone()));
    let cancel = CancellationToken::new();

    let runner = {
        let poller = Arc::clone(&poller);
        let cancel = cancel.clone();
        tokio::spawn(async move { poller.run(interval, cancel).await })
    };

    let mut updates = poller.subscribe();
    let mut last_shown = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                cancel.cancel();
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                // Each poll publishes twice: once on start, once on completion.
                if snapshot.last_completed.is_none() || snapshot.last_completed == last_shown {
                    continue;
                }
                last_shown = snapshot.last_completed;
                show(ctx, &snapshot);
            }
        }
    }

    if let Err(err) = runner.await {
        debug!(error = %err, "poller task ended abnormally");
    }
    Ok(())
}

fn show(ctx: &Context<'_>, snapshot: &CachedTasks) {
    if let Some(ref failure) = snapshot.failure {
        let reason = match failure {
            TaskFetchFailure::MissingConfig => "profile is missing its hostname or username",
            TaskFetchFailure::LoginRequired => "no password available; use --ask-password",
            TaskFetchFailure::Message(message) => message.as_str(),
        };
        eprintln!("{} poll failed: {reason}", Local::now().format("%H:%M:%S"));
        return;
    }

    if !ctx.global.quiet {
        eprintln!(
            "{} {} task(s)",
            Local::now().format("%H:%M:%S"),
            snapshot.tasks.len()
        );
    }
    output::print_output(&render_tasks(ctx, &snapshot.tasks), ctx.global.quiet);
}
