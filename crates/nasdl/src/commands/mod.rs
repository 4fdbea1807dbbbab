//! Command dispatch: bridges CLI args -> `NasClient` calls -> output formatting.

pub mod poll;
pub mod system;
pub mod tasks;

use nasdl_api::TransportConfig;
use nasdl_config::Defaults;
use nasdl_core::{NasClient, RequestOptions};

use crate::cli::{Command, GlobalOpts};
use crate::error::{CliError, Target};

/// Everything a command handler needs.
pub struct Context<'a> {
    pub client: &'a NasClient,
    pub transport: &'a TransportConfig,
    pub target: &'a Target,
    pub global: &'a GlobalOpts,
    pub defaults: &'a Defaults,
    pub color: bool,
    pub options: RequestOptions,
}

/// Dispatch a command to its handler.
pub async fn dispatch(cmd: Command, ctx: &Context<'_>) -> Result<(), CliError> {
    match cmd {
        Command::Test => system::test(ctx).await,
        Command::Tasks => tasks::list(ctx).await,
        Command::Add { url, folder } => tasks::add(ctx, &url, &folder).await,
        Command::Start { uuid } => tasks::start(ctx, &uuid).await,
        Command::Delete { uuid } => tasks::delete(ctx, &uuid).await,
        Command::Folders => system::folders(ctx).await,
        Command::Info => system::info(ctx).await,
        Command::Poll { interval } => poll::run(ctx, interval).await,
    }
}
