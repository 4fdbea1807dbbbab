mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use secrecy::SecretString;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use nasdl_api::ConnectionFailure;
use nasdl_api::messages::describe_outcome;
use nasdl_core::{LogoutOutcome, NasClient, RequestOptions};

use crate::cli::Cli;
use crate::commands::Context;
use crate::error::{CliError, Target};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let cfg = nasdl_config::load_config()?;

    let (profile_name, profile) = match cfg.profile(cli.global.profile.as_deref()) {
        Ok(found) => found,
        Err(_) if cfg.profiles.is_empty() => {
            return Err(CliError::NoConfig {
                path: nasdl_config::config_path().display().to_string(),
            });
        }
        Err(err) => return Err(err.into()),
    };

    let mut settings = profile.connection_settings(&profile_name);
    if cli.global.ask_password {
        let password = prompt_password(&profile_name)?;
        if profile.remember_password {
            if let Err(err) = nasdl_config::store_password(&profile_name, &password) {
                warn!(error = %err, "could not store password in keyring");
            }
        }
        settings.password = Some(password);
    }

    let transport = profile.transport_config(&cfg.defaults);
    let target = Target {
        url: settings.base_url.clone().unwrap_or_default(),
        profile: profile_name,
    };
    let color = output::should_color(&cli.global.color);

    let client = NasClient::new(&transport, settings).map_err(|err| {
        CliError::from_connection_failure(
            ConnectionFailure::from_error(err),
            &target.url,
            &target.profile,
        )
    })?;

    let ctx = Context {
        client: &client,
        transport: &transport,
        target: &target,
        global: &cli.global,
        defaults: &cfg.defaults,
        color,
        options: RequestOptions::default(),
    };

    debug!(command = ?cli.command, "dispatching command");
    let result = commands::dispatch(cli.command, &ctx).await;
    end_session(&client).await;
    result
}

fn prompt_password(profile: &str) -> Result<SecretString, CliError> {
    let password = rpassword::prompt_password(format!("Password for profile '{profile}': "))?;
    Ok(SecretString::from(password))
}

/// Log out so the NAS does not keep an idle session around.
async fn end_session(client: &NasClient) {
    match client.logout(RequestOptions::default()).await {
        LogoutOutcome::NotLoggedIn => {}
        LogoutOutcome::Completed(outcome) => {
            if let Some(reason) = describe_outcome(&outcome) {
                debug!(%reason, "logout failed");
            }
        }
    }
}
