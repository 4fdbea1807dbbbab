//! Connection test, plugin info, and shared folder handlers.

use tabled::Tabled;

use nasdl_api::{Plugin, SharedFolder};
use nasdl_core::NasClient;

use crate::error::CliError;
use crate::output;

use super::Context;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct FolderRow {
    #[tabled(rename = "UUID")]
    uuid: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&SharedFolder> for FolderRow {
    fn from(f: &SharedFolder) -> Self {
        Self {
            uuid: f.uuid.clone(),
            name: f.name.clone(),
            path: f.reldirpath.clone(),
            description: f.description.clone(),
        }
    }
}

#[derive(Tabled)]
struct PluginRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Installed")]
    installed: String,
    #[tabled(rename = "Summary")]
    summary: String,
}

impl From<&Plugin> for PluginRow {
    fn from(p: &Plugin) -> Self {
        Self {
            name: p.name.clone(),
            version: p.version.clone(),
            installed: if p.installed { "yes" } else { "no" }.into(),
            summary: p.summary.clone(),
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────────

/// Log in with a throwaway session and report the result.
pub async fn test(ctx: &Context<'_>) -> Result<(), CliError> {
    let settings = ctx.client.session().settings();
    let login = ctx
        .target
        .check(NasClient::test_connection(ctx.transport, settings).await)?;

    if login.authenticated {
        output::print_ok(
            &format!("Logged in to {} as {}", ctx.target.url, login.username),
            ctx.color,
            ctx.global.quiet,
        );
    } else if !ctx.global.quiet {
        eprintln!("{} answered, but did not authenticate the session", ctx.target.url);
    }
    Ok(())
}

pub async fn folders(ctx: &Context<'_>) -> Result<(), CliError> {
    let folders = ctx
        .target
        .check(ctx.client.list_shared_folders(ctx.options).await)?;
    let out = output::render_list(
        &ctx.global.output,
        &folders,
        |f| FolderRow::from(f),
        |f| f.uuid.clone(),
    );
    output::print_output(&out, ctx.global.quiet);
    Ok(())
}

pub async fn info(ctx: &Context<'_>) -> Result<(), CliError> {
    let plugins = ctx
        .target
        .check(ctx.client.downloader_info(ctx.options).await)?;
    let out = output::render_list(
        &ctx.global.output,
        &plugins.data,
        |p| PluginRow::from(p),
        |p| format!("{} {}", p.name, p.version),
    );
    output::print_output(&out, ctx.global.quiet);
    Ok(())
}
