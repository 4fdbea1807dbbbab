//! Download task handlers.

use bytesize::ByteSize;
use tabled::Tabled;

use nasdl_api::DownloadTask;

use crate::error::CliError;
use crate::output;

use super::Context;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub(crate) struct TaskRow {
    #[tabled(rename = "UUID")]
    uuid: String,
    #[tabled(rename = "File")]
    filename: String,
    #[tabled(rename = "Type")]
    dltype: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Folder")]
    folder: String,
}

impl From<&DownloadTask> for TaskRow {
    fn from(t: &DownloadTask) -> Self {
        Self {
            uuid: t.uuid.clone(),
            filename: t.filename.clone(),
            dltype: t.dltype.map(|d| d.to_string()).unwrap_or_default(),
            size: if t.filesize == 0 {
                "-".into()
            } else {
                ByteSize(t.filesize).to_string()
            },
            status: if t.downloading { "downloading" } else { "idle" }.into(),
            folder: t
                .sharedfoldername
                .clone()
                .unwrap_or_else(|| t.sharedfolderref.clone()),
        }
    }
}

pub(crate) fn render_tasks(ctx: &Context<'_>, tasks: &[DownloadTask]) -> String {
    output::render_list(
        &ctx.global.output,
        tasks,
        |t| TaskRow::from(t),
        |t| t.uuid.clone(),
    )
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn list(ctx: &Context<'_>) -> Result<(), CliError> {
    let tasks = ctx.target.check(ctx.client.list_tasks(ctx.options).await)?;
    output::print_output(&render_tasks(ctx, &tasks.data), ctx.global.quiet);
    Ok(())
}

pub async fn add(ctx: &Context<'_>, url: &str, folder: &str) -> Result<(), CliError> {
    let task = ctx
        .target
        .check(ctx.client.add_download(url, folder, ctx.options).await)?;

    let out = output::render_single(
        &ctx.global.output,
        &task,
        |t| format!("Queued {} ({})", t.filename, t.uuid),
        |t| t.uuid.clone(),
    );
    output::print_output(&out, ctx.global.quiet);
    Ok(())
}

pub async fn start(ctx: &Context<'_>, uuid: &str) -> Result<(), CliError> {
    ctx.target
        .check(ctx.client.start_task(uuid, ctx.options).await)?;
    output::print_ok(&format!("Started {uuid}"), ctx.color, ctx.global.quiet);
    Ok(())
}

pub async fn delete(ctx: &Context<'_>, uuid: &str) -> Result<(), CliError> {
    ctx.target
        .check(ctx.client.delete_task(uuid, ctx.options).await)?;
    output::print_ok(&format!("Deleted {uuid}"), ctx.color, ctx.global.quiet);
    Ok(())
}
