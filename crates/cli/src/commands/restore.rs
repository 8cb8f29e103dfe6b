// `folio restore`: reopen the last document if it is still inside the
// granted workspace.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use folio_common::types::ContentFormat;
use folio_session::fs::LocalFileSystem;
use folio_session::grant::PathGrantResolver;
use folio_session::restore::SessionRestorer;
use serde::Serialize;

use super::{block_on, Context};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct RestoreArgs {}

#[derive(Debug, Serialize)]
pub struct RestoreResult {
    pub restored: bool,
    pub path: Option<PathBuf>,
    pub format: Option<ContentFormat>,
    pub section: Option<String>,
    /// Why nothing was restored.
    pub reason: Option<String>,
}

impl RestoreResult {
    fn skipped(reason: impl Into<String>) -> Self {
        Self { restored: false, path: None, format: None, section: None, reason: Some(reason.into()) }
    }
}

pub fn run(_args: RestoreArgs, ctx: &Context, format: OutputFormat) -> Result<()> {
    if !ctx.config.session.restore_last {
        let result = RestoreResult::skipped("disabled by session.restore_last");
        output::print_output(format, &result, format_human)?;
        return Ok(());
    }

    let restorer = SessionRestorer::new(
        ctx.store.clone(),
        Arc::new(PathGrantResolver::new()),
        Arc::new(LocalFileSystem),
    );
    let mut session = ctx.session(ctx.config.editor.auto_rename);

    let result = match block_on(restorer.try_restore())? {
        Ok(restored) => {
            session.open_restored(restored)?;
            let item = session.current_item();
            RestoreResult {
                restored: true,
                path: item.map(|item| item.path().to_path_buf()),
                format: item.map(|item| item.format()),
                section: item.and_then(|item| item.section().map(str::to_owned)),
                reason: None,
            }
        }
        Err(reason) => RestoreResult::skipped(reason.to_string()),
    };
    output::print_output(format, &result, format_human)?;
    Ok(())
}

fn format_human(result: &RestoreResult) -> String {
    match (&result.path, &result.reason) {
        (Some(path), _) => format!("Restored {}", path.display()),
        (None, Some(reason)) => format!("Nothing restored: {reason}"),
        (None, None) => "Nothing restored".to_string(),
    }
}
