// `folio save`: replace a document's text and save it, renaming the file
// to `{date}-{slug}{ext}` when auto-rename is on.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;

use super::{item_at, Context};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct SaveArgs {
    /// Document file, or bundle folder holding index.md.
    pub path: PathBuf,

    /// Read the new text from this file instead of stdin.
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Rename after saving even if `editor.auto_rename` is off.
    #[arg(long)]
    auto_rename: bool,
}

#[derive(Debug, Serialize)]
pub struct SaveResult {
    pub path: PathBuf,
    pub renamed_from: Option<PathBuf>,
    pub bytes: usize,
}

pub fn run(args: SaveArgs, ctx: &Context, format: OutputFormat) -> Result<()> {
    let text = match &args.input {
        Some(input) => std::fs::read_to_string(input)
            .with_context(|| format!("failed to read `{}`", input.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text).context("failed to read stdin")?;
            text
        }
    };

    let root = ctx.workspace_root();
    let item = item_at(&args.path, root.as_deref())?;
    let mut session = ctx.session(args.auto_rename || ctx.config.editor.auto_rename);
    session.open_item(item)?;
    session.update_content(text)?;
    let report = session.save()?;

    if let Some(error) = &report.rename_error {
        output::print_warning(format, "RENAME_FAILED", &format!("{error}; kept the current name"));
    }

    let result = SaveResult {
        path: report.path,
        renamed_from: report.renamed_from,
        bytes: session.buffer().len(),
    };
    output::print_output(format, &result, format_human)?;
    Ok(())
}

fn format_human(result: &SaveResult) -> String {
    match &result.renamed_from {
        Some(from) => format!("Saved {} (renamed from {})", result.path.display(), from.display()),
        None => format!("Saved {}", result.path.display()),
    }
}
