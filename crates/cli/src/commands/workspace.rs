// `folio workspace`: choose the workspace folder and store an access grant for it.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use folio_session::grant::PathGrantResolver;
use serde::Serialize;

use super::Context;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct WorkspaceArgs {
    /// Workspace folder.
    pub dir: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct WorkspaceResult {
    pub root: PathBuf,
}

pub fn run(args: WorkspaceArgs, ctx: &Context, format: OutputFormat) -> Result<()> {
    let root = ctx.store.grant_workspace(&PathGrantResolver::new(), &args.dir)?;
    output::print_output(format, &WorkspaceResult { root }, format_human)?;
    Ok(())
}

fn format_human(result: &WorkspaceResult) -> String {
    format!("Workspace: {}", result.root.display())
}
