// `folio open`: open a document and record it as the last open one.

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use folio_common::frontmatter;
use folio_common::types::{ContentFormat, ContentItem};
use serde::Serialize;

use super::{item_at, Context};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct OpenArgs {
    /// Document file, or bundle folder holding index.md.
    pub path: PathBuf,

    /// Print the document text as well.
    #[arg(long)]
    content: bool,
}

#[derive(Debug, Serialize)]
pub struct OpenResult {
    pub path: PathBuf,
    pub format: ContentFormat,
    pub section: Option<String>,
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl OpenResult {
    pub fn new(item: &ContentItem, text: &str, with_content: bool) -> Self {
        let frontmatter = frontmatter::parse(text);
        Self {
            path: item.path().to_path_buf(),
            format: item.format(),
            section: item.section().map(str::to_owned),
            title: frontmatter.as_ref().and_then(|fm| fm.title()),
            date: frontmatter.as_ref().and_then(|fm| fm.date()),
            content: with_content.then(|| text.to_string()),
        }
    }
}

pub fn run(args: OpenArgs, ctx: &Context, format: OutputFormat) -> Result<()> {
    let root = ctx.workspace_root();
    let item = item_at(&args.path, root.as_deref())?;

    let mut session = ctx.session(ctx.config.editor.auto_rename);
    session.open_item(item.clone())?;

    let result = OpenResult::new(&item, session.buffer(), args.content);
    output::print_output(format, &result, format_human)?;
    Ok(())
}

pub fn format_human(result: &OpenResult) -> String {
    let mut lines = vec![format!("Opened: {}", result.path.display())];
    if let Some(section) = &result.section {
        lines.push(format!("Section: {section}"));
    }
    if let Some(title) = &result.title {
        lines.push(format!("Title: {title}"));
    }
    if let Some(date) = result.date {
        lines.push(format!("Date: {date}"));
    }
    if let Some(content) = &result.content {
        lines.push(String::new());
        lines.push(content.clone());
    }
    lines.join("\n")
}
