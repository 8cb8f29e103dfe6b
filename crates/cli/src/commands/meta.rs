// `folio meta`: show a document's frontmatter and the name auto-rename
// would give it.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use folio_common::frontmatter::{self, Frontmatter};
use folio_common::slug::slugify;
use folio_session::rename::canonical_file_name;
use serde::Serialize;

use super::item_at;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct MetaArgs {
    /// Document file, or bundle folder holding index.md.
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct MetaResult {
    pub path: PathBuf,
    pub frontmatter: Option<Frontmatter>,
    /// `{date}-{slug}{ext}` when the frontmatter has a date and a slug or title.
    pub canonical_name: Option<String>,
}

pub fn run(args: MetaArgs, format: OutputFormat) -> Result<()> {
    let item = item_at(&args.path, None)?;
    let document = item.document_path();
    let text = std::fs::read_to_string(&document)
        .with_context(|| format!("failed to read `{}`", document.display()))?;
    let frontmatter = frontmatter::try_parse(&text)
        .with_context(|| format!("`{}` has malformed frontmatter", document.display()))?;

    let canonical_name = frontmatter.as_ref().and_then(|fm| {
        let date = fm.date()?;
        let slug = slugify(&fm.slug().or_else(|| fm.title())?);
        Some(canonical_file_name(date, &slug, item.extension()).to_string_lossy().into_owned())
    });

    let result = MetaResult { path: item.path().to_path_buf(), frontmatter, canonical_name };
    output::print_output(format, &result, format_human)?;
    Ok(())
}

fn format_human(result: &MetaResult) -> String {
    let Some(frontmatter) = &result.frontmatter else {
        return format!("{}: no frontmatter", result.path.display());
    };
    let mut lines: Vec<String> =
        frontmatter.iter().map(|(key, value)| format!("{key}: {value}")).collect();
    if let Some(name) = &result.canonical_name {
        lines.push(format!("canonical name: {name}"));
    }
    lines.join("\n")
}
