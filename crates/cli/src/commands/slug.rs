// `folio slug`: print the slug a title produces.

use anyhow::Result;
use clap::Args;
use folio_common::slug::slugify;
use serde::Serialize;

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct SlugArgs {
    /// Title text; multiple words are joined with spaces.
    #[arg(required = true)]
    pub text: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SlugResult {
    text: String,
    slug: String,
}

pub fn run(args: SlugArgs, format: OutputFormat) -> Result<()> {
    let text = args.text.join(" ");
    let result = SlugResult { slug: slugify(&text), text };
    output::print_output(format, &result, |r| r.slug.clone())?;
    Ok(())
}
