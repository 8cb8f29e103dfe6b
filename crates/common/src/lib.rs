// folio-common: pure building blocks shared by the Folio crates.

pub mod frontmatter;
pub mod path;
pub mod slug;
pub mod types;
