pub mod normalize;

pub use normalize::{is_within, normalize_lexical, section_of};
