//! Text folding shared by the link classifier and the metadata extractor.

mod normalizer;

pub use normalizer::{contains_phrase, contains_token_sequence, normalize, tokens};
