//! Weighted text index over product fields.
//!
//! Queries are parsed into positive terms, negated terms and quoted phrases
//! (`tokenizer`, `query`) and matched whole-token, case-insensitively,
//! against `title`, `brand` and `description`. Each field carries a weight
//! that biases the relevance score toward matches in that field (`index`).

pub mod index;
pub mod query;
pub mod tokenizer;

pub use index::{FieldWeight, WeightedTextIndex, PRODUCT_TEXT_INDEX};
pub use query::TextQuery;
pub use tokenizer::tokenize;
