//! Resolve a directory of JSON "view" documents (includes, templates,
//! wrappers and delegates) and infer one structural type per view.
//!
//! ```no_run
//! let model = json_views::corpus::Corpus::build("site/", Default::default())?;
//! for view in &model.views {
//!     println!("{} ({} fields)", view.name, view.fields.len());
//! }
//! # Ok::<(), json_views::error::PhaseError>(())
//! ```
pub mod cli;
pub mod config;
pub mod corpus;
pub mod error;
pub mod inference;
pub mod ir;
pub mod location;
pub mod logging;
pub mod lower;
pub mod parser;
pub mod path_de;
pub mod paths;
pub mod resolve;
pub mod special;
pub mod value;

#[cfg(test)]
pub mod test_utils;

pub use corpus::{Corpus, Options};
pub use error::{Error, ErrorKind, Phase, PhaseError};
pub use ir::Model;
