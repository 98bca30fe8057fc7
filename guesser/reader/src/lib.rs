#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Reference collaborators for the feedback engine: HTTP reader, HTML text extraction,
//! tokenizer, browser opener and link file.

/// HTML content extraction.
#[path = "../extract.rs"]
pub mod extract;

/// Content tokenizer.
#[path = "../tokenize.rs"]
pub mod tokenize;

/// HTTP document reader.
#[path = "../fetch.rs"]
pub mod fetch;

/// Browser opener.
#[path = "../opener.rs"]
pub mod opener;

/// JSON link file.
#[path = "../links.rs"]
pub mod links;

pub use extract::extract_text;
pub use fetch::HttpDocumentReader;
pub use links::JsonLinkSource;
pub use opener::SystemOpener;
pub use tokenize::{Tokenizer, DEFAULT_MIN_TOKEN_LEN};
