//! Helpers for pointing internal links at their extension-qualified resources.
//!
//! The rewrite rules are a pure string transform so they can be tested in isolation, while
//! [`HrefRewriter`] applies them to caller-provided [`LinkElement`] handles. The HTML and site
//! passes build on the same two pieces.

mod links;
mod rules;

pub use links::{HrefRewriter, LinkElement};
pub use rules::{HTML_EXTENSION, INDEX_DOCUMENT, split_fragment, transform_href};
