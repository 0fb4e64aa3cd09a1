//! The library code for the `pilcrow` static blog generator. A build has two
//! distinct phases:
//!
//! 1. Parsing every source document into a [`page::Page`]
//!    ([`crate::content`])
//! 2. Indexing the pages and rendering them to disk ([`crate::index`],
//!    [`crate::write`])
//!
//! The first phase finishes before the second begins, so the index is built
//! from the complete set of pages. Adding a page to the index resolves its
//! tags, creating one tag page per distinct tag. Once every page is in,
//! dated pages are grouped by year into archive pages and linked to their
//! neighbours.
//!
//! The second phase is read-only: each page is rendered through its template
//! with the site configuration, the site-wide listings, and its own fields
//! (see [`crate::value`]), and the most recently posted pages are written to
//! an Atom feed ([`crate::feed`]).

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod archive;
pub mod build;
pub mod config;
pub mod content;
pub mod feed;
pub mod files;
pub mod index;
pub mod markdown;
pub mod normalize;
pub mod page;
pub mod tag;
pub mod url;
pub mod util;
pub mod value;
pub mod write;
