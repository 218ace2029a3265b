//! The library code for the `quire` static blog builder. The architecture
//! can be generally broken down into three distinct steps:
//!
//! 1. Loading posts from source files on disk ([`crate::parser`])
//! 2. Ordering and grouping them ([`crate::sort`], [`crate::group`])
//! 3. Converting the posts into output files on disk ([`crate::write`],
//!    [`crate::feed`])
//!
//! Every post gets a canonical path derived from its id
//! ([`crate::path::derive_path`]): `articles/my-post.md` is served at
//! `/blog/my-post`. Because only the last segment of the id survives, the
//! build refuses to proceed when two published posts derive the same path.
//!
//! Posts are ordered by effective date, newest first: the modification date
//! when it is later than the publication date, the publication date
//! otherwise. Ties fall back to the id so every build produces the same
//! order. Listing pages are then built from that order: the main index, one
//! index per tag (a post appears under each of its tags) and an archive
//! grouped by year and month. Each index is paginated into groups of pages
//! based on a configurable number of posts per page.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod feed;
pub mod group;
pub mod links;
pub mod markdown;
pub mod parser;
pub mod path;
pub mod post;
pub mod sort;
pub mod tag;
pub mod write;
