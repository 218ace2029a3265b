//! Support for creating Atom feeds from a list of posts.

use crate::config::Author;
use crate::post::Post;
use atom_syndication::{Category, Entry, Error as AtomError, Feed, Link, Person, Text};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use std::fmt;
use std::io::Write;
use url::Url;

/// Bundled configuration for creating a feed.
pub struct FeedConfig {
    pub title: String,
    pub subtitle: String,
    pub id: String,
    pub author: Author,
    pub home_page: Url,
}

/// Creates a feed from some configuration ([`FeedConfig`]) and a list of
/// [`Post`]s (already filtered and sorted, newest first) and writes the result
/// to a [`std::io::Write`]. This function takes ownership of the provided
/// [`FeedConfig`].
pub fn write_feed<W: Write>(config: FeedConfig, posts: &[Post], w: W) -> Result<()> {
    feed(config, posts).write_to(w)?;
    Ok(())
}

fn feed(config: FeedConfig, posts: &[Post]) -> Feed {
    Feed {
        entries: posts.iter().map(|p| feed_entry(&config, p)).collect(),
        title: Text::from(config.title.as_str()),
        subtitle: match config.subtitle.is_empty() {
            true => None,
            false => Some(Text::from(config.subtitle.as_str())),
        },
        id: config.id.clone(),
        // newest post, never the build time
        updated: posts
            .iter()
            .map(|p| p.effective_date())
            .max()
            .unwrap_or_else(epoch),
        authors: vec![person(&config.author, None)],
        links: vec![Link {
            href: config.home_page.to_string(),
            rel: "alternate".to_string(),
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn feed_entry(config: &FeedConfig, post: &Post) -> Entry {
    let (summary, summarized) = post.summary();
    Entry {
        id: post.url.to_string(),
        title: Text::from(post.data.title.as_str()),
        updated: post.effective_date(),
        published: Some(post.data.pub_datetime),
        authors: vec![person(&config.author, post.data.author.as_deref())],
        links: vec![Link {
            href: post
                .data
                .canonical_url
                .as_ref()
                .unwrap_or(&post.url)
                .to_string(),
            rel: "alternate".to_owned(),
            ..Default::default()
        }],
        summary: Some(match summarized {
            true => Text::html(summary),
            false => Text::plain(post.data.description.as_str()),
        }),
        categories: post
            .tags
            .iter()
            .map(|t| Category {
                term: t.slug.clone(),
                label: Some(t.name.clone()),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

/// The site author, unless the post names its own.
fn person(site_author: &Author, post_author: Option<&str>) -> Person {
    match post_author {
        Some(name) if name != site_author.name => Person {
            name: name.to_owned(),
            ..Default::default()
        },
        _ => Person {
            name: site_author.name.clone(),
            email: site_author.email.clone(),
            ..Default::default()
        },
    }
}

fn epoch() -> DateTime<FixedOffset> {
    DateTime::<Utc>::from(std::time::UNIX_EPOCH).with_timezone(&Utc.fix())
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed. Variants inlude I/O and Atom issues.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is a generic I/O error.
    Io(std::io::Error),

    /// Returned when there is an Atom-related error.
    Atom(AtomError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Atom(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Atom(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator in fallible feed operations.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<AtomError> for Error {
    /// Converts [`AtomError`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: AtomError) -> Error {
        Error::Atom(err)
    }
}
