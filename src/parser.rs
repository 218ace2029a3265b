//! Defines the [`Parser`] and [`Error`] types: the logic for loading posts
//! from the file system into memory.

use std::{
    collections::HashMap,
    fmt,
    fs::File,
    path::{Path, PathBuf},
};

use url::Url;
use walkdir::{DirEntry, WalkDir};

use crate::markdown;
use crate::path::{derive_path, id_from_source, MARKDOWN_EXTENSIONS};
use crate::post::{Frontmatter, Post};
use crate::tag::Tag;

/// Parses [`Post`] objects from source files.
pub struct Parser<'a> {
    /// The site's root URL; post URLs are `{site_url}{post_path}/`.
    site_url: &'a Url,

    /// The base URL for tag pages (i.e., the first page for a tag is
    /// `{tags_url}/{tag_slug}/`).
    tags_url: Url,
}

impl<'a> Parser<'a> {
    /// Constructs a new parser. `site_url` should end in a trailing slash.
    pub fn new(site_url: &'a Url) -> Result<Parser<'a>> {
        Ok(Parser {
            site_url,
            tags_url: site_url.join("tags/")?,
        })
    }

    /// Parses a single [`Post`] from a source file. `relative_path` is the
    /// path of the file relative to `source_directory`; it determines the
    /// post's id (see [`id_from_source`]).
    pub fn parse_post(&self, source_directory: &Path, relative_path: &Path) -> Result<Post> {
        match self._parse_post(source_directory, relative_path) {
            Ok(p) => Ok(p),
            Err(e) => Err(Error::Annotated(
                format!("parsing post `{}`", relative_path.display()),
                Box::new(e),
            )),
        }
    }

    fn _parse_post(&self, source_directory: &Path, relative_path: &Path) -> Result<Post> {
        use std::io::Read;
        let mut contents = String::new();
        File::open(source_directory.join(relative_path))?.read_to_string(&mut contents)?;

        let relative = relative_path
            .to_str()
            .ok_or_else(|| InvalidFileNameError(relative_path.to_owned()))?;
        self.parse_str(&id_from_source(relative), &contents)
    }

    /// Parses a post from its id and the contents of its source file. Each
    /// source file must be structured as follows:
    ///
    /// 1. Initial frontmatter fence (`---`)
    /// 2. YAML frontmatter (see [`Frontmatter`])
    /// 3. Terminal frontmatter fence (`---`)
    /// 4. Post body
    ///
    /// For example:
    ///
    /// ```md
    /// ---
    /// title: Hello, world!
    /// description: The first post
    /// pubDatetime: 2024-04-16T09:00:00Z
    /// tags: [greet]
    /// ---
    /// # Hello
    ///
    /// World
    /// ```
    pub fn parse_str(&self, id: &str, input: &str) -> Result<Post> {
        let (yaml_start, yaml_stop, body_start) = frontmatter_indices(input)?;
        let data: Frontmatter = serde_yaml::from_str(&input[yaml_start..yaml_stop])?;

        let path = derive_path(id);
        // Posts are served as directories so the URL keeps a trailing slash.
        let url = self
            .site_url
            .join(&format!("{}/", path.trim_start_matches('/')))?;

        let mut tags: Vec<Tag> = Vec::with_capacity(data.tags.len());
        for name in &data.tags {
            if slug::slugify(name).is_empty() {
                return Err(Error::EmptyTagSlug(name.clone()));
            }
            let tag = Tag::new(name, &self.tags_url)?;
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        let mut body = String::new();
        markdown::to_html(&mut body, &input[body_start..]);

        Ok(Post {
            id: id.to_owned(),
            data,
            path,
            url,
            tags,
            body,
        })
    }

    /// Searches `source_directory` recursively for post files (extension
    /// `.md` or `.markdown`) and returns them in file-name order. Files and
    /// directories whose name starts with `_` or `.` are skipped. Fails if two files
    /// resolve to the same id (e.g., `intro.md` and `intro/index.md`).
    pub fn parse_posts(&self, source_directory: &Path) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = Vec::new();
        let mut sources: HashMap<String, PathBuf> = HashMap::new();

        let walker = WalkDir::new(source_directory)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));
        for result in walker {
            let entry = result?;
            if !entry.file_type().is_file() || !is_markdown(entry.path()) {
                continue;
            }

            // strip_prefix() should never fail; every entry lives under the
            // root of the walk.
            let relative_path = entry
                .path()
                .strip_prefix(source_directory)
                .map_err(|_| InvalidFileNameError(entry.path().to_owned()))?;
            let post = self.parse_post(source_directory, relative_path)?;
            log::debug!("parsed `{}` from {}", post.id, relative_path.display());

            if let Some(first) = sources.insert(post.id.clone(), relative_path.to_owned()) {
                return Err(Error::DuplicateId {
                    id: post.id,
                    first,
                    second: relative_path.to_owned(),
                });
            }
            posts.push(post);
        }

        log::info!(
            "loaded {} posts from {}",
            posts.len(),
            source_directory.display()
        );
        Ok(posts)
    }
}

fn frontmatter_indices(input: &str) -> Result<(usize, usize, usize)> {
    const FENCE: &str = "---";
    // Editors on Windows like to leave a byte-order mark behind.
    let start = if input.starts_with('\u{feff}') { '\u{feff}'.len_utf8() } else { 0 };
    if !input[start..].starts_with(FENCE) {
        return Err(Error::FrontmatterMissingStartFence);
    }
    let yaml_start = start + FENCE.len();
    match input[yaml_start..].find("\n---") {
        None => Err(Error::FrontmatterMissingEndFence),
        Some(offset) => Ok((
            yaml_start,                           // yaml_start
            yaml_start + offset,                  // yaml_stop
            yaml_start + offset + 1 + FENCE.len(), // body_start
        )),
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('_') || name.starts_with('.'))
        .unwrap_or(false)
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| MARKDOWN_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

#[derive(Debug)]
pub struct InvalidFileNameError(PathBuf);

impl fmt::Display for InvalidFileNameError {
    /// Displays an [`InvalidFileNameError`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid file name: {:?}", &self.0)
    }
}

impl std::error::Error for InvalidFileNameError {
    /// Implements the [`std::error::Error`] trait for [`InvalidFileNameError`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

/// Represents the result of a [`Post`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a [`Post`] object.
#[derive(Debug)]
pub enum Error {
    /// Returned when a post source file is missing its starting frontmatter
    /// fence (`---`).
    FrontmatterMissingStartFence,

    /// Returned when a post source file is missing its terminal frontmatter
    /// fence (`---` i.e., the starting fence was found but the ending one was
    /// missing).
    FrontmatterMissingEndFence,

    /// Returned when the frontmatter isn't valid YAML or doesn't match the
    /// [`Frontmatter`] schema (missing title, malformed date, ...).
    DeserializeYaml(serde_yaml::Error),

    /// Returned when a tag slugifies to nothing (e.g., `+++`) and so has no
    /// page of its own.
    EmptyTagSlug(String),

    /// Returned when two source files resolve to the same post id.
    DuplicateId {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Returned when there is a problem parsing URLs.
    UrlParse(url::ParseError),

    /// Returned for other I/O errors.
    Io(std::io::Error),

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),

    /// Returned when a source file name isn't valid UTF-8.
    InvalidFileName(InvalidFileNameError),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontmatterMissingStartFence => {
                write!(f, "Post must begin with `---`")
            }
            Error::FrontmatterMissingEndFence => {
                write!(f, "Missing closing `---`")
            }
            Error::DeserializeYaml(err) => err.fmt(f),
            Error::EmptyTagSlug(name) => {
                write!(f, "Tag '{}' has no URL-safe characters", name)
            }
            Error::DuplicateId { id, first, second } => write!(
                f,
                "`{}` and `{}` both resolve to post id `{}`",
                first.display(),
                second.display(),
                id
            ),
            Error::UrlParse(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
            Error::WalkDir(err) => err.fmt(f),
            Error::InvalidFileName(err) => err.fmt(f),
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", &annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FrontmatterMissingStartFence => None,
            Error::FrontmatterMissingEndFence => None,
            Error::DeserializeYaml(err) => Some(err),
            Error::EmptyTagSlug(_) => None,
            Error::DuplicateId { .. } => None,
            Error::UrlParse(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::InvalidFileName(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<InvalidFileNameError> for Error {
    fn from(err: InvalidFileNameError) -> Error {
        Error::InvalidFileName(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL parsing and joining functions.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator while walking the source directory.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
