use crate::group::{archive, group_by_tag};
use crate::post::Post;
use crate::tag::{unique_tags, Tag};
use gtmpl::{Template, Value};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use url::Url;

/// Responsible for indexing, templating, and writing HTML pages to disk from
/// [`Post`] sources.
pub struct Writer<'a> {
    /// The template for post pages.
    pub posts_template: &'a Template,

    /// The template for index pages (the main listing and each tag listing).
    pub index_template: &'a Template,

    /// The template for the tags overview page.
    pub tags_template: &'a Template,

    /// The template for the archives page.
    pub archives_template: &'a Template,

    /// The site's root URL, with a trailing slash. The main index pages are
    /// located at `{site_url}/blog/`, `{site_url}/blog/2.html`, etc. The tag
    /// index pages are located at `{site_url}/tags/{tag_slug}/`,
    /// `{site_url}/tags/{tag_slug}/2.html`, etc.
    pub site_url: &'a Url,

    /// The directory in which all HTML files are written. A post served at
    /// `/blog/{slug}` is written to `{output_directory}/blog/{slug}/index.html`.
    pub output_directory: &'a Path,

    /// The number of posts per index page.
    pub posts_per_page: usize,

    /// Site-wide values (title, author, home page, ...). Made available to
    /// every template as `site`.
    pub site: &'a Value,
}

impl Writer<'_> {
    /// Takes a single [`Page`], templates it, and writes it to disk.
    fn write_page(&self, page: &Page) -> Result<()> {
        let mut value = page.to_value();
        if let Value::Object(obj) = &mut value {
            obj.insert("site".to_owned(), self.site.clone());
        }
        let context =
            gtmpl::Context::from(value).map_err(|e| Error::Template(e.to_string()))?;
        page.template
            .execute(&mut std::fs::File::create(&page.file_path)?, &context)
            .map_err(|e| Error::Template(format!("{}: {}", page.file_path.display(), e)))?;
        Ok(())
    }

    /// Takes a slice of [`Post`]s (already filtered and sorted), indexes it
    /// by tag, and writes post, index, tags and archives pages to disk.
    /// Returns the number of pages written.
    pub fn write_posts(&self, posts: &[Post]) -> Result<usize> {
        use std::collections::HashSet;
        let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
        let mut written = 0;
        for page in self.pages(posts)? {
            if let Some(dir) = page.file_path.parent() {
                if seen_dirs.insert(dir.to_owned()) {
                    std::fs::create_dir_all(dir)?;
                }
            }
            self.write_page(&page)?;
            log::debug!("wrote {}", page.file_path.display());
            written += 1;
        }
        Ok(written)
    }

    /// Creates every [`Page`] for a set of [`Post`]s: the indices first, then
    /// the posts, the tags overview and the archives.
    fn pages<'a>(&'a self, posts: &'a [Post]) -> Result<Vec<Page<'a>>> {
        let mut pages = Vec::new();
        for index in self.indices(posts)? {
            pages.extend(index.to_pages(self.posts_per_page, self.index_template)?);
        }
        pages.extend(post_pages(posts, self.output_directory, self.posts_template));
        pages.push(self.tags_page(posts));
        pages.push(self.archives_page(posts));
        Ok(pages)
    }

    /// Builds the main index (all posts) followed by one index per tag.
    fn indices<'a>(&self, posts: &'a [Post]) -> Result<Vec<Index<'a>>> {
        let mut indices = vec![Index {
            url: self.site_url.join("blog/")?,
            output_directory: self.output_directory.join("blog"),
            tag: None,
            posts: posts.iter().collect(),
        }];
        for group in group_by_tag(posts) {
            indices.push(Index {
                url: group.key.url.clone(),
                output_directory: self.output_directory.join("tags").join(&group.key.slug),
                tag: Some(group.key),
                posts: group.items,
            });
        }
        Ok(indices)
    }

    fn tags_page(&self, posts: &[Post]) -> Page<'_> {
        let counts: HashMap<String, usize> = group_by_tag(posts)
            .into_iter()
            .map(|g| (g.key.slug, g.items.len()))
            .collect();
        let tags = unique_tags(posts)
            .iter()
            .map(|tag| {
                let mut value = Value::from(tag);
                if let Value::Object(obj) = &mut value {
                    let count = counts.get(&tag.slug).copied().unwrap_or(0);
                    obj.insert("count".to_owned(), Value::from(count as i64));
                }
                value
            })
            .collect();

        Page {
            item: Value::Array(tags),
            file_path: self.output_directory.join("tags").join("index.html"),
            prev: None,
            next: None,
            template: self.tags_template,
            extra: HashMap::new(),
        }
    }

    fn archives_page(&self, posts: &[Post]) -> Page<'_> {
        let years = archive(posts)
            .into_iter()
            .map(|year| {
                let months = year
                    .items
                    .iter()
                    .map(|month| {
                        let mut m: HashMap<String, Value> = HashMap::new();
                        m.insert("name".to_owned(), Value::String(month.key.month_name()));
                        m.insert("month".to_owned(), Value::from(month.key.month as i64));
                        m.insert(
                            "posts".to_owned(),
                            Value::Array(month.items.iter().map(|p| p.summarize()).collect()),
                        );
                        Value::Object(m)
                    })
                    .collect();
                let mut m: HashMap<String, Value> = HashMap::new();
                m.insert("year".to_owned(), Value::from(year.key as i64));
                m.insert("months".to_owned(), Value::Array(months));
                Value::Object(m)
            })
            .collect();

        Page {
            item: Value::Array(years),
            file_path: self.output_directory.join("archives").join("index.html"),
            prev: None,
            next: None,
            template: self.archives_template,
            extra: HashMap::new(),
        }
    }
}

/// An object representing an output HTML file. A [`Page`] can be converted to a
/// [`Value`] and thus rendered in a template via [`Page::to_value`].
struct Page<'a> {
    /// The main item for the page.
    item: Value,

    /// The target location on disk for the output file.
    file_path: PathBuf,

    /// The URL for the previous page, if any.
    prev: Option<Url>,

    /// The URL for the next page, if any.
    next: Option<Url>,

    /// The template with which the page will be rendered.
    template: &'a Template,

    /// Additional top-level fields for the template (e.g., `tag` on tag
    /// index pages).
    extra: HashMap<String, Value>,
}

impl Page<'_> {
    /// Converts a [`Page`] into a [`Value`]. The result is a [`Value::Object`]
    /// with fields `item`, `prev`, and `next` (see [`Page`] for descriptions)
    /// plus any `extra` fields.
    fn to_value(&self) -> Value {
        let option_to_value = |opt: &Option<Url>| match opt {
            Some(url) => Value::String(url.to_string()),
            None => Value::Nil,
        };

        let mut m: HashMap<String, Value> = self.extra.clone();
        m.insert("item".to_owned(), self.item.clone());
        m.insert("prev".to_owned(), option_to_value(&self.prev));
        m.insert("next".to_owned(), option_to_value(&self.next));
        Value::Object(m)
    }
}

/// Creates all of the post [`Page`]s for a set of [`Post`]s. `prev` links to
/// the newer neighbour and `next` to the older one.
fn post_pages<'a>(
    posts: &'a [Post],
    output_directory: &'a Path,
    template: &'a Template,
) -> impl Iterator<Item = Page<'a>> {
    posts.iter().enumerate().map(move |(i, post)| Page {
        item: post.to_value(),
        file_path: output_directory
            .join(post.path.trim_start_matches('/'))
            .join("index.html"),
        prev: match i < 1 {
            true => None,
            false => Some(posts[i - 1].url.clone()),
        },
        next: posts.get(i + 1).map(|p| p.url.clone()),
        template,
        extra: HashMap::new(),
    })
}

/// `Index` represents a collection of [`Post`]s associated with a tag, or
/// with no tag for the main index containing all posts.
struct Index<'a> {
    /// The URL of the index's first page, with a trailing slash.
    url: Url,

    /// The output directory for all pages in the index.
    output_directory: PathBuf,

    /// The tag, for tag indices.
    tag: Option<Tag>,

    /// The posts associated with the index.
    posts: Vec<&'a Post>,
}

impl<'a> Index<'a> {
    /// The URL of the `i`th page (zero-based). The first page is the index
    /// directory itself; later pages are `2.html`, `3.html`, ...
    fn page_url(&self, i: usize) -> Result<Url> {
        Ok(match i {
            0 => self.url.clone(),
            _ => self.url.join(&format!("{}.html", i + 1))?,
        })
    }

    /// Converts the index to a list of index pages. An index with no posts
    /// still gets one (empty) page.
    fn to_pages<'t>(&self, posts_per_page: usize, index_template: &'t Template) -> Result<Vec<Page<'t>>> {
        let chunks: Vec<&[&Post]> = match self.posts.is_empty() {
            true => vec![&self.posts[..]],
            false => self.posts.chunks(posts_per_page).collect(),
        };
        let total_pages = chunks.len();

        let mut pages = Vec::with_capacity(total_pages);
        for (i, chunk) in chunks.into_iter().enumerate() {
            let file_name = match i > 0 {
                false => String::from("index.html"),
                true => format!("{}.html", i + 1),
            };

            let mut extra: HashMap<String, Value> = HashMap::new();
            extra.insert("page".to_owned(), Value::from((i + 1) as i64));
            extra.insert("total_pages".to_owned(), Value::from(total_pages as i64));
            extra.insert(
                "tag".to_owned(),
                match &self.tag {
                    Some(tag) => Value::from(tag),
                    None => Value::Nil,
                },
            );

            pages.push(Page {
                item: Value::Array(chunk.iter().map(|p| p.summarize()).collect()),
                file_path: self.output_directory.join(&file_name),
                prev: match i {
                    0 => None,
                    _ => Some(self.page_url(i - 1)?),
                },
                next: match i + 1 < total_pages {
                    false => None,
                    true => Some(self.page_url(i + 1)?),
                },
                template: index_template,
                extra,
            });
        }
        Ok(pages)
    }
}

/// The result of a fallible page-writing operation.
type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Template(String),

    /// An error building page URLs.
    UrlParse(url::ParseError),

    /// An error writing the output files.
    Io(io::Error),
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`]. This allows us to use the
    /// `?` operator for fallible I/O operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. This allows us to use
    /// the `?` operator when joining page URLs.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => err.fmt(f),
            Error::UrlParse(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(_) => None,
            Error::UrlParse(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}
