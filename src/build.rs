//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: parsing the posts
//! ([`crate::parser`]), filtering and ordering them ([`crate::sort`]),
//! rendering index and post pages ([`crate::write`]), copying the static
//! source directory into the output directory, and generating the Atom feed.

use crate::config::Config;
use crate::feed::{write_feed, Error as FeedError, FeedConfig};
use crate::parser::{Error as ParseError, Parser as PostParser};
use crate::path::{find_collisions, Collision};
use crate::post::Post;
use crate::sort::{published_posts, PublishFilter};
use crate::write::{Error as WriteError, Writer};
use chrono::{DateTime, Utc};
use gtmpl::{Template, Value};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Loads the posts a build would publish at `now`: parsed, filtered through
/// the drafts and scheduling rules, sorted newest first and checked for path
/// collisions.
pub fn load_posts(config: &Config, now: DateTime<Utc>) -> Result<Vec<Post>> {
    let post_parser = PostParser::new(&config.site_url)?;
    let posts = post_parser.parse_posts(&config.posts_source_directory)?;
    let total = posts.len();

    let filter = PublishFilter {
        now,
        margin: config.scheduled_post_margin,
        show_drafts: config.show_drafts,
    };
    let posts = published_posts(posts, &filter);
    if posts.len() < total {
        log::info!("{} of {} posts are unpublished", total - posts.len(), total);
    }

    let collisions = find_collisions(posts.iter().map(|p| p.id.as_str()));
    if !collisions.is_empty() {
        return Err(Error::PathCollision(collisions));
    }
    Ok(posts)
}

/// Builds the site from a [`Config`] object at time `now` (which decides
/// which scheduled posts are published). This calls into [`load_posts`],
/// [`Writer::write_posts`], and [`write_feed`] which do the heavy-lifting.
/// This function also copies the static assets from source directory to the
/// output directory.
pub fn build_site(config: &Config, now: DateTime<Utc>) -> Result<Vec<Post>> {
    let posts = load_posts(config, now)?;

    // Parse the template files.
    let index_template = parse_template(config.index_template.iter())?;
    let posts_template = parse_template(config.posts_template.iter())?;
    let tags_template = parse_template(config.tags_template.iter())?;
    let archives_template = parse_template(config.archives_template.iter())?;

    // Clear generated directories only; other files in the output survive.
    let out = &config.root_output_directory;
    check_output_overlap(config)?;
    for generated in GENERATED_DIRECTORIES {
        rmdir(&out.join(generated))?;
    }
    std::fs::create_dir_all(out)?;

    // write the post and index pages
    let site = site_value(config);
    let writer = Writer {
        posts_template: &posts_template,
        index_template: &index_template,
        tags_template: &tags_template,
        archives_template: &archives_template,
        site_url: &config.site_url,
        output_directory: out,
        posts_per_page: config.posts_per_page,
        site: &site,
    };
    let pages = writer.write_posts(&posts)?;

    // copy static directory
    if config.static_source_directory.is_dir() {
        copy_dir(&config.static_source_directory, &out.join("static"))?;
    }

    // the first blog index doubles as the home page
    std::fs::copy(out.join("blog").join("index.html"), out.join("index.html"))?;

    // create the atom feed
    write_feed(
        FeedConfig {
            title: config.title.clone(),
            subtitle: config.description.clone(),
            id: config.site_url.to_string(),
            author: config.author.clone(),
            home_page: config.site_url.clone(),
        },
        &posts,
        File::create(out.join("feed.atom"))?,
    )?;

    log::info!(
        "built {} posts ({} pages) into {}",
        posts.len(),
        pages,
        out.display()
    );
    Ok(posts)
}

/// Output subdirectories that are deleted and regenerated on every build.
const GENERATED_DIRECTORIES: &[&str] = &["blog", "tags", "archives", "static"];

/// Fails if cleaning the output directory would delete any source directory,
/// e.g. when the output directory is the project root.
fn check_output_overlap(config: &Config) -> Result<()> {
    let mut sources = vec![
        resolved(&config.posts_source_directory),
        resolved(&config.static_source_directory),
    ];
    let templates = config
        .index_template
        .iter()
        .chain(&config.posts_template)
        .chain(&config.tags_template)
        .chain(&config.archives_template);
    for template in templates {
        if let Some(dir) = template.parent() {
            sources.push(resolved(dir));
        }
    }

    let out = resolved(&config.root_output_directory);
    for generated in GENERATED_DIRECTORIES {
        let generated = out.join(generated);
        if let Some(source) = sources.iter().find(|s| s.starts_with(&generated)) {
            return Err(Error::OutputOverlapsSource {
                generated,
                source: source.clone(),
            });
        }
    }
    Ok(())
}

// Canonical form of `path`, or `path` itself when it doesn't exist yet.
fn resolved(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_owned())
}

/// Site-wide template values, available to every page as `site`.
fn site_value(config: &Config) -> Value {
    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert("title".to_owned(), Value::String(config.title.clone()));
    m.insert(
        "description".to_owned(),
        Value::String(config.description.clone()),
    );
    m.insert("author".to_owned(), Value::String(config.author.name.clone()));
    m.insert("home_page".to_owned(), Value::String(config.site_url.to_string()));
    m.insert(
        "static_url".to_owned(),
        Value::String(format!("{}static/", config.site_url)),
    );
    m.insert(
        "feed_url".to_owned(),
        Value::String(format!("{}feed.atom", config.site_url)),
    );
    m.insert("timezone".to_owned(), Value::String(config.timezone.clone()));
    Value::Object(m)
}

fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &dst.join(entry.file_name()))?;
        } else {
            std::fs::copy(entry.path(), dst.join(entry.file_name()))?;
        }
    }

    Ok(())
}

// Loads the template file contents, concatenates them, and parses the result
// into a template.
fn parse_template<P: AsRef<Path>>(template_files: impl Iterator<Item = P>) -> Result<Template> {
    let mut contents = String::new();
    for template_file in template_files {
        use std::io::Read;
        let template_file = template_file.as_ref();
        File::open(&template_file)
            .map_err(|e| Error::OpenTemplateFile {
                path: template_file.to_owned(),
                err: e,
            })?
            .read_to_string(&mut contents)?;
        contents.push(' ');
    }

    let mut template = Template::default();
    template
        .parse(&contents)
        .map_err(|e| Error::ParseTemplate(e.to_string()))?;
    Ok(template)
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during parsing, writing,
/// cleaning output directories, parsing template files, and other I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors during parsing.
    Parse(ParseError),

    /// Returned when published posts would be served under the same path.
    PathCollision(Vec<Collision>),

    /// Returned for errors writing [`crate::post::Post`]s to disk as HTML files.
    Write(WriteError),

    /// Returned when a generated output directory is, or contains, a source
    /// directory.
    OutputOverlapsSource { generated: PathBuf, source: PathBuf },

    /// Returned for I/O problems while cleaning output directories.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while opening template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template files.
    ParseTemplate(String),

    /// Returned for errors writing the feed.
    Feed(FeedError),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(err) => err.fmt(f),
            Error::PathCollision(collisions) => {
                write!(f, "Posts share a path:")?;
                for collision in collisions {
                    write!(f, " {};", collision)?;
                }
                Ok(())
            }
            Error::Write(err) => err.fmt(f),
            Error::OutputOverlapsSource { generated, source } => write!(
                f,
                "Output directory '{}' would overwrite source directory '{}'",
                generated.display(),
                source.display()
            ),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate(err) => err.fmt(f),
            Error::Feed(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(err) => Some(err),
            Error::PathCollision(_) => None,
            Error::Write(err) => Some(err),
            Error::OutputOverlapsSource { .. } => None,
            Error::Clean { path: _, err } => Some(err),
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::ParseTemplate(_) => None,
            Error::Feed(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

impl From<FeedError> for Error {
    /// Converts [`FeedError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: FeedError) -> Error {
        Error::Feed(err)
    }
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::test::{write_project, PROJECT};
    use crate::post::parse_timestamp;
    use std::fs;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn source(title: &str, date: &str, extra: &str) -> String {
        format!(
            "---\ntitle: {}\ndescription: about {}\npubDatetime: {}\n{}---\nBody of {}.\n",
            title, title, date, extra, title
        )
    }

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_project(root, PROJECT);
        write(root, "theme/base.html", "");
        write(root, "theme/index.html", "{{range .item}}{{.path}} {{end}}");
        write(root, "theme/post.html", "<h2>{{.item.title}}</h2>{{.item.body}}");
        write(root, "theme/tags.html", "{{range .item}}{{.slug}} {{end}}");
        write(root, "theme/archives.html", "{{range .item}}{{.year}} {{end}}");
        write(root, "static/style.css", "body {}");
        dir
    }

    fn now() -> DateTime<Utc> {
        parse_timestamp("2024-06-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_build_site() -> Result<()> {
        let dir = project();
        let root = dir.path();
        write(root, "posts/2024/spring.md", &source("Spring", "2024-03-01", "tags: [seasons]\n"));
        write(root, "posts/winter.md", &source("Winter", "2024-01-01", ""));
        write(root, "posts/draft.md", &source("Draft", "2024-02-01", "draft: true\n"));
        write(root, "posts/later.md", &source("Later", "2024-12-01", ""));

        let config = Config::from_directory(root, None).unwrap();
        let posts = build_site(&config, now())?;

        let paths: Vec<&str> = posts.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["/blog/spring", "/blog/winter"]);

        let out = root.join("_site");
        assert_eq!(
            fs::read_to_string(out.join("blog/index.html"))?.trim(),
            "/blog/spring /blog/winter"
        );
        assert_eq!(
            fs::read_to_string(out.join("index.html"))?.trim(),
            "/blog/spring /blog/winter"
        );
        assert!(fs::read_to_string(out.join("blog/spring/index.html"))?
            .trim()
            .starts_with("<h2>Spring</h2>"));
        assert!(out.join("tags/seasons/index.html").is_file());
        assert!(out.join("tags/others/index.html").is_file());
        assert!(!out.join("blog/draft").exists());
        assert!(!out.join("blog/later").exists());
        assert!(out.join("static/style.css").is_file());
        assert!(fs::read_to_string(out.join("feed.atom"))?.contains("Spring"));
        Ok(())
    }

    #[test]
    fn test_rebuild_replaces_output() -> Result<()> {
        let dir = project();
        let root = dir.path();
        write(root, "posts/old.md", &source("Old", "2024-01-01", ""));
        let config = Config::from_directory(root, None).unwrap();
        build_site(&config, now())?;

        fs::remove_file(root.join("posts/old.md"))?;
        write(root, "posts/new.md", &source("New", "2024-02-01", ""));
        build_site(&config, now())?;

        let out = root.join("_site");
        assert!(out.join("blog/new/index.html").is_file());
        assert!(!out.join("blog/old").exists());
        Ok(())
    }

    #[test]
    fn test_output_over_sources_is_refused() {
        let dir = project();
        let root = dir.path();
        write(root, "posts/a.md", &source("A", "2024-01-01", ""));

        let config = Config::from_directory(root, Some(root)).unwrap();
        match build_site(&config, now()) {
            Err(Error::OutputOverlapsSource { source, .. }) => {
                assert!(source.ends_with("static"))
            }
            other => panic!("unexpected result: {:?}", other.map(|p| p.len())),
        }
        assert!(root.join("static/style.css").is_file());
        assert!(root.join("posts/a.md").is_file());
    }

    #[test]
    fn test_path_collision() {
        let dir = project();
        let root = dir.path();
        write(root, "posts/2023/intro.md", &source("Intro", "2023-01-01", ""));
        write(root, "posts/2024/intro.md", &source("Intro again", "2024-01-01", ""));

        let config = Config::from_directory(root, None).unwrap();
        match load_posts(&config, now()) {
            Err(Error::PathCollision(collisions)) => {
                assert_eq!(collisions.len(), 1);
                assert_eq!(collisions[0].path, "/blog/intro");
            }
            other => panic!("unexpected result: {:?}", other.map(|p| p.len())),
        }
    }

    #[test]
    fn test_collision_with_draft_is_ignored() -> Result<()> {
        let dir = project();
        let root = dir.path();
        write(root, "posts/2023/intro.md", &source("Intro", "2023-01-01", "draft: true\n"));
        write(root, "posts/2024/intro.md", &source("Intro again", "2024-01-01", ""));

        let config = Config::from_directory(root, None).unwrap();
        let posts = load_posts(&config, now())?;
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, "2024/intro");
        Ok(())
    }

    #[test]
    fn test_missing_template() {
        let dir = project();
        let root = dir.path();
        fs::remove_file(root.join("theme/post.html")).unwrap();
        write(root, "posts/a.md", &source("A", "2024-01-01", ""));

        let config = Config::from_directory(root, None).unwrap();
        match build_site(&config, now()) {
            Err(Error::OpenTemplateFile { path, .. }) => {
                assert!(path.ends_with("post.html"))
            }
            other => panic!("unexpected result: {:?}", other.map(|p| p.len())),
        }
    }
}
