//! Loads the project configuration (`quire.yaml`) and the theme manifest
//! (`theme/theme.yaml`) into a [`Config`].

use anyhow::{anyhow, Context, Result};
use chrono::Duration;
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

/// The project file name searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "quire.yaml";

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(4)
    }
}

#[derive(Deserialize)]
struct MarginMinutes(i64);
impl Default for MarginMinutes {
    fn default() -> Self {
        MarginMinutes(15)
    }
}

fn default_timezone() -> String {
    String::from("UTC")
}

/// The site author. Also the default author for posts that don't name one.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Author {
    pub name: String,

    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize)]
struct Project {
    title: String,

    #[serde(default)]
    description: String,

    site_url: Url,

    author: Author,

    #[serde(default)]
    posts_per_page: PageSize,

    #[serde(default)]
    scheduled_post_margin_minutes: MarginMinutes,

    #[serde(default = "default_timezone")]
    timezone: String,

    #[serde(default)]
    show_drafts: bool,
}

#[derive(Deserialize)]
struct Theme {
    index_template: Vec<PathBuf>,
    posts_template: Vec<PathBuf>,
    tags_template: Vec<PathBuf>,
    archives_template: Vec<PathBuf>,
}

/// Everything a build needs to know, with paths resolved against the project
/// root.
#[derive(Clone, Debug)]
pub struct Config {
    pub title: String,
    pub description: String,
    pub author: Author,

    /// The site's root URL, always with a trailing slash.
    pub site_url: Url,

    /// The zone name themes display dates in.
    pub timezone: String,

    pub posts_source_directory: PathBuf,
    pub static_source_directory: PathBuf,

    /// Template files, concatenated in order before parsing.
    pub index_template: Vec<PathBuf>,
    pub posts_template: Vec<PathBuf>,
    pub tags_template: Vec<PathBuf>,
    pub archives_template: Vec<PathBuf>,

    pub root_output_directory: PathBuf,

    /// Posts per listing page (index and tag pages).
    pub posts_per_page: usize,

    /// How far past the build time a post may be scheduled and still be
    /// published.
    pub scheduled_post_margin: Duration,

    pub show_drafts: bool,
}

impl Config {
    /// Looks for [`PROJECT_FILE`] in `dir` and then in each of its ancestors.
    /// Output goes to `output_directory`, or `_site` next to the project file
    /// when none is given.
    pub fn from_directory(dir: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path, output_directory)
                .with_context(|| format!("Loading configuration from `{}`", path.display()))
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent, output_directory),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    pub fn from_project_file(path: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let project: Project = serde_yaml::from_reader(open(path, "project")?)?;
        let project_root = path.parent().ok_or_else(|| {
            anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )
        })?;

        if project.posts_per_page.0 == 0 {
            return Err(anyhow!("`posts_per_page` must be at least 1"));
        }
        if project.scheduled_post_margin_minutes.0 < 0 {
            return Err(anyhow!("`scheduled_post_margin_minutes` can't be negative"));
        }

        let theme_dir = project_root.join("theme");
        let theme: Theme = serde_yaml::from_reader(open(&theme_dir.join("theme.yaml"), "theme")?)?;
        let resolve = |relpaths: Vec<PathBuf>| -> Vec<PathBuf> {
            relpaths.iter().map(|relpath| theme_dir.join(relpath)).collect()
        };

        Ok(Config {
            title: project.title,
            description: project.description,
            author: project.author,
            site_url: with_trailing_slash(project.site_url),
            timezone: project.timezone,
            posts_source_directory: project_root.join("posts"),
            static_source_directory: project_root.join("static"),
            index_template: resolve(theme.index_template),
            posts_template: resolve(theme.posts_template),
            tags_template: resolve(theme.tags_template),
            archives_template: resolve(theme.archives_template),
            root_output_directory: match output_directory {
                Some(dir) => dir.to_owned(),
                None => project_root.join("_site"),
            },
            posts_per_page: project.posts_per_page.0,
            scheduled_post_margin: Duration::minutes(project.scheduled_post_margin_minutes.0),
            show_drafts: project.show_drafts,
        })
    }
}

fn open(path: &Path, kind: &str) -> Result<File> {
    File::open(path).with_context(|| format!("Opening {} file `{}`", kind, path.display()))
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
