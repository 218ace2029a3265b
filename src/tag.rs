//! Defines the [`Tag`] type, which represents a [`crate::post::Post`] tag.

use crate::post::Post;
use gtmpl_value::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use url::Url;

/// Represents a [`crate::post::Post`] tag. Tags are identified by their slug
/// so e.g., `macOS` and `MacOS` resolve to the same tag; `name` keeps the
/// spelling from the frontmatter for display.
#[derive(Clone, Debug)]
pub struct Tag {
    /// The tag as written in the frontmatter.
    pub name: String,

    /// The slugified name. This is what ends up in the tag page's URL.
    pub slug: String,

    /// The URL for the tag's first index page, i.e.
    /// `{tags_url}/{slug}/`.
    pub url: Url,
}

impl Tag {
    /// Creates a tag from its frontmatter spelling. `tags_url` must end in a
    /// trailing slash.
    pub fn new(name: &str, tags_url: &Url) -> Result<Tag, url::ParseError> {
        let slug = slug::slugify(name);
        // NOTE: the trailing slash matters; without it [`Url::join`] would
        // treat the slug as a file name and drop it on the next join.
        let url = tags_url.join(&format!("{}/", slug))?;
        Ok(Tag {
            name: name.to_owned(),
            slug,
            url,
        })
    }
}

impl Hash for Tag {
    /// Implements [`Hash`] for [`Tag`] by delegating directly to the `slug`
    /// field.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slug.hash(state)
    }
}

impl PartialEq for Tag {
    /// Implements [`PartialEq`] and [`Eq`] for [`Tag`] by delegating directly
    /// to the `slug` field.
    fn eq(&self, other: &Self) -> bool {
        self.slug == other.slug
    }
}
impl Eq for Tag {}

impl PartialOrd for Tag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tag {
    /// Tags order alphabetically by slug.
    fn cmp(&self, other: &Self) -> Ordering {
        self.slug.cmp(&other.slug)
    }
}

impl From<&Tag> for Value {
    /// Converts [`Tag`]s into [`Value`]s for templating.
    fn from(t: &Tag) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("tag".to_owned(), Value::String(t.name.clone()));
        m.insert("slug".to_owned(), Value::String(t.slug.clone()));
        m.insert("url".to_owned(), Value::String(t.url.to_string()));
        Value::Object(m)
    }
}

/// Returns every distinct tag across `posts`, ordered by slug. When a tag is
/// spelled differently across posts the first spelling seen wins.
pub fn unique_tags<'a, I>(posts: I) -> Vec<Tag>
where
    I: IntoIterator<Item = &'a Post>,
{
    let mut tags: BTreeMap<&str, &Tag> = BTreeMap::new();
    for post in posts {
        for tag in &post.tags {
            tags.entry(&tag.slug).or_insert(tag);
        }
    }
    tags.into_iter().map(|(_, tag)| tag.clone()).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::test::post;

    fn tags_url() -> Url {
        Url::parse("https://example.org/tags/").unwrap()
    }

    #[test]
    fn test_new_slugifies() -> Result<(), url::ParseError> {
        let tag = Tag::new("Rust Lang", &tags_url())?;
        assert_eq!(tag.name, "Rust Lang");
        assert_eq!(tag.slug, "rust-lang");
        assert_eq!(tag.url.as_str(), "https://example.org/tags/rust-lang/");
        Ok(())
    }

    #[test]
    fn test_equality_by_slug() -> Result<(), url::ParseError> {
        assert_eq!(Tag::new("macOS", &tags_url())?, Tag::new("MacOS", &tags_url())?);
        Ok(())
    }

    #[test]
    fn test_unique_tags() -> Result<(), url::ParseError> {
        let mut a = post("a", "2024-01-01", None);
        a.tags = vec![Tag::new("Zig", &tags_url())?, Tag::new("rust", &tags_url())?];
        let mut b = post("b", "2024-01-02", None);
        b.tags = vec![Tag::new("Rust", &tags_url())?, Tag::new("astro", &tags_url())?];

        let tags = unique_tags(&[a, b]);
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["astro", "rust", "Zig"]);
        Ok(())
    }
}
