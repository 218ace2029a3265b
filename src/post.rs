//! Defines the [`Post`] type (one content entry) and its [`Frontmatter`]
//! payload. See [`Post::to_value`] and [`Post::summarize`] for details on how
//! posts are converted into template values.

use crate::tag::Tag;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use gtmpl_value::Value;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use url::Url;

/// The tag assigned to posts whose frontmatter has no `tags` key.
pub const DEFAULT_TAG: &str = "others";

/// Marks the end of a post's summary in its body.
const FOLD_TAG: &str = "<!-- more -->";

/// Every date in the system carries its own offset. Dates written without one
/// are read as UTC.
pub type Timestamp = DateTime<FixedOffset>;

/// The frontmatter of a post, deserialized from the YAML block between the
/// `---` fences. Field names follow the camelCase keys used in the source
/// files (`pubDatetime`, `modDatetime`, `ogImage`, `canonicalURL`).
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Frontmatter {
    pub title: String,

    pub description: String,

    #[serde(deserialize_with = "deserialize_timestamp")]
    pub pub_datetime: Timestamp,

    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub mod_datetime: Option<Timestamp>,

    /// Falls back to the site author when missing.
    #[serde(default)]
    pub author: Option<String>,

    #[serde(default = "default_tags")]
    pub tags: Vec<String>,

    #[serde(default)]
    pub featured: bool,

    #[serde(default)]
    pub draft: bool,

    #[serde(default)]
    pub og_image: Option<String>,

    #[serde(default, rename = "canonicalURL")]
    pub canonical_url: Option<Url>,

    /// An IANA zone name used by themes for display. It does not affect
    /// ordering; every date already carries an offset.
    #[serde(default)]
    pub timezone: Option<String>,
}

fn default_tags() -> Vec<String> {
    vec![DEFAULT_TAG.to_owned()]
}

impl Frontmatter {
    /// The date a post sorts and displays by: `modDatetime` when it is later
    /// than `pubDatetime`, otherwise `pubDatetime`.
    pub fn effective_date(&self) -> Timestamp {
        match self.mod_datetime {
            Some(modified) if modified > self.pub_datetime => modified,
            _ => self.pub_datetime,
        }
    }
}

/// Parses a frontmatter date. Accepts RFC 3339, a naive date-time (read as
/// UTC) or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(s: &str) -> Option<Timestamp> {
    let s = s.trim();
    if let Ok(date_time) = DateTime::parse_from_rfc3339(s) {
        return Some(date_time);
    }

    let naive = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    Some(Utc.fix().from_utc_datetime(&naive))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_timestamp(&s).ok_or_else(|| D::Error::custom(format!("invalid date `{}`", s)))
}

fn deserialize_optional_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid date `{}`", s))),
    }
}

/// A single blog post: one content entry loaded from a markdown file.
#[derive(Clone, Debug)]
pub struct Post {
    /// The source path relative to the posts directory, `/`-separated and
    /// without the markdown extension (e.g., `2024/hello-world`).
    pub id: String,

    /// The parsed frontmatter.
    pub data: Frontmatter,

    /// The canonical path the post is served under (e.g.,
    /// `/blog/hello-world`). See [`crate::path::derive_path`].
    pub path: String,

    /// The absolute URL for `path`.
    pub url: Url,

    /// The post's tags, deduplicated by slug, in frontmatter order.
    pub tags: Vec<Tag>,

    /// The rendered HTML body.
    pub body: String,
}

impl Post {
    /// See [`Frontmatter::effective_date`].
    pub fn effective_date(&self) -> Timestamp {
        self.data.effective_date()
    }

    /// The author to display, given the site-wide default.
    pub fn author<'a>(&'a self, default: &'a str) -> &'a str {
        self.data.author.as_deref().unwrap_or(default)
    }

    /// Returns the portion of the body above the `<!-- more -->` fold, and
    /// whether the fold was found.
    pub fn summary(&self) -> (&str, bool) {
        match self.body.find(FOLD_TAG) {
            Some(i) => (&self.body[..i], true),
            None => (&self.body, false),
        }
    }

    /// Converts the post into a template [`Value`] with the full body.
    pub fn to_value(&self) -> Value {
        self.value_with_body(&self.body, false)
    }

    /// Converts the post into a template [`Value`] for listing pages. The
    /// `body` field holds the summary and `summarized` tells the template
    /// whether to render a "read more" link.
    pub fn summarize(&self) -> Value {
        let (summary, summarized) = self.summary();
        self.value_with_body(summary, summarized)
    }

    fn value_with_body(&self, body: &str, summarized: bool) -> Value {
        let date = self.effective_date();
        let option_to_value = |opt: &Option<String>| match opt {
            Some(s) => Value::String(s.clone()),
            None => Value::Nil,
        };

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("id".to_owned(), Value::String(self.id.clone()));
        m.insert("title".to_owned(), Value::String(self.data.title.clone()));
        m.insert(
            "description".to_owned(),
            Value::String(self.data.description.clone()),
        );
        m.insert("path".to_owned(), Value::String(self.path.clone()));
        m.insert("url".to_owned(), Value::String(self.url.to_string()));
        m.insert(
            "canonical_url".to_owned(),
            Value::String(match &self.data.canonical_url {
                Some(url) => url.to_string(),
                None => self.url.to_string(),
            }),
        );
        m.insert(
            "date".to_owned(),
            Value::String(date.format("%d %b, %Y").to_string()),
        );
        m.insert("datetime".to_owned(), Value::String(date.to_rfc3339()));
        m.insert(
            "published".to_owned(),
            Value::String(self.data.pub_datetime.to_rfc3339()),
        );
        m.insert(
            "modified".to_owned(),
            match self.data.mod_datetime {
                Some(modified) if modified > self.data.pub_datetime => {
                    Value::String(modified.to_rfc3339())
                }
                _ => Value::Nil,
            },
        );
        m.insert("author".to_owned(), option_to_value(&self.data.author));
        m.insert("og_image".to_owned(), option_to_value(&self.data.og_image));
        m.insert("timezone".to_owned(), option_to_value(&self.data.timezone));
        m.insert("featured".to_owned(), Value::Bool(self.data.featured));
        m.insert("draft".to_owned(), Value::Bool(self.data.draft));
        m.insert(
            "tags".to_owned(),
            Value::Array(self.tags.iter().map(Value::from).collect()),
        );
        m.insert("body".to_owned(), Value::String(body.to_owned()));
        m.insert("summarized".to_owned(), Value::Bool(summarized));
        Value::Object(m)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// Builds a post with only the fields the ordering code looks at. Dates
    /// are `YYYY-MM-DD` strings.
    pub fn post(id: &str, published: &str, modified: Option<&str>) -> Post {
        let path = crate::path::derive_path(id);
        Post {
            id: id.to_owned(),
            url: Url::parse("https://example.org")
                .unwrap()
                .join(&path)
                .unwrap(),
            path,
            data: Frontmatter {
                title: id.to_owned(),
                description: String::new(),
                pub_datetime: parse_timestamp(published).unwrap(),
                mod_datetime: modified.map(|m| parse_timestamp(m).unwrap()),
                author: None,
                tags: default_tags(),
                featured: false,
                draft: false,
                og_image: None,
                canonical_url: None,
                timezone: None,
            },
            tags: Vec::new(),
            body: String::new(),
        }
    }

    #[test]
    fn test_frontmatter_defaults() {
        let frontmatter: Frontmatter = serde_yaml::from_str(
            "title: Hello\ndescription: A greeting\npubDatetime: 2024-01-01\n",
        )
        .unwrap();
        assert_eq!(frontmatter.tags, vec!["others".to_owned()]);
        assert!(!frontmatter.draft);
        assert!(!frontmatter.featured);
        assert_eq!(frontmatter.mod_datetime, None);
        assert_eq!(frontmatter.author, None);
    }

    #[test]
    fn test_frontmatter_full() {
        let frontmatter: Frontmatter = serde_yaml::from_str(
            "title: Hello\n\
             description: A greeting\n\
             author: Ada Lovelace\n\
             pubDatetime: 2024-01-01T04:06:31Z\n\
             modDatetime: 2024-06-01T00:00:00+02:00\n\
             tags: [rust, astro]\n\
             featured: true\n\
             draft: true\n\
             ogImage: cover.png\n\
             canonicalURL: https://elsewhere.org/hello\n\
             timezone: Asia/Yangon\n",
        )
        .unwrap();
        assert_eq!(frontmatter.author.as_deref(), Some("Ada Lovelace"));
        assert_eq!(frontmatter.tags, vec!["rust".to_owned(), "astro".to_owned()]);
        assert!(frontmatter.featured);
        assert!(frontmatter.draft);
        assert_eq!(frontmatter.og_image.as_deref(), Some("cover.png"));
        assert_eq!(
            frontmatter.canonical_url.as_ref().map(|u| u.to_string()),
            Some("https://elsewhere.org/hello".to_owned())
        );
        assert_eq!(frontmatter.timezone.as_deref(), Some("Asia/Yangon"));
        assert_eq!(
            frontmatter.effective_date(),
            parse_timestamp("2024-06-01T00:00:00+02:00").unwrap()
        );
    }

    #[test]
    fn test_frontmatter_rejects_bad_date() {
        let result: Result<Frontmatter, _> = serde_yaml::from_str(
            "title: Hello\ndescription: A greeting\npubDatetime: yesterday\n",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_frontmatter_requires_pub_datetime() {
        let result: Result<Frontmatter, _> =
            serde_yaml::from_str("title: Hello\ndescription: A greeting\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let midnight = parse_timestamp("2024-03-01").unwrap();
        assert_eq!(midnight.to_rfc3339(), "2024-03-01T00:00:00+00:00");

        let naive = parse_timestamp("2024-03-01 10:30:00").unwrap();
        assert_eq!(naive.to_rfc3339(), "2024-03-01T10:30:00+00:00");

        let offset = parse_timestamp("2024-03-01T10:30:00+06:30").unwrap();
        assert_eq!(offset.to_rfc3339(), "2024-03-01T10:30:00+06:30");

        assert_eq!(parse_timestamp("March 1st"), None);
    }

    #[test]
    fn test_effective_date_uses_later_modification() {
        let p = post("a", "2024-01-01", Some("2024-06-01"));
        assert_eq!(p.effective_date(), parse_timestamp("2024-06-01").unwrap());
    }

    #[test]
    fn test_effective_date_ignores_earlier_modification() {
        let p = post("a", "2024-06-01", Some("2024-01-01"));
        assert_eq!(p.effective_date(), parse_timestamp("2024-06-01").unwrap());
    }

    #[test]
    fn test_summary_fold() {
        let mut p = post("a", "2024-01-01", None);
        p.body = String::from("<p>intro</p><!-- more --><p>rest</p>");
        assert_eq!(p.summary(), ("<p>intro</p>", true));

        p.body = String::from("<p>short</p>");
        assert_eq!(p.summary(), ("<p>short</p>", false));
    }

    #[test]
    fn test_author_default() {
        let mut p = post("a", "2024-01-01", None);
        assert_eq!(p.author("Site Owner"), "Site Owner");
        p.data.author = Some(String::from("Guest"));
        assert_eq!(p.author("Site Owner"), "Guest");
    }
}
