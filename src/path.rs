//! Maps post identifiers to the canonical paths they are served under.

use std::collections::BTreeMap;
use std::fmt;

/// The route segment every post path lives under.
pub const BLOG_PATH: &str = "/blog/";

/// Returns the final segment of `id` with a trailing extension removed. Both
/// `/` and `\` count as separators. If that leaves nothing (e.g., `drafts/`),
/// the whole `id` is returned.
pub fn slug_of(id: &str) -> &str {
    let last = id.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(id);
    let stem = match last.rfind('.') {
        // `foo.` keeps its dot; there is no extension after it.
        Some(i) if i + 1 < last.len() => &last[..i],
        _ => last,
    };
    if stem.is_empty() {
        id
    } else {
        stem
    }
}

/// Derives the canonical path for a post from its identifier, e.g.
/// `articles/my-post.md` becomes `/blog/my-post`.
///
/// Only the last segment survives, so two posts in different directories can
/// map to the same path. See [`find_collisions`].
pub fn derive_path(id: &str) -> String {
    format!("{}{}", BLOG_PATH, slug_of(id))
}

/// Extensions recognized as post sources.
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Computes a post identifier from its source path relative to the posts
/// directory: separators become `/`, the markdown extension is dropped and a
/// bundle's `index` file is named after its directory (`intro/index.md` has
/// the id `intro`).
pub fn id_from_source(relative: &str) -> String {
    let normalized = relative.replace('\\', "/");
    let mut id = normalized.trim_start_matches("./");
    for ext in MARKDOWN_EXTENSIONS {
        let suffix = format!(".{}", ext);
        if let Some(stripped) = id.strip_suffix(suffix.as_str()) {
            id = stripped;
            break;
        }
    }
    if let Some(dir) = id.strip_suffix("/index") {
        if !dir.is_empty() {
            id = dir;
        }
    }
    id.to_owned()
}

/// A canonical path claimed by more than one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub path: String,
    pub ids: Vec<String>,
}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "`{}` is derived from {}", self.path, self.ids.join(", "))
    }
}

/// Returns every derived path shared by two or more of `ids`, ordered by
/// path. The ids within a collision keep their input order.
pub fn find_collisions<'a, I>(ids: I) -> Vec<Collision>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut claims: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for id in ids {
        claims.entry(derive_path(id)).or_default().push(id.to_owned());
    }
    claims
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(path, ids)| Collision { path, ids })
        .collect()
}
