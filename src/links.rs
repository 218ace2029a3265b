//! Rewrites links between posts. Authors link to another post by its source
//! file (`../2023/intro.md`); the rendered page needs the canonical path
//! (`/blog/intro`).

use crate::path::{derive_path, id_from_source, slug_of, MARKDOWN_EXTENSIONS};
use url::{ParseError, Url};

/// Converts a link target found in a post body. Relative links to markdown
/// sources become canonical post paths (fragments survive); everything else
/// is returned unchanged.
pub fn convert(target: &str) -> String {
    match Url::parse(target) {
        Err(ParseError::RelativeUrlWithoutBase) => {}
        _ => return target.to_owned(),
    }

    let (path, fragment) = match target.find('#') {
        Some(i) => (&target[..i], &target[i..]),
        None => (target, ""),
    };
    if !is_markdown(path) {
        return target.to_owned();
    }

    // Only the last segment matters to `derive_path`, so `../` prefixes can
    // be left alone. A bundle named by a dot segment (`../index.md`) has no
    // name to derive a path from.
    let id = id_from_source(path);
    match slug_of(&id) {
        "." | ".." => target.to_owned(),
        _ => format!("{}{}", derive_path(&id), fragment),
    }
}

fn is_markdown(path: &str) -> bool {
    MARKDOWN_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(&format!(".{}", ext)))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_convert_sibling_post() {
        assert_eq!(convert("other.md"), "/blog/other");
    }

    #[test]
    fn test_convert_nested_post() {
        assert_eq!(convert("../2023/intro.md"), "/blog/intro");
    }

    #[test]
    fn test_convert_bundle() {
        assert_eq!(convert("./intro/index.md"), "/blog/intro");
    }

    #[test]
    fn test_convert_dot_segment_bundle_unchanged() {
        assert_eq!(convert("../index.md"), "../index.md");
        assert_eq!(convert("../../index.md#top"), "../../index.md#top");
    }

    #[test]
    fn test_convert_keeps_fragment() {
        assert_eq!(convert("other.md#setup"), "/blog/other#setup");
    }

    #[test]
    fn test_convert_asset_unchanged() {
        assert_eq!(convert("./diagram.png"), "./diagram.png");
    }

    #[test]
    fn test_convert_absolute_unchanged() {
        assert_eq!(
            convert("https://remote.org/readme.md"),
            "https://remote.org/readme.md"
        );
    }

    #[test]
    fn test_convert_anchor_unchanged() {
        assert_eq!(convert("#top"), "#top");
    }
}
