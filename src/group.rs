//! Partitions sorted posts into buckets for listing pages: one bucket per tag
//! and one per (year, month) of the effective date.

use crate::post::Post;
use crate::tag::Tag;
use chrono::{Datelike, NaiveDate};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// A bucket of items sharing a key.
#[derive(Debug, Clone, PartialEq)]
pub struct Group<K, T> {
    pub key: K,
    pub items: Vec<T>,
}

/// Groups `items` by the keys `keys_of` returns for each of them. An item
/// lands in every bucket matching one of its keys (once, even if a key is
/// repeated). Items keep their input order within a bucket; the buckets
/// themselves are ordered by `cmp`.
pub fn group_by<T, K, I, F, C>(
    items: impl IntoIterator<Item = T>,
    keys_of: F,
    mut cmp: C,
) -> Vec<Group<K, T>>
where
    T: Clone,
    K: Ord + Clone,
    I: IntoIterator<Item = K>,
    F: Fn(&T) -> I,
    C: FnMut(&K, &K) -> Ordering,
{
    let mut buckets: BTreeMap<K, Vec<T>> = BTreeMap::new();
    let mut seen: Vec<K> = Vec::new();
    for item in items {
        seen.clear();
        for key in keys_of(&item) {
            if seen.contains(&key) {
                continue;
            }
            seen.push(key.clone());
            buckets.entry(key).or_default().push(item.clone());
        }
    }

    let mut groups: Vec<Group<K, T>> = buckets
        .into_iter()
        .map(|(key, items)| Group { key, items })
        .collect();
    groups.sort_by(|a, b| cmp(&a.key, &b.key));
    groups
}

/// Groups posts by tag, alphabetically by slug. A post tagged `[a, b]`
/// appears in both the `a` and the `b` group.
pub fn group_by_tag<'a, I>(posts: I) -> Vec<Group<Tag, &'a Post>>
where
    I: IntoIterator<Item = &'a Post>,
{
    group_by(posts, |p| p.tags.clone(), |a: &Tag, b: &Tag| a.cmp(b))
}

/// Returns the posts carrying the tag with the given slug, in input order.
pub fn posts_with_tag<'a>(posts: &'a [Post], slug: &str) -> Vec<&'a Post> {
    posts
        .iter()
        .filter(|p| p.tags.iter().any(|t| t.slug == slug))
        .collect()
}

/// A calendar month, as used by archive listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    /// 1 through 12.
    pub month: u32,
}

impl YearMonth {
    /// The month of a post's effective date, in the date's own offset.
    pub fn of(post: &Post) -> YearMonth {
        let date = post.effective_date();
        YearMonth {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The English month name, e.g. `March`.
    pub fn month_name(&self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|d| d.format("%B").to_string())
            .unwrap_or_else(|| self.month.to_string())
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.month_name(), self.year)
    }
}

/// Groups posts by the month of their effective date, most recent month
/// first.
pub fn group_by_year_month<'a, I>(posts: I) -> Vec<Group<YearMonth, &'a Post>>
where
    I: IntoIterator<Item = &'a Post>,
{
    group_by(
        posts,
        |p| std::iter::once(YearMonth::of(p)),
        |a: &YearMonth, b: &YearMonth| b.cmp(a),
    )
}

/// Nests month groups under their year, most recent year first. This is the
/// shape of the archives page.
pub fn archive<'a, I>(posts: I) -> Vec<Group<i32, Group<YearMonth, &'a Post>>>
where
    I: IntoIterator<Item = &'a Post>,
{
    group_by(
        group_by_year_month(posts),
        |g| std::iter::once(g.key.year),
        |a: &i32, b: &i32| b.cmp(a),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::test::post;
    use crate::sort::sort_posts;
    use url::Url;

    fn tagged(id: &str, date: &str, tags: &[&str]) -> Post {
        let tags_url = Url::parse("https://example.org/tags/").unwrap();
        let mut p = post(id, date, None);
        p.tags = tags.iter().map(|t| Tag::new(t, &tags_url).unwrap()).collect();
        p
    }

    fn ids(posts: &[&Post]) -> Vec<String> {
        posts.iter().map(|p| p.id.clone()).collect()
    }

    #[test]
    fn test_group_by_tag_membership() {
        let posts = vec![
            tagged("both", "2024-03-01", &["a", "b"]),
            tagged("only-b", "2024-02-01", &["b"]),
        ];
        let groups = group_by_tag(&posts);

        let keys: Vec<&str> = groups.iter().map(|g| g.key.slug.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(ids(&groups[0].items), vec!["both"]);
        assert_eq!(ids(&groups[1].items), vec!["both", "only-b"]);
    }

    #[test]
    fn test_group_by_tag_alphabetical() {
        let posts = vec![
            tagged("1", "2024-03-01", &["zig"]),
            tagged("2", "2024-02-01", &["astro"]),
            tagged("3", "2024-01-01", &["Rust"]),
        ];
        let keys: Vec<String> = group_by_tag(&posts)
            .into_iter()
            .map(|g| g.key.slug)
            .collect();
        assert_eq!(keys, vec!["astro", "rust", "zig"]);
    }

    #[test]
    fn test_group_by_tag_keeps_sorted_order() {
        let mut posts = vec![
            tagged("old", "2023-01-01", &["a"]),
            tagged("new", "2024-01-01", &["a"]),
        ];
        sort_posts(&mut posts);
        let groups = group_by_tag(&posts);
        assert_eq!(ids(&groups[0].items), vec!["new", "old"]);
    }

    #[test]
    fn test_repeated_key_counted_once() {
        let groups = group_by(
            vec!["x"],
            |_| vec!["k", "k"],
            |a: &&str, b: &&str| a.cmp(b),
        );
        assert_eq!(groups, vec![Group { key: "k", items: vec!["x"] }]);
    }

    #[test]
    fn test_group_by_year_month() {
        let posts = vec![
            post("may", "2024-05-20", None),
            post("may-early", "2024-05-01", None),
            post("dec", "2023-12-31", None),
            post("mod", "2023-01-01", Some("2024-05-02")),
        ];
        let groups = group_by_year_month(&posts);
        let keys: Vec<YearMonth> = groups.iter().map(|g| g.key).collect();
        assert_eq!(
            keys,
            vec![
                YearMonth { year: 2024, month: 5 },
                YearMonth { year: 2023, month: 12 },
            ]
        );
        assert_eq!(ids(&groups[0].items), vec!["may", "may-early", "mod"]);
        assert_eq!(groups[1].key.to_string(), "December 2023");
    }

    #[test]
    fn test_archive() {
        let posts = vec![
            post("a", "2024-03-01", None),
            post("b", "2024-01-15", None),
            post("c", "2022-07-04", None),
        ];
        let years = archive(&posts);
        let keys: Vec<i32> = years.iter().map(|g| g.key).collect();
        assert_eq!(keys, vec![2024, 2022]);

        let months: Vec<u32> = years[0].items.iter().map(|g| g.key.month).collect();
        assert_eq!(months, vec![3, 1]);
    }

    #[test]
    fn test_posts_with_tag() {
        let posts = vec![
            tagged("1", "2024-03-01", &["Rust"]),
            tagged("2", "2024-02-01", &["go"]),
        ];
        assert_eq!(ids(&posts_with_tag(&posts, "rust")), vec!["1"]);
        assert!(posts_with_tag(&posts, "python").is_empty());
    }
}
