use crate::links;
use pulldown_cmark::*;

/// Converts markdown to HTML, appending the result to `w`.
///
/// Headings are demoted twice so they sit below the site title (h1) and the
/// post title (h2), and links to other posts' source files are rewritten to
/// canonical paths (see [`links::convert`]).
pub fn to_html(w: &mut String, markdown: &str) {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    html::push_html(w, Parser::new_ext(markdown, options).map(convert_event));
}

fn convert_event(ev: Event) -> Event {
    match ev {
        Event::Start(tag) => Event::Start(convert_tag(tag)),
        Event::End(tag) => Event::End(convert_tag(tag)),
        _ => ev,
    }
}

fn convert_tag(tag: Tag) -> Tag {
    match tag {
        Tag::Heading(level) => Tag::Heading((level + 2).min(6)),
        Tag::Link(link, url, title) => Tag::Link(
            link,
            CowStr::Boxed(links::convert(&url).into_boxed_str()),
            title,
        ),
        _ => tag,
    }
}
