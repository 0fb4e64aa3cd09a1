//! Support for creating Atom feeds from the most recently posted pages.
//! [`FeedItem`] is the serializer-independent description of one entry;
//! [`write_feed`] turns a list of them into Atom XML.

use crate::config::SiteConfig;
use crate::index::{PageIndex, Select};
use crate::markdown;
use crate::page::Page;
use atom_syndication::{
    Category, Content, Entry, Error as AtomError, Feed, FixedDateTime, Generator, Link, Text,
};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_yaml::Value;
use std::io::Write;

/// Title used for pages without one.
pub const UNTITLED: &str = "Untitled";

/// One feed entry, derived from a dated content page.
#[derive(Clone, Debug, PartialEq)]
pub struct FeedItem {
    /// The page title (or [`UNTITLED`]), suffixed with ` [YYYY-MM-DD]` when
    /// the page is backposted.
    pub title: String,

    /// The page's full URL; also the entry id.
    pub link: String,

    /// `posted`, else `date`.
    pub published: NaiveDateTime,

    /// `(tag, scheme)` pairs; the scheme is the site's home URL.
    pub categories: Vec<(String, String)>,

    /// The body as HTML with link targets made absolute.
    pub content: String,

    pub enclosure: Option<Enclosure>,
}

/// Media attached to an entry, taken verbatim from the page's `enclosure`
/// metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct Enclosure {
    pub url: String,
    pub length: Option<String>,
    pub mime_type: Option<String>,
}

impl FeedItem {
    /// Derives the feed entry for `page`. Returns `None` for pages that
    /// aren't dated content pages.
    pub fn from_page(site: &SiteConfig, page: &Page) -> Result<Option<FeedItem>> {
        let (content, published) = match (page.as_content(), page.posted_or_date()) {
            (Some(content), Some(published)) => (content, published),
            _ => return Ok(None),
        };
        let urls = site.urls();
        let link = page.full_url(&urls);

        let mut title = match page.title.is_empty() {
            true => UNTITLED.to_owned(),
            false => page.title.clone(),
        };
        if let (true, Some(date)) = (page.is_backposted(), page.date) {
            title.push_str(&format!(" [{}]", date.format("%Y-%m-%d")));
        }

        let home = urls.home();
        Ok(Some(FeedItem {
            title,
            published,
            categories: content
                .tags
                .names()
                .into_iter()
                .map(|tag| (tag.to_owned(), home.clone()))
                .collect(),
            content: markdown::to_html_with_base(content.source(), &link)?,
            enclosure: page.attrs.get("enclosure").and_then(Enclosure::from_value),
            link,
        }))
    }

    fn to_entry(&self) -> Entry {
        let published = to_fixed(self.published);
        let mut links = vec![link(&self.link, "alternate")];
        if let Some(enclosure) = &self.enclosure {
            let mut enclosure_link = link(&enclosure.url, "enclosure");
            enclosure_link.set_length(enclosure.length.clone());
            enclosure_link.set_mime_type(enclosure.mime_type.clone());
            links.push(enclosure_link);
        }

        let mut content = Content::default();
        content.set_content_type(Some("html".to_owned()));
        content.set_value(Some(self.content.clone()));

        let mut entry = Entry::default();
        entry.set_id(self.link.clone());
        entry.set_title(self.title.clone());
        entry.set_updated(published);
        entry.set_published(Some(published));
        entry.set_links(links);
        entry.set_categories(
            self.categories
                .iter()
                .map(|(term, scheme)| {
                    let mut category = Category::default();
                    category.set_term(term.clone());
                    category.set_scheme(Some(scheme.clone()));
                    category
                })
                .collect::<Vec<_>>(),
        );
        entry.set_content(Some(content));
        entry
    }
}

impl Enclosure {
    /// Accepts either a bare URL or a mapping with `url` (or `href`), and
    /// optional `length` and `type`.
    pub fn from_value(value: &Value) -> Option<Enclosure> {
        let string = |v: &Value| crate::normalize::scalar_to_string(v);
        match value {
            Value::Mapping(mapping) => {
                let field = |key: &str| mapping.get(&Value::String(key.to_owned())).and_then(string);
                Some(Enclosure {
                    url: field("url").or_else(|| field("href"))?,
                    length: field("length"),
                    mime_type: field("type"),
                })
            }
            other => string(other).map(|url| Enclosure {
                url,
                length: None,
                mime_type: None,
            }),
        }
    }
}

/// Builds the feed for the `site.feed_size` most recently posted pages of
/// `index` and writes it to `w`.
pub fn write_feed<W: Write>(site: &SiteConfig, index: &PageIndex, w: W) -> Result<usize> {
    let mut items = Vec::new();
    for page in index.select(&Select::new().limit(site.feed_size)) {
        if let Some(item) = FeedItem::from_page(site, page)? {
            items.push(item);
        }
    }
    let count = items.len();
    feed(site, &items).write_to(w)?.flush()?;
    Ok(count)
}

/// Assembles the Atom feed. The feed's `updated` time is the newest item's,
/// or now for an empty feed.
pub fn feed(site: &SiteConfig, items: &[FeedItem]) -> Feed {
    let home = site.urls().home();
    let updated = match items.first() {
        Some(item) => to_fixed(item.published),
        None => Utc::now().into(),
    };

    let mut generator = Generator::default();
    generator.set_value(env!("CARGO_PKG_NAME"));
    generator.set_version(Some(env!("CARGO_PKG_VERSION").to_owned()));

    let mut feed = Feed::default();
    feed.set_title(site.site_title.clone());
    feed.set_id(home.clone());
    feed.set_updated(updated);
    feed.set_links(vec![link(&home, "alternate")]);
    feed.set_generator(Some(generator));
    feed.set_lang(Some(site.lang.clone()));
    if !site.description.is_empty() {
        feed.set_subtitle(Some(Text::from(site.description.clone())));
    }
    feed.set_entries(items.iter().map(FeedItem::to_entry).collect::<Vec<_>>());
    feed
}

fn link(href: &str, rel: &str) -> Link {
    let mut link = Link::default();
    link.set_href(href);
    link.set_rel(rel);
    link
}

// Page times carry no zone; they're published as UTC.
fn to_fixed(naive: NaiveDateTime) -> FixedDateTime {
    let utc: DateTime<Utc> = Utc.from_utc_datetime(&naive);
    utc.into()
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when there is a generic I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Returned when there is an Atom-related error.
    #[error(transparent)]
    Atom(#[from] AtomError),

    /// Returned when a page body's links can't be made absolute.
    #[error("resolving links: {0}")]
    Markdown(#[from] markdown::Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::content::Parser;

    fn site() -> SiteConfig {
        SiteConfig::from_str("site_title: Notes\ndomain: https://example.org/\ndescription: d")
            .unwrap()
    }

    fn item(metadata: &str, body: &str) -> Result<Option<FeedItem>> {
        let site = site();
        let page = Parser::new(&site)
            .parse_page("post.md", &format!("{}\n\n{}", metadata, body))
            .unwrap();
        FeedItem::from_page(&site, &page)
    }

    #[test]
    fn test_backposted_title() -> Result<()> {
        let item = item("title: Late\ndate: 2021-01-01\nposted: 2021-06-01", "x")?.unwrap();
        assert_eq!("Late [2021-01-01]", item.title);
        assert_eq!("2021-06-01", item.published.format("%Y-%m-%d").to_string());
        Ok(())
    }

    #[test]
    fn test_untitled() -> Result<()> {
        let item = item("date: 2021-01-01", "x")?.unwrap();
        assert_eq!(UNTITLED, item.title);
        assert_eq!("https://example.org/2021/post.html", item.link);
        Ok(())
    }

    #[test]
    fn test_undated_page_has_no_item() -> Result<()> {
        assert_eq!(None, item("title: About", "x")?);
        Ok(())
    }

    #[test]
    fn test_links_are_absolute() -> Result<()> {
        let item = item("date: 2021-01-01", "[next](other.html) [top](/)")?.unwrap();
        assert!(item
            .content
            .contains(r#"href="https://example.org/2021/other.html""#));
        assert!(item.content.contains(r#"href="https://example.org/""#));
        Ok(())
    }

    #[test]
    fn test_raw_html_links_are_absolute() -> Result<()> {
        let item = item("date: 2021-01-01", r#"See <a href="other.html">this</a>."#)?.unwrap();
        assert_eq!(
            "<p>See <a href=\"https://example.org/2021/other.html\">this</a>.</p>\n",
            item.content
        );
        Ok(())
    }

    #[test]
    fn test_categories() -> Result<()> {
        let item = item("date: 2021-01-01\ntags: go, rust", "x")?.unwrap();
        assert_eq!(
            vec![
                ("go".to_owned(), "https://example.org/".to_owned()),
                ("rust".to_owned(), "https://example.org/".to_owned()),
            ],
            item.categories
        );
        Ok(())
    }

    #[test]
    fn test_enclosure() -> Result<()> {
        let bare = item("date: 2021-01-01\nenclosure: https://x.org/a.mp3", "x")?.unwrap();
        assert_eq!("https://x.org/a.mp3", bare.enclosure.unwrap().url);

        let full = item(
            "date: 2021-01-01\nenclosure: {url: a.mp3, length: 1024, type: audio/mpeg}",
            "x",
        )?
        .unwrap();
        assert_eq!(
            Some(Enclosure {
                url: "a.mp3".to_owned(),
                length: Some("1024".to_owned()),
                mime_type: Some("audio/mpeg".to_owned()),
            }),
            full.enclosure
        );
        Ok(())
    }

    #[test]
    fn test_write_feed() -> Result<()> {
        let site = site();
        let parser = Parser::new(&site);
        let mut index = PageIndex::new();
        for (name, metadata) in &[
            ("a.md", "title: A\ndate: 2021-01-01"),
            ("b.md", "title: B\ndate: 2021-02-01"),
            ("about.md", "title: About"),
        ] {
            let page = parser.parse_page(name, &format!("{}\n\nbody", metadata)).unwrap();
            index.add(&site, page).unwrap();
        }

        let mut out = Vec::new();
        assert_eq!(2, write_feed(&site, &index, &mut out)?);
        let xml = String::from_utf8(out).unwrap();
        assert!(xml.contains(">Notes</title>"), "{}", xml);
        assert!(xml.contains(r#"xml:lang="en""#), "{}", xml);
        assert!(xml.find(">B<").unwrap() < xml.find(">A<").unwrap(), "{}", xml);
        assert!(!xml.contains("About"), "{}", xml);
        Ok(())
    }
}
