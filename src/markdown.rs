//! Markdown conversion. Page bodies are rendered with [`to_html`]; feed
//! bodies go through [`to_html_with_base`] so relative links survive being
//! read outside the site; summaries are flattened with [`to_text`].

use crate::url::Converter as LinkConverter;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};
use regex::Regex;
use url::ParseError as UrlParseError;

// `href`/`src` attributes in raw HTML, double- or single-quoted.
const HTML_LINK_ATTRIBUTE: &str = r#"(?i)\b(?:href|src)\s*=\s*(?:"([^"]*)"|'([^']*)')"#;

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Converts markdown to HTML.
pub fn to_html(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(markdown, options()));
    out
}

/// Converts markdown to HTML, resolving every relative link and image target
/// against `base` (an absolute URL). Targets in raw HTML `href` and `src`
/// attributes are resolved too.
pub fn to_html_with_base(markdown: &str, base: &str) -> Result<String, Error> {
    let event_converter = EventConverter {
        link_converter: LinkConverter::new(base)?,
        html_attribute: Regex::new(HTML_LINK_ATTRIBUTE)?,
    };
    let events = Parser::new_ext(markdown, options())
        .map(|ev| event_converter.convert(ev))
        .collect::<Result<Vec<_>, _>>()?;
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    Ok(out)
}

/// Converts markdown to human-readable text: the text of the rendered
/// document with all markup (including inline HTML) dropped. Blocks are
/// separated by newlines.
pub fn to_text(markdown: &str) -> String {
    let mut out = String::new();
    for ev in Parser::new_ext(markdown, options()) {
        match ev {
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak | Event::HardBreak => out.push(' '),
            Event::End(Tag::Paragraph)
            | Event::End(Tag::Heading(_))
            | Event::End(Tag::Item)
            | Event::End(Tag::CodeBlock(_)) => out.push('\n'),
            _ => {}
        }
    }
    out.trim().to_owned()
}

struct EventConverter {
    link_converter: LinkConverter,
    html_attribute: Regex,
}

impl EventConverter {
    fn convert_tag<'b>(&self, tag: Tag<'b>) -> Result<Tag<'b>, UrlParseError> {
        Ok(match tag {
            Tag::Link(link_type, url, title) => Tag::Link(
                link_type,
                CowStr::Boxed(self.link_converter.convert(&url)?.into_boxed_str()),
                title,
            ),
            Tag::Image(link_type, url, title) => Tag::Image(
                link_type,
                CowStr::Boxed(self.link_converter.convert(&url)?.into_boxed_str()),
                title,
            ),
            _ => tag,
        })
    }

    fn convert_html(&self, html: &str) -> Result<String, UrlParseError> {
        let mut out = String::with_capacity(html.len());
        let mut last = 0;
        for caps in self.html_attribute.captures_iter(html) {
            if let Some(target) = caps.get(1).or_else(|| caps.get(2)) {
                out.push_str(&html[last..target.start()]);
                out.push_str(&self.link_converter.convert(target.as_str())?);
                last = target.end();
            }
        }
        out.push_str(&html[last..]);
        Ok(out)
    }

    fn convert<'b>(&self, ev: Event<'b>) -> Result<Event<'b>, UrlParseError> {
        Ok(match ev {
            Event::Start(tag) => Event::Start(self.convert_tag(tag)?),
            Event::Html(html) => {
                Event::Html(CowStr::Boxed(self.convert_html(&html)?.into_boxed_str()))
            }
            _ => ev,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a link target (or the base) isn't a valid URL.
    #[error(transparent)]
    UrlParse(#[from] UrlParseError),

    #[error(transparent)]
    Pattern(#[from] regex::Error),
}
