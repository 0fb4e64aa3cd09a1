//! Canonical URL construction for pages ([`UrlPolicy`]) and resolution of
//! relative link targets against a page's full URL ([`Converter`]).

use url::{ParseError, Url};

const HTML_EXTENSION: &str = ".html";

/// Maps page ids to URLs. Built once from the site configuration.
#[derive(Clone, Debug)]
pub struct UrlPolicy {
    /// Scheme and host without a trailing slash, e.g. `https://example.org`.
    pub domain: String,

    /// Path prefix for every page; always begins with `/`.
    pub root: String,

    /// When set, `.html` is left off page URLs.
    pub clean_urls: bool,
}

impl UrlPolicy {
    /// Joins the non-empty `parts` with `/`, collapses repeated slashes, and
    /// appends `.html` when `ext` is set and clean URLs are off. An existing
    /// `.html` suffix is not doubled.
    pub fn join(&self, parts: &[&str], ext: bool) -> String {
        let joined = parts
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("/");
        let mut url = collapse_slashes(&joined);
        if ext && !self.clean_urls {
            if url.ends_with(HTML_EXTENSION) {
                url.truncate(url.len() - HTML_EXTENSION.len());
            }
            url.push_str(HTML_EXTENSION);
        }
        url
    }

    /// The site-relative URL for the page with `id`. The `index` page maps
    /// to the root itself.
    pub fn page_url(&self, id: &str) -> String {
        match id {
            "index" => self.root.clone(),
            _ => self.join(&[&self.root, id], true),
        }
    }

    /// The absolute URL for the page with `id`.
    pub fn full_url(&self, id: &str) -> String {
        format!("{}{}", self.domain, self.page_url(id))
    }

    /// The absolute URL of the site's home page.
    pub fn home(&self) -> String {
        format!("{}{}", self.domain, self.root)
    }
}

fn collapse_slashes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_slash = false;
    for c in s.chars() {
        if c == '/' {
            if last_slash {
                continue;
            }
            last_slash = true;
        } else {
            last_slash = false;
        }
        out.push(c);
    }
    out
}

/// Resolves link targets found in a page body against that page's URL so the
/// body can be read out of context (e.g. in a feed reader).
pub struct Converter {
    base: Url,
}

impl Converter {
    /// Constructs a new `Converter` anchored at `base`, which must be an
    /// absolute URL.
    pub fn new(base: &str) -> Result<Converter> {
        Ok(Converter {
            base: Url::parse(base)?,
        })
    }

    /// Absolute targets pass through unchanged; relative ones (including
    /// bare fragments) are joined onto the base.
    pub fn convert(&self, target: &str) -> Result<String> {
        match Url::parse(target) {
            Ok(_) => Ok(target.to_owned()),
            Err(ParseError::RelativeUrlWithoutBase) => {
                Ok(self.base.join(target)?.to_string())
            }
            Err(e) => Err(e),
        }
    }
}

type Result<T> = std::result::Result<T, ParseError>;
