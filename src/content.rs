//! Defines [`Content`] and the [`Parser`] that turns source documents into
//! content [`Page`]s.
//!
//! A document is a YAML metadata block, a blank line, and a markdown body:
//!
//! ```md
//! title: Hello, world!
//! date: 2021-04-16
//! tags: greet, meta
//!
//! <summary>A first post.</summary>
//! # Hello
//!
//! World
//! ```
//!
//! Dated documents get the id `<year>/<base name>`; undated ones keep their
//! base name.

use crate::config::SiteConfig;
use crate::markdown;
use crate::normalize::{self, is_blank_yaml, norm_key, norm_tags, norm_time, scalar_to_string};
use crate::page::{Kind, Page, PageId};
use chrono::{DateTime, Datelike, Local, NaiveDateTime};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Template for dated pages that don't name one.
pub const ENTRY_TEMPLATE: &str = "entry";

const SUMMARY_OPEN: &str = "<summary>";
const SUMMARY_CLOSE: &str = "</summary>";

/// The fields specific to a page parsed from a document.
#[derive(Clone, Debug, Default)]
pub struct Content {
    /// The body as HTML, without the summary region.
    pub content: String,

    /// Plain-text summary, from the `<summary>` region or the `summary`
    /// metadata key.
    pub summary: String,

    pub tags: Tags,

    /// Full month name of `date`, for dated pages.
    pub month_name: Option<String>,

    /// The previous dated page in the same year, if any.
    pub prevpost: Option<PageId>,

    /// The next dated page in the same year, if any.
    pub nextpost: Option<PageId>,

    /// Modification time of the source file.
    pub modified: Option<NaiveDateTime>,

    source: String,
}

impl Content {
    /// The markdown `content` was rendered from.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// A page's tags. Parsing yields bare names; adding the page to the
/// [`crate::index::PageIndex`] links each name to its tag page.
#[derive(Clone, Debug, PartialEq)]
pub enum Tags {
    Names(BTreeSet<String>),
    Linked(BTreeMap<String, PageId>),
}

impl Default for Tags {
    fn default() -> Self {
        Tags::Names(BTreeSet::new())
    }
}

impl Tags {
    /// Tag names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Tags::Names(names) => names.iter().map(String::as_str).collect(),
            Tags::Linked(links) => links.keys().map(String::as_str).collect(),
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        match self {
            Tags::Names(names) => names.contains(tag),
            Tags::Linked(links) => links.contains_key(tag),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Tags::Names(names) => names.len(),
            Tags::Linked(links) => links.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parses content [`Page`]s from source files.
pub struct Parser<'a> {
    site: &'a SiteConfig,
}

impl<'a> Parser<'a> {
    pub fn new(site: &'a SiteConfig) -> Parser<'a> {
        Parser { site }
    }

    /// Walks `source_directory` and parses every file whose extension is one
    /// of the site's content extensions. Files are visited in name order so
    /// repeated builds see the same sequence.
    pub fn parse_pages(&self, source_directory: &Path) -> Result<Vec<Page>> {
        let mut pages = Vec::new();
        let walker = WalkDir::new(source_directory)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()));
        for result in walker {
            let entry = result?;
            if entry.file_type().is_file() && self.is_document(entry.path()) {
                pages.push(self.read_page(entry.path())?);
            }
        }
        Ok(pages)
    }

    fn is_document(&self, path: &Path) -> bool {
        match path.extension().and_then(OsStr::to_str) {
            Some(ext) => self.site.content_extensions.iter().any(|e| e == ext),
            None => false,
        }
    }

    /// Reads and parses a single document. Errors are annotated with the
    /// file's path.
    pub fn read_page(&self, path: &Path) -> Result<Page> {
        self._read_page(path).map_err(|e| {
            Error::Annotated(format!("parsing `{}`", path.display()), Box::new(e))
        })
    }

    fn _read_page(&self, path: &Path) -> Result<Page> {
        let input = std::fs::read_to_string(path)?;
        let name = path
            .file_name()
            .and_then(OsStr::to_str)
            .ok_or_else(|| Error::InvalidFileName(path.to_owned()))?;
        let mut page = self.parse_page(name, &input)?;
        let modified = std::fs::metadata(path)?.modified().ok();
        if let Some(content) = page.as_content_mut() {
            content.modified =
                modified.map(|t| DateTime::<Local>::from(t).naive_local());
        }
        Ok(page)
    }

    /// Parses a document named `name` (a file name; only its stem is used)
    /// from `input`.
    pub fn parse_page(&self, name: &str, input: &str) -> Result<Page> {
        let base = Path::new(name)
            .file_stem()
            .and_then(OsStr::to_str)
            .unwrap_or("");
        if base.is_empty() || base.contains('/') || base.contains('\\') {
            return Err(Error::InvalidId(name.to_owned()));
        }

        let input = input.replace("\r\n", "\n");
        let (head, body) = match input.find("\n\n") {
            Some(i) => (&input[..i], &input[i + 2..]),
            None => (input.as_str(), ""),
        };
        let metadata = match is_blank_yaml(head) {
            true => Mapping::new(),
            false => match serde_yaml::from_str::<Value>(head)? {
                Value::Mapping(mapping) => mapping,
                Value::Null => Mapping::new(),
                _ => return Err(Error::MetadataNotMapping),
            },
        };

        let mut date = None;
        let mut posted = None;
        let mut title = String::new();
        let mut template = String::new();
        let mut tags = BTreeSet::new();
        let mut summary = String::new();
        let mut attrs = BTreeMap::new();
        for (key, value) in metadata {
            let key = match scalar_to_string(&key) {
                Some(key) => norm_key(&key),
                None => return Err(Error::InvalidKey(format!("{:?}", key))),
            };
            match key.as_str() {
                "date" => date = norm_time(&value)?,
                "posted" => posted = norm_time(&value)?,
                "tags" => tags = norm_tags(&value)?,
                "summary" => {
                    summary = scalar_to_string(&value)
                        .map(|s| markdown::to_text(&s))
                        .unwrap_or_default()
                }
                "title" => title = scalar_to_string(&value).unwrap_or_default(),
                "template" => template = scalar_to_string(&value).unwrap_or_default(),
                "id" => log::warn!("{}: ignoring `id` metadata; ids are derived", name),
                _ => {
                    attrs.insert(key, value);
                }
            }
        }

        let mut content = Content::default();
        let id = match date {
            Some(date) => {
                if template.is_empty() {
                    template = ENTRY_TEMPLATE.to_owned();
                }
                content.month_name = Some(date.format("%B").to_string());
                posted = posted.or(Some(date));
                format!("{}/{}", date.year(), base)
            }
            None => base.to_owned(),
        };

        tags.retain(|tag: &String| self.site.allows_tag(tag));
        content.tags = Tags::Names(tags);

        let (body, region) = extract_summary(body);
        if let Some(region) = region {
            content.summary = markdown::to_text(region.trim());
        } else {
            content.summary = summary;
        }
        content.source = body.trim().to_owned();
        content.content = markdown::to_html(&content.source);

        let mut page = Page::new(id, Kind::Content(content));
        page.date = date;
        page.posted = posted;
        page.title = title;
        page.template = template;
        page.attrs = attrs;
        Ok(page)
    }
}

/// Splits out the first `<summary>...</summary>` region. Returns the body
/// with the region removed and the text between the tags.
fn extract_summary(body: &str) -> (String, Option<&str>) {
    if let Some(start) = body.find(SUMMARY_OPEN) {
        let inner_start = start + SUMMARY_OPEN.len();
        if let Some(len) = body[inner_start..].find(SUMMARY_CLOSE) {
            let end = inner_start + len + SUMMARY_CLOSE.len();
            let mut rest = String::with_capacity(body.len());
            rest.push_str(&body[..start]);
            rest.push_str(&body[end..]);
            return (rest, Some(&body[inner_start..inner_start + len]));
        }
    }
    (body.to_owned(), None)
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the metadata block isn't valid YAML.
    #[error("malformed metadata: {0}")]
    Metadata(#[from] serde_yaml::Error),

    /// Returned when the metadata block is YAML but not a mapping.
    #[error("metadata must be a mapping of keys to values")]
    MetadataNotMapping,

    /// Returned for metadata keys that aren't scalars.
    #[error("invalid metadata key: {0}")]
    InvalidKey(String),

    /// Returned when a date or tag value can't be normalized.
    #[error(transparent)]
    Normalize(#[from] normalize::Error),

    /// Returned when a document's base name can't serve as a page id.
    #[error("invalid page id from file name `{0}`")]
    InvalidId(String),

    /// Returned when a source file name isn't valid UTF-8.
    #[error("invalid file name: {0:?}")]
    InvalidFileName(PathBuf),

    /// Returned for I/O errors reading source files.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Returned for errors walking the content directory.
    #[error(transparent)]
    WalkDir(#[from] walkdir::Error),

    /// An error with an annotation.
    #[error("{0}: {1}")]
    Annotated(String, Box<Error>),
}
