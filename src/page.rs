//! Defines [`Page`], the entity every output file is rendered from, and the
//! closed set of page variants ([`Kind`]).

use crate::archive::Archive;
use crate::content::Content;
use crate::tag::TagPage;
use crate::url::UrlPolicy;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::time::UNIX_EPOCH;

/// Page ids double as index keys and as output paths relative to the deploy
/// directory (sans extension).
pub type PageId = String;

/// Display format for timestamps handed out by [`Page::get`].
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A page of the site. Well-known fields are typed; anything else from the
/// source document's metadata lives in `attrs`.
#[derive(Clone, Debug)]
pub struct Page {
    id: PageId,

    /// Nominal creation time. Undated pages are left out of chronological
    /// listings and archives.
    pub date: Option<NaiveDateTime>,

    /// Time the page became public. For content pages this defaults to
    /// `date`.
    pub posted: Option<NaiveDateTime>,

    pub title: String,

    /// Template name; empty means the site default.
    pub template: String,

    /// Extension metadata, keyed by normalized key name.
    pub attrs: BTreeMap<String, Value>,

    pub kind: Kind,
}

/// Page variants.
#[derive(Clone, Debug)]
pub enum Kind {
    Content(Content),
    Archive(Archive),
    Tag(TagPage),
}

impl Page {
    /// Creates an untitled, undated page. The id can't be changed afterwards.
    pub fn new(id: impl Into<PageId>, kind: Kind) -> Page {
        Page {
            id: id.into(),
            date: None,
            posted: None,
            title: String::new(),
            template: String::new(),
            attrs: BTreeMap::new(),
            kind,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_dated(&self) -> bool {
        self.date.is_some()
    }

    /// Origin order: `date` (epoch if absent), then id.
    pub fn origin_key(&self) -> (NaiveDateTime, &str) {
        (self.date.unwrap_or_else(epoch), &self.id)
    }

    /// Posted order: `posted`, falling back to `date`, then id.
    pub fn posted_key(&self) -> (NaiveDateTime, &str) {
        (self.posted_or_date().unwrap_or_else(epoch), &self.id)
    }

    pub fn posted_or_date(&self) -> Option<NaiveDateTime> {
        self.posted.or(self.date)
    }

    /// A page is backposted when its posted calendar date is strictly later
    /// than its origin calendar date.
    pub fn is_backposted(&self) -> bool {
        match (self.date, self.posted) {
            (Some(date), Some(posted)) => posted.date() > date.date(),
            _ => false,
        }
    }

    pub fn url(&self, urls: &UrlPolicy) -> String {
        urls.page_url(&self.id)
    }

    pub fn full_url(&self, urls: &UrlPolicy) -> String {
        urls.full_url(&self.id)
    }

    /// Generic read access by key. Named fields are served first, then the
    /// extension attributes.
    pub fn get(&self, key: &str) -> Option<Value> {
        let time = |t: Option<NaiveDateTime>| {
            t.map(|t| Value::String(t.format(TIME_FORMAT).to_string()))
        };
        match key {
            "id" => Some(Value::String(self.id.clone())),
            "title" => Some(Value::String(self.title.clone())),
            "template" => Some(Value::String(self.template.clone())),
            "date" => time(self.date),
            "posted" => time(self.posted_or_date()),
            _ => self.attrs.get(key).cloned(),
        }
    }

    pub fn as_content(&self) -> Option<&Content> {
        match &self.kind {
            Kind::Content(content) => Some(content),
            _ => None,
        }
    }

    pub fn as_content_mut(&mut self) -> Option<&mut Content> {
        match &mut self.kind {
            Kind::Content(content) => Some(content),
            _ => None,
        }
    }

    pub fn as_archive(&self) -> Option<&Archive> {
        match &self.kind {
            Kind::Archive(archive) => Some(archive),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> Option<&TagPage> {
        match &self.kind {
            Kind::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn as_tag_mut(&mut self) -> Option<&mut TagPage> {
        match &mut self.kind {
            Kind::Tag(tag) => Some(tag),
            _ => None,
        }
    }
}

fn epoch() -> NaiveDateTime {
    DateTime::<Utc>::from(UNIX_EPOCH).naive_utc()
}
