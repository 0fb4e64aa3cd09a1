//! Conversions from pages and configuration into [`Value`]s for the
//! templates. Page references (neighbours, archive entries, tags) are
//! resolved to shallow page summaries so templates never chase ids.

use crate::config::SiteConfig;
use crate::content::{Content, Tags};
use crate::index::{PageIndex, Select};
use crate::normalize::scalar_to_string;
use crate::page::{Kind, Page, TIME_FORMAT};
use crate::url::UrlPolicy;
use chrono::{Datelike, NaiveDateTime};
use gtmpl_value::Value;
use serde_yaml::Value as Yaml;
use std::collections::HashMap;

pub type Object = HashMap<String, Value>;

/// Converts metadata and configuration values. Mapping keys that aren't
/// scalars are dropped.
pub fn from_yaml(yaml: &Yaml) -> Value {
    match yaml {
        Yaml::Null => Value::Nil,
        Yaml::Bool(b) => Value::Bool(*b),
        Yaml::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Value::from(i),
            (None, Some(f)) => Value::from(f),
            (None, None) => Value::String(n.to_string()),
        },
        Yaml::String(s) => Value::String(s.clone()),
        Yaml::Sequence(seq) => Value::Array(seq.iter().map(from_yaml).collect()),
        Yaml::Mapping(mapping) => Value::Object(
            mapping
                .iter()
                .filter_map(|(k, v)| scalar_to_string(k).map(|k| (k, from_yaml(v))))
                .collect(),
        ),
    }
}

/// A timestamp as an object, so templates can pick their format.
pub fn time(t: NaiveDateTime) -> Value {
    let mut m = Object::new();
    m.insert("iso".to_owned(), t.format("%Y-%m-%dT%H:%M:%S").to_string().into());
    m.insert("date".to_owned(), t.format("%Y-%m-%d").to_string().into());
    m.insert("display".to_owned(), t.format(TIME_FORMAT).to_string().into());
    m.insert("year".to_owned(), Value::from(t.year() as i64));
    m.insert("month".to_owned(), Value::from(t.month() as i64));
    m.insert("month_name".to_owned(), t.format("%B").to_string().into());
    m.insert("day".to_owned(), Value::from(t.day() as i64));
    Value::Object(m)
}

fn opt_time(t: Option<NaiveDateTime>) -> Value {
    t.map_or(Value::Nil, time)
}

fn string(s: &str) -> Value {
    Value::String(s.to_owned())
}

fn kind_name(page: &Page) -> &'static str {
    match page.kind {
        Kind::Content(_) => "content",
        Kind::Archive(_) => "archive",
        Kind::Tag(_) => "tag",
    }
}

/// The fields every page reference resolves to.
pub fn summary(page: &Page, urls: &UrlPolicy) -> Value {
    let mut m = Object::new();
    m.insert("id".to_owned(), string(page.id()));
    m.insert("url".to_owned(), page.url(urls).into());
    m.insert("full_url".to_owned(), page.full_url(urls).into());
    m.insert("title".to_owned(), string(&page.title));
    m.insert("kind".to_owned(), string(kind_name(page)));
    m.insert("date".to_owned(), opt_time(page.date));
    m.insert("posted".to_owned(), opt_time(page.posted_or_date()));
    m.insert("backposted".to_owned(), Value::Bool(page.is_backposted()));
    match &page.kind {
        Kind::Content(content) => {
            m.insert("summary".to_owned(), string(&content.summary));
            m.insert(
                "tags".to_owned(),
                Value::Array(content.tags.names().into_iter().map(string).collect()),
            );
        }
        Kind::Tag(tag) => {
            m.insert("name".to_owned(), string(&tag.name));
            m.insert("count".to_owned(), Value::from(tag.len() as i64));
        }
        Kind::Archive(_) => {}
    }
    Value::Object(m)
}

/// Summaries of `pages`, in order.
pub fn summaries<'a>(pages: impl IntoIterator<Item = &'a Page>, urls: &UrlPolicy) -> Value {
    Value::Array(pages.into_iter().map(|page| summary(page, urls)).collect())
}

fn reference(id: Option<&String>, index: &PageIndex, urls: &UrlPolicy) -> Value {
    id.and_then(|id| index.get(id))
        .map_or(Value::Nil, |page| summary(page, urls))
}

/// Site settings as template globals. Unknown keys go in first so the
/// typed settings win on a name clash.
pub fn site(site: &SiteConfig) -> Object {
    let urls = site.urls();
    let mut m: Object = site
        .extra
        .iter()
        .map(|(k, v)| (k.clone(), from_yaml(v)))
        .collect();
    m.insert("domain".to_owned(), string(&site.domain));
    m.insert("root".to_owned(), string(&site.root));
    m.insert("clean_urls".to_owned(), Value::Bool(site.clean_urls));
    m.insert("lang".to_owned(), string(&site.lang));
    m.insert("site_title".to_owned(), string(&site.site_title));
    m.insert("description".to_owned(), string(&site.description));
    m.insert("title_format".to_owned(), string(&site.title_format));
    m.insert("default_template".to_owned(), string(&site.default_template));
    m.insert("month_archives".to_owned(), Value::Bool(site.month_archives));
    m.insert("home".to_owned(), urls.home().into());
    m.insert("head_title".to_owned(), string(&site.site_title));
    let feed_url = site
        .feed
        .as_ref()
        .map(|feed| format!("{}{}", site.domain, urls.join(&[&site.root, feed], false)));
    m.insert("feed".to_owned(), feed_url.map_or(Value::Nil, Value::from));
    m
}

/// Listings computed once per build from the finished index.
pub fn listings(index: &PageIndex, urls: &UrlPolicy) -> Object {
    let mut m = Object::new();
    m.insert("pages".to_owned(), summaries(index.select(&Select::new()), urls));
    m.insert(
        "pages_chrono".to_owned(),
        summaries(index.select(&Select::new().chronological(true)), urls),
    );
    m.insert("site_tags".to_owned(), summaries(index.tags_by_name(), urls));
    m.insert("tags_by_name".to_owned(), summaries(index.tags_by_name(), urls));
    m.insert("tags_by_count".to_owned(), summaries(index.tags_by_count(), urls));
    m.insert(
        "years".to_owned(),
        Value::Array(index.years().iter().map(|y| Value::from(*y as i64)).collect()),
    );
    m
}

/// A page's own fields: its metadata attributes, then the well-known
/// fields, then whatever its kind adds.
pub fn page(page: &Page, index: &PageIndex, urls: &UrlPolicy) -> Object {
    let mut m: Object = page
        .attrs
        .iter()
        .map(|(k, v)| (k.clone(), from_yaml(v)))
        .collect();
    if let Value::Object(summary) = summary(page, urls) {
        m.extend(summary);
    }
    m.insert("template".to_owned(), string(&page.template));

    match &page.kind {
        Kind::Content(content) => content_fields(&mut m, content, index, urls),
        Kind::Archive(archive) => {
            m.insert(
                "entries".to_owned(),
                summaries(archive.entries.iter().filter_map(|id| index.get(id)), urls),
            );
            m.insert("year".to_owned(), Value::from(archive.year as i64));
            m.insert(
                "month".to_owned(),
                archive.month.map_or(Value::Nil, |month| Value::from(month as i64)),
            );
        }
        Kind::Tag(tag) => {
            m.insert(
                "entries".to_owned(),
                summaries(index.select(&Select::new().tag(&tag.name)), urls),
            );
            m.insert(
                "tagged".to_owned(),
                summaries(tag.tagged.iter().filter_map(|id| index.get(id)), urls),
            );
        }
    }
    m
}

fn content_fields(m: &mut Object, content: &Content, index: &PageIndex, urls: &UrlPolicy) {
    m.insert("content".to_owned(), string(&content.content));
    m.insert(
        "month_name".to_owned(),
        content.month_name.as_deref().map_or(Value::Nil, string),
    );
    m.insert("modified".to_owned(), opt_time(content.modified));
    m.insert("prevpost".to_owned(), reference(content.prevpost.as_ref(), index, urls));
    m.insert("nextpost".to_owned(), reference(content.nextpost.as_ref(), index, urls));

    let tags = match &content.tags {
        Tags::Linked(links) => links
            .values()
            .filter_map(|id| index.get(id))
            .map(|tag| summary(tag, urls))
            .collect(),
        Tags::Names(names) => names.iter().map(|name| string(name)).collect(),
    };
    m.insert("tags".to_owned(), Value::Array(tags));
    m.insert(
        "tag_names".to_owned(),
        Value::Array(content.tags.names().into_iter().map(string).collect()),
    );
}
