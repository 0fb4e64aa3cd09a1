//! Defines [`PageIndex`], which owns every page of a build, keeps page ids
//! unique, maintains the tag index, derives the archives, and answers the
//! ordered queries ([`Select`]) that templates and the feed are built from.

use crate::archive;
use crate::config::SiteConfig;
use crate::content::Tags;
use crate::page::{Kind, Page, PageId};
use crate::tag::{self, TagPage};
use crate::util::neighbours;
use chrono::{Datelike, NaiveDateTime};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

/// All pages of a site.
#[derive(Debug, Default)]
pub struct PageIndex {
    pages: BTreeMap<PageId, Page>,

    /// Tag name -> tag page id.
    tags: BTreeMap<String, PageId>,

    /// Years that received an archive page.
    years: BTreeSet<i32>,
}

/// A page query. The defaults select every dated page, most recently posted
/// first.
#[derive(Clone, Debug)]
pub struct Select {
    /// Keep at most this many pages.
    pub limit: Option<usize>,

    /// Leave out undated pages.
    pub dated: bool,

    /// Keep only dated pages carrying this tag.
    pub tag: Option<String>,

    /// Oldest first instead of newest first.
    pub chronological: bool,

    /// Sort by `date` rather than `posted`. Unset means "sort by origin iff
    /// chronological".
    pub sort_by_origin: Option<bool>,
}

impl Default for Select {
    fn default() -> Self {
        Select {
            limit: None,
            dated: true,
            tag: None,
            chronological: false,
            sort_by_origin: None,
        }
    }
}

impl Select {
    pub fn new() -> Select {
        Select::default()
    }

    pub fn limit(mut self, limit: usize) -> Select {
        self.limit = Some(limit);
        self
    }

    pub fn dated(mut self, dated: bool) -> Select {
        self.dated = dated;
        self
    }

    pub fn tag(mut self, tag: &str) -> Select {
        self.tag = Some(tag.to_owned());
        self
    }

    pub fn chronological(mut self, chronological: bool) -> Select {
        self.chronological = chronological;
        self
    }

    pub fn sort_by_origin(mut self, sort_by_origin: bool) -> Select {
        self.sort_by_origin = Some(sort_by_origin);
        self
    }
}

impl PageIndex {
    pub fn new() -> PageIndex {
        PageIndex::default()
    }

    /// Adds `page` to the index. Fails if its id is taken. Each tag of a
    /// content page is resolved to its tag page, which is created (and
    /// added) on first sight; the page's tag names are then replaced by
    /// links to those tag pages.
    pub fn add(&mut self, site: &SiteConfig, mut page: Page) -> Result<()> {
        let id = page.id().to_owned();
        if self.pages.contains_key(&id) {
            return Err(Error::DuplicateId(id));
        }

        let mut tag_name = None;
        match &mut page.kind {
            Kind::Tag(tag) => tag_name = Some(tag.name.clone()),
            Kind::Content(content) => {
                let names: Vec<String> =
                    content.tags.names().into_iter().map(str::to_owned).collect();
                let mut links = BTreeMap::new();
                for name in names {
                    let tag_id = self.resolve_tag(site, &name)?;
                    if let Some(tag) = self.pages.get_mut(&tag_id).and_then(Page::as_tag_mut) {
                        tag.add(&id);
                    }
                    links.insert(name, tag_id);
                }
                content.tags = Tags::Linked(links);
            }
            Kind::Archive(_) => {}
        }

        match self.pages.entry(id) {
            Entry::Occupied(entry) => Err(Error::DuplicateId(entry.key().clone())),
            Entry::Vacant(entry) => {
                if let Some(name) = tag_name {
                    self.tags.insert(name, entry.key().clone());
                }
                entry.insert(page);
                Ok(())
            }
        }
    }

    fn resolve_tag(&mut self, site: &SiteConfig, name: &str) -> Result<PageId> {
        if let Some(id) = self.tags.get(name) {
            return Ok(id.clone());
        }
        let page = TagPage::page(site, name);
        let id = page.id().to_owned();
        self.add(site, page)?;
        Ok(id)
    }

    /// Groups dated content pages by year, links each page to its neighbours
    /// within the year (origin order), and adds a year archive page per year.
    /// With `month_archives` set, month archive pages are added as well.
    pub fn link_archives(&mut self, site: &SiteConfig) -> Result<()> {
        let mut years: BTreeMap<i32, Vec<(NaiveDateTime, PageId)>> = BTreeMap::new();
        for page in self.pages.values() {
            if let (Kind::Content(_), Some(date)) = (&page.kind, page.date) {
                years
                    .entry(date.year())
                    .or_default()
                    .push((date, page.id().to_owned()));
            }
        }

        for (year, mut posts) in years {
            posts.sort();
            let ids: Vec<PageId> = posts.iter().map(|(_, id)| id.clone()).collect();
            for (prev, id, next) in neighbours(&ids) {
                if let Some(content) = self.pages.get_mut(id).and_then(Page::as_content_mut) {
                    content.prevpost = prev.cloned();
                    content.nextpost = next.cloned();
                }
            }

            if site.month_archives {
                let mut months: BTreeMap<u32, Vec<PageId>> = BTreeMap::new();
                for (date, id) in &posts {
                    months.entry(date.month()).or_default().push(id.clone());
                }
                for (month, entries) in months {
                    self.add(site, archive::month_page(entries, year, month)?)?;
                }
            }

            log::debug!("archive {}: {} pages", year, ids.len());
            self.add(site, archive::year_page(ids, year))?;
            self.years.insert(year);
        }
        Ok(())
    }

    /// Runs a query. The result is fully materialized and totally ordered
    /// (page ids break ties).
    pub fn select(&self, query: &Select) -> Vec<&Page> {
        let by_origin = query.sort_by_origin.unwrap_or(query.chronological);
        let dated = query.dated || query.tag.is_some();
        let mut results: Vec<&Page> = self
            .pages
            .values()
            .filter(|page| !dated || page.is_dated())
            .filter(|page| match &query.tag {
                Some(tag) => page.as_content().map_or(false, |c| c.tags.contains(tag)),
                None => true,
            })
            .collect();

        if by_origin {
            results.sort_by(|a, b| a.origin_key().cmp(&b.origin_key()));
        } else {
            results.sort_by(|a, b| a.posted_key().cmp(&b.posted_key()));
        }
        if !query.chronological {
            results.reverse();
        }
        if let Some(limit) = query.limit {
            results.truncate(limit);
        }
        results
    }

    pub fn get(&self, id: &str) -> Option<&Page> {
        self.pages.get(id)
    }

    /// Every page, in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Page> {
        self.pages.values()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// The tag page for `name`, if any page carries that tag.
    pub fn tag(&self, name: &str) -> Option<&TagPage> {
        self.tags
            .get(name)
            .and_then(|id| self.pages.get(id))
            .and_then(Page::as_tag)
    }

    /// Tag pages sorted by name.
    pub fn tags_by_name(&self) -> Vec<&Page> {
        self.tags.values().filter_map(|id| self.pages.get(id)).collect()
    }

    /// Tag pages, most used first.
    pub fn tags_by_count(&self) -> Vec<&Page> {
        let mut tags = self.tags_by_name();
        tags.sort_by(|a, b| match (a.as_tag(), b.as_tag()) {
            (Some(a), Some(b)) => tag::sortkey_count(a).cmp(&tag::sortkey_count(b)),
            _ => a.id().cmp(b.id()),
        });
        tags
    }

    /// Years with an archive page, ascending.
    pub fn years(&self) -> &BTreeSet<i32> {
        &self.years
    }

    /// The directories (relative to the deploy directory) that output files
    /// will be written into.
    pub fn output_dirs(&self) -> BTreeSet<String> {
        self.pages
            .keys()
            .filter_map(|id| id.rfind('/').map(|i| id[..i].to_owned()))
            .collect()
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when two pages claim the same id (and thus the same output
    /// path).
    #[error("duplicate page id: {0}")]
    DuplicateId(PageId),

    /// Returned when an archive page can't be built.
    #[error(transparent)]
    Archive(#[from] archive::Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::content::Parser;

    fn site() -> SiteConfig {
        SiteConfig::default()
    }

    fn page(name: &str, metadata: &str) -> Page {
        Parser::new(&site())
            .parse_page(name, &format!("{}\n\nbody of {}", metadata, name))
            .unwrap()
    }

    fn index(pages: Vec<Page>) -> Result<PageIndex> {
        let site = site();
        let mut index = PageIndex::new();
        for page in pages {
            index.add(&site, page)?;
        }
        index.link_archives(&site)?;
        Ok(index)
    }

    fn ids(pages: Vec<&Page>) -> Vec<&str> {
        pages.into_iter().map(Page::id).collect()
    }

    fn sample() -> Result<PageIndex> {
        index(vec![
            page("c.md", "date: 2021-03-01\nposted: 2021-03-02\ntags: rust"),
            page("a.md", "date: 2021-01-01\nposted: 2021-06-01\ntags: rust, go"),
            page("b.md", "date: 2021-02-01\ntags: go"),
            page("d.md", "date: 2020-12-31"),
            page("about.md", "title: About\ntags: rust"),
        ])
    }

    #[test]
    fn test_select_all_returns_every_page_once() -> Result<()> {
        let index = sample()?;
        let all = ids(index.select(&Select::new().dated(false)));
        let unique: BTreeSet<&str> = all.iter().copied().collect();
        assert_eq!(index.len(), all.len());
        assert_eq!(all.len(), unique.len());
        // 5 documents, 2 tags, 2 years
        assert_eq!(9, all.len());
        Ok(())
    }

    #[test]
    fn test_duplicate_id_is_fatal() {
        let site = site();
        let mut index = PageIndex::new();
        index.add(&site, page("x.md", "title: one")).unwrap();
        match index.add(&site, page("x.md", "title: two")) {
            Err(Error::DuplicateId(id)) => assert_eq!("x", id),
            other => panic!("wanted duplicate id error, got {:?}", other),
        }
        assert_eq!("one", index.get("x").unwrap().title);
    }

    #[test]
    fn test_tag_colliding_with_page_id_is_fatal() {
        let site = site();
        let mut index = PageIndex::new();
        index.add(&site, page("rust.md", "title: Rust")).unwrap();
        assert!(matches!(
            index.add(&site, page("x.md", "tags: rust")),
            Err(Error::DuplicateId(_))
        ));
    }

    #[test]
    fn test_page_tagged_with_own_id_is_fatal() {
        let site = site();
        let mut index = PageIndex::new();
        assert!(matches!(
            index.add(&site, page("me.md", "tags: me")),
            Err(Error::DuplicateId(_))
        ));
    }

    #[test]
    fn test_select_dated_default_posted_order() -> Result<()> {
        let index = sample()?;
        // a was posted 2021-06-01 even though it dates from January
        assert_eq!(
            vec!["2021/a", "2021/c", "2021/b", "2020/d"],
            ids(index.select(&Select::new()))
        );
        Ok(())
    }

    #[test]
    fn test_select_chronological_uses_origin_order() -> Result<()> {
        let index = sample()?;
        let pages = index.select(&Select::new().chronological(true));
        assert_eq!(vec!["2020/d", "2021/a", "2021/b", "2021/c"], ids(pages.clone()));
        for pair in pages.windows(2) {
            assert!(pair[0].origin_key() <= pair[1].origin_key());
        }
        Ok(())
    }

    #[test]
    fn test_select_chronological_posted_override() -> Result<()> {
        let index = sample()?;
        assert_eq!(
            vec!["2020/d", "2021/b", "2021/c", "2021/a"],
            ids(index.select(&Select::new().chronological(true).sort_by_origin(false)))
        );
        Ok(())
    }

    #[test]
    fn test_select_descending_origin() -> Result<()> {
        let index = sample()?;
        assert_eq!(
            vec!["2021/c", "2021/b", "2021/a", "2020/d"],
            ids(index.select(&Select::new().sort_by_origin(true)))
        );
        Ok(())
    }

    #[test]
    fn test_select_limit() -> Result<()> {
        let index = index(vec![
            page("one.md", "date: 2021-01-01"),
            page("two.md", "date: 2021-01-02"),
            page("three.md", "date: 2021-01-03"),
        ])?;
        assert_eq!(
            vec!["2021/three", "2021/two"],
            ids(index.select(&Select::new().limit(2).chronological(false)))
        );
        Ok(())
    }

    #[test]
    fn test_ties_broken_by_id() -> Result<()> {
        let index = index(vec![
            page("b.md", "date: 2021-01-01"),
            page("a.md", "date: 2021-01-01"),
        ])?;
        assert_eq!(
            vec!["2021/a", "2021/b"],
            ids(index.select(&Select::new().chronological(true)))
        );
        assert_eq!(vec!["2021/b", "2021/a"], ids(index.select(&Select::new())));
        Ok(())
    }

    #[test]
    fn test_select_tag_matches_tag_page() -> Result<()> {
        let index = sample()?;
        for name in &["rust", "go"] {
            let selected: BTreeSet<&str> =
                ids(index.select(&Select::new().tag(name))).into_iter().collect();
            let tag = index.tag(name).unwrap();
            let tagged: BTreeSet<&str> = tag
                .tagged
                .iter()
                .map(String::as_str)
                .filter(|id| index.get(id).map_or(false, Page::is_dated))
                .collect();
            assert_eq!(tagged, selected);
        }
        // the undated page is a member of its tag even though tag queries
        // only return dated pages
        assert!(index.tag("rust").unwrap().tagged.contains("about"));
        Ok(())
    }

    #[test]
    fn test_tags_are_linked_both_ways() -> Result<()> {
        let index = sample()?;
        for page in index.iter() {
            if let Some(content) = page.as_content() {
                match &content.tags {
                    Tags::Linked(links) => {
                        for (name, tag_id) in links {
                            assert_eq!(name, tag_id);
                            assert!(index.tag(name).unwrap().tagged.contains(page.id()));
                        }
                    }
                    Tags::Names(_) => panic!("{} was not linked", page.id()),
                }
            }
        }
        for tag in index.tags_by_name() {
            for id in &tag.as_tag().unwrap().tagged {
                assert!(index.get(id).unwrap().as_content().unwrap().tags.contains(tag.id()));
            }
        }
        Ok(())
    }

    #[test]
    fn test_tag_order() -> Result<()> {
        let index = sample()?;
        assert_eq!(vec!["go", "rust"], ids(index.tags_by_name()));
        assert_eq!(vec!["rust", "go"], ids(index.tags_by_count()));
        Ok(())
    }

    #[test]
    fn test_neighbours_stay_within_year() -> Result<()> {
        let index = sample()?;
        let links = |id: &str| {
            let content = index.get(id).unwrap().as_content().unwrap();
            (content.prevpost.clone(), content.nextpost.clone())
        };
        assert_eq!((None, Some("2021/b".to_owned())), links("2021/a"));
        assert_eq!(
            (Some("2021/a".to_owned()), Some("2021/c".to_owned())),
            links("2021/b")
        );
        assert_eq!((Some("2021/b".to_owned()), None), links("2021/c"));
        assert_eq!((None, None), links("2020/d"));
        assert_eq!((None, None), links("about"));
        Ok(())
    }

    #[test]
    fn test_year_archives() -> Result<()> {
        let index = sample()?;
        assert_eq!(vec![2020, 2021], index.years().iter().copied().collect::<Vec<_>>());
        let archive = index.get("2021").unwrap().as_archive().unwrap();
        assert_eq!(vec!["2021/a", "2021/b", "2021/c"], archive.entries);
        assert_eq!(None, archive.month);
        assert!(index.get("2021/01").is_none());
        Ok(())
    }

    #[test]
    fn test_month_archives() -> Result<()> {
        let mut site = site();
        site.month_archives = true;
        let mut index = PageIndex::new();
        for p in vec![
            page("a.md", "date: 2021-01-05"),
            page("b.md", "date: 2021-01-01"),
            page("c.md", "date: 2021-03-01"),
        ] {
            index.add(&site, p)?;
        }
        index.link_archives(&site)?;
        let january = index.get("2021/01").unwrap();
        assert_eq!("January 2021", january.title);
        assert_eq!(
            vec!["2021/b", "2021/a"],
            january.as_archive().unwrap().entries
        );
        assert!(index.get("2021/03").is_some());
        assert!(index.get("2021/02").is_none());
        Ok(())
    }

    #[test]
    fn test_output_dirs() -> Result<()> {
        let index = sample()?;
        let wanted: BTreeSet<String> =
            vec!["2020".to_owned(), "2021".to_owned()].into_iter().collect();
        assert_eq!(wanted, index.output_dirs());
        Ok(())
    }

    #[test]
    fn test_insertion_order_does_not_matter() -> Result<()> {
        let forward = sample()?;
        let mut pages: Vec<Page> = vec![
            page("about.md", "title: About\ntags: rust"),
            page("d.md", "date: 2020-12-31"),
            page("b.md", "date: 2021-02-01\ntags: go"),
            page("a.md", "date: 2021-01-01\nposted: 2021-06-01\ntags: rust, go"),
            page("c.md", "date: 2021-03-01\nposted: 2021-03-02\ntags: rust"),
        ];
        pages.reverse();
        let backward = index(pages)?;
        assert_eq!(
            ids(forward.select(&Select::new().dated(false))),
            ids(backward.select(&Select::new().dated(false)))
        );
        Ok(())
    }
}
