//! Defines [`TagPage`], the aggregate page listing every content page that
//! carries one tag.

use crate::config::SiteConfig;
use crate::page::{Kind, Page, PageId};
use std::collections::BTreeSet;

/// Template used for tag pages.
pub const TAG_TEMPLATE: &str = "tag";

/// Membership of a single tag. The page id of a tag page is the tag name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TagPage {
    /// The normalized tag name.
    pub name: String,

    /// Ids of every page carrying the tag. Keyed by id, so adding a page
    /// twice is harmless.
    pub tagged: BTreeSet<PageId>,
}

impl TagPage {
    pub fn new(name: &str) -> TagPage {
        TagPage {
            name: name.to_owned(),
            tagged: BTreeSet::new(),
        }
    }

    /// Builds the page for tag `name`, titled from the site's display-name
    /// table when it has an entry for the tag.
    pub fn page(site: &SiteConfig, name: &str) -> Page {
        let mut page = Page::new(name, Kind::Tag(TagPage::new(name)));
        page.template = TAG_TEMPLATE.to_owned();
        page.title = site.tag_title(name).to_owned();
        page
    }

    pub fn add(&mut self, id: &str) {
        self.tagged.insert(id.to_owned());
    }

    pub fn len(&self) -> usize {
        self.tagged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tagged.is_empty()
    }
}

/// Sort key for "most used first", name breaking ties.
pub fn sortkey_count(tag: &TagPage) -> (std::cmp::Reverse<usize>, &str) {
    (std::cmp::Reverse(tag.len()), &tag.name)
}
