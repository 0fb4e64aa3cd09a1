//! Defines [`Archive`], the aggregate page for a year or a month of dated
//! content.

use crate::page::{Kind, Page, PageId};
use chrono::NaiveDate;

/// A time bucket of dated content pages.
#[derive(Clone, Debug, PartialEq)]
pub struct Archive {
    /// Ids of the pages in the bucket, in origin order.
    pub entries: Vec<PageId>,
    pub year: i32,

    /// `None` for year archives, `1..=12` for month archives.
    pub month: Option<u32>,
}

/// Builds the archive page for a whole year.
pub fn year_page(entries: Vec<PageId>, year: i32) -> Page {
    let mut page = Page::new(
        year.to_string(),
        Kind::Archive(Archive {
            entries,
            year,
            month: None,
        }),
    );
    page.template = "archive_year".to_owned();
    page.title = year.to_string();
    page
}

/// Builds the archive page for one month. Fails unless `1 <= month <= 12`.
pub fn month_page(entries: Vec<PageId>, year: i32, month: u32) -> Result<Page> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or(Error::InvalidMonth { year, month })?;
    let mut page = Page::new(
        format!("{}/{:02}", year, month),
        Kind::Archive(Archive {
            entries,
            year,
            month: Some(month),
        }),
    );
    page.template = "archive_month".to_owned();
    page.title = first.format("%B %Y").to_string();
    Ok(page)
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a month bucket is outside `1..=12`.
    #[error("invalid archive month {year}/{month}: month must be in the range 1-12")]
    InvalidMonth { year: i32, month: u32 },
}
