//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: loading the configuration
//! ([`crate::config`]), syncing static files ([`crate::files`]), parsing
//! documents ([`crate::content`]), indexing them ([`crate::index`]),
//! rendering every page ([`crate::write`]), and generating the Atom feed
//! ([`crate::feed`]).

use crate::config::{Error as ConfigError, SiteConfig};
use crate::content::{Error as ParseError, Parser};
use crate::feed::{write_feed, Error as FeedError};
use crate::files::{Error as FilesError, Syncer};
use crate::index::{Error as IndexError, PageIndex};
use crate::page::Page;
use crate::url::UrlPolicy;
use crate::util::rmdir;
use crate::value::{self, Object};
use crate::write::{Error as WriteError, Renderer};
use gtmpl_value::Value;
use log::{debug, info};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// What a build produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stats {
    pub pages: usize,
    pub files: usize,
    pub feed_entries: usize,
}

/// Read-only state shared by every page render: the configuration, the
/// finished index, and the template globals derived from both.
pub struct BuildContext<'a> {
    pub site: &'a SiteConfig,
    pub index: &'a PageIndex,
    pub urls: UrlPolicy,
    globals: Object,
}

impl<'a> BuildContext<'a> {
    pub fn new(site: &'a SiteConfig, index: &'a PageIndex) -> BuildContext<'a> {
        let urls = site.urls();
        let mut globals = value::site(site);
        globals.extend(value::listings(index, &urls));
        BuildContext {
            site,
            index,
            urls,
            globals,
        }
    }

    /// The template context for `page`: site globals, then listings, then
    /// the page's own fields. `head_title` applies the title format when the
    /// page has a title.
    pub fn page_context(&self, page: &Page) -> Value {
        let mut context = self.globals.clone();
        let fields = value::page(page, self.index, &self.urls);
        context.insert("page".to_owned(), Value::Object(fields.clone()));
        context.extend(fields);
        context.insert(
            "head_title".to_owned(),
            Value::String(self.site.head_title(&page.title)),
        );
        Value::Object(context)
    }
}

/// Adds parsed pages to a fresh index in id order, so tag pages are created
/// in the same order on every run, then derives the archives.
pub fn index_pages(site: &SiteConfig, mut pages: Vec<Page>) -> Result<PageIndex> {
    pages.sort_by(|a, b| a.id().cmp(b.id()));
    let mut index = PageIndex::new();
    for page in pages {
        index.add(site, page)?;
    }
    index.link_archives(site)?;
    Ok(index)
}

/// Builds the site rooted at `dir`. With `clean`, the deploy directory is
/// removed first; otherwise unchanged static files are kept.
pub fn build_site(dir: &Path, clean: bool) -> Result<Stats> {
    if !dir.is_dir() {
        return Err(Error::MissingPath(dir.to_owned()));
    }
    let site = SiteConfig::from_directory(dir)?;
    for required in &[&site.dirs.content, &site.dirs.templates] {
        if !required.is_dir() {
            return Err(Error::MissingPath(required.to_path_buf()));
        }
    }

    let deploy = &site.dirs.deploy;
    if clean {
        rmdir(deploy).map_err(|err| Error::Clean {
            path: deploy.clone(),
            err,
        })?;
    }
    std::fs::create_dir_all(deploy)?;

    let mut stats = Stats::default();
    if site.dirs.files.is_dir() {
        stats.files = Syncer::new(&site)?.sync(&site.dirs.files, deploy)?;
    } else {
        debug!("no static files at {}", site.dirs.files.display());
    }

    // Parse everything before indexing anything.
    let pages = Parser::new(&site).parse_pages(&site.dirs.content)?;
    let index = index_pages(&site, pages)?;
    for output_dir in index.output_dirs() {
        std::fs::create_dir_all(deploy.join(output_dir))?;
    }

    let context = BuildContext::new(&site, &index);
    let mut renderer = Renderer::new(&site.dirs.templates, deploy, &site.default_template)?;
    for page in index.iter() {
        renderer.write(page, context.page_context(page))?;
        stats.pages += 1;
    }

    if let Some(feed) = &site.feed {
        let file = File::create(deploy.join(feed))?;
        stats.feed_entries = write_feed(&site, &index, BufWriter::new(file))?;
        info!("{:>14} : /{}", "feed", feed);
    }
    Ok(stats)
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during configuration,
/// parsing, indexing, writing, cleaning the output directory, and other I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the site directory or a required subdirectory is
    /// missing.
    #[error("required path not found: {}", .0.display())]
    MissingPath(PathBuf),

    /// Returned for errors loading `site.yml`.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Returned for errors copying static files.
    #[error(transparent)]
    Files(#[from] FilesError),

    /// Returned for errors during parsing.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Returned for duplicate ids and bad archives.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Returned for errors rendering pages to disk.
    #[error(transparent)]
    Write(#[from] WriteError),

    /// Returned for errors writing the feed.
    #[error(transparent)]
    Feed(#[from] FeedError),

    /// Returned for I/O problems while cleaning the output directory.
    #[error("cleaning directory `{}`: {err}", .path.display())]
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for other I/O errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
