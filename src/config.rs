//! Loads the site configuration (`site.yml`) into an immutable
//! [`SiteConfig`]. Top-level keys are normalized the same way document
//! metadata keys are, defaults are filled in, and unknown keys are kept for
//! the templates.

use crate::normalize::{is_blank_yaml, norm_key};
use crate::url::UrlPolicy;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The configuration file looked up at the site root.
pub const CONFIG_FILE: &str = "site.yml";

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Scheme and host, e.g. `https://example.org`.
    pub domain: String,

    /// Path prefix for every page URL.
    pub root: String,

    /// Leave `.html` off page URLs.
    pub clean_urls: bool,

    /// Extensions (without the dot) of files parsed as documents.
    pub content_extensions: Vec<String>,

    pub dirs: Dirs,

    /// File name of the feed in the deploy directory; `None` disables it.
    pub feed: Option<String>,

    /// Number of entries in the feed.
    pub feed_size: usize,

    /// Static file names matching this pattern are skipped...
    pub files_exclude: String,

    /// ...unless they also match this one.
    pub files_include: String,

    /// Extension renames applied to static files, e.g. `.less` -> `.css`.
    pub files_rename: BTreeMap<String, String>,

    /// Shell commands used instead of a plain copy for some extensions.
    /// `{src}` and `{dest}` are substituted.
    pub files_actions: BTreeMap<String, String>,

    pub lang: String,
    pub site_title: String,
    pub description: String,

    /// Page `<title>` format for titled pages. `{title}` and `{site_title}`
    /// are substituted.
    pub title_format: String,

    pub default_template: String,

    /// Optional tag whitelist, optionally with display names.
    pub tags: Option<TagConfig>,

    /// Also derive one archive page per month.
    pub month_archives: bool,

    /// Every other key in the file.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Dirs {
    pub content: PathBuf,
    pub files: PathBuf,
    pub templates: PathBuf,
    pub deploy: PathBuf,
}

impl Default for Dirs {
    fn default() -> Self {
        Dirs {
            content: PathBuf::from("content"),
            files: PathBuf::from("files"),
            templates: PathBuf::from("templates"),
            deploy: PathBuf::from("deploy"),
        }
    }
}

/// The `tags` setting: either a plain list of allowed tags or a mapping from
/// allowed tag to its display name.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TagConfig {
    List(Vec<String>),
    Names(BTreeMap<String, String>),
}

impl TagConfig {
    pub fn allows(&self, tag: &str) -> bool {
        match self {
            TagConfig::List(tags) => tags.iter().any(|t| t == tag),
            TagConfig::Names(names) => names.contains_key(tag),
        }
    }

    pub fn title(&self, tag: &str) -> Option<&str> {
        match self {
            TagConfig::List(_) => None,
            TagConfig::Names(names) => names.get(tag).map(String::as_str),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        let map = |pairs: &[(&str, &str)]| -> BTreeMap<String, String> {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };
        SiteConfig {
            domain: "http://localhost/".to_owned(),
            root: "/".to_owned(),
            clean_urls: false,
            content_extensions: ["text", "markdown", "mkdn", "md"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            dirs: Dirs::default(),
            feed: Some("feed.atom".to_owned()),
            feed_size: 10,
            files_exclude: r"^[\._]|~$".to_owned(),
            files_include: r"^\.htaccess$".to_owned(),
            files_rename: map(&[(".less", ".css")]),
            files_actions: map(&[(".less", "lessc {src} {dest}")]),
            lang: "en".to_owned(),
            site_title: String::new(),
            description: String::new(),
            title_format: "{title} | {site_title}".to_owned(),
            default_template: "page".to_owned(),
            tags: None,
            month_archives: false,
            extra: BTreeMap::new(),
        }
    }
}

impl SiteConfig {
    /// Loads `site.yml` from the site directory `dir`. Relative `dirs` are
    /// resolved against `dir`.
    pub fn from_directory(dir: &Path) -> Result<SiteConfig> {
        let path = dir.join(CONFIG_FILE);
        let contents = std::fs::read_to_string(&path).map_err(|err| Error::Read {
            path: path.clone(),
            err,
        })?;
        let mut config = SiteConfig::from_str(&contents)?;
        config.dirs.content = dir.join(&config.dirs.content);
        config.dirs.files = dir.join(&config.dirs.files);
        config.dirs.templates = dir.join(&config.dirs.templates);
        config.dirs.deploy = dir.join(&config.dirs.deploy);
        Ok(config)
    }

    /// Parses configuration YAML. Keys are normalized, so `Site Title` and
    /// `site-title` both set `site_title`.
    pub fn from_str(yaml: &str) -> Result<SiteConfig> {
        let mapping = match is_blank_yaml(yaml) {
            true => Mapping::new(),
            false => match serde_yaml::from_str::<Value>(yaml)? {
                Value::Mapping(mapping) => mapping,
                Value::Null => Mapping::new(),
                _ => return Err(Error::NotMapping),
            },
        };
        let mut normalized = Mapping::new();
        for (key, value) in mapping {
            let key = match key {
                Value::String(key) => norm_key(&key),
                other => return Err(Error::InvalidKey(format!("{:?}", other))),
            };
            normalized.insert(Value::String(key), value);
        }

        let mut config: SiteConfig = serde_yaml::from_value(Value::Mapping(normalized))?;
        if config.site_title.is_empty() {
            return Err(Error::MissingField("site_title"));
        }
        config.domain = config.domain.trim_end_matches('/').to_owned();
        config.root = format!("/{}", config.root.trim_start_matches('/'));
        Ok(config)
    }

    pub fn urls(&self) -> UrlPolicy {
        UrlPolicy {
            domain: self.domain.clone(),
            root: self.root.clone(),
            clean_urls: self.clean_urls,
        }
    }

    /// Whether the tag whitelist (if any) lets `tag` through.
    pub fn allows_tag(&self, tag: &str) -> bool {
        self.tags.as_ref().map_or(true, |tags| tags.allows(tag))
    }

    /// Display name for `tag`: the configured one, else the tag itself.
    pub fn tag_title<'a>(&'a self, tag: &'a str) -> &'a str {
        self.tags.as_ref().and_then(|tags| tags.title(tag)).unwrap_or(tag)
    }

    /// Formats the `<title>` of a page titled `title`.
    pub fn head_title(&self, title: &str) -> String {
        if title.is_empty() {
            return self.site_title.clone();
        }
        self.title_format
            .replace("{title}", title)
            .replace("{site_title}", &self.site_title)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the configuration file can't be read.
    #[error("reading `{}`: {err}", .path.display())]
    Read { path: PathBuf, err: std::io::Error },

    /// Returned for YAML syntax errors and mistyped settings.
    #[error("{0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Returned when the configuration isn't a mapping.
    #[error("{} must contain a mapping of settings", CONFIG_FILE)]
    NotMapping,

    /// Returned for non-string top-level keys.
    #[error("invalid setting name: {0}")]
    InvalidKey(String),

    /// Returned when a required setting is absent.
    #[error("missing required setting `{0}`")]
    MissingField(&'static str),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() -> Result<()> {
        let config = SiteConfig::from_str("site_title: Notes")?;
        assert_eq!("http://localhost", config.domain);
        assert_eq!("/", config.root);
        assert_eq!(Some("feed.atom".to_owned()), config.feed);
        assert_eq!(PathBuf::from("content"), config.dirs.content);
        assert_eq!("page", config.default_template);
        assert!(config.allows_tag("anything"));
        Ok(())
    }

    #[test]
    fn test_keys_are_normalized() -> Result<()> {
        let config = SiteConfig::from_str("Site Title: Notes\nclean-urls: true\nRoot: blog")?;
        assert_eq!("Notes", config.site_title);
        assert!(config.clean_urls);
        assert_eq!("/blog", config.root);
        Ok(())
    }

    #[test]
    fn test_dirs_merge_with_defaults() -> Result<()> {
        let config = SiteConfig::from_str("site_title: x\ndirs:\n  deploy: public\n")?;
        assert_eq!(PathBuf::from("public"), config.dirs.deploy);
        assert_eq!(PathBuf::from("templates"), config.dirs.templates);
        Ok(())
    }

    #[test]
    fn test_extra_keys_are_kept() -> Result<()> {
        let config = SiteConfig::from_str("site_title: x\nauthor: Me")?;
        assert_eq!(
            Some(&Value::String("Me".to_owned())),
            config.extra.get("author")
        );
        Ok(())
    }

    #[test]
    fn test_feed_can_be_disabled() -> Result<()> {
        let config = SiteConfig::from_str("site_title: x\nfeed: ~")?;
        assert_eq!(None, config.feed);
        Ok(())
    }

    #[test]
    fn test_missing_site_title() {
        match SiteConfig::from_str("domain: https://example.org") {
            Err(Error::MissingField("site_title")) => {}
            other => panic!("unexpected result: {:?}", other.map(|c| c.site_title)),
        }
    }

    #[test]
    fn test_empty_config_reports_missing_title() {
        for yaml in &["", "# nothing yet\n"] {
            match SiteConfig::from_str(yaml) {
                Err(Error::MissingField("site_title")) => {}
                other => panic!("unexpected result: {:?}", other.map(|c| c.site_title)),
            }
        }
    }

    #[test]
    fn test_tag_whitelist_list() -> Result<()> {
        let config = SiteConfig::from_str("site_title: x\ntags: [rust, go]")?;
        assert!(config.allows_tag("rust"));
        assert!(!config.allows_tag("java"));
        assert_eq!("rust", config.tag_title("rust"));
        Ok(())
    }

    #[test]
    fn test_tag_whitelist_names() -> Result<()> {
        let config = SiteConfig::from_str("site_title: x\ntags:\n  rust: Rust Lang\n")?;
        assert!(config.allows_tag("rust"));
        assert!(!config.allows_tag("go"));
        assert_eq!("Rust Lang", config.tag_title("rust"));
        Ok(())
    }

    #[test]
    fn test_head_title() -> Result<()> {
        let config = SiteConfig::from_str("site_title: Notes")?;
        assert_eq!("Hello | Notes", config.head_title("Hello"));
        assert_eq!("Notes", config.head_title(""));
        Ok(())
    }
}
