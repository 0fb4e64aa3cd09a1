//! Mirrors the static files directory into the deploy directory.

use crate::config::SiteConfig;
use log::{debug, info};
use regex::Regex;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use walkdir::{DirEntry, WalkDir};

/// Copies (or transforms) static files. Built from the `files_*` settings.
pub struct Syncer {
    exclude: Regex,
    include: Regex,
    rename: BTreeMap<String, String>,
    actions: BTreeMap<String, String>,
}

impl Syncer {
    pub fn new(site: &SiteConfig) -> Result<Syncer> {
        Ok(Syncer {
            exclude: Regex::new(&site.files_exclude)?,
            include: Regex::new(&site.files_include)?,
            rename: site.files_rename.clone(),
            actions: site.files_actions.clone(),
        })
    }

    /// File names matching the exclude pattern are skipped unless they also
    /// match the include pattern. Directories are always walked.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclude.is_match(name) && !self.include.is_match(name)
    }

    /// The deploy-side name for `name`, after extension renames.
    pub fn dest_name(&self, name: &str) -> String {
        match extension(name).and_then(|ext| self.rename.get(&ext).map(|to| (ext, to))) {
            Some((ext, to)) => format!("{}{}", &name[..name.len() - ext.len()], to),
            None => name.to_owned(),
        }
    }

    /// Mirrors `src` into `dest` and returns the number of files written.
    /// Files whose destination is at least as new as the source are left
    /// alone.
    pub fn sync(&self, src: &Path, dest: &Path) -> Result<usize> {
        std::fs::create_dir_all(dest).map_err(|err| Error::Io {
            path: dest.to_owned(),
            err,
        })?;
        let mut written = 0;
        let walker = WalkDir::new(src)
            .min_depth(1)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()));
        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_file() && self.is_excluded(&file_name(&entry)) {
                debug!("excluded: {}", entry.path().display());
                continue;
            }
            let relative = entry.path().strip_prefix(src)?;
            let target = match relative.parent() {
                Some(parent) => dest.join(parent).join(self.dest_name(&file_name(&entry))),
                None => dest.join(self.dest_name(&file_name(&entry))),
            };

            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&target).map_err(|err| Error::Io {
                    path: target.clone(),
                    err,
                })?;
                continue;
            }
            if is_fresh(entry.path(), &target)? {
                debug!("up to date: {}", target.display());
                continue;
            }
            self.sync_file(entry.path(), &target)?;
            info!("{} => {}", entry.path().display(), target.display());
            written += 1;
        }
        Ok(written)
    }

    fn sync_file(&self, src: &Path, dest: &Path) -> Result<()> {
        let action = extension(&src.to_string_lossy()).and_then(|ext| self.actions.get(&ext));
        match action {
            Some(action) => {
                let command = action
                    .replace("{src}", &shell_quote(src))
                    .replace("{dest}", &shell_quote(dest));
                let status = Command::new("sh")
                    .arg("-c")
                    .arg(&command)
                    .status()
                    .map_err(|err| Error::Io {
                        path: src.to_owned(),
                        err,
                    })?;
                if !status.success() {
                    return Err(Error::Action { command, status });
                }
            }
            None => {
                std::fs::copy(src, dest).map_err(|err| Error::Io {
                    path: dest.to_owned(),
                    err,
                })?;
            }
        }
        Ok(())
    }
}

// `.less` for `style.less`; `None` for names without an extension.
fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
}

fn file_name(entry: &DirEntry) -> String {
    entry.file_name().to_string_lossy().into_owned()
}

fn is_fresh(src: &Path, dest: &Path) -> Result<bool> {
    let modified = |path: &Path| std::fs::metadata(path).and_then(|m| m.modified());
    match modified(dest) {
        Ok(dest_time) => {
            let src_time = modified(src).map_err(|err| Error::Io {
                path: src.to_owned(),
                err,
            })?;
            Ok(dest_time >= src_time)
        }
        Err(_) => Ok(false),
    }
}

fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when `files_exclude` or `files_include` isn't a valid regex.
    #[error("invalid file pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("`{}`: {err}", .path.display())]
    Io { path: PathBuf, err: io::Error },

    #[error(transparent)]
    WalkDir(#[from] walkdir::Error),

    #[error(transparent)]
    StripPrefix(#[from] std::path::StripPrefixError),

    /// Returned when a `files_actions` command fails.
    #[error("`{command}` failed: {status}")]
    Action { command: String, status: ExitStatus },
}
