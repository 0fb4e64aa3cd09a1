//! Renders pages through their templates and writes the results to disk.
//!
//! Templates are Go-style ([`gtmpl`]) files named `<template>.html` in the
//! templates directory. Files whose names start with `_` are partials: their
//! contents are prepended to every template, so `{{define}}` blocks in them
//! are available everywhere.

use crate::page::Page;
use gtmpl::Value;
use log::info;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

const TEMPLATE_EXTENSION: &str = "html";

/// Responsible for templating pages and writing them below the deploy
/// directory as `<id>.html`.
pub struct Renderer {
    templates_directory: PathBuf,
    output_directory: PathBuf,
    default_template: String,

    /// Concatenated partials.
    partials: String,

    /// Template sources by name, partials already prepended.
    cache: HashMap<String, String>,
}

impl Renderer {
    /// Constructs a `Renderer` and loads the partials found in
    /// `templates_directory`.
    pub fn new(
        templates_directory: &Path,
        output_directory: &Path,
        default_template: &str,
    ) -> Result<Renderer> {
        Ok(Renderer {
            templates_directory: templates_directory.to_owned(),
            output_directory: output_directory.to_owned(),
            default_template: default_template.to_owned(),
            partials: load_partials(templates_directory)?,
            cache: HashMap::new(),
        })
    }

    /// The template `page` renders with: its own, else the site default.
    pub fn template_name<'p>(&'p self, page: &'p Page) -> &'p str {
        match page.template.is_empty() {
            true => &self.default_template,
            false => &page.template,
        }
    }

    /// Where `page` is written.
    pub fn output_path(&self, page: &Page) -> PathBuf {
        self.output_directory.join(format!("{}.html", page.id()))
    }

    /// Applies the page's template to `context` and returns the trimmed
    /// output.
    pub fn render(&mut self, page: &Page, context: Value) -> Result<String> {
        let name = self.template_name(page).to_owned();
        let source = self.source(page, &name)?;
        let html = gtmpl::template(source, context).map_err(|err| Error::Template {
            page: page.id().to_owned(),
            template: name.clone(),
            message: err.to_string(),
        })?;
        Ok(html.trim().to_owned())
    }

    /// Renders `page` and writes it to disk. The containing directory must
    /// already exist.
    pub fn write(&mut self, page: &Page, context: Value) -> Result<PathBuf> {
        let html = self.render(page, context)?;
        let path = self.output_path(page);
        File::create(&path)
            .and_then(|mut file| file.write_all(html.as_bytes()))
            .map_err(|err| Error::Write {
                path: path.clone(),
                err,
            })?;
        info!("{:>14} : /{}", self.template_name(page), page.id());
        Ok(path)
    }

    fn source(&mut self, page: &Page, name: &str) -> Result<&str> {
        if !self.cache.contains_key(name) {
            let path = self
                .templates_directory
                .join(format!("{}.{}", name, TEMPLATE_EXTENSION));
            let mut contents = self.partials.clone();
            File::open(&path)
                .and_then(|mut file| file.read_to_string(&mut contents))
                .map_err(|err| Error::MissingTemplate {
                    page: page.id().to_owned(),
                    template: name.to_owned(),
                    path: path.clone(),
                    err,
                })?;
            self.cache.insert(name.to_owned(), contents);
        }
        Ok(self.cache.get(name).map(String::as_str).unwrap_or_default())
    }
}

// Reads every `_*.html` file in `dir`, in name order, into one string.
fn load_partials(dir: &Path) -> Result<String> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_partial = name.starts_with('_')
            && Path::new(&name).extension().map_or(false, |ext| ext == TEMPLATE_EXTENSION);
        if is_partial && entry.file_type()?.is_file() {
            names.push(name);
        }
    }
    names.sort();

    let mut contents = String::new();
    for name in names {
        File::open(dir.join(&name))?.read_to_string(&mut contents)?;
        contents.push('\n');
    }
    Ok(contents)
}

/// The result of a fallible page-writing operation.
type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a page names a template that doesn't exist.
    #[error("page `{page}`: opening template `{template}` ({}): {err}", .path.display())]
    MissingTemplate {
        page: String,
        template: String,
        path: PathBuf,
        err: io::Error,
    },

    /// An error during templating.
    #[error("page `{page}`: template `{template}`: {message}")]
    Template {
        page: String,
        template: String,
        message: String,
    },

    /// An error writing an output file.
    #[error("writing `{}`: {err}", .path.display())]
    Write { path: PathBuf, err: io::Error },

    /// An error reading the templates directory.
    #[error(transparent)]
    Io(#[from] io::Error),
}
