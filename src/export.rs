//! One export call: content, charts, plan, render, save.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::charts::{self, ChartImage, ChartSet, ChartSource};
use crate::config::Config;
use crate::content::ContentSource;
use crate::data::ReportData;
use crate::error::{ContentError, ReportError};
use crate::html;
use crate::native::{LOGO_KEY, NativeDocument};
use crate::parser;
use crate::plan::{Mode, ReportPlan, STANDARD_SECTIONS};

/// Longest slug kept in a filename.
const MAX_SLUG: usize = 50;

/// Which renderer produces the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Native primitives compiled to PDF with Typst.
    #[default]
    Native,
    /// A standalone HTML page for a browser's print-to-PDF.
    Html,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Native(NativeDocument),
    Html(String),
}

/// Rendered output of one export, not yet encoded or written.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    /// `report-<slug>-<date>.pdf` or `nota-<slug>-<date>.pdf`.
    pub filename: String,
    pub body: Body,
}

impl RenderedDocument {
    /// Name written to disk: the PDF filename, or the same stem with an
    /// `.html` extension for HTML output.
    pub fn output_name(&self) -> String {
        match self.body {
            Body::Native(_) => self.filename.clone(),
            Body::Html(_) => match self.filename.strip_suffix(".pdf") {
                Some(stem) => format!("{stem}.html"),
                None => format!("{}.html", self.filename),
            },
        }
    }
}

pub struct Exporter {
    config: Config,
    data: ReportData,
    backend: Backend,
    today: NaiveDate,
}

impl Exporter {
    pub fn new(config: Config, data: ReportData) -> Self {
        Self {
            config,
            data,
            backend: Backend::default(),
            today: chrono::Local::now().date_naive(),
        }
    }

    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Date used for filenames and the note footer.
    pub fn today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The eight standard sections with cover page and contents.
    pub fn full_report(
        &self,
        content: &mut dyn ContentSource,
        charts: &mut dyn ChartSource,
    ) -> Result<RenderedDocument, ReportError> {
        info!(
            company = self.data.company_name(),
            backend = ?self.backend,
            "generating full report"
        );
        let contents = STANDARD_SECTIONS
            .iter()
            .map(|title| (title.to_string(), content.section(title)))
            .collect();
        let filename = export_filename("report", self.data.company_name(), self.today);
        self.render(Mode::FullReport, contents, charts, filename)
    }

    /// A single ad hoc section under `title`.
    pub fn custom_note(
        &self,
        title: &str,
        markdown: &str,
        charts: &mut dyn ChartSource,
    ) -> Result<RenderedDocument, ReportError> {
        info!(title, backend = ?self.backend, "generating custom note");
        let content = if markdown.trim().is_empty() {
            Err(ContentError::Missing(title.to_string()))
        } else {
            Ok(markdown.to_string())
        };
        let name = if title.trim().is_empty() { "nota" } else { title };
        let filename = export_filename("nota", name, self.today);
        self.render(
            Mode::CustomNote {
                title: title.to_string(),
            },
            vec![(title.to_string(), content)],
            charts,
            filename,
        )
    }

    fn render(
        &self,
        mode: Mode,
        contents: Vec<(String, Result<String, ContentError>)>,
        source: &mut dyn ChartSource,
        filename: String,
    ) -> Result<RenderedDocument, ReportError> {
        if contents.iter().all(|(_, content)| content.is_err()) {
            return Err(ReportError::NoContent);
        }

        let mut titles: Vec<String> = Vec::new();
        for (title, content) in &contents {
            titles.push(title.clone());
            if let Ok(markdown) = content {
                titles.extend(
                    parser::parse(markdown)
                        .iter()
                        .filter_map(|block| block.section_title()),
                );
            }
        }
        let keys = charts::wanted_charts(titles.iter().map(String::as_str));
        let mut images = charts::collect(source, &keys);
        if let Some(logo) = self.load_logo() {
            images.insert(LOGO_KEY.to_string(), logo);
        }

        let plan = ReportPlan::build(mode, contents, &self.data, images, &self.config, self.today)?;
        let failed = plan.sections.iter().filter(|s| s.body.is_err()).count();
        if failed > 0 {
            warn!(failed, "sections rendered with placeholders");
        }

        let body = match self.backend {
            Backend::Native => Body::Native(NativeDocument::from_plan(&plan, &self.config)),
            Backend::Html => Body::Html(html::render_page(&plan, &self.config)),
        };
        Ok(RenderedDocument { filename, body })
    }

    fn load_logo(&self) -> Option<ChartImage> {
        let path = self.config.brand.logo.as_ref()?;
        let loaded = fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| ChartImage::new(LOGO_KEY, bytes).map_err(|e| e.to_string()));
        match loaded {
            Ok(logo) => Some(logo),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "logo omitted");
                None
            }
        }
    }

    /// Encode the document and write it into `dir`.
    ///
    /// Encoding happens first and the bytes go through a temporary file in
    /// the same directory, so a failure never leaves a partial file behind.
    pub fn save(&self, document: &RenderedDocument, dir: &Path) -> Result<PathBuf, ReportError> {
        let bytes = match &document.body {
            Body::Native(native) => crate::native_to_pdf(native, &self.config)?,
            Body::Html(page) => page.as_bytes().to_vec(),
        };

        let path = dir.join(document.output_name());
        let write_error = |source| ReportError::Write {
            path: path.clone(),
            source,
        };
        let mut file = NamedTempFile::new_in(dir).map_err(write_error)?;
        file.write_all(&bytes).map_err(write_error)?;
        file.persist(&path).map_err(|e| write_error(e.error))?;

        info!(path = %path.display(), bytes = bytes.len(), "document saved");
        Ok(path)
    }
}

/// Lowercase ASCII alphanumerics with single `-` separators, at most
/// 50 characters.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.truncate(MAX_SLUG);
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// `<prefix>-<slug>-<YYYY-MM-DD>.pdf`. An empty slug falls back to the prefix.
pub fn export_filename(prefix: &str, name: &str, date: NaiveDate) -> String {
    let slug = slugify(name);
    let slug = if slug.is_empty() { prefix } else { slug.as_str() };
    format!("{prefix}-{slug}-{}.pdf", date.format("%Y-%m-%d"))
}
