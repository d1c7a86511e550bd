mod block;
mod charts;
mod classify;
mod config;
mod content;
mod data;
mod error;
mod export;
mod html;
mod inline;
mod native;
mod parser;
mod plan;
mod tables;
mod typst;

pub use block::{Block, Cell, Span, looks_numeric, plain_text};
pub use charts::{
    ChartDirectory, ChartImage, ChartRoutes, ChartSet, ChartSource, ImageFormat, InlineCharts,
    NoCharts, route, wanted_charts,
};
pub use classify::{ChartSpec, SectionKind, classify};
pub use config::Config;
pub use content::{ContentSource, Fallback, MarkdownSections, StaticTemplates};
pub use data::ReportData;
pub use error::{ChartError, ContentError, DataError, ReportError};
pub use export::{Backend, Body, Exporter, RenderedDocument, export_filename, slugify};
pub use html::{render_fragment, render_page};
pub use inline::format as format_inline;
pub use native::{NativeDocument, Node, visible_text};
pub use plan::{Item, Mode, PageFurniture, PageTemplate, ReportPlan, STANDARD_SECTIONS};
pub use tables::{FixedBlock, Tone};

use typst_as_lib::TypstEngine;
use typst_as_lib::typst_kit_options::TypstKitFontOptions;
use typst_library::layout::PagedDocument;
use typst_pdf::PdfOptions;

/// Parse markdown text into a vector of blocks.
pub fn parse(markdown: &str) -> Vec<Block> {
    parser::parse(markdown)
}

/// Lower a native document to Typst markup.
pub fn native_to_typst(document: &NativeDocument, config: &Config) -> String {
    typst::document_to_typst(document, config)
}

/// Lay out a native document into pages.
pub fn native_to_pages(
    document: &NativeDocument,
    config: &Config,
) -> Result<PagedDocument, ReportError> {
    let typst_content = native_to_typst(document, config);

    let font_options = TypstKitFontOptions::new()
        .include_embedded_fonts(true)
        .include_system_fonts(false);

    let images: Vec<(String, Vec<u8>)> = document
        .images
        .values()
        .map(|image| (image.virtual_path(), image.bytes.clone()))
        .collect();

    let engine = TypstEngine::builder()
        .main_file(typst_content)
        .search_fonts_with(font_options)
        .with_static_file_resolver(
            images
                .iter()
                .map(|(path, bytes)| (path.as_str(), bytes.as_slice())),
        )
        .build();

    engine
        .compile()
        .output
        .map_err(|e| ReportError::Compile(format!("{e:?}")))
}

/// Compile a native document to PDF bytes.
pub fn native_to_pdf(document: &NativeDocument, config: &Config) -> Result<Vec<u8>, ReportError> {
    let doc = native_to_pages(document, config)?;
    typst_pdf::pdf(&doc, &PdfOptions::default()).map_err(|e| ReportError::Pdf(format!("{e:?}")))
}
