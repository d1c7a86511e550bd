//! The backend-neutral shape of one export.
//!
//! A [`ReportPlan`] is built once per export and then walked by both the
//! native and the HTML renderer, so section order, fixed tables and chart
//! placement are decided in exactly one place.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::block::Block;
use crate::charts::{self, ChartSet};
use crate::classify::{SectionKind, classify};
use crate::config::Config;
use crate::data::{ReportData, or_missing};
use crate::error::{ContentError, ReportError};
use crate::parser;
use crate::tables::{self, FixedBlock, Tone};

/// Section titles of a full report, in order.
pub const STANDARD_SECTIONS: [&str; 8] = [
    "Executive Summary",
    "Profilo Aziendale",
    "Analisi Economica",
    "Stato Patrimoniale",
    "Indicatori Finanziari",
    "Risk Assessment",
    "Codice della Crisi",
    "Raccomandazioni Strategiche",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    FullReport,
    CustomNote { title: String },
}

/// One step of a section body.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Block(Block),
    /// Chart key, present in the plan's chart set.
    Chart(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSection {
    /// 1-based position in the report.
    pub number: usize,
    pub title: String,
    pub kind: SectionKind,
    /// Data-driven blocks shown before the parsed content.
    pub fixed: Vec<FixedBlock>,
    /// Parsed content with heading-scoped charts, or the content failure.
    pub body: Result<Vec<Item>, String>,
    /// Charts routed to the section title, shown after the body.
    pub charts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    pub label: String,
    pub value: String,
    pub tone: Tone,
}

impl Fact {
    fn new(label: &str, value: String) -> Self {
        Self {
            label: label.to_string(),
            value,
            tone: Tone::Default,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cover {
    pub title: String,
    pub subtitle: String,
    /// Only a full report has a dedicated cover page.
    pub full_page: bool,
    pub tagline: Option<String>,
    /// Two columns of label/value facts.
    pub facts: [Vec<Fact>; 2],
}

/// A page header or footer line: left and right text, where `{page}` and
/// `{pages}` stand for the current page and the page count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTemplate {
    pub left: String,
    pub right: String,
    /// First page (1-based) the template appears on.
    pub first_page: usize,
}

/// A literal run or page-number placeholder in a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Piece<'a> {
    Text(&'a str),
    Page,
    Pages,
}

impl PageTemplate {
    fn new(left: impl Into<String>, right: impl Into<String>, first_page: usize) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            first_page,
        }
    }

    /// Split template text into literal runs and placeholders.
    pub fn pieces(text: &str) -> Vec<Piece<'_>> {
        let mut pieces = Vec::new();
        let mut rest = text;
        while let Some(start) = rest.find('{') {
            let tail = &rest[start..];
            let (piece, len) = if tail.starts_with("{pages}") {
                (Piece::Pages, "{pages}".len())
            } else if tail.starts_with("{page}") {
                (Piece::Page, "{page}".len())
            } else {
                pieces.push(Piece::Text(&rest[..=start]));
                rest = &rest[start + 1..];
                continue;
            };
            if start > 0 {
                pieces.push(Piece::Text(&rest[..start]));
            }
            pieces.push(piece);
            rest = &tail[len..];
        }
        if !rest.is_empty() {
            pieces.push(Piece::Text(rest));
        }
        pieces
    }

    fn fill(text: &str, page: usize, count: usize) -> String {
        Self::pieces(text)
            .into_iter()
            .map(|piece| match piece {
                Piece::Text(t) => t.to_string(),
                Piece::Page => page.to_string(),
                Piece::Pages => count.to_string(),
            })
            .collect()
    }

    /// Left and right text for a page, or `None` before `first_page`.
    pub fn resolve(&self, page: usize, count: usize) -> Option<(String, String)> {
        (page >= self.first_page).then(|| {
            (
                Self::fill(&self.left, page, count),
                Self::fill(&self.right, page, count),
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFurniture {
    pub header: PageTemplate,
    pub footer: PageTemplate,
}

/// Resolved header and footer for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLines {
    pub header: Option<(String, String)>,
    pub footer: Option<(String, String)>,
}

impl PageFurniture {
    fn full_report(brand: &str, report_date: &str) -> Self {
        Self {
            header: PageTemplate::new(brand, "Pagina {page} di {pages}", 2),
            footer: PageTemplate::new(
                format!("Report generato il {report_date}"),
                "Riservato e Confidenziale",
                1,
            ),
        }
    }

    fn custom_note(title: &str, today: &str) -> Self {
        Self {
            header: PageTemplate::new(title, "", 2),
            footer: PageTemplate::new(
                format!("Nota generata il {today}"),
                "Pagina {page} di {pages}",
                1,
            ),
        }
    }

    pub fn resolve(&self, page: usize, count: usize) -> PageLines {
        PageLines {
            header: self.header.resolve(page, count),
            footer: self.footer.resolve(page, count),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportPlan {
    pub mode: Mode,
    /// Document metadata title.
    pub title: String,
    pub company: String,
    pub cover: Cover,
    pub furniture: PageFurniture,
    pub sections: Vec<PlannedSection>,
    /// Closing disclaimer; custom notes only.
    pub disclaimer: Option<String>,
    pub charts: ChartSet,
}

impl ReportPlan {
    /// Parse every section, inject fixed blocks and place charts.
    ///
    /// Fails only when no section produced content at all.
    pub fn build(
        mode: Mode,
        contents: Vec<(String, Result<String, ContentError>)>,
        data: &ReportData,
        charts: ChartSet,
        config: &Config,
        today: NaiveDate,
    ) -> Result<Self, ReportError> {
        if contents.iter().all(|(_, content)| content.is_err()) {
            return Err(ReportError::NoContent);
        }

        let full = mode == Mode::FullReport;
        let parsed: Vec<(String, Result<Vec<Block>, String>)> = contents
            .into_iter()
            .map(|(title, content)| {
                let blocks = content.map(|md| parser::parse(&md)).map_err(|e| {
                    warn!(section = %title, error = %e, "section content unavailable");
                    e.to_string()
                });
                (title, blocks)
            })
            .collect();

        // Router input: each section title, then the H2 titles inside it.
        let mut titles = Vec::new();
        let mut anchors = Vec::new();
        for (index, (title, blocks)) in parsed.iter().enumerate() {
            titles.push(title.clone());
            anchors.push((index, None));
            for (at, block) in blocks.iter().flatten().enumerate() {
                if let Some(heading) = block.section_title() {
                    titles.push(heading);
                    anchors.push((index, Some(at)));
                }
            }
        }
        let routes = charts::route(titles.iter().map(String::as_str), &charts);
        debug!(charts = routes.assigned_count(), "charts routed");

        let mut section_charts = vec![Vec::new(); parsed.len()];
        let mut heading_charts = vec![BTreeMap::new(); parsed.len()];
        for (slot, (index, at)) in anchors.into_iter().enumerate() {
            let keys = routes.at(slot);
            if keys.is_empty() {
                continue;
            }
            match at {
                None => section_charts[index] = keys.to_vec(),
                Some(at) => {
                    heading_charts[index].insert(at, keys.to_vec());
                }
            }
        }

        let sections = parsed
            .into_iter()
            .zip(section_charts)
            .zip(heading_charts)
            .enumerate()
            .map(|(i, (((title, blocks), charts), by_heading))| {
                let kind = classify(&title);
                let fixed = if full {
                    tables::fixed_blocks(kind, data, &config.report)
                } else {
                    Vec::new()
                };
                PlannedSection {
                    number: i + 1,
                    title,
                    kind,
                    fixed,
                    body: blocks.map(|blocks| interleave(blocks, by_heading)),
                    charts,
                }
            })
            .collect();

        let company = data.company_name().to_string();
        let today_text = today.format("%d/%m/%Y").to_string();
        let plan = match mode {
            Mode::FullReport => {
                let report_date = data
                    .report_info
                    .date
                    .clone()
                    .unwrap_or_else(|| today_text.clone());
                Self {
                    title: format!("Report Finanziario - {company}"),
                    cover: full_cover(data, &config.report.missing_value, &report_date),
                    furniture: PageFurniture::full_report(&config.brand.name, &report_date),
                    disclaimer: None,
                    mode,
                    company,
                    sections,
                    charts,
                }
            }
            Mode::CustomNote { ref title } => {
                let title = if title.trim().is_empty() {
                    "Nota Finanziaria".to_string()
                } else {
                    title.clone()
                };
                Self {
                    cover: Cover {
                        title: title.clone(),
                        subtitle: company.clone(),
                        full_page: false,
                        tagline: None,
                        facts: [Vec::new(), Vec::new()],
                    },
                    furniture: PageFurniture::custom_note(&title, &today_text),
                    disclaimer: Some(config.report.disclaimer.clone()),
                    title,
                    mode,
                    company,
                    sections,
                    charts,
                }
            }
        };
        Ok(plan)
    }

    pub fn is_full_report(&self) -> bool {
        self.mode == Mode::FullReport
    }
}

/// Interleave heading-scoped charts: charts routed to an H2 follow the last
/// block before the next H2, or the end of the section.
fn interleave(blocks: Vec<Block>, mut by_heading: BTreeMap<usize, Vec<String>>) -> Vec<Item> {
    let mut items = Vec::with_capacity(blocks.len());
    let mut pending = Vec::new();
    for (at, block) in blocks.into_iter().enumerate() {
        if block.section_title().is_some() {
            items.extend(pending.drain(..).map(Item::Chart));
            pending = by_heading.remove(&at).unwrap_or_default();
        }
        items.push(Item::Block(block));
    }
    items.extend(pending.into_iter().map(Item::Chart));
    items
}

fn full_cover(data: &ReportData, missing: &str, report_date: &str) -> Cover {
    let company = &data.company;
    let risk = &data.risk_assessment;
    let nd = |value: Option<&str>| or_missing(value, missing);

    let rating = Fact {
        tone: Tone::for_rating(risk.category.as_deref()),
        ..Fact::new(
            "Rating",
            format!(
                "{} - {}",
                nd(risk.rating.as_deref()),
                nd(risk.category_label.as_deref())
            ),
        )
    };
    let seat = match (&company.address.city, &company.address.province) {
        (Some(city), Some(province)) => format!("{city}, {province}"),
        (city, _) => nd(city.as_deref()),
    };

    Cover {
        title: "REPORT FINANZIARIO".to_string(),
        subtitle: data.company_name().to_string(),
        full_page: true,
        tagline: Some("ANALISI FINANZIARIA COMPLETA".to_string()),
        facts: [
            vec![
                Fact::new("Data Report", report_date.to_string()),
                Fact::new("Settore", nd(company.ateco.as_deref())),
                rating,
            ],
            vec![
                Fact::new("Sede Legale", seat),
                Fact::new("P.IVA", nd(company.piva.as_deref())),
                Fact::new("Dipendenti", or_missing(company.employees.current.as_ref(), missing)),
            ],
        ],
    }
}
