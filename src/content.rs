//! Where section markdown comes from.

use std::fs;
use std::path::Path;

use crate::classify::{SectionKind, classify};
use crate::data::ReportData;
use crate::error::ContentError;

/// Produces the markdown body for a titled section.
pub trait ContentSource {
    fn section(&mut self, title: &str) -> Result<String, ContentError>;
}

/// Markdown written from the company data alone, with no assistant involved.
#[derive(Debug, Clone, Copy)]
pub struct StaticTemplates<'a> {
    data: &'a ReportData,
}

impl<'a> StaticTemplates<'a> {
    pub fn new(data: &'a ReportData) -> Self {
        Self { data }
    }

    fn executive_summary(&self) -> String {
        let mut md = String::new();
        if let Some(description) = &self.data.risk_assessment.description {
            md.push_str(description);
            md.push_str("\n\n");
        }
        push_list(&mut md, "Punti di Forza", &self.data.executive_summary.strengths);
        push_list(&mut md, "Aree di Attenzione", &self.data.executive_summary.weaknesses);
        md
    }

    fn management(&self) -> String {
        if self.data.management.is_empty() {
            return String::new();
        }
        let mut md = String::from("## Organi Sociali\n\n| Nome | Ruolo | Data Nomina |\n|---|---|---|\n");
        for manager in &self.data.management {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                manager.name.as_deref().unwrap_or_default(),
                manager.role.as_deref().unwrap_or_default(),
                manager.appointment_date.as_deref().unwrap_or_default()
            ));
        }
        md
    }

    fn recommendations(&self) -> String {
        let outlook = &self.data.outlook;
        let mut md = String::new();
        for item in &outlook.raccomandazioni {
            md.push_str("- ");
            md.push_str(item);
            md.push('\n');
        }
        if let Some(text) = &outlook.outlook {
            md.push_str("\n## Outlook\n\n");
            md.push_str(text);
            md.push('\n');
        }
        md
    }
}

fn push_list(md: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    md.push_str("## ");
    md.push_str(heading);
    md.push_str("\n\n");
    for item in items {
        md.push_str("- ");
        md.push_str(item);
        md.push('\n');
    }
    md.push('\n');
}

impl ContentSource for StaticTemplates<'_> {
    fn section(&mut self, title: &str) -> Result<String, ContentError> {
        Ok(match classify(title) {
            SectionKind::ExecutiveSummary => self.executive_summary(),
            SectionKind::CompanyProfile => self.management(),
            SectionKind::Recommendations => self.recommendations(),
            // The remaining sections are carried by their fixed tables.
            SectionKind::EconomicAnalysis
            | SectionKind::BalanceSheet
            | SectionKind::FinancialIndicators
            | SectionKind::RiskAssessment
            | SectionKind::CrisisCode => String::new(),
            SectionKind::Generic => return Err(ContentError::Missing(title.to_string())),
        })
    }
}

/// A markdown document split on its `## ` headings.
///
/// Sections are looked up by exact title first, then by classification, so
/// "Analisi economica 2024" in the document serves "Analisi Economica".
#[derive(Debug, Clone, Default)]
pub struct MarkdownSections {
    sections: Vec<(String, String)>,
}

impl MarkdownSections {
    pub fn parse(markdown: &str) -> Self {
        let mut sections: Vec<(String, String)> = Vec::new();
        for line in markdown.lines() {
            match line.trim().strip_prefix("## ") {
                Some(title) => sections.push((title.trim().to_string(), String::new())),
                None => {
                    if let Some((_, body)) = sections.last_mut() {
                        body.push_str(line);
                        body.push('\n');
                    }
                }
            }
        }
        Self { sections }
    }

    pub fn load(path: &Path) -> Result<Self, ContentError> {
        let markdown = fs::read_to_string(path).map_err(|source| ContentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&markdown))
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(title, _)| title.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl ContentSource for MarkdownSections {
    fn section(&mut self, title: &str) -> Result<String, ContentError> {
        let exact = self
            .sections
            .iter()
            .find(|(t, _)| t.eq_ignore_ascii_case(title));
        let found = exact.or_else(|| {
            let kind = classify(title);
            if kind == SectionKind::Generic {
                return None;
            }
            self.sections.iter().find(|(t, _)| classify(t) == kind)
        });
        match found {
            Some((_, body)) if !body.trim().is_empty() => Ok(body.trim().to_string()),
            _ => Err(ContentError::Missing(title.to_string())),
        }
    }
}

/// Try `primary`, then `secondary` if the first fails.
#[derive(Debug, Clone)]
pub struct Fallback<P, S> {
    primary: P,
    secondary: S,
}

impl<P, S> Fallback<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

impl<P: ContentSource, S: ContentSource> ContentSource for Fallback<P, S> {
    fn section(&mut self, title: &str) -> Result<String, ContentError> {
        match self.primary.section(title) {
            Ok(content) => Ok(content),
            Err(e) => {
                tracing::debug!(section = title, error = %e, "falling back to secondary content");
                self.secondary.section(title)
            }
        }
    }
}
