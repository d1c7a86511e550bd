//! Fixed financial blocks built straight from company data.
//!
//! Builders are backend-neutral: they describe rows, tones and emphasis,
//! and each renderer decides how that looks.

use crate::classify::SectionKind;
use crate::config::{Palette, ReportConfig};
use crate::data::{BalanceItem, Figure, ReportData, Trend, format_eur, or_missing};

/// Semantic colour of a piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Default,
    Muted,
    Positive,
    Negative,
    Warning,
    /// Risk-profile colour class from the data (`green`, `orange`, ...).
    Profile(String),
}

impl Tone {
    /// Colour for this tone, or `None` for the inherited text colour.
    pub fn color<'a>(&self, palette: &'a Palette) -> Option<&'a str> {
        match self {
            Tone::Default => None,
            Tone::Muted => Some(&palette.muted),
            Tone::Positive => Some(&palette.positive),
            Tone::Negative => Some(&palette.negative),
            Tone::Warning => Some(&palette.warning),
            Tone::Profile(class) => Some(match class.as_str() {
                "green" => &palette.positive,
                "light-green" => &palette.light_green,
                "yellow" => &palette.warning,
                "orange" => &palette.orange,
                "red" => &palette.negative,
                _ => &palette.subheading,
            }),
        }
    }

    fn for_status(status: &str) -> Self {
        match status {
            "OK" => Tone::Positive,
            "ALLERTA" => Tone::Negative,
            _ => Tone::Warning,
        }
    }

    fn for_class(class: Option<&str>) -> Self {
        match class {
            Some("positive") => Tone::Positive,
            Some("negative") => Tone::Negative,
            Some("warning") => Tone::Warning,
            _ => Tone::Default,
        }
    }

    fn for_sign(text: &str) -> Self {
        if text.trim_start().starts_with(['-', '−']) {
            Tone::Negative
        } else {
            Tone::Positive
        }
    }

    pub(crate) fn for_rating(category: Option<&str>) -> Self {
        match category {
            Some("A") => Tone::Positive,
            Some("B") => Tone::Warning,
            _ => Tone::Negative,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FixedCell {
    pub text: String,
    pub tone: Tone,
    pub bold: bool,
    /// Filled fraction (0..=1) of a horizontal bar drawn in the cell.
    pub meter: Option<f32>,
}

impl FixedCell {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    fn toned(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
            bold: true,
            meter: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowWeight {
    #[default]
    Normal,
    /// Bold row closing a group.
    Subtotal,
    /// Bold row on a highlighted background.
    Total,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FixedRow {
    pub cells: Vec<FixedCell>,
    pub weight: RowWeight,
}

impl FixedRow {
    fn plain<const N: usize>(cells: [String; N]) -> Self {
        Self {
            cells: cells.into_iter().map(FixedCell::text).collect(),
            weight: RowWeight::Normal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FixedTable {
    /// Column widths in percent.
    pub widths: Vec<u8>,
    /// Empty for key/value tables without a header row.
    pub header: Vec<String>,
    pub rows: Vec<FixedRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FixedBlock {
    Subheading(String),
    Table(FixedTable),
    ScoreBox {
        title: String,
        score: String,
        caption: String,
        tone: Tone,
    },
    Status {
        label: String,
        value: String,
        tone: Tone,
        detail: String,
    },
    Note(String),
}

/// Blocks injected ahead of the parsed content of a section of `kind`.
pub fn fixed_blocks(
    kind: SectionKind,
    data: &ReportData,
    report: &ReportConfig,
) -> Vec<FixedBlock> {
    let builder = Builder { data, report };
    match kind {
        SectionKind::ExecutiveSummary => builder.risk_score(),
        SectionKind::CompanyProfile => builder.company_profile(),
        SectionKind::EconomicAnalysis => builder.income_statement(),
        SectionKind::BalanceSheet => builder.balance_sheet(),
        SectionKind::FinancialIndicators => builder.indicators(),
        SectionKind::RiskAssessment => builder.risk_profiles(),
        SectionKind::CrisisCode => builder.crisis_indices(),
        SectionKind::Recommendations | SectionKind::Generic => Vec::new(),
    }
}

struct Builder<'a> {
    data: &'a ReportData,
    report: &'a ReportConfig,
}

impl Builder<'_> {
    fn nd<T: std::fmt::Display>(&self, value: Option<T>) -> String {
        or_missing(value, &self.report.missing_value)
    }

    fn risk_score(&self) -> Vec<FixedBlock> {
        let risk = &self.data.risk_assessment;
        let score = match risk.score.as_ref().and_then(Figure::as_f64) {
            Some(score) => format!("{score:.2}"),
            None => self.report.missing_value.clone(),
        };
        vec![FixedBlock::ScoreBox {
            title: "INDICE DI RISCHIO".to_string(),
            score,
            caption: format!(
                "{} - {}",
                self.nd(risk.rating.as_deref()),
                self.nd(risk.category_label.as_deref())
            ),
            tone: Tone::for_rating(risk.category.as_deref()),
        }]
    }

    fn company_profile(&self) -> Vec<FixedBlock> {
        let company = &self.data.company;
        let address = &company.address;
        let full_address = match (&address.street, &address.city) {
            (None, None) => self.report.missing_value.clone(),
            _ => format!(
                "{}, {} {} ({})",
                self.nd(address.street.as_deref()),
                address.zip.as_deref().unwrap_or_default(),
                self.nd(address.city.as_deref()),
                self.nd(address.province.as_deref())
            ),
        };

        let registry = FixedTable {
            widths: vec![40, 60],
            header: Vec::new(),
            rows: vec![
                FixedRow::plain(["Ragione Sociale".into(), self.nd(company.full_name.as_deref())]),
                FixedRow::plain(["Forma Giuridica".into(), self.nd(company.legal_form.as_deref())]),
                FixedRow::plain([
                    "Data Costituzione".into(),
                    self.nd(company.founded_date.as_deref()),
                ]),
                FixedRow::plain(["Codice ATECO".into(), self.nd(company.ateco.as_deref())]),
                FixedRow::plain(["P.IVA".into(), self.nd(company.piva.as_deref())]),
                FixedRow::plain(["Indirizzo".into(), full_address]),
            ],
        };

        let capital = match company.capitale_sociale.as_ref() {
            Some(Figure::Number(n)) => format_eur(*n),
            other => self.nd(other),
        };
        let employees = match (&company.employees.current, &company.employees.trend) {
            (Some(current), Some(trend)) => {
                let sign = if trend.as_f64().is_some_and(|t| t >= 0.0) { "+" } else { "" };
                format!("{current} ({sign}{trend} vs anno precedente)")
            }
            (current, _) => self.nd(current.as_ref()),
        };
        let contacts = &company.contacts;
        let organisation = FixedTable {
            widths: vec![40, 60],
            header: Vec::new(),
            rows: vec![
                FixedRow::plain(["Capitale Sociale".into(), capital]),
                FixedRow::plain(["Dipendenti".into(), employees]),
                FixedRow::plain(["Sedi Operative".into(), self.nd(company.locations.as_ref())]),
                FixedRow::plain([
                    "Email / PEC".into(),
                    format!(
                        "{} / {}",
                        self.nd(contacts.email.as_deref()),
                        self.nd(contacts.pec.as_deref())
                    ),
                ]),
                FixedRow::plain(["Sito Web".into(), self.nd(contacts.website.as_deref())]),
            ],
        };

        vec![
            FixedBlock::Subheading("Dati Anagrafici".to_string()),
            FixedBlock::Table(registry),
            FixedBlock::Subheading("Struttura Organizzativa".to_string()),
            FixedBlock::Table(organisation),
        ]
    }

    fn trend_cell(&self, trend: Option<&Trend>, percent: bool) -> FixedCell {
        match trend.and_then(|t| t.value.as_ref()) {
            Some(value) => {
                let mut text = value.to_string();
                if percent && !text.ends_with('%') {
                    text.push('%');
                }
                if value.as_f64().is_some_and(|v| v > 0.0) && !text.starts_with('+') {
                    text.insert(0, '+');
                }
                let tone = Tone::for_sign(&text);
                FixedCell::toned(text, tone)
            }
            None => FixedCell::text(self.report.missing_value.clone()),
        }
    }

    fn income_statement(&self) -> Vec<FixedBlock> {
        let revenues = self.data.key_metric("revenues");
        let ebitda = self.data.stat("ebitda");
        let net_income = self.data.stat("utile");

        let row = |label: &str, value: Option<&Figure>, trend: FixedCell| FixedRow {
            cells: vec![FixedCell::text(label), FixedCell::text(self.nd(value)), trend],
            weight: RowWeight::Normal,
        };

        let table = FixedTable {
            widths: vec![40, 30, 30],
            header: vec![
                "Indicatore".into(),
                "Valore".into(),
                format!("Trend vs {}", self.report.previous_year),
            ],
            rows: vec![
                row(
                    "Ricavi delle Vendite",
                    revenues.and_then(|m| m.value.as_ref()),
                    self.trend_cell(revenues.and_then(|m| m.trend.as_ref()), true),
                ),
                row(
                    "EBITDA",
                    ebitda.and_then(|s| s.value.as_ref()),
                    self.trend_cell(ebitda.and_then(|s| s.trend.as_ref()), false),
                ),
                row(
                    "Utile Netto",
                    net_income.and_then(|s| s.value.as_ref()),
                    self.trend_cell(net_income.and_then(|s| s.trend.as_ref()), false),
                ),
            ],
        };

        vec![
            FixedBlock::Subheading(format!(
                "Principali Indicatori Economici {}",
                self.report.year
            )),
            FixedBlock::Table(table),
        ]
    }

    fn balance_rows(
        &self,
        groups: &[(&[BalanceItem], &str, &BalanceItem)],
        total: (&str, &BalanceItem),
    ) -> Vec<FixedRow> {
        let year = self.report.year.as_str();
        let mut rows = Vec::new();
        for (items, subtotal_label, subtotal) in groups {
            rows.extend(items.iter().map(|item| {
                FixedRow::plain([self.nd(item.voce.as_deref()), self.nd(item.value(year))])
            }));
            rows.push(FixedRow {
                cells: vec![
                    FixedCell::toned(*subtotal_label, Tone::Default),
                    FixedCell::toned(self.nd(subtotal.value(year)), Tone::Default),
                ],
                weight: RowWeight::Subtotal,
            });
        }
        rows.push(FixedRow {
            cells: vec![
                FixedCell::toned(total.0, Tone::Default),
                FixedCell::toned(self.nd(total.1.value(year)), Tone::Default),
            ],
            weight: RowWeight::Total,
        });
        rows
    }

    fn balance_sheet(&self) -> Vec<FixedBlock> {
        let Some(sheet) = self.data.balance_sheet() else {
            return vec![FixedBlock::Note("Dati di bilancio non disponibili".to_string())];
        };
        let header = vec!["Voce".to_string(), format!("Valore {}", self.report.year)];
        let attivo = &sheet.attivo;
        let passivo = &sheet.passivo;

        let assets = FixedTable {
            widths: vec![60, 40],
            header: header.clone(),
            rows: self.balance_rows(
                &[
                    (
                        attivo.immobilizzazioni.as_slice(),
                        "Totale Immobilizzazioni",
                        &attivo.totale_immobilizzazioni,
                    ),
                    (
                        attivo.circolante.as_slice(),
                        "Totale Attivo Circolante",
                        &attivo.totale_circolante,
                    ),
                ],
                ("TOTALE ATTIVO", &attivo.totale_attivo),
            ),
        };
        let liabilities = FixedTable {
            widths: vec![60, 40],
            header,
            rows: self.balance_rows(
                &[
                    (
                        passivo.patrimonio_netto.as_slice(),
                        "Totale Patrimonio Netto",
                        &passivo.totale_patrimonio_netto,
                    ),
                    (passivo.debiti.as_slice(), "Totale Debiti", &passivo.totale_debiti),
                ],
                ("TOTALE PASSIVO", &passivo.totale_passivo),
            ),
        };

        vec![
            FixedBlock::Subheading("Attivo".to_string()),
            FixedBlock::Table(assets),
            FixedBlock::Subheading("Passivo".to_string()),
            FixedBlock::Table(liabilities),
        ]
    }

    fn indicators(&self) -> Vec<FixedBlock> {
        const IDS: [&str; 5] = ["roe", "roi", "ros", "leverage", "liquidita"];
        let rows = IDS
            .iter()
            .filter_map(|id| self.data.stat(id))
            .map(|stat| FixedRow {
                cells: vec![
                    FixedCell::text(self.nd(stat.label.as_deref())),
                    FixedCell::text(self.nd(stat.value.as_ref())),
                    FixedCell::toned(
                        self.nd(stat.trend.as_ref().and_then(|t| t.value.as_ref())),
                        Tone::for_class(stat.color_class.as_deref()),
                    ),
                ],
                weight: RowWeight::Normal,
            })
            .collect::<Vec<_>>();

        if rows.is_empty() {
            return vec![FixedBlock::Note("Indicatori finanziari non disponibili".to_string())];
        }
        vec![FixedBlock::Table(FixedTable {
            widths: vec![40, 30, 30],
            header: vec!["Indicatore".into(), "Valore".into(), "Valutazione".into()],
            rows,
        })]
    }

    fn risk_profiles(&self) -> Vec<FixedBlock> {
        let rows = self
            .data
            .profiles
            .iter()
            .map(|profile| {
                let score = profile.score.as_ref().and_then(Figure::as_f64);
                let tone = Tone::Profile(profile.color.clone().unwrap_or_default());
                FixedRow {
                    cells: vec![
                        FixedCell::text(self.nd(profile.name.as_deref())),
                        FixedCell::text(match &profile.score {
                            Some(s) => format!("{s}/5"),
                            None => self.report.missing_value.clone(),
                        }),
                        FixedCell {
                            text: String::new(),
                            tone: tone.clone(),
                            bold: false,
                            meter: Some(score.map_or(0.0, |s| (s / 5.0).clamp(0.0, 1.0) as f32)),
                        },
                        FixedCell {
                            text: self.nd(profile.evaluation.as_deref()),
                            tone,
                            bold: false,
                            meter: None,
                        },
                    ],
                    weight: RowWeight::Normal,
                }
            })
            .collect::<Vec<_>>();

        let mut blocks = vec![FixedBlock::Subheading("Profili di Rischio (scala 1-5)".to_string())];
        if rows.is_empty() {
            blocks.push(FixedBlock::Note("Profili di rischio non disponibili".to_string()));
        } else {
            blocks.push(FixedBlock::Table(FixedTable {
                widths: vec![40, 15, 25, 20],
                header: vec![
                    "Profilo".into(),
                    "Score".into(),
                    "Livello".into(),
                    "Valutazione".into(),
                ],
                rows,
            }));
        }
        blocks
    }

    fn crisis_indices(&self) -> Vec<FixedBlock> {
        let crisis = &self.data.codice_crisi;
        let status = &crisis.status;
        let overall = self.nd(status.overall.as_deref());
        let tone = if overall == "ALLERTA" {
            Tone::Negative
        } else {
            Tone::Positive
        };
        let mut blocks = vec![FixedBlock::Status {
            label: "Status: ".to_string(),
            value: overall,
            tone,
            detail: format!(
                " ({} OK, {} in allerta su {})",
                self.nd(status.indici_ok.as_ref()),
                self.nd(status.indici_allerta.as_ref()),
                self.nd(status.totale.as_ref())
            ),
        }];

        let rows = crisis
            .indices
            .iter()
            .map(|index| {
                let status = self.nd(index.status.as_deref());
                let tone = Tone::for_status(&status);
                FixedRow {
                    cells: vec![
                        FixedCell::text(self.nd(index.number.as_ref())),
                        FixedCell::text(self.nd(index.name.as_deref())),
                        FixedCell::text(self.nd(index.value.as_ref())),
                        FixedCell::text(self.nd(index.soglia.as_deref())),
                        FixedCell::toned(status, tone),
                    ],
                    weight: RowWeight::Normal,
                }
            })
            .collect::<Vec<_>>();

        if !rows.is_empty() {
            blocks.push(FixedBlock::Table(FixedTable {
                widths: vec![5, 30, 25, 20, 20],
                header: vec![
                    "#".into(),
                    "Indice".into(),
                    "Valore".into(),
                    "Soglia".into(),
                    "Status".into(),
                ],
                rows,
            }));
        }
        blocks
    }
}
