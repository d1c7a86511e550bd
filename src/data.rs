//! Company data the report is built from.
//!
//! The JSON is produced upstream and is treated as read-only. Every field is
//! optional; builders print a placeholder for anything absent.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::DataError;

/// A figure that upstream sometimes writes as a number and sometimes as
/// pre-formatted text ("197.250", "+12%").
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Figure {
    Number(f64),
    Text(String),
}

impl fmt::Display for Figure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Figure::Number(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            Figure::Number(n) => write!(f, "{n}"),
            Figure::Text(s) => f.write_str(s),
        }
    }
}

impl Figure {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Figure::Number(n) => Some(*n),
            Figure::Text(s) => s.trim().replace(',', ".").parse().ok(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReportData {
    pub company: Company,
    pub report_info: ReportInfo,
    pub risk_assessment: RiskAssessment,
    pub executive_summary: ExecutiveSummary,
    pub management: Vec<Manager>,
    pub key_metrics: Vec<Metric>,
    pub financial_data: FinancialData,
    pub note_tecniche: Vec<TechnicalNote>,
    pub profiles: Vec<RiskProfile>,
    pub codice_crisi: CrisisCode,
    pub outlook: Outlook,
    /// Chart images exported as base64 or `data:` URIs, by chart key.
    pub charts: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Company {
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub legal_form: Option<String>,
    pub founded_date: Option<String>,
    pub ateco: Option<String>,
    pub piva: Option<String>,
    pub address: Address,
    pub capitale_sociale: Option<Figure>,
    pub employees: Employees,
    pub locations: Option<Figure>,
    pub contacts: Contacts,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Address {
    pub street: Option<String>,
    pub zip: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Employees {
    pub current: Option<Figure>,
    pub trend: Option<Figure>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Contacts {
    pub email: Option<String>,
    pub pec: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportInfo {
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RiskAssessment {
    pub score: Option<Figure>,
    pub rating: Option<String>,
    pub previous_rating: Option<String>,
    pub category: Option<String>,
    pub category_label: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExecutiveSummary {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Manager {
    pub name: Option<String>,
    pub role: Option<String>,
    pub appointment_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Trend {
    pub value: Option<Figure>,
    pub direction: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Metric {
    pub id: String,
    pub title: Option<String>,
    pub value: Option<Figure>,
    pub trend: Option<Trend>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FinancialData {
    pub stats: Vec<Stat>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Stat {
    pub id: String,
    pub label: Option<String>,
    pub value: Option<Figure>,
    pub trend: Option<Trend>,
    pub color_class: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TechnicalNote {
    pub stato_patrimoniale: Option<BalanceSheet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BalanceSheet {
    pub attivo: Assets,
    pub passivo: Liabilities,
}

/// A balance-sheet line: a label and one value per fiscal year.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BalanceItem {
    pub voce: Option<String>,
    #[serde(flatten)]
    pub values: BTreeMap<String, serde_json::Value>,
}

impl BalanceItem {
    /// The figure for a year column; non-scalar entries count as absent.
    pub fn value(&self, year: &str) -> Option<Figure> {
        match self.values.get(year)? {
            serde_json::Value::Number(n) => n.as_f64().map(Figure::Number),
            serde_json::Value::String(s) => Some(Figure::Text(s.clone())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Assets {
    pub immobilizzazioni: Vec<BalanceItem>,
    pub totale_immobilizzazioni: BalanceItem,
    pub circolante: Vec<BalanceItem>,
    pub totale_circolante: BalanceItem,
    pub totale_attivo: BalanceItem,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Liabilities {
    pub patrimonio_netto: Vec<BalanceItem>,
    pub totale_patrimonio_netto: BalanceItem,
    pub debiti: Vec<BalanceItem>,
    pub totale_debiti: BalanceItem,
    pub totale_passivo: BalanceItem,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RiskProfile {
    pub name: Option<String>,
    pub score: Option<Figure>,
    pub evaluation: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CrisisCode {
    pub status: CrisisStatus,
    pub indices: Vec<CrisisIndex>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CrisisStatus {
    pub overall: Option<String>,
    pub indici_ok: Option<Figure>,
    pub indici_allerta: Option<Figure>,
    pub totale: Option<Figure>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CrisisIndex {
    pub number: Option<Figure>,
    pub name: Option<String>,
    pub value: Option<Figure>,
    pub soglia: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Outlook {
    pub raccomandazioni: Vec<String>,
    pub outlook: Option<String>,
}

impl ReportData {
    pub fn from_json(json: &str) -> Result<Self, DataError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, DataError> {
        let json = fs::read_to_string(path).map_err(|source| DataError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn company_name(&self) -> &str {
        self.company.name.as_deref().unwrap_or("Azienda")
    }

    pub fn key_metric(&self, id: &str) -> Option<&Metric> {
        self.key_metrics.iter().find(|m| m.id == id)
    }

    pub fn stat(&self, id: &str) -> Option<&Stat> {
        self.financial_data.stats.iter().find(|s| s.id == id)
    }

    /// First technical note carrying a balance sheet.
    pub fn balance_sheet(&self) -> Option<&BalanceSheet> {
        self.note_tecniche
            .iter()
            .find_map(|note| note.stato_patrimoniale.as_ref())
    }
}

/// Display an optional value, or the placeholder when it is absent.
pub fn or_missing<T: fmt::Display>(value: Option<T>, missing: &str) -> String {
    match value {
        Some(v) => {
            let text = v.to_string();
            if text.trim().is_empty() {
                missing.to_string()
            } else {
                text
            }
        }
        None => missing.to_string(),
    }
}

/// Whole euros with Italian grouping: `10000` -> `10.000 €`.
pub fn format_eur(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if rounded < 0 { "-" } else { "" };
    format!("{sign}{grouped} €")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE: &str = r##"{
        "company": {
            "name": "BFLOWS S.R.L.",
            "fullName": "BFLOWS S.R.L. Società Benefit",
            "legalForm": "Società a responsabilità limitata",
            "foundedDate": "2021-03-15",
            "ateco": "62.01 - Produzione di software",
            "piva": "12345678901",
            "address": { "street": "Via Roma 1", "zip": "20100", "city": "Milano", "province": "MI" },
            "capitaleSociale": 10000,
            "employees": { "current": 12, "trend": 4 },
            "locations": 2,
            "contacts": { "email": "info@bflows.it", "pec": "bflows@pec.it", "website": "" }
        },
        "reportInfo": { "date": "15/01/2025" },
        "riskAssessment": {
            "score": 62.5,
            "rating": "BB",
            "previousRating": "B",
            "category": "B",
            "categoryLabel": "Rischio Medio",
            "description": "Profilo in miglioramento."
        },
        "executiveSummary": {
            "strengths": ["Crescita dei ricavi", "Capitalizzazione solida"],
            "weaknesses": ["EBITDA negativo"]
        },
        "management": [
            { "name": "Mario Rossi", "role": "Amministratore Unico", "appointmentDate": "2021-03-15" }
        ],
        "keyMetrics": [
            { "id": "revenues", "value": "197.250", "trend": { "value": 839, "direction": "up" } }
        ],
        "financialData": {
            "stats": [
                { "id": "ebitda", "label": "EBITDA", "value": "-98.912", "trend": { "value": "-12%" }, "colorClass": "negative" },
                { "id": "utile", "label": "Utile Netto", "value": "-105.300", "trend": { "value": "-8%" }, "colorClass": "negative" },
                { "id": "roe", "label": "ROE", "value": "-45,2%", "trend": { "value": "Critico" }, "colorClass": "negative" },
                { "id": "liquidita", "label": "Liquidità", "value": "1,8", "trend": { "value": "Buona" }, "colorClass": "positive" }
            ]
        },
        "noteTecniche": [
            {},
            {
                "statoPatrimoniale": {
                    "attivo": {
                        "immobilizzazioni": [{ "voce": "Immobilizzazioni immateriali", "2024": "45.000" }],
                        "totaleImmobilizzazioni": { "2024": "45.000" },
                        "circolante": [{ "voce": "Disponibilità liquide", "2024": "120.500" }],
                        "totaleCircolante": { "2024": "180.000" },
                        "totaleAttivo": { "2024": "225.000" }
                    },
                    "passivo": {
                        "patrimonioNetto": [{ "voce": "Capitale", "2024": "10.000" }, { "voce": "Riserve" }],
                        "totalePatrimonioNetto": { "2024": "95.000" },
                        "debiti": [{ "voce": "Debiti verso fornitori", "2024": "130.000" }],
                        "totaleDebiti": { "2024": "130.000" },
                        "totalePassivo": { "2024": "225.000" }
                    }
                }
            }
        ],
        "profiles": [
            { "name": "Rischio Operativo", "score": 3, "evaluation": "Medio", "color": "yellow" },
            { "name": "Rischio Finanziario", "score": 4, "evaluation": "Elevato", "color": "orange" }
        ],
        "codiceCrisi": {
            "status": { "overall": "ALLERTA", "indiciOk": 5, "indiciAllerta": 2, "totale": 7 },
            "indices": [
                { "number": 1, "name": "Patrimonio netto", "value": "95.000", "soglia": "> 0", "status": "OK" },
                { "number": 2, "name": "DSCR", "value": "0,8", "soglia": "> 1", "status": "ALLERTA" }
            ]
        },
        "outlook": {
            "raccomandazioni": ["Ridurre i costi fissi", "Rinegoziare il debito"],
            "outlook": "Prospettive positive nel medio periodo."
        }
    }"##;

    pub(crate) fn sample() -> ReportData {
        ReportData::from_json(SAMPLE).unwrap()
    }

    #[test]
    fn parses_sample() {
        let data = sample();
        assert_eq!(data.company_name(), "BFLOWS S.R.L.");
        assert_eq!(data.stat("ebitda").unwrap().value, Some(Figure::Text("-98.912".into())));
        assert!(data.balance_sheet().is_some());
        assert_eq!(data.profiles.len(), 2);
    }

    #[test]
    fn empty_object_is_valid() {
        let data = ReportData::from_json("{}").unwrap();
        assert_eq!(data.company_name(), "Azienda");
        assert!(data.balance_sheet().is_none());
        assert!(data.key_metric("revenues").is_none());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(ReportData::from_json("{"), Err(DataError::Parse(_))));
    }

    #[test]
    fn year_columns() {
        let data = sample();
        let sheet = data.balance_sheet().unwrap();
        let reserves = &sheet.passivo.patrimonio_netto[1];
        assert_eq!(reserves.voce.as_deref(), Some("Riserve"));
        assert!(reserves.value("2024").is_none());
        assert_eq!(
            sheet.attivo.totale_attivo.value("2024").map(|f| f.to_string()).as_deref(),
            Some("225.000")
        );
    }

    #[test]
    fn figure_display() {
        assert_eq!(Figure::Number(12.0).to_string(), "12");
        assert_eq!(Figure::Number(62.5).to_string(), "62.5");
        assert_eq!(Figure::Text("+5%".into()).to_string(), "+5%");
        assert_eq!(Figure::Text("3,5".into()).as_f64(), Some(3.5));
    }

    #[test]
    fn placeholders() {
        assert_eq!(or_missing(None::<&str>, "N/D"), "N/D");
        assert_eq!(or_missing(Some(""), "N/D"), "N/D");
        assert_eq!(or_missing(Some("x"), "N/D"), "x");
    }

    #[test]
    fn euro_formatting() {
        assert_eq!(format_eur(10000.0), "10.000 €");
        assert_eq!(format_eur(999.0), "999 €");
        assert_eq!(format_eur(1234567.4), "1.234.567 €");
        assert_eq!(format_eur(-2500.0), "-2.500 €");
        assert_eq!(format_eur(0.0), "0 €");
    }
}
