//! Section classification by title.
//!
//! One keyword table drives both chart placement and fixed-table injection,
//! so the two can never disagree about what a section is.

/// What a titled section of the report is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    ExecutiveSummary,
    CompanyProfile,
    EconomicAnalysis,
    BalanceSheet,
    FinancialIndicators,
    RiskAssessment,
    CrisisCode,
    Recommendations,
    Generic,
}

/// A chart slot: which image to place and how wide, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartSpec {
    pub key: &'static str,
    pub width: f32,
}

/// Ordered `(substring, kind)` table. Matched against the lowercased title;
/// the first hit wins.
const KEYWORDS: &[(&str, SectionKind)] = &[
    ("executive summary", SectionKind::ExecutiveSummary),
    ("sintesi", SectionKind::ExecutiveSummary),
    ("profilo aziendale", SectionKind::CompanyProfile),
    ("dati anagrafici", SectionKind::CompanyProfile),
    ("analisi economica", SectionKind::EconomicAnalysis),
    ("conto economico", SectionKind::EconomicAnalysis),
    ("trend economico", SectionKind::EconomicAnalysis),
    ("stato patrimoniale", SectionKind::BalanceSheet),
    ("capitale circolante", SectionKind::BalanceSheet),
    ("indicatori finanziari", SectionKind::FinancialIndicators),
    ("sostenibilità del debito", SectionKind::FinancialIndicators),
    ("risk assessment", SectionKind::RiskAssessment),
    ("rischio", SectionKind::RiskAssessment),
    ("stress test", SectionKind::RiskAssessment),
    ("codice della crisi", SectionKind::CrisisCode),
    ("raccomandazioni", SectionKind::Recommendations),
];

const ECONOMIC_CHARTS: &[ChartSpec] = &[ChartSpec {
    key: "economicTrend",
    width: 500.0,
}];
const BALANCE_CHARTS: &[ChartSpec] = &[ChartSpec {
    key: "workingCapital",
    width: 450.0,
}];
const INDICATOR_CHARTS: &[ChartSpec] = &[ChartSpec {
    key: "debtSustainability",
    width: 450.0,
}];
const RISK_CHARTS: &[ChartSpec] = &[
    ChartSpec {
        key: "benchmarkRadar",
        width: 400.0,
    },
    ChartSpec {
        key: "stressTest",
        width: 450.0,
    },
];

/// Classify a section or heading title.
pub fn classify(title: &str) -> SectionKind {
    let title = title.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(keyword, _)| title.contains(keyword))
        .map(|(_, kind)| *kind)
        .unwrap_or(SectionKind::Generic)
}

impl SectionKind {
    /// Charts that belong after a section of this kind, in placement order.
    pub fn charts(self) -> &'static [ChartSpec] {
        match self {
            SectionKind::EconomicAnalysis => ECONOMIC_CHARTS,
            SectionKind::BalanceSheet => BALANCE_CHARTS,
            SectionKind::FinancialIndicators => INDICATOR_CHARTS,
            SectionKind::RiskAssessment => RISK_CHARTS,
            _ => &[],
        }
    }

    /// Width hint for a known chart key.
    pub fn chart_width(key: &str) -> Option<f32> {
        [ECONOMIC_CHARTS, BALANCE_CHARTS, INDICATOR_CHARTS, RISK_CHARTS]
            .iter()
            .flat_map(|specs| specs.iter())
            .find(|spec| spec.key == key)
            .map(|spec| spec.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_titles() {
        assert_eq!(classify("Executive Summary"), SectionKind::ExecutiveSummary);
        assert_eq!(classify("Profilo Aziendale"), SectionKind::CompanyProfile);
        assert_eq!(classify("Analisi Economica"), SectionKind::EconomicAnalysis);
        assert_eq!(classify("Stato Patrimoniale"), SectionKind::BalanceSheet);
        assert_eq!(classify("Indicatori Finanziari"), SectionKind::FinancialIndicators);
        assert_eq!(classify("Risk Assessment"), SectionKind::RiskAssessment);
        assert_eq!(classify("Codice della Crisi"), SectionKind::CrisisCode);
        assert_eq!(
            classify("Raccomandazioni Strategiche"),
            SectionKind::Recommendations
        );
    }

    #[test]
    fn case_insensitive_substring() {
        assert_eq!(classify("4. STATO PATRIMONIALE 2024"), SectionKind::BalanceSheet);
        assert_eq!(classify("Profili di rischio"), SectionKind::RiskAssessment);
    }

    #[test]
    fn first_match_wins() {
        // Both "analisi economica" and "rischio" occur; the earlier table row wins.
        assert_eq!(
            classify("Analisi economica e rischio"),
            SectionKind::EconomicAnalysis
        );
    }

    #[test]
    fn unknown_titles_are_generic() {
        assert_eq!(classify("Conclusioni"), SectionKind::Generic);
        assert!(SectionKind::Generic.charts().is_empty());
    }

    #[test]
    fn chart_widths() {
        assert_eq!(SectionKind::chart_width("economicTrend"), Some(500.0));
        assert_eq!(SectionKind::chart_width("benchmarkRadar"), Some(400.0));
        assert_eq!(SectionKind::chart_width("pie"), None);
    }
}
