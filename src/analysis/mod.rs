//! Rule-based text analysis. Everything here is pure and synchronous; the
//! worker runs it on a blocking thread and persists the result.

pub mod complexity;
pub mod compliance;
pub mod entities;
pub mod key_points;
pub mod legal;
pub mod sentiment;
pub mod structure;
pub mod summary;
mod text;

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_ANALYZER_ID;
use crate::models::{AnalysisType, Document, DocumentType};

pub use complexity::{ComplexityFindings, ComplexityLevel};
pub use compliance::{Checklist, ComplianceItem, ComplianceReport, ComplianceStatus};
pub use entities::Entities;
pub use key_points::{KeyPoint, KeyPointsFindings};
pub use legal::{ClauseCheck, LegalReview, RiskLevel};
pub use sentiment::{SentimentFindings, Tone};
pub use structure::StructureSignals;
pub use summary::{SummaryFindings, TextStatistics};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullAnalysis {
    pub summary: SummaryFindings,
    pub structure: StructureSignals,
    pub entities: Entities,
    pub sentiment: SentimentFindings,
    pub complexity: ComplexityFindings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Findings {
    Summary(SummaryFindings),
    KeyPoints(KeyPointsFindings),
    FullAnalysis(FullAnalysis),
    LegalReview(LegalReview),
    ComplianceCheck(ComplianceReport),
}

impl Findings {
    pub fn analysis_type(&self) -> AnalysisType {
        match self {
            Findings::Summary(_) => AnalysisType::Summary,
            Findings::KeyPoints(_) => AnalysisType::KeyPoints,
            Findings::FullAnalysis(_) => AnalysisType::FullAnalysis,
            Findings::LegalReview(_) => AnalysisType::LegalReview,
            Findings::ComplianceCheck(_) => AnalysisType::ComplianceCheck,
        }
    }
}

/// What gets stored under `document.analysis[<type>]` and in the task output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis_type: AnalysisType,
    pub findings: Findings,
    pub analyzed_at: NaiveDateTime,
    pub analyzer: String,
    /// `edit_version` of the document content that was analyzed.
    #[serde(default)]
    pub edit_version: i32,
}

pub fn full_analysis(content: &str) -> FullAnalysis {
    FullAnalysis {
        summary: summary::summarize(content),
        structure: structure::detect(content),
        entities: entities::extract(content),
        sentiment: sentiment::classify(content),
        complexity: complexity::measure(content),
    }
}

pub fn analyze(content: &str, document_type: DocumentType, analysis_type: AnalysisType) -> Findings {
    match analysis_type {
        AnalysisType::Summary => Findings::Summary(summary::summarize(content)),
        AnalysisType::KeyPoints => Findings::KeyPoints(key_points::extract(content)),
        AnalysisType::FullAnalysis => Findings::FullAnalysis(full_analysis(content)),
        AnalysisType::LegalReview => Findings::LegalReview(legal::review(
            content,
            document_type,
            full_analysis(content),
        )),
        AnalysisType::ComplianceCheck => {
            Findings::ComplianceCheck(compliance::check(content, document_type))
        }
    }
}

/// Stamps findings with the analyzer identity and a timestamp.
#[derive(Debug, Clone)]
pub struct TextAnalyzer {
    analyzer_id: String,
}

impl Default for TextAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_ANALYZER_ID)
    }
}

impl TextAnalyzer {
    pub fn new(analyzer_id: impl Into<String>) -> Self {
        Self {
            analyzer_id: analyzer_id.into(),
        }
    }

    pub fn analyzer_id(&self) -> &str {
        &self.analyzer_id
    }

    pub fn run(
        &self,
        content: &str,
        document_type: DocumentType,
        analysis_type: AnalysisType,
    ) -> AnalysisResult {
        AnalysisResult {
            analysis_type,
            findings: analyze(content, document_type, analysis_type),
            analyzed_at: Utc::now().naive_utc(),
            analyzer: self.analyzer_id.clone(),
            edit_version: 0,
        }
    }

    /// Like [`TextAnalyzer::run`], stamped with the document's edit version.
    pub fn run_document(
        &self,
        document: &Document,
        analysis_type: AnalysisType,
    ) -> AnalysisResult {
        AnalysisResult {
            edit_version: document.edit_version,
            ..self.run(&document.content, document.document_type, analysis_type)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_on_analysis_type() {
        for &analysis_type in AnalysisType::ALL {
            let findings = analyze("The parties agree.", DocumentType::Contract, analysis_type);
            assert_eq!(findings.analysis_type(), analysis_type);
        }
    }

    #[test]
    fn result_serializes_with_kind_tag() -> anyhow::Result<()> {
        let analyzer = TextAnalyzer::new("rules/test");
        let result = analyzer.run(
            "Payment shall be made within 30 days.",
            DocumentType::Contract,
            AnalysisType::KeyPoints,
        );
        let value = serde_json::to_value(&result)?;
        assert_eq!(value["analysis_type"], "key_points");
        assert_eq!(value["findings"]["kind"], "key_points");
        assert_eq!(value["analyzer"], "rules/test");

        let back: AnalysisResult = serde_json::from_value(value)?;
        assert_eq!(back.findings, result.findings);
        Ok(())
    }

    #[test]
    fn empty_content_still_produces_findings() {
        match analyze("", DocumentType::Other, AnalysisType::Summary) {
            Findings::Summary(summary) => assert_eq!(summary.summary, summary::EMPTY_SUMMARY),
            other => panic!("unexpected findings {other:?}"),
        }
    }
}
