use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::complexity::ComplexityLevel;
use super::FullAnalysis;
use crate::models::DocumentType;

const ISSUE_WEIGHT: usize = 20;
const MISSING_CLAUSE_WEIGHT: usize = 5;

const CLAUSES: &[(&str, &str)] = &[
    ("Force Majeure", r"(?i)\bforce\s+majeure\b"),
    ("Indemnification", r"(?i)\bindemnif(?:y|ies|ied|ication)\b"),
    (
        "Limitation of Liability",
        r"(?i)\blimitation\s+of\s+liability\b|\bliability\s+shall\s+not\s+exceed\b",
    ),
    ("Confidentiality", r"(?i)\bconfidential(?:ity)?\b"),
    ("Termination", r"(?i)\bterminat(?:e|es|ed|ion)\b"),
    (
        "Governing Law",
        r"(?i)\bgoverning\s+law\b|\bgoverned\s+by\s+the\s+laws?\b",
    ),
    (
        "Dispute Resolution",
        r"(?i)\bdispute\s+resolution\b|\barbitration\b|\bmediation\b",
    ),
    ("Intellectual Property", r"(?i)\bintellectual\s+property\b"),
];

static CLAUSE_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    CLAUSES
        .iter()
        .map(|(name, pattern)| (*name, Regex::new(pattern).expect("valid clause pattern")))
        .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=29 => RiskLevel::Low,
            30..=59 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseCheck {
    pub name: String,
    pub present: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalReview {
    pub analysis: FullAnalysis,
    pub clauses: Vec<ClauseCheck>,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
}

pub fn risk_score(issue_count: usize, missing_clause_count: usize) -> u8 {
    (issue_count * ISSUE_WEIGHT + missing_clause_count * MISSING_CLAUSE_WEIGHT).min(100) as u8
}

pub fn review(content: &str, document_type: DocumentType, analysis: FullAnalysis) -> LegalReview {
    let clauses: Vec<ClauseCheck> = CLAUSE_PATTERNS
        .iter()
        .map(|(name, pattern)| ClauseCheck {
            name: (*name).to_string(),
            present: pattern.is_match(content),
        })
        .collect();
    let has_clause = |name: &str| clauses.iter().any(|clause| clause.name == name && clause.present);

    let mut issues = Vec::new();
    let mut recommendations = Vec::new();

    if content.trim().is_empty() {
        issues.push("Document has no content to review.".to_string());
    } else {
        if analysis.entities.dates.is_empty() {
            issues.push("No dates found; effective and expiry dates are not stated.".to_string());
            recommendations.push("State the effective date and any deadlines explicitly.".to_string());
        }
        if document_type.is_contractual() && analysis.entities.amounts.is_empty() {
            issues.push("No monetary terms found.".to_string());
            recommendations.push("Specify payment amounts and currency.".to_string());
        }
    }

    let missing_clauses = if document_type.is_contractual() {
        for required in ["Termination", "Governing Law"] {
            if !has_clause(required) {
                issues.push(format!("Missing {required} clause."));
            }
        }
        let missing: Vec<&ClauseCheck> = clauses.iter().filter(|clause| !clause.present).collect();
        for clause in &missing {
            recommendations.push(format!("Consider adding a {} clause.", clause.name));
        }
        missing.len()
    } else {
        0
    };

    if analysis.complexity.level == ComplexityLevel::High {
        recommendations.push("Shorten long sentences to improve readability.".to_string());
    }

    let risk_score = risk_score(issues.len(), missing_clauses);
    LegalReview {
        analysis,
        clauses,
        issues,
        recommendations,
        risk_score,
        risk_level: RiskLevel::from_score(risk_score),
    }
}
