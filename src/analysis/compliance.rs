use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::entities::{AMOUNT_PATTERN, DATE_PATTERN};
use crate::models::DocumentType;

const PARTIES: &str = r"(?i)\bpart(?:y|ies)\b";
const PARTY_ROLES: &str =
    r"(?i)\b(?:between|client|contractor|company|landlord|tenant|licensor|licensee)\b";
const SIGNATURE: &str = r"(?i)\bin\s+witness\s+whereof\b|\bsignatures?\b|\bsigned\b";
const SIGNATURE_LINE: &str = r"(?i)\bby:\s|_{5,}";

/// One checklist row. `required` passes the item; failing that, `partial`
/// downgrades it to a warning instead of a failure.
struct Rule {
    name: &'static str,
    required: &'static str,
    partial: Option<&'static str>,
}

const CONTRACT_RULES: &[Rule] = &[
    Rule { name: "Parties Identified", required: PARTIES, partial: Some(PARTY_ROLES) },
    Rule { name: "Effective Date", required: r"(?i)\beffective\s+(?:date|as\s+of)\b", partial: Some(DATE_PATTERN) },
    Rule { name: "Payment Terms", required: r"(?i)\b(?:payments?|fees?|compensation)\b", partial: Some(AMOUNT_PATTERN) },
    Rule { name: "Termination Clause", required: r"(?i)\bterminat(?:e|es|ed|ion)\b", partial: Some(r"(?i)\bexpir(?:e|es|ation)\b") },
    Rule { name: "Governing Law", required: r"(?i)\bgoverning\s+law\b|\bgoverned\s+by\b", partial: Some(r"(?i)\bjurisdiction\b") },
    Rule { name: "Signature Block", required: SIGNATURE, partial: Some(SIGNATURE_LINE) },
];

const NDA_RULES: &[Rule] = &[
    Rule { name: "Confidential Information Definition", required: r"(?i)\bconfidential\s+information\b", partial: Some(r"(?i)\bconfidential") },
    Rule { name: "Receiving Party Obligations", required: r"(?i)\breceiving\s+party\b", partial: Some(r"(?i)\b(?:not\s+(?:to\s+)?disclose|non-disclosure)\b") },
    Rule { name: "Exclusions", required: r"(?i)\bexclu(?:de|des|ded|sion|sions)\b", partial: Some(r"(?i)\bpublicly\s+available\b") },
    Rule { name: "Term of Agreement", required: r"(?i)\b(?:term|period)\s+of\b", partial: Some(r"(?i)\b\d+\s+(?:years?|months?)\b") },
    Rule { name: "Return of Materials", required: r"(?i)\breturn\b[^.]*\b(?:materials?|information|documents?)\b", partial: Some(r"(?i)\bdestr(?:oy|uction)\b") },
];

const LEASE_RULES: &[Rule] = &[
    Rule { name: "Premises Description", required: r"(?i)\bpremises\b", partial: Some(r"(?i)\b(?:property|unit|apartment|address)\b") },
    Rule { name: "Rent Amount", required: r"(?i)\brent\b[^.]*\$\s?\d", partial: Some(r"(?i)\brent\b") },
    Rule { name: "Lease Term", required: r"(?i)\blease\s+term\b|\bterm\s+of\s+(?:the\s+|this\s+)?lease\b", partial: Some(r"(?i)\b\d+\s+(?:months?|years?)\b") },
    Rule { name: "Security Deposit", required: r"(?i)\bsecurity\s+deposit\b", partial: Some(r"(?i)\bdeposit\b") },
    Rule { name: "Maintenance Responsibilities", required: r"(?i)\b(?:maintenance|repairs?)\b", partial: None },
];

const GENERAL_RULES: &[Rule] = &[
    Rule { name: "Document Has Content", required: r"\S", partial: None },
    Rule { name: "Dates Specified", required: DATE_PATTERN, partial: None },
    Rule { name: "Parties Identified", required: PARTIES, partial: Some(PARTY_ROLES) },
    Rule { name: "Signature Block", required: SIGNATURE, partial: Some(SIGNATURE_LINE) },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Checklist {
    Contract,
    Nda,
    Lease,
    General,
}

impl Checklist {
    pub fn for_document_type(document_type: DocumentType) -> Self {
        match document_type {
            DocumentType::Contract | DocumentType::Agreement => Checklist::Contract,
            DocumentType::Nda => Checklist::Nda,
            DocumentType::Lease => Checklist::Lease,
            _ => Checklist::General,
        }
    }

    fn rules(self) -> &'static [Rule] {
        match self {
            Checklist::Contract => CONTRACT_RULES,
            Checklist::Nda => NDA_RULES,
            Checklist::Lease => LEASE_RULES,
            Checklist::General => GENERAL_RULES,
        }
    }
}

struct CompiledRule {
    name: &'static str,
    required: Regex,
    partial: Option<Regex>,
}

fn compile(rules: &[Rule]) -> Vec<CompiledRule> {
    rules
        .iter()
        .map(|rule| CompiledRule {
            name: rule.name,
            required: Regex::new(rule.required).expect("valid compliance pattern"),
            partial: rule
                .partial
                .map(|pattern| Regex::new(pattern).expect("valid compliance pattern")),
        })
        .collect()
}

static CONTRACT: Lazy<Vec<CompiledRule>> = Lazy::new(|| compile(Checklist::Contract.rules()));
static NDA: Lazy<Vec<CompiledRule>> = Lazy::new(|| compile(Checklist::Nda.rules()));
static LEASE: Lazy<Vec<CompiledRule>> = Lazy::new(|| compile(Checklist::Lease.rules()));
static GENERAL: Lazy<Vec<CompiledRule>> = Lazy::new(|| compile(Checklist::General.rules()));

fn compiled(checklist: Checklist) -> &'static [CompiledRule] {
    match checklist {
        Checklist::Contract => &CONTRACT,
        Checklist::Nda => &NDA,
        Checklist::Lease => &LEASE,
        Checklist::General => &GENERAL,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Passed,
    Warning,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceItem {
    pub name: String,
    pub status: ComplianceStatus,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub checklist: Checklist,
    pub items: Vec<ComplianceItem>,
    pub passed: usize,
    pub warnings: usize,
    pub failed: usize,
    pub score: u8,
}

impl ComplianceReport {
    pub fn item(&self, name: &str) -> Option<&ComplianceItem> {
        self.items.iter().find(|item| item.name == name)
    }
}

pub fn check(content: &str, document_type: DocumentType) -> ComplianceReport {
    let checklist = Checklist::for_document_type(document_type);
    let items: Vec<ComplianceItem> = compiled(checklist)
        .iter()
        .map(|rule| {
            let (status, detail) = if rule.required.is_match(content) {
                (ComplianceStatus::Passed, format!("{} is present.", rule.name))
            } else if rule
                .partial
                .as_ref()
                .is_some_and(|partial| partial.is_match(content))
            {
                (
                    ComplianceStatus::Warning,
                    format!("{} is only partially addressed.", rule.name),
                )
            } else {
                (ComplianceStatus::Failed, format!("{} is missing.", rule.name))
            };
            ComplianceItem {
                name: rule.name.to_string(),
                status,
                detail,
            }
        })
        .collect();

    let count = |status: ComplianceStatus| items.iter().filter(|item| item.status == status).count();
    let passed = count(ComplianceStatus::Passed);
    let warnings = count(ComplianceStatus::Warning);
    let failed = count(ComplianceStatus::Failed);
    let score = if items.is_empty() {
        0
    } else {
        ((passed as f64 / items.len() as f64) * 100.0).round() as u8
    };

    ComplianceReport {
        checklist,
        items,
        passed,
        warnings,
        failed,
        score,
    }
}
