//! Core records produced and consumed by the analysis pipeline.
//!
//! Every record defaults each field to an empty value, so a downstream
//! agent reading a partially-filled record never trips over a missing key.
//! Clause identifiers are the only linkage between records: per-clause
//! outputs carry the `id` of the clause they describe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Top-level disclaimer attached to every analysis report.
pub const REPORT_DISCLAIMER: &str = "Informational only, not legal advice.";

/// A party named in the document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Party {
    pub name: String,

    /// Normalized role, e.g. "landlord", "tenant", "employer"
    pub role: String,
}

impl Party {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
        }
    }
}

/// Key dates. Each is an ISO date, the raw text when ambiguous, or empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct DocumentDates {
    pub start_date: String,
    pub end_date: String,
    pub signature_date: String,
}

/// A distinct contractual unit of the document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Clause {
    /// Unique within one document (e.g. "clause_1")
    pub id: String,

    /// Short title
    pub title: String,

    /// Verbatim excerpt
    pub text: String,

    /// Plain-language obligation sentences
    pub obligations: Vec<String>,

    /// Plain-language penalty sentences
    pub penalties: Vec<String>,
}

impl Clause {
    pub fn new(id: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            text: text.into(),
            ..Default::default()
        }
    }
}

/// The structured form of a legal document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct DocumentInfo {
    /// Free-form classification, e.g. "rental_agreement"
    pub document_type: String,
    pub parties: Vec<Party>,
    pub dates: DocumentDates,
    pub clauses: Vec<Clause>,
    pub summary: String,
}

impl DocumentInfo {
    /// Look up a clause by id.
    pub fn clause(&self, id: &str) -> Option<&Clause> {
        self.clauses.iter().find(|c| c.id == id)
    }

    /// All clause ids in the document.
    pub fn clause_ids(&self) -> HashSet<&str> {
        self.clauses.iter().map(|c| c.id.as_str()).collect()
    }
}

/// One statute considered relevant to a clause.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct RelatedLaw {
    /// e.g. "Indian Contract Act, 1872"
    pub act: String,
    pub section: String,
    pub summary: String,
}

/// Related laws for a single clause.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ClauseLaws {
    pub clause_id: String,
    pub related_laws: Vec<RelatedLaw>,
}

/// Output of the legal mapping agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct LawMapping {
    pub laws: Vec<ClauseLaws>,
}

/// Risk classification of a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk assessment of a single clause.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ClauseRisk {
    pub clause_id: String,
    pub risk_level: RiskLevel,
    pub reason: String,

    /// Short tags such as "excessive penalty"
    pub flags: Vec<String>,
}

/// Output of the risk agent, one entry per clause in clause order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct RiskAssessment {
    pub risks: Vec<ClauseRisk>,
}

/// Plain-language rendering of a clause.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct SimplifiedClause {
    pub clause_id: String,
    pub original: String,
    pub simple_explanation_en: String,
    pub simple_explanation_hi: String,
    pub why_it_matters: String,
}

/// Output of the simplification agent, one entry per clause in clause order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Simplification {
    pub simplified_clauses: Vec<SimplifiedClause>,
}

/// Informational suggestions with the fixed disclaimer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct NextSteps {
    pub next_steps: Vec<String>,
    pub disclaimer: String,
}

/// Answer to a free-form question about a document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ChatAnswer {
    pub answer: String,
    pub language: String,
    pub question: String,

    /// Upstream failure detail when `answer` is the localized apology
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Supported answer, translation, and speech languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
    Te,
}

impl Language {
    /// All supported languages; the first is the default.
    pub const ALL: [Language; 3] = [Language::En, Language::Hi, Language::Te];

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
            Language::Te => "te",
        }
    }

    /// English name of the language, as used in prompts.
    pub fn name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Hi => "Hindi",
            Language::Te => "Telugu",
        }
    }

    /// Resolve a language code, falling back to the default for unknown codes.
    pub fn from_code_or_default(code: &str) -> Self {
        code.parse().unwrap_or_default()
    }
}

impl FromStr for Language {
    type Err = UnsupportedLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|l| l.code() == code)
            .ok_or(UnsupportedLanguage(s.to_string()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A language code outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language code: {0}")]
pub struct UnsupportedLanguage(pub String);

/// Aggregated output of one full analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    #[serde(default)]
    pub document_info: DocumentInfo,

    #[serde(default)]
    pub legal_mapping: LawMapping,

    #[serde(default)]
    pub simplified: Simplification,

    #[serde(default)]
    pub risks: RiskAssessment,

    #[serde(default)]
    pub next_steps: NextSteps,

    #[serde(default = "default_report_disclaimer")]
    pub disclaimer: String,

    #[serde(default = "Utc::now")]
    pub analyzed_at: DateTime<Utc>,
}

fn default_report_disclaimer() -> String {
    REPORT_DISCLAIMER.to_string()
}
