//! Agent identity, errors and the per-clause agent trait.

use async_trait::async_trait;
use nyaya_core::{Clause, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::gateway::GatewayError;

/// Errors inside an agent.
///
/// The analysis agents never return these to their callers; they log the
/// error and substitute the fallback value.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("No JSON object in model output: {0}")]
    Malformed(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl AgentError {
    /// Malformed-output error carrying a bounded excerpt of the raw text.
    pub fn malformed(raw: &str) -> Self {
        AgentError::Malformed(nyaya_core::text::truncate_chars(raw.trim(), 120).to_string())
    }
}

/// Which agent a gateway call is made for.
///
/// Circuit breaker state and log fields are keyed by this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Document,
    Legal,
    Simplify,
    Risk,
    NextSteps,
    Qa,
    Translate,
}

impl AgentKind {
    pub const ALL: [AgentKind; 7] = [
        AgentKind::Document,
        AgentKind::Legal,
        AgentKind::Simplify,
        AgentKind::Risk,
        AgentKind::NextSteps,
        AgentKind::Qa,
        AgentKind::Translate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Document => "document",
            AgentKind::Legal => "legal",
            AgentKind::Simplify => "simplify",
            AgentKind::Risk => "risk",
            AgentKind::NextSteps => "next_steps",
            AgentKind::Qa => "qa",
            AgentKind::Translate => "translate",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An agent that issues one completion per clause.
///
/// # Isolation Contract
/// - One clause's call MUST NOT observe or affect another's
/// - `fallback` MUST be total: it is the result whenever `analyze_clause` fails
/// - Outputs carry the id of the clause they describe
#[async_trait]
pub trait ClauseAgent: Send + Sync {
    type Output: Send;

    fn kind(&self) -> AgentKind;

    async fn analyze_clause(&self, clause: &Clause) -> Result<Self::Output, AgentError>;

    fn fallback(&self, clause: &Clause) -> Self::Output;
}
