//! The Nyaya agents.
//!
//! Each agent wraps the shared [`CompletionGateway`](crate::gateway::CompletionGateway)
//! and turns free text into a typed record. The analysis agents are total:
//! any failure becomes the agent's fallback value.
//!
//! | Agent | Calls | On failure |
//! |-------|-------|------------|
//! | [`DocumentAgent`] | one | single "Full document" clause |
//! | [`LegalAgent`] | one for all clauses | empty mapping |
//! | [`RiskAgent`] | one per clause | Low risk for that clause |
//! | [`SimplifyAgent`] | one per clause | "Could not simplify" for that clause |
//! | [`NextStepsAgent`] | one | three default suggestions |
//! | [`QaAgent`] | one | localized apology with error detail |
//! | [`TranslateAgent`] | one | error returned to caller |

mod document;
mod fanout;
mod legal;
mod next_steps;
mod qa;
mod risk;
mod simplify;
mod traits;
mod translate;

pub use document::DocumentAgent;
pub use fanout::fan_out;
pub use legal::LegalAgent;
pub use next_steps::NextStepsAgent;
pub use qa::{QaAgent, QA_TEMPERATURE};
pub use risk::RiskAgent;
pub use simplify::SimplifyAgent;
pub use traits::{AgentError, AgentKind, ClauseAgent};
pub use translate::{TranslateAgent, TRANSLATE_TEMPERATURE};
