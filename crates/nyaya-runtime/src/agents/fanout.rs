//! Bounded-concurrency fan-out over clauses.

use futures::stream::{self, StreamExt};
use std::future::Future;
use nyaya_core::Clause;

use super::ClauseAgent;

/// Run `agent` over every clause, at most `concurrency` calls in flight.
///
/// Results come back in clause order, one per clause. A failed clause
/// yields the agent's fallback and does not affect its siblings.
pub fn fan_out<'a, A>(
    agent: &'a A,
    clauses: &'a [Clause],
    concurrency: usize,
) -> impl Future<Output = Vec<A::Output>> + Send + 'a
where
    A: ClauseAgent + ?Sized,
{
    stream::iter(clauses)
        .map(move |clause: &'a Clause| async move {
            match agent.analyze_clause(clause).await {
                Ok(output) => output,
                Err(error) => {
                    tracing::warn!(
                        agent = %agent.kind(),
                        clause_id = %clause.id,
                        error = %error,
                        "Clause analysis failed, using fallback"
                    );
                    agent.fallback(clause)
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
}
