//! Per-agent circuit breaker.
//!
//! After repeated gateway failures for one agent, its circuit opens and
//! further calls for that agent fail fast, so the agent returns its
//! fallback without waiting on a struggling backend. Other agents keep
//! their own circuits.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::agents::AgentKind;

/// Circuit breaker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening
    pub failure_threshold: u32,

    /// Time an open circuit waits before letting a probe through
    #[serde(with = "crate::config::humantime_duration")]
    pub recovery_timeout: Duration,

    /// Probe successes needed to close again
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 1,
        }
    }
}

/// State of a circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CircuitState {
    Closed { failures: u32 },
    Open { opened_at: Instant },
    /// `in_flight` counts admitted probes that have not finished yet
    HalfOpen { successes: u32, in_flight: u32 },
}

/// Admission for one call. A half-open probe slot is released on drop.
#[must_use]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    agent: AgentKind,
    probe: bool,
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if self.probe {
            self.breaker.release_probe(self.agent);
        }
    }
}

pub struct CircuitBreaker {
    states: RwLock<HashMap<AgentKind, CircuitState>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Admit a call for `agent`, or `None` when its circuit refuses it.
    ///
    /// An open circuit whose recovery timeout has elapsed moves to
    /// half-open. A half-open circuit admits at most `success_threshold`
    /// probes at a time; the rest are refused until a probe finishes.
    pub fn try_acquire(&self, agent: AgentKind) -> Option<CallPermit<'_>> {
        let mut states = self.states.write();
        let probe = match states.get(&agent).cloned() {
            None | Some(CircuitState::Closed { .. }) => false,
            Some(CircuitState::Open { opened_at }) => {
                if opened_at.elapsed() < self.config.recovery_timeout {
                    return None;
                }
                states.insert(
                    agent,
                    CircuitState::HalfOpen {
                        successes: 0,
                        in_flight: 1,
                    },
                );
                tracing::info!(agent = %agent, "Circuit half-open, admitting a probe call");
                true
            }
            Some(CircuitState::HalfOpen {
                successes,
                in_flight,
            }) => {
                if successes + in_flight >= self.config.success_threshold {
                    return None;
                }
                states.insert(
                    agent,
                    CircuitState::HalfOpen {
                        successes,
                        in_flight: in_flight + 1,
                    },
                );
                true
            }
        };

        Some(CallPermit {
            breaker: self,
            agent,
            probe,
        })
    }

    /// Whether a call for `agent` would be refused right now.
    pub fn is_open(&self, agent: AgentKind) -> bool {
        self.try_acquire(agent).is_none()
    }

    fn release_probe(&self, agent: AgentKind) {
        let mut states = self.states.write();
        if let Some(CircuitState::HalfOpen { in_flight, .. }) = states.get_mut(&agent) {
            *in_flight = in_flight.saturating_sub(1);
        }
    }

    pub fn record_success(&self, agent: AgentKind) {
        let mut states = self.states.write();
        match states.get(&agent).cloned() {
            Some(CircuitState::HalfOpen {
                successes,
                in_flight,
            }) => {
                if successes + 1 >= self.config.success_threshold {
                    states.insert(agent, CircuitState::Closed { failures: 0 });
                    tracing::info!(agent = %agent, "Circuit closed after successful recovery");
                } else {
                    states.insert(
                        agent,
                        CircuitState::HalfOpen {
                            successes: successes + 1,
                            in_flight,
                        },
                    );
                }
            }
            Some(CircuitState::Closed { failures }) if failures > 0 => {
                states.insert(agent, CircuitState::Closed { failures: 0 });
            }
            _ => {}
        }
    }

    pub fn record_failure(&self, agent: AgentKind) {
        let mut states = self.states.write();
        let failures = match states.get(&agent) {
            Some(CircuitState::Closed { failures }) => *failures + 1,
            None => 1,
            Some(CircuitState::HalfOpen { .. }) => {
                states.insert(
                    agent,
                    CircuitState::Open {
                        opened_at: Instant::now(),
                    },
                );
                tracing::warn!(agent = %agent, "Circuit reopened after failed recovery attempt");
                return;
            }
            Some(CircuitState::Open { .. }) => return,
        };

        if failures >= self.config.failure_threshold {
            states.insert(
                agent,
                CircuitState::Open {
                    opened_at: Instant::now(),
                },
            );
            tracing::warn!(agent = %agent, failures, "Circuit opened after repeated failures");
        } else {
            states.insert(agent, CircuitState::Closed { failures });
        }
    }

    pub fn state(&self, agent: AgentKind) -> CircuitState {
        self.states
            .read()
            .get(&agent)
            .cloned()
            .unwrap_or(CircuitState::Closed { failures: 0 })
    }

    /// Close every circuit.
    pub fn reset(&self) {
        self.states.write().clear();
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failure_threshold: u32, recovery_timeout: Duration) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold,
            recovery_timeout,
            success_threshold: 1,
        })
    }

    #[test]
    fn test_circuit_starts_closed() {
        let cb = CircuitBreaker::default();
        assert!(!cb.is_open(AgentKind::Risk));
        assert_eq!(cb.state(AgentKind::Risk), CircuitState::Closed { failures: 0 });
    }

    #[test]
    fn test_circuit_opens_after_failures() {
        let cb = breaker(2, Duration::from_secs(30));

        cb.record_failure(AgentKind::Risk);
        assert!(!cb.is_open(AgentKind::Risk));

        cb.record_failure(AgentKind::Risk);
        assert!(cb.is_open(AgentKind::Risk));
    }

    #[test]
    fn test_success_resets_failures() {
        let cb = breaker(3, Duration::from_secs(30));

        cb.record_failure(AgentKind::Simplify);
        cb.record_failure(AgentKind::Simplify);
        cb.record_success(AgentKind::Simplify);

        cb.record_failure(AgentKind::Simplify);
        cb.record_failure(AgentKind::Simplify);
        assert!(!cb.is_open(AgentKind::Simplify));
    }

    #[test]
    fn test_agents_are_independent() {
        let cb = breaker(2, Duration::from_secs(30));

        cb.record_failure(AgentKind::Legal);
        cb.record_failure(AgentKind::Legal);

        assert!(cb.is_open(AgentKind::Legal));
        assert!(!cb.is_open(AgentKind::Risk));
    }

    #[test]
    fn test_recovery_after_timeout() {
        let cb = breaker(1, Duration::ZERO);

        cb.record_failure(AgentKind::Qa);
        assert!(!cb.is_open(AgentKind::Qa));
        assert_eq!(
            cb.state(AgentKind::Qa),
            CircuitState::HalfOpen {
                successes: 0,
                in_flight: 0
            }
        );

        cb.record_success(AgentKind::Qa);
        assert_eq!(cb.state(AgentKind::Qa), CircuitState::Closed { failures: 0 });
    }

    #[test]
    fn test_failed_probe_reopens() {
        let cb = breaker(1, Duration::ZERO);

        cb.record_failure(AgentKind::Document);
        assert!(!cb.is_open(AgentKind::Document));
        cb.record_failure(AgentKind::Document);
        assert!(matches!(cb.state(AgentKind::Document), CircuitState::Open { .. }));
    }

    #[test]
    fn test_half_open_admits_one_probe_at_a_time() {
        let cb = breaker(1, Duration::ZERO);
        cb.record_failure(AgentKind::Risk);

        let probe = cb.try_acquire(AgentKind::Risk);
        assert!(probe.is_some());
        assert!(cb.try_acquire(AgentKind::Risk).is_none());
        assert!(cb.is_open(AgentKind::Risk));

        drop(probe);
        let probe = cb.try_acquire(AgentKind::Risk);
        assert!(probe.is_some());

        cb.record_success(AgentKind::Risk);
        drop(probe);
        assert_eq!(cb.state(AgentKind::Risk), CircuitState::Closed { failures: 0 });
        let first = cb.try_acquire(AgentKind::Risk);
        let second = cb.try_acquire(AgentKind::Risk);
        assert!(first.is_some() && second.is_some());
    }

    #[test]
    fn test_half_open_probe_limit_follows_success_threshold() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            recovery_timeout: Duration::ZERO,
            success_threshold: 2,
        });
        cb.record_failure(AgentKind::Simplify);

        let first = cb.try_acquire(AgentKind::Simplify);
        let second = cb.try_acquire(AgentKind::Simplify);
        assert!(first.is_some() && second.is_some());
        assert!(cb.try_acquire(AgentKind::Simplify).is_none());

        cb.record_success(AgentKind::Simplify);
        drop(first);
        assert!(cb.try_acquire(AgentKind::Simplify).is_none());

        cb.record_success(AgentKind::Simplify);
        drop(second);
        assert_eq!(cb.state(AgentKind::Simplify), CircuitState::Closed { failures: 0 });
    }

    #[test]
    fn test_config_from_yaml() {
        let config: CircuitBreakerConfig =
            serde_yaml::from_str("failure_threshold: 2\nrecovery_timeout: 1m 30s\n").unwrap();
        assert_eq!(config.failure_threshold, 2);
        assert_eq!(config.recovery_timeout, Duration::from_secs(90));
        assert_eq!(config.success_threshold, 1);
    }
}
