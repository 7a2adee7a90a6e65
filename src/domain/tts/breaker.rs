use super::provider::TtsProvider;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// Time spent open before a trial call is admitted
    pub cooldown: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(60),
        }
    }
}

/// Read-only view of a breaker, used for degradation reporting
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
    last_error: Option<String>,
}

/// Per-provider circuit breaker. All transitions happen under one lock so
/// concurrent callers never lose an update.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
                last_error: None,
            }),
        }
    }

    /// Whether a call may go through. Moves an open breaker whose cooldown
    /// has elapsed to half-open and admits exactly one trial call.
    pub fn can_execute(&self) -> bool {
        self.admit().is_some()
    }

    /// Admit a call and hand back a permit that settles it. A trial permit
    /// dropped without an outcome reopens the circuit.
    pub fn try_acquire(self: &Arc<Self>) -> Option<BreakerPermit> {
        self.admit().map(|trial| BreakerPermit {
            breaker: self.clone(),
            trial,
            settled: false,
        })
    }

    /// `Some(true)` for a half-open trial, `Some(false)` for a normal call
    fn admit(&self) -> Option<bool> {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => Some(false),
            CircuitState::Open => {
                let cooled_down = inner
                    .opened_at
                    .map_or(true, |at| at.elapsed() >= self.config.cooldown);
                if !cooled_down {
                    return None;
                }
                inner.state = CircuitState::HalfOpen;
                inner.trial_in_flight = true;
                tracing::info!(breaker = %self.name, "Circuit half-open, admitting trial call");
                Some(true)
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    None
                } else {
                    inner.trial_in_flight = true;
                    Some(true)
                }
            }
        }
    }

    fn abandon_trial(&self) {
        let mut inner = self.inner.lock();
        if inner.state != CircuitState::HalfOpen || !inner.trial_in_flight {
            return;
        }
        inner.state = CircuitState::Open;
        inner.opened_at = Some(Instant::now());
        inner.trial_in_flight = false;
        tracing::warn!(breaker = %self.name, "Trial call abandoned, circuit reopened");
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.state != CircuitState::Closed {
            tracing::info!(breaker = %self.name, "Circuit closed");
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.trial_in_flight = false;
    }

    pub fn record_failure(&self, error: &str) {
        let mut inner = self.inner.lock();
        inner.consecutive_failures += 1;
        inner.last_error = Some(error.to_string());
        inner.trial_in_flight = false;

        let should_open = match inner.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => inner.consecutive_failures >= self.config.failure_threshold,
            CircuitState::Open => false,
        };

        if should_open {
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
            tracing::warn!(
                breaker = %self.name,
                consecutive_failures = inner.consecutive_failures,
                cooldown_secs = self.config.cooldown.as_secs(),
                error = %error,
                "Circuit opened"
            );
        }
    }

    /// True while open and still cooling down. Never changes state.
    pub fn is_open(&self) -> bool {
        let inner = self.inner.lock();
        inner.state == CircuitState::Open
            && inner
                .opened_at
                .is_some_and(|at| at.elapsed() < self.config.cooldown)
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.inner.lock();
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            last_error: inner.last_error.clone(),
        }
    }
}

/// An admitted call. Settle it with `record_success` or `record_failure`.
#[derive(Debug)]
pub struct BreakerPermit {
    breaker: Arc<CircuitBreaker>,
    trial: bool,
    settled: bool,
}

impl BreakerPermit {
    pub fn record_success(mut self) {
        self.settled = true;
        self.breaker.record_success();
    }

    pub fn record_failure(mut self, error: &str) {
        self.settled = true;
        self.breaker.record_failure(error);
    }
}

impl Drop for BreakerPermit {
    fn drop(&mut self) {
        if self.trial && !self.settled {
            self.breaker.abandon_trial();
        }
    }
}

/// One breaker per provider name, shared by every request in the process
#[derive(Debug)]
pub struct CircuitBreakerRegistry {
    default_config: BreakerConfig,
    overrides: HashMap<String, BreakerConfig>,
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl CircuitBreakerRegistry {
    pub fn new(default_config: BreakerConfig) -> Self {
        Self {
            default_config,
            overrides: HashMap::new(),
            breakers: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_override(mut self, name: impl Into<String>, config: BreakerConfig) -> Self {
        self.overrides.insert(name.into(), config);
        self
    }

    pub fn get(&self, name: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.breakers.read().get(name) {
            return breaker.clone();
        }

        let mut breakers = self.breakers.write();
        breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                let config = self
                    .overrides
                    .get(name)
                    .copied()
                    .unwrap_or(self.default_config);
                Arc::new(CircuitBreaker::new(name, config))
            })
            .clone()
    }

    pub fn for_provider(&self, provider: TtsProvider) -> Arc<CircuitBreaker> {
        self.get(provider.as_str())
    }

    /// Snapshots for every provider, in chain order
    pub fn provider_snapshots(&self) -> Vec<BreakerSnapshot> {
        TtsProvider::CHAIN
            .iter()
            .map(|provider| self.for_provider(*provider).snapshot())
            .collect()
    }

    /// Whether any provider's breaker currently reports OPEN
    pub fn any_open(&self) -> bool {
        self.provider_snapshots()
            .iter()
            .any(|snapshot| snapshot.state == CircuitState::Open)
    }
}
