//! ResilienceSimulator - observes a variant through an outage window.
//!
//! The simulator does not cut the network itself. It opens an observation
//! window (the outage is triggered externally, e.g. by the operator or a
//! test rig) and records when connectivity comes back.
//!
//! Two loops run side by side once monitoring starts:
//!
//! - the monitor probes every `probe_interval` until a probe succeeds or the
//!   outage window closes, and decides the final state
//! - the retry tracker probes every `retry_interval`, at most `max_retries`
//!   times, and logs each attempt with the interval since the previous one
//!
//! Whichever loop sees connectivity first ends both. The tracker also stops
//! as soon as the window closes.

use crate::probe::ConnectivityProbe;
use crate::state::{OutageState, OutageStateMachine, OutageTransition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shellbench_common::{BenchFailure, Result, VariantId};
use shellbench_process::{AppVariant, ProcessControl};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct OutageSettings {
    pub outage_window: Duration,
    pub probe_interval: Duration,
    pub max_retries: u32,
    pub retry_interval: Duration,
    pub presence_timeout: Duration,
    pub absence_timeout: Duration,
}

impl Default for OutageSettings {
    fn default() -> Self {
        Self {
            outage_window: Duration::from_secs(30),
            probe_interval: Duration::from_secs(1),
            max_retries: 10,
            retry_interval: Duration::from_secs(2),
            presence_timeout: Duration::from_secs(10),
            absence_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryAttempt {
    /// 1-based
    pub attempt_index: u32,
    pub observed_at: DateTime<Utc>,
    pub interval_since_last_ms: u64,
    pub connected: bool,
}

/// Outcome of one outage simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutageReport {
    pub variant: VariantId,
    pub probe: String,
    pub state: OutageState,
    pub started_at: DateTime<Utc>,
    pub reconnected_at: Option<DateTime<Utc>>,
    pub reconnection_time_ms: Option<u64>,
    pub outage_window_ms: u64,
    pub retry_attempts: Vec<RetryAttempt>,
    pub history: Vec<OutageTransition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<BenchFailure>,
}

/// State shared by the monitor and the retry tracker.
#[derive(Default)]
struct Observation {
    connected: AtomicBool,
    closed: AtomicBool,
    changed: Notify,
}

impl Observation {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn mark_connected(&self) {
        self.connected.store(true, Ordering::SeqCst);
        self.changed.notify_waiters();
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.changed.notify_waiters();
    }

    /// Sleep for `duration`, waking early if the other loop reports a change.
    async fn pause(&self, duration: Duration) {
        tokio::select! {
            _ = sleep(duration) => {}
            _ = self.changed.notified() => {}
        }
    }
}

pub struct ResilienceSimulator {
    controller: Arc<dyn ProcessControl>,
    probe: Arc<dyn ConnectivityProbe>,
    settings: OutageSettings,
}

impl ResilienceSimulator {
    pub fn new(
        controller: Arc<dyn ProcessControl>,
        probe: Arc<dyn ConnectivityProbe>,
        settings: OutageSettings,
    ) -> Self {
        Self {
            controller,
            probe,
            settings,
        }
    }

    /// Run one simulation against `variant`.
    ///
    /// A variant that cannot be brought up leaves the simulation in `Idle`
    /// with the failure recorded; that is not an error.
    pub async fn run(&self, variant: &AppVariant) -> Result<OutageReport> {
        let started_at = Utc::now();
        let mut machine = OutageStateMachine::new(variant.id.as_str());
        let mut report = OutageReport {
            variant: variant.id.clone(),
            probe: self.probe.describe(),
            state: OutageState::Idle,
            started_at,
            reconnected_at: None,
            reconnection_time_ms: None,
            outage_window_ms: self.settings.outage_window.as_millis() as u64,
            retry_attempts: Vec::new(),
            history: Vec::new(),
            failures: Vec::new(),
        };

        if let Err(failure) = self.ensure_running(variant).await {
            warn!("Skipping outage simulation for {}: {}", variant.id, failure);
            report.failures.push(failure);
            return Ok(report);
        }

        machine.transition_to(
            OutageState::OutageInjected,
            Some("variant confirmed running".to_string()),
        )?;
        info!(
            "Outage window open for {} ({:?}); connectivity is probed via {}",
            variant.id,
            self.settings.outage_window,
            self.probe.describe()
        );
        machine.transition_to(OutageState::Monitoring, None)?;

        let observation = Observation::default();
        let (outcome, attempts) = tokio::join!(
            self.monitor(&observation),
            self.track_retries(&observation)
        );

        match outcome {
            Some((elapsed, at)) => {
                let ms = elapsed.as_millis() as u64;
                machine.transition_to(
                    OutageState::Reconnected,
                    Some(format!("connectivity restored after {}ms", ms)),
                )?;
                info!("Variant {} reconnected after {}ms", variant.id, ms);
                report.reconnected_at = Some(at);
                report.reconnection_time_ms = Some(ms);
            }
            None => {
                machine.transition_to(
                    OutageState::TimedOut,
                    Some("outage window elapsed".to_string()),
                )?;
                warn!(
                    "Variant {} did not reconnect within {:?}",
                    variant.id, self.settings.outage_window
                );
            }
        }

        self.shut_down(variant).await;

        report.state = machine.current_state();
        report.retry_attempts = attempts;
        report.history = machine.into_history();
        Ok(report)
    }

    async fn ensure_running(&self, variant: &AppVariant) -> std::result::Result<(), BenchFailure> {
        if self.controller.is_running(variant) {
            return Ok(());
        }

        self.controller
            .launch(variant)
            .await
            .map_err(|e| BenchFailure::launch(&variant.id, 0, e.to_string()))?;

        let timeout = self.settings.presence_timeout;
        if self.controller.await_presence(variant, timeout).await {
            Ok(())
        } else {
            Err(BenchFailure::detection_timeout(
                &variant.id,
                0,
                "presence",
                timeout.as_millis() as u64,
            ))
        }
    }

    /// Returns the elapsed time and wall-clock instant of the first positive
    /// probe from either loop, or `None` when the window closed first.
    async fn monitor(&self, observation: &Observation) -> Option<(Duration, DateTime<Utc>)> {
        let window = self.settings.outage_window;
        let start = Instant::now();

        let outcome = loop {
            let elapsed = start.elapsed();
            if observation.is_connected() {
                debug!("Retry tracker saw connectivity at {:?}", elapsed);
                break Some((elapsed, Utc::now()));
            }
            if elapsed >= window {
                break None;
            }
            observation
                .pause(self.settings.probe_interval.min(window - elapsed))
                .await;
            if observation.is_connected() {
                continue;
            }

            if self.probe.probe().await {
                observation.mark_connected();
                break Some((start.elapsed(), Utc::now()));
            }
            debug!("Probe negative at {:?} into outage window", start.elapsed());
        };

        observation.close();
        outcome
    }

    async fn track_retries(&self, observation: &Observation) -> Vec<RetryAttempt> {
        let mut attempts = Vec::new();
        let mut last = Instant::now();
        let finished = || observation.is_connected() || observation.is_closed();

        for attempt_index in 1..=self.settings.max_retries {
            if finished() {
                break;
            }
            observation.pause(self.settings.retry_interval).await;
            if finished() {
                break;
            }

            let ok = self.probe.probe().await;
            // The window may have closed while the probe was in flight.
            if observation.is_closed() {
                break;
            }
            let now = Instant::now();
            attempts.push(RetryAttempt {
                attempt_index,
                observed_at: Utc::now(),
                interval_since_last_ms: now.duration_since(last).as_millis() as u64,
                connected: ok,
            });
            last = now;

            debug!(
                "Retry attempt {}/{}: connected={}",
                attempt_index, self.settings.max_retries, ok
            );
            if ok {
                observation.mark_connected();
                break;
            }
        }

        attempts
    }

    async fn shut_down(&self, variant: &AppVariant) {
        if let Err(e) = self.controller.terminate(variant).await {
            warn!("Failed to terminate {} after outage simulation: {}", variant.id, e);
            return;
        }
        self.controller
            .await_absence(variant, self.settings.absence_timeout)
            .await;
    }
}
