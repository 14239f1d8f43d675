use std::future::Future;

use chrono::Utc;
use tokio::time::{Duration, Instant, sleep, timeout};
use tracing::Instrument;

use crate::host_context::ContextCollector;
use crate::notify::{AlertPayload, Notifier};

use super::decider::{DecisionPolicy, Evaluation, decide};
use super::probe::{ProbeReport, StatusProbe};
use super::state::{Decision, MonitorState, Observation, ServiceStatus};
use super::store::StateStore;

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub service: String,
    pub check_interval: Duration,
    pub probe_timeout: Duration,
    /// Upper bound for one notification including channel retries.
    pub notify_timeout: Duration,
    pub policy: DecisionPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    NotRequired,
    Sent,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub cycle_id: u64,
    pub observation: Observation,
    pub decision: Decision,
    pub persisted: bool,
    pub notification: NotificationOutcome,
}

/// Runs probe, decide, persist and notify cycles one at a time. The
/// scheduler exclusively owns the in-memory state between cycles.
pub struct Scheduler<P, S, N, C> {
    settings: SchedulerSettings,
    probe: P,
    store: S,
    notifier: N,
    collector: C,
    hostname: String,
    state: MonitorState,
    cycle_id: u64,
}

impl<P, S, N, C> Scheduler<P, S, N, C>
where
    P: StatusProbe,
    S: StateStore,
    N: Notifier,
    C: ContextCollector,
{
    pub fn new(
        settings: SchedulerSettings,
        probe: P,
        store: S,
        notifier: N,
        collector: C,
        hostname: String,
    ) -> Self {
        let state = store.load();
        log::info!(
            "state_loaded service={} last_status={} currently_alerting={} consecutive_failures={}",
            settings.service,
            state.last_status(),
            state.currently_alerting(),
            state.consecutive_failures
        );

        Self {
            settings,
            probe,
            store,
            notifier,
            collector,
            hostname,
            state,
            cycle_id: 0,
        }
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub async fn run_cycle(&mut self) -> CycleReport {
        let (cycle_id, span) = self.next_cycle();
        async {
            let observation = self.observe().await;
            self.complete(cycle_id, observation).await
        }
        .instrument(span)
        .await
    }

    fn next_cycle(&mut self) -> (u64, tracing::Span) {
        self.cycle_id += 1;
        let span = tracing::info_span!(
            "cycle",
            cycle_id = self.cycle_id,
            service = %self.settings.service
        );
        (self.cycle_id, span)
    }

    /// Probe phase. Makes no state changes and may be dropped midway.
    async fn observe(&mut self) -> Observation {
        let report = self.probe_with_timeout().await;
        let observation = Observation::new(report.status, Utc::now(), report.detail);

        if observation.status == ServiceStatus::Unknown {
            log::warn!(
                "probe_fault service={} detail={}",
                self.settings.service,
                observation.detail.as_deref().unwrap_or("none")
            );
        }
        observation
    }

    async fn complete(&mut self, cycle_id: u64, observation: Observation) -> CycleReport {
        let evaluation = decide(&observation, &self.state, &self.settings.policy);
        if evaluation.escalated_unknown {
            log::warn!(
                "unknown_escalated service={} consecutive_unknowns={}",
                self.settings.service,
                evaluation.state.consecutive_unknowns
            );
        }

        let persisted = match self.store.save(&evaluation.state) {
            Ok(()) => true,
            Err(error) => {
                log::error!(
                    "state_save_failed service={} error={}",
                    self.settings.service,
                    error
                );
                false
            }
        };
        self.state = evaluation.state.clone();

        let notification = if evaluation.decision.requires_notification() {
            self.send_alert(&observation, &evaluation, cycle_id).await
        } else {
            NotificationOutcome::NotRequired
        };

        tracing::info!(
            status = %observation.status,
            decision = evaluation.decision.as_str(),
            consecutive_failures = self.state.consecutive_failures,
            currently_alerting = self.state.currently_alerting(),
            persisted,
            "cycle_complete"
        );

        CycleReport {
            cycle_id,
            observation,
            decision: evaluation.decision,
            persisted,
            notification,
        }
    }

    async fn probe_with_timeout(&mut self) -> ProbeReport {
        let limit = self.settings.probe_timeout;
        match timeout(limit, self.probe.probe(&self.settings.service)).await {
            Ok(report) => report,
            Err(_) => ProbeReport::unknown(format!(
                "status probe timed out after {}s",
                limit.as_secs()
            )),
        }
    }

    async fn send_alert(
        &mut self,
        observation: &Observation,
        evaluation: &Evaluation,
        cycle_id: u64,
    ) -> NotificationOutcome {
        let context = self.collector.collect(&self.settings.service).await;
        let Some(payload) = AlertPayload::build(
            &self.settings.service,
            &self.hostname,
            observation,
            evaluation,
            context,
            cycle_id,
        ) else {
            return NotificationOutcome::NotRequired;
        };

        match timeout(self.settings.notify_timeout, self.notifier.notify(&payload)).await {
            Ok(Ok(())) => {
                log::info!(
                    "notification_sent service={} kind={:?} repeat={}",
                    payload.service,
                    payload.kind,
                    payload.repeat
                );
                NotificationOutcome::Sent
            }
            Ok(Err(error)) => {
                log::error!(
                    "notification_failed service={} kind={:?} error={}",
                    payload.service,
                    payload.kind,
                    error
                );
                NotificationOutcome::Failed
            }
            Err(_) => {
                log::error!(
                    "notification_failed service={} kind={:?} error=timed out after {}s",
                    payload.service,
                    payload.kind,
                    self.settings.notify_timeout.as_secs()
                );
                NotificationOutcome::Failed
            }
        }
    }

    pub async fn run_once(&mut self) -> ServiceStatus {
        self.run_cycle().await.observation.status
    }

    /// Runs cycles at the configured interval until `shutdown` resolves.
    /// Shutdown interrupts the probe phase and the sleep between cycles.
    /// Once an observation is in hand, persist and notify run to completion.
    /// Returns the number of completed cycles.
    pub async fn run_until<F>(&mut self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut cycles = 0;

        loop {
            let started = Instant::now();
            let (cycle_id, span) = self.next_cycle();
            let observation = tokio::select! {
                biased;
                _ = &mut shutdown => return self.stopped(cycles),
                observation = self.observe().instrument(span.clone()) => observation,
            };
            self.complete(cycle_id, observation).instrument(span).await;
            cycles += 1;

            let elapsed = started.elapsed();
            if elapsed > self.settings.check_interval {
                log::warn!(
                    "cycle_overran service={} elapsed_secs={} interval_secs={}",
                    self.settings.service,
                    elapsed.as_secs(),
                    self.settings.check_interval.as_secs()
                );
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => return self.stopped(cycles),
                _ = sleep(self.settings.check_interval.saturating_sub(elapsed)) => {}
            }
        }
    }

    fn stopped(&self, cycles: u64) -> u64 {
        log::info!(
            "monitor_stopped service={} cycles={} currently_alerting={}",
            self.settings.service,
            cycles,
            self.state().currently_alerting()
        );
        cycles
    }
}
