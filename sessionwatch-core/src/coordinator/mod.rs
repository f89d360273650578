//! Monitoring coordinator: the single entry point of the engine
//!
//! All mutable state lives in one `Mutex`-guarded [`CoordinatorState`]
//! (session map, global monitor, performance tracker, latest projections),
//! so producers and both periodic cycles serialize through a single writer
//! and snapshots are always taken under one lock acquisition. Events are
//! published over broadcast after the lock is released.

mod aggregate;
mod anomaly;
mod health;

pub use aggregate::{ActiveOperationStatus, AggregatedMetrics, RealtimeStatus, SessionStatus};
pub use anomaly::{Anomaly, AnomalyDetector, AnomalyKind, SubstringAnomalyDetector};
pub use health::{overall_health_score, HealthStatus};

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::command::CommandClassifier;
use crate::events::{Alert, MonitorEvent, EVENT_CHANNEL_CAPACITY};
use crate::export::MetricsExport;
use crate::global::GlobalOperationMonitor;
use crate::history::BoundedHistory;
use crate::metrics::Counter;
use crate::operation::{Operation, OperationKind};
use crate::perf::{PerformanceReport, PerformanceTracker, SpanStatus};
use crate::session::{SessionMonitor, SessionSummary};
use crate::settings::MonitorSettings;

use aggregate::{top_commands, TOP_COMMAND_COUNT};
use health::{health_flags, recommendations_for};

/// Recent-completion window handed to the anomaly detector
const ANOMALY_WINDOW: usize = 10;

/// Alerts retained for the realtime projection
const ALERT_HISTORY: usize = 10;

/// Handle to the spawned cycle task
struct CycleTimers {
    stop_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

/// Everything the coordinator mutates, behind one lock
struct CoordinatorState {
    sessions: HashMap<String, SessionMonitor>,
    op_sessions: HashMap<Uuid, String>,
    global: GlobalOperationMonitor,
    perf: PerformanceTracker,
    archived: BoundedHistory<SessionSummary>,
    recent_alerts: BoundedHistory<Alert>,
    commands_issued: Counter,
    latest_metrics: Option<AggregatedMetrics>,
    latest_health: Option<HealthStatus>,
    realtime: RealtimeStatus,
    started_at: Instant,
    detector: Arc<dyn AnomalyDetector>,
    classifier: Arc<dyn CommandClassifier>,
    timers: Option<CycleTimers>,
}

impl CoordinatorState {
    fn rebuild_realtime(&mut self) {
        let elapsed = self.started_at.elapsed();
        let stats = self.global.stats();
        let throughput = if elapsed >= Duration::from_secs(60) {
            Some(stats.completed_operations as f64 / (elapsed.as_secs_f64() / 60.0))
        } else {
            None
        };
        let active_operations = self
            .global
            .active_operations()
            .into_iter()
            .map(|op| ActiveOperationStatus {
                id: op.id,
                kind: op.kind,
                host: op.host.clone(),
                port: op.port,
                session_id: self.op_sessions.get(&op.id).cloned(),
                elapsed_secs: op.elapsed().as_secs_f64(),
            })
            .collect();
        let sessions = self
            .sessions
            .iter()
            .map(|(id, m)| {
                (
                    id.clone(),
                    SessionStatus {
                        connected: m.is_active(),
                        idle: m.is_idle(),
                    },
                )
            })
            .collect();
        self.realtime = RealtimeStatus {
            active_operations,
            sessions,
            operations_completed: stats.completed_operations,
            operations_failed: stats.failed_operations,
            throughput_per_minute: throughput,
            active_alerts: self.recent_alerts.snapshot(),
            updated_at: Utc::now(),
        };
    }
}

/// Coordinates session monitors, global telemetry, performance tracking,
/// and the periodic aggregation and health cycles.
///
/// Cheap to clone; clones share state and the event channel. Constructed
/// explicitly and passed where needed.
#[derive(Clone)]
pub struct MonitoringCoordinator {
    inner: Arc<Mutex<CoordinatorState>>,
    events: broadcast::Sender<MonitorEvent>,
    settings: MonitorSettings,
}

impl MonitoringCoordinator {
    /// Creates a coordinator with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(MonitorSettings::default())
    }

    /// Creates a coordinator with explicit settings
    #[must_use]
    pub fn with_settings(settings: MonitorSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let state = CoordinatorState {
            sessions: HashMap::new(),
            op_sessions: HashMap::new(),
            global: GlobalOperationMonitor::with_settings(&settings),
            perf: PerformanceTracker::with_settings(&settings),
            archived: BoundedHistory::new(settings.archived_sessions),
            recent_alerts: BoundedHistory::new(ALERT_HISTORY),
            commands_issued: Counter::new(),
            latest_metrics: None,
            latest_health: None,
            realtime: RealtimeStatus::default(),
            started_at: Instant::now(),
            detector: Arc::new(SubstringAnomalyDetector::default()),
            classifier: Arc::new(crate::command::ShellCommandClassifier::new()),
            timers: None,
        };
        Self {
            inner: Arc::new(Mutex::new(state)),
            events,
            settings,
        }
    }

    /// Replaces the anomaly detection strategy
    #[must_use]
    pub fn with_anomaly_detector(self, detector: Arc<dyn AnomalyDetector>) -> Self {
        self.lock().detector = detector;
        self
    }

    /// Replaces the command classification strategy for new sessions
    #[must_use]
    pub fn with_classifier(self, classifier: Arc<dyn CommandClassifier>) -> Self {
        self.lock().classifier = classifier;
        self
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.inner.lock().unwrap()
    }

    fn publish(&self, event: MonitorEvent) {
        // Send fails only when no receiver is subscribed
        let _ = self.events.send(event);
    }

    /// Subscribes to coordinator events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    /// Settings this coordinator was built with
    #[must_use]
    pub const fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    // --- Session lifecycle ---

    /// Creates a monitor for a new session. An existing monitor under the
    /// same id is replaced.
    pub fn create_session_monitor(&self, session_id: &str, host: &str, port: u16) {
        let mut state = self.lock();
        let classifier = Arc::clone(&state.classifier);
        let monitor =
            SessionMonitor::with_settings(session_id, host, port, &self.settings, classifier);
        if state.sessions.insert(session_id.to_string(), monitor).is_some() {
            tracing::warn!(session = session_id, "Replacing existing session monitor");
        }
        state.rebuild_realtime();
        tracing::info!(session = session_id, host, port, "Session monitor created");
    }

    /// Removes a session monitor, archiving its terminal summary.
    ///
    /// The monitor is refreshed and stopped first so the archived summary
    /// reflects final uptime and idle state. Unknown ids return `None`.
    pub fn remove_session_monitor(&self, session_id: &str) -> Option<SessionSummary> {
        let summary = {
            let mut state = self.lock();
            let Some(mut monitor) = state.sessions.remove(session_id) else {
                tracing::debug!(session = session_id, "Ignoring removal of unknown session");
                return None;
            };
            monitor.refresh(Utc::now());
            monitor.stop();
            let summary = monitor.summary();
            state.archived.append(summary.clone());
            state.op_sessions.retain(|_, sid| sid != session_id);
            state.rebuild_realtime();
            summary
        };
        self.publish(MonitorEvent::SessionArchived(summary.clone()));
        tracing::info!(session = session_id, summary = %summary, "Session monitor archived");
        Some(summary)
    }

    // --- Operation fan-out ---

    /// Starts tracking an operation, fanning out to the global monitor and
    /// the owning session monitor when one is named. Returns the new id.
    pub fn start_operation(
        &self,
        kind: OperationKind,
        host: &str,
        port: u16,
        session_id: Option<&str>,
        metadata: BTreeMap<String, String>,
    ) -> Uuid {
        let mut state = self.lock();
        let op = Operation::new(kind, host, port).with_metadata(metadata.clone());
        let id = op.id;
        state.global.begin_operation(op);
        if let Some(sid) = session_id {
            if let Some(monitor) = state.sessions.get_mut(sid) {
                monitor.track_operation(id, kind, metadata);
                state.op_sessions.insert(id, sid.to_string());
            } else {
                tracing::debug!(session = sid, "Operation started for unknown session");
            }
        }
        state.rebuild_realtime();
        id
    }

    /// Completes a tracked operation, measuring its duration since start.
    ///
    /// Unknown ids are a no-op.
    pub fn complete_operation(
        &self,
        id: Uuid,
        success: bool,
        error: Option<&str>,
        bytes: Option<u64>,
    ) {
        let mut state = self.lock();
        let done = state.global.complete_operation(id, success, error, bytes);
        let duration = done.map(|d| Duration::from_secs_f64(d.duration_secs));
        Self::route_completion(&mut state, id, success, duration, bytes);
    }

    /// Completes a tracked operation with an explicit duration
    pub fn complete_operation_with_duration(
        &self,
        id: Uuid,
        success: bool,
        duration: Duration,
        error: Option<&str>,
        bytes: Option<u64>,
    ) {
        let mut state = self.lock();
        let done = state
            .global
            .complete_operation_with_duration(id, success, duration, error, bytes);
        Self::route_completion(&mut state, id, success, done.map(|_| duration), bytes);
    }

    fn route_completion(
        state: &mut CoordinatorState,
        id: Uuid,
        success: bool,
        duration: Option<Duration>,
        bytes: Option<u64>,
    ) {
        if let (Some(duration), Some(sid)) = (duration, state.op_sessions.remove(&id)) {
            if let Some(monitor) = state.sessions.get_mut(&sid) {
                // Failed completions already count toward the session's error
                // totals; error text is retained by the global monitor.
                monitor.complete_operation_with_duration(id, success, duration);
                if let Some(n) = bytes {
                    monitor.track_bytes_transferred(n);
                }
            }
        }
        state.rebuild_realtime();
    }

    /// Records a raw command line, routing it to the owning session
    /// monitor. Commands without a known session are counted globally and
    /// otherwise skipped.
    pub fn command_issued(&self, raw: &str, session_id: Option<&str>) {
        let mut state = self.lock();
        state.commands_issued.incr();
        let Some(sid) = session_id else {
            tracing::debug!("Command issued without a session; skipping session routing");
            return;
        };
        if let Some(monitor) = state.sessions.get_mut(sid) {
            monitor.track_command(raw);
        } else {
            tracing::debug!(session = sid, "Command issued for unknown session");
        }
    }

    // --- Performance delegation ---

    /// Starts a performance span
    pub fn start_span(&self, name: &str, parent: Option<Uuid>) -> Uuid {
        self.lock().perf.start_span(name, parent)
    }

    /// Tags an active span
    pub fn span_tag(&self, id: Uuid, key: &str, value: &str) {
        self.lock().perf.span_tag(id, key, value);
    }

    /// Logs on an active span
    pub fn span_log(&self, id: Uuid, message: &str) {
        self.lock().perf.span_log(id, message);
    }

    /// Finishes a span; unknown ids warn and do nothing
    pub fn complete_span(&self, id: Uuid, status: SpanStatus) {
        self.lock().perf.complete_span(id, status);
    }

    /// Finishes a span with an explicit duration in seconds
    pub fn complete_span_with_duration(&self, id: Uuid, status: SpanStatus, duration_secs: f64) {
        self.lock()
            .perf
            .complete_span_with_duration(id, status, duration_secs);
    }

    /// Measures a fallible closure inside a span, propagating its error.
    ///
    /// The engine lock is held only to open and close the span; the
    /// closure runs unlocked, so it may call back into the coordinator
    /// and never stalls producers or the periodic cycles.
    pub fn measure<T, E>(&self, name: &str, f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        let id = self.lock().perf.start_span(name, None);
        let started = Instant::now();
        let result = f();
        let duration = started.elapsed();
        self.lock()
            .perf
            .finish_measurement(id, name, duration, result.is_ok());
        result
    }

    // --- Cycles ---

    /// Recomputes aggregated metrics across live sessions and publishes
    /// `MetricsUpdated`. Runs every aggregation interval, and may be called
    /// directly for deterministic scheduling.
    pub fn run_aggregation_cycle(&self) {
        let metrics = {
            let mut state = self.lock();
            let now = Utc::now();
            for monitor in state.sessions.values_mut() {
                monitor.refresh(now);
            }

            let sessions = &state.sessions;
            let metrics = AggregatedMetrics {
                total_sessions: sessions.len(),
                active_sessions: sessions.values().filter(|m| m.is_active()).count(),
                idle_sessions: sessions.values().filter(|m| m.is_idle()).count(),
                total_commands: sessions.values().map(SessionMonitor::total_commands).sum(),
                total_errors: sessions.values().map(SessionMonitor::total_errors).sum(),
                total_bytes_transferred: sessions
                    .values()
                    .map(SessionMonitor::bytes_transferred)
                    .sum(),
                active_operations: sessions
                    .values()
                    .map(SessionMonitor::active_operation_count)
                    .sum(),
                top_commands: top_commands(
                    sessions.values().map(SessionMonitor::command_frequency),
                    TOP_COMMAND_COUNT,
                ),
                recent_errors: state.global.recent_errors(),
                global: state.global.stats(),
                aggregated_at: now,
            };
            state.latest_metrics = Some(metrics.clone());
            metrics
        };
        tracing::debug!(
            sessions = metrics.total_sessions,
            active_operations = metrics.active_operations,
            "Aggregation cycle complete"
        );
        self.publish(MonitorEvent::MetricsUpdated(metrics));
    }

    /// Scores overall health, runs anomaly detection, and publishes
    /// `HealthUpdated` plus one `AlertRaised` per anomaly. Runs every
    /// health-check interval, and may be called directly.
    pub fn run_health_check_cycle(&self) {
        let (status, alerts) = {
            let mut state = self.lock();
            let stats = state.global.stats();
            let overall_health = overall_health_score(
                stats.error_rate,
                stats.command_error_rate,
                stats.average_connect_time_secs,
                stats.average_command_time_secs,
            );
            let elapsed = state.started_at.elapsed();
            let throughput = if elapsed >= Duration::from_secs(60) {
                Some(stats.completed_operations as f64 / (elapsed.as_secs_f64() / 60.0))
            } else {
                None
            };
            let (has_high_error_rate, has_high_latency, has_low_throughput) =
                health_flags(stats.error_rate, stats.average_command_time_secs, throughput);
            let session_health: BTreeMap<String, bool> = state
                .sessions
                .iter()
                .map(|(id, m)| (id.clone(), m.is_healthy()))
                .collect();

            let status = HealthStatus {
                overall_health,
                has_high_error_rate,
                has_high_latency,
                has_low_throughput,
                session_health,
                recommendations: recommendations_for(
                    has_high_error_rate,
                    has_high_latency,
                    has_low_throughput,
                ),
                checked_at: Utc::now(),
            };
            state.latest_health = Some(status.clone());

            let recent = state.global.recent_completed(ANOMALY_WINDOW);
            let alerts: Vec<Alert> = state
                .detector
                .detect(&recent)
                .into_iter()
                .map(|anomaly| {
                    tracing::warn!(kind = ?anomaly.kind, message = %anomaly.message, "Anomaly detected");
                    Alert::new(anomaly.kind.severity(), anomaly.message)
                })
                .collect();
            for alert in &alerts {
                state.recent_alerts.append(alert.clone());
            }
            state.rebuild_realtime();
            (status, alerts)
        };

        tracing::debug!(
            overall_health = status.overall_health,
            alerts = alerts.len(),
            "Health check cycle complete"
        );
        self.publish(MonitorEvent::HealthUpdated(status));
        for alert in alerts {
            self.publish(MonitorEvent::AlertRaised(alert));
        }
    }

    // --- Timer plumbing ---

    /// Spawns the periodic aggregation and health-check tasks. Idempotent;
    /// a second call while running does nothing.
    pub fn start(&self) {
        let mut state = self.lock();
        if state.timers.is_some() {
            return;
        }
        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
        let coordinator = self.clone();
        let aggregation_every = self.settings.effective_aggregation_interval();
        let health_every = self.settings.effective_health_check_interval();
        let handle = tokio::spawn(async move {
            let mut aggregation = tokio::time::interval(aggregation_every);
            let mut health = tokio::time::interval(health_every);
            loop {
                tokio::select! {
                    _ = aggregation.tick() => coordinator.run_aggregation_cycle(),
                    _ = health.tick() => coordinator.run_health_check_cycle(),
                    _ = stop_rx.recv() => break,
                }
            }
            tracing::debug!("Monitoring cycles stopped");
        });
        state.timers = Some(CycleTimers { stop_tx, handle });
        tracing::info!(
            aggregation_secs = aggregation_every.as_secs(),
            health_secs = health_every.as_secs(),
            "Monitoring cycles started"
        );
    }

    /// Stops the periodic tasks and waits for the cycle task to exit.
    /// A no-op when not running.
    pub async fn shutdown(&self) {
        let timers = self.lock().timers.take();
        if let Some(timers) = timers {
            let _ = timers.stop_tx.send(()).await;
            let _ = timers.handle.await;
        }
    }

    // --- Snapshots ---

    /// Latest aggregated metrics, if a cycle has run
    #[must_use]
    pub fn aggregated_metrics(&self) -> Option<AggregatedMetrics> {
        self.lock().latest_metrics.clone()
    }

    /// Latest health status, if a cycle has run
    #[must_use]
    pub fn health_status(&self) -> Option<HealthStatus> {
        self.lock().latest_health.clone()
    }

    /// Current realtime status
    #[must_use]
    pub fn realtime_status(&self) -> RealtimeStatus {
        self.lock().realtime.clone()
    }

    /// Snapshot of one live session, or `None` when unknown
    #[must_use]
    pub fn session_summary(&self, session_id: &str) -> Option<SessionSummary> {
        self.lock().sessions.get(session_id).map(SessionMonitor::summary)
    }

    /// Snapshots of all live sessions, keyed by session id
    #[must_use]
    pub fn session_summaries(&self) -> BTreeMap<String, SessionSummary> {
        self.lock()
            .sessions
            .iter()
            .map(|(id, m)| (id.clone(), m.summary()))
            .collect()
    }

    /// Archived summaries of removed sessions, oldest-first
    #[must_use]
    pub fn archived_sessions(&self) -> Vec<SessionSummary> {
        self.lock().archived.snapshot()
    }

    /// Current performance report
    #[must_use]
    pub fn performance_report(&self) -> PerformanceReport {
        self.lock().perf.report()
    }

    /// Raw command lines recorded via [`Self::command_issued`]
    #[must_use]
    pub fn commands_issued(&self) -> u64 {
        self.lock().commands_issued.get()
    }

    /// Builds a complete export document under a single lock acquisition,
    /// so every section reflects the same instant.
    #[must_use]
    pub fn export_snapshot(&self) -> MetricsExport {
        let state = self.lock();
        MetricsExport::new(
            state.latest_metrics.clone(),
            state.latest_health.clone(),
            state.realtime.clone(),
            state
                .sessions
                .iter()
                .map(|(id, m)| (id.clone(), m.summary()))
                .collect(),
            state.archived.snapshot(),
            state.perf.report(),
        )
    }
}

impl Default for MonitoringCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MonitoringCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("MonitoringCoordinator")
            .field("sessions", &state.sessions.len())
            .field("archived", &state.archived.len())
            .field("running", &state.timers.is_some())
            .finish_non_exhaustive()
    }
}
