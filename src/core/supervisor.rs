//! # Supervisor: drives every unit through the lifecycle phases.
//!
//! The [`Supervisor`] owns the ordered unit registry, the event bus and the
//! shutdown machinery. It runs each phase as a fan-out/join-all barrier on the
//! calling task and turns failures, shutdown requests and termination signals
//! into a single controlled stop.
//!
//! ## Lifecycle
//! ```text
//! SupervisorBuilder::build()
//!   └─► initialize() on every unit, in registration order          (construct)
//!
//! run() / run_until(terminate):
//!   run_setup_phase()  ── fan-out ──► unit.setup()  × N ── join-all ──┐
//!        │ Err(PhaseFailed) ─────────────────────────────────────────┼─► shutdown() ─► Err
//!        │ shutdown requested / terminate fired ─────────────────────┼─► shutdown() ─► Ok(Outcome)
//!   run_start_phase()  ── fan-out ──► unit.start()  × N ── join-all ──┤
//!        │                                                           │
//!   Ready ── wait: terminate | ShutdownHandle::requested() ──────────┘
//!
//! shutdown() (exactly once):
//!   Stopping ─► run_stop_phase() ── fan-out ──► unit.stop() × N ── join-all (optional grace)
//!            ─► Stopped ─► publish(Stopped)
//! ```
//!
//! ## Rules
//! - Phases are strictly ordered; inside a phase units run concurrently with no ordering guarantee
//! - A phase returns only after every unit settled it (completed, failed, panicked or timed out)
//! - Setup/start failures are collected in registration order; nothing is rolled back
//! - Stop is best-effort: it reaches every unit, failures are logged and reported, never propagated
//! - `shutdown()` runs the stop phase once; later calls return the first report
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use caboose::{Bootstrapper, LifecycleUnit, Supervisor, SupervisorConfig};
//!
//! struct Cache;
//!
//! #[async_trait::async_trait]
//! impl LifecycleUnit for Cache {
//!     fn name(&self) -> &'static str { "cache" }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let env = Arc::new(Bootstrapper::from_process().resolve()?);
//!     let sup = Supervisor::builder(SupervisorConfig::default(), env)
//!         .register(Arc::new(Cache))
//!         .build()?;
//!
//!     let outcome = sup.run().await?;
//!     println!("stopped: {outcome:?}");
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{OnceCell, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{
    builder::SupervisorBuilder,
    context::{ShutdownHandle, UnitContext},
    runner::{PhaseCall, run_phase, setup_call, start_call, stop_call},
    shutdown::ShutdownSignals,
    tracker::UnitTracker,
};
use crate::{
    core::{Phase, SupervisorConfig, SupervisorState, UnitRef},
    env::Environment,
    error::{RuntimeError, UnitError, UnitFailure},
    events::{Bus, Event, EventKind},
};

/// One registered unit and the context handed to it.
pub(crate) struct Slot {
    pub(crate) unit: UnitRef,
    pub(crate) ctx: UnitContext,
}

/// How a supervised run ended after a clean stop phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A termination signal arrived.
    Signalled,
    /// A unit or an embedder requested shutdown.
    Requested {
        /// The first recorded reason.
        reason: Arc<str>,
    },
}

/// Result of the stop phase.
#[derive(Debug, Clone, Default)]
pub struct StopReport {
    /// Units whose `stop` returned an error, in registration order.
    pub failed: Vec<&'static str>,
    /// Units still stopping when the grace period ran out, in registration order.
    pub stuck: Vec<&'static str>,
    /// The grace period that was exceeded, if any.
    pub grace: Option<Duration>,
}

impl StopReport {
    /// Returns true if every unit stopped without error in time.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.stuck.is_empty()
    }
}

/// Orchestrates the lifecycle of a fixed set of units.
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    tracker: Arc<UnitTracker>,
    slots: Box<[Slot]>,
    requests: ShutdownHandle,
    state: watch::Sender<SupervisorState>,
    stop_once: OnceCell<StopReport>,
    listener_token: CancellationToken,
    listener: Option<JoinHandle<()>>,
}

impl Supervisor {
    /// Returns a builder for a supervisor running in `env`.
    pub fn builder(cfg: SupervisorConfig, env: Arc<Environment>) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg, env)
    }

    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        bus: Bus,
        tracker: Arc<UnitTracker>,
        slots: Box<[Slot]>,
        requests: ShutdownHandle,
        listener_token: CancellationToken,
        listener: JoinHandle<()>,
    ) -> Self {
        let (state, _rx) = watch::channel(SupervisorState::Constructed);
        Self {
            cfg,
            bus,
            tracker,
            slots,
            requests,
            state,
            stop_once: OnceCell::new(),
            listener_token,
            listener: Some(listener),
        }
    }

    /// Names of the registered units, in registration order.
    pub fn units(&self) -> Vec<&'static str> {
        self.slots.iter().map(|s| s.unit.name()).collect()
    }

    /// Runtime configuration.
    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Current supervisor state.
    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    /// Receiver observing every state transition.
    pub fn watch_state(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    /// The lifecycle event bus.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Per-unit state tracker fed from the bus.
    pub fn tracker(&self) -> &Arc<UnitTracker> {
        &self.tracker
    }

    /// Handle for requesting shutdown from outside the units.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.requests.clone()
    }

    /// Runs `setup` on every unit concurrently and waits for all of them.
    ///
    /// Returns [`RuntimeError::PhaseFailed`] naming every failed unit.
    pub async fn run_setup_phase(&self) -> Result<(), RuntimeError> {
        self.run_gated_phase(Phase::Setup, SupervisorState::SettingUp, setup_call)
            .await
    }

    /// Runs `start` on every unit concurrently and waits for all of them.
    ///
    /// Returns [`RuntimeError::PhaseFailed`] naming every failed unit.
    pub async fn run_start_phase(&self) -> Result<(), RuntimeError> {
        self.run_gated_phase(Phase::Start, SupervisorState::Starting, start_call)
            .await
    }

    /// Runs `stop` on every unit concurrently and waits for all of them.
    ///
    /// Safe after a partial setup: every unit is reached regardless of how far
    /// it got. Failures are logged and reported, never propagated. With a
    /// configured stop grace, units still stopping when it runs out are
    /// abandoned and listed in [`StopReport::stuck`].
    pub async fn run_stop_phase(&self) -> StopReport {
        let began = self.phase_starting(Phase::Stop);
        let settled = self.settled_flags();
        let grace = self.cfg.stop_grace();

        let all = self.fan_out(Phase::Stop, stop_call, None, &settled);
        let results = match grace {
            Some(grace) => time::timeout(grace, all).await.ok(),
            None => Some(all.await),
        };

        let mut report = StopReport::default();
        match results {
            Some(results) => {
                for (slot, res) in self.slots.iter().zip(results) {
                    if let Err(err) = res {
                        warn!(
                            unit = slot.unit.name(),
                            error = %err,
                            label = err.as_label(),
                            "unit failed to stop"
                        );
                        report.failed.push(slot.unit.name());
                    }
                }
            }
            None => {
                report.grace = grace;
                report.stuck = self
                    .slots
                    .iter()
                    .zip(&settled)
                    .filter(|(_, done)| !done.load(Ordering::Acquire))
                    .map(|(slot, _)| slot.unit.name())
                    .collect();
                error!(stuck = ?report.stuck, grace = ?grace, "stop grace exceeded");
                self.bus.publish(
                    Event::new(EventKind::GraceExceeded)
                        .with_phase(Phase::Stop)
                        .with_reason(report.stuck.join(", ")),
                );
            }
        }

        if report.is_clean() {
            self.phase_completed(Phase::Stop, began);
        } else {
            let mut names = report.failed.clone();
            names.extend(report.stuck.iter().copied());
            self.phase_failed(Phase::Stop, began, names.join(", "));
        }
        report
    }

    /// Stops every unit, exactly once.
    ///
    /// The first call runs the stop phase and moves the supervisor to
    /// [`SupervisorState::Stopped`]; later calls return the same report
    /// without stopping anything again.
    ///
    /// Returns [`RuntimeError::GraceExceeded`] if units were still stopping
    /// when the grace period ran out.
    pub async fn shutdown(&self) -> Result<StopReport, RuntimeError> {
        let mut first = false;
        let report = self
            .stop_once
            .get_or_init(|| {
                first = true;
                self.stop_all()
            })
            .await;
        if !first {
            debug!("shutdown already performed");
        }

        if report.stuck.is_empty() {
            Ok(report.clone())
        } else {
            Err(RuntimeError::GraceExceeded {
                grace: report.grace.unwrap_or_default(),
                stuck: report.stuck.iter().map(|s| s.to_string()).collect(),
            })
        }
    }

    /// Runs the whole lifecycle until a termination signal or a shutdown request.
    ///
    /// Installs the OS signal listeners. The first signal triggers shutdown;
    /// later signals are logged and ignored.
    pub async fn run(&self) -> Result<Outcome, RuntimeError> {
        let mut signals = ShutdownSignals::install().map_err(RuntimeError::Signal)?;
        let stopped = CancellationToken::new();
        let _stopped_guard = stopped.clone().drop_guard();
        let bus = self.bus.clone();

        let terminate = async move {
            signals.recv().await;
            info!("termination signal received");
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = stopped.cancelled() => break,
                        _ = signals.recv() => {
                            warn!("termination signal ignored: shutdown already in progress");
                            bus.publish(Event::new(EventKind::SignalIgnored));
                        }
                    }
                }
            });
        };
        self.run_until(terminate).await
    }

    /// Runs the whole lifecycle, treating `terminate` as the termination signal.
    ///
    /// - A phase failure stops every unit and returns [`RuntimeError::PhaseFailed`]
    /// - A shutdown request is honoured at the next phase barrier, or immediately when ready
    /// - `terminate` completing abandons the running phase and stops every unit
    pub async fn run_until<F>(&self, terminate: F) -> Result<Outcome, RuntimeError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(terminate);

        let gated: [(Phase, SupervisorState, PhaseCall); 2] = [
            (Phase::Setup, SupervisorState::SettingUp, setup_call),
            (Phase::Start, SupervisorState::Starting, start_call),
        ];
        for (phase, state, call) in gated {
            if let Some(reason) = self.requests.reason() {
                return self.finish(Outcome::Requested { reason }).await;
            }

            let res = tokio::select! {
                res = self.run_gated_phase(phase, state, call) => Some(res),
                _ = &mut terminate => None,
            };

            match res {
                Some(Ok(())) => {}
                Some(Err(err)) => {
                    error!(phase = %phase, error = %err, label = err.as_label(), "phase failed; shutting down");
                    if let Err(stop_err) = self.shutdown().await {
                        warn!(error = %stop_err, "shutdown after phase failure was incomplete");
                    }
                    return Err(err);
                }
                None => {
                    warn!(phase = %phase, "termination signal during phase; abandoning it");
                    return self.finish(Outcome::Signalled).await;
                }
            }
        }

        if let Some(reason) = self.requests.reason() {
            return self.finish(Outcome::Requested { reason }).await;
        }

        self.state.send_replace(SupervisorState::Ready);
        self.bus.publish(Event::new(EventKind::Ready));
        info!(units = self.slots.len(), "supervisor ready");

        let outcome = tokio::select! {
            _ = &mut terminate => Outcome::Signalled,
            _ = self.requests.requested() => Outcome::Requested {
                reason: self.requests.reason().unwrap_or_else(|| Arc::from("shutdown requested")),
            },
        };
        self.finish(outcome).await
    }

    /// Stops the event listener and flushes subscriber queues.
    pub async fn close(mut self) {
        self.listener_token.cancel();
        if let Some(listener) = self.listener.take() {
            let _ = listener.await;
        }
    }

    async fn finish(&self, outcome: Outcome) -> Result<Outcome, RuntimeError> {
        match &outcome {
            Outcome::Signalled => self.requests.request("termination signal"),
            Outcome::Requested { reason } => info!(reason = %reason, "shutdown requested"),
        }
        self.shutdown().await?;
        Ok(outcome)
    }

    async fn stop_all(&self) -> StopReport {
        info!("stopping all units");
        self.state.send_replace(SupervisorState::Stopping);
        let report = self.run_stop_phase().await;
        self.state.send_replace(SupervisorState::Stopped);
        self.bus.publish(Event::new(EventKind::Stopped));
        info!(clean = report.is_clean(), "all units stopped");
        report
    }

    async fn run_gated_phase(
        &self,
        phase: Phase,
        state: SupervisorState,
        call: PhaseCall,
    ) -> Result<(), RuntimeError> {
        self.state.send_replace(state);
        let began = self.phase_starting(phase);
        let settled = self.settled_flags();

        let results = self
            .fan_out(phase, call, self.cfg.phase_timeout(), &settled)
            .await;
        let failures: Vec<UnitFailure> = self
            .slots
            .iter()
            .zip(results)
            .filter_map(|(slot, res)| {
                res.err().map(|error| UnitFailure {
                    unit: slot.unit.name(),
                    error,
                })
            })
            .collect();

        if failures.is_empty() {
            self.phase_completed(phase, began);
            return Ok(());
        }
        for failure in &failures {
            error!(
                unit = failure.unit,
                phase = %phase,
                error = %failure.error,
                label = failure.error.as_label(),
                "unit failed"
            );
        }
        let err = RuntimeError::PhaseFailed { phase, failures };
        self.phase_failed(phase, began, err.as_message());
        Err(err)
    }

    /// Dispatches `phase` to every unit, then joins all of them on the calling task.
    ///
    /// `settled[i]` is set once unit `i` has a result.
    async fn fan_out(
        &self,
        phase: Phase,
        call: PhaseCall,
        timeout: Option<Duration>,
        settled: &[AtomicBool],
    ) -> Vec<Result<(), UnitError>> {
        join_all(self.slots.iter().zip(settled).map(|(slot, done)| async move {
            let res = run_phase(slot.unit.as_ref(), &slot.ctx, phase, call, timeout, &self.bus).await;
            done.store(true, Ordering::Release);
            res
        }))
        .await
    }

    fn settled_flags(&self) -> Vec<AtomicBool> {
        self.slots.iter().map(|_| AtomicBool::new(false)).collect()
    }

    fn phase_starting(&self, phase: Phase) -> Instant {
        info!(phase = %phase, units = self.slots.len(), "phase starting");
        self.bus
            .publish(Event::new(EventKind::PhaseStarting).with_phase(phase));
        Instant::now()
    }

    fn phase_completed(&self, phase: Phase, began: Instant) {
        let elapsed = began.elapsed();
        info!(phase = %phase, elapsed_ms = elapsed.as_millis() as u64, "phase completed");
        self.bus.publish(
            Event::new(EventKind::PhaseCompleted)
                .with_phase(phase)
                .with_elapsed(elapsed),
        );
    }

    fn phase_failed(&self, phase: Phase, began: Instant, reason: String) {
        self.bus.publish(
            Event::new(EventKind::PhaseFailed)
                .with_phase(phase)
                .with_reason(reason)
                .with_elapsed(began.elapsed()),
        );
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.listener_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::broadcast;

    use super::*;
    use crate::core::LifecycleUnit;
    use crate::test_support;

    type Journal = Arc<Mutex<Vec<String>>>;

    /// Scriptable unit recording every phase entry as `name:phase`.
    struct Probe {
        name: &'static str,
        journal: Journal,
        delay: Duration,
        fail_in: Option<Phase>,
        panic_in: Option<Phase>,
        hang_in: Option<Phase>,
        request_in: Option<Phase>,
    }

    impl Probe {
        fn new(name: &'static str, journal: &Journal) -> Self {
            Self {
                name,
                journal: Arc::clone(journal),
                delay: Duration::ZERO,
                fail_in: None,
                panic_in: None,
                hang_in: None,
                request_in: None,
            }
        }

        fn delay(mut self, d: Duration) -> Self {
            self.delay = d;
            self
        }

        fn fail_in(mut self, p: Phase) -> Self {
            self.fail_in = Some(p);
            self
        }

        fn panic_in(mut self, p: Phase) -> Self {
            self.panic_in = Some(p);
            self
        }

        fn hang_in(mut self, p: Phase) -> Self {
            self.hang_in = Some(p);
            self
        }

        fn request_in(mut self, p: Phase) -> Self {
            self.request_in = Some(p);
            self
        }

        async fn act(&self, ctx: &UnitContext, phase: Phase) -> Result<(), UnitError> {
            self.journal
                .lock()
                .expect("journal")
                .push(format!("{}:{}", self.name, phase));
            if self.hang_in == Some(phase) {
                std::future::pending::<()>().await;
            }
            if phase == Phase::Setup && !self.delay.is_zero() {
                time::sleep(self.delay).await;
            }
            if self.panic_in == Some(phase) {
                panic!("{} exploded", self.name);
            }
            if self.request_in == Some(phase) {
                ctx.request_shutdown(format!("{} asked to stop", self.name));
            }
            if self.fail_in == Some(phase) {
                return Err(UnitError::Fatal {
                    reason: format!("{} broke", self.name),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl LifecycleUnit for Probe {
        fn name(&self) -> &'static str {
            self.name
        }

        fn initialize(&self, _ctx: &UnitContext) {
            self.journal
                .lock()
                .expect("journal")
                .push(format!("{}:construct", self.name));
        }

        async fn setup(&self, ctx: &UnitContext) -> Result<(), UnitError> {
            self.act(ctx, Phase::Setup).await
        }

        async fn start(&self, ctx: &UnitContext) -> Result<(), UnitError> {
            self.act(ctx, Phase::Start).await
        }

        async fn stop(&self, ctx: &UnitContext) -> Result<(), UnitError> {
            self.act(ctx, Phase::Stop).await
        }
    }

    fn journal() -> Journal {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn entries(journal: &Journal) -> Vec<String> {
        journal.lock().expect("journal").clone()
    }

    fn build(cfg: SupervisorConfig, units: Vec<Probe>) -> Supervisor {
        units
            .into_iter()
            .fold(Supervisor::builder(cfg, test_support::env()), |b, u| {
                b.register(Arc::new(u))
            })
            .build()
            .expect("build")
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    #[tokio::test]
    async fn registration_order_is_kept_and_initialize_runs_in_it() {
        let j = journal();
        let sup = build(
            SupervisorConfig::default(),
            vec![
                Probe::new("config", &j),
                Probe::new("storage", &j),
                Probe::new("network", &j),
            ],
        );

        assert_eq!(sup.units(), vec!["config", "storage", "network"]);
        assert_eq!(
            entries(&j),
            vec!["config:construct", "storage:construct", "network:construct"]
        );
        assert_eq!(sup.state(), SupervisorState::Constructed);
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let j = journal();
        let res = Supervisor::builder(SupervisorConfig::default(), test_support::env())
            .register(Arc::new(Probe::new("config", &j)))
            .register(Arc::new(Probe::new("config", &j)))
            .build();

        assert!(matches!(res, Err(RuntimeError::DuplicateUnit { name: "config" })));
        assert!(entries(&j).is_empty(), "no unit initialized");
    }

    #[tokio::test(start_paused = true)]
    async fn setup_fans_out_before_joining() {
        let j = journal();
        let sup = build(
            SupervisorConfig::default(),
            vec![
                Probe::new("a", &j).delay(Duration::from_millis(50)),
                Probe::new("b", &j).delay(Duration::from_millis(10)),
            ],
        );
        let mut rx = sup.bus().subscribe();

        let began = Instant::now();
        sup.run_setup_phase().await.expect("setup");
        assert!(began.elapsed() >= Duration::from_millis(50));

        let events = drain(&mut rx);
        let last_dispatch = events
            .iter()
            .filter(|e| e.kind == EventKind::UnitDispatched)
            .map(|e| e.seq)
            .max()
            .expect("dispatched");
        let first_completion = events
            .iter()
            .filter(|e| e.kind == EventKind::UnitCompleted)
            .map(|e| e.seq)
            .min()
            .expect("completed");
        assert!(last_dispatch < first_completion);

        let completed: Vec<_> = events
            .iter()
            .filter(|e| e.kind == EventKind::UnitCompleted)
            .filter_map(|e| e.unit.as_deref().map(str::to_string))
            .collect();
        assert_eq!(completed, vec!["b", "a"]);
        assert!(
            !entries(&j).iter().any(|e| e.ends_with(":start")),
            "start is gated on the whole setup phase"
        );
        let a = events
            .iter()
            .find(|e| e.kind == EventKind::UnitCompleted && e.unit.as_deref() == Some("a"))
            .expect("a completed");
        assert!(a.elapsed_ms.unwrap_or_default() >= 50);
    }

    #[tokio::test]
    async fn setup_failure_stops_every_unit_and_skips_start() {
        let j = journal();
        let sup = build(
            SupervisorConfig::default(),
            vec![
                Probe::new("config", &j),
                Probe::new("storage", &j).fail_in(Phase::Setup),
                Probe::new("network", &j).fail_in(Phase::Setup),
            ],
        );

        let err = sup
            .run_until(std::future::pending())
            .await
            .expect_err("setup fails");
        match err {
            RuntimeError::PhaseFailed { phase, failures } => {
                assert_eq!(phase, Phase::Setup);
                let names: Vec<_> = failures.iter().map(|f| f.unit).collect();
                assert_eq!(names, vec!["storage", "network"]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let log = entries(&j);
        assert!(!log.iter().any(|e| e.ends_with(":start")));
        for unit in ["config", "storage", "network"] {
            assert!(log.contains(&format!("{unit}:stop")), "{unit} was stopped");
        }
        assert_eq!(sup.state(), SupervisorState::Stopped);
    }

    #[tokio::test]
    async fn stop_failure_does_not_block_other_units() {
        let j = journal();
        let sup = build(
            SupervisorConfig::default(),
            vec![
                Probe::new("config", &j).fail_in(Phase::Stop),
                Probe::new("storage", &j).panic_in(Phase::Stop),
                Probe::new("network", &j),
            ],
        );

        let report = sup.run_stop_phase().await;
        assert_eq!(report.failed, vec!["config", "storage"]);
        assert!(report.stuck.is_empty());
        assert!(entries(&j).contains(&"network:stop".to_string()));
    }

    #[tokio::test]
    async fn stop_without_setup_is_harmless() {
        let j = journal();
        let sup = build(SupervisorConfig::default(), vec![Probe::new("config", &j)]);

        let report = sup.shutdown().await.expect("shutdown");
        assert!(report.is_clean());
        assert_eq!(sup.state(), SupervisorState::Stopped);
    }

    #[tokio::test]
    async fn shutdown_runs_the_stop_phase_once() {
        let j = journal();
        let sup = build(SupervisorConfig::default(), vec![Probe::new("config", &j)]);

        sup.shutdown().await.expect("first");
        sup.shutdown().await.expect("second");

        let stops = entries(&j).iter().filter(|e| *e == "config:stop").count();
        assert_eq!(stops, 1);
    }

    #[tokio::test]
    async fn request_during_setup_skips_start() {
        let j = journal();
        let sup = build(
            SupervisorConfig::default(),
            vec![
                Probe::new("config", &j),
                Probe::new("storage", &j).request_in(Phase::Setup),
            ],
        );

        let outcome = sup
            .run_until(std::future::pending())
            .await
            .expect("clean stop");
        assert_eq!(
            outcome,
            Outcome::Requested {
                reason: Arc::from("storage asked to stop")
            }
        );
        let log = entries(&j);
        assert!(!log.iter().any(|e| e.ends_with(":start")));
        assert!(log.contains(&"config:stop".to_string()));
        assert_eq!(sup.state(), SupervisorState::Stopped);
    }

    #[tokio::test]
    async fn terminate_when_ready_stops_every_unit() {
        let j = journal();
        let sup = build(
            SupervisorConfig::default(),
            vec![Probe::new("config", &j), Probe::new("network", &j)],
        );
        let mut states = sup.watch_state();

        let terminate = async move {
            states
                .wait_for(|s| *s == SupervisorState::Ready)
                .await
                .expect("ready");
        };
        let outcome = sup.run_until(terminate).await.expect("clean stop");

        assert_eq!(outcome, Outcome::Signalled);
        assert_eq!(sup.state(), SupervisorState::Stopped);
        let log = entries(&j);
        assert!(log.contains(&"config:stop".to_string()));
        assert!(log.contains(&"network:stop".to_string()));
        assert_eq!(sup.shutdown_handle().reason().as_deref(), Some("termination signal"));
    }

    #[tokio::test]
    async fn request_when_ready_stops_every_unit() {
        let j = journal();
        let sup = build(SupervisorConfig::default(), vec![Probe::new("config", &j)]);
        let handle = sup.shutdown_handle();
        let mut states = sup.watch_state();

        tokio::spawn(async move {
            if states.wait_for(|s| *s == SupervisorState::Ready).await.is_ok() {
                handle.request("maintenance");
            }
        });
        let outcome = sup
            .run_until(std::future::pending())
            .await
            .expect("clean stop");

        assert_eq!(
            outcome,
            Outcome::Requested {
                reason: Arc::from("maintenance")
            }
        );
        assert!(entries(&j).contains(&"config:stop".to_string()));
    }

    #[tokio::test]
    async fn panicking_unit_fails_the_phase() {
        let j = journal();
        let sup = build(
            SupervisorConfig::default(),
            vec![Probe::new("network", &j).panic_in(Phase::Start)],
        );

        sup.run_setup_phase().await.expect("setup");
        let err = sup.run_start_phase().await.expect_err("start fails");
        match err {
            RuntimeError::PhaseFailed { failures, .. } => {
                assert!(matches!(
                    &failures[0].error,
                    UnitError::Panicked { info } if info == "network exploded"
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn phase_timeout_fails_a_hung_unit() {
        let j = journal();
        let cfg = SupervisorConfig {
            phase_timeout: Duration::from_secs(1),
            ..SupervisorConfig::default()
        };
        let sup = build(
            cfg,
            vec![
                Probe::new("config", &j),
                Probe::new("network", &j).hang_in(Phase::Setup),
            ],
        );

        let err = sup.run_setup_phase().await.expect_err("timeout");
        match err {
            RuntimeError::PhaseFailed { failures, .. } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].unit, "network");
                assert!(matches!(failures[0].error, UnitError::TimedOut { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stop_grace_names_stuck_units() {
        let j = journal();
        let cfg = SupervisorConfig {
            stop_grace: Duration::from_millis(200),
            ..SupervisorConfig::default()
        };
        let sup = build(
            cfg,
            vec![
                Probe::new("config", &j),
                Probe::new("network", &j).hang_in(Phase::Stop),
            ],
        );

        let err = sup.shutdown().await.expect_err("grace exceeded");
        match err {
            RuntimeError::GraceExceeded { grace, stuck } => {
                assert_eq!(grace, Duration::from_millis(200));
                assert_eq!(stuck, vec!["network".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(sup.state(), SupervisorState::Stopped);
    }
}
