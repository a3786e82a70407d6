//! Telemetry engine runtime
//!
//! Owns the mode controller and drives it:
//! - a 50 ms synthesis loop while a synthesizing mode is active
//! - a scoped hardware session while a hardware mode is active
//! - atomic publication of every new snapshot through a watch channel
//!
//! Each mode run gets a generation number. Tasks belonging to an older
//! generation never touch the snapshot, even if they wake up after the mode
//! has changed.

use crate::controller::ModeController;
use cst_adapters::{FlightPhase, TICK_INTERVAL};
use cst_core::config::SimulationConfig;
use cst_core::error::EngineError;
use cst_core::ingress::{HardwareLink, IngressEvent, IngressSubscription};
use cst_core::mode::{ModeOptions, OperatingMode};
use cst_core::model::{BlockUpdate, SensorSnapshot};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

/// Handle to the engine; cheap to clone
#[derive(Clone)]
pub struct TelemetryEngine {
    shared: Arc<Shared>,
}

struct Shared {
    link: Arc<dyn HardwareLink>,
    inner: Mutex<EngineInner>,
    snapshot: watch::Sender<Arc<SensorSnapshot>>,
    mode: watch::Sender<OperatingMode>,
    connected: watch::Sender<bool>,
    ticks: AtomicU64,
}

struct EngineInner {
    controller: ModeController,
    rng: StdRng,
    generation: u64,
    session: Option<ModeSession>,
}

/// Resources of the running mode. Dropping it cancels the synthesis loop and
/// releases the hardware session.
struct ModeSession {
    _cancel: DropGuard,
}

impl TelemetryEngine {
    pub fn new(config: SimulationConfig, link: Arc<dyn HardwareLink>) -> Self {
        Self::with_rng(config, link, StdRng::from_entropy())
    }

    /// Engine with reproducible noise
    pub fn with_seed(config: SimulationConfig, link: Arc<dyn HardwareLink>, seed: u64) -> Self {
        Self::with_rng(config, link, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: SimulationConfig, link: Arc<dyn HardwareLink>, rng: StdRng) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(SensorSnapshot::at_rest()));
        let (mode, _) = watch::channel(OperatingMode::Idle);
        let (connected, _) = watch::channel(false);

        Self {
            shared: Arc::new(Shared {
                link,
                inner: Mutex::new(EngineInner {
                    controller: ModeController::new(config),
                    rng,
                    generation: 0,
                    session: None,
                }),
                snapshot,
                mode,
                connected,
                ticks: AtomicU64::new(0),
            }),
        }
    }

    /// Latest published snapshot
    pub fn current_snapshot(&self) -> Arc<SensorSnapshot> {
        self.shared.snapshot.borrow().clone()
    }

    /// Receiver that is notified on every publish
    pub fn subscribe(&self) -> watch::Receiver<Arc<SensorSnapshot>> {
        self.shared.snapshot.subscribe()
    }

    pub fn active_mode(&self) -> OperatingMode {
        *self.shared.mode.borrow()
    }

    pub fn subscribe_mode(&self) -> watch::Receiver<OperatingMode> {
        self.shared.mode.subscribe()
    }

    /// Whether the hardware relay last reported itself connected
    pub fn connection_status(&self) -> bool {
        *self.shared.connected.borrow()
    }

    /// Synthesis ticks applied since the engine was created
    pub fn tick_count(&self) -> u64 {
        self.shared.ticks.load(Ordering::Relaxed)
    }

    pub fn link_name(&self) -> &str {
        self.shared.link.name()
    }

    pub async fn flight_phase(&self) -> Option<FlightPhase> {
        self.shared.inner.lock().await.controller.flight_phase()
    }

    /// Switch to `mode`. Starting `Idle` is the same as [`stop`](Self::stop).
    pub async fn start_mode(&self, mode: OperatingMode, options: ModeOptions) {
        let mut inner = self.shared.inner.lock().await;

        if mode == OperatingMode::Idle || inner.controller.mode() != OperatingMode::Idle {
            self.shared.stop_locked(&mut inner);
        }
        if mode == OperatingMode::Idle {
            return;
        }

        inner.generation += 1;
        let generation = inner.generation;
        inner.controller.enter(mode, options);

        let cancel = CancellationToken::new();
        let weak = Arc::downgrade(&self.shared);

        if mode.synthesizes() {
            tokio::spawn(run_ticks(weak.clone(), generation, cancel.clone()));
        }

        if let Some(scope) = mode.ingress_scope() {
            match self.shared.link.open(scope) {
                Ok(subscription) => {
                    debug!("Opened {:?} session via {}", scope, self.shared.link.name());
                    tokio::spawn(run_ingress(weak, generation, cancel.clone(), subscription));
                }
                Err(e) => {
                    // No fallback: the mode stays, the flag says why nothing arrives
                    warn!(
                        "Hardware session via {} unavailable: {}",
                        self.shared.link.name(),
                        e
                    );
                }
            }
        }

        inner.session = Some(ModeSession {
            _cancel: cancel.drop_guard(),
        });
        self.shared.mode.send_replace(mode);
        info!("Entered {} mode", mode);
    }

    /// Return to idle. Safe to call repeatedly.
    pub async fn stop(&self) {
        let mut inner = self.shared.inner.lock().await;
        self.shared.stop_locked(&mut inner);
    }

    /// Command the running flight profile to descend
    pub async fn begin_descent(&self) -> Result<(), EngineError> {
        let mut inner = self.shared.inner.lock().await;
        inner.controller.begin_descent()?;
        info!("Descent commanded");
        Ok(())
    }
}

impl Shared {
    /// Merge `updates` into the current snapshot and publish the result
    fn publish(&self, updates: Vec<BlockUpdate>) {
        let next = self.snapshot.borrow().with_updates(updates);
        self.snapshot.send_replace(Arc::new(next));
    }

    fn stop_locked(&self, inner: &mut EngineInner) {
        let previous = inner.controller.mode();

        inner.generation += 1;
        inner.session = None;

        let current = self.snapshot.borrow().clone();
        let updates = inner.controller.stop(&current);
        self.publish(updates);

        self.connected.send_replace(false);
        self.mode.send_replace(OperatingMode::Idle);

        if previous != OperatingMode::Idle {
            info!("Stopped {} mode", previous);
        }
    }

    fn apply_event(&self, inner: &mut EngineInner, event: IngressEvent) {
        if let IngressEvent::Status { connected } = event {
            let was = self.connected.send_replace(connected);
            if was != connected {
                if connected {
                    info!("Hardware connected");
                } else {
                    warn!("Hardware disconnected");
                }
            }
            return;
        }

        let updates = inner.controller.on_frame(&event);
        if !updates.is_empty() {
            self.publish(updates);
        }
    }
}

async fn run_ticks(shared: Weak<Shared>, generation: u64, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(TICK_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    interval.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        let Some(shared) = shared.upgrade() else {
            break;
        };
        let mut inner = shared.inner.lock().await;
        if inner.generation != generation {
            break;
        }

        let EngineInner {
            controller, rng, ..
        } = &mut *inner;
        let updates = controller.tick(rng);
        shared.publish(updates);
        shared.ticks.fetch_add(1, Ordering::Relaxed);
    }

    debug!("Synthesis loop for generation {} finished", generation);
}

async fn run_ingress(
    shared: Weak<Shared>,
    generation: u64,
    cancel: CancellationToken,
    mut subscription: IngressSubscription,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = subscription.recv() => event,
        };

        let Some(shared) = shared.upgrade() else {
            break;
        };
        let mut inner = shared.inner.lock().await;
        if inner.generation != generation {
            break;
        }

        match event {
            Some(event) => shared.apply_event(&mut inner, event),
            None => {
                warn!("Hardware link {} closed the session", shared.link.name());
                shared.connected.send_replace(false);
                break;
            }
        }
    }

    debug!("Ingress for generation {} finished", generation);
}
