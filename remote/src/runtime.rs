use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{
    sync::{watch, Mutex, Notify},
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use gate_common::{
    CommandError, ConnectionState, EngineEvent, GateEngine, NetworkError, RemoteConfig,
    SignalCalibration, ToggleTicket, ViewModel,
};

use crate::client::DeviceClient;

#[derive(Debug, Clone, Serialize)]
pub struct RemoteSnapshot {
    pub state: ConnectionState,
    #[serde(rename = "commandLocked")]
    pub command_locked: bool,
    pub view: ViewModel,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

struct Core {
    engine: GateEngine,
    updated_at: Option<DateTime<Utc>>,
}

impl Core {
    fn snapshot(&self) -> RemoteSnapshot {
        RemoteSnapshot {
            state: self.engine.snapshot(),
            command_locked: self.engine.is_command_locked(),
            view: self.engine.view(),
            updated_at: self.updated_at,
        }
    }
}

struct Shared<C> {
    core: Mutex<Core>,
    client: C,
    snapshots: watch::Sender<RemoteSnapshot>,
    timers_changed: Notify,
    poll_now: Notify,
    cancel: CancellationToken,
    started: Instant,
    poll_interval: Duration,
    refresh_after_toggle: Option<Duration>,
}

pub struct GateRemote<C> {
    shared: Arc<Shared<C>>,
}

impl<C> Clone for GateRemote<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: DeviceClient> GateRemote<C> {
    pub fn spawn(client: C, config: RemoteConfig, calibration: SignalCalibration) -> Self {
        let engine = GateEngine::new(config, calibration);
        let poll_interval = Duration::from_millis(engine.config().poll_interval_ms);
        let refresh_after_toggle = engine
            .config()
            .refresh_after_toggle_ms
            .map(Duration::from_millis);

        let core = Core {
            engine,
            updated_at: None,
        };
        let (snapshots, _) = watch::channel(core.snapshot());

        let shared = Arc::new(Shared {
            core: Mutex::new(core),
            client,
            snapshots,
            timers_changed: Notify::new(),
            poll_now: Notify::new(),
            cancel: CancellationToken::new(),
            started: Instant::now(),
            poll_interval,
            refresh_after_toggle,
        });

        tokio::spawn(poll_loop(Arc::clone(&shared)));
        tokio::spawn(timer_loop(Arc::clone(&shared)));

        Self { shared }
    }

    pub fn subscribe(&self) -> watch::Receiver<RemoteSnapshot> {
        self.shared.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> RemoteSnapshot {
        self.shared.snapshots.borrow().clone()
    }

    pub async fn request_toggle(&self) -> Result<(), CommandError> {
        let shared = &self.shared;

        let ticket = {
            let mut core = shared.core.lock().await;
            match core.engine.request_toggle(shared.now_ms()) {
                Ok(ticket) => {
                    info!("toggle accepted, gate now {}", core.engine.state().gate.as_str());
                    shared.publish(&core);
                    ticket
                }
                Err(err) => {
                    debug!("toggle rejected: {err}");
                    return Err(err);
                }
            }
        };
        shared.timers_changed.notify_one();

        // The lock is held from here; the send runs detached so the cool-down
        // is armed even when the caller goes away.
        let send = tokio::spawn(deliver_toggle(Arc::clone(shared), ticket));
        match send.await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("toggle task failed: {err}");
                Err(CommandError::SendFailed(NetworkError::Transport(err.to_string())))
            }
        }
    }

    pub async fn shutdown(&self) {
        self.shared.cancel.cancel();
        let mut core = self.shared.core.lock().await;
        core.engine.teardown();
        self.shared.publish(&core);
        info!("gate remote stopped");
    }
}

impl<C: DeviceClient> Shared<C> {
    fn now_ms(&self) -> u64 {
        self.started
            .elapsed()
            .as_millis()
            .try_into()
            .unwrap_or(u64::MAX)
    }

    fn publish(&self, core: &Core) {
        self.snapshots.send_replace(core.snapshot());
    }

    async fn poll_once(&self) -> bool {
        let ticket = {
            let mut core = self.core.lock().await;
            if core.engine.is_torn_down() {
                return false;
            }
            match core.engine.begin_poll() {
                Some(ticket) => ticket,
                None => {
                    debug!("poll already in flight, skipping tick");
                    return true;
                }
            }
        };

        let result = tokio::select! {
            _ = self.cancel.cancelled() => return false,
            result = self.client.fetch_status() => result,
        };
        let failure = result.as_ref().err().cloned();
        let succeeded = failure.is_none();

        let mut core = self.core.lock().await;
        let was_connected = core.engine.state().connected;
        if !core.engine.complete_poll(ticket, result, self.now_ms()) {
            return false;
        }
        if succeeded {
            core.updated_at = Some(Utc::now());
        }

        let state = core.engine.state();
        match (&failure, was_connected) {
            (None, false) => info!(
                "gate device reachable, gate {} at {} dBm",
                state.gate.as_str(),
                state.signal.map(|sample| sample.rssi_dbm).unwrap_or_default()
            ),
            (Some(err), true) => warn!("gate device unreachable: {err}"),
            (Some(err), false) => debug!("gate device still unreachable: {err}"),
            (None, true) => debug!("poll ok, gate {}", state.gate.as_str()),
        }

        self.publish(&core);
        drop(core);
        self.timers_changed.notify_one();
        true
    }
}

async fn poll_loop<C: DeviceClient>(shared: Arc<Shared<C>>) {
    let mut interval = tokio::time::interval(shared.poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shared.cancel.cancelled() => break,
            _ = interval.tick() => {}
            _ = shared.poll_now.notified() => {}
        }

        if !shared.poll_once().await {
            break;
        }
    }

    debug!("poll loop stopped");
}

async fn timer_loop<C: DeviceClient>(shared: Arc<Shared<C>>) {
    loop {
        let deadline = shared.core.lock().await.engine.next_deadline_ms();
        let sleep = async {
            match deadline {
                Some(at_ms) => {
                    tokio::time::sleep_until(shared.started + Duration::from_millis(at_ms)).await
                }
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = shared.cancel.cancelled() => break,
            _ = shared.timers_changed.notified() => continue,
            _ = sleep => {}
        }

        let mut core = shared.core.lock().await;
        let events = core.engine.tick(shared.now_ms());
        for event in &events {
            match event {
                EngineEvent::Settled(gate) => {
                    info!("gate assumed {} after settle window", gate.as_str())
                }
                EngineEvent::CommandUnlocked => debug!("command cool-down finished"),
            }
        }
        if !events.is_empty() {
            shared.publish(&core);
        }
    }

    debug!("timer loop stopped");
}

async fn deliver_toggle<C: DeviceClient>(
    shared: Arc<Shared<C>>,
    ticket: ToggleTicket,
) -> Result<(), CommandError> {
    let result = tokio::select! {
        _ = shared.cancel.cancelled() => {
            Err(NetworkError::Transport("remote stopped".to_string()))
        }
        result = shared.client.send_toggle() => result,
    };

    let outcome = {
        let mut core = shared.core.lock().await;
        let outcome = core.engine.complete_toggle(ticket, result, shared.now_ms());
        shared.publish(&core);
        outcome
    };
    shared.timers_changed.notify_one();

    match &outcome {
        Ok(()) => {
            info!("toggle sent");
            if let Some(delay) = shared.refresh_after_toggle {
                schedule_refresh(shared, delay);
            }
        }
        Err(err) => warn!("toggle failed: {err}"),
    }

    outcome
}

fn schedule_refresh<C: DeviceClient>(shared: Arc<Shared<C>>, delay: Duration) {
    tokio::spawn(async move {
        tokio::select! {
            _ = shared.cancel.cancelled() => {}
            _ = tokio::time::sleep(delay) => shared.poll_now.notify_one(),
        }
    });
}
