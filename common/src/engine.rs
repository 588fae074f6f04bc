use crate::{
    config::{RemoteConfig, SignalCalibration},
    error::{CommandError, NetworkError},
    presentation,
    types::{ConnectionState, DeviceStatus, GateState, SignalSample, ViewModel},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Idle,
    Polling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    Settled(GateState),
    CommandUnlocked,
}

#[derive(Debug)]
pub struct PollTicket {
    generation: u64,
}

#[derive(Debug)]
pub struct ToggleTicket {
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Deadline {
    at_ms: u64,
}

impl Deadline {
    fn after(now_ms: u64, duration_ms: u64) -> Self {
        Self {
            at_ms: now_ms.saturating_add(duration_ms),
        }
    }

    fn is_due(self, now_ms: u64) -> bool {
        now_ms >= self.at_ms
    }
}

#[derive(Debug, Clone, Copy)]
struct SettleTimer {
    target: GateState,
    deadline: Deadline,
}

#[derive(Debug, Clone)]
pub struct GateEngine {
    config: RemoteConfig,
    calibration: SignalCalibration,

    state: ConnectionState,
    phase: LoopPhase,
    has_reported: bool,

    command_lock: bool,
    cooldown: Option<Deadline>,
    settle: Option<SettleTimer>,

    generation: u64,
    torn_down: bool,
}

impl GateEngine {
    pub fn new(mut config: RemoteConfig, mut calibration: SignalCalibration) -> Self {
        config.sanitize();
        calibration.sanitize();
        Self {
            config,
            calibration,
            state: ConnectionState::default(),
            phase: LoopPhase::Idle,
            has_reported: false,
            command_lock: false,
            cooldown: None,
            settle: None,
            generation: 0,
            torn_down: false,
        }
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn snapshot(&self) -> ConnectionState {
        self.state.clone()
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn is_command_locked(&self) -> bool {
        self.command_lock
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn view(&self) -> ViewModel {
        presentation::present(&self.state, self.command_lock)
    }

    pub fn begin_poll(&mut self) -> Option<PollTicket> {
        if self.torn_down || self.phase == LoopPhase::Polling {
            return None;
        }
        self.phase = LoopPhase::Polling;
        Some(PollTicket {
            generation: self.generation,
        })
    }

    pub fn complete_poll(
        &mut self,
        ticket: PollTicket,
        result: Result<DeviceStatus, NetworkError>,
        now_ms: u64,
    ) -> bool {
        if self.torn_down || ticket.generation != self.generation {
            return false;
        }
        self.phase = LoopPhase::Idle;

        match result {
            Ok(status) => {
                // Device truth wins over any optimistic value, matching or not.
                self.settle = None;
                self.state.connected = true;
                self.state.gate = status.gate.into();
                self.state.signal = Some(SignalSample {
                    rssi_dbm: status.rssi,
                    bars: self.calibration.bars(status.rssi),
                });
                self.state.last_updated_ms = Some(now_ms);
                self.has_reported = true;
            }
            Err(_) => {
                self.state.connected = false;
                self.state.signal = None;
                if !self.has_reported {
                    self.state.gate = GateState::Unknown;
                }
            }
        }

        true
    }

    pub fn request_toggle(&mut self, now_ms: u64) -> Result<ToggleTicket, CommandError> {
        if self.torn_down || !self.state.connected || self.command_lock {
            return Err(CommandError::NotReady);
        }

        self.command_lock = true;
        self.cooldown = None;

        if let Some(transitional) = self.state.gate.toggled_transition() {
            self.state.gate = transitional;
            self.settle = Some(SettleTimer {
                target: transitional.terminal(),
                deadline: Deadline::after(now_ms, self.config.settle_ms),
            });
        }

        Ok(ToggleTicket {
            generation: self.generation,
        })
    }

    pub fn complete_toggle(
        &mut self,
        ticket: ToggleTicket,
        result: Result<(), NetworkError>,
        now_ms: u64,
    ) -> Result<(), CommandError> {
        // A failed send keeps the optimistic gate; the device may have acted anyway.
        if !self.torn_down && ticket.generation == self.generation {
            self.cooldown = Some(Deadline::after(now_ms, self.config.cooldown_ms));
        }
        result.map_err(CommandError::SendFailed)
    }

    pub fn tick(&mut self, now_ms: u64) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        if self.torn_down {
            return events;
        }

        if let Some(settle) = self.settle {
            if settle.deadline.is_due(now_ms) {
                self.settle = None;
                if self.state.gate.is_transitional() {
                    self.state.gate = settle.target;
                    events.push(EngineEvent::Settled(settle.target));
                }
            }
        }

        if let Some(cooldown) = self.cooldown {
            if cooldown.is_due(now_ms) {
                self.cooldown = None;
                self.command_lock = false;
                events.push(EngineEvent::CommandUnlocked);
            }
        }

        events
    }

    pub fn next_deadline_ms(&self) -> Option<u64> {
        let settle = self.settle.map(|settle| settle.deadline.at_ms);
        let cooldown = self.cooldown.map(|deadline| deadline.at_ms);
        match (settle, cooldown) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn settle_remaining_ms(&self, now_ms: u64) -> u64 {
        self.settle
            .map(|settle| settle.deadline.at_ms.saturating_sub(now_ms))
            .unwrap_or(0)
    }

    pub fn cooldown_remaining_ms(&self, now_ms: u64) -> u64 {
        self.cooldown
            .map(|deadline| deadline.at_ms.saturating_sub(now_ms))
            .unwrap_or(0)
    }

    pub fn teardown(&mut self) {
        self.torn_down = true;
        self.generation = self.generation.wrapping_add(1);
        self.settle = None;
        self.cooldown = None;
        self.phase = LoopPhase::Idle;
    }
}
