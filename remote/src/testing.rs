use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use gate_common::{DeviceStatus, NetworkError, ReportedGate};

use crate::client::DeviceClient;

#[derive(Clone, Default)]
pub struct ScriptedClient {
    inner: Arc<Script>,
}

#[derive(Default)]
struct Script {
    statuses: Mutex<VecDeque<Result<DeviceStatus, NetworkError>>>,
    toggle_result: Mutex<Option<NetworkError>>,
    status_delay: Mutex<Duration>,
    toggle_delay: Mutex<Duration>,
    status_calls: AtomicUsize,
    toggle_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(statuses: Vec<Result<DeviceStatus, NetworkError>>) -> Self {
        let client = Self::default();
        *client.inner.statuses.lock().unwrap() = statuses.into();
        client
    }

    pub fn reporting(gate: ReportedGate, rssi: i32) -> Self {
        Self::new(vec![Ok(DeviceStatus { gate, rssi })])
    }

    pub fn with_status_delay(self, delay: Duration) -> Self {
        *self.inner.status_delay.lock().unwrap() = delay;
        self
    }

    pub fn with_toggle_delay(self, delay: Duration) -> Self {
        *self.inner.toggle_delay.lock().unwrap() = delay;
        self
    }

    pub fn fail_toggles_with(&self, err: NetworkError) {
        *self.inner.toggle_result.lock().unwrap() = Some(err);
    }

    pub fn status_calls(&self) -> usize {
        self.inner.status_calls.load(Ordering::SeqCst)
    }

    pub fn toggle_calls(&self) -> usize {
        self.inner.toggle_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_status(&self) -> Result<DeviceStatus, NetworkError> {
        // The last scripted status repeats once the script runs out.
        let mut statuses = self.inner.statuses.lock().unwrap();
        if statuses.len() > 1 {
            statuses.pop_front().unwrap()
        } else {
            statuses
                .front()
                .cloned()
                .unwrap_or(Err(NetworkError::Timeout))
        }
    }
}

impl DeviceClient for ScriptedClient {
    async fn fetch_status(&self) -> Result<DeviceStatus, NetworkError> {
        self.inner.status_calls.fetch_add(1, Ordering::SeqCst);
        let current = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = *self.inner.status_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.next_status()
    }

    async fn send_toggle(&self) -> Result<(), NetworkError> {
        self.inner.toggle_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.inner.toggle_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let failure = self.inner.toggle_result.lock().unwrap().clone();
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
