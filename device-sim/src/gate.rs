use gate_common::{DeviceStatus, ReportedGate};

#[derive(Debug, Clone, Copy)]
struct Travel {
    target: ReportedGate,
    done_ms: u64,
}

/// A gate motor with limit switches: it reports the last position it reached
/// until the current travel finishes.
#[derive(Debug, Clone)]
pub struct SimulatedGate {
    position: ReportedGate,
    travel: Option<Travel>,
    travel_ms: u64,
    fail_every: Option<u64>,
    status_requests: u64,
}

impl SimulatedGate {
    pub fn new(travel_ms: u64, fail_every: Option<u64>) -> Self {
        Self {
            position: ReportedGate::Closed,
            travel: None,
            travel_ms,
            fail_every: fail_every.filter(|n| *n > 0),
            status_requests: 0,
        }
    }

    pub fn is_travelling(&self, now_ms: u64) -> bool {
        self.travel.is_some_and(|travel| now_ms < travel.done_ms)
    }

    pub fn status(&mut self, now_ms: u64) -> Option<DeviceStatus> {
        self.status_requests = self.status_requests.saturating_add(1);
        if let Some(every) = self.fail_every {
            if self.status_requests % every == 0 {
                return None;
            }
        }

        self.finish_travel(now_ms);
        Some(DeviceStatus {
            gate: self.position,
            rssi: -55 - (self.status_requests.wrapping_mul(7) % 18) as i32,
        })
    }

    pub fn toggle(&mut self, now_ms: u64) {
        self.finish_travel(now_ms);

        self.travel = Some(match self.travel {
            // Reversing mid-travel takes as long as the distance already covered.
            Some(travel) => {
                let remaining = travel.done_ms.saturating_sub(now_ms);
                let covered = self.travel_ms.saturating_sub(remaining);
                Travel {
                    target: opposite(travel.target),
                    done_ms: now_ms.saturating_add(covered),
                }
            }
            None => Travel {
                target: opposite(self.position),
                done_ms: now_ms.saturating_add(self.travel_ms),
            },
        });
    }

    fn finish_travel(&mut self, now_ms: u64) {
        if let Some(travel) = self.travel {
            if now_ms >= travel.done_ms {
                self.position = travel.target;
                self.travel = None;
            }
        }
    }
}

fn opposite(gate: ReportedGate) -> ReportedGate {
    match gate {
        ReportedGate::Open => ReportedGate::Closed,
        ReportedGate::Closed => ReportedGate::Open,
    }
}
