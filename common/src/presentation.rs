//! Maps connection state to something a rendering layer can draw.

use crate::types::{ColorClass, ConnectionState, GateState, ViewModel};

pub fn present(state: &ConnectionState, command_locked: bool) -> ViewModel {
    let gate_label = gate_label(state.gate);

    let (label, color_class) = if state.connected {
        (gate_label.to_string(), gate_color(state.gate))
    } else {
        ("Offline".to_string(), ColorClass::Offline)
    };

    let signal_label = match state.signal {
        Some(sample) => format!("{} dBm", sample.rssi_dbm),
        None => "—".to_string(),
    };

    ViewModel {
        label,
        gate_label: gate_label.to_string(),
        signal_label,
        signal_bars: state.signal.map(|sample| sample.bars),
        color_class,
        action_label: action_label(state.gate).to_string(),
        action_enabled: state.connected && !command_locked,
    }
}

fn gate_label(gate: GateState) -> &'static str {
    match gate {
        GateState::Unknown => "Unknown",
        GateState::Open => "Open",
        GateState::Closed => "Closed",
        GateState::Opening => "Opening…",
        GateState::Closing => "Closing…",
    }
}

fn gate_color(gate: GateState) -> ColorClass {
    match gate {
        GateState::Unknown => ColorClass::Unknown,
        GateState::Open => ColorClass::Open,
        GateState::Closed => ColorClass::Closed,
        GateState::Opening | GateState::Closing => ColorClass::Transitioning,
    }
}

fn action_label(gate: GateState) -> &'static str {
    match gate {
        GateState::Open => "Close Gate",
        GateState::Closed => "Open Gate",
        GateState::Unknown => "Toggle Gate",
        GateState::Opening => "Opening…",
        GateState::Closing => "Closing…",
    }
}
