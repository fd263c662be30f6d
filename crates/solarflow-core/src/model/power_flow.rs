// ── Power flow domain types ──

use serde::{Deserialize, Serialize};

/// Unit the provider reported power values in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum PowerUnit {
    #[strum(serialize = "W")]
    Watt,
    #[strum(serialize = "kW")]
    Kilowatt,
    #[strum(serialize = "MW")]
    Megawatt,
}

impl PowerUnit {
    /// Interpret the raw `unit` field. Anything other than exactly `W` or
    /// `MW` (including a missing field) is taken as kilowatts.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            Some("W") => Self::Watt,
            Some("MW") => Self::Megawatt,
            _ => Self::Kilowatt,
        }
    }

    /// Factor converting a value in this unit to watts.
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Watt => 1.0,
            Self::Kilowatt => 1_000.0,
            Self::Megawatt => 1_000_000.0,
        }
    }
}

/// Named endpoints of a power-flow edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum FlowNodeKind {
    Grid,
    Pv,
    Load,
}

impl FlowNodeKind {
    /// Case-insensitive match on the provider's node names.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("grid") {
            Some(Self::Grid)
        } else if name.eq_ignore_ascii_case("pv") {
            Some(Self::Pv)
        } else if name.eq_ignore_ascii_case("load") {
            Some(Self::Load)
        } else {
            None
        }
    }
}

/// One node of the flow graph. `current_power` is in watts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlowNode {
    pub current_power: Option<f64>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub from: String,
    pub to: String,
}

impl FlowEdge {
    pub fn is(&self, from: FlowNodeKind, to: FlowNodeKind) -> bool {
        FlowNodeKind::from_name(&self.from) == Some(from)
            && FlowNodeKind::from_name(&self.to) == Some(to)
    }
}

/// A site's instantaneous power flow with every value in watts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PowerFlowReading {
    pub grid: Option<FlowNode>,
    pub pv: Option<FlowNode>,
    pub load: Option<FlowNode>,
    pub connections: Vec<FlowEdge>,
}

impl PowerFlowReading {
    pub fn node(&self, kind: FlowNodeKind) -> Option<&FlowNode> {
        match kind {
            FlowNodeKind::Grid => self.grid.as_ref(),
            FlowNodeKind::Pv => self.pv.as_ref(),
            FlowNodeKind::Load => self.load.as_ref(),
        }
    }

    /// Current power of a node in watts, `0.0` when absent.
    pub fn power_watts(&self, kind: FlowNodeKind) -> f64 {
        self.node(kind)
            .and_then(|n| n.current_power)
            .unwrap_or_default()
    }

    pub fn has_flow(&self, from: FlowNodeKind, to: FlowNodeKind) -> bool {
        self.connections.iter().any(|edge| edge.is(from, to))
    }

    /// Grid direction, expressed the way battery-style accessories show it.
    pub fn charging_state(&self) -> ChargingState {
        if self.has_flow(FlowNodeKind::Load, FlowNodeKind::Grid) {
            ChargingState::Exporting
        } else if self.has_flow(FlowNodeKind::Grid, FlowNodeKind::Load) {
            ChargingState::Importing
        } else {
            ChargingState::NotCharging
        }
    }
}

/// Direction of energy exchange with the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ChargingState {
    /// Surplus flows from the site to the grid.
    Exporting,
    /// The site draws from the grid.
    Importing,
    NotCharging,
}

impl ChargingState {
    /// Low-battery indication for this state. `None` leaves the previous
    /// indication untouched.
    pub fn low_battery(self) -> Option<bool> {
        match self {
            Self::Exporting => Some(false),
            Self::Importing => Some(true),
            Self::NotCharging => None,
        }
    }
}
