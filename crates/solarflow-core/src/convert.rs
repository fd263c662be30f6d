// ── API-to-domain type conversions ──
//
// Bridges raw `solarflow_api` response types into canonical
// `solarflow_core::model` types. Unit scaling happens here and only here:
// each conversion reads the raw value once and multiplies it once.

use solarflow_api::models::{PowerFlowConnection, PowerFlowNode, SiteCurrentPowerFlow};

use crate::model::{FlowEdge, FlowNode, PowerFlowReading, PowerUnit};

fn scale_node(node: &PowerFlowNode, multiplier: f64) -> FlowNode {
    FlowNode {
        current_power: node.current_power.map(|p| p * multiplier),
        status: node.status.clone(),
    }
}

impl From<&PowerFlowConnection> for FlowEdge {
    fn from(raw: &PowerFlowConnection) -> Self {
        Self {
            from: raw.from.clone(),
            to: raw.to.clone(),
        }
    }
}

impl From<&SiteCurrentPowerFlow> for PowerFlowReading {
    fn from(raw: &SiteCurrentPowerFlow) -> Self {
        let multiplier = PowerUnit::from_raw(raw.unit.as_deref()).multiplier();

        Self {
            grid: raw.grid.as_ref().map(|n| scale_node(n, multiplier)),
            pv: raw.pv.as_ref().map(|n| scale_node(n, multiplier)),
            load: raw.load.as_ref().map(|n| scale_node(n, multiplier)),
            connections: raw.connections.iter().map(FlowEdge::from).collect(),
        }
    }
}
