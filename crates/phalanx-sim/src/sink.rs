//! Outbound transform publication.
//!
//! Transforms are the only agent data shared with the host engine. The
//! host implements [`TransformSink`] and receives one call per agent when
//! [`SimulationEngine::publish_transforms`](crate::SimulationEngine::publish_transforms)
//! runs.

use std::collections::BTreeMap;

use phalanx_core::types::{AgentId, Transform};

pub trait TransformSink {
    fn publish(&mut self, agent: AgentId, transform: Transform);
}

impl TransformSink for Vec<(AgentId, Transform)> {
    fn publish(&mut self, agent: AgentId, transform: Transform) {
        self.push((agent, transform));
    }
}

/// Keeps only the latest transform per agent.
impl TransformSink for BTreeMap<AgentId, Transform> {
    fn publish(&mut self, agent: AgentId, transform: Transform) {
        self.insert(agent, transform);
    }
}
