//! Behavior tunables and priority-ordered behavior sets.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::behaviors::Behavior;

fn one() -> f64 {
    1.0
}

fn enabled() -> bool {
    true
}

/// A behavior plus the composition tunables attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorSlot {
    pub name: String,
    pub behavior: Behavior,
    #[serde(default = "one")]
    pub weight: f64,
    /// Higher runs first.
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "enabled")]
    pub enabled: bool,
    /// Chance per tick that the behavior participates at all.
    #[serde(default = "one")]
    pub probability: f64,
}

impl BehaviorSlot {
    pub fn new(name: impl Into<String>, behavior: Behavior) -> Self {
        Self {
            name: name.into(),
            behavior,
            weight: 1.0,
            priority: 0,
            enabled: true,
            probability: 1.0,
        }
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Immutable behavior list sorted by descending priority; equal priorities
/// keep declaration order. Cheap to clone and shared between agents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BehaviorSet(Arc<[BehaviorSlot]>);

impl BehaviorSet {
    pub fn new(mut slots: Vec<BehaviorSlot>) -> Self {
        slots.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self(slots.into())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BehaviorSlot> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&BehaviorSlot> {
        self.0.iter().find(|s| s.name == name)
    }
}

impl<'a> IntoIterator for &'a BehaviorSet {
    type Item = &'a BehaviorSlot;
    type IntoIter = std::slice::Iter<'a, BehaviorSlot>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
