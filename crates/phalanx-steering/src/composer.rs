//! Combining behavior outputs into one bounded steering force.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use phalanx_core::constants::{
    CONTEXT_DANGER_FALLOFF, CONTEXT_INTEREST_FALLOFF, CONTEXT_SECTORS, MAX_FORCE, SIGNIFICANT_FORCE,
};
use phalanx_core::enums::ComposerMode;
use phalanx_core::types::DVec3;

use crate::behaviors::SteeringBehavior;
use crate::context::SteeringContext;
use crate::context_map::ContextSteering;
use crate::error::SteeringError;
use crate::slot::{BehaviorSet, BehaviorSlot};

/// Strategy turning a behavior set into a single force for one agent.
pub trait BehaviorComposer {
    fn compute_force(
        &self,
        behaviors: &BehaviorSet,
        ctx: &SteeringContext<'_>,
        rng: &mut dyn RngCore,
    ) -> DVec3;
}

/// Enabled, active, and through the probability gate this tick.
///
/// The gate only draws from `rng` when `0 < probability < 1`, so sets with
/// no probabilistic slots never consume randomness.
pub(crate) fn participates(
    slot: &BehaviorSlot,
    ctx: &SteeringContext<'_>,
    rng: &mut dyn RngCore,
) -> bool {
    if !slot.enabled || !slot.behavior.is_active(ctx) {
        return false;
    }
    if slot.probability >= 1.0 {
        true
    } else if slot.probability > 0.0 {
        rng.gen_bool(slot.probability)
    } else {
        false
    }
}

/// Force of one behavior, clamped to the agent's max acceleration.
/// Errors and non-finite output are logged and yield `None`.
pub(crate) fn guarded_force(slot: &BehaviorSlot, ctx: &SteeringContext<'_>) -> Option<DVec3> {
    let result = slot.behavior.compute_force(ctx).and_then(|force| {
        if force.is_finite() {
            Ok(force)
        } else {
            Err(SteeringError::NonFinite {
                behavior: slot.behavior.kind(),
                what: "force",
            })
        }
    });
    match result {
        Ok(force) => Some(force.clamp_length_max(ctx.max_acceleration.max(0.0))),
        Err(err) => {
            warn!(agent = %ctx.agent, behavior = %slot.name, %err, "behavior faulted; contributing zero");
            None
        }
    }
}

/// Weighted sum in priority order with early exit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityBlend {
    pub max_force: f64,
    /// Once the running sum is longer than this, lower priorities are skipped.
    pub significant_force: f64,
}

impl Default for PriorityBlend {
    fn default() -> Self {
        Self {
            max_force: MAX_FORCE,
            significant_force: SIGNIFICANT_FORCE,
        }
    }
}

impl BehaviorComposer for PriorityBlend {
    fn compute_force(
        &self,
        behaviors: &BehaviorSet,
        ctx: &SteeringContext<'_>,
        rng: &mut dyn RngCore,
    ) -> DVec3 {
        let mut total = DVec3::ZERO;
        for slot in behaviors {
            if !participates(slot, ctx, rng) {
                continue;
            }
            if let Some(force) = guarded_force(slot, ctx) {
                total += force * slot.weight;
            }
            if total.length() > self.significant_force {
                trace!(agent = %ctx.agent, after = %slot.name, "significant force reached");
                break;
            }
        }
        total.clamp_length_max(self.max_force.max(0.0))
    }
}

/// Runs only the most desirable behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusiveSelect {
    pub max_force: f64,
}

impl Default for ExclusiveSelect {
    fn default() -> Self {
        Self {
            max_force: MAX_FORCE,
        }
    }
}

impl ExclusiveSelect {
    /// Winning slot; earlier slots win ties. `None` when nothing scores
    /// above zero.
    pub fn select<'s>(
        &self,
        behaviors: &'s BehaviorSet,
        ctx: &SteeringContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Option<&'s BehaviorSlot> {
        let mut best: Option<(&BehaviorSlot, f64)> = None;
        for slot in behaviors {
            if !participates(slot, ctx, rng) {
                continue;
            }
            let score = slot.behavior.desirability(ctx) * slot.weight;
            if !score.is_finite() || score <= 0.0 {
                continue;
            }
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((slot, score));
            }
        }
        best.map(|(slot, _)| slot)
    }
}

impl BehaviorComposer for ExclusiveSelect {
    fn compute_force(
        &self,
        behaviors: &BehaviorSet,
        ctx: &SteeringContext<'_>,
        rng: &mut dyn RngCore,
    ) -> DVec3 {
        self.select(behaviors, ctx, rng)
            .and_then(|slot| guarded_force(slot, ctx))
            .map_or(DVec3::ZERO, |f| f.clamp_length_max(self.max_force.max(0.0)))
    }
}

/// Composer tunables shared by every archetype.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringTuning {
    pub max_force: f64,
    pub significant_force: f64,
    pub context_sectors: usize,
    pub interest_falloff: f64,
    pub danger_falloff: f64,
}

impl Default for SteeringTuning {
    fn default() -> Self {
        Self {
            max_force: MAX_FORCE,
            significant_force: SIGNIFICANT_FORCE,
            context_sectors: CONTEXT_SECTORS,
            interest_falloff: CONTEXT_INTEREST_FALLOFF,
            danger_falloff: CONTEXT_DANGER_FALLOFF,
        }
    }
}

/// Concrete composer chosen from a [`ComposerMode`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Composer {
    PriorityBlend(PriorityBlend),
    ExclusiveSelect(ExclusiveSelect),
    ContextSteering(ContextSteering),
}

impl Composer {
    pub fn for_mode(mode: ComposerMode, tuning: &SteeringTuning) -> Self {
        match mode {
            ComposerMode::PriorityBlend => Composer::PriorityBlend(PriorityBlend {
                max_force: tuning.max_force,
                significant_force: tuning.significant_force,
            }),
            ComposerMode::ExclusiveSelect => Composer::ExclusiveSelect(ExclusiveSelect {
                max_force: tuning.max_force,
            }),
            ComposerMode::ContextSteering => Composer::ContextSteering(ContextSteering {
                sectors: tuning.context_sectors,
                interest_falloff: tuning.interest_falloff,
                danger_falloff: tuning.danger_falloff,
                max_force: tuning.max_force,
            }),
        }
    }

    pub fn mode(&self) -> ComposerMode {
        match self {
            Composer::PriorityBlend(_) => ComposerMode::PriorityBlend,
            Composer::ExclusiveSelect(_) => ComposerMode::ExclusiveSelect,
            Composer::ContextSteering(_) => ComposerMode::ContextSteering,
        }
    }
}

impl BehaviorComposer for Composer {
    fn compute_force(
        &self,
        behaviors: &BehaviorSet,
        ctx: &SteeringContext<'_>,
        rng: &mut dyn RngCore,
    ) -> DVec3 {
        match self {
            Composer::PriorityBlend(c) => c.compute_force(behaviors, ctx, rng),
            Composer::ExclusiveSelect(c) => c.compute_force(behaviors, ctx, rng),
            Composer::ContextSteering(c) => c.compute_force(behaviors, ctx, rng),
        }
    }
}
