//! Context steering: interest/danger voting over angular sectors.
//!
//! Every active behavior votes into two maps instead of producing a force.
//! Interest marks directions worth moving in, danger marks directions to
//! avoid. The agent moves along the sector with the best
//! `interest - danger`. Because danger uses a sharper falloff than interest,
//! a hazard sitting right on the goal direction carves a notch in the
//! interest lobe and the agent veers around it, where a plain vector sum
//! would cancel out and stall.

use std::f64::consts::TAU;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::warn;

use phalanx_core::constants::{
    CONTEXT_DANGER_FALLOFF, CONTEXT_INTEREST_FALLOFF, CONTEXT_SECTORS, MAX_FORCE,
};
use phalanx_core::types::{planar, DVec3};

use crate::behaviors::SteeringBehavior;
use crate::composer::{participates, BehaviorComposer};
use crate::context::SteeringContext;
use crate::error::{SteeringError, SteeringResult};
use crate::slot::BehaviorSet;

/// Upper bound on sector count; maps live on the stack.
pub const MAX_SECTORS: usize = 64;

/// Interest and danger scores per sector. Sector `s` points at angle
/// `s * TAU / sectors` on the XZ plane, sector 0 along +X.
#[derive(Debug, Clone)]
pub struct ContextMap {
    sectors: usize,
    interest_falloff: f64,
    danger_falloff: f64,
    /// Per-vote multiplier set by the composer from the slot weight.
    weight: f64,
    directions: [DVec3; MAX_SECTORS],
    interest: [f64; MAX_SECTORS],
    danger: [f64; MAX_SECTORS],
}

impl ContextMap {
    pub fn new(sectors: usize, interest_falloff: f64, danger_falloff: f64) -> Self {
        let sectors = sectors.clamp(1, MAX_SECTORS);
        let mut directions = [DVec3::ZERO; MAX_SECTORS];
        for (s, dir) in directions.iter_mut().enumerate().take(sectors) {
            let angle = s as f64 * TAU / sectors as f64;
            *dir = DVec3::new(angle.cos(), 0.0, angle.sin());
        }
        Self {
            sectors,
            interest_falloff,
            danger_falloff,
            weight: 1.0,
            directions,
            interest: [0.0; MAX_SECTORS],
            danger: [0.0; MAX_SECTORS],
        }
    }

    pub fn sectors(&self) -> usize {
        self.sectors
    }

    pub fn direction(&self, sector: usize) -> DVec3 {
        self.directions[sector]
    }

    pub fn interest(&self) -> &[f64] {
        &self.interest[..self.sectors]
    }

    pub fn danger(&self) -> &[f64] {
        &self.danger[..self.sectors]
    }

    pub(crate) fn set_vote_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    /// Vote for `direction` with `strength`. Sectors keep the strongest vote.
    pub fn add_interest(&mut self, direction: DVec3, strength: f64) -> SteeringResult<()> {
        let strength = strength * self.weight;
        let falloff = self.interest_falloff;
        Self::vote(&self.directions[..self.sectors], &mut self.interest, direction, strength, falloff)
    }

    /// Mark `direction` as dangerous with `strength`.
    pub fn add_danger(&mut self, direction: DVec3, strength: f64) -> SteeringResult<()> {
        let strength = strength * self.weight;
        let falloff = self.danger_falloff;
        Self::vote(&self.directions[..self.sectors], &mut self.danger, direction, strength, falloff)
    }

    fn vote(
        directions: &[DVec3],
        scores: &mut [f64; MAX_SECTORS],
        direction: DVec3,
        strength: f64,
        falloff: f64,
    ) -> SteeringResult<()> {
        if !direction.is_finite() || !strength.is_finite() {
            return Err(SteeringError::NonFinite {
                behavior: "context_map",
                what: "vote",
            });
        }
        let Some(dir) = planar(direction).try_normalize() else {
            return Ok(());
        };
        if strength <= 0.0 {
            return Ok(());
        }
        for (score, sector_dir) in scores.iter_mut().zip(directions) {
            let alignment = sector_dir.dot(dir).max(0.0);
            let value = alignment.powf(falloff) * strength;
            if value > *score {
                *score = value;
            }
        }
        Ok(())
    }

    /// Best sector by `interest - danger`; ties go to the lowest index.
    pub fn best_sector(&self) -> (usize, f64) {
        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for s in 0..self.sectors {
            let score = self.interest[s] - self.danger[s];
            if score > best_score {
                best = s;
                best_score = score;
            }
        }
        (best, best_score)
    }
}

/// Outcome of one context-steering vote.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextDecision {
    pub sector: usize,
    pub direction: DVec3,
    /// `interest - danger` of the chosen sector.
    pub score: f64,
    /// Interest of the chosen sector, used as the speed fraction.
    pub interest: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSteering {
    pub sectors: usize,
    /// Exponent applied to `max(0, dot)` for interest votes.
    pub interest_falloff: f64,
    /// Exponent for danger votes; larger is narrower.
    pub danger_falloff: f64,
    pub max_force: f64,
}

impl Default for ContextSteering {
    fn default() -> Self {
        Self {
            sectors: CONTEXT_SECTORS,
            interest_falloff: CONTEXT_INTEREST_FALLOFF,
            danger_falloff: CONTEXT_DANGER_FALLOFF,
            max_force: MAX_FORCE,
        }
    }
}

impl ContextSteering {
    /// Fill a map from every participating behavior and pick a sector.
    /// `None` when nothing expressed any interest.
    pub fn decide(
        &self,
        behaviors: &BehaviorSet,
        ctx: &SteeringContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Option<ContextDecision> {
        let mut map = ContextMap::new(self.sectors, self.interest_falloff, self.danger_falloff);
        for slot in behaviors {
            if !participates(slot, ctx, rng) {
                continue;
            }
            map.set_vote_weight(slot.weight);
            // A failed behavior may already have voted; roll those votes back.
            let before = map.clone();
            if let Err(err) = slot.behavior.write_context(ctx, &mut map) {
                warn!(agent = %ctx.agent, behavior = %slot.name, %err, "context vote discarded");
                map = before;
            }
        }

        let (sector, score) = map.best_sector();
        let interest = map.interest()[sector];
        if interest <= 0.0 {
            return None;
        }
        Some(ContextDecision {
            sector,
            direction: map.direction(sector),
            score,
            interest,
        })
    }
}

impl BehaviorComposer for ContextSteering {
    fn compute_force(
        &self,
        behaviors: &BehaviorSet,
        ctx: &SteeringContext<'_>,
        rng: &mut dyn RngCore,
    ) -> DVec3 {
        let desired = match self.decide(behaviors, ctx, rng) {
            Some(d) => d.direction * ctx.max_speed * d.interest.min(1.0),
            None => DVec3::ZERO,
        };
        (desired - planar(ctx.velocity)).clamp_length_max(self.max_force.max(0.0))
    }
}
