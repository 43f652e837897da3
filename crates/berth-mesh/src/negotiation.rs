//! Overlap avoidance by negotiation.
//!
//! An entity clears itself a berth by surveying every peer for its
//! occupied region and then, while any overlap remains, claiming space on
//! the chosen side (asking the peers to shift when that makes room). All
//! of it runs over the transport; the negotiating entity never touches
//! peer state directly.
//!
//! The convergence loop is bounded. A single iteration resolves any
//! one-sided overlap; a configuration that needs several rounds of
//! shifting trips the bound and fails the run instead. How many rounds to
//! allow is a policy decision, so the bound is a [`NegotiationPolicy`]
//! field rather than a constant buried in the loop.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use berth_core::{Address, Expr, Message, Rect, Response};

use crate::entity::Entity;
use crate::error::MeshError;

/// Default iteration bound for the convergence loop.
pub const DEFAULT_MAX_ITERATIONS: u32 = 1;

/// The side an entity prefers to settle toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetSide {
    Left,
    Right,
}

/// Supplies a side when the caller leaves the choice open.
///
/// Production code uses [`RandomSide`]; tests inject a fixed chooser so
/// negotiation runs are deterministic.
pub trait SideChooser {
    fn choose(&mut self) -> TargetSide;
}

/// Fair-coin side selection.
#[derive(Debug, Default)]
pub struct RandomSide;

impl SideChooser for RandomSide {
    fn choose(&mut self) -> TargetSide {
        use rand::Rng;
        if rand::thread_rng().gen_bool(0.5) {
            TargetSide::Left
        } else {
            TargetSide::Right
        }
    }
}

/// Tunable limits for a negotiation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationPolicy {
    /// Convergence-loop iterations allowed before the run fails with
    /// [`MeshError::NegotiationStuck`].
    pub max_iterations: u32,
}

impl Default for NegotiationPolicy {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// The observable outcome of a successful negotiation run.
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiationReport {
    /// The side actually used (chosen by the caller or the chooser).
    pub side: TargetSide,
    /// Convergence-loop iterations consumed; zero when there was no
    /// overlap to begin with.
    pub iterations: u32,
    /// The entity's bounding rectangle after settling.
    pub settled: Rect,
}

impl Entity {
    /// All bound addresses except this entity's own, in bind order.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::NotAttached`] when the entity has no endpoint.
    pub fn find_all_others(&self) -> Result<Vec<Address>, MeshError> {
        let endpoint = self.endpoint()?;
        let own = endpoint.address().clone();
        Ok(endpoint.list().into_iter().filter(|a| *a != own).collect())
    }

    /// Asks the peer at `address` to shift itself by `(right, down)`.
    ///
    /// The message carries an `offset` query alongside the shift request,
    /// and the receiver applies the shift before evaluating, so the reply
    /// data is the peer's rectangle *after* the move.
    ///
    /// # Errors
    ///
    /// Transport and handler errors propagate; the reply callback will not
    /// have been invoked.
    pub fn request_other_to_shift(
        &self,
        address: &Address,
        right: f64,
        down: f64,
        on_reply: impl FnOnce(Response),
    ) -> Result<(), MeshError> {
        let msg = Message::shift_request(right, down).and_query(Expr::var("offset"));
        self.endpoint()?.send(address, msg, on_reply)
    }

    /// Fans a shift request out to every other entity, sequentially in
    /// discovery order. `on_reply` runs once per replying peer; key the
    /// refresh on `response.header.src`.
    pub fn request_all_others_to_shift(
        &self,
        right: f64,
        down: f64,
        mut on_reply: impl FnMut(Response),
    ) -> Result<(), MeshError> {
        for address in self.find_all_others()? {
            self.request_other_to_shift(&address, right, down, &mut on_reply)?;
        }
        Ok(())
    }

    /// Repositions this entity so that it overlaps no peer, settling
    /// toward `target_side` (or a side from `chooser` when unspecified).
    ///
    /// One run: discover peers, survey their regions, then loop, claiming
    /// space on the chosen side (asking peers to shift when that frees
    /// room) until nothing overlaps or the policy bound trips.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::NegotiationStuck`] when the loop exceeds
    /// `policy.max_iterations`; transport, schema, and decode errors from
    /// the underlying calls propagate unchanged.
    pub fn avoid_all_others(
        &mut self,
        target_side: Option<TargetSide>,
        chooser: &mut dyn SideChooser,
        policy: &NegotiationPolicy,
    ) -> Result<NegotiationReport, MeshError> {
        let side = target_side.unwrap_or_else(|| chooser.choose());
        debug!(target: "positioning", entity = %self.address(), ?side, "negotiation starting");

        // Survey: one covered-area entry per peer that answers. The batch
        // reply is [bounds, offset]; the bounds form covers substructure.
        let mut covered_areas: HashMap<Address, Rect> = HashMap::new();
        for address in self.find_all_others()? {
            let msg = Message::queries(vec![Expr::var("bounds"), Expr::var("offset")]);
            let mut reply: Option<Response> = None;
            self.endpoint()?.send(&address, msg, |r| reply = Some(r))?;
            if let Some(response) = reply {
                let (bounds, _offset): (Rect, Rect) = serde_json::from_value(response.data)?;
                covered_areas.insert(address, bounds);
            }
        }

        let mut iterations = 0u32;
        while self.overlapping_any(&covered_areas) {
            iterations += 1;
            if iterations > policy.max_iterations {
                return Err(MeshError::NegotiationStuck {
                    iterations,
                    bound: policy.max_iterations,
                });
            }

            match side {
                TargetSide::Right => {
                    // Reclaim any slack on the left, then settle just past
                    // the rightmost peer edge.
                    if let Some(leftmost) = leftmost_edge(&covered_areas) {
                        if leftmost > 0.0 {
                            debug!(
                                target: "positioning",
                                entity = %self.address(),
                                space = leftmost,
                                "space available on left side; requesting all others to shift"
                            );
                            self.shift_all_and_refresh(-leftmost, 0.0, &mut covered_areas)?;
                        }
                    }
                    let top = self.rectangle().top;
                    self.move_to(rightmost_edge(&covered_areas) + 1.0, top);
                }
                TargetSide::Left => {
                    // Take the left wall, then push the peers right far
                    // enough to clear the nearest one.
                    if self.bounding_rectangle().left > 0.0 {
                        let top = self.rectangle().top;
                        self.move_to(0.0, top);
                    }
                    if let Some(leftmost) = leftmost_edge(&covered_areas) {
                        let bounds = self.bounding_rectangle();
                        let space_right = leftmost - bounds.left - bounds.width;
                        self.shift_all_and_refresh(-space_right + 1.0, 0.0, &mut covered_areas)?;
                    }
                }
            }
        }

        let settled = self.bounding_rectangle();
        debug!(
            target: "positioning",
            entity = %self.address(),
            iterations,
            left = settled.left,
            "negotiation settled"
        );
        Ok(NegotiationReport {
            side,
            iterations,
            settled,
        })
    }

    /// True when any covered area intersects this entity's bounds.
    fn overlapping_any(&self, covered_areas: &HashMap<Address, Rect>) -> bool {
        let own = self.bounding_rectangle();
        covered_areas.values().any(|area| area.intersects(&own))
    }

    /// Shifts every peer and refreshes `covered_areas` from the replies,
    /// each of which carries the peer's post-shift offset.
    fn shift_all_and_refresh(
        &self,
        right: f64,
        down: f64,
        covered_areas: &mut HashMap<Address, Rect>,
    ) -> Result<(), MeshError> {
        let mut replies: Vec<Response> = Vec::new();
        self.request_all_others_to_shift(right, down, |response| replies.push(response))?;
        for response in replies {
            let offset: Rect = serde_json::from_value(response.data)?;
            covered_areas.insert(response.header.src, offset);
        }
        Ok(())
    }
}

/// Smallest `left` over the covered areas, `None` when there are none.
fn leftmost_edge(covered_areas: &HashMap<Address, Rect>) -> Option<f64> {
    covered_areas.values().map(|r| r.left).reduce(f64::min)
}

/// Largest right edge over the covered areas, 0 when there are none.
fn rightmost_edge(covered_areas: &HashMap<Address, Rect>) -> f64 {
    covered_areas.values().map(|r| r.right()).fold(0.0, f64::max)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
