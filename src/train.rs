//! Per-train path synthesis.
//!
//! A [`TrainPath`] walks one train's discrete trace and collapses it into a
//! minimal sequence of merged [`TrainState`]s plus the [`Movement`]s that
//! connect them, attaches curve geometry from the [`CurveCatalog`], and then
//! answers, for any timestep, which path fragment and progress-fraction window
//! the renderer should show.
//!
//! Construction is two passes over flat arrays with index-based
//! cross-references: pass one scans the trace into states and movements, pass
//! two attaches segments and resolves movement endpoints. Nothing mutates
//! after build; every query is a pure table lookup.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use kurbo::Vec2;

use crate::catalog::{CurveCatalog, wait_path};
use crate::error::{RailmotionError, RailmotionResult};
use crate::geom::{CurveSegment, Direction, GridCell};
use crate::trace::{TrainStatus, TrainTrace};

/// A run of consecutive ticks with identical coordinates and status.
#[derive(Clone, Debug)]
pub(crate) struct TrainState {
    /// First tick of the merged run.
    pub timestep: u64,
    pub position: Option<GridCell>,
    /// Number of consecutive ticks covered.
    pub duration: u64,
    pub status: TrainStatus,
    /// Facing direction in degrees, from the trace.
    pub rotation: u16,
    /// Rotation to render the train at while it sits in this state; on the
    /// 45-degree grid for mid-turn states. Set during segment assignment.
    pub display_rotation: Option<u16>,
    /// Curve midpoint offset from the cell center, for wait-path anchoring.
    pub center_offset: Vec2,
    pub incoming: Option<CurveSegment>,
    pub outgoing: Option<CurveSegment>,
}

impl TrainState {
    fn new(timestep: u64, position: Option<GridCell>, status: TrainStatus, rotation: u16) -> Self {
        Self {
            timestep,
            position,
            duration: 1,
            status,
            rotation,
            display_rotation: None,
            center_offset: Vec2::ZERO,
            incoming: None,
            outgoing: None,
        }
    }
}

/// A non-wait action spanning `speed` consecutive ticks between two states.
///
/// The motion-path string is built on first request and cached; every tick in
/// the span shares it, differing only in the keypoint window.
#[derive(Debug)]
pub(crate) struct Movement {
    pub start: u64,
    pub duration: u64,
    /// Evenly spaced progress fractions, one boundary per tick in the span.
    pub keypoints: Vec<f64>,
    /// Index of the source state; resolved in pass two.
    pub from_state: usize,
    /// Index of the destination state; resolved in pass two.
    pub to_state: usize,
    motion_path: OnceLock<String>,
}

impl Movement {
    fn new(start: u64, duration: u64) -> Self {
        let keypoints = (0..=duration).map(|i| i as f64 / duration as f64).collect();
        Self {
            start,
            duration,
            keypoints,
            from_state: usize::MAX,
            to_state: usize::MAX,
            motion_path: OnceLock::new(),
        }
    }

    /// Motion path and the keypoint window bracketing `tick`.
    fn motion_info(
        &self,
        states: &[TrainState],
        cell_size: f64,
        tick: u64,
    ) -> RailmotionResult<(String, [f64; 2])> {
        let path = match self.motion_path.get() {
            Some(path) => path,
            None => {
                let from = &states[self.from_state];
                let to = &states[self.to_state];
                let out_seg = from.outgoing.as_ref().ok_or_else(|| {
                    RailmotionError::geometry(format!(
                        "movement at timestep {} has no outgoing segment on its source state",
                        self.start
                    ))
                })?;
                let in_seg = to.incoming.as_ref().ok_or_else(|| {
                    RailmotionError::geometry(format!(
                        "movement at timestep {} has no incoming segment on its destination state",
                        self.start
                    ))
                })?;
                let mut built = out_seg.standalone_path(cell_size);
                built.push_str(&in_seg.segment_path(cell_size));
                self.motion_path.get_or_init(move || built)
            }
        };

        let idx = (tick - self.start) as usize;
        match (self.keypoints.get(idx), self.keypoints.get(idx + 1)) {
            (Some(&a), Some(&b)) => Ok((path.clone(), [a, b])),
            _ => Err(RailmotionError::trace(format!(
                "timestep {tick} outside movement span starting at {}",
                self.start
            ))),
        }
    }
}

/// Synthesized motion data for one train: merged states, movements, the
/// full-route preview path, and the per-tick lookup tables.
///
/// Built once from a validated trace; read-only afterward. Queries are
/// deterministic and repeatable, and distinct trains share nothing, so
/// separate `TrainPath`s can be built and queried in parallel.
#[derive(Debug)]
pub struct TrainPath {
    pub(crate) train_id: u32,
    pub(crate) time_frame: u64,
    pub(crate) cell_size: f64,
    pub(crate) trace: TrainTrace,
    pub(crate) states: Vec<TrainState>,
    pub(crate) state_by_tick: BTreeMap<u64, usize>,
    pub(crate) movements: Vec<Movement>,
    pub(crate) movement_by_tick: BTreeMap<u64, usize>,
    pub(crate) route_path: String,
    pub(crate) first_real: usize,
}

impl TrainPath {
    /// Synthesize the full timeline `0..=time_frame` for one train.
    ///
    /// `cell_size` scales cell units to absolute pixels in every emitted path
    /// string. Fails fast on inconsistent traces (diagonal steps, missing
    /// curve pairs, a train that never departs).
    #[tracing::instrument(skip(catalog, trace), fields(train = train_id))]
    pub fn build(
        catalog: &CurveCatalog,
        train_id: u32,
        trace: TrainTrace,
        time_frame: u64,
        cell_size: f64,
    ) -> RailmotionResult<Self> {
        let (mut states, state_by_tick, mut movements, movement_by_tick) =
            build_states(train_id, &trace, time_frame)?;
        let (route_path, first_real) =
            build_segments(catalog, train_id, &mut states, cell_size)?;
        resolve_movement_endpoints(train_id, &mut movements, &state_by_tick)?;
        tracing::debug!(
            states = states.len(),
            movements = movements.len(),
            "train path built"
        );
        Ok(Self {
            train_id,
            time_frame,
            cell_size,
            trace,
            states,
            state_by_tick,
            movements,
            movement_by_tick,
            route_path,
            first_real,
        })
    }

    pub fn train_id(&self) -> u32 {
        self.train_id
    }

    pub fn time_frame(&self) -> u64 {
        self.time_frame
    }

    pub fn speed(&self) -> u64 {
        self.trace.speed
    }

    /// Concatenated static path of the whole route, for preview rendering.
    pub fn route_path(&self) -> &str {
        &self.route_path
    }

    /// Path string and progress-fraction window to display at `tick`.
    ///
    /// Ticks inside a movement span get that movement's cached motion path;
    /// all other ticks get a near-zero-length wait path at the covering
    /// state's cell with window `[0, 1]`. `NotYetDeparted` ticks borrow the
    /// next placed state's wait path (the train is shown parked at its
    /// departure cell, oriented toward its first move), and ticks before the
    /// trace begins default to the first placed state.
    pub fn motion_info(&self, tick: u64) -> RailmotionResult<(String, [f64; 2])> {
        if let Some(&idx) = self.movement_by_tick.get(&tick) {
            return self.movements[idx].motion_info(&self.states, self.cell_size, tick);
        }

        let state = match self.state_by_tick.get(&tick) {
            None => &self.states[self.first_real],
            Some(&idx) if self.states[idx].status == TrainStatus::NotYetDeparted => {
                self.next_placed_state(idx)
            }
            Some(&idx) => &self.states[idx],
        };
        let position = state.position.ok_or_else(|| {
            RailmotionError::trace(format!(
                "train {}: state at timestep {} has no cell for its wait path",
                self.train_id, state.timestep
            ))
        })?;
        let rotation = state.display_rotation.unwrap_or(state.rotation);
        let segment = wait_path(rotation, state.center_offset)?.translate(position.to_vec2());
        Ok((segment.standalone_path(self.cell_size), [0.0, 1.0]))
    }

    /// First state at or after `idx` that sits on the grid.
    fn next_placed_state(&self, idx: usize) -> &TrainState {
        self.states[idx + 1..]
            .iter()
            .find(|s| s.status != TrainStatus::NotYetDeparted && s.position.is_some())
            .unwrap_or(&self.states[self.first_real])
    }
}

type StatePass = (
    Vec<TrainState>,
    BTreeMap<u64, usize>,
    Vec<Movement>,
    BTreeMap<u64, usize>,
);

/// Pass one: run-length compress the trace into states and open a movement
/// for every tick that starts a move action, then synthesize the arrival and
/// parked states the trace never reports.
fn build_states(train_id: u32, trace: &TrainTrace, time_frame: u64) -> RailmotionResult<StatePass> {
    let mut states: Vec<TrainState> = Vec::new();
    let mut state_by_tick = BTreeMap::new();
    let mut movements: Vec<Movement> = Vec::new();
    let mut movement_by_tick = BTreeMap::new();

    for tick in 0..=time_frame {
        let Some(step) = trace.step(tick) else {
            continue;
        };

        if step.status == TrainStatus::NotYetDeparted {
            // One state per tick, never merged; the move action (if any) has
            // not taken effect yet.
            let mut state =
                TrainState::new(tick, step.position, step.status, step.direction.degrees());
            state.display_rotation = Some(state.rotation);
            states.push(state);
            state_by_tick.insert(tick, states.len() - 1);
            continue;
        }

        let Some(position) = step.position else {
            // Off the map without a departure status: hold last known state.
            continue;
        };

        let merged = matches!(
            states.last(),
            Some(last)
                if last.position == Some(position)
                    && last.status == step.status
                    && last.status != TrainStatus::NotYetDeparted
        );
        if merged {
            if let Some(last) = states.last_mut() {
                last.duration += 1;
            }
        } else {
            states.push(TrainState::new(
                tick,
                Some(position),
                step.status,
                step.direction.degrees(),
            ));
        }
        state_by_tick.insert(tick, states.len() - 1);

        if !movement_by_tick.contains_key(&tick)
            && step.action.is_some_and(|a| a.is_move())
        {
            let movement = Movement::new(tick, trace.speed);
            movements.push(movement);
            for covered in tick..tick + trace.speed {
                movement_by_tick.insert(covered, movements.len() - 1);
            }
        }
    }

    // The trace never reports the train occupying its target cell.
    let last = states.last().ok_or_else(|| {
        RailmotionError::trace(format!("train {train_id}: trace contains no usable timesteps"))
    })?;
    let arrive_tick = last.timestep + last.duration;
    let last_position = last.position.ok_or_else(|| {
        RailmotionError::trace(format!(
            "train {train_id}: train never enters the grid, cannot synthesize arrival"
        ))
    })?;
    let destination = trace.end.position;
    let rotation = Direction::between(last_position, destination)
        .map_err(|e| {
            RailmotionError::geometry(format!(
                "train {train_id}: arrival step at timestep {arrive_tick}: {e}"
            ))
        })?
        .degrees();

    let mut arrival = TrainState::new(arrive_tick, Some(destination), TrainStatus::Arrived, rotation);
    arrival.display_rotation = Some(rotation);
    states.push(arrival);
    state_by_tick.insert(arrive_tick, states.len() - 1);

    if arrive_tick < time_frame {
        let park_tick = arrive_tick + 1;
        let mut parked =
            TrainState::new(park_tick, Some(destination), TrainStatus::Parked, rotation);
        parked.duration = time_frame - park_tick + 1;
        parked.display_rotation = Some(rotation);
        states.push(parked);
        for tick in park_tick..=time_frame {
            state_by_tick.insert(tick, states.len() - 1);
        }
    }

    Ok((states, state_by_tick, movements, movement_by_tick))
}

/// Pass two (geometry): attach curve segments to each state and concatenate
/// the full-route preview path.
fn build_segments(
    catalog: &CurveCatalog,
    train_id: u32,
    states: &mut [TrainState],
    cell_size: f64,
) -> RailmotionResult<(String, usize)> {
    let first_real = states
        .iter()
        .position(|s| s.status != TrainStatus::NotYetDeparted)
        .ok_or_else(|| {
            RailmotionError::trace(format!("train {train_id}: train never departs"))
        })?;

    let mut route = String::new();
    for i in first_real..states.len() {
        let status = states[i].status;
        let rotation = states[i].rotation;
        let timestep = states[i].timestep;

        if i == first_real {
            // The train has not entered this cell from anywhere; only the way
            // out of the departure cell exists.
            let position = placed(train_id, &states[i])?;
            let dir = Direction::from_degrees(rotation)?;
            let entry = catalog.lookup(dir, dir)?;
            let outgoing = entry.outgoing.translate(position.to_vec2());
            route = outgoing.standalone_path(cell_size);
            states[i].display_rotation = Some(rotation);
            states[i].outgoing = Some(outgoing);
            continue;
        }

        match status {
            TrainStatus::Waiting => {
                // No new geometry; keep showing the previous state's curve.
                let prev_rotation = states[i - 1].display_rotation;
                let prev_offset = states[i - 1].center_offset;
                if let Some(rot) = prev_rotation {
                    states[i].display_rotation = Some(rot);
                    states[i].center_offset = prev_offset;
                } else {
                    states[i].display_rotation = Some(rotation);
                }
            }
            TrainStatus::Arrived => {
                let position = placed(train_id, &states[i])?;
                let dir = Direction::from_degrees(rotation)?;
                let entry = catalog.lookup(dir, dir)?;
                let incoming = entry.incoming.translate(position.to_vec2());
                route.push_str(&incoming.segment_path(cell_size));
                states[i].display_rotation = Some(rotation);
                states[i].center_offset = entry.mid;
                states[i].incoming = Some(incoming);
                // Nothing to traverse after arrival.
                break;
            }
            _ => {
                let position = placed(train_id, &states[i])?;
                // Sub-tick states of a slow train repeat the same cell; the
                // exit direction comes from the next cell actually entered.
                let mut j = i + 1;
                let next_position = loop {
                    let Some(next) = states.get(j) else {
                        return Err(RailmotionError::trace(format!(
                            "train {train_id}: no successor cell after timestep {timestep}"
                        )));
                    };
                    if next.position != Some(position) {
                        break placed(train_id, next)?;
                    }
                    j += 1;
                };

                let entry_dir = Direction::from_degrees(rotation)?;
                let exit_dir = Direction::between(position, next_position).map_err(|e| {
                    RailmotionError::geometry(format!(
                        "train {train_id}: step at timestep {timestep}: {e}"
                    ))
                })?;
                let entry = catalog.lookup(entry_dir, exit_dir).map_err(|e| {
                    RailmotionError::geometry(format!(
                        "train {train_id}: timestep {timestep}: {e}"
                    ))
                })?;
                tracing::trace!(
                    timestep,
                    ?entry_dir,
                    ?exit_dir,
                    "attaching curve segments"
                );

                let incoming = entry.incoming.translate(position.to_vec2());
                let outgoing = entry.outgoing.translate(position.to_vec2());
                route.push_str(&incoming.segment_path(cell_size));
                route.push_str(&outgoing.standalone_path(cell_size));
                states[i].display_rotation = Some(entry.rotation);
                states[i].center_offset = entry.mid;
                states[i].incoming = Some(incoming);
                states[i].outgoing = Some(outgoing);
            }
        }
    }

    Ok((route, first_real))
}

fn placed(train_id: u32, state: &TrainState) -> RailmotionResult<GridCell> {
    state.position.ok_or_else(|| {
        RailmotionError::trace(format!(
            "train {train_id}: state at timestep {} has no grid cell",
            state.timestep
        ))
    })
}

/// Pass two (linking): resolve each movement's source and destination state
/// indices from the tick table.
fn resolve_movement_endpoints(
    train_id: u32,
    movements: &mut [Movement],
    state_by_tick: &BTreeMap<u64, usize>,
) -> RailmotionResult<()> {
    for movement in movements {
        movement.from_state = *state_by_tick.get(&movement.start).ok_or_else(|| {
            RailmotionError::trace(format!(
                "train {train_id}: movement start at timestep {} has no state",
                movement.start
            ))
        })?;
        let end_tick = movement.start + movement.duration;
        movement.to_state = *state_by_tick.get(&end_tick).ok_or_else(|| {
            RailmotionError::trace(format!(
                "train {train_id}: movement from timestep {} has no destination state at timestep {end_tick}",
                movement.start
            ))
        })?;
    }
    Ok(())
}
