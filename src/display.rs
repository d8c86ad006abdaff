//! Per-timestep display records for the renderer.
//!
//! The aggregation layer on top of [`TrainPath`]: for every tick it bundles
//! the resolved motion path and keypoint window with the action, status,
//! raw position, wait-signal color, and status-dependent opacity fade.

use std::collections::BTreeMap;

use crate::error::RailmotionResult;
use crate::trace::{TrainAction, TrainStatus};
use crate::train::TrainPath;

/// Wait-signal color shown next to a held train.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Red,
    Green,
}

/// Everything the renderer needs to animate one train for one tick.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayInfo {
    pub action: Option<TrainAction>,
    pub status: TrainStatus,
    /// Raw trace coordinate as `"x,y"`; `None` while untracked.
    pub position: Option<String>,
    /// SVG path data for this tick's animation.
    pub motion_path: String,
    pub signal: Option<Signal>,
    /// Opacity fade `[from, to]` across the tick.
    pub opacity: [f64; 2],
    /// Progress-fraction window as `"start;end"`.
    pub key_points: String,
}

/// Opacity fade for a status: parked trains are invisible, arrivals fade
/// out, departures fade in, everything else is fully visible.
fn opacity_for(status: TrainStatus) -> [f64; 2] {
    match status {
        TrainStatus::Parked => [0.0, 0.0],
        TrainStatus::Arrived => [1.0, 0.0],
        TrainStatus::NotYetDeparted => [0.0, 1.0],
        _ => [1.0, 1.0],
    }
}

/// One train's complete playback data, the unit the SVG/HTML renderer
/// consumes: every per-tick record plus the static full-route preview path.
#[derive(Clone, Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainPlayback {
    pub train_id: u32,
    pub route_path: String,
    pub states: BTreeMap<u64, DisplayInfo>,
}

impl TrainPath {
    /// Display record for one tick.
    ///
    /// Ticks with no covering state (outside the tracked timeline) report
    /// status `Parked`. The signal only exists for `wait` actions: red while
    /// the train stays held next tick, green when it is cleared to move.
    pub fn display_info(&self, tick: u64) -> RailmotionResult<DisplayInfo> {
        let status = self
            .state_by_tick
            .get(&tick)
            .map(|&idx| self.states[idx].status)
            .unwrap_or(TrainStatus::Parked);
        let (motion_path, window) = self.motion_info(tick)?;

        let action = self.trace.action_at(tick);
        let signal = match action {
            Some(TrainAction::Wait) => {
                if self.trace.action_at(tick + 1) == Some(TrainAction::Wait) {
                    Some(Signal::Red)
                } else {
                    Some(Signal::Green)
                }
            }
            _ => None,
        };

        Ok(DisplayInfo {
            action,
            status,
            position: self.trace.position_at(tick).map(|cell| cell.to_string()),
            motion_path,
            signal,
            opacity: opacity_for(status),
            key_points: format!("{};{}", window[0], window[1]),
        })
    }

    /// Display records for the whole timeline `0..=time_frame`.
    pub fn display_states(&self) -> RailmotionResult<BTreeMap<u64, DisplayInfo>> {
        (0..=self.time_frame)
            .map(|tick| Ok((tick, self.display_info(tick)?)))
            .collect()
    }

    /// Bundle the timeline and route path for the renderer.
    pub fn playback(&self) -> RailmotionResult<TrainPlayback> {
        Ok(TrainPlayback {
            train_id: self.train_id,
            route_path: self.route_path.clone(),
            states: self.display_states()?,
        })
    }
}
