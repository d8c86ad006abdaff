//! Input trace model and one-shot validation.
//!
//! The simulation stepper emits one JSON record per train: a start record, an
//! end record, the train speed (ticks per cell traversed), and a per-timestep
//! path map. Everything stringly typed in the wire format is resolved into
//! enums here, once, so the synthesis passes never touch raw JSON.

use std::collections::BTreeMap;

use crate::error::{RailmotionError, RailmotionResult};
use crate::geom::{Direction, GridCell};

/// Action commanded for a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainAction {
    MoveForward,
    MoveRight,
    MoveLeft,
    Wait,
}

impl TrainAction {
    /// True for actions that traverse into another cell.
    pub fn is_move(self) -> bool {
        !matches!(self, Self::Wait)
    }
}

/// Train lifecycle stage.
///
/// Input and output wire names follow the simulator. `Arrived` and `Parked`
/// never appear in the input; they are synthesized because the trace stops
/// reporting a train once it reaches its target cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum TrainStatus {
    #[serde(rename = "READY_TO_DEPART")]
    NotYetDeparted,
    #[serde(rename = "WAITING")]
    Waiting,
    #[serde(rename = "MOVING")]
    Moving,
    #[serde(rename = "STOPPED")]
    Stopped,
    #[serde(rename = "ARRIVED")]
    Arrived,
    #[serde(rename = "PARKED")]
    Parked,
}

/// Raw wire status, including the malfunction statuses the simulator can
/// report. Folded into [`TrainStatus`] during validation.
#[derive(Clone, Copy, Debug, serde::Deserialize)]
enum RawStatus {
    #[serde(rename = "WAITING")]
    Waiting,
    #[serde(rename = "READY_TO_DEPART")]
    ReadyToDepart,
    #[serde(rename = "MOVING")]
    Moving,
    #[serde(rename = "STOPPED")]
    Stopped,
    #[serde(rename = "MALFUNCTION")]
    Malfunction,
    #[serde(rename = "MALFUNCTION_OFF_MAP")]
    MalfunctionOffMap,
    #[serde(rename = "DONE")]
    Done,
}

impl RawStatus {
    fn resolve(self) -> TrainStatus {
        match self {
            Self::Waiting => TrainStatus::Waiting,
            Self::ReadyToDepart => TrainStatus::NotYetDeparted,
            Self::Moving => TrainStatus::Moving,
            // A malfunctioning train is simply halted where it stands.
            Self::Stopped | Self::Malfunction => TrainStatus::Stopped,
            Self::MalfunctionOffMap => TrainStatus::NotYetDeparted,
            Self::Done => TrainStatus::Arrived,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct RawTrain {
    start: StartRecord,
    end: EndRecord,
    speed: u64,
    path: BTreeMap<u64, RawStep>,
}

#[derive(Debug, serde::Deserialize)]
struct RawStep {
    state: RawStepState,
    status: RawStatus,
    action: Option<TrainAction>,
}

#[derive(Debug, serde::Deserialize)]
struct RawStepState {
    position: Option<GridCell>,
    direction: Direction,
}

/// Departure cell, earliest departure tick, and initial facing direction.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct StartRecord {
    pub position: GridCell,
    pub min_start: u64,
    pub direction: Direction,
}

/// Target cell and latest arrival tick.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct EndRecord {
    pub position: GridCell,
    pub max_end: u64,
}

/// One validated tick of the trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceStep {
    /// Occupied cell; `None` while the train is off the map.
    pub position: Option<GridCell>,
    pub direction: Direction,
    pub status: TrainStatus,
    pub action: Option<TrainAction>,
}

/// Validated per-train trace. Ticks absent from the map are not an error;
/// synthesis treats them as "hold last known state".
#[derive(Clone, Debug)]
pub struct TrainTrace {
    pub start: StartRecord,
    pub end: EndRecord,
    pub speed: u64,
    steps: BTreeMap<u64, TraceStep>,
}

impl TrainTrace {
    /// Parse and validate one train's trace from its JSON record.
    pub fn from_json(input: &str) -> RailmotionResult<Self> {
        let raw: RawTrain = serde_json::from_str(input)
            .map_err(|e| RailmotionError::serde(format!("invalid train trace: {e}")))?;
        Self::from_raw(raw)
    }

    /// Parse and validate from an already-decoded JSON value.
    pub fn from_value(value: serde_json::Value) -> RailmotionResult<Self> {
        let raw: RawTrain = serde_json::from_value(value)
            .map_err(|e| RailmotionError::serde(format!("invalid train trace: {e}")))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawTrain) -> RailmotionResult<Self> {
        if raw.speed == 0 {
            return Err(RailmotionError::trace("train speed must be >= 1"));
        }
        let steps = raw
            .path
            .into_iter()
            .map(|(tick, step)| {
                (
                    tick,
                    TraceStep {
                        position: step.state.position,
                        direction: step.state.direction,
                        status: step.status.resolve(),
                        action: step.action,
                    },
                )
            })
            .collect();
        Ok(Self {
            start: raw.start,
            end: raw.end,
            speed: raw.speed,
            steps,
        })
    }

    pub fn step(&self, tick: u64) -> Option<&TraceStep> {
        self.steps.get(&tick)
    }

    pub fn action_at(&self, tick: u64) -> Option<TrainAction> {
        self.steps.get(&tick).and_then(|s| s.action)
    }

    pub fn position_at(&self, tick: u64) -> Option<GridCell> {
        self.steps.get(&tick).and_then(|s| s.position)
    }

    /// Last tick present in the trace map, if any.
    pub fn last_tick(&self) -> Option<u64> {
        self.steps.keys().next_back().copied()
    }
}
