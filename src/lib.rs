#![forbid(unsafe_code)]

pub mod catalog;
pub mod display;
pub mod error;
pub mod geom;
pub mod trace;
pub mod train;

pub use catalog::{CurveCatalog, CurveEntry, wait_path};
pub use display::{DisplayInfo, Signal, TrainPlayback};
pub use error::{RailmotionError, RailmotionResult};
pub use geom::{CurveSegment, Direction, GridCell};
pub use trace::{EndRecord, StartRecord, TraceStep, TrainAction, TrainStatus, TrainTrace};
pub use train::TrainPath;
