use std::fmt;
use std::fmt::Write as _;

use crate::error::{RailmotionError, RailmotionResult};

pub use kurbo::{Point, Vec2};

/// Grid margin around the track area, in cells. Applied when converting
/// cell-unit coordinates to absolute pixel coordinates.
pub const GRID_MARGIN_CELLS: f64 = 1.0;

/// Compass direction of travel through a cell.
///
/// Bijective with rotation degrees: n=0, e=90, s=180, w=270.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    #[serde(rename = "n")]
    North,
    #[serde(rename = "e")]
    East,
    #[serde(rename = "s")]
    South,
    #[serde(rename = "w")]
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Rotation in degrees, clockwise from north.
    pub fn degrees(self) -> u16 {
        match self {
            Self::North => 0,
            Self::East => 90,
            Self::South => 180,
            Self::West => 270,
        }
    }

    /// Inverse of [`Direction::degrees`]. Only the four cardinal rotations
    /// are valid; 45-degree display rotations have no direction.
    pub fn from_degrees(degrees: u16) -> RailmotionResult<Self> {
        match degrees {
            0 => Ok(Self::North),
            90 => Ok(Self::East),
            180 => Ok(Self::South),
            270 => Ok(Self::West),
            other => Err(RailmotionError::geometry(format!(
                "no cardinal direction for rotation {other}"
            ))),
        }
    }

    /// Table index in n, e, s, w order.
    pub fn index(self) -> usize {
        match self {
            Self::North => 0,
            Self::East => 1,
            Self::South => 2,
            Self::West => 3,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }

    /// Direction of the single-cell step from `from` to `to`.
    ///
    /// The grid y axis points south. A displacement on both axes (diagonal)
    /// or no displacement at all indicates an inconsistent trace.
    pub fn between(from: GridCell, to: GridCell) -> RailmotionResult<Self> {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        if dx != 0 && dy != 0 {
            return Err(RailmotionError::geometry(format!(
                "diagonal displacement from {from} to {to}"
            )));
        }
        if dx > 0 {
            Ok(Self::East)
        } else if dx < 0 {
            Ok(Self::West)
        } else if dy > 0 {
            Ok(Self::South)
        } else if dy < 0 {
            Ok(Self::North)
        } else {
            Err(RailmotionError::geometry(format!(
                "no displacement between identical cells {from}"
            )))
        }
    }
}

/// Integer grid coordinate as reported by the simulation trace.
///
/// Fractional geometry (curve points) lives in [`kurbo::Point`]; this type is
/// only the cell address a train occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct GridCell {
    pub x: i64,
    pub y: i64,
}

impl GridCell {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Translation offset that moves cell-local geometry into this cell.
    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x as f64, self.y as f64)
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Round to 5 decimal places for compact SVG output.
fn round5(v: f64) -> f64 {
    (v * 1e5).round() / 1e5
}

/// Convert a cell-unit point to absolute pixel coordinates.
fn to_abs(p: Point, cell_size: f64, margin: bool) -> Point {
    let offset = if margin { GRID_MARGIN_CELLS } else { 0.0 };
    Point::new((p.x + offset) * cell_size, (p.y + offset) * cell_size)
}

/// One visual segment of a train's route through a cell: a straight line or a
/// cubic bezier, expressed in cell units relative to the grid origin.
///
/// `center` is the cell-center reference carried along so a translated segment
/// still knows which cell it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct CurveSegment {
    pub start: Point,
    pub end: Point,
    pub ctrl: Option<(Point, Point)>,
    pub center: Point,
}

impl CurveSegment {
    pub const DEFAULT_CENTER: Point = Point::new(0.5, 0.5);

    /// Straight segment within the default cell.
    pub fn line(start: Point, end: Point) -> Self {
        Self {
            start,
            end,
            ctrl: None,
            center: Self::DEFAULT_CENTER,
        }
    }

    /// Cubic bezier segment within the default cell.
    pub fn curve(start: Point, end: Point, c0: Point, c1: Point) -> Self {
        Self {
            start,
            end,
            ctrl: Some((c0, c1)),
            center: Self::DEFAULT_CENTER,
        }
    }

    /// New segment shifted by `offset` cells.
    pub fn translate(&self, offset: Vec2) -> Self {
        Self {
            start: self.start + offset,
            end: self.end + offset,
            ctrl: self.ctrl.map(|(c0, c1)| (c0 + offset, c1 + offset)),
            center: self.center + offset,
        }
    }

    /// New segment traversed in the opposite direction.
    pub fn reversed(&self) -> Self {
        Self {
            start: self.end,
            end: self.start,
            ctrl: self.ctrl.map(|(c0, c1)| (c1, c0)),
            center: self.center,
        }
    }

    /// Straight-line distance between start and end, in cell units.
    pub fn chord_length(&self) -> f64 {
        (self.end - self.start).hypot()
    }

    /// Path fragment without the initial move-to, for appending after an
    /// existing path. Keeps a trailing space so fragments concatenate.
    pub fn segment_path(&self, cell_size: f64) -> String {
        let end = to_abs(self.end, cell_size, true);
        let mut out = String::new();
        match self.ctrl {
            None => {
                let _ = write!(out, "L {} {} ", round5(end.x), round5(end.y));
            }
            Some((c0, c1)) => {
                let c0 = to_abs(c0, cell_size, true);
                let c1 = to_abs(c1, cell_size, true);
                let _ = write!(
                    out,
                    "C {} {} {} {} {} {} ",
                    round5(c0.x),
                    round5(c0.y),
                    round5(c1.x),
                    round5(c1.y),
                    round5(end.x),
                    round5(end.y)
                );
            }
        }
        out
    }

    /// Complete path anchored at the absolute start point.
    pub fn standalone_path(&self, cell_size: f64) -> String {
        let start = to_abs(self.start, cell_size, true);
        let mut out = format!("M {} {} ", round5(start.x), round5(start.y));
        out.push_str(&self.segment_path(cell_size));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_degrees_round_trip() {
        for dir in Direction::ALL {
            assert_eq!(Direction::from_degrees(dir.degrees()).unwrap(), dir);
        }
        assert!(Direction::from_degrees(45).is_err());
        assert!(Direction::from_degrees(360).is_err());
    }

    #[test]
    fn direction_between_cells() {
        let at = GridCell::new(3, 3);
        assert_eq!(
            Direction::between(at, GridCell::new(4, 3)).unwrap(),
            Direction::East
        );
        assert_eq!(
            Direction::between(at, GridCell::new(2, 3)).unwrap(),
            Direction::West
        );
        assert_eq!(
            Direction::between(at, GridCell::new(3, 4)).unwrap(),
            Direction::South
        );
        assert_eq!(
            Direction::between(at, GridCell::new(3, 2)).unwrap(),
            Direction::North
        );
    }

    #[test]
    fn diagonal_displacement_fails_fast() {
        let err = Direction::between(GridCell::new(3, 3), GridCell::new(4, 4)).unwrap_err();
        assert!(err.to_string().contains("diagonal"));
        assert!(Direction::between(GridCell::new(3, 3), GridCell::new(3, 3)).is_err());
    }

    #[test]
    fn direction_serde_uses_compass_letters() {
        assert_eq!(serde_json::to_string(&Direction::West).unwrap(), "\"w\"");
        let dir: Direction = serde_json::from_str("\"s\"").unwrap();
        assert_eq!(dir, Direction::South);
    }

    #[test]
    fn reversed_swaps_endpoints_and_controls() {
        let seg = CurveSegment::curve(
            Point::new(0.5, 1.0),
            Point::new(1.0, 0.5),
            Point::new(0.5, 0.8),
            Point::new(0.8, 0.5),
        );
        let rev = seg.reversed();
        assert_eq!(rev.start, seg.end);
        assert_eq!(rev.end, seg.start);
        assert_eq!(rev.ctrl, Some((Point::new(0.8, 0.5), Point::new(0.5, 0.8))));
        assert_eq!(rev.reversed(), seg);
    }

    #[test]
    fn translate_moves_all_points() {
        let seg = CurveSegment::line(Point::new(0.5, 1.0), Point::new(0.5, 0.5));
        let moved = seg.translate(GridCell::new(2, 3).to_vec2());
        assert_eq!(moved.start, Point::new(2.5, 4.0));
        assert_eq!(moved.end, Point::new(2.5, 3.5));
        assert_eq!(moved.center, Point::new(2.5, 3.5));
    }

    #[test]
    fn standalone_path_applies_margin_and_rounding() {
        let seg = CurveSegment::line(Point::new(0.5, 1.0), Point::new(0.5, 0.5));
        // 1-cell margin: (0.5 + 1) * 100 = 150.
        assert_eq!(seg.standalone_path(100.0), "M 150 200 L 150 150 ");
    }

    #[test]
    fn path_coordinates_round_to_five_decimals() {
        let seg = CurveSegment::line(Point::new(0.646_450_000_000_1, 0.5), Point::new(0.5, 0.5));
        let path = seg.standalone_path(100.0);
        assert!(path.starts_with("M 164.645 "), "{path}");
    }
}
