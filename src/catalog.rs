//! Static catalog of per-cell curve geometry.
//!
//! Every valid (entry-direction, exit-direction) pair maps to the pair of
//! bezier segments a train follows through one cell: an incoming segment from
//! the entry edge to the cell midpoint and an outgoing segment from the
//! midpoint to the exit edge. Quarter turns approximate a circular arc of
//! radius 0.5 cells; straights are two half-cell lines. Segment endpoints sit
//! on cell-edge midpoints so paths concatenate seamlessly across cells.

use kurbo::{Point, Vec2};

use crate::error::{RailmotionError, RailmotionResult};
use crate::geom::{CurveSegment, Direction};

// Quarter-circle approximation, radius 0.5 cells. The arc midpoint sits at
// (1/sqrt(2)) of the radius along both axes, i.e. 0.5 - 0.35355 = 0.14645
// cells from the cell center. Control offsets were measured graphically.
const MID: f64 = 0.14645;
const ARC: f64 = 0.35355;
const TANGENT: f64 = 0.09377;
const CHORD: f64 = 0.22095;

const CELL_CENTER: Point = Point::new(0.5, 0.5);

/// Wait paths must not be zero-length (animation players reject them) but
/// should stay invisible at any practical cell size.
const WAIT_PATH_SCALE: f64 = 1e-4;

/// Geometry for one (entry, exit) direction pair.
#[derive(Clone, Debug, PartialEq)]
pub struct CurveEntry {
    /// Entry edge to cell midpoint.
    pub incoming: CurveSegment,
    /// Cell midpoint to exit edge.
    pub outgoing: CurveSegment,
    /// Midpoint offset from the cell center (zero for straights).
    pub mid: Vec2,
    /// Train display rotation at the midpoint, in degrees.
    pub rotation: u16,
}

impl CurveEntry {
    /// Entry for the reversed traversal: segments swapped and reversed,
    /// rotation turned by 180 degrees, midpoint unchanged.
    fn mirrored(&self) -> Self {
        Self {
            incoming: self.outgoing.reversed(),
            outgoing: self.incoming.reversed(),
            mid: self.mid,
            rotation: (self.rotation + 180) % 360,
        }
    }
}

/// Incoming segment: placed relative to the arc midpoint, which itself is
/// placed relative to the cell center.
fn incoming(mid: Vec2, start: Vec2, c0: Vec2, c1: Vec2) -> CurveSegment {
    let mid = CELL_CENTER + mid;
    CurveSegment::curve(mid + start, mid, mid + c0, mid + c1)
}

fn outgoing(mid: Vec2, end: Vec2, c0: Vec2, c1: Vec2) -> CurveSegment {
    let mid = CELL_CENTER + mid;
    CurveSegment::curve(mid, mid + end, mid + c0, mid + c1)
}

/// Read-only curve table keyed by ordered (entry, exit) direction pairs.
///
/// 16 slots, 12 populated: four canonical quarter turns, two canonical
/// straights, and six mirrors derived mechanically. The four direct-reversal
/// pairs (n->s etc.) stay empty; a rail cell cannot invert direction, so a
/// lookup for one is a programming error upstream.
///
/// Built once at process start and injected wherever needed; never mutated.
#[derive(Clone, Debug)]
pub struct CurveCatalog {
    entries: [Option<CurveEntry>; 16],
}

impl CurveCatalog {
    /// Build the standard catalog from the fixed quarter-circle constants.
    pub fn standard() -> Self {
        let canonical: [(Direction, Direction, CurveEntry); 6] = [
            (
                Direction::North,
                Direction::East,
                CurveEntry {
                    incoming: incoming(
                        Vec2::new(MID, MID),
                        Vec2::new(-MID, ARC),
                        Vec2::new(-MID, CHORD),
                        Vec2::new(-TANGENT, TANGENT),
                    ),
                    outgoing: outgoing(
                        Vec2::new(MID, MID),
                        Vec2::new(ARC, -MID),
                        Vec2::new(TANGENT, -TANGENT),
                        Vec2::new(CHORD, -MID),
                    ),
                    mid: Vec2::new(MID, MID),
                    rotation: 45,
                },
            ),
            (
                Direction::North,
                Direction::West,
                CurveEntry {
                    incoming: incoming(
                        Vec2::new(-MID, MID),
                        Vec2::new(MID, ARC),
                        Vec2::new(MID, CHORD),
                        Vec2::new(TANGENT, TANGENT),
                    ),
                    outgoing: outgoing(
                        Vec2::new(-MID, MID),
                        Vec2::new(-ARC, -MID),
                        Vec2::new(-TANGENT, -TANGENT),
                        Vec2::new(-CHORD, -MID),
                    ),
                    mid: Vec2::new(-MID, MID),
                    rotation: 315,
                },
            ),
            (
                Direction::South,
                Direction::East,
                CurveEntry {
                    incoming: incoming(
                        Vec2::new(MID, -MID),
                        Vec2::new(-MID, -ARC),
                        Vec2::new(-MID, -CHORD),
                        Vec2::new(-TANGENT, -TANGENT),
                    ),
                    outgoing: outgoing(
                        Vec2::new(MID, -MID),
                        Vec2::new(ARC, MID),
                        Vec2::new(TANGENT, TANGENT),
                        Vec2::new(CHORD, MID),
                    ),
                    mid: Vec2::new(MID, -MID),
                    rotation: 135,
                },
            ),
            (
                Direction::South,
                Direction::West,
                CurveEntry {
                    incoming: incoming(
                        Vec2::new(-MID, -MID),
                        Vec2::new(MID, -ARC),
                        Vec2::new(MID, -CHORD),
                        Vec2::new(TANGENT, -TANGENT),
                    ),
                    outgoing: outgoing(
                        Vec2::new(-MID, -MID),
                        Vec2::new(-ARC, MID),
                        Vec2::new(-TANGENT, TANGENT),
                        Vec2::new(-CHORD, MID),
                    ),
                    mid: Vec2::new(-MID, -MID),
                    rotation: 225,
                },
            ),
            (
                Direction::North,
                Direction::North,
                CurveEntry {
                    incoming: CurveSegment::line(Point::new(0.5, 1.0), CELL_CENTER),
                    outgoing: CurveSegment::line(CELL_CENTER, Point::new(0.5, 0.0)),
                    mid: Vec2::ZERO,
                    rotation: 0,
                },
            ),
            (
                Direction::East,
                Direction::East,
                CurveEntry {
                    incoming: CurveSegment::line(Point::new(0.0, 0.5), CELL_CENTER),
                    outgoing: CurveSegment::line(CELL_CENTER, Point::new(1.0, 0.5)),
                    mid: Vec2::ZERO,
                    rotation: 90,
                },
            ),
        ];

        let mut entries: [Option<CurveEntry>; 16] = std::array::from_fn(|_| None);
        for (entry_dir, exit_dir, entry) in canonical {
            entries[Self::slot(exit_dir.opposite(), entry_dir.opposite())] = Some(entry.mirrored());
            entries[Self::slot(entry_dir, exit_dir)] = Some(entry);
        }
        Self { entries }
    }

    fn slot(entry: Direction, exit: Direction) -> usize {
        entry.index() * 4 + exit.index()
    }

    pub fn get(&self, entry: Direction, exit: Direction) -> Option<&CurveEntry> {
        self.entries[Self::slot(entry, exit)].as_ref()
    }

    /// Look up the geometry for an (entry, exit) pair. An absent pair is an
    /// invariant violation, not a recoverable condition.
    pub fn lookup(&self, entry: Direction, exit: Direction) -> RailmotionResult<&CurveEntry> {
        self.get(entry, exit).ok_or_else(|| {
            RailmotionError::geometry(format!(
                "no curve entry for {entry:?} -> {exit:?} (direct reversal?)"
            ))
        })
    }
}

/// Direction vector for a display rotation, on the 45-degree grid.
fn rotation_offset(rotation: u16) -> RailmotionResult<Vec2> {
    let v = match rotation {
        0 => Vec2::new(0.0, -1.0),
        45 => Vec2::new(1.0, -1.0),
        90 => Vec2::new(1.0, 0.0),
        135 => Vec2::new(1.0, 1.0),
        180 => Vec2::new(0.0, 1.0),
        225 => Vec2::new(-1.0, 1.0),
        270 => Vec2::new(-1.0, 0.0),
        315 => Vec2::new(-1.0, -1.0),
        other => {
            return Err(RailmotionError::geometry(format!(
                "no offset for rotation {other}"
            )));
        }
    };
    Ok(v)
}

/// Degenerate near-zero-length path for a stationary train, anchored at the
/// cell center plus `center_offset` and pointing along `rotation`.
pub fn wait_path(rotation: u16, center_offset: Vec2) -> RailmotionResult<CurveSegment> {
    let offset = rotation_offset(rotation)? * WAIT_PATH_SCALE;
    let start = CELL_CENTER + center_offset;
    Ok(CurveSegment::line(start, start + offset))
}
