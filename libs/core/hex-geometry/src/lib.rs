//! Axial hex-grid geometry for the combat board.
//!
//! Everything here is integer arithmetic: positions are axial `(q, r)`
//! coordinates, distance is the standard hex-grid metric, and movement is
//! expressed in fixed-point "millihexes" so two simulators fed identical
//! inputs produce bit-identical tick streams. No floating point appears on
//! the hot path — determinism over a network of spectators depends on it.

use serde::{Deserialize, Serialize};

/// One fixed-point unit of movement progress per hex edge.
pub const MILLIHEXES_PER_EDGE: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HexPosition {
    pub q: i32,
    pub r: i32,
}

impl HexPosition {
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Third cube coordinate, derived rather than stored.
    pub fn s(self) -> i32 {
        -self.q - self.r
    }

    /// Standard axial/cube hex distance.
    pub fn distance_to(self, other: HexPosition) -> i32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        dq.max(dr).max(ds)
    }

    pub fn grid_bounds_check(self, width: i32, height: i32) -> bool {
        self.q >= 0 && self.q < width && self.r >= 0 && self.r < height
    }
}

/// A straight-line path of hexes from `from` to `to`, inclusive, produced by
/// cube-coordinate linear interpolation with integer rounding. Deterministic
/// for a given pair of endpoints regardless of call order.
pub fn hex_line(from: HexPosition, to: HexPosition) -> Vec<HexPosition> {
    let steps = from.distance_to(to);
    if steps == 0 {
        return vec![from];
    }
    (0..=steps)
        .map(|i| lerp_round(from, to, i, steps))
        .collect()
}

fn lerp_round(from: HexPosition, to: HexPosition, step: i32, total_steps: i32) -> HexPosition {
    // Scale by MILLIHEXES_PER_EDGE before dividing so the interpolation stays
    // integer-only; `total_steps` is always >= 1 here.
    let scale = MILLIHEXES_PER_EDGE;
    let t_q = (from.q as i64 * scale) + ((to.q - from.q) as i64 * scale * step as i64) / total_steps as i64;
    let t_r = (from.r as i64 * scale) + ((to.r - from.r) as i64 * scale * step as i64) / total_steps as i64;
    let t_s = -(t_q + t_r);
    cube_round(t_q, t_r, t_s, scale)
}

fn cube_round(q: i64, r: i64, s: i64, scale: i64) -> HexPosition {
    let mut rq = round_div(q, scale);
    let mut rr = round_div(r, scale);
    let mut rs = round_div(s, scale);

    // Compare rounding error in scaled (millihex) units to stay integer-only.
    let q_diff = (rq * scale - q).abs();
    let r_diff = (rr * scale - r).abs();
    let s_diff = (rs * scale - s).abs();

    if q_diff > r_diff && q_diff > s_diff {
        rq = -rr - rs;
    } else if r_diff > s_diff {
        rr = -rq - rs;
    } else {
        rs = -rq - rr;
    }
    let _ = rs;
    HexPosition::new(rq as i32, rr as i32)
}

fn round_div(n: i64, d: i64) -> i64 {
    if n >= 0 {
        (n + d / 2) / d
    } else {
        -((-n + d / 2) / d)
    }
}

/// Fixed-point movement budget accumulated by a unit each tick. `speed` is
/// hexes-per-second scaled by `MILLIHEXES_PER_EDGE`; `tick_duration_ms` is the
/// simulator's nominal tick length.
pub fn millihexes_per_tick(speed_hexes_per_second: u32, tick_duration_ms: u32) -> i64 {
    (speed_hexes_per_second as i64 * MILLIHEXES_PER_EDGE * tick_duration_ms as i64) / 1000
}

/// Advances `progress` (in millihexes) toward `path`, returning the new
/// position and leftover progress. `path` must start at the unit's current
/// position (as returned by `hex_line`).
pub fn advance_along_path(path: &[HexPosition], mut progress: i64, budget: i64) -> (HexPosition, i64) {
    if path.len() <= 1 {
        return (path.first().copied().unwrap_or(HexPosition::new(0, 0)), 0);
    }
    progress += budget;
    let mut index = 0usize;
    while index + 1 < path.len() && progress >= MILLIHEXES_PER_EDGE {
        progress -= MILLIHEXES_PER_EDGE;
        index += 1;
    }
    (path[index], progress)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_symmetric_and_zero_at_origin() {
        let a = HexPosition::new(1, 2);
        let b = HexPosition::new(10, 2);
        assert_eq!(a.distance_to(b), b.distance_to(a));
        assert_eq!(a.distance_to(a), 0);
        assert_eq!(a.distance_to(b), 9);
    }

    #[test]
    fn hex_line_starts_and_ends_at_endpoints() {
        let from = HexPosition::new(0, 0);
        let to = HexPosition::new(4, -2);
        let line = hex_line(from, to);
        assert_eq!(line.first().copied(), Some(from));
        assert_eq!(line.last().copied(), Some(to));
        assert_eq!(line.len() as i32, from.distance_to(to) + 1);
    }

    #[test]
    fn advance_along_path_is_deterministic() {
        let path = hex_line(HexPosition::new(0, 0), HexPosition::new(3, 0));
        let budget = millihexes_per_tick(5, 16);
        let mut progress = 0i64;
        let mut position = path[0];
        for _ in 0..200 {
            let (next_position, next_progress) = advance_along_path(&path, progress, budget);
            position = next_position;
            progress = next_progress;
        }
        assert_eq!(position, *path.last().unwrap());
    }

    proptest::proptest! {
        #[test]
        fn distance_is_always_nonnegative(q1: i32, r1: i32, q2: i32, r2: i32) {
            let a = HexPosition::new(q1 % 1000, r1 % 1000);
            let b = HexPosition::new(q2 % 1000, r2 % 1000);
            proptest::prop_assert!(a.distance_to(b) >= 0);
        }
    }
}
