// Angle primitives on the 360° circle
//
// Every angle in this crate is in degrees. Raw samples, targets and offsets can
// be any real value; these helpers bring them back onto the circle.

/// Degrees in one full revolution
pub const FULL_TURN: f64 = 360.0;
const HALF_TURN: f64 = 180.0;

/// Reduce any angle into [0, 360)
///
/// Works for negative inputs and for inputs many turns away from zero.
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(FULL_TURN);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= FULL_TURN { 0.0 } else { wrapped }
}

/// Signed shortest-path difference `b - a`, in (-180, 180]
///
/// `angle_difference(359.0, 1.0)` is `2.0`, not `-358.0`.
pub fn angle_difference(a: f64, b: f64) -> f64 {
    let mut diff = (b - a).rem_euclid(FULL_TURN);
    if diff > HALF_TURN {
        diff -= FULL_TURN;
    } else if diff <= -HALF_TURN {
        diff += FULL_TURN;
    }
    diff
}

/// Mirror an angle through 0 (`x` becomes `-x` on the circle)
pub fn reflect_angle(angle: f64) -> f64 {
    angle_difference(angle, 0.0)
}
