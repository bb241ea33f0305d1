//! Bipolar range folding (reflection, not wrap)
//!
//! Folding reflects an out-of-range value back into the range like a
//! triangular wave: 1.2 folded into [-1, 1] becomes 0.8, 2.4 becomes -0.4.
//! Pan positions arriving from the control bus can be arbitrarily far out of
//! range, so the reflection repeats until the value lands inside.

/// Reflect `x` into `[lo, hi]` by triangular reflection.
///
/// Total over all finite inputs. A degenerate range (`hi <= lo`) returns `lo`.
pub fn fold(x: f32, lo: f32, hi: f32) -> f32 {
    let span = hi - lo;
    if span <= 0.0 {
        return lo;
    }
    let period = 2.0 * span;
    let mut v = (x - lo) % period;
    if v < 0.0 {
        v += period;
    }
    if v > span {
        v = period - v;
    }
    lo + v
}
