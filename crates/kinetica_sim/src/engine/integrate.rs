//! # Integration
//!
//! Explicit position update, `p += v * dt`, run after collision response so
//! positions advance with the corrected velocities. No clamping happens
//! here; walls are handled by reflection in the solve phase.

/// Advances every position in the range by its velocity.
///
/// All four slices must have the same length. Written as a flat zip so the
/// loop auto-vectorises.
#[inline]
pub(crate) fn integrate_range(
    pos_x: &mut [f32],
    pos_y: &mut [f32],
    vel_x: &[f32],
    vel_y: &[f32],
    dt: f32,
) {
    debug_assert!(pos_y.len() == pos_x.len());
    debug_assert!(vel_x.len() == pos_x.len() && vel_y.len() == pos_x.len());

    for (p, v) in pos_x.iter_mut().zip(vel_x) {
        *p += v * dt;
    }
    for (p, v) in pos_y.iter_mut().zip(vel_y) {
        *p += v * dt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_advance_by_velocity() {
        let mut xs = [0.0, 10.0, -5.0];
        let mut ys = [1.0, 1.0, 1.0];
        integrate_range(&mut xs, &mut ys, &[10.0, -10.0, 0.0], &[0.0, 5.0, -5.0], 0.5);

        assert_eq!(xs, [5.0, 5.0, -5.0]);
        assert_eq!(ys, [1.0, 3.5, -1.5]);
    }

    #[test]
    fn test_zero_dt_is_identity() {
        let mut xs = [3.0; 4];
        let mut ys = [4.0; 4];
        integrate_range(&mut xs, &mut ys, &[99.0; 4], &[-99.0; 4], 0.0);
        assert_eq!(xs, [3.0; 4]);
        assert_eq!(ys, [4.0; 4]);
    }
}
