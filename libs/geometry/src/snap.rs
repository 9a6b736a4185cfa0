//! Snapping utilities (eg. snap to a grid).

/// Snaps `pos` to the nearest multiple of `grid`.
///
/// Positions exactly halfway between two grid points are snapped down.
///
/// # Examples
///
/// ```
/// use geometry::snap::snap_to_grid;
///
/// assert_eq!(snap_to_grid(12, 5), 10);
/// assert_eq!(snap_to_grid(13, 5), 15);
/// assert_eq!(snap_to_grid(-13, 5), -15);
/// ```
pub const fn snap_to_grid(pos: i64, grid: i64) -> i64 {
    assert!(grid > 0);
    let rem = pos.rem_euclid(grid);
    if rem <= grid / 2 {
        pos - rem
    } else {
        pos + grid - rem
    }
}

