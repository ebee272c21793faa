//! Shared test utilities for matrix-based unit tests.

use crate::matrix::BrightnessMatrix;

/// Render a synthetic reflection spot.
///
/// Pixels at distance `d` from `center` satisfy:
/// - `spot_pix`  if `d <= radius`
/// - `bg_pix`    otherwise
pub(crate) fn draw_spot_image(
    w: usize,
    h: usize,
    center: [f64; 2],
    radius: f64,
    spot_pix: u8,
    bg_pix: u8,
) -> BrightnessMatrix {
    BrightnessMatrix::from_fn(w, h, |x, y| {
        let d = (x as f64 - center[0]).hypot(y as f64 - center[1]);
        if d <= radius {
            spot_pix
        } else {
            bg_pix
        }
    })
}
