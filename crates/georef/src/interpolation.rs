//! Resampling kernels for reading the source image at fractional pixel
//! positions.
//!
//! Positions are `(x, y)` = `(col, row)` in pixel units, integers at pixel
//! centers. The warper calls [`in_bounds`] before sampling; every kernel
//! repeats the edge pixels for neighbours that fall off the image.

use crate::types::InterpolationMethod;

/// Whether `(x, y)` lies on the image: within half a pixel of the
/// outermost pixel centers, right/bottom edge exclusive.
#[inline]
pub fn in_bounds(width: usize, height: usize, x: f64, y: f64) -> bool {
    (-0.5..width as f64 - 0.5).contains(&x) && (-0.5..height as f64 - 0.5).contains(&y)
}

/// Sample `data` (row-major, `width` x `height`) at `(x, y)`.
#[inline]
pub fn interpolate(
    method: InterpolationMethod,
    data: &[f32],
    width: usize,
    height: usize,
    x: f64,
    y: f64,
) -> f32 {
    let image = Image { data, width, height };
    match method {
        InterpolationMethod::Nearest => image.at(x.round() as i64, y.round() as i64),
        InterpolationMethod::Bilinear => image.separable(x, y, 0, linear_weights),
        InterpolationMethod::Cubic => image.separable(x, y, 1, catmull_rom_weights),
    }
}

/// Borrowed view with edge-repeating access.
struct Image<'a> {
    data: &'a [f32],
    width: usize,
    height: usize,
}

impl Image<'_> {
    #[inline]
    fn at(&self, col: i64, row: i64) -> f32 {
        let c = col.clamp(0, self.width as i64 - 1) as usize;
        let r = row.clamp(0, self.height as i64 - 1) as usize;
        self.data[r * self.width + c]
    }

    /// Weighted sum over the `N x N` neighbourhood starting `before`
    /// pixels up/left of the floor position.
    fn separable<const N: usize, W>(&self, x: f64, y: f64, before: i64, weights: W) -> f32
    where
        W: Fn(f64) -> [f64; N],
    {
        let (x0, y0) = (x.floor(), y.floor());
        let wx = weights(x - x0);
        let wy = weights(y - y0);
        let (left, top) = (x0 as i64 - before, y0 as i64 - before);

        let mut acc = 0.0f64;
        for (j, &w_row) in wy.iter().enumerate() {
            if w_row == 0.0 {
                continue;
            }
            let row: f64 = wx
                .iter()
                .enumerate()
                .map(|(i, &w_col)| w_col * self.at(left + i as i64, top + j as i64) as f64)
                .sum();
            acc += w_row * row;
        }
        acc as f32
    }
}

fn linear_weights(t: f64) -> [f64; 2] {
    [1.0 - t, t]
}

/// Catmull-Rom (a = -0.5) weights for the samples at -1, 0, 1, 2.
fn catmull_rom_weights(t: f64) -> [f64; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        0.5 * (-t3 + 2.0 * t2 - t),
        0.5 * (3.0 * t3 - 5.0 * t2 + 2.0),
        0.5 * (-3.0 * t3 + 4.0 * t2 + t),
        0.5 * (t3 - t2),
    ]
}
