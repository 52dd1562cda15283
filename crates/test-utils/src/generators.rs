//! Generators for synthetic satellite passes.
//!
//! The GCP grids produced here are affine in pixel space, so bilinear
//! interpolation between their nodes is exact and tests can compute the
//! expected geographic coordinate of any pixel analytically.

/// Affine pixel → geographic layout of a synthetic pass.
///
/// `lat = origin_lat - row * lat_per_row + col * lat_per_col`
/// `lon = origin_lon + col * lon_per_col + row * lon_per_row`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GcpGridSpec {
    /// Number of grid rows (gcpYSize).
    pub rows: usize,
    /// Number of grid columns (gcpXSize).
    pub cols: usize,
    /// Pixel spacing between grid rows (gcpYStep).
    pub row_step: usize,
    /// Pixel spacing between grid columns (gcpXStep).
    pub col_step: usize,
    pub origin_lat: f64,
    pub origin_lon: f64,
    /// Degrees of latitude lost per pixel row.
    pub lat_per_row: f64,
    /// Degrees of longitude gained per pixel column.
    pub lon_per_col: f64,
    /// Latitude drift per pixel column (track skew).
    pub lat_per_col: f64,
    /// Longitude drift per pixel row (track skew).
    pub lon_per_row: f64,
}

impl GcpGridSpec {
    /// North-up grid without skew.
    pub fn north_up(
        rows: usize,
        cols: usize,
        row_step: usize,
        col_step: usize,
        origin: (f64, f64),
        deg_per_px: (f64, f64),
    ) -> Self {
        Self {
            rows,
            cols,
            row_step,
            col_step,
            origin_lat: origin.0,
            origin_lon: origin.1,
            lat_per_row: deg_per_px.0,
            lon_per_col: deg_per_px.1,
            lat_per_col: 0.0,
            lon_per_row: 0.0,
        }
    }

    /// Add a track skew, as seen on inclined orbits.
    pub fn with_skew(mut self, lat_per_col: f64, lon_per_row: f64) -> Self {
        self.lat_per_col = lat_per_col;
        self.lon_per_row = lon_per_row;
        self
    }

    /// Geographic `(lat, lon)` of a pixel position.
    pub fn geo_at(&self, row: f64, col: f64) -> (f64, f64) {
        (
            self.origin_lat - row * self.lat_per_row + col * self.lat_per_col,
            self.origin_lon + col * self.lon_per_col + row * self.lon_per_row,
        )
    }

    /// Node coordinates `(lat, lon)` in row-major order.
    pub fn nodes(&self) -> Vec<(f64, f64)> {
        let mut nodes = Vec::with_capacity(self.rows * self.cols);
        for r in 0..self.rows {
            for c in 0..self.cols {
                nodes.push(self.geo_at((r * self.row_step) as f64, (c * self.col_step) as f64));
            }
        }
        nodes
    }

    /// GCP file text with `lat lon` records.
    pub fn to_gcp_text(&self) -> String {
        gcp_text(self.rows, self.cols, self.row_step, self.col_step, &self.nodes())
    }

    /// GCP file text with `row col lat lon` records.
    pub fn to_gcp_text_with_pixels(&self) -> String {
        let mut text = format!(
            "# synthetic pass\n{} {} {} {}\n",
            self.rows, self.cols, self.row_step, self.col_step
        );
        for (i, (lat, lon)) in self.nodes().into_iter().enumerate() {
            let r = i / self.cols * self.row_step;
            let c = i % self.cols * self.col_step;
            text.push_str(&format!("{} {} {:.10} {:.10}\n", r, c, lat, lon));
        }
        text
    }
}

/// Serialize a GCP grid. `nodes` may hold fewer or more records than the
/// header declares, for malformed-file tests.
pub fn gcp_text(
    rows: usize,
    cols: usize,
    row_step: usize,
    col_step: usize,
    nodes: &[(f64, f64)],
) -> String {
    let mut text = format!("{} {} {} {}\n", rows, cols, row_step, col_step);
    for (lat, lon) in nodes {
        text.push_str(&format!("{:.10} {:.10}\n", lat, lon));
    }
    text
}

/// Creates an 8-bit test image with predictable, non-zero values.
///
/// Each pixel is `1 + (col * 7 + row * 3) % 250`.
///
/// # Example
///
/// ```
/// use test_utils::create_test_image;
///
/// let img = create_test_image(10, 5);
/// assert_eq!(img.len(), 50);
/// assert_eq!(img[0], 1);
/// assert_eq!(img[1], 8);
/// assert_eq!(img[10], 4);
/// ```
pub fn create_test_image(width: usize, height: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((1 + (col * 7 + row * 3) % 250) as u8);
        }
    }
    data
}

/// Creates an 8-bit test image whose left half is zero (space/no signal)
/// and right half is a constant non-zero intensity.
pub fn create_half_zero_image(width: usize, height: usize, value: u8) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height);
    for _ in 0..height {
        for col in 0..width {
            data.push(if col < width / 2 { 0 } else { value });
        }
    }
    data
}
