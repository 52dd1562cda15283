//! Tests for GCP file loading and validation.
//!
//! Covers:
//! - Header and record parsing from disk
//! - Record count and position mismatches
//! - Degenerate grid rejection
//! - UTM zone derivation

use georef::{GcpGrid, GeorefError};
use test_utils::{gcp_text, scenario_pass, small_pass, TestDataset};

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_scenario_grid() {
    let ds = TestDataset::new(scenario_pass(), 1000, 800);
    let grid = GcpGrid::load(&ds.gcp).unwrap();

    assert_eq!(grid.x_size(), 5);
    assert_eq!(grid.y_size(), 4);
    assert_eq!(grid.x_step(), 250);
    assert_eq!(grid.y_step(), 200);
    assert_eq!(grid.len(), 20);

    let last = grid.point(3, 4);
    assert_eq!((last.pixel_row, last.pixel_col), (600.0, 1000.0));
    assert_eq!(grid.pixel_extent(), (600.0, 1000.0));
}

#[test]
fn test_load_records_with_pixel_positions() {
    let spec = small_pass();
    let ds = TestDataset::new(spec, 120, 100);
    let path = ds.write_text("with_pixels.gcp", &spec.to_gcp_text_with_pixels());

    let plain = GcpGrid::load(&ds.gcp).unwrap();
    let with_pixels = GcpGrid::load(&path).unwrap();
    for (a, b) in plain.points().zip(with_pixels.points()) {
        assert!((a.lat - b.lat).abs() < 1e-9);
        assert!((a.lon - b.lon).abs() < 1e-9);
    }
}

#[test]
fn test_missing_file() {
    let err = GcpGrid::load("/nonexistent/pass.gcp").unwrap_err();
    assert!(matches!(err, GeorefError::FileNotFound(_)));
    assert_eq!(err.code(), "FileNotFound");
}

// ============================================================================
// Malformed files
// ============================================================================

#[test]
fn test_record_count_mismatch() {
    let text = gcp_text(2, 2, 100, 100, &[(55.0, 37.0), (55.0, 37.1), (54.9, 37.0)]);
    let err = GcpGrid::parse(&text).unwrap_err();
    match err {
        GeorefError::RecordCountMismatch { expected, found } => {
            assert_eq!(expected, 4);
            assert_eq!(found, 3);
        }
        other => panic!("expected RecordCountMismatch, got {:?}", other),
    }
}

#[test]
fn test_record_count_mismatch_from_file() {
    let ds = TestDataset::new(small_pass(), 120, 100);
    let path = ds.write_text(
        "short.gcp",
        &gcp_text(2, 2, 100, 100, &[(55.0, 37.0), (55.0, 37.1), (54.9, 37.0)]),
    );
    assert!(matches!(
        GcpGrid::load(&path),
        Err(GeorefError::RecordCountMismatch {
            expected: 4,
            found: 3
        })
    ));
}

#[test]
fn test_too_many_records() {
    let nodes = vec![(55.0, 37.0); 5];
    let err = GcpGrid::parse(&gcp_text(2, 2, 10, 10, &nodes)).unwrap_err();
    assert!(matches!(
        err,
        GeorefError::RecordCountMismatch {
            expected: 4,
            found: 5
        }
    ));
}

#[test]
fn test_unparsable_record() {
    let err = GcpGrid::parse("2 2 10 10\n55 37\n55 abc\n54 37\n54 38\n").unwrap_err();
    assert!(matches!(err, GeorefError::MalformedRecord { line: 3, .. }));
}

#[test]
fn test_zero_step_is_degenerate() {
    let text = gcp_text(2, 2, 0, 10, &[(55.0, 37.0), (55.0, 37.1), (54.9, 37.0), (54.9, 37.1)]);
    assert!(matches!(
        GcpGrid::parse(&text),
        Err(GeorefError::DegenerateGrid(_))
    ));
}

#[test]
fn test_identical_points_are_degenerate() {
    let nodes = vec![(55.0, 37.0); 6];
    assert!(matches!(
        GcpGrid::parse(&gcp_text(2, 3, 10, 10, &nodes)),
        Err(GeorefError::DegenerateGrid(_))
    ));
}

#[test]
fn test_collinear_points_are_degenerate() {
    let nodes: Vec<(f64, f64)> = (0..6).map(|i| (50.0 + i as f64 * 0.1, 30.0 + i as f64 * 0.2)).collect();
    assert!(matches!(
        GcpGrid::parse(&gcp_text(2, 3, 10, 10, &nodes)),
        Err(GeorefError::DegenerateGrid(_))
    ));
}

// ============================================================================
// UTM zone
// ============================================================================

#[test]
fn test_zone_is_deterministic() {
    let grid = GcpGrid::parse(&scenario_pass().to_gcp_text()).unwrap();
    let first = grid.utm_zone();
    for _ in 0..10 {
        assert_eq!(grid.utm_zone(), first);
    }

    let c = grid.centroid();
    let expected = ((c.lon + 180.0) / 6.0).floor() as u8 + 1;
    assert_eq!(first, expected);
    assert_eq!(first, 37);
    assert_eq!(grid.utm_zone_label(), "37N");
}

#[test]
fn test_southern_hemisphere_label() {
    let nodes = [(-33.0, 151.0), (-33.0, 151.1), (-33.1, 151.0), (-33.1, 151.1)];
    let grid = GcpGrid::parse(&gcp_text(2, 2, 10, 10, &nodes)).unwrap();
    assert_eq!(grid.utm_zone(), 56);
    assert_eq!(grid.utm_zone_label(), "56S");
}
