use pcbkit_camtools::{
    clear_polygon_with_progress, paint, CamToolError, PaintMethod, PaintParameters,
};
use pcbkit_core::{CancelToken, GeometrySet, Point, Shape, Units};

const SIDE: f64 = 10.0;

fn pocket() -> GeometrySet {
    GeometrySet::with_shapes(
        "pocket",
        Units::Millimeters,
        vec![Shape::rectangle(Point::new(0.0, 0.0), Point::new(SIDE, SIDE))],
    )
}

fn segment_distance(p: &Point, a: &Point, b: &Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return p.distance_to(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    p.distance_to(&Point::new(a.x + t * dx, a.y + t * dy))
}

fn distance_to_paths(p: &Point, set: &GeometrySet) -> f64 {
    let mut best = f64::INFINITY;
    for shape in &set.shapes {
        for ring in shape.rings() {
            for pair in ring.windows(2) {
                best = best.min(segment_distance(p, &pair[0], &pair[1]));
            }
            if shape.is_closed() && ring.len() > 2 {
                best = best.min(segment_distance(p, &ring[ring.len() - 1], &ring[0]));
            }
        }
    }
    best
}

/// Sample the pocket on a grid and check every point is swept by the tool.
/// Sharp corners are outside the reach of a round tool and are skipped.
fn assert_covered(set: &GeometrySet, radius: f64) {
    let corner = radius;
    let mut samples = 0;
    let mut y = 0.125;
    while y < SIDE {
        let mut x = 0.125;
        while x < SIDE {
            let near_x = x < corner || x > SIDE - corner;
            let near_y = y < corner || y > SIDE - corner;
            if !(near_x && near_y) {
                let p = Point::new(x, y);
                let d = distance_to_paths(&p, set);
                assert!(
                    d <= radius + 0.025,
                    "point ({}, {}) is {} from the nearest path",
                    x,
                    y,
                    d
                );
                samples += 1;
            }
            x += 0.25;
        }
        y += 0.25;
    }
    assert!(samples > 1000);
}

#[test]
fn test_standard_covers_pocket() {
    let params = PaintParameters {
        tool_diameter: 1.0,
        overlap: 0.2,
        margin: 0.0,
        method: PaintMethod::Standard,
    };
    let result = paint(&pocket(), Point::new(5.0, 5.0), &params, &CancelToken::new()).unwrap();
    assert_eq!(result.name, "pocket_paint");
    // Insets 0.5, 1.3, ... 4.5 plus the finishing pass
    assert_eq!(result.len(), 7);
    assert_covered(&result, params.tool_diameter / 2.0);
}

#[test]
fn test_seed_covers_pocket() {
    let params = PaintParameters {
        tool_diameter: 1.0,
        overlap: 0.2,
        margin: 0.0,
        method: PaintMethod::Seed,
    };
    let result = paint(&pocket(), Point::new(5.0, 5.0), &params, &CancelToken::new()).unwrap();
    assert!(!result.is_empty());
    assert_covered(&result, params.tool_diameter / 2.0);

    // The last pass traces the reachable boundary
    let last = result.shapes.last().unwrap();
    assert!(last.is_closed());
    let bounds = last.bounds().unwrap();
    assert!((bounds.min_x - 0.5).abs() < 1e-6);
    assert!((bounds.max_x - 9.5).abs() < 1e-6);
}

#[test]
fn test_small_lobe_gets_finishing_pass() {
    // 20x20 pocket with a 2.8x2.8 lobe on a 0.5 wide neck. The lobe clears
    // out two steps before the main pocket does.
    let dumbbell = Shape::polygon(vec![
        Point::new(0.0, 0.0),
        Point::new(20.0, 0.0),
        Point::new(20.0, 9.75),
        Point::new(23.0, 9.75),
        Point::new(23.0, 8.6),
        Point::new(25.8, 8.6),
        Point::new(25.8, 11.4),
        Point::new(23.0, 11.4),
        Point::new(23.0, 10.25),
        Point::new(20.0, 10.25),
        Point::new(20.0, 20.0),
        Point::new(0.0, 20.0),
    ]);
    let source = GeometrySet::with_shapes("pocket", Units::Millimeters, vec![dumbbell]);
    let params = PaintParameters {
        tool_diameter: 1.0,
        overlap: 0.0,
        margin: 0.0,
        method: PaintMethod::Standard,
    };
    let result = paint(&source, Point::new(10.0, 10.0), &params, &CancelToken::new()).unwrap();

    let lobe_center = Point::new(24.4, 10.0);
    let d = distance_to_paths(&lobe_center, &result);
    assert!(d <= 0.5 + 1e-6, "lobe centre is {} from the nearest path", d);
    let main_center = Point::new(10.0, 10.0);
    assert!(distance_to_paths(&main_center, &result) <= 0.5 + 1e-6);
}

#[test]
fn test_paths_stay_inside_margin() {
    let params = PaintParameters {
        tool_diameter: 1.0,
        overlap: 0.3,
        margin: 1.0,
        method: PaintMethod::Standard,
    };
    let result = paint(&pocket(), Point::new(5.0, 5.0), &params, &CancelToken::new()).unwrap();
    let bounds = result.bounds().unwrap();
    assert!(bounds.min_x >= 1.5 - 1e-6);
    assert!(bounds.max_y <= SIDE - 1.5 + 1e-6);
}

#[test]
fn test_point_outside_polygon() {
    let err = paint(
        &pocket(),
        Point::new(20.0, 20.0),
        &PaintParameters::default(),
        &CancelToken::new(),
    )
    .unwrap_err();
    assert!(matches!(err, CamToolError::LookupMiss { .. }));
}

#[test]
fn test_tool_too_large() {
    let params = PaintParameters {
        tool_diameter: 12.0,
        ..Default::default()
    };
    let result = paint(&pocket(), Point::new(5.0, 5.0), &params, &CancelToken::new()).unwrap();
    assert!(result.is_empty());
}

#[test]
fn test_cancel_keeps_finished_passes() {
    let params = PaintParameters {
        tool_diameter: 1.0,
        overlap: 0.2,
        margin: 0.0,
        method: PaintMethod::Standard,
    };
    let cancel = CancelToken::new();
    let token = cancel.clone();
    let mut seen = Vec::new();
    let result = clear_polygon_with_progress(
        &pocket().shapes[0],
        Units::Millimeters,
        &params,
        None,
        &cancel,
        &mut |pass, shapes| {
            seen.push((pass, shapes));
            if pass == 0 {
                token.cancel();
            }
        },
    )
    .unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(seen, vec![(0, 1)]);
}

#[test]
fn test_polyline_rejected() {
    let line = Shape::polyline(vec![Point::new(0.0, 0.0), Point::new(5.0, 0.0)]);
    let err = clear_polygon_with_progress(
        &line,
        Units::Millimeters,
        &PaintParameters::default(),
        None,
        &CancelToken::new(),
        &mut |_, _| {},
    )
    .unwrap_err();
    assert!(err.is_invalid_parameter());
}
