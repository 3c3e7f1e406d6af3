use pcbkit_camtools::{GcodeSynthesizer, MachineMove, ToolpathParameters};
use pcbkit_core::{Artwork, DrillSet, GeometrySet, Point, Shape, Tool, Units};

fn two_squares() -> Artwork {
    Artwork::Polygonal(GeometrySet::with_shapes(
        "iso",
        Units::Millimeters,
        vec![
            Shape::rectangle(Point::new(0.0, 0.0), Point::new(1.0, 1.0)),
            Shape::rectangle(Point::new(10.0, 0.0), Point::new(11.0, 1.0)),
        ],
    ))
}

fn rapid_targets(moves: &[MachineMove]) -> Vec<Point> {
    moves
        .iter()
        .filter_map(|m| match m {
            MachineMove::RapidXY(p) => Some(*p),
            _ => None,
        })
        .collect()
}

fn plunges(moves: &[MachineMove]) -> Vec<f64> {
    moves
        .iter()
        .filter_map(|m| match m {
            MachineMove::Plunge { z, .. } => Some(*z),
            _ => None,
        })
        .collect()
}

#[test]
fn test_shapes_cut_in_storage_order() {
    let synthesizer = GcodeSynthesizer::new(ToolpathParameters::default());
    let moves = synthesizer.synthesize(&[two_squares()]).unwrap();

    let rapids = rapid_targets(&moves);
    assert_eq!(rapids, vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);

    // Header, then the closed square returns to its start
    assert_eq!(moves[moves.len() - 1], MachineMove::SpindleOff);
    let feeds: Vec<Point> = moves
        .iter()
        .filter_map(|m| match m {
            MachineMove::Feed { to, .. } => Some(*to),
            _ => None,
        })
        .collect();
    assert_eq!(feeds.len(), 8);
    assert_eq!(feeds[3], Point::new(0.0, 0.0));
}

#[test]
fn test_header_and_footer_text() {
    let params = ToolpathParameters {
        spindle_speed: Some(10000.0),
        ..Default::default()
    };
    let program = GcodeSynthesizer::new(params)
        .generate(&[two_squares()], None, None)
        .unwrap();
    let lines: Vec<&str> = program.lines().collect();
    assert!(lines[0].starts_with("; "));
    assert!(lines.contains(&"G21"));
    assert!(lines.contains(&"G90"));
    assert!(lines.contains(&"M03 S10000"));
    assert!(lines.contains(&"G00 X10.0000 Y0.0000"));
    assert!(lines.contains(&"G01 Z-0.0500 F120.0000"));
    assert_eq!(lines[lines.len() - 1], "M05");
    assert_eq!(lines[lines.len() - 2], "G00 Z2.0000");
}

#[test]
fn test_multi_depth_reaches_cut_depth() {
    let params = ToolpathParameters {
        cut_z: -1.7,
        multi_depth: true,
        depth_per_pass: 0.6,
        ..Default::default()
    };
    let moves = GcodeSynthesizer::new(params)
        .synthesize(&[two_squares()])
        .unwrap();
    let z = plunges(&moves);
    // Three levels per square
    assert_eq!(z.len(), 6);
    assert_eq!(z[2], -1.7);
    assert_eq!(z[5], -1.7);
    assert!(z[0] > z[1] && z[1] > z[2]);
    assert!(z.iter().all(|&level| level >= -1.7));
}

#[test]
fn test_open_path_returns_to_start_between_levels() {
    let line = Artwork::Polygonal(GeometrySet::with_shapes(
        "cut",
        Units::Millimeters,
        vec![Shape::polyline(vec![
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
        ])],
    ));
    let params = ToolpathParameters {
        cut_z: -1.0,
        multi_depth: true,
        depth_per_pass: 0.5,
        ..Default::default()
    };
    let moves = GcodeSynthesizer::new(params).synthesize(&[line]).unwrap();
    let rapids = rapid_targets(&moves);
    assert_eq!(rapids, vec![Point::new(0.0, 0.0), Point::new(0.0, 0.0)]);
}

#[test]
fn test_drills_with_tool_change() {
    let mut drills = DrillSet::new("drl", Units::Millimeters);
    drills.add_tool(Tool::new("2", 0.8)).unwrap();
    drills.add_tool(Tool::new("1", 1.0)).unwrap();
    drills.add_point(Point::new(1.0, 1.0), "1").unwrap();
    drills.add_point(Point::new(2.0, 2.0), "2").unwrap();
    drills.add_point(Point::new(3.0, 3.0), "2").unwrap();

    let params = ToolpathParameters {
        toolchange: true,
        ..Default::default()
    };
    let moves = GcodeSynthesizer::new(params)
        .synthesize(&[Artwork::Drill(drills)])
        .unwrap();

    assert_eq!(tool_selects(&moves), vec![2, 1]);
    assert_eq!(
        rapid_targets(&moves),
        vec![
            Point::new(2.0, 2.0),
            Point::new(3.0, 3.0),
            Point::new(1.0, 1.0)
        ]
    );
    assert_eq!(moves.iter().filter(|m| **m == MachineMove::Pause).count(), 2);
}

fn tool_selects(moves: &[MachineMove]) -> Vec<u32> {
    moves
        .iter()
        .filter_map(|m| match m {
            MachineMove::ToolSelect(n) => Some(*n),
            _ => None,
        })
        .collect()
}

#[test]
fn test_mill_then_drill_changes_tool() {
    // Drill key "1" must not be mistaken for the end mill
    let mut holes = DrillSet::new("align", Units::Millimeters);
    holes.add_tool(Tool::new("1", 3.0)).unwrap();
    holes.add_point(Point::new(-5.0, 5.0), "1").unwrap();

    let params = ToolpathParameters {
        toolchange: true,
        ..Default::default()
    };
    let moves = GcodeSynthesizer::new(params)
        .synthesize(&[two_squares(), Artwork::Drill(holes)])
        .unwrap();

    assert_eq!(tool_selects(&moves), vec![1, 2]);
    assert_eq!(moves.iter().filter(|m| **m == MachineMove::Pause).count(), 2);

    // The second change comes before the drill position
    let change = moves
        .iter()
        .rposition(|m| *m == MachineMove::ToolSelect(2))
        .unwrap();
    let drill = moves
        .iter()
        .position(|m| *m == MachineMove::RapidXY(Point::new(-5.0, 5.0)))
        .unwrap();
    assert!(change < drill);
}

#[test]
fn test_tool_numbers_from_prefixed_keys_stay_distinct() {
    let mut drills = DrillSet::new("drl", Units::Millimeters);
    drills.add_tool(Tool::new("2", 0.8)).unwrap();
    drills.add_tool(Tool::new("T1", 1.0)).unwrap();
    drills.add_tool(Tool::new("T02", 1.2)).unwrap();
    drills.add_point(Point::new(1.0, 1.0), "2").unwrap();
    drills.add_point(Point::new(2.0, 2.0), "T1").unwrap();
    drills.add_point(Point::new(3.0, 3.0), "T02").unwrap();

    let params = ToolpathParameters {
        toolchange: true,
        ..Default::default()
    };
    let moves = GcodeSynthesizer::new(params)
        .synthesize(&[Artwork::Drill(drills)])
        .unwrap();
    assert_eq!(tool_selects(&moves), vec![2, 1, 3]);
}

#[test]
fn test_mixed_units_rejected() {
    let inches = Artwork::Polygonal(GeometrySet::new("in", Units::Inches));
    let err = GcodeSynthesizer::new(ToolpathParameters::default())
        .synthesize(&[two_squares(), inches])
        .unwrap_err();
    assert!(!err.is_invalid_parameter());
}

#[test]
fn test_preamble_and_postamble() {
    let program = GcodeSynthesizer::new(ToolpathParameters::default())
        .generate(&[two_squares()], Some("G17\nG54\n"), Some("M30"))
        .unwrap();
    assert!(program.starts_with("G17\nG54\n; "));
    assert!(program.ends_with("M05\nM30\n"));
}

#[test]
fn test_inch_program() {
    let art = Artwork::Polygonal(GeometrySet::with_shapes(
        "iso",
        Units::Inches,
        vec![Shape::rectangle(Point::new(0.0, 0.0), Point::new(0.5, 0.5))],
    ));
    let program = GcodeSynthesizer::new(ToolpathParameters::default())
        .generate(&[art], None, None)
        .unwrap();
    assert!(program.contains("\nG20\n"));
    assert!(!program.contains("G21"));
}
