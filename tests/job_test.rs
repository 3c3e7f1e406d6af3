use pcbkit::{run_job, Artwork, CancelToken, Config, Job, Operation, Point};
use std::fs;
use tempfile::TempDir;

const JOB: &str = r#"{
    "artwork": [
        {
            "type": "polygonal",
            "data": {
                "name": "top",
                "units": "mm",
                "shapes": [
                    {"kind": "polygon", "exterior": [
                        {"x": 0.0, "y": 0.0}, {"x": 20.0, "y": 0.0},
                        {"x": 20.0, "y": 10.0}, {"x": 0.0, "y": 10.0}
                    ]}
                ]
            }
        },
        {
            "type": "drill",
            "data": {
                "name": "holes",
                "units": "mm",
                "tools": [{"key": "1", "diameter": 0.8}],
                "points": [{"position": {"x": 5.0, "y": 5.0}, "tool": "1"}]
            }
        }
    ],
    "operations": [
        {"op": "isolate", "artwork": "top", "params": {"tool_diameter": 0.2, "passes": 2}},
        {"op": "cutout", "artwork": "top"},
        {"op": "paint", "artwork": "top", "seed": {"x": 50.0, "y": 50.0}},
        {"op": "mirror", "artwork": "holes", "axis": "Y"},
        {"op": "alignment_holes", "artwork": "top", "holes": [{"x": -5.0, "y": 5.0}]}
    ]
}"#;

#[test]
fn test_job_pipeline() {
    let job = Job::from_json(JOB).unwrap();
    assert_eq!(job.operations.len(), 5);
    assert!(matches!(
        job.operations[2],
        Operation::Paint { seed, .. } if seed == Point::new(50.0, 50.0)
    ));

    let output = run_job(&job, &Config::default(), &CancelToken::new()).unwrap();

    // The paint seed lies outside the board
    assert_eq!(output.failures.len(), 1);
    assert_eq!(output.failures[0].operation, 2);

    let names: Vec<&str> = output.programs.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["top_iso", "top_cutout", "holes", "alignment"]);
    for program in &output.programs {
        assert!(program.gcode.contains("G21"));
        assert!(program.gcode.ends_with("M05\n"));
    }
    // Mirrored about its own centre, a single hole stays put
    assert!(output.programs[2].gcode.contains("G00 X5.0000 Y5.0000"));
    // Alignment pair about the board centre (x = 10)
    assert!(output.programs[3].gcode.contains("G00 X25.0000 Y5.0000"));
}

#[test]
fn test_job_uses_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "postamble = \"M30\"\n\n[gcode]\ncut_z = -0.1\ndecimals = 5\n",
    )
    .unwrap();
    let config = Config::load_from_file(&path).unwrap();

    let job = Job::from_json(JOB).unwrap();
    let output = run_job(&job, &config, &CancelToken::new()).unwrap();
    let top = &output.programs[0];
    assert!(top.gcode.contains("G01 Z-0.10000 F120.00000"));
    assert!(top.gcode.ends_with("M05\nM30\n"));
}

#[test]
fn test_failed_program_keeps_the_rest() {
    let mut job = Job::from_json(JOB).unwrap();
    let bad: Artwork = serde_json::from_str(
        r#"{"type": "drill", "data": {
            "name": "bad", "units": "mm",
            "tools": [{"key": "1", "diameter": 0.8}],
            "points": [{"position": {"x": 1.0, "y": 1.0}, "tool": "7"}]
        }}"#,
    )
    .unwrap();
    job.artwork.push(bad);
    job.operations.push(Operation::Mirror {
        artwork: "bad".to_string(),
        axis: None,
        reference: None,
    });

    let output = run_job(&job, &Config::default(), &CancelToken::new()).unwrap();

    // Paint misses the board; the mirrored drill data has no tool "7"
    let failed: Vec<usize> = output.failures.iter().map(|f| f.operation).collect();
    assert_eq!(failed, vec![2, 5]);
    assert!(output.failures[1].message.contains("'bad'"));

    let names: Vec<&str> = output.programs.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["top_iso", "top_cutout", "holes", "alignment"]);
}

#[test]
fn test_invalid_job_rejected() {
    assert!(Job::from_json("{\"operations\": [{\"op\": \"drill\"}]}").is_err());

    let mut job = Job::from_json(JOB).unwrap();
    job.operations.push(Operation::Isolate {
        artwork: "holes".to_string(),
        params: None,
    });
    let err = run_job(&job, &Config::default(), &CancelToken::new()).unwrap_err();
    assert!(format!("{:#}", err).contains("drill data"));
}
