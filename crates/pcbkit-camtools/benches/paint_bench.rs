use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pcbkit_camtools::{clear_polygon, isolate, IsolationParameters, PaintMethod, PaintParameters};
use pcbkit_core::{CancelToken, GeometrySet, Point, Shape, Units};

fn l_shape() -> Shape {
    Shape::polygon(vec![
        Point::new(0.0, 0.0),
        Point::new(40.0, 0.0),
        Point::new(40.0, 10.0),
        Point::new(10.0, 10.0),
        Point::new(10.0, 30.0),
        Point::new(0.0, 30.0),
    ])
}

fn bench_paint(c: &mut Criterion) {
    let target = l_shape();
    let cancel = CancelToken::new();

    for method in [PaintMethod::Standard, PaintMethod::Seed] {
        let params = PaintParameters {
            tool_diameter: 1.0,
            overlap: 0.2,
            margin: 0.0,
            method,
        };
        c.bench_function(&format!("paint_{}", method), |b| {
            b.iter(|| {
                clear_polygon(
                    black_box(&target),
                    Units::Millimeters,
                    &params,
                    Some(Point::new(5.0, 5.0)),
                    &cancel,
                )
            })
        });
    }
}

fn bench_isolation(c: &mut Criterion) {
    let pads: Vec<Shape> = (0..20)
        .flat_map(|i| {
            let x = i as f64 * 2.54;
            [
                Shape::rectangle(Point::new(x, 0.0), Point::new(x + 1.6, 1.6)),
                Shape::rectangle(Point::new(x, 7.62), Point::new(x + 1.6, 9.22)),
            ]
        })
        .collect();
    let source = GeometrySet::with_shapes("dip40", Units::Millimeters, pads);
    let params = IsolationParameters {
        tool_diameter: 0.2,
        passes: 3,
        overlap: 0.15,
        combine: true,
    };
    let cancel = CancelToken::new();

    c.bench_function("isolate_dip40_3_passes", |b| {
        b.iter(|| isolate(black_box(&source), &params, &cancel))
    });
}

criterion_group!(benches, bench_paint, bench_isolation);
criterion_main!(benches);
