use geo::{polygon, MultiPolygon};
use reagg::{
    interpolate, Error, IntensiveMode, InterpolationOptions, Interpolator, MissingFieldPolicy, SourceLayer,
    SourceRecord, TargetId, TargetIndex, TargetLayer, WeightingPolicy, DEFAULT_NO_DATA,
};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
    MultiPolygon(vec![polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1), (x: x0, y: y0)]])
}

fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-9, "{a} != {b}");
}

/// Two sources of area 10 side by side, and one target straddling them (4 over A, 6 over B).
fn straddling() -> (SourceLayer, TargetLayer) {
    let sources = SourceLayer::new(vec![
        SourceRecord::new(0, rect(0.0, 0.0, 10.0, 1.0), [("pm25", 5.0), ("pop", 100.0)]),
        SourceRecord::new(1, rect(10.0, 0.0, 20.0, 1.0), [("pm25", 3.0), ("pop", 50.0)]),
    ]);
    let targets = TargetLayer::from_geometries([rect(6.0, 0.0, 16.0, 1.0)]);
    (sources, targets)
}

fn pm25_by_pop(mode: IntensiveMode) -> WeightingPolicy {
    WeightingPolicy::new([("pm25", "pop")], mode).unwrap()
}

fn run(sources: &SourceLayer, targets: &mut TargetLayer, policy: WeightingPolicy, options: InterpolationOptions) -> reagg::Result<reagg::InterpolationReport> {
    let index = TargetIndex::new(&targets.records);
    Interpolator::new(&index, policy).with_options(options).interpolate(sources, targets)
}

#[test]
fn population_weighted_mean_of_two_sources() {
    let (sources, mut targets) = straddling();
    let index = TargetIndex::new(&targets.records);
    let policy = pm25_by_pop(IntensiveMode::DenominatorWeightedNoArea);
    let interpolator = Interpolator::new(&index, policy);

    let accumulated = interpolator.accumulate(&sources, &mut targets).unwrap();
    let raw = &accumulated.targets().records[0];
    assert_close(raw.get("pop").unwrap(), 70.0);
    assert_close(raw.get("pm25").unwrap(), 650.0);

    let report = accumulated.normalize();
    assert!(report.is_clean());
    assert_eq!(report.contributing, 2);
    assert_eq!(report.overlaps, 2);
    assert_close(targets.records[0].get("pop").unwrap(), 70.0);
    assert_close(targets.records[0].get("pm25").unwrap(), 650.0 / 70.0);
}

#[test]
fn area_weighted_mode_weights_by_overlap_and_denominator() {
    let (sources, mut targets) = straddling();
    run(&sources, &mut targets, pm25_by_pop(IntensiveMode::AreaWeighted), InterpolationOptions::default()).unwrap();

    // (5 * 100 * 0.4 + 3 * 50 * 0.6) / 70
    assert_close(targets.records[0].get("pm25").unwrap(), 290.0 / 70.0);
    assert_close(targets.records[0].get("pop").unwrap(), 70.0);
}

#[test]
fn extensive_fields_are_conserved_over_a_covering_grid() {
    let sources = SourceLayer::new(vec![
        SourceRecord::new(0, rect(0.5, 0.5, 3.5, 2.5), [("pop", 1200.0), ("jobs", 7.0)]),
    ]);
    let cells = (0..4).flat_map(|i| (0..3).map(move |j| rect(i as f64, j as f64, i as f64 + 1.0, j as f64 + 1.0)));
    let mut targets = TargetLayer::from_geometries(cells);
    let index = TargetIndex::new(&targets.records);

    interpolate(&sources, &index, &mut targets, &WeightingPolicy::extensive()).unwrap();

    let total = |field: &str| targets.records.iter().filter_map(|t| t.get(field)).sum::<f64>();
    assert_close(total("pop"), 1200.0);
    assert_close(total("jobs"), 7.0);
    // Corner cell (0,0) holds a quarter unit of the 6-unit source.
    assert_close(targets.records[0].get("pop").unwrap(), 1200.0 * 0.25 / 6.0);
}

#[test]
fn disjoint_source_leaves_targets_at_zero() {
    let sources = SourceLayer::new(vec![
        SourceRecord::new(0, rect(100.0, 100.0, 101.0, 101.0), [("pop", 10.0)]),
    ]);
    let mut targets = TargetLayer::from_geometries([rect(0.0, 0.0, 1.0, 1.0), rect(1.0, 0.0, 2.0, 1.0)]);

    let report = run(&sources, &mut targets, WeightingPolicy::extensive(), InterpolationOptions::default()).unwrap();

    assert_eq!(report.contributing, 0);
    assert_eq!(report.overlaps, 0);
    assert!(targets.records.iter().all(|t| t.get("pop") == Some(0.0)));
}

#[test]
fn result_does_not_depend_on_source_order() {
    let records = vec![
        SourceRecord::new(0, rect(0.0, 0.0, 3.0, 3.0), [("pm25", 4.0), ("pop", 30.0)]),
        SourceRecord::new(1, rect(3.0, 0.0, 5.0, 3.0), [("pm25", 9.0), ("pop", 12.0)]),
        SourceRecord::new(2, rect(0.0, 3.0, 5.0, 4.0), [("pm25", 1.5), ("pop", 8.0)]),
    ];
    let grid = || TargetLayer::from_geometries([rect(0.0, 0.0, 2.5, 4.0), rect(2.5, 0.0, 5.0, 4.0)]);

    let mut forward = grid();
    run(&SourceLayer::new(records.clone()), &mut forward, pm25_by_pop(IntensiveMode::default()), InterpolationOptions::default()).unwrap();

    let mut reversed = grid();
    let backwards: Vec<SourceRecord> = records.into_iter().rev().collect();
    run(&SourceLayer::new(backwards), &mut reversed, pm25_by_pop(IntensiveMode::default()), InterpolationOptions::default()).unwrap();

    for (a, b) in forward.records.iter().zip(&reversed.records) {
        for field in ["PM25", "POP"] {
            assert_close(a.get(field).unwrap(), b.get(field).unwrap());
        }
    }
}

#[test]
fn single_covering_source_gives_its_own_value() {
    // Source fully inside the target: the denominator cancels in either mode.
    let sources = SourceLayer::new(vec![
        SourceRecord::new(0, rect(1.0, 1.0, 2.0, 2.0), [("pm25", 6.25), ("pop", 40.0)]),
    ]);
    for mode in [IntensiveMode::DenominatorWeightedNoArea, IntensiveMode::AreaWeighted] {
        let mut targets = TargetLayer::from_geometries([rect(0.0, 0.0, 4.0, 4.0)]);
        run(&sources, &mut targets, pm25_by_pop(mode), InterpolationOptions::default()).unwrap();
        assert!((targets.records[0].get("pm25").unwrap() - 6.25).abs() < 1e-9, "{mode}");
    }

    // Target fully inside the source: exact under the area-weighted mode.
    let sources = SourceLayer::new(vec![
        SourceRecord::new(0, rect(0.0, 0.0, 4.0, 4.0), [("pm25", 6.25), ("pop", 40.0)]),
    ]);
    let mut targets = TargetLayer::from_geometries([rect(1.0, 1.0, 2.0, 2.0)]);
    run(&sources, &mut targets, pm25_by_pop(IntensiveMode::AreaWeighted), InterpolationOptions::default()).unwrap();
    assert_close(targets.records[0].get("pm25").unwrap(), 6.25);
}

#[test]
fn zero_denominator_yields_no_data_marker() {
    let sources = SourceLayer::new(vec![
        SourceRecord::new(0, rect(0.0, 0.0, 1.0, 1.0), [("pm25", 8.0), ("pop", 0.0)]),
    ]);
    let mut targets = TargetLayer::from_geometries([rect(0.0, 0.0, 1.0, 1.0), rect(5.0, 5.0, 6.0, 6.0)]);

    let report = run(&sources, &mut targets, pm25_by_pop(IntensiveMode::default()), InterpolationOptions::default()).unwrap();

    assert_eq!(targets.records[0].get("pm25"), Some(DEFAULT_NO_DATA));
    assert_eq!(targets.records[1].get("pm25"), Some(DEFAULT_NO_DATA));
    assert_eq!(targets.records[1].get("pop"), Some(0.0));
    let undefined: Vec<(TargetId, &str)> = report.undefined().collect();
    assert_eq!(undefined, vec![(TargetId(0), "PM25"), (TargetId(1), "PM25")]);

    let custom = InterpolationOptions { no_data: -1.0, ..Default::default() };
    run(&sources, &mut targets, pm25_by_pop(IntensiveMode::default()), custom).unwrap();
    assert_eq!(targets.records[0].get("pm25"), Some(-1.0));
}

#[test]
fn parallel_and_serial_runs_agree() {
    let records: Vec<SourceRecord> = (0..40)
        .map(|i| {
            let x = (i % 8) as f64 * 1.3;
            let y = (i / 8) as f64 * 0.9;
            SourceRecord::new(i, rect(x, y, x + 1.7, y + 1.1), [("pm25", 1.0 + i as f64 * 0.25), ("pop", 10.0 + i as f64)])
        })
        .collect();
    let sources = SourceLayer::new(records);
    let grid = || TargetLayer::from_geometries(
        (0..6).flat_map(|i| (0..3).map(move |j| rect(i as f64 * 2.0, j as f64 * 2.0, i as f64 * 2.0 + 2.0, j as f64 * 2.0 + 2.0))),
    );

    let mut serial = grid();
    let serial_report = run(&sources, &mut serial, pm25_by_pop(IntensiveMode::default()), InterpolationOptions::default()).unwrap();

    let mut parallel = grid();
    let options = InterpolationOptions { parallel: true, ..Default::default() };
    let parallel_report = run(&sources, &mut parallel, pm25_by_pop(IntensiveMode::default()), options).unwrap();

    assert_eq!(serial_report.overlaps, parallel_report.overlaps);
    assert_eq!(serial_report.contributing, parallel_report.contributing);
    for (a, b) in serial.records.iter().zip(&parallel.records) {
        for field in ["PM25", "POP"] {
            assert!((a.get(field).unwrap() - b.get(field).unwrap()).abs() < 1e-6, "{} {field}", a.id);
        }
    }
}

#[test]
fn missing_field_skip_keeps_other_contributions() {
    let sources = SourceLayer::new(vec![
        SourceRecord::new(0, rect(0.0, 0.0, 1.0, 1.0), [("pm25", 2.0), ("pop", 10.0)]),
        SourceRecord::new(1, rect(1.0, 0.0, 2.0, 1.0), [("pm25", 99.0)]),
    ]);
    let mut targets = TargetLayer::from_geometries([rect(0.0, 0.0, 2.0, 1.0)]);

    let report = run(&sources, &mut targets, pm25_by_pop(IntensiveMode::default()), InterpolationOptions::default()).unwrap();

    assert_eq!(report.skipped_records().collect::<Vec<_>>(), vec![1]);
    assert_eq!(targets.records[0].get("pop"), Some(10.0));
    assert_eq!(targets.records[0].get("pm25"), Some(2.0));

    let abort = InterpolationOptions { on_missing: MissingFieldPolicy::Abort, ..Default::default() };
    let result = run(&sources, &mut targets, pm25_by_pop(IntensiveMode::default()), abort);
    assert!(matches!(result, Err(Error::MissingField { record: 1, ref field }) if field == "POP"));
    // The aborted run keeps the previous run's finished values.
    assert_eq!(targets.records[0].get("pop"), Some(10.0));
    assert_eq!(targets.records[0].get("pm25"), Some(2.0));
}

#[test]
fn invalid_policy_is_rejected_before_targets_change() {
    let (sources, mut targets) = straddling();
    targets.records[0].insert("pop", 123.0);

    let policy = WeightingPolicy::new([("pm25", "households")], IntensiveMode::default()).unwrap();
    let result = run(&sources, &mut targets, policy, InterpolationOptions::default());

    assert!(matches!(result, Err(Error::InvalidWeightingPolicy { .. })));
    assert_eq!(targets.records[0].get("POP"), Some(123.0));

    assert!(matches!(
        WeightingPolicy::new([("pm25", "pop"), ("pop", "area")], IntensiveMode::default()),
        Err(Error::InvalidWeightingPolicy { .. })
    ));
}

#[test]
fn zero_area_source_is_fatal() {
    let sources = SourceLayer::new(vec![
        SourceRecord::new(0, rect(0.0, 0.0, 1.0, 1.0), [("pop", 1.0)]),
        SourceRecord::new(1, rect(2.0, 0.0, 2.0, 1.0), [("pop", 1.0)]),
    ]);
    let mut targets = TargetLayer::from_geometries([rect(0.0, 0.0, 3.0, 1.0)]);

    let result = run(&sources, &mut targets, WeightingPolicy::extensive(), InterpolationOptions::default());
    assert!(matches!(result, Err(Error::DegenerateGeometry { record: 1, .. })));
}
