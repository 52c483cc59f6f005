use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use trek_tracker::models::{
    LocationUpdate, TrackingView, TripTracking, Viewer, LOCATION_HISTORY_LIMIT,
};

/// Trip with `participants` members, each holding a full location history.
fn busy_trip(participants: usize) -> TripTracking {
    let start = Utc::now();
    let roster: Vec<(String, String)> = (0..participants)
        .map(|i| (format!("user-{}", i), format!("Hiker {}", i)))
        .collect();

    let mut tracking = TripTracking::new("bench-trip", "org", roster, start);
    tracking.start(start).expect("Failed to start trip");

    for i in 0..participants {
        let user_id = format!("user-{}", i);
        for step in 0..LOCATION_HISTORY_LIMIT {
            let now = start + Duration::seconds(step as i64 * 30);
            let point = LocationUpdate::new(46.0 + step as f64 * 0.0002, 8.0 + i as f64 * 0.01)
                .into_point(now)
                .expect("Invalid benchmark point");
            tracking
                .record_location(&user_id, point, now)
                .expect("Failed to record location");
        }
    }
    tracking
}

fn benchmark_record_location(c: &mut Criterion) {
    let tracking = busy_trip(30);
    let now = Utc::now();
    let point = LocationUpdate::new(46.1, 8.1)
        .into_point(now)
        .expect("Invalid benchmark point");

    let mut group = c.benchmark_group("record_location");

    // Full history: every sample evicts the oldest one
    group.bench_function("at_history_limit", |b| {
        b.iter_batched(
            || tracking.clone(),
            |mut t| t.record_location(black_box("user-7"), black_box(point), now),
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn benchmark_views(c: &mut Criterion) {
    let tracking = busy_trip(30);

    let mut group = c.benchmark_group("tracking_view");

    group.bench_function("organizer", |b| {
        b.iter(|| TrackingView::project(black_box(&tracking), Viewer::Organizer))
    });

    group.bench_function("participant", |b| {
        b.iter(|| TrackingView::project(black_box(&tracking), Viewer::Participant("user-3")))
    });

    group.bench_function("serialize_document", |b| {
        b.iter(|| serde_json::to_vec(black_box(&tracking)))
    });

    group.finish();
}

criterion_group!(benches, benchmark_record_location, benchmark_views);
criterion_main!(benches);
