use criterion::{black_box, criterion_group, criterion_main, Criterion};
use screenshot_api::{CaptureSettings, RawScreenshotQuery, ScreenshotRequest};
use std::time::Duration;

// Fast settings for all benchmarks
fn configure_fast_group(group: &mut criterion::BenchmarkGroup<criterion::measurement::WallTime>) {
    group.warm_up_time(Duration::from_millis(500));
    group.measurement_time(Duration::from_millis(500));
    group.sample_size(20);
}

fn query(url: &str) -> RawScreenshotQuery {
    RawScreenshotQuery {
        url: Some(url.to_string()),
        ..Default::default()
    }
}

fn benchmark_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("validation");
    configure_fast_group(&mut group);

    let minimal = query("https://example.com");
    let full = RawScreenshotQuery {
        format: Some("png".to_string()),
        device_width: Some("1280".to_string()),
        device_height: Some("720".to_string()),
        clip_x: Some("10".to_string()),
        clip_y: Some("20".to_string()),
        clip_width: Some("4000".to_string()),
        clip_height: Some("300".to_string()),
        delay: Some("250".to_string()),
        ..query("https://example.com/some/path?with=query")
    };
    let invalid = RawScreenshotQuery {
        format: Some("gif".to_string()),
        delay: Some("35000".to_string()),
        ..query("invalid_url")
    };

    group.bench_function("minimal", |b| {
        b.iter(|| black_box(ScreenshotRequest::validate(black_box(&minimal))))
    });
    group.bench_function("all_fields", |b| {
        b.iter(|| black_box(ScreenshotRequest::validate(black_box(&full))))
    });
    group.bench_function("all_invalid", |b| {
        b.iter(|| black_box(ScreenshotRequest::validate(black_box(&invalid))))
    });

    group.finish();
}

fn benchmark_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");
    configure_fast_group(&mut group);

    let defaults = CaptureSettings::default();
    let request = ScreenshotRequest::validate(&RawScreenshotQuery {
        device_width: Some("1000".to_string()),
        device_height: Some("1000".to_string()),
        clip_width: Some("2000".to_string()),
        clip_height: Some("2000".to_string()),
        ..query("https://example.com")
    })
    .expect("benchmark query should validate");

    group.bench_function("clamped_clip", |b| {
        b.iter(|| black_box(request.resolve(black_box(&defaults))))
    });

    group.finish();
}

criterion_group!(benches, benchmark_validation, benchmark_resolution);
criterion_main!(benches);
