use std::rc::Rc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use mixcam::math::{Vec3, quat_from_rotation_y};
use mixcam::{CameraSource, CameraState, MixingCamera, SourceRef, WeightEntry, WeightTable};

struct Still {
    name: String,
    state: CameraState,
}

impl CameraSource<CameraState> for Still {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_active_and_enabled(&self) -> bool {
        true
    }

    fn state(&self) -> CameraState {
        self.state
    }
}

fn make_sources(count: usize) -> Vec<SourceRef<CameraState>> {
    (0..count)
        .map(|i| {
            let angle = i as f32 * 0.25;
            let source: SourceRef<CameraState> = Rc::new(Still {
                name: format!("cam_{i}"),
                state: CameraState::new(
                    Vec3::new(angle.cos() * 10.0, 2.0, angle.sin() * 10.0),
                    quat_from_rotation_y(angle),
                ),
            });
            source
        })
        .collect()
}

fn make_mixer(sources: &[SourceRef<CameraState>]) -> MixingCamera<CameraState> {
    let mixer = MixingCamera::new("bench");
    for (i, source) in sources.iter().enumerate() {
        mixer.add_source(source, 1.0 + i as f32 * 0.1);
    }
    mixer
}

// ---------------------------------------------------------------------------
// Blend pass
// ---------------------------------------------------------------------------

fn bench_update_8(c: &mut Criterion) {
    let sources = make_sources(8);
    let mixer = make_mixer(&sources);
    c.bench_function("update_8_sources", |b| {
        b.iter(|| black_box(mixer.update(Vec3::y(), black_box(1.0 / 60.0))));
    });
}

fn bench_update_64(c: &mut Criterion) {
    let sources = make_sources(64);
    let mixer = make_mixer(&sources);
    c.bench_function("update_64_sources", |b| {
        b.iter(|| black_box(mixer.update(Vec3::y(), black_box(1.0 / 60.0))));
    });
}

// ---------------------------------------------------------------------------
// Cache rebuild
// ---------------------------------------------------------------------------

fn bench_rebuild_64(c: &mut Criterion) {
    let sources = make_sources(64);
    let mixer = make_mixer(&sources);
    c.bench_function("rebuild_cache_64_sources", |b| {
        b.iter(|| {
            mixer.invalidate_cache();
            black_box(mixer.refresh_cache())
        });
    });
}

// ---------------------------------------------------------------------------
// Weight lookups
// ---------------------------------------------------------------------------

fn bench_weight_of_64(c: &mut Criterion) {
    let sources = make_sources(64);
    let mut table = WeightTable::new();
    for source in &sources {
        table.append(WeightEntry::new(source, 1.0));
    }
    let last = &sources[63];
    c.bench_function("weight_of_last_of_64", |b| {
        b.iter(|| black_box(table.weight_of(black_box(last))));
    });
}

criterion_group!(
    benches,
    bench_update_8,
    bench_update_64,
    bench_rebuild_64,
    bench_weight_of_64,
);
criterion_main!(benches);
