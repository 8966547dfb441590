use criterion::{black_box, criterion_group, criterion_main, Criterion};
use shock_factor::core::{render_pulse, FrameGenerator, Visualizer};
use shock_factor::types::{EffectEvent, GridSize, RenderMode};

fn bench_pulse(c: &mut Criterion) {
    c.bench_function("pulse_full_view", |b| {
        let mut tick = 0u64;
        b.iter(|| {
            tick += 1;
            render_pulse(black_box(tick), GridSize::FULL)
        })
    });
}

fn bench_wordfire(c: &mut Criterion) {
    let mut gen = FrameGenerator::new(12345);
    let event = EffectEvent::new("bench", "wordfire").with_intensity(1.0);

    c.bench_function("wordfire_full_view", |b| {
        b.iter(|| gen.generate_frame(black_box(&event), RenderMode::WordFire, true))
    });
}

fn bench_emit(c: &mut Criterion) {
    let mut vis = Visualizer::new(12345);
    for _ in 0..4 {
        vis.on_frame(|frame| {
            black_box(frame.rows());
            Ok(())
        });
    }
    let event = EffectEvent::new("bench", "emit");

    c.bench_function("handle_effect_event_4_subscribers", |b| {
        b.iter(|| vis.handle_effect_event(black_box(&event), RenderMode::Pulse, false))
    });
}

criterion_group!(benches, bench_pulse, bench_wordfire, bench_emit);
criterion_main!(benches);
