//! Benchmarks for DSP primitives and whole-engine rendering.
//!
//! Run with: cargo bench
//!
//! Reference timing at 48kHz sample rate:
//!   - 64 samples  = 1.33ms deadline
//!   - 128 samples = 2.67ms deadline
//!   - 256 samples = 5.33ms deadline
//!   - 512 samples = 10.67ms deadline

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use vapoly::dsp::envelope::AdsrEnvelope;
use vapoly::dsp::filter::{FilterModel, VoiceFilter};
use vapoly::dsp::oscillator::{Oscillator, Waveform};
use vapoly::engine::Engine;
use vapoly::synth::manager::VoiceManager;

const SAMPLE_RATE: f32 = 48_000.0;

/// Common buffer sizes used in audio applications.
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for (name, waveform) in [("saw", Waveform::Saw), ("sine", Waveform::Sine)] {
            let mut osc = Oscillator::new(SAMPLE_RATE);
            osc.set_waveform(waveform);
            osc.set_frequency(220.0);

            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    for s in buffer.iter_mut() {
                        *s = osc.process();
                    }
                    black_box(&mut buffer);
                })
            });
        }
    }

    group.finish();
}

fn bench_filters(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| ((i as f32) * 0.1).sin()).collect();
        let mut output = vec![0.0f32; size];

        for (name, model) in [
            ("svf", FilterModel::Svf),
            ("ladder", FilterModel::Ladder),
            ("prophet24", FilterModel::Prophet24),
        ] {
            let mut filter = VoiceFilter::new(SAMPLE_RATE);
            filter.set_model(model);
            filter.set_params(1_200.0, 0.5);

            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    for (o, &x) in output.iter_mut().zip(&input) {
                        *o = filter.process(black_box(x));
                    }
                })
            });
        }
    }

    group.finish();
}

fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");

    for &size in BLOCK_SIZES {
        let mut env = AdsrEnvelope::new(SAMPLE_RATE);
        env.set_params(0.01, 0.1, 0.6, 0.2);
        env.note_on();

        group.bench_with_input(BenchmarkId::new("adsr", size), &size, |b, _| {
            b.iter(|| {
                let mut acc = 0.0;
                for _ in 0..size {
                    acc += env.process();
                }
                black_box(acc)
            })
        });
    }

    group.finish();
}

fn bench_voice_manager(c: &mut Criterion) {
    let mut group = c.benchmark_group("synth/manager");

    for &size in BLOCK_SIZES {
        let mut left = vec![0.0f32; size];
        let mut right = vec![0.0f32; size];

        // An 8-note chord on 16 voices: the realistic worst case for the
        // per-sample voice loop.
        let mut vm = VoiceManager::new(SAMPLE_RATE, 16);
        vm.set_amp_adsr(0.01, 0.1, 0.7, 0.2);
        for note in [48, 52, 55, 60, 64, 67, 72, 76] {
            vm.on_note_on(note, 100);
        }

        group.bench_with_input(BenchmarkId::new("chord_8", size), &size, |b, _| {
            b.iter(|| {
                vm.render_stereo(black_box(&mut left), black_box(&mut right));
            })
        });
    }

    group.finish();
}

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/full");

    for &size in BLOCK_SIZES {
        let mut left = vec![0.0f32; size];
        let mut right = vec![0.0f32; size];

        let mut engine = Engine::new(SAMPLE_RATE, 16);
        engine.set_amp_adsr(0.01, 0.1, 0.7, 0.2);
        engine.set_filter(1_500.0, 0.4, 0.3);
        engine.set_chorus(0.8, 0.5, 0.3);
        engine.set_delay(0.25, 0.4, 0.3);
        engine.set_limiter(0.9, 5.0, 50.0);
        for note in [48, 55, 60, 64] {
            engine.on_note_on(note, 100);
        }

        group.bench_with_input(BenchmarkId::new("voices_and_fx", size), &size, |b, _| {
            b.iter(|| {
                engine.render_stereo(black_box(&mut left), black_box(&mut right));
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_oscillator,
    bench_filters,
    bench_envelope,
    bench_voice_manager,
    bench_engine,
);
criterion_main!(benches);
