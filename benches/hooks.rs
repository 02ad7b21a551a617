//! Benchmarks for spark-hooks
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use spark_hooks::{
    use_debounce, use_hover_ref, use_key_combo, use_local_storage_state, use_window_size, Event,
    MemoryHost, NodeRef, ValueCell,
};
use std::time::Duration;

// =============================================================================
// VALUE CELL BENCHMARKS
// =============================================================================

fn bench_cell_set(c: &mut Criterion) {
    let cell = ValueCell::new(0i32);
    let mut n = 0;
    c.bench_function("cell_set", |b| {
        b.iter(|| {
            n += 1;
            cell.set(black_box(n))
        })
    });
}

fn bench_cell_set_same_value(c: &mut Criterion) {
    let cell = ValueCell::new(42i32);
    c.bench_function("cell_set_same_value", |b| b.iter(|| cell.set(black_box(42))));
}

fn bench_cell_notify(c: &mut Criterion) {
    let mut group = c.benchmark_group("cell_notify");
    for subscribers in [1usize, 10, 100] {
        group.bench_with_input(
            BenchmarkId::new("subscribers", subscribers),
            &subscribers,
            |b, &subscribers| {
                let cell = ValueCell::new(0u64);
                let _subs: Vec<_> = (0..subscribers)
                    .map(|_| cell.subscribe(|v| {
                        black_box(v);
                    }))
                    .collect();
                b.iter(|| cell.update(|v| *v += 1));
            },
        );
    }
    group.finish();
}

// =============================================================================
// HOOK BENCHMARKS
// =============================================================================

fn bench_storage_write(c: &mut Criterion) {
    let host = MemoryHost::new();
    let _guard = host.install();
    let state = use_local_storage_state("counter", 0u64);
    let mut n = 0;
    c.bench_function("storage_write", |b| {
        b.iter(|| {
            n += 1;
            state.set(black_box(n));
        })
    });
}

fn bench_window_resize_dispatch(c: &mut Criterion) {
    let host = MemoryHost::new();
    let _guard = host.install();
    let size = use_window_size();
    let mut width = 0.0;
    c.bench_function("window_resize_dispatch", |b| {
        b.iter(|| {
            width += 1.0;
            host.window().resize_to(width, 600.0);
            black_box(size.get())
        })
    });
}

fn bench_key_combo(c: &mut Criterion) {
    let host = MemoryHost::new();
    let _guard = host.install();
    let combo = use_key_combo(&["Control", "Shift", "k"]);
    c.bench_function("key_combo_press_release", |b| {
        b.iter(|| {
            for key in ["Control", "Shift", "k"] {
                host.window().dispatch_event(Event::key("keydown", key));
            }
            black_box(combo.is_active_combo());
            for key in ["k", "Shift", "Control"] {
                host.window().dispatch_event(Event::key("keyup", key));
            }
        })
    });
}

fn bench_debounce_burst(c: &mut Criterion) {
    let host = MemoryHost::new();
    let _guard = host.install();
    let input = ValueCell::new(0u32);
    let debounced = use_debounce(&input.read_only(), Duration::from_millis(50));
    c.bench_function("debounce_burst_100", |b| {
        b.iter(|| {
            for _ in 0..100 {
                input.update(|v| *v += 1);
                host.advance_ms(10);
            }
            host.advance_ms(50);
            black_box(debounced.get())
        })
    });
}

// =============================================================================
// STRESS BENCHMARKS
// =============================================================================

fn bench_retarget(c: &mut Criterion) {
    let mut group = c.benchmark_group("retarget");
    for hooks in [1usize, 10, 100] {
        group.bench_with_input(BenchmarkId::new("hover_hooks", hooks), &hooks, |b, &hooks| {
            let host = MemoryHost::new();
            let _guard = host.install();
            let a = host.document().create_element("div");
            let z = host.document().create_element("div");
            let node = NodeRef::with_element(a.clone());
            let _hovers: Vec<_> = (0..hooks).map(|_| use_hover_ref(&node)).collect();
            let mut flip = false;
            b.iter(|| {
                flip = !flip;
                node.set(if flip { z.clone() } else { a.clone() });
            });
        });
    }
    group.finish();
}

criterion_group!(
    cell_benches,
    bench_cell_set,
    bench_cell_set_same_value,
    bench_cell_notify,
);

criterion_group!(
    hook_benches,
    bench_storage_write,
    bench_window_resize_dispatch,
    bench_key_combo,
    bench_debounce_burst,
);

criterion_group!(stress_benches, bench_retarget);

criterion_main!(cell_benches, hook_benches, stress_benches);
