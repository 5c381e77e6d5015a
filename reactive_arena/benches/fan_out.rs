use criterion::{criterion_group, criterion_main, Criterion};
use reactive_arena::*;
use std::{cell::Cell, rc::Rc};

fn fan_out(c: &mut Criterion) {
    c.bench_function("fan_out", |b| {
        b.iter(|| {
            let (tick, set_tick) = create_signal(0);
            let total = Rc::new(Cell::new(0));

            let scope = create_effect_scope();
            scope.run(|| {
                for _ in 0..1000 {
                    create_effect({
                        let total = Rc::clone(&total);
                        move |_| {
                            tick.get();
                            total.set(total.get() + 1);
                        }
                    });
                }
            });
            set_tick.set(1);
            assert_eq!(total.get(), 2000);

            scope.stop();
            tick.dispose();
        });
    });
}

fn fan_out_batched(c: &mut Criterion) {
    c.bench_function("fan_out_batched", |b| {
        b.iter(|| {
            let (tick, set_tick) = create_signal(0);
            let total = Rc::new(Cell::new(0));

            let scope = create_effect_scope();
            scope.run(|| {
                for _ in 0..1000 {
                    create_effect({
                        let total = Rc::clone(&total);
                        move |_| {
                            tick.get();
                            total.set(total.get() + 1);
                        }
                    });
                }
            });
            batch(move || {
                for n in 1..=10 {
                    set_tick.set(n);
                }
            });
            assert_eq!(total.get(), 2000);

            scope.stop();
            tick.dispose();
        });
    });
}

criterion_group!(wide, fan_out, fan_out_batched);
criterion_main!(wide);
