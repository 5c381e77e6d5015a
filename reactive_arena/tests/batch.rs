use reactive_arena::*;
use std::{cell::Cell, rc::Rc};

fn counting_effect(a: ReadSignal<i32>, b: ReadSignal<i32>) -> Rc<Cell<i32>> {
    let runs = Rc::new(Cell::new(0));
    create_effect({
        let runs = Rc::clone(&runs);
        move |_| {
            a.get();
            b.get();
            runs.set(runs.get() + 1);
        }
    });
    runs
}

#[test]
fn batch_coalesces_writes() {
    let (a, set_a) = create_signal(0);
    let (b, set_b) = create_signal(0);
    let runs = counting_effect(a, b);
    assert_eq!(runs.get(), 1);

    batch(move || {
        set_a.set(1);
        set_b.set(1);
        set_a.set(2);
    });
    assert_eq!(runs.get(), 2);
}

#[test]
fn batch_applies_values_immediately() {
    let (a, set_a) = create_signal(0);
    batch(move || {
        set_a.set(5);
        // only the notification is deferred, not the write itself
        assert_eq!(a.get_untracked(), 5);
    });
    assert_eq!(a.get(), 5);
}

#[test]
fn nested_batches_drain_at_the_outermost() {
    let (a, set_a) = create_signal(0);
    let (b, set_b) = create_signal(0);
    let runs = counting_effect(a, b);

    batch({
        let runs = Rc::clone(&runs);
        move || {
            set_a.set(1);
            batch(move || {
                set_b.set(1);
            });
            // the inner batch closed, but the outer one still holds
            assert_eq!(runs.get(), 1);
        }
    });
    assert_eq!(runs.get(), 2);
}

#[test]
fn manual_batch_pairing() {
    let (a, set_a) = create_signal(0);
    let (b, set_b) = create_signal(0);
    let runs = counting_effect(a, b);

    start_batch();
    set_a.set(1);
    set_b.set(1);
    assert_eq!(runs.get(), 1);
    end_batch();
    assert_eq!(runs.get(), 2);
}

#[test]
fn batch_returns_the_closure_value() {
    let (a, set_a) = create_signal(1);
    let doubled = batch(move || {
        set_a.set(3);
        a.get_untracked() * 2
    });
    assert_eq!(doubled, 6);
}

#[test]
fn empty_batch_is_a_no_op() {
    let (a, set_a) = create_signal(0);
    let (b, _) = create_signal(0);
    let runs = counting_effect(a, b);

    batch(|| {});
    assert_eq!(runs.get(), 1);

    set_a.set(1);
    assert_eq!(runs.get(), 2);
}

#[test]
#[should_panic(expected = "without a matching `start_batch`")]
fn unbalanced_end_batch_panics() {
    end_batch();
}
