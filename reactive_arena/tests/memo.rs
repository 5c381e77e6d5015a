use reactive_arena::*;

#[test]
fn basic_memo() {
    let a = create_memo(|_| 5);
    assert_eq!(a.get(), 5);
}

#[test]
fn memo_with_computed_value() {
    let (a, set_a) = create_signal(0);
    let (b, set_b) = create_signal(0);
    let c = create_memo(move |_| a.get() + b.get());
    assert_eq!(c.get(), 0);
    set_a.set(5);
    assert_eq!(c.get(), 5);
    set_b.set(1);
    assert_eq!(c.get(), 6);
}

#[test]
fn nested_memos() {
    let (a, set_a) = create_signal(0);
    let (b, set_b) = create_signal(0);
    let c = create_memo(move |_| a.get() + b.get());
    let d = create_memo(move |_| c.get() * 2);
    let e = create_memo(move |_| d.get() + 1);
    assert_eq!(d.get(), 0);
    set_a.set(5);
    assert_eq!(e.get(), 11);
    assert_eq!(d.get(), 10);
    assert_eq!(c.get(), 5);
    set_b.set(1);
    assert_eq!(e.get(), 13);
    assert_eq!(d.get(), 12);
    assert_eq!(c.get(), 6);
}

#[test]
fn memo_runs_only_when_inputs_change() {
    use std::{cell::Cell, rc::Rc};

    let call_count = Rc::new(Cell::new(0));
    let (a, set_a) = create_signal(0);
    let (b, _) = create_signal(0);
    let (c, _) = create_signal(0);

    let sum = create_memo({
        let call_count = call_count.clone();
        move |_| {
            call_count.set(call_count.get() + 1);
            a.get() + b.get() + c.get()
        }
    });

    // the memo is lazy: nothing has run yet
    assert_eq!(call_count.get(), 0);

    assert_eq!(sum.get(), 0);
    assert_eq!(sum.get(), 0);
    assert_eq!(sum.get(), 0);

    // still only computed once
    assert_eq!(call_count.get(), 1);

    // and only recomputed when an input changes
    set_a.set(1);
    assert_eq!(sum.get(), 1);
    assert_eq!(call_count.get(), 2);
}

#[test]
fn diamond_problem() {
    use std::{cell::Cell, rc::Rc};

    let (name, set_name) = create_signal("Greg Johnston".to_string());
    let first = create_memo(move |_| {
        name.get().split_whitespace().next().unwrap().to_string()
    });
    let last = create_memo(move |_| {
        name.get().split_whitespace().nth(1).unwrap().to_string()
    });

    let combined_count = Rc::new(Cell::new(0));
    let combined = create_memo({
        let combined_count = Rc::clone(&combined_count);
        move |_| {
            combined_count.set(combined_count.get() + 1);
            format!("{} {}", first.get(), last.get())
        }
    });

    assert_eq!(first.get(), "Greg");
    assert_eq!(last.get(), "Johnston");

    set_name.set("Will Smith".to_string());
    assert_eq!(first.get(), "Will");
    assert_eq!(last.get(), "Smith");
    assert_eq!(combined.get(), "Will Smith");
    // both branches converged on the memo, but it only ran once
    assert_eq!(combined_count.get(), 1);
}

#[test]
fn diamond_observed_by_effect() {
    use std::{cell::Cell, rc::Rc};

    let (n, set_n) = create_signal(1);
    let left = create_memo(move |_| n.get() + 1);
    let right = create_memo(move |_| n.get() * 10);
    let sum_count = Rc::new(Cell::new(0));
    let sum = create_memo({
        let sum_count = Rc::clone(&sum_count);
        move |_| {
            sum_count.set(sum_count.get() + 1);
            left.get() + right.get()
        }
    });

    let seen = Rc::new(Cell::new(0));
    let effect_runs = Rc::new(Cell::new(0));
    create_effect({
        let seen = Rc::clone(&seen);
        let effect_runs = Rc::clone(&effect_runs);
        move |_| {
            seen.set(sum.get());
            effect_runs.set(effect_runs.get() + 1);
        }
    });
    assert_eq!(seen.get(), 12);
    assert_eq!(sum_count.get(), 1);
    assert_eq!(effect_runs.get(), 1);

    set_n.set(2);
    // one write reaches the effect through both arms of the diamond, yet
    // the memo recomputes once and the effect sees only the final value
    assert_eq!(seen.get(), 23);
    assert_eq!(sum_count.get(), 2);
    assert_eq!(effect_runs.get(), 2);
}

#[test]
fn dynamic_dependencies() {
    use std::{cell::Cell, rc::Rc};

    let (first, set_first) = create_signal("Greg");
    let (last, set_last) = create_signal("Johnston");
    let (use_last, set_use_last) = create_signal(true);
    let name = create_memo(move |_| {
        if use_last.get() {
            format!("{} {}", first.get(), last.get())
        } else {
            first.get().to_string()
        }
    });

    let combined_count = Rc::new(Cell::new(0));

    create_effect({
        let combined_count = Rc::clone(&combined_count);
        move |_| {
            _ = name.get();
            combined_count.set(combined_count.get() + 1);
        }
    });

    assert_eq!(combined_count.get(), 1);

    set_first.set("Bob");
    assert_eq!(name.get(), "Bob Johnston");
    assert_eq!(combined_count.get(), 2);

    set_last.set("Thompson");
    assert_eq!(combined_count.get(), 3);

    set_use_last.set(false);
    assert_eq!(name.get(), "Bob");
    assert_eq!(combined_count.get(), 4);

    // the memo no longer reads `last`, so these writes go nowhere
    set_last.set("Jones");
    assert_eq!(combined_count.get(), 4);
    set_last.set("Smith");
    assert_eq!(combined_count.get(), 4);
    set_last.set("Stevens");
    assert_eq!(combined_count.get(), 4);

    set_use_last.set(true);
    assert_eq!(name.get(), "Bob Stevens");
    assert_eq!(combined_count.get(), 5);
}

#[test]
fn memo_receives_previous_value() {
    let (step, set_step) = create_signal(1);
    let total = create_memo(move |prev: Option<&i32>| prev.copied().unwrap_or(0) + step.get());

    assert_eq!(total.get(), 1);
    set_step.set(2);
    assert_eq!(total.get(), 3);
    set_step.set(10);
    assert_eq!(total.get(), 13);
}

#[test]
fn unchanged_memo_value_stops_downstream() {
    use std::{cell::Cell, rc::Rc};

    let (n, set_n) = create_signal(1);
    let parity = create_memo(move |_| n.get() % 2);
    let runs = Rc::new(Cell::new(0));
    create_effect({
        let runs = Rc::clone(&runs);
        move |_| {
            parity.get();
            runs.set(runs.get() + 1);
        }
    });
    assert_eq!(runs.get(), 1);

    // 1 -> 3 recomputes the parity but its value is unchanged, so the
    // effect settles back to clean without running
    set_n.set(3);
    assert_eq!(runs.get(), 1);

    set_n.set(4);
    assert_eq!(runs.get(), 2);
}

#[test]
fn deep_memo_chain() {
    let (a, set_a) = create_signal(0);
    let mut current = create_memo(move |_| a.get() + 1);
    for _ in 0..63 {
        let prev = current;
        current = create_memo(move |_| prev.get() + 1);
    }

    assert_eq!(current.get(), 64);
    set_a.set(10);
    assert_eq!(current.get(), 74);
}

#[test]
fn deep_memo_chain_wakes_effect_once() {
    use std::{cell::Cell, rc::Rc};

    let (a, set_a) = create_signal(0);
    let mut current = create_memo(move |_| a.get() + 1);
    for _ in 0..63 {
        let prev = current;
        current = create_memo(move |_| prev.get() + 1);
    }

    let runs = Rc::new(Cell::new(0));
    let seen = Rc::new(Cell::new(0));
    create_effect({
        let runs = Rc::clone(&runs);
        let seen = Rc::clone(&seen);
        move |_| {
            seen.set(current.get());
            runs.set(runs.get() + 1);
        }
    });
    assert_eq!(seen.get(), 64);
    assert_eq!(runs.get(), 1);

    set_a.set(100);
    assert_eq!(seen.get(), 164);
    assert_eq!(runs.get(), 2);
}

#[test]
fn disposed_memo_reports_through_try() {
    let (a, _) = create_signal(1);
    let m = create_memo(move |_| a.get() + 1);
    assert_eq!(m.get(), 2);

    m.dispose();
    assert_eq!(m.try_get(), None);
    assert_eq!(m.try_with(|n| *n), Err(ReactiveError::Disposed));
}

#[test]
#[should_panic(expected = "cycle detected")]
fn memo_reading_itself_panics() {
    use std::{cell::Cell, rc::Rc};

    let slot: Rc<Cell<Option<Memo<i32>>>> = Rc::new(Cell::new(None));
    let m = create_memo({
        let slot = Rc::clone(&slot);
        move |_| match slot.get() {
            Some(inner) => inner.get(),
            None => 0,
        }
    });
    slot.set(Some(m));
    m.get();
}
