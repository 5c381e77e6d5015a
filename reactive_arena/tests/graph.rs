use reactive_arena::*;
use std::{cell::Cell, rc::Rc};

#[test]
fn write_after_subscriber_disposal_is_clean() {
    let (a, set_a) = create_signal(0);
    let runs = Rc::new(Cell::new(0));
    let effect = create_effect({
        let runs = Rc::clone(&runs);
        move |_| {
            a.get();
            runs.set(runs.get() + 1);
        }
    });

    effect.stop();
    set_a.set(1);
    set_a.set(2);
    assert_eq!(runs.get(), 1);
    assert_eq!(a.get(), 2);
}

#[test]
fn survivors_keep_running_after_a_dependency_is_disposed() {
    let (a, set_a) = create_signal(1);
    let m = create_memo(move |_| a.get() * 2);
    let runs = Rc::new(Cell::new(0));
    let last = Rc::new(Cell::new(None));

    create_effect({
        let runs = Rc::clone(&runs);
        let last = Rc::clone(&last);
        move |_| {
            runs.set(runs.get() + 1);
            last.set(m.try_get());
            a.get();
        }
    });
    assert_eq!(runs.get(), 1);
    assert_eq!(last.get(), Some(2));

    m.dispose();

    // the effect still subscribes to `a` directly, and the edge it held
    // to the dead memo is dropped on its next run
    set_a.set(3);
    assert_eq!(runs.get(), 2);
    assert_eq!(last.get(), None);

    set_a.set(4);
    assert_eq!(runs.get(), 3);
}

#[test]
fn wide_fan_out() {
    let (a, set_a) = create_signal(0);
    let runs = Rc::new(Cell::new(0));

    for _ in 0..100 {
        create_effect({
            let runs = Rc::clone(&runs);
            move |_| {
                a.get();
                runs.set(runs.get() + 1);
            }
        });
    }
    assert_eq!(runs.get(), 100);

    set_a.set(1);
    assert_eq!(runs.get(), 200);
}

#[test]
fn dependency_churn_returns_to_baseline() {
    let (toggle, set_toggle) = create_signal(false);
    let (x, _) = create_signal(1);

    create_effect(move |_| {
        if toggle.get() {
            x.get();
        }
    });

    let links = live_link_count();
    let nodes = live_node_count();

    for _ in 0..10 {
        set_toggle.set(true);
        set_toggle.set(false);
    }

    // the extra edge to `x` is created and freed once per cycle, reusing
    // pooled slots rather than growing the arena
    assert_eq!(live_link_count(), links);
    assert_eq!(live_node_count(), nodes);
}

#[test]
fn nested_effect_churn_returns_to_baseline() {
    let (outer, set_outer) = create_signal(0);
    let (inner, _) = create_signal(0);

    create_effect(move |_| {
        outer.get();
        create_effect(move |_| {
            inner.get();
        });
    });

    let links = live_link_count();
    let nodes = live_node_count();

    for n in 1..=10 {
        set_outer.set(n);
    }

    // each rerun replaces the nested effect, node and links alike
    assert_eq!(live_link_count(), links);
    assert_eq!(live_node_count(), nodes);
}

#[test]
fn disposing_everything_empties_the_graph() {
    let nodes_before = live_node_count();
    let links_before = live_link_count();

    let (a, set_a) = create_signal(1);
    let m = create_memo(move |_| a.get() + 1);
    let effect = create_effect(move |_| {
        m.get();
    });

    set_a.set(2);
    effect.stop();
    m.dispose();
    a.dispose();

    assert_eq!(live_node_count(), nodes_before);
    assert_eq!(live_link_count(), links_before);
}

#[test]
fn trigger_wakes_subscribers() {
    let rerun = create_trigger();
    let runs = Rc::new(Cell::new(0));

    create_effect({
        let runs = Rc::clone(&runs);
        move |_| {
            rerun.track();
            runs.set(runs.get() + 1);
        }
    });
    assert_eq!(runs.get(), 1);

    rerun.notify();
    rerun.notify();
    assert_eq!(runs.get(), 3);

    rerun.dispose();
    assert!(!rerun.try_notify());
    assert_eq!(runs.get(), 3);
}

#[test]
fn trigger_notifications_batch() {
    let rerun = create_trigger();
    let runs = Rc::new(Cell::new(0));

    create_effect({
        let runs = Rc::clone(&runs);
        move |_| {
            rerun.track();
            runs.set(runs.get() + 1);
        }
    });

    batch(move || {
        rerun.notify();
        rerun.notify();
        rerun.notify();
    });
    assert_eq!(runs.get(), 2);
}
