use reactive_arena::*;

#[test]
fn basic_signal() {
    let (a, set_a) = create_signal(0);
    assert_eq!(a.get(), 0);
    set_a.set(5);
    assert_eq!(a.get(), 5);
}

#[test]
fn signal_with_and_update() {
    let (a, set_a) = create_signal(String::from("alpha"));
    assert_eq!(a.with(|s| s.len()), 5);
    set_a.update(|s| s.push('!'));
    assert_eq!(a.get(), "alpha!");
}

#[test]
fn rw_signal_round_trip() {
    let n = create_rw_signal(1);
    n.update(|n| *n *= 10);
    assert_eq!(n.get(), 10);

    let read = n.read_only();
    let write = n.write_only();
    write.set(3);
    assert_eq!(read.get(), 3);
}

#[test]
fn equal_write_is_skipped() {
    use std::{cell::Cell, rc::Rc};

    let (a, set_a) = create_signal(1);
    let runs = Rc::new(Cell::new(0));
    create_effect({
        let runs = Rc::clone(&runs);
        move |_| {
            a.get();
            runs.set(runs.get() + 1);
        }
    });
    assert_eq!(runs.get(), 1);

    // writing the value already stored notifies no one
    set_a.set(1);
    assert_eq!(runs.get(), 1);

    set_a.set(2);
    assert_eq!(runs.get(), 2);
}

#[test]
fn update_always_notifies() {
    use std::{cell::Cell, rc::Rc};

    let (a, set_a) = create_signal(1);
    let runs = Rc::new(Cell::new(0));
    create_effect({
        let runs = Rc::clone(&runs);
        move |_| {
            a.get();
            runs.set(runs.get() + 1);
        }
    });
    assert_eq!(runs.get(), 1);

    // update makes no equality check, even when the closure changed nothing
    set_a.update(|_| {});
    assert_eq!(runs.get(), 2);
}

#[test]
fn untracked_write_is_silent() {
    use std::{cell::Cell, rc::Rc};

    let (a, set_a) = create_signal(1);
    let runs = Rc::new(Cell::new(0));
    create_effect({
        let runs = Rc::clone(&runs);
        move |_| {
            a.get();
            runs.set(runs.get() + 1);
        }
    });

    set_a.set_untracked(7);
    assert_eq!(runs.get(), 1);
    assert_eq!(a.get(), 7);

    set_a.update_untracked(|n| *n += 1);
    assert_eq!(runs.get(), 1);
    assert_eq!(a.get(), 8);
}

#[test]
fn disposed_signal_reports_through_try() {
    let (a, set_a) = create_signal(1);
    a.dispose();

    assert_eq!(a.try_get(), None);
    assert_eq!(a.try_with(|n| *n), Err(ReactiveError::Disposed));
    // a failed set hands the value back
    assert_eq!(set_a.try_set(9), Some(9));
    assert_eq!(set_a.try_update(|n| *n), None);
}

#[test]
#[should_panic(expected = "tried to access a signal after it was disposed")]
fn read_of_disposed_signal_panics() {
    let (a, _) = create_signal(1);
    a.dispose();
    a.get();
}

#[test]
#[should_panic(expected = "tried to set a signal after it was disposed")]
fn write_to_disposed_signal_panics() {
    let (a, set_a) = create_signal(1);
    a.dispose();
    set_a.set(2);
}
