//! Simple, single threaded test cases

#[cfg(not(loom))]
#[test]
fn pop_from_empty_deque() {
    let (mut owner, _stealer) = wsdeque::new::<i32>();
    assert_eq!(owner.pop(), None);
    assert!(owner.is_empty());
}

#[cfg(not(loom))]
#[test]
fn push_pop_roundtrip() {
    let (mut owner, _stealer) = wsdeque::new();
    owner.push(100);
    assert_eq!(owner.pop(), Some(100));
    assert_eq!(owner.pop(), None);
}

#[cfg(not(loom))]
#[test]
fn push_steal_roundtrip() {
    let (mut owner, stealer) = wsdeque::new();
    assert_eq!(stealer.steal(), None);
    owner.push(100);
    assert_eq!(stealer.steal(), Some(100));
    assert_eq!(stealer.steal(), None);
}

#[cfg(not(loom))]
#[test]
fn stealer_reports_emptiness() {
    let (mut owner, stealer) = wsdeque::new();
    assert!(stealer.is_empty());
    owner.push(5);
    assert!(!stealer.is_empty());
    assert_eq!(stealer.steal(), Some(5));
    assert!(stealer.is_empty());
}

#[cfg(not(loom))]
#[test]
fn pop_is_lifo() {
    let (mut owner, _stealer) = wsdeque::new();
    for i in 0..10 {
        owner.push(i);
    }
    for i in (0..10).rev() {
        assert_eq!(owner.pop(), Some(i));
    }
    assert_eq!(owner.pop(), None);
}

#[cfg(not(loom))]
#[test]
fn steal_is_fifo() {
    let (mut owner, stealer) = wsdeque::new();
    for i in 0..10 {
        owner.push(i);
    }
    for i in 0..10 {
        assert_eq!(stealer.steal(), Some(i));
    }
    assert_eq!(stealer.steal(), None);
}

#[cfg(not(loom))]
#[test]
fn grows_past_the_initial_capacity() {
    // Far beyond the initial 16 slots; the caller never observes capacity.
    const N: i64 = 100_000;

    let (mut owner, _stealer) = wsdeque::new();
    for i in 0..N {
        owner.push(i);
    }
    assert_eq!(owner.len(), N as usize);

    // Draining from the bottom walks back through the shrink path as well.
    for i in (0..N).rev() {
        assert_eq!(owner.pop(), Some(i));
    }
    assert!(owner.is_empty());
}

#[cfg(not(loom))]
#[test]
fn interleaved_pop_and_steal() {
    let (mut owner, stealer) = wsdeque::new();
    for i in 0..1000 {
        owner.push(i);
    }

    let mut out = Vec::new();
    loop {
        match (stealer.steal(), owner.pop()) {
            (None, None) => break,
            (top, bottom) => out.extend(top.into_iter().chain(bottom)),
        }
    }

    out.sort_unstable();
    assert_eq!(out, (0..1000).collect::<Vec<_>>());
}

#[cfg(not(loom))]
#[test]
fn moved_handles_keep_working() {
    let (mut owner, stealer) = wsdeque::new();
    owner.push(7);

    let mut owner = owner;
    let stealer = stealer;
    assert_eq!(stealer.steal(), Some(7));
    owner.push(8);
    assert_eq!(owner.pop(), Some(8));
}

#[cfg(not(loom))]
#[test]
fn leftover_elements_are_dropped_with_the_deque() {
    use std::rc::Rc;

    let payload = Rc::new(());
    let (mut owner, stealer) = wsdeque::new();
    for _ in 0..100 {
        owner.push(Rc::clone(&payload));
    }
    assert_eq!(Rc::strong_count(&payload), 101);

    for _ in 0..40 {
        assert!(owner.pop().is_some());
    }
    assert!(stealer.steal().is_some());
    assert_eq!(Rc::strong_count(&payload), 60);

    drop(owner);
    drop(stealer);
    assert_eq!(Rc::strong_count(&payload), 1);
}
