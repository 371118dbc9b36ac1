//! Model checks, run with `RUSTFLAGS="--cfg loom" cargo test --test loom --release`.

#![cfg(loom)]

use loom::thread;

#[test]
fn pop_and_steal_claim_distinct_elements() {
    loom::model(|| {
        let (mut owner, stealer) = wsdeque::new();
        owner.push(1);
        owner.push(2);

        let th = thread::spawn(move || stealer.steal());
        let popped = owner.pop();
        let stolen = th.join().unwrap();

        // With two elements there is no race to lose: the stealer takes the
        // top one and the owner the bottom one, in every interleaving.
        assert_eq!(stolen, Some(1));
        assert_eq!(popped, Some(2));
    });
}

#[test]
fn last_element_goes_to_exactly_one_end() {
    loom::model(|| {
        let (mut owner, stealer) = wsdeque::new();
        owner.push(7);

        let th = thread::spawn(move || stealer.steal());
        let popped = owner.pop();
        let stolen = th.join().unwrap();

        assert!(popped.is_some() ^ stolen.is_some());
        assert_eq!(popped.or(stolen), Some(7));
    });
}

#[test]
fn resize_publishes_elements_to_stealers() {
    loom::model(|| {
        let (mut owner, stealer) = wsdeque::new();

        let th = thread::spawn(move || stealer.steal());

        // Push past the initial capacity so the owner resizes, and runs the
        // reclamation scan, while the stealer may be mid-steal.
        for i in 0..16 {
            owner.push(i);
        }

        let stolen = th.join().unwrap();
        let mut all: Vec<i32> = stolen.into_iter().collect();
        while let Some(x) = owner.pop() {
            all.push(x);
        }

        all.sort_unstable();
        assert_eq!(all, (0..16).collect::<Vec<_>>());
    });
}
