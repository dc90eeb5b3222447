mod common;

use std::sync::Arc;
use std::thread;

use common::*;
use jstree::{JournaledStringTree, TraversalConfig};

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn frozen_tree_is_shareable() {
    assert_send_sync::<JournaledStringTree>();
}

#[test]
fn parallel_traversers_agree_with_a_serial_run() {
    let jst = Arc::new(simple_jst());
    let serial: Vec<Vec<Vec<u8>>> = (1..=4)
        .map(|k| reconstruct(&jst, TraversalConfig::new(k).unwrap()))
        .collect();

    let parallel: Vec<Vec<Vec<u8>>> = thread::scope(|scope| {
        let handles: Vec<_> = (1..=4)
            .map(|k| {
                let jst = Arc::clone(&jst);
                scope.spawn(move || reconstruct(&jst, TraversalConfig::new(k).unwrap()))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("traversal thread panicked"))
            .collect()
    });

    assert_eq!(serial, parallel);
}

#[test]
fn split_traversers_share_one_borrowed_tree() {
    let jst = simple_jst();
    let traverser = jst.traverser(3).unwrap();
    let mut ahead = traverser.clone();
    ahead.go_next(10).unwrap();

    let (behind_count, ahead_count) = thread::scope(|scope| {
        let behind = scope.spawn(move || traverser.windows().count());
        let ahead = scope.spawn(move || ahead.windows().count());
        (
            behind.join().expect("thread panicked"),
            ahead.join().expect("thread panicked"),
        )
    });
    assert_eq!(behind_count, ahead_count + 10);
}
