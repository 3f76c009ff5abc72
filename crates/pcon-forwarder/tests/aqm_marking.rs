//! Integration test: CoDel mark emission timeline.
//!
//! With `target = 5ms` and `interval = 100ms`, a queue whose packets sit for
//! 10ms arms at the first over-target dequeue, enters the marking regime one
//! interval later, and then paces marks at `interval/√count`.

use pcon_forwarder::config::QueueConfig;
use pcon_forwarder::queue::{LinkQueue, MTU_BYTES};
use quanta::Clock;
use std::time::Duration;

#[test]
fn first_mark_one_interval_after_persistent_over_target() {
    let (clock, mock) = Clock::mock();
    let mut q: LinkQueue<u64> = LinkQueue::new(&QueueConfig::default());

    // a standing backlog of full-size packets, all enqueued at t=0
    for i in 0..40 {
        q.enqueue(i, MTU_BYTES, clock.now()).unwrap();
    }

    // dequeue every 10ms: sojourn is always over the 5ms target
    let mut first_mark_at_ms = None;
    for step in 1..=20u64 {
        mock.increment(Duration::from_millis(10));
        q.dequeue(clock.now());
        if q.ok_to_mark(clock.now()) {
            first_mark_at_ms = Some(step * 10);
            break;
        }
    }

    // first over-target sample at t=10ms arms t=110ms; the mark fires there
    assert_eq!(first_mark_at_ms, Some(110));
}

#[test]
fn subsequent_marks_follow_the_control_law_cadence() {
    let (clock, mock) = Clock::mock();
    let mut q: LinkQueue<u64> = LinkQueue::new(&QueueConfig::default());
    for i in 0..200 {
        q.enqueue(i, MTU_BYTES, clock.now()).unwrap();
    }

    // walk in 1ms steps, dequeueing every 10ms, sampling the mark signal
    // every step, and record when marks fire
    let mut mark_times_ms = Vec::new();
    for t in 1..=400u64 {
        mock.increment(Duration::from_millis(1));
        if t % 10 == 0 {
            q.dequeue(clock.now());
        }
        if q.ok_to_mark(clock.now()) {
            mark_times_ms.push(t);
        }
        if mark_times_ms.len() == 3 {
            break;
        }
    }

    assert_eq!(mark_times_ms[0], 110, "first mark one interval in");
    assert_eq!(
        mark_times_ms[1] - mark_times_ms[0],
        100,
        "second mark after interval/√1"
    );
    // third mark after interval/√2 ≈ 70.7ms
    let third_gap = mark_times_ms[2] - mark_times_ms[1];
    assert!(
        (70..=72).contains(&third_gap),
        "third mark after interval/√2, got {third_gap}ms"
    );
}

#[test]
fn marks_stop_when_the_queue_drains() {
    let (clock, mock) = Clock::mock();
    let mut q: LinkQueue<u64> = LinkQueue::new(&QueueConfig::default());
    for i in 0..40 {
        q.enqueue(i, MTU_BYTES, clock.now()).unwrap();
    }
    for _ in 0..11 {
        mock.increment(Duration::from_millis(10));
        q.dequeue(clock.now());
    }
    assert!(q.ok_to_mark(clock.now()), "queue is in the marking regime");

    // drain everything; the backlog falls under one MTU and the control law
    // resets
    while q.dequeue(clock.now()).is_some() {}
    q.enqueue(99, MTU_BYTES, clock.now()).unwrap();
    q.dequeue(clock.now());
    mock.increment(Duration::from_secs(1));
    assert!(!q.ok_to_mark(clock.now()));
}
