// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use futures::StreamExt;
use rivulet_core::Observable;
use rivulet_flow::{observable_from_stream, Flowable, IntoStreamExt, OverflowPolicy, ToFlowableExt};
use rivulet_test_utils::TestObserver;

#[tokio::test]
async fn flowable_drains_into_a_futures_stream() -> anyhow::Result<()> {
    // Arrange
    let flowable = Flowable::from_iter(0..100);

    // Act
    let collected: Vec<i32> = flowable
        .into_stream()
        .map(|item| item.expect("value"))
        .collect()
        .await;

    // Assert
    assert_eq!(collected, (0..100).collect::<Vec<_>>());
    Ok(())
}

#[tokio::test]
async fn stream_adapter_prefetches_a_bounded_batch() -> anyhow::Result<()> {
    // the adapter requests a bounded prefetch up front, not unbounded demand
    use parking_lot::Mutex;
    use rivulet_flow::FlowEmitter;
    use std::sync::Arc;

    let observed: Arc<Mutex<u64>> = Arc::new(Mutex::new(0));
    let probe = Arc::clone(&observed);
    let flowable = Flowable::create(
        move |emitter: FlowEmitter<i32>| {
            *probe.lock() = emitter.requested();
            emitter.next(0);
            emitter.complete();
        },
        OverflowPolicy::Buffer,
    );

    let mut stream = flowable.into_stream();
    let first = stream.next().await.transpose()?;
    assert_eq!(first, Some(0));

    let prefetched = *observed.lock();
    assert!(prefetched > 0 && prefetched < u64::MAX);
    Ok(())
}

#[tokio::test]
async fn stream_surfaces_the_terminal_error() -> anyhow::Result<()> {
    // a firehose beyond prefetch + capacity overflows the Error policy; the
    // stream yields the prefetched values, then the error, then ends
    let flowable = Observable::range(0, 64).to_flowable_with_capacity(OverflowPolicy::Error, 4);

    let mut stream = flowable.into_stream();
    let mut delivered = 0usize;
    let mut saw_error = false;
    while let Some(item) = stream.next().await {
        match item {
            Ok(_) => {
                assert!(!saw_error, "value after the terminal error");
                delivered += 1;
            }
            Err(error) => {
                assert!(error.is_missing_backpressure());
                saw_error = true;
            }
        }
    }
    assert!(saw_error);
    assert!(delivered > 0 && delivered < 64);
    Ok(())
}

#[test]
fn observable_from_stream_replays_per_subscription() {
    // Arrange
    let source = observable_from_stream(|| futures::stream::iter(vec![1, 2, 3]));

    // Act
    let first = TestObserver::new();
    let second = TestObserver::new();
    source.subscribe(first.arc());
    source.subscribe(second.arc());

    // Assert - cold semantics carry over from the stream factory
    first.assert_values(&[1, 2, 3]);
    first.assert_completed();
    second.assert_values(&[1, 2, 3]);
    second.assert_completed();
}

#[test]
fn observable_from_stream_composes_with_operators() {
    let source = observable_from_stream(|| futures::stream::iter(0..10));
    let subscriber = rivulet_test_utils::TestSubscriber::with_initial_request(u64::MAX);
    source
        .to_flowable(OverflowPolicy::Buffer)
        .subscribe(subscriber.arc());

    assert_eq!(subscriber.value_count(), 10);
    subscriber.assert_completed();
}
