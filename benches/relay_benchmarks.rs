use std::hint::black_box;

use bytes::Bytes;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use psmon_relay::{
    network::{encode_message, FrameQueue},
    pubsub::{filter_matches, topic_frame, SubscriptionFrame},
    LastValueCache, Mailbox, MailboxMessage, MessageKind,
};

fn bench_encode_message(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_message");
    for size in [64usize, 4096, 1 << 20] {
        let parts = [topic_frame("detector"), Bytes::from(vec![7u8; size])];
        group.bench_with_input(BenchmarkId::from_parameter(size), &parts, |b, parts| {
            b.iter(|| black_box(encode_message(black_box(parts))))
        });
    }
    group.finish();
}

fn bench_frame_queue_conflation(c: &mut Criterion) {
    c.bench_function("frame_queue_push_evicting", |b| {
        let queue = FrameQueue::new(5);
        let payload = Bytes::from_static(b"payload");
        b.iter(|| black_box(queue.push(payload.clone())))
    });

    c.bench_function("frame_queue_push_pop", |b| {
        let queue = FrameQueue::new(0);
        let payload = Bytes::from_static(b"payload");
        b.iter(|| {
            queue.push(payload.clone());
            black_box(queue.try_pop().ok())
        })
    });
}

fn bench_cache_update(c: &mut Criterion) {
    c.bench_function("cache_update_existing_topic", |b| {
        let mut cache = LastValueCache::new();
        cache.update("image", Bytes::from_static(b"v0"));
        let payload = Bytes::from_static(b"v1");
        b.iter(|| black_box(cache.update("image", payload.clone())))
    });

    c.bench_function("cache_update_new_topics", |b| {
        let payload = Bytes::from_static(b"v");
        let topics: Vec<String> = (0..64).map(|i| format!("topic-{i}")).collect();
        b.iter(|| {
            let mut cache = LastValueCache::new();
            for topic in &topics {
                cache.update(topic, payload.clone());
            }
            black_box(cache.topics().len())
        })
    });
}

fn bench_subscription_routing(c: &mut Criterion) {
    let filters: Vec<Bytes> = (0..32).map(|i| topic_frame(&format!("topic-{i}"))).collect();
    let frame = topic_frame("topic-31");
    c.bench_function("route_32_filters", |b| {
        b.iter(|| {
            black_box(
                filters
                    .iter()
                    .filter(|f| filter_matches(f, black_box(&frame)))
                    .count(),
            )
        })
    });

    let encoded = SubscriptionFrame::subscribe(topic_frame("detector")).encode();
    c.bench_function("subscription_frame_parse", |b| {
        b.iter(|| black_box(SubscriptionFrame::parse(black_box(&encoded))))
    });
}

fn bench_mailbox(c: &mut Criterion) {
    c.bench_function("mailbox_put_get", |b| {
        let mailbox = Mailbox::new("cmd", 0, MessageKind::Text);
        b.iter(|| {
            mailbox.put(MailboxMessage::Text("reset".to_string()));
            black_box(mailbox.get())
        })
    });
}

criterion_group!(
    benches,
    bench_encode_message,
    bench_frame_queue_conflation,
    bench_cache_update,
    bench_subscription_routing,
    bench_mailbox
);
criterion_main!(benches);
