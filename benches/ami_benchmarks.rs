// ABOUTME: Benchmark suite for the manager protocol hot paths
// ABOUTME: Measures frame reassembly, field parsing, classification, action encoding and SMS segmentation

use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ami_gsm::action::{Action, GsmCommand};
use ami_gsm::event::classify;
use ami_gsm::frame::FrameAccumulator;
use ami_gsm::message::{Message, parse_fields};
use ami_gsm::sms::segment;
use std::time::Duration;

const SPAN_LIST: &str = "Response: Follows\r\nActionID: 1a2b3c4d-17\r\nPrivilege: Command\r\nGSM1: POWERON 220, PROVISIONED, OK, ACTIVE\r\nGSM2: POWERON 220, PROVISIONED, OK, ACTIVE\r\nGSM3: POWEROFF 0, NOT PROVISIONED, NO CARD, INACTIVE\r\nGSM4: POWERON 220, PROVISIONED, OK, ACTIVE";

const EVENT: &str = "Event: Newchannel\r\nPrivilege: call,all\r\nChannel: SIP/201-00000001\r\nChannelState: 0\r\nChannelStateDesc: Down\r\nCallerIDNum: 201\r\nUniqueid: 1700000000.1";

fn create_stream_bytes(blocks: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    for i in 0..blocks {
        let block = if i % 2 == 0 { SPAN_LIST } else { EVENT };
        bytes.extend_from_slice(block.as_bytes());
        bytes.extend_from_slice(b"\r\n\r\n");
    }
    bytes
}

fn bench_frame_feed(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_feed");
    group.measurement_time(Duration::from_secs(10));

    let stream = create_stream_bytes(64);

    group.bench_function("single_chunk", |b| {
        b.iter(|| {
            let mut accumulator = FrameAccumulator::new();
            black_box(accumulator.feed(black_box(&stream)))
        })
    });

    for chunk_size in [16, 256, 1460].iter() {
        group.bench_with_input(
            BenchmarkId::new("chunked", chunk_size),
            chunk_size,
            |b, &chunk_size| {
                b.iter(|| {
                    let mut accumulator = FrameAccumulator::new();
                    let mut frames = 0;
                    for chunk in stream.chunks(chunk_size) {
                        frames += accumulator.feed(black_box(chunk)).len();
                    }
                    black_box(frames)
                })
            },
        );
    }

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("span_list_fields", |b| {
        b.iter(|| parse_fields(black_box(SPAN_LIST)))
    });

    group.bench_function("event_fields", |b| b.iter(|| parse_fields(black_box(EVENT))));

    group.bench_function("classify_response", |b| {
        let message = Message::parse(SPAN_LIST);
        b.iter(|| classify(black_box(&message)))
    });

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    group.measurement_time(Duration::from_secs(10));

    let originate = Action::originate("201", "5551234", 30_000, "1a2b3c4d-18");
    group.bench_function("originate", |b| {
        b.iter(|| {
            let mut buf = BytesMut::with_capacity(256);
            black_box(&originate).encode(&mut buf);
            buf
        })
    });

    let show_spans = Action::command("1a2b3c4d-19", &GsmCommand::ShowSpans);
    group.bench_function("show_spans", |b| b.iter(|| black_box(&show_spans).to_bytes()));

    group.finish();
}

fn bench_segment(c: &mut Criterion) {
    let mut group = c.benchmark_group("sms_segment");
    group.measurement_time(Duration::from_secs(10));

    let narrow = "a".repeat(1000);
    let extended = "ж".repeat(1000);

    for length in [70, 160, 500, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("narrow", length), length, |b, &length| {
            b.iter(|| segment(black_box(&narrow[..length])))
        });

        // Two bytes per char, so slice on a char boundary.
        group.bench_with_input(BenchmarkId::new("extended", length), length, |b, &length| {
            b.iter(|| segment(black_box(&extended[..length * 2])))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_frame_feed,
    bench_parse,
    bench_encode,
    bench_segment
);
criterion_main!(benches);
