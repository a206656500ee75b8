//! FIFO lease/commit round-trip benchmarks.

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use fpgastream_fifo::pair;
use std::hint::black_box;

fn benchmark_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("fifo_round_trip");

    for chunk in [64usize, 1024, 4096] {
        group.throughput(Throughput::Bytes(chunk as u64));
        group.bench_function(format!("chunk_{chunk}"), |b| {
            let (mut writer, mut reader) = pair(64 * 1024).unwrap();
            let data = vec![0xA5u8; chunk];

            b.iter(|| {
                let mut remaining = &data[..];
                while !remaining.is_empty() {
                    let mut lease = writer.request();
                    let n = lease.len().min(remaining.len());
                    lease.as_mut_slice()[..n].copy_from_slice(&remaining[..n]);
                    lease.commit(n);
                    remaining = &remaining[n..];
                }

                let mut drained = 0;
                while drained < chunk {
                    let lease = reader.request();
                    let n = lease.len();
                    black_box(lease.as_slice());
                    lease.commit(n);
                    drained += n;
                }
            })
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_round_trip);
criterion_main!(benches);
