//! Benchmarks for moving collections across the bridge

use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use ember_bridge::SparkBridge;
use ember_local::LocalRuntime;
use ember_sdk::SerializedClosure;

const SIZES: &[usize] = &[16, 1024, 65536];

// The local heap never frees, so every iteration gets a fresh runtime.

fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallelize_collect");
    for &size in SIZES {
        let data: Vec<i32> = (0..size as i32).collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter_batched(
                LocalRuntime::new,
                |runtime| {
                    let bridge = SparkBridge::new(&runtime);
                    let conf = bridge.build_configuration("bench").unwrap();
                    let context = bridge.build_context(conf).unwrap();
                    let rdd = bridge.parallelize(context, black_box(data)).unwrap();
                    black_box(bridge.collect(rdd).unwrap())
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let data: Vec<i32> = (0..1024).collect();
    let closure = SerializedClosure::new(vec![0xAC; 256]);

    c.bench_function("pipeline_1024_x4_maps", |b| {
        b.iter_batched(
            LocalRuntime::new,
            |runtime| {
                let bridge = SparkBridge::new(&runtime);
                let conf = bridge.build_configuration("bench").unwrap();
                let context = bridge.build_context(conf).unwrap();
                let mut rdd = bridge.parallelize(context, &data).unwrap();
                for _ in 0..4 {
                    rdd = bridge.map(rdd, black_box(&closure)).unwrap();
                }
                black_box(bridge.collect(rdd).unwrap())
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_byte_arrays(c: &mut Criterion) {
    let mut group = c.benchmark_group("byte_array");
    for &size in SIZES {
        let bytes = vec![0x5Au8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &bytes, |b, bytes| {
            b.iter_batched(
                LocalRuntime::new,
                |runtime| {
                    let bridge = SparkBridge::new(&runtime);
                    let env = bridge.env();
                    let array = env.new_byte_array(black_box(bytes)).unwrap();
                    let read = env.read_byte_array(array).unwrap();
                    black_box(read)
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_round_trip, bench_pipeline, bench_byte_arrays);
criterion_main!(benches);
