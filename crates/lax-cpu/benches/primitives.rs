use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use lax_core::primitive::{
    Computation, GatherDimensionNumbers, GatherSpec, Monoid, Padding, ScatterDimensionNumbers,
    WindowSpec,
};
use lax_core::{Array, Config, DType, Shape};
use lax_cpu::{CpuRefBackend, Engine};

fn engine() -> Engine {
    Engine::with_backend(Box::new(CpuRefBackend), Config::default())
}

fn ramp(n: usize, dims: &[usize]) -> Array {
    let data: Vec<f32> = (0..n).map(|i| ((i % 97) as f32) * 0.01).collect();
    Array::from_f32(&data, &Shape::new(dims.to_vec())).unwrap()
}

fn bench_conv(c: &mut Criterion) {
    let e = engine();
    let sizes: &[(usize, usize, &str)] = &[(16, 8, "16x16x8"), (32, 16, "32x32x16")];
    let mut group = c.benchmark_group("conv_nhwc_3x3_f32");

    for &(hw, ch, name) in sizes {
        let lhs = ramp(hw * hw * ch, &[1, hw, hw, ch]);
        let rhs = ramp(9 * ch * ch, &[3, 3, ch, ch]);
        group.throughput(Throughput::Elements((hw * hw * ch * 9 * ch) as u64));
        group.bench_function(BenchmarkId::new("same", name), |bench| {
            bench.iter(|| {
                e.conv(&lhs, &rhs, &[1, 1], "SAME", Some(("NHWC", "HWIO", "NHWC")))
                    .expect("conv")
            });
        });
    }
    group.finish();
}

fn bench_reduce_window(c: &mut Criterion) {
    let e = engine();
    let mut group = c.benchmark_group("reduce_window_f32");

    for &(n, name) in &[(64usize, "64x64"), (256, "256x256")] {
        let x = ramp(n * n, &[n, n]);
        let window = WindowSpec::new(vec![3, 3], vec![2, 2], Padding::Same);
        let neg_inf = Array::scalar(f32::NEG_INFINITY, DType::F32);
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_function(BenchmarkId::new("max_pool", name), |bench| {
            bench.iter(|| {
                e.reduce_window(&[&x], &[&neg_inf], Computation::Monoid(Monoid::Max), window.clone())
                    .expect("max_pool")
            });
        });
    }
    group.finish();
}

fn bench_gather_scatter(c: &mut Criterion) {
    let e = engine();
    let rows = 1024;
    let width = 64;
    let table = ramp(rows * width, &[rows, width]);
    let mut group = c.benchmark_group("gather_scatter_f32");

    for &n in &[256usize, 4096] {
        let idx_data: Vec<i32> = (0..n as i32).map(|i| (i * 37) % rows as i32).collect();
        let idx = Array::from_i32(&idx_data, &Shape::new(vec![n, 1])).unwrap();
        let spec = GatherSpec::new(
            GatherDimensionNumbers {
                offset_dims: vec![1],
                collapsed_slice_dims: vec![0],
                start_index_map: vec![0],
            },
            vec![1, width],
        );
        group.throughput(Throughput::Elements((n * width) as u64));
        group.bench_function(BenchmarkId::new("gather_rows", n), |bench| {
            bench.iter(|| e.gather(&table, &idx, spec.clone()).expect("gather"));
        });

        let updates = ramp(n * width, &[n, width]);
        let dnums = ScatterDimensionNumbers {
            update_window_dims: vec![1],
            inserted_window_dims: vec![0],
            scatter_dims_to_operand_dims: vec![0],
        };
        group.bench_function(BenchmarkId::new("scatter_add_rows", n), |bench| {
            bench.iter_batched(
                || Array::zeros(&Shape::new(vec![rows, width]), DType::F32),
                |operand| {
                    e.scatter_add(&operand, &idx, &updates, dnums.clone())
                        .expect("scatter_add")
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_sort(c: &mut Criterion) {
    let e = engine();
    let mut group = c.benchmark_group("sort_f32");

    for &(rows, cols, name) in &[(64usize, 256usize, "64x256"), (16, 4096, "16x4096")] {
        let data: Vec<f32> = (0..rows * cols).map(|i| ((i * 7919) % 1013) as f32).collect();
        let x = Array::from_f32(&data, &Shape::new(vec![rows, cols])).unwrap();
        group.throughput(Throughput::Elements((rows * cols) as u64));
        group.bench_function(BenchmarkId::new("sort_last_axis", name), |bench| {
            bench.iter(|| e.sort(&[&x], -1, true, 1).expect("sort"));
        });
        group.bench_function(BenchmarkId::new("top_k_16", name), |bench| {
            bench.iter(|| e.top_k(&x, 16).expect("top_k"));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_conv,
    bench_reduce_window,
    bench_gather_scatter,
    bench_sort
);
criterion_main!(benches);
