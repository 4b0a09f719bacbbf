use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use lax_core::primitive::{
    Computation, GatherDimensionNumbers, GatherSpec, Monoid, Padding, ScatterDimensionNumbers,
    WindowSpec,
};
use lax_core::{Array, Config, DType, Result, Shape};
use lax_cpu::Engine;
use lax_ops::{ElemType, promote, promote_weak};

#[derive(Parser)]
#[command(name = "lax-cli")]
#[command(about = "oxidizedLAX development CLI")]
struct Args {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run a quick tour of the primitive families on the CPU engine.
    Smoke,
    /// Print the dtype promotion table.
    Dtypes {
        /// Treat the column operand as a weakly typed literal.
        #[arg(long)]
        weak: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match args.cmd {
        Cmd::Smoke => smoke(),
        Cmd::Dtypes { weak } => {
            dtypes(weak);
            Ok(())
        }
    }
}

fn f32s(data: &[f32], dims: &[usize]) -> Result<Array> {
    Array::from_f32(data, &Shape::new(dims.to_vec()))
}

fn smoke() -> Result<()> {
    let e = Engine::new(Config::from_env());
    info!(backend = e.backend_name(), x64 = e.config().enable_x64, "engine ready");

    // elementwise with a weak literal
    let x = f32s(&[1.0, 2.0, 3.0], &[3])?;
    let y = e.mul(&x, &e.literal(2.0))?;
    println!("[1,2,3] * 2 = {:?} ({})", y.to_vec_f32(), y.aval());

    // conv, SAME padding
    let img = Array::ones(&Shape::new(vec![1, 3, 3, 1]), DType::F32);
    let kernel = Array::ones(&Shape::new(vec![3, 3, 1, 1]), DType::F32);
    let conv = e.conv(&img, &kernel, &[1, 1], "SAME", Some(("NHWC", "HWIO", "NHWC")))?;
    println!("conv 3x3 ones SAME = {:?}", conv.to_vec_f32());

    // max pool
    let grid = f32s(&(0..16).map(|i| i as f32).collect::<Vec<_>>(), &[4, 4])?;
    let neg_inf = Array::scalar(f32::NEG_INFINITY, DType::F32);
    let pooled = e.reduce_window(
        &[&grid],
        &[&neg_inf],
        Computation::Monoid(Monoid::Max),
        WindowSpec::new(vec![2, 2], vec![2, 2], Padding::Valid),
    )?;
    println!("max_pool 2x2 of 0..16 = {:?}", pooled[0].to_vec_f32());

    // gather rows
    let table = f32s(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[3, 2])?;
    let rows = Array::from_i32(&[2, 0], &Shape::new(vec![2, 1]))?;
    let gathered = e.gather(
        &table,
        &rows,
        GatherSpec::new(
            GatherDimensionNumbers {
                offset_dims: vec![1],
                collapsed_slice_dims: vec![0],
                start_index_map: vec![0],
            },
            vec![1, 2],
        ),
    )?;
    println!("gather rows [2,0] = {:?}", gathered.to_vec_f32());

    // scatter_add with duplicate indices
    let bins = Array::zeros(&Shape::new(vec![4]), DType::F32);
    let idx = Array::from_i32(&[1, 3, 1], &Shape::new(vec![3, 1]))?;
    let upd = f32s(&[1.0, 2.0, 3.0], &[3])?;
    let dnums = ScatterDimensionNumbers {
        update_window_dims: vec![],
        inserted_window_dims: vec![0],
        scatter_dims_to_operand_dims: vec![0],
    };
    let summed = e.scatter_add(&bins, &idx, &upd, dnums)?;
    println!("scatter_add [1,3,1] <- [1,2,3] = {:?}", summed.to_vec_f32());

    // sort and top_k
    let v = f32s(&[3.0, 1.0, 4.0, 1.0, 5.0], &[5])?;
    let sorted = e.sort(&[&v], -1, true, 1)?;
    let (top, top_idx) = e.top_k(&v, 2)?;
    println!(
        "sort = {:?}, top_k(2) = {:?} at {:?}",
        sorted[0].to_vec_f32(),
        top.to_vec_f32(),
        top_idx.to_vec_i64()
    );

    // pad with interior dilation, dynamic_slice with clamping
    let zero = Array::scalar(0.0f32, DType::F32);
    let padded = e.pad(&x, &zero, &[(1, 1, 1)])?;
    let start = Array::scalar(9, DType::I32);
    let window = e.dynamic_slice(&padded, &[&start], &[3])?;
    println!(
        "pad (1,1,1) = {:?}, dynamic_slice@9 = {:?}",
        padded.to_vec_f32(),
        window.to_vec_f32()
    );

    println!("\nAll smoke tests passed.");
    Ok(())
}

fn dtypes(weak: bool) {
    let all = DType::ALL;
    print!("{:>6}", "");
    for d in all {
        print!("{:>6}", d.short_name());
    }
    println!();
    for a in all {
        print!("{:>6}", a.short_name());
        for b in all {
            let name = if weak {
                let r = promote_weak(ElemType::strong(a), ElemType::weak(b));
                r.dtype.short_name()
            } else {
                promote(a, b).short_name()
            };
            print!("{name:>6}");
        }
        println!();
    }
}
