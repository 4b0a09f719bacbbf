//! Pure Rust CPU executors, the correctness oracle for conformance testing.
//!
//! Executors work on [`Scalar`](lax_core::Scalar) elements and compute in
//! 64-bit, rounding to the result dtype; independent output elements are
//! computed in parallel with rayon. The [`Engine`] is the dispatch core that
//! runs shape inference from `lax-ops` before any executor.

pub mod backend;
pub mod conv;
pub mod elementwise;
pub mod engine;
pub mod gather_scatter;
pub mod index;
mod lax;
pub mod reduce;
pub mod slicing;
pub mod sort;
pub mod special;

pub use backend::CpuRefBackend;
pub use engine::{Engine, cpu_engine};
