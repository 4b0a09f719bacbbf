//! Shape and dtype inference for lax primitives: broadcasting, dtype
//! promotion, dimension-number validation and window geometry.

pub mod broadcast;
pub mod convolution;
pub mod dimension_numbers;
pub mod dtype_promotion;
pub mod reduction;
pub mod shape_inference;
pub mod structural;
pub mod window;

pub use broadcast::{broadcast_in_dim_shape, broadcast_shapes};
pub use convolution::{ConvGeometry, conv_geometry, dot_general_shape};
pub use dtype_promotion::{ElemType, promote, promote_weak};
pub use shape_inference::{infer, resolve_axis};
pub use window::{padtype_to_pads, reduce_window_shape};
