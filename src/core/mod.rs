pub mod mat;
pub mod mat_typed;
pub mod types;

pub use mat::{Mat, MatDepth};
pub use types::*;
