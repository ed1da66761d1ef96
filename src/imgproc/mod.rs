pub mod color;
pub mod edge;
pub mod filter;
pub mod geometric;
pub mod quantized;

pub use color::*;
pub use edge::*;
pub use filter::*;
pub use geometric::*;
pub use quantized::*;
