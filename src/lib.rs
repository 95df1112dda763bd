pub mod graph;
pub mod ops;

pub use graph::*;
pub use ops::{Builtin, Elementwise, Input, Integration, Product, Repeat, Sum};
