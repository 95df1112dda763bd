//! Built-in operations.
//!
//! Every operation follows the same buffer contract: when the node owns a `data`
//! buffer the result is written into it, otherwise a new buffer is allocated and
//! returned. Reductions accumulate into whatever `data` already holds.

mod elementwise;
mod reduce;

pub use elementwise::{Elementwise, Input, Repeat};
pub use reduce::{Integration, Product, Sum};

use crate::graph::{Operation, Produced};

/// The fixed table of named operations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    Input,
    Sum,
    Product,
    Integration,
    Sin,
    Cosh,
    Tan,
    Sinh,
}

impl Builtin {
    pub const ALL: [Builtin; 8] = [
        Builtin::Input,
        Builtin::Sum,
        Builtin::Product,
        Builtin::Integration,
        Builtin::Sin,
        Builtin::Cosh,
        Builtin::Tan,
        Builtin::Sinh,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Input => "input",
            Builtin::Sum => "sum",
            Builtin::Product => "product",
            Builtin::Integration => "integration",
            Builtin::Sin => "sin",
            Builtin::Cosh => "cosh",
            Builtin::Tan => "tan",
            Builtin::Sinh => "sinh",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    pub fn operation(self) -> Box<dyn Operation> {
        match self {
            Builtin::Input => Box::new(Input),
            Builtin::Sum => Box::new(Sum),
            Builtin::Product => Box::new(Product),
            Builtin::Integration => Box::new(Integration),
            Builtin::Sin => Box::new(Elementwise::sin()),
            Builtin::Cosh => Box::new(Elementwise::cosh()),
            Builtin::Tan => Box::new(Elementwise::tan()),
            Builtin::Sinh => Box::new(Elementwise::sinh()),
        }
    }
}

/// Looks up a built-in operation by its name.
pub fn by_name(name: &str) -> Option<Box<dyn Operation>> {
    Builtin::from_name(name).map(Builtin::operation)
}

/// Runs `write` on the node's buffer, or on a new buffer from `allocate` when the
/// node has none.
pub(crate) fn write_into<A, W>(data: Option<&mut [f64]>, allocate: A, write: W) -> Produced
where
    A: FnOnce() -> Vec<f64>,
    W: FnOnce(&mut [f64]),
{
    match data {
        Some(data) => {
            write(data);
            Produced::InPlace
        }
        None => {
            let mut buffer = allocate();
            write(&mut buffer);
            Produced::Fresh(buffer)
        }
    }
}
