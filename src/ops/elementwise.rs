use crate::graph::{Arity, OpContext, Operation, Produced, SizeError};

use super::write_into;

/// Leaf passthrough: the node's literal `data` is its result.
#[derive(Copy, Clone, Debug, Default)]
pub struct Input;

impl Operation for Input {
    fn name(&self) -> &'static str {
        "input"
    }

    fn output_size(&self, input_sizes: &[usize]) -> Result<usize, SizeError> {
        if input_sizes.is_empty() {
            Ok(0)
        } else {
            Err(SizeError::Arity {
                expected: Arity::Exactly(0),
                found: input_sizes.len(),
            })
        }
    }

    fn apply(&self, _context: &OpContext<'_>, data: Option<&mut [f64]>) -> Option<Produced> {
        data.map(|_| Produced::InPlace)
    }
}

/// Applies a scalar function to every element of its single input.
#[derive(Copy, Clone, Debug)]
pub struct Elementwise {
    name: &'static str,
    func: fn(f64) -> f64,
}

impl Elementwise {
    pub fn new(name: &'static str, func: fn(f64) -> f64) -> Self {
        Self { name, func }
    }

    pub fn sin() -> Self {
        Self::new("sin", f64::sin)
    }

    pub fn cosh() -> Self {
        Self::new("cosh", f64::cosh)
    }

    pub fn tan() -> Self {
        Self::new("tan", f64::tan)
    }

    pub fn sinh() -> Self {
        Self::new("sinh", f64::sinh)
    }
}

impl Operation for Elementwise {
    fn name(&self) -> &'static str {
        self.name
    }

    fn output_size(&self, input_sizes: &[usize]) -> Result<usize, SizeError> {
        match input_sizes {
            [size] => Ok(*size),
            _ => Err(SizeError::Arity {
                expected: Arity::Exactly(1),
                found: input_sizes.len(),
            }),
        }
    }

    fn apply(&self, context: &OpContext<'_>, data: Option<&mut [f64]>) -> Option<Produced> {
        let size = context.size(0);
        let input = context.input(0);
        Some(write_into(
            data,
            || vec![0.0; size],
            |out| {
                for (o, &x) in out.iter_mut().zip(input.iter()).take(size) {
                    *o = (self.func)(x);
                }
            },
        ))
    }
}

/// Broadcasts the first element of its input over `size` elements, turning a
/// scalar (such as an integral) back into a vector.
#[derive(Copy, Clone, Debug)]
pub struct Repeat {
    size: usize,
}

impl Repeat {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl Operation for Repeat {
    fn name(&self) -> &'static str {
        "repeat"
    }

    fn output_size(&self, input_sizes: &[usize]) -> Result<usize, SizeError> {
        match input_sizes {
            [0] => Err(SizeError::EmptyInput { index: 0 }),
            [_] => Ok(self.size),
            _ => Err(SizeError::Arity {
                expected: Arity::Exactly(1),
                found: input_sizes.len(),
            }),
        }
    }

    fn apply(&self, context: &OpContext<'_>, data: Option<&mut [f64]>) -> Option<Produced> {
        let value = context.input(0).first().copied().unwrap_or_default();
        Some(write_into(
            data,
            || vec![0.0; self.size],
            |out| out.fill(value),
        ))
    }
}
