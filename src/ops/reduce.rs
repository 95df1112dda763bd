use crate::graph::{uniform_size, Arity, OpContext, Operation, Produced, SizeError};

use super::write_into;

/// Adds every input into the buffer, elementwise.
#[derive(Copy, Clone, Debug, Default)]
pub struct Sum;

impl Operation for Sum {
    fn name(&self) -> &'static str {
        "sum"
    }

    fn output_size(&self, input_sizes: &[usize]) -> Result<usize, SizeError> {
        uniform_size(input_sizes, Arity::AtLeast(1))
    }

    fn apply(&self, context: &OpContext<'_>, data: Option<&mut [f64]>) -> Option<Produced> {
        let size = context.size(0);
        Some(write_into(
            data,
            || vec![self.seed(); size],
            |out| {
                for input in context.inputs() {
                    for (acc, &x) in out.iter_mut().zip(input.iter()).take(size) {
                        *acc += x;
                    }
                }
            },
        ))
    }
}

/// Multiplies every input into the buffer, elementwise.
#[derive(Copy, Clone, Debug, Default)]
pub struct Product;

impl Operation for Product {
    fn name(&self) -> &'static str {
        "product"
    }

    fn output_size(&self, input_sizes: &[usize]) -> Result<usize, SizeError> {
        uniform_size(input_sizes, Arity::AtLeast(1))
    }

    fn seed(&self) -> f64 {
        1.0
    }

    fn apply(&self, context: &OpContext<'_>, data: Option<&mut [f64]>) -> Option<Produced> {
        let size = context.size(0);
        Some(write_into(
            data,
            || vec![self.seed(); size],
            |out| {
                for input in context.inputs() {
                    for (acc, &x) in out.iter_mut().zip(input.iter()).take(size) {
                        *acc *= x;
                    }
                }
            },
        ))
    }
}

/// Trapezoidal integral of `inputs[0]` (values) over `inputs[1]` (bin edges),
/// added to the single output element.
#[derive(Copy, Clone, Debug, Default)]
pub struct Integration;

impl Integration {
    pub fn trapezoid(values: &[f64], bins: &[f64], size: usize) -> f64 {
        values
            .windows(2)
            .zip(bins.windows(2))
            .take(size.saturating_sub(1))
            .map(|(v, b)| 0.5 * (v[0] + v[1]) * (b[1] - b[0]))
            .sum()
    }
}

impl Operation for Integration {
    fn name(&self) -> &'static str {
        "integration"
    }

    fn output_size(&self, input_sizes: &[usize]) -> Result<usize, SizeError> {
        uniform_size(input_sizes, Arity::Exactly(2)).map(|_| 1)
    }

    fn apply(&self, context: &OpContext<'_>, data: Option<&mut [f64]>) -> Option<Produced> {
        let area = Self::trapezoid(context.input(0), context.input(1), context.size(0));
        Some(write_into(
            data,
            || vec![self.seed()],
            |out| {
                if let Some(total) = out.first_mut() {
                    *total += area;
                }
            },
        ))
    }
}
