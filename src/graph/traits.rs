use std::error::Error;
use std::fmt;

/// Number of inputs an operation accepts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "exactly {}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

/// Why an operation cannot derive its output size from the declared input sizes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SizeError {
    Arity { expected: Arity, found: usize },
    Unequal {
        index: usize,
        expected: usize,
        found: usize,
    },
    EmptyInput { index: usize },
}

impl fmt::Display for SizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeError::Arity { expected, found } => {
                write!(f, "expected {} inputs, found {}", expected, found)
            }
            SizeError::Unequal {
                index,
                expected,
                found,
            } => write!(
                f,
                "input {} has {} elements, expected {}",
                index, found, expected
            ),
            SizeError::EmptyInput { index } => write!(f, "input {} is empty", index),
        }
    }
}

impl Error for SizeError {}

/// Checks the input count and returns the first size, which must be shared by
/// every input.
pub fn uniform_size(sizes: &[usize], arity: Arity) -> Result<usize, SizeError> {
    if !arity.accepts(sizes.len()) {
        return Err(SizeError::Arity {
            expected: arity,
            found: sizes.len(),
        });
    }

    let first = sizes.first().copied().unwrap_or(0);
    match sizes.iter().position(|&size| size != first) {
        Some(index) => Err(SizeError::Unequal {
            index,
            expected: first,
            found: sizes.get(index).copied().unwrap_or(0),
        }),
        None => Ok(first),
    }
}

/// Result of applying an operation.
#[derive(Clone, Debug, PartialEq)]
pub enum Produced {
    /// The result was written into the node's own `data` buffer.
    InPlace,
    /// The operation allocated a new buffer. Only valid for nodes without `data`.
    Fresh(Vec<f64>),
}

/// Inputs handed to an operation: the input buffers in argument order and their
/// precomputed element counts.
#[derive(Copy, Clone, Debug)]
pub struct OpContext<'a> {
    inputs: &'a [&'a [f64]],
    sizes: &'a [usize],
}

impl<'a> OpContext<'a> {
    pub fn new(inputs: &'a [&'a [f64]], sizes: &'a [usize]) -> Self {
        Self { inputs, sizes }
    }

    pub fn inputs(&self) -> &'a [&'a [f64]] {
        self.inputs
    }

    /// Input buffer at `index`, or an empty slice if there is none.
    #[inline]
    pub fn input(&self, index: usize) -> &'a [f64] {
        self.inputs.get(index).copied().unwrap_or(&[])
    }

    pub fn sizes(&self) -> &'a [usize] {
        self.sizes
    }

    /// Declared element count of input `index`, zero if there is none.
    #[inline]
    pub fn size(&self, index: usize) -> usize {
        self.sizes.get(index).copied().unwrap_or(0)
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }
}

/// A node's computation: consumes the input buffers plus the node's optional
/// `data` buffer and produces the node's result.
///
/// When `data` is present the result must be written into it and `InPlace`
/// returned. When it is absent the operation allocates and returns `Fresh`.
/// Returning `None` means no buffer could be produced.
pub trait Operation: Send + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Output element count for the given input sizes.
    fn output_size(&self, input_sizes: &[usize]) -> Result<usize, SizeError>;

    /// Initial value of every element of a newly allocated result buffer,
    /// persistent or fresh. Accumulating operations start from their identity.
    fn seed(&self) -> f64 {
        0.0
    }

    fn apply(&self, context: &OpContext<'_>, data: Option<&mut [f64]>) -> Option<Produced>;
}
