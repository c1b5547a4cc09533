//! Procgen Engine: template-driven procedural generators.
//!
//! Template documents such as `name = [Ka/Lo/Mi][ra/ten] of <place>;`
//! compile into trees of generator nodes: literal text, parameter
//! references, concatenation, binary combination and weighted tables.
//! A [`Generators`](core::registry::Generators) registry evaluates them
//! against a caller-supplied random stream, and batch requests stay
//! reproducible regardless of how many values are asked for.

pub mod core;

pub use crate::core::generator::{Generator, GeneratorError, Parameters};
pub use crate::core::random::{RandomSource, Stream};
pub use crate::core::registry::Generators;
pub use crate::core::value::{Value, ValueType};
