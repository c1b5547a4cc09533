//! Generator trees: the node kinds, their evaluation, and batch generation.

use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::core::random::RandomSource;
use crate::core::symbol::Symbol;
use crate::core::table::WeightedTable;
use crate::core::value::{coerce, CoercionError, Number, Value, ValueType};

/// Nested evaluations allowed before a call is abandoned. Catches
/// declarations that reference themselves without an exit.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("type coercion failed: {0}")]
    Coercion(#[from] CoercionError),
    #[error("no entries available in table")]
    EmptyTable,
    #[error("no selectable entries: every table weight is zero")]
    NoSelectableEntries,
    #[error("unknown generator name: {0}")]
    UnknownGenerator(String),
    #[error("generator nesting exceeded {0} levels")]
    RecursionLimit(usize),
    #[error("combine function failed: {0}")]
    Combine(String),
}

/// Parameters visible to an evaluation, keyed by identifier.
pub type Parameters = FxHashMap<Symbol, Value>;

/// Binary function applied by a [`Combine`] node.
pub type CombineFn = Arc<dyn Fn(Value, Value) -> Result<Value, GeneratorError> + Send + Sync>;

/// Always yields the same value.
#[derive(Debug, Clone)]
pub struct Constant {
    pub value: Value,
}

/// Looks up a parameter, falling back to a default.
#[derive(Debug, Clone)]
pub struct ParameterRef {
    pub id: Symbol,
    pub default: Value,
    pub output: ValueType,
}

/// Evaluates every part in order and joins their text.
#[derive(Debug, Clone, Default)]
pub struct Concatenate {
    pub parts: Vec<Generator>,
}

/// Feeds the results of two generators through a function.
#[derive(Clone)]
pub struct Combine {
    pub left: Box<Generator>,
    pub left_type: ValueType,
    pub right: Box<Generator>,
    pub right_type: ValueType,
    pub output: ValueType,
    pub function: CombineFn,
}

impl fmt::Debug for Combine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Combine")
            .field("left", &self.left)
            .field("left_type", &self.left_type)
            .field("right", &self.right)
            .field("right_type", &self.right_type)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

/// Picks one generator from a weighted table and evaluates it.
#[derive(Debug, Clone)]
pub struct TableSelect {
    pub output: ValueType,
    pub table: WeightedTable<Generator>,
}

/// A node of a generator tree.
#[derive(Debug, Clone)]
pub enum Generator {
    Constant(Constant),
    Parameter(ParameterRef),
    Concatenate(Concatenate),
    Combine(Combine),
    Table(TableSelect),
}

impl Generator {
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Constant(Constant {
            value: value.into(),
        })
    }

    pub fn text(text: &str) -> Self {
        Self::constant(text)
    }

    pub fn number(value: f64) -> Self {
        Self::constant(Number::Double(value))
    }

    pub fn boolean(value: bool) -> Self {
        Self::constant(value)
    }

    pub fn parameter(id: impl Into<Symbol>, default: impl Into<Value>, output: ValueType) -> Self {
        Self::Parameter(ParameterRef {
            id: id.into(),
            default: default.into(),
            output,
        })
    }

    pub fn concatenate(parts: Vec<Generator>) -> Self {
        Self::Concatenate(Concatenate { parts })
    }

    pub fn combine<F>(
        left: (Generator, ValueType),
        right: (Generator, ValueType),
        output: ValueType,
        function: F,
    ) -> Self
    where
        F: Fn(Value, Value) -> Result<Value, GeneratorError> + Send + Sync + 'static,
    {
        Self::Combine(Combine {
            left: Box::new(left.0),
            left_type: left.1,
            right: Box::new(right.0),
            right_type: right.1,
            output,
            function: Arc::new(function),
        })
    }

    pub fn table(output: ValueType, table: WeightedTable<Generator>) -> Self {
        Self::Table(TableSelect { output, table })
    }

    /// Flat-weighted selection among `options`.
    pub fn select(output: ValueType, options: Vec<Generator>) -> Self {
        Self::table(output, WeightedTable::from_items(options))
    }

    /// The declared type of the values this node yields.
    pub fn output_type(&self) -> ValueType {
        match self {
            Self::Constant(c) => c.value.value_type(),
            Self::Parameter(p) => p.output,
            Self::Concatenate(_) => ValueType::String,
            Self::Combine(c) => c.output,
            Self::Table(t) => t.output,
        }
    }

    pub fn as_table(&self) -> Option<&WeightedTable<Generator>> {
        match self {
            Self::Table(t) => Some(&t.table),
            _ => None,
        }
    }

    pub fn as_table_mut(&mut self) -> Option<&mut WeightedTable<Generator>> {
        match self {
            Self::Table(t) => Some(&mut t.table),
            _ => None,
        }
    }

    /// Identifiers of every parameter the tree reads, in evaluation order.
    pub fn references(&self) -> Vec<&Symbol> {
        let mut found = Vec::new();
        self.collect_references(&mut found);
        found
    }

    fn collect_references<'a>(&'a self, found: &mut Vec<&'a Symbol>) {
        match self {
            Self::Constant(_) => {}
            Self::Parameter(p) => found.push(&p.id),
            Self::Concatenate(c) => {
                for part in &c.parts {
                    part.collect_references(found);
                }
            }
            Self::Combine(c) => {
                c.left.collect_references(found);
                c.right.collect_references(found);
            }
            Self::Table(t) => {
                for entry in t.table.entries() {
                    entry.item.collect_references(found);
                }
            }
        }
    }

    /// Evaluates the tree once.
    ///
    /// Children are evaluated left to right against the same stream, so
    /// the result depends on that order.
    pub fn generate<R: RandomSource>(
        &self,
        random: &mut R,
        parameters: &Parameters,
    ) -> Result<Value, GeneratorError> {
        self.evaluate(random, parameters, 0)
    }

    /// Generates `count` values whose sequence depends only on the parent
    /// stream's state, never on `count`.
    ///
    /// The parent stream gives up one seed draw and one fork regardless of
    /// the batch size. Item `i` (1-based) is generated from the forked
    /// stream reseeded with that seed and `i`.
    pub fn generate_batch<R: RandomSource>(
        &self,
        random: &mut R,
        parameters: &Parameters,
        count: usize,
    ) -> Result<Vec<Value>, GeneratorError> {
        let seed = random.next_u64();
        let mut unique = random.fork();

        let mut results = Vec::with_capacity(count);
        for i in 1..=count {
            unique.reseed(seed, i as u64);
            results.push(self.generate(&mut unique, parameters)?);
        }
        Ok(results)
    }

    fn evaluate<R: RandomSource>(
        &self,
        random: &mut R,
        parameters: &Parameters,
        depth: usize,
    ) -> Result<Value, GeneratorError> {
        if depth > MAX_DEPTH {
            return Err(GeneratorError::RecursionLimit(MAX_DEPTH));
        }

        match self {
            Self::Constant(c) => Ok(c.value.clone()),
            Self::Parameter(p) => {
                let value = parameters.get(&p.id).unwrap_or(&p.default);
                let value = match value {
                    Value::Generator(g) if p.output != ValueType::Generator => {
                        g.evaluate(random, parameters, depth + 1)?
                    }
                    other => other.clone(),
                };
                Ok(coerce(value, p.output, &format!("parameter '{}'", p.id))?)
            }
            Self::Concatenate(c) => {
                let mut text = String::new();
                for part in &c.parts {
                    let value = part.evaluate(random, parameters, depth + 1)?;
                    match value {
                        Value::Str(s) => text.push_str(&s),
                        other => text.push_str(&other.to_string()),
                    }
                }
                Ok(Value::Str(text))
            }
            Self::Combine(c) => {
                let a = c.left.evaluate(random, parameters, depth + 1)?;
                let a = coerce(a, c.left_type, "first combine operand")?;
                let b = c.right.evaluate(random, parameters, depth + 1)?;
                let b = coerce(b, c.right_type, "second combine operand")?;
                let combined = (c.function)(a, b)?;
                Ok(coerce(combined, c.output, "combine result")?)
            }
            Self::Table(t) => {
                let index = t.table.pick(random)?;
                let chosen = &t.table.entries()[index].item;
                let value = chosen.evaluate(random, parameters, depth + 1)?;
                Ok(coerce(value, t.output, "table entry")?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::random::Stream;
    use crate::core::table::Entry;
    use crate::core::value::NumericKind;
    use rand::RngCore;

    const DOUBLE: ValueType = ValueType::Number(NumericKind::Double);

    fn letters() -> Generator {
        Generator::select(
            ValueType::String,
            ["a", "b", "c", "d", "e", "f", "g", "h"]
                .iter()
                .map(|s| Generator::text(s))
                .collect(),
        )
    }

    #[test]
    fn constant_consumes_no_entropy() {
        let mut a = Stream::new(5);
        let mut b = Stream::new(5);
        let v = Generator::text("fixed").generate(&mut a, &Parameters::default()).unwrap();
        assert_eq!(v, Value::from("fixed"));
        assert_eq!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn parameter_falls_back_to_default() {
        let g = Generator::parameter("name", "name", ValueType::String);
        let mut rng = Stream::new(1);
        assert_eq!(g.generate(&mut rng, &Parameters::default()).unwrap(), Value::from("name"));

        let mut params = Parameters::default();
        params.insert(Symbol::new("name"), Value::from("Ada"));
        assert_eq!(g.generate(&mut rng, &params).unwrap(), Value::from("Ada"));
    }

    #[test]
    fn parameter_coerces_to_declared_type() {
        let g = Generator::parameter("flag", false, ValueType::Boolean);
        let mut params = Parameters::default();
        params.insert(Symbol::new("flag"), Value::from(" TRUE "));
        let mut rng = Stream::new(1);
        assert_eq!(g.generate(&mut rng, &params).unwrap(), Value::Bool(true));
    }

    #[test]
    fn parameter_coercion_error_names_identifier() {
        let g = Generator::parameter("flag", false, ValueType::Boolean);
        let mut params = Parameters::default();
        params.insert(Symbol::new("flag"), Value::from("maybe"));
        let mut rng = Stream::new(1);
        let err = g.generate(&mut rng, &params).unwrap_err();
        assert!(matches!(err, GeneratorError::Coercion(_)));
        assert!(err.to_string().contains("parameter 'flag'"));
    }

    #[test]
    fn generator_valued_parameter_is_evaluated() {
        let g = Generator::parameter("pick", "pick", ValueType::String);
        let mut params = Parameters::default();
        params.insert(Symbol::new("pick"), Value::from(letters()));
        let mut rng = Stream::new(2);
        let v = g.generate(&mut rng, &params).unwrap();
        assert_eq!(v.as_str().map(str::len), Some(1));
    }

    #[test]
    fn concatenate_converts_and_joins() {
        let g = Generator::concatenate(vec![
            Generator::text("x="),
            Generator::number(2.0),
            Generator::text(", ok="),
            Generator::boolean(true),
        ]);
        assert_eq!(g.output_type(), ValueType::String);
        let mut rng = Stream::new(1);
        assert_eq!(
            g.generate(&mut rng, &Parameters::default()).unwrap(),
            Value::from("x=2.0, ok=true")
        );
    }

    #[test]
    fn concatenate_evaluates_left_to_right() {
        let g = Generator::concatenate(vec![letters(), letters(), letters()]);
        let mut rng = Stream::new(77);
        let generated = g.generate(&mut rng, &Parameters::default()).unwrap();

        let table = letters();
        let mut manual = Stream::new(77);
        let mut expected = String::new();
        for _ in 0..3 {
            let v = table.generate(&mut manual, &Parameters::default()).unwrap();
            expected.push_str(v.as_str().unwrap());
        }
        assert_eq!(generated, Value::from(expected));
    }

    #[test]
    fn combine_coerces_operands_and_applies_function() {
        let add = |a: Value, b: Value| match (a, b) {
            (Value::Number(Number::Double(x)), Value::Number(Number::Double(y))) => Ok(Value::from(x + y)),
            _ => Err(GeneratorError::Combine("expected doubles".to_string())),
        };
        let g = Generator::combine(
            (Generator::text("1.5"), DOUBLE),
            (Generator::constant(2), DOUBLE),
            ValueType::String,
            add,
        );
        let mut rng = Stream::new(1);
        assert_eq!(g.generate(&mut rng, &Parameters::default()).unwrap(), Value::from("3.5"));
    }

    #[test]
    fn combine_operand_mismatch_fails() {
        let g = Generator::combine(
            (Generator::text("yes"), ValueType::Boolean),
            (Generator::boolean(true), ValueType::Boolean),
            ValueType::Boolean,
            |a, _| Ok(a),
        );
        let mut rng = Stream::new(1);
        let err = g.generate(&mut rng, &Parameters::default()).unwrap_err();
        assert!(err.to_string().contains("first combine operand"));
    }

    #[test]
    fn empty_table_select_fails() {
        let g = Generator::select(ValueType::String, Vec::new());
        let mut rng = Stream::new(1);
        assert!(matches!(
            g.generate(&mut rng, &Parameters::default()),
            Err(GeneratorError::EmptyTable)
        ));
    }

    #[test]
    fn table_edits_change_output() {
        let mut g = Generator::select(ValueType::String, vec![Generator::text("old")]);
        let table = g.as_table_mut().unwrap();
        table.replace(0, Entry::new(Generator::text("new")));
        let mut rng = Stream::new(1);
        assert_eq!(g.generate(&mut rng, &Parameters::default()).unwrap(), Value::from("new"));
    }

    #[test]
    fn self_reference_hits_recursion_limit() {
        let looping = Generator::parameter("loop", "loop", ValueType::String);
        let mut params = Parameters::default();
        params.insert(Symbol::new("loop"), Value::from(looping.clone()));
        let mut rng = Stream::new(1);
        assert!(matches!(
            looping.generate(&mut rng, &params),
            Err(GeneratorError::RecursionLimit(MAX_DEPTH))
        ));
    }

    #[test]
    fn references_lists_parameters() {
        let g = Generator::concatenate(vec![
            Generator::parameter("a", "a", ValueType::String),
            Generator::select(
                ValueType::String,
                vec![Generator::parameter("b", "b", ValueType::String), Generator::text("x")],
            ),
        ]);
        let names: Vec<&str> = g.references().iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn batch_is_deterministic() {
        let g = Generator::concatenate(vec![letters(), letters()]);
        let params = Parameters::default();
        let first = g.generate_batch(&mut Stream::new(42), &params, 20).unwrap();
        let second = g.generate_batch(&mut Stream::new(42), &params, 20).unwrap();
        assert_eq!(first.len(), 20);
        assert_eq!(first, second);
    }

    #[test]
    fn batch_prefix_matches_smaller_batch() {
        let g = letters();
        let params = Parameters::default();
        let small = g.generate_batch(&mut Stream::new(8), &params, 5).unwrap();
        let large = g.generate_batch(&mut Stream::new(8), &params, 50).unwrap();
        assert_eq!(small[..], large[..5]);
    }

    #[test]
    fn batch_leaves_parent_state_independent_of_size() {
        let g = letters();
        let params = Parameters::default();
        let mut one = Stream::new(13);
        let mut many = Stream::new(13);
        g.generate_batch(&mut one, &params, 1).unwrap();
        g.generate_batch(&mut many, &params, 1000).unwrap();
        assert_eq!(one.next_u64(), many.next_u64());

        let mut none = Stream::new(13);
        g.generate_batch(&mut none, &params, 0).unwrap();
        let mut again = Stream::new(13);
        g.generate_batch(&mut again, &params, 1).unwrap();
        assert_eq!(none.next_u64(), again.next_u64());
    }
}
