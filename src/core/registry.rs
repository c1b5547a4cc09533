//! Named generators that can reference each other.

use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;

use crate::core::config::{GenerationSettings, LoadError};
use crate::core::generator::{Generator, GeneratorError, Parameters};
use crate::core::parser::{parse_document, ParseError};
use crate::core::random::RandomSource;
use crate::core::symbol::Symbol;
use crate::core::value::{FromValue, Value};

/// A namespace of generators, usually parsed from a template document.
///
/// Every evaluation sees the registered generators as parameters under
/// their own names, which is how `<name>` inside one template expands
/// another declaration. Changes made through `set_generator` are seen by
/// every later evaluation. The registry has no internal locking: share it
/// immutably while evaluating and take `&mut` only to edit it.
#[derive(Debug, Clone, Default)]
pub struct Generators {
    generators: FxHashMap<Symbol, Arc<Generator>>,
}

impl Generators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a template document. Later declarations replace earlier
    /// ones with the same name.
    pub fn parse(input: &str) -> Result<Generators, ParseError> {
        let mut registry = Generators::new();
        for declaration in parse_document(input)? {
            registry.set_generator(&declaration.name, declaration.generator);
        }
        Ok(registry)
    }

    /// Loads a template document from a file.
    pub fn load_from_file(path: &Path) -> Result<Generators, LoadError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents).map_err(|source| LoadError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Loads and merges every document listed in `settings`, in order.
    pub fn from_settings(settings: &GenerationSettings) -> Result<Generators, LoadError> {
        let mut registry = Generators::new();
        for path in &settings.documents {
            registry.merge(Self::load_from_file(path)?);
        }
        Ok(registry)
    }

    /// Merge another registry into this one. Generators from `other`
    /// override generators in `self` with the same name.
    pub fn merge(&mut self, other: Generators) {
        self.generators.extend(other.generators);
    }

    /// Generates a value with the named generator and converts it to `T`.
    pub fn get<T: FromValue, R: RandomSource>(
        &self,
        name: &str,
        parameters: &Parameters,
        random: &mut R,
    ) -> Result<T, GeneratorError> {
        let generator = self.require(name)?;
        let combined = self.combined_parameters(parameters);
        let value = generator.generate(random, &combined)?;
        Ok(T::from_value(value, &format!("generator '{}'", name))?)
    }

    /// Generates `count` values with the named generator. The sequence
    /// depends on the stream's state but not on `count`; see
    /// [`Generator::generate_batch`].
    pub fn get_batch<T: FromValue, R: RandomSource>(
        &self,
        name: &str,
        parameters: &Parameters,
        random: &mut R,
        count: usize,
    ) -> Result<Vec<T>, GeneratorError> {
        let generator = self.require(name)?;
        let combined = self.combined_parameters(parameters);
        let context = format!("generator '{}'", name);
        generator
            .generate_batch(random, &combined, count)?
            .into_iter()
            .map(|value| T::from_value(value, &context).map_err(GeneratorError::from))
            .collect()
    }

    fn require(&self, name: &str) -> Result<&Arc<Generator>, GeneratorError> {
        self.generators
            .get(name)
            .ok_or_else(|| GeneratorError::UnknownGenerator(name.to_string()))
    }

    /// Caller parameters plus every registered generator under its name.
    /// Registered names take precedence.
    pub fn combined_parameters(&self, parameters: &Parameters) -> Parameters {
        let mut combined = parameters.clone();
        for (name, generator) in &self.generators {
            combined.insert(name.clone(), Value::Generator(Arc::clone(generator)));
        }
        combined
    }

    pub fn generator(&self, name: &str) -> Option<&Arc<Generator>> {
        self.generators.get(name)
    }

    /// Exclusive access for editing a registered tree in place. A tree
    /// still shared with an earlier evaluation's parameters is copied first.
    pub fn generator_mut(&mut self, name: &str) -> Option<&mut Generator> {
        self.generators.get_mut(name).map(Arc::make_mut)
    }

    pub fn set_generator(&mut self, name: &str, generator: Generator) {
        self.generators.insert(Symbol::new(name), Arc::new(generator));
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<Generator>> {
        self.generators.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.generators.keys().map(Symbol::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}
