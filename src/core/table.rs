//! Weighted tables and the strategies that weight their entries by position.

use std::fmt::Debug;
use std::sync::Arc;

use crate::core::generator::GeneratorError;
use crate::core::random::RandomSource;

/// Computes a weight for the entry at `position` (0-indexed) in a table
/// of `total_count` entries. `parameter` tunes the profile in a
/// strategy-specific way.
pub trait WeightingStrategy: Debug + Send + Sync {
    fn calculate_weight(&self, position: usize, total_count: usize, parameter: Option<f64>) -> f64;

    /// Weights for every position of a table of `total_count` entries.
    /// Strategies that normalize across the table override this to share
    /// the work between positions.
    fn calculate_weights(&self, total_count: usize, parameter: Option<f64>) -> Vec<f64> {
        (0..total_count)
            .map(|position| self.calculate_weight(position, total_count, parameter))
            .collect()
    }
}

/// Every entry weighs `parameter`, or 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flat;

impl WeightingStrategy for Flat {
    fn calculate_weight(&self, _position: usize, _total_count: usize, parameter: Option<f64>) -> f64 {
        parameter.unwrap_or(1.0)
    }
}

/// Linear ramp from `1 + total_count * parameter` at the first entry down
/// to 1 at the last. A parameter of 0 weighs everything 1; the default
/// parameter is 1. Negative parameters invert the ramp, and any weight
/// that drops below zero is ignored by the table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sloping;

impl WeightingStrategy for Sloping {
    fn calculate_weight(&self, position: usize, total_count: usize, parameter: Option<f64>) -> f64 {
        let factor = parameter.unwrap_or(1.0);
        let start = 1.0 + total_count as f64 * factor;
        if total_count <= 1 {
            return start;
        }
        let t = position as f64 / (total_count - 1) as f64;
        start + (1.0 - start) * t
    }
}

/// Bell curve peaking at the first entry. `parameter` is the number of
/// standard deviations between the first and the last entry (default 3).
/// Weights average to 1 across the table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normal;

impl Normal {
    fn density(position: usize, total_count: usize, extent: f64) -> f64 {
        let x = position as f64 / (total_count - 1) as f64 * extent;
        (-0.5 * x * x).exp()
    }
}

impl WeightingStrategy for Normal {
    fn calculate_weight(&self, position: usize, total_count: usize, parameter: Option<f64>) -> f64 {
        if total_count <= 1 {
            return 1.0;
        }
        let extent = parameter.unwrap_or(3.0);
        let sum: f64 = (0..total_count)
            .map(|i| Self::density(i, total_count, extent))
            .sum();
        Self::density(position, total_count, extent) * total_count as f64 / sum
    }

    fn calculate_weights(&self, total_count: usize, parameter: Option<f64>) -> Vec<f64> {
        if total_count <= 1 {
            return vec![1.0; total_count];
        }
        let extent = parameter.unwrap_or(3.0);
        let mut weights: Vec<f64> = (0..total_count)
            .map(|i| Self::density(i, total_count, extent))
            .collect();
        let scale = total_count as f64 / weights.iter().sum::<f64>();
        for weight in &mut weights {
            *weight *= scale;
        }
        weights
    }
}

/// An item with an optional explicit weight. Entries without one are
/// weighted by the table's strategy.
#[derive(Debug, Clone)]
pub struct Entry<T> {
    pub item: T,
    pub weight: Option<f64>,
}

impl<T> Entry<T> {
    pub fn new(item: T) -> Self {
        Self { item, weight: None }
    }

    pub fn weighted(item: T, weight: f64) -> Self {
        Self {
            item,
            weight: Some(weight),
        }
    }
}

/// Ordered entries with weighted random selection.
///
/// The table is the only authority over its index space: inserting or
/// removing shifts the following entries, and every change is visible to
/// the next `pick`.
#[derive(Debug, Clone)]
pub struct WeightedTable<T> {
    entries: Vec<Entry<T>>,
    strategy: Arc<dyn WeightingStrategy>,
    strategy_parameter: Option<f64>,
}

impl<T> Default for WeightedTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WeightedTable<T> {
    /// An empty table with flat weights.
    pub fn new() -> Self {
        Self::with_strategy(Arc::new(Flat))
    }

    pub fn with_strategy(strategy: Arc<dyn WeightingStrategy>) -> Self {
        Self {
            entries: Vec::new(),
            strategy,
            strategy_parameter: None,
        }
    }

    /// Flat-weighted table over `items`.
    pub fn from_items(items: impl IntoIterator<Item = T>) -> Self {
        let mut table = Self::new();
        table.entries.extend(items.into_iter().map(Entry::new));
        table
    }

    pub fn strategy(&self) -> &Arc<dyn WeightingStrategy> {
        &self.strategy
    }

    pub fn set_strategy(&mut self, strategy: Arc<dyn WeightingStrategy>) {
        self.strategy = strategy;
    }

    pub fn strategy_parameter(&self) -> Option<f64> {
        self.strategy_parameter
    }

    pub fn set_strategy_parameter(&mut self, parameter: Option<f64>) {
        self.strategy_parameter = parameter;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry<T>] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&Entry<T>> {
        self.entries.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Entry<T>> {
        self.entries.get_mut(index)
    }

    pub fn push(&mut self, entry: Entry<T>) {
        self.entries.push(entry);
    }

    /// Inserts at `index`, shifting later entries up. Returns `false` and
    /// leaves the table unchanged if `index > len`.
    pub fn insert(&mut self, index: usize, entry: Entry<T>) -> bool {
        if index > self.entries.len() {
            return false;
        }
        self.entries.insert(index, entry);
        true
    }

    /// Replaces the entry at `index`, returning the old one.
    pub fn replace(&mut self, index: usize, entry: Entry<T>) -> Option<Entry<T>> {
        let slot = self.entries.get_mut(index)?;
        Some(std::mem::replace(slot, entry))
    }

    /// Removes the entry at `index`, shifting later entries down.
    pub fn remove(&mut self, index: usize) -> Option<Entry<T>> {
        if index < self.entries.len() {
            Some(self.entries.remove(index))
        } else {
            None
        }
    }

    /// Effective weight of the entry at `index`: its explicit weight or the
    /// strategy's, floored at zero.
    pub fn weight(&self, index: usize) -> Option<f64> {
        let entry = self.entries.get(index)?;
        let weight = entry.weight.unwrap_or_else(|| {
            self.strategy
                .calculate_weight(index, self.entries.len(), self.strategy_parameter)
        });
        Some(floor_weight(weight))
    }

    /// Effective weights of every entry, in order.
    pub fn weights(&self) -> Vec<f64> {
        let needs_strategy = self.entries.iter().any(|entry| entry.weight.is_none());
        let computed = if needs_strategy {
            self.strategy
                .calculate_weights(self.entries.len(), self.strategy_parameter)
        } else {
            Vec::new()
        };
        self.entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let weight = entry
                    .weight
                    .unwrap_or_else(|| computed.get(i).copied().unwrap_or(0.0));
                floor_weight(weight)
            })
            .collect()
    }

    pub fn total_weight(&self) -> f64 {
        self.weights().iter().sum()
    }

    /// Picks an index with probability proportional to its weight.
    ///
    /// Draws `r` from `[0, total)` and returns the first entry with positive
    /// weight whose cumulative weight reaches `r`. Zero-weight entries are
    /// never returned.
    pub fn pick<R: RandomSource>(&self, random: &mut R) -> Result<usize, GeneratorError> {
        if self.entries.is_empty() {
            return Err(GeneratorError::EmptyTable);
        }

        let weights = self.weights();
        let total: f64 = weights.iter().sum();
        if !(total > 0.0) || !total.is_finite() {
            return Err(GeneratorError::NoSelectableEntries);
        }

        let selection = random.next_double(total);

        let mut so_far = 0.0;
        let mut last_selectable = 0;
        for (i, weight) in weights.iter().enumerate() {
            if *weight <= 0.0 {
                continue;
            }
            so_far += weight;
            last_selectable = i;
            if selection <= so_far {
                return Ok(i);
            }
        }

        // Accumulated rounding can leave `so_far` a hair under `selection`.
        Ok(last_selectable)
    }

    /// Picks an entry and returns its item.
    pub fn pick_item<R: RandomSource>(&self, random: &mut R) -> Result<&T, GeneratorError> {
        let index = self.pick(random)?;
        Ok(&self.entries[index].item)
    }
}

// NaN also maps to zero here.
fn floor_weight(weight: f64) -> f64 {
    if weight > 0.0 {
        weight
    } else {
        0.0
    }
}
