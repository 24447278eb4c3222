//! Data models for the two-sided partition allocation.
//!
//! This module defines the fundamental data structures of an allocation:
//! - `Collection`: one input side, mapping item names to weights
//! - `PinSet`: names that must never move or be merged
//! - `Item`: a name with its weight on each side
//! - `Bucket`: an allocation target with a capacity limit
//! - `AssignedItem`: one line of the final assignment

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::{Side, Weighted};

/// Validation error for item data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid name: item names must not be empty")]
    EmptyName,
    #[error("Invalid weight for '{name}': must be a finite, non-negative number, got: {value}")]
    InvalidWeight { name: String, value: f64 },
    #[error("Weight for '{name}' would raise the collection total above {limit:e}")]
    TotalTooLarge { name: String, limit: f64 },
}

/// Upper bound for the total weight of one collection.
///
/// Keeps the sum of both collections and every intermediate bucket load finite.
pub const MAX_TOTAL_WEIGHT: f64 = f64::MAX / 4.0;

/// Helper function to validate an item name; returns the trimmed name.
fn validate_name(name: &str) -> Result<&str, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(trimmed)
}

/// Helper function to validate a weight.
fn validate_weight_value(name: &str, value: f64) -> Result<(), ValidationError> {
    if value < 0.0 || value.is_nan() || value.is_infinite() {
        return Err(ValidationError::InvalidWeight {
            name: name.to_string(),
            value,
        });
    }
    Ok(())
}

/// One input side of an allocation: item name to weight.
///
/// Inserting the same name twice sums the weights. Names are trimmed; the
/// map is ordered so iteration is deterministic.
///
/// # Examples
/// ```
/// use split_it_now::model::Collection;
///
/// let mut books = Collection::new();
/// books.insert("atlas", 2.5).unwrap();
/// books.insert(" atlas ", 1.5).unwrap();
/// assert_eq!(books.get("atlas"), Some(4.0));
/// assert!(books.insert("", 1.0).is_err());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection {
    entries: BTreeMap<String, f64>,
}

impl Collection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from `(name, weight)` pairs, failing on the first invalid pair.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut collection = Self::new();
        for (name, weight) in pairs {
            collection.insert(name.as_ref(), weight)?;
        }
        Ok(collection)
    }

    /// Adds a weight under `name`, summing with any weight already present.
    ///
    /// Fails without modifying the collection when the new total would
    /// exceed [`MAX_TOTAL_WEIGHT`].
    pub fn insert(&mut self, name: &str, weight: f64) -> Result<(), ValidationError> {
        let name = validate_name(name)?;
        validate_weight_value(name, weight)?;
        let total = self.total_weight() + weight;
        if !total.is_finite() || total > MAX_TOTAL_WEIGHT {
            return Err(ValidationError::TotalTooLarge {
                name: name.to_string(),
                limit: MAX_TOTAL_WEIGHT,
            });
        }
        *self.entries.entry(name.to_string()).or_insert(0.0) += weight;
        Ok(())
    }

    /// Weight stored under `name`, if present.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries.get(name).copied()
    }

    /// Whether `name` is present (regardless of its weight).
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Item names in name order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all weights in the collection.
    pub fn total_weight(&self) -> f64 {
        self.entries.values().sum()
    }
}

/// Names that keep their original placement.
///
/// Matching is exact and case-sensitive; surrounding whitespace is trimmed
/// the same way [`Collection`] trims names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinSet {
    names: BTreeSet<String>,
}

impl PinSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a name. Empty names are ignored.
    pub fn insert(&mut self, name: &str) -> bool {
        match validate_name(name) {
            Ok(name) => self.names.insert(name.to_string()),
            Err(_) => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for PinSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut pins = PinSet::new();
        for name in iter {
            pins.insert(name.as_ref());
        }
        pins
    }
}

/// How an assigned item came to be where it is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Present in both inputs; weights were combined.
    Duplicate,
    /// Present in exactly one input.
    Unique,
    /// Listed in the pin set; never moved or merged.
    Pinned,
}

/// A name together with its weight on each side.
///
/// `None` means the name is absent from that side; an absent side counts as
/// weight 0.
#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    pub name: String,
    pub weight_a: Option<f64>,
    pub weight_b: Option<f64>,
}

impl Item {
    /// Looks `name` up in both collections.
    pub fn lookup(name: &str, a: &Collection, b: &Collection) -> Self {
        Self {
            name: name.to_string(),
            weight_a: a.get(name),
            weight_b: b.get(name),
        }
    }

    /// Weight on the given side (0 if absent).
    pub fn weight_on(&self, side: Side) -> f64 {
        match side {
            Side::A => self.weight_a.unwrap_or(0.0),
            Side::B => self.weight_b.unwrap_or(0.0),
        }
    }

    /// Present on both sides.
    pub fn is_duplicate(&self) -> bool {
        self.weight_a.is_some() && self.weight_b.is_some()
    }

    /// The only side a unique item lives on; `None` for duplicates.
    pub fn natural_side(&self) -> Option<Side> {
        match (self.weight_a, self.weight_b) {
            (Some(_), None) => Some(Side::A),
            (None, Some(_)) => Some(Side::B),
            _ => None,
        }
    }

    /// Sum of both sides' weights.
    pub fn combined_weight(&self) -> f64 {
        self.weight_on(Side::A) + self.weight_on(Side::B)
    }
}

/// An item placed into a bucket.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedItem {
    pub name: String,
    pub weight: f64,
    pub origin: Origin,
}

impl Weighted for PlacedItem {
    fn weight(&self) -> f64 {
        self.weight
    }
}

/// An allocation target with a capacity limit.
///
/// Keeps a running load that is updated on every placement and removal, the
/// way the greedy phases need it. [`Bucket::recomputed_load`] sums the placed
/// items from scratch for validation.
///
/// # Fields
/// * `side` - Which collection this bucket represents
/// * `capacity` - Weight limit (may be exceeded; overflow is reported)
/// * `placed` - Items currently assigned here
#[derive(Clone, Debug)]
pub struct Bucket {
    pub side: Side,
    pub capacity: f64,
    placed: Vec<PlacedItem>,
    load: f64,
}

impl Bucket {
    /// Creates an empty bucket. Negative or non-finite capacities become 0.
    pub fn new(side: Side, capacity: f64) -> Self {
        let capacity = if capacity.is_finite() {
            capacity.max(0.0)
        } else {
            0.0
        };
        Self {
            side,
            capacity,
            placed: Vec::new(),
            load: 0.0,
        }
    }

    /// Running total of placed weight.
    pub fn load(&self) -> f64 {
        self.load
    }

    /// Sum of placed weights, recomputed from the items.
    pub fn recomputed_load(&self) -> f64 {
        crate::types::total_weight(&self.placed)
    }

    /// Amount by which the current load exceeds capacity.
    pub fn overflow(&self, eps: f64) -> f64 {
        excess(self.load, self.capacity, eps)
    }

    pub fn is_overflowing(&self, eps: f64) -> bool {
        self.overflow(eps) > 0.0
    }

    /// Whether `weight` can be added without exceeding capacity.
    pub fn can_fit(&self, weight: f64, eps: f64) -> bool {
        self.load + weight <= self.capacity + eps
    }

    /// Overflow after hypothetically adding `weight`.
    pub fn overflow_after(&self, weight: f64, eps: f64) -> f64 {
        excess(self.load + weight, self.capacity, eps)
    }

    /// Fill ratio after hypothetically adding `weight`.
    ///
    /// A zero-capacity bucket reports 0 while it stays empty and infinity otherwise.
    pub fn fill_ratio_after(&self, weight: f64, eps: f64) -> f64 {
        let new_load = self.load + weight;
        if self.capacity <= eps {
            if new_load <= eps { 0.0 } else { f64::INFINITY }
        } else {
            new_load / self.capacity
        }
    }

    /// Places an item and updates the running load.
    pub fn place(&mut self, item: PlacedItem) {
        self.load += item.weight;
        self.placed.push(item);
    }

    /// Removes the item named `name`, if placed here.
    pub fn take(&mut self, name: &str) -> Option<PlacedItem> {
        let idx = self.placed.iter().position(|p| p.name == name)?;
        let item = self.placed.remove(idx);
        self.load -= item.weight;
        Some(item)
    }

    /// Weight of the item named `name`, if placed here.
    pub fn weight_of(&self, name: &str) -> Option<f64> {
        self.placed.iter().find(|p| p.name == name).map(|p| p.weight)
    }

    pub fn placed(&self) -> &[PlacedItem] {
        &self.placed
    }

    /// Final name → weight mapping of this bucket.
    pub fn weights(&self) -> BTreeMap<String, f64> {
        self.placed
            .iter()
            .map(|p| (p.name.clone(), p.weight))
            .collect()
    }
}

/// Overflow of `load` over `capacity`, 0 within tolerance.
pub fn excess(load: f64, capacity: f64, eps: f64) -> f64 {
    let over = load - capacity;
    if over > eps { over } else { 0.0 }
}

/// One line of the final assignment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AssignedItem {
    pub name: String,
    pub destination: Side,
    pub weight: f64,
    pub origin: Origin,
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn collection_sums_repeated_names() {
        let collection =
            Collection::from_pairs([("x", 1.0), ("y", 2.0), ("x", 3.5)]).expect("valid pairs");
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.get("x"), Some(4.5));
        assert!((collection.total_weight() - 6.5).abs() < EPS);
    }

    #[test]
    fn collection_rejects_bad_input() {
        let mut collection = Collection::new();
        assert_eq!(collection.insert("   ", 1.0), Err(ValidationError::EmptyName));
        assert!(collection.insert("x", -1.0).is_err());
        assert!(collection.insert("x", f64::NAN).is_err());
        assert!(collection.insert("x", f64::INFINITY).is_err());
        assert!(collection.is_empty());
    }

    #[test]
    fn collection_rejects_total_beyond_limit() {
        let mut collection = Collection::new();
        collection.insert("w", 1e307).unwrap();
        assert!(matches!(
            collection.insert("w", 1e308),
            Err(ValidationError::TotalTooLarge { .. })
        ));
        assert_eq!(collection.get("w"), Some(1e307));

        let err = Collection::from_pairs([("x", 1e308), ("y", 1e308)]).unwrap_err();
        assert!(matches!(err, ValidationError::TotalTooLarge { ref name, .. } if name == "x"));

        let half = MAX_TOTAL_WEIGHT / 2.0;
        let mut split = Collection::new();
        split.insert("x", half).unwrap();
        split.insert("y", half).unwrap();
        assert!(split.insert("z", half).is_err());
        assert!(split.total_weight().is_finite());
    }

    #[test]
    fn collection_accepts_zero_weight() {
        let collection = Collection::from_pairs([("ghost", 0.0)]).unwrap();
        assert!(collection.contains("ghost"));
        assert_eq!(collection.total_weight(), 0.0);
    }

    #[test]
    fn pin_set_is_case_sensitive_and_trimmed() {
        let pins: PinSet = [" Alpha ", "beta", ""].into_iter().collect();
        assert_eq!(pins.len(), 2);
        assert!(pins.contains("Alpha"));
        assert!(!pins.contains("alpha"));
        assert!(pins.contains("beta"));
    }

    #[test]
    fn item_classification() {
        let a = Collection::from_pairs([("dup", 2.0), ("only_a", 1.0)]).unwrap();
        let b = Collection::from_pairs([("dup", 3.0), ("only_b", 4.0)]).unwrap();

        let dup = Item::lookup("dup", &a, &b);
        assert!(dup.is_duplicate());
        assert_eq!(dup.natural_side(), None);
        assert_eq!(dup.combined_weight(), 5.0);

        let only_a = Item::lookup("only_a", &a, &b);
        assert!(!only_a.is_duplicate());
        assert_eq!(only_a.natural_side(), Some(Side::A));
        assert_eq!(only_a.weight_on(Side::B), 0.0);

        let only_b = Item::lookup("only_b", &a, &b);
        assert_eq!(only_b.natural_side(), Some(Side::B));
    }

    #[test]
    fn bucket_tracks_load_and_overflow() {
        let mut bucket = Bucket::new(Side::A, 10.0);
        bucket.place(PlacedItem {
            name: "x".into(),
            weight: 7.0,
            origin: Origin::Unique,
        });
        assert!(bucket.can_fit(3.0, EPS));
        assert!(!bucket.can_fit(3.5, EPS));
        assert_eq!(bucket.overflow_after(5.0, EPS), 2.0);
        assert!((bucket.fill_ratio_after(3.0, EPS) - 1.0).abs() < EPS);

        bucket.place(PlacedItem {
            name: "y".into(),
            weight: 5.0,
            origin: Origin::Unique,
        });
        assert!(bucket.is_overflowing(EPS));
        assert_eq!(bucket.overflow(EPS), 2.0);

        let taken = bucket.take("x").expect("x is placed");
        assert_eq!(taken.weight, 7.0);
        assert_eq!(bucket.load(), 5.0);
        assert_eq!(bucket.recomputed_load(), 5.0);
        assert!(bucket.take("x").is_none());
    }

    #[test]
    fn zero_capacity_bucket_fill_ratio() {
        let bucket = Bucket::new(Side::B, 0.0);
        assert_eq!(bucket.fill_ratio_after(0.0, EPS), 0.0);
        assert!(bucket.fill_ratio_after(1.0, EPS).is_infinite());
        assert!(bucket.can_fit(0.0, EPS));
        assert!(!bucket.can_fit(1.0, EPS));
    }

    #[test]
    fn bucket_clamps_negative_capacity() {
        let bucket = Bucket::new(Side::A, -4.0);
        assert_eq!(bucket.capacity, 0.0);
        let bucket = Bucket::new(Side::A, f64::NAN);
        assert_eq!(bucket.capacity, 0.0);
    }
}
