//! Common types and traits for the two-sided allocation.
//!
//! This module defines the small vocabulary shared by the model, the
//! allocator, the report and the API: which collection something lives in,
//! which way it moved, and how floating-point weights are compared.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Global numerical tolerance for weight and capacity comparisons.
pub const EPSILON_GENERAL: f64 = 1e-9;

/// Relative tolerance for the weight conservation check after allocation.
pub const EPSILON_CONSERVATION: f64 = 1e-6;

/// One of the two collections taking part in an allocation.
///
/// # Examples
/// ```
/// use split_it_now::types::Side;
///
/// assert_eq!(Side::A.other(), Side::B);
/// assert_eq!(Side::B.to_string(), "B");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum Side {
    A,
    B,
}

impl Side {
    /// Both sides in tie-break order (A wins ties).
    pub const BOTH: [Side; 2] = [Side::A, Side::B];

    /// Returns the opposite collection.
    #[inline]
    pub const fn other(self) -> Self {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    /// Short label used in logs and reports.
    pub const fn label(self) -> &'static str {
        match self {
            Side::A => "A",
            Side::B => "B",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Direction of a move relative to an item's natural placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum MoveDirection {
    #[serde(rename = "A→B")]
    AToB,
    #[serde(rename = "B→A")]
    BToA,
}

impl MoveDirection {
    /// Direction of a move that leaves `from`.
    pub const fn leaving(from: Side) -> Self {
        match from {
            Side::A => MoveDirection::AToB,
            Side::B => MoveDirection::BToA,
        }
    }

    /// Direction of a move that ends in `to`.
    pub const fn towards(to: Side) -> Self {
        Self::leaving(to.other())
    }

    /// Arrow notation as shown to users.
    pub const fn arrow(self) -> &'static str {
        match self {
            MoveDirection::AToB => "A→B",
            MoveDirection::BToA => "B→A",
        }
    }
}

impl fmt::Display for MoveDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.arrow())
    }
}

/// Trait for anything that carries a weight.
pub trait Weighted {
    /// Returns the weight.
    fn weight(&self) -> f64;
}

/// Sums the weights of an iterator of weighted values.
pub fn total_weight<'a, T, I>(items: I) -> f64
where
    T: Weighted + 'a,
    I: IntoIterator<Item = &'a T>,
{
    items.into_iter().map(Weighted::weight).sum()
}

/// Compares two values with tolerance.
///
/// # Parameters
/// * `a` - First value
/// * `b` - Second value
/// * `eps` - Tolerance
pub fn compare_with_epsilon(a: f64, b: f64, eps: f64) -> Ordering {
    if (a - b).abs() <= eps {
        Ordering::Equal
    } else if a < b {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

/// Checks whether two values are equal within a tolerance scaled by their magnitude.
#[inline]
pub fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= eps * scale
}
