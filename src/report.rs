//! Plain-text rendering of an allocation proposal.

use std::fmt;

use crate::allocator::{AllocationResult, SideSummary};
use crate::model::Origin;
use crate::types::Side;

/// Display adapter that renders an [`AllocationResult`] as a text report.
pub struct Report<'a> {
    result: &'a AllocationResult,
}

impl<'a> Report<'a> {
    pub fn new(result: &'a AllocationResult) -> Self {
        Self { result }
    }

    fn origin_of(&self, name: &str, side: Side) -> Option<Origin> {
        self.result
            .assignment
            .iter()
            .find(|entry| entry.name == name && entry.destination == side)
            .map(|entry| entry.origin)
    }

    fn write_side(&self, f: &mut fmt::Formatter<'_>, summary: &SideSummary) -> fmt::Result {
        let status = if summary.overflow > 0.0 {
            format!("over by {}", format_weight(summary.overflow))
        } else {
            "ok".to_string()
        };
        writeln!(
            f,
            "Collection {}: {} / {} ({status})",
            summary.side,
            format_weight(summary.total),
            format_weight(summary.capacity),
        )?;

        if summary.items.is_empty() {
            return writeln!(f, "  (empty)");
        }

        let width = summary.items.keys().map(|n| n.chars().count()).max().unwrap_or(0);
        for (name, weight) in &summary.items {
            let tag = match self.origin_of(name, summary.side) {
                Some(Origin::Duplicate) => " [merged]",
                Some(Origin::Pinned) => " [pinned]",
                _ => "",
            };
            writeln!(f, "  {name:<width$}  {:>10}{tag}", format_weight(*weight))?;
        }
        Ok(())
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.result;
        writeln!(f, "Allocation proposal")?;
        writeln!(f, "===================")?;
        self.write_side(f, &result.side_a)?;
        self.write_side(f, &result.side_b)?;

        if result.moves.is_empty() {
            writeln!(f, "Moves: none")?;
        } else {
            writeln!(f, "Moves:")?;
            let width = result
                .moves
                .iter()
                .map(|m| m.name.chars().count())
                .max()
                .unwrap_or(0);
            for mv in &result.moves {
                writeln!(
                    f,
                    "  {:<width$}  {}  {}",
                    mv.name,
                    mv.direction,
                    format_weight(mv.weight)
                )?;
            }
        }

        if result.is_valid {
            write!(f, "Result: valid, both collections within capacity")
        } else {
            let over: Vec<String> = Side::BOTH
                .into_iter()
                .filter(|side| result.overflow(*side) > 0.0)
                .map(|side| format!("{side} by {}", format_weight(result.overflow(side))))
                .collect();
            write!(f, "Result: capacity exceeded ({})", over.join(", "))
        }
    }
}

/// Renders the text report of an allocation.
pub fn render_report(result: &AllocationResult) -> String {
    Report::new(result).to_string()
}

/// Formats a weight with up to three decimals, without trailing zeros.
pub fn format_weight(value: f64) -> String {
    let text = format!("{value:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}
