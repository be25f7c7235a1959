// 🌱 Emission Factors - kg CO₂ per currency unit spent
// A fixed lookup table: unknown categories resolve to zero, never an error.

use serde::Serialize;

// ============================================================================
// FACTOR DEFINITION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EmissionFactor {
    /// Category key as shown in the selection widget (e.g., "飲食")
    pub category: &'static str,

    /// English label for display next to the key
    pub label: &'static str,

    /// kg CO₂ per currency unit
    pub kg_per_unit: f64,
}

const STANDARD_FACTORS: &[EmissionFactor] = &[
    EmissionFactor { category: "飲食", label: "Food", kg_per_unit: 0.02 },
    EmissionFactor { category: "交通", label: "Transport", kg_per_unit: 0.05 },
    EmissionFactor { category: "購物", label: "Shopping", kg_per_unit: 0.03 },
    EmissionFactor { category: "娛樂", label: "Entertainment", kg_per_unit: 0.015 },
];

// ============================================================================
// FACTOR TABLE
// ============================================================================

/// Immutable category → coefficient table.
///
/// The table is fixed at compile time and copied by value into every
/// ledger that uses it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionFactorTable {
    factors: &'static [EmissionFactor],
}

impl Default for EmissionFactorTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl EmissionFactorTable {
    /// The built-in factor table
    pub const fn standard() -> Self {
        EmissionFactorTable {
            factors: STANDARD_FACTORS,
        }
    }

    /// Coefficient for `category`, or 0.0 when the category is not in the table.
    ///
    /// A misspelled category therefore contributes no emissions at all.
    pub fn lookup(&self, category: &str) -> f64 {
        self.get(category).map(|f| f.kg_per_unit).unwrap_or(0.0)
    }

    pub fn get(&self, category: &str) -> Option<&EmissionFactor> {
        self.factors.iter().find(|f| f.category == category)
    }

    pub fn contains(&self, category: &str) -> bool {
        self.get(category).is_some()
    }

    pub fn label(&self, category: &str) -> Option<&'static str> {
        self.get(category).map(|f| f.label)
    }

    /// Category keys in table order
    pub fn categories(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factors.iter().map(|f| f.category)
    }

    pub fn factors(&self) -> &'static [EmissionFactor] {
        self.factors
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
