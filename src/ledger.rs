// 📒 Expense Ledger - append-only entries with derived emission aggregates
//
// Entries are never edited or removed. Every aggregate is recomputed from
// the entries on each call, so repeated calls over the same ledger always
// agree with each other and with the entry list.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::factors::EmissionFactorTable;

// ============================================================================
// ENTRY
// ============================================================================

/// One logged expense with its derived emission value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    /// Calendar date of the expense (no validation: past or future both fine)
    pub date: NaiveDate,

    /// Category key; unknown keys are accepted and carry zero emissions
    pub category: String,

    /// Amount spent, in currency units
    pub amount: f64,

    /// amount × factor, fixed at append time
    pub carbon_kg: f64,
}

// ============================================================================
// AGGREGATE ROWS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub carbon_kg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub carbon_kg: f64,
}

/// Category total together with its share of the grand total
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub carbon_kg: f64,
    /// 0.0 - 100.0; all zero when the grand total is zero
    pub percent: f64,
}

// ============================================================================
// LEDGER
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ExpenseLedger {
    factors: EmissionFactorTable,
    entries: Vec<Entry>,
}

impl ExpenseLedger {
    /// Empty ledger over the standard factor table
    pub fn new() -> Self {
        Self::with_factors(EmissionFactorTable::standard())
    }

    pub fn with_factors(factors: EmissionFactorTable) -> Self {
        ExpenseLedger {
            factors,
            entries: Vec::new(),
        }
    }

    pub fn factors(&self) -> &EmissionFactorTable {
        &self.factors
    }

    /// Append a new entry and return it.
    ///
    /// Never fails: the minimum-amount check belongs to the input boundary
    /// (see [`crate::form::Submission`]) and unknown categories resolve to a
    /// zero coefficient.
    pub fn append(&mut self, date: NaiveDate, category: impl Into<String>, amount: f64) -> &Entry {
        let category = category.into();
        let carbon_kg = amount * self.factors.lookup(&category);

        tracing::debug!(%date, category = %category, amount, carbon_kg, "appending entry");

        self.entries.push(Entry {
            date,
            category,
            amount,
            carbon_kg,
        });

        &self.entries[self.entries.len() - 1]
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries in submission order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    /// Emissions summed per date, ascending by date, one row per distinct date
    pub fn daily_totals(&self) -> Vec<DailyTotal> {
        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();

        for entry in &self.entries {
            *by_date.entry(entry.date).or_insert(0.0) += entry.carbon_kg;
        }

        by_date
            .into_iter()
            .map(|(date, carbon_kg)| DailyTotal { date, carbon_kg })
            .collect()
    }

    /// Emissions summed per category, in order of first appearance
    pub fn category_totals(&self) -> Vec<CategoryTotal> {
        let mut totals: Vec<CategoryTotal> = Vec::new();

        for entry in &self.entries {
            match totals.iter_mut().find(|t| t.category == entry.category) {
                Some(total) => total.carbon_kg += entry.carbon_kg,
                None => totals.push(CategoryTotal {
                    category: entry.category.clone(),
                    carbon_kg: entry.carbon_kg,
                }),
            }
        }

        totals
    }

    /// Category totals with their percentage of the grand total (pie slices)
    pub fn category_shares(&self) -> Vec<CategoryShare> {
        let grand_total = self.grand_total();

        self.category_totals()
            .into_iter()
            .map(|t| {
                let percent = if grand_total > 0.0 {
                    t.carbon_kg / grand_total * 100.0
                } else {
                    0.0
                };
                CategoryShare {
                    category: t.category,
                    carbon_kg: t.carbon_kg,
                    percent,
                }
            })
            .collect()
    }

    /// Sum of all emissions; 0.0 for an empty ledger
    pub fn grand_total(&self) -> f64 {
        self.entries.iter().fold(0.0, |total, e| total + e.carbon_kg)
    }
}

impl<'a> IntoIterator for &'a ExpenseLedger {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn create_test_ledger() -> ExpenseLedger {
        let mut ledger = ExpenseLedger::new();
        ledger.append(date("2024-01-03"), "飲食", 1000.0);
        ledger.append(date("2024-01-01"), "交通", 200.0);
        ledger.append(date("2024-01-03"), "購物", 50.0);
        ledger.append(date("2024-01-02"), "交通", 100.0);
        ledger.append(date("2024-01-01"), "娛樂", 400.0);
        ledger
    }

    #[test]
    fn test_carbon_is_amount_times_factor() {
        let table = EmissionFactorTable::standard();
        let mut ledger = ExpenseLedger::new();

        for category in table.categories() {
            for amount in [1.0, 7.5, 1000.0] {
                let entry = ledger.append(date("2024-01-01"), category, amount);
                assert!(approx(entry.carbon_kg, table.lookup(category) * amount));
            }
        }
    }

    #[test]
    fn test_food_scenario() {
        let mut ledger = ExpenseLedger::new();
        let entry = ledger.append(date("2024-01-01"), "飲食", 1000.0);

        assert!(approx(entry.carbon_kg, 20.0));
    }

    #[test]
    fn test_transport_scenario() {
        let mut ledger = ExpenseLedger::new();
        ledger.append(date("2024-01-01"), "交通", 200.0);
        ledger.append(date("2024-01-02"), "交通", 100.0);

        let daily = ledger.daily_totals();
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, date("2024-01-01"));
        assert!(approx(daily[0].carbon_kg, 10.0));
        assert_eq!(daily[1].date, date("2024-01-02"));
        assert!(approx(daily[1].carbon_kg, 5.0));

        let categories = ledger.category_totals();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].category, "交通");
        assert!(approx(categories[0].carbon_kg, 15.0));

        assert!(approx(ledger.grand_total(), 15.0));
    }

    #[test]
    fn test_unknown_category_contributes_nothing() {
        let mut ledger = ExpenseLedger::new();
        ledger.append(date("2024-01-01"), "飲食", 1000.0);
        let before = ledger.grand_total();

        let entry = ledger.append(date("2024-01-01"), "Unknown", 500.0);
        assert_eq!(entry.carbon_kg, 0.0);
        assert_eq!(entry.amount, 500.0);

        assert_eq!(ledger.len(), 2);
        assert!(approx(ledger.grand_total(), before));
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = ExpenseLedger::new();

        assert!(ledger.is_empty());
        assert!(ledger.daily_totals().is_empty());
        assert!(ledger.category_totals().is_empty());
        assert!(ledger.category_shares().is_empty());
        assert_eq!(ledger.grand_total(), 0.0);
    }

    #[test]
    fn test_aggregates_agree_with_grand_total() {
        let ledger = create_test_ledger();

        let daily_sum: f64 = ledger.daily_totals().iter().map(|d| d.carbon_kg).sum();
        let category_sum: f64 = ledger.category_totals().iter().map(|c| c.carbon_kg).sum();

        assert!(approx(daily_sum, ledger.grand_total()));
        assert!(approx(category_sum, ledger.grand_total()));
    }

    #[test]
    fn test_daily_totals_strictly_ascending() {
        let ledger = create_test_ledger();
        let daily = ledger.daily_totals();

        assert_eq!(daily.len(), 3);
        assert!(daily.windows(2).all(|w| w[0].date < w[1].date));
        // 2024-01-01: 200 × 0.05 + 400 × 0.015
        assert!(approx(daily[0].carbon_kg, 16.0));
    }

    #[test]
    fn test_category_totals_first_occurrence_order() {
        let ledger = create_test_ledger();
        let categories: Vec<String> = ledger
            .category_totals()
            .into_iter()
            .map(|c| c.category)
            .collect();

        assert_eq!(categories, vec!["飲食", "交通", "購物", "娛樂"]);
    }

    #[test]
    fn test_append_only_prefix() {
        let mut ledger = create_test_ledger();
        let before: Vec<Entry> = ledger.entries().to_vec();

        ledger.append(date("2023-12-31"), "購物", 10.0);

        assert_eq!(ledger.len(), before.len() + 1);
        assert_eq!(&ledger.entries()[..before.len()], before.as_slice());
    }

    #[test]
    fn test_aggregates_are_repeatable() {
        let ledger = create_test_ledger();

        assert_eq!(ledger.daily_totals(), ledger.daily_totals());
        assert_eq!(ledger.category_totals(), ledger.category_totals());
        assert_eq!(ledger.grand_total(), ledger.grand_total());
    }

    #[test]
    fn test_category_shares_sum_to_hundred() {
        let ledger = create_test_ledger();
        let total: f64 = ledger.category_shares().iter().map(|s| s.percent).sum();

        assert!(approx(total, 100.0));
    }

    #[test]
    fn test_category_shares_zero_total() {
        let mut ledger = ExpenseLedger::new();
        ledger.append(date("2024-01-01"), "Unknown", 500.0);

        let shares = ledger.category_shares();
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].percent, 0.0);
    }

    #[test]
    fn test_iterates_in_submission_order() {
        let ledger = create_test_ledger();
        let dates: Vec<NaiveDate> = (&ledger).into_iter().map(|e| e.date).collect();

        assert_eq!(dates[0], date("2024-01-03"));
        assert_eq!(dates[1], date("2024-01-01"));
        assert_eq!(dates.len(), 5);
    }
}
