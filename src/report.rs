// 🧾 Text Report - plain-text rendition of the ledger and its aggregates

use std::fmt::Write;
use unicode_width::UnicodeWidthStr;

use crate::ledger::ExpenseLedger;

pub const EMPTY_MESSAGE: &str = "No expenses recorded yet.";

/// Width of the share bars in the category section
const BAR_WIDTH: usize = 20;

/// Terminal columns reserved for the category column
const CATEGORY_WIDTH: usize = 20;

/// Total summary line, e.g. `Total carbon footprint: 15.00 kg CO₂`
pub fn total_line(ledger: &ExpenseLedger) -> String {
    format!("Total carbon footprint: {:.2} kg CO₂", ledger.grand_total())
}

/// Render every view of the ledger: entry table, daily series, category
/// shares and the total. An empty ledger renders only the placeholder.
pub fn render(ledger: &ExpenseLedger) -> String {
    if ledger.is_empty() {
        return format!("{}\n", EMPTY_MESSAGE);
    }

    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "Expenses & carbon footprint");
    let _ = writeln!(
        out,
        "{:<12} {} {:>12} {:>12}",
        "Date",
        pad_to_width("Category", CATEGORY_WIDTH),
        "Amount",
        "kg CO₂"
    );
    for entry in ledger {
        let _ = writeln!(
            out,
            "{:<12} {} {:>12.2} {:>12.3}",
            entry.date.format("%Y-%m-%d").to_string(),
            pad_to_width(&category_display(ledger, &entry.category), CATEGORY_WIDTH),
            entry.amount,
            entry.carbon_kg
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Daily emissions (kg CO₂)");
    for day in ledger.daily_totals() {
        let _ = writeln!(out, "{:<12} {:>12.3}", day.date.format("%Y-%m-%d").to_string(), day.carbon_kg);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Emissions by category");
    for share in ledger.category_shares() {
        let _ = writeln!(
            out,
            "{} {:>12.3} {:>6.1}% {}",
            pad_to_width(&category_display(ledger, &share.category), CATEGORY_WIDTH),
            share.carbon_kg,
            share.percent,
            share_bar(share.percent, BAR_WIDTH)
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", total_line(ledger));

    out
}

/// `交通 (Transport)` for known categories, the raw key otherwise
pub fn category_display(ledger: &ExpenseLedger, category: &str) -> String {
    match ledger.factors().label(category) {
        Some(label) => format!("{} ({})", category, label),
        None => category.to_string(),
    }
}

/// Left-align `text` in `width` terminal columns.
///
/// CJK characters take two columns each, so `format!("{:<w$}")` (which
/// counts chars) would misalign mixed CJK/ASCII rows.
pub fn pad_to_width(text: &str, width: usize) -> String {
    let used = UnicodeWidthStr::width(text);
    format!("{}{}", text, " ".repeat(width.saturating_sub(used)))
}

/// Horizontal bar like `█████░░░░░` for a 0-100 percentage
pub fn share_bar(percent: f64, width: usize) -> String {
    let ratio = (percent / 100.0).clamp(0.0, 1.0);
    let filled = ((ratio * width as f64).round() as usize).min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

// ============================================================================
// TESTS
// ============================================================================
