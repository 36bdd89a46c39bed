//! Display helpers for KPI values
//! Absent optional figures render as "N/A"

use crate::models::{MetricRecord, MetricUnit, UnitMetric};

pub const NOT_AVAILABLE: &str = "N/A";

/// Group thousands with commas, e.g. 245000 -> "245,000"
pub fn format_thousands(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if rounded < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

pub fn format_value(value: f64, unit: MetricUnit) -> String {
    if !value.is_finite() {
        return NOT_AVAILABLE.to_string();
    }
    match unit {
        MetricUnit::Percent => format!("{:.1}%", value),
        MetricUnit::Currency if value.abs() < 1000.0 => format!("{:.2}", value),
        MetricUnit::Currency => format_thousands(value),
        MetricUnit::Days => format!("{:.1} days", value),
        MetricUnit::Count => format_thousands(value),
    }
}

pub fn format_optional(value: Option<f64>, unit: MetricUnit) -> String {
    value
        .map(|v| format_value(v, unit))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

pub fn format_record(record: &MetricRecord) -> (String, String, String) {
    (
        format_value(record.value, record.unit),
        format_optional(record.target, record.unit),
        format_optional(record.budget, record.unit),
    )
}

/// "81.7%" for budget rows, "N/A" otherwise
pub fn format_budget_ratio(row: &UnitMetric) -> String {
    row.budget_ratio()
        .map(|r| format!("{:.1}%", r * 100.0))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Truncate a unit name for fixed-width tables
pub fn truncate_name(name: &str, max_len: usize) -> String {
    if name.chars().count() > max_len && max_len > 3 {
        let head: String = name.chars().take(max_len - 3).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrganizationalUnit, UnitKind};

    #[test]
    fn test_thousands() {
        assert_eq!(format_thousands(245_000.0), "245,000");
        assert_eq!(format_thousands(999.0), "999");
        assert_eq!(format_thousands(1_234_567.4), "1,234,567");
        assert_eq!(format_thousands(-4200.0), "-4,200");
    }

    #[test]
    fn test_units() {
        assert_eq!(format_value(91.26, MetricUnit::Percent), "91.3%");
        assert_eq!(format_value(42.0, MetricUnit::Currency), "42.00");
        assert_eq!(format_value(3.24, MetricUnit::Days), "3.2 days");
        assert_eq!(format_value(42.0, MetricUnit::Count), "42");
        assert_eq!(format_value(f64::NAN, MetricUnit::Count), NOT_AVAILABLE);
    }

    #[test]
    fn test_missing_fields_render_not_available() {
        assert_eq!(format_optional(None, MetricUnit::Percent), "N/A");

        let row = UnitMetric {
            unit: OrganizationalUnit {
                id: "north".into(),
                name: "North".into(),
                kind: UnitKind::Region,
                parent_id: None,
            },
            value: 245_000.0,
            budget: None,
        };
        assert_eq!(format_budget_ratio(&row), "N/A");
        let row = UnitMetric { budget: Some(300_000.0), ..row };
        assert_eq!(format_budget_ratio(&row), "81.7%");
    }

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("Schneider National", 10), "Schneid...");
        assert_eq!(truncate_name("Saia LTL", 10), "Saia LTL");
    }
}
