use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// A standardized field value, tagged by type.
///
/// Values arrive from an external standardization step; the engine never
/// parses free text. Empty or whitespace-only text normalizes to `Missing`
/// so comparators can propagate the missing sentinel instead of scoring
/// empty strings as agreement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Text(String),
    Number(f64),
    Date(DateParts),
    Missing,
}

impl Value {
    /// Build a text value, normalizing empty input to `Missing`.
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.trim().is_empty() {
            Value::Missing
        } else {
            Value::Text(s)
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Type tag name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Number(_) => "number",
            Value::Date(_) => "date",
            Value::Missing => "missing",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateParts> {
        match self {
            Value::Date(d) => Some(d),
            _ => None,
        }
    }
}

/// A calendar date held as separate components.
///
/// Components come from an external date standardizer and may be
/// inconsistent (e.g. day 31 in April); `epoch_days` reports `None` for
/// such combinations so the caller can record a diagnostic instead of
/// scoring garbage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateParts {
    pub day: u32,
    pub month: u32,
    pub year: i32,
}

impl DateParts {
    pub fn new(day: u32, month: u32, year: i32) -> Self {
        Self { day, month, year }
    }

    /// Days since the chrono epoch, or `None` if the components do not form
    /// a real calendar date.
    pub fn epoch_days(&self) -> Option<i64> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .map(|d| d.num_days_from_ce() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_missing() {
        assert_eq!(Value::text(""), Value::Missing);
        assert_eq!(Value::text("   "), Value::Missing);
        assert_eq!(Value::text("smith"), Value::Text("smith".into()));
    }

    #[test]
    fn invalid_date_has_no_epoch() {
        assert!(DateParts::new(31, 4, 1990).epoch_days().is_none());
        assert!(DateParts::new(29, 2, 1999).epoch_days().is_none());
        assert!(DateParts::new(29, 2, 2000).epoch_days().is_some());
    }

    #[test]
    fn epoch_days_are_ordered() {
        let a = DateParts::new(1, 1, 1990).epoch_days().unwrap();
        let b = DateParts::new(2, 1, 1990).epoch_days().unwrap();
        assert_eq!(b - a, 1);
    }
}
