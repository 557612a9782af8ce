use std::sync::OnceLock;
use log::debug;
use regex::Regex;
use serde_json::{Map, Value};
use crate::error::GradebookError;
use crate::models::{Assignment, Category, Course, GradeCalc, Gradebook, Mark, ReportPeriod};

pub const QUARTER_PREFIX: &str = "HS-MK";
pub const EXCLUDED_MARK: &str = "HS-EX2";
const TOTAL_ROW: &str = "TOTAL";
const MISSING: &str = "N/A";

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+").expect("number pattern is valid"))
}

fn percentage_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(-?\d+(?:\.\d+)?|-?\.\d+)\s*%?\s*$").expect("percentage pattern is valid")
    })
}

// Reads a collection field uniformly: a bare record becomes a one-element list, absence an empty one.
pub fn as_list(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
    }
}

// Items of the `inner` collection under `outer`, e.g. `Marks` -> `Mark`; entries that are not records are skipped.
fn records<'a>(parent: &'a Map<String, Value>, outer: &str, inner: &str) -> Vec<&'a Map<String, Value>> {
    let Some(Value::Object(container)) = parent.get(outer) else {
        return Vec::new();
    };
    as_list(container.get(inner))
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(record) => Some(record),
            other => {
                debug!("Skipping invalid {} entry: {}", inner, other);
                None
            }
        })
        .collect()
}

fn scalar(record: &Map<String, Value>, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn attr(record: &Map<String, Value>, key: &str) -> String {
    scalar(record, key).unwrap_or_else(|| MISSING.to_string())
}

// Validates the raw document and turns it into the fixed-shape gradebook.
pub fn normalize(raw: &Value) -> Result<Gradebook, GradebookError> {
    let root = match raw.get("Gradebook") {
        Some(Value::Object(root)) => root,
        Some(other) => {
            return Err(GradebookError::Format(format!("Gradebook is not a record: {other}")));
        }
        None => return Err(GradebookError::Format("no Gradebook in response".to_string())),
    };

    let courses = match root.get("Courses") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Object(_)) => records(root, "Courses", "Course")
            .into_iter()
            .map(course)
            .collect(),
        Some(other) => {
            return Err(GradebookError::Format(format!("Courses is not a record: {other}")));
        }
    };

    let reporting_periods = records(root, "ReportingPeriods", "ReportPeriod")
        .into_iter()
        .map(report_period)
        .collect();
    let current_period = match root.get("ReportingPeriod") {
        Some(Value::Object(record)) => Some(report_period(record)),
        _ => None,
    };

    Ok(Gradebook { courses, reporting_periods, current_period })
}

fn course(record: &Map<String, Value>) -> Course {
    Course {
        title: attr(record, "@Title"),
        teacher: attr(record, "@Teacher"),
        period: attr(record, "@Period"),
        room: attr(record, "@Room"),
        marks: records(record, "Marks", "Mark").into_iter().map(mark).collect(),
        assignments: records(record, "Assignments", "Assignment")
            .into_iter()
            .map(assignment)
            .collect(),
    }
}

fn mark(record: &Map<String, Value>) -> Mark {
    Mark {
        name: scalar(record, "@MarkName").unwrap_or_default(),
        score: attr(record, "@CalculatedScoreString"),
        raw_score: attr(record, "@CalculatedScoreRaw"),
        calculations: records(record, "GradeCalculationSummary", "AssignmentGradeCalc")
            .into_iter()
            .map(|calc| GradeCalc {
                kind: attr(calc, "@Type"),
                weight: attr(calc, "@Weight"),
                weighted_pct: attr(calc, "@WeightedPct"),
                calculated_mark: attr(calc, "@CalculatedMark"),
            })
            .collect(),
    }
}

fn assignment(record: &Map<String, Value>) -> Assignment {
    Assignment {
        measure: attr(record, "@Measure"),
        kind: attr(record, "@Type"),
        date: attr(record, "@Date"),
        due_date: attr(record, "@DueDate"),
        display_score: attr(record, "@DisplayScore"),
        notes: scalar(record, "@Notes").filter(|notes| !notes.trim().is_empty()),
    }
}

fn report_period(record: &Map<String, Value>) -> ReportPeriod {
    ReportPeriod {
        index: scalar(record, "@Index").and_then(|index| index.trim().parse().ok()),
        name: attr(record, "@GradePeriod"),
        start_date: attr(record, "@StartDate"),
        end_date: attr(record, "@EndDate"),
    }
}

// Numeric period index following the quarter prefix, e.g. 4 for "HS-MK4".
pub fn period_index(name: &str) -> Option<u32> {
    name.strip_prefix(QUARTER_PREFIX)?.parse().ok()
}

// Quarter grades only, in period order.
pub fn quarter_marks(marks: &[Mark]) -> Vec<&Mark> {
    let mut quarters: Vec<&Mark> = marks
        .iter()
        .filter(|mark| mark.name.starts_with(QUARTER_PREFIX) && mark.name != EXCLUDED_MARK)
        .collect();
    quarters.sort_by(|a, b| {
        period_index(&a.name)
            .cmp(&period_index(&b.name))
            .then_with(|| a.name.cmp(&b.name))
    });
    quarters
}

// The quarter mark of the portal's current reporting period.
// The period's portal index (0-based, so index 2 is the third quarter) is tried first,
// then any number in its name that names a quarter ("2026-27 Q3" -> 3). Without a
// match this is the last quarter mark that carries a breakdown.
pub fn current_mark<'a>(gradebook: &Gradebook, course: &'a Course) -> Option<&'a Mark> {
    let quarters = quarter_marks(&course.marks);
    let quarter = |wanted: u32| {
        quarters
            .iter()
            .copied()
            .find(|mark| period_index(&mark.name) == Some(wanted))
    };

    if let Some(period) = &gradebook.current_period {
        let from_index = period_position(gradebook, period).and_then(|index| quarter(index + 1));
        let found = from_index.or_else(|| {
            let numbers: Vec<u32> = number_pattern()
                .find_iter(&period.name)
                .filter_map(|m| m.as_str().parse().ok())
                .collect();
            numbers.into_iter().rev().find_map(&quarter)
        });
        if found.is_some() {
            return found;
        }
    }
    quarters.into_iter().rev().find(|mark| !mark.calculations.is_empty())
}

// Portal index of a period, looked up by name in the period list when the period itself has none.
fn period_position(gradebook: &Gradebook, period: &ReportPeriod) -> Option<u32> {
    period.index.or_else(|| {
        gradebook
            .reporting_periods
            .iter()
            .find(|listed| listed.name == period.name)
            .and_then(|listed| listed.index)
    })
}

// Weighted categories of a mark, without the summary row.
pub fn breakdown(mark: &Mark) -> Result<Vec<Category>, GradebookError> {
    mark.calculations
        .iter()
        .filter(|calc| !calc.kind.trim().eq_ignore_ascii_case(TOTAL_ROW))
        .map(|calc| {
            Ok(Category {
                kind: calc.kind.clone(),
                fraction: parse_percentage(&calc.weighted_pct)?,
                calculated_mark: calc.calculated_mark.clone(),
            })
        })
        .collect()
}

// "73.5%" -> 0.735
pub fn parse_percentage(text: &str) -> Result<f64, GradebookError> {
    let captures = percentage_pattern()
        .captures(text)
        .ok_or_else(|| GradebookError::Parse(text.to_string()))?;
    let value: f64 = captures[1]
        .parse()
        .map_err(|_| GradebookError::Parse(text.to_string()))?;
    Ok(value / 100.0)
}

// Digits of a course period ("Period 3" -> "3"), or the text itself when it has none.
pub fn period_number(period: &str) -> String {
    let digits: String = number_pattern()
        .find_iter(period)
        .map(|m| m.as_str())
        .collect();
    if digits.is_empty() {
        period.to_string()
    } else {
        digits
    }
}
