use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Gradebook {
    pub courses: Vec<Course>,
    pub reporting_periods: Vec<ReportPeriod>,
    pub current_period: Option<ReportPeriod>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReportPeriod {
    pub index: Option<u32>,
    pub name: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Course {
    pub title: String,
    pub teacher: String,
    pub period: String,
    pub room: String,
    pub marks: Vec<Mark>,
    pub assignments: Vec<Assignment>,
}

// One marking-period grade, with its optional weighted breakdown.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Mark {
    pub name: String,
    pub score: String,
    pub raw_score: String,
    pub calculations: Vec<GradeCalc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GradeCalc {
    pub kind: String,
    pub weight: String,
    pub weighted_pct: String,
    pub calculated_mark: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Assignment {
    pub measure: String,
    pub kind: String,
    pub date: String,
    pub due_date: String,
    pub display_score: String,
    pub notes: Option<String>,
}

// A breakdown row with its weighted percentage parsed to a 0.0-1.0 fraction.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub kind: String,
    pub fraction: f64,
    pub calculated_mark: String,
}
