use std::fmt::Write;
use serde_json::Value;
use crate::error::GradebookError;
use crate::models::Gradebook;
use crate::utils::normalize::normalize;
use crate::utils::render::{course_blocks, course_heading, render, CourseHeader, GradeLine, Surface};

const BAR_WIDTH: usize = 20;

// Plain-text surface, buffered so nothing is printed until rendering has succeeded.
#[derive(Default)]
pub struct ConsoleSurface {
    out: String,
}

impl ConsoleSurface {
    pub fn finish(self) -> String {
        self.out
    }
}

impl Surface for ConsoleSurface {
    fn begin_course(&mut self, header: &CourseHeader) {
        let _ = writeln!(self.out, "\n{}", "=".repeat(50));
        let _ = writeln!(self.out, "{}", course_heading(header));
        let _ = writeln!(self.out, "Teacher: {}", header.teacher);
        let _ = writeln!(self.out, "Period: {}", header.period);
        let _ = writeln!(self.out, "Room: {}", header.room);
    }

    fn heading(&mut self, text: &str) {
        let _ = writeln!(self.out, "\n{text}");
    }

    fn text(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
    }

    fn metrics(&mut self, grades: &[GradeLine]) {
        let _ = writeln!(self.out, "\nGrades:");
        for grade in grades {
            let _ = writeln!(self.out, "  {}: {} ({}%)", grade.label, grade.score, grade.raw);
        }
    }

    fn progress(&mut self, label: &str, fraction: f64) {
        let filled = (fraction.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
        let _ = writeln!(
            self.out,
            "  {:<24} [{}{}] {:.1}%",
            label,
            "#".repeat(filled),
            ".".repeat(BAR_WIDTH - filled),
            fraction * 100.0
        );
    }

    fn notice(&mut self, text: &str) {
        let _ = writeln!(self.out, "! {text}");
    }

    fn divider(&mut self) {
        let _ = writeln!(self.out, "{}", "-".repeat(30));
    }

    fn begin_section(&mut self, title: &str) {
        let _ = writeln!(self.out, "\n{title}");
    }
}

pub fn render_gradebook(gradebook: &Gradebook) -> String {
    let mut surface = ConsoleSurface::default();
    render(&course_blocks(gradebook), &mut surface);
    surface.finish()
}

// Normalizes a raw portal document and renders it as console text.
pub fn render_text(raw: &Value) -> Result<String, GradebookError> {
    let gradebook = normalize(raw)?;
    Ok(render_gradebook(&gradebook))
}

// One line per reporting period, marking the one currently selected by the portal.
pub fn render_periods(gradebook: &Gradebook) -> String {
    let mut out = String::new();
    if gradebook.reporting_periods.is_empty() {
        let _ = writeln!(out, "No reporting periods listed.");
    }
    for period in &gradebook.reporting_periods {
        let current = gradebook
            .current_period
            .as_ref()
            .is_some_and(|current| current.name == period.name);
        let index = period.index.map_or_else(|| "-".to_string(), |i| i.to_string());
        let _ = writeln!(
            out,
            "{} {:>2}  {} ({} - {})",
            if current { "*" } else { " " },
            index,
            period.name,
            period.start_date,
            period.end_date
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_course_renders_header_grade_and_empty_assignments() {
        let raw = json!({"Gradebook": {"Courses": {"Course": {
            "@Title": "English 10", "@Teacher": "Austen", "@Period": "1", "@Room": "204",
            "Marks": {"Mark": [{"@MarkName": "HS-MK4", "@CalculatedScoreString": "B", "@CalculatedScoreRaw": "82"}]}
        }}}});
        let text = render_text(&raw).unwrap();
        assert!(text.contains("1 - English 10"));
        assert!(text.contains("Teacher: Austen"));
        assert!(text.contains("Room: 204"));
        assert!(text.contains("Q4: B (82%)"));
        assert!(text.contains("Assignments\nNo assignments posted."));
    }

    #[test]
    fn portal_xml_renders_end_to_end() {
        let raw = crate::utils::xml::decode(concat!(
            r#"<Gradebook><ReportingPeriod GradePeriod="3rd Qtr" StartDate="1/25/2027" EndDate="4/2/2027"/>"#,
            "<Courses>",
            r#"<Course Period="2" Title="Chemistry" Room="C4" Teacher="Franklin"><Marks>"#,
            r#"<Mark MarkName="HS-MK3" CalculatedScoreString="C" CalculatedScoreRaw="74"><GradeCalculationSummary>"#,
            r#"<AssignmentGradeCalc Type="Tests" Weight="50%" WeightedPct="35%" CalculatedMark="C-"/>"#,
            r#"<AssignmentGradeCalc Type="TOTAL" Weight="100%" WeightedPct="74%" CalculatedMark="C"/>"#,
            "</GradeCalculationSummary></Mark></Marks>",
            r#"<Assignments><Assignment Measure="Stoichiometry Lab" Type="Lab" Date="2/3/2027" DueDate="2/5/2027" DisplayScore="18 out of 20" Notes=""/></Assignments>"#,
            "</Course>",
            r#"<Course Period="4" Title="Spanish II" Room="L1" Teacher="Cervantes"><Marks/><Assignments/></Course>"#,
            "</Courses></Gradebook>"
        ))
        .unwrap();
        let text = render_text(&raw).unwrap();
        assert!(text.contains("2 - Chemistry"));
        assert!(text.contains("Q3: C (74%)"));
        assert!(text.contains("Q3 Grade Breakdown"));
        assert!(text.contains("Tests (C-)"));
        assert!(!text.contains("TOTAL"));
        assert!(text.contains("Stoichiometry Lab - Lab"));
        assert!(!text.contains("Notes:"));
        assert!(text.contains("4 - Spanish II"));
        assert_eq!(text.matches("No assignments posted.").count(), 1);
    }

    #[test]
    fn missing_gradebook_produces_no_output() {
        let result = render_text(&json!({"StudentInfo": {}}));
        assert!(matches!(result, Err(GradebookError::Format(_))));
    }

    #[test]
    fn progress_bar_is_proportional() {
        let mut surface = ConsoleSurface::default();
        surface.progress("Tests (B)", 0.5);
        let line = surface.finish();
        assert!(line.contains(&format!("[{}{}]", "#".repeat(10), ".".repeat(10))));
        assert!(line.contains("50.0%"));
    }

    #[test]
    fn progress_bar_clamps_out_of_range_fractions() {
        let mut surface = ConsoleSurface::default();
        surface.progress("Extra credit", 1.2);
        assert!(surface.finish().contains(&format!("[{}]", "#".repeat(20))));
    }

    #[test]
    fn periods_mark_the_current_one() {
        let gradebook = normalize(&json!({"Gradebook": {
            "ReportingPeriods": {"ReportPeriod": [
                {"@Index": "0", "@GradePeriod": "1st Qtr", "@StartDate": "8/20/2026", "@EndDate": "10/30/2026"},
                {"@Index": "1", "@GradePeriod": "2nd Qtr", "@StartDate": "11/2/2026", "@EndDate": "1/22/2027"}
            ]},
            "ReportingPeriod": {"@GradePeriod": "2nd Qtr", "@StartDate": "11/2/2026", "@EndDate": "1/22/2027"}
        }}))
        .unwrap();
        let listing = render_periods(&gradebook);
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines[0], "   0  1st Qtr (8/20/2026 - 10/30/2026)");
        assert_eq!(lines[1], "*  1  2nd Qtr (11/2/2026 - 1/22/2027)");
    }
}
