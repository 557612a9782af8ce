use crate::models::{Assignment, Category, Gradebook};
use crate::utils::normalize::{
    breakdown, current_mark, period_index, period_number, quarter_marks, QUARTER_PREFIX,
};

#[derive(Debug, Clone, PartialEq)]
pub struct CourseHeader {
    pub title: String,
    pub period: String,
    pub teacher: String,
    pub room: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradeLine {
    pub label: String,
    pub score: String,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Breakdown {
    Entries { label: String, categories: Vec<Category> },
    Unreadable(String),
}

// Everything displayed for one course, selected and ordered once for every medium.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseBlock {
    pub header: CourseHeader,
    pub grades: Vec<GradeLine>,
    pub breakdown: Option<Breakdown>,
    pub assignments: Vec<Assignment>,
}

// Display primitives a medium has to provide.
pub trait Surface {
    fn begin_course(&mut self, header: &CourseHeader);
    fn end_course(&mut self) {}
    fn heading(&mut self, text: &str);
    fn text(&mut self, text: &str);
    fn metrics(&mut self, grades: &[GradeLine]);
    fn progress(&mut self, label: &str, fraction: f64);
    fn notice(&mut self, text: &str);
    fn divider(&mut self);
    fn begin_section(&mut self, title: &str);
    fn end_section(&mut self) {}
}

// "HS-MK4" -> "Q4", "HS-MK10" -> "Q10"; a non-numeric designator is shown as given.
fn quarter_label(name: &str) -> String {
    match period_index(name) {
        Some(index) => format!("Q{index}"),
        None => format!("Q{}", name.strip_prefix(QUARTER_PREFIX).unwrap_or(name)),
    }
}

pub fn course_blocks(gradebook: &Gradebook) -> Vec<CourseBlock> {
    gradebook
        .courses
        .iter()
        .map(|course| {
            let grades = quarter_marks(&course.marks)
                .into_iter()
                .map(|mark| GradeLine {
                    label: quarter_label(&mark.name),
                    score: mark.score.clone(),
                    raw: mark.raw_score.clone(),
                })
                .collect();

            let summary = current_mark(gradebook, course)
                .filter(|mark| !mark.calculations.is_empty())
                .map(|mark| match breakdown(mark) {
                    Ok(categories) => Breakdown::Entries {
                        label: format!("{} Grade Breakdown", quarter_label(&mark.name)),
                        categories,
                    },
                    Err(e) => Breakdown::Unreadable(e.user_message()),
                });

            CourseBlock {
                header: CourseHeader {
                    title: course.title.clone(),
                    period: course.period.clone(),
                    teacher: course.teacher.clone(),
                    room: course.room.clone(),
                },
                grades,
                breakdown: summary,
                assignments: course.assignments.clone(),
            }
        })
        .collect()
}

pub fn course_heading(header: &CourseHeader) -> String {
    format!("{} - {}", period_number(&header.period), header.title)
}

// Walks the blocks in order and draws them on the surface.
pub fn render<S: Surface>(blocks: &[CourseBlock], surface: &mut S) {
    for block in blocks {
        surface.begin_course(&block.header);

        if !block.grades.is_empty() {
            surface.metrics(&block.grades);
        }

        match &block.breakdown {
            Some(Breakdown::Entries { label, categories }) => {
                surface.begin_section(label);
                for category in categories {
                    surface.progress(
                        &format!("{} ({})", category.kind, category.calculated_mark),
                        category.fraction,
                    );
                }
                surface.end_section();
            }
            Some(Breakdown::Unreadable(message)) => surface.notice(message),
            None => {}
        }

        surface.heading("Assignments");
        if block.assignments.is_empty() {
            surface.text("No assignments posted.");
        }
        for assignment in &block.assignments {
            surface.divider();
            surface.begin_section(&format!("{} - {}", assignment.measure, assignment.kind));
            surface.text(&format!("Date: {}", assignment.date));
            surface.text(&format!("Due Date: {}", assignment.due_date));
            surface.text(&format!("Score: {}", assignment.display_score));
            if let Some(notes) = &assignment.notes {
                surface.text(&format!("Notes: {notes}"));
            }
            surface.end_section();
        }

        surface.end_course();
    }
}
