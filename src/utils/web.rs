use std::fmt::Write;
use quick_xml::escape::escape;
use serde_json::Value;
use crate::error::GradebookError;
use crate::models::Gradebook;
use crate::utils::normalize::normalize;
use crate::utils::render::{course_blocks, course_heading, render, CourseHeader, GradeLine, Surface};

const PAGE_TITLE: &str = "StudentVue Gradebook Viewer";

const STYLE: &str = r#"
body { font-family: sans-serif; margin: 0; padding: 2rem; background: #ffffff; color: #262730; }
.course-card { background-color: #f0f2f6; padding: 1.5rem; border-radius: 10px; margin-bottom: 1.5rem; }
.caption { color: #6b6f76; margin-top: 0; }
.grade-section { display: flex; gap: 1rem; margin: 1rem 0; }
.metric { flex: 1; }
.metric .label { font-size: 0.9rem; color: #6b6f76; }
.metric .value { font-size: 2rem; }
.metric .delta { color: #09ab3b; }
.progress { display: flex; align-items: center; gap: 0.5rem; margin: 0.25rem 0; }
.progress progress { flex: 1; }
.notice { background: #fff3cd; padding: 0.75rem; border-radius: 6px; }
.error { background: #ffe0e0; padding: 0.75rem; border-radius: 6px; }
details { margin: 0.5rem 0; }
hr { margin: 0.5rem 0; border: none; border-top: 1px solid #e0e0e0; }
form label { display: block; margin: 0.5rem 0; }
"#;

// Builds the body of a web page; every piece of portal text is escaped on the way in.
#[derive(Default)]
pub struct HtmlSurface {
    body: String,
}

impl HtmlSurface {
    pub fn finish(self) -> String {
        page(&self.body)
    }
}

impl Surface for HtmlSurface {
    fn begin_course(&mut self, header: &CourseHeader) {
        let _ = write!(
            self.body,
            r#"<div class="course-card"><h2>{}</h2><p class="caption">Teacher: {} &middot; Period: {} &middot; Room: {}</p>"#,
            escape(&course_heading(header)),
            escape(&header.teacher),
            escape(&header.period),
            escape(&header.room)
        );
    }

    fn end_course(&mut self) {
        self.body.push_str("</div>\n");
    }

    fn heading(&mut self, text: &str) {
        let _ = write!(self.body, "<h3>{}</h3>", escape(text));
    }

    fn text(&mut self, text: &str) {
        let _ = write!(self.body, "<p>{}</p>", escape(text));
    }

    fn metrics(&mut self, grades: &[GradeLine]) {
        self.body.push_str(r#"<div class="grade-section">"#);
        for grade in grades {
            let _ = write!(
                self.body,
                r#"<div class="metric"><div class="label">{}</div><div class="value">{}</div><div class="delta">{}%</div></div>"#,
                escape(&grade.label),
                escape(&grade.score),
                escape(&grade.raw)
            );
        }
        self.body.push_str("</div>");
    }

    fn progress(&mut self, label: &str, fraction: f64) {
        let _ = write!(
            self.body,
            r#"<div class="progress"><span>{}</span><progress max="1" value="{:.3}"></progress><span>{:.1}%</span></div>"#,
            escape(label),
            fraction.clamp(0.0, 1.0),
            fraction * 100.0
        );
    }

    fn notice(&mut self, text: &str) {
        let _ = write!(self.body, r#"<div class="notice">{}</div>"#, escape(text));
    }

    fn divider(&mut self) {
        self.body.push_str("<hr>");
    }

    fn begin_section(&mut self, title: &str) {
        let _ = write!(self.body, "<details><summary>{}</summary>", escape(title));
    }

    fn end_section(&mut self) {
        self.body.push_str("</details>");
    }
}

fn page(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{PAGE_TITLE}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<h1>{PAGE_TITLE}</h1>\n{body}\n</body>\n</html>\n"
    )
}

pub fn render_gradebook(gradebook: &Gradebook) -> String {
    let mut surface = HtmlSurface::default();
    render(&course_blocks(gradebook), &mut surface);
    surface.finish()
}

// Normalizes a raw portal document and renders it as a standalone page.
pub fn render_html(raw: &Value) -> Result<String, GradebookError> {
    let gradebook = normalize(raw)?;
    Ok(render_gradebook(&gradebook))
}

pub fn error_page(message: &str) -> String {
    page(&format!(r#"<div class="error">{}</div>"#, escape(message)))
}

// Credential form, shown when the environment does not supply a complete configuration.
pub fn login_page(domain: Option<&str>, message: Option<&str>) -> String {
    let mut body = String::new();
    if let Some(message) = message {
        let _ = write!(body, r#"<div class="error">{}</div>"#, escape(message));
    }
    let _ = write!(
        body,
        r#"<form method="post" action="/"><label>Username <input name="username" autocomplete="username"></label><label>Password <input name="password" type="password" autocomplete="current-password"></label><label>District domain <input name="domain" value="{}"></label><button type="submit">Show grades</button></form>"#,
        escape(domain.unwrap_or_default())
    );
    page(&body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_contains_metric_cards_and_empty_assignments() {
        let raw = json!({"Gradebook": {"Courses": {"Course": {
            "@Title": "English 10", "@Teacher": "Austen", "@Period": "1", "@Room": "204",
            "Marks": {"Mark": {"@MarkName": "HS-MK4", "@CalculatedScoreString": "B", "@CalculatedScoreRaw": "82"}}
        }}}});
        let html = render_html(&raw).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h2>1 - English 10</h2>"));
        assert!(html.contains(r#"<div class="label">Q4</div><div class="value">B</div><div class="delta">82%</div>"#));
        assert!(html.contains("<h3>Assignments</h3><p>No assignments posted.</p>"));
    }

    #[test]
    fn portal_text_is_escaped() {
        let raw = json!({"Gradebook": {"Courses": {"Course": {
            "@Title": "<script>alert(1)</script>",
            "Assignments": {"Assignment": {"@Measure": "Essay & Outline", "@Type": "Writing",
                "@Notes": "see \"rubric\""}}
        }}}});
        let html = render_html(&raw).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("<summary>Essay &amp; Outline - Writing</summary>"));
        assert!(html.contains("Notes: see &quot;rubric&quot;"));
    }

    #[test]
    fn sections_are_balanced() {
        let raw = json!({"Gradebook": {"Courses": {"Course": [
            {"@Title": "A", "Assignments": {"Assignment": [{"@Measure": "x"}, {"@Measure": "y"}]}},
            {"@Title": "B"}
        ]}}});
        let html = render_html(&raw).unwrap();
        assert_eq!(html.matches("<details>").count(), html.matches("</details>").count());
        assert_eq!(html.matches(r#"<div class="course-card">"#).count(), 2);
    }

    #[test]
    fn login_form_prefills_domain() {
        let html = login_page(Some("district.edupoint.com"), Some("Missing password"));
        assert!(html.contains(r#"name="domain" value="district.edupoint.com""#));
        assert!(html.contains(r#"<div class="error">Missing password</div>"#));
    }
}
