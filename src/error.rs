use thiserror::Error;

// Failures that can end a fetch-and-render attempt.
#[derive(Debug, Error)]
pub enum GradebookError {
    #[error("Invalid gradebook format: {0}")]
    Format(String),

    #[error("Could not parse percentage {0:?}")]
    Parse(String),

    #[error("Portal rejected the request: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl GradebookError {
    // The one line shown to the user when an attempt fails.
    pub fn user_message(&self) -> String {
        match self {
            GradebookError::Format(_) => {
                "No gradebook data available. Please check your credentials.".to_string()
            }
            GradebookError::Parse(value) => {
                format!("Could not read grade breakdown (unexpected value {value:?}).")
            }
            GradebookError::Auth(_) | GradebookError::Network(_) => {
                "Error fetching gradebook. Please try again later.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for GradebookError {
    fn from(e: reqwest::Error) -> Self {
        GradebookError::Network(e.to_string())
    }
}

impl From<quick_xml::Error> for GradebookError {
    fn from(e: quick_xml::Error) -> Self {
        GradebookError::Format(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for GradebookError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        GradebookError::Format(e.to_string())
    }
}
