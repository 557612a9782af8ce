use std::net::SocketAddr;
use std::sync::Arc;
use anyhow::{Context, Result};
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::{Form, Router};
use log::{error, info};
use serde::Deserialize;
use crate::config::{PortalConfig, DOMAIN_VAR, PASSWORD_VAR, USERNAME_VAR};
use crate::utils::studentvue::fetch_gradebook;
use crate::utils::web::{error_page, login_page, render_html};

// Read-only settings shared by every request; each request fetches its own document.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub config: Option<PortalConfig>,
    pub domain_hint: Option<String>,
    pub period: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    domain: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(show).post(login))
        .with_state(Arc::new(state))
}

pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Serving gradebook on http://{}", addr);
    axum::serve(listener, router(state))
        .await
        .context("Server stopped unexpectedly")?;
    Ok(())
}

// Fetches and renders one page; any failure becomes a single message instead of partial output.
async fn gradebook_page(config: &PortalConfig, period: Option<u32>) -> String {
    match fetch_gradebook(config, period).await {
        Ok(raw) => match render_html(&raw) {
            Ok(page) => {
                info!("Grades retrieved successfully");
                page
            }
            Err(e) => {
                error!("Error rendering gradebook: {}", e);
                error_page(&e.user_message())
            }
        },
        Err(e) => {
            error!("Error fetching gradebook: {}", e);
            error_page(&e.user_message())
        }
    }
}

async fn show(State(state): State<Arc<AppState>>) -> Html<String> {
    match &state.config {
        Some(config) => Html(gradebook_page(config, state.period).await),
        None => Html(login_page(state.domain_hint.as_deref(), None)),
    }
}

async fn login(State(state): State<Arc<AppState>>, Form(form): Form<LoginForm>) -> Html<String> {
    let domain = if form.domain.trim().is_empty() {
        state.domain_hint.clone().unwrap_or_default()
    } else {
        form.domain.clone()
    };
    let config = PortalConfig::from_lookup(|key| match key {
        USERNAME_VAR => Some(form.username.clone()),
        PASSWORD_VAR => Some(form.password.clone()),
        DOMAIN_VAR => Some(domain.clone()),
        _ => None,
    });

    match config {
        Ok(config) => Html(gradebook_page(&config, state.period).await),
        Err(_) => Html(login_page(
            Some(&domain),
            Some("Please fill in username, password and district domain."),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_configuration_shows_the_login_form() {
        let state = AppState {
            domain_hint: Some("district.edupoint.com".to_string()),
            ..AppState::default()
        };
        let Html(page) = show(State(Arc::new(state))).await;
        assert!(page.contains(r#"<form method="post" action="/">"#));
        assert!(page.contains(r#"value="district.edupoint.com""#));
    }

    #[tokio::test]
    async fn incomplete_form_is_sent_back_with_a_message() {
        let form = LoginForm {
            username: "student1".to_string(),
            password: String::new(),
            domain: String::new(),
        };
        let state = AppState {
            domain_hint: Some("district.edupoint.com".to_string()),
            ..AppState::default()
        };
        let Html(page) = login(State(Arc::new(state)), Form(form)).await;
        assert!(page.contains("Please fill in username, password and district domain."));
        assert!(page.contains(r#"value="district.edupoint.com""#));
    }
}
