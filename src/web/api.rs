//! JSON API handlers for the web dashboard.
//!
//! Each handler corresponds to an API endpoint and returns an
//! [`HttpResponse`] with JSON content. Handlers run on the event loop
//! thread and act on the shared [`App`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tiny_http::{Response, StatusCode};

use crate::app::{App, View};
use crate::dashboard::DashboardView;
use crate::editor::ConfigDraft;
use crate::model::Article;
use crate::runtime::Runtime;
use crate::store::KvStore;

use super::{HttpResponse, content_type_json, error_response};

// ---------------------------------------------------------------------------
// JSON request/response types
// ---------------------------------------------------------------------------

/// `GET /api/dashboard` payload.
#[derive(Serialize)]
struct DashboardResponse {
    /// Changes whenever anything on screen changed.
    revision: u64,
    view: View,
    auto_refresh: bool,
    dashboard: DashboardView,
}

/// `POST /api/cooked` body. Exactly one of `step` (1 or -1), `value`,
/// `adjust` is expected; `step` wins, then `value`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CookedRequest {
    counter_id: String,
    #[serde(default)]
    step: Option<i64>,
    /// Direct override, as typed.
    #[serde(default)]
    value: Option<String>,
    /// Signed adjustment, as typed.
    #[serde(default)]
    adjust: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CookedResponse {
    counter_id: String,
    cooked: u64,
}

#[derive(Deserialize)]
struct ViewRequest {
    view: View,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a JSON success response.
fn json_response<T: Serialize>(data: &T) -> Result<HttpResponse> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(200)))
}

fn dashboard_response<S: KvStore>(app: &App<S>) -> DashboardResponse {
    DashboardResponse {
        revision: app.revision(),
        view: app.view(),
        auto_refresh: app.auto_refresh_enabled(),
        dashboard: app.snapshot(),
    }
}

// ---------------------------------------------------------------------------
// API Handlers
// ---------------------------------------------------------------------------

/// `GET /api/dashboard`: current snapshot, polled by the frontend.
pub fn get_dashboard<S: KvStore>(app: &App<S>) -> Result<HttpResponse> {
    json_response(&dashboard_response(app))
}

/// `GET /api/articles`: the menu, for the item selectors.
pub fn get_articles<S: KvStore>(app: &App<S>) -> Result<HttpResponse> {
    let articles: &[Article] = app.articles();
    json_response(&articles)
}

/// `POST /api/cooked`: step, override, or adjust a cooked count.
pub fn post_cooked<S: KvStore>(app: &mut App<S>, body: &str) -> Result<HttpResponse> {
    let req: CookedRequest = serde_json::from_str(body).context("invalid JSON in cooked request")?;

    if !app.state().counters.iter().any(|c| c.id == req.counter_id) {
        return Ok(error_response(404, &format!("unknown counter {}", req.counter_id)));
    }

    let cooked = if let Some(delta) = req.step {
        if delta != 1 && delta != -1 {
            return Ok(error_response(400, &format!("step must be 1 or -1, got {delta}")));
        }
        app.step_cooked(&req.counter_id, delta)
    } else if let Some(value) = &req.value {
        app.override_cooked(&req.counter_id, value)
    } else if let Some(text) = &req.adjust {
        match app.adjust_cooked(&req.counter_id, text) {
            Some(cooked) => cooked,
            None => return Ok(error_response(400, &format!("not a number: {text}"))),
        }
    } else {
        return Ok(error_response(400, "expected one of step, value, adjust"));
    };

    json_response(&CookedResponse {
        counter_id: req.counter_id,
        cooked,
    })
}

/// `POST /api/refresh`: manual incremental refresh.
pub fn post_refresh<S: KvStore, X: Send + 'static>(
    runtime: &mut Runtime<S, X>,
) -> Result<HttpResponse> {
    let started = runtime.refresh_now();
    json_response(&serde_json::json!({ "started": started }))
}

/// `POST /api/auto-refresh`: toggle automatic refresh.
pub fn post_auto_refresh<S: KvStore>(app: &mut App<S>) -> Result<HttpResponse> {
    app.toggle_auto_refresh();
    json_response(&serde_json::json!({ "autoRefresh": app.auto_refresh_enabled() }))
}

/// `POST /api/view`: switch between dashboard and configuration.
pub fn post_view<S: KvStore>(app: &mut App<S>, body: &str) -> Result<HttpResponse> {
    let req: ViewRequest = serde_json::from_str(body).context("invalid JSON in view request")?;
    app.set_view(req.view);
    json_response(&serde_json::json!({ "view": app.view() }))
}

/// `GET /api/configuration`: a draft seeded from the current state.
pub fn get_configuration<S: KvStore>(app: &App<S>) -> Result<HttpResponse> {
    json_response(&app.draft())
}

/// `PUT /api/configuration`: save the edited draft.
///
/// The body is the draft as the editor holds it; incomplete items and
/// empty counters are dropped on save. Responds with the new dashboard.
pub fn put_configuration<S: KvStore, X: Send + 'static>(
    runtime: &mut Runtime<S, X>,
    body: &str,
) -> Result<HttpResponse> {
    let draft: ConfigDraft =
        serde_json::from_str(body).context("invalid JSON in configuration request")?;
    runtime.save_configuration(draft.save());
    json_response(&dashboard_response(runtime.app()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
