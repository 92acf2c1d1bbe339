//! Embedded web dashboard for sagra.
//!
//! Provides a lightweight HTTP server (sync, via `tiny_http`) that serves:
//! - The single-page order dashboard with its configuration editor
//! - JSON API endpoints that drive the shared application core
//!
//! A listener thread forwards each request into the runtime's event queue,
//! so requests are handled on the loop thread alongside ticks and fetch
//! results. Launched via `sagra web` (default: `http://127.0.0.1:8787`).

mod api;
mod frontend;

use std::io::Cursor;
use std::thread;

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

use crate::app::App;
use crate::runtime::{Event, Flow, Runtime, Surface};
use crate::store::KvStore;

pub(crate) type HttpResponse = Response<Cursor<Vec<u8>>>;

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the web dashboard on `addr` and run the event loop.
///
/// Blocks the current thread. Errors in a single request are reported to
/// the client as JSON and never stop the server.
pub fn serve<S: KvStore>(
    runtime: &mut Runtime<S, Request>,
    addr: &str,
    open_in_browser: bool,
) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    println!("sagra dashboard running at http://{addr}");
    println!("Press Ctrl+C to stop.\n");

    if open_in_browser {
        // Best-effort
        let _ = open_browser(&format!("http://{addr}"));
    }

    let tx = runtime.sender();
    thread::spawn(move || {
        for request in server.incoming_requests() {
            if tx.send(Event::External(request)).is_err() {
                break;
            }
        }
    });

    runtime.load_articles();
    runtime.reload();
    runtime.run(&mut WebSurface);
    Ok(())
}

/// Answers requests on the loop thread. The browser polls, so there is
/// nothing to push on render.
struct WebSurface;

impl<S: KvStore> Surface<S, Request> for WebSurface {
    fn handle(&mut self, runtime: &mut Runtime<S, Request>, mut request: Request) -> Flow {
        let method = request.method().clone();
        let url = request.url().to_string();

        // Read body up-front for methods that carry one
        let body = if matches!(method, Method::Put | Method::Post | Method::Patch) {
            let mut buf = String::new();
            let _ = request.as_reader().read_to_string(&mut buf);
            Some(buf)
        } else {
            None
        };

        let response = match dispatch(runtime, &method, &url, body.as_deref()) {
            Ok(resp) => resp,
            Err(e) => error_response(500, &format!("{e:#}")),
        };
        let status = response.status_code().0;
        let _ = request.respond(response);

        // Brief access log
        println!(
            "{} {} {} {}",
            method,
            url,
            status,
            chrono::Local::now().format("%H:%M:%S")
        );
        Flow::Continue
    }

    fn render(&mut self, _app: &App<S>) {}
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Dispatch an incoming request to the appropriate handler.
pub(crate) fn dispatch<S: KvStore>(
    runtime: &mut Runtime<S, Request>,
    method: &Method,
    url: &str,
    body: Option<&str>,
) -> Result<HttpResponse> {
    // Strip query string for path matching
    let path = url.split('?').next().unwrap_or(url);
    let body = body.unwrap_or("{}");

    match (method, path) {
        // Frontend
        (&Method::Get, "/") | (&Method::Get, "/index.html") => Ok(serve_frontend()),

        // API: dashboard
        (&Method::Get, "/api/dashboard") => api::get_dashboard(runtime.app()),
        (&Method::Get, "/api/articles") => api::get_articles(runtime.app()),
        (&Method::Post, "/api/cooked") => api::post_cooked(runtime.app_mut(), body),
        (&Method::Post, "/api/refresh") => api::post_refresh(runtime),
        (&Method::Post, "/api/auto-refresh") => api::post_auto_refresh(runtime.app_mut()),
        (&Method::Post, "/api/view") => api::post_view(runtime.app_mut(), body),

        // API: configuration
        (&Method::Get, "/api/configuration") => api::get_configuration(runtime.app()),
        (&Method::Put, "/api/configuration") => api::put_configuration(runtime, body),

        // 404
        _ => Ok(error_response(404, "not found")),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// Serve the embedded single-page frontend.
fn serve_frontend() -> HttpResponse {
    let html = frontend::INDEX_HTML;
    Response::from_data(html.as_bytes().to_vec())
        .with_header(content_type_html())
        .with_status_code(StatusCode(200))
}

/// JSON `{"error": ...}` response with the given status.
pub(crate) fn error_response(status: u16, message: &str) -> HttpResponse {
    let body = serde_json::json!({ "error": message }).to_string();
    Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(status))
}

/// JSON content type header.
pub(crate) fn content_type_json() -> Header {
    Header::from_bytes("Content-Type", "application/json; charset=utf-8")
        .expect("static header is valid")
}

/// HTML content type header.
fn content_type_html() -> Header {
    Header::from_bytes("Content-Type", "text/html; charset=utf-8").expect("static header is valid")
}

/// Attempt to open a URL in the system default browser.
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    Ok(())
}
