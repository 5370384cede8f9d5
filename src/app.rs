use crate::catalog::{CatalogApi, CatalogClient};
use crate::view::{Card, FetchPhase, MovieListView};
use anyhow::Result;
use axum::{extract::State, response::Html, routing::get, Json, Router};
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::info;

const LISTEN_PORT: u16 = 3170;

#[derive(Clone)]
pub struct AppState {
    pub view: Arc<Mutex<MovieListView>>,
}

pub async fn run_server() -> Result<()> {
    let catalog: Arc<dyn CatalogApi> = Arc::new(CatalogClient::from_env()?);

    // Activation happens once, before the router exists; request handlers
    // only read the state it produced.
    let mut view = MovieListView::new(catalog);
    view.activate().await;

    let state = AppState {
        view: Arc::new(Mutex::new(view)),
    };
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], LISTEN_PORT));
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(popular_page))
        .route("/popular.json", get(popular_json))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn popular_page(State(state): State<AppState>) -> Html<String> {
    let view = state.view.lock().await;
    Html(render_page(&view))
}

async fn popular_json(State(state): State<AppState>) -> Json<Vec<Card>> {
    let view = state.view.lock().await;
    Json(view.cards())
}

fn render_page(view: &MovieListView) -> String {
    let mut main = String::new();
    match view.phase() {
        FetchPhase::NotStarted | FetchPhase::Loading => {
            main.push_str(r#"<p class="status">Loading popular movies…</p>"#);
        }
        // Diagnostics stay in the log; the page gets a generic note.
        FetchPhase::Failed(_) => {
            main.push_str(
                r#"<p class="status error">Couldn&#39;t load popular movies. See the server logs for details.</p>"#,
            );
        }
        FetchPhase::Loaded => {
            let cards = view.cards();
            if cards.is_empty() {
                main.push_str(r#"<p class="status">No results.</p>"#);
            } else {
                main.push_str(r#"<ul class="grid">"#);
                for card in &cards {
                    render_card(&mut main, card);
                }
                main.push_str("</ul>");
            }
        }
    }

    let footer = match view.fetched_at() {
        Some(at) => format!(
            r#"<footer class="muted">Updated {} UTC</footer>"#,
            at.format("%Y-%m-%d %H:%M")
        ),
        None => String::new(),
    };

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>marquee</title>
  <style>
    body {{ font-family: system-ui, sans-serif; max-width: 1080px; margin: 2rem auto; padding: 0 1rem; }}
    .grid {{ list-style: none; padding: 0; display: grid; grid-template-columns: repeat(auto-fill, minmax(180px, 1fr)); gap: 1rem; }}
    .card {{ border: 1px solid #ddd; border-radius: 6px; padding: 0.5rem; }}
    .card img {{ width: 100%; border-radius: 4px; }}
    .card h3 {{ font-size: 1rem; margin: 0.5rem 0 0.25rem; }}
    .date, .muted {{ color: #666; font-size: 0.9rem; margin: 0; }}
    .rating {{ font-weight: 600; margin: 0.25rem 0 0; }}
    .status {{ color: #666; }}
    .error {{ color: #b00020; }}
  </style>
</head>
<body>
  <h1>Popular movies</h1>
  {main}
  {footer}
</body>
</html>
"#
    )
}

fn render_card(out: &mut String, card: &Card) {
    out.push_str(&format!(r#"<li class="card" data-key="{}">"#, card.key));
    if let Some(url) = &card.poster_url {
        out.push_str(&format!(r#"<img src="{}" alt="">"#, escape_html(url)));
    }
    out.push_str(&format!("<h3>{}</h3>", escape_html(&card.title)));
    if !card.release_date.is_empty() {
        out.push_str(&format!(
            r#"<p class="date">{}</p>"#,
            escape_html(&card.release_date)
        ));
    }
    out.push_str(&format!(
        r#"<p class="rating">{}</p>"#,
        escape_html(&card.rating)
    ));
    out.push_str("</li>");
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
