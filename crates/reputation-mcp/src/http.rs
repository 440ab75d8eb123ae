/// Browser-facing form: enter a business name, get the verdict and score breakdown back.
///
/// `GET /` renders the empty form, `POST /` runs one analysis and renders the result below
/// the form. Rendering works on the same response type the MCP tool returns.
use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Router,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{info, warn};

use reputation_common::api::{to_api_response, ReputationResponse};

use crate::error::AppError;
use crate::server::ReputationServer;

#[derive(Debug, Deserialize)]
pub struct AnalyzeForm {
    pub subject: String,
}

pub fn router(server: ReputationServer) -> Router {
    Router::new()
        .route("/", get(form_page).post(analyze_form))
        .with_state(server)
}

pub async fn serve(server: ReputationServer, addr: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(listen_addr = %addr, "HTTP form ready");
    axum::serve(listener, router(server)).await?;
    Ok(())
}

async fn form_page() -> Html<String> {
    Html(render_page("", None, None))
}

async fn analyze_form(
    State(server): State<ReputationServer>,
    Form(form): Form<AnalyzeForm>,
) -> (StatusCode, Html<String>) {
    match server.analyze(&form.subject).await {
        Ok(report) => {
            let response = to_api_response(&report, true);
            (
                StatusCode::OK,
                Html(render_page(&form.subject, Some(&response), None)),
            )
        }
        Err(e) => {
            warn!(error = %e, subject = %form.subject, "form analysis failed");
            let status = match e {
                AppError::Subject(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            };
            (
                status,
                Html(render_page(&form.subject, None, Some(&e.to_string()))),
            )
        }
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn render_page(subject: &str, result: Option<&ReputationResponse>, error: Option<&str>) -> String {
    let mut body = format!(
        r#"<h1>Review reputation</h1>
<form method="post" action="/">
  <label for="subject">Business</label>
  <input id="subject" name="subject" value="{}" placeholder="amazon.com" required>
  <button type="submit">Analyze</button>
</form>
"#,
        escape_html(subject)
    );

    if let Some(message) = error {
        body.push_str(&format!(
            "<p class=\"error\">{}</p>\n",
            escape_html(message)
        ));
    }
    if let Some(result) = result {
        body.push_str(&render_result(result));
    }

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Review reputation</title>
<style>
body {{ font-family: sans-serif; max-width: 52rem; margin: 2rem auto; }}
.bar {{ background: #4a7bd0; height: 0.9rem; }}
.error {{ color: #b00020; }}
td {{ padding: 0.1rem 0.5rem; }}
</style>
</head>
<body>
{body}</body>
</html>
"#
    )
}

fn render_result(r: &ReputationResponse) -> String {
    let mut html = format!(
        "<h2>{}: {}</h2>\n<p>Mean score {:.4} over {} reviews (scroll: {}, {} scrolls).</p>\n",
        escape_html(&r.subject),
        escape_html(&r.reputation),
        r.mean_score,
        r.review_count,
        escape_html(&r.scroll.state),
        r.scroll.scrolls,
    );

    if r.no_reviews {
        html.push_str("<p>No meaningful reviews found for this business.</p>\n");
        return html;
    }
    if r.truncated {
        html.push_str("<p>The review list was cut short by a page error; results cover what was read.</p>\n");
    }

    html.push_str("<h3>Categories</h3>\n<table>\n");
    for (label, count, pct) in [
        ("Positive", r.counts.positive, r.distribution.positive_pct),
        ("Neutral", r.counts.neutral, r.distribution.neutral_pct),
        ("Negative", r.counts.negative, r.distribution.negative_pct),
    ] {
        html.push_str(&format!(
            "<tr><td>{label}</td><td>{count}</td><td>{pct:.1}%</td>\
<td><div class=\"bar\" style=\"width:{pct:.1}%\"></div></td></tr>\n"
        ));
    }
    html.push_str("</table>\n");

    let peak = r
        .distribution
        .bins
        .iter()
        .map(|b| b.count)
        .max()
        .unwrap_or(0)
        .max(1);
    html.push_str("<h3>Score distribution</h3>\n<table>\n");
    for bin in &r.distribution.bins {
        let width = bin.count as f64 * 100.0 / peak as f64;
        html.push_str(&format!(
            "<tr><td>{:+.1} to {:+.1}</td><td>{}</td>\
<td style=\"width:20rem\"><div class=\"bar\" style=\"width:{width:.1}%\"></div></td></tr>\n",
            bin.lower, bin.upper, bin.count
        ));
    }
    html.push_str("</table>\n");

    if let Some(reviews) = &r.reviews {
        html.push_str("<h3>Reviews</h3>\n<ol>\n");
        let scored = reviews.len() == r.scores.len();
        for (i, text) in reviews.iter().enumerate() {
            if scored {
                html.push_str(&format!(
                    "<li>{} <small>({:+.3})</small></li>\n",
                    escape_html(text),
                    r.scores[i]
                ));
            } else {
                html.push_str(&format!("<li>{}</li>\n", escape_html(text)));
            }
        }
        html.push_str("</ol>\n");
    }

    html
}
