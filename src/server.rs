//! HTTP surface: one-shot build, SSE progress stream and generated-image lookup.

use crate::generator::Pipeline;
use crate::progress::ProgressEvent;
use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{Path as UrlPath, State},
    http::{StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::Stream;
use once_cell::sync::OnceCell;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

const PROGRESS_BUFFER: usize = 32;
const DOWNLOAD_NAME: &str = "tiktok_ai_video.mp4";

pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/generate-video", post(generate_video))
        .route("/generate-video-progress", get(generate_video_progress))
        .route("/images/{image_name}", get(get_image))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(bind_addr: &str, state: Arc<AppState>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn generate_video(State(state): State<Arc<AppState>>) -> Response {
    let video = match state.pipeline.run().await {
        Ok(path) => path,
        Err(err) => {
            warn!("generate-video failed: {}", err);
            return (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {err}")).into_response();
        }
    };

    match tokio::fs::read(&video).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "video/mp4".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{DOWNLOAD_NAME}\""),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error: cannot read {}: {err}", video.display()),
        )
            .into_response(),
    }
}

async fn generate_video_progress(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let (tx, rx) = mpsc::channel::<ProgressEvent>(PROGRESS_BUFFER);

    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        let _ = pipeline.run_with_progress(tx).await;
    });

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((Event::default().json_data(&event), rx))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn image_name_regex() -> Result<&'static Regex> {
    static NAME_RE: OnceCell<Regex> = OnceCell::new();
    NAME_RE.get_or_try_init(|| {
        Regex::new(r"(?i)^[a-z0-9_-]+\.(png|jpe?g|webp)$").context("failed to compile image name regex")
    })
}

fn image_content_type(name: &str) -> &'static str {
    match Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

fn image_not_found() -> Response {
    (StatusCode::NOT_FOUND, "Image not found").into_response()
}

async fn get_image(
    State(state): State<Arc<AppState>>,
    UrlPath(image_name): UrlPath<String>,
) -> Response {
    let valid = image_name_regex()
        .map(|re| re.is_match(&image_name))
        .unwrap_or(false);
    if !valid {
        return image_not_found();
    }

    let path = state.pipeline.images_dir().join(&image_name);
    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, image_content_type(&image_name))], bytes).into_response(),
        Err(_) => image_not_found(),
    }
}
