//! `GET /?ref=<token>&downloadas=<name>`
//!
//! Resolves the token, commits the response headers and streams the archive
//! as the body while it is being built. The builder runs in its own task and
//! writes into an in-process pipe whose read half is the body, so the client
//! connection provides the backpressure.

use std::time::Instant;

use axum::body::Body;
use axum::extract::{RawQuery, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use common::archive::ArchiveError;
use common::manifest::Manifest;
use common::resolver::ResolveError;
use common::sanitize::{sanitize_or, ARCHIVE_NAME_FALLBACK};
use futures::StreamExt;
use tokio::sync::oneshot;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

use crate::ServiceState;

pub const USAGE: &str = "S3 File Zipper. Pass ?ref= to use.";
pub const ACCESS_DENIED: &str = "Access Denied (sorry your link has timed out)";
pub const HEALTH_OK: &str = "OK";
const ZIP_CONTENT_TYPE: &str = "application/zip";

/// Query parameters, first occurrence wins.
#[derive(Debug, Default, PartialEq)]
pub struct DownloadParams {
    pub reference: Option<String>,
    pub download_as: Option<String>,
    pub health: bool,
}

impl DownloadParams {
    pub fn parse(query: Option<&str>) -> Self {
        let mut params = Self::default();
        let Some(query) = query else {
            return params;
        };
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "ref" if params.reference.is_none() => params.reference = Some(value.into_owned()),
                "downloadas" if params.download_as.is_none() => {
                    params.download_as = Some(value.into_owned())
                }
                "health" => params.health = true,
                _ => {}
            }
        }
        params
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("missing ref parameter")]
    MissingRef,
    #[error("could not resolve ref: {0}")]
    AccessDenied(#[from] ResolveError),
}

impl IntoResponse for DownloadError {
    fn into_response(self) -> Response {
        match self {
            DownloadError::MissingRef => {
                (StatusCode::BAD_REQUEST, [(CONTENT_TYPE, "text/plain")], USAGE).into_response()
            }
            // Every resolution failure looks the same from outside
            DownloadError::AccessDenied(_) => (
                StatusCode::FORBIDDEN,
                [(CONTENT_TYPE, "text/plain")],
                ACCESS_DENIED,
            )
                .into_response(),
        }
    }
}

pub async fn handler(
    State(state): State<ServiceState>,
    RawQuery(query): RawQuery,
) -> Result<Response, DownloadError> {
    let params = DownloadParams::parse(query.as_deref());
    if params.health {
        return Ok((StatusCode::OK, HEALTH_OK).into_response());
    }

    let reference = params
        .reference
        .filter(|r| !r.is_empty())
        .ok_or(DownloadError::MissingRef)?;

    let started = Instant::now();
    let manifest = match state.resolver().resolve(&reference).await {
        Ok(manifest) => manifest,
        Err(e) => {
            tracing::warn!(token = %reference, error = %e, "denying download");
            return Err(e.into());
        }
    };
    tracing::info!(token = %reference, entries = manifest.len(), "streaming archive");

    let file_name = sanitize_or(
        params.download_as.as_deref().unwrap_or_default(),
        ARCHIVE_NAME_FALLBACK,
    );
    let body = stream_archive(state, manifest, reference, started);

    Ok((
        StatusCode::OK,
        [
            (CONTENT_DISPOSITION, content_disposition(&file_name)),
            (CONTENT_TYPE, HeaderValue::from_static(ZIP_CONTENT_TYPE)),
        ],
        body,
    )
        .into_response())
}

/// `attachment; filename="<name>"`, falling back to the default name when
/// the sanitized name still cannot be carried in a header.
pub fn content_disposition(file_name: &str) -> HeaderValue {
    let value = format!("attachment; filename=\"{}\"", file_name);
    HeaderValue::from_str(&value)
        .or_else(|_| HeaderValue::from_bytes(value.as_bytes()))
        .unwrap_or_else(|_| {
            HeaderValue::from_static("attachment; filename=\"download.zip\"")
        })
}

/// Spawn the archive build and return the body reading from it.
///
/// Dropping the body (client gone) cancels the build. A build that fails
/// after headers went out ends the body with an error, so the client sees a
/// broken transfer rather than a short archive.
fn stream_archive(
    state: ServiceState,
    manifest: Manifest,
    reference: String,
    started: Instant,
) -> Body {
    let builder = state.archive().clone();
    let (writer, reader) = tokio::io::duplex(builder.config().pipe_capacity.max(1));
    let cancel = CancellationToken::new();
    let (done_tx, done_rx) = oneshot::channel::<bool>();

    let build_cancel = cancel.clone();
    tokio::spawn(async move {
        let ok = match builder.build(&manifest, writer, &build_cancel).await {
            Ok(summary) => {
                tracing::info!(
                    token = %reference,
                    included = summary.included(),
                    skipped = summary.skipped(),
                    bytes = summary.bytes(),
                    "archive complete"
                );
                tracing::debug!(token = %reference, elapsed = ?started.elapsed(), "request finished");
                true
            }
            Err(ArchiveError::Cancelled) => {
                tracing::info!(token = %reference, elapsed = ?started.elapsed(), "client went away");
                false
            }
            Err(e) => {
                tracing::warn!(token = %reference, error = %e, "archive failed");
                false
            }
        };
        let _ = done_tx.send(ok);
    });

    let guard = cancel.drop_guard();
    let data = ReaderStream::new(reader).map(move |chunk| {
        let _alive = &guard;
        chunk
    });
    let outcome = futures::stream::once(async move {
        match done_rx.await {
            Ok(true) => None,
            _ => Some(Err(std::io::Error::other("archive incomplete"))),
        }
    })
    .filter_map(futures::future::ready);

    Body::from_stream(data.chain(outcome))
}
