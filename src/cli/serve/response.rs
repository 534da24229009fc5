//! HTTP response handlers.

use std::borrow::Cow;
use std::io::Write;
use std::path::Path;

use anyhow::{Result, anyhow};
use flate2::Compression;
use flate2::write::GzEncoder;
use tiny_http::{Header, Method, Request, Response, StatusCode};

use crate::output::{Artifact, ArtifactRole};
use crate::utils::mime::{self, types::PLAIN};

/// Bodies smaller than this are not worth compressing.
const MIN_GZIP_BYTES: usize = 1024;

/// Per-request serving options.
#[derive(Debug, Clone, Copy)]
pub(super) struct Delivery {
    /// Live update channel port, injected into the entry document.
    pub ws_port: Option<u16>,
    pub compress: bool,
}

/// Respond with an artifact of the live set.
pub(super) fn respond_artifact(
    request: Request,
    artifact: &Artifact,
    status: u16,
    delivery: Delivery,
) -> Result<()> {
    let content_type = mime::from_path(Path::new(&artifact.meta.output_path));

    if is_head_request(&request) {
        let response = Response::empty(StatusCode(status))
            .with_header(header("Content-Type", content_type)?)
            .with_header(header("Cache-Control", "no-cache")?);
        request.respond(response)?;
        return Ok(());
    }

    let body = document_body(artifact, delivery.ws_port);
    let gzip = delivery.compress
        && body.len() >= MIN_GZIP_BYTES
        && mime::is_compressible(content_type)
        && accepts_gzip(&request);

    let mut response = if gzip {
        Response::from_data(gzip_bytes(&body)?)
            .with_header(header("Content-Encoding", "gzip")?)
            .with_header(header("Vary", "Accept-Encoding")?)
    } else {
        Response::from_data(body.into_owned())
    };
    response = response
        .with_status_code(StatusCode(status))
        .with_header(header("Content-Type", content_type)?)
        .with_header(header("Cache-Control", "no-cache")?);
    request.respond(response)?;
    Ok(())
}

/// Entry document with the live update client, everything else untouched.
pub(super) fn document_body(artifact: &Artifact, ws_port: Option<u16>) -> Cow<'_, [u8]> {
    match (artifact.meta.role, ws_port) {
        (ArtifactRole::Document, Some(port)) => Cow::Owned(crate::utils::html::inject_before(
            &artifact.bytes,
            "</body>",
            &crate::embed::serve::hotreload_tag(port),
        )),
        _ => Cow::Borrowed(&artifact.bytes[..]),
    }
}

pub(super) fn respond_not_found(request: Request) -> Result<()> {
    send_plain(request, 404, "404 Not Found")
}

/// Nothing to serve yet (first build still running or failed), or shutting down.
pub(super) fn respond_unavailable(request: Request) -> Result<()> {
    let response = Response::from_string("503 Service Unavailable: build in progress")
        .with_status_code(StatusCode(503))
        .with_header(header("Content-Type", PLAIN)?)
        .with_header(header("Retry-After", "1")?);
    request.respond(response)?;
    Ok(())
}

pub(super) fn respond_method_not_allowed(request: Request) -> Result<()> {
    let response = Response::from_string("405 Method Not Allowed")
        .with_status_code(StatusCode(405))
        .with_header(header("Content-Type", PLAIN)?)
        .with_header(header("Allow", "GET, HEAD")?);
    request.respond(response)?;
    Ok(())
}

pub(super) fn is_read_request(request: &Request) -> bool {
    matches!(request.method(), Method::Get | Method::Head)
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn accepts_gzip(request: &Request) -> bool {
    request
        .headers()
        .iter()
        .filter(|h| h.field.equiv("Accept-Encoding"))
        .any(|h| accepts_gzip_value(h.value.as_str()))
}

/// Whether an `Accept-Encoding` value allows gzip (`q=0` refuses it).
pub(super) fn accepts_gzip_value(value: &str) -> bool {
    value.split(',').any(|part| {
        let mut params = part.split(';').map(str::trim);
        let coding = params.next().unwrap_or("");
        let refused = params.any(|p| {
            p.strip_prefix("q=")
                .and_then(|q| q.parse::<f32>().ok())
                .is_some_and(|q| q == 0.0)
        });
        (coding.eq_ignore_ascii_case("gzip") || coding == "*") && !refused
    })
}

fn gzip_bytes(body: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 3), Compression::fast());
    encoder.write_all(body)?;
    encoder.finish()
}

fn send_plain(request: Request, status: u16, body: &str) -> Result<()> {
    let response = Response::from_string(body)
        .with_status_code(StatusCode(status))
        .with_header(header("Content-Type", PLAIN)?);
    request.respond(response)?;
    Ok(())
}

fn header(key: &str, value: &str) -> Result<Header> {
    Header::from_bytes(key, value).map_err(|()| anyhow!("invalid header `{key}: {value}`"))
}
