/// No-cache preview server.
///
/// `/` answers with the compiled story HTML; every other path is looked up
/// in the static folder. Every response carries headers that stop the
/// browser from caching, so a reload always shows the latest build.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Result};
use sugarweave_compiler::Config;
use tiny_http::{Header, Response, Server};

const NO_CACHE_HEADERS: [(&str, &str); 4] = [
    ("Surrogate-Control", "no-store"),
    (
        "Cache-Control",
        "no-store, no-cache, must-revalidate, proxy-revalidate",
    ),
    ("Pragma", "no-cache"),
    ("Expires", "0"),
];

/// What to send back for one request.
#[derive(Debug, PartialEq)]
pub enum Reply {
    File { path: PathBuf, mime: &'static str },
    Text { status: u16, body: String },
}

/// Serve forever on the configured host and port.
pub fn serve(config: &Config) -> Result<()> {
    let address = format!("{}:{}", config.server.host, config.server.port);
    let server = Server::http(&address).map_err(|e| anyhow!("failed to bind {}: {}", address, e))?;
    tracing::info!("serving on http://{}", address);

    for request in server.incoming_requests() {
        let reply = resolve(config, request.url());
        tracing::debug!("{} -> {:?}", request.url(), reply);

        let response = match reply {
            Reply::File { path, mime } => match fs::read(&path) {
                Ok(content) => with_header(Response::from_data(content), "Content-Type", mime),
                Err(e) => {
                    tracing::warn!("failed to read {}: {}", path.display(), e);
                    Response::from_data(b"Read error".to_vec()).with_status_code(500)
                }
            },
            Reply::Text { status, body } => with_header(
                Response::from_data(body.into_bytes()).with_status_code(status),
                "Content-Type",
                "text/plain; charset=utf-8",
            ),
        };

        let response = NO_CACHE_HEADERS
            .iter()
            .fold(response, |response, (name, value)| with_header(response, name, value));
        if let Err(e) = request.respond(response) {
            tracing::warn!("failed to respond: {}", e);
        }
    }
    Ok(())
}

fn with_header<R: std::io::Read>(response: Response<R>, name: &str, value: &str) -> Response<R> {
    match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

/// Map a request URL to a reply without touching the network.
pub fn resolve(config: &Config, url: &str) -> Reply {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    if path.is_empty() || path == "/" {
        if config.output_html_path.is_file() {
            return Reply::File {
                path: config.output_html_path.clone(),
                mime: "text/html; charset=utf-8",
            };
        }
        return Reply::Text {
            status: 200,
            body: "no html file found".to_string(),
        };
    }

    let relative = percent_decode(path.trim_start_matches('/'));
    let Some(file) = static_file(&config.static_path, &relative) else {
        return not_found();
    };
    if !file.is_file() {
        return not_found();
    }
    Reply::File {
        mime: mime_for(&file),
        path: file,
    }
}

fn not_found() -> Reply {
    Reply::Text {
        status: 404,
        body: "Not found".to_string(),
    }
}

/// Join `relative` onto `root`, refusing anything that could climb out.
fn static_file(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    let safe = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    safe.then(|| root.join(relative))
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js" | "mjs") => "application/javascript",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("mp3") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        Some("wav") => "audio/wav",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        _ => "application/octet-stream",
    }
}
