use std::fmt::Write as FmtWrite;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use assetbank::{AssetBank, BlobCodec};
use clap::Parser;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde_json::json;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

#[derive(Parser, Debug)]
#[command(
    name = "assetbank-webui",
    about = "Read-only web viewer over an asset root"
)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Asset root directory
    #[arg(short = 'r', long = "root", default_value = "assets")]
    root: PathBuf,

    /// Asset file extension used within the root
    #[arg(long = "ext", default_value = "tga")]
    extension: String,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    // The root is scanned once at startup; restart to pick up assets added
    // by other processes.
    let mut bank = AssetBank::new(&args.root, BlobCodec::new(&args.extension));
    let count = bank.initialize()?;

    let server = Server::http(&args.listen)
        .map_err(|err| anyhow!("failed to bind {}: {err}", args.listen))?;
    println!(
        "assetbank web UI serving {count} assets from {} on http://{}",
        args.root.display(),
        args.listen
    );

    for request in server.incoming_requests() {
        if let Err(err) = handle_request(&bank, request) {
            eprintln!("error handling request: {err}");
        }
    }
    Ok(())
}

fn handle_request(bank: &AssetBank<BlobCodec>, request: Request) -> Result<()> {
    if *request.method() != Method::Get {
        let response = Response::from_string("Only GET supported")
            .with_status_code(StatusCode(405))
            .with_header(content_type("text/plain"));
        request.respond(response)?;
        return Ok(());
    }

    let url = request.url();
    let (path, query) = split_query(url);
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    let response = match segments.as_slice() {
        [] | [""] => html_response(build_index_html(bank)),
        ["api", "search"] => json_response(build_search_json(bank, query)),
        ["api", "asset", id] => match id.parse::<u32>().ok().and_then(|id| bank.get(id)) {
            Some(handle) => Response::from_data(handle.clone())
                .with_header(content_type("application/octet-stream"))
                .with_status_code(StatusCode(200)),
            None => error_response(404, anyhow!("no asset with id `{id}`")),
        },
        _ => error_response(404, anyhow!("unrecognised path")),
    };

    request.respond(response)?;
    Ok(())
}

fn build_search_json(bank: &AssetBank<BlobCodec>, query: Option<&str>) -> String {
    let q = query
        .and_then(|q| query_param(q, "q"))
        .unwrap_or_default();
    let skip = query
        .and_then(|raw| query_param(raw, "skip"))
        .and_then(|v| v.parse().ok())
        .unwrap_or(0usize);
    let limit = query
        .and_then(|raw| query_param(raw, "limit"))
        .and_then(|v| v.parse().ok())
        .unwrap_or(50usize);

    let total = bank.count_matches(&q);
    let page = bank.search(&q, skip, limit);
    let results: Vec<serde_json::Value> = page
        .records
        .iter()
        .map(|record| {
            json!({
                "id": record.id,
                "tag": record.tag,
                "bytes": record.handle.len(),
                "href": format!("/api/asset/{}", record.id),
            })
        })
        .collect();

    serde_json::to_string_pretty(&json!({
        "total": total,
        "returned": page.returned(),
        "remaining": page.remaining,
        "results": results,
    }))
    .unwrap_or_else(|err| json!({ "error": err.to_string() }).to_string())
}

fn build_index_html(bank: &AssetBank<BlobCodec>) -> String {
    let mut html = String::new();
    html.push_str(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\" /><title>assetbank</title>",
    );
    html.push_str(
        "<style>body{font-family:sans-serif;margin:2rem;}table.grid{border-collapse:collapse;margin-bottom:1.5rem;}table.grid th,table.grid td{border:1px solid #ccc;padding:0.35rem 0.6rem;text-align:left;}section{margin-bottom:2rem;}code{background:#f4f4f4;padding:0.15rem 0.35rem;border-radius:4px;}</style>",
    );
    html.push_str("</head><body><h1>assetbank</h1>");

    html.push_str(render_tags_section(bank).as_str());
    html.push_str(render_assets_section(bank).as_str());

    html.push_str("</body></html>");
    html
}

fn render_tags_section(bank: &AssetBank<BlobCodec>) -> String {
    let mut out = String::new();
    out.push_str("<section><h2>Tags</h2>");
    let tags: Vec<(&str, usize)> = bank.tags().collect();
    if tags.is_empty() {
        out.push_str("<p>No tags indexed.</p></section>");
        return out;
    }
    out.push_str(
        "<table class=\"grid\"><thead><tr><th>Tag</th><th>Assets</th></tr></thead><tbody>",
    );
    for (tag, count) in tags {
        let _ = write!(
            out,
            "<tr><td><a href=\"{}\">{}</a></td><td>{}</td></tr>",
            make_search_href(tag),
            escape_html(tag),
            count
        );
    }
    out.push_str("</tbody></table></section>");
    out
}

fn render_assets_section(bank: &AssetBank<BlobCodec>) -> String {
    let mut out = String::new();
    out.push_str("<section><h2>Assets</h2>");
    if bank.is_empty() {
        out.push_str("<p>No assets loaded.</p></section>");
        return out;
    }
    out.push_str(
        "<table class=\"grid\"><thead><tr><th>ID</th><th>Tag</th><th>Bytes</th></tr></thead><tbody>",
    );
    for record in bank.records() {
        let _ = write!(
            out,
            "<tr><td><a href=\"/api/asset/{}\"><code>{}</code></a></td><td>{}</td><td>{}</td></tr>",
            record.id,
            record.id,
            escape_html(&record.tag),
            record.handle.len()
        );
    }
    out.push_str("</tbody></table></section>");
    out
}

const QUERY_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'\'')
    .add(b'`')
    .add(b'<')
    .add(b'>')
    .add(b'#')
    .add(b'&')
    .add(b'+')
    .add(b'?');

fn make_search_href(tag: &str) -> String {
    format!("/api/search?q={}", utf8_percent_encode(tag, QUERY_ENCODE))
}

fn escape_html(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '<' => "&lt;".into(),
            '>' => "&gt;".into(),
            '&' => "&amp;".into(),
            '"' => "&quot;".into(),
            '\'' => "&#39;".into(),
            _ => c.to_string(),
        })
        .collect()
}

fn html_response(body: String) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(body)
        .with_header(content_type("text/html; charset=utf-8"))
        .with_status_code(StatusCode(200))
}

fn json_response(body: String) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(body)
        .with_header(content_type("application/json"))
        .with_status_code(StatusCode(200))
}

fn error_response(status: u16, err: anyhow::Error) -> Response<std::io::Cursor<Vec<u8>>> {
    let body = json!({ "error": err.to_string() }).to_string();
    Response::from_string(body)
        .with_header(content_type("application/json"))
        .with_status_code(StatusCode(status))
}

fn content_type(value: &str) -> Header {
    Header::from_bytes(&b"Content-Type"[..], value.as_bytes()).expect("static header is valid")
}

fn split_query(url: &str) -> (&str, Option<&str>) {
    match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    }
}

fn query_param(query: &str, key: &str) -> Option<String> {
    for pair in query.split('&') {
        if let Some((name, value)) = pair.split_once('=') {
            if name == key {
                return Some(value.replace('+', " "));
            }
        }
    }
    None
}
