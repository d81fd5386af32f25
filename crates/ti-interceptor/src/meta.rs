//! Wire payloads and headers for the collector POSTs (spec.md §4.G/§6).

use serde::Serialize;

use ti_common::{Result, TiError};

use crate::context::InterceptorContext;
use crate::mirror::{CollectorResponse, MirrorClient};

#[derive(Serialize)]
struct RequestDescriptor<'a> {
    url: &'a str,
    headers: &'a [(String, String)],
}

#[derive(Serialize)]
struct ResponseDescriptorFull<'a> {
    code: u16,
    headers: &'a [(String, String)],
    #[serde(rename = "bodyHash")]
    body_hash: String,
    #[serde(rename = "bodySize")]
    body_size: u64,
}

#[derive(Serialize)]
struct MetaPayload<'a> {
    timestamp: i64,
    request: RequestDescriptor<'a>,
    response: ResponseDescriptorFull<'a>,
}

fn content_length_header(headers: &[(String, String)]) -> Option<u64> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<u64>().ok())
}

fn content_type_header(headers: &[(String, String)]) -> String {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
        .map(|(_, v)| v.clone())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Headers for the streaming body POST (spec.md §4.G "MirrorBody headers").
pub fn mirror_body_headers(ctx: &InterceptorContext) -> Vec<(String, String)> {
    let content_length = content_length_header(&ctx.response.headers).unwrap_or(0);
    let x_request_data = serde_json::to_string(&RequestDescriptor {
        url: &ctx.request.url,
        headers: &ctx.request.headers,
    })
    .unwrap_or_else(|_| "{}".to_string());
    let x_response_data = serde_json::json!({ "headers": ctx.response.headers }).to_string();

    vec![
        ("content-type".to_string(), content_type_header(&ctx.response.headers)),
        ("content-length".to_string(), content_length.to_string()),
        ("x-labels".to_string(), labels_json(ctx)),
        ("x-request-data".to_string(), x_request_data),
        ("x-response-data".to_string(), x_response_data),
    ]
}

fn labels_json(ctx: &InterceptorContext) -> String {
    serde_json::to_string(&ctx.labels).unwrap_or_else(|_| "{}".to_string())
}

/// Build and send the post-stream metadata POST (spec.md §4.G transition 4).
/// Called once `response.hash` has been finalized from the streaming hasher.
pub async fn send_meta(mirror: &MirrorClient, ctx: &InterceptorContext) -> Result<CollectorResponse> {
    let body_hash = ctx.response.hash.unwrap_or(0);
    let body_size = ctx
        .response
        .content_length
        .or_else(|| content_length_header(&ctx.response.headers))
        .unwrap_or(0);

    let payload = MetaPayload {
        timestamp: ctx.request.timestamp,
        request: RequestDescriptor {
            url: &ctx.request.url,
            headers: &ctx.request.headers,
        },
        response: ResponseDescriptorFull {
            code: ctx.response.status_code,
            headers: &ctx.response.headers,
            body_hash: body_hash.to_string(),
            body_size,
        },
    };

    let json_body = serde_json::to_vec(&payload)?;
    let headers = vec![
        ("content-type".to_string(), "application/json".to_string()),
        ("x-labels".to_string(), labels_json(ctx)),
    ];

    mirror.post_meta(headers, json_body).await.map_err(TiError::from)
}
