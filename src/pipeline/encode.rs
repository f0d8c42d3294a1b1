//! Request encoding: [`DocumentSource`] → analyze request body.
//!
//! The REST API takes the document inline as standard (padded) base64 in
//! `base64Source`, or as a URL in `urlSource`. Exactly one is set.

use crate::pipeline::input::DocumentSource;
use crate::pipeline::wire::AnalyzeRequest;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Build the JSON body for an analyze call.
pub fn encode_request(source: &DocumentSource) -> AnalyzeRequest {
    match source {
        DocumentSource::Bytes { data, .. } => {
            let b64 = STANDARD.encode(data);
            debug!("Encoded {} bytes → {} bytes base64", data.len(), b64.len());
            AnalyzeRequest {
                base64_source: Some(b64),
                url_source: None,
            }
        }
        DocumentSource::Url(url) => AnalyzeRequest {
            base64_source: None,
            url_source: Some(url.clone()),
        },
    }
}
