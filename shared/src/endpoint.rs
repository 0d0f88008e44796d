//! Backend endpoint normalization

use url::Url;

use crate::errors::{SharedError, SharedResult};

/// Reduce a configured backend URL to the origin the pub/sub client talks to.
///
/// `ws://` and `wss://` map to `http://` and `https://`; any path, query or
/// fragment is dropped since the client always uses `/socket.io/`.
pub fn derive_base_url(input: &str) -> SharedResult<Url> {
    let parsed = Url::parse(input.trim()).map_err(|_| SharedError::InvalidEndpoint {
        input: input.to_string(),
    })?;

    let scheme = match parsed.scheme() {
        "ws" | "http" => "http",
        "wss" | "https" => "https",
        _ => {
            return Err(SharedError::InvalidEndpoint {
                input: input.to_string(),
            })
        }
    };

    let host = parsed.host_str().ok_or_else(|| SharedError::InvalidEndpoint {
        input: input.to_string(),
    })?;

    let origin = match parsed.port() {
        Some(port) => format!("{scheme}://{host}:{port}/"),
        None => format!("{scheme}://{host}/"),
    };

    Url::parse(&origin).map_err(|_| SharedError::InvalidEndpoint {
        input: input.to_string(),
    })
}
