//! URL validation and HTTP response validation for downloads

use hotswap_errors::{Error, NetworkError};
use url::Url;

/// Validate `url` and check for supported protocols
pub(crate) fn validate_url(url: &str) -> Result<Url, Error> {
    let parsed = Url::parse(url).map_err(|e| NetworkError::MalformedSource {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" | "file" => Ok(parsed),
        scheme => Err(NetworkError::UnsupportedProtocol {
            protocol: scheme.to_string(),
        }
        .into()),
    }
}

pub(super) fn validate_response(response: &reqwest::Response) -> Result<(), Error> {
    let status = response.status();
    if !status.is_success() {
        return Err(NetworkError::HttpError {
            status: status.as_u16(),
            message: status.to_string(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotswap_errors::ErrorKind;

    #[test]
    fn test_accepts_supported_schemes() {
        for url in [
            "https://cdn.example.com/p.zip",
            "http://localhost:8080/p.zip",
            "file:///tmp/p.zip",
        ] {
            assert!(validate_url(url).is_ok(), "{url}");
        }
    }

    #[test]
    fn test_rejects_malformed_sources() {
        for url in ["", "not a url", "ftp://example.com/p.zip", "/relative/p.zip"] {
            let err = validate_url(url).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedSource, "{url}");
        }
    }
}
