use thiserror::Error;
use url::Url;

/// Errors that can occur while validating the backend base URL.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP pointed at a non-local host.
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    Insecure,
}

/// Validates and normalizes the backend base URL.
///
/// - Only `http` and `https` schemes are accepted.
/// - Plain `http` is allowed only for `localhost` / `127.0.0.1`, so the bearer
///   token is never sent in clear text to a remote host.
/// - The returned URL's path always ends with `/`, so endpoint segments join
///   underneath it instead of replacing the last segment.
///
/// # Examples
///
/// ```
/// use farmfeed::util::validate_base_url;
///
/// let url = validate_base_url("https://api.example.com/api").unwrap();
/// assert_eq!(url.as_str(), "https://api.example.com/api/");
///
/// assert!(validate_base_url("http://api.example.com").is_err());
/// assert!(validate_base_url("http://127.0.0.1:8080").is_ok());
/// assert!(validate_base_url("ftp://example.com").is_err());
/// ```
pub fn validate_base_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let mut url = Url::parse(url_str)?;

    match url.scheme() {
        "https" => {}
        "http" => {
            let is_local = matches!(url.host_str(), Some("localhost") | Some("127.0.0.1"));
            if !is_local {
                tracing::error!(base_url = %url, "Rejecting non-HTTPS base URL");
                return Err(UrlValidationError::Insecure);
            }
            tracing::warn!(base_url = %url, "Using non-HTTPS base URL (localhost only)");
        }
        other => return Err(UrlValidationError::UnsupportedScheme(other.to_string())),
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
