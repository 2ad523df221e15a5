//! Authorization URL
//!
//! Builds the OAuth dialog URL the browser is sent to.
//!
//! Query values are inserted verbatim. The redirect URI is later matched by
//! prefix against redirect targets, so it must appear exactly as the caller
//! supplied it rather than percent-encoded.

use crate::types::AuthorizationUrl;

/// Build the authorization dialog URL.
///
/// `client_id` and `redirect_uri` come first, followed by `optional_params` in
/// order. An optional parameter named `client_id` or `redirect_uri` replaces
/// the required value in place.
pub fn build_authorization_url(
    endpoint: &str,
    client_id: &str,
    redirect_uri: &str,
    optional_params: &[(String, String)],
) -> AuthorizationUrl {
    let mut params: Vec<(&str, &str)> =
        vec![("client_id", client_id), ("redirect_uri", redirect_uri)];

    for (key, value) in optional_params {
        match params.iter_mut().find(|(k, _)| *k == key.as_str()) {
            Some(existing) => existing.1 = value.as_str(),
            None => params.push((key.as_str(), value.as_str())),
        }
    }

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    AuthorizationUrl::new(format!("{}?{}", endpoint, query))
}
