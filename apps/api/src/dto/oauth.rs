use serde::Deserialize;

/// Query of the outbound OAuth leg.
#[derive(Debug, Deserialize)]
pub struct OAuthStartQuery {
    pub state: String,
}

/// Query the provider appends when redirecting back to the hub.
#[derive(Debug, Deserialize)]
pub struct OAuthRedirectQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}
