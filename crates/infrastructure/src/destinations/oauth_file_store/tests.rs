use actionhub_application::payload::{Attachment, PayloadStream};
use actionhub_application::{ActionPlugin, ActionRequest, OAuthAction, OAuthCredentials};
use actionhub_core::{AppError, AppResult};
use actionhub_domain::ActionType;
use bytes::Bytes;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{OAuthFileStoreConfig, OAuthFileStoreDestination};
use crate::oauth2_client::OAuth2ClientConfig;

fn parse(value: String) -> AppResult<Url> {
    Url::parse(value.as_str()).map_err(|error| AppError::Internal(error.to_string()))
}

fn destination(server: &MockServer) -> AppResult<OAuthFileStoreDestination> {
    OAuthFileStoreDestination::new(
        reqwest::Client::new(),
        OAuthFileStoreConfig {
            oauth: OAuth2ClientConfig {
                client_id: "hub".to_owned(),
                client_secret: "secret".to_owned(),
                authorize_url: parse(format!("{}/authorize", server.uri()))?,
                token_url: parse(format!("{}/token", server.uri()))?,
                scopes: vec!["files".to_owned()],
            },
            api_url: parse(format!("{}/api/", server.uri()))?,
        },
    )
}

fn authorized(access_token: &str) -> ActionRequest {
    let mut request = ActionRequest::new(ActionType::Query);
    request.oauth_credentials = Some(OAuthCredentials {
        tokens: json!({ "access_token": access_token, "refresh_token": "rt-1" }),
        redirect: "https://hub.example.com/actions/oauth_file_store/oauth/redirect".to_owned(),
    });
    request
}

async fn mount_folders(server: &MockServer, access_token: &str) {
    Mock::given(method("GET"))
        .and(path("/api/folders"))
        .and(header("authorization", format!("Bearer {access_token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "folders": [
                { "id": "f-1", "name": "Reports" },
                { "id": "f-2", "name": "Archive" }
            ]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn form_starts_with_interactive_fetch_control() -> AppResult<()> {
    let server = MockServer::start().await;
    let form = destination(&server)?.form(&authorized("at-1")).await?;

    assert_eq!(form.fields().len(), 1);
    assert!(
        form.field("fetch_folders")
            .is_some_and(|field| field.is_interactive())
    );
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
    Ok(())
}

#[tokio::test]
async fn fetched_form_lists_remote_folders() -> AppResult<()> {
    let server = MockServer::start().await;
    mount_folders(&server, "at-1").await;

    let request = authorized("at-1").with_form_param("fetch_folders", "fetch");
    let form = destination(&server)?.form(&request).await?;

    let folder = form
        .field("folder")
        .ok_or_else(|| AppError::Internal("folder field missing".to_owned()))?;
    let names: Vec<&str> = folder.options().iter().map(|option| option.label()).collect();
    assert_eq!(names, vec!["Reports", "Archive"]);
    assert!(form.field("filename").is_some_and(|field| field.is_required()));
    assert!(form.state().is_none());
    Ok(())
}

#[tokio::test]
async fn expired_token_is_refreshed_and_returned_as_state() -> AppResult<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/folders"))
        .and(header("authorization", "Bearer expired"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("refresh_token=rt-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "at-2" })))
        .expect(1)
        .mount(&server)
        .await;
    mount_folders(&server, "at-2").await;

    let request = authorized("expired").with_form_param("fetch_folders", "fetch");
    let form = destination(&server)?.form(&request).await?;

    assert_eq!(
        form.field("folder").map(|field| field.options().len()),
        Some(2)
    );
    let state = form
        .state()
        .ok_or_else(|| AppError::Internal("refreshed state missing".to_owned()))?;
    let refreshed: OAuthCredentials =
        serde_json::from_str(state).map_err(|error| AppError::Internal(error.to_string()))?;
    assert_eq!(refreshed.access_token(), Some("at-2"));
    assert_eq!(refreshed.token("refresh_token"), Some("rt-1"));
    Ok(())
}

#[tokio::test]
async fn listing_failure_yields_empty_folder_list() -> AppResult<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/folders"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let request = authorized("revoked").with_form_param("fetch_folders", "fetch");
    let form = destination(&server)?.form(&request).await?;

    assert_eq!(
        form.field("folder").map(|field| field.options().len()),
        Some(0)
    );
    Ok(())
}

#[tokio::test]
async fn upload_streams_payload_with_bearer_token() -> AppResult<()> {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/folders/f-1/files/orders.csv"))
        .and(header("authorization", "Bearer at-1"))
        .and(header("content-type", "text/csv"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let request = authorized("at-1")
        .with_form_param("folder", "f-1")
        .with_form_param("filename", "orders.csv")
        .with_attachment(
            Attachment::buffered(Bytes::from_static(b"id\n1\n")).with_mime_type("text/csv"),
        );
    let response = destination(&server)?.execute(request).await?;

    assert!(response.is_success());
    let received = server.received_requests().await.unwrap_or_default();
    assert_eq!(received[0].body, b"id\n1\n");
    Ok(())
}

#[tokio::test]
async fn upload_rejected_beyond_refresh_requires_reauthorization() -> AppResult<()> {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token revoked"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .expect(1)
        .mount(&server)
        .await;

    let request = authorized("at-1")
        .with_form_param("folder", "f-1")
        .with_form_param("filename", "orders.csv")
        .with_attachment(Attachment::buffered(Bytes::from_static(b"x")));
    let result = destination(&server)?.execute(request).await;

    assert!(matches!(result, Err(ref error) if error.requires_reauthorization()));
    Ok(())
}

#[tokio::test]
async fn expired_upload_token_is_refreshed_and_retried() -> AppResult<()> {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(header("authorization", "Bearer expired"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("refresh_token=rt-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "at-2" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/folders/f-1/files/orders.csv"))
        .and(header("authorization", "Bearer at-2"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let request = authorized("expired")
        .with_form_param("folder", "f-1")
        .with_form_param("filename", "orders.csv")
        .with_attachment(Attachment::buffered(Bytes::from_static(b"id\n1\n")));
    let response = destination(&server)?.execute(request).await?;

    assert!(response.is_success());
    let received = server.received_requests().await.unwrap_or_default();
    let uploaded = received
        .iter()
        .rev()
        .find(|request| request.method.as_str() == "PUT")
        .map(|request| request.body.clone())
        .unwrap_or_default();
    assert_eq!(uploaded, b"id\n1\n");
    Ok(())
}

#[tokio::test]
async fn streamed_upload_refreshes_before_sending() -> AppResult<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("authorization", "Bearer expired"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "at-2" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/folders/f-1/files/big.csv"))
        .and(header("authorization", "Bearer at-2"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let payload: Vec<u8> = (0..20_000_u32).map(|index| (index % 97) as u8).collect();
    let request = authorized("expired")
        .with_form_param("folder", "f-1")
        .with_form_param("filename", "big.csv")
        .with_attachment(Attachment::streaming(PayloadStream::from_bytes(
            Bytes::from(payload.clone()),
            4096,
        )));
    let response = destination(&server)?.execute(request).await?;

    assert!(response.is_success());
    let received = server.received_requests().await.unwrap_or_default();
    let puts: Vec<_> = received
        .iter()
        .filter(|request| request.method.as_str() == "PUT")
        .collect();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].body, payload);
    Ok(())
}

#[tokio::test]
async fn oauth_check_queries_account() -> AppResult<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("authorization", "Bearer at-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "u-1" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("authorization", "Bearer revoked"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let destination = destination(&server)?;
    let oauth = destination
        .as_oauth()
        .ok_or_else(|| AppError::Internal("oauth capability missing".to_owned()))?;

    oauth.oauth_check(&authorized("at-1")).await?;
    assert!(matches!(
        oauth.oauth_check(&authorized("revoked")).await,
        Err(AppError::Forbidden(_))
    ));
    Ok(())
}

#[tokio::test]
async fn oauth_url_points_at_provider() -> AppResult<()> {
    let server = MockServer::start().await;
    let destination = destination(&server)?;
    let oauth = destination
        .as_oauth()
        .ok_or_else(|| AppError::Internal("oauth capability missing".to_owned()))?;

    let url = oauth
        .oauth_url("https://hub.example.com/redirect", "sealed")
        .await?;
    assert!(url.starts_with(&format!("{}/authorize?", server.uri())));
    assert!(url.contains("state=sealed"));
    Ok(())
}
