use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder, StatusCode, header};
use tracing::{debug, warn};
use url::Url;

use crate::error::WhepClientError;

/// Result of the offer fetch: the remote SDP offer body and the session
/// resource URL from the `Location` header.
#[derive(Debug)]
pub struct SdpOffer {
    pub offer: String,
    pub session_url: Url,
}

/// HTTP side of the WHEP exchange. Each operation runs exactly once per
/// session; any failure is fatal, there are no retries.
#[derive(Debug)]
pub struct WhepHttpClient {
    client: Client,
    endpoint_url: Url,
    bearer_token: Option<Arc<str>>,
}

impl WhepHttpClient {
    pub fn new(
        endpoint_url: &str,
        bearer_token: &Option<Arc<str>>,
    ) -> Result<Self, WhepClientError> {
        let endpoint_url = Url::parse(endpoint_url)
            .map_err(|err| WhepClientError::InvalidEndpointUrl(err, endpoint_url.to_string()))?;
        Ok(Self {
            client: Client::new(),
            endpoint_url,
            bearer_token: bearer_token.clone(),
        })
    }

    pub fn endpoint_url(&self) -> &Url {
        &self.endpoint_url
    }

    /// POST with an empty body; the server responds with its SDP offer
    /// and assigns the session resource in the `Location` header. Both
    /// are required on success.
    pub async fn fetch_offer(&self) -> Result<SdpOffer, WhepClientError> {
        let request = self
            .client
            .post(self.endpoint_url.clone())
            .header(header::CONTENT_TYPE, "application/sdp")
            .body("");
        let response = self
            .with_auth(request)
            .send()
            .await
            .map_err(|err| {
                WhepClientError::RequestFailed(Method::POST, self.endpoint_url.clone(), err)
            })?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            return Err(bad_status(Method::POST, response).await);
        }

        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(WhepClientError::MissingLocationHeader)?
            .to_string();
        // the session resource URL may be relative to the endpoint
        let session_url = self
            .endpoint_url
            .join(&location)
            .map_err(|err| WhepClientError::InvalidLocationHeader(err, location))?;

        let offer = response
            .text()
            .await
            .map_err(|err| WhepClientError::BodyReadError("offer", err))?;
        debug!("SDP offer: {offer}");

        Ok(SdpOffer { offer, session_url })
    }

    /// PATCH the local SDP answer to the session resource. The server
    /// must acknowledge with 204 No Content.
    pub async fn submit_answer(
        &self,
        session_url: &Url,
        answer: &str,
    ) -> Result<(), WhepClientError> {
        let request = self
            .client
            .patch(session_url.clone())
            .header(header::CONTENT_TYPE, "application/sdp")
            .body(answer.to_string());
        let response = self.with_auth(request).send().await.map_err(|err| {
            WhepClientError::RequestFailed(Method::PATCH, session_url.clone(), err)
        })?;

        if response.status() != StatusCode::NO_CONTENT {
            return Err(bad_status(Method::PATCH, response).await);
        }
        Ok(())
    }

    /// Best-effort teardown of the session resource. Never fatal.
    pub async fn delete_session(&self, session_url: &Url) {
        let request = self.with_auth(self.client.delete(session_url.clone()));
        match request.send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Deleted session resource {session_url}");
            }
            Ok(response) => {
                warn!(status = %response.status(), "Failed to delete the session resource");
            }
            Err(err) => {
                warn!(%err, "Failed to delete the session resource");
            }
        }
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

async fn bad_status(method: Method, response: reqwest::Response) -> WhepClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    WhepClientError::BadStatus {
        method,
        status,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    use axum::{
        Router,
        extract::State,
        http::{HeaderMap, StatusCode, header},
        routing::{delete, patch, post},
    };
    use std::sync::Mutex;

    const OFFER_BODY: &str = "v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n";

    async fn start_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn fetch_offer_returns_body_and_location() {
        let app = Router::new().route(
            "/whep",
            post(|| async {
                (
                    StatusCode::CREATED,
                    [(header::LOCATION, "/whep/session/42")],
                    OFFER_BODY,
                )
            }),
        );
        let base = start_server(app).await;

        let client = WhepHttpClient::new(&format!("{base}/whep"), &None).unwrap();
        let SdpOffer { offer, session_url } = client.fetch_offer().await.unwrap();

        assert_eq!(offer, OFFER_BODY);
        assert_eq!(session_url.as_str(), format!("{base}/whep/session/42"));
    }

    #[tokio::test]
    async fn fetch_offer_resolves_absolute_location() {
        let app = Router::new().route(
            "/whep",
            post(|| async {
                (
                    StatusCode::OK,
                    [(header::LOCATION, "http://other.example/session/7")],
                    OFFER_BODY,
                )
            }),
        );
        let base = start_server(app).await;

        let client = WhepHttpClient::new(&format!("{base}/whep"), &None).unwrap();
        let SdpOffer { session_url, .. } = client.fetch_offer().await.unwrap();
        assert_eq!(session_url.as_str(), "http://other.example/session/7");
    }

    #[tokio::test]
    async fn fetch_offer_rejects_bad_status() {
        let app = Router::new().route(
            "/whep",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "server exploded") }),
        );
        let base = start_server(app).await;

        let client = WhepHttpClient::new(&format!("{base}/whep"), &None).unwrap();
        let err = client.fetch_offer().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        match err {
            WhepClientError::BadStatus { status, body, .. } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "server exploded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_offer_requires_location_header() {
        let app = Router::new().route("/whep", post(|| async { (StatusCode::CREATED, OFFER_BODY) }));
        let base = start_server(app).await;

        let client = WhepHttpClient::new(&format!("{base}/whep"), &None).unwrap();
        let err = client.fetch_offer().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(matches!(err, WhepClientError::MissingLocationHeader));
    }

    #[tokio::test]
    async fn fetch_offer_sends_bearer_token() {
        async fn handler(headers: HeaderMap) -> (StatusCode, [(header::HeaderName, &'static str); 1], &'static str)
        {
            let authorized = headers
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                == Some("Bearer secret");
            let status = if authorized {
                StatusCode::CREATED
            } else {
                StatusCode::UNAUTHORIZED
            };
            (status, [(header::LOCATION, "/whep/session/42")], OFFER_BODY)
        }
        let app = Router::new().route("/whep", post(handler));
        let base = start_server(app).await;

        let token = Some(Arc::from("secret"));
        let client = WhepHttpClient::new(&format!("{base}/whep"), &token).unwrap();
        assert!(client.fetch_offer().await.is_ok());
    }

    #[tokio::test]
    async fn submit_answer_expects_no_content() {
        async fn handler(headers: HeaderMap, body: String) -> StatusCode {
            let sdp_content_type = headers
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                == Some("application/sdp");
            if sdp_content_type && body == "answer-sdp" {
                StatusCode::NO_CONTENT
            } else {
                StatusCode::BAD_REQUEST
            }
        }
        let app = Router::new().route("/whep/session/42", patch(handler));
        let base = start_server(app).await;

        let client = WhepHttpClient::new(&format!("{base}/whep"), &None).unwrap();
        let session_url = Url::parse(&format!("{base}/whep/session/42")).unwrap();
        assert!(client.submit_answer(&session_url, "answer-sdp").await.is_ok());
    }

    #[tokio::test]
    async fn submit_answer_rejects_bad_status() {
        let app = Router::new().route(
            "/whep/session/42",
            patch(|| async { StatusCode::FORBIDDEN }),
        );
        let base = start_server(app).await;

        let client = WhepHttpClient::new(&format!("{base}/whep"), &None).unwrap();
        let session_url = Url::parse(&format!("{base}/whep/session/42")).unwrap();
        let err = client
            .submit_answer(&session_url, "answer-sdp")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        match err {
            WhepClientError::BadStatus { status, .. } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_session_is_best_effort() {
        #[derive(Clone, Default)]
        struct Deleted(Arc<Mutex<bool>>);

        async fn handler(State(state): State<Deleted>) -> StatusCode {
            *state.0.lock().unwrap() = true;
            StatusCode::OK
        }

        let deleted = Deleted::default();
        let app = Router::new()
            .route("/whep/session/42", delete(handler))
            .with_state(deleted.clone());
        let base = start_server(app).await;

        let client = WhepHttpClient::new(&format!("{base}/whep"), &None).unwrap();
        let session_url = Url::parse(&format!("{base}/whep/session/42")).unwrap();
        client.delete_session(&session_url).await;

        assert!(*deleted.0.lock().unwrap());
    }

    #[test]
    fn rejects_invalid_endpoint_url() {
        let err = WhepHttpClient::new("not a url", &None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }
}
