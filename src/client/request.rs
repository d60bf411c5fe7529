use std::fmt::Display;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, COOKIE};
use reqwest::multipart::Form;
use reqwest::Method;
use tracing::{debug, warn};

use super::NetClient;
use crate::error::NetError;
use crate::models::{Endpoint, SessionCookie};
use crate::store::CredentialStore;

/// Content type sent with form and empty bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; param=value";

/// What goes in the body of a single request.
pub enum RequestBody {
    Empty,
    /// An already encoded `key=value&...` string.
    Form(String),
    /// Multipart upload; reqwest sets the boundary content type.
    Multipart(Form),
}

pub(crate) fn transport_error(url: &str, err: impl Display) -> NetError {
    NetError::Transport {
        url: url.to_string(),
        message: err.to_string(),
    }
}

/// Adds the token header and the session cookie to `headers`.
async fn attach_credentials(
    store: &dyn CredentialStore,
    token_header: &HeaderName,
    headers: &mut HeaderMap,
    url: &str,
) -> Result<(), NetError> {
    let token = store.get_token().await;
    let value = HeaderValue::from_str(&token)
        .map_err(|e| transport_error(url, format!("invalid token value: {}", e)))?;
    headers.insert(token_header.clone(), value);

    if let Some(cookie) = store.get_session_cookie().await {
        match HeaderValue::from_str(&cookie.header_value()) {
            Ok(value) => {
                headers.insert(COOKIE, value);
            }
            Err(e) => warn!(url, "Skipping unusable session cookie: {}", e),
        }
    }
    Ok(())
}

impl NetClient {
    /// Sends one request and returns the raw response body.
    ///
    /// Credential lookup and transport run in their own task, raced against
    /// the client's deadline. When the deadline wins the task is aborted and
    /// `NetError::Timeout` is returned, whatever the transport timeout says.
    pub(crate) async fn do_request(
        &self,
        method: Method,
        endpoint: &Endpoint,
        body: RequestBody,
    ) -> Result<Vec<u8>, NetError> {
        let url = endpoint.url.clone();
        let mut headers = HeaderMap::new();
        if !matches!(body, RequestBody::Multipart(_)) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        }
        // Configured headers replace the defaults above.
        for (name, value) in self.default_headers.iter() {
            headers.insert(name.clone(), value.clone());
        }

        let auth = endpoint.auth;
        let http = self.http.clone();
        let store = self.store.clone();
        let token_header = self.token_header.clone();
        let task_method = method.clone();
        let task_url = url.clone();
        let mut task = tokio::spawn(async move {
            if auth {
                attach_credentials(store.as_ref(), &token_header, &mut headers, &task_url)
                    .await?;
            }

            let request = http.request(task_method, task_url.as_str()).headers(headers);
            let request = match body {
                RequestBody::Empty => request,
                RequestBody::Form(form) => request.body(form),
                RequestBody::Multipart(form) => request.multipart(form),
            };
            let response = request
                .send()
                .await
                .map_err(|e| transport_error(&task_url, e))?;

            // Public endpoints (login) hand out the session cookie.
            if !auth {
                let cookies: Vec<SessionCookie> =
                    response.cookies().map(SessionCookie::from).collect();
                if !cookies.is_empty() {
                    if let Err(e) = store.set_session_cookie(&cookies).await {
                        warn!(url = %task_url, "Failed to store session cookie: {}", e);
                    }
                }
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| transport_error(&task_url, e))?;
            Ok::<_, NetError>(bytes.to_vec())
        });

        let deadline = self.config.deadline();
        match tokio::time::timeout(deadline, &mut task).await {
            Ok(Ok(result)) => {
                debug!(app_id = %self.config.app_id, %method, url = %url, "Request completed.");
                result
            }
            Ok(Err(join_error)) => Err(transport_error(&url, join_error)),
            Err(_) => {
                task.abort();
                warn!(
                    app_id = %self.config.app_id,
                    %method,
                    url = %url,
                    deadline_ms = deadline.as_millis() as u64,
                    "Request exceeded its deadline."
                );
                Err(NetError::Timeout { url, deadline })
            }
        }
    }
}
