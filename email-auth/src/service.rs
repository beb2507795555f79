use std::cell::Cell;
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

use crate::dto::{AuthenticateEmailDto, EmailTokenDto, VerifyEmailCodeDto, VerifyEmailTokenDto};
use crate::http::{HttpClient, HttpError};
use crate::language::Language;

pub const DEFAULT_AUTHENTICATE_EMAIL_PATH: &str = "/api/{lang}/authenticateEmail";
pub const DEFAULT_VERIFY_EMAIL_TOKEN_PATH: &str = "/api/{lang}/verifyEmailToken";
pub const DEFAULT_VERIFY_EMAIL_CODE_PATH: &str = "/api/{lang}/verifyEmailCode";

#[derive(Debug, thiserror::Error)]
pub enum EmailAuthError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("response was not an email token")]
    InvalidResponse,
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Endpoint layout. Paths may contain `{lang}`, replaced by the language code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAuthConfig {
    pub base_url: String,
    pub authenticate_email_path: String,
    pub verify_email_token_path: String,
    pub verify_email_code_path: String,
    pub language: Language,
}

impl Default for EmailAuthConfig {
    fn default() -> Self {
        EmailAuthConfig {
            base_url: String::new(),
            authenticate_email_path: DEFAULT_AUTHENTICATE_EMAIL_PATH.to_string(),
            verify_email_token_path: DEFAULT_VERIFY_EMAIL_TOKEN_PATH.to_string(),
            verify_email_code_path: DEFAULT_VERIFY_EMAIL_CODE_PATH.to_string(),
            language: Language::default(),
        }
    }
}

impl EmailAuthConfig {
    pub fn endpoint(&self, template: &str, language: Language) -> String {
        let path = template.replace("{lang}", language.code());
        let base = self.base_url.trim_end_matches('/');
        if base.is_empty() {
            path
        } else if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }
}

pub struct EmailAuthHttpService {
    client: Rc<dyn HttpClient>,
    config: EmailAuthConfig,
    language: Cell<Language>,
}

impl EmailAuthHttpService {
    pub fn new(client: Rc<dyn HttpClient>, config: EmailAuthConfig) -> Self {
        let language = Cell::new(config.language);
        EmailAuthHttpService {
            client,
            config,
            language,
        }
    }

    pub fn config(&self) -> &EmailAuthConfig {
        &self.config
    }

    pub fn current_language(&self) -> Language {
        self.language.get()
    }

    pub fn set_language(&self, language: Language) {
        self.language.set(language);
    }

    /// Starts authentication for `email`; the server mails a link and a code.
    pub async fn authenticate_email_address(
        &self,
        email: &str,
        language: Option<Language>,
    ) -> Result<EmailTokenDto, EmailAuthError> {
        let url = self.url(&self.config.authenticate_email_path, language);
        let response = self.post(&url, &AuthenticateEmailDto { email }).await?;

        EmailTokenDto::parse(&response).ok_or_else(|| {
            tracing::debug!(target: "email_auth", "Unexpected response from {}: {}", url, response);
            EmailAuthError::InvalidResponse
        })
    }

    /// `Ok(None)` when the server did not answer with an email token.
    pub async fn verify_email_token(
        &self,
        email_token: &str,
        language: Option<Language>,
    ) -> Result<Option<EmailTokenDto>, EmailAuthError> {
        let url = self.url(&self.config.verify_email_token_path, language);
        let response = self.post(&url, &VerifyEmailTokenDto { email_token }).await?;
        Ok(Self::parse_optional(&url, &response))
    }

    /// `Ok(None)` when the code was rejected or the response was malformed.
    pub async fn verify_email_code(
        &self,
        token: &EmailTokenDto,
        code: &str,
        language: Option<Language>,
    ) -> Result<Option<EmailTokenDto>, EmailAuthError> {
        let url = self.url(&self.config.verify_email_code_path, language);
        let body = VerifyEmailCodeDto {
            token: token.clone(),
            code: code.to_string(),
        };
        let response = self.post(&url, &body).await?;
        Ok(Self::parse_optional(&url, &response))
    }

    fn url(&self, template: &str, language: Option<Language>) -> String {
        let language = language.unwrap_or_else(|| self.language.get());
        self.config.endpoint(template, language)
    }

    async fn post<T: Serialize>(&self, url: &str, body: &T) -> Result<Value, EmailAuthError> {
        let body = serde_json::to_value(body)?;
        tracing::trace!(target: "email_auth", "POST {}", url);
        Ok(self.client.post_json(url, &body).await?)
    }

    fn parse_optional(url: &str, response: &Value) -> Option<EmailTokenDto> {
        if response.is_null() {
            return None;
        }
        let token = EmailTokenDto::parse(response);
        if token.is_none() {
            tracing::debug!(target: "email_auth", "Unexpected response from {}: {}", url, response);
        }
        token
    }
}

impl std::fmt::Debug for EmailAuthHttpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailAuthHttpService")
            .field("config", &self.config)
            .field("language", &self.language.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct FakeHttpClient {
        requests: RefCell<Vec<(String, Value)>>,
        responses: RefCell<VecDeque<Result<Value, HttpError>>>,
    }

    impl FakeHttpClient {
        fn respond(&self, response: Result<Value, HttpError>) {
            self.responses.borrow_mut().push_back(response);
        }
    }

    #[async_trait(?Send)]
    impl HttpClient for FakeHttpClient {
        async fn post_json(&self, url: &str, body: &Value) -> Result<Value, HttpError> {
            self.requests
                .borrow_mut()
                .push((url.to_string(), body.clone()));
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or(Ok(Value::Null))
        }
    }

    fn service(client: Rc<FakeHttpClient>) -> EmailAuthHttpService {
        let config = EmailAuthConfig {
            base_url: "https://auth.example.com/".to_string(),
            ..EmailAuthConfig::default()
        };
        EmailAuthHttpService::new(client, config)
    }

    fn token_json() -> Value {
        json!({ "token": "tok", "email": "a@b.fi", "verified": false })
    }

    #[test]
    fn test_endpoint_joining() {
        let config = EmailAuthConfig::default();
        assert_eq!(
            config.endpoint(DEFAULT_VERIFY_EMAIL_CODE_PATH, Language::Sv),
            "/api/sv/verifyEmailCode"
        );

        let config = EmailAuthConfig {
            base_url: "http://localhost:3000/".to_string(),
            ..EmailAuthConfig::default()
        };
        assert_eq!(
            config.endpoint("api/{lang}/x", Language::Fi),
            "http://localhost:3000/api/fi/x"
        );
    }

    #[tokio::test]
    async fn test_authenticate_posts_email() {
        let client = Rc::new(FakeHttpClient::default());
        client.respond(Ok(token_json()));
        let auth = service(client.clone());

        let token = auth
            .authenticate_email_address("a@b.fi", None)
            .await
            .unwrap();
        assert_eq!(token.token, "tok");
        assert!(!token.verified);

        let requests = client.requests.borrow();
        assert_eq!(requests[0].0, "https://auth.example.com/api/en/authenticateEmail");
        assert_eq!(requests[0].1, json!({ "email": "a@b.fi" }));
    }

    #[tokio::test]
    async fn test_authenticate_rejects_malformed_response() {
        let client = Rc::new(FakeHttpClient::default());
        client.respond(Ok(json!({ "error": "nope" })));
        let auth = service(client);

        let result = auth.authenticate_email_address("a@b.fi", None).await;
        assert!(matches!(result, Err(EmailAuthError::InvalidResponse)));
    }

    #[tokio::test]
    async fn test_verify_token_uses_explicit_language() {
        let client = Rc::new(FakeHttpClient::default());
        client.respond(Ok(json!({ "token": "tok", "email": "a@b.fi", "verified": true })));
        let auth = service(client.clone());
        auth.set_language(Language::Sv);

        let token = auth
            .verify_email_token("emailed", Some(Language::Fi))
            .await
            .unwrap();
        assert!(token.is_some_and(|t| t.verified));

        let requests = client.requests.borrow();
        assert_eq!(requests[0].0, "https://auth.example.com/api/fi/verifyEmailToken");
        assert_eq!(requests[0].1, json!({ "emailToken": "emailed" }));
    }

    #[tokio::test]
    async fn test_verify_code_maps_bad_response_to_none() {
        let client = Rc::new(FakeHttpClient::default());
        client.respond(Ok(Value::Null));
        client.respond(Ok(json!("wrong")));
        let auth = service(client.clone());
        auth.set_language(Language::Sv);
        let token = EmailTokenDto::parse(&token_json()).unwrap();

        assert_eq!(auth.verify_email_code(&token, "1234", None).await.unwrap(), None);
        assert_eq!(auth.verify_email_code(&token, "1234", None).await.unwrap(), None);

        let requests = client.requests.borrow();
        assert_eq!(requests[0].0, "https://auth.example.com/api/sv/verifyEmailCode");
        assert_eq!(requests[0].1, json!({ "token": token_json(), "code": "1234" }));
    }

    #[tokio::test]
    async fn test_transport_error_is_propagated() {
        let client = Rc::new(FakeHttpClient::default());
        client.respond(Err(HttpError::Status {
            url: "x".to_string(),
            status: 500,
        }));
        let auth = service(client);

        let result = auth.verify_email_token("emailed", None).await;
        assert!(matches!(
            result,
            Err(EmailAuthError::Http(HttpError::Status { status: 500, .. }))
        ));
    }
}
