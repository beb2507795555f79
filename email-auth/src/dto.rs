use serde::{Deserialize, Serialize};

/// Token issued by the email authentication endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTokenDto {
    pub token: String,
    pub email: String,
    pub verified: bool,
}

impl EmailTokenDto {
    /// Structural check: `Some` only if every field is present with the right type
    pub fn parse(value: &serde_json::Value) -> Option<Self> {
        EmailTokenDto::deserialize(value).ok()
    }
}

pub fn is_email_token_dto(value: &serde_json::Value) -> bool {
    EmailTokenDto::parse(value).is_some()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyEmailCodeDto {
    pub token: EmailTokenDto,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AuthenticateEmailDto<'a> {
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VerifyEmailTokenDto<'a> {
    pub email_token: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shape_check() {
        assert!(is_email_token_dto(&json!({ "token": "t", "email": "a@b", "verified": false })));
        assert!(!is_email_token_dto(&json!({ "token": "t", "email": "a@b" })));
        assert!(!is_email_token_dto(&json!({ "token": 1, "email": "a@b", "verified": true })));
        assert!(!is_email_token_dto(&json!(null)));
    }

    #[test]
    fn test_request_bodies() {
        let body = serde_json::to_value(VerifyEmailTokenDto { email_token: "abc" }).unwrap();
        assert_eq!(body, json!({ "emailToken": "abc" }));
    }
}
