//! Email Auth
//!
//! Client side of the email verification flow: format check, authenticate by
//! email, verify by emailed token or by code.

pub mod dto;
pub mod http;
pub mod language;
pub mod service;
pub mod utils;

pub use dto::{is_email_token_dto, EmailTokenDto, VerifyEmailCodeDto};
pub use http::{HttpClient, HttpError, ReqwestHttpClient};
pub use language::{Language, ParseLanguageError};
pub use service::{EmailAuthConfig, EmailAuthError, EmailAuthHttpService};
pub use utils::EmailUtils;
