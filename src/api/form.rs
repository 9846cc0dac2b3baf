use crate::error::RecallError;
use axum::{
    Form,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use std::collections::HashMap;

/// Text fields of a form body, sent either urlencoded or as multipart.
///
/// Browsers posting a `FormData` object use multipart; scripts and curl usually
/// send urlencoded. File parts are ignored.
#[derive(Debug, Default)]
pub struct FormFields(pub HashMap<String, String>);

impl FormFields {
    /// Value of a required field.
    pub fn require(&self, name: &str) -> Result<&str, RecallError> {
        self.0
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| RecallError::Validation(format!("missing form field: {name}")))
    }
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

impl<S> FromRequest<S> for FormFields
where
    S: Send + Sync,
{
    type Rejection = RecallError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| RecallError::Validation(e.body_text()))?;
            return Ok(Self(fields));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| RecallError::Validation(e.body_text()))?;

        let mut fields = HashMap::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| RecallError::Validation(e.body_text()))?
        {
            if field.file_name().is_some() {
                continue;
            }
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let value = field
                .text()
                .await
                .map_err(|e| RecallError::Validation(e.body_text()))?;
            fields.insert(name, value);
        }
        Ok(Self(fields))
    }
}
