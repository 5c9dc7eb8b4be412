//! HTTP client for the backend REST API. The [`BackendApi`] trait is
//! the seam the engine and the form submitters talk through; tests
//! script it with a fake, production wires in [`HttpApi`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use curtidas_core::state::{ErrorBody, FavoriteEntry, ServerMessage, ToggleResult, UploadedImage};
use curtidas_core::{PostId, UserId};

/// Client-side API error.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server answered with a non-OK status and (maybe) a payload.
    #[error("HTTP {status}")]
    Server { status: u16, body: ErrorBody },

    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("decode: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn like(&self, user: UserId, post: PostId) -> Result<ToggleResult, ApiError>;

    async fn unlike(&self, post: PostId) -> Result<ToggleResult, ApiError>;

    async fn favorites(&self, user: UserId) -> Result<Vec<FavoriteEntry>, ApiError>;

    /// Form-encoded credentials; the session lands in a cookie, so the
    /// body of a successful reply carries nothing this layer needs.
    async fn login(&self, fields: &[(String, String)]) -> Result<(), ApiError>;

    /// Multipart user registration.
    async fn register(&self, fields: &[(String, String)]) -> Result<(), ApiError>;

    async fn upload_profile_image(
        &self,
        filename: String,
        bytes: Vec<u8>,
    ) -> Result<UploadedImage, ApiError>;

    async fn update_profile(
        &self,
        user: UserId,
        token: &str,
        body: serde_json::Value,
    ) -> Result<ServerMessage, ApiError>;
}

pub struct HttpApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send, turning any non-success status into [`ApiError::Server`]
    /// with its body decoded as far as it will go.
    async fn execute(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let bytes = resp.bytes().await?;
        Err(ApiError::Server {
            status: status.as_u16(),
            body: ErrorBody::from_json_slice(&bytes),
        })
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
        resp.json::<T>()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))
    }
}

#[async_trait]
impl BackendApi for HttpApi {
    async fn like(&self, user: UserId, post: PostId) -> Result<ToggleResult, ApiError> {
        let url = self.url(&format!("/api/v1/favorites/{user}/{post}"));
        let resp = self.execute(self.http.post(url)).await?;
        Self::decode(resp).await
    }

    async fn unlike(&self, post: PostId) -> Result<ToggleResult, ApiError> {
        let url = self.url(&format!("/api/v1/favorites/{post}"));
        let resp = self.execute(self.http.delete(url)).await?;
        Self::decode(resp).await
    }

    async fn favorites(&self, user: UserId) -> Result<Vec<FavoriteEntry>, ApiError> {
        let url = self.url(&format!("/api/v1/favorites/user/{user}"));
        let resp = self.execute(self.http.get(url)).await?;
        Self::decode(resp).await
    }

    async fn login(&self, fields: &[(String, String)]) -> Result<(), ApiError> {
        let url = self.url("/auth/login");
        let req = self
            .http
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(fields);
        self.execute(req).await?;
        Ok(())
    }

    async fn register(&self, fields: &[(String, String)]) -> Result<(), ApiError> {
        let url = self.url("/api/v1/users/");
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in fields {
            form = form.text(name.clone(), value.clone());
        }
        self.execute(self.http.post(url).multipart(form)).await?;
        Ok(())
    }

    async fn upload_profile_image(
        &self,
        filename: String,
        bytes: Vec<u8>,
    ) -> Result<UploadedImage, ApiError> {
        let url = self.url("/api/v1/uploads/profile-image");
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
        let form = reqwest::multipart::Form::new().part("file", part);
        let resp = self.execute(self.http.post(url).multipart(form)).await?;
        Self::decode(resp).await
    }

    async fn update_profile(
        &self,
        user: UserId,
        token: &str,
        body: serde_json::Value,
    ) -> Result<ServerMessage, ApiError> {
        let url = self.url(&format!("/api/v1/users/{user}"));
        let req = self.http.put(url).bearer_auth(token).json(&body);
        let resp = self.execute(req).await?;
        Self::decode(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let api = HttpApi::new("http://localhost:8000/");
        assert_eq!(
            api.url("/api/v1/favorites/3/12"),
            "http://localhost:8000/api/v1/favorites/3/12"
        );
    }
}
