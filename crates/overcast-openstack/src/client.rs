//! Token-authenticated JSON client for one service endpoint

use crate::error::{OpenStackError, Result};
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

const AUTH_HEADER: &str = "X-Auth-Token";

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl ApiClient {
    pub fn new(http: reqwest::Client, token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            token: token.into(),
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.url(path))
            .header(AUTH_HEADER, &self.token)
    }

    async fn send(&self, method: Method, path: &str, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(OpenStackError::Api {
            method: method.to_string(),
            url: self.url(path),
            status: status.as_u16(),
            message: message.trim().to_string(),
        })
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.request(Method::GET, path);
        let response = self.send(Method::GET, path, request).await?;
        Self::json(response).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let request = self.request(Method::POST, path).json(body);
        let response = self.send(Method::POST, path, request).await?;
        Self::json(response).await
    }

    /// POST without caring about the response body
    pub async fn post_empty<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let request = self.request(Method::POST, path).json(body);
        self.send(Method::POST, path, request).await?;
        Ok(())
    }

    pub async fn put<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let request = self.request(Method::PUT, path).json(body);
        self.send(Method::PUT, path, request).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        let request = self.request(Method::DELETE, path);
        self.send(Method::DELETE, path, request).await?;
        Ok(())
    }
}
