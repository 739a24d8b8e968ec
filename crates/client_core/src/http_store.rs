use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{
    error::ApiError,
    protocol::{AssetUploadQuery, AssetUploaded},
};
use tracing::{debug, warn};
use url::Url;

use crate::{
    config::Settings,
    store::{AssetUpload, RemoteStore, StoreError, StoreResult},
};

pub struct HttpRemoteStore {
    http: Client,
    base_url: Url,
    api_token: Option<String>,
}

impl HttpRemoteStore {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        let base_url = Url::parse(&settings.api_base_url)
            .with_context(|| format!("invalid api url `{}`", settings.api_base_url))?;
        if base_url.cannot_be_a_base() {
            bail!("api url `{}` cannot carry a path", settings.api_base_url);
        }
        Ok(Self {
            http,
            base_url,
            api_token: settings.api_token.clone(),
        })
    }

    // Each part is pushed as one escaped segment, so ids never reach another route.
    fn endpoint(&self, resource: &str, id: Option<&str>) -> StoreResult<Url> {
        if let Some(id) = id {
            if matches!(id.trim(), "" | "." | "..") {
                return Err(StoreError::not_found(format!("Identificador inválido: \"{id}\"")));
            }
        }
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StoreError::network(format!("invalid api url {}", self.base_url)))?;
            segments.pop_if_empty().push(resource);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, url: &Url, request: RequestBuilder) -> StoreResult<T> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|err| StoreError::network(format!("request to {url} failed: {err}")))?;
        read_response(url.as_str(), response).await
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch_collection(&self, resource: &str) -> StoreResult<Vec<Value>> {
        let url = self.endpoint(resource, None)?;
        debug!(%url, "store: fetching collection");
        self.send(&url, self.http.get(url.clone())).await
    }

    async fn fetch_one(&self, resource: &str, id: &str) -> StoreResult<Value> {
        let url = self.endpoint(resource, Some(id))?;
        debug!(%url, "store: fetching entity");
        self.send(&url, self.http.get(url.clone())).await
    }

    async fn create(&self, resource: &str, payload: Value) -> StoreResult<Value> {
        let url = self.endpoint(resource, None)?;
        debug!(%url, "store: creating entity");
        self.send(&url, self.http.post(url.clone()).json(&payload)).await
    }

    async fn update(&self, resource: &str, id: &str, payload: Value) -> StoreResult<Value> {
        let url = self.endpoint(resource, Some(id))?;
        debug!(%url, "store: updating entity");
        self.send(&url, self.http.put(url.clone()).json(&payload)).await
    }

    async fn upload_asset(&self, upload: AssetUpload) -> StoreResult<AssetUploaded> {
        let url = self.endpoint("uploads", None)?;
        debug!(
            %url,
            kind = upload.kind.as_str(),
            size_bytes = upload.bytes.len(),
            "store: uploading asset"
        );
        let query = AssetUploadQuery {
            kind: upload.kind,
            filename: upload.filename,
            mime_type: upload.mime_type.clone(),
        };
        let request = self
            .http
            .post(url.clone())
            .query(&query)
            .header(header::CONTENT_TYPE, upload.mime_type)
            .body(upload.bytes);
        self.send(&url, request).await
    }
}

async fn read_response<T: DeserializeOwned>(url: &str, response: Response) -> StoreResult<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|err| StoreError::decode(format!("invalid response body from {url}: {err}")));
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(status, &body);
    warn!(%url, status = status.as_u16(), %message, "store: request rejected");
    Err(match status {
        StatusCode::NOT_FOUND => StoreError::not_found(message),
        StatusCode::CONFLICT => StoreError::conflict(message),
        _ => StoreError::network(message),
    })
}

fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(api_error) = serde_json::from_str::<ApiError>(body) {
        if !api_error.message.trim().is_empty() {
            return api_error.message;
        }
    }
    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()))
}

#[cfg(test)]
#[path = "tests/http_store_tests.rs"]
mod tests;
