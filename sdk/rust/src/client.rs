use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::types::*;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error envelope.
    #[error("API returned {status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct RpaasClient {
    client: Client,
    base_url: String,
}

impl RpaasClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }

    fn instance_path(instance: &str, suffix: &str) -> String {
        format!("/resources/{}{}", instance, suffix)
    }

    /// Send and fail on any non-2xx status, surfacing the API's message.
    async fn send(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let resp = builder.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let text = resp.text().await?;
        let message = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => body.error,
            Err(_) => text,
        };
        Err(ClientError::Api { status, message })
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let text = self.send(builder).await?.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), ClientError> {
        self.send(builder).await?;
        Ok(())
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ClientError> {
        self.send_empty(self.request(Method::POST, path).json(body)).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send_json(self.request(Method::GET, path)).await
    }

    pub async fn create_instance(&self, args: &CreateInstance) -> Result<(), ClientError> {
        self.post("/resources", args).await
    }

    pub async fn update_instance(&self, instance: &str, args: &UpdateInstance) -> Result<(), ClientError> {
        let path = Self::instance_path(instance, "");
        self.send_empty(self.request(Method::PUT, &path).json(args)).await
    }

    pub async fn delete_instance(&self, instance: &str) -> Result<(), ClientError> {
        let path = Self::instance_path(instance, "");
        self.send_empty(self.request(Method::DELETE, &path)).await
    }

    pub async fn plans(&self) -> Result<Vec<Plan>, ClientError> {
        self.get("/resources/plans").await
    }

    pub async fn flavors(&self) -> Result<Vec<Flavor>, ClientError> {
        self.get("/resources/flavors").await
    }

    pub async fn service_info(&self, instance: &str) -> Result<Vec<InfoItem>, ClientError> {
        self.get(&Self::instance_path(instance, "")).await
    }

    pub async fn info(&self, instance: &str) -> Result<InstanceInfo, ClientError> {
        self.get(&Self::instance_path(instance, "/info")).await
    }

    pub async fn status(&self, instance: &str) -> Result<ReplicaStatusMap, ClientError> {
        self.get(&Self::instance_path(instance, "/status")).await
    }

    pub async fn bind_app(&self, instance: &str, app_host: &str) -> Result<(), ClientError> {
        self.post(&Self::instance_path(instance, "/bind-app"), &json!({ "app_host": app_host }))
            .await
    }

    pub async fn unbind_app(&self, instance: &str) -> Result<(), ClientError> {
        let path = Self::instance_path(instance, "/bind-app");
        self.send_empty(self.request(Method::DELETE, &path)).await
    }

    pub async fn scale(&self, instance: &str, quantity: i32) -> Result<(), ClientError> {
        self.post(&Self::instance_path(instance, "/scale"), &json!({ "quantity": quantity }))
            .await
    }

    pub async fn blocks(&self, instance: &str) -> Result<Vec<Block>, ClientError> {
        self.get(&Self::instance_path(instance, "/block")).await
    }

    pub async fn update_block(&self, instance: &str, block: &Block) -> Result<(), ClientError> {
        self.post(&Self::instance_path(instance, "/block"), block).await
    }

    pub async fn delete_block(&self, instance: &str, name: &str) -> Result<(), ClientError> {
        let path = Self::instance_path(instance, &format!("/block/{}", name));
        self.send_empty(self.request(Method::DELETE, &path)).await
    }

    pub async fn routes(&self, instance: &str) -> Result<Vec<Route>, ClientError> {
        self.get(&Self::instance_path(instance, "/route")).await
    }

    pub async fn update_route(&self, instance: &str, route: &Route) -> Result<(), ClientError> {
        self.post(&Self::instance_path(instance, "/route"), route).await
    }

    pub async fn delete_route(&self, instance: &str, path: &str) -> Result<(), ClientError> {
        let url = Self::instance_path(instance, "/route");
        self.send_empty(self.request(Method::DELETE, &url).query(&[("path", path)]))
            .await
    }

    pub async fn certificates(&self, instance: &str) -> Result<Vec<Certificate>, ClientError> {
        self.get(&Self::instance_path(instance, "/certificate")).await
    }

    pub async fn update_certificate(&self, instance: &str, certificate: &Certificate) -> Result<(), ClientError> {
        self.post(&Self::instance_path(instance, "/certificate"), certificate).await
    }

    pub async fn delete_certificate(&self, instance: &str, name: &str) -> Result<(), ClientError> {
        let path = Self::instance_path(instance, &format!("/certificate/{}", name));
        self.send_empty(self.request(Method::DELETE, &path)).await
    }

    pub async fn files(&self, instance: &str) -> Result<Vec<File>, ClientError> {
        self.get(&Self::instance_path(instance, "/files")).await
    }

    pub async fn create_files(&self, instance: &str, files: &[File]) -> Result<(), ClientError> {
        self.post(&Self::instance_path(instance, "/files"), &files).await
    }

    pub async fn update_files(&self, instance: &str, files: &[File]) -> Result<(), ClientError> {
        let path = Self::instance_path(instance, "/files");
        self.send_empty(self.request(Method::PUT, &path).json(&files)).await
    }

    pub async fn delete_files(&self, instance: &str, names: &[String]) -> Result<(), ClientError> {
        let path = Self::instance_path(instance, "/files");
        self.send_empty(self.request(Method::DELETE, &path).json(&names)).await
    }

    pub async fn purge(&self, instance: &str, request: &PurgeRequest) -> Result<PurgeResult, ClientError> {
        let path = Self::instance_path(instance, "/purge");
        self.send_json(self.request(Method::POST, &path).json(request)).await
    }
}
