use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{NetworkError, Result};
use crate::state::CatalogEntry;

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Deserialize)]
struct DrugListResponse {
    #[serde(default)]
    drugs: Vec<CatalogEntry>,
}

#[derive(Deserialize)]
struct DrugInfoResponse {
    drug: DrugInfo,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseStudy {
    pub title: String,
    pub url: String,
}

/// Side-effect profile and reading list for one medication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrugInfo {
    pub name: String,
    #[serde(default)]
    pub common_side_effects: Vec<String>,
    #[serde(default)]
    pub severe_side_effects: Vec<String>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub case_studies: Vec<CaseStudy>,
}

/// Client for the treatment-assistant backend.
///
/// Every call is a single request/response with no retry and no timeout.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    base_url: Url,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        // Url::join replaces the last segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET /drug_list`
    pub async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>> {
        let url = self.base_url.join("drug_list")?;
        tracing::debug!(%url, "fetching drug list");

        let response = self.client.get(url).send().await?;
        let list: DrugListResponse = Self::decode(response).await?;

        tracing::debug!(count = list.drugs.len(), "drug list received");
        Ok(list.drugs)
    }

    /// `POST /chat`, returning the rendered response markup.
    pub async fn exchange(&self, message: &str) -> Result<String> {
        let url = self.base_url.join("chat")?;
        tracing::debug!(%url, chars = message.chars().count(), "sending chat message");

        let response = self
            .client
            .post(url)
            .json(&ChatRequest { message })
            .send()
            .await?;
        let chat: ChatResponse = Self::decode(response).await?;

        tracing::debug!(chars = chat.response.chars().count(), "chat response received");
        Ok(chat.response)
    }

    /// `GET /drug_info?name=...`
    pub async fn drug_info(&self, name: &str) -> Result<DrugInfo> {
        let mut url = self.base_url.join("drug_info")?;
        url.query_pairs_mut().append_pair("name", name);
        tracing::debug!(%url, "fetching drug info");

        let response = self.client.get(url).send().await?;
        let info: DrugInfoResponse = Self::decode(response).await?;
        Ok(info.drug)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // The backend reports lookups it can't satisfy as {"error": "..."}
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(NetworkError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_catalog_parses_drug_names() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/drug_list")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"drugs": [{"name": "Levodopa"}, {"name": "Pramipexole"}]}"#)
            .create_async()
            .await;

        let client = ChatClient::new(&server.url()).unwrap();
        let drugs = client.fetch_catalog().await.unwrap();

        mock.assert_async().await;
        let names: Vec<&str> = drugs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Levodopa", "Pramipexole"]);
    }

    #[tokio::test]
    async fn test_exchange_posts_message_and_returns_markup() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat")
            .match_body(mockito::Matcher::Json(
                serde_json::json!({"message": "What is levodopa?"}),
            ))
            .with_status(200)
            .with_body(r#"{"response": "<h3>Levodopa</h3><p>Causes nausea.</p>"}"#)
            .create_async()
            .await;

        let client = ChatClient::new(&server.url()).unwrap();
        let markup = client.exchange("What is levodopa?").await.unwrap();

        mock.assert_async().await;
        assert_eq!(markup, "<h3>Levodopa</h3><p>Causes nausea.</p>");
    }

    #[tokio::test]
    async fn test_exchange_server_error_is_status_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat")
            .with_status(500)
            .with_body("Internal Server Error")
            .create_async()
            .await;

        let client = ChatClient::new(&server.url()).unwrap();
        let err = client.exchange("hello").await.unwrap_err();

        assert!(matches!(err, NetworkError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_exchange_malformed_body_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat")
            .with_status(200)
            .with_body(r#"{"answer": "wrong field"}"#)
            .create_async()
            .await;

        let client = ChatClient::new(&server.url()).unwrap();
        let err = client.exchange("hello").await.unwrap_err();

        assert!(matches!(err, NetworkError::Decode(_)));
    }

    #[tokio::test]
    async fn test_drug_info_not_found_carries_backend_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/drug_info")
            .match_query(mockito::Matcher::UrlEncoded("name".into(), "aspirin".into()))
            .with_status(404)
            .with_body(r#"{"error": "Information about aspirin not found"}"#)
            .create_async()
            .await;

        let client = ChatClient::new(&server.url()).unwrap();
        let err = client.drug_info("aspirin").await.unwrap_err();

        match err {
            NetworkError::Status { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Information about aspirin not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_drug_info_parses_profile() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/drug_info")
            .match_query(mockito::Matcher::UrlEncoded("name".into(), "levodopa".into()))
            .with_status(200)
            .with_body(
                r#"{"drug": {
                    "name": "Levodopa",
                    "common_side_effects": ["Nausea", "Dizziness"],
                    "severe_side_effects": ["Dyskinesia"],
                    "resources": [{"name": "Mayo Clinic", "url": "https://example.org/a"}],
                    "case_studies": [{"title": "Long-term use", "url": "https://example.org/b"}]
                }}"#,
            )
            .create_async()
            .await;

        let client = ChatClient::new(&server.url()).unwrap();
        let info = client.drug_info("levodopa").await.unwrap();

        assert_eq!(info.name, "Levodopa");
        assert_eq!(info.common_side_effects, vec!["Nausea", "Dizziness"]);
        assert_eq!(info.severe_side_effects, vec!["Dyskinesia"]);
        assert_eq!(info.case_studies[0].title, "Long-term use");
    }

    #[test]
    fn test_base_url_keeps_path_prefix() {
        let client = ChatClient::new("http://localhost:5000/assist").unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:5000/assist/");
        assert_eq!(
            client.base_url().join("chat").unwrap().as_str(),
            "http://localhost:5000/assist/chat"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let err = ChatClient::new("not a url").unwrap_err();
        assert!(matches!(err, NetworkError::InvalidUrl(_)));
    }
}
