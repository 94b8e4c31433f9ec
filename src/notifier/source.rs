//! Remote notification sources checked by the poll loop.

use anyhow::{anyhow, Result};
use async_trait::async_trait;

#[async_trait]
pub trait AlertSource: Send + Sync + 'static {
    /// One check. `Ok(None)` means nothing new this tick.
    async fn check(&self) -> Result<Option<serde_json::Value>>;
}

/// GETs a JSON document and extracts one top-level field.
pub struct HttpAlertSource {
    client: reqwest::Client,
    url: url::Url,
    field: &'static str,
}

impl HttpAlertSource {
    pub fn new(client: reqwest::Client, url: url::Url, field: &'static str) -> Self {
        Self { client, url, field }
    }

    /// `{base}/streams/check-live`
    pub fn live_streams(client: reqwest::Client, api_base: &str) -> Result<Self> {
        let url = join(api_base, "streams/check-live")?;
        Ok(Self::new(client, url, "newLiveStream"))
    }

    /// `{base}/expert/help-requests[?expert=<email>]`
    pub fn help_requests(
        client: reqwest::Client,
        api_base: &str,
        expert_email: Option<&str>,
    ) -> Result<Self> {
        let path = match expert_email {
            Some(email) => format!(
                "expert/help-requests?expert={}",
                urlencoding::encode(email)
            ),
            None => "expert/help-requests".to_string(),
        };
        Ok(Self::new(client, join(api_base, &path)?, "newRequest"))
    }

    pub fn url(&self) -> &url::Url {
        &self.url
    }
}

fn join(base: &str, path: &str) -> Result<url::Url> {
    let base = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    };
    Ok(url::Url::parse(&base)?.join(path)?)
}

#[async_trait]
impl AlertSource for HttpAlertSource {
    async fn check(&self) -> Result<Option<serde_json::Value>> {
        let resp = self.client.get(self.url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("{} returned {}", self.url, status));
        }

        let mut body: serde_json::Value = resp.json().await?;
        Ok(body
            .get_mut(self.field)
            .map(serde_json::Value::take)
            .filter(|v| !v.is_null()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_endpoint_urls() {
        let client = reqwest::Client::new();
        let live = HttpAlertSource::live_streams(client.clone(), "http://localhost:8080/api").unwrap();
        assert_eq!(live.url().as_str(), "http://localhost:8080/api/streams/check-live");

        let help = HttpAlertSource::help_requests(
            client.clone(),
            "http://localhost:8080/api/",
            Some("expert+1@example.com"),
        )
        .unwrap();
        assert_eq!(
            help.url().as_str(),
            "http://localhost:8080/api/expert/help-requests?expert=expert%2B1%40example.com"
        );

        let all = HttpAlertSource::help_requests(client, "http://localhost:8080/api", None).unwrap();
        assert_eq!(all.url().path(), "/api/expert/help-requests");
    }
}
