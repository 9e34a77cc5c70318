use reqwest::{Client, Response};
use serde_json::Value;
use url::Url;

use crate::error::TrackerError;

pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, TrackerError> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|e| TrackerError::Decode {
        url: joined.clone(),
        message: e.to_string(),
    })
}

async fn send(http: &Client, url: &Url) -> Result<Response, TrackerError> {
    let response = http
        .get(url.clone())
        .send()
        .await
        .map_err(|e| TrackerError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })?;
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(TrackerError::Api {
            url: url.to_string(),
            status: status.as_u16(),
            message,
        });
    }
    Ok(response)
}

pub(crate) async fn get_json(http: &Client, url: &Url) -> Result<Value, TrackerError> {
    send(http, url)
        .await?
        .json()
        .await
        .map_err(|e| TrackerError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
}

pub(crate) async fn get_bytes(http: &Client, url: &Url) -> Result<Vec<u8>, TrackerError> {
    let bytes = send(http, url)
        .await?
        .bytes()
        .await
        .map_err(|e| TrackerError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let with: Url = "http://pool.example/api/".parse().unwrap();
        let without: Url = "http://pool.example/api".parse().unwrap();
        assert_eq!(
            endpoint(&with, "tasks/0x01").unwrap(),
            endpoint(&without, "/tasks/0x01").unwrap()
        );
        assert_eq!(
            endpoint(&without, "tasks/0x01").unwrap().as_str(),
            "http://pool.example/api/tasks/0x01"
        );
    }
}
