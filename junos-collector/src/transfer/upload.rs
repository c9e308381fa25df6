//! Upload of the run archive to a Nextcloud public share.
//!
//! A share link `<cloud>/s/<token>` maps to the WebDAV endpoint
//! `<cloud>/public.php/webdav/<file>`, authenticated with the share token as
//! user name and the (optional) share password.

use crate::utils::errors::{CollectorError, Result};
use reqwest::StatusCode;
use std::path::Path;
use tracing::{error, info};

const ACCEPTED: [StatusCode; 3] = [StatusCode::OK, StatusCode::CREATED, StatusCode::NO_CONTENT];

/// Parsed public share link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareTarget {
    pub cloud_url: String,
    pub token: String,
}

impl ShareTarget {
    pub fn parse(url: &str) -> Result<Self> {
        let (cloud, rest) = url
            .split_once("/s/")
            .ok_or_else(|| CollectorError::Upload(format!("not a share URL: {}", url)))?;

        let token = rest
            .split(|c: char| c == '/' || c == '?' || c == '#')
            .next()
            .unwrap_or_default();

        if cloud.is_empty() || token.is_empty() {
            return Err(CollectorError::Upload(format!("not a share URL: {}", url)));
        }

        Ok(Self {
            cloud_url: cloud.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn endpoint(&self, file_name: &str) -> String {
        format!("{}/public.php/webdav/{}", self.cloud_url, file_name)
    }
}

/// HTTP client bound to one share.
pub struct Uploader {
    client: reqwest::Client,
    share: ShareTarget,
    password: String,
}

impl Uploader {
    pub fn new(share_url: &str, password: impl Into<String>, insecure: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .build()?;
        Self::with_client(client, share_url, password)
    }

    pub fn with_client(
        client: reqwest::Client,
        share_url: &str,
        password: impl Into<String>,
    ) -> Result<Self> {
        let share = ShareTarget::parse(share_url)?;
        Ok(Self {
            client,
            share,
            password: password.into(),
        })
    }

    pub fn share(&self) -> &ShareTarget {
        &self.share
    }

    /// PUT the archive to the share. Returns the accepted status code.
    pub async fn upload(&self, archive: &Path) -> Result<StatusCode> {
        let file_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                CollectorError::Upload(format!("{} has no file name", archive.display()))
            })?;
        let endpoint = self.share.endpoint(&file_name);
        let data = tokio::fs::read(archive).await?;

        info!(
            cloud_url = %self.share.cloud_url,
            bytes = data.len(),
            "Uploading archive to {}",
            endpoint
        );

        let response = self
            .client
            .put(&endpoint)
            .header("X-Requested-With", "XMLHttpRequest")
            .basic_auth(&self.share.token, Some(&self.password))
            .body(data)
            .send()
            .await?;

        let status = response.status();
        if ACCEPTED.contains(&status) {
            info!("Upload successful! Status code: {}", status.as_u16());
            return Ok(status);
        }

        let body = response.text().await.unwrap_or_default();
        error!("Upload failed. Status code: {}", status.as_u16());
        Err(CollectorError::Upload(format!(
            "status {}: {}",
            status.as_u16(),
            body.trim()
        )))
    }
}
