/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use trust_dns_resolver::TokioAsyncResolver;

use crate::error::{Error, Result};
use crate::soap::CertType;

const DEFAULT_PORT: u16 = 443;
const DEFAULT_API_VERSION: &str = "5.0";
const DEFAULT_REQUEST_TIMEOUT: u64 = 300;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: Option<u16>,
    pub certificate: Option<(CertType, PathBuf)>,
    pub credentials: Option<Credentials>,
    pub host_alias: Option<(HostAlias, Option<String>)>,
    pub disable_certificate_verification: Option<bool>,
    pub disable_hostname_verification: Option<bool>,
    /// vim25 release sent in the SOAPAction header.
    pub api_version: Option<String>,
    /// Client-side limit (seconds) on a single request, including
    /// long polls. Must exceed the longest wait passed to a poll.
    pub request_timeout: Option<u64>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum HostAlias {
    Domain,
    Ip,
}

impl Config {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            certificate: None,
            credentials: None,
            host_alias: None,
            disable_certificate_verification: None,
            disable_hostname_verification: None,
            api_version: None,
            request_timeout: None,
        }
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    pub async fn get_hostname(&self) -> Result<String> {
        match &self.host_alias {
            Some((HostAlias::Domain, Some(domain))) => {
                Ok(format!("{}.{}", self.host, domain))
            }
            Some((HostAlias::Ip, Some(ip))) => Ok(ip.clone()),
            Some((HostAlias::Ip, None)) => {
                Ok(ip_lookup_one(&self.host).await?.to_string())
            }
            _ => Ok(self.host.clone()),
        }
    }

    pub async fn endpoint(&self) -> Result<String> {
        Ok(format!(
            "https://{}:{}/sdk",
            self.get_hostname().await?,
            self.port.unwrap_or(DEFAULT_PORT)
        ))
    }

    pub fn soap_action(&self) -> String {
        format!(
            "urn:vim25/{}",
            self.api_version.as_deref().unwrap_or(DEFAULT_API_VERSION)
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        )
    }
}

async fn ip_lookup_one(hostname: &str) -> Result<IpAddr> {
    TokioAsyncResolver::tokio_from_system_conf()?
        .lookup_ip(hostname)
        .await?
        .iter()
        .next()
        .ok_or_else(|| Error::NoIpFound(hostname.to_string()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{Config, HostAlias};

    #[tokio::test]
    async fn parse_config() {
        let config: Config = serde_json::from_str(
            r#"{
                "host": "vcenter01",
                "port": 8443,
                "certificate": null,
                "credentials": {
                    "username": "administrator@vsphere.local",
                    "password": "secret"
                },
                "host_alias": ["Domain", "example.org"],
                "disable_certificate_verification": true,
                "disable_hostname_verification": null,
                "api_version": "6.7",
                "request_timeout": null
            }"#,
        )
        .unwrap();
        assert!(matches!(config.host_alias, Some((HostAlias::Domain, _))));
        assert_eq!(config.get_hostname().await.unwrap(), "vcenter01.example.org");
        assert_eq!(
            config.endpoint().await.unwrap(),
            "https://vcenter01.example.org:8443/sdk"
        );
        assert_eq!(config.soap_action(), "urn:vim25/6.7");
        assert_eq!(config.request_timeout(), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn ip_alias() {
        let mut config = Config::new("esx01");
        config.host_alias = Some((HostAlias::Ip, Some(String::from("10.0.0.5"))));
        assert_eq!(
            config.endpoint().await.unwrap(),
            "https://10.0.0.5:443/sdk"
        );
        assert_eq!(config.soap_action(), "urn:vim25/5.0");
    }
}
