/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::path::Path;

use log::{info, trace};
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Certificate, Client, StatusCode,
};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::config::Config;

const ENVELOPE_START: &str = concat!(
    r#"<SOAP-ENV:Envelope"#,
    r#" xmlns:SOAP-ENC="http://schemas.xmlsoap.org/soap/encoding/""#,
    r#" xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/""#,
    r#" xmlns:xsd="http://www.w3.org/2001/XMLSchema""#,
    r#" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
    r#"<SOAP-ENV:Header/>"#
);
const ENVELOPE_END: &str = "</SOAP-ENV:Envelope>";

/// HTTP transport for vim25 requests. The session cookie set by `Login`
/// is kept in the client's cookie store.
#[derive(Debug)]
pub struct SoapClient {
    endpoint: String,
    client: Client,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CertType {
    PEM,
    DER,
}

impl SoapClient {
    /// Build a client posting to `endpoint` with the TLS settings,
    /// SOAPAction header and request timeout from `config`.
    pub async fn create(
        endpoint: String,
        config: &Config,
    ) -> Result<SoapClient, SoapError> {
        let mut headers = HeaderMap::new();
        headers.insert("SOAPAction", HeaderValue::from_str(&config.soap_action())?);
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/xml; charset=\"utf-8\""),
        );

        let mut builder = Client::builder()
            .user_agent(concat!("vim-collector/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .cookie_store(true)
            .timeout(config.request_timeout())
            .danger_accept_invalid_certs(
                config.disable_certificate_verification.unwrap_or(false),
            )
            .danger_accept_invalid_hostnames(
                config.disable_hostname_verification.unwrap_or(false),
            );
        if let Some((cert_type, path)) = &config.certificate {
            builder = builder
                .add_root_certificate(load_certificate(cert_type, path).await?);
        }

        Ok(SoapClient {
            client: builder.build()?,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Post a `SOAP-ENV:Body` element and return the response document.
    /// vim reports faults with status 500; those bodies are returned
    /// for the caller to decode. Any other non-success status is an error.
    pub async fn request(&self, body: &str) -> Result<String, SoapError> {
        let envelope = [ENVELOPE_START, body, ENVELOPE_END].concat();
        trace!("request: {}", envelope);

        let response = self
            .client
            .post(&self.endpoint)
            .body(envelope)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        trace!("response ({}): {}", status, text);

        match status {
            s if s.is_success() || s == StatusCode::INTERNAL_SERVER_ERROR => {
                Ok(text)
            }
            s => Err(SoapError::Status(s)),
        }
    }
}

async fn load_certificate(
    cert_type: &CertType,
    path: &Path,
) -> Result<Certificate, SoapError> {
    info!("loading root certificate ({:?}): {}", cert_type, path.display());
    let data = fs::read(path).await?;
    Ok(match cert_type {
        CertType::PEM => Certificate::from_pem(&data)?,
        CertType::DER => Certificate::from_der(&data)?,
    })
}

#[derive(thiserror::Error, Debug)]
pub enum SoapError {
    #[error("Request to host failed: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("Host replied with status {0}")]
    Status(StatusCode),
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("{0:?}")]
    IO(#[from] std::io::Error),
}
