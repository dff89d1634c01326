/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::request::Request;
use super::response::{self, parse_envelope};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::service::{
    PropertyCollector, RetrieveOptions, RetrievePage, UpdateSet, WaitOptions,
};
use crate::soap::SoapClient;
use crate::types::{
    ContinuationToken, Cursor, FilterHandle, ManagedObjectHandle, WatchSpec,
};
use crate::value::Value;

/// Well-known objects of a vCenter or ESXi endpoint.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ServiceContent {
    pub root_folder: ManagedObjectHandle,
    pub property_collector: ManagedObjectHandle,
    pub session_manager: ManagedObjectHandle,
    /// Product name and build, e.g. "VMware vCenter Server 7.0.3 build-...".
    pub about: Option<String>,
}

/// An authenticated vim25 session. All calls share the session cookie, so
/// the session (and the property collector behind it) must not be shared
/// between independent consumers of the change feed.
#[derive(Debug)]
pub struct Session {
    client: SoapClient,
    content: ServiceContent,
}

impl Session {
    pub async fn connect(config: &Config) -> Result<Self> {
        let client = SoapClient::create(config.endpoint().await?, config).await?;

        let returnval = call(&client, &Request::RetrieveServiceContent).await?;
        let content = response::service_content(returnval)?;
        info!(
            "connected to {} ({})",
            client.endpoint(),
            content.about.as_deref().unwrap_or("unknown product")
        );

        if let Some(credentials) = &config.credentials {
            let password = credentials.password.as_deref().ok_or_else(|| {
                Error::MissingPassword(credentials.username.clone())
            })?;
            let user = call(
                &client,
                &Request::Login {
                    session_manager: &content.session_manager,
                    username: &credentials.username,
                    password,
                },
            )
            .await?;
            info!(
                "logged in as {}",
                user.as_ref()
                    .and_then(|u| u.get("userName"))
                    .and_then(Value::as_str)
                    .unwrap_or(&credentials.username)
            );
        }

        Ok(Self { client, content })
    }

    pub fn content(&self) -> &ServiceContent {
        &self.content
    }

    pub fn root_folder(&self) -> &ManagedObjectHandle {
        &self.content.root_folder
    }

    /// End the session on the server. Filters still registered on it are
    /// released by the server.
    pub async fn logout(&self) -> Result<()> {
        self.call(&Request::Logout {
            session_manager: &self.content.session_manager,
        })
        .await?;
        info!("logged out from {}", self.client.endpoint());
        Ok(())
    }

    async fn call(&self, request: &Request<'_>) -> Result<Option<Value>> {
        call(&self.client, request).await
    }
}

async fn call(
    client: &SoapClient,
    request: &Request<'_>,
) -> Result<Option<Value>> {
    let op = request.operation();
    debug!("calling {}", op);
    let data = client.request(&request.to_string()?).await?;
    parse_envelope(&data)?.into_result(op)
}

#[async_trait]
impl PropertyCollector for Session {
    async fn create_filter(
        &self,
        spec: &WatchSpec,
        partial_updates: bool,
    ) -> Result<FilterHandle> {
        let returnval = self
            .call(&Request::CreateFilter {
                collector: &self.content.property_collector,
                spec,
                partial_updates,
            })
            .await?;
        Ok(FilterHandle::new(response::handle(returnval)?))
    }

    async fn wait_for_updates(
        &self,
        version: &Cursor,
        options: &WaitOptions,
    ) -> Result<Option<UpdateSet>> {
        let returnval = self
            .call(&Request::WaitForUpdatesEx {
                collector: &self.content.property_collector,
                version,
                options,
            })
            .await?;
        response::update_set(returnval)
    }

    async fn destroy_filter(&self, filter: &FilterHandle) -> Result<()> {
        self.call(&Request::DestroyPropertyFilter { filter }).await?;
        Ok(())
    }

    async fn retrieve_properties(
        &self,
        spec: &WatchSpec,
        options: &RetrieveOptions,
    ) -> Result<RetrievePage> {
        let returnval = self
            .call(&Request::RetrievePropertiesEx {
                collector: &self.content.property_collector,
                spec,
                options,
            })
            .await?;
        response::retrieve_result(returnval)
    }

    async fn continue_retrieve(
        &self,
        token: &ContinuationToken,
    ) -> Result<RetrievePage> {
        let returnval = self
            .call(&Request::ContinueRetrievePropertiesEx {
                collector: &self.content.property_collector,
                token,
            })
            .await?;
        response::retrieve_result(returnval)
    }
}
