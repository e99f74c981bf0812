// Copyright 2023 The Skene Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, DeleteParams, PostParams};
use kube::core::ObjectMeta;
use kube::{Client, ResourceExt};
use tracing::{error, info};

use super::error::{is_already_exists, is_not_found, Error, Result};

/// Secret lifecycle handler trait
#[async_trait]
pub trait Handler: Send + Sync {
    /// Creates the secret, falling back to exactly one update when it
    /// already exists. `None` is answered with `Ok(None)` without touching
    /// the API.
    async fn create_or_update(&self, secret: Option<&Secret>) -> Result<Option<Secret>>;

    /// Deletes the secret named by `meta`. Failures are logged and
    /// swallowed; deleting an absent secret is silent success.
    async fn delete(&self, meta: &ObjectMeta);

    /// Fetches the secret named by `meta`, surfacing every error including
    /// not-found.
    async fn get(&self, meta: &ObjectMeta) -> Result<Secret>;
}

/// The kube backed handler, scoping an API to the secret's own namespace on
/// every call.
pub struct KubeHandler {
    client: Client,
}

impl KubeHandler {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl Handler for KubeHandler {
    async fn create_or_update(&self, secret: Option<&Secret>) -> Result<Option<Secret>> {
        let secret = match secret {
            Some(secret) => secret,
            None => return Ok(None),
        };

        let namespace = secret
            .namespace()
            .ok_or_else(|| Error::MissingObjectKey(".metadata.namespace"))?;
        let name = secret.name_any();
        let api = self.secrets(&namespace);

        match api.create(&PostParams::default(), secret).await {
            Ok(created) => {
                info!("Created Secret {} in {}", name, namespace);
                Ok(Some(created))
            }
            Err(err) if is_already_exists(&err) => {
                let updated = api
                    .replace(&name, &PostParams::default(), secret)
                    .await
                    .map_err(Error::UpdateSecretFailed)?;
                info!("Updated Secret {} in {}", name, namespace);
                Ok(Some(updated))
            }
            Err(err) => Err(Error::CreateSecretFailed(err)),
        }
    }

    async fn delete(&self, meta: &ObjectMeta) {
        let (name, namespace) = match (&meta.name, &meta.namespace) {
            (Some(name), Some(namespace)) => (name, namespace),
            _ => {
                error!("Cannot delete a Secret without a name and namespace");
                return;
            }
        };

        if let Err(err) = self.secrets(namespace).delete(name, &DeleteParams::default()).await {
            if !is_not_found(&err) {
                error!("Failed to delete Secret {} in {}: {}", name, namespace, err);
            }
        }
    }

    async fn get(&self, meta: &ObjectMeta) -> Result<Secret> {
        let name = meta
            .name
            .as_deref()
            .ok_or_else(|| Error::MissingObjectKey(".metadata.name"))?;
        let namespace = meta
            .namespace
            .as_deref()
            .ok_or_else(|| Error::MissingObjectKey(".metadata.namespace"))?;

        self.secrets(namespace).get(name).await.map_err(Error::KubeError)
    }
}
