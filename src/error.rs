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

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kube Error: {0}")]
    KubeError(#[source] kube::Error),

    #[error("failed to create secret: {0}")]
    CreateSecretFailed(#[source] kube::Error),

    #[error("failed to update secret: {0}")]
    UpdateSecretFailed(#[source] kube::Error),

    #[error("failed to build config: {0}")]
    KubeconfigError(#[source] kube::config::KubeconfigError),

    #[error("failed to build config: {0}")]
    InClusterError(#[source] kube::config::InClusterError),

    #[error("failed to create a rest client: {0}")]
    CreateClientFailed(#[source] kube::Error),

    #[error("MissingObjectKey: {0}")]
    MissingObjectKey(&'static str),

    #[error("failed to set global default subscriber: {0}")]
    SetGlobalDefault(#[source] tracing::subscriber::SetGlobalDefaultError),
}

impl Error {
    /// True when the underlying API error was a 404 for the addressed object.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::KubeError(err) if is_not_found(err))
    }
}

/// True when the API rejected a create because the object already exists.
///
/// Matches on the response reason rather than the bare 409 status, which also
/// covers resource version conflicts.
pub fn is_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.reason == "AlreadyExists")
}

/// True when the API answered 404 for the addressed object.
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 404)
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use kube::core::ErrorResponse;

    use super::*;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: reason.to_string(),
            reason: reason.to_string(),
            code,
        })
    }

    #[test]
    fn already_exists_requires_the_reason() {
        assert!(is_already_exists(&api_error(409, "AlreadyExists")));
        assert!(!is_already_exists(&api_error(409, "Conflict")));
        assert!(!is_already_exists(&api_error(404, "NotFound")));
    }

    #[test]
    fn not_found_matches_the_code() {
        assert!(is_not_found(&api_error(404, "NotFound")));
        assert!(!is_not_found(&api_error(500, "InternalError")));

        let wrapped = Error::KubeError(api_error(404, "NotFound"));
        assert!(wrapped.is_not_found());

        let other = Error::MissingObjectKey(".metadata.name");
        assert!(!other.is_not_found());
    }
}
