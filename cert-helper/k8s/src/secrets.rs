use crate::classify;
use kube::{
    api::{Api, PostParams},
    Client,
};
use vela_cert_helper_core::{ObjectRef, Result, Secret, SecretStore, FIELD_MANAGER};

/// Secret storage backed by the core/v1 `Secret` API.
#[derive(Clone)]
pub struct KubeSecrets {
    client: Client,
}

// === impl KubeSecrets ===

impl KubeSecrets {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait::async_trait]
impl SecretStore for KubeSecrets {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        tracing::trace!(%namespace, %name, "Getting secret");
        self.api(namespace)
            .get_opt(name)
            .await
            .map_err(|error| classify(ObjectRef::namespaced("Secret", namespace, name), error))
    }

    async fn create(&self, namespace: &str, secret: Secret) -> Result<Secret> {
        let name = secret.metadata.name.clone().unwrap_or_default();
        tracing::trace!(%namespace, %name, "Creating secret");
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        self.api(namespace)
            .create(&params, &secret)
            .await
            .map_err(|error| classify(ObjectRef::namespaced("Secret", namespace, name), error))
    }
}
