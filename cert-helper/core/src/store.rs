use crate::{
    CustomResourceDefinition, MutatingWebhookConfiguration, Result, Secret,
    ValidatingWebhookConfiguration,
};

/// Name- and namespace-scoped blob storage.
#[async_trait::async_trait]
pub trait SecretStore {
    /// Returns `None` when the secret does not exist.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>>;

    /// Creates the secret, failing with a conflict if it already exists.
    async fn create(&self, namespace: &str, secret: Secret) -> Result<Secret>;
}

/// Catalog of the cluster-scoped objects that carry a CA bundle.
///
/// Writes replace the whole object and are expected to carry the resource
/// version that was read.
#[async_trait::async_trait]
pub trait WebhookRegistry {
    async fn get_validating(&self, name: &str) -> Result<ValidatingWebhookConfiguration>;

    async fn replace_validating(
        &self,
        config: ValidatingWebhookConfiguration,
    ) -> Result<ValidatingWebhookConfiguration>;

    async fn get_mutating(&self, name: &str) -> Result<MutatingWebhookConfiguration>;

    async fn replace_mutating(
        &self,
        config: MutatingWebhookConfiguration,
    ) -> Result<MutatingWebhookConfiguration>;

    async fn get_crd(&self, name: &str) -> Result<CustomResourceDefinition>;

    async fn replace_crd(&self, crd: CustomResourceDefinition) -> Result<CustomResourceDefinition>;
}
