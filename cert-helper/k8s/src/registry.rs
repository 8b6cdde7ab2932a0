use crate::classify;
use kube::{
    api::{Api, PostParams},
    Client, Resource,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use vela_cert_helper_core::{
    CustomResourceDefinition, MutatingWebhookConfiguration, ObjectRef, Result,
    ValidatingWebhookConfiguration, WebhookRegistry, FIELD_MANAGER,
};

/// API handles for every cluster-scoped kind the helper writes to.
///
/// Built once per client and handed to the registry.
#[derive(Clone)]
pub struct Resources {
    pub validating: Api<ValidatingWebhookConfiguration>,
    pub mutating: Api<MutatingWebhookConfiguration>,
    pub crds: Api<CustomResourceDefinition>,
}

/// Webhook configurations and CRDs, read and replaced through the API server.
#[derive(Clone)]
pub struct KubeRegistry {
    resources: Resources,
    params: PostParams,
}

// === impl Resources ===

impl Resources {
    pub fn new(client: Client) -> Self {
        Self {
            validating: Api::all(client.clone()),
            mutating: Api::all(client.clone()),
            crds: Api::all(client),
        }
    }
}

// === impl KubeRegistry ===

impl KubeRegistry {
    pub fn new(resources: Resources) -> Self {
        Self {
            resources,
            params: PostParams {
                field_manager: Some(FIELD_MANAGER.to_string()),
                ..Default::default()
            },
        }
    }

    async fn get<K>(api: &Api<K>, name: &str) -> Result<K>
    where
        K: k8s_openapi::Resource + Clone + DeserializeOwned + Debug,
    {
        tracing::trace!(kind = %K::KIND, %name, "Getting");
        api.get(name)
            .await
            .map_err(|error| classify(object_ref::<K>(name), error))
    }

    async fn replace<K>(&self, api: &Api<K>, object: K) -> Result<K>
    where
        K: k8s_openapi::Resource
            + Resource<DynamicType = ()>
            + Clone
            + DeserializeOwned
            + Serialize
            + Debug,
    {
        let name = object.meta().name.clone().unwrap_or_default();
        tracing::trace!(
            kind = %<K as k8s_openapi::Resource>::KIND,
            %name,
            resource_version = ?object.meta().resource_version,
            "Replacing"
        );
        api.replace(&name, &self.params, &object)
            .await
            .map_err(|error| classify(object_ref::<K>(&name), error))
    }
}

fn object_ref<K: k8s_openapi::Resource>(name: &str) -> ObjectRef {
    ObjectRef::cluster(K::KIND, name)
}

#[async_trait::async_trait]
impl WebhookRegistry for KubeRegistry {
    async fn get_validating(&self, name: &str) -> Result<ValidatingWebhookConfiguration> {
        Self::get(&self.resources.validating, name).await
    }

    async fn replace_validating(
        &self,
        config: ValidatingWebhookConfiguration,
    ) -> Result<ValidatingWebhookConfiguration> {
        self.replace(&self.resources.validating, config).await
    }

    async fn get_mutating(&self, name: &str) -> Result<MutatingWebhookConfiguration> {
        Self::get(&self.resources.mutating, name).await
    }

    async fn replace_mutating(
        &self,
        config: MutatingWebhookConfiguration,
    ) -> Result<MutatingWebhookConfiguration> {
        self.replace(&self.resources.mutating, config).await
    }

    async fn get_crd(&self, name: &str) -> Result<CustomResourceDefinition> {
        Self::get(&self.resources.crds, name).await
    }

    async fn replace_crd(&self, crd: CustomResourceDefinition) -> Result<CustomResourceDefinition> {
        self.replace(&self.resources.crds, crd).await
    }
}
