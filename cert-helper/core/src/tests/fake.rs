//! An in-memory cluster implementing both collaborator traits.

use crate::{
    CustomResourceDefinition, Error, MutatingWebhookConfiguration, ObjectRef, Result, Secret,
    SecretStore, ValidatingWebhookConfiguration, WebhookRegistry,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use parking_lot::Mutex;
use std::{collections::BTreeMap, sync::Arc};

#[derive(Clone, Debug, Default)]
pub struct FakeCluster(Arc<Mutex<State>>);

#[derive(Debug, Default)]
struct State {
    version: u64,
    secrets: BTreeMap<(String, String), Secret>,
    validating: BTreeMap<String, ValidatingWebhookConfiguration>,
    mutating: BTreeMap<String, MutatingWebhookConfiguration>,
    crds: BTreeMap<String, CustomResourceDefinition>,
    /// When set, every webhook configuration read is followed by a write from
    /// another client, so the reader's replace conflicts.
    racing_writes: bool,
}

// === impl FakeCluster ===

impl FakeCluster {
    pub fn with_validating(self, mut config: ValidatingWebhookConfiguration) -> Self {
        let mut state = self.0.lock();
        let name = stamp(&mut state.version, &mut config.metadata);
        state.validating.insert(name, config);
        drop(state);
        self
    }

    pub fn with_mutating(self, mut config: MutatingWebhookConfiguration) -> Self {
        let mut state = self.0.lock();
        let name = stamp(&mut state.version, &mut config.metadata);
        state.mutating.insert(name, config);
        drop(state);
        self
    }

    pub fn with_crd(self, mut crd: CustomResourceDefinition) -> Self {
        let mut state = self.0.lock();
        let name = stamp(&mut state.version, &mut crd.metadata);
        state.crds.insert(name, crd);
        drop(state);
        self
    }

    pub fn with_secret(self, namespace: &str, mut secret: Secret) -> Self {
        let mut state = self.0.lock();
        let name = stamp(&mut state.version, &mut secret.metadata);
        state.secrets.insert((namespace.to_string(), name), secret);
        drop(state);
        self
    }

    pub fn with_racing_writes(self) -> Self {
        self.0.lock().racing_writes = true;
        self
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        let key = (namespace.to_string(), name.to_string());
        self.0.lock().secrets.get(&key).cloned()
    }

    pub fn validating(&self, name: &str) -> Option<ValidatingWebhookConfiguration> {
        self.0.lock().validating.get(name).cloned()
    }

    pub fn mutating(&self, name: &str) -> Option<MutatingWebhookConfiguration> {
        self.0.lock().mutating.get(name).cloned()
    }

    pub fn crd(&self, name: &str) -> Option<CustomResourceDefinition> {
        self.0.lock().crds.get(name).cloned()
    }

    /// Simulates a write by another client between our read and write.
    pub fn touch_validating(&self, name: &str) {
        let mut state = self.0.lock();
        let State {
            version,
            validating,
            ..
        } = &mut *state;
        if let Some(config) = validating.get_mut(name) {
            stamp(version, &mut config.metadata);
        }
    }
}

/// Assigns a fresh resource version and returns the object's name.
fn stamp(version: &mut u64, metadata: &mut ObjectMeta) -> String {
    *version += 1;
    metadata.resource_version = Some(version.to_string());
    metadata.name.clone().unwrap_or_default()
}

fn replace<T>(
    version: &mut u64,
    objects: &mut BTreeMap<String, T>,
    target: ObjectRef,
    mut object: T,
    metadata: impl Fn(&mut T) -> &mut ObjectMeta,
) -> Result<T>
where
    T: Clone,
{
    let current = objects
        .get_mut(&target.name)
        .ok_or_else(|| Error::NotFound(target.clone()))?;
    if metadata(current).resource_version != metadata(&mut object).resource_version {
        return Err(Error::Conflict {
            target,
            message: "the object has been modified".to_string(),
        });
    }
    stamp(version, metadata(&mut object));
    *current = object.clone();
    Ok(object)
}

#[async_trait::async_trait]
impl SecretStore for FakeCluster {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        Ok(self.secret(namespace, name))
    }

    async fn create(&self, namespace: &str, mut secret: Secret) -> Result<Secret> {
        let mut state = self.0.lock();
        let name = secret.metadata.name.clone().unwrap_or_default();
        let key = (namespace.to_string(), name.clone());
        if state.secrets.contains_key(&key) {
            return Err(Error::Conflict {
                target: ObjectRef::namespaced("Secret", namespace, name),
                message: "already exists".to_string(),
            });
        }
        stamp(&mut state.version, &mut secret.metadata);
        state.secrets.insert(key, secret.clone());
        Ok(secret)
    }
}

#[async_trait::async_trait]
impl WebhookRegistry for FakeCluster {
    async fn get_validating(&self, name: &str) -> Result<ValidatingWebhookConfiguration> {
        let mut state = self.0.lock();
        let State {
            version,
            validating,
            racing_writes,
            ..
        } = &mut *state;
        let config = validating.get_mut(name).ok_or_else(|| {
            Error::NotFound(ObjectRef::cluster("ValidatingWebhookConfiguration", name))
        })?;
        let read = config.clone();
        if *racing_writes {
            stamp(version, &mut config.metadata);
        }
        Ok(read)
    }

    async fn replace_validating(
        &self,
        config: ValidatingWebhookConfiguration,
    ) -> Result<ValidatingWebhookConfiguration> {
        let mut state = self.0.lock();
        let State {
            version,
            validating,
            ..
        } = &mut *state;
        let target = ObjectRef::cluster(
            "ValidatingWebhookConfiguration",
            config.metadata.name.clone().unwrap_or_default(),
        );
        replace(version, validating, target, config, |c| &mut c.metadata)
    }

    async fn get_mutating(&self, name: &str) -> Result<MutatingWebhookConfiguration> {
        let mut state = self.0.lock();
        let State {
            version,
            mutating,
            racing_writes,
            ..
        } = &mut *state;
        let config = mutating.get_mut(name).ok_or_else(|| {
            Error::NotFound(ObjectRef::cluster("MutatingWebhookConfiguration", name))
        })?;
        let read = config.clone();
        if *racing_writes {
            stamp(version, &mut config.metadata);
        }
        Ok(read)
    }

    async fn replace_mutating(
        &self,
        config: MutatingWebhookConfiguration,
    ) -> Result<MutatingWebhookConfiguration> {
        let mut state = self.0.lock();
        let State {
            version, mutating, ..
        } = &mut *state;
        let target = ObjectRef::cluster(
            "MutatingWebhookConfiguration",
            config.metadata.name.clone().unwrap_or_default(),
        );
        replace(version, mutating, target, config, |c| &mut c.metadata)
    }

    async fn get_crd(&self, name: &str) -> Result<CustomResourceDefinition> {
        self.crd(name)
            .ok_or_else(|| Error::NotFound(ObjectRef::cluster("CustomResourceDefinition", name)))
    }

    async fn replace_crd(&self, crd: CustomResourceDefinition) -> Result<CustomResourceDefinition> {
        let mut state = self.0.lock();
        let State { version, crds, .. } = &mut *state;
        let target = ObjectRef::cluster(
            "CustomResourceDefinition",
            crd.metadata.name.clone().unwrap_or_default(),
        );
        replace(version, crds, target, crd, |c| &mut c.metadata)
    }
}
