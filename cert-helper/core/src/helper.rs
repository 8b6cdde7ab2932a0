use crate::{
    Error, FailurePolicy, ObjectRef, Result, Secret, SecretStore, WebhookRegistry, CA_KEY,
    INJECT_CA_FROM_ANNOTATION, ROOT_CERT_NAME,
};
use k8s_openapi::{apimachinery::pkg::apis::meta::v1::ObjectMeta, ByteString};
use std::{collections::BTreeMap, fmt};
use tracing::{debug, info, warn};

/// Reads and writes the webhook CA and distributes it to the objects that must
/// trust it.
#[derive(Clone, Debug)]
pub struct CertHelper<S, R> {
    secrets: S,
    registry: R,
}

/// A CA bundle with the serving certificate and key it signed.
#[derive(Clone, PartialEq, Eq)]
pub struct CertBundle {
    pub ca: Vec<u8>,
    pub cert: Vec<u8>,
    pub key: Vec<u8>,
}

/// Describes which objects receive the CA bundle.
#[derive(Clone, Debug, Default)]
pub struct WebhookPatch {
    /// Name shared by the validating and mutating webhook configurations.
    pub configuration_name: String,
    pub ca: Vec<u8>,
    /// When set, overrides the failure policy of every webhook entry.
    pub failure_policy: Option<FailurePolicy>,
    pub patch_mutating: bool,
    pub patch_validating: bool,
    /// Namespace of the webhook service that CRD conversions are sent to.
    pub target_namespace: String,
    pub crds: Vec<String>,
}

/// The outcome of a webhook patch.
#[derive(Debug, Default)]
pub struct PatchReport {
    pub validating: bool,
    pub mutating: bool,
    pub crds: Vec<CrdOutcome>,
}

#[derive(Debug)]
pub struct CrdOutcome {
    pub name: String,
    pub result: Result<()>,
}

// === impl CertHelper ===

impl<S, R> CertHelper<S, R>
where
    S: SecretStore,
    R: WebhookRegistry,
{
    pub fn new(secrets: S, registry: R) -> Self {
        Self { secrets, registry }
    }

    /// Returns the CA stored in the named secret, or `None` if the secret does
    /// not exist yet.
    pub async fn fetch_ca(&self, secret_name: &str, namespace: &str) -> Result<Option<Vec<u8>>> {
        debug!(%namespace, secret = %secret_name, "Getting secret");
        let secret = match self.secrets.get(namespace, secret_name).await? {
            Some(secret) => secret,
            None => {
                info!(%namespace, secret = %secret_name, "No secret found");
                return Ok(None);
            }
        };

        let ca = secret
            .data
            .and_then(|mut data| data.remove(CA_KEY))
            .ok_or_else(|| {
                Error::malformed(
                    ObjectRef::namespaced("Secret", namespace, secret_name),
                    format!("secret does not contain a {CA_KEY:?} key"),
                )
            })?;
        debug!(%namespace, secret = %secret_name, "Got secret");
        Ok(Some(ca.0))
    }

    /// Creates a secret holding the bundle. The CA is always stored under
    /// `"ca"`; the certificate and key under the given key names.
    ///
    /// This never updates an existing secret.
    pub async fn save_certs(
        &self,
        secret_name: &str,
        namespace: &str,
        cert_key: &str,
        key_key: &str,
        bundle: &CertBundle,
    ) -> Result<()> {
        let target = || ObjectRef::namespaced("Secret", namespace, secret_name);
        if cert_key == CA_KEY || key_key == CA_KEY || cert_key == key_key {
            return Err(Error::malformed(
                target(),
                format!("key names must be distinct from each other and from {CA_KEY:?}"),
            ));
        }

        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(secret_name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            data: Some(bundle.to_secret_data(cert_key, key_key)),
            ..Default::default()
        };

        debug!(%namespace, secret = %secret_name, "Saving secret");
        self.secrets.create(namespace, secret).await?;
        info!(%namespace, secret = %secret_name, "Saved secret");
        Ok(())
    }

    /// Writes the CA into the named webhook configurations and CRDs.
    ///
    /// Failing to patch a webhook configuration aborts the patch. CRDs are
    /// patched independently and their failures are reported, not returned.
    pub async fn patch_webhook_configurations(&self, patch: &WebhookPatch) -> Result<PatchReport> {
        info!(
            name = %patch.configuration_name,
            mutating = patch.patch_mutating,
            validating = patch.patch_validating,
            failure_policy = ?patch.failure_policy,
            "Patching webhook configurations"
        );
        let mut report = PatchReport::default();

        if patch.patch_validating {
            let mut config = self
                .registry
                .get_validating(&patch.configuration_name)
                .await?;
            for hook in config.webhooks.iter_mut().flatten() {
                patch_entry(
                    &mut hook.client_config.ca_bundle,
                    &mut hook.failure_policy,
                    patch,
                );
            }
            self.registry.replace_validating(config).await?;
            report.validating = true;
            debug!("Patched validating webhook configuration");
        } else {
            debug!("Validating webhook configuration patching not required");
        }

        if patch.patch_mutating {
            let mut config = self
                .registry
                .get_mutating(&patch.configuration_name)
                .await?;
            for hook in config.webhooks.iter_mut().flatten() {
                patch_entry(
                    &mut hook.client_config.ca_bundle,
                    &mut hook.failure_policy,
                    patch,
                );
            }
            self.registry.replace_mutating(config).await?;
            report.mutating = true;
            debug!("Patched mutating webhook configuration");
        } else {
            debug!("Mutating webhook configuration patching not required");
        }

        for name in &patch.crds {
            let result = self
                .patch_crd(name, &patch.ca, &patch.target_namespace)
                .await;
            match result {
                Ok(()) => info!(crd = %name, "Patched CRD conversion webhook"),
                Err(ref error) => warn!(crd = %name, %error, "Failed to patch CRD"),
            }
            report.crds.push(CrdOutcome {
                name: name.clone(),
                result,
            });
        }

        info!(
            crds.failed = report.failed_crds().count(),
            "Patched webhook configurations"
        );
        Ok(report)
    }

    async fn patch_crd(&self, name: &str, ca: &[u8], namespace: &str) -> Result<()> {
        let mut crd = self.registry.get_crd(name).await?;
        let target = || ObjectRef::cluster("CustomResourceDefinition", name);

        let client_config = crd
            .spec
            .conversion
            .as_mut()
            .and_then(|conversion| conversion.webhook.as_mut())
            .and_then(|webhook| webhook.client_config.as_mut())
            .ok_or_else(|| Error::malformed(target(), "no conversion webhook client config"))?;
        let service = client_config
            .service
            .as_mut()
            .ok_or_else(|| Error::malformed(target(), "conversion webhook has no service"))?;
        service.namespace = namespace.to_string();
        client_config.ca_bundle = Some(ByteString(ca.to_vec()));

        crd.metadata
            .annotations
            .get_or_insert_with(Default::default)
            .insert(
                INJECT_CA_FROM_ANNOTATION.to_string(),
                format!("{namespace}/{ROOT_CERT_NAME}"),
            );

        self.registry.replace_crd(crd).await?;
        Ok(())
    }
}

fn patch_entry(
    ca_bundle: &mut Option<ByteString>,
    failure_policy: &mut Option<String>,
    patch: &WebhookPatch,
) {
    *ca_bundle = Some(ByteString(patch.ca.clone()));
    if let Some(policy) = patch.failure_policy {
        *failure_policy = Some(policy.to_string());
    }
}

// === impl CertBundle ===

impl CertBundle {
    fn to_secret_data(&self, cert_key: &str, key_key: &str) -> BTreeMap<String, ByteString> {
        [
            (CA_KEY.to_string(), ByteString(self.ca.clone())),
            (cert_key.to_string(), ByteString(self.cert.clone())),
            (key_key.to_string(), ByteString(self.key.clone())),
        ]
        .into_iter()
        .collect()
    }
}

impl fmt::Debug for CertBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertBundle")
            .field("ca.len", &self.ca.len())
            .field("cert.len", &self.cert.len())
            .finish_non_exhaustive()
    }
}

// === impl PatchReport ===

impl PatchReport {
    /// True when every requested CRD was patched.
    pub fn is_complete(&self) -> bool {
        self.failed_crds().next().is_none()
    }

    pub fn failed_crds(&self) -> impl Iterator<Item = (&str, &Error)> + '_ {
        self.crds.iter().filter_map(|CrdOutcome { name, result }| {
            result.as_ref().err().map(|error| (name.as_str(), error))
        })
    }
}
