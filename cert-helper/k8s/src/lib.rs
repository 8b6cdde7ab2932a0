#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Binds the certificate helper to the Kubernetes API.

mod error;
mod registry;
mod secrets;

pub use self::{
    error::classify,
    registry::{KubeRegistry, Resources},
    secrets::KubeSecrets,
};
pub use kube::Client;
use vela_cert_helper_core::CertHelper;

pub type KubeCertHelper = CertHelper<KubeSecrets, KubeRegistry>;

/// Builds a helper whose secret and registry handles share `client`.
pub fn helper(client: Client) -> KubeCertHelper {
    let resources = Resources::new(client.clone());
    CertHelper::new(KubeSecrets::new(client), KubeRegistry::new(resources))
}
