#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Distributes a webhook CA bundle during controller bootstrap.
//!
//! The CA, serving certificate and key are persisted in a `Secret`, and the CA
//! is pushed into admission webhook configurations and CRD conversion webhooks
//! so that the API server trusts the controller's webhook endpoint.

mod error;
mod failure_policy;
mod helper;
mod store;


pub use self::{
    error::{Error, ObjectRef, Result},
    failure_policy::{FailurePolicy, InvalidFailurePolicy},
    helper::{CertBundle, CertHelper, CrdOutcome, PatchReport, WebhookPatch},
    store::{SecretStore, WebhookRegistry},
};
pub use k8s_openapi::{
    api::{
        admissionregistration::v1::{MutatingWebhookConfiguration, ValidatingWebhookConfiguration},
        core::v1::Secret,
    },
    apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition,
};

/// The secret key under which the CA bundle is stored.
pub const CA_KEY: &str = "ca";

/// Annotation read by cert-manager's CA injector on patched CRDs.
pub const INJECT_CA_FROM_ANNOTATION: &str = "cert-manager.io/inject-ca-from";

/// Name of the root certificate that `INJECT_CA_FROM_ANNOTATION` points at.
pub const ROOT_CERT_NAME: &str = "kubevela-vela-core-root-cert";

/// Field manager used for every write.
pub const FIELD_MANAGER: &str = "vela-cert-helper";
