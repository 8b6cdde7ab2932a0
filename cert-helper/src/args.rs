use crate::{
    core::{CertBundle, FailurePolicy, InvalidFailurePolicy, WebhookPatch},
    k8s::{self, KubeCertHelper},
};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

/// Distributes a webhook CA bundle during install.
///
/// The CA, certificate and key are stored in a secret; the CA is written into
/// the admission webhook configurations and CRD conversion webhooks that must
/// trust the webhook server.
#[derive(Debug, Parser)]
#[clap(name = "vela-cert-helper", version, about)]
pub struct Args {
    #[clap(
        long,
        default_value = "vela_cert_helper=info,warn",
        env = "VELA_CERT_HELPER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain", env = "VELA_CERT_HELPER_LOG_FORMAT")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the CA stored in a secret, if the secret exists
    GetCa(GetCa),

    /// Store a CA, certificate and key in a new secret
    Save(Save),

    /// Write the CA into webhook configurations and CRD conversion webhooks
    Patch(Patch),
}

#[derive(Debug, Parser)]
struct GetCa {
    #[clap(long)]
    secret_name: String,

    #[clap(long, short = 'n')]
    namespace: String,

    /// Write the CA to this file instead of stdout
    #[clap(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct Save {
    #[clap(long)]
    secret_name: String,

    #[clap(long, short = 'n')]
    namespace: String,

    /// Secret key holding the serving certificate
    #[clap(long, default_value = "cert")]
    cert_name: String,

    /// Secret key holding the private key
    #[clap(long, default_value = "key")]
    key_name: String,

    #[clap(long)]
    ca: PathBuf,

    #[clap(long)]
    cert: PathBuf,

    #[clap(long)]
    key: PathBuf,
}

#[derive(Debug, Parser)]
struct Patch {
    /// Name shared by the validating and mutating webhook configurations
    #[clap(long)]
    webhook_name: String,

    /// Namespace of the webhook service
    ///
    /// CRD conversion webhooks are pointed at this namespace and, with
    /// `--secret-name`, the CA is read from a secret in it.
    #[clap(long, short = 'n')]
    namespace: String,

    /// Read the CA from this file
    #[clap(long, conflicts_with = "secret_name", required_unless_present = "secret_name")]
    ca: Option<PathBuf>,

    /// Read the CA from this secret
    #[clap(long)]
    secret_name: Option<String>,

    /// Override the failure policy of every webhook (Fail or Ignore)
    ///
    /// An empty value leaves each webhook's policy unchanged.
    #[clap(long)]
    failure_policy: Option<FailurePolicyArg>,

    #[clap(
        long,
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        action = clap::ArgAction::Set
    )]
    patch_mutating: bool,

    #[clap(
        long,
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        action = clap::ArgAction::Set
    )]
    patch_validating: bool,

    /// CRDs whose conversion webhook should trust the CA
    #[clap(long, value_delimiter = ',')]
    crds: Vec<String>,
}

/// A failure policy flag value, where the empty string means unset.
#[derive(Clone, Debug, PartialEq, Eq)]
struct FailurePolicyArg(Option<FailurePolicy>);

// === impl Args ===

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            client,
            command,
        } = self;

        log_format.try_init(log_level)?;

        let client = client
            .try_client()
            .await
            .context("failed to build kubernetes client")?;
        let helper = k8s::helper(client);

        match command {
            Command::GetCa(cmd) => cmd.run(&helper).await,
            Command::Save(cmd) => cmd.run(&helper).await,
            Command::Patch(cmd) => cmd.run(&helper).await,
        }
    }
}

// === impl GetCa ===

impl GetCa {
    async fn run(self, helper: &KubeCertHelper) -> Result<()> {
        let Self {
            secret_name,
            namespace,
            output,
        } = self;

        let ca = match helper.fetch_ca(&secret_name, &namespace).await? {
            Some(ca) => ca,
            None => {
                info!(%namespace, secret = %secret_name, "Secret does not exist");
                return Ok(());
            }
        };

        match output {
            Some(path) => tokio::fs::write(&path, &ca)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?,
            None => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(&ca).await?;
                stdout.flush().await?;
            }
        }
        Ok(())
    }
}

// === impl Save ===

impl Save {
    async fn run(self, helper: &KubeCertHelper) -> Result<()> {
        let Self {
            secret_name,
            namespace,
            cert_name,
            key_name,
            ca,
            cert,
            key,
        } = self;

        let bundle = CertBundle {
            ca: read(&ca).await?,
            cert: read(&cert).await?,
            key: read(&key).await?,
        };
        helper
            .save_certs(&secret_name, &namespace, &cert_name, &key_name, &bundle)
            .await?;
        Ok(())
    }
}

// === impl Patch ===

impl Patch {
    async fn run(self, helper: &KubeCertHelper) -> Result<()> {
        let Self {
            webhook_name,
            namespace,
            ca,
            secret_name,
            failure_policy,
            patch_mutating,
            patch_validating,
            crds,
        } = self;

        let ca = match (ca, secret_name) {
            (Some(path), _) => read(&path).await?,
            (None, Some(secret)) => helper
                .fetch_ca(&secret, &namespace)
                .await?
                .ok_or_else(|| anyhow!("secret {namespace}/{secret} does not exist"))?,
            (None, None) => bail!("one of --ca or --secret-name is required"),
        };

        let patch = WebhookPatch {
            configuration_name: webhook_name,
            ca,
            failure_policy: failure_policy.and_then(|FailurePolicyArg(policy)| policy),
            patch_mutating,
            patch_validating,
            target_namespace: namespace,
            crds,
        };
        let report = helper.patch_webhook_configurations(&patch).await?;

        if !report.is_complete() {
            let failed = report
                .failed_crds()
                .map(|(name, error)| {
                    error!(crd = %name, %error, "CRD was not patched");
                    name
                })
                .collect::<Vec<_>>();
            bail!("failed to patch CRDs: {}", failed.join(", "));
        }
        Ok(())
    }
}

// === impl FailurePolicyArg ===

impl FromStr for FailurePolicyArg {
    type Err = InvalidFailurePolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FailurePolicy::parse_optional(s).map(Self)
    }
}

async fn read(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}
