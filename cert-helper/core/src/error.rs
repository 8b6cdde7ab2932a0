use std::fmt;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Identifies the object an operation failed on.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub kind: &'static str,
    pub namespace: Option<String>,
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0} not found")]
    NotFound(ObjectRef),

    #[error("permission denied on {target}: {message}")]
    PermissionDenied { target: ObjectRef, message: String },

    #[error("conflict on {target}: {message}")]
    Conflict { target: ObjectRef, message: String },

    #[error("{target} is malformed: {message}")]
    Malformed { target: ObjectRef, message: String },

    #[error("failed to reach the API server for {target}")]
    Unavailable {
        target: ObjectRef,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

// === impl ObjectRef ===

impl ObjectRef {
    pub fn cluster(kind: &'static str, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: None,
            name: name.into(),
        }
    }

    pub fn namespaced(
        kind: &'static str,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.namespace {
            Some(ref ns) => write!(f, "{} {}/{}", self.kind, ns, self.name),
            None => write!(f, "{} {}", self.kind, self.name),
        }
    }
}

// === impl Error ===

impl Error {
    pub fn malformed(target: ObjectRef, message: impl Into<String>) -> Self {
        Self::Malformed {
            target,
            message: message.into(),
        }
    }

    /// The object this error concerns.
    pub fn target(&self) -> &ObjectRef {
        match self {
            Self::NotFound(target)
            | Self::PermissionDenied { target, .. }
            | Self::Conflict { target, .. }
            | Self::Malformed { target, .. }
            | Self::Unavailable { target, .. } => target,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
