use vela_cert_helper_core::{Error, ObjectRef};

/// Maps a client error onto the helper's error kinds.
///
/// API status codes decide the kind; transport and decoding failures are
/// reported as `Unavailable`.
pub fn classify(target: ObjectRef, error: kube::Error) -> Error {
    let rsp = match error {
        kube::Error::Api(rsp) => rsp,
        error => {
            return Error::Unavailable {
                target,
                source: Box::new(error),
            }
        }
    };

    match rsp.code {
        404 => Error::NotFound(target),
        401 | 403 => Error::PermissionDenied {
            target,
            message: rsp.message,
        },
        409 => Error::Conflict {
            target,
            message: rsp.message,
        },
        400 | 422 => Error::Malformed {
            target,
            message: rsp.message,
        },
        _ => Error::Unavailable {
            target,
            source: Box::new(kube::Error::Api(rsp)),
        },
    }
}
