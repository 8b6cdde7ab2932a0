#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod args;

pub use self::args::Args;
pub use vela_cert_helper_core as core;
pub use vela_cert_helper_k8s as k8s;
