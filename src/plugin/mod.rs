//! DNS plugin subsystem.
//!
//! # Data Flow
//! ```text
//! Host pipeline (per DNS request)
//!     → metadata phase: MetadataProvider::metadata()
//!         → client_ip.rs (ECS address, else transport source)
//!         → lazy producer registered under "<plugin>/location"
//!     → serve phase: Handler::serve_dns()
//!         → stage.rs installs the producer if missing, then delegates
//!     → downstream stage reads the key
//!         → RoutingTable::locate() runs only now
//! ```
//!
//! # Design Decisions
//! - The stage never touches the DNS message and never ends the chain
//! - Lookups cannot fail; a miss or an unusable address is ""
//! - Setup parses exactly one argument: a namespace or a directory

pub mod client_ip;
pub mod metadata;
pub mod setup;
pub mod stage;

use std::net::SocketAddr;

use hickory_proto::op::{Message, ResponseCode};
use thiserror::Error;

pub use metadata::MetadataBag;
pub use stage::{PrefixListPlugin, PLUGIN_NAME};

/// A DNS request as handed over by the host pipeline.
#[derive(Debug, Clone)]
pub struct Request {
    /// Transport source address.
    pub source: SocketAddr,
    /// Parsed request message.
    pub message: Message,
}

impl Request {
    pub fn new(source: SocketAddr, message: Message) -> Self {
        Self { source, message }
    }
}

/// Per-request state flowing through the pipeline.
#[derive(Debug, Default)]
pub struct Context {
    pub metadata: MetadataBag,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Errors a pipeline stage can return to the host.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("{0}: no next plugin found")]
    NoNextPlugin(&'static str),
}

/// A stage in the DNS serving pipeline.
pub trait Handler: Send + Sync {
    fn name(&self) -> &'static str;

    fn serve_dns(&self, ctx: &mut Context, request: &Request) -> Result<ResponseCode, PluginError>;
}

/// A stage that publishes request metadata before serving.
pub trait MetadataProvider: Send + Sync {
    fn metadata(&self, ctx: &mut Context, request: &Request);
}

/// Readiness reported to the host.
pub trait Ready: Send + Sync {
    fn ready(&self) -> bool;
}

/// Delegate to `next`, or fail with `SERVFAIL` if the chain ends here.
pub fn next_or_failure(
    name: &'static str,
    next: Option<&dyn Handler>,
    ctx: &mut Context,
    request: &Request,
) -> Result<ResponseCode, PluginError> {
    match next {
        Some(next) => next.serve_dns(ctx, request),
        None => {
            tracing::warn!(plugin = name, "No next plugin in chain");
            Err(PluginError::NoNextPlugin(name))
        }
    }
}

impl PluginError {
    /// The response code the host should answer with.
    pub fn response_code(&self) -> ResponseCode {
        ResponseCode::ServFail
    }
}
