//! The request metadata stage.

use std::sync::Arc;

use hickory_proto::op::ResponseCode;

use super::client_ip::client_address;
use super::{next_or_failure, Context, Handler, MetadataProvider, PluginError, Ready, Request};
use crate::health::Readiness;
use crate::observability::metrics;
use crate::routing::RoutingTable;

/// Stable plugin identifier.
pub const PLUGIN_NAME: &str = "edgecdnxprefixlist";

/// Publishes the client's location label as `"<plugin>/location"`.
pub struct PrefixListPlugin {
    next: Option<Arc<dyn Handler>>,
    table: Arc<RoutingTable>,
    readiness: Readiness,
}

impl PrefixListPlugin {
    pub fn new(table: Arc<RoutingTable>, readiness: Readiness) -> Self {
        Self {
            next: None,
            table,
            readiness,
        }
    }

    /// Set the stage this one delegates to.
    pub fn with_next(mut self, next: Arc<dyn Handler>) -> Self {
        self.next = Some(next);
        self
    }

    /// The metadata key this stage publishes.
    pub fn location_key() -> String {
        format!("{}/location", PLUGIN_NAME)
    }

    pub fn table(&self) -> &Arc<RoutingTable> {
        &self.table
    }
}

impl MetadataProvider for PrefixListPlugin {
    fn metadata(&self, ctx: &mut Context, request: &Request) {
        let client = client_address(request);
        tracing::trace!(client = ?client, "Resolved client address");

        let address = client.address();
        let table = self.table.clone();
        let readiness = self.readiness.clone();

        ctx.metadata.set_value_func(Self::location_key(), move || {
            let address = match address {
                Some(address) if readiness.is_ready() => address,
                _ => return String::new(),
            };
            let location = table.locate(address);
            metrics::record_lookup(&address, location.is_some());
            match location {
                Some(label) => {
                    tracing::debug!(address = %address, location = %label, "Located client");
                    label.to_string()
                }
                None => String::new(),
            }
        });
    }
}

impl Handler for PrefixListPlugin {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn serve_dns(&self, ctx: &mut Context, request: &Request) -> Result<ResponseCode, PluginError> {
        if !ctx.metadata.contains(&Self::location_key()) {
            self.metadata(ctx, request);
        }
        next_or_failure(self.name(), self.next.as_deref(), ctx, request)
    }
}

impl Ready for PrefixListPlugin {
    fn ready(&self) -> bool {
        self.readiness.is_ready()
    }
}
