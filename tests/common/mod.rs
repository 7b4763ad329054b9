//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use edge_prefixlist::plugin::Request;
use hickory_proto::op::{Edns, Message};
use hickory_proto::rr::rdata::opt::{ClientSubnet, EdnsOption};

/// Write a `routing:` document mapping `v4` prefixes to `location`.
pub fn write_list(dir: &Path, file: &str, location: &str, v4: &[(&str, u8)]) -> PathBuf {
    let mut text = format!("routing:\n  location: {}\n  prefix:\n    v4:\n", location);
    for (address, size) in v4 {
        text.push_str(&format!("      - address: {}\n        size: {}\n", address, size));
    }
    let path = dir.join(file);
    fs::write(&path, text).unwrap();
    path
}

/// A request without EDNS from `source`.
pub fn plain_request(source: &str) -> Request {
    Request::new(source.parse().unwrap(), Message::new())
}

/// A request from `source` carrying a Client Subnet option.
pub fn ecs_request(source: &str, subnet: &str, prefix: u8) -> Request {
    let mut edns = Edns::new();
    edns.options_mut()
        .insert(EdnsOption::Subnet(ClientSubnet::new(subnet.parse().unwrap(), prefix, 0)));
    let mut message = Message::new();
    message.set_edns(edns);
    Request::new(source.parse().unwrap(), message)
}

/// Poll `check` every 50ms until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
