//! Typed wrappers over the fan-out client

use std::collections::HashMap;

use muster_core::{ClientConfig, NodeAddress};
use muster_fabric::transport::{Connector, TcpConnector};
use muster_fabric::{FanOutClient, Outcome, ResultMap};
use serde_json::{json, Map, Value};
use tracing::{debug, error, warn};

use crate::error::Result;
use crate::flatten::Flatten;
use crate::procedures;
use crate::retry::RetryPolicy;

/// Keys every `node_info` answer is expected to carry, with the placeholder
/// used when a node did not report one
pub const NODE_INFO_DEFAULTS: &[(&str, &str)] = &[
    ("memory_total", "-"),
    ("memory_dom0", "-"),
    ("memory_free", "-"),
    ("vg_size", "node_unreachable"),
    ("vg_free", "-"),
];

/// Named procedures with their argument and result conventions
pub struct Catalog<K = TcpConnector> {
    client: FanOutClient<K>,
    retry: RetryPolicy,
}

impl Catalog<TcpConnector> {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self::from_client(FanOutClient::new(config)?))
    }
}

impl<K: Connector> Catalog<K> {
    pub fn from_client(client: FanOutClient<K>) -> Self {
        Self {
            client,
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn client(&self) -> &FanOutClient<K> {
        &self.client
    }

    /// Call any procedure, retrying failed nodes if it is idempotent
    pub async fn call<I>(&self, procedure: &str, args: &[Value], nodes: I) -> Result<ResultMap>
    where
        I: IntoIterator,
        I::Item: Into<NodeAddress>,
    {
        let mut results = self.client.call(procedure, args, nodes).await?;
        if !procedures::is_idempotent(procedure) {
            return Ok(results);
        }

        for attempt in 1..=self.retry.retries {
            let failed: Vec<NodeAddress> = results
                .iter()
                .filter(|(_, outcome)| outcome.is_network_failure())
                .map(|(node, _)| node.clone())
                .collect();
            if failed.is_empty() {
                break;
            }

            debug!(procedure, attempt, nodes = failed.len(), "retrying failed nodes");
            if !self.retry.backoff.is_zero() {
                tokio::time::sleep(self.retry.backoff).await;
            }
            let retried = self.client.call(procedure, args, failed).await?;
            results.update(retried);
        }

        Ok(results)
    }

    async fn call_single(
        &self,
        procedure: &str,
        args: &[Value],
        node: &NodeAddress,
    ) -> Result<Outcome> {
        let mut results = self.call(procedure, args, [node]).await?;
        Ok(results
            .remove(node)
            .unwrap_or_else(|| Outcome::ConnectFailure("node missing from results".to_string())))
    }

    /// Single-node call that degrades every failure, and any non-boolean
    /// answer, to `false`
    async fn call_bool(&self, procedure: &str, args: &[Value], node: &NodeAddress) -> Result<bool> {
        let outcome = self.call_single(procedure, args, node).await?;
        Ok(single_or_default(procedure, node, outcome, false, |value| value.as_bool()))
    }

    /// Logical volumes in `vg_name` on each node
    pub async fn volume_list(&self, nodes: &[NodeAddress], vg_name: &str) -> Result<ResultMap> {
        self.call("volume_list", &[json!(vg_name)], nodes).await
    }

    /// Volume groups and their sizes on each node
    pub async fn vg_list(&self, nodes: &[NodeAddress]) -> Result<ResultMap> {
        self.call("vg_list", &[], nodes).await
    }

    /// Protocol version each node daemon speaks
    pub async fn version(&self, nodes: &[NodeAddress]) -> Result<ResultMap> {
        self.call("version", &[], nodes).await
    }

    pub async fn node_volumes(&self, nodes: &[NodeAddress]) -> Result<ResultMap> {
        self.call("node_volumes", &[], nodes).await
    }

    pub async fn instance_list(
        &self,
        nodes: &[NodeAddress],
        hypervisors: &[String],
    ) -> Result<ResultMap> {
        self.call("instance_list", &[json!(hypervisors)], nodes).await
    }

    pub async fn export_list(&self, nodes: &[NodeAddress]) -> Result<ResultMap> {
        self.call("export_list", &[], nodes).await
    }

    /// Ask nodes to sleep for `duration` seconds
    pub async fn test_delay(&self, nodes: &[NodeAddress], duration: f64) -> Result<ResultMap> {
        self.call("test_delay", &[json!(duration)], nodes).await
    }

    /// Whether every bridge in `bridges` exists on `node`
    pub async fn bridges_exist(&self, node: &NodeAddress, bridges: &[String]) -> Result<bool> {
        self.call_bool("bridges_exist", &[json!(bridges)], node).await
    }

    pub async fn node_has_ip_address(&self, node: &NodeAddress, address: &str) -> Result<bool> {
        self.call_bool("node_has_ip_address", &[json!(address)], node).await
    }

    /// Ask `node` to TCP-ping `target:port` from `source`
    pub async fn node_tcp_ping(
        &self,
        node: &NodeAddress,
        source: &str,
        target: &str,
        port: u16,
        timeout_secs: u64,
        live_port_needed: bool,
    ) -> Result<bool> {
        let args = [
            json!(source),
            json!(target),
            json!(port),
            json!(timeout_secs),
            json!(live_port_needed),
        ];
        self.call_bool("node_tcp_ping", &args, node).await
    }

    pub async fn node_leave_cluster(&self, node: &NodeAddress) -> Result<bool> {
        self.call_bool("node_leave_cluster", &[], node).await
    }

    /// Stop `instance` on `node`
    pub async fn instance_shutdown(
        &self,
        node: &NodeAddress,
        instance: &impl Flatten,
    ) -> Result<bool> {
        let args = [instance.flatten()?];
        self.call_bool("instance_shutdown", &args, node).await
    }

    /// Look up a block device; failures are returned as-is
    pub async fn blockdev_find(&self, node: &NodeAddress, disk: &impl Flatten) -> Result<Outcome> {
        let args = [disk.flatten()?];
        self.call_single("blockdev_find", &args, node).await
    }

    pub async fn blockdev_remove(&self, node: &NodeAddress, disk: &impl Flatten) -> Result<bool> {
        let args = [disk.flatten()?];
        self.call_bool("blockdev_remove", &args, node).await
    }

    /// Memory and volume group figures for each node
    ///
    /// Every node gets an entry; unreachable nodes and missing keys are
    /// filled from [`NODE_INFO_DEFAULTS`].
    pub async fn node_info(
        &self,
        nodes: &[NodeAddress],
        vg_name: &str,
        hypervisor: &str,
    ) -> Result<HashMap<NodeAddress, Map<String, Value>>> {
        let results = self
            .call("node_info", &[json!(vg_name), json!(hypervisor)], nodes)
            .await?;

        Ok(results
            .into_iter()
            .map(|(node, outcome)| {
                let mut info = match outcome {
                    Outcome::Success(Value::Object(info)) => info,
                    other => {
                        error!(node = %node, outcome = %other, "could not get node info");
                        Map::new()
                    }
                };
                for (key, placeholder) in NODE_INFO_DEFAULTS {
                    if !info.contains_key(*key) {
                        warn!(node = %node, key, "node_info missing key, using placeholder");
                        info.insert(key.to_string(), json!(placeholder));
                    }
                }
                (node, info)
            })
            .collect())
    }

    /// OS definitions each node knows about; failed nodes report none
    pub async fn os_diagnose(
        &self,
        nodes: &[NodeAddress],
    ) -> Result<HashMap<NodeAddress, Vec<Value>>> {
        let results = self.call("os_diagnose", &[], nodes).await?;

        Ok(results
            .into_iter()
            .map(|(node, outcome)| {
                let oses = match outcome {
                    Outcome::Success(Value::Array(oses)) => oses,
                    _ => Vec::new(),
                };
                (node, oses)
            })
            .collect())
    }

    /// Replace a job queue file on every node
    pub async fn jobqueue_update(
        &self,
        nodes: &[NodeAddress],
        file_name: &str,
        content: &str,
    ) -> Result<ResultMap> {
        self.call("jobqueue_update", &[json!(file_name), json!(content)], nodes)
            .await
    }

    pub async fn jobqueue_purge(&self, node: &NodeAddress) -> Result<bool> {
        self.call_bool("jobqueue_purge", &[], node).await
    }

    pub async fn jobqueue_rename(
        &self,
        nodes: &[NodeAddress],
        old: &str,
        new: &str,
    ) -> Result<ResultMap> {
        self.call("jobqueue_rename", &[json!(old), json!(new)], nodes).await
    }

    pub async fn jobqueue_set_drain(
        &self,
        nodes: &[NodeAddress],
        drain: bool,
    ) -> Result<ResultMap> {
        self.call("jobqueue_set_drain", &[json!(drain)], nodes).await
    }
}

/// Unwrap one node's outcome, falling back to `default` on failure or when
/// `extract` rejects the value
pub fn single_or_default<T, F>(
    procedure: &str,
    node: &NodeAddress,
    outcome: Outcome,
    default: T,
    extract: F,
) -> T
where
    F: FnOnce(&Value) -> Option<T>,
{
    match outcome {
        Outcome::Success(value) => match extract(&value) {
            Some(result) => result,
            None => {
                warn!(procedure, node = %node, %value, "unexpected result type");
                default
            }
        },
        failure => {
            warn!(procedure, node = %node, outcome = %failure, "call failed, using default");
            default
        }
    }
}
