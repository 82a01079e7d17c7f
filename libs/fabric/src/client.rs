//! Fan-out client: one procedure, many nodes, one result per node

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use muster_core::{ClientConfig, NodeAddress};
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::codec::JsonCodec;
use crate::error::Result;
use crate::node_call::NodeCall;
use crate::outcome::{Outcome, TransportFailure};
use crate::request::Procedure;
use crate::transport::{Connector, TcpConnector};

/// Node-keyed outcomes of one fan-out call
///
/// Holds exactly one entry per distinct node that was requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultMap {
    outcomes: HashMap<NodeAddress, Outcome>,
}

impl ResultMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn contains(&self, node: &NodeAddress) -> bool {
        self.outcomes.contains_key(node)
    }

    pub fn get(&self, node: &NodeAddress) -> Option<&Outcome> {
        self.outcomes.get(node)
    }

    pub fn remove(&mut self, node: &NodeAddress) -> Option<Outcome> {
        self.outcomes.remove(node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeAddress> {
        self.outcomes.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeAddress, &Outcome)> {
        self.outcomes.iter()
    }

    /// Nodes that answered, with their values
    pub fn successes(&self) -> impl Iterator<Item = (&NodeAddress, &Value)> {
        self.outcomes
            .iter()
            .filter_map(|(node, outcome)| outcome.success().map(|value| (node, value)))
    }

    /// Nodes whose call failed in any way
    pub fn failures(&self) -> impl Iterator<Item = (&NodeAddress, &Outcome)> {
        self.outcomes.iter().filter(|(_, outcome)| outcome.is_failure())
    }

    pub fn into_inner(self) -> HashMap<NodeAddress, Outcome> {
        self.outcomes
    }

    /// Overwrite outcomes of nodes already present with those in `newer`
    ///
    /// Nodes absent from `self` are ignored, so the key set never grows.
    pub fn update(&mut self, newer: ResultMap) {
        for (node, outcome) in newer {
            if let Some(slot) = self.outcomes.get_mut(&node) {
                *slot = outcome;
            }
        }
    }

    pub(crate) fn insert(&mut self, node: NodeAddress, outcome: Outcome) {
        self.outcomes.insert(node, outcome);
    }
}

impl IntoIterator for ResultMap {
    type Item = (NodeAddress, Outcome);
    type IntoIter = std::collections::hash_map::IntoIter<NodeAddress, Outcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.into_iter()
    }
}

impl FromIterator<(NodeAddress, Outcome)> for ResultMap {
    fn from_iter<I: IntoIterator<Item = (NodeAddress, Outcome)>>(iter: I) -> Self {
        Self {
            outcomes: iter.into_iter().collect(),
        }
    }
}

/// Issues a procedure to a set of nodes and gathers their outcomes
///
/// Requests go out to every node, and each node's response is awaited
/// concurrently from the moment its request is sent, so the slowest node
/// bounds the call instead of the sum of all nodes. No retries happen here.
pub struct FanOutClient<K = TcpConnector> {
    config: ClientConfig,
    connector: Arc<K>,
    codec: JsonCodec,
}

impl FanOutClient<TcpConnector> {
    /// Create a client that reaches nodes over TCP
    pub fn new(config: ClientConfig) -> Result<Self> {
        let connector = TcpConnector::new(&config);
        Self::with_connector(config, connector)
    }
}

impl<K: Connector> FanOutClient<K> {
    /// Create a client over a custom connector
    pub fn with_connector(config: ClientConfig, connector: K) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            connector: Arc::new(connector),
            codec: JsonCodec,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Call `procedure` on every node in `nodes`
    ///
    /// Duplicate nodes collapse into one entry. Per-node failures are
    /// reported in the map; the only error is failing to encode `args`,
    /// which happens before any connection is opened.
    pub async fn call<I>(&self, procedure: &str, args: &[Value], nodes: I) -> Result<ResultMap>
    where
        I: IntoIterator,
        I::Item: Into<NodeAddress>,
    {
        let procedure = Arc::new(Procedure::new(procedure, args, &self.codec)?);

        let mut seen = HashSet::new();
        let targets: Vec<NodeAddress> = nodes
            .into_iter()
            .map(Into::<NodeAddress>::into)
            .filter(|node| seen.insert(node.clone()))
            .collect();

        if targets.is_empty() {
            return Ok(ResultMap::new());
        }

        debug!(
            procedure = procedure.name(),
            nodes = targets.len(),
            "starting fan-out call"
        );

        let deadline = self.config.call_timeout().map(|t| Instant::now() + t);
        let limit = self.config.max_concurrency;
        let semaphore = Arc::new(Semaphore::new(limit));
        let mut join_set = JoinSet::new();
        let mut results = ResultMap::new();

        let mut opening = stream::iter(targets.iter().cloned())
            .map(|node| NodeCall::open(self.connector.as_ref(), node, procedure.clone()))
            .buffer_unordered(limit);

        let run = async {
            // Phase 1: connect and send; a node's response is awaited as soon
            // as its request is out, overlapping with the remaining opens
            while let Some(call) = opening.next().await {
                let semaphore = semaphore.clone();
                let codec = self.codec;
                join_set.spawn(async move {
                    let node = call.address().clone();
                    let outcome = match semaphore.acquire_owned().await {
                        Ok(_permit) => call.await_response(&codec).await,
                        Err(_) => Outcome::TransportFailure(TransportFailure::Io(
                            "worker pool closed".to_string(),
                        )),
                    };
                    (node, outcome)
                });
            }

            // Phase 2: collect the responses still outstanding
            while let Some(joined) = join_set.join_next().await {
                record(&mut results, joined);
            }
        };

        let timed_out = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, run).await.is_err(),
            None => {
                run.await;
                false
            }
        };
        drop(opening);

        if timed_out {
            warn!(
                procedure = procedure.name(),
                pending = targets.len() - results.len(),
                "call deadline passed, abandoning pending nodes"
            );
            // Keep whatever finished before the deadline
            join_set.abort_all();
            while let Some(joined) = join_set.join_next().await {
                record(&mut results, joined);
            }
        }

        let missing = if timed_out {
            TransportFailure::Timeout
        } else {
            TransportFailure::Io("node call worker failed".to_string())
        };
        let results = fill_missing(results, &targets, missing);
        debug!(
            procedure = procedure.name(),
            succeeded = results.successes().count(),
            total = results.len(),
            "fan-out call finished"
        );
        Ok(results)
    }

    /// Call `procedure` on one node and return its outcome
    ///
    /// `default` is returned if the node is somehow absent from the results.
    pub async fn call_single(
        &self,
        procedure: &str,
        args: &[Value],
        node: impl Into<NodeAddress>,
        default: Outcome,
    ) -> Result<Outcome> {
        let node = node.into();
        let mut results = self.call(procedure, args, [node.clone()]).await?;
        Ok(results.remove(&node).unwrap_or(default))
    }
}

/// Store a finished worker's outcome; cancelled workers are left to `fill_missing`
fn record(
    results: &mut ResultMap,
    joined: std::result::Result<(NodeAddress, Outcome), tokio::task::JoinError>,
) {
    match joined {
        Ok((node, outcome)) => results.insert(node, outcome),
        Err(e) if e.is_cancelled() => {}
        Err(e) => warn!(error = %e, "node call worker failed"),
    }
}

/// Give every requested node without an outcome the `missing` failure
fn fill_missing(
    mut results: ResultMap,
    targets: &[NodeAddress],
    missing: TransportFailure,
) -> ResultMap {
    for node in targets {
        if !results.contains(node) {
            results.insert(node.clone(), Outcome::TransportFailure(missing.clone()));
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fill_missing_completes_the_key_set() {
        let targets: Vec<NodeAddress> = vec!["n1".into(), "n2".into()];
        let partial: ResultMap = [(NodeAddress::from("n1"), Outcome::Success(json!(true)))]
            .into_iter()
            .collect();

        let results = fill_missing(partial, &targets, TransportFailure::Timeout);

        assert_eq!(results.len(), 2);
        assert_eq!(results.get(&"n1".into()), Some(&Outcome::Success(json!(true))));
        assert_eq!(
            results.get(&"n2".into()),
            Some(&Outcome::TransportFailure(TransportFailure::Timeout))
        );
    }

    #[test]
    fn update_never_adds_nodes() {
        let mut results: ResultMap = [(
            NodeAddress::from("n1"),
            Outcome::ConnectFailure("refused".into()),
        )]
        .into_iter()
        .collect();
        let newer: ResultMap = [
            (NodeAddress::from("n1"), Outcome::Success(json!(1))),
            (NodeAddress::from("n9"), Outcome::Success(json!(9))),
        ]
        .into_iter()
        .collect();

        results.update(newer);

        assert_eq!(results.len(), 1);
        assert_eq!(results.get(&"n1".into()), Some(&Outcome::Success(json!(1))));
        assert!(!results.contains(&"n9".into()));
    }
}
