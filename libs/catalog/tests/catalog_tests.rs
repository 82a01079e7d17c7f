use muster_catalog::{Catalog, RetryPolicy};
use muster_core::{ClientConfig, NodeAddress};
use muster_fabric::{
    error::{Error, Result},
    transport::{Connector, Response, Transport},
    FanOutClient, Outcome, Procedure, TransportFailure,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a scripted node does when contacted
enum Script {
    Refuse,
    Reply(u16, Vec<u8>),
}

fn answer(value: Value) -> Script {
    Script::Reply(200, serde_json::to_vec(&value).unwrap())
}

struct ScriptedTransport {
    reply: Option<(u16, Vec<u8>)>,
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn send(&mut self, _procedure: &Procedure) -> Result<()> {
        Ok(())
    }

    async fn receive(&mut self) -> Result<Response> {
        let (status, body) = self.reply.take().ok_or(Error::ConnectionClosed)?;
        Ok(Response { status, body })
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Connector replaying per-node scripts and recording every contact
#[derive(Clone, Default)]
struct ScriptedConnector {
    scripts: Arc<Mutex<HashMap<NodeAddress, VecDeque<Script>>>>,
    contacted: Arc<Mutex<Vec<NodeAddress>>>,
}

impl ScriptedConnector {
    fn script(self, node: &str, steps: Vec<Script>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(node.into(), steps.into_iter().collect());
        self
    }

    fn contacts(&self, node: &str) -> usize {
        let node = NodeAddress::from(node);
        self.contacted.lock().unwrap().iter().filter(|n| **n == node).count()
    }
}

#[async_trait::async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, node: &NodeAddress) -> Result<Box<dyn Transport>> {
        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(node)
            .and_then(|steps| steps.pop_front())
            .unwrap_or(Script::Refuse);
        self.contacted.lock().unwrap().push(node.clone());
        match step {
            Script::Refuse => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
            Script::Reply(status, body) => Ok(Box::new(ScriptedTransport {
                reply: Some((status, body)),
            })),
        }
    }
}

fn catalog(connector: ScriptedConnector) -> Catalog<ScriptedConnector> {
    Catalog::from_client(FanOutClient::with_connector(ClientConfig::default(), connector).unwrap())
}

fn nodes(names: &[&str]) -> Vec<NodeAddress> {
    names.iter().map(|name| NodeAddress::from(*name)).collect()
}

#[tokio::test]
async fn vg_list_keeps_per_node_outcomes() {
    let connector = ScriptedConnector::default()
        .script("n1", vec![answer(json!({"vg0": 1024}))])
        .script("n2", vec![Script::Refuse]);

    let results = catalog(connector).vg_list(&nodes(&["n1", "n2"])).await.unwrap();

    assert_eq!(
        results.get(&"n1".into()),
        Some(&Outcome::Success(json!({"vg0": 1024})))
    );
    assert!(matches!(
        results.get(&"n2".into()),
        Some(Outcome::ConnectFailure(_))
    ));
}

#[tokio::test]
async fn bridges_exist_reports_remote_false() {
    let connector = ScriptedConnector::default().script("n1", vec![answer(json!(false))]);

    let exists = catalog(connector)
        .bridges_exist(&"n1".into(), &["br0".to_string()])
        .await
        .unwrap();

    assert!(!exists);
}

#[tokio::test]
async fn bridges_exist_defaults_to_false_on_failure() {
    let connector = ScriptedConnector::default().script("n1", vec![Script::Reply(500, Vec::new())]);

    let exists = catalog(connector)
        .bridges_exist(&"n1".into(), &["br0".to_string()])
        .await
        .unwrap();

    assert!(!exists);
}

#[tokio::test]
async fn node_has_ip_address_returns_true() {
    let connector = ScriptedConnector::default().script("n1", vec![answer(json!(true))]);

    let has = catalog(connector)
        .node_has_ip_address(&"n1".into(), "192.0.2.10")
        .await
        .unwrap();

    assert!(has);
}

#[tokio::test]
async fn node_info_fills_placeholders() {
    let connector = ScriptedConnector::default()
        .script(
            "n1",
            vec![answer(json!({
                "memory_total": 4096,
                "memory_free": 1024,
                "vg_size": 10,
                "vg_free": 5,
                "memory_dom0": 512,
            }))],
        )
        .script("n2", vec![answer(json!({"memory_total": 2048}))])
        .script("n3", vec![Script::Refuse]);

    let info = catalog(connector)
        .node_info(&nodes(&["n1", "n2", "n3"]), "xenvg", "xen-pvm")
        .await
        .unwrap();

    assert_eq!(info.len(), 3);
    assert_eq!(info[&NodeAddress::from("n1")]["vg_size"], json!(10));
    assert_eq!(info[&NodeAddress::from("n2")]["memory_total"], json!(2048));
    assert_eq!(info[&NodeAddress::from("n2")]["memory_free"], json!("-"));
    assert_eq!(info[&NodeAddress::from("n3")]["vg_size"], json!("node_unreachable"));
}

#[tokio::test]
async fn os_diagnose_normalizes_failures_to_empty() {
    let connector = ScriptedConnector::default()
        .script("n1", vec![answer(json!([{"name": "debian-etch"}]))])
        .script("n2", vec![answer(json!(false))])
        .script("n3", vec![Script::Refuse]);

    let oses = catalog(connector)
        .os_diagnose(&nodes(&["n1", "n2", "n3"]))
        .await
        .unwrap();

    assert_eq!(oses[&NodeAddress::from("n1")], vec![json!({"name": "debian-etch"})]);
    assert!(oses[&NodeAddress::from("n2")].is_empty());
    assert!(oses[&NodeAddress::from("n3")].is_empty());
}

#[tokio::test]
async fn idempotent_procedures_retry_failed_nodes() {
    let connector = ScriptedConnector::default()
        .script("n1", vec![answer(json!("2.0"))])
        .script("n2", vec![Script::Refuse, answer(json!("2.0"))]);
    let catalog = catalog(connector.clone()).with_retry(RetryPolicy::new(2, Duration::ZERO));

    let results = catalog.version(&nodes(&["n1", "n2"])).await.unwrap();

    assert_eq!(results.get(&"n2".into()), Some(&Outcome::Success(json!("2.0"))));
    assert_eq!(connector.contacts("n1"), 1);
    assert_eq!(connector.contacts("n2"), 2);
}

#[tokio::test]
async fn retries_stop_after_the_policy_limit() {
    let connector = ScriptedConnector::default().script(
        "n1",
        vec![
            Script::Reply(503, Vec::new()),
            Script::Reply(503, Vec::new()),
            Script::Reply(503, Vec::new()),
        ],
    );
    let catalog = catalog(connector.clone()).with_retry(RetryPolicy::new(1, Duration::ZERO));

    let results = catalog.version(&nodes(&["n1"])).await.unwrap();

    assert_eq!(
        results.get(&"n1".into()),
        Some(&Outcome::TransportFailure(TransportFailure::BadStatus(503)))
    );
    assert_eq!(connector.contacts("n1"), 2);
}

#[tokio::test]
async fn mutating_procedures_are_never_retried() {
    let connector = ScriptedConnector::default()
        .script("n1", vec![Script::Refuse, answer(json!(true))]);
    let catalog = catalog(connector.clone()).with_retry(RetryPolicy::new(3, Duration::ZERO));

    let results = catalog
        .jobqueue_update(&nodes(&["n1"]), "/var/lib/queue/job-1", "{}")
        .await
        .unwrap();

    assert!(matches!(
        results.get(&"n1".into()),
        Some(Outcome::ConnectFailure(_))
    ));
    assert_eq!(connector.contacts("n1"), 1);
}

#[tokio::test]
async fn decode_failures_are_not_retried() {
    let connector = ScriptedConnector::default()
        .script("n1", vec![Script::Reply(200, b"{bad".to_vec()), answer(json!([]))]);
    let catalog = catalog(connector.clone()).with_retry(RetryPolicy::new(2, Duration::ZERO));

    let results = catalog.export_list(&nodes(&["n1"])).await.unwrap();

    assert!(matches!(
        results.get(&"n1".into()),
        Some(Outcome::DecodeFailure(_))
    ));
    assert_eq!(connector.contacts("n1"), 1);
}

#[derive(Serialize)]
struct Instance {
    name: String,
    primary_node: String,
    disks: Vec<u64>,
}

#[tokio::test]
async fn domain_objects_are_flattened_before_sending() {
    let connector = ScriptedConnector::default().script("n1", vec![answer(json!(true))]);
    let instance = Instance {
        name: "inst1.example.com".to_string(),
        primary_node: "n1".to_string(),
        disks: vec![10240],
    };

    let stopped = catalog(connector)
        .instance_shutdown(&"n1".into(), &instance)
        .await
        .unwrap();

    assert!(stopped);
}

#[tokio::test]
async fn blockdev_find_keeps_failure_kind() {
    let connector = ScriptedConnector::default().script("n1", vec![Script::Reply(200, Vec::new())]);

    let outcome = catalog(connector)
        .blockdev_find(&"n1".into(), &json!({"dev_type": "lvm", "logical_id": ["xenvg", "disk0"]}))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::TransportFailure(TransportFailure::EmptyResponse)
    );
}
