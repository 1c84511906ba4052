//! End-to-end reconcile pass against scripted servers and sentinels

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use redkeeper::{run_pass_with, KeeperConfig};
use resp_client::{
    ClientError, ClientFactory, CommandClient, MasterRecord, ReplicaRecord, RoleInfo,
    UNKNOWN_MASTER,
};

type SentinelState = Arc<Mutex<Vec<MasterRecord>>>;

/// Plays either a cache server (fixed role) or a Sentinel (shared
/// watch-list, so a registration in one pass phase is visible to the
/// snapshot phase)
struct ScriptedClient {
    role: Option<RoleInfo>,
    sentinel: Option<SentinelState>,
}

impl ScriptedClient {
    fn state(&self) -> Result<&SentinelState, ClientError> {
        self.sentinel
            .as_ref()
            .ok_or_else(|| ClientError::Server("ERR not a sentinel".to_string()))
    }
}

#[async_trait]
impl CommandClient for ScriptedClient {
    async fn role(&mut self) -> Result<RoleInfo, ClientError> {
        self.role
            .clone()
            .ok_or_else(|| ClientError::Server("ERR connection refused".to_string()))
    }

    async fn config_get(&mut self, _param: &str) -> Result<Option<String>, ClientError> {
        Ok(None)
    }

    async fn config_set(&mut self, _param: &str, _value: &str) -> Result<(), ClientError> {
        Ok(())
    }

    async fn replicate_from(&mut self, _target: Option<(&str, u16)>) -> Result<(), ClientError> {
        Ok(())
    }

    async fn sentinel_master(&mut self, name: &str) -> Result<MasterRecord, ClientError> {
        let state = self.state()?.lock();
        state
            .iter()
            .find(|m| m.name == name)
            .cloned()
            .ok_or_else(|| ClientError::Server(UNKNOWN_MASTER.to_string()))
    }

    async fn sentinel_masters(&mut self) -> Result<Vec<MasterRecord>, ClientError> {
        Ok(self.state()?.lock().clone())
    }

    async fn sentinel_replicas(&mut self, _name: &str) -> Result<Vec<ReplicaRecord>, ClientError> {
        Ok(Vec::new())
    }

    async fn sentinel_monitor(
        &mut self,
        name: &str,
        ip: &str,
        port: u16,
        quorum: u32,
    ) -> Result<(), ClientError> {
        self.state()?.lock().push(MasterRecord {
            name: name.to_string(),
            ip: ip.to_string(),
            port,
            flags: "master".to_string(),
            num_slaves: 0,
            quorum,
            down_after_milliseconds: 0,
        });
        Ok(())
    }

    async fn sentinel_set(
        &mut self,
        name: &str,
        param: &str,
        value: &str,
    ) -> Result<(), ClientError> {
        if param == "down-after-milliseconds" {
            let state = self.state()?;
            let mut state = state.lock();
            if let Some(record) = state.iter_mut().find(|m| m.name == name) {
                record.down_after_milliseconds = value
                    .parse()
                    .map_err(|_| ClientError::Server("ERR Invalid argument".to_string()))?;
            }
        }
        Ok(())
    }

    async fn subscribe(&mut self, _channel: &str) -> Result<(), ClientError> {
        Ok(())
    }
}

/// Hands out scripted clients by connection URL
#[derive(Default)]
struct ScriptedFactory {
    servers: HashMap<String, RoleInfo>,
    sentinels: HashMap<String, SentinelState>,
}

impl ScriptedFactory {
    fn with_primary(mut self, url: &str) -> Self {
        self.servers.insert(url.to_string(), RoleInfo::Primary);
        self
    }

    fn with_sentinel(mut self, url: &str) -> Self {
        self.sentinels
            .insert(url.to_string(), Arc::new(Mutex::new(Vec::new())));
        self
    }
}

#[async_trait]
impl ClientFactory for ScriptedFactory {
    async fn open(&self, url: &str) -> Result<Box<dyn CommandClient>, ClientError> {
        if let Some(role) = self.servers.get(url) {
            return Ok(Box::new(ScriptedClient {
                role: Some(role.clone()),
                sentinel: None,
            }));
        }
        if let Some(state) = self.sentinels.get(url) {
            return Ok(Box::new(ScriptedClient {
                role: None,
                sentinel: Some(state.clone()),
            }));
        }
        Err(ClientError::Server(format!("ERR no fake server at {}", url)))
    }
}

const CONFIG: &str = r#"
cluster:
  name: main
  shards:
    pshard01: [redis://10.0.0.1:6379]
    pshard02: [redis://10.0.1.1:6379]
sentinels:
  - redis://10.1.0.1:26379
  - redis://10.1.0.2:26379
  - redis://10.1.0.3:26379
sentinel:
  monitor_quorum: 2
  down_after_ms: 30000
  snapshot_quorum: 2
pools:
  pool01:
    listen: "0.0.0.0:22121"
    timeout_ms: 400
    backlog: 512
    shards:
      pshard01: [shard01, shard02]
      pshard02: [shard03, shard04]
"#;

fn factory() -> ScriptedFactory {
    ScriptedFactory::default()
        .with_primary("redis://10.0.0.1:6379")
        .with_primary("redis://10.0.1.1:6379")
        .with_sentinel("redis://10.1.0.1:26379")
        .with_sentinel("redis://10.1.0.2:26379")
        .with_sentinel("redis://10.1.0.3:26379")
}

#[tokio::test]
async fn test_pass_synthesizes_proxy_document() {
    let config = KeeperConfig::from_yaml(CONFIG).unwrap();
    let document = run_pass_with(&config, &factory()).await.unwrap();

    let servers: Vec<&str> = document["pool01"]["servers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap())
        .collect();
    assert_eq!(
        servers,
        vec![
            "10.0.0.1:6379:1 shard01",
            "10.0.0.1:6379:1 shard02",
            "10.0.1.1:6379:1 shard03",
            "10.0.1.1:6379:1 shard04",
        ]
    );

    // the fixed liveness pool rides along untouched
    assert_eq!(document["health"]["listen"], "127.0.0.1:22333");
    assert_eq!(
        document["health"]["servers"][0].as_str().unwrap(),
        "127.0.0.1:6379:1 dummy"
    );
}

#[tokio::test]
async fn test_pass_registers_shards_with_every_sentinel() {
    let config = KeeperConfig::from_yaml(CONFIG).unwrap();
    let factory = factory();
    run_pass_with(&config, &factory).await.unwrap();

    for state in factory.sentinels.values() {
        let masters = state.lock();
        assert_eq!(masters.len(), 2);
        assert!(masters.iter().any(|m| m.name == "pshard01"));
        assert!(masters.iter().any(|m| m.name == "pshard02"));
        for master in masters.iter() {
            assert_eq!(master.quorum, 2);
            assert_eq!(master.down_after_milliseconds, 30000);
        }
    }
}

#[tokio::test]
async fn test_pass_fails_without_primary() {
    let config = KeeperConfig::from_yaml(CONFIG).unwrap();
    // pshard02's only member is absent from the factory: discovery fails
    let factory = ScriptedFactory::default()
        .with_primary("redis://10.0.0.1:6379")
        .with_sentinel("redis://10.1.0.1:26379")
        .with_sentinel("redis://10.1.0.2:26379")
        .with_sentinel("redis://10.1.0.3:26379");

    assert!(run_pass_with(&config, &factory).await.is_err());
}
