//! Scripted fake implementing the `CommandClient` seam
//!
//! Each fake either plays a cache server (fixed role/config) or a
//! Sentinel (shared watch-list state, so registration commands are
//! visible to later queries). Every issued command is appended to a
//! shared log, which is what the idempotence tests assert on.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use resp_client::{
    ClientError, ClientFactory, CommandClient, MasterRecord, ReplicaRecord, RoleInfo,
    UNKNOWN_MASTER,
};

pub type CommandLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> CommandLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Count logged commands starting with `prefix`
pub fn count_commands(log: &CommandLog, prefix: &str) -> usize {
    log.lock().iter().filter(|c| c.starts_with(prefix)).count()
}

/// Build a master record the way Sentinel would describe it
pub fn make_master(name: &str, ip: &str, port: u16, flags: &str) -> MasterRecord {
    MasterRecord {
        name: name.to_string(),
        ip: ip.to_string(),
        port,
        flags: flags.to_string(),
        num_slaves: 0,
        quorum: 2,
        down_after_milliseconds: 30000,
    }
}

/// Build a replica record the way Sentinel would describe it
pub fn make_replica(ip: &str, port: u16, flags: &str) -> ReplicaRecord {
    ReplicaRecord {
        name: format!("{}:{}", ip, port),
        ip: ip.to_string(),
        port,
        flags: flags.to_string(),
        master_link_status: "ok".to_string(),
    }
}

/// Sentinel-side state shared between a fake and its test
#[derive(Default)]
pub struct SentinelState {
    pub masters: Vec<MasterRecord>,
    pub replicas: HashMap<String, Vec<ReplicaRecord>>,
}

pub type SharedSentinelState = Arc<Mutex<SentinelState>>;

pub fn sentinel_state(masters: Vec<MasterRecord>) -> SharedSentinelState {
    Arc::new(Mutex::new(SentinelState {
        masters,
        replicas: HashMap::new(),
    }))
}

/// Scripted `CommandClient`
pub struct FakeClient {
    pub role: Option<RoleInfo>,
    pub config: HashMap<String, String>,
    pub sentinel: Option<SharedSentinelState>,
    pub log: CommandLog,
    /// `SENTINEL masters` fails with this error text
    pub fail_masters: Option<String>,
    /// `SENTINEL master <name>` fails with this error text for this name
    pub fail_master_query: Option<(String, String)>,
    /// `CONFIG GET` fails with this error text
    pub fail_config_get: Option<String>,
}

impl FakeClient {
    pub fn primary(log: CommandLog) -> Self {
        Self {
            role: Some(RoleInfo::Primary),
            config: HashMap::new(),
            sentinel: None,
            log,
            fail_masters: None,
            fail_master_query: None,
            fail_config_get: None,
        }
    }

    pub fn replica(master_host: &str, master_port: u16, read_only: bool, log: CommandLog) -> Self {
        let mut config = HashMap::new();
        config.insert(
            "slave-read-only".to_string(),
            if read_only { "yes" } else { "no" }.to_string(),
        );
        Self {
            role: Some(RoleInfo::Replica {
                master_host: master_host.to_string(),
                master_port,
            }),
            config,
            sentinel: None,
            log,
            fail_masters: None,
            fail_master_query: None,
            fail_config_get: None,
        }
    }

    /// A server whose every call fails
    pub fn unreachable(log: CommandLog) -> Self {
        Self {
            role: None,
            config: HashMap::new(),
            sentinel: None,
            log,
            fail_masters: None,
            fail_master_query: None,
            fail_config_get: None,
        }
    }

    pub fn sentinel(state: SharedSentinelState, log: CommandLog) -> Self {
        Self {
            role: None,
            config: HashMap::new(),
            sentinel: Some(state),
            log,
            fail_masters: None,
            fail_master_query: None,
            fail_config_get: None,
        }
    }

    fn record(&self, command: String) {
        self.log.lock().push(command);
    }

    fn state(&self) -> Result<&SharedSentinelState, ClientError> {
        self.sentinel
            .as_ref()
            .ok_or_else(|| ClientError::Server("ERR not a sentinel".to_string()))
    }
}

#[async_trait]
impl CommandClient for FakeClient {
    async fn role(&mut self) -> Result<RoleInfo, ClientError> {
        self.record("ROLE".to_string());
        self.role
            .clone()
            .ok_or_else(|| ClientError::Server("ERR connection refused".to_string()))
    }

    async fn config_get(&mut self, param: &str) -> Result<Option<String>, ClientError> {
        self.record(format!("CONFIG GET {}", param));
        if let Some(error) = &self.fail_config_get {
            return Err(ClientError::Server(error.clone()));
        }
        if self.role.is_none() && self.sentinel.is_none() {
            return Err(ClientError::Server("ERR connection refused".to_string()));
        }
        Ok(self.config.get(param).cloned())
    }

    async fn config_set(&mut self, param: &str, value: &str) -> Result<(), ClientError> {
        self.record(format!("CONFIG SET {} {}", param, value));
        self.config.insert(param.to_string(), value.to_string());
        Ok(())
    }

    async fn replicate_from(&mut self, target: Option<(&str, u16)>) -> Result<(), ClientError> {
        match target {
            Some((host, port)) => self.record(format!("SLAVEOF {} {}", host, port)),
            None => self.record("SLAVEOF NO ONE".to_string()),
        }
        Ok(())
    }

    async fn sentinel_master(&mut self, name: &str) -> Result<MasterRecord, ClientError> {
        self.record(format!("SENTINEL master {}", name));
        if let Some((fail_name, error)) = &self.fail_master_query {
            if fail_name == name {
                return Err(ClientError::Server(error.clone()));
            }
        }
        let state = self.state()?.lock();
        state
            .masters
            .iter()
            .find(|m| m.name == name)
            .cloned()
            .ok_or_else(|| ClientError::Server(UNKNOWN_MASTER.to_string()))
    }

    async fn sentinel_masters(&mut self) -> Result<Vec<MasterRecord>, ClientError> {
        self.record("SENTINEL masters".to_string());
        if let Some(error) = &self.fail_masters {
            return Err(ClientError::Server(error.clone()));
        }
        Ok(self.state()?.lock().masters.clone())
    }

    async fn sentinel_replicas(&mut self, name: &str) -> Result<Vec<ReplicaRecord>, ClientError> {
        self.record(format!("SENTINEL slaves {}", name));
        let state = self.state()?.lock();
        Ok(state.replicas.get(name).cloned().unwrap_or_default())
    }

    async fn sentinel_monitor(
        &mut self,
        name: &str,
        ip: &str,
        port: u16,
        quorum: u32,
    ) -> Result<(), ClientError> {
        self.record(format!("SENTINEL monitor {} {} {} {}", name, ip, port, quorum));
        let state = self.state()?;
        let mut state = state.lock();
        let mut record = make_master(name, ip, port, "master");
        record.quorum = quorum;
        state.masters.push(record);
        Ok(())
    }

    async fn sentinel_set(
        &mut self,
        name: &str,
        param: &str,
        value: &str,
    ) -> Result<(), ClientError> {
        self.record(format!("SENTINEL set {} {} {}", name, param, value));
        if param == "down-after-milliseconds" {
            let state = self.state()?;
            let mut state = state.lock();
            if let Some(record) = state.masters.iter_mut().find(|m| m.name == name) {
                record.down_after_milliseconds = value.parse().map_err(|_| {
                    ClientError::Server("ERR Invalid argument".to_string())
                })?;
            }
        }
        Ok(())
    }

    async fn subscribe(&mut self, channel: &str) -> Result<(), ClientError> {
        self.record(format!("SUBSCRIBE {}", channel));
        Ok(())
    }
}

/// Factory handing out scripted clients by connection URL
#[derive(Default)]
pub struct FakeFactory {
    pub roles: HashMap<String, RoleInfo>,
    pub configs: HashMap<String, HashMap<String, String>>,
    pub log: CommandLog,
}

impl FakeFactory {
    pub fn new(log: CommandLog) -> Self {
        Self {
            roles: HashMap::new(),
            configs: HashMap::new(),
            log,
        }
    }

    pub fn with_primary(mut self, url: &str) -> Self {
        self.roles.insert(url.to_string(), RoleInfo::Primary);
        self
    }

    pub fn with_replica(mut self, url: &str, master_host: &str, master_port: u16) -> Self {
        self.roles.insert(
            url.to_string(),
            RoleInfo::Replica {
                master_host: master_host.to_string(),
                master_port,
            },
        );
        self
    }

    pub fn with_config(mut self, url: &str, param: &str, value: &str) -> Self {
        self.configs
            .entry(url.to_string())
            .or_default()
            .insert(param.to_string(), value.to_string());
        self
    }
}

#[async_trait]
impl ClientFactory for FakeFactory {
    async fn open(&self, url: &str) -> Result<Box<dyn CommandClient>, ClientError> {
        let role = self
            .roles
            .get(url)
            .cloned()
            .ok_or_else(|| ClientError::Server(format!("ERR no fake server at {}", url)))?;
        let mut client = match role {
            RoleInfo::Primary => FakeClient::primary(self.log.clone()),
            RoleInfo::Replica {
                master_host,
                master_port,
            } => FakeClient::replica(&master_host, master_port, true, self.log.clone()),
        };
        if let Some(config) = self.configs.get(url) {
            client.config.extend(config.clone());
        }
        Ok(Box::new(client))
    }
}
