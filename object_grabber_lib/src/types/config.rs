use serde::{Deserialize, Serialize};
use std::fs;
use std::str::FromStr;
use std::time::Duration;

use crate::{GrabberError, ObjectId, Orientation, Point, PoseStamped, Result, StrategyOverrides, SYSTEM_REF_FRAME};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub service: ServiceConfig,
    pub connection: ConnectionConfig,
    pub execution: ExecutionConfig,
    pub task: TaskConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub key_prefix: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "object_grabber_action_service".to_string(),
            key_prefix: "manipulation".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub probe_timeout_ms: u64,
    pub retry_interval_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 500,
            retry_interval_ms: 500,
        }
    }
}

impl ConnectionConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

/// What the sequencer does after a step ends in a non-success state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Record the outcome and run the next step anyway
    #[default]
    ContinueOnFailure,
    /// Stop the sequence with `GrabberError::StepFailed`
    AbortOnFailure,
}

impl FromStr for FailurePolicy {
    type Err = GrabberError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "continue-on-failure" | "continue" => Ok(FailurePolicy::ContinueOnFailure),
            "abort-on-failure" | "abort" => Ok(FailurePolicy::AbortOnFailure),
            other => Err(GrabberError::Config(format!("unknown failure policy '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub poll_interval_ms: u64,
    /// No deadline when unset; the client waits for the service indefinitely
    pub goal_timeout_ms: Option<u64>,
    pub failure_policy: FailurePolicy,
    /// Append a final move back to the waiting pose after dropoff
    pub return_to_waiting: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            goal_timeout_ms: None,
            failure_policy: FailurePolicy::default(),
            return_to_waiting: false,
        }
    }
}

impl ExecutionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn goal_timeout(&self) -> Option<Duration> {
        self.goal_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseConfig {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub qx: f64,
    #[serde(default)]
    pub qy: f64,
    #[serde(default)]
    pub qz: f64,
    #[serde(default = "default_qw")]
    pub qw: f64,
}

fn default_qw() -> f64 {
    1.0
}

/// Object and poses to manipulate. Stand-in for perception and task input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub object_id: ObjectId,
    pub frame_id: String,
    pub pickup: PoseConfig,
    /// Drop-off x/y; height and orientation follow the pick-up pose
    pub dropoff_xy: [f64; 2],
    #[serde(flatten)]
    pub strategy: StrategyOverrides,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            object_id: ObjectId::COKE_CAN_UPRIGHT,
            frame_id: SYSTEM_REF_FRAME.to_string(),
            pickup: PoseConfig {
                x: 0.5,
                y: -0.35,
                z: 0.84,
                qx: 0.0,
                qy: 0.0,
                qz: 0.0,
                qw: 1.0,
            },
            dropoff_xy: [0.7, 0.0],
            strategy: StrategyOverrides::default(),
        }
    }
}

impl TaskConfig {
    /// Pick-up and drop-off poses, both stamped now.
    pub fn poses(&self) -> (PoseStamped, PoseStamped) {
        let p = &self.pickup;
        let pickup = PoseStamped::new(
            self.frame_id.clone(),
            Point {
                x: p.x,
                y: p.y,
                z: p.z,
            },
            Orientation {
                x: p.qx,
                y: p.qy,
                z: p.qz,
                w: p.qw,
            },
        );
        let dropoff = pickup.with_xy(self.dropoff_xy[0], self.dropoff_xy[1]);
        (pickup, dropoff)
    }
}

impl ClientConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `GRABBER_*` environment overrides on top of the loaded values.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("GRABBER_SERVICE_NAME") {
            self.service.name = val;
        }
        if let Ok(val) = std::env::var("GRABBER_KEY_PREFIX") {
            self.service.key_prefix = val;
        }
        if let Ok(val) = std::env::var("GRABBER_PROBE_TIMEOUT_MS") {
            self.connection.probe_timeout_ms = val.parse().unwrap_or(self.connection.probe_timeout_ms);
        }
        if let Ok(val) = std::env::var("GRABBER_RETRY_INTERVAL_MS") {
            self.connection.retry_interval_ms = val.parse().unwrap_or(self.connection.retry_interval_ms);
        }
        if let Ok(val) = std::env::var("GRABBER_POLL_INTERVAL_MS") {
            self.execution.poll_interval_ms = val.parse().unwrap_or(self.execution.poll_interval_ms);
        }
        if let Ok(val) = std::env::var("GRABBER_GOAL_TIMEOUT_MS") {
            self.execution.goal_timeout_ms = val.parse().ok().or(self.execution.goal_timeout_ms);
        }
        if let Ok(val) = std::env::var("GRABBER_FAILURE_POLICY") {
            self.execution.failure_policy = val.parse()?;
        }
        if let Ok(val) = std::env::var("GRABBER_RETURN_TO_WAITING") {
            self.execution.return_to_waiting = val.parse().unwrap_or(self.execution.return_to_waiting);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.service.name.is_empty() {
            return Err(GrabberError::Config("service name is empty".to_string()));
        }

        if self.connection.retry_interval_ms == 0 || self.execution.poll_interval_ms == 0 {
            return Err(GrabberError::Config(
                "retry and poll intervals must be non-zero".to_string(),
            ));
        }

        if self.execution.goal_timeout_ms == Some(0) {
            return Err(GrabberError::Config("goal timeout must be non-zero".to_string()));
        }

        Ok(())
    }
}
