use async_trait::async_trait;
use object_grabber_lib::{
    CancelRequest, CompletionSender, GoalRequest, GoalResult, GoalTransport, GrabberError,
    GrabberGoal, Result, ServiceConfig,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;
use zenoh::pubsub::Publisher;
use zenoh::Session;

type PendingGoals = Arc<Mutex<HashMap<Uuid, CompletionSender>>>;

/// Key expressions the action service is reachable on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceKeys {
    pub alive: String,
    pub goal: String,
    pub cancel: String,
    pub result: String,
}

impl ServiceKeys {
    pub fn new(service: &ServiceConfig) -> Self {
        let base = format!(
            "{}/{}",
            service.key_prefix.trim_end_matches('/'),
            service.name
        );
        Self {
            alive: format!("{}/alive", base),
            goal: format!("{}/goal", base),
            cancel: format!("{}/cancel", base),
            result: format!("{}/result", base),
        }
    }
}

/// Goal transport over a Zenoh session.
///
/// The service announces itself with a liveliness token, takes JSON goals and
/// cancellations on its `goal`/`cancel` keys and publishes one JSON result per
/// goal on its `result` key. Results are routed back to the waiting
/// `CompletionSender` by goal id.
pub struct ZenohTransport {
    session: Session,
    keys: ServiceKeys,
    goal_pub: Publisher<'static>,
    cancel_pub: Publisher<'static>,
    pending: PendingGoals,
    router: tokio::task::JoinHandle<()>,
}

impl ZenohTransport {
    pub async fn connect(session: Session, service: &ServiceConfig) -> Result<Self> {
        let keys = ServiceKeys::new(service);

        let goal_pub = session
            .declare_publisher(keys.goal.clone())
            .await
            .map_err(|e| transport_error("declare publisher", &keys.goal, e))?;
        tracing::info!("Publisher: {}", keys.goal);

        let cancel_pub = session
            .declare_publisher(keys.cancel.clone())
            .await
            .map_err(|e| transport_error("declare publisher", &keys.cancel, e))?;
        tracing::info!("Publisher: {}", keys.cancel);

        let result_sub = session
            .declare_subscriber(keys.result.clone())
            .await
            .map_err(|e| transport_error("declare subscriber", &keys.result, e))?;
        tracing::info!("Subscriber: {}", keys.result);

        let pending: PendingGoals = Arc::new(Mutex::new(HashMap::new()));
        let router_pending = Arc::clone(&pending);
        let router = tokio::spawn(async move {
            while let Ok(sample) = result_sub.recv_async().await {
                let payload = sample.payload().to_bytes();
                match serde_json::from_slice::<GoalResult>(&payload) {
                    Ok(result) => route_result(&router_pending, result),
                    Err(e) => tracing::error!("Failed to parse goal result: {}", e),
                }
            }
            tracing::debug!("Result subscriber closed");
        });

        Ok(Self {
            session,
            keys,
            goal_pub,
            cancel_pub,
            pending,
            router,
        })
    }

    pub fn keys(&self) -> &ServiceKeys {
        &self.keys
    }
}

impl Drop for ZenohTransport {
    fn drop(&mut self) {
        self.router.abort();
    }
}

fn transport_error(what: &str, key: &str, e: impl std::fmt::Display) -> GrabberError {
    GrabberError::Transport(format!("failed to {} {}: {}", what, key, e))
}

fn lock_pending(pending: &PendingGoals) -> std::sync::MutexGuard<'_, HashMap<Uuid, CompletionSender>> {
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Hand a result to the sender registered for its goal. Results for goals we
/// are not waiting on (another client's, or already timed out) are dropped.
fn route_result(pending: &PendingGoals, result: GoalResult) {
    let sender = lock_pending(pending).remove(&result.goal_id);
    match sender {
        Some(sender) => {
            if let Err(e) = sender.on_result(result.state, result.return_code) {
                tracing::warn!("Result for goal {} not recorded: {}", result.goal_id, e);
            }
        }
        None => {
            tracing::debug!("Ignoring result for unknown goal {}", result.goal_id);
        }
    }
}

#[async_trait]
impl GoalTransport for ZenohTransport {
    async fn probe(&self, timeout: Duration) -> bool {
        let replies = match self
            .session
            .liveliness()
            .get(self.keys.alive.as_str())
            .timeout(timeout)
            .await
        {
            Ok(replies) => replies,
            Err(e) => {
                tracing::warn!("Liveliness query on {} failed: {}", self.keys.alive, e);
                return false;
            }
        };

        // The reply channel closes once the query times out.
        let first_alive = async {
            while let Ok(reply) = replies.recv_async().await {
                if reply.result().is_ok() {
                    return true;
                }
            }
            false
        };

        tokio::time::timeout(timeout + Duration::from_millis(100), first_alive)
            .await
            .unwrap_or(false)
    }

    async fn send_goal(&self, goal_id: Uuid, goal: GrabberGoal, done: CompletionSender) -> Result<()> {
        let request = GoalRequest { goal_id, goal };
        let payload = serde_json::to_vec(&request)?;

        // Register before publishing so a fast result is not lost.
        lock_pending(&self.pending).insert(goal_id, done);

        if let Err(e) = self.goal_pub.put(payload).await {
            lock_pending(&self.pending).remove(&goal_id);
            return Err(transport_error("publish goal on", &self.keys.goal, e));
        }
        tracing::debug!("Published goal {} on {}", goal_id, self.keys.goal);
        Ok(())
    }

    async fn cancel_goal(&self, goal_id: Uuid) -> Result<()> {
        lock_pending(&self.pending).remove(&goal_id);

        let payload = serde_json::to_vec(&CancelRequest { goal_id })?;
        self.cancel_pub
            .put(payload)
            .await
            .map_err(|e| transport_error("publish cancel on", &self.keys.cancel, e))?;
        tracing::info!("Requested cancel of goal {}", goal_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_grabber_lib::{CompletionTracker, GoalOutcome, GoalState};

    #[test]
    fn test_service_keys() {
        let keys = ServiceKeys::new(&ServiceConfig {
            name: "object_grabber_action_service".to_string(),
            key_prefix: "manipulation/".to_string(),
        });

        assert_eq!(keys.alive, "manipulation/object_grabber_action_service/alive");
        assert_eq!(keys.goal, "manipulation/object_grabber_action_service/goal");
        assert_eq!(keys.cancel, "manipulation/object_grabber_action_service/cancel");
        assert_eq!(keys.result, "manipulation/object_grabber_action_service/result");
    }

    #[test]
    fn test_route_result_completes_matching_goal_once() {
        let tracker = CompletionTracker::new();
        let pending: PendingGoals = Arc::new(Mutex::new(HashMap::new()));
        let goal_id = Uuid::new_v4();
        pending.lock().unwrap().insert(goal_id, tracker.reset());

        let result = GoalResult {
            goal_id,
            state: GoalState::Succeeded,
            return_code: 0,
        };
        route_result(&pending, result.clone());
        assert_eq!(tracker.last_outcome(), Some(GoalOutcome::new(GoalState::Succeeded, 0)));
        assert!(pending.lock().unwrap().is_empty());

        // a repeated result has no sender left and leaves the outcome alone
        route_result(
            &pending,
            GoalResult {
                state: GoalState::Aborted,
                ..result
            },
        );
        assert_eq!(tracker.last_outcome(), Some(GoalOutcome::new(GoalState::Succeeded, 0)));
    }

    #[test]
    fn test_route_result_ignores_unknown_goal() {
        let tracker = CompletionTracker::new();
        let pending: PendingGoals = Arc::new(Mutex::new(HashMap::new()));
        pending.lock().unwrap().insert(Uuid::new_v4(), tracker.reset());

        route_result(
            &pending,
            GoalResult {
                goal_id: Uuid::new_v4(),
                state: GoalState::Succeeded,
                return_code: 0,
            },
        );

        assert!(!tracker.is_complete());
        assert_eq!(pending.lock().unwrap().len(), 1);
    }
}
