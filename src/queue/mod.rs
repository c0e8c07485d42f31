use redis::{aio::ConnectionManager, Client};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::Result;
use crate::models::JobKind;

const QUEUE_KEY: &str = "mgs:jobs";

/// Message carried over the broker. Workers re-read the job row on claim;
/// the message only routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMessage {
    pub job_id: Uuid,
    pub kind: JobKind,
}

#[derive(Clone)]
pub struct JobQueue {
    connection: ConnectionManager,
}

impl JobQueue {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;

        Ok(Self { connection })
    }

    pub async fn enqueue(&self, message: &JobMessage) -> Result<()> {
        let payload = serde_json::to_string(message)
            .map_err(|e| crate::errors::AppError::Internal(e.into()))?;

        redis::cmd("LPUSH")
            .arg(QUEUE_KEY)
            .arg(payload)
            .query_async::<_, ()>(&mut self.connection.clone())
            .await?;

        Ok(())
    }

    /// Blocking pop with a timeout so worker loops can notice shutdown.
    /// Returns None on timeout or on a payload that fails to decode.
    pub async fn dequeue(&self, timeout_secs: u64) -> Result<Option<JobMessage>> {
        let reply: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(QUEUE_KEY)
            .arg(timeout_secs)
            .query_async(&mut self.connection.clone())
            .await?;

        let Some((_, payload)) = reply else {
            return Ok(None);
        };

        match serde_json::from_str(&payload) {
            Ok(message) => Ok(Some(message)),
            Err(e) => {
                tracing::warn!("Dropping undecodable queue message: {} ({})", payload, e);
                Ok(None)
            }
        }
    }

    pub async fn depth(&self) -> Result<i64> {
        let depth: i64 = redis::cmd("LLEN")
            .arg(QUEUE_KEY)
            .query_async(&mut self.connection.clone())
            .await?;

        Ok(depth)
    }

    pub async fn ping(&self) -> Result<()> {
        redis::cmd("PING")
            .query_async::<_, String>(&mut self.connection.clone())
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_round_trips_through_json() {
        let message = JobMessage {
            job_id: Uuid::new_v4(),
            kind: JobKind::VideoGeneration,
        };
        let payload = serde_json::to_string(&message).unwrap();
        let decoded: JobMessage = serde_json::from_str(&payload).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn message_kind_uses_wire_names() {
        let message = JobMessage {
            job_id: Uuid::new_v4(),
            kind: JobKind::VoiceClone,
        };
        let payload = serde_json::to_string(&message).unwrap();
        assert!(payload.contains("\"voice_clone\""));
    }
}
