//! In-memory backend for exercising the client without HTTP.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use snapline_net::{NetworkError, RemoteDataClient, Response};
use snapline_shared::types::Method;

type Scripted = (Option<Duration>, Result<Value, NetworkError>);

/// Replays scripted responses per `(method, path)` in FIFO order and
/// records every request it sees.
#[derive(Default)]
pub struct ScriptedRemote {
    script: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
    calls: Mutex<Vec<(Method, String)>>,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: Method, path: &str, result: Result<Value, NetworkError>) {
        self.push(method, path, None, result);
    }

    pub fn respond_after(
        &self,
        method: Method,
        path: &str,
        delay: Duration,
        result: Result<Value, NetworkError>,
    ) {
        self.push(method, path, Some(delay), result);
    }

    fn push(
        &self,
        method: Method,
        path: &str,
        delay: Option<Duration>,
        result: Result<Value, NetworkError>,
    ) {
        self.script
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back((delay, result));
    }

    pub fn calls(&self) -> Vec<(Method, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteDataClient for ScriptedRemote {
    async fn request(
        &self,
        method: Method,
        path: &str,
        _body: Option<Value>,
    ) -> Result<Response, NetworkError> {
        self.calls.lock().unwrap().push((method, path.to_string()));

        let next = self
            .script
            .lock()
            .unwrap()
            .get_mut(&(method, path.to_string()))
            .and_then(VecDeque::pop_front);

        let (delay, result) = next.unwrap_or_else(|| {
            (
                None,
                Err(NetworkError::Status {
                    status: 501,
                    message: format!("unscripted {method} {path}"),
                }),
            )
        });

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result.map(|body| Response::new(200, body))
    }
}
