//! Stand-ins for the remote API and the UI, shared by unit tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;

use crate::api::{ApiError, ApiRequest, ApiResponse, Notice, Notifier, Transport};

type Hook = (usize, Box<dyn FnOnce() + Send>);

/// Replays scripted results in order and records what was sent.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Result<ApiResponse, ApiError>>>,
    sent: Mutex<Vec<ApiRequest>>,
    hook: Mutex<Option<Hook>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(&self, status: StatusCode, body: &str) {
        self.script.lock().push_back(Ok(ApiResponse {
            status,
            body: body.to_string(),
        }));
    }

    pub(crate) fn fail(&self, error: ApiError) {
        self.script.lock().push_back(Err(error));
    }

    /// Run `hook` while the `call`-th request (0-based) is in flight.
    pub(crate) fn during_call(&self, call: usize, hook: impl FnOnce() + Send + 'static) {
        *self.hook.lock() = Some((call, Box::new(hook)));
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let call = {
            let mut sent = self.sent.lock();
            sent.push(request.clone());
            sent.len() - 1
        };
        let hook = {
            let mut slot = self.hook.lock();
            match slot.take() {
                Some((at, hook)) if at == call => Some(hook),
                other => {
                    *slot = other;
                    None
                }
            }
        };
        if let Some(hook) = hook {
            hook();
        }
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Network("no scripted response".to_string())))
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub(crate) fn messages(&self) -> Vec<String> {
        self.notices.lock().iter().map(|n| n.message.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}
