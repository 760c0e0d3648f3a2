use futures_util::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

/// Read access to the media library, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuthorizationStatus {
    #[serde(rename = "AUTHORIZATION_GRANTED")]
    Granted,
    #[serde(rename = "AUTHORIZATION_DENIED")]
    Denied,
    #[serde(rename = "AUTHORIZATION_NOT_DETERMINED")]
    NotDetermined,
}

impl AuthorizationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthorizationStatus::Granted => "AUTHORIZATION_GRANTED",
            AuthorizationStatus::Denied => "AUTHORIZATION_DENIED",
            AuthorizationStatus::NotDetermined => "AUTHORIZATION_NOT_DETERMINED",
        }
    }

    /// Parses the `granted` / `denied` / `prompt` configuration values.
    pub fn from_access(v: &str) -> Option<Self> {
        match v.trim().to_ascii_lowercase().as_str() {
            "granted" => Some(AuthorizationStatus::Granted),
            "denied" => Some(AuthorizationStatus::Denied),
            "prompt" | "not_determined" => Some(AuthorizationStatus::NotDetermined),
            _ => None,
        }
    }
}

/// Answers whether the caller may read the media library.
pub trait PermissionGate: Send + Sync {
    fn status(&self) -> AuthorizationStatus;

    fn has_read_access(&self) -> bool {
        self.status() == AuthorizationStatus::Granted
    }

    /// Prompts if the status is undetermined and resolves to the outcome.
    fn request_read_access(&self) -> BoxFuture<'_, AuthorizationStatus>;
}

/// Gate with a fixed status. An undetermined status is settled on the first
/// request with the preconfigured prompt answer.
#[derive(Debug)]
pub struct StaticPermissionGate {
    status: Mutex<AuthorizationStatus>,
    prompt_answer: AuthorizationStatus,
}

impl StaticPermissionGate {
    pub fn new(status: AuthorizationStatus) -> Self {
        Self { status: Mutex::new(status), prompt_answer: AuthorizationStatus::Granted }
    }

    pub fn granted() -> Self {
        Self::new(AuthorizationStatus::Granted)
    }

    pub fn with_prompt_answer(mut self, answer: AuthorizationStatus) -> Self {
        self.prompt_answer = answer;
        self
    }
}

impl PermissionGate for StaticPermissionGate {
    fn status(&self) -> AuthorizationStatus {
        *self.status.lock()
    }

    fn request_read_access(&self) -> BoxFuture<'_, AuthorizationStatus> {
        let mut status = self.status.lock();
        if *status == AuthorizationStatus::NotDetermined {
            *status = self.prompt_answer;
            info!("read access prompt answered: {}", status.as_str());
        }
        future::ready(*status).boxed()
    }
}
