use serde::Deserialize;

/// Protocol revisions this server speaks, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-03-26", "2024-11-05"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    ShuttingDown,
}

/// `clientInfo` from the initialize request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClientInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// Lifecycle of the single client connected over stdio.
#[derive(Debug, Clone)]
pub struct Session {
    state: SessionState,
    protocol_version: Option<&'static str>,
    client: Option<ClientInfo>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Uninitialized,
            protocol_version: None,
            client: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    pub fn client(&self) -> Option<&ClientInfo> {
        self.client.as_ref()
    }

    pub fn protocol_version(&self) -> Option<&'static str> {
        self.protocol_version
    }

    /// Record an initialize request and return the negotiated version.
    /// A repeated initialize renegotiates.
    pub fn initialize(&mut self, requested: Option<&str>, client: Option<ClientInfo>) -> &'static str {
        let version = negotiate(requested);
        self.state = SessionState::Ready;
        self.protocol_version = Some(version);
        self.client = client;
        version
    }

    pub fn shutdown(&mut self) {
        self.state = SessionState::ShuttingDown;
    }
}

/// Echo the client's version when supported, otherwise offer the newest.
pub fn negotiate(requested: Option<&str>) -> &'static str {
    requested
        .and_then(|r| SUPPORTED_PROTOCOL_VERSIONS.iter().copied().find(|v| *v == r))
        .unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0])
}
