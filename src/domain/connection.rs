use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    NotConfigured,
    NotInitialized,
    NotSignedIn,
    Connected,
}

impl ConnectionState {
    pub fn label(self) -> &'static str {
        match self {
            Self::NotConfigured => "Not Configured",
            Self::NotInitialized => "Not Initialized",
            Self::NotSignedIn => "Not Signed In",
            Self::Connected => "Connected",
        }
    }

    fn message(self) -> &'static str {
        match self {
            Self::NotConfigured => "API credentials not set",
            Self::NotInitialized => "Google API not loaded",
            Self::NotSignedIn => "Please sign in to Google Calendar",
            Self::Connected => "Google Calendar connected",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub state: ConnectionState,
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// Inputs sampled from the calendar service each time status is requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionProbe {
    pub credentials_present: bool,
    pub client_loaded: bool,
    pub signed_in: bool,
    pub user_name: Option<String>,
}

/// Checks credentials, then client handle, then session, in that order.
pub fn resolve_connection_status(probe: &ConnectionProbe) -> ConnectionStatus {
    let state = if !probe.credentials_present {
        ConnectionState::NotConfigured
    } else if !probe.client_loaded {
        ConnectionState::NotInitialized
    } else if !probe.signed_in {
        ConnectionState::NotSignedIn
    } else {
        ConnectionState::Connected
    };

    let user = (state == ConnectionState::Connected).then(|| {
        probe
            .user_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or("Unknown")
            .to_string()
    });

    ConnectionStatus {
        connected: state == ConnectionState::Connected,
        state,
        status: state.label().to_string(),
        message: state.message().to_string(),
        user,
    }
}
