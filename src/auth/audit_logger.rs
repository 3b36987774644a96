// Security event logging

use tracing::{info, warn};

/// Authentication event type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    AuthSuccess { subject: Option<String> },
    AuthFailure { reason: String },
}

/// Audit logger for authentication decisions on gated routes
#[derive(Debug, Clone, Default)]
pub struct AuditLogger {
    route: String,
}

impl AuditLogger {
    /// Create an audit logger bound to one route key
    pub fn new(route: impl Into<String>) -> Self {
        Self { route: route.into() }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    /// Log an authentication event
    pub fn log_auth_event(&self, event: &AuthEvent, ip_address: Option<&str>, user_agent: Option<&str>) {
        match event {
            AuthEvent::AuthSuccess { subject } => {
                info!(
                    route = %self.route,
                    subject = ?subject,
                    ip_address = ?ip_address,
                    user_agent = ?user_agent,
                    "Authentication successful"
                );
            }
            AuthEvent::AuthFailure { reason } => {
                warn!(
                    route = %self.route,
                    reason = %reason,
                    ip_address = ?ip_address,
                    user_agent = ?user_agent,
                    "Authentication failed"
                );
            }
        }
    }
}
