use crate::config::toml_config::is_unresolved_placeholder;
use crate::domain::model::Ticket;
use crate::utils::error::{EtlError, Result};

/// Environment variables searched for the ticket, in order.
pub const TICKET_ENV_VARS: [&str; 2] = ["MERCADO_PUBLICO_TICKET", "MP_TICKET"];

/// INSECURE: placeholder ticket for local testing against a mock server.
/// Only used when the caller explicitly opts in; the real API rejects it.
pub const INSECURE_LOCAL_TEST_TICKET: &str = "LOCAL-TEST-TICKET-NOT-FOR-PRODUCTION";

fn usable(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !is_unresolved_placeholder(v))
}

/// Resolves the ticket: explicit value, then config file, then environment,
/// then (only with `allow_insecure_default`) the local test placeholder.
pub fn resolve_ticket(
    explicit: Option<&str>,
    configured: Option<&str>,
    allow_insecure_default: bool,
) -> Result<Ticket> {
    resolve_ticket_with(explicit, configured, allow_insecure_default, |name| {
        std::env::var(name).ok()
    })
}

pub fn resolve_ticket_with<F>(
    explicit: Option<&str>,
    configured: Option<&str>,
    allow_insecure_default: bool,
    env_lookup: F,
) -> Result<Ticket>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(ticket) = usable(explicit) {
        tracing::debug!("Using ticket from command line");
        return Ok(Ticket::new(ticket));
    }

    if let Some(ticket) = usable(configured) {
        tracing::debug!("Using ticket from config file");
        return Ok(Ticket::new(ticket));
    }

    for name in TICKET_ENV_VARS {
        if let Some(ticket) = usable(env_lookup(name).as_deref()) {
            tracing::debug!("Using ticket from ${}", name);
            return Ok(Ticket::new(ticket));
        }
    }

    if allow_insecure_default {
        tracing::warn!(
            "⚠️ Using the insecure local test ticket; set {} for real runs",
            TICKET_ENV_VARS[0]
        );
        return Ok(Ticket::new(INSECURE_LOCAL_TEST_TICKET));
    }

    Err(EtlError::MissingCredential {
        tried: format!("--ticket, api.ticket, {}", TICKET_ENV_VARS.join(", ")),
    })
}
