//! # Request Origin
//!
//! The pure half of tenant resolution: what a request tells us about the
//! tenant before any lookup happens.
//!
//! ```text
//! Host: tienda1.caja.cl:8000      X-Tenant-ID: 3b1f…
//!          │                              │
//!          ▼ strip port, split on '.'     │
//!   ["tienda1","caja","cl"]               │
//!          │ more than two labels?        │
//!          ▼                              ▼
//!   subdomain = "tienda1"           tenant_header = "3b1f…"
//! ```
//!
//! The lookups themselves (active tenants only, default policy) live in
//! `caja_db::resolver`.

use serde::{Deserialize, Serialize};

/// Origin data of one inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOrigin {
    /// Value of the `Host` header, possibly with a port.
    pub host: Option<String>,
    /// Value of the explicit tenant header.
    pub tenant_header: Option<String>,
}

impl RequestOrigin {
    pub fn new(host: Option<&str>, tenant_header: Option<&str>) -> Self {
        RequestOrigin {
            host: host.map(str::to_string),
            tenant_header: tenant_header.map(str::to_string),
        }
    }

    pub fn from_host(host: &str) -> Self {
        RequestOrigin::new(Some(host), None)
    }

    pub fn from_header(tenant_id: &str) -> Self {
        RequestOrigin::new(None, Some(tenant_id))
    }

    /// Subdomain candidate, lowercased.
    ///
    /// `localhost`, `caja.cl` and bare IPs with no subdomain yield `None`.
    pub fn subdomain(&self) -> Option<String> {
        let host = self.host.as_deref()?.trim();
        let host = host.split(':').next().unwrap_or(host);

        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() <= 2 {
            return None;
        }
        // 10.0.0.5 is not a subdomain.
        if labels.iter().all(|l| !l.is_empty() && l.chars().all(|c| c.is_ascii_digit())) {
            return None;
        }

        let first = labels[0].trim();
        if first.is_empty() {
            None
        } else {
            Some(first.to_ascii_lowercase())
        }
    }

    /// Non-blank tenant header value.
    pub fn header_tenant_id(&self) -> Option<&str> {
        self.tenant_header
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}
