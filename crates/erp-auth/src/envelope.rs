//! Response envelope of the ERP REST API
//!
//! Every endpoint answers `{success, message, data}`; some older endpoints
//! use `result` instead of `data`. Auth endpoints put the bearer token either
//! at the top level (`accessToken`) or inside `data`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Generic `{success, message, data|result}` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(alias = "result")]
    pub data: Option<T>,
    #[serde(default, rename = "accessToken")]
    pub access_token: Option<String>,
}

impl<T: serde::de::DeserializeOwned> Envelope<T> {
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| Error::InvalidResponse(format!("decoding response envelope: {e}")))
    }
}

impl Envelope<LoginData> {
    /// Bearer token from the top level, falling back to `data.accessToken`.
    ///
    /// Empty strings count as absent.
    pub fn bearer(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .or_else(|| self.data.as_ref().and_then(|d| d.access_token.as_deref()))
            .filter(|t| !t.trim().is_empty())
    }

    pub fn requires_two_factor(&self) -> bool {
        self.data
            .as_ref()
            .and_then(|d| d.two_fa)
            .unwrap_or(false)
    }
}

/// User record returned by login, refresh and profile endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginData {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub two_fa: Option<bool>,
    #[serde(default, rename = "type")]
    pub user_type: String,
    #[serde(default, rename = "accessToken", skip_serializing)]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Role {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub role_name: String,
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub is_main_role: bool,
}
