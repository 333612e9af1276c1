use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Identifies one issued backend call so its reply can be matched up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallTicket(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum GatewayCall {
    ConnectivityCheck,
    LoadTable { path: PathBuf },
    QueryTable { path: PathBuf, query: String },
    FetchRemote { url: String },
}

impl GatewayCall {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConnectivityCheck => "connectivity_check",
            Self::LoadTable { .. } => "load_table",
            Self::QueryTable { .. } => "query_table",
            Self::FetchRemote { .. } => "fetch_remote",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum CallOutput {
    Text(String),
    Path(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayReply {
    pub ticket: CallTicket,
    pub result: Result<CallOutput, GatewayError>,
}

impl GatewayReply {
    pub fn ok(ticket: CallTicket, output: CallOutput) -> Self {
        Self {
            ticket,
            result: Ok(output),
        }
    }

    pub fn err(ticket: CallTicket, error: GatewayError) -> Self {
        Self {
            ticket,
            result: Err(error),
        }
    }
}
