use serde::{Deserialize, Serialize};

/// An authenticated identity, produced by the auth collaborator at
/// handshake time. The routing core never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            avatar_url: None,
        }
    }
}

/// JWT claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Principal id
    pub sub: String,
    /// Display name
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    pub exp: usize,
    pub iat: usize,
}

impl AccessClaims {
    pub fn into_principal(self) -> Principal {
        Principal {
            id: self.sub,
            display_name: self.name,
            avatar_url: self.avatar,
        }
    }
}
