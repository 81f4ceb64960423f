use serde::{Deserialize, Serialize};

/// Permission carried by a delegated-access token.
///
/// Only `Read` exists: delegated tokens never grant write, delete or list
/// authority on the store. The wire code follows shared-access-signature
/// conventions (`sp=r`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Read,
}

impl Permission {
    pub fn code(&self) -> &'static str {
        match self {
            Permission::Read => "r",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "r" => Some(Permission::Read),
            _ => None,
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}
