use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Organizer,
    Regular,
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "organizer" => Ok(Role::Organizer),
            "regular" => Ok(Role::Regular),
            _ => Err(()),
        }
    }
}

/// The authenticated user on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn organizer(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Organizer,
        }
    }

    pub fn regular(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Regular,
        }
    }

    pub fn is_organizer(&self) -> bool {
        self.role == Role::Organizer
    }
}
