use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Staff,
    Admin,
}

impl Role {
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Staff | Role::Admin)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "staff" => Ok(Role::Staff),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role {other}")),
        }
    }
}

/// Личность вызывающего, уже проверенная слоем аутентификации.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub customer_id: Option<Uuid>,
    pub role: Role,
}

impl Caller {
    pub fn customer(customer_id: Uuid) -> Self {
        Self { customer_id: Some(customer_id), role: Role::Customer }
    }

    pub fn staff() -> Self {
        Self { customer_id: None, role: Role::Staff }
    }

    pub fn anonymous() -> Self {
        Self { customer_id: None, role: Role::Customer }
    }
}
