//! User service boundary: record types, the `UserApi` port and its HTTP adapter.

pub mod http;

use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::ApiError;

pub use http::HttpUserApi;

/// Server-assigned identifier. The service decides its shape; any JSON
/// number or string is accepted and echoed back unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(u64),
    /// Negative or fractional ids.
    OtherNumber(Number),
    Text(String),
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UserId::Number(n) => write!(f, "{n}"),
            UserId::OtherNumber(n) => write!(f, "{n}"),
            UserId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for UserId {
    fn from(n: u64) -> Self {
        UserId::Number(n)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId::Text(s.to_string())
    }
}

/// One user as returned by the service.
///
/// Fields other than `id`, `name` and `email` are kept in `extra` so that a
/// PUT sends back the full object the service handed out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Missing and `null` both read as an empty string.
fn null_as_empty<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(de)?.unwrap_or_default())
}

impl UserRecord {
    pub fn new(id: impl Into<UserId>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            extra: Map::new(),
        }
    }

    pub fn field(&self, field: UserField) -> &str {
        match field {
            UserField::Name => &self.name,
            UserField::Email => &self.email,
        }
    }

    pub fn set_field(&mut self, field: UserField, value: String) {
        match field {
            UserField::Name => self.name = value,
            UserField::Email => self.email = value,
        }
    }
}

/// Body of a create request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

impl NewUser {
    pub fn field(&self, field: UserField) -> &str {
        match field {
            UserField::Name => &self.name,
            UserField::Email => &self.email,
        }
    }

    pub fn set_field(&mut self, field: UserField, value: String) {
        match field {
            UserField::Name => self.name = value,
            UserField::Email => self.email = value,
        }
    }

    /// Both fields carry something other than whitespace.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.email.trim().is_empty()
    }
}

/// Editable fields of a user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UserField {
    Name,
    Email,
}

impl UserField {
    /// The other field; used to cycle focus inside the forms.
    pub fn next(self) -> Self {
        match self {
            UserField::Name => UserField::Email,
            UserField::Email => UserField::Name,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UserField::Name => "Name",
            UserField::Email => "Email",
        }
    }
}

/// Transport-agnostic port to the user service.
#[async_trait]
pub trait UserApi: Send + Sync {
    async fn list_all(&self) -> Result<Vec<UserRecord>, ApiError>;
    async fn create(&self, user: &NewUser) -> Result<UserRecord, ApiError>;
    async fn update(&self, id: &UserId, user: &UserRecord) -> Result<UserRecord, ApiError>;
    async fn delete(&self, id: &UserId) -> Result<(), ApiError>;
}
