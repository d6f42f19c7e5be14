use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_IMAGE: &str = "default.jpg";

/// Anything a login session can be bound to.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub image_file: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 PHC string
}

impl Identifiable for User {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Partial profile change; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub image_file: Option<String>,
}
