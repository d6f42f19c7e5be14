use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a signed token may be used for. A token of one kind is never
/// accepted where the other is expected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Session,
    Reset,
}

/// JWT payload shared by session and reset tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,      // user ID
    pub iat: i64,       // issued at (unix timestamp)
    pub exp: i64,       // expires at (unix timestamp)
    pub kind: TokenKind,
    #[serde(default)]
    pub remember: bool, // sessions only
}
