use serde::{Deserialize, Serialize};

use crate::room::models::Role;

/// JWT claims structure carrying the verified identity for a connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthClaims {
    pub email: String,
    pub username: String,
    pub role: Role,
    pub exp: usize, // Expiration timestamp (standard JWT claim)
    pub iat: usize, // Issued at timestamp (standard JWT claim)
}
