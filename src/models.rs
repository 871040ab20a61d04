use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(Deserialize, ToSchema)]
pub struct RegisterReq {
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
    #[schema(example = "john.doe@company.com")]
    pub email: String,
    #[schema(example = "John")]
    pub first_name: String,
    #[schema(example = "Doe")]
    pub last_name: String,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default)]
    #[schema(example = "Engineering")]
    pub department: String,
}

fn default_role() -> Role {
    Role::Employee
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub role: Role,
    pub exp: usize,
    pub jti: String,
    /// Session both tokens of a login belong to.
    pub sid: String,
    pub token_type: TokenType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
