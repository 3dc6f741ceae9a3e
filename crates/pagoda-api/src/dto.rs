// SPDX-License-Identifier: Apache-2.0

use serde::Deserialize;

/// Admin login body. The response carries the signed session token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}
