//! Permission checks against a verified claim set.

use crate::auth::claims::Claims;
use crate::errors::AuthError;

/// Require `permission` to be granted by `claims`.
///
/// # Errors
///
/// - `AuthError::MissingClaims` if the token carries no `permissions` claim
/// - `AuthError::Unauthorized` if the claim exists but does not list `permission`
pub fn check_permissions(permission: &str, claims: &Claims) -> Result<(), AuthError> {
    if claims.permissions.is_none() {
        return Err(AuthError::MissingClaims);
    }

    if claims.has_permission(permission) {
        Ok(())
    } else {
        tracing::debug!(target: "casting.auth", required = %permission, "Permission not granted");
        Err(AuthError::Unauthorized)
    }
}
