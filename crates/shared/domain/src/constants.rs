//! Domain-level constants.
//!
//! These constants define account defaults and the messages returned to callers.

// =============================================================================
// Account Defaults
// =============================================================================

/// Model selection assigned when registration does not name one
pub const DEFAULT_MODEL: &str = "default";

// =============================================================================
// Failure Messages
// =============================================================================

/// Registration collided with an existing username or email
pub const MSG_ACCOUNT_IN_USE: &str = "Username or email is already in use.";

/// Login identifier matched no account
pub const MSG_IDENTIFIER_NOT_FOUND: &str = "Username or email not found.";

/// Login password did not verify
pub const MSG_INCORRECT_PASSWORD: &str = "Incorrect password.";

/// Lookup by id matched no account
pub const MSG_ACCOUNT_NOT_FOUND: &str = "User not found.";

/// Edit tried to take another account's email as username
pub const MSG_USERNAME_MATCHES_EMAIL: &str =
    "Username cannot be the same as an existing user's email.";

/// Edit tried to take another account's username
pub const MSG_USERNAME_IN_USE: &str = "Username is already in use.";

/// Edit tried to take another account's username as email
pub const MSG_EMAIL_MATCHES_USERNAME: &str =
    "Email cannot be the same as an existing user's username.";

/// Edit tried to take another account's email
pub const MSG_EMAIL_IN_USE: &str = "Email is already in use.";

// =============================================================================
// Success Messages
// =============================================================================

pub const MSG_REGISTERED: &str = "User successfully registered.";
pub const MSG_LOGGED_IN: &str = "Login successful.";
pub const MSG_LOGGED_OUT: &str = "Logout successful.";
pub const MSG_EDITED: &str = "User successfully edited.";
pub const MSG_DELETED: &str = "User successfully deleted.";
