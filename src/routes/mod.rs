/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules.
/// Access control is applied explicitly at the module level, preventing
/// accidental exposure of protected endpoints.

/// Routes accessible to all users (anonymous, read-only).
pub mod public;

/// Account lifecycle routes: registration and login (anonymous-only guarded
/// inside the handlers) plus logout (requires an authenticated session).
pub mod account;

/// Routes whose operations are restricted to users with the 'admin' role.
/// The role check itself runs in the service-layer guard pipeline.
pub mod admin;
