/// Middleware modules for the API server
///
/// - `security`: Response security headers
///
/// JWT authentication is a `from_fn_with_state` layer in `app`.

pub mod security;
