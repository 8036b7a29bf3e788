/// Authentication utilities
///
/// # Modules
///
/// - [`jwt`]: JWT token generation and validation
/// - [`middleware`]: Bearer-token extraction and the request `AuthContext`
///
/// # Security Features
///
/// - **JWT Tokens**: HS256 signing with issuer, expiry and not-before checks
/// - **Explicit identity**: every operation receives the acting user from
///   the validated token; unauthenticated requests are refused
///
/// # Example
///
/// ```
/// use organizit_shared::auth::jwt::{create_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let token = create_token(&Claims::new(Uuid::new_v4()), "secret-key-at-least-32-bytes-long")?;
/// assert!(!token.is_empty());
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod middleware;
