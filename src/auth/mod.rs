mod middleware;
mod password;
mod session;
mod token;

pub use middleware::{AuthError, RequireSession};
pub use password::{hash_password, verify_password};
pub use session::{
    ADMIN_SESSION_TTL_SECS, Claims, SESSION_COOKIE, SessionManager, SessionSubject,
    USER_SESSION_TTL_SECS,
};
pub use token::{generate_booking_token, generate_signing_key};
