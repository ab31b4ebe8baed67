use rand::Rng;

const TOKEN_PREFIX: &str = "fpsos";
const SECRET_BYTES: usize = 8;

/// Generates a customer portal token with the format: fpsos_<unix millis>_<hex>
#[must_use]
pub fn generate_booking_token() -> String {
    build_token(chrono::Utc::now().timestamp_millis(), &generate_secret())
}

/// Generates a cryptographically secure random hex string for the secret
#[must_use]
fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

#[must_use]
fn build_token(millis: i64, secret: &str) -> String {
    format!("{TOKEN_PREFIX}_{millis}_{secret}")
}

/// Generates a random signing key for when no session secret is configured.
#[must_use]
pub fn generate_signing_key() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}
