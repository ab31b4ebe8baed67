mod server;

pub use server::{BusinessHours, MailConfig, PaypalConfig, RateLimits, ServerConfig};
