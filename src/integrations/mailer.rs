//! Transactional email through the Resend HTTP API.
//!
//! Delivery is best-effort: callers hand messages to
//! [`Mailer::send_in_background`] and failures are only logged.

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::MailConfig;
use crate::error::{Error, Result};
use crate::types::{Booking, BookingStatus};

const PORTAL_URL: &str = "https://fpsos.gg/booking";
const DISCORD_INVITE: &str = "https://discord.gg/9UXeaSx4SF";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone)]
pub struct Mailer {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    from_bookings: String,
    from_alerts: String,
    admin_email: Option<String>,
}

impl Mailer {
    pub fn new(config: &MailConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from_bookings: config.from_bookings.clone(),
            from_alerts: config.from_alerts.clone(),
            admin_email: config.admin_email.clone(),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn send(&self, email: &Email) -> Result<()> {
        let Some(api_key) = &self.api_key else {
            debug!(subject = %email.subject, "Mail delivery disabled, dropping message");
            return Ok(());
        };

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(email)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Integration(format!(
                "mail API returned {status}: {body}"
            )));
        }

        debug!(subject = %email.subject, "Email sent");
        Ok(())
    }

    /// Sends on a detached task. `None` and disabled delivery are no-ops.
    pub fn send_in_background(&self, email: Option<Email>) {
        let Some(email) = email else {
            return;
        };
        if !self.is_enabled() {
            return;
        }

        let mailer = self.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&email).await {
                warn!(subject = %email.subject, "Email delivery failed: {e}");
            }
        });
    }

    /// Receipt for the customer after a booking is submitted.
    #[must_use]
    pub fn booking_received(&self, booking: &Booking) -> Option<Email> {
        let to = booking.email.as_ref()?;

        let extras = if booking.add_ons.is_empty() {
            String::new()
        } else {
            format!(
                "<p><strong>Extras:</strong> {}</p>",
                escape_html(&booking.add_ons.join(", "))
            )
        };

        let html = format!(
            r#"<div style="font-family: sans-serif; padding: 20px; color: #333;">
<h1 style="color: #06b6d4;">Booking Received!</h1>
<p>Hi <strong>{name}</strong>,</p>
<p>We have received your booking request for <strong>{package}</strong>.</p>
<div style="background: #f4f4f5; padding: 15px; border-radius: 8px; margin: 20px 0;">
<h3 style="margin-top:0;">Session Details</h3>
<p><strong>Booking ID:</strong> #{id}</p>
<p><strong>Package:</strong> {package}</p>
<p><strong>Date/Time:</strong> {date_time}</p>
<p><strong>Total:</strong> {amount}</p>
{extras}
</div>
<div style="background: #fff3cd; border-left: 4px solid #ffc107; padding: 15px; margin: 20px 0;">
<h3 style="margin-top:0; color: #856404;">Payment Pending</h3>
<p style="color: #856404;">Your booking will be confirmed automatically once payment is received via PayPal.</p>
<p style="color: #856404;"><strong>Manage your booking:</strong> <a href="{PORTAL_URL}/{token}">Click here</a></p>
</div>
<h3>Next Steps</h3>
<ul>
<li>Complete payment via PayPal.</li>
<li>Join our <a href="{DISCORD_INVITE}">Discord server</a>.</li>
<li>DM the bot or an admin with your Booking ID: #{id}</li>
<li>Install TeamViewer or AnyDesk before the session.</li>
<li>Have your Windows license key ready if applicable.</li>
</ul>
<p><em>- The FPSOS Team</em></p>
</div>"#,
            name = escape_html(&booking.client_name),
            package = escape_html(&booking.package_name),
            id = booking.id,
            date_time = escape_html(&booking.date_time),
            amount = escape_html(&booking.amount),
            token = booking.booking_token,
        );

        Some(Email {
            from: self.from_bookings.clone(),
            to: vec![to.clone()],
            subject: format!(
                "Booking Received: {} - Payment Required",
                booking.package_name
            ),
            html,
        })
    }

    /// Alert to the operator about a new order.
    #[must_use]
    pub fn new_order_alert(&self, booking: &Booking) -> Option<Email> {
        let html = format!(
            r#"<div style="font-family: monospace; color: #333;">
<h1>New Order Received</h1>
<hr/>
{details}
</div>"#,
            details = booking_details(booking),
        );

        self.alert(
            format!(
                "NEW ORDER: {} ({})",
                booking.package_name, booking.client_name
            ),
            html,
        )
    }

    /// Customer notification after an admin changes the booking status.
    /// Pending has no notification.
    #[must_use]
    pub fn status_changed(&self, booking: &Booking, status: BookingStatus) -> Option<Email> {
        let to = booking.email.as_ref()?;

        let (subject, message, color) = match status {
            BookingStatus::Confirmed => (
                "Booking Confirmed",
                "Your session has been confirmed! We're all set for your optimization session.",
                "#4ade80",
            ),
            BookingStatus::Completed => (
                "Session Completed",
                "Thank you for choosing FPSOS! We hope you enjoyed the performance boost.",
                "#06b6d4",
            ),
            BookingStatus::Cancelled => (
                "Booking Cancelled",
                "Your booking has been cancelled. If this was a mistake, please contact us.",
                "#ef4444",
            ),
            BookingStatus::Pending => return None,
        };

        let html = format!(
            r#"<div style="font-family: sans-serif; padding: 20px; color: #333;">
<h1 style="color: {color};">{subject}</h1>
<p>Hi <strong>{name}</strong>,</p>
<p>{message}</p>
<div style="background: #f4f4f5; padding: 15px; border-radius: 8px; margin: 20px 0;">
<p><strong>Booking ID:</strong> #{id}</p>
<p><strong>Package:</strong> {package}</p>
<p><strong>Date/Time:</strong> {date_time}</p>
</div>
<p><em>- The FPSOS Team</em></p>
</div>"#,
            name = escape_html(&booking.client_name),
            id = booking.id,
            package = escape_html(&booking.package_name),
            date_time = escape_html(&booking.date_time),
        );

        Some(Email {
            from: self.from_bookings.clone(),
            to: vec![to.clone()],
            subject: format!("{subject} - Booking #{}", booking.id),
            html,
        })
    }

    #[must_use]
    pub fn payment_confirmed(&self, booking: &Booking, payment_id: &str) -> Option<Email> {
        let to = booking.email.as_ref()?;

        let html = format!(
            r#"<div style="font-family: sans-serif; padding: 20px; color: #333;">
<h1 style="color: #4ade80;">Payment Confirmed!</h1>
<p>Hi <strong>{name}</strong>,</p>
<p>Your payment has been received and your session is booked.</p>
<div style="background: #f4f4f5; padding: 15px; border-radius: 8px; margin: 20px 0;">
<p><strong>Booking ID:</strong> #{id}</p>
<p><strong>Package:</strong> {package}</p>
<p><strong>Date/Time:</strong> {date_time}</p>
<p><strong>Amount Paid:</strong> {amount}</p>
<p><strong>Transaction ID:</strong> {payment_id}</p>
</div>
<p>Join our <a href="{DISCORD_INVITE}">Discord server</a> and have TeamViewer or AnyDesk ready.</p>
<p><em>- The FPSOS Team</em></p>
</div>"#,
            name = escape_html(&booking.client_name),
            id = booking.id,
            package = escape_html(&booking.package_name),
            date_time = escape_html(&booking.date_time),
            amount = escape_html(&booking.amount),
            payment_id = escape_html(payment_id),
        );

        Some(Email {
            from: self.from_bookings.clone(),
            to: vec![to.clone()],
            subject: "Payment Confirmed - Your Session is Booked!".to_string(),
            html,
        })
    }

    #[must_use]
    pub fn payment_alert(&self, booking: &Booking, payment_id: &str) -> Option<Email> {
        let html = format!(
            r#"<div style="font-family: monospace; color: #333;">
<h1>Payment Verified</h1>
<hr/>
<p><strong>Transaction:</strong> {payment_id}</p>
{details}
</div>"#,
            payment_id = escape_html(payment_id),
            details = booking_details(booking),
        );

        self.alert(format!("PAYMENT VERIFIED - Booking #{}", booking.id), html)
    }

    /// Forwards a contact-form submission to the operator.
    #[must_use]
    pub fn contact_alert(&self, reference: &str, fields: &[(&str, &str)]) -> Option<Email> {
        let rows: String = fields
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(label, value)| {
                format!(
                    "<p><strong>{}:</strong> {}</p>\n",
                    escape_html(label),
                    escape_html(value)
                )
            })
            .collect();

        let html = format!(
            r#"<div style="font-family: monospace; color: #333;">
<h1>Contact Request {reference}</h1>
<hr/>
{rows}</div>"#,
            reference = escape_html(reference),
        );

        self.alert(format!("CONTACT REQUEST {reference}"), html)
    }

    fn alert(&self, subject: String, html: String) -> Option<Email> {
        let to = self.admin_email.as_ref()?;
        Some(Email {
            from: self.from_alerts.clone(),
            to: vec![to.clone()],
            subject,
            html,
        })
    }
}

fn booking_details(booking: &Booking) -> String {
    format!(
        "<p><strong>Booking ID:</strong> #{id}</p>
<p><strong>Client:</strong> {name}</p>
<p><strong>Discord:</strong> {discord}</p>
<p><strong>Email:</strong> {email}</p>
<p><strong>Package:</strong> {package}</p>
<p><strong>Total:</strong> {amount}</p>
<p><strong>Date:</strong> {date_time}</p>
<p><strong>Add-Ons:</strong> {add_ons}</p>",
        id = booking.id,
        name = escape_html(&booking.client_name),
        discord = escape_html(&booking.discord_id),
        email = escape_html(booking.email.as_deref().unwrap_or("-")),
        package = escape_html(&booking.package_name),
        amount = escape_html(&booking.amount),
        date_time = escape_html(&booking.date_time),
        add_ons = escape_html(&booking.add_ons.join(", ")),
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
