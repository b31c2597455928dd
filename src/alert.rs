//! Email alerting on significant daily variation.

use chrono::Local;
use lettre::{
    Message,
    SmtpTransport,
    Transport,
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
};

use crate::{
    cli::SmtpArgs,
    prelude::*,
    quantity::{Pesos, Variation},
};

/// Absolute variation, in percent, from which an alert is sent.
const THRESHOLD_PERCENT: f64 = 2.0;

/// What the notifier did for this run. Suppressed alerts are outcomes,
/// not failures.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Outcome {
    Sent,
    NoVariation,
    BelowThreshold(Variation),
}

pub struct Notifier<'a> {
    smtp: &'a SmtpArgs,
}

impl<'a> Notifier<'a> {
    pub const fn new(smtp: &'a SmtpArgs) -> Self {
        Self { smtp }
    }

    /// Send the alert when the variation reaches the threshold.
    ///
    /// Transport and configuration failures are returned to the caller,
    /// which logs and carries on.
    #[instrument(skip_all)]
    pub fn notify(&self, value: Pesos, variation: Option<Variation>) -> Result<Outcome> {
        let Some(variation) = variation else {
            warn!("no variation available, not alerting");
            return Ok(Outcome::NoVariation);
        };
        if !exceeds_threshold(variation) {
            info!(%variation, threshold = THRESHOLD_PERCENT, "insufficient variation, not alerting");
            return Ok(Outcome::BelowThreshold(variation));
        }

        let from = self.smtp.from.as_deref().context("`EMAIL_FROM` is not set")?;
        let to = self.smtp.to.as_deref().context("`EMAIL_TO` is not set")?;
        let server = self.smtp.server.as_deref().context("`SMTP_SERVER` is not set")?;
        let password = self.smtp.password.as_deref().context("`EMAIL_PASS` is not set")?;

        let message = Message::builder()
            .from(from.parse().context("invalid sender address")?)
            .to(to.parse().context("invalid recipient address")?)
            .subject(format!("⚠️ Alerta Dólar: {variation} de variación"))
            .header(ContentType::TEXT_PLAIN)
            .body(build_body(value, variation))
            .context("failed to build the message")?;

        let transport = SmtpTransport::starttls_relay(server)
            .context("failed to set up the SMTP transport")?
            .port(self.smtp.port)
            .credentials(Credentials::new(from.to_string(), password.to_string()))
            .build();
        transport.send(&message).map_err(|error| {
            let code = error.status().map_or_else(|| "N/A".to_string(), |code| code.to_string());
            anyhow!("failed to send the alert (SMTP code: {code}): {error}")
        })?;

        info!(%variation, %value, to, "alert sent");
        Ok(Outcome::Sent)
    }
}

/// `abs(variation) < 2` is the suppression condition, so exactly ±2.00%
/// still alerts.
fn exceeds_threshold(variation: Variation) -> bool {
    variation.abs() >= THRESHOLD_PERCENT
}

fn build_body(value: Pesos, variation: Variation) -> String {
    format!(
        "Variación significativa del dólar detectada:\n\
         \n\
         • Valor actual: {value} CLP\n\
         • Variación: {variation}\n\
         • Hora: {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
    )
}
