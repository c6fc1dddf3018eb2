use lettre::{
    Message, SmtpTransport, Transport,
    message::{SinglePart, header},
    transport::smtp::authentication::Credentials,
};
use std::{env, fs};

/// Send an HTML email over SMTP.
///
/// Loads the HTML template, substitutes placeholders (`{{code}}` and the
/// like), and sends through the relay configured via SMTP_* environment
/// variables. Uses STARTTLS.
pub async fn send_email(
    to_email: &str,
    subject: &str,
    template_path: &str,
    placeholders: &[(String, String)],
) -> Result<(), Box<dyn std::error::Error>> {
    let smtp_username = env::var("SMTP_USERNAME")?;
    let smtp_password = env::var("SMTP_PASSWORD")?;
    let smtp_server = env::var("SMTP_SERVER")?;
    let smtp_port: u16 = env::var("SMTP_PORT")?.parse()?;

    let mut html_template = fs::read_to_string(template_path)?;

    for (key, value) in placeholders {
        html_template = html_template.replace(key, value)
    }

    let email = Message::builder()
        .from(smtp_username.parse()?)
        .to(to_email.parse()?)
        .subject(subject)
        .header(header::ContentType::TEXT_HTML)
        .singlepart(
            SinglePart::builder()
                .header(header::ContentType::TEXT_HTML)
                .body(html_template),
        )?;

    let creds = Credentials::new(smtp_username.clone(), smtp_password.clone());
    let mailer = SmtpTransport::starttls_relay(&smtp_server)?
        .credentials(creds)
        .port(smtp_port)
        .build();

    mailer.send(&email).map_err(|e| {
        tracing::error!(to = %to_email, "failed to send email: {:?}", e);
        e
    })?;

    tracing::info!(to = %to_email, "email sent");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // A relay nobody listens on must surface as an error, not a logged
    // success; send_code turns this into a 500.
    #[tokio::test]
    async fn unreachable_relay_surfaces_as_error() {
        unsafe {
            env::set_var("SMTP_USERNAME", "noreply@team.example");
            env::set_var("SMTP_PASSWORD", "secret");
            env::set_var("SMTP_SERVER", "127.0.0.1");
            env::set_var("SMTP_PORT", "1");
        }

        let result = send_email(
            "fan@team.example",
            "Verification code",
            "src/mail/templates/Verification-code.html",
            &[
                ("{{code}}".to_string(), "123456".to_string()),
                ("{{expires_minutes}}".to_string(), "10".to_string()),
            ],
        )
        .await;

        assert!(result.is_err());
    }
}
