use super::sendmail::send_email;

/// Email the six-digit registration code. The code itself goes in the body;
/// no link, the user types it back into the signup form.
pub async fn send_verification_code_email(
    to_email: &str,
    code: &str,
    expires_minutes: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let subject = "Your verification code";
    let template_path = "src/mail/templates/Verification-code.html";
    let placeholders = vec![
        ("{{code}}".to_string(), code.to_string()),
        (
            "{{expires_minutes}}".to_string(),
            expires_minutes.to_string(),
        ),
    ];

    send_email(to_email, subject, template_path, &placeholders).await
}
