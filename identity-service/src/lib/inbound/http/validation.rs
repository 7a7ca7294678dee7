//! Typed decoders for the auth request payloads.
//!
//! One decoder per operation, each producing either a domain command or an
//! ordered list of field-tagged errors. Callers branch on the fixed
//! per-form message tag, so the field names, ordering, and message text
//! here are wire contract.

use serde::Deserialize;
use serde::Serialize;

use crate::identity::models::DisplayName;
use crate::identity::models::EmailAddress;
use crate::identity::models::LoginCommand;
use crate::identity::models::RegisterCommand;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    fn required(field: &'static str) -> Self {
        Self::new(field, "Required")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignupForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtpForm {
    pub otp: Option<String>,
    #[serde(rename = "otpType")]
    pub otp_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordForm {
    pub otp: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileForm {
    pub name: Option<String>,
}

/// Decoded verify-account payload.
#[derive(Debug, Clone)]
pub struct VerifyAccountData {
    pub otp: String,
    pub otp_type: String,
}

/// Decoded reset-password payload.
#[derive(Debug, Clone)]
pub struct ResetPasswordData {
    pub otp: String,
    pub password: String,
}

pub fn decode_signup(form: SignupForm) -> Result<RegisterCommand, Vec<FieldError>> {
    let mut errors = Vec::new();

    let name = decode_name(&mut errors, form.name);
    let email = decode_email(&mut errors, form.email, "Invalid email address.");
    let password = decode_password(&mut errors, form.password);
    let confirm = match form.confirm_password {
        None => {
            errors.push(FieldError::required("confirmPassword"));
            None
        }
        Some(raw) => Some(raw),
    };

    // The cross-field check runs only once every field decodes cleanly.
    if errors.is_empty() {
        if let (Some(password), Some(confirm)) = (&password, &confirm) {
            if password != confirm {
                errors.push(FieldError::new("confirmPassword", "Password do not match."));
            }
        }
    }

    match (name, email, password) {
        (Some(name), Some(email), Some(password)) if errors.is_empty() => Ok(RegisterCommand {
            name,
            email,
            password,
        }),
        _ => Err(errors),
    }
}

pub fn decode_login(form: LoginForm) -> Result<LoginCommand, Vec<FieldError>> {
    let mut errors = Vec::new();

    let email = decode_email(&mut errors, form.email, "Invalid email address");
    let password = decode_password(&mut errors, form.password);

    match (email, password) {
        (Some(email), Some(password)) if errors.is_empty() => {
            Ok(LoginCommand { email, password })
        }
        _ => Err(errors),
    }
}

pub fn decode_verify(form: OtpForm) -> Result<VerifyAccountData, Vec<FieldError>> {
    let mut errors = Vec::new();

    let otp = match form.otp {
        None => {
            errors.push(FieldError::required("otp"));
            None
        }
        Some(raw) => {
            if raw.chars().count() < 6 {
                errors.push(FieldError::new("otp", "The OTP must be exactly 6 digits."));
            }
            if !(raw.len() == 6 && raw.chars().all(|c| c.is_ascii_digit())) {
                errors.push(FieldError::new("otp", "OTP must contain only numbers."));
            }
            Some(raw)
        }
    };
    let otp_type = match form.otp_type {
        None => {
            errors.push(FieldError::required("otpType"));
            None
        }
        Some(raw) => Some(raw),
    };

    match (otp, otp_type) {
        (Some(otp), Some(otp_type)) if errors.is_empty() => Ok(VerifyAccountData { otp, otp_type }),
        _ => Err(errors),
    }
}

pub fn decode_forgot_password(form: ForgotPasswordForm) -> Result<EmailAddress, Vec<FieldError>> {
    let mut errors = Vec::new();

    match decode_email(&mut errors, form.email, "Invalid email address.") {
        Some(email) if errors.is_empty() => Ok(email),
        _ => Err(errors),
    }
}

pub fn decode_reset_password(form: ResetPasswordForm) -> Result<ResetPasswordData, Vec<FieldError>> {
    let mut errors = Vec::new();

    let otp = match form.otp {
        None => {
            errors.push(FieldError::required("otp"));
            None
        }
        Some(raw) => {
            let length = raw.chars().count();
            if length < 6 {
                errors.push(FieldError::new("otp", "OTP must be exactly 6 digits."));
            }
            if length > 6 {
                errors.push(FieldError::new("otp", "OTP must be exactly 6 digits."));
            }
            if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
                errors.push(FieldError::new("otp", "OTP must contain only numbers."));
            }
            Some(raw)
        }
    };
    let password = decode_password(&mut errors, form.password);
    let confirm = match form.confirm_password {
        None => {
            errors.push(FieldError::required("confirmPassword"));
            None
        }
        Some(raw) => Some(raw),
    };

    if errors.is_empty() {
        if let (Some(password), Some(confirm)) = (&password, &confirm) {
            if password != confirm {
                errors.push(FieldError::new("confirmPassword", "Password do not match."));
            }
        }
    }

    match (otp, password) {
        (Some(otp), Some(password)) if errors.is_empty() => {
            Ok(ResetPasswordData { otp, password })
        }
        _ => Err(errors),
    }
}

pub fn decode_update_profile(form: UpdateProfileForm) -> Result<DisplayName, Vec<FieldError>> {
    let mut errors = Vec::new();

    match decode_name(&mut errors, form.name) {
        Some(name) if errors.is_empty() => Ok(name),
        _ => Err(errors),
    }
}

fn decode_name(errors: &mut Vec<FieldError>, name: Option<String>) -> Option<DisplayName> {
    match name {
        None => {
            errors.push(FieldError::required("name"));
            None
        }
        Some(raw) => match DisplayName::new(raw) {
            Ok(name) => Some(name),
            Err(_) => {
                errors.push(FieldError::new(
                    "name",
                    "Name must be at least 2 characters long.",
                ));
                None
            }
        },
    }
}

fn decode_email(
    errors: &mut Vec<FieldError>,
    email: Option<String>,
    message: &'static str,
) -> Option<EmailAddress> {
    match email {
        None => {
            errors.push(FieldError::required("email"));
            None
        }
        Some(raw) => match EmailAddress::new(raw) {
            Ok(email) => Some(email),
            Err(_) => {
                errors.push(FieldError::new("email", message));
                None
            }
        },
    }
}

fn decode_password(errors: &mut Vec<FieldError>, password: Option<String>) -> Option<String> {
    match password {
        None => {
            errors.push(FieldError::required("password"));
            None
        }
        Some(raw) => {
            if raw.chars().count() < 8 {
                errors.push(FieldError::new(
                    "password",
                    "Password must be at least 8 characters long.",
                ));
            }
            let has_lower = raw.chars().any(|c| c.is_ascii_lowercase());
            let has_upper = raw.chars().any(|c| c.is_ascii_uppercase());
            let has_digit = raw.chars().any(|c| c.is_ascii_digit());
            let has_special = raw.chars().any(|c| !c.is_ascii_alphanumeric());
            if !(has_lower && has_upper && has_digit && has_special) {
                errors.push(FieldError::new(
                    "password",
                    "Password must include uppercase, lowercase, number, and special character.",
                ));
            }
            Some(raw)
        }
    }
}
