//! Contact and newsletter forms.
//!
//! Neither form is delivered anywhere yet; validation produces the value an
//! outbound integration would send.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Email, EmailError};

/// Maximum length of a contact message body.
pub const MAX_MESSAGE_LENGTH: usize = 5000;

/// Errors that can occur when submitting the contact form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContactError {
    #[error("name is required")]
    MissingName,
    #[error("message is required")]
    MissingMessage,
    #[error("message must be at most {max} characters")]
    MessageTooLong { max: usize },
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),
}

/// Raw contact form input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// A validated contact message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: Email,
    pub message: String,
}

impl ContactForm {
    /// Validate the form. On success the form is cleared.
    ///
    /// # Errors
    ///
    /// Returns a [`ContactError`] for a blank name or message, an overlong
    /// message, or an invalid email. The form is left untouched on error.
    pub fn submit(&mut self) -> Result<ContactMessage, ContactError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ContactError::MissingName);
        }
        let email = Email::parse(&self.email)?;
        let message = self.message.trim();
        if message.is_empty() {
            return Err(ContactError::MissingMessage);
        }
        if message.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(ContactError::MessageTooLong {
                max: MAX_MESSAGE_LENGTH,
            });
        }

        let submitted = ContactMessage {
            name: name.to_string(),
            email,
            message: message.to_string(),
        };
        *self = Self::default();
        Ok(submitted)
    }
}

/// A newsletter subscription request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsletterSignup {
    pub email: Email,
}

impl NewsletterSignup {
    /// # Errors
    ///
    /// Returns an [`EmailError`] if the address is blank or malformed.
    pub fn parse(email: &str) -> Result<Self, EmailError> {
        Ok(Self {
            email: Email::parse(email)?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> ContactForm {
        ContactForm {
            name: " Ana ".to_string(),
            email: "ana@exemplo.com".to_string(),
            message: "Quero saber sobre Bali.".to_string(),
        }
    }

    #[test]
    fn test_submit_valid_clears_form() {
        let mut form = form();
        let message = form.submit().unwrap();
        assert_eq!(message.name, "Ana");
        assert_eq!(message.email.as_str(), "ana@exemplo.com");
        assert_eq!(form, ContactForm::default());
    }

    #[test]
    fn test_submit_errors_keep_form() {
        let mut blank_name = ContactForm {
            name: "  ".to_string(),
            ..form()
        };
        assert_eq!(blank_name.submit(), Err(ContactError::MissingName));
        assert_eq!(blank_name.email, "ana@exemplo.com");

        let mut bad_email = ContactForm {
            email: "ana".to_string(),
            ..form()
        };
        assert!(matches!(
            bad_email.submit(),
            Err(ContactError::InvalidEmail(_))
        ));

        let mut no_message = ContactForm {
            message: String::new(),
            ..form()
        };
        assert_eq!(no_message.submit(), Err(ContactError::MissingMessage));

        let mut long = ContactForm {
            message: "a".repeat(MAX_MESSAGE_LENGTH + 1),
            ..form()
        };
        assert!(matches!(
            long.submit(),
            Err(ContactError::MessageTooLong { .. })
        ));
    }

    #[test]
    fn test_newsletter_signup() {
        assert!(NewsletterSignup::parse("leitor@exemplo.com").is_ok());
        assert_eq!(NewsletterSignup::parse(""), Err(EmailError::Empty));
    }
}
