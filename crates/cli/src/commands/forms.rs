//! Trip-request, contact and newsletter commands.
//!
//! # Usage
//!
//! ```bash
//! viva trip-request --destination "Bonito, MS" --date 2025-07-10 \
//!     --preference natureza --preference aventura --profile casal --budget "R$ 5000"
//! viva contact --name "Ana" --email ana@example.com --message "Olá!"
//! viva newsletter ana@example.com
//! ```

use std::io::Write;

use chrono::NaiveDate;
use tracing::info;
use viva_mais_core::NotificationKind;
use viva_mais_core::catalog::ExperienceKind;
use viva_mais_core::forms::{ContactForm, NewsletterSignup};
use viva_mais_core::trip_request::{TravelerProfile, TripRequestWizard};
use viva_mais_sync::Session;

use super::{CommandError, print_notification};

const MSG_TRIP_SENT: &str = "Simulação de roteiro enviada! Entraremos em contato em breve.";
const MSG_CONTACT_SENT: &str = "Sua mensagem foi enviada com sucesso!";
const MSG_NEWSLETTER_OK: &str = "Obrigado por assinar nossa newsletter!";
const MSG_NEWSLETTER_INVALID: &str = "Por favor, insira um e-mail válido.";

/// Trip-request answers as given on the command line.
#[derive(Debug)]
pub struct TripRequestArgs {
    pub destination: String,
    pub date: Option<NaiveDate>,
    pub preferences: Vec<String>,
    pub profile: Option<String>,
    pub budget: String,
}

/// Walk the wizard with the given answers and submit it.
///
/// # Errors
///
/// Returns error if an answer is unrecognized or a required one is missing.
pub fn trip_request(
    out: &mut impl Write,
    session: &Session,
    args: TripRequestArgs,
) -> Result<(), CommandError> {
    let mut wizard = TripRequestWizard::new();
    wizard.destination = args.destination;
    wizard.date = args.date;
    for raw in &args.preferences {
        wizard.set_preference(raw.parse::<ExperienceKind>()?, true);
    }
    wizard.traveler_profile = args
        .profile
        .as_deref()
        .map(str::parse::<TravelerProfile>)
        .transpose()?;
    wizard.budget = args.budget;

    let outcome = match wizard.next().and_then(|_| wizard.next()) {
        Ok(_) => {
            writeln!(out, "{}", wizard.summary())?;
            wizard.submit()
        }
        Err(e) => Err(e),
    };

    match outcome {
        Ok(request) => {
            info!(destination = %request.destination, date = %request.date, "Trip request submitted");
            session.notify(MSG_TRIP_SENT, NotificationKind::Success);
            print_notification(out, session)?;
            Ok(())
        }
        Err(e) => {
            session.notify(e.to_string(), NotificationKind::Error);
            print_notification(out, session)?;
            Err(CommandError::Rejected(e.to_string()))
        }
    }
}

/// Submit the contact form.
///
/// # Errors
///
/// Returns error if a field is missing or the email is invalid.
pub fn contact(
    out: &mut impl Write,
    session: &Session,
    mut form: ContactForm,
) -> Result<(), CommandError> {
    match form.submit() {
        Ok(message) => {
            info!(email = %message.email, "Contact message submitted");
            session.notify(MSG_CONTACT_SENT, NotificationKind::Success);
            print_notification(out, session)?;
            Ok(())
        }
        Err(e) => {
            session.notify(e.to_string(), NotificationKind::Error);
            print_notification(out, session)?;
            Err(CommandError::Rejected(e.to_string()))
        }
    }
}

/// Sign an email up for the newsletter.
///
/// # Errors
///
/// Returns error if the email is invalid.
pub fn newsletter(out: &mut impl Write, session: &Session, email: &str) -> Result<(), CommandError> {
    match NewsletterSignup::parse(email) {
        Ok(signup) => {
            info!(domain = signup.email.domain(), "Newsletter signup");
            session.notify(MSG_NEWSLETTER_OK, NotificationKind::Success);
            print_notification(out, session)?;
            Ok(())
        }
        Err(e) => {
            session.notify(MSG_NEWSLETTER_INVALID, NotificationKind::Error);
            print_notification(out, session)?;
            Err(CommandError::Rejected(e.to_string()))
        }
    }
}
