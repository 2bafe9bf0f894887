//! Favorites and identity commands.
//!
//! # Usage
//!
//! ```bash
//! viva favorites list
//! viva favorites add exp1
//! viva favorites remove exp1
//! viva whoami
//! viva sign-out
//! ```
//!
//! # Environment Variables
//!
//! See `viva_mais_sync::config`. Without `VIVA_PROVIDER_CONFIG` the session
//! runs in degraded mode and favorites cannot be changed.

use std::io::Write;
use std::time::Duration;

use tracing::warn;
use viva_mais_core::ExperienceId;
use viva_mais_core::catalog::{Catalog, FavoriteEntry};
use viva_mais_sync::{IdentitySource, Session};

use super::{CommandError, print_notification};

/// How long `list` waits for the first favorites snapshot.
const SYNC_TIMEOUT: Duration = Duration::from_secs(10);

/// Print the visitor's favorites resolved against the catalog.
///
/// # Errors
///
/// Returns error if output fails.
pub async fn list(
    out: &mut impl Write,
    session: &Session,
    catalog: &Catalog,
) -> Result<(), CommandError> {
    if tokio::time::timeout(SYNC_TIMEOUT, session.wait_synced())
        .await
        .is_err()
    {
        warn!("Favorites not synchronized in time, showing cached state");
    }
    write_entries(out, session, catalog)?;
    Ok(())
}

/// Add a catalog experience to the favorites.
///
/// # Errors
///
/// Returns error if the id is not a catalog experience or the write fails.
pub async fn add(
    out: &mut impl Write,
    session: &Session,
    catalog: &Catalog,
    id: &str,
) -> Result<(), CommandError> {
    let id = catalog_id(catalog, id)?;
    let result = session.add_favorite(id).await;
    print_notification(out, session)?;
    Ok(result?)
}

/// Remove an experience from the favorites.
///
/// Ids no longer in the catalog can still be removed.
///
/// # Errors
///
/// Returns error if the id is malformed or the write fails.
pub async fn remove(out: &mut impl Write, session: &Session, id: &str) -> Result<(), CommandError> {
    let id = ExperienceId::parse(id)?;
    let result = session.remove_favorite(id).await;
    print_notification(out, session)?;
    Ok(result?)
}

/// Print the visitor id and where it came from.
///
/// # Errors
///
/// Returns error if output fails.
pub fn whoami(out: &mut impl Write, session: &Session) -> Result<(), CommandError> {
    let state = session.identity();
    let visitor = state
        .visitor
        .as_ref()
        .map_or_else(|| "(none)".to_string(), ToString::to_string);
    let source = match state.source {
        Some(IdentitySource::Remote) => "remote",
        Some(IdentitySource::Local) => "local",
        None => "unset",
    };
    writeln!(out, "visitor: {visitor}")?;
    writeln!(out, "source:  {source}")?;
    writeln!(
        out,
        "mode:    {}",
        if session.is_degraded() {
            "degraded"
        } else {
            "connected"
        }
    )?;
    Ok(())
}

/// End the visitor session and forget the saved sign-in.
///
/// # Errors
///
/// Returns error if the provider rejects the sign-out.
pub async fn sign_out(out: &mut impl Write, session: &Session) -> Result<(), CommandError> {
    let result = session.sign_out().await;
    print_notification(out, session)?;
    Ok(result?)
}

fn catalog_id(catalog: &Catalog, raw: &str) -> Result<ExperienceId, CommandError> {
    let id = ExperienceId::parse(raw)?;
    if catalog.experience(&id).is_none() {
        return Err(CommandError::UnknownExperience(id.to_string()));
    }
    Ok(id)
}

fn write_entries(
    out: &mut impl Write,
    session: &Session,
    catalog: &Catalog,
) -> std::io::Result<()> {
    let entries = session.favorite_entries(catalog);
    if entries.is_empty() {
        return writeln!(
            out,
            "Você ainda não adicionou nenhuma experiência aos favoritos."
        );
    }
    for entry in entries {
        match entry {
            FavoriteEntry::Found(experience) => super::catalog::write_summary(out, experience)?,
            FavoriteEntry::Missing(id) => {
                writeln!(out, "{id:<6} Experiência ID: {id} (Detalhes não encontrados)")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use viva_mais_core::VisitorId;
    use viva_mais_sync::SessionConfig;
    use viva_mais_sync::backend::MemoryBackend;

    use super::*;
    use crate::commands::ready;

    fn whoami_output(session: &Session) -> String {
        let mut out = Vec::new();
        whoami(&mut out, session).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_catalog_id_checks_catalog() {
        let catalog = Catalog::builtin();
        assert!(catalog_id(&catalog, "exp1").is_ok());
        assert!(matches!(
            catalog_id(&catalog, "exp42"),
            Err(CommandError::UnknownExperience(_))
        ));
        assert!(matches!(
            catalog_id(&catalog, "exp 1"),
            Err(CommandError::InvalidId(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_favorites_message() {
        let session = Session::offline(SessionConfig::default());
        session.start();
        let mut out = Vec::new();
        write_entries(&mut out, &session, &Catalog::builtin()).unwrap();
        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("nenhuma experiência"));
    }

    #[tokio::test]
    async fn test_consecutive_runs_keep_the_visitor() {
        let backend = MemoryBackend::new();
        let state_file = std::env::temp_dir()
            .join(format!("viva-cli-{}", VisitorId::generate()))
            .join("session.json");
        let config = SessionConfig {
            state_file: Some(state_file.clone()),
            ..SessionConfig::default()
        };

        // Each run starts a fresh client with nobody signed in.
        let first = ready(Session::with_backend(backend.clone(), config.clone())).await;
        let mut out = Vec::new();
        add(&mut out, &first, &Catalog::builtin(), "exp3").await.unwrap();
        let visitor = whoami_output(&first);
        drop(first);

        let second = ready(Session::with_backend(backend.reconnect(), config.clone())).await;
        assert_eq!(whoami_output(&second), visitor);
        assert!(visitor.contains("source:  remote"));
        second.wait_synced().await;
        let mut out = Vec::new();
        list(&mut out, &second, &Catalog::builtin()).await.unwrap();
        assert!(String::from_utf8(out).unwrap().contains("exp3"));

        sign_out(&mut Vec::new(), &second).await.unwrap();
        assert!(!state_file.exists());

        let third = ready(Session::with_backend(backend.reconnect(), config)).await;
        assert_ne!(whoami_output(&third), visitor);
    }
}
