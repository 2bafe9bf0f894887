//! End-to-end site flows: browsing, favoriting from the listing, the trip
//! request wizard and the contact form.
//!
//! Run with: cargo test -p viva-mais-integration-tests --test site_flows

#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use viva_mais_core::catalog::{
    BudgetRange, Catalog, DurationFilter, ExperienceFilter, ExperienceKind, FavoriteEntry,
};
use viva_mais_core::forms::ContactForm;
use viva_mais_core::trip_request::{Step, TravelerProfile, TripRequestWizard};
use viva_mais_core::{ExperienceId, FavoritesRecord, NotificationKind};
use viva_mais_integration_tests::{TestContext, favorite_set};

#[tokio::test]
async fn test_favorite_from_filtered_listing() {
    let ctx = TestContext::new().await;
    let catalog = Catalog::builtin();

    let filter = ExperienceFilter {
        kind: Some("gastronomica".parse::<ExperienceKind>().unwrap()),
        ..ExperienceFilter::default()
    };
    let picked: Vec<ExperienceId> = catalog.filter(&filter).map(|e| e.id.clone()).collect();
    assert!(!picked.is_empty());

    for id in &picked {
        ctx.session.add_favorite(id.clone()).await.unwrap();
    }
    let expected = picked.iter().cloned().collect();
    ctx.wait_favorites(&expected).await;

    let entries = ctx.session.favorite_entries(&catalog);
    assert_eq!(entries.len(), picked.len());
    assert!(entries.iter().all(|entry| matches!(
        entry,
        FavoriteEntry::Found(e) if e.kind == ExperienceKind::Gastronomic
    )));
}

#[tokio::test]
async fn test_dangling_favorite_is_listed_as_missing() {
    let ctx = TestContext::new().await;
    ctx.backend.put_document(
        &ctx.path(),
        FavoritesRecord {
            experiences: favorite_set(&["exp1", "retired-tour"]),
        },
    );
    ctx.wait_favorites(&favorite_set(&["exp1", "retired-tour"])).await;

    let catalog = Catalog::builtin();
    let missing: Vec<_> = ctx
        .session
        .favorite_entries(&catalog)
        .into_iter()
        .filter_map(|entry| match entry {
            FavoriteEntry::Missing(id) => Some(id),
            FavoriteEntry::Found(_) => None,
        })
        .collect();
    assert_eq!(missing, vec![ExperienceId::parse("retired-tour").unwrap()]);

    // A dangling id can still be removed.
    ctx.session
        .remove_favorite(ExperienceId::parse("retired-tour").unwrap())
        .await
        .unwrap();
    ctx.wait_favorites(&favorite_set(&["exp1"])).await;
}

#[test]
fn test_filters_combine() {
    let catalog = Catalog::builtin();

    let everything = ExperienceFilter::default();
    assert_eq!(catalog.filter(&everything).count(), catalog.experiences().len());

    let weekend_budget = ExperienceFilter {
        duration: Some(DurationFilter::Weekend),
        budget: Some(BudgetRange::UpTo2000),
        ..ExperienceFilter::default()
    };
    for experience in catalog.filter(&weekend_budget) {
        assert!(experience.duration_days <= 3);
        assert!(BudgetRange::UpTo2000.contains(&experience.price));
    }
}

#[tokio::test]
async fn test_trip_request_then_notification() {
    let ctx = TestContext::new().await;
    let travel_date = NaiveDate::from_ymd_opt(2025, 9, 12).unwrap();

    let mut wizard = TripRequestWizard::new();
    assert!(wizard.next().is_err());

    wizard.destination = "Chapada Diamantina, BA".to_string();
    wizard.date = Some(travel_date);
    assert_eq!(wizard.next().unwrap(), Step::Preferences);

    wizard.toggle_preference(ExperienceKind::Adventure);
    wizard.toggle_preference(ExperienceKind::Nature);
    wizard.traveler_profile = Some(TravelerProfile::Solo);
    assert_eq!(wizard.next().unwrap(), Step::Budget);
    assert_eq!(wizard.progress_percent(), 100);

    wizard.budget = "R$ 4000".to_string();
    let request = wizard.submit().unwrap();
    assert_eq!(request.destination, "Chapada Diamantina, BA");
    assert_eq!(request.preferences.len(), 2);
    assert_eq!(wizard.step(), Step::DestinationAndDate);

    ctx.session.notify(
        "Simulação de roteiro enviada! Entraremos em contato em breve.",
        NotificationKind::Success,
    );
    assert!(!ctx.session.notification().unwrap().is_error());
}

#[tokio::test]
async fn test_contact_form_rejects_then_accepts() {
    let ctx = TestContext::new().await;
    let mut form = ContactForm {
        name: "Carla".to_string(),
        email: "carla@".to_string(),
        message: "Quero saber sobre Bonito.".to_string(),
    };

    let err = form.submit().unwrap_err();
    ctx.session.notify(err.to_string(), NotificationKind::Error);
    assert!(ctx.session.notification().unwrap().is_error());
    assert_eq!(form.name, "Carla");

    form.email = "carla@example.com.br".to_string();
    let message = form.submit().unwrap();
    assert_eq!(message.email.domain(), "example.com.br");
    assert!(form.message.is_empty());
}
