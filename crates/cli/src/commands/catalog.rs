//! Catalog browsing commands.
//!
//! # Usage
//!
//! ```bash
//! # All experiences, or filtered
//! viva experiences --kind gastronomica --budget 2000-4000
//! viva experiences --weekend
//!
//! # One experience in detail
//! viva experience exp2
//!
//! # Destinations and blog articles
//! viva destinations
//! viva blog --category dicas
//! ```

use std::io::Write;

use viva_mais_core::ExperienceId;
use viva_mais_core::catalog::{
    ArticleCategory, BudgetRange, Catalog, DurationFilter, Experience, ExperienceFilter,
    ExperienceKind,
};

use super::CommandError;

/// Raw filter arguments as given on the command line.
#[derive(Debug, Default)]
pub struct FilterArgs {
    pub kind: Option<String>,
    pub days: Option<u8>,
    pub weekend: bool,
    pub budget: Option<String>,
    pub difficulty: Option<String>,
}

impl FilterArgs {
    fn into_filter(self) -> Result<ExperienceFilter, CommandError> {
        let duration = match (self.days, self.weekend) {
            (_, true) => Some(DurationFilter::Weekend),
            (Some(days), false) => Some(DurationFilter::Days(days)),
            (None, false) => None,
        };
        Ok(ExperienceFilter {
            kind: self
                .kind
                .as_deref()
                .map(str::parse::<ExperienceKind>)
                .transpose()?,
            duration,
            budget: self
                .budget
                .as_deref()
                .map(str::parse::<BudgetRange>)
                .transpose()?,
            difficulty: self.difficulty.filter(|d| !d.trim().is_empty()),
        })
    }
}

/// List experiences matching the filter.
///
/// # Errors
///
/// Returns error if a filter argument is not recognized or output fails.
pub fn experiences(
    out: &mut impl Write,
    catalog: &Catalog,
    args: FilterArgs,
) -> Result<(), CommandError> {
    let filter = args.into_filter()?;
    let mut found = 0;
    for experience in catalog.filter(&filter) {
        write_summary(out, experience)?;
        found += 1;
    }
    if found == 0 {
        writeln!(
            out,
            "Nenhuma experiência encontrada com os filtros selecionados."
        )?;
    }
    Ok(())
}

/// Show one experience in full.
///
/// # Errors
///
/// Returns error if the id is malformed or not in the catalog.
pub fn experience(out: &mut impl Write, catalog: &Catalog, id: &str) -> Result<(), CommandError> {
    let id = ExperienceId::parse(id)?;
    let experience = catalog
        .experience(&id)
        .ok_or_else(|| CommandError::UnknownExperience(id.to_string()))?;

    writeln!(out, "{}", experience.name)?;
    writeln!(out, "  Tipo:      {}", experience.kind.label())?;
    writeln!(out, "  Destino:   {}", experience.destination)?;
    writeln!(out, "  Duração:   {}", experience.duration_label())?;
    writeln!(out, "  Preço:     {}", experience.price)?;
    writeln!(
        out,
        "  Avaliação: {} {} ({} avaliações)",
        experience.stars(),
        experience.rating,
        experience.reviews
    )?;
    writeln!(out)?;
    writeln!(out, "{}", experience.description)?;
    writeln!(out)?;
    writeln!(out, "{}", experience.details)?;
    Ok(())
}

/// List destinations.
///
/// # Errors
///
/// Returns error if output fails.
pub fn destinations(out: &mut impl Write, catalog: &Catalog) -> Result<(), CommandError> {
    for destination in catalog.destinations() {
        writeln!(
            out,
            "{:<6} {:<28} {}",
            destination.id, destination.name, destination.description
        )?;
    }
    Ok(())
}

/// List blog articles, optionally from one category.
///
/// # Errors
///
/// Returns error if the category is not recognized or output fails.
pub fn blog(
    out: &mut impl Write,
    catalog: &Catalog,
    category: Option<&str>,
) -> Result<(), CommandError> {
    let category = category.map(str::parse::<ArticleCategory>).transpose()?;
    let articles: Vec<_> = match category {
        Some(category) => catalog.articles_in(category).collect(),
        None => catalog.articles().iter().collect(),
    };

    for article in articles {
        writeln!(
            out,
            "{}  [{}]  {}",
            article.published_on.format("%d/%m/%Y"),
            article.category,
            article.title
        )?;
        writeln!(out, "    {}", article.excerpt)?;
    }
    Ok(())
}

/// One line per experience: id, name, destination, duration and price.
pub(crate) fn write_summary(out: &mut impl Write, experience: &Experience) -> std::io::Result<()> {
    writeln!(
        out,
        "{:<6} {:<40} {:<24} {:<8} {}",
        experience.id,
        experience.name,
        experience.destination,
        experience.duration_label(),
        experience.price
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn run(args: FilterArgs) -> String {
        let mut out = Vec::new();
        experiences(&mut out, &Catalog::builtin(), args).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_unfiltered_listing_has_every_experience() {
        let output = run(FilterArgs::default());
        assert_eq!(output.lines().count(), Catalog::builtin().experiences().len());
    }

    #[test]
    fn test_empty_result_message() {
        let output = run(FilterArgs {
            days: Some(30),
            ..FilterArgs::default()
        });
        assert!(output.contains("Nenhuma experiência encontrada"));
    }

    #[test]
    fn test_weekend_wins_over_days() {
        let filter = FilterArgs {
            days: Some(7),
            weekend: true,
            ..FilterArgs::default()
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.duration, Some(DurationFilter::Weekend));
    }

    #[test]
    fn test_bad_kind_is_rejected() {
        let mut out = Vec::new();
        let result = experiences(
            &mut out,
            &Catalog::builtin(),
            FilterArgs {
                kind: Some("submarino".to_string()),
                ..FilterArgs::default()
            },
        );
        assert!(matches!(result, Err(CommandError::InvalidArgument(_))));
    }

    #[test]
    fn test_unknown_experience() {
        let mut out = Vec::new();
        let result = experience(&mut out, &Catalog::builtin(), "exp99");
        assert!(matches!(result, Err(CommandError::UnknownExperience(_))));
    }

    #[test]
    fn test_blog_by_category() {
        let mut out = Vec::new();
        blog(&mut out, &Catalog::builtin(), Some("Dicas")).unwrap();
        let output = String::from_utf8(out).unwrap();
        assert!(!output.is_empty());
        assert!(output.lines().all(|l| l.starts_with("    ") || l.contains("[Dicas]")));
    }
}
