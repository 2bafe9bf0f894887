//! Static catalog of experiences, destinations and blog articles.
//!
//! The catalog is read-only reference data built once at startup. Filtering
//! is a linear scan; with six experiences nothing smarter is warranted.

use core::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ArticleId, DestinationId, ExperienceId, FavoriteSet, Price};

/// Error parsing one of the catalog's enumerations from user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {what}: {value:?}")]
pub struct UnknownVariant {
    what: &'static str,
    value: String,
}

impl UnknownVariant {
    pub(crate) fn new(what: &'static str, value: &str) -> Self {
        Self {
            what,
            value: value.to_string(),
        }
    }
}

/// Lowercase and strip Portuguese diacritics so `Gastronômica` and
/// `gastronomica` compare equal.
#[must_use]
pub fn fold(s: &str) -> String {
    s.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

// =============================================================================
// Experiences
// =============================================================================

/// Kind of trip an experience offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceKind {
    Nature,
    Cultural,
    Gastronomic,
    Adventure,
    Relaxation,
}

impl ExperienceKind {
    pub const ALL: [Self; 5] = [
        Self::Nature,
        Self::Cultural,
        Self::Gastronomic,
        Self::Adventure,
        Self::Relaxation,
    ];

    /// Label shown on the site.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Nature => "Natureza",
            Self::Cultural => "Cultural",
            Self::Gastronomic => "Gastronômica",
            Self::Adventure => "Aventura",
            Self::Relaxation => "Relaxamento",
        }
    }
}

impl fmt::Display for ExperienceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExperienceKind {
    type Err = UnknownVariant;

    /// Accepts the site label in any case, with or without accents.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = fold(s.trim());
        Self::ALL
            .into_iter()
            .find(|kind| fold(kind.label()) == folded)
            .ok_or_else(|| UnknownVariant::new("experience kind", s))
    }
}

/// A bookable trip package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub id: ExperienceId,
    pub name: String,
    pub kind: ExperienceKind,
    pub duration_days: u8,
    pub destination: String,
    pub price: Price,
    pub image_url: String,
    pub description: String,
    /// Average rating out of 5.
    pub rating: Decimal,
    pub reviews: u32,
    /// Full itinerary with inclusions and exclusions.
    pub details: String,
}

impl Experience {
    /// Duration label as shown on the site, e.g. `7 dias`.
    #[must_use]
    pub fn duration_label(&self) -> String {
        if self.duration_days == 1 {
            "1 dia".to_string()
        } else {
            format!("{} dias", self.duration_days)
        }
    }

    /// Whole stars for the rating, e.g. `★★★★` for 4.8.
    #[must_use]
    pub fn stars(&self) -> String {
        let whole = self.rating.floor().to_usize().unwrap_or(0);
        "★".repeat(whole.min(5))
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Duration criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationFilter {
    /// Exactly this many days.
    Days(u8),
    /// Short trips of three days or fewer.
    Weekend,
}

impl DurationFilter {
    #[must_use]
    pub const fn matches(self, days: u8) -> bool {
        match self {
            Self::Days(n) => days == n,
            Self::Weekend => days <= 3,
        }
    }
}

/// Estimated-budget bands offered by the experience filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BudgetRange {
    /// Up to R$ 2000.
    UpTo2000,
    /// R$ 2000 to R$ 4000.
    From2000To4000,
    /// R$ 4000 to R$ 6000.
    From4000To6000,
    /// Above R$ 6000.
    Above6000,
}

impl BudgetRange {
    pub const ALL: [Self; 4] = [
        Self::UpTo2000,
        Self::From2000To4000,
        Self::From4000To6000,
        Self::Above6000,
    ];

    /// Whether `price` falls in the band. Lower bounds are exclusive except
    /// for the first band, so every amount belongs to exactly one band.
    #[must_use]
    pub fn contains(self, price: &Price) -> bool {
        let amount = price.amount;
        let (low, high) = self.bounds();
        low.is_none_or(|low| amount > low) && high.is_none_or(|high| amount <= high)
    }

    fn bounds(self) -> (Option<Decimal>, Option<Decimal>) {
        match self {
            Self::UpTo2000 => (None, Some(Decimal::from(2000))),
            Self::From2000To4000 => (Some(Decimal::from(2000)), Some(Decimal::from(4000))),
            Self::From4000To6000 => (Some(Decimal::from(4000)), Some(Decimal::from(6000))),
            Self::Above6000 => (Some(Decimal::from(6000)), None),
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::UpTo2000 => "Até R$ 2000",
            Self::From2000To4000 => "R$ 2000 - R$ 4000",
            Self::From4000To6000 => "R$ 4000 - R$ 6000",
            Self::Above6000 => "Acima de R$ 6000",
        }
    }
}

impl FromStr for BudgetRange {
    type Err = UnknownVariant;

    /// Accepts `2000`, `2000-4000`, `4000-6000` and `6000+`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "2000" | "-2000" | "0-2000" => Ok(Self::UpTo2000),
            "2000-4000" => Ok(Self::From2000To4000),
            "4000-6000" => Ok(Self::From4000To6000),
            "6000+" | "6000-" => Ok(Self::Above6000),
            other => Err(UnknownVariant::new("budget range", other)),
        }
    }
}

/// Criteria for the experience listing. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperienceFilter {
    pub kind: Option<ExperienceKind>,
    pub duration: Option<DurationFilter>,
    pub budget: Option<BudgetRange>,
    /// Substring looked up in the itinerary details.
    pub difficulty: Option<String>,
}

impl ExperienceFilter {
    #[must_use]
    pub fn matches(&self, experience: &Experience) -> bool {
        self.kind.is_none_or(|kind| experience.kind == kind)
            && self
                .duration
                .is_none_or(|d| d.matches(experience.duration_days))
            && self.budget.is_none_or(|b| b.contains(&experience.price))
            && self
                .difficulty
                .as_deref()
                .is_none_or(|d| fold(&experience.details).contains(&fold(d)))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// =============================================================================
// Destinations and articles
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub id: DestinationId,
    pub name: String,
    pub image_url: String,
    pub description: String,
}

/// Blog category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleCategory {
    Tips,
    ReadyItineraries,
    Safety,
    BestSeasons,
}

impl ArticleCategory {
    pub const ALL: [Self; 4] = [
        Self::Tips,
        Self::ReadyItineraries,
        Self::Safety,
        Self::BestSeasons,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Tips => "Dicas",
            Self::ReadyItineraries => "Roteiros Prontos",
            Self::Safety => "Segurança",
            Self::BestSeasons => "Épocas Ideais",
        }
    }
}

impl fmt::Display for ArticleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ArticleCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = fold(s.trim());
        Self::ALL
            .into_iter()
            .find(|c| fold(c.label()) == folded)
            .ok_or_else(|| UnknownVariant::new("article category", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogArticle {
    pub id: ArticleId,
    pub title: String,
    pub image_url: String,
    pub excerpt: String,
    pub published_on: NaiveDate,
    pub category: ArticleCategory,
}

// =============================================================================
// Catalog
// =============================================================================

/// A favorites entry resolved against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum FavoriteEntry<'a> {
    Found(&'a Experience),
    /// The id is not in the catalog; shown as "details not found".
    Missing(ExperienceId),
}

/// The agency's read-only catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    experiences: Vec<Experience>,
    destinations: Vec<Destination>,
    articles: Vec<BlogArticle>,
}

impl Catalog {
    /// Build a catalog from explicit lists.
    #[must_use]
    pub const fn new(
        experiences: Vec<Experience>,
        destinations: Vec<Destination>,
        articles: Vec<BlogArticle>,
    ) -> Self {
        Self {
            experiences,
            destinations,
            articles,
        }
    }

    /// The catalog the site ships with.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(
            builtin::experiences(),
            builtin::destinations(),
            builtin::articles(),
        )
    }

    #[must_use]
    pub fn experiences(&self) -> &[Experience] {
        &self.experiences
    }

    #[must_use]
    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    #[must_use]
    pub fn articles(&self) -> &[BlogArticle] {
        &self.articles
    }

    #[must_use]
    pub fn experience(&self, id: &ExperienceId) -> Option<&Experience> {
        self.experiences.iter().find(|e| &e.id == id)
    }

    #[must_use]
    pub fn destination(&self, id: &DestinationId) -> Option<&Destination> {
        self.destinations.iter().find(|d| &d.id == id)
    }

    #[must_use]
    pub fn article(&self, id: &ArticleId) -> Option<&BlogArticle> {
        self.articles.iter().find(|a| &a.id == id)
    }

    /// Experiences highlighted at the top of the home page.
    #[must_use]
    pub fn featured(&self) -> &[Experience] {
        self.experiences.get(..3).unwrap_or(&self.experiences)
    }

    /// Experiences in the home page's "most popular" row.
    #[must_use]
    pub fn popular(&self) -> &[Experience] {
        self.experiences.get(3..6).unwrap_or_default()
    }

    /// Experiences matching every criterion of `filter`, in catalog order.
    pub fn filter<'a>(
        &'a self,
        filter: &'a ExperienceFilter,
    ) -> impl Iterator<Item = &'a Experience> + 'a {
        self.experiences.iter().filter(|e| filter.matches(e))
    }

    pub fn articles_in(&self, category: ArticleCategory) -> impl Iterator<Item = &BlogArticle> {
        self.articles.iter().filter(move |a| a.category == category)
    }

    /// Resolve favorites to catalog entries, keeping dangling ids.
    #[must_use]
    pub fn resolve_favorites(&self, favorites: &FavoriteSet) -> Vec<FavoriteEntry<'_>> {
        favorites
            .iter()
            .map(|id| {
                self.experience(id)
                    .map_or_else(|| FavoriteEntry::Missing(id.clone()), FavoriteEntry::Found)
            })
            .collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

mod builtin {
    //! Data shipped with the site.

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{ArticleCategory, BlogArticle, Destination, Experience, ExperienceKind};
    use crate::types::{ArticleId, DestinationId, ExperienceId, Price};

    // Literal ids below are all valid; parse only fails on malformed input.
    fn exp_id(s: &str) -> ExperienceId {
        ExperienceId::parse(s).unwrap_or_else(|e| unreachable!("builtin id {s}: {e}"))
    }

    fn dest_id(s: &str) -> DestinationId {
        DestinationId::parse(s).unwrap_or_else(|e| unreachable!("builtin id {s}: {e}"))
    }

    fn article_id(s: &str) -> ArticleId {
        ArticleId::parse(s).unwrap_or_else(|e| unreachable!("builtin id {s}: {e}"))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
    }

    #[allow(clippy::too_many_arguments)]
    fn experience(
        id: &str,
        name: &str,
        kind: ExperienceKind,
        duration_days: u8,
        destination: &str,
        price: i64,
        image: &str,
        description: &str,
        rating_tenths: i64,
        reviews: u32,
        details: &str,
    ) -> Experience {
        Experience {
            id: exp_id(id),
            name: name.to_string(),
            kind,
            duration_days,
            destination: destination.to_string(),
            price: Price::brl(price),
            image_url: format!("https://placehold.co/600x400/{image}"),
            description: description.to_string(),
            rating: Decimal::new(rating_tenths, 1),
            reviews,
            details: details.to_string(),
        }
    }

    pub(super) fn experiences() -> Vec<Experience> {
        vec![
            experience(
                "exp1",
                "Aventura na Floresta Amazônica",
                ExperienceKind::Nature,
                7,
                "Brasil - Amazonas",
                3500,
                "87CEEB/FFFFFF?text=Amazônia",
                "Explore a rica biodiversidade da Floresta Amazônica, com trilhas, observação de animais e pernoite na selva.",
                48,
                120,
                "Roteiro completo: Dia 1: Chegada em Manaus e traslado para lodge. Dia 2-5: Trilhas, canoagem, pesca de piranhas, focagem noturna. Dia 6: Visita a comunidade ribeirinha. Dia 7: Retorno a Manaus. Inclusões: Transporte, refeições, guia especializado, seguro viagem. Exclusões: Passagens aéreas, despesas pessoais.",
            ),
            experience(
                "exp2",
                "Cultura e Vinícolas no Vale do Loire",
                ExperienceKind::Cultural,
                5,
                "Europa - França",
                4800,
                "ADD8E6/FFFFFF?text=Vale+do+Loire",
                "Descubra os majestosos castelos e as renomadas vinícolas do Vale do Loire, na França.",
                45,
                85,
                "Roteiro completo: Dia 1: Chegada em Paris e traslado para Tours. Dia 2: Castelo de Chenonceau e degustação de vinhos. Dia 3: Castelo de Chambord e Blois. Dia 4: Visita a vinícolas e aula de culinária. Dia 5: Retorno a Paris. Inclusões: Transporte terrestre, hospedagem, degustações, guia. Exclusões: Passagens aéreas, refeições não mencionadas.",
            ),
            experience(
                "exp3",
                "Gastronomia e Praias em Salvador",
                ExperienceKind::Gastronomic,
                4,
                "Brasil - Bahia",
                1800,
                "90EE90/FFFFFF?text=Salvador",
                "Uma imersão na culinária baiana e relaxamento nas belas praias de Salvador.",
                47,
                95,
                "Roteiro completo: Dia 1: Chegada em Salvador, Pelourinho e aula de culinária. Dia 2: Praias do Forte e Guarajuba. Dia 3: Mercado Modelo e Elevador Lacerda. Dia 4: Despedida. Inclusões: Hospedagem, algumas refeições, passeios. Exclusões: Passagens aéreas, bebidas.",
            ),
            experience(
                "exp4",
                "Trilhas e Aventura na Patagônia",
                ExperienceKind::Adventure,
                8,
                "América do Sul - Argentina/Chile",
                6200,
                "B0E0E6/FFFFFF?text=Patagônia",
                "Desafie-se nas trilhas deslumbrantes da Patagônia, com paisagens de tirar o fôlego.",
                49,
                150,
                "Roteiro completo: Dia 1: Chegada em El Calafate. Dia 2: Perito Moreno. Dia 3-6: Trekking em El Chaltén. Dia 7: Retorno a El Calafate. Dia 8: Partida. Inclusões: Guias de trekking, transporte, hospedagem. Exclusões: Passagens aéreas, equipamentos pessoais.",
            ),
            experience(
                "exp5",
                "Relaxamento e Bem-estar em Bali",
                ExperienceKind::Relaxation,
                10,
                "Internacional - Indonésia",
                7500,
                "C0C0C0/FFFFFF?text=Bali",
                "Desfrute de retiros de yoga, spas e a serenidade das praias de Bali.",
                46,
                110,
                "Roteiro completo: Dia 1: Chegada em Denpasar e traslado para Ubud. Dia 2-4: Retiro de yoga, massagens, templos. Dia 5-9: Praias de Seminyak/Uluwatu, surf, relaxamento. Dia 10: Partida. Inclusões: Hospedagem, algumas atividades de bem-estar. Exclusões: Passagens aéreas, refeições não mencionadas.",
            ),
            experience(
                "exp6",
                "Exploração Cultural em Tóquio",
                ExperienceKind::Cultural,
                6,
                "Internacional - Japão",
                5500,
                "DDA0DD/FFFFFF?text=Tóquio",
                "Mergulhe na vibrante cultura de Tóquio, desde templos antigos a bairros futuristas.",
                47,
                90,
                "Roteiro completo: Dia 1: Chegada em Tóquio, Shinjuku. Dia 2: Asakusa e Akihabara. Dia 3: Shibuya e Harajuku. Dia 4: Museu Ghibli e Ginza. Dia 5: Excursão a Hakone (Monte Fuji). Dia 6: Partida. Inclusões: Hospedagem, transporte público. Exclusões: Passagens aéreas, refeições.",
            ),
        ]
    }

    pub(super) fn destinations() -> Vec<Destination> {
        [
            ("dest1", "Amazônia, Brasil", "87CEEB/FFFFFF?text=Amazônia", "A maior floresta tropical do mundo."),
            ("dest2", "Vale do Loire, França", "ADD8E6/FFFFFF?text=Vale+do+Loire", "Castelos e vinícolas históricas."),
            ("dest3", "Salvador, Brasil", "90EE90/FFFFFF?text=Salvador", "Cultura e praias vibrantes."),
            ("dest4", "Patagônia, Argentina/Chile", "B0E0E6/FFFFFF?text=Patagônia", "Paisagens montanhosas e glaciares."),
            ("dest5", "Bali, Indonésia", "C0C0C0/FFFFFF?text=Bali", "Ilha da serenidade e bem-estar."),
            ("dest6", "Tóquio, Japão", "DDA0DD/FFFFFF?text=Tóquio", "Metrópole futurista e rica em cultura."),
        ]
        .into_iter()
        .map(|(id, name, image, description)| Destination {
            id: dest_id(id),
            name: name.to_string(),
            image_url: format!("https://placehold.co/400x300/{image}"),
            description: description.to_string(),
        })
        .collect()
    }

    pub(super) fn articles() -> Vec<BlogArticle> {
        vec![
            BlogArticle {
                id: article_id("blog1"),
                title: "10 Dicas Essenciais para Viajar para a Amazônia".to_string(),
                image_url: "https://placehold.co/600x400/87CEEB/FFFFFF?text=Dicas+Amazônia"
                    .to_string(),
                excerpt: "Prepare-se para sua aventura na maior floresta tropical do mundo com estas dicas valiosas.".to_string(),
                published_on: date(2025, 5, 15),
                category: ArticleCategory::Tips,
            },
            BlogArticle {
                id: article_id("blog2"),
                title: "Descobrindo a Magia dos Castelos do Vale do Loire".to_string(),
                image_url: "https://placehold.co/600x400/ADD8E6/FFFFFF?text=Castelos+Loire"
                    .to_string(),
                excerpt: "Um guia completo para explorar a história e a beleza dos castelos franceses.".to_string(),
                published_on: date(2025, 5, 10),
                category: ArticleCategory::ReadyItineraries,
            },
            BlogArticle {
                id: article_id("blog3"),
                title: "Segurança em Viagens: O Que Você Precisa Saber".to_string(),
                image_url: "https://placehold.co/600x400/FFD700/FFFFFF?text=Segurança+Viagem"
                    .to_string(),
                excerpt: "Mantenha-se seguro em suas aventuras com nossas dicas de segurança em viagens.".to_string(),
                published_on: date(2025, 5, 5),
                category: ArticleCategory::Safety,
            },
        ]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ids<'a>(experiences: impl Iterator<Item = &'a Experience>) -> Vec<&'a str> {
        experiences.map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_builtin_sizes() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.experiences().len(), 6);
        assert_eq!(catalog.destinations().len(), 6);
        assert_eq!(catalog.articles().len(), 3);
    }

    #[test]
    fn test_home_page_slices() {
        let catalog = Catalog::builtin();
        assert_eq!(ids(catalog.featured().iter()), ["exp1", "exp2", "exp3"]);
        assert_eq!(ids(catalog.popular().iter()), ["exp4", "exp5", "exp6"]);
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let catalog = Catalog::builtin();
        let filter = ExperienceFilter::default();
        assert!(filter.is_empty());
        assert_eq!(catalog.filter(&filter).count(), 6);
    }

    #[test]
    fn test_kind_parse_is_accent_insensitive() {
        assert_eq!(
            "gastronomica".parse::<ExperienceKind>().unwrap(),
            ExperienceKind::Gastronomic
        );
        assert_eq!(
            "GASTRONÔMICA".parse::<ExperienceKind>().unwrap(),
            ExperienceKind::Gastronomic
        );
        assert!("praia".parse::<ExperienceKind>().is_err());
    }

    #[test]
    fn test_filter_by_kind() {
        let catalog = Catalog::builtin();
        let filter = ExperienceFilter {
            kind: Some(ExperienceKind::Cultural),
            ..Default::default()
        };
        assert_eq!(ids(catalog.filter(&filter)), ["exp2", "exp6"]);
    }

    #[test]
    fn test_filter_by_duration() {
        let catalog = Catalog::builtin();
        let filter = ExperienceFilter {
            duration: Some(DurationFilter::Days(7)),
            ..Default::default()
        };
        assert_eq!(ids(catalog.filter(&filter)), ["exp1"]);

        // "1 dia" must not match the ten-day trip
        let one_day = ExperienceFilter {
            duration: Some(DurationFilter::Days(1)),
            ..Default::default()
        };
        assert_eq!(catalog.filter(&one_day).count(), 0);

        let weekend = ExperienceFilter {
            duration: Some(DurationFilter::Weekend),
            ..Default::default()
        };
        assert_eq!(catalog.filter(&weekend).count(), 0);
    }

    #[test]
    fn test_filter_by_budget() {
        let catalog = Catalog::builtin();
        let cases = [
            (BudgetRange::UpTo2000, vec!["exp3"]),
            (BudgetRange::From2000To4000, vec!["exp1"]),
            (BudgetRange::From4000To6000, vec!["exp2", "exp6"]),
            (BudgetRange::Above6000, vec!["exp4", "exp5"]),
        ];
        for (range, expected) in cases {
            let filter = ExperienceFilter {
                budget: Some(range),
                ..Default::default()
            };
            assert_eq!(ids(catalog.filter(&filter)), expected, "{range:?}");
        }
    }

    #[test]
    fn test_budget_bands_partition() {
        for amount in [0, 2000, 2001, 4000, 6000, 6001] {
            let price = Price::brl(amount);
            let hits = BudgetRange::ALL
                .iter()
                .filter(|r| r.contains(&price))
                .count();
            assert_eq!(hits, 1, "amount {amount}");
        }
    }

    #[test]
    fn test_budget_range_parse() {
        assert_eq!(
            "2000-4000".parse::<BudgetRange>().unwrap(),
            BudgetRange::From2000To4000
        );
        assert_eq!("6000+".parse::<BudgetRange>().unwrap(), BudgetRange::Above6000);
        assert!("cheap".parse::<BudgetRange>().is_err());
    }

    #[test]
    fn test_filter_by_difficulty_searches_details() {
        let catalog = Catalog::builtin();
        let trekking = ExperienceFilter {
            difficulty: Some("TREKKING".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(catalog.filter(&trekking)), ["exp4"]);

        // Accents are ignored as well as case.
        let cooking = ExperienceFilter {
            difficulty: Some("CULINARIA".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(catalog.filter(&cooking)), ["exp2", "exp3"]);

        let easy = ExperienceFilter {
            difficulty: Some("fácil".to_string()),
            ..Default::default()
        };
        assert_eq!(catalog.filter(&easy).count(), 0);
    }

    #[test]
    fn test_combined_filters() {
        let catalog = Catalog::builtin();
        let filter = ExperienceFilter {
            kind: Some(ExperienceKind::Cultural),
            budget: Some(BudgetRange::From4000To6000),
            duration: Some(DurationFilter::Days(6)),
            difficulty: None,
        };
        assert_eq!(ids(catalog.filter(&filter)), ["exp6"]);
    }

    #[test]
    fn test_lookups() {
        let catalog = Catalog::builtin();
        let exp = catalog
            .experience(&ExperienceId::parse("exp4").unwrap())
            .unwrap();
        assert_eq!(exp.duration_label(), "8 dias");
        assert_eq!(exp.price.to_string(), "R$ 6200");
        assert_eq!(exp.stars(), "★★★★");
        assert!(catalog
            .destination(&DestinationId::parse("dest5").unwrap())
            .is_some());
        assert!(catalog
            .experience(&ExperienceId::parse("exp99").unwrap())
            .is_none());
    }

    #[test]
    fn test_articles_by_category() {
        let catalog = Catalog::builtin();
        let tips: Vec<_> = catalog.articles_in(ArticleCategory::Tips).collect();
        assert_eq!(tips.len(), 1);
        assert_eq!(tips[0].id.as_str(), "blog1");
        assert_eq!(catalog.articles_in(ArticleCategory::BestSeasons).count(), 0);
        assert_eq!(
            "epocas ideais".parse::<ArticleCategory>().unwrap(),
            ArticleCategory::BestSeasons
        );
    }

    #[test]
    fn test_resolve_favorites_keeps_dangling_ids() {
        let catalog = Catalog::builtin();
        let favorites: FavoriteSet = ["exp1", "ghost"]
            .into_iter()
            .map(|s| ExperienceId::parse(s).unwrap())
            .collect();
        let entries = catalog.resolve_favorites(&favorites);
        assert_eq!(entries.len(), 2);
        assert!(matches!(entries[0], FavoriteEntry::Found(e) if e.id.as_str() == "exp1"));
        assert!(matches!(&entries[1], FavoriteEntry::Missing(id) if id.as_str() == "ghost"));
    }
}
