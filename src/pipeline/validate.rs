// src/pipeline/validate.rs

//! Blacklist rule engine.
//!
//! A [`RuleSet`] is compiled once from the search configuration, so a bad
//! user regex is reported at load time. [`ValidationEngine`] then tests every
//! rule against a listing's description, title and location and records one
//! reason per matching rule.

use std::collections::HashSet;
use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::error::{AppError, Result};
use crate::models::{Listing, ReasonKind, SearchConfig};

/// A built-in exclusion phrase.
enum Phrase {
    Lit(&'static str),
    Re(&'static str),
}

use Phrase::{Lit, Re};

const CAT_PHRASES: &[Phrase] = &[
    Lit("pas de chats"),
    Lit("no cats"),
    Lit("sans chats"),
    Lit("chats non acceptés"),
    Lit("chats non permis"),
    Lit("cats not allowed"),
    Lit("pas de chat"),
    Lit("chats non autorisés"),
    Lit("aucun chat"),
];

const DOG_PHRASES: &[Phrase] = &[
    Lit("pas de chiens"),
    Lit("no dogs"),
    Lit("sans chiens"),
    Lit("chiens non acceptés"),
    Lit("chiens non permis"),
    Lit("dogs not allowed"),
    Lit("pas de chien"),
    Lit("chiens non autorisés"),
    Lit("aucun chien"),
];

const GENERAL_PET_PHRASES: &[Phrase] = &[
    Lit("pas d'animaux"),
    Lit("pas d’animaux"),
    Lit("no animals"),
    Lit("sans animaux"),
    Lit("animaux non acceptés"),
    Lit("animaux non permis"),
    Lit("animals not allowed"),
    Lit("no pets"),
    Lit("pas d animaux"),
    Lit("animaux non autorisés"),
    Lit("aucun animale"),
    Lit("aucun animaux"),
];

const SWAP_PHRASES: &[Phrase] = &[Lit("swap"), Lit("echange"), Lit("échange")];

const SUBLET_PHRASES: &[Phrase] = &[
    Lit("sous location"),
    Lit("sous-location"),
    Lit("sublet"),
    Lit("sous-louer"),
    Lit("sous-loue"),
    Lit("sous-loué"),
    Lit("sous louer"),
    Lit("sous loue"),
    Lit("sous loué"),
    Re(r"for (\d+) months only"),
    Re(r"pour (\d+) mois seulement"),
];

const SHARED_PHRASES: &[Phrase] = &[
    Lit("room in a shared"),
    Lit("chambre dans un appartement"),
    Lit("chambre dans un logement"),
    Lit("roommate"),
    Lit("coloc"),
    Lit("coloque"),
    Lit("colocation"),
    Lit("colocataire"),
];

/// Which list or toggle contributed a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSource {
    Cat,
    Dog,
    GeneralPets,
    Swaps,
    Sublets,
    Shared,
    UserTerm,
    UserRegex,
}

impl fmt::Display for RuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuleSource::Cat => "pets.cat",
            RuleSource::Dog => "pets.dog",
            RuleSource::GeneralPets => "pets.general",
            RuleSource::Swaps => "exclude.swaps",
            RuleSource::Sublets => "exclude.sublets",
            RuleSource::Shared => "exclude.shared",
            RuleSource::UserTerm => "blacklist",
            RuleSource::UserRegex => "blacklist_regex",
        })
    }
}

#[derive(Debug, Clone)]
pub enum Matcher {
    /// Lower-cased substring
    Literal(String),
    Pattern(Regex),
}

impl Matcher {
    fn is_match(&self, haystack: &str) -> bool {
        match self {
            Matcher::Literal(term) => haystack.contains(term.as_str()),
            Matcher::Pattern(re) => re.is_match(haystack),
        }
    }

    fn text(&self) -> &str {
        match self {
            Matcher::Literal(term) => term,
            Matcher::Pattern(re) => re.as_str(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub matcher: Matcher,
    pub source: RuleSource,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.matcher.text())
    }
}

/// Flattened, compiled rules for one search configuration.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build the candidate rule list from the search configuration.
    ///
    /// Order: enabled pet lists, the general pet list (only when a pet list
    /// was added), category exclusions, user terms, user regexes.
    pub fn compile(search: &SearchConfig) -> Result<Self> {
        let mut set = RuleSet::default();
        let mut seen = HashSet::new();
        let params = &search.params;

        let mut pet_lists = 0;
        for (enabled, phrases, source) in [
            (params.pets.cat, CAT_PHRASES, RuleSource::Cat),
            (params.pets.dog, DOG_PHRASES, RuleSource::Dog),
        ] {
            if enabled {
                set.extend_builtin(phrases, source, &mut seen)?;
                pet_lists += 1;
            }
        }
        if pet_lists > 0 {
            set.extend_builtin(GENERAL_PET_PHRASES, RuleSource::GeneralPets, &mut seen)?;
        }

        for (enabled, phrases, source) in [
            (params.exclude.swaps, SWAP_PHRASES, RuleSource::Swaps),
            (params.exclude.sublets, SUBLET_PHRASES, RuleSource::Sublets),
            (params.exclude.shared, SHARED_PHRASES, RuleSource::Shared),
        ] {
            if enabled {
                set.extend_builtin(phrases, source, &mut seen)?;
            }
        }

        for term in &search.blacklist {
            let term = term.trim().to_lowercase();
            if !term.is_empty() {
                set.push(Matcher::Literal(term), RuleSource::UserTerm, &mut seen);
            }
        }

        for pattern in &search.blacklist_regex {
            let re = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| AppError::invalid_regex(pattern.as_str(), e))?;
            set.push(Matcher::Pattern(re), RuleSource::UserRegex, &mut seen);
        }

        log::debug!("Compiled {} blacklist rule(s)", set.rules.len());
        Ok(set)
    }

    fn extend_builtin(
        &mut self,
        phrases: &[Phrase],
        source: RuleSource,
        seen: &mut HashSet<(bool, String)>,
    ) -> Result<()> {
        for phrase in phrases {
            let matcher = match phrase {
                Lit(term) => Matcher::Literal(term.to_lowercase()),
                Re(pattern) => Matcher::Pattern(
                    Regex::new(pattern).map_err(|e| AppError::invalid_regex(*pattern, e))?,
                ),
            };
            self.push(matcher, source, seen);
        }
        Ok(())
    }

    fn push(&mut self, matcher: Matcher, source: RuleSource, seen: &mut HashSet<(bool, String)>) {
        let key = (
            matches!(matcher, Matcher::Pattern(_)),
            matcher.text().to_string(),
        );
        if seen.insert(key) {
            self.rules.push(Rule { matcher, source });
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Applies a [`RuleSet`] to listings.
#[derive(Debug, Clone)]
pub struct ValidationEngine {
    rules: RuleSet,
}

impl ValidationEngine {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// Compile rules and build the engine in one step.
    pub fn from_search(search: &SearchConfig) -> Result<Self> {
        Ok(Self::new(RuleSet::compile(search)?))
    }

    /// Every matching rule, each reported once for the first field it hits.
    pub fn evaluate(&self, listing: &Listing) -> Vec<String> {
        let fields = [
            ("description", listing.long_description.as_deref()),
            ("title", Some(listing.title.as_str())),
            ("location", listing.address()),
        ]
        .map(|(name, text)| (name, text.map(str::to_lowercase)));

        self.rules
            .rules
            .iter()
            .filter_map(|rule| {
                fields
                    .iter()
                    .find(|(_, text)| text.as_deref().is_some_and(|t| rule.matcher.is_match(t)))
                    .map(|(field, _)| {
                        log::debug!(
                            "Listing {} matched {rule} from {} in {field}",
                            listing.seen_key(),
                            rule.source
                        );
                        format!("{rule} in {field}")
                    })
            })
            .collect()
    }

    /// Record blacklist reasons on the listing. Returns whether it is still valid.
    pub fn apply(&self, listing: &mut Listing) -> bool {
        let reasons = self.evaluate(listing);
        if !reasons.is_empty() {
            log::debug!(
                "Listing {} is blacklisted: {}",
                listing.seen_key(),
                reasons.join("; ")
            );
            listing.mark_invalid(ReasonKind::Blacklisted, reasons.join("; "));
        }
        listing.is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Platform;

    fn listing(title: &str, description: Option<&str>, address: Option<&str>) -> Listing {
        let mut l = Listing::new(Platform::Kijiji, "1", "https://kijiji.ca/1", title);
        l.long_description = description.map(str::to_string);
        l.short_address = address.map(str::to_string);
        l
    }

    fn engine(configure: impl FnOnce(&mut SearchConfig)) -> ValidationEngine {
        let mut search = SearchConfig::default();
        configure(&mut search);
        ValidationEngine::from_search(&search).unwrap()
    }

    #[test]
    fn test_shared_apartment_title() {
        let engine = engine(|s| s.params.exclude.shared = true);
        let mut l = listing("Room in a shared apartment", None, None);

        assert!(!engine.apply(&mut l));
        let reason = &l.invalid_reasons[&ReasonKind::Blacklisted];
        assert!(reason.contains("'room in a shared'"), "{reason}");
        assert!(reason.contains("in title"), "{reason}");
    }

    #[test]
    fn test_rules_name_their_config_key() {
        let engine = engine(|s| {
            s.params.pets.dog = true;
            s.blacklist_regex = vec![r"\bsous-sol\b".into()];
        });
        let sources: HashSet<String> = engine
            .rules
            .rules()
            .iter()
            .map(|rule| rule.source.to_string())
            .collect();
        let expected: HashSet<String> = ["pets.dog", "pets.general", "blacklist_regex"]
            .map(String::from)
            .into();
        assert_eq!(sources, expected);
    }

    #[test]
    fn test_no_rules_means_valid() {
        let engine = engine(|_| {});
        assert!(engine.rules.is_empty());
        let mut l = listing("Room in a shared apartment", Some("no pets, sublet"), None);
        assert!(engine.apply(&mut l));
    }

    #[test]
    fn test_first_matching_field_wins_per_rule() {
        let engine = engine(|s| s.blacklist = vec!["Basement".into()]);
        let l = listing(
            "Basement studio",
            Some("Cozy basement unit"),
            Some("basement st"),
        );
        assert_eq!(engine.evaluate(&l), vec!["'basement' in description"]);
    }

    #[test]
    fn test_all_rules_reported() {
        let engine = engine(|s| {
            s.params.exclude.sublets = true;
            s.params.pets.cat = true;
            s.blacklist = vec!["demi-sous-sol".into()];
        });
        let l = listing(
            "Sublet for 4 months only",
            Some("Pas de chats. Demi-sous-sol."),
            None,
        );
        let reasons = engine.evaluate(&l);
        assert!(reasons.contains(&"'pas de chats' in description".to_string()));
        assert!(reasons.contains(&"'pas de chat' in description".to_string()));
        assert!(reasons.contains(&"'sublet' in title".to_string()));
        assert!(reasons.contains(&r"'for (\d+) months only' in title".to_string()));
        assert!(reasons.contains(&"'demi-sous-sol' in description".to_string()));
    }

    #[test]
    fn test_general_pets_only_with_specific_pet() {
        let none = engine(|s| s.params.pets.other = true);
        assert!(none.evaluate(&listing("Studio", Some("No pets"), None)).is_empty());

        let dog = engine(|s| s.params.pets.dog = true);
        assert_eq!(
            dog.evaluate(&listing("Studio", Some("No pets"), None)),
            vec!["'no pets' in description"]
        );
        assert!(
            dog.rules.rules()
                .iter()
                .any(|r| r.source == RuleSource::GeneralPets)
        );
    }

    #[test]
    fn test_user_regex_is_case_insensitive() {
        let engine = engine(|s| s.blacklist_regex = vec![r"\bRDC\b".into()]);
        let l = listing("4 1/2", None, Some("Appartement rdc, Verdun"));
        assert_eq!(engine.evaluate(&l), vec![r"'\bRDC\b' in location"]);
    }

    #[test]
    fn test_location_prefers_long_address() {
        let engine = engine(|s| s.blacklist = vec!["laval".into()]);
        let mut l = listing("4 1/2", None, Some("Laval"));
        l.long_address = Some("123 Rue Ontario, Montréal".into());
        assert!(engine.evaluate(&l).is_empty());
    }

    #[test]
    fn test_invalid_user_regex_fails_compile() {
        let mut search = SearchConfig::default();
        search.blacklist_regex = vec!["[unclosed".into()];
        match RuleSet::compile(&search) {
            Err(AppError::InvalidRegex { pattern, .. }) => assert_eq!(pattern, "[unclosed"),
            other => panic!("expected InvalidRegex, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_rules_collapse() {
        let engine = engine(|s| s.blacklist = vec!["Swap".into(), "swap ".into()]);
        assert_eq!(engine.rules.len(), 1);
    }

    #[test]
    fn test_adding_term_is_monotonic() {
        let listings = vec![
            listing("Sublet in Plateau", Some("furnished"), None),
            listing("Big 5 1/2", Some("no cats please"), Some("Rosemont")),
            listing("Loft", None, Some("Griffintown")),
        ];
        let base = engine(|s| {
            s.params.exclude.sublets = true;
            s.params.pets.cat = true;
        });
        let extended = engine(|s| {
            s.params.exclude.sublets = true;
            s.params.pets.cat = true;
            s.blacklist = vec!["griffintown".into()];
        });

        for l in &listings {
            let before = base.evaluate(l);
            let after = extended.evaluate(l);
            assert!(before.iter().all(|r| after.contains(r)));
        }
        assert_eq!(extended.evaluate(&listings[2]).len(), 1);
    }

    #[test]
    fn test_apply_keeps_other_reason_kinds() {
        let engine = engine(|s| s.params.exclude.swaps = true);
        let mut l = listing("Échange 3 1/2", None, None);
        l.mark_invalid(ReasonKind::OutsideSearchArea, "outside");
        engine.apply(&mut l);
        assert_eq!(l.invalid_reasons.len(), 2);
        assert_eq!(l.invalid_reasons[&ReasonKind::Blacklisted], "'échange' in title");
    }
}
