//! Card locator - finding listing regions on a search-results page
//!
//! Tries the primary card container selector, then each known alternate,
//! until one yields a non-empty result. Each card is tagged with its
//! structural variant by inspecting auxiliary class/attribute markers.
//! An empty page is a normal return value, not an error; the record
//! extractor maps it to the page-level "no cards found" condition.

use crate::domain::property::CardVariant;
use crate::infrastructure::parsing::config::CardSelectors;
use anyhow::Result;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

/// Opaque handle to one listing's markup region within a page.
/// Transient: created per page-parse, discarded after extraction.
#[derive(Debug, Clone)]
pub struct PropertyCard<'a> {
    pub element: ElementRef<'a>,
    pub variant: CardVariant,
    /// Ordinal position on the page (0-based)
    pub index: usize,
}

impl PropertyCard<'_> {
    /// Full text content of the card, for regex fallback strategies
    pub fn text(&self) -> String {
        self.element.text().collect::<String>()
    }
}

/// Locates listing cards and classifies their structural variant
pub struct CardLocator {
    container_selectors: Vec<(String, Selector)>,
    premium_markers: Vec<Selector>,
    sponsored_markers: Vec<Selector>,
    preferred_agent_markers: Vec<Selector>,
    pagination_selectors: Vec<Selector>,
}

impl CardLocator {
    /// Create a locator from the configured container and marker selectors
    pub fn new(selectors: &CardSelectors) -> Result<Self> {
        Ok(Self {
            container_selectors: compile_named(&selectors.card_container)?,
            premium_markers: compile_lenient(&selectors.premium_markers),
            sponsored_markers: compile_lenient(&selectors.sponsored_markers),
            preferred_agent_markers: compile_lenient(&selectors.preferred_agent_markers),
            pagination_selectors: compile_lenient(&selectors.pagination),
        })
    }

    /// Find all listing cards on the page, in document order.
    /// Returns an empty vector when no known container pattern matches.
    pub fn locate<'a>(&self, html: &'a Html) -> Vec<PropertyCard<'a>> {
        for (selector_str, selector) in &self.container_selectors {
            let elements: Vec<ElementRef<'a>> = html.select(selector).collect();
            if elements.is_empty() {
                continue;
            }
            debug!(
                "Found {} cards using container selector '{}'",
                elements.len(),
                selector_str
            );
            return elements
                .into_iter()
                .enumerate()
                .map(|(index, element)| PropertyCard {
                    variant: self.detect_variant(element),
                    element,
                    index,
                })
                .collect();
        }
        debug!("No card container selector matched");
        Vec::new()
    }

    /// Selector strings tried by `locate`, for error reporting
    pub fn tried_selectors(&self) -> Vec<String> {
        self.container_selectors
            .iter()
            .map(|(s, _)| s.clone())
            .collect()
    }

    /// Classify a card by its auxiliary markers. Marker precedence:
    /// sponsored > preferred-agent > premium, since sponsored placements
    /// reuse premium styling on the target portal.
    fn detect_variant(&self, element: ElementRef<'_>) -> CardVariant {
        if matches_any(element, &self.sponsored_markers) {
            CardVariant::Sponsored
        } else if matches_any(element, &self.preferred_agent_markers) {
            CardVariant::PreferredAgent
        } else if matches_any(element, &self.premium_markers) {
            CardVariant::Premium
        } else {
            CardVariant::Standard
        }
    }

    /// Check if the page advertises a next page of results
    pub fn has_next_page(&self, html: &Html) -> bool {
        for selector in &self.pagination_selectors {
            if html.select(selector).any(|element| {
                let text = element.text().collect::<String>().to_lowercase();
                text.contains("next") || text.contains("→") || text.contains("»")
            }) {
                return true;
            }
        }
        false
    }
}

fn matches_any(element: ElementRef<'_>, markers: &[Selector]) -> bool {
    markers.iter().any(|marker| {
        // the container itself may carry the marker class
        element.select(marker).next().is_some()
            || marker.matches(&element)
    })
}

/// Compile selectors, keeping the source string for diagnostics.
/// Fails only when nothing compiles at all.
fn compile_named(selector_strings: &[String]) -> Result<Vec<(String, Selector)>> {
    let mut selectors = Vec::new();
    let mut errors = Vec::new();

    for selector_str in selector_strings {
        match Selector::parse(selector_str) {
            Ok(selector) => selectors.push((selector_str.clone(), selector)),
            Err(e) => {
                warn!("Failed to compile container selector '{}': {}", selector_str, e);
                errors.push(format!("'{selector_str}': {e}"));
            }
        }
    }

    if selectors.is_empty() {
        return Err(anyhow::anyhow!(
            "No valid card container selectors compiled. Errors: {}",
            errors.join(", ")
        ));
    }
    Ok(selectors)
}

/// Compile optional marker selectors, skipping invalid ones
fn compile_lenient(selector_strings: &[String]) -> Vec<Selector> {
    selector_strings
        .iter()
        .filter_map(|s| match Selector::parse(s) {
            Ok(selector) => Some(selector),
            Err(e) => {
                warn!("Skipping invalid marker selector '{}': {}", s, e);
                None
            }
        })
        .collect()
}
