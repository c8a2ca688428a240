//! Routed page table
//!
//! Copy and markup are opaque to the engine; a page only declares which
//! sections carry a reveal target and which stats count up when the stats row
//! comes into view.

use vigil_core::{IntegrationError, Result};

/// Section whose reveal expands the hero
pub const HERO_SECTION: &str = "hero";

/// Section whose reveal starts the stats counters
pub const STATS_SECTION: &str = "stats";

/// Anchor the hero "Initiate Protocol" action scrolls to
pub const SERVICES_ANCHOR: &str = "services";

/// One animated statistic
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stat {
    pub id: &'static str,
    pub value: f64,
    pub suffix: &'static str,
    pub label: &'static str,
}

/// Declarative description of one routed page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSpec {
    pub path: &'static str,
    pub title: &'static str,
    /// Sections observed for their first reveal, in document order
    pub sections: &'static [&'static str],
    pub stats: &'static [Stat],
}

const HOME_STATS: &[Stat] = &[
    Stat {
        id: "incidents",
        value: 543.0,
        suffix: "+",
        label: "Incidents contained",
    },
    Stat {
        id: "retention",
        value: 98.0,
        suffix: "%",
        label: "Client retention",
    },
    Stat {
        id: "response",
        value: 15.0,
        suffix: " min",
        label: "Median response",
    },
];

const ABOUT_STATS: &[Stat] = &[Stat {
    id: "years",
    value: 12.0,
    suffix: "",
    label: "Years in the field",
}];

/// Every routable page
pub const PAGES: &[PageSpec] = &[
    PageSpec {
        path: "/",
        title: "Home",
        sections: &[HERO_SECTION, STATS_SECTION, "services", "partners", "press"],
        stats: HOME_STATS,
    },
    PageSpec {
        path: "/services",
        title: "Services",
        sections: &["services"],
        stats: &[],
    },
    PageSpec {
        path: "/process",
        title: "Process",
        sections: &["process"],
        stats: &[],
    },
    PageSpec {
        path: "/partners",
        title: "Partners",
        sections: &["partners"],
        stats: &[],
    },
    PageSpec {
        path: "/press",
        title: "Press",
        sections: &["press"],
        stats: &[],
    },
    PageSpec {
        path: "/about",
        title: "About",
        sections: &[STATS_SECTION],
        stats: ABOUT_STATS,
    },
];

/// Rendered for any path outside the table
pub static NOT_FOUND: PageSpec = PageSpec {
    path: "*",
    title: "Signal Lost",
    sections: &[],
    stats: &[],
};

/// Look up the page for a router path. A trailing slash is ignored.
pub fn resolve(path: &str) -> Result<&'static PageSpec> {
    let trimmed = path.trim_end_matches('/');
    let normalized = if trimmed.is_empty() { "/" } else { trimmed };
    PAGES
        .iter()
        .find(|p| p.path == normalized)
        .ok_or_else(|| IntegrationError::UnknownRoute(path.to_string()))
}

/// Like [`resolve`], falling back to the not-found page
pub fn resolve_or_not_found(path: &str) -> &'static PageSpec {
    match resolve(path) {
        Ok(page) => page,
        Err(err) => {
            tracing::warn!(error = %err, "rendering not-found page");
            &NOT_FOUND
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_paths() {
        assert_eq!(resolve("/").unwrap().title, "Home");
        assert_eq!(resolve("/services/").unwrap().path, "/services");
        assert_eq!(resolve("").unwrap().path, "/");
    }

    #[test]
    fn test_unknown_path() {
        assert!(matches!(
            resolve("/careers"),
            Err(IntegrationError::UnknownRoute(path)) if path == "/careers"
        ));
        assert_eq!(resolve_or_not_found("/careers"), &NOT_FOUND);
    }

    #[test]
    fn test_stats_pages_observe_stats_section() {
        for page in PAGES.iter().filter(|p| !p.stats.is_empty()) {
            assert!(page.sections.contains(&STATS_SECTION), "{}", page.path);
        }
    }
}
