//! Channel Name Matching
//!
//! Catalog names carry quality markers (`"RAI 1 HD"`) and dedup suffixes
//! (`"Canale 5 .a"`); user input usually carries neither. Matching runs a
//! three-tier cascade — exact, partial, flexible — where each tier scans the
//! whole catalog before the next one is tried, so a weaker tier can never
//! shadow a stronger match.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::providers::vavoo::Channel;

/// Trailing ` .a` / ` .b` style dedup suffix.
static DEDUP_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\.[a-zA-Z]$").unwrap());

/// Trailing quality token.
static QUALITY_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+(HD|FHD|4K)$").unwrap());

/// Everything that is not A-Z or 0-9 (applied after uppercasing).
static NON_ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Z0-9]").unwrap());

/// Normalize a channel name for matching: trim, drop a trailing single-letter
/// dedup suffix, uppercase.
pub fn normalize(name: &str) -> String {
    DEDUP_SUFFIX.replace(name.trim(), "").to_uppercase()
}

/// Matching tier, in strength order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Exact,
    Partial,
    Flexible,
}

type TierFn = fn(&str, &str) -> bool;

/// Tiers in evaluation order. The order is part of the contract: every
/// catalog entry is tested against a tier before the next tier runs.
const TIERS: &[(MatchTier, TierFn)] = &[
    (MatchTier::Exact, tier_exact),
    (MatchTier::Partial, tier_partial),
    (MatchTier::Flexible, tier_flexible),
];

/// Resolve a free-text name to a catalog entry.
///
/// Returns the entry and the tier that matched it, or `None` when no tier
/// matches — a normal outcome, distinct from "matched but has no URL".
pub fn find_channel<'a>(input: &str, channels: &'a [Channel]) -> Option<(&'a Channel, MatchTier)> {
    let wanted = normalize(input);
    for (tier, matches) in TIERS {
        if let Some(ch) = channels.iter().find(|ch| matches(&wanted, &ch.name)) {
            debug!(tier = ?tier, name = %ch.name, "channel matched");
            return Some((ch, *tier));
        }
    }
    None
}

fn tier_exact(wanted: &str, entry_name: &str) -> bool {
    normalize(entry_name) == wanted
}

/// Entry name with dedup and quality suffixes stripped; match if either
/// string contains the other.
fn tier_partial(wanted: &str, entry_name: &str) -> bool {
    let upper = entry_name.trim().to_uppercase();
    let clean = DEDUP_SUFFIX.replace(&upper, "");
    let clean = QUALITY_SUFFIX.replace(&clean, "");
    clean.contains(wanted) || wanted.contains(clean.as_ref())
}

/// Both sides reduced to bare alphanumerics; match if either contains the
/// other.
fn tier_flexible(wanted: &str, entry_name: &str) -> bool {
    let entry_upper = entry_name.trim().to_uppercase();
    let entry_simple = NON_ALNUM.replace_all(&entry_upper, "");
    let wanted_simple = NON_ALNUM.replace_all(wanted, "");
    entry_simple.contains(wanted_simple.as_ref()) || wanted_simple.contains(entry_simple.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(name: &str) -> Channel {
        Channel {
            name: name.to_string(),
            url: format!("https://vavoo.to/play/{}", name.len()),
            aliases: vec![],
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  rai 1  "), "RAI 1");
        assert_eq!(normalize("Canale 5 .a"), "CANALE 5");
        assert_eq!(normalize("Canale 5 .B"), "CANALE 5");
        // Suffix only stripped at the very end, with leading whitespace.
        assert_eq!(normalize("A.b c"), "A.B C");
    }

    #[test]
    fn test_exact_tier_wins_over_weaker_tiers() {
        // "RAI 1 HD" comes first and would satisfy the partial tier, but the
        // exact tier scans the whole catalog before partial runs.
        let channels = vec![ch("RAI 1 HD"), ch("RAI 1")];
        let (found, tier) = find_channel("rai 1", &channels).unwrap();
        assert_eq!(found.name, "RAI 1");
        assert_eq!(tier, MatchTier::Exact);
    }

    #[test]
    fn test_partial_tier_strips_quality_tokens() {
        let channels = vec![ch("RAI SPORT FHD")];
        let (found, tier) = find_channel("rai sport", &channels).unwrap();
        assert_eq!(found.name, "RAI SPORT FHD");
        assert_eq!(tier, MatchTier::Partial);
    }

    #[test]
    fn test_flexible_tier_only_for_collapsed_names() {
        // Exact fails ("CANALE 5" != "CANALE5"), partial fails (neither
        // string contains the other), flexible collapses both to CANALE5*.
        let channels = vec![ch("Canale 5 .a")];
        let (found, tier) = find_channel("CANALE5", &channels).unwrap();
        assert_eq!(found.name, "Canale 5 .a");
        assert_eq!(tier, MatchTier::Flexible);
    }

    #[test]
    fn test_no_match_is_none() {
        let channels = vec![ch("RAI 1"), ch("Canale 5")];
        assert!(find_channel("La7", &channels).is_none());
    }

    #[test]
    fn test_idempotent_resolution() {
        let channels = vec![ch("RAI 1 HD"), ch("RAI 1")];
        let first = find_channel("rai 1", &channels).unwrap().0.url.clone();
        let second = find_channel("rai 1", &channels).unwrap().0.url.clone();
        assert_eq!(first, second);
    }
}
