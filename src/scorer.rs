use crate::browser::Anchor;
use crate::domain::{domain_from_url, is_related_domain};
use serde::{Deserialize, Serialize};

/// Keywords an anchor's visible text must contain (case-insensitive) to be
/// considered a privacy policy candidate.
pub const PRIVACY_KEYWORDS: [&str; 3] = ["privacy policy", "privacy", "data policy"];

/// An anchor judged possibly pointing to a privacy policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateLink {
    /// Trimmed visible text of the anchor
    pub text: String,

    /// Absolute target URL
    pub href: String,

    /// Ranking score, higher is better
    pub score: u32,
}

/// Scores anchor text: the exact phrase "privacy policy" beats a bare
/// "privacy", which beats anything else (a "data policy" match).
pub fn score_link_text(text: &str) -> u32 {
    let text = text.to_lowercase();
    if text.contains("privacy policy") {
        10
    } else if text.contains("privacy") {
        5
    } else {
        1
    }
}

fn matches_keyword(text: &str) -> bool {
    let text = text.to_lowercase();
    PRIVACY_KEYWORDS.iter().any(|keyword| text.contains(keyword))
}

/// Ranks the anchors of a page as privacy policy candidates.
///
/// Anchors must match a keyword and point at a domain related to
/// `current_domain`. The result is sorted by score, descending; equal scores
/// keep document order. An empty result means no policy link was found.
pub fn rank_candidates(anchors: &[Anchor], current_domain: &str) -> Vec<CandidateLink> {
    let mut candidates: Vec<CandidateLink> = anchors
        .iter()
        .filter(|anchor| matches_keyword(&anchor.text))
        .filter(|anchor| is_related_domain(&domain_from_url(&anchor.href), current_domain))
        .map(|anchor| CandidateLink {
            text: anchor.text.trim().to_string(),
            href: anchor.href.clone(),
            score: score_link_text(&anchor.text),
        })
        .collect();

    // sort_by is stable, so ties stay in document order
    candidates.sort_by(|a, b| b.score.cmp(&a.score));

    ::log::trace!(
        "Ranked {} candidates out of {} anchors for {}",
        candidates.len(),
        anchors.len(),
        current_domain
    );
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(text: &str, href: &str) -> Anchor {
        Anchor::new(text, href)
    }

    #[test]
    fn score_ordering() {
        assert_eq!(score_link_text("Privacy Policy"), 10);
        assert_eq!(score_link_text("Our Privacy"), 5);
        assert_eq!(score_link_text("Data Policy"), 1);
        assert!(score_link_text("Privacy Policy") > score_link_text("Our Privacy"));
        assert!(score_link_text("Our Privacy") > score_link_text("Data Policy"));
    }

    #[test]
    fn keeps_policy_link_and_drops_contact() {
        let anchors = vec![
            anchor("Privacy Policy", "https://example.com/privacy"),
            anchor("Contact", "https://example.com/contact"),
        ];
        let ranked = rank_candidates(&anchors, "example.com");
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].href, "https://example.com/privacy");
        assert_eq!(ranked[0].score, 10);
    }

    #[test]
    fn empty_anchor_list() {
        assert!(rank_candidates(&[], "example.com").is_empty());
    }

    #[test]
    fn excludes_unrelated_domains() {
        let anchors = vec![
            anchor("Privacy Policy", "https://tracker.net/privacy"),
            anchor("Privacy", "https://legal.example.com/privacy"),
        ];
        let ranked = rank_candidates(&anchors, "example.com");
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].href, "https://legal.example.com/privacy");
        assert_eq!(ranked[0].score, 5);
    }

    #[test]
    fn empty_current_domain_matches_nothing() {
        let anchors = vec![anchor("Privacy Policy", "https://example.com/privacy")];
        assert!(rank_candidates(&anchors, "").is_empty());
    }

    #[test]
    fn sorted_descending_with_document_order_ties() {
        let anchors = vec![
            anchor("Data policy", "https://example.com/data"),
            anchor("Privacy", "https://example.com/p1"),
            anchor("  PRIVACY POLICY  ", "https://example.com/pp1"),
            anchor("Your privacy choices", "https://example.com/p2"),
            anchor("Privacy Policy (EU)", "https://example.com/pp2"),
        ];
        let ranked = rank_candidates(&anchors, "example.com");
        let hrefs: Vec<&str> = ranked.iter().map(|c| c.href.as_str()).collect();
        assert_eq!(
            hrefs,
            vec![
                "https://example.com/pp1",
                "https://example.com/pp2",
                "https://example.com/p1",
                "https://example.com/p2",
                "https://example.com/data",
            ]
        );
        assert_eq!(ranked[0].text, "PRIVACY POLICY");
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn ranking_is_deterministic() {
        let anchors = vec![
            anchor("Privacy", "https://example.com/a"),
            anchor("Privacy", "https://example.com/b"),
            anchor("Privacy Policy", "https://example.com/c"),
        ];
        let first = rank_candidates(&anchors, "example.com");
        for _ in 0..10 {
            assert_eq!(rank_candidates(&anchors, "example.com"), first);
        }
    }
}
