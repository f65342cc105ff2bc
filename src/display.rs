use crate::badge::ProcessingState;
use crate::domain::display_name;
use crate::popup::PopupView;
use crate::results::{AnalysisResult, AnalysisSection};
use std::fmt::Write;

const LOADING_TEXT: &str = "PrivacyPal is reading the fine print so you don't have to...";

/// Sections in display order: title, description, data
pub fn sections(analysis: &AnalysisResult) -> [(&'static str, &'static str, &AnalysisSection); 3] {
    [
        (
            "Data Collection & Retention",
            "How your personal information is collected and stored",
            &analysis.data_collection_and_retention,
        ),
        (
            "Data Usage",
            "How your data is used and shared with others",
            &analysis.data_usage,
        ),
        (
            "User Rights & Controls",
            "Your rights and control over your personal data",
            &analysis.user_rights_and_controls,
        ),
    ]
}

/// Score as five stars, clamped to 1..=5
pub fn stars(score: u8) -> String {
    let filled = score.clamp(1, 5) as usize;
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

/// Plain-text rendering of a popup view
pub fn render_popup(domain: &str, view: &PopupView, learn_more: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} Privacy Analysis", display_name(domain));
    let _ = writeln!(out);

    match view {
        PopupView::Loading => {
            let _ = writeln!(out, "{LOADING_TEXT}");
        }
        PopupView::Error(reason) => {
            let _ = writeln!(out, "Unable to analyze this page: {reason}");
        }
        PopupView::NoPolicy => {
            let _ = writeln!(out, "No privacy policy analysis available.");
            let _ = writeln!(out, "We couldn't find a privacy policy on this page.");
        }
        PopupView::Ready(analysis) => {
            let _ = writeln!(
                out,
                "We've analyzed this privacy policy to help you understand how your data is handled."
            );
            for (title, description, section) in sections(analysis) {
                let _ = writeln!(out);
                let _ = writeln!(out, "{title}  {}", stars(section.score));
                let _ = writeln!(out, "  {description}");
                let body = if learn_more {
                    &section.learn_more
                } else {
                    &section.justification
                };
                let _ = writeln!(out, "  {body}");
            }
        }
    }

    let _ = writeln!(out);
    let _ = write!(out, "powered by PrivacyPal");
    out
}

pub fn render_badge(state: Option<ProcessingState>) -> String {
    match state {
        Some(state) => {
            let badge = state.badge();
            format!("{} ({:?}, {})", badge.text, state, badge.color)
        }
        None => "(no badge)".to_string(),
    }
}
