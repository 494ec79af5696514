//! services/client/src/presenter.rs
//!
//! Turns session snapshots into terminal text.

use trustme_core::{SessionSnapshot, SessionState, Verdict};

const BAR_WIDTH: usize = 20;

pub fn render(snapshot: &SessionSnapshot) -> String {
    match &snapshot.state {
        SessionState::Idle => String::new(),
        SessionState::Submitting | SessionState::Settling => "Analysis in progress...".to_string(),
        SessionState::Succeeded(verdict) => render_verdict(verdict),
        SessionState::Failed(message) => format!("Error: {}", message),
    }
}

pub fn render_verdict(verdict: &Verdict) -> String {
    match verdict {
        Verdict::Scored {
            score,
            comment,
            details,
        } => {
            let mut lines = vec![
                format!("Score: {}/100", format_score(*score)),
                score_bar(*score),
                comment.clone(),
            ];
            if let Some(details) = details {
                lines.push(String::new());
                lines.push(details.clone());
            }
            lines.join("\n")
        }
        Verdict::Narrative { text, comment } => match comment {
            Some(comment) => format!("{}\n\n{}", comment, text),
            None => text.clone(),
        },
        Verdict::Comment { comment } => comment.clone(),
        Verdict::Raw { json } => json.clone(),
    }
}

fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{:.0}", score)
    } else {
        format!("{:.1}", score)
    }
}

/// `[##########----------]`, clamped to 0..=100.
fn score_bar(score: f64) -> String {
    let filled = ((score.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(state: SessionState) -> SessionSnapshot {
        SessionSnapshot {
            state,
            ..SessionSnapshot::default()
        }
    }

    #[test]
    fn renders_scored_verdict_with_details() {
        let text = render_verdict(&Verdict::Scored {
            score: 72.0,
            comment: "Reliable".to_string(),
            details: Some("Sources agree.".to_string()),
        });
        assert_eq!(
            text,
            "Score: 72/100\n[##############------]\nReliable\n\nSources agree."
        );
    }

    #[test]
    fn out_of_range_scores_are_clamped_in_the_bar() {
        assert_eq!(score_bar(150.0), format!("[{}]", "#".repeat(BAR_WIDTH)));
        assert_eq!(score_bar(-3.0), format!("[{}]", "-".repeat(BAR_WIDTH)));
        assert_eq!(format_score(40.5), "40.5");
    }

    #[test]
    fn renders_loading_and_failure() {
        assert_eq!(render(&snapshot(SessionState::Idle)), "");
        assert_eq!(render(&snapshot(SessionState::Settling)), "Analysis in progress...");
        assert_eq!(
            render(&snapshot(SessionState::Failed("API error: 500".to_string()))),
            "Error: API error: 500"
        );
    }

    #[test]
    fn renders_raw_dump_verbatim() {
        let verdict = Verdict::Raw {
            json: "{\n  \"a\": 1\n}".to_string(),
        };
        assert_eq!(render(&snapshot(SessionState::Succeeded(verdict))), "{\n  \"a\": 1\n}");
    }
}
