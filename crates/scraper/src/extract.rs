//! Outcome extraction: poll the page until it shows either an answer or an
//! inline rejection, then resolve which one wins.

use {
    chromiumoxide::Page,
    serde::Deserialize,
    tokio::time::{Instant, sleep},
    tracing::trace,
};

use crate::{
    error::ScrapeError,
    types::{ANSWER_SELECTOR, ERROR_SELECTOR, FALLBACK_ANSWER, Outcome, POLL_INTERVAL,
        RESPONSE_TIMEOUT},
};

/// One snapshot of the page's answer and error nodes.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct DomProbe {
    /// Text of the inline error node, if one is rendered.
    error: Option<String>,
    /// Text of every answer node, oldest first. The page appends a node per
    /// exchange and never removes old ones.
    answers: Vec<String>,
}

fn probe_js() -> String {
    format!(
        r#"(() => {{
            const errorNode = document.querySelector({error});
            return {{
                error: errorNode ? errorNode.textContent : null,
                answers: Array.from(document.querySelectorAll({answer}))
                    .map((node) => node.textContent ?? ''),
            }};
        }})()"#,
        error = js_string(ERROR_SELECTOR),
        answer = js_string(ANSWER_SELECTOR),
    )
}

fn js_string(text: &str) -> String {
    // serde_json string syntax is valid JS string syntax.
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".into())
}

/// Whether the page has produced something worth resolving: a rejection
/// matching `pattern`, or any non-blank answer.
pub(crate) fn outcome_ready(probe: &DomProbe, pattern: &str) -> bool {
    if let Some(error) = &probe.error
        && error.contains(pattern)
    {
        return true;
    }
    probe.answers.iter().any(|a| !a.trim().is_empty())
}

/// Resolve a ready probe. A matching rejection outranks any answer, since a
/// rejected prompt can leave a stale answer node from an earlier exchange.
/// Only the newest answer node is authoritative: older nodes belong to past
/// exchanges, so a blank read of the newest one maps to the site's own
/// fallback phrase rather than a stale answer.
pub(crate) fn resolve_outcome(probe: &DomProbe, pattern: &str) -> Outcome {
    if let Some(error) = &probe.error
        && error.contains(pattern)
    {
        return Outcome::ErrorMessage(format!("Error: {}", error.trim()));
    }

    let answer = probe
        .answers
        .last()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty());

    match answer {
        Some(text) => Outcome::Answer(text.to_owned()),
        None => Outcome::Answer(FALLBACK_ANSWER.to_owned()),
    }
}

/// Poll the page until [`outcome_ready`] holds, then resolve. Errs with
/// [`ScrapeError::ResponseTimeout`] once the budget runs out.
pub(crate) async fn await_outcome(page: &Page, pattern: &str) -> Result<Outcome, ScrapeError> {
    let deadline = Instant::now() + RESPONSE_TIMEOUT;

    loop {
        let probe = read_probe(page).await?;
        if outcome_ready(&probe, pattern) {
            return Ok(resolve_outcome(&probe, pattern));
        }
        trace!(answers = probe.answers.len(), "outcome not ready");

        if Instant::now() + POLL_INTERVAL > deadline {
            return Err(ScrapeError::ResponseTimeout(
                RESPONSE_TIMEOUT.as_millis() as u64,
            ));
        }
        sleep(POLL_INTERVAL).await;
    }
}

async fn read_probe(page: &Page) -> Result<DomProbe, ScrapeError> {
    page.evaluate(probe_js())
        .await?
        .into_value::<DomProbe>()
        .map_err(|e| ScrapeError::JsEval(format!("malformed probe result: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATTERN: &str = "cannot be the same";

    fn probe(error: Option<&str>, answers: &[&str]) -> DomProbe {
        DomProbe {
            error: error.map(str::to_owned),
            answers: answers.iter().map(|a| (*a).to_owned()).collect(),
        }
    }

    #[test]
    fn not_ready_when_page_is_blank() {
        assert!(!outcome_ready(&probe(None, &[]), PATTERN));
        assert!(!outcome_ready(&probe(None, &["", "   "]), PATTERN));
    }

    #[test]
    fn unrelated_error_text_is_not_ready() {
        assert!(!outcome_ready(
            &probe(Some("network hiccup"), &[]),
            PATTERN
        ));
    }

    #[test]
    fn ready_on_matching_rejection_or_any_answer() {
        assert!(outcome_ready(
            &probe(Some("Prompt cannot be the same as before"), &[]),
            PATTERN
        ));
        assert!(outcome_ready(&probe(None, &["The password is X"]), PATTERN));
    }

    #[test]
    fn rejection_outranks_a_simultaneous_answer() {
        let p = probe(
            Some(" Prompt cannot be the same as before "),
            &["a stale answer"],
        );
        assert_eq!(
            resolve_outcome(&p, PATTERN),
            Outcome::ErrorMessage("Error: Prompt cannot be the same as before".into())
        );
    }

    #[test]
    fn newest_answer_node_wins() {
        let p = probe(None, &["first reply", "second reply", "  third reply  "]);
        assert_eq!(
            resolve_outcome(&p, PATTERN),
            Outcome::Answer("third reply".into())
        );
    }

    #[test]
    fn blank_newest_node_falls_back_instead_of_reusing_stale_answers() {
        let p = probe(None, &["real reply", "   "]);
        assert_eq!(
            resolve_outcome(&p, PATTERN),
            Outcome::Answer(FALLBACK_ANSWER.into())
        );
    }

    #[test]
    fn all_blank_answers_fall_back_to_stock_phrase() {
        let p = probe(None, &["  ", ""]);
        assert_eq!(
            resolve_outcome(&p, PATTERN),
            Outcome::Answer(FALLBACK_ANSWER.into())
        );
    }

    #[test]
    fn probe_js_embeds_quoted_selectors() {
        let js = probe_js();
        assert!(js.contains("\".answer\""));
        assert!(js.contains("\".text-red-500\""));
    }
}
