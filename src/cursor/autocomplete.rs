//! Two-phase autocomplete
//!
//! Full-text ranking alone cannot honor "starts with" semantics, so
//! autocomplete first discovers which indexed words the typed prefix
//! could mean, then rewrites itself into an ordinary ranked search
//! over exactly that vocabulary.
//!
//! Phase 1: normalize the typed phrase, then run a distinct-values
//! query over the high-priority word index, constrained to the
//! cursor's existing criteria plus a token-prefix clause per typed
//! word and a whole-phrase prefix clause.
//!
//! Phase 2: keep only candidates that string-start-with a typed word
//! (the token-level index can match substrings the exact prefix test
//! must reject). Survivors become the `search` phrase; no survivors
//! becomes a deliberately unsatisfiable criteria, so "zero hits" flows
//! through the normal result path instead of an error.
//!
//! The two store round-trips are strictly sequential; phase 2 depends
//! on phase 1's results.

use serde_json::Value;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::observability::Logger;
use crate::store::{Criteria, HIGH_SEARCH_TEXT_FIELD, HIGH_SEARCH_WORDS_FIELD, ID_FIELD};
use crate::text::{search_words, searchify, sortify};

use super::catalog::names;
use super::cursor::Cursor;
use super::errors::CursorResult;
use super::registry::FinalizeOutcome;
use super::state::FilterValue;

/// An id no stored document can carry. Generated once per process so
/// repeated finalizations of the same cursor stay structurally
/// identical.
fn never_match_id() -> &'static str {
    static SENTINEL: OnceLock<String> = OnceLock::new();
    SENTINEL.get_or_init(|| format!("__never-{}", Uuid::new_v4()))
}

/// The autocomplete finalizer. Clears its own state before returning
/// so later passes (and refinalize restarts) do not re-trigger it.
pub(crate) fn run(cursor: &mut Cursor) -> CursorResult<FinalizeOutcome> {
    let raw = match cursor.state().json(names::AUTOCOMPLETE) {
        Some(Value::String(phrase)) => phrase.clone(),
        _ => return Ok(FinalizeOutcome::Continue),
    };

    let phrase = sortify(&raw);
    if phrase.is_empty() {
        cursor.state_mut().clear(names::AUTOCOMPLETE);
        return Ok(FinalizeOutcome::Continue);
    }
    let words = search_words(&phrase);
    if words.is_empty() {
        cursor.state_mut().clear(names::AUTOCOMPLETE);
        return Ok(FinalizeOutcome::Continue);
    }

    // Phase 1: discover candidate indexed words. The discovery query
    // carries the full scope established so far in this pass
    // (permission, trash, published), so hidden documents cannot leak
    // vocabulary into the candidate set.
    let mut discovery = cursor.scoped_criteria();
    for word in &words {
        discovery = discovery.and(Criteria::prefix(
            HIGH_SEARCH_WORDS_FIELD,
            searchify(word, true),
        ));
    }
    discovery = discovery.and(Criteria::prefix(
        HIGH_SEARCH_TEXT_FIELD,
        searchify(&phrase, true),
    ));

    let candidates = cursor.store().distinct(HIGH_SEARCH_WORDS_FIELD, &discovery)?;

    // Phase 2: exact string-prefix filter over the candidates
    let mut survivors: Vec<String> = Vec::new();
    for candidate in &candidates {
        let Some(candidate) = candidate.as_str() else {
            continue;
        };
        let normalized = sortify(candidate);
        let keeps = words.iter().any(|word| normalized.starts_with(word.as_str()));
        if keeps && !survivors.contains(&normalized) {
            survivors.push(normalized);
        }
    }

    cursor.state_mut().clear(names::AUTOCOMPLETE);

    if survivors.is_empty() {
        Logger::trace("AUTOCOMPLETE_NO_MATCH", &[("phrase", &phrase)]);
        cursor.set_base_criteria(Criteria::eq(ID_FIELD, never_match_id()));
    } else {
        let rewritten = survivors.join(" ");
        Logger::trace(
            "AUTOCOMPLETE_REWRITE",
            &[("phrase", &phrase), ("search", &rewritten)],
        );
        cursor
            .state_mut()
            .set(names::SEARCH, FilterValue::Json(Value::from(rewritten)));
    }
    Ok(FinalizeOutcome::Continue)
}
