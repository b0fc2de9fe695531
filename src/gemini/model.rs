//! Candidate model roster.
//!
//! The static preference list is ranked: earlier entries are tried first.
//! Live discovery is advisory only; when it works, the candidates become the
//! intersection of the preference list with what the credential can actually
//! call, in preference order.

/// Ranked default preference list.
pub const PREFERRED_MODELS: [&str; 3] = [
    "models/gemini-1.5-pro",
    "models/gemini-1.5-flash",
    "models/gemini-2.0-flash",
];

/// Returns the default preference list as owned strings.
pub fn default_candidates() -> Vec<String> {
    PREFERRED_MODELS.iter().map(|name| name.to_string()).collect()
}

/// Orders candidates for an invocation.
///
/// Preference entries available live come first, in preference order. With
/// no overlap the first live model is used alone. An empty live list falls
/// back to the full static list, same as a failed discovery call.
pub fn rank_candidates(preferred: &[String], live: &[String]) -> Vec<String> {
    if live.is_empty() {
        return preferred.to_vec();
    }

    let ranked: Vec<String> = preferred
        .iter()
        .filter(|name| live.contains(name))
        .cloned()
        .collect();
    if ranked.is_empty() {
        vec![live[0].clone()]
    } else {
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::{default_candidates, rank_candidates};

    fn owned(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn preference_order_wins_over_live_order() {
        let preferred = owned(&["models/a", "models/b", "models/c"]);
        let live = owned(&["models/c", "models/a"]);
        assert_eq!(
            rank_candidates(&preferred, &live),
            owned(&["models/a", "models/c"])
        );
    }

    #[test]
    fn no_overlap_uses_first_live_model() {
        let preferred = owned(&["models/a"]);
        let live = owned(&["models/x", "models/y"]);
        assert_eq!(rank_candidates(&preferred, &live), owned(&["models/x"]));
    }

    #[test]
    fn empty_live_list_falls_back_to_static_list() {
        let preferred = owned(&["models/a", "models/b"]);
        assert_eq!(rank_candidates(&preferred, &[]), preferred);
    }

    #[test]
    fn default_roster_is_ranked_and_nonempty() {
        let defaults = default_candidates();
        assert_eq!(defaults.first().map(String::as_str), Some("models/gemini-1.5-pro"));
        assert_eq!(defaults.len(), 3);
    }
}
