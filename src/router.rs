use crate::personas::{self, Persona};
use serde::Serialize;

/// Personas currently joined to a multi-persona conversation, in join order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActiveSet {
    ids: Vec<String>,
}

impl ActiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the persona was already active
    pub fn activate(&mut self, persona_id: &str) -> bool {
        if self.contains(persona_id) {
            return false;
        }
        self.ids.push(persona_id.to_string());
        true
    }

    /// Returns false if the persona was not active
    pub fn deactivate(&mut self, persona_id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|id| id != persona_id);
        self.ids.len() != before
    }

    pub fn contains(&self, persona_id: &str) -> bool {
        self.ids.iter().any(|id| id == persona_id)
    }

    pub fn first(&self) -> Option<&str> {
        self.ids.first().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for ActiveSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ActiveSet::new();
        for id in iter {
            set.activate(id.as_ref());
        }
        set
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteReason {
    DirectMention,
    Relevance,
    Default,
    NoActivePersona,
}

impl RouteReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteReason::DirectMention => "direct_mention",
            RouteReason::Relevance => "relevance",
            RouteReason::Default => "default",
            RouteReason::NoActivePersona => "no_active_persona",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDecision {
    /// Reply order, not priority
    pub personas: Vec<String>,
    pub reason: RouteReason,
}

impl RouteDecision {
    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

/// Decide which active personas answer `user_text`.
///
/// Plain substring containment on lower-cased text, no fuzzy matching:
/// 1. every active persona mentioned by name or spoken id, in registry order
/// 2. otherwise the single best relevance-keyword score
///    (ties go to the earlier persona, zero never wins)
/// 3. otherwise the first persona that joined
pub fn route(user_text: &str, active: &ActiveSet) -> RouteDecision {
    if active.is_empty() {
        return RouteDecision {
            personas: Vec::new(),
            reason: RouteReason::NoActivePersona,
        };
    }

    let lower = user_text.to_lowercase();
    let candidates: Vec<&Persona> = personas::all()
        .iter()
        .filter(|p| active.contains(p.id))
        .collect();

    let mentioned: Vec<String> = candidates
        .iter()
        .filter(|p| lower.contains(&p.name.to_lowercase()) || lower.contains(&p.spoken_id()))
        .map(|p| p.id.to_string())
        .collect();
    if !mentioned.is_empty() {
        return RouteDecision {
            personas: mentioned,
            reason: RouteReason::DirectMention,
        };
    }

    if let Some(best) = most_relevant(&lower, &candidates) {
        return RouteDecision {
            personas: vec![best.id.to_string()],
            reason: RouteReason::Relevance,
        };
    }

    RouteDecision {
        personas: active.first().map(str::to_string).into_iter().collect(),
        reason: RouteReason::Default,
    }
}

/// Count of routing keywords contained in already lower-cased text
pub fn relevance_score(persona: &Persona, lower_text: &str) -> usize {
    persona
        .routing_keywords
        .iter()
        .filter(|k| lower_text.contains(*k))
        .count()
}

fn most_relevant<'a>(lower_text: &str, candidates: &[&'a Persona]) -> Option<&'a Persona> {
    let mut best: Option<&'a Persona> = None;
    let mut best_score = 0;
    for persona in candidates {
        let score = relevance_score(persona, lower_text);
        if score > best_score {
            best_score = score;
            best = Some(*persona);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::personas::{CHAOS_ENGINEER, COMEBACK_COACH, MIND_READER, SCENARIO_MASTER};

    fn active(ids: &[&str]) -> ActiveSet {
        ids.iter().collect()
    }

    #[test]
    fn empty_active_set_routes_nowhere() {
        let decision = route("anyone there?", &ActiveSet::new());
        assert!(decision.is_empty());
        assert_eq!(decision.reason, RouteReason::NoActivePersona);
    }

    #[test]
    fn single_persona_takes_unmatched_text_by_default() {
        let decision = route("hello there", &active(&[MIND_READER]));
        assert_eq!(decision.personas, vec![MIND_READER]);
        assert_eq!(decision.reason, RouteReason::Default);
    }

    #[test]
    fn database_issue_goes_to_scenario_master() {
        let decision = route("I think it's a database issue", &active(&[SCENARIO_MASTER]));
        assert_eq!(decision.personas, vec![SCENARIO_MASTER]);
    }

    #[test]
    fn direct_mention_selects_only_named_persona() {
        let set = active(&[COMEBACK_COACH, CHAOS_ENGINEER]);
        let text = "Chaos Engineer, what do you think about my job interview feedback?";
        let decision = route(text, &set);
        assert_eq!(decision.personas, vec![CHAOS_ENGINEER]);
        assert_eq!(decision.reason, RouteReason::DirectMention);
    }

    #[test]
    fn mention_beats_higher_keyword_score() {
        let set = active(&[SCENARIO_MASTER, MIND_READER]);
        // Mind Reader scores 0 on keywords here, Scenario Master scores 4
        let decision = route("mind reader: debug this error, the system has a bug", &set);
        assert_eq!(decision.personas, vec![MIND_READER]);
    }

    #[test]
    fn spoken_id_counts_as_mention() {
        let decision = route("comeback coach?", &active(&[CHAOS_ENGINEER, COMEBACK_COACH]));
        assert_eq!(decision.personas, vec![COMEBACK_COACH]);
    }

    #[test]
    fn several_mentions_follow_registry_order() {
        let set = active(&[MIND_READER, SCENARIO_MASTER]);
        let decision = route("Mind Reader and Scenario Master, both of you", &set);
        assert_eq!(decision.personas, vec![SCENARIO_MASTER, MIND_READER]);
    }

    #[test]
    fn mentions_of_inactive_personas_are_ignored() {
        let decision = route("Chaos Engineer please", &active(&[MIND_READER]));
        assert_eq!(decision.personas, vec![MIND_READER]);
        assert_eq!(decision.reason, RouteReason::Default);
    }

    #[test]
    fn relevance_picks_highest_score() {
        let set = active(&[SCENARIO_MASTER, COMEBACK_COACH]);
        let decision = route("my job interview feedback was bad", &set);
        assert_eq!(decision.personas, vec![COMEBACK_COACH]);
        assert_eq!(decision.reason, RouteReason::Relevance);
    }

    #[test]
    fn relevance_tie_goes_to_registry_order() {
        // one keyword each: "bug" for scenario-master, "job" for comeback-coach
        let set = active(&[COMEBACK_COACH, SCENARIO_MASTER]);
        let decision = route("a bug at my job", &set);
        assert_eq!(decision.personas, vec![SCENARIO_MASTER]);
    }

    #[test]
    fn routing_is_deterministic() {
        let set = active(&[SCENARIO_MASTER, COMEBACK_COACH, CHAOS_ENGINEER, MIND_READER]);
        let text = "I want to learn and grow through a project";
        let first = route(text, &set);
        for _ in 0..10 {
            assert_eq!(route(text, &set), first);
        }
    }

    #[test]
    fn active_set_membership() {
        let mut set = ActiveSet::new();
        assert!(set.activate(MIND_READER));
        assert!(!set.activate(MIND_READER));
        assert!(set.activate(CHAOS_ENGINEER));
        assert_eq!(set.first(), Some(MIND_READER));
        assert!(set.deactivate(MIND_READER));
        assert!(!set.deactivate(MIND_READER));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![CHAOS_ENGINEER]);
    }
}
