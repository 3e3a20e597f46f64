//! Rankings computed from benchmark sessions.
//!
//! For each (day, part, language, input kind), every agent is represented by its most recent session
//! whose answer is not known to be wrong. Agents are ordered by median time, then average
//! time, then name. The first three places earn gold, silver and bronze; the medal table
//! orders agents by golds, silvers, bronzes, then by their summed median time.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    fmt,
};

use serde::Serialize;

use crate::{
    puzzle::{Day, InputKind, Lang, Part},
    storage::SessionRecord,
};

/// One agent's place in a [`Podium`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    /// 1-based rank
    pub rank: usize,
    /// Agent tag
    pub agent: String,
    /// Median of the ranked session
    pub p50_ms: f64,
    /// Average of the ranked session
    pub avg_ms: f64,
    /// `None` when the answer was never verified
    pub is_correct: Option<bool>,
    /// Id of the ranked session
    pub session_id: String,
}

/// Ranking of one (day, part, language, input kind).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Podium {
    /// Puzzle day
    pub day: Day,
    /// Puzzle part
    pub part: Part,
    /// Solver language
    pub lang: Lang,
    /// Sample or final input
    pub kind: InputKind,
    /// Fastest first
    pub placements: Vec<Placement>,
}

/// Medal count of one agent.
///
/// Ordered by golds, then silvers, then bronzes.
#[derive(PartialEq, Eq, PartialOrd, Ord, Default, Debug, Clone, Copy, Serialize)]
pub struct Medals {
    /// First places
    pub gold: u32,
    /// Second places
    pub silver: u32,
    /// Third places
    pub bronze: u32,
}

impl Medals {
    fn award(&mut self, rank: usize) {
        match rank {
            1 => self.gold += 1,
            2 => self.silver += 1,
            3 => self.bronze += 1,
            _ => {}
        }
    }

    /// Total number of medals.
    pub fn total(&self) -> u32 {
        self.gold + self.silver + self.bronze
    }
}

impl fmt::Display for Medals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gold: {}, silver: {}, bronze: {}",
            self.gold, self.silver, self.bronze
        )
    }
}

/// One row of the medal table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standing {
    /// Agent tag
    pub agent: String,
    /// Medals over every podium
    pub medals: Medals,
    /// Sum of the agent's ranked medians
    pub total_p50_ms: f64,
}

/// Builds one podium per (day, part, language, input kind) present in `sessions`.
///
/// `sessions` must be in insertion order, as returned by
/// [`Store::sessions`](crate::storage::Store::sessions): later sessions replace earlier ones.
/// Sessions with `is_correct == Some(false)` are ignored.
pub fn podiums(sessions: &[SessionRecord]) -> Vec<Podium> {
    type Key = (Day, Part, Lang, InputKind);
    let mut latest: BTreeMap<Key, HashMap<&str, &SessionRecord>> = BTreeMap::new();
    for session in sessions.iter().filter(|s| s.is_correct != Some(false)) {
        latest
            .entry((session.day, session.part, session.lang, session.kind))
            .or_default()
            .insert(session.agent.as_str(), session);
    }

    latest
        .into_iter()
        .map(|((day, part, lang, kind), by_agent)| {
            let mut ranked: Vec<&SessionRecord> = by_agent.into_values().collect();
            ranked.sort_by(|a, b| {
                a.stats
                    .p50
                    .total_cmp(&b.stats.p50)
                    .then_with(|| a.stats.avg.total_cmp(&b.stats.avg))
                    .then_with(|| a.agent.cmp(&b.agent))
            });
            Podium {
                day,
                part,
                lang,
                kind,
                placements: ranked
                    .into_iter()
                    .enumerate()
                    .map(|(i, s)| Placement {
                        rank: i + 1,
                        agent: s.agent.clone(),
                        p50_ms: s.stats.p50,
                        avg_ms: s.stats.avg,
                        is_correct: s.is_correct,
                        session_id: s.id.clone(),
                    })
                    .collect(),
            }
        })
        .collect()
}

/// Medal table over `podiums`, best agent first.
pub fn standings(podiums: &[Podium]) -> Vec<Standing> {
    let mut table: HashMap<&str, Standing> = HashMap::new();
    for placement in podiums.iter().flat_map(|p| &p.placements) {
        let standing = table
            .entry(placement.agent.as_str())
            .or_insert_with(|| Standing {
                agent: placement.agent.clone(),
                medals: Medals::default(),
                total_p50_ms: 0.0,
            });
        standing.medals.award(placement.rank);
        standing.total_p50_ms += placement.p50_ms;
    }

    let mut table: Vec<Standing> = table.into_values().collect();
    table.sort_by(compare_standings);
    table
}

fn compare_standings(a: &Standing, b: &Standing) -> Ordering {
    b.medals
        .cmp(&a.medals)
        .then_with(|| a.total_p50_ms.total_cmp(&b.total_p50_ms))
        .then_with(|| a.agent.cmp(&b.agent))
}
