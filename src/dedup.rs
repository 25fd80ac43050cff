use crate::models::FeedEntry;

/// What the guard decided about one candidate entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Unique,
    /// Same id as an accepted entry.
    IdentityDuplicate { existing: i64 },
    /// New id, but the text matches an accepted entry.
    ContentDuplicate { existing: i64 },
}

impl Verdict {
    pub fn is_duplicate(&self) -> bool {
        !matches!(self, Verdict::Unique)
    }
}

pub trait DuplicateRule {
    /// Returns the id of the accepted entry the candidate collides with.
    fn find_match<E: FeedEntry>(&self, candidate: &E, accepted: &[E]) -> Option<i64>;
}

pub struct SameId;

impl DuplicateRule for SameId {
    fn find_match<E: FeedEntry>(&self, candidate: &E, accepted: &[E]) -> Option<i64> {
        accepted
            .iter()
            .find(|existing| existing.id() == candidate.id())
            .map(FeedEntry::id)
    }
}

/// The backend sometimes re-serves the same story under a fresh id.
pub struct SameContent;

impl DuplicateRule for SameContent {
    fn find_match<E: FeedEntry>(&self, candidate: &E, accepted: &[E]) -> Option<i64> {
        let fingerprint = Fingerprint::of(candidate);
        accepted
            .iter()
            .find(|existing| fingerprint.matches(&Fingerprint::of(*existing)))
            .map(FeedEntry::id)
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Fingerprint {
    title: String,
    description: String,
    name: String,
}

impl Fingerprint {
    fn of<E: FeedEntry>(entry: &E) -> Self {
        Self {
            title: normalize(entry.title()),
            description: normalize(entry.description()),
            name: normalize(entry.name()),
        }
    }

    // Title must match, plus either description or name. Empty never matches.
    fn matches(&self, other: &Fingerprint) -> bool {
        field_eq(&self.title, &other.title)
            && (field_eq(&self.description, &other.description) || field_eq(&self.name, &other.name))
    }
}

fn field_eq(a: &str, b: &str) -> bool {
    !a.is_empty() && a == b
}

/// Trim and lowercase, the only normalization the content rule applies.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupRuleEnum {
    SameId,
    SameContent,
}

impl DedupRuleEnum {
    fn find_match<E: FeedEntry>(&self, candidate: &E, accepted: &[E]) -> Option<i64> {
        match self {
            DedupRuleEnum::SameId => SameId.find_match(candidate, accepted),
            DedupRuleEnum::SameContent => SameContent.find_match(candidate, accepted),
        }
    }
}

/// Runs the identity rule, then the content rule; the first hit wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct DedupGuard;

impl DedupGuard {
    const RULES: [DedupRuleEnum; 2] = [DedupRuleEnum::SameId, DedupRuleEnum::SameContent];

    pub fn check<E: FeedEntry>(&self, candidate: &E, accepted: &[E]) -> Verdict {
        for rule in Self::RULES {
            if let Some(existing) = rule.find_match(candidate, accepted) {
                return match rule {
                    DedupRuleEnum::SameId => Verdict::IdentityDuplicate { existing },
                    DedupRuleEnum::SameContent => Verdict::ContentDuplicate { existing },
                };
            }
        }
        Verdict::Unique
    }
}
