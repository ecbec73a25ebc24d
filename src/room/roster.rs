use super::participant::Participant;
use std::cmp::Ordering;

/// The de-duplicated set of humans and automated personas attached to a room.
///
/// Invariants, re-established after every mutation:
/// - at most one entry per human user id (latest entry wins);
/// - at most one entry per automated display name (first entry wins);
/// - humans are held ahead of automated entries.
///
/// Mutations are applied in event-arrival order and are commutative with
/// respect to these invariants.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: Vec<Participant>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a `user-joined` event.
    ///
    /// An entry sharing the arriving user id is left untouched - reconnect
    /// races must not produce duplicate roster rows.
    pub fn user_joined(&mut self, participant: Participant) {
        let exists = self
            .entries
            .iter()
            .any(|p| p.user_id() == participant.user_id());
        if exists {
            return;
        }
        self.entries.push(participant);
        self.dedupe();
    }

    /// Handle a `user-left` event. Unknown connection ids are not an error.
    pub fn user_left(&mut self, connection_id: &str) {
        self.entries.retain(|p| match p {
            Participant::Human {
                connection_id: id, ..
            } => id != connection_id,
            Participant::Automated { .. } => true,
        });
    }

    /// Apply a `room-participants` snapshot.
    ///
    /// The snapshot is authoritative for humans only; automated entries are
    /// session-scoped and survive untouched. Automated entries inside the
    /// snapshot are ignored.
    pub fn apply_snapshot(&mut self, snapshot: Vec<Participant>) {
        let mut next: Vec<Participant> = snapshot
            .into_iter()
            .filter(|p| !p.is_automated())
            .collect();
        next.extend(self.entries.iter().filter(|p| p.is_automated()).cloned());
        self.entries = next;
        self.dedupe();
    }

    /// Replace the automated roster (from the bot roster fetch), keeping
    /// whatever humans are already present.
    pub fn set_automated(&mut self, personas: Vec<Participant>) {
        self.entries.retain(|p| !p.is_automated());
        self.entries
            .extend(personas.into_iter().filter(|p| p.is_automated()));
        self.dedupe();
    }

    /// Overwrite an automated participant's display name, matched by user id.
    ///
    /// The initial name may be a generic placeholder until the backend
    /// assigns the actual persona name; messages carry the real one.
    pub fn reconcile_automated_name(&mut self, user_id: &str, name: &str) {
        let mut changed = false;
        for p in &mut self.entries {
            if let Participant::Automated {
                user_id: id,
                name: current,
            } = p
            {
                if id == user_id && current != name {
                    *current = name.to_string();
                    changed = true;
                }
            }
        }
        if changed {
            self.dedupe();
        }
    }

    /// Display order: humans before personas, humans alphabetically,
    /// personas by the trailing numeral of their name.
    pub fn sorted(&self) -> Vec<Participant> {
        let mut ordered = self.entries.clone();
        ordered.sort_by(|a, b| match (a.is_automated(), b.is_automated()) {
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
            (true, true) => a.trailing_number().cmp(&b.trailing_number()),
            (false, false) => a.name().cmp(b.name()),
        });
        ordered
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-establish the roster invariants.
    fn dedupe(&mut self) {
        let mut kept: Vec<Participant> = Vec::with_capacity(self.entries.len());

        // Humans first: latest entry wins, position of the first occurrence
        // is kept
        for p in self.entries.iter().filter(|p| !p.is_automated()) {
            match kept.iter_mut().find(|k| k.key() == p.key()) {
                Some(existing) => *existing = p.clone(),
                None => kept.push(p.clone()),
            }
        }

        // Automated personas: first entry per display name wins
        for p in self.entries.iter().filter(|p| p.is_automated()) {
            if !kept.iter().any(|k| k.key() == p.key()) {
                kept.push(p.clone());
            }
        }

        self.entries = kept;
    }
}
