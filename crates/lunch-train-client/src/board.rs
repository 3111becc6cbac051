use chrono::{DateTime, FixedOffset, NaiveTime, Utc};
use uuid::Uuid;

use lunch_train_types::{Participant, Train, VisibilityWindow};

/// The client's local picture of today's trains, earliest departure first.
///
/// Mutations here mirror what the server does to the same records, so an
/// optimistic change looks like the confirmed one will.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    pub trains: Vec<Train>,
}

impl Board {
    /// Board re-derived from a listing: only trains inside `window`, sorted.
    pub fn from_listing(trains: Vec<Train>, window: &VisibilityWindow) -> Self {
        let mut board = Self {
            trains: trains.into_iter().filter(|t| window.contains(t)).collect(),
        };
        board.sort();
        board
    }

    pub fn train(&self, id: Uuid) -> Option<&Train> {
        self.trains.iter().find(|t| t.id == id)
    }

    /// The (first) train this user is seated on.
    pub fn current_train(&self, user_id: &str) -> Option<&Train> {
        self.trains.iter().find(|t| t.has_participant(user_id))
    }

    pub fn insert(&mut self, train: Train) {
        self.trains.retain(|t| t.id != train.id);
        self.trains.push(train);
        self.sort();
    }

    /// Swap a placeholder for the record the server created.
    pub fn replace(&mut self, placeholder: Uuid, train: Train) {
        self.trains.retain(|t| t.id != placeholder);
        self.insert(train);
    }

    /// Union on the whole pair, same as the store.
    pub fn seat(&mut self, train_id: Uuid, participant: Participant) {
        if let Some(train) = self.trains.iter_mut().find(|t| t.id == train_id) {
            if !train.participants.contains(&participant) {
                train.participants.push(participant);
            }
        }
    }

    /// Remove the user's first seat. A train left with nobody aboard is
    /// dropped, as the server deletes it. Returns whether anything changed.
    pub fn unseat(&mut self, train_id: Uuid, user_id: &str) -> bool {
        let Some(index) = self.trains.iter().position(|t| t.id == train_id) else {
            return false;
        };
        let train = &mut self.trains[index];
        let Some(seat) = train.participants.iter().position(|p| p.user_id == user_id) else {
            return false;
        };

        if train.participants.len() == 1 {
            self.trains.remove(index);
        } else {
            train.participants.remove(seat);
        }
        true
    }

    /// Rewrite the user's nickname in every train they sit on. Returns the
    /// rewritten rosters, one per touched train.
    pub fn rename(&mut self, user_id: &str, nickname: &str) -> Vec<(Uuid, Vec<Participant>)> {
        let mut rewritten = Vec::new();
        for train in self.trains.iter_mut().filter(|t| t.has_participant(user_id)) {
            for p in train.participants.iter_mut().filter(|p| p.user_id == user_id) {
                p.nickname = nickname.to_string();
            }
            rewritten.push((train.id, train.participants.clone()));
        }
        rewritten
    }

    fn sort(&mut self) {
        self.trains
            .sort_by(|a, b| a.departure_time.cmp(&b.departure_time).then(a.created_at.cmp(&b.created_at)));
    }
}

/// Up to two uppercase initials, e.g. "Grace Hopper" -> "GH".
pub fn initials(nickname: &str) -> String {
    nickname
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .take(2)
        .collect()
}

/// Form default for a new train: 11:00 local time today.
pub fn default_departure_time(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let eleven = NaiveTime::from_hms_opt(11, 0, 0).unwrap_or_default();
    now.with_timezone(&offset)
        .date_naive()
        .and_time(eleven)
        .and_local_timezone(offset)
        .single()
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or(now)
}

/// "HH:MM" in the given offset.
pub fn departure_label(train: &Train, offset: FixedOffset) -> String {
    train.departure_time.with_timezone(&offset).format("%H:%M").to_string()
}
