use lunch_train_types::Train;

/// Whether joining `target` may go ahead, and whether the user has to be
/// asked first because they would be pulled off another train.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchDecision {
    pub proceed: bool,
    pub requires_confirmation: bool,
}

pub fn decide_switch(current: Option<&Train>, target: &Train) -> SwitchDecision {
    match current {
        None => SwitchDecision {
            proceed: true,
            requires_confirmation: false,
        },
        Some(current) if current.id == target.id => SwitchDecision {
            proceed: false,
            requires_confirmation: false,
        },
        Some(_) => SwitchDecision {
            proceed: true,
            requires_confirmation: true,
        },
    }
}

/// What the user is asked before a switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchPrompt {
    pub from_destination: String,
    pub to_destination: String,
}

impl SwitchPrompt {
    pub fn new(from: &Train, to: &Train) -> Self {
        Self {
            from_destination: from.destination.clone(),
            to_destination: to.destination.clone(),
        }
    }

    pub fn message(&self) -> String {
        format!(
            "You are already in a train to {}. Do you want to switch to the train to {}?",
            self.from_destination, self.to_destination
        )
    }
}

/// Asks the user to confirm a switch. A UI shows a dialog; tests answer fixed.
pub trait SwitchConfirmer: Send + Sync {
    fn confirm(&self, prompt: &SwitchPrompt) -> bool;
}

/// Answers every prompt the same way.
pub struct AutoConfirm(pub bool);

impl SwitchConfirmer for AutoConfirm {
    fn confirm(&self, _prompt: &SwitchPrompt) -> bool {
        self.0
    }
}
