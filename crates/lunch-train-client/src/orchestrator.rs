//! Client-side lifecycle: every user action changes the local board first,
//! then calls the server, and puts the board back if the server says no.

use std::sync::Arc;

use chrono::FixedOffset;
use mockable::Clock;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use lunch_train_types::{CreateTrainInput, Participant, Train, TrainPatch, TrainStatus, VisibilityWindow};

use crate::board::Board;
use crate::error::ClientError;
use crate::identity::ClientContext;
use crate::optimistic::optimistic;
use crate::switch::{SwitchConfirmer, SwitchPrompt, decide_switch};
use crate::transport::{LeaveOutcome, TrainApi};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinResult {
    Joined,
    /// Left `from` and boarded the requested train.
    Switched { from: Uuid },
    /// Already seated on this train, nothing was sent.
    AlreadyAboard,
    /// The user said no to leaving their current train.
    Declined,
}

pub struct Orchestrator<A, C> {
    api: A,
    confirmer: C,
    context: ClientContext,
    board: watch::Sender<Board>,
    clock: Arc<dyn Clock + Send + Sync>,
    utc_offset: FixedOffset,
}

impl<A: TrainApi, C: SwitchConfirmer> Orchestrator<A, C> {
    pub fn new(
        api: A,
        confirmer: C,
        context: ClientContext,
        clock: Arc<dyn Clock + Send + Sync>,
        utc_offset: FixedOffset,
    ) -> Self {
        let (board, _) = watch::channel(Board::default());
        Self {
            api,
            confirmer,
            context,
            board,
            clock,
            utc_offset,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn context(&self) -> &ClientContext {
        &self.context
    }

    /// Follow board changes, including speculative ones.
    pub fn subscribe(&self) -> watch::Receiver<Board> {
        self.board.subscribe()
    }

    pub fn board(&self) -> Board {
        self.board.borrow().clone()
    }

    pub fn current_train(&self) -> Option<Train> {
        self.board.borrow().current_train(self.context.user_id()).cloned()
    }

    /// Replace the board with a fresh listing, filtered locally as well.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let trains = self.api.list_trains().await?;
        let window = VisibilityWindow::at(self.clock.utc(), self.utc_offset);
        let board = Board::from_listing(trains, &window);
        debug!("Board refreshed with {} trains", board.trains.len());
        self.board.send_replace(board);
        Ok(())
    }

    async fn reconcile(&self) {
        if let Err(e) = self.refresh().await {
            warn!("Refresh after change failed, keeping local board: {}", e);
        }
    }

    /// The server already took the change, so a failed save only loses the
    /// nickname default for next time.
    fn remember_nickname(&mut self, nickname: &str) {
        if let Err(e) = self.context.save_nickname(nickname) {
            warn!("Could not save nickname {}: {}", nickname, e);
        }
    }

    pub async fn create_train(&mut self, input: CreateTrainInput) -> Result<Train, ClientError> {
        let input = CreateTrainInput {
            departure_place: input.departure_place.trim().to_string(),
            destination: input.destination.trim().to_string(),
            nickname: input.nickname.trim().to_string(),
            ..input
        };
        if input.nickname.is_empty() {
            return Err(ClientError::Validation("Please enter your nickname"));
        }
        if input.departure_place.is_empty() || input.destination.is_empty() {
            return Err(ClientError::Validation("Please fill in where the train leaves from and where it goes"));
        }

        let user_id = self.context.user_id().to_string();
        let placeholder = Train {
            id: Uuid::new_v4(),
            created_by: user_id.clone(),
            created_at: self.clock.utc(),
            departure_place: input.departure_place.clone(),
            destination: input.destination.clone(),
            departure_time: input.departure_time,
            description: input.description.clone(),
            participants: vec![Participant::new(&user_id, &input.nickname)],
            status: TrainStatus::Active,
        };
        let placeholder_id = placeholder.id;

        let train = optimistic(
            &self.board,
            |b: &mut Board| b.insert(placeholder),
            self.api.create_train(&input, &user_id),
        )
        .await
        .into_result()?;

        self.board.send_modify(|b| b.replace(placeholder_id, train.clone()));
        self.remember_nickname(&input.nickname);
        info!("Created train {} to {}", train.id, train.destination);

        self.reconcile().await;
        Ok(train)
    }

    /// Board `train_id`, first leaving the current train if the confirmer
    /// agrees. Without a `nickname` the saved one is used.
    pub async fn join_train(&mut self, train_id: Uuid, nickname: Option<&str>) -> Result<JoinResult, ClientError> {
        let nickname = nickname
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .or(self.context.nickname())
            .map(str::to_string)
            .ok_or(ClientError::Validation("Please enter your nickname"))?;
        let user_id = self.context.user_id().to_string();

        let board = self.board();
        let target = board.train(train_id).ok_or(ClientError::NotFound(train_id))?;
        let current = board.current_train(&user_id);

        let decision = decide_switch(current, target);
        if !decision.proceed {
            return Ok(JoinResult::AlreadyAboard);
        }
        if let Some(from) = current.filter(|_| decision.requires_confirmation) {
            if !self.confirmer.confirm(&SwitchPrompt::new(from, target)) {
                debug!("Switch from {} to {} declined", from.id, train_id);
                return Ok(JoinResult::Declined);
            }
        }

        let seat = Participant::new(&user_id, &nickname);
        let result = match current.map(|t| t.id) {
            None => {
                optimistic(
                    &self.board,
                    |b: &mut Board| b.seat(train_id, seat),
                    self.api.join_train(train_id, &user_id, &nickname),
                )
                .await
                .into_result()?;
                JoinResult::Joined
            }
            Some(from) => {
                self.switch(from, train_id, &user_id, seat).await?;
                JoinResult::Switched { from }
            }
        };

        self.remember_nickname(&nickname);
        info!("Joined train {} as {}", train_id, nickname);

        self.reconcile().await;
        Ok(result)
    }

    /// Leave `from`, then join `to`. Any failure restores both trains on the
    /// board; a join failing after a successful leave is reported as
    /// [`ClientError::Stranded`].
    async fn switch(&self, from: Uuid, to: Uuid, user_id: &str, seat: Participant) -> Result<(), ClientError> {
        let nickname = seat.nickname.clone();
        let remote = async {
            match self.api.leave_train(from, user_id).await {
                Ok(_) => {}
                Err(e) if e.is_not_found() => debug!("Train {} was already gone", from),
                Err(e) => return Err(e),
            }
            self.api
                .join_train(to, user_id, &nickname)
                .await
                .map_err(|e| ClientError::Stranded {
                    from,
                    to,
                    source: Box::new(e),
                })
        };

        optimistic(
            &self.board,
            |b: &mut Board| {
                b.unseat(from, user_id);
                b.seat(to, seat);
            },
            remote,
        )
        .await
        .into_result()
    }

    /// Leave `train_id`. A train the server no longer has counts as left and
    /// the local removal stands.
    pub async fn leave_train(&self, train_id: Uuid) -> Result<LeaveOutcome, ClientError> {
        let user_id = self.context.user_id();
        let remote = async {
            match self.api.leave_train(train_id, user_id).await {
                Err(e) if e.is_not_found() => {
                    info!("Train {} was already gone, dropping it locally", train_id);
                    Ok(LeaveOutcome::TrainDeleted)
                }
                other => other,
            }
        };

        let outcome = optimistic(
            &self.board,
            |b: &mut Board| {
                b.unseat(train_id, user_id);
            },
            remote,
        )
        .await
        .into_result()?;

        self.reconcile().await;
        Ok(outcome)
    }

    /// Save a new nickname and rewrite it into every roster the user is on.
    ///
    /// A roster patch replaces the whole roster, so it is built from a listing
    /// fetched right before sending, not from the possibly stale board.
    pub async fn set_nickname(&mut self, nickname: &str) -> Result<(), ClientError> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(ClientError::Validation("Please enter your nickname"));
        }
        self.refresh().await?;
        self.context.save_nickname(nickname)?;

        let user_id = self.context.user_id();
        let rosters = self.board().rename(user_id, nickname);
        if rosters.is_empty() {
            return Ok(());
        }

        let remote = async {
            for (train_id, participants) in &rosters {
                self.api
                    .update_train(*train_id, &TrainPatch::participants(participants.clone()))
                    .await?;
            }
            Ok::<_, ClientError>(())
        };

        optimistic(
            &self.board,
            |b: &mut Board| {
                b.rename(user_id, nickname);
            },
            remote,
        )
        .await
        .into_result()?;
        info!("Nickname changed to {} in {} trains", nickname, rosters.len());

        self.reconcile().await;
        Ok(())
    }
}
