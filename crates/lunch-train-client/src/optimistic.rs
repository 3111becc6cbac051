//! Snapshot, speculate, call, then commit or restore.

use std::future::Future;

use tokio::sync::watch;

/// How an optimistic change ended. Both arms carry the state observers now see.
#[derive(Debug)]
pub enum Reconciled<S, T, E> {
    Committed { state: S, value: T },
    /// The remote call failed and the snapshot was put back verbatim.
    RolledBack { state: S, error: E },
}

impl<S, T, E> Reconciled<S, T, E> {
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Committed { value, .. } => Ok(value),
            Self::RolledBack { error, .. } => Err(error),
        }
    }
}

/// Apply `mutation` to the published state right away, run `remote`, and on
/// failure republish the exact pre-mutation snapshot.
///
/// Subscribers of `state` see the speculative value while `remote` is in
/// flight. Callers are expected to run one optimistic change at a time.
pub async fn optimistic<S, T, E, M, Fut>(state: &watch::Sender<S>, mutation: M, remote: Fut) -> Reconciled<S, T, E>
where
    S: Clone,
    M: FnOnce(&mut S),
    Fut: Future<Output = Result<T, E>>,
{
    let snapshot = state.borrow().clone();
    state.send_modify(mutation);

    match remote.await {
        Ok(value) => Reconciled::Committed {
            state: state.borrow().clone(),
            value,
        },
        Err(error) => {
            state.send_replace(snapshot.clone());
            Reconciled::RolledBack { state: snapshot, error }
        }
    }
}
