use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, TimeDelta, TimeZone, Utc};
use uuid::Uuid;

use lunch_train_api::{AppStateInner, TrainService};
use lunch_train_client::{
    AutoConfirm, ClientContext, ClientError, HttpTrainApi, IdentityStore, JoinResult, LeaveOutcome, Orchestrator,
    TrainApi,
};
use lunch_train_db::Database;
use lunch_train_types::CreateTrainInput;
use mockable::MockClock;

fn clock() -> Arc<MockClock> {
    let mut clock = MockClock::new();
    clock.expect_utc().return_const(noon());
    Arc::new(clock)
}

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
}

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

/// Serve the real router over an in-memory store on an ephemeral port.
async fn spawn_server() -> String {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let trains = TrainService::new(db, clock(), utc());
    let app = lunch_train_api::router(Arc::new(AppStateInner { trains }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn http(base_url: &str) -> HttpTrainApi {
    HttpTrainApi::new(base_url, Duration::from_secs(5)).unwrap()
}

async fn client(base_url: &str) -> Orchestrator<HttpTrainApi, AutoConfirm> {
    let path = std::env::temp_dir()
        .join(format!("lunch_train_e2e_{}", Uuid::new_v4()))
        .join("identity.json");
    let context = ClientContext::load(IdentityStore::new(path)).unwrap();
    let orch = Orchestrator::new(http(base_url), AutoConfirm(true), context, clock(), utc());
    orch.refresh().await.unwrap();
    orch
}

fn lunch(destination: &str, minutes: i64, nickname: &str) -> CreateTrainInput {
    CreateTrainInput {
        departure_place: "Lobby".into(),
        destination: destination.into(),
        departure_time: noon() + TimeDelta::minutes(minutes),
        description: None,
        nickname: nickname.into(),
    }
}

#[tokio::test]
async fn two_users_share_a_train_until_the_last_one_leaves() {
    let base = spawn_server().await;
    let mut ada = client(&base).await;
    let mut grace = client(&base).await;

    let train = ada.create_train(lunch("Dylan Luft", 30, "Ada")).await.unwrap();
    assert_eq!(train.creator_nickname(), Some("Ada"));

    grace.refresh().await.unwrap();
    assert_eq!(grace.board().trains.len(), 1);
    assert_eq!(grace.join_train(train.id, Some("Grace")).await.unwrap(), JoinResult::Joined);

    ada.refresh().await.unwrap();
    let names: Vec<_> = ada.board().trains[0]
        .participants
        .iter()
        .map(|p| p.nickname.clone())
        .collect();
    assert_eq!(names, vec!["Ada", "Grace"]);

    assert_eq!(ada.leave_train(train.id).await.unwrap(), LeaveOutcome::Left);
    assert_eq!(grace.leave_train(train.id).await.unwrap(), LeaveOutcome::TrainDeleted);

    assert!(http(&base).list_trains().await.unwrap().is_empty());
    ada.refresh().await.unwrap();
    assert!(ada.board().trains.is_empty());
}

#[tokio::test]
async fn switching_trains_over_http() {
    let base = spawn_server().await;
    let mut ada = client(&base).await;
    let mut grace = client(&base).await;

    let first = ada.create_train(lunch("Akseli", 20, "Ada")).await.unwrap();
    let second = ada.create_train(lunch("Piccolo", 40, "Ada")).await.unwrap();

    grace.refresh().await.unwrap();
    grace.join_train(first.id, Some("Grace")).await.unwrap();
    let result = grace.join_train(second.id, None).await.unwrap();
    assert_eq!(result, JoinResult::Switched { from: first.id });

    let trains = http(&base).list_trains().await.unwrap();
    let me = grace.context().user_id().to_string();
    let on = |id: Uuid| trains.iter().find(|t| t.id == id).unwrap().has_participant(&me);
    assert!(!on(first.id));
    assert!(on(second.id));
}

#[tokio::test]
async fn unknown_train_is_not_found() {
    let base = spawn_server().await;
    let api = http(&base);
    let missing = Uuid::new_v4();

    let err = api.join_train(missing, "u1", "Ada").await.unwrap_err();
    assert!(err.is_not_found());

    let err = api.leave_train(missing, "u1").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn server_validation_message_reaches_the_client() {
    let base = spawn_server().await;
    let api = http(&base);

    let err = api.create_train(&lunch("Piccolo", 30, "Ada"), "  ").await.unwrap_err();
    match err {
        ClientError::Status { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Missing required fields");
        }
        other => panic!("expected a 400, got {other:?}"),
    }
}

#[tokio::test]
async fn nickname_change_is_visible_to_others() {
    let base = spawn_server().await;
    let mut ada = client(&base).await;
    let mut grace = client(&base).await;

    let train = ada.create_train(lunch("Dylan Luft", 30, "Ada")).await.unwrap();
    grace.refresh().await.unwrap();
    grace.join_train(train.id, Some("Grace")).await.unwrap();

    grace.set_nickname("Amazing Grace").await.unwrap();

    ada.refresh().await.unwrap();
    let roster = &ada.board().trains[0].participants;
    assert_eq!(roster[1].nickname, "Amazing Grace");
    assert_eq!(roster.len(), 2);
}

#[tokio::test]
async fn nickname_change_keeps_riders_who_joined_after_last_refresh() {
    let base = spawn_server().await;
    let mut ada = client(&base).await;
    let mut grace = client(&base).await;

    let train = ada.create_train(lunch("Dylan Luft", 30, "Ada")).await.unwrap();
    grace.refresh().await.unwrap();
    grace.join_train(train.id, Some("Grace")).await.unwrap();

    // Bob boards from another client; Grace's board does not show him yet.
    http(&base).join_train(train.id, "u-bob", "Bob").await.unwrap();
    assert_eq!(grace.board().trains[0].participants.len(), 2);

    grace.set_nickname("Amazing Grace").await.unwrap();

    let trains = http(&base).list_trains().await.unwrap();
    let names: Vec<_> = trains[0].participants.iter().map(|p| p.nickname.clone()).collect();
    assert_eq!(names, vec!["Ada", "Amazing Grace", "Bob"]);
}
