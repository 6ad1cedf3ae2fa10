//! End-to-end settlement scenarios
//!
//! Every scenario runs messages through the block executor against a
//! genesis state, the way a validator replays a block.

mod common;

use common::*;
use content_settlement::{config::EngagementConfig, Handler, Msg};
use ledger_core::{AccountKey, Coin, ErrorCode, FundingPool, PostKey};

/// bob and carol own posts; alice and dave consume
fn world() -> (content_settlement::BlockExecutor, ledger_core::LedgerState) {
    let mut state = genesis(&[
        ("alice", "1000"),
        ("bob", "0"),
        ("carol", "0"),
        ("dave", "50"),
    ]);
    let executor = executor();
    deliver_ok(&executor, &mut state, 1, create_post_with_rate("bob", "p1", "0.7"));
    deliver_ok(&executor, &mut state, 1, repost("carol", "p2", ("bob", "p1"), None));
    (executor, state)
}

#[test]
fn test_simple_donation() {
    let (executor, mut state) = world();

    deliver_ok(&executor, &mut state, 2, donate("alice", "100", "bob", "p1"));

    assert_eq!(saving(&state, "alice"), tokens("900"));
    assert_eq!(saving(&state, "bob"), tokens("99"));
    assert_eq!(state.global().friction_pool, tokens("1"));
    assert_eq!(state.global().consumption_window, tokens("100"));

    let events: Vec<_> = state.reward_events().collect();
    assert_eq!(events.len(), 1);
    let event = &events[0].event;
    assert_eq!(event.post_author, AccountKey::new("bob"));
    assert_eq!(event.post_id, "p1");
    assert_eq!(event.consumer, AccountKey::new("alice"));
    assert_eq!(event.original, tokens("100"));
    assert_eq!(event.friction, tokens("1"));
    assert_eq!(event.evaluate, tokens("100"));

    let post = state.post(&PostKey::new("bob", "p1")).unwrap();
    let record = post.donations[&AccountKey::new("alice")];
    assert_eq!(record.times, 1);
    assert_eq!(record.amount, tokens("99"));
    assert_eq!(post.total_donation, tokens("99"));

    let metrics = executor.metrics().unwrap();
    assert_eq!(metrics.donation_legs_total.get(), 1);
    assert_eq!(metrics.friction_coin_total.get(), tokens("1").value());
}

#[test]
fn test_repost_split() {
    let (executor, mut state) = world();

    deliver_ok(&executor, &mut state, 2, donate("alice", "100", "carol", "p2"));

    // 30 to the source, 70 kept by the repost, 1% friction on each leg
    assert_eq!(saving(&state, "alice"), tokens("900"));
    assert_eq!(saving(&state, "bob"), tokens("29.7"));
    assert_eq!(saving(&state, "carol"), tokens("69.3"));
    assert_eq!(state.global().friction_pool, tokens("1"));

    let events: Vec<_> = state
        .reward_events()
        .map(|e| (e.event.post_author.to_string(), e.event.original, e.event.friction))
        .collect();
    assert_eq!(
        events,
        vec![
            ("bob".to_string(), tokens("30"), tokens("0.3")),
            ("carol".to_string(), tokens("70"), tokens("0.7")),
        ]
    );
}

#[test]
fn test_insufficient_funds() {
    let (executor, mut state) = world();
    let root = state.state_root().unwrap();

    let outcome = executor.deliver(&mut state, block(2), &donate("dave", "100", "bob", "p1"));

    assert_eq!(outcome.code, ErrorCode::InsufficientFunds);
    let available = format!("available {}", tokens("50"));
    assert!(outcome.log.contains(&available), "{}", outcome.log);
    assert_eq!(state.state_root().unwrap(), root);
    assert_eq!(saving(&state, "dave"), tokens("50"));
}

#[test]
fn test_checking_pool_donation() {
    let mut state = genesis(&[("bob", "0")]);
    let executor = executor();
    let mut ctx = state.begin(block(0));
    ledger_core::AccountLedger::create_account(
        &ledger_core::AccountManager,
        &mut ctx,
        &AccountKey::new("erin"),
        Coin::ZERO,
        tokens("10"),
    )
    .unwrap();
    let ws = ctx.into_write_set();
    state.apply(ws);
    deliver_ok(&executor, &mut state, 1, create_post("bob", "p1"));

    let outcome = executor.deliver(&mut state, block(2), &donate("erin", "10", "bob", "p1"));
    assert_eq!(outcome.code, ErrorCode::InsufficientFunds);

    deliver_ok(
        &executor,
        &mut state,
        2,
        donate_from("erin", "10", "bob", "p1", FundingPool::Checking),
    );
    let erin = state.account(&AccountKey::new("erin")).unwrap();
    assert_eq!(erin.checking, Coin::ZERO);
    assert_eq!(saving(&state, "bob"), tokens("9.9"));
}

#[test]
fn test_zero_source_leg_is_skipped() {
    let mut state = genesis(&[("alice", "10"), ("bob", "0"), ("carol", "0")]);
    let executor = executor();
    deliver_ok(&executor, &mut state, 1, create_post_with_rate("bob", "p1", "1"));
    deliver_ok(&executor, &mut state, 1, repost("carol", "p2", ("bob", "p1"), None));

    deliver_ok(&executor, &mut state, 2, donate("alice", "10", "carol", "p2"));

    assert_eq!(saving(&state, "bob"), Coin::ZERO);
    assert!(state
        .post(&PostKey::new("bob", "p1"))
        .unwrap()
        .donations
        .is_empty());
    assert_eq!(saving(&state, "carol"), tokens("9.9"));
    assert_eq!(state.reward_event_count(), 1);
    assert_eq!(executor.metrics().unwrap().zero_legs_total.get(), 1);
}

#[test]
fn test_only_one_hop_is_resolved() {
    let mut state = genesis(&[("alice", "100"), ("ann", "0"), ("bob", "0"), ("carol", "0")]);
    let executor = executor();
    deliver_ok(&executor, &mut state, 1, create_post_with_rate("ann", "p0", "0.5"));
    deliver_ok(&executor, &mut state, 1, repost("bob", "p1", ("ann", "p0"), Some("0.5")));
    deliver_ok(&executor, &mut state, 1, repost("carol", "p2", ("bob", "p1"), None));

    deliver_ok(&executor, &mut state, 2, donate("alice", "10", "carol", "p2"));

    assert_eq!(saving(&state, "ann"), Coin::ZERO);
    assert_eq!(saving(&state, "bob"), tokens("4.95"));
    assert_eq!(saving(&state, "carol"), tokens("4.95"));
}

#[test]
fn test_missing_author_aborts_donation() {
    let mut state = genesis(&[("alice", "100"), ("bob", "0")]);
    let executor = executor();
    deliver_ok(&executor, &mut state, 1, create_post("bob", "p1"));

    // Author account disappears from the state view the handler sees
    let mut stale = genesis(&[("alice", "100")]);
    let mut ctx = stale.begin(block(1));
    ctx.put_post(state.post(&PostKey::new("bob", "p1")).unwrap().clone());
    let ws = ctx.into_write_set();
    stale.apply(ws);
    let root = stale.state_root().unwrap();

    let outcome = executor.deliver(&mut stale, block(2), &donate("alice", "10", "bob", "p1"));
    assert_eq!(outcome.code, ErrorCode::AuthorNotFound);
    assert_eq!(stale.state_root().unwrap(), root);
}

#[test]
fn test_view_is_idempotent() {
    let (executor, mut state) = world();

    deliver_ok(&executor, &mut state, 2, view("alice", "bob", "p1"));
    deliver_ok(&executor, &mut state, 3, view("alice", "bob", "p1"));
    let post = state.post(&PostKey::new("bob", "p1")).unwrap();
    assert_eq!(post.viewer_count(), 1);
    assert_eq!(post.views[&AccountKey::new("alice")].last_height, 3);

    // A view of the repost counts on the source
    deliver_ok(&executor, &mut state, 4, view("dave", "carol", "p2"));
    assert_eq!(state.post(&PostKey::new("bob", "p1")).unwrap().viewer_count(), 2);
    assert_eq!(state.post(&PostKey::new("carol", "p2")).unwrap().viewer_count(), 0);
}

#[test]
fn test_like_last_write_wins() {
    let (executor, mut state) = world();

    deliver_ok(&executor, &mut state, 2, like("alice", 500, "bob", "p1"));
    deliver_ok(&executor, &mut state, 3, like("dave", 200, "bob", "p1"));
    deliver_ok(&executor, &mut state, 4, like("alice", -300, "carol", "p2"));

    let post = state.post(&PostKey::new("bob", "p1")).unwrap();
    assert_eq!(post.total_like_weight, -100);
    assert_eq!(post.likes.len(), 2);
}

#[test]
fn test_stake_captured_at_call_time() {
    let (executor, mut state) = world();
    let key = PostKey::new("bob", "p1");

    deliver_ok(&executor, &mut state, 2, report_or_upvote("alice", "bob", "p1", false, false));
    assert_eq!(state.post(&key).unwrap().total_upvote_stake, tokens("1000"));

    deliver_ok(&executor, &mut state, 3, donate("alice", "100", "bob", "p1"));
    assert_eq!(state.post(&key).unwrap().total_upvote_stake, tokens("1000"));

    deliver_ok(&executor, &mut state, 4, report_or_upvote("dave", "bob", "p1", true, false));
    assert_eq!(state.post(&key).unwrap().total_report_stake, tokens("50"));

    let outcome = executor.deliver(
        &mut state,
        block(5),
        &report_or_upvote("alice", "bob", "p1", false, false),
    );
    assert_eq!(outcome.code, ErrorCode::ReportOrUpvoteAlreadyExists);

    deliver_ok(&executor, &mut state, 6, report_or_upvote("alice", "bob", "p1", false, true));
    let post = state.post(&key).unwrap();
    assert_eq!(post.total_upvote_stake, Coin::ZERO);
    assert_eq!(post.total_report_stake, tokens("50"));
}

#[test]
fn test_revoke_can_be_disabled() {
    let (_, mut state) = world();
    let executor = executor_with(Handler::with_reference_managers(EngagementConfig {
        allow_report_revoke: false,
    }));
    deliver_ok(&executor, &mut state, 2, report_or_upvote("dave", "bob", "p1", true, false));
    let root = state.state_root().unwrap();

    let outcome = executor.deliver(
        &mut state,
        block(3),
        &report_or_upvote("dave", "bob", "p1", true, true),
    );
    assert_eq!(outcome.code, ErrorCode::RevokeNotSupported);
    assert_eq!(state.state_root().unwrap(), root);
}

#[test]
fn test_unrecognized_message() {
    let (executor, mut state) = world();
    let root = state.state_root().unwrap();

    let msg = Msg::from_json(r#"{"type":"validator_deposit","value":{"username":"alice"}}"#).unwrap();
    let outcome = executor.deliver(&mut state, block(2), &msg);

    assert_eq!(outcome.code, ErrorCode::UnrecognizedMessage);
    assert!(outcome.log.contains("validator_deposit"));
    assert_eq!(state.state_root().unwrap(), root);

    // The executor keeps going after a rejected message
    deliver_ok(&executor, &mut state, 2, view("alice", "bob", "p1"));
}

#[test]
fn test_invalid_amounts() {
    let (executor, mut state) = world();
    for amount in ["0", "-5", "abc", "1.000001", "", "1_000", "+5", ".5", "1e2"] {
        let outcome = executor.deliver(&mut state, block(2), &donate("alice", amount, "bob", "p1"));
        assert_eq!(outcome.code, ErrorCode::InvalidAmount, "amount {:?}", amount);
    }
}

#[test]
fn test_comment_tree() {
    let (executor, mut state) = world();
    let Msg::CreatePost(mut comment) = create_post("alice", "c1") else {
        unreachable!()
    };
    comment.parent = Some(PostKey::new("bob", "p1"));
    deliver_ok(&executor, &mut state, 2, Msg::CreatePost(comment.clone()));

    let parent = state.post(&PostKey::new("bob", "p1")).unwrap();
    assert!(parent.comments.contains(&PostKey::new("alice", "c1")));

    comment.post_id = "c2".to_string();
    comment.parent = Some(PostKey::new("bob", "missing"));
    let outcome = executor.deliver(&mut state, block(3), &Msg::CreatePost(comment));
    assert_eq!(outcome.code, ErrorCode::InvalidParent);
}
