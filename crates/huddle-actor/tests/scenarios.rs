// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end conversation scenarios over the actor stack with mock
//! collaborators and a temp database.

use huddle_actor::actor::ActorCommand;
use huddle_actor::protocol::{ClientFrame, PresenceStatus, ServerFrame};
use huddle_config::HuddleConfig;
use huddle_core::types::{ConversationId, MessageId, MessageStatus, UserId};
use huddle_storage::queries::messages;
use huddle_test_utils::TestHarness;
use tokio::sync::oneshot;

fn conv(id: &str) -> ConversationId {
    ConversationId(id.to_string())
}

fn user(id: &str) -> UserId {
    UserId(id.to_string())
}

fn send_text(content: &str, client_id: &str) -> ClientFrame {
    ClientFrame::SendMessage {
        content: content.to_string(),
        kind: huddle_core::types::MessageKind::Text,
        media_url: None,
        media_type: None,
        media_size: None,
        client_id: client_id.to_string(),
    }
}

fn new_message_id_from(frames: &[ServerFrame]) -> MessageId {
    frames
        .iter()
        .find_map(|frame| match frame {
            ServerFrame::NewMessage { message } => Some(message.id.clone()),
            _ => None,
        })
        .expect("expected a new_message frame")
}

async fn run_agent(
    harness: &TestHarness,
    conversation: &ConversationId,
    goal: &str,
) -> huddle_actor::actor::AgentRunOutcome {
    let (reply, rx) = oneshot::channel();
    harness
        .manager
        .dispatch(
            conversation,
            ActorCommand::RunAgent {
                goal: goal.to_string(),
                user_id: user("alice"),
                reply,
            },
        )
        .await
        .unwrap();
    rx.await.unwrap().unwrap()
}

async fn fetch_history(
    harness: &TestHarness,
    conversation: &ConversationId,
    requester: &str,
    limit: Option<usize>,
    before: Option<MessageId>,
) -> huddle_actor::actor::HistoryPage {
    let (reply, rx) = oneshot::channel();
    harness
        .manager
        .dispatch(
            conversation,
            ActorCommand::GetHistory {
                user_id: user(requester),
                limit,
                before,
                reply,
            },
        )
        .await
        .unwrap();
    rx.await.unwrap().unwrap()
}

#[tokio::test]
async fn online_recipient_gets_message_and_sender_sees_delivered() {
    let harness = TestHarness::new().await.unwrap();
    let conversation = conv("conv-1");
    harness
        .profiles
        .seed_participants(&conversation, &["alice", "bob"])
        .await;

    let mut alice = harness.connect(&conversation, "alice", "c-alice").await;
    let mut bob = harness.connect(&conversation, "bob", "c-bob").await;
    harness.settle(&conversation).await.unwrap();
    alice.drain();
    bob.drain();

    harness
        .send_frame(&alice, send_text("hello bob", "cl-1"))
        .await
        .unwrap();
    harness.settle(&conversation).await.unwrap();

    let alice_frames = alice.drain();
    // Ack first, keyed by the client correlation ID, then the delivered
    // transition keyed by the server message ID.
    match &alice_frames[0] {
        ServerFrame::MessageStatus {
            client_id, status, ..
        } => {
            assert_eq!(client_id.as_deref(), Some("cl-1"));
            assert_eq!(*status, MessageStatus::Sent);
        }
        other => panic!("expected sent ack, got {other:?}"),
    }
    assert!(alice_frames.iter().any(|frame| matches!(
        frame,
        ServerFrame::MessageStatus {
            message_id: Some(_),
            status: MessageStatus::Delivered,
            ..
        }
    )));
    // The sender does not receive their own new_message.
    assert!(
        !alice_frames
            .iter()
            .any(|frame| matches!(frame, ServerFrame::NewMessage { .. }))
    );

    let bob_frames = bob.drain();
    let message_id = new_message_id_from(&bob_frames);
    let stored = messages::get_message(&harness.db, &message_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, MessageStatus::Delivered);
    assert_eq!(stored.content, "hello bob");

    // Everyone was online, so no push went out.
    assert!(harness.push.sent().await.is_empty());
}

#[tokio::test]
async fn offline_recipient_gets_push_then_retroactive_delivered_on_history() {
    let harness = TestHarness::new().await.unwrap();
    let conversation = conv("conv-1");
    harness
        .profiles
        .seed_participants(&conversation, &["alice", "bob"])
        .await;
    harness
        .profiles
        .seed_push_tokens(&user("bob"), &["bob-device-1"])
        .await;
    harness
        .profiles
        .seed_display_name(&user("alice"), "Alice Chen")
        .await;

    let mut alice = harness.connect(&conversation, "alice", "c-alice").await;
    harness.settle(&conversation).await.unwrap();
    alice.drain();

    harness
        .send_frame(&alice, send_text("are you there?", "cl-1"))
        .await
        .unwrap();
    harness.settle(&conversation).await.unwrap();

    // No live recipient: the message stays `sent` and bob got a loud push.
    let pushes = harness.push.sent().await;
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].tokens, vec!["bob-device-1".to_string()]);
    assert_eq!(pushes[0].title, "Alice Chen");
    assert_eq!(pushes[0].body, "are you there?");
    assert_eq!(pushes[0].data["type"], "new_message");
    assert!(!pushes[0].is_silent());

    let sent_frames = alice.drain();
    assert!(!sent_frames.iter().any(|frame| matches!(
        frame,
        ServerFrame::MessageStatus {
            status: MessageStatus::Delivered,
            ..
        }
    )));

    // Bob comes online and pages history: the message is upgraded to
    // delivered in the page, in storage, and alice is notified.
    let mut bob = harness.connect(&conversation, "bob", "c-bob").await;
    harness.settle(&conversation).await.unwrap();
    bob.drain();
    alice.drain();

    let page = fetch_history(&harness, &conversation, "bob", None, None).await;
    assert_eq!(page.messages.len(), 1);
    assert_eq!(page.messages[0].status, MessageStatus::Delivered);
    assert!(!page.has_more);

    let stored = messages::get_message(&harness.db, &page.messages[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, MessageStatus::Delivered);

    assert!(alice.drain().iter().any(|frame| matches!(
        frame,
        ServerFrame::MessageStatus {
            status: MessageStatus::Delivered,
            ..
        }
    )));
}

#[tokio::test]
async fn mark_read_is_idempotent_and_never_regresses() {
    let harness = TestHarness::new().await.unwrap();
    let conversation = conv("conv-1");
    harness
        .profiles
        .seed_participants(&conversation, &["alice", "bob"])
        .await;

    let mut alice = harness.connect(&conversation, "alice", "c-alice").await;
    let mut bob = harness.connect(&conversation, "bob", "c-bob").await;
    harness.settle(&conversation).await.unwrap();

    harness
        .send_frame(&alice, send_text("read me", "cl-1"))
        .await
        .unwrap();
    harness.settle(&conversation).await.unwrap();
    let message_id = new_message_id_from(&bob.drain());
    alice.drain();

    let mark_read = ClientFrame::MarkRead {
        message_id: message_id.clone(),
        user_id: user("bob"),
    };
    harness.send_frame(&bob, mark_read.clone()).await.unwrap();
    harness.settle(&conversation).await.unwrap();

    let stored = messages::get_message(&harness.db, &message_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, MessageStatus::Read);
    assert!(alice.drain().iter().any(|frame| matches!(
        frame,
        ServerFrame::MessageRead { .. }
    )));

    // Second mark-read: still read, still one receipt per (message, user).
    harness.send_frame(&bob, mark_read).await.unwrap();
    harness.settle(&conversation).await.unwrap();
    let stored = messages::get_message(&harness.db, &message_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, MessageStatus::Read);

    let receipts =
        huddle_storage::queries::receipts::get_receipts_for_message(&harness.db, &message_id)
            .await
            .unwrap();
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].user_id, user("bob"));

    // A later history pass must not downgrade the read status.
    let page = fetch_history(&harness, &conversation, "bob", None, None).await;
    assert_eq!(page.messages[0].status, MessageStatus::Read);

    // No push: alice is online, so the read receipt needs no escalation.
    assert!(harness.push.sent().await.is_empty());
}

#[tokio::test]
async fn read_receipt_escalates_silently_when_sender_offline() {
    let harness = TestHarness::new().await.unwrap();
    let conversation = conv("conv-1");
    harness
        .profiles
        .seed_participants(&conversation, &["alice", "bob"])
        .await;
    harness
        .profiles
        .seed_push_tokens(&user("alice"), &["alice-device-1"])
        .await;
    harness
        .profiles
        .seed_push_tokens(&user("bob"), &["bob-device-1"])
        .await;

    let alice = harness.connect(&conversation, "alice", "c-alice").await;
    harness
        .send_frame(&alice, send_text("going offline now", "cl-1"))
        .await
        .unwrap();
    harness.settle(&conversation).await.unwrap();
    harness.disconnect(&alice).await;

    let mut bob = harness.connect(&conversation, "bob", "c-bob").await;
    harness.settle(&conversation).await.unwrap();
    bob.drain();
    let page = fetch_history(&harness, &conversation, "bob", None, None).await;
    let message_id = page.messages[0].id.clone();

    harness
        .send_frame(
            &bob,
            ClientFrame::MarkRead {
                message_id,
                user_id: user("bob"),
            },
        )
        .await
        .unwrap();
    harness.settle(&conversation).await.unwrap();

    let pushes = harness.push.sent().await;
    // First push: loud new_message to offline bob. Last push: silent
    // read_receipt to the now-offline sender.
    let receipt_push = pushes.last().unwrap();
    assert!(receipt_push.is_silent());
    assert_eq!(receipt_push.data["type"], "read_receipt");
    assert_eq!(receipt_push.data["readerId"], "bob");
    assert_eq!(receipt_push.tokens, vec!["alice-device-1".to_string()]);
}

#[tokio::test]
async fn history_pages_oldest_first_with_cursor() {
    let harness = TestHarness::new().await.unwrap();
    let conversation = conv("conv-1");
    harness
        .profiles
        .seed_participants(&conversation, &["alice"])
        .await;

    let alice = harness.connect(&conversation, "alice", "c-alice").await;
    for i in 1..=5 {
        harness
            .send_frame(&alice, send_text(&format!("msg {i}"), &format!("cl-{i}")))
            .await
            .unwrap();
    }
    harness.settle(&conversation).await.unwrap();

    let newest = fetch_history(&harness, &conversation, "alice", Some(2), None).await;
    assert_eq!(newest.messages.len(), 2);
    assert!(newest.has_more);
    assert_eq!(newest.messages[0].content, "msg 4");
    assert_eq!(newest.messages[1].content, "msg 5");

    let earlier = fetch_history(
        &harness,
        &conversation,
        "alice",
        Some(2),
        Some(newest.messages[0].id.clone()),
    )
    .await;
    assert_eq!(earlier.messages[0].content, "msg 2");
    assert_eq!(earlier.messages[1].content, "msg 3");
    assert!(earlier.has_more);

    // An unknown cursor falls back to the newest page.
    let fallback = fetch_history(
        &harness,
        &conversation,
        "alice",
        Some(5),
        Some(MessageId("not-a-real-id".into())),
    )
    .await;
    assert_eq!(fallback.messages.len(), 5);
    assert!(!fallback.has_more);
    assert_eq!(fallback.messages[0].content, "msg 1");
}

#[tokio::test]
async fn eviction_is_invisible_after_reconnection_replay() {
    let harness = TestHarness::new().await.unwrap();
    let conversation = conv("conv-1");
    harness
        .profiles
        .seed_participants(&conversation, &["alice", "bob"])
        .await;

    let mut alice = harness.connect(&conversation, "alice", "c-alice").await;
    let mut bob = harness.connect(&conversation, "bob", "c-bob").await;
    harness
        .send_frame(&alice, send_text("before eviction", "cl-1"))
        .await
        .unwrap();
    harness.settle(&conversation).await.unwrap();
    alice.drain();
    bob.drain();

    harness.manager.evict(&conversation);

    // The next command respawns the actor; retained attachments rebuild the
    // registry before it runs.
    let online = harness.manager.list_online(&conversation).await.unwrap();
    assert_eq!(online, vec![user("alice"), user("bob")]);

    harness
        .send_frame(&alice, send_text("after eviction", "cl-2"))
        .await
        .unwrap();
    harness.settle(&conversation).await.unwrap();

    let bob_frames = bob.drain();
    assert!(bob_frames.iter().any(|frame| matches!(
        frame,
        ServerFrame::NewMessage { message } if message.content == "after eviction"
    )));
    // Replay re-announced presence; the history itself is untouched.
    let page = fetch_history(&harness, &conversation, "bob", None, None).await;
    assert_eq!(page.messages.len(), 2);
    assert_eq!(page.messages[0].content, "before eviction");
}

#[tokio::test]
async fn typing_indicator_skips_the_originating_connection() {
    let harness = TestHarness::new().await.unwrap();
    let conversation = conv("conv-1");
    let mut alice = harness.connect(&conversation, "alice", "c-alice").await;
    let mut bob = harness.connect(&conversation, "bob", "c-bob").await;
    harness.settle(&conversation).await.unwrap();
    alice.drain();
    bob.drain();

    harness
        .send_frame(&alice, ClientFrame::Typing { is_typing: true })
        .await
        .unwrap();
    harness.settle(&conversation).await.unwrap();

    assert!(bob.drain().iter().any(|frame| matches!(
        frame,
        ServerFrame::Typing {
            user_id,
            is_typing: true
        } if *user_id == user("alice")
    )));
    assert!(alice.drain().is_empty());
}

#[tokio::test]
async fn presence_offline_only_when_last_handle_leaves() {
    let harness = TestHarness::new().await.unwrap();
    let conversation = conv("conv-1");
    let alice_phone = harness.connect(&conversation, "alice", "c-phone").await;
    let alice_laptop = harness.connect(&conversation, "alice", "c-laptop").await;
    let mut bob = harness.connect(&conversation, "bob", "c-bob").await;
    harness.settle(&conversation).await.unwrap();
    bob.drain();

    harness.disconnect(&alice_phone).await;
    harness.settle(&conversation).await.unwrap();
    assert!(bob.drain().is_empty());

    harness.disconnect(&alice_laptop).await;
    harness.settle(&conversation).await.unwrap();
    assert!(bob.drain().iter().any(|frame| matches!(
        frame,
        ServerFrame::PresenceUpdate {
            user_id,
            status: PresenceStatus::Offline,
        } if *user_id == user("alice")
    )));
}

#[tokio::test]
async fn agent_workflow_runs_to_completion_and_posts_the_plan() {
    let harness = TestHarness::builder()
        .with_ai_responses(vec![
            r#"{"eventType":"team dinner","needsVenue":true,"eventDate":"2026-09-04","eventTime":"19:00"}"#.into(),
            r#"{"summary":"Everyone is free Friday evening"}"#.into(),
            r#"{"cuisine":"italian","location":"downtown","budget":"$$","dietary":["vegetarian"]}"#.into(),
            r#"[{"name":"Trattoria Nord","description":"Quiet Italian spot","matchScore":0.9},{"name":"Pasta Bar","description":"Casual","matchScore":0.7}]"#.into(),
        ])
        .build()
        .await
        .unwrap();
    let conversation = conv("conv-1");
    harness
        .profiles
        .seed_participants(&conversation, &["alice", "bob"])
        .await;
    let mut bob = harness.connect(&conversation, "bob", "c-bob").await;
    harness.settle(&conversation).await.unwrap();
    bob.drain();

    let goal = "plan a team dinner";
    use huddle_planner::state::WorkflowStep;

    let outcome = run_agent(&harness, &conversation, goal).await;
    assert_eq!(outcome.step, WorkflowStep::Availability);
    assert!(!outcome.completed);

    let outcome = run_agent(&harness, &conversation, goal).await;
    assert_eq!(outcome.step, WorkflowStep::Preferences);

    let outcome = run_agent(&harness, &conversation, goal).await;
    assert_eq!(outcome.step, WorkflowStep::Venues);

    let outcome = run_agent(&harness, &conversation, goal).await;
    assert_eq!(outcome.step, WorkflowStep::Confirm);

    let outcome = run_agent(&harness, &conversation, goal).await;
    assert_eq!(outcome.step, WorkflowStep::Complete);
    assert!(outcome.completed);
    let plan = outcome.final_plan.expect("completed run carries the plan");
    assert_eq!(plan.event_type, "team dinner");
    assert_eq!(plan.venue, "Trattoria Nord");

    // The plan arrived in the conversation as an ordinary message from the
    // agent identity, upgraded to delivered because bob was online.
    let plan_frames = bob.drain();
    let plan_message = plan_frames
        .iter()
        .find_map(|frame| match frame {
            ServerFrame::NewMessage { message }
                if message.sender_id == user(huddle_actor::actor::AGENT_USER_ID) =>
            {
                Some(message.clone())
            }
            _ => None,
        })
        .expect("expected the broadcast plan message");
    assert!(plan_message.content.contains("Trattoria Nord"));

    let stored = messages::get_message(&harness.db, &plan_message.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, MessageStatus::Delivered);
}

#[tokio::test]
async fn agent_step_failing_twice_marks_the_workflow_failed() {
    let harness = TestHarness::builder()
        .with_ai_responses(vec!["ERROR".into(), "ERROR".into()])
        .build()
        .await
        .unwrap();
    let conversation = conv("conv-1");
    harness
        .profiles
        .seed_participants(&conversation, &["alice"])
        .await;

    let outcome = run_agent(&harness, &conversation, "plan a retro").await;
    assert!(outcome.failed);
    assert_eq!(outcome.step, huddle_planner::state::WorkflowStep::Failed);
    assert!(outcome.error.is_some());
}

#[tokio::test]
async fn first_send_after_eviction_reaches_live_recipients() {
    let harness = TestHarness::new().await.unwrap();
    let conversation = conv("conv-1");
    harness
        .profiles
        .seed_participants(&conversation, &["alice", "bob"])
        .await;
    harness
        .profiles
        .seed_push_tokens(&user("bob"), &["bob-device-1"])
        .await;

    let mut alice = harness.connect(&conversation, "alice", "c-alice").await;
    let mut bob = harness.connect(&conversation, "bob", "c-bob").await;
    harness.settle(&conversation).await.unwrap();
    alice.drain();
    bob.drain();

    harness.manager.evict(&conversation);

    // No barrier in between: the very first command after the eviction must
    // already see the rebuilt registry.
    harness
        .send_frame(&alice, send_text("straight after eviction", "cl-1"))
        .await
        .unwrap();
    harness.settle(&conversation).await.unwrap();

    assert!(bob.drain().iter().any(|frame| matches!(
        frame,
        ServerFrame::NewMessage { message } if message.content == "straight after eviction"
    )));
    assert!(alice.drain().iter().any(|frame| matches!(
        frame,
        ServerFrame::MessageStatus { status, .. } if *status == MessageStatus::Delivered
    )));
    // Bob was online throughout; a half-rebuilt registry would have pushed.
    assert!(harness.push.sent().await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn accepted_sends_survive_constant_idle_eviction() {
    let mut config = HuddleConfig::default();
    config.actor.idle_evict_secs = 0;
    let harness = TestHarness::builder()
        .with_config(config)
        .build()
        .await
        .unwrap();
    let conversation = conv("conv-1");
    harness
        .profiles
        .seed_participants(&conversation, &["alice", "bob"])
        .await;
    let alice = harness.connect(&conversation, "alice", "c-alice").await;

    // With a zero idle budget the actor evicts whenever its mailbox is
    // momentarily empty, so sends land right on the eviction boundary. A
    // send that was accepted must never be lost, drained or not.
    for i in 0..25 {
        let frame = send_text(&format!("msg {i}"), &format!("cl-{i}"));
        let mut accepted = false;
        for _ in 0..100 {
            if harness.send_frame(&alice, frame.clone()).await.is_ok() {
                accepted = true;
                break;
            }
        }
        assert!(accepted, "send {i} never accepted");
    }

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        let page = messages::get_page(&harness.db, &conversation, 100, None)
            .await
            .unwrap();
        if page.len() == 25 {
            break;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "only {} of 25 accepted sends were applied",
            page.len()
        );
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn mark_read_for_another_user_is_rejected() {
    let harness = TestHarness::new().await.unwrap();
    let conversation = conv("conv-1");
    harness
        .profiles
        .seed_participants(&conversation, &["alice", "bob"])
        .await;

    let mut alice = harness.connect(&conversation, "alice", "c-alice").await;
    let mut bob = harness.connect(&conversation, "bob", "c-bob").await;
    harness.settle(&conversation).await.unwrap();

    harness
        .send_frame(&alice, send_text("only bob may read this", "cl-1"))
        .await
        .unwrap();
    harness.settle(&conversation).await.unwrap();
    let message_id = new_message_id_from(&bob.drain());
    alice.drain();

    // Bob's connection tries to mark the message read on alice's behalf.
    let forged = ClientFrame::MarkRead {
        message_id: message_id.clone(),
        user_id: user("alice"),
    };
    harness.send_frame(&bob, forged).await.unwrap();
    harness.settle(&conversation).await.unwrap();

    assert!(bob.drain().iter().any(|frame| matches!(
        frame,
        ServerFrame::Error { code, .. }
            if code == huddle_actor::protocol::error_codes::MALFORMED_FRAME
    )));
    // Neither the status nor the receipt table moved.
    let stored = messages::get_message(&harness.db, &message_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, MessageStatus::Delivered);
    let receipts =
        huddle_storage::queries::receipts::get_receipts_for_message(&harness.db, &message_id)
            .await
            .unwrap();
    assert!(receipts.is_empty());
}
