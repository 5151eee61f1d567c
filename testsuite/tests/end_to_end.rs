//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Client and server talking over real sockets

use bulletin_client::{ClientError, Notification, PostSummary};
use bulletin_testsuite::{QUIET_WAIT, TestBoard};

fn post(id: u64, sender: &str, date: &str, subject: &str) -> PostSummary {
    PostSummary {
        id,
        sender: sender.to_string(),
        date: date.to_string(),
        subject: subject.to_string(),
    }
}

#[tokio::test]
async fn test_join_post_and_read_back() {
    let board = TestBoard::start().await.unwrap();
    let mut bob = board.joined("bob").await.unwrap();
    let mut alice = board.client().await.unwrap();

    let reply = alice.join("alice").await.unwrap();
    assert_eq!(reply, "alice has joined the bulletin board.\nMembers: bob, alice");
    assert_eq!(
        bob.next_notification().await.unwrap(),
        Notification::Join {
            user: "alice".to_string()
        }
    );

    let reply = alice.post("2024-10-28", "Hello", "First post").await.unwrap();
    assert_eq!(reply, "Message posted with ID 1.");
    assert_eq!(
        bob.next_notification().await.unwrap(),
        Notification::Post(post(1, "alice", "2024-10-28", "Hello"))
    );
    assert_eq!(
        alice.try_next_notification(QUIET_WAIT).await.unwrap(),
        None
    );

    assert_eq!(
        bob.request("message", &["1"]).await.unwrap(),
        "1,alice,2024-10-28,Hello"
    );
    assert_eq!(
        bob.request("message", &["7"]).await.unwrap(),
        "Error: message 7 not found on the public board"
    );
    assert_eq!(bob.request::<&str>("users", &[]).await.unwrap(), "bob\nalice");

    board.stop().await.unwrap();
}

#[tokio::test]
async fn test_late_joiner_sees_recent_posts() {
    let board = TestBoard::start().await.unwrap();
    let mut alice = board.joined("alice").await.unwrap();
    for subject in ["one", "two", "three"] {
        alice.post("2024-10-28", subject, "body").await.unwrap();
    }

    let mut dave = board.client().await.unwrap();
    assert_eq!(
        dave.join("dave").await.unwrap(),
        "dave has joined the bulletin board.\nMembers: alice, dave\n\
         2,alice,2024-10-28,two\n3,alice,2024-10-28,three"
    );

    board.stop().await.unwrap();
}

#[tokio::test]
async fn test_unknown_group_is_rejected_without_broadcast() {
    let board = TestBoard::start().await.unwrap();
    let mut bob = board.joined("bob").await.unwrap();
    let mut alice = board.joined("alice").await.unwrap();
    bob.next_notification().await.unwrap();

    let err = alice.group_join(9).await.unwrap_err();
    assert!(
        matches!(err, ClientError::Rejected(ref text) if text == "Error: group 9 does not exist"),
        "{err}"
    );
    assert_eq!(bob.try_next_notification(QUIET_WAIT).await.unwrap(), None);
    assert_eq!(
        alice.request("groupusers", &["1"]).await.unwrap(),
        "Error: alice is not a member of the group 1"
    );

    board.stop().await.unwrap();
}

#[tokio::test]
async fn test_abrupt_disconnect_announces_leave() {
    let board = TestBoard::start().await.unwrap();
    let mut bob = board.joined("bob").await.unwrap();
    let alice = board.joined("alice").await.unwrap();
    bob.next_notification().await.unwrap();

    alice.close().await.unwrap();

    assert_eq!(
        bob.next_notification().await.unwrap(),
        Notification::Leave {
            user: "alice".to_string()
        }
    );
    assert_eq!(bob.request::<&str>("users", &[]).await.unwrap(), "bob");

    board.stop().await.unwrap();
}

#[tokio::test]
async fn test_group_events_reach_members_only() {
    let board = TestBoard::start().await.unwrap();
    let mut carol = board.joined("carol").await.unwrap();
    let mut alice = board.joined("alice").await.unwrap();
    let mut bob = board.joined("bob").await.unwrap();
    carol.next_notification().await.unwrap();
    carol.next_notification().await.unwrap();
    alice.next_notification().await.unwrap();

    assert_eq!(alice.group_join(2).await.unwrap(), "alice joined group 2.");
    bob.group_join(2).await.unwrap();
    assert_eq!(
        alice.next_notification().await.unwrap(),
        Notification::GroupJoin {
            group: 2,
            user: "bob".to_string()
        }
    );

    assert_eq!(
        bob.group_post(2, "2024-10-29", "Standup", "at ten").await.unwrap(),
        "Message posted to group 2 with ID 1."
    );
    assert_eq!(
        alice.next_notification().await.unwrap(),
        Notification::GroupPost {
            group: 2,
            post: post(1, "bob", "2024-10-29", "Standup"),
        }
    );
    assert_eq!(
        alice.request("groupmessage", &["2", "1"]).await.unwrap(),
        "bob on 2024-10-29: [Standup] at ten"
    );

    assert_eq!(carol.try_next_notification(QUIET_WAIT).await.unwrap(), None);
    let reply = carol.request("groupmessage", &["2", "1"]).await.unwrap();
    assert!(reply.starts_with("Error:"), "{reply}");
    let reply = carol.request("groupusers", &["2"]).await.unwrap();
    assert!(reply.starts_with("Error:"), "{reply}");
    assert_eq!(
        alice.request("groupusers", &["2"]).await.unwrap(),
        "alice\nbob"
    );

    board.stop().await.unwrap();
}

#[tokio::test]
async fn test_leave_then_rejoin_in_same_session() {
    let board = TestBoard::start().await.unwrap();
    let mut bob = board.joined("bob").await.unwrap();
    let mut alice = board.joined("alice").await.unwrap();
    bob.group_join(1).await.unwrap();
    alice.group_join(1).await.unwrap();
    assert!(matches!(
        bob.next_notification().await.unwrap(),
        Notification::Join { .. }
    ));
    assert!(matches!(
        bob.next_notification().await.unwrap(),
        Notification::GroupJoin { group: 1, .. }
    ));

    assert_eq!(
        alice.leave().await.unwrap(),
        "alice has left the bulletin board."
    );
    assert_eq!(
        bob.next_notification().await.unwrap(),
        Notification::GroupLeave {
            group: 1,
            user: "alice".to_string()
        }
    );
    assert_eq!(
        bob.next_notification().await.unwrap(),
        Notification::Leave {
            user: "alice".to_string()
        }
    );
    assert_eq!(bob.request("groupusers", &["1"]).await.unwrap(), "bob");

    // The claimed name survives leave, so a bare join works
    let reply = alice.request::<&str>("join", &[]).await.unwrap();
    assert!(reply.starts_with("alice has joined"), "{reply}");
    assert_eq!(
        bob.next_notification().await.unwrap(),
        Notification::Join {
            user: "alice".to_string()
        }
    );

    board.stop().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_joins_with_same_name() {
    let board = TestBoard::start().await.unwrap();
    let mut clients = Vec::new();
    for _ in 0..8 {
        clients.push(board.client().await.unwrap());
    }

    let handles: Vec<_> = clients
        .into_iter()
        .map(|mut client| {
            tokio::spawn(async move {
                let reply = client.request("join", &["dup"]).await.unwrap();
                (reply, client)
            })
        })
        .collect();

    let mut accepted = 0;
    let mut clients = Vec::new();
    for handle in handles {
        let (reply, client) = handle.await.unwrap();
        if reply.starts_with("dup has joined") {
            accepted += 1;
        } else {
            assert_eq!(reply, "Error: username dup is already in use");
        }
        clients.push(client);
    }

    assert_eq!(accepted, 1);
    assert_eq!(board.server().store().user_count(), 1);
    board.stop().await.unwrap();
}

#[tokio::test]
async fn test_exit_ends_session() {
    let board = TestBoard::start().await.unwrap();
    let mut bob = board.joined("bob").await.unwrap();
    let alice = board.joined("alice").await.unwrap();
    bob.next_notification().await.unwrap();

    assert_eq!(alice.exit().await.unwrap(), "Goodbye!");
    assert_eq!(
        bob.next_notification().await.unwrap(),
        Notification::Leave {
            user: "alice".to_string()
        }
    );

    board.stop().await.unwrap();
}
