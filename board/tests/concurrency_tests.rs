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

//! Concurrent access to the board store

use bulletin_board::{BoardError, BoardId, BoardStore, GroupId, MessageId};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

const THREADS: usize = 8;
const POSTS_PER_THREAD: usize = 250;

#[test]
fn test_concurrent_public_posts_get_unique_gap_free_ids() {
    let store = Arc::new(BoardStore::new(["General"]));
    for t in 0..THREADS {
        store.add_user(&format!("user{t}")).unwrap();
    }

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                let sender = format!("user{t}");
                (0..POSTS_PER_THREAD)
                    .map(|n| {
                        store
                            .add_post(&sender, "2024-10-28", &format!("post {n}"), "body")
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids = BTreeSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(ids.insert(id.as_u64()), "duplicate id {id}");
        }
    }

    let total = (THREADS * POSTS_PER_THREAD) as u64;
    assert_eq!(ids, (1..=total).collect::<BTreeSet<_>>());

    // Display order matches id order
    let board = store.public_board();
    assert_eq!(board.message_count() as u64, total);
    let latest = board.latest(board.message_count());
    assert!(latest.windows(2).all(|pair| pair[0].id < pair[1].id));
}

#[test]
fn test_concurrent_group_posts_are_per_board() {
    let store = Arc::new(BoardStore::new(["General", "Projects"]));
    store.add_user("alice").unwrap();
    store.join_group("alice", GroupId::new(1)).unwrap();
    store.join_group("alice", GroupId::new(2)).unwrap();

    thread::scope(|scope| {
        for group in [1, 2] {
            for _ in 0..4 {
                let store = &store;
                scope.spawn(move || {
                    for _ in 0..100 {
                        store
                            .post_to_group(GroupId::new(group), "alice", "d", "s", "c")
                            .unwrap();
                    }
                });
            }
        }
    });

    for group in [1, 2] {
        let board = store.board(BoardId::Group(GroupId::new(group))).unwrap();
        assert_eq!(board.message_count(), 400);
        assert!(board.message(MessageId::new(400)).is_some());
        assert!(board.message(MessageId::new(401)).is_none());
    }
}

#[test]
fn test_concurrent_joins_of_one_name_admit_exactly_one() {
    let store = Arc::new(BoardStore::new(Vec::<String>::new()));
    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..16)
            .map(|_| scope.spawn(|| store.add_user("alice")))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|err| matches!(err, BoardError::AlreadyMember(_))));
    assert_eq!(store.list_users(), vec!["alice"]);
}

#[test]
fn test_membership_stays_bidirectional_under_churn() {
    let store = Arc::new(BoardStore::new(["General", "Projects", "Events"]));
    for t in 0..THREADS {
        store.add_user(&format!("user{t}")).unwrap();
    }

    thread::scope(|scope| {
        for t in 0..THREADS {
            let store = &store;
            scope.spawn(move || {
                let user = format!("user{t}");
                for round in 0..200u32 {
                    let group = GroupId::new(round % 3 + 1);
                    let _ = store.join_group(&user, group);
                    if round % 2 == 0 {
                        let _ = store.leave_group(&user, group);
                    }
                }
            });
        }
    });

    for group in store.list_groups() {
        let members = store.list_group_users(group.id).unwrap();
        for member in &members {
            assert!(store.user_groups(member).unwrap().contains(&group.id));
        }
    }
    for t in 0..THREADS {
        let user = format!("user{t}");
        for group in store.user_groups(&user).unwrap() {
            assert!(store.is_member(BoardId::Group(group), &user));
        }
    }
}

proptest! {
    #[test]
    fn test_join_then_leave_restores_membership(groups in proptest::collection::vec(1u32..=3, 0..3), target in 1u32..=3) {
        let store = BoardStore::new(["General", "Projects", "Events"]);
        store.add_user("alice").unwrap();
        for group in &groups {
            let _ = store.join_group("alice", GroupId::new(*group));
        }
        let target = GroupId::new(target);
        prop_assume!(!store.is_member(BoardId::Group(target), "alice"));

        let before = (store.user_groups("alice"), store.list_group_users(target).unwrap());
        store.join_group("alice", target).unwrap();
        store.leave_group("alice", target).unwrap();
        let after = (store.user_groups("alice"), store.list_group_users(target).unwrap());
        prop_assert_eq!(before, after);
    }
}
