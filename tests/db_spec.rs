use chrono::{Duration, NaiveDate, Utc};
use clubhouse::db::Store;
use clubhouse::error::Error;
use clubhouse::models::*;
use speculate2::speculate;
use uuid::Uuid;

fn create_test_member(store: &Store, name: &str, email: &str) -> Member {
    store
        .create_member(CreateMemberInput {
            name: name.to_string(),
            email: email.to_string(),
            role: Role::Member,
            committee: Committee::Coding,
            is_admin: false,
        })
        .expect("Failed to create member")
}

fn submit_test_project(store: &Store, author: Uuid) -> Project {
    store
        .submit_project(
            author,
            SubmitProjectInput {
                title: "X".to_string(),
                description: "Y".to_string(),
                committee: Committee::Coding,
                required_members: 2,
                timeframe: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
                repo_link: None,
            },
        )
        .expect("Failed to submit project")
}

fn create_test_poll(store: &Store, author: Uuid) -> Poll {
    store
        .create_poll(
            author,
            CreatePollInput {
                question: "Next workshop topic?".to_string(),
                options: vec!["Rust".to_string(), "Go".to_string()],
                expires_at: None,
            },
        )
        .expect("Failed to create poll")
}

#[test]
fn data_survives_a_reopen() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("club.db");

    {
        let store = Store::open(path.clone()).expect("Failed to open database");
        store.migrate().expect("Failed to migrate");
        create_test_member(&store, "Ada", "ada@club.test");
    }

    let store = Store::open(path).expect("Failed to reopen database");
    store.migrate().expect("Failed to migrate");
    let members = store.get_all_members().expect("Query failed");
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].name, "Ada");
}

speculate! {
    before {
        let store = Store::open_memory().expect("Failed to create in-memory database");
        store.migrate().expect("Failed to run migrations");
    }

    describe "members" {
        describe "create_member" {
            it "creates a member with zero points and tokens" {
                let member = create_test_member(&store, "Ada", "ada@club.test");
                assert_eq!(member.points, 0);
                assert_eq!(member.memo_tokens, 0);
                assert!(!member.is_admin);
            }

            it "rejects a duplicate email" {
                create_test_member(&store, "Ada", "ada@club.test");
                let err = store.create_member(CreateMemberInput {
                    name: "Imposter".to_string(),
                    email: "ada@club.test".to_string(),
                    role: Role::Member,
                    committee: Committee::None,
                    is_admin: false,
                }).unwrap_err();
                assert!(matches!(err, Error::Validation(_)));
            }
        }

        describe "update_member" {
            it "allows an admin override to lower a point total" {
                let member = create_test_member(&store, "Ada", "ada@club.test");
                store.update_member(member.id, UpdateMemberInput {
                    points: Some(500),
                    ..Default::default()
                }).expect("Failed to set points");

                let updated = store.update_member(member.id, UpdateMemberInput {
                    points: Some(200),
                    ..Default::default()
                }).expect("Failed to override points");
                assert_eq!(updated.points, 200);
            }

            it "adjusts the memo token allowance" {
                let member = create_test_member(&store, "Ada", "ada@club.test");
                let updated = store.update_member(member.id, UpdateMemberInput {
                    memo_tokens: Some(5),
                    ..Default::default()
                }).expect("Failed to update tokens");
                assert_eq!(updated.memo_tokens, 5);
            }
        }

        describe "leaderboard" {
            it "orders members by points descending with derived ranks" {
                let low = create_test_member(&store, "Low", "low@club.test");
                let high = create_test_member(&store, "High", "high@club.test");
                store.update_member(low.id, UpdateMemberInput {
                    points: Some(120), ..Default::default()
                }).unwrap();
                store.update_member(high.id, UpdateMemberInput {
                    points: Some(1000), ..Default::default()
                }).unwrap();

                let board = store.leaderboard().expect("Query failed");
                assert_eq!(board.len(), 2);
                assert_eq!(board[0].member.name, "High");
                assert_eq!(board[0].rank, Rank::Hacker);
                assert_eq!(board[1].rank, Rank::Explorer);
            }
        }
    }

    describe "project lifecycle" {
        describe "submit_project" {
            it "creates a pending project" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let project = submit_test_project(&store, author.id);
                assert_eq!(project.status, ProjectStatus::Pending);
                assert!(!project.status.is_approved());
                assert!(!project.status.is_completed());
            }

            it "rejects an empty title and creates nothing" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let err = store.submit_project(author.id, SubmitProjectInput {
                    title: "".to_string(),
                    description: "Y".to_string(),
                    committee: Committee::None,
                    required_members: 2,
                    timeframe: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
                    repo_link: None,
                }).unwrap_err();

                assert!(matches!(err, Error::Validation(_)));
                assert!(store.get_all_projects().unwrap().is_empty());
            }

            it "requires a known author" {
                let err = store.submit_project(Uuid::new_v4(), SubmitProjectInput {
                    title: "X".to_string(),
                    description: "Y".to_string(),
                    committee: Committee::None,
                    required_members: 1,
                    timeframe: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
                    repo_link: None,
                }).unwrap_err();
                assert!(matches!(err, Error::NotFound("member")));
            }
        }

        describe "approve_project" {
            it "approves a pending project with its point value" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let project = submit_test_project(&store, author.id);

                let approved = store.approve_project(project.id, 250).expect("Failed to approve");
                assert_eq!(approved.status, ProjectStatus::Approved { points: 250 });
            }

            it "fails on an already approved project and leaves it unchanged" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let project = submit_test_project(&store, author.id);
                store.approve_project(project.id, 250).unwrap();

                let err = store.approve_project(project.id, 999).unwrap_err();
                assert!(matches!(err, Error::InvalidTransition { .. }));

                let reloaded = store.get_project(project.id).unwrap().unwrap();
                assert_eq!(reloaded.status, ProjectStatus::Approved { points: 250 });
            }
        }

        describe "reject_project" {
            it "is terminal: no further transition succeeds" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let project = submit_test_project(&store, author.id);
                let rejected = store.reject_project(project.id, Some("out of scope".to_string()))
                    .expect("Failed to reject");
                assert_eq!(rejected.status, ProjectStatus::Rejected {
                    reason: Some("out of scope".to_string())
                });

                assert!(matches!(
                    store.approve_project(project.id, 10).unwrap_err(),
                    Error::InvalidTransition { .. }
                ));
                assert!(matches!(
                    store.complete_project(project.id).unwrap_err(),
                    Error::InvalidTransition { .. }
                ));
                assert!(matches!(
                    store.update_project(project.id, UpdateProjectInput {
                        title: Some("New".to_string()),
                        ..Default::default()
                    }).unwrap_err(),
                    Error::InvalidTransition { .. }
                ));
            }
        }

        describe "complete_project" {
            it "completes an approved project and credits joined members" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let teammate = create_test_member(&store, "Grace", "grace@club.test");
                store.update_member(teammate.id, UpdateMemberInput {
                    points: Some(650), ..Default::default()
                }).unwrap();

                let project = submit_test_project(&store, author.id);
                store.approve_project(project.id, 100).unwrap();
                store.join_project(project.id, teammate.id).unwrap();

                let completed = store.complete_project(project.id).expect("Failed to complete");
                assert_eq!(completed.status, ProjectStatus::Completed { points: 100 });

                let credited = store.get_member(teammate.id).unwrap().unwrap();
                assert_eq!(credited.points, 750);
                assert_eq!(Rank::for_points(credited.points), Rank::Developer);

                // The author never joined, so nothing was credited.
                let author_after = store.get_member(author.id).unwrap().unwrap();
                assert_eq!(author_after.points, 0);
            }

            it "fails on a pending project" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let project = submit_test_project(&store, author.id);
                assert!(matches!(
                    store.complete_project(project.id).unwrap_err(),
                    Error::InvalidTransition { .. }
                ));
            }

            it "is terminal: updates afterwards fail" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let project = submit_test_project(&store, author.id);
                store.approve_project(project.id, 50).unwrap();
                store.complete_project(project.id).unwrap();

                assert!(matches!(
                    store.update_project(project.id, UpdateProjectInput {
                        title: Some("Renamed".to_string()),
                        ..Default::default()
                    }).unwrap_err(),
                    Error::InvalidTransition { .. }
                ));
            }
        }

        describe "update_project" {
            it "edits an approved project partially" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let project = submit_test_project(&store, author.id);
                store.approve_project(project.id, 100).unwrap();

                let updated = store.update_project(project.id, UpdateProjectInput {
                    title: Some("Better title".to_string()),
                    points: Some(150),
                    ..Default::default()
                }).expect("Failed to update");

                assert_eq!(updated.title, "Better title");
                assert_eq!(updated.status, ProjectStatus::Approved { points: 150 });
                assert_eq!(updated.description, "Y");
            }

            it "fails on a pending project" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let project = submit_test_project(&store, author.id);
                assert!(matches!(
                    store.update_project(project.id, UpdateProjectInput {
                        title: Some("New".to_string()),
                        ..Default::default()
                    }).unwrap_err(),
                    Error::InvalidTransition { .. }
                ));
            }

            it "refuses to shrink required members below the joined count" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let a = create_test_member(&store, "A", "a@club.test");
                let b = create_test_member(&store, "B", "b@club.test");
                let project = submit_test_project(&store, author.id);
                store.approve_project(project.id, 100).unwrap();
                store.join_project(project.id, a.id).unwrap();
                store.join_project(project.id, b.id).unwrap();

                assert!(matches!(
                    store.update_project(project.id, UpdateProjectInput {
                        required_members: Some(1),
                        ..Default::default()
                    }).unwrap_err(),
                    Error::Validation(_)
                ));
            }
        }

        describe "join_project" {
            it "tracks the joined set in order" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let a = create_test_member(&store, "A", "a@club.test");
                let project = submit_test_project(&store, author.id);

                let joined = store.join_project(project.id, a.id).expect("Failed to join");
                assert_eq!(joined.members, vec![a.id]);
            }

            it "rejects joining twice" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let a = create_test_member(&store, "A", "a@club.test");
                let project = submit_test_project(&store, author.id);
                store.join_project(project.id, a.id).unwrap();

                assert!(matches!(
                    store.join_project(project.id, a.id).unwrap_err(),
                    Error::Validation(_)
                ));
            }

            it "rejects joining past capacity" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let a = create_test_member(&store, "A", "a@club.test");
                let b = create_test_member(&store, "B", "b@club.test");
                let c = create_test_member(&store, "C", "c@club.test");
                let project = submit_test_project(&store, author.id);
                store.join_project(project.id, a.id).unwrap();
                store.join_project(project.id, b.id).unwrap();

                assert!(matches!(
                    store.join_project(project.id, c.id).unwrap_err(),
                    Error::Validation(_)
                ));
                let loaded = store.get_project_with_members(project.id).unwrap().unwrap();
                assert_eq!(loaded.members.len(), 2);
            }

            it "rejects joining a rejected project" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let a = create_test_member(&store, "A", "a@club.test");
                let project = submit_test_project(&store, author.id);
                store.reject_project(project.id, None).unwrap();

                assert!(matches!(
                    store.join_project(project.id, a.id).unwrap_err(),
                    Error::InvalidTransition { .. }
                ));
            }
        }

        describe "delete_project" {
            it "deletes a pending project" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let project = submit_test_project(&store, author.id);
                store.delete_project(project.id).expect("Failed to delete");
                assert!(store.get_project(project.id).unwrap().is_none());
            }

            it "protects a completed project" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let project = submit_test_project(&store, author.id);
                store.approve_project(project.id, 10).unwrap();
                store.complete_project(project.id).unwrap();

                assert!(matches!(
                    store.delete_project(project.id).unwrap_err(),
                    Error::InvalidTransition { .. }
                ));
                assert!(store.get_project(project.id).unwrap().is_some());
            }
        }
    }

    describe "polls" {
        describe "create_poll" {
            it "creates an active poll with ordered zero-count options" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let poll = create_test_poll(&store, author.id);

                assert_eq!(poll.status, PollStatus::Active);
                assert_eq!(poll.options.len(), 2);
                assert_eq!(poll.options[0].label, "Rust");
                assert!(poll.options.iter().all(|o| o.votes == 0));
            }

            it "requires at least two options" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let err = store.create_poll(author.id, CreatePollInput {
                    question: "Only one?".to_string(),
                    options: vec!["Yes".to_string()],
                    expires_at: None,
                }).unwrap_err();
                assert!(matches!(err, Error::Validation(_)));
            }
        }

        describe "vote" {
            it "counts a vote and marks the voter" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let voter = create_test_member(&store, "Grace", "grace@club.test");
                let poll = create_test_poll(&store, author.id);

                let view = store.vote(poll.id, voter.id, 1).expect("Failed to vote");
                assert!(view.has_voted);
                assert_eq!(view.voted_option, Some(1));
                assert_eq!(view.poll.options[1].votes, 1);
                assert_eq!(view.poll.options[0].votes, 0);
            }

            it "rejects a second vote and leaves counters unchanged" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let voter = create_test_member(&store, "Grace", "grace@club.test");
                let poll = create_test_poll(&store, author.id);
                store.vote(poll.id, voter.id, 0).unwrap();

                let err = store.vote(poll.id, voter.id, 1).unwrap_err();
                assert!(matches!(err, Error::Validation(_)));

                let view = store.get_poll(poll.id, Some(voter.id)).unwrap().unwrap();
                assert_eq!(view.poll.options[0].votes, 1);
                assert_eq!(view.poll.options[1].votes, 0);
                assert_eq!(view.voted_option, Some(0));
            }

            it "rejects an out of range option" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let voter = create_test_member(&store, "Grace", "grace@club.test");
                let poll = create_test_poll(&store, author.id);

                assert!(matches!(
                    store.vote(poll.id, voter.id, 7).unwrap_err(),
                    Error::Validation(_)
                ));
            }

            it "rejects votes on a closed poll" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let voter = create_test_member(&store, "Grace", "grace@club.test");
                let poll = create_test_poll(&store, author.id);
                store.close_poll(poll.id).unwrap();

                assert!(matches!(
                    store.vote(poll.id, voter.id, 0).unwrap_err(),
                    Error::InvalidTransition { state: "closed", .. }
                ));
            }

            it "rejects votes on an expired poll" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let voter = create_test_member(&store, "Grace", "grace@club.test");
                let poll = store.create_poll(author.id, CreatePollInput {
                    question: "Too late?".to_string(),
                    options: vec!["Yes".to_string(), "No".to_string()],
                    expires_at: Some(Utc::now() - Duration::hours(1)),
                }).unwrap();

                assert!(matches!(
                    store.vote(poll.id, voter.id, 0).unwrap_err(),
                    Error::InvalidTransition { state: "expired", .. }
                ));
            }
        }

        describe "close_poll" {
            it "closes an active poll once" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let poll = create_test_poll(&store, author.id);

                let closed = store.close_poll(poll.id).expect("Failed to close");
                assert_eq!(closed.status, PollStatus::Closed);

                assert!(matches!(
                    store.close_poll(poll.id).unwrap_err(),
                    Error::InvalidTransition { .. }
                ));
            }
        }

        describe "viewer read model" {
            it "shows has_voted only for the voting member" {
                let author = create_test_member(&store, "Ada", "ada@club.test");
                let voter = create_test_member(&store, "Grace", "grace@club.test");
                let poll = create_test_poll(&store, author.id);
                store.vote(poll.id, voter.id, 0).unwrap();

                let as_voter = store.get_poll(poll.id, Some(voter.id)).unwrap().unwrap();
                assert!(as_voter.has_voted);

                let as_author = store.get_poll(poll.id, Some(author.id)).unwrap().unwrap();
                assert!(!as_author.has_voted);

                let anonymous = store.get_poll(poll.id, None).unwrap().unwrap();
                assert!(!anonymous.has_voted);
                assert_eq!(anonymous.voted_option, None);
            }
        }
    }

    describe "cascade" {
        it "removes a member's joined rows and votes with the member" {
            let author = create_test_member(&store, "Ada", "ada@club.test");
            let member = create_test_member(&store, "Grace", "grace@club.test");
            let project = submit_test_project(&store, author.id);
            store.join_project(project.id, member.id).unwrap();
            let poll = create_test_poll(&store, author.id);
            store.vote(poll.id, member.id, 0).unwrap();

            store.delete_member(member.id).expect("Failed to delete member");

            let loaded = store.get_project_with_members(project.id).unwrap().unwrap();
            assert!(loaded.members.is_empty());
        }
    }
}
