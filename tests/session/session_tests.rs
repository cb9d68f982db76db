// Session tests - append-only history under concurrent writers.

use std::sync::Arc;
use std::thread;

use neon_agent_core::Session;
use neon_agent_core::domain::TurnKind;

#[test]
fn concurrent_appends_get_unique_increasing_sequence_numbers() {
    let session = Arc::new(Session::new());
    let writers: Vec<_> = (0..8)
        .map(|writer| {
            let session = session.clone();
            thread::spawn(move || {
                for idx in 0..25 {
                    session.append(TurnKind::UserMessage {
                        text: format!("{writer}-{idx}"),
                    });
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().expect("writer thread");
    }

    let history = session.history();
    let seqs: Vec<u64> = history.iter().map(|turn| turn.seq).collect();
    assert_eq!(seqs, (1..=200).collect::<Vec<u64>>());
}

#[test]
fn snapshot_is_restartable_and_isolated_from_later_appends() {
    let session = Session::new();
    session.append(TurnKind::UserMessage { text: "one".into() });
    let snapshot = session.history();
    session.append(TurnKind::AssistantMessage { text: "two".into() });

    let first_pass: Vec<_> = snapshot.iter().map(|turn| turn.seq).collect();
    let second_pass: Vec<_> = snapshot.iter().map(|turn| turn.seq).collect();
    assert_eq!(first_pass, vec![1]);
    assert_eq!(first_pass, second_pass);

    let later = session.history();
    assert_eq!(later.len(), 2);
    assert_eq!(later.as_slice()[0], snapshot.as_slice()[0]);
    assert_eq!(later.after(1).count(), 1);
}

#[test]
fn run_guard_releases_on_drop() {
    let session = Session::new();
    {
        let _guard = session.try_begin_run().expect("first guard");
        assert!(session.is_busy());
        assert!(session.try_begin_run().is_none());
    }
    assert!(!session.is_busy());
    assert!(session.try_begin_run().is_some());
}
