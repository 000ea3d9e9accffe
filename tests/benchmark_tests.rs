//! Performance benchmarks for the session coordinator and wire encoding

use server::coordinator::{Coordinator, Outbound};
use server::quiz_store::{MemoryQuizStore, QuizRequest, QuizStore};
use server::registry::SessionRegistry;
use shared::{ClientPacket, JoinCode, QuizId, ServerPacket, ViolationKind};
use std::time::Instant;

const HOST: u32 = 1;

fn coordinator_with_quiz(questions: usize) -> (Coordinator, QuizId) {
    let mut store = MemoryQuizStore::new();
    let quiz_id = store
        .generate_quiz(&QuizRequest {
            topic: "bench".to_string(),
            question_count: questions,
            time_limit_minutes: None,
        })
        .unwrap();
    (
        Coordinator::new(SessionRegistry::with_seed(99), store),
        quiz_id,
    )
}

fn created_code(out: &[Outbound]) -> JoinCode {
    match &out[0].packet {
        ServerPacket::SessionCreated { code } => code.clone(),
        other => panic!("Unexpected packet: {:?}", other),
    }
}

/// Benchmarks a full game with many players in one session
#[test]
fn benchmark_large_session_game() {
    let players = 500;
    let questions = 10;
    let (mut coord, quiz_id) = coordinator_with_quiz(questions);

    let start = Instant::now();

    let code = created_code(&coord.handle(HOST, ClientPacket::CreateSession { quiz_id }, start));
    for conn in 0..players {
        coord.handle(
            conn + 2,
            ClientPacket::JoinSession {
                code: code.clone(),
                name: format!("Player {}", conn),
            },
            Instant::now(),
        );
    }
    coord.handle(HOST, ClientPacket::StartSession { code: code.clone() }, Instant::now());

    let mut deliveries = 0;
    for _ in 0..questions {
        for conn in 0..players {
            deliveries += coord
                .handle(
                    conn + 2,
                    ClientPacket::SubmitAnswer {
                        code: code.clone(),
                        answer_index: 0,
                        question_index: None,
                    },
                    Instant::now(),
                )
                .len();
            deliveries += coord
                .handle(conn + 2, ClientPacket::RequestNext { code: code.clone() }, Instant::now())
                .len();
        }
    }

    let duration = start.elapsed();
    println!(
        "Large session: {} players x {} questions, {} deliveries in {:?}",
        players, questions, deliveries, duration
    );

    let session = coord.registry().get_session(&code).unwrap();
    assert!(session.players().iter().all(|p| p.finished));
    assert!(session
        .players()
        .iter()
        .all(|p| p.score == questions as u32));

    // Every answer rebuilds a 500 entry roster; stay well under 5s
    assert!(duration.as_secs() < 5);
}

/// Benchmarks session creation and code allocation
#[test]
fn benchmark_session_creation() {
    let sessions = 10_000;
    let (mut coord, quiz_id) = coordinator_with_quiz(1);

    let start = Instant::now();
    for host in 0..sessions {
        let out = coord.handle(
            host,
            ClientPacket::CreateSession {
                quiz_id: quiz_id.clone(),
            },
            Instant::now(),
        );
        created_code(&out);
    }
    let duration = start.elapsed();

    println!(
        "Session creation: {} sessions in {:?} ({:.2} us/session)",
        sessions,
        duration,
        duration.as_micros() as f64 / sessions as f64
    );

    assert_eq!(coord.registry().len(), sessions as usize);
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks violation reporting across many small sessions
#[test]
fn benchmark_violation_reports() {
    let sessions = 200;
    let reports_per_session = 50;
    let (mut coord, quiz_id) = coordinator_with_quiz(3);

    let mut codes = Vec::new();
    for host in 0..sessions {
        let out = coord.handle(
            host * 2,
            ClientPacket::CreateSession {
                quiz_id: quiz_id.clone(),
            },
            Instant::now(),
        );
        let code = created_code(&out);
        coord.handle(
            host * 2 + 1,
            ClientPacket::JoinSession {
                code: code.clone(),
                name: "Cheater".to_string(),
            },
            Instant::now(),
        );
        codes.push(code);
    }

    let start = Instant::now();
    for (host, code) in codes.iter().enumerate() {
        for _ in 0..reports_per_session {
            coord.handle(
                host as u32 * 2 + 1,
                ClientPacket::ReportViolation {
                    code: code.clone(),
                    violation_type: ViolationKind::MinimizeOrTab,
                },
                Instant::now(),
            );
        }
    }
    let duration = start.elapsed();

    println!(
        "Violations: {} reports in {:?}",
        sessions * reports_per_session,
        duration
    );

    for code in &codes {
        let session = coord.registry().get_session(code).unwrap();
        assert_eq!(session.players()[0].violation_count, reports_per_session);
    }
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks JSON encoding of a large dashboard
#[test]
fn benchmark_dashboard_serialization() {
    let players = 200;
    let (mut coord, quiz_id) = coordinator_with_quiz(5);
    let code = created_code(&coord.handle(HOST, ClientPacket::CreateSession { quiz_id }, Instant::now()));
    for conn in 0..players {
        coord.handle(
            conn + 2,
            ClientPacket::JoinSession {
                code: code.clone(),
                name: format!("Player {}", conn),
            },
            Instant::now(),
        );
    }
    let roster = coord.registry().get_session(&code).unwrap().roster();
    let packet = ServerPacket::DashboardUpdate {
        players: roster,
        violation: None,
    };

    let iterations = 1_000;
    let start = Instant::now();
    let mut bytes = 0;
    for _ in 0..iterations {
        bytes += serde_json::to_string(&packet).unwrap().len();
    }
    let duration = start.elapsed();

    println!(
        "Dashboard encoding: {} x {} players, {} bytes in {:?}",
        iterations, players, bytes, duration
    );

    assert!(duration.as_secs() < 5);
}
