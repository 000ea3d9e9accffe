//! Wire protocol shared by the quiz server and its clients.
//!
//! Every packet travels as one JSON text frame of the form
//! `{"event": "<name>", "data": {...}}`.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const POINTS_PER_CORRECT: u32 = 1;
pub const DEFAULT_QUESTION_TIME_LIMIT_SECS: u32 = 20;
pub const DEFAULT_TOTAL_TIME_MINUTES: u32 = 10;
pub const DEFAULT_QUESTION_COUNT: usize = 5;
pub const JOIN_CODE_MIN: u32 = 100_000;
pub const JOIN_CODE_MAX: u32 = 999_999;

/// Short numeric code players type in to find a session.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct JoinCode(String);

impl JoinCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u32> for JoinCode {
    fn from(value: u32) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for JoinCode {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for JoinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct QuizId(pub String);

impl fmt::Display for QuizId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Question {
    pub text: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_seconds: Option<u32>,
}

impl Question {
    pub fn time_limit_or_default(&self) -> u32 {
        self.time_limit_seconds
            .unwrap_or(DEFAULT_QUESTION_TIME_LIMIT_SECS)
    }
}

/// Immutable copy of quiz content bound to a session when it is created.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct QuizSnapshot {
    pub title: String,
    pub questions: Vec<Question>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time_minutes: Option<u32>,
}

impl QuizSnapshot {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn total_time_or_default(&self) -> u32 {
        self.total_time_minutes.unwrap_or(DEFAULT_TOTAL_TIME_MINUTES)
    }
}

/// Client-reported anti-cheat category.
///
/// Unknown tags are kept verbatim so the host sees exactly what the client
/// sent.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum ViolationKind {
    Blur,
    MinimizeOrTab,
    Resize,
    Other(String),
}

impl ViolationKind {
    pub fn as_tag(&self) -> &str {
        match self {
            ViolationKind::Blur => "blur",
            ViolationKind::MinimizeOrTab => "minimize_or_tab",
            ViolationKind::Resize => "resize",
            ViolationKind::Other(tag) => tag,
        }
    }

    /// Human readable description for host alerts.
    pub fn describe(&self) -> &'static str {
        match self {
            ViolationKind::Blur => "window lost focus",
            ViolationKind::MinimizeOrTab => "switched tab or minimized",
            ViolationKind::Resize => "resized the window",
            ViolationKind::Other(_) => "left the window",
        }
    }
}

impl From<String> for ViolationKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "blur" => ViolationKind::Blur,
            "minimize_or_tab" => ViolationKind::MinimizeOrTab,
            "resize" => ViolationKind::Resize,
            _ => ViolationKind::Other(tag),
        }
    }
}

impl From<&str> for ViolationKind {
    fn from(tag: &str) -> Self {
        ViolationKind::from(tag.to_string())
    }
}

impl From<ViolationKind> for String {
    fn from(kind: ViolationKind) -> Self {
        match kind {
            ViolationKind::Other(tag) => tag,
            known => known.as_tag().to_string(),
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// One roster row as the host dashboard sees it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub score: u32,
    pub current_question_index: usize,
    pub finished: bool,
    pub violation_count: u32,
    pub last_violation_type: Option<ViolationKind>,
    pub connected: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ViolationNotice {
    pub player_id: PlayerId,
    pub player_name: String,
    pub violation_type: ViolationKind,
}

/// Actions sent by a host or player.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientPacket {
    GenerateQuiz {
        topic: String,
        #[serde(default)]
        question_count: Option<usize>,
        #[serde(default)]
        time_limit_minutes: Option<u32>,
    },
    CreateSession {
        quiz_id: QuizId,
    },
    JoinSession {
        code: JoinCode,
        name: String,
    },
    RejoinSession {
        code: JoinCode,
        player_id: PlayerId,
        resume_token: String,
    },
    StartSession {
        code: JoinCode,
    },
    SubmitAnswer {
        code: JoinCode,
        answer_index: usize,
        #[serde(default)]
        question_index: Option<usize>,
    },
    RequestNext {
        code: JoinCode,
    },
    ReportViolation {
        code: JoinCode,
        violation_type: ViolationKind,
    },
    EndSession {
        code: JoinCode,
    },
}

/// Notifications sent by the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerPacket {
    QuizGenerated {
        quiz_id: QuizId,
        title: String,
        question_count: usize,
    },
    SessionCreated {
        code: JoinCode,
    },
    JoinedSession {
        code: JoinCode,
        player_id: PlayerId,
        resume_token: String,
    },
    RejoinedSession {
        code: JoinCode,
        player_id: PlayerId,
        score: u32,
        finished: bool,
    },
    PlayerJoined {
        players: Vec<PlayerView>,
    },
    Error {
        message: String,
    },
    SessionStarted {
        total_time_minutes: u32,
    },
    NewQuestion {
        question_index: usize,
        text: String,
        options: Vec<String>,
        current: usize,
        total: usize,
        time_limit_seconds: u32,
    },
    AnswerResult {
        is_correct: bool,
        correct_index: usize,
        score: u32,
    },
    DashboardUpdate {
        players: Vec<PlayerView>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        violation: Option<ViolationNotice>,
    },
    SessionOver {
        score: u32,
        total_questions: usize,
        quiz: QuizSnapshot,
    },
    SessionEnded {
        reason: String,
    },
}

impl ServerPacket {
    pub fn error(message: impl Into<String>) -> Self {
        ServerPacket::Error {
            message: message.into(),
        }
    }

    /// Builds the `new_question` packet for the question at `index`.
    pub fn new_question(quiz: &QuizSnapshot, index: usize) -> Option<Self> {
        let question = quiz.question(index)?;
        Some(ServerPacket::NewQuestion {
            question_index: index,
            text: question.text.clone(),
            options: question.options.clone(),
            current: index + 1,
            total: quiz.question_count(),
            time_limit_seconds: question.time_limit_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_quiz() -> QuizSnapshot {
        QuizSnapshot {
            title: "Rivers".to_string(),
            questions: vec![
                Question {
                    text: "Longest river?".to_string(),
                    options: vec!["Nile".to_string(), "Seine".to_string()],
                    correct_index: 0,
                    time_limit_seconds: None,
                },
                Question {
                    text: "River through Paris?".to_string(),
                    options: vec!["Thames".to_string(), "Seine".to_string()],
                    correct_index: 1,
                    time_limit_seconds: Some(45),
                },
            ],
            total_time_minutes: None,
        }
    }

    #[test]
    fn test_violation_kind_known_tags() {
        assert_eq!(ViolationKind::from("blur"), ViolationKind::Blur);
        assert_eq!(
            ViolationKind::from("minimize_or_tab"),
            ViolationKind::MinimizeOrTab
        );
        assert_eq!(ViolationKind::from("resize"), ViolationKind::Resize);
    }

    #[test]
    fn test_violation_kind_unknown_tag_kept_verbatim() {
        let kind = ViolationKind::from("devtools_open");
        assert_eq!(kind, ViolationKind::Other("devtools_open".to_string()));
        assert_eq!(kind.as_tag(), "devtools_open");
        assert_eq!(kind.describe(), "left the window");
        assert_eq!(
            serde_json::to_value(&kind).unwrap(),
            json!("devtools_open")
        );
    }

    #[test]
    fn test_client_packet_wire_shape() {
        let raw = r#"{"event":"submit_answer","data":{"code":"123456","answer_index":2}}"#;
        let packet: ClientPacket = serde_json::from_str(raw).unwrap();
        assert_eq!(
            packet,
            ClientPacket::SubmitAnswer {
                code: JoinCode::from("123456"),
                answer_index: 2,
                question_index: None,
            }
        );
    }

    #[test]
    fn test_report_violation_decodes_tag() {
        let raw = r#"{"event":"report_violation","data":{"code":"654321","violation_type":"minimize_or_tab"}}"#;
        match serde_json::from_str::<ClientPacket>(raw).unwrap() {
            ClientPacket::ReportViolation { violation_type, .. } => {
                assert_eq!(violation_type, ViolationKind::MinimizeOrTab)
            }
            other => panic!("Unexpected packet: {:?}", other),
        }
    }

    #[test]
    fn test_generate_quiz_optional_fields() {
        let raw = r#"{"event":"generate_quiz","data":{"topic":"test"}}"#;
        let packet: ClientPacket = serde_json::from_str(raw).unwrap();
        assert_eq!(
            packet,
            ClientPacket::GenerateQuiz {
                topic: "test".to_string(),
                question_count: None,
                time_limit_minutes: None,
            }
        );
    }

    #[test]
    fn test_unknown_event_rejected() {
        let raw = r#"{"event":"launch_rockets","data":{}}"#;
        assert!(serde_json::from_str::<ClientPacket>(raw).is_err());
    }

    #[test]
    fn test_dashboard_update_omits_missing_violation() {
        let packet = ServerPacket::DashboardUpdate {
            players: vec![],
            violation: None,
        };
        let value = serde_json::to_value(&packet).unwrap();
        assert_eq!(value, json!({"event": "dashboard_update", "data": {"players": []}}));
    }

    #[test]
    fn test_new_question_positions_and_defaults() {
        let quiz = sample_quiz();

        match ServerPacket::new_question(&quiz, 0).unwrap() {
            ServerPacket::NewQuestion {
                current,
                total,
                time_limit_seconds,
                ..
            } => {
                assert_eq!(current, 1);
                assert_eq!(total, 2);
                assert_eq!(time_limit_seconds, DEFAULT_QUESTION_TIME_LIMIT_SECS);
            }
            other => panic!("Unexpected packet: {:?}", other),
        }

        match ServerPacket::new_question(&quiz, 1).unwrap() {
            ServerPacket::NewQuestion {
                question_index,
                time_limit_seconds,
                ..
            } => {
                assert_eq!(question_index, 1);
                assert_eq!(time_limit_seconds, 45);
            }
            other => panic!("Unexpected packet: {:?}", other),
        }

        assert!(ServerPacket::new_question(&quiz, 2).is_none());
    }

    #[test]
    fn test_total_time_default() {
        let mut quiz = sample_quiz();
        assert_eq!(quiz.total_time_or_default(), DEFAULT_TOTAL_TIME_MINUTES);
        quiz.total_time_minutes = Some(3);
        assert_eq!(quiz.total_time_or_default(), 3);
    }

    #[test]
    fn test_join_code_display() {
        let code = JoinCode::from(482913);
        assert_eq!(code.to_string(), "482913");
        assert_eq!(code.as_str(), "482913");
    }
}
