// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain entities shared by the store gateway, session engine, and HTTP
//! surface. Flat records with id references only — no lazy graph
//! collections, so response DTOs never accidentally leak an adjacent
//! aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Id = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Proctor,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub role: Role,
    pub deactivated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamStatus {
    Draft,
    Published,
    Ongoing,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    pub id: Id,
    pub title: String,
    pub subject: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub total_marks: f64,
    pub passing_marks: f64,
    pub shuffle_questions: bool,
    pub shuffle_options: bool,
    pub allow_late_entry: bool,
    pub status: ExamStatus,
    pub is_deleted: bool,
}

impl Exam {
    pub fn is_active_for_entry(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, ExamStatus::Published | ExamStatus::Ongoing) && now < self.end_time
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Mcq,
    ShortAnswer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McqOption {
    pub key: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Id,
    pub exam_id: Id,
    pub question_type: QuestionType,
    pub options: Vec<McqOption>,
    pub correct_answer: Option<String>,
    pub marks: f64,
    pub negative_marks: f64,
    pub order_index: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Registered,
    Ongoing,
    Completed,
    Flagged,
    Absent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamEnrollment {
    pub id: Id,
    pub exam_id: Id,
    pub user_id: Id,
    pub status: EnrollmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamSession {
    pub id: Id,
    pub enrollment_id: Id,
    pub exam_id: Id,
    pub user_id: Id,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub last_heartbeat_at: DateTime<Utc>,
    pub identity_verified: bool,
    pub is_suspended: bool,
    pub suspension_reason: Option<String>,
    pub suspended_at: Option<DateTime<Utc>>,
    pub extended_end_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub score: Option<f64>,
    pub is_passed: Option<bool>,
    pub version: i64,
}

impl ExamSession {
    pub fn is_open(&self) -> bool {
        self.submitted_at.is_none()
    }

    /// Effective deadline: the extension if one was granted, else the exam's
    /// own end time.
    pub fn effective_deadline(&self, exam_end_time: DateTime<Utc>) -> DateTime<Utc> {
        self.extended_end_at.unwrap_or(exam_end_time)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub id: Id,
    pub session_id: Id,
    pub question_id: Id,
    pub selected_answer: Option<String>,
    pub text_answer: Option<String>,
    pub marks_awarded: Option<f64>,
    pub grading_comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Ai,
    Browser,
    System,
    Manual,
}

/// Closed vocabulary of proctoring event types, per spec §4.9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    FaceMissing,
    MultipleFaces,
    GazeAway,
    MouthOpen,
    PhoneDetected,
    NotesDetected,
    MultiplePersons,
    AudioSpeech,
    SuspiciousBehavior,
    TabSwitch,
    FullscreenExit,
    CopyPaste,
    IdentityMismatch,
    ManualFlag,
}

impl EventType {
    pub fn source(&self) -> EventSource {
        use EventType::*;
        match self {
            FaceMissing | MultipleFaces | GazeAway | MouthOpen | PhoneDetected | NotesDetected
            | MultiplePersons | AudioSpeech | SuspiciousBehavior => EventSource::Ai,
            TabSwitch | FullscreenExit | CopyPaste => EventSource::Browser,
            IdentityMismatch => EventSource::System,
            ManualFlag => EventSource::Manual,
        }
    }

    /// Parse from the wire vocabulary; unknown values are rejected rather
    /// than silently coerced to `ManualFlag` (spec §4.9).
    pub fn parse(raw: &str) -> Option<Self> {
        use EventType::*;
        Some(match raw {
            "FACE_MISSING" => FaceMissing,
            "MULTIPLE_FACES" => MultipleFaces,
            "GAZE_AWAY" => GazeAway,
            "MOUTH_OPEN" => MouthOpen,
            "PHONE_DETECTED" => PhoneDetected,
            "NOTES_DETECTED" => NotesDetected,
            "MULTIPLE_PERSONS" => MultiplePersons,
            "AUDIO_SPEECH" => AudioSpeech,
            "SUSPICIOUS_BEHAVIOR" => SuspiciousBehavior,
            "TAB_SWITCH" => TabSwitch,
            "FULLSCREEN_EXIT" => FullscreenExit,
            "COPY_PASTE" => CopyPaste,
            "IDENTITY_MISMATCH" => IdentityMismatch,
            "MANUAL_FLAG" => ManualFlag,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        use EventType::*;
        match self {
            FaceMissing => "FACE_MISSING",
            MultipleFaces => "MULTIPLE_FACES",
            GazeAway => "GAZE_AWAY",
            MouthOpen => "MOUTH_OPEN",
            PhoneDetected => "PHONE_DETECTED",
            NotesDetected => "NOTES_DETECTED",
            MultiplePersons => "MULTIPLE_PERSONS",
            AudioSpeech => "AUDIO_SPEECH",
            SuspiciousBehavior => "SUSPICIOUS_BEHAVIOR",
            TabSwitch => "TAB_SWITCH",
            FullscreenExit => "FULLSCREEN_EXIT",
            CopyPaste => "COPY_PASTE",
            IdentityMismatch => "IDENTITY_MISMATCH",
            ManualFlag => "MANUAL_FLAG",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProctoringEvent {
    pub id: Id,
    pub session_id: Id,
    pub event_type: EventType,
    pub severity: Severity,
    pub confidence: Option<f64>,
    pub description: Option<String>,
    pub snapshot_path: Option<String>,
    pub source: EventSource,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Per-session violation counters, one row per `EventType`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViolationCounters {
    pub face_away_count: i64,
    pub multiple_face_count: i64,
    pub gaze_away_count: i64,
    pub mouth_open_count: i64,
    pub phone_detected_count: i64,
    pub notes_detected_count: i64,
    pub multiple_persons_count: i64,
    pub audio_violation_count: i64,
    pub suspicious_behavior_count: i64,
    pub tab_switch_count: i64,
    pub fullscreen_exit_count: i64,
    pub copy_paste_count: i64,
    pub identity_mismatch_count: i64,
    pub manual_flag_count: i64,
}

impl ViolationCounters {
    pub fn increment(&mut self, event_type: EventType) {
        use EventType::*;
        let counter = match event_type {
            FaceMissing => &mut self.face_away_count,
            MultipleFaces => &mut self.multiple_face_count,
            GazeAway => &mut self.gaze_away_count,
            MouthOpen => &mut self.mouth_open_count,
            PhoneDetected => &mut self.phone_detected_count,
            NotesDetected => &mut self.notes_detected_count,
            MultiplePersons => &mut self.multiple_persons_count,
            AudioSpeech => &mut self.audio_violation_count,
            SuspiciousBehavior => &mut self.suspicious_behavior_count,
            TabSwitch => &mut self.tab_switch_count,
            FullscreenExit => &mut self.fullscreen_exit_count,
            CopyPaste => &mut self.copy_paste_count,
            IdentityMismatch => &mut self.identity_mismatch_count,
            ManualFlag => &mut self.manual_flag_count,
        };
        *counter += 1;
    }

    pub fn get(&self, event_type: EventType) -> i64 {
        use EventType::*;
        match event_type {
            FaceMissing => self.face_away_count,
            MultipleFaces => self.multiple_face_count,
            GazeAway => self.gaze_away_count,
            MouthOpen => self.mouth_open_count,
            PhoneDetected => self.phone_detected_count,
            NotesDetected => self.notes_detected_count,
            MultiplePersons => self.multiple_persons_count,
            AudioSpeech => self.audio_violation_count,
            SuspiciousBehavior => self.suspicious_behavior_count,
            TabSwitch => self.tab_switch_count,
            FullscreenExit => self.fullscreen_exit_count,
            CopyPaste => self.copy_paste_count,
            IdentityMismatch => self.identity_mismatch_count,
            ManualFlag => self.manual_flag_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationSummary {
    pub session_id: Id,
    pub risk_score: f64,
    pub counters: ViolationCounters,
    pub proctor_flag: bool,
    pub proctor_note: Option<String>,
}

impl ViolationSummary {
    pub fn empty(session_id: Id) -> Self {
        Self {
            session_id,
            risk_score: 0.0,
            counters: ViolationCounters::default(),
            proctor_flag: false,
            proctor_note: None,
        }
    }

    /// Monotonic, clamped risk update per spec §4.9 step 4.
    pub fn bump_risk(&mut self, candidate: f64) {
        let clamped = candidate.clamp(0.0, 1.0);
        self.risk_score = self.risk_score.max(clamped);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorEvent {
    pub id: Id,
    pub session_id: Id,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: serde_json::Value,
}
