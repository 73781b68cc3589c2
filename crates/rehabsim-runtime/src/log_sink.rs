//! Session log sinks.
//!
//! While a patient session is active the simulator hands one [`LogRow`]
//! every `logging.cadence` ticks to its [`LogSink`].

use std::sync::{Arc, Mutex};

use rehabsim_types::{MotorState, RomState, TaskType};
use uuid::Uuid;

/// Identity of a patient session, announced once before its first row.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub id: Uuid,
    pub task: TaskType,
    pub left_hand: bool,
    pub subject_nr: String,
    pub date_time: String,
}

/// One sampled row of a session log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRow {
    /// Seconds since the session started.
    pub elapsed_secs: f64,
    pub position: f64,
    pub target_position: f64,
    pub frontend_started: bool,
    pub trial_nr: u32,
    /// Velocity the input handler applied on this tick, °/s.
    pub velocity: f64,
    pub starting_position: f64,
    pub left_hand: bool,
    pub force: f64,
    pub rom_state: RomState,
}

impl LogRow {
    pub fn capture(motor: &MotorState, frontend_started: bool, velocity: f64) -> Self {
        Self {
            elapsed_secs: motor.time,
            position: motor.position,
            target_position: motor.target_position,
            frontend_started,
            trial_nr: motor.trial_nr,
            velocity,
            starting_position: motor.starting_position,
            left_hand: motor.left_hand,
            force: motor.force,
            rom_state: motor.rom_state,
        }
    }
}

pub trait LogSink: Send {
    fn begin_session(&mut self, session: &SessionInfo);

    fn record(&mut self, row: &LogRow);
}

// ────────────────────────────────────────────────────────────────────────────
// TracingLogSink
// ────────────────────────────────────────────────────────────────────────────

/// Emits every row as a structured `tracing` event on the
/// `rehabsim::session_log` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn begin_session(&mut self, session: &SessionInfo) {
        tracing::info!(
            target: "rehabsim::session_log",
            session_id = %session.id,
            task = %session.task,
            left_hand = session.left_hand,
            subject = %session.subject_nr,
            date_time = %session.date_time,
            "session log opened"
        );
    }

    fn record(&mut self, row: &LogRow) {
        tracing::info!(
            target: "rehabsim::session_log",
            t = row.elapsed_secs,
            position = row.position,
            target_position = row.target_position,
            frontend_started = row.frontend_started,
            trial = row.trial_nr,
            velocity = row.velocity,
            starting_position = row.starting_position,
            left_hand = row.left_hand,
            force = row.force,
            rom_state = u8::from(row.rom_state),
        );
    }
}

// ────────────────────────────────────────────────────────────────────────────
// MemoryLogSink
// ────────────────────────────────────────────────────────────────────────────

/// Keeps everything in memory.  Clones share the same buffers, so a clone
/// kept outside the simulator can inspect what was logged.
#[derive(Debug, Default, Clone)]
pub struct MemoryLogSink {
    sessions: Arc<Mutex<Vec<SessionInfo>>>,
    rows: Arc<Mutex<Vec<LogRow>>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> Vec<SessionInfo> {
        self.sessions.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn rows(&self) -> Vec<LogRow> {
        self.rows.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl LogSink for MemoryLogSink {
    fn begin_session(&mut self, session: &SessionInfo) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.push(session.clone());
        }
    }

    fn record(&mut self, row: &LogRow) {
        if let Ok(mut rows) = self.rows.lock() {
            rows.push(row.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_captures_motor_state() {
        let mut motor = MotorState::new(false);
        motor.position = -12.5;
        motor.time = 1.234;
        motor.force = 3.0;
        motor.trial_nr = 4;
        let row = LogRow::capture(&motor, true, -40.0);
        assert_eq!(row.elapsed_secs, 1.234);
        assert_eq!(row.position, -12.5);
        assert_eq!(row.starting_position, -30.0);
        assert_eq!(row.velocity, -40.0);
        assert!(row.frontend_started);
        assert!(!row.left_hand);
    }

    #[test]
    fn memory_sink_clones_share_buffers() {
        let sink = MemoryLogSink::new();
        let mut writer: Box<dyn LogSink> = Box::new(sink.clone());
        writer.begin_session(&SessionInfo {
            id: Uuid::new_v4(),
            task: TaskType::Force,
            left_hand: true,
            subject_nr: "S01".into(),
            date_time: "2024-01-01 10:00".into(),
        });
        writer.record(&LogRow::capture(&MotorState::new(true), false, 0.0));
        assert_eq!(sink.sessions().len(), 1);
        assert_eq!(sink.rows().len(), 1);
    }

    #[test]
    fn tracing_sink_accepts_rows_without_subscriber() {
        let mut sink = TracingLogSink;
        sink.record(&LogRow::capture(&MotorState::new(true), false, 0.0));
    }
}
