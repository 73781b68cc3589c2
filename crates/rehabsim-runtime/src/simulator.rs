//! [`Simulator`] – the tick-driven orchestrator.
//!
//! Owns the [`MotorState`], the active [`Task`], the [`InputHandler`] and the
//! raw input source, and runs the session state machine:
//!
//! ```text
//!                  patient select                 Start
//! WaitingForPatient ─────────────▶ Ready ─────────────────▶ Running ─┐ Start
//!        ▲                           ▲                         │  ◀──┘
//!        │ Restart / Close           │ patient select          │ task finished
//!        └───────────────────────────┴─────────── Finished ◀───┘
//! ```
//!
//! A patient selection is accepted in every state and always starts a new
//! session.  `EmergencyStop` resets everything and asks the caller to shut
//! down.
//!
//! Every [`Simulator::tick`]:
//!
//! 1. feeds the raw input into the input handler with the elapsed `dt`,
//! 2. integrates `velocity · dt` into the position and clamps it,
//! 3. lets the active task update,
//! 4. retires the task once it reports finished while running,
//! 5. stamps the session time and emits a log row every `cadence` ticks.

use std::fmt;
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rehabsim_hal::source::from_method;
use rehabsim_hal::{InputHandler, InputSource};
use rehabsim_tasks::{Task, TaskContext, factory};
use rehabsim_types::{
    ControlAction, ControlCommand, MotionLimits, MotorState, PatientSelect, SimError, SimulatorConfig,
};
use tracing::{Span, debug, info};
use uuid::Uuid;

use crate::log_sink::{LogRow, LogSink, SessionInfo};

// ─────────────────────────────────────────────────────────────────────────────
// Session state
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    WaitingForPatient,
    Ready,
    Running,
    Finished,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What the caller should do after a control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    Continue,
    /// `EmergencyStop` was received; state has been reset.
    Shutdown,
}

struct ActiveSession {
    id: Uuid,
    span: Span,
}

// ─────────────────────────────────────────────────────────────────────────────
// Simulator
// ─────────────────────────────────────────────────────────────────────────────

pub struct Simulator {
    config: SimulatorConfig,
    motor: MotorState,
    input: InputHandler,
    source: Box<dyn InputSource>,
    task: Option<Task>,
    state: SessionState,
    session: Option<ActiveSession>,
    log_sink: Option<Box<dyn LogSink>>,
    rng: StdRng,
    frontend_started: bool,
    /// Hand of the most recent patient; resets keep it.
    left_hand: bool,
    last_tick: Option<Instant>,
    session_start: Instant,
    cycle_counter: u32,
    last_velocity: f64,
}

impl Simulator {
    pub fn new(config: SimulatorConfig, now: Instant) -> Self {
        let rng = config
            .network
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let source = from_method(&config.input.method);
        let input = InputHandler::new(config.limits.clone(), config.input.velocity_profile);
        info!(source = source.name(), profile = ?config.input.velocity_profile, "simulator created");
        Self {
            motor: MotorState::default(),
            input,
            source,
            task: None,
            state: SessionState::WaitingForPatient,
            session: None,
            log_sink: None,
            rng,
            frontend_started: false,
            left_hand: false,
            last_tick: None,
            session_start: now,
            cycle_counter: 0,
            last_velocity: 0.0,
            config,
        }
    }

    /// Attach the sink that receives session log rows.
    pub fn with_log_sink(mut self, sink: Box<dyn LogSink>) -> Self {
        self.log_sink = Some(sink);
        self
    }

    /// Replace the raw input source.
    pub fn set_input_source(&mut self, source: Box<dyn InputSource>) {
        debug!(source = source.name(), "input source replaced");
        self.source = source;
    }

    // ────────────────────────────────────────────────────────────────────────
    // Inbound events
    // ────────────────────────────────────────────────────────────────────────

    /// Start a new session for `patient`, whatever the current state.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownTaskType`] when the task tag is not recognised; the
    /// simulator is then reset and waits for another selection.
    pub fn select_patient(&mut self, patient: &PatientSelect, now: Instant) -> Result<(), SimError> {
        self.left_hand = patient.left_hand;
        self.reset(now);
        let task_type = match patient.task_type() {
            Ok(t) => t,
            Err(e) => {
                self.goto(SessionState::WaitingForPatient);
                return Err(e);
            }
        };

        let task = factory::create(task_type, &self.config.tasks, &mut self.motor, &mut self.rng);
        self.input.begin_task(task_type);
        self.task = Some(task);

        let id = Uuid::new_v4();
        let span = tracing::info_span!(
            "session",
            session_id = %id,
            task = %task_type,
            left_hand = patient.left_hand
        );
        span.in_scope(|| {
            info!(subject = %patient.subject_nr, date_time = %patient.date_time, "patient selected");
        });
        if self.config.logging.enabled
            && let Some(sink) = self.log_sink.as_mut()
        {
            sink.begin_session(&SessionInfo {
                id,
                task: task_type,
                left_hand: patient.left_hand,
                subject_nr: patient.subject_nr.clone(),
                date_time: patient.date_time.clone(),
            });
        }
        self.session = Some(ActiveSession { id, span });
        self.goto(SessionState::Ready);
        Ok(())
    }

    /// Apply a control command from the frontend.
    ///
    /// # Errors
    ///
    /// [`SimError::IllegalTransition`] when the command is not allowed in the
    /// current state; nothing is changed.
    pub fn apply_control(&mut self, command: &ControlCommand, now: Instant) -> Result<ControlOutcome, SimError> {
        let Some(action) = command.action() else {
            return Ok(ControlOutcome::Continue);
        };
        let _entered = self.session.as_ref().map(|s| s.span.clone().entered());
        debug!(%action, state = %self.state, "control received");
        match action {
            ControlAction::EmergencyStop => {
                tracing::error!("emergency stop");
                self.reset(now);
                self.goto(SessionState::WaitingForPatient);
                Ok(ControlOutcome::Shutdown)
            }
            ControlAction::Restart | ControlAction::Close => {
                self.reset(now);
                self.goto(SessionState::WaitingForPatient);
                Ok(ControlOutcome::Continue)
            }
            ControlAction::Start => {
                if !matches!(self.state, SessionState::Ready | SessionState::Running) {
                    return Err(self.illegal(action));
                }
                if let Some(task) = self.task.as_mut() {
                    let mut ctx = TaskContext::new(&mut self.motor, &mut self.input, now);
                    task.on_start(&mut ctx);
                }
                self.last_tick = Some(now);
                self.goto(SessionState::Running);
                Ok(ControlOutcome::Continue)
            }
            ControlAction::FrontendStarted => {
                if self.state != SessionState::Running {
                    return Err(self.illegal(action));
                }
                info!("frontend started");
                self.frontend_started = true;
                Ok(ControlOutcome::Continue)
            }
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Tick
    // ────────────────────────────────────────────────────────────────────────

    /// Advance the simulation to `now`, sampling the configured input source.
    pub fn tick(&mut self, now: Instant) {
        let raw_input = self.source.sample(now);
        self.step(raw_input, now);
    }

    /// Advance the simulation to `now` with an explicit raw input.
    pub fn step(&mut self, raw_input: f64, now: Instant) {
        let _entered = self.session.as_ref().map(|s| s.span.clone().entered());
        let dt = self
            .last_tick
            .map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f64());
        self.last_tick = Some(now);

        self.input.update(&self.motor, raw_input, dt, now);
        self.last_velocity = self.input.velocity();
        self.motor.force = self.input.force();
        if dt > 0.0 {
            self.motor.position = clamp_to_limits(&self.config.limits, self.motor.position + self.last_velocity * dt);
        }

        if let Some(task) = self.task.as_mut() {
            let mut ctx = TaskContext::new(&mut self.motor, &mut self.input, now);
            task.on_update(&mut ctx);
            self.motor.position = clamp_to_limits(&self.config.limits, self.motor.position);

            if task.is_finished() && self.state == SessionState::Running {
                info!(task = %task.task_type(), "task finished");
                self.input.finish_task();
                self.task = None;
                self.motor = MotorState::finished(self.left_hand);
                self.goto(SessionState::Finished);
            }
        }

        let elapsed_ms = now.saturating_duration_since(self.session_start).as_millis();
        self.motor.time = elapsed_ms as f64 / 1000.0;
        self.frontend_started &= self.motor.target_state;

        self.log_row();
    }

    fn log_row(&mut self) {
        if self.session.is_none() || !self.config.logging.enabled {
            return;
        }
        let Some(sink) = self.log_sink.as_mut() else {
            return;
        };
        self.cycle_counter += 1;
        if self.cycle_counter >= self.config.logging.cadence {
            self.cycle_counter = 0;
            sink.record(&LogRow::capture(&self.motor, self.frontend_started, self.last_velocity));
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Accessors
    // ────────────────────────────────────────────────────────────────────────

    /// The state to publish to the frontend.
    pub fn snapshot(&self) -> &MotorState {
        &self.motor
    }

    pub fn session_state(&self) -> SessionState {
        self.state
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.id)
    }

    pub fn task(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    pub fn input(&self) -> &InputHandler {
        &self.input
    }

    pub fn frontend_started(&self) -> bool {
        self.frontend_started
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    // ────────────────────────────────────────────────────────────────────────
    // Internal helpers
    // ────────────────────────────────────────────────────────────────────────

    fn reset(&mut self, now: Instant) {
        self.motor = MotorState::new(self.left_hand);
        self.task = None;
        self.session = None;
        self.cycle_counter = 0;
        self.frontend_started = false;
        self.session_start = now;
        self.input.finish_task();
    }

    fn goto(&mut self, next: SessionState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "session state transition");
            self.state = next;
        }
    }

    fn illegal(&self, action: ControlAction) -> SimError {
        SimError::IllegalTransition {
            action: action.to_string(),
            state: self.state.to_string(),
        }
    }
}

fn clamp_to_limits(limits: &MotionLimits, position: f64) -> f64 {
    MotorState::clamp_position(position, limits.min_position, limits.max_position)
}

impl fmt::Debug for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulator")
            .field("state", &self.state)
            .field("task", &self.task.as_ref().map(Task::task_type))
            .field("motor", &self.motor)
            .finish_non_exhaustive()
    }
}
