//! TCP command listener and UDP snapshot sender.
//!
//! The frontend connects over TCP and sends framed
//! [`PatientSelect`](rehabsim_types::PatientSelect) and
//! [`ControlCommand`](rehabsim_types::ControlCommand) messages.  Each one is
//! acknowledged with a single `'X'` byte and then applied to the
//! [`Simulator`].  While a connection is open the simulator ticks every
//! `cycle.period_ms` and each snapshot goes out as one UDP datagram to
//! `<peer ip>:<motor_data_port>`.
//!
//! One frontend is served at a time.  Simulator state survives a dropped
//! connection; the next frontend picks up where the last one left off.
//!
//! # Simulated packet loss
//!
//! Inbound patient selections, inbound control messages and outbound
//! snapshots each have their own loss rate and their own RNG, seeded from
//! `network.seed`, `seed + 1` and `seed + 2`.  A dropped inbound message is
//! neither acknowledged nor applied.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rehabsim_runtime::{ControlOutcome, Simulator};
use rehabsim_types::{MotorState, SimError, SnapshotEncoding};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::frame::{FrameDecoder, Inbound, MessageType};
use crate::wire::{WireEncode, WireError};

/// Single acknowledgement byte written before a message is applied.
pub const ACK: u8 = b'X';

const READ_BUF_LEN: usize = 1024;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Wire(#[from] WireError),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] SimError),
}

// ─────────────────────────────────────────────────────────────────────────────
// Packet loss
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct PacketLoss {
    rate: f64,
    rng: StdRng,
}

impl PacketLoss {
    fn new(rate: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self { rate, rng }
    }

    fn drop_next(&mut self) -> bool {
        self.rate > 0.0 && self.rng.r#gen::<f64>() < self.rate
    }
}

#[derive(Debug)]
struct LossModel {
    patient: PacketLoss,
    control: PacketLoss,
    motor_data: PacketLoss,
}

/// Why [`SimServer::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The caller's shutdown future resolved.
    Requested,
    /// The frontend sent an emergency stop.
    EmergencyStop,
}

/// Final state handed back by [`SimServer::run`].
pub struct Stopped {
    pub simulator: Simulator,
    pub reason: StopReason,
}

/// How a served connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionEnd {
    Closed,
    Stop(StopReason),
}

// ─────────────────────────────────────────────────────────────────────────────
// SimServer
// ─────────────────────────────────────────────────────────────────────────────

pub struct SimServer {
    listener: TcpListener,
    udp: UdpSocket,
    simulator: Simulator,
    loss: LossModel,
    motor_data_port: u16,
    encoding: SnapshotEncoding,
    period: Duration,
}

impl SimServer {
    /// Bind the command listener and the snapshot socket using the
    /// simulator's `[network]` settings.
    pub async fn bind(simulator: Simulator) -> Result<Self, ServerError> {
        let network = simulator.config().network.clone();
        let ip = network.bind_addr()?;

        let addr = SocketAddr::new(ip, network.command_port);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        let udp_addr = SocketAddr::new(ip, 0);
        let udp = UdpSocket::bind(udp_addr)
            .await
            .map_err(|source| ServerError::Bind { addr: udp_addr, source })?;

        let seed = network.seed;
        let loss = LossModel {
            patient: PacketLoss::new(network.patient_loss_rate, seed),
            control: PacketLoss::new(network.control_loss_rate, seed.map(|s| s.wrapping_add(1))),
            motor_data: PacketLoss::new(network.motor_data_loss_rate, seed.map(|s| s.wrapping_add(2))),
        };

        Ok(Self {
            listener,
            udp,
            loss,
            motor_data_port: network.motor_data_port,
            encoding: network.snapshot_encoding,
            period: simulator.config().cycle.period(),
            simulator,
        })
    }

    /// Address the command listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    /// Serve frontends until `shutdown` resolves or an emergency stop is
    /// received.  Returns the simulator in its final state and the reason.
    pub async fn run<F>(mut self, shutdown: F) -> Result<Stopped, ServerError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut reason = StopReason::Requested;
        info!(addr = %self.local_addr()?, period_ms = self.period.as_millis() as u64, "command listener ready");

        loop {
            let (stream, peer) = tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "accept error");
                        continue;
                    }
                },
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
            };

            info!(%peer, "frontend connected");
            match self.serve_connection(stream, peer, shutdown.as_mut()).await {
                Ok(ConnectionEnd::Closed) => info!(%peer, "frontend disconnected"),
                Ok(ConnectionEnd::Stop(why)) => {
                    info!(%peer, reason = ?why, "shutting down");
                    reason = why;
                    break;
                }
                Err(ServerError::Wire(e)) => {
                    warn!(%peer, error = %e, "protocol error, dropping connection");
                }
                Err(e) => warn!(%peer, error = %e, "connection error"),
            }
        }

        Ok(Stopped {
            simulator: self.simulator,
            reason,
        })
    }

    async fn serve_connection<F>(
        &mut self,
        mut stream: TcpStream,
        peer: SocketAddr,
        mut shutdown: Pin<&mut F>,
    ) -> Result<ConnectionEnd, ServerError>
    where
        F: Future<Output = ()>,
    {
        let motor_dest = SocketAddr::new(peer.ip(), self.motor_data_port);
        let mut decoder = FrameDecoder::new();
        let mut buf = [0u8; READ_BUF_LEN];
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                // Inbound messages are applied before the next tick.
                biased;

                _ = &mut shutdown => return Ok(ConnectionEnd::Stop(StopReason::Requested)),

                read = stream.read(&mut buf) => {
                    let n = read?;
                    if n == 0 {
                        return Ok(ConnectionEnd::Closed);
                    }
                    decoder.push(&buf[..n]);
                    while let Some(message) = decoder.next_frame()? {
                        if self.handle_message(&mut stream, message).await? == ControlOutcome::Shutdown {
                            return Ok(ConnectionEnd::Stop(StopReason::EmergencyStop));
                        }
                    }
                }

                _ = ticker.tick() => {
                    self.simulator.tick(Instant::now());
                    self.send_snapshot(motor_dest).await;
                }
            }
        }
    }

    async fn handle_message(
        &mut self,
        stream: &mut TcpStream,
        message: Inbound,
    ) -> Result<ControlOutcome, ServerError> {
        let msg_type = message.msg_type();
        let loss = match msg_type {
            MessageType::PatientSelect => &mut self.loss.patient,
            MessageType::Control => &mut self.loss.control,
        };
        if loss.drop_next() {
            debug!(?msg_type, "simulated loss: inbound message dropped");
            return Ok(ControlOutcome::Continue);
        }

        stream.write_all(&[ACK]).await?;

        let now = Instant::now();
        match message {
            Inbound::PatientSelect(patient) => {
                if let Err(e) = self.simulator.select_patient(&patient, now) {
                    warn!(error = %e, "patient selection rejected");
                }
                Ok(ControlOutcome::Continue)
            }
            Inbound::Control(command) => match self.simulator.apply_control(&command, now) {
                Ok(outcome) => Ok(outcome),
                Err(e) => {
                    warn!(error = %e, "control command ignored");
                    Ok(ControlOutcome::Continue)
                }
            },
        }
    }

    async fn send_snapshot(&mut self, dest: SocketAddr) {
        if self.loss.motor_data.drop_next() {
            debug!("simulated loss: snapshot dropped");
            return;
        }
        let payload = match encode_snapshot(self.simulator.snapshot(), self.encoding) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "snapshot encoding failed");
                return;
            }
        };
        if let Err(e) = self.udp.send_to(&payload, dest).await {
            debug!(%dest, error = %e, "snapshot send failed");
        }
    }
}

/// Encode a snapshot for the motor-data channel.
pub fn encode_snapshot(state: &MotorState, encoding: SnapshotEncoding) -> Result<Vec<u8>, ServerError> {
    match encoding {
        SnapshotEncoding::Binary => Ok(state.to_wire()?),
        SnapshotEncoding::Json => Ok(serde_json::to_vec(state)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encode_frame;
    use crate::wire::WireDecode;
    use rehabsim_runtime::SessionState;
    use rehabsim_types::{ControlCommand, PatientSelect, SimulatorConfig};
    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(2);

    fn test_config(motor_data_port: u16) -> SimulatorConfig {
        let mut config = SimulatorConfig::default();
        config.network.bind_ip = "127.0.0.1".into();
        config.network.command_port = 0;
        config.network.motor_data_port = motor_data_port;
        config.network.seed = Some(7);
        config.logging.enabled = false;
        config.cycle.period_ms = 10;
        config
    }

    async fn spawn_server(
        config: SimulatorConfig,
    ) -> (SocketAddr, oneshot::Sender<()>, JoinHandle<Result<Stopped, ServerError>>) {
        let server = SimServer::bind(Simulator::new(config, Instant::now())).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.run(async move {
            let _ = rx.await;
        }));
        (addr, tx, handle)
    }

    fn patient_frame(task: u8) -> Vec<u8> {
        let patient = PatientSelect {
            left_hand: true,
            task,
            subject_nr: "S01".into(),
            date_time: "2024-05-01 09:30".into(),
        };
        encode_frame(MessageType::PatientSelect, &patient.to_wire().unwrap()).unwrap()
    }

    fn control_frame(cmd: ControlCommand) -> Vec<u8> {
        encode_frame(MessageType::Control, &cmd.to_wire().unwrap()).unwrap()
    }

    async fn expect_ack(stream: &mut TcpStream) {
        let mut ack = [0u8; 1];
        timeout(WAIT, stream.read_exact(&mut ack)).await.unwrap().unwrap();
        assert_eq!(ack[0], ACK);
    }

    #[tokio::test]
    async fn session_over_loopback() {
        let frontend_udp = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = frontend_udp.local_addr().unwrap().port();
        let (addr, _tx, handle) = spawn_server(test_config(port)).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(&patient_frame(1)).await.unwrap();
        expect_ack(&mut stream).await;
        stream
            .write_all(&control_frame(ControlCommand {
                start: true,
                ..ControlCommand::default()
            }))
            .await
            .unwrap();
        expect_ack(&mut stream).await;

        // Snapshots sent before the selection was applied carry the right hand.
        let snapshot = timeout(WAIT, async {
            let mut datagram = [0u8; 64];
            loop {
                let n = frontend_udp.recv(&mut datagram).await.unwrap();
                let snapshot = MotorState::from_wire(&datagram[..n]).unwrap();
                if snapshot.left_hand {
                    return snapshot;
                }
            }
        })
        .await
        .unwrap();
        // Force measures from the neutral position.
        assert!(!snapshot.finished);
        assert_eq!(snapshot.trial_nr, 1);
        assert_eq!(snapshot.starting_position, 0.0);

        stream
            .write_all(&control_frame(ControlCommand {
                emergency_stop: true,
                ..ControlCommand::default()
            }))
            .await
            .unwrap();
        expect_ack(&mut stream).await;

        let stopped = timeout(WAIT, handle).await.unwrap().unwrap().unwrap();
        assert_eq!(stopped.reason, StopReason::EmergencyStop);
        assert_eq!(stopped.simulator.session_state(), SessionState::WaitingForPatient);
    }

    #[tokio::test]
    async fn protocol_error_drops_connection_but_keeps_serving() {
        let (addr, tx, handle) = spawn_server(test_config(9)).await;

        let mut bad = TcpStream::connect(addr).await.unwrap();
        bad.write_all(&[9, 0, 1, 0]).await.unwrap();
        let mut buf = [0u8; 1];
        let n = timeout(WAIT, bad.read(&mut buf)).await.unwrap().unwrap_or(0);
        assert_eq!(n, 0);

        let mut good = TcpStream::connect(addr).await.unwrap();
        good.write_all(&patient_frame(7)).await.unwrap();
        expect_ack(&mut good).await;
        drop(good);

        tx.send(()).unwrap();
        let stopped = timeout(WAIT, handle).await.unwrap().unwrap().unwrap();
        assert_eq!(stopped.reason, StopReason::Requested);
        assert_eq!(stopped.simulator.session_state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn dropped_control_is_not_acknowledged() {
        let mut config = test_config(9);
        config.network.control_loss_rate = 1.0;
        let (addr, tx, handle) = spawn_server(config).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(&patient_frame(1)).await.unwrap();
        expect_ack(&mut stream).await;
        stream
            .write_all(&control_frame(ControlCommand {
                start: true,
                ..ControlCommand::default()
            }))
            .await
            .unwrap();
        let mut ack = [0u8; 1];
        assert!(
            timeout(Duration::from_millis(200), stream.read_exact(&mut ack))
                .await
                .is_err()
        );
        drop(stream);

        tx.send(()).unwrap();
        let stopped = timeout(WAIT, handle).await.unwrap().unwrap().unwrap();
        assert_eq!(stopped.reason, StopReason::Requested);
        assert_eq!(stopped.simulator.session_state(), SessionState::Ready);
    }

    #[test]
    fn packet_loss_extremes() {
        let mut never = PacketLoss::new(0.0, Some(1));
        let mut always = PacketLoss::new(1.0, Some(1));
        for _ in 0..100 {
            assert!(!never.drop_next());
            assert!(always.drop_next());
        }
    }

    #[test]
    fn seeded_loss_is_reproducible() {
        let mut a = PacketLoss::new(0.5, Some(42));
        let mut b = PacketLoss::new(0.5, Some(42));
        let seq_a: Vec<bool> = (0..32).map(|_| a.drop_next()).collect();
        let seq_b: Vec<bool> = (0..32).map(|_| b.drop_next()).collect();
        assert_eq!(seq_a, seq_b);
        assert!(seq_a.contains(&true) && seq_a.contains(&false));
    }

    #[test]
    fn json_snapshot_uses_field_names() {
        let bytes = encode_snapshot(&MotorState::new(true), SnapshotEncoding::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["StartingPosition"], 30.0);
        assert_eq!(value["LeftHand"], true);
    }
}
