//! Serial relay ingress over TCP
//!
//! The relay forwards whatever the ground receiver prints on its serial port,
//! one JSON object per line, tagged by `type`:
//!
//! ```text
//! {"type":"status","connected":true}
//! {"type":"inertial","accelerometer":{"x":{"value":0.01},...},"gyroscope":{...}}
//! {"type":"full","barometric":{...},"gps":{...},"inertial":{...},"air_quality":{...},"environmental":{...}}
//! ```
//!
//! Numeric leaves may be numbers, numeric strings, or `{"value": ...}`
//! wrappers. Anything missing or unparseable at the leaf level reads as 0.
//! Commands go the other way as single JSON lines.

use anyhow::Result;
use cst_core::error::FrameError;
use cst_core::ingress::*;
use serde_json::Value;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Longest relay line accepted, newline included
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

// =============================================================================
// Frame parsing
// =============================================================================

/// Parse one relay line into an ingress event
pub fn parse_frame(line: &str) -> Result<IngressEvent, FrameError> {
    let value: Value = serde_json::from_str(line.trim())?;
    let obj = value.as_object().ok_or(FrameError::NotAnObject)?;
    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or(FrameError::MissingType)?;

    match kind {
        "status" => Ok(IngressEvent::Status {
            connected: flag(obj.get("connected")),
        }),
        "inertial" => Ok(IngressEvent::Inertial(inertial(&value))),
        "full" => Ok(IngressEvent::Full(full(&value))),
        other => Err(FrameError::UnknownType(other.to_string())),
    }
}

/// Leaf value as a finite float, 0 otherwise
fn number(value: Option<&Value>) -> f64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        Some(Value::Object(o)) => return number(o.get("value")),
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

fn flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.trim(), "true" | "1"),
        other => number(other) != 0.0,
    }
}

fn at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| v.get(key))
}

fn num(value: &Value, path: &[&str]) -> f64 {
    number(at(value, path))
}

fn vector(value: &Value, key: &str) -> Vector3 {
    Vector3::new(
        num(value, &[key, "x"]),
        num(value, &[key, "y"]),
        num(value, &[key, "z"]),
    )
}

fn inertial(value: &Value) -> InertialFrame {
    InertialFrame {
        accelerometer: vector(value, "accelerometer"),
        gyroscope: vector(value, "gyroscope"),
    }
}

fn full(value: &Value) -> FullFrame {
    let empty = Value::Null;
    let imu = value.get("inertial").unwrap_or(&empty);
    FullFrame {
        barometric: BarometricFrame {
            temperature: num(value, &["barometric", "temperature"]),
            pressure: num(value, &["barometric", "pressure"]),
            altitude: num(value, &["barometric", "altitude"]),
        },
        gps: GpsFrame {
            latitude: num(value, &["gps", "latitude"]),
            longitude: num(value, &["gps", "longitude"]),
            altitude: num(value, &["gps", "altitude"]),
            satellites: num(value, &["gps", "satellites"]),
        },
        inertial: inertial(imu),
        air_quality: AirQualityFrame {
            co2: num(value, &["air_quality", "co2"]),
            temperature: num(value, &["air_quality", "temperature"]),
            humidity: num(value, &["air_quality", "humidity"]),
        },
        environmental: EnvironmentalFrame {
            temperature: num(value, &["environmental", "temperature"]),
            humidity: num(value, &["environmental", "humidity"]),
            uv_index: num(value, &["environmental", "uv_index"]),
        },
    }
}

/// Command line sent to the relay
fn command_line(command: &str, scope: Option<IngressScope>) -> String {
    let mut cmd = serde_json::json!({ "command": command });
    if let Some(scope) = scope {
        cmd["scope"] = serde_json::json!(scope);
    }
    format!("{}\n", cmd)
}

// =============================================================================
// TcpRelayLink
// =============================================================================

/// Hardware link to a relay listening on TCP
pub struct TcpRelayLink {
    address: String,
}

impl TcpRelayLink {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl HardwareLink for TcpRelayLink {
    fn name(&self) -> &str {
        "tcp-relay"
    }

    fn open(&self, scope: IngressScope) -> Result<IngressSubscription> {
        let runtime = tokio::runtime::Handle::try_current()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let release = CancellationToken::new();

        runtime.spawn(run_session(
            self.address.clone(),
            scope,
            tx,
            release.clone(),
        ));

        Ok(IngressSubscription::new(rx, release))
    }
}

enum SessionEnd {
    Released,
    Closed,
}

/// Connect, stream, reconnect; until released
async fn run_session(
    address: String,
    scope: IngressScope,
    tx: mpsc::UnboundedSender<IngressEvent>,
    release: CancellationToken,
) {
    info!("Opening {:?} hardware session via {}", scope, address);

    loop {
        let connected = tokio::select! {
            _ = release.cancelled() => break,
            result = TcpStream::connect(&address) => result,
        };

        match connected {
            Ok(stream) => {
                info!("Relay {} connected", address);
                if tx.send(IngressEvent::Status { connected: true }).is_err() {
                    break;
                }
                match stream_frames(stream, scope, &tx, &release).await {
                    Ok(SessionEnd::Released) => break,
                    Ok(SessionEnd::Closed) => warn!("Relay {} closed the connection", address),
                    Err(e) => warn!("Relay {} connection error: {}", address, e),
                }
            }
            Err(e) => warn!("Relay {} unreachable: {}", address, e),
        }

        if tx.send(IngressEvent::Status { connected: false }).is_err() {
            break;
        }

        tokio::select! {
            _ = release.cancelled() => break,
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
        }
    }

    debug!("Hardware session via {} released", address);
}

async fn stream_frames(
    stream: TcpStream,
    scope: IngressScope,
    tx: &mpsc::UnboundedSender<IngressEvent>,
    release: &CancellationToken,
) -> Result<SessionEnd> {
    let (read, mut write) = stream.into_split();
    write
        .write_all(command_line("start", Some(scope)).as_bytes())
        .await?;

    let mut reader = BufReader::new(read);
    let mut buf = Vec::with_capacity(1024);
    loop {
        buf.clear();
        let read = tokio::select! {
            _ = release.cancelled() => {
                // Best effort; the relay also stops when the socket closes
                let _ = write.write_all(command_line("stop", None).as_bytes()).await;
                return Ok(SessionEnd::Released);
            }
            read = read_line(&mut reader, &mut buf) => read?,
        };

        match read {
            LineRead::Eof => return Ok(SessionEnd::Closed),
            LineRead::Oversized => {
                warn!("Dropping frame longer than {} bytes", MAX_FRAME_BYTES);
                continue;
            }
            LineRead::Line => {}
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                warn!(
                    "Dropping frame that is not UTF-8 ({}): {:?}",
                    e,
                    String::from_utf8_lossy(&buf)
                );
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_frame(line) {
            Ok(event) => {
                if tx.send(event).is_err() {
                    return Ok(SessionEnd::Released);
                }
            }
            Err(e) => warn!("Dropping malformed frame ({}): {}", e, line.trim_end()),
        }
    }
}

#[derive(Debug, PartialEq)]
enum LineRead {
    Line,
    Oversized,
    Eof,
}

/// Read one newline-terminated line into `buf`, at most [`MAX_FRAME_BYTES`].
///
/// A longer line is consumed up to its newline and reported as
/// `Oversized`; `buf` then holds only its tail.
async fn read_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    let limit = MAX_FRAME_BYTES as u64;
    let n = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
    if n == 0 {
        return Ok(LineRead::Eof);
    }
    if n < MAX_FRAME_BYTES || buf.last() == Some(&b'\n') {
        return Ok(LineRead::Line);
    }

    loop {
        buf.clear();
        let n = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
        if n == 0 || buf.last() == Some(&b'\n') {
            return Ok(LineRead::Oversized);
        }
    }
}
