//! udp_tx.rs — UDP transmitter for telemetry envelopes
//!
//! One JSON `TelemetryEvent` per datagram, sent to the verifier's listener
//! (default 127.0.0.1:14600). Send errors are logged and the sim keeps flying.

use std::net::UdpSocket;

use flight_test_types::TelemetryEvent;
use tracing::{debug, warn};

pub struct TelemetryTransmitter {
    socket: UdpSocket,
    target_addr: String,
}

impl TelemetryTransmitter {
    pub fn new(target_addr: &str) -> Result<Self, std::io::Error> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(false)?;
        Ok(Self { socket, target_addr: target_addr.to_string() })
    }

    /// Returns false when the envelope could not be sent.
    pub fn send(&self, event: &TelemetryEvent) -> bool {
        let bytes = match serde_json::to_vec(event) {
            Ok(b) => b,
            Err(e) => {
                warn!("UDP: serialize failed: {e}");
                return false;
            }
        };

        match self.socket.send_to(&bytes, &self.target_addr) {
            Ok(_) => {
                if let TelemetryEvent::WaypointReached { label } = event {
                    debug!("UDP → {} waypoint reached {:?}", self.target_addr, label);
                }
                true
            }
            Err(e) => {
                warn!("UDP: send to {} failed: {e}", self.target_addr);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flight_test_types::VelocitySample;

    #[test]
    fn envelope_arrives_as_json() {
        let rx = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = rx.local_addr().unwrap().to_string();
        let tx = TelemetryTransmitter::new(&addr).unwrap();

        let event = TelemetryEvent::Velocity(VelocitySample { vx: 1.5, vy: -0.5 });
        assert!(tx.send(&event));

        let mut buf = [0u8; 512];
        let len = rx.recv(&mut buf).unwrap();
        let decoded: TelemetryEvent = serde_json::from_slice(&buf[..len]).unwrap();
        assert_eq!(decoded, event);
    }
}
