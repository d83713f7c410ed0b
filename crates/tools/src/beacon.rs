//! Repeated transmission of one message

use anyhow::Result;
use aprskiss_frame::packet::PacketAssembler;
use std::thread;
use std::time::Duration;
use tracing::info;

use crate::config::BeaconConfig;
use crate::ptt::{NoPtt, PttGuard, PttLine, SysfsGpio};
use crate::transport::{PacketSink, TcpKissSink};

/// Waits out the PTT hold after each send
pub type Sleeper = Box<dyn FnMut(Duration)>;

/// Sends one message `repeat` times, keying PTT around each send
pub struct Beacon<S, P> {
    assembler: PacketAssembler,
    sink: S,
    ptt: P,
    sleeper: Sleeper,
    repeat: u32,
    hold: Duration,
}

impl<S: PacketSink, P: PttLine> Beacon<S, P> {
    pub fn new(assembler: PacketAssembler, sink: S, ptt: P) -> Self {
        Self {
            assembler,
            sink,
            ptt,
            sleeper: Box::new(thread::sleep),
            repeat: 1,
            hold: Duration::ZERO,
        }
    }

    /// Set how many times each message is sent
    pub fn repeat(mut self, repeat: u32) -> Self {
        self.repeat = repeat;
        self
    }

    /// Set how long PTT stays keyed after each send
    pub fn hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }

    /// Replace the hold timer, `thread::sleep` by default
    pub fn sleeper(mut self, sleeper: impl FnMut(Duration) + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    /// Transmit `message`, returning the number of packets sent
    ///
    /// The packet is assembled once up front, so an invalid message fails
    /// before anything is keyed or sent.
    pub fn transmit(&mut self, message: &str) -> Result<u32> {
        let packet = self.assembler.assemble(message)?;

        for n in 1..=self.repeat {
            let _ptt = PttGuard::new(&mut self.ptt)?;
            self.sink.send(&packet)?;
            info!(
                "Packet {}/{} from {}: {:?}",
                n,
                self.repeat,
                self.assembler.source(),
                message
            );
            // PTT stays keyed until the modem has finished sending
            (self.sleeper)(self.hold);
        }

        Ok(self.repeat)
    }

    pub fn into_parts(self) -> (S, P) {
        (self.sink, self.ptt)
    }
}

impl Beacon<TcpKissSink, Box<dyn PttLine>> {
    /// Wire a beacon up from configuration
    pub fn from_config(config: &BeaconConfig) -> Result<Self> {
        config.validate()?;

        let assembler =
            PacketAssembler::new(config.source, config.destination).port(config.tnc_port);
        let sink = TcpKissSink::new(config.kiss_addr(), config.connect_timeout());
        let ptt: Box<dyn PttLine> = match config.ptt_pin {
            Some(pin) => Box::new(SysfsGpio::open(&config.gpio_root, pin)?),
            None => Box::new(NoPtt),
        };

        Ok(Self::new(assembler, sink, ptt)
            .repeat(config.repeat)
            .hold(config.hold()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aprskiss_core::PacketError;
    use aprskiss_frame::kiss;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default, Clone)]
    struct Log(Rc<RefCell<Vec<String>>>);

    impl Log {
        fn push(&self, event: impl Into<String>) {
            self.0.borrow_mut().push(event.into());
        }

        fn events(&self) -> Vec<String> {
            self.0.borrow().clone()
        }
    }

    struct RecordingSink {
        log: Log,
        packets: Vec<Vec<u8>>,
    }

    impl PacketSink for RecordingSink {
        fn send(&mut self, packet: &[u8]) -> Result<()> {
            self.log.push("send");
            self.packets.push(packet.to_vec());
            Ok(())
        }
    }

    struct RecordingPtt(Log);

    impl PttLine for RecordingPtt {
        fn key(&mut self) -> Result<()> {
            self.0.push("key");
            Ok(())
        }

        fn unkey(&mut self) -> Result<()> {
            self.0.push("unkey");
            Ok(())
        }
    }

    struct FailingSink;

    impl PacketSink for FailingSink {
        fn send(&mut self, _packet: &[u8]) -> Result<()> {
            anyhow::bail!("connection refused")
        }
    }

    fn assembler() -> PacketAssembler {
        PacketAssembler::new("KQ4FYU-1".parse().unwrap(), "APRS".parse().unwrap())
    }

    #[test]
    fn test_transmit_repeats_with_ptt() {
        let log = Log::default();
        let sink = RecordingSink {
            log: log.clone(),
            packets: Vec::new(),
        };
        let mut beacon = Beacon::new(assembler(), sink, RecordingPtt(log.clone())).repeat(3);

        assert_eq!(beacon.transmit("!Highest apogee = 123.4").unwrap(), 3);
        assert_eq!(
            log.events(),
            ["key", "send", "unkey", "key", "send", "unkey", "key", "send", "unkey"]
        );

        let (sink, _) = beacon.into_parts();
        assert_eq!(sink.packets.len(), 3);
        assert!(sink.packets.iter().all(|p| p == &sink.packets[0]));
        assert_eq!(
            kiss::decode(&sink.packets[0]).unwrap()[16..],
            *b"!Highest apogee = 123.4"
        );
    }

    #[test]
    fn test_hold_follows_each_send_while_keyed() {
        let log = Log::default();
        let sink = RecordingSink {
            log: log.clone(),
            packets: Vec::new(),
        };
        let sleeps = log.clone();
        let mut beacon = Beacon::new(assembler(), sink, RecordingPtt(log.clone()))
            .repeat(2)
            .hold(Duration::from_secs(15))
            .sleeper(move |d| sleeps.push(format!("sleep {}s", d.as_secs())));

        assert_eq!(beacon.transmit("!Highest apogee = 123.4").unwrap(), 2);
        assert_eq!(
            log.events(),
            ["key", "send", "sleep 15s", "unkey", "key", "send", "sleep 15s", "unkey"]
        );
    }

    #[test]
    fn test_from_config_uses_configured_hold() {
        let mut config = BeaconConfig::default();
        config.hold_secs = 7;

        let beacon = Beacon::from_config(&config).unwrap();
        assert_eq!(beacon.hold, Duration::from_secs(7));
    }

    #[test]
    fn test_invalid_message_sends_nothing() {
        let log = Log::default();
        let sink = RecordingSink {
            log: log.clone(),
            packets: Vec::new(),
        };
        let mut beacon = Beacon::new(assembler(), sink, RecordingPtt(log.clone())).repeat(2);

        let err = beacon.transmit("höhe").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PacketError>(),
            Some(PacketError::PayloadEncoding { position: 1, .. })
        ));
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_ptt_released_on_send_failure() {
        let log = Log::default();
        let mut beacon = Beacon::new(assembler(), FailingSink, RecordingPtt(log.clone())).repeat(5);

        assert!(beacon.transmit("test").is_err());
        assert_eq!(log.events(), ["key", "unkey"]);
    }

    #[test]
    fn test_from_config_without_ptt() {
        let mut config = BeaconConfig::default();
        config.repeat = 2;
        config.hold_secs = 0;

        let beacon = Beacon::from_config(&config).unwrap();
        assert_eq!(beacon.repeat, 2);
        assert_eq!(beacon.hold, Duration::ZERO);
    }

    #[test]
    fn test_beacon_over_tcp() {
        use std::io::Read;
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            (0..2)
                .map(|_| {
                    let (mut conn, _) = listener.accept().unwrap();
                    let mut buf = Vec::new();
                    conn.read_to_end(&mut buf).unwrap();
                    buf
                })
                .collect::<Vec<_>>()
        });

        let mut config = BeaconConfig::default();
        config.kiss_port = port;
        config.repeat = 2;
        config.hold_secs = 0;

        let mut beacon = Beacon::from_config(&config).unwrap();
        assert_eq!(beacon.transmit("!Highest apogee = 42.0").unwrap(), 2);

        for packet in server.join().unwrap() {
            let frame = aprskiss_frame::ax25::Ax25Frame::parse(&kiss::decode(&packet).unwrap()).unwrap();
            assert_eq!(frame.source.to_string(), "KQ4FYU-1");
            assert_eq!(frame.info_text(), "!Highest apogee = 42.0");
        }
    }
}
