//! DisplayBridge: the cooperative scheduling loop body.
//!
//! One [`DisplayBridge::tick`] polls the transport, feeds the framer and
//! dispatches every completed frame, runs the framer's partial-frame timer,
//! then forwards pointer reports. Nothing in a tick waits on the host; the
//! only suspension points are bounded bus transactions and report writes.

use heapless::Deque;
use hid_display_proto::{
    CommandFramer, DecodeError, Frame, FramingError, TestCommand, PING_REPLY,
};

use crate::bus::{BusError, DisplayBus};
use crate::dispatch::{dispatch, Dispatched};
use crate::engine::DisplayEngine;
use crate::pointer::{test_reports, PointerError, PointerReport, PointerSink, PointerSource};
use crate::transport::{Transport, TransportError};

/// Bytes pulled from the transport per tick.
pub const READ_CHUNK: usize = 64;

/// Capacity of the queue for diagnostic pointer reports.
pub const INJECTED_REPORTS: usize = 8;

/// Outcome of one tick, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    /// A disconnect was observed and framing was reset.
    pub disconnected: bool,
    /// Frames handed to the dispatcher.
    pub dispatched: usize,
    /// One of them was force-completed by the partial-frame timer.
    pub forced: bool,
    pub framing_errors: usize,
    pub last_framing_error: Option<FramingError>,
    pub last_decode_error: Option<DecodeError>,
    pub last_bus_error: Option<BusError>,
    /// Pointer reports written to the sink.
    pub pointer_reports: usize,
}

/// Error type for bridge operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeError {
    /// Writing a reply to the host failed.
    Transport(TransportError),
    /// Writing a pointer report failed.
    Pointer(PointerError),
}

/// Connects the command transport to the display engine, and the pointer
/// source to the pointer sink, on one loop.
pub struct DisplayBridge<T, B, P, S> {
    transport: T,
    framer: CommandFramer,
    engine: DisplayEngine<B>,
    pointer: P,
    sink: S,
    injected: Deque<PointerReport, INJECTED_REPORTS>,
}

impl<T, B, P, S> DisplayBridge<T, B, P, S>
where
    T: Transport,
    B: DisplayBus,
    P: PointerSource,
    S: PointerSink,
{
    pub fn new(
        transport: T,
        framer: CommandFramer,
        engine: DisplayEngine<B>,
        pointer: P,
        sink: S,
    ) -> Self {
        Self {
            transport,
            framer,
            engine,
            pointer,
            sink,
            injected: Deque::new(),
        }
    }

    /// Run one scheduling step at time `now_us`.
    ///
    /// Display work always completes before an error is returned; a failed
    /// reply or report write only loses that write.
    pub async fn tick(&mut self, now_us: u64) -> Result<TickReport, BridgeError> {
        let mut report = TickReport::default();
        let mut deferred = None;

        if self.transport.take_disconnect() {
            self.framer.cancel();
            report.disconnected = true;
        }

        let mut buf = [0u8; READ_CHUNK];
        let n = self.transport.read_available(&mut buf);
        for &byte in &buf[..n] {
            match self.framer.push(byte) {
                Ok(None) => {}
                Ok(Some(frame)) => {
                    if let Err(e) = self.handle(&frame, &mut report).await {
                        deferred.get_or_insert(e);
                    }
                }
                Err(e) => {
                    report.framing_errors += 1;
                    report.last_framing_error = Some(e);
                    // The framer never overflows with the current opcode table.
                    // If it does, the rest of this read can't be resynced.
                    if e == FramingError::Overflow {
                        self.drain();
                        break;
                    }
                }
            }
        }

        if let Some(frame) = self.framer.poll_timeout(now_us) {
            report.forced = true;
            if let Err(e) = self.handle(&frame, &mut report).await {
                deferred.get_or_insert(e);
            }
        }

        if let Err(e) = self.forward_pointer(now_us, &mut report).await {
            deferred.get_or_insert(e);
        }

        match deferred {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    async fn handle(&mut self, frame: &Frame, report: &mut TickReport) -> Result<(), BridgeError> {
        report.dispatched += 1;
        match dispatch(&mut self.engine, frame).await {
            Dispatched::Drawn(_) => {}
            Dispatched::BusFailed(_, e) => report.last_bus_error = Some(e),
            Dispatched::Ignored(e) => report.last_decode_error = Some(e),
            Dispatched::Diagnostic(TestCommand::Ping) => {
                self.transport
                    .write_reply(&PING_REPLY)
                    .await
                    .map_err(BridgeError::Transport)?;
            }
            Dispatched::Diagnostic(cmd) => {
                for r in test_reports(cmd) {
                    // Oldest reports win when the host floods diagnostics.
                    if self.injected.push_back(*r).is_err() {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    async fn forward_pointer(
        &mut self,
        now_us: u64,
        report: &mut TickReport,
    ) -> Result<(), BridgeError> {
        while let Some(r) = self.injected.pop_front() {
            self.sink.send(&r).await.map_err(BridgeError::Pointer)?;
            report.pointer_reports += 1;
        }
        if let Some(r) = self.pointer.poll(now_us) {
            self.sink.send(&r).await.map_err(BridgeError::Pointer)?;
            report.pointer_reports += 1;
        }
        Ok(())
    }

    /// Throw away everything the transport has buffered.
    fn drain(&mut self) {
        let mut scratch = [0u8; READ_CHUNK];
        while self.transport.read_available(&mut scratch) > 0 {}
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn framer(&self) -> &CommandFramer {
        &self.framer
    }

    pub fn engine(&self) -> &DisplayEngine<B> {
        &self.engine
    }

    /// Mutable engine access, e.g. to run `init()` or draw a boot banner.
    pub fn engine_mut(&mut self) -> &mut DisplayEngine<B> {
        &mut self.engine
    }

    pub fn pointer_mut(&mut self) -> &mut P {
        &mut self.pointer
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Decompose the bridge into its components.
    pub fn into_parts(self) -> (T, CommandFramer, DisplayEngine<B>, P, S) {
        (
            self.transport,
            self.framer,
            self.engine,
            self.pointer,
            self.sink,
        )
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::engine::tests::MockBus;
    use crate::engine::Orientation;
    use crate::font::glyph;
    use crate::testing::block_on;
    use core::future::Future;
    use hid_display_proto::{FramerConfig, FramerState};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::vec;
    use std::vec::Vec;

    #[derive(Default)]
    struct MockTransport {
        chunks: VecDeque<Vec<u8>>,
        disconnect: bool,
        replies: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl MockTransport {
        fn with(chunks: &[&[u8]]) -> Self {
            Self {
                chunks: chunks.iter().map(|c| c.to_vec()).collect(),
                ..Self::default()
            }
        }
    }

    impl Transport for MockTransport {
        fn read_available(&mut self, buf: &mut [u8]) -> usize {
            match self.chunks.pop_front() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    chunk.len()
                }
                None => 0,
            }
        }

        fn take_disconnect(&mut self) -> bool {
            core::mem::take(&mut self.disconnect)
        }

        fn write_reply(&mut self, bytes: &[u8]) -> impl Future<Output = Result<(), TransportError>> {
            self.replies.lock().unwrap().push(bytes.to_vec());
            core::future::ready(Ok(()))
        }
    }

    #[derive(Default)]
    struct MockPointer {
        queued: VecDeque<PointerReport>,
    }

    impl PointerSource for MockPointer {
        fn poll(&mut self, _now_us: u64) -> Option<PointerReport> {
            self.queued.pop_front()
        }
    }

    #[derive(Default)]
    struct MockSink {
        sent: Arc<Mutex<Vec<PointerReport>>>,
        fail: bool,
    }

    impl PointerSink for MockSink {
        fn send(&mut self, report: &PointerReport) -> impl Future<Output = Result<(), PointerError>> {
            let result = if self.fail {
                Err(PointerError::Io)
            } else {
                self.sent.lock().unwrap().push(*report);
                Ok(())
            };
            core::future::ready(result)
        }
    }

    type TestBridge = DisplayBridge<MockTransport, MockBus, MockPointer, MockSink>;

    fn bridge(transport: MockTransport, config: FramerConfig) -> TestBridge {
        DisplayBridge::new(
            transport,
            CommandFramer::new(config),
            DisplayEngine::new(MockBus::default(), Orientation::Normal),
            MockPointer::default(),
            MockSink::default(),
        )
    }

    fn diagnostics() -> FramerConfig {
        FramerConfig {
            accept_diagnostics: true,
            ..FramerConfig::default()
        }
    }

    #[test]
    fn test_text_frame_dispatches_once() {
        let mut b = bridge(
            MockTransport::with(&[&[0x02, 10, 20, 3, b'h', b'i', b'!']]),
            FramerConfig::default(),
        );
        let report = block_on(b.tick(0)).unwrap();

        assert_eq!(report.dispatched, 1);
        assert!(!report.forced);
        assert_eq!(b.framer().state(), FramerState::Idle);
        assert_eq!(b.engine().bus().data().len(), 3);
    }

    #[test]
    fn test_frame_split_across_ticks() {
        let mut b = bridge(
            MockTransport::with(&[&[0x06, 0], &[0, 10, 8, 50]]),
            FramerConfig::default(),
        );
        assert_eq!(block_on(b.tick(0)).unwrap().dispatched, 0);
        assert_eq!(block_on(b.tick(100)).unwrap().dispatched, 1);
        assert_eq!(&b.engine().framebuffer()[0..5], &[0xFF; 5]);
    }

    #[test]
    fn test_short_text_dispatched_after_timeout() {
        let mut b = bridge(
            MockTransport::with(&[&[0x02, 0, 0, 5, b'h', b'i']]),
            FramerConfig::default(),
        );

        assert_eq!(block_on(b.tick(0)).unwrap().dispatched, 0);
        assert_eq!(block_on(b.tick(4_999)).unwrap().dispatched, 0);

        let report = block_on(b.tick(5_000)).unwrap();
        assert_eq!(report.dispatched, 1);
        assert!(report.forced);
        assert_eq!(b.engine().cursor(), (16, 0));
        let h = Orientation::Normal.rasterize(glyph(b'h'));
        assert_eq!(&b.engine().framebuffer()[0..8], &h);
    }

    #[test]
    fn test_disconnect_discards_partial_frame() {
        let mut b = bridge(
            MockTransport::with(&[&[0x02, 0, 0, 5, b'h'], &[0x01]]),
            FramerConfig::default(),
        );
        block_on(b.tick(0)).unwrap();

        b.transport_mut().disconnect = true;
        let report = block_on(b.tick(100_000)).unwrap();

        assert!(report.disconnected);
        assert!(!report.forced);
        assert_eq!(report.dispatched, 1);
        // Only the CLEAR ran; the partial text never reached the panel.
        assert_eq!(b.engine().bus().data(), vec![&[0u8; 1024][..]]);
    }

    #[test]
    fn test_unknown_opcode_resyncs() {
        let mut b = bridge(
            MockTransport::with(&[&[0x55, 0x04, 0x01]]),
            FramerConfig::default(),
        );
        let report = block_on(b.tick(0)).unwrap();
        assert_eq!(report.framing_errors, 1);
        assert_eq!(
            report.last_framing_error,
            Some(FramingError::UnknownOpcode(0x55))
        );
        assert_eq!(report.dispatched, 1);
    }

    #[test]
    fn test_max_declared_text_streams_without_framing_errors() {
        let mut stream = vec![0x02, 0, 0, 255];
        stream.extend(core::iter::repeat(b'x').take(255));
        stream.extend([0x04, 0x01]);
        let chunks: Vec<&[u8]> = stream.chunks(READ_CHUNK).collect();
        let mut b = bridge(MockTransport::with(&chunks), FramerConfig::default());

        let (mut dispatched, mut errors) = (0, 0);
        for i in 0..chunks.len() as u64 {
            let report = block_on(b.tick(i * 100)).unwrap();
            dispatched += report.dispatched;
            errors += report.framing_errors;
        }
        assert_eq!(errors, 0);
        // The clamped text, then INVERT once the excess is swallowed.
        assert_eq!(dispatched, 2);
        assert_eq!(b.framer().state(), FramerState::Idle);
    }

    #[test]
    fn test_bus_failure_is_reported_not_fatal() {
        let mut b = DisplayBridge::new(
            MockTransport::with(&[&[0x07, 0x00, 0x04, 0x01]]),
            CommandFramer::default(),
            DisplayEngine::new(MockBus::failing_at(0), Orientation::Normal),
            MockPointer::default(),
            MockSink::default(),
        );
        let report = block_on(b.tick(0)).unwrap();
        assert_eq!(report.dispatched, 2);
        assert_eq!(report.last_bus_error, Some(BusError::Nack));
        // The INVERT after the failed POWER still went out.
        assert!(b.engine().is_healthy());
    }

    #[test]
    fn test_ping_replies() {
        let transport = MockTransport::with(&[&[0xF0, 0x00]]);
        let replies = transport.replies.clone();
        let mut b = bridge(transport, diagnostics());

        let report = block_on(b.tick(0)).unwrap();
        assert_eq!(report.dispatched, 1);
        assert_eq!(*replies.lock().unwrap(), vec![vec![0xF0, 0x00]]);
    }

    #[test]
    fn test_test_opcode_rejected_without_diagnostics() {
        let transport = MockTransport::with(&[&[0xF0, 0x00]]);
        let replies = transport.replies.clone();
        let mut b = bridge(transport, FramerConfig::default());

        let report = block_on(b.tick(0)).unwrap();
        assert_eq!(report.dispatched, 0);
        assert_eq!(report.framing_errors, 2);
        assert!(replies.lock().unwrap().is_empty());
    }

    #[test]
    fn test_button_press_injects_press_and_release() {
        let mut b = bridge(MockTransport::with(&[&[0xF0, 0x03]]), diagnostics());
        let sent = b.sink().sent.clone();

        let report = block_on(b.tick(0)).unwrap();
        assert_eq!(report.pointer_reports, 2);
        assert_eq!(
            *sent.lock().unwrap(),
            vec![PointerReport::buttons(1), PointerReport::buttons(0)]
        );
    }

    #[test]
    fn test_pointer_reports_forwarded() {
        let mut b = bridge(MockTransport::default(), FramerConfig::default());
        let sent = b.sink().sent.clone();
        b.pointer_mut()
            .queued
            .push_back(PointerReport::motion(0, -5, 0));

        let report = block_on(b.tick(0)).unwrap();
        assert_eq!(report.pointer_reports, 1);
        assert_eq!(sent.lock().unwrap()[0].x, -5);
        assert_eq!(block_on(b.tick(1)).unwrap().pointer_reports, 0);
    }

    #[test]
    fn test_sink_failure_after_display_work() {
        let mut b = DisplayBridge::new(
            MockTransport::with(&[&[0x01]]),
            CommandFramer::default(),
            DisplayEngine::new(MockBus::default(), Orientation::Normal),
            MockPointer {
                queued: VecDeque::from([PointerReport::buttons(1)]),
            },
            MockSink {
                fail: true,
                ..MockSink::default()
            },
        );

        let result = block_on(b.tick(0));
        assert_eq!(result, Err(BridgeError::Pointer(PointerError::Io)));
        assert_eq!(b.engine().bus().data().len(), 1);
    }

    #[test]
    fn test_into_parts() {
        let b = bridge(MockTransport::default(), FramerConfig::default());
        let (_, framer, engine, _, _) = b.into_parts();
        assert_eq!(framer.state(), FramerState::Idle);
        assert_eq!(engine.orientation(), Orientation::Normal);
    }
}
