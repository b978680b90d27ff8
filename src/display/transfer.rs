//! Bulk transfer of pixel data into an armed address window.
//!
//! Without a background channel every stream goes out through `DisplayInterface::send_data` in
//! small stack chunks. With one, data is staged into the caller's scratch buffer one chunk at a
//! time, handed to `DisplayInterface::start_data`, and polled until the transport reports
//! completion or the timeout runs out. Only one chunk is ever on the bus.

use log::{debug, warn};

use crate::color::Rgb565;
use crate::error::Error;
use crate::interface::{Clock, DisplayInterface};

/// Size of the stack buffer used for synchronous streaming. Must be even.
const SYNC_CHUNK_BYTES: usize = 64;

/// Progress of the most recent background transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferState {
    /// No transfer started since the last one was observed.
    Idle,
    /// A chunk is being copied into the scratch buffer.
    Staging,
    /// A chunk is on the bus.
    Active,
    /// The last chunk finished.
    Complete,
    /// The last chunk did not finish in time and was aborted.
    TimedOut,
}

pub(crate) struct TransferEngine<'buf> {
    /// Present iff the background path is usable.
    scratch: Option<&'buf mut [u8]>,
    timeout_ms: u32,
    state: TransferState,
    started_ms: u32,
}

impl<'buf> TransferEngine<'buf> {
    /// Set up the engine. `claimed` is whether the transport acquired its background channel;
    /// when it did not, or the scratch buffer can not hold a single pixel, the background path is
    /// disabled for good.
    pub(crate) fn new(scratch: Option<&'buf mut [u8]>, timeout_ms: u32, claimed: bool) -> Self {
        let scratch = match scratch {
            Some(buf) if !claimed => {
                warn!(
                    "background channel unavailable, {} byte scratch buffer unused",
                    buf.len()
                );
                None
            }
            Some(buf) if buf.len() < 2 => {
                warn!("scratch buffer of {} bytes holds no pixel", buf.len());
                None
            }
            other => other,
        };
        TransferEngine {
            scratch,
            timeout_ms,
            state: TransferState::Idle,
            started_ms: 0,
        }
    }

    pub(crate) fn is_async_enabled(&self) -> bool {
        self.scratch.is_some()
    }

    pub(crate) fn state(&self) -> TransferState {
        self.state
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.state == TransferState::Active
    }

    /// Pixels per background chunk.
    pub(crate) fn chunk_pixels(&self) -> usize {
        self.scratch.as_ref().map_or(0, |s| s.len() / 2)
    }

    /// Wait for an active transfer to finish, so the bus is free for the next command.
    pub(crate) fn settle<DI, CLK>(
        &mut self,
        iface: &mut DI,
        clock: &mut CLK,
    ) -> Result<(), Error<DI::Error>>
    where
        DI: DisplayInterface,
        CLK: Clock,
    {
        if self.state == TransferState::Active {
            self.wait(iface, clock)
        } else {
            Ok(())
        }
    }

    fn wait<DI, CLK>(&mut self, iface: &mut DI, clock: &mut CLK) -> Result<(), Error<DI::Error>>
    where
        DI: DisplayInterface,
        CLK: Clock,
    {
        loop {
            match iface.poll_data() {
                Ok(()) => {
                    self.state = TransferState::Complete;
                    return Ok(());
                }
                Err(nb::Error::WouldBlock) => {
                    let elapsed = clock.now_ms().wrapping_sub(self.started_ms);
                    if elapsed >= self.timeout_ms {
                        iface.abort_data();
                        self.state = TransferState::TimedOut;
                        warn!("background transfer timed out after {} ms", elapsed);
                        return Err(Error::TransferTimeout);
                    }
                    clock.idle();
                }
                Err(nb::Error::Other(e)) => {
                    iface.abort_data();
                    self.state = TransferState::Idle;
                    return Err(Error::Interface(e));
                }
            }
        }
    }

    /// Settle the previous transfer and forget its outcome.
    fn begin<DI, CLK>(&mut self, iface: &mut DI, clock: &mut CLK) -> Result<(), Error<DI::Error>>
    where
        DI: DisplayInterface,
        CLK: Clock,
    {
        self.settle(iface, clock)?;
        self.state = TransferState::Idle;
        Ok(())
    }

    /// Run background chunks until `stage` returns 0. `stage` fills the front of the scratch
    /// buffer and returns the number of bytes to send.
    fn pump<DI, CLK, F>(
        &mut self,
        iface: &mut DI,
        clock: &mut CLK,
        mut stage: F,
    ) -> Result<(), Error<DI::Error>>
    where
        DI: DisplayInterface,
        CLK: Clock,
        F: FnMut(&mut [u8]) -> usize,
    {
        let mut sent_any = false;
        loop {
            let scratch = match self.scratch.as_deref_mut() {
                Some(s) => s,
                None => return Ok(()),
            };
            self.state = TransferState::Staging;
            let len = stage(scratch);
            if len == 0 {
                self.state = if sent_any {
                    TransferState::Complete
                } else {
                    TransferState::Idle
                };
                return Ok(());
            }
            debug!("background chunk of {} bytes", len);
            self.started_ms = clock.now_ms();
            if let Err(e) = iface.start_data(&scratch[..len]) {
                self.state = TransferState::Idle;
                return Err(Error::Interface(e));
            }
            self.state = TransferState::Active;
            sent_any = true;
            self.wait(iface, clock)?;
        }
    }

    /// Send raw bytes, blocking until the transport accepted them.
    pub(crate) fn write_sync<DI, CLK>(
        &mut self,
        iface: &mut DI,
        clock: &mut CLK,
        bytes: &[u8],
    ) -> Result<(), Error<DI::Error>>
    where
        DI: DisplayInterface,
        CLK: Clock,
    {
        self.begin(iface, clock)?;
        iface.send_data(bytes).map_err(Error::Interface)
    }

    /// Send raw bytes through the background channel, one scratch buffer at a time.
    pub(crate) fn write_async<DI, CLK>(
        &mut self,
        iface: &mut DI,
        clock: &mut CLK,
        bytes: &[u8],
    ) -> Result<(), Error<DI::Error>>
    where
        DI: DisplayInterface,
        CLK: Clock,
    {
        if !self.is_async_enabled() {
            return self.write_sync(iface, clock, bytes);
        }
        self.begin(iface, clock)?;
        let mut rest = bytes;
        self.pump(iface, clock, |buf| {
            // Whole pixels only, so a chunk boundary never splits a color.
            let n = rest.len().min(buf.len() & !1);
            buf[..n].copy_from_slice(&rest[..n]);
            rest = &rest[n..];
            n
        })
    }

    /// Stream pixels from an iterator, through the background channel when it is enabled.
    pub(crate) fn write_pixels<DI, CLK, I>(
        &mut self,
        iface: &mut DI,
        clock: &mut CLK,
        mut pixels: I,
    ) -> Result<(), Error<DI::Error>>
    where
        DI: DisplayInterface,
        CLK: Clock,
        I: Iterator<Item = Rgb565>,
    {
        self.begin(iface, clock)?;
        if self.is_async_enabled() {
            return self.pump(iface, clock, |buf| stage_pixels(buf, &mut pixels));
        }
        // Paint using constant memory by alternately filling a chunk buffer from the iterator and
        // writing it to the display.
        let mut buf = [0u8; SYNC_CHUNK_BYTES];
        loop {
            let len = stage_pixels(&mut buf, &mut pixels);
            if len > 0 {
                iface.send_data(&buf[..len]).map_err(Error::Interface)?;
            }
            // A short chunk means the iterator is exhausted.
            if len != buf.len() {
                return Ok(());
            }
        }
    }

    /// Send `count` pixels of one color. The chunk buffer is filled once and resent.
    pub(crate) fn fill<DI, CLK>(
        &mut self,
        iface: &mut DI,
        clock: &mut CLK,
        color: Rgb565,
        count: usize,
    ) -> Result<(), Error<DI::Error>>
    where
        DI: DisplayInterface,
        CLK: Clock,
    {
        self.begin(iface, clock)?;
        let bytes = color.to_be_bytes();
        if self.is_async_enabled() {
            let mut remaining = count;
            let mut filled = 0;
            return self.pump(iface, clock, |buf| {
                let n = remaining.min(buf.len() / 2);
                if n > filled {
                    for px in buf[filled * 2..n * 2].chunks_exact_mut(2) {
                        px.copy_from_slice(&bytes);
                    }
                    filled = n;
                }
                remaining -= n;
                n * 2
            });
        }
        let mut buf = [0u8; SYNC_CHUNK_BYTES];
        for px in buf.chunks_exact_mut(2) {
            px.copy_from_slice(&bytes);
        }
        let mut remaining = count;
        while remaining > 0 {
            let n = remaining.min(SYNC_CHUNK_BYTES / 2);
            iface.send_data(&buf[..n * 2]).map_err(Error::Interface)?;
            remaining -= n;
        }
        Ok(())
    }
}

/// Copy as many whole pixels from `pixels` as fit into `buf`, returning the number of bytes
/// written.
fn stage_pixels<I>(buf: &mut [u8], pixels: &mut I) -> usize
where
    I: Iterator<Item = Rgb565>,
{
    let mut len = 0;
    for slot in buf.chunks_exact_mut(2) {
        match pixels.next() {
            Some(color) => {
                slot.copy_from_slice(&color.to_be_bytes());
                len += 2;
            }
            None => break,
        }
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::test_spy::{AsyncMode, Sent, TestClock, TestSpyInterface};

    fn engine<'a>(di: &mut TestSpyInterface, scratch: &'a mut [u8]) -> TransferEngine<'a> {
        let claimed = di.claim_async();
        TransferEngine::new(Some(scratch), 100, claimed)
    }

    #[test]
    fn sync_fill_reuses_one_chunk() {
        let mut di = TestSpyInterface::new();
        let mut clock = TestClock::new();
        let mut t = TransferEngine::new(None, 100, false);
        t.fill(&mut di, &mut clock, Rgb565::from_raw(0xABCD), 40).unwrap();
        let sent = di.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], Sent::Data([0xAB, 0xCD].repeat(32)));
        assert_eq!(sent[1], Sent::Data([0xAB, 0xCD].repeat(8)));
        assert_eq!(t.state(), TransferState::Idle);
    }

    #[test]
    fn sync_pixels_stop_when_iterator_ends() {
        let mut di = TestSpyInterface::new();
        let mut clock = TestClock::new();
        let mut t = TransferEngine::new(None, 100, false);
        let pixels = (0..32u16).map(Rgb565::from_raw);
        t.write_pixels(&mut di, &mut clock, pixels).unwrap();
        // Exactly one full chunk, and no trailing empty burst.
        assert_eq!(di.sent().len(), 1);
        t.write_pixels(&mut di, &mut clock, core::iter::empty()).unwrap();
        assert_eq!(di.sent().len(), 1);
    }

    #[test]
    fn downgrade_without_channel() {
        let mut di = TestSpyInterface::new();
        let mut scratch = [0u8; 16];
        let t = engine(&mut di, &mut scratch);
        assert!(!t.is_async_enabled());

        let mut di = TestSpyInterface::with_async(AsyncMode::CompleteAfter(0));
        let mut tiny = [0u8; 1];
        let t = engine(&mut di, &mut tiny);
        assert!(!t.is_async_enabled());
    }

    #[test]
    fn async_fill_chunks() {
        let mut di = TestSpyInterface::with_async(AsyncMode::CompleteAfter(2));
        let mut clock = TestClock::new();
        let mut scratch = [0u8; 20];
        let mut t = engine(&mut di, &mut scratch);
        assert_eq!(t.chunk_pixels(), 10);
        t.fill(&mut di, &mut clock, Rgb565::RED, 25).unwrap();
        assert_eq!(di.async_bursts(), vec![20, 20, 10]);
        assert_eq!(t.state(), TransferState::Complete);
        for s in di.sent() {
            match s {
                Sent::AsyncData(d) => assert!(d.chunks(2).all(|p| p == [0xF8, 0x00])),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn async_odd_scratch_keeps_whole_pixels() {
        let mut di = TestSpyInterface::with_async(AsyncMode::CompleteAfter(0));
        let mut clock = TestClock::new();
        let mut scratch = [0u8; 7];
        let mut t = engine(&mut di, &mut scratch);
        let bytes: Vec<u8> = (0..14).collect();
        t.write_async(&mut di, &mut clock, &bytes).unwrap();
        assert_eq!(di.async_bursts(), vec![6, 6, 2]);
        let mut joined = Vec::new();
        for s in di.sent() {
            if let Sent::AsyncData(d) = s {
                joined.extend(d);
            }
        }
        assert_eq!(joined, bytes);
    }

    #[test]
    fn async_pixels_in_order() {
        let mut di = TestSpyInterface::with_async(AsyncMode::CompleteAfter(1));
        let mut clock = TestClock::new();
        let mut scratch = [0u8; 8];
        let mut t = engine(&mut di, &mut scratch);
        let pixels = (1..=5u16).map(Rgb565::from_raw);
        t.write_pixels(&mut di, &mut clock, pixels).unwrap();
        di.check_multi(&[
            Sent::AsyncData(vec![0, 1, 0, 2, 0, 3, 0, 4]),
            Sent::AsyncData(vec![0, 5]),
        ]);
    }

    #[test]
    fn timeout_aborts_and_recovers() {
        let mut di = TestSpyInterface::with_async(AsyncMode::Stall);
        let mut clock = TestClock::new();
        let mut scratch = [0u8; 8];
        let mut t = engine(&mut di, &mut scratch);
        assert_eq!(
            t.fill(&mut di, &mut clock, Rgb565::BLUE, 10),
            Err(Error::TransferTimeout)
        );
        assert_eq!(t.state(), TransferState::TimedOut);
        assert!(!t.is_busy());
        assert_eq!(di.sent().last(), Some(&Sent::Abort));
        // Only the first chunk went out.
        assert_eq!(di.async_bursts(), vec![8]);

        di.set_async_mode(AsyncMode::CompleteAfter(3));
        di.clear();
        t.fill(&mut di, &mut clock, Rgb565::BLUE, 10).unwrap();
        assert_eq!(t.state(), TransferState::Complete);
        assert_eq!(di.async_bursts(), vec![8, 8, 4]);
    }

    #[test]
    fn timeout_survives_clock_wraparound() {
        let mut di = TestSpyInterface::with_async(AsyncMode::Stall);
        let mut clock = TestClock::starting_at(u32::MAX - 10);
        let mut scratch = [0u8; 8];
        let mut t = engine(&mut di, &mut scratch);
        assert_eq!(
            t.write_async(&mut di, &mut clock, &[1, 2]),
            Err(Error::TransferTimeout)
        );
        // Timed out after the configured 100 ms, not immediately.
        assert!(clock.now_ms() > 80);
    }
}
