//! Fixed-capacity SPSC sample ring shared by the emulation loop and the
//! playback callback.
//!
//! ## Cursor discipline
//!
//! - Only the producer advances `write_index`; only the consumer advances
//!   `read_index`.
//! - The ring is empty exactly when `read_index == write_index`. One slot is
//!   always left unwritten, so at most `capacity - 1` samples are queued.
//! - `rate == 0` means inert: produce writes nothing, consume emits silence
//!   and never touches the cursors.
//!
//! ## Underrun
//!
//! When the consumer catches up with the producer it keeps emitting the last
//! sample it played instead of silence. That sample lives in the reserved slot
//! just behind `read_index`, which the producer can never overwrite.
//!
//! ## Quiescence
//!
//! `reset` and `deactivate` rewrite both cursors and every slot. They take the
//! gate exclusively, which waits for an in-flight `produce`/`consume` to
//! finish. `consume` only ever `try_read`s the gate, so the real-time path
//! emits one buffer of silence rather than blocking.

pub mod sample;

use std::sync::{
    atomic::{AtomicI16, AtomicU32, AtomicUsize, Ordering},
    Arc,
};

use parking_lot::RwLock;

use crate::{
    engine::diagnostics::EngineDiagnostics,
    error::{AudioError, Result},
};

pub use sample::{ByteOrder, Sample};

/// Interleaved samples converted per pass in `consume_bytes`.
const BYTE_PASS_SAMPLES: usize = 256;

/// The shared ring. Held behind an `Arc` by the engine (producer side) and by
/// every `PlaybackHandle` given to a driver (consumer side).
pub struct SampleRing {
    slots: Box<[AtomicI16]>,
    write_index: AtomicUsize,
    read_index: AtomicUsize,
    /// Samples/sec. Published only after the slots are ready.
    rate: AtomicU32,
    gate: RwLock<()>,
    diagnostics: Arc<EngineDiagnostics>,
}

impl SampleRing {
    /// Allocate a zeroed, inert ring of `capacity` slots.
    ///
    /// # Errors
    /// `AudioError::Allocation` if the slots cannot be reserved or `capacity`
    /// is below two (one slot is always reserved).
    pub(crate) fn allocate(capacity: usize, diagnostics: Arc<EngineDiagnostics>) -> Result<Self> {
        if capacity < 2 {
            return Err(AudioError::Allocation { capacity });
        }

        let mut slots: Vec<AtomicI16> = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| AudioError::Allocation { capacity })?;
        slots.extend((0..capacity).map(|_| AtomicI16::new(0)));

        Ok(Self {
            slots: slots.into_boxed_slice(),
            write_index: AtomicUsize::new(0),
            read_index: AtomicUsize::new(0),
            rate: AtomicU32::new(0),
            gate: RwLock::new(()),
            diagnostics,
        })
    }

    /// Number of slots, including the reserved one.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Current rate in Hz, `0` when inert.
    pub fn rate(&self) -> u32 {
        self.rate.load(Ordering::Acquire)
    }

    pub fn is_live(&self) -> bool {
        self.rate() != 0
    }

    /// Make the ring live at `rate` Hz. Slots must already be zeroed.
    pub(crate) fn activate(&self, rate: u32) {
        self.rate.store(rate, Ordering::Release);
    }

    /// Make the ring inert and clear it. Waits for in-flight produce/consume.
    pub(crate) fn deactivate(&self) {
        let _gate = self.gate.write();
        self.rate.store(0, Ordering::Release);
        self.clear_locked();
    }

    /// Rewind both cursors and zero every slot. Rate is left as is.
    pub fn reset(&self) {
        let _gate = self.gate.write();
        self.clear_locked();
    }

    fn clear_locked(&self) {
        for slot in self.slots.iter() {
            slot.store(0, Ordering::Relaxed);
        }
        self.read_index.store(0, Ordering::Release);
        self.write_index.store(0, Ordering::Release);
    }

    /// Slots the producer may still fill before colliding with the reader.
    ///
    /// `capacity - 1` on an empty ring, `0` when inert.
    pub fn free_slots(&self) -> usize {
        if !self.is_live() {
            return 0;
        }
        let cap = self.capacity();
        let read = self.read_index.load(Ordering::Acquire);
        let write = self.write_index.load(Ordering::Acquire);
        (read + cap - write - 1) % cap
    }

    /// Samples written but not yet played.
    pub fn queued(&self) -> usize {
        if !self.is_live() {
            return 0;
        }
        let cap = self.capacity();
        let read = self.read_index.load(Ordering::Acquire);
        let write = self.write_index.load(Ordering::Acquire);
        (write + cap - read) % cap
    }

    /// Copy as many of `data` as fit. Returns the count written; a short count
    /// is backpressure and the caller decides what to drop.
    ///
    /// Single producer only.
    pub(crate) fn produce(&self, data: &[Sample]) -> usize {
        let _gate = self.gate.read();
        if !self.is_live() {
            return 0;
        }

        let cap = self.capacity();
        // A stale read cursor only under-reports free space.
        let read = self.read_index.load(Ordering::Acquire);
        let mut write = self.write_index.load(Ordering::Relaxed);
        let mut written = 0;

        for &sample in data {
            let next = if write + 1 == cap { 0 } else { write + 1 };
            if next == read {
                break;
            }
            self.slots[write].store(sample, Ordering::Relaxed);
            write = next;
            written += 1;
        }

        self.write_index.store(write, Ordering::Release);
        self.diagnostics.record_write(written, data.len() - written);
        written
    }

    /// Fill `out` with interleaved frames of `channels` samples each, every
    /// channel carrying the same mono sample.
    ///
    /// Only whole frames are consumed; a trailing partial frame is zeroed so
    /// the next buffer still starts on the first channel.
    ///
    /// Never blocks or allocates. Single consumer only.
    pub(crate) fn consume_interleaved(&self, out: &mut [Sample], channels: usize) {
        if channels == 0 {
            return;
        }
        let Some(_gate) = self.gate.try_read() else {
            out.fill(0);
            self.diagnostics.record_silent_callback();
            return;
        };
        if !self.is_live() {
            out.fill(0);
            self.diagnostics.record_silent_callback();
            return;
        }

        let cap = self.capacity();
        let write = self.write_index.load(Ordering::Acquire);
        let mut read = self.read_index.load(Ordering::Relaxed);
        let mut frames = 0;
        let mut underruns = 0;

        let mut frames_out = out.chunks_exact_mut(channels);
        for frame in &mut frames_out {
            let sample = if read == write {
                underruns += 1;
                let held = if read == 0 { cap - 1 } else { read - 1 };
                self.slots[held].load(Ordering::Relaxed)
            } else {
                let sample = self.slots[read].load(Ordering::Relaxed);
                read = if read + 1 == cap { 0 } else { read + 1 };
                sample
            };
            frame.fill(sample);
            frames += 1;
        }
        frames_out.into_remainder().fill(0);

        self.read_index.store(read, Ordering::Release);
        self.diagnostics.record_playback(frames, underruns);
    }

    /// Fill a raw byte buffer with interleaved 16-bit stereo frames in `order`.
    ///
    /// Bytes past the last whole frame are zeroed.
    pub(crate) fn consume_bytes(&self, out: &mut [u8], order: ByteOrder) {
        let mut scratch = [0 as Sample; BYTE_PASS_SAMPLES];
        let whole = out.len() / 4 * 4;
        let (bytes, tail) = out.split_at_mut(whole);

        for pass in bytes.chunks_mut(BYTE_PASS_SAMPLES * 2) {
            let samples = &mut scratch[..pass.len() / 2];
            self.consume_interleaved(samples, 2);
            for (dst, &sample) in pass.chunks_exact_mut(2).zip(samples.iter()) {
                dst.copy_from_slice(&order.encode(sample));
            }
        }
        tail.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_ring(capacity: usize) -> SampleRing {
        let ring = SampleRing::allocate(capacity, Arc::new(EngineDiagnostics::default()))
            .expect("allocate");
        ring.activate(44_100);
        ring
    }

    fn drain(ring: &SampleRing, frames: usize) -> Vec<Sample> {
        let mut out = vec![0; frames * 2];
        ring.consume_interleaved(&mut out, 2);
        out
    }

    #[test]
    fn empty_ring_reserves_one_slot() {
        let ring = live_ring(16);
        assert_eq!(ring.free_slots(), 15);
        assert_eq!(ring.queued(), 0);
    }

    #[test]
    fn short_write_stops_before_reader() {
        let ring = live_ring(8);
        let data: Vec<Sample> = (1..=10).collect();
        assert_eq!(ring.produce(&data), 7);
        assert_eq!(ring.free_slots(), 0);
        assert_eq!(ring.produce(&[99]), 0);
        assert_eq!(ring.queued(), 7);
    }

    #[test]
    fn drained_frames_duplicate_mono_source() {
        let ring = live_ring(8);
        ring.produce(&[5, -6, 7]);
        assert_eq!(drain(&ring, 3), vec![5, 5, -6, -6, 7, 7]);
    }

    #[test]
    fn underrun_repeats_last_played_sample() {
        let ring = live_ring(8);
        ring.produce(&[1, 2, 3]);
        assert_eq!(drain(&ring, 5), vec![1, 1, 2, 2, 3, 3, 3, 3, 3, 3]);
        assert_eq!(ring.free_slots(), 7);

        // Fresh data resumes right where the cursor stopped.
        ring.produce(&[4]);
        assert_eq!(drain(&ring, 2), vec![4, 4, 4, 4]);
    }

    #[test]
    fn cursors_wrap_around_capacity() {
        let ring = live_ring(4);
        for round in 0..5 {
            let base = round * 10;
            assert_eq!(ring.produce(&[base, base + 1, base + 2]), 3);
            assert_eq!(
                drain(&ring, 3),
                vec![base, base, base + 1, base + 1, base + 2, base + 2]
            );
        }
        // Underrun after a wrap still holds the last sample.
        assert_eq!(drain(&ring, 1), vec![42, 42]);
    }

    #[test]
    fn inert_ring_is_silent_and_untouched() {
        let ring = SampleRing::allocate(8, Arc::new(EngineDiagnostics::default())).unwrap();
        assert_eq!(ring.produce(&[1, 2]), 0);
        let mut out = vec![7; 4];
        ring.consume_interleaved(&mut out, 2);
        assert_eq!(out, vec![0; 4]);
        assert_eq!(ring.free_slots(), 0);
        assert_eq!(ring.read_index.load(Ordering::Relaxed), 0);
        assert_eq!(ring.write_index.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn reset_zeroes_content_and_keeps_rate() {
        let ring = live_ring(8);
        ring.produce(&[9, 9, 9]);
        drain(&ring, 1);
        ring.reset();

        assert_eq!(ring.rate(), 44_100);
        assert_eq!(ring.free_slots(), 7);
        // Nothing buffered: the held sample is the zeroed reserved slot.
        assert_eq!(drain(&ring, 2), vec![0; 4]);
    }

    #[test]
    fn deactivate_makes_ring_inert() {
        let ring = live_ring(8);
        ring.produce(&[1, 2, 3]);
        ring.deactivate();
        assert_eq!(ring.rate(), 0);
        assert_eq!(ring.queued(), 0);
        assert_eq!(ring.produce(&[1]), 0);
    }

    #[test]
    fn tiny_capacity_is_rejected() {
        let err = SampleRing::allocate(1, Arc::new(EngineDiagnostics::default()));
        assert!(matches!(err, Err(AudioError::Allocation { capacity: 1 })));
    }

    #[test]
    fn consume_interleaved_fans_out_to_any_channel_count() {
        let ring = live_ring(8);
        ring.produce(&[1, 2]);
        let mut out = vec![0; 8];
        ring.consume_interleaved(&mut out, 4);
        assert_eq!(out, vec![1, 1, 1, 1, 2, 2, 2, 2]);
    }

    #[test]
    fn consume_bytes_writes_big_endian_stereo() {
        let ring = live_ring(8);
        ring.produce(&[0x0102, -1]);
        let mut out = vec![0xAA; 9];
        ring.consume_bytes(&mut out, ByteOrder::BigEndian);
        assert_eq!(
            out,
            vec![0x01, 0x02, 0x01, 0x02, 0xFF, 0xFF, 0xFF, 0xFF, 0x00]
        );
    }

    #[test]
    fn partial_frame_is_zeroed_without_consuming() {
        let ring = live_ring(8);
        ring.produce(&[1, 2, 3, 4]);

        let mut out = [9; 5];
        ring.consume_interleaved(&mut out, 2);
        assert_eq!(out, [1, 1, 2, 2, 0]);
        assert_eq!(ring.queued(), 2);

        // Six bytes hold one whole stereo frame; the rest stays for next time.
        let mut first = [0xAA; 6];
        ring.consume_bytes(&mut first, ByteOrder::BigEndian);
        assert_eq!(first, [0, 3, 0, 3, 0, 0]);
        let mut second = [0xAA; 6];
        ring.consume_bytes(&mut second, ByteOrder::BigEndian);
        assert_eq!(second, [0, 4, 0, 4, 0, 0]);
        assert_eq!(ring.queued(), 0);
    }

    #[test]
    fn consume_during_exclusive_gate_is_silent() {
        let diagnostics = Arc::new(EngineDiagnostics::default());
        let ring = SampleRing::allocate(8, Arc::clone(&diagnostics)).unwrap();
        ring.activate(8_000);
        ring.produce(&[5, 6]);

        let guard = ring.gate.write();
        let mut out = [7; 4];
        ring.consume_interleaved(&mut out, 2);
        drop(guard);

        assert_eq!(out, [0; 4]);
        assert_eq!(ring.queued(), 2);
        assert_eq!(diagnostics.snapshot().silent_callbacks, 1);
        assert_eq!(diagnostics.snapshot().frames_played, 0);

        // Once released, the held samples play normally.
        let mut out = [0; 4];
        ring.consume_interleaved(&mut out, 2);
        assert_eq!(out, [5, 5, 6, 6]);
    }

    #[test]
    fn consume_bytes_spans_multiple_passes() {
        let ring = live_ring(1024);
        let data: Vec<Sample> = (0..300).collect();
        assert_eq!(ring.produce(&data), 300);

        let mut out = vec![0u8; 300 * 4];
        ring.consume_bytes(&mut out, ByteOrder::LittleEndian);
        for (i, frame) in out.chunks_exact(4).enumerate() {
            let left = ByteOrder::LittleEndian.decode([frame[0], frame[1]]);
            let right = ByteOrder::LittleEndian.decode([frame[2], frame[3]]);
            assert_eq!((left, right), (i as Sample, i as Sample));
        }
    }

    #[test]
    fn counters_track_writes_drops_and_underruns() {
        let diagnostics = Arc::new(EngineDiagnostics::default());
        let ring = SampleRing::allocate(4, Arc::clone(&diagnostics)).unwrap();
        ring.activate(8_000);
        ring.produce(&[1, 2, 3, 4, 5]);
        drain(&ring, 5);

        let snap = diagnostics.snapshot();
        assert_eq!(snap.samples_written, 3);
        assert_eq!(snap.samples_dropped, 2);
        assert_eq!(snap.frames_played, 5);
        assert_eq!(snap.underrun_frames, 2);
    }
}
