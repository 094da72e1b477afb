//! Frame buffers handed out by the camera pipeline
use std::time::Duration;

/// One compressed image owned by the caller until it is released
pub trait FrameBuffer {
    /// Compressed image bytes
    fn data(&self) -> &[u8];

    fn len(&self) -> usize {
        self.data().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capture time relative to the driver's clock, if the driver records one
    fn timestamp(&self) -> Option<Duration> {
        None
    }

    fn sequence(&self) -> Option<u64> {
        None
    }
}

/// Producer of frames backed by a shared buffer pool.
///
/// `pull` transfers ownership of one buffer to the caller. The buffer must be
/// handed back through `release` on every path, otherwise the pool starves and
/// every other viewer stalls. `release` takes the frame by value, so a frame
/// cannot be returned twice.
pub trait FrameSource: Send + Sync {
    type Frame: FrameBuffer;

    /// Next captured frame, or `None` when the capture failed
    fn pull(&self) -> Option<Self::Frame>;

    fn release(&self, frame: Self::Frame);

    /// Pull a frame wrapped in a guard that returns it on drop
    fn hold(&self) -> Option<HeldFrame<'_, Self>>
    where
        Self: Sized,
    {
        self.pull().map(|frame| HeldFrame {
            source: self,
            frame: Some(frame),
        })
    }
}

/// A pulled frame that goes back to its source when dropped
pub struct HeldFrame<'a, S: FrameSource> {
    source: &'a S,
    frame: Option<S::Frame>,
}

impl<'a, S: FrameSource> HeldFrame<'a, S> {
    pub fn frame(&self) -> &S::Frame {
        // Only `release` and `drop` take the frame, and both consume the guard
        match self.frame.as_ref() {
            Some(frame) => frame,
            None => unreachable!("held frame already released"),
        }
    }

    pub fn data(&self) -> &[u8] {
        self.frame().data()
    }

    /// Return the frame to its source now
    pub fn release(mut self) {
        if let Some(frame) = self.frame.take() {
            self.source.release(frame);
        }
    }
}

impl<S: FrameSource> Drop for HeldFrame<'_, S> {
    fn drop(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.source.release(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedSource;

    #[test]
    fn test_guard_releases_on_drop() {
        let source = ScriptedSource::new(vec![Some(100)]);
        {
            let held = source.hold().unwrap();
            assert_eq!(held.data().len(), 100);
            assert_eq!(source.outstanding(), 1);
        }
        assert_eq!(source.outstanding(), 0);
        assert_eq!(source.released(), vec![1]);
    }

    #[test]
    fn test_explicit_release_happens_once() {
        let source = ScriptedSource::new(vec![Some(10), Some(20)]);
        let held = source.hold().unwrap();
        held.release();
        let held = source.hold().unwrap();
        drop(held);

        assert_eq!(source.released(), vec![1, 2]);
        assert_eq!(source.outstanding(), 0);
    }

    #[test]
    fn test_failed_pull_yields_no_guard() {
        let source = ScriptedSource::new(vec![None]);
        assert!(source.hold().is_none());
        assert!(source.released().is_empty());
    }

    #[test]
    fn test_default_metadata_is_absent() {
        struct Bare(Vec<u8>);
        impl FrameBuffer for Bare {
            fn data(&self) -> &[u8] {
                &self.0
            }
        }

        let frame = Bare(vec![0xFF, 0xD8]);
        assert_eq!(frame.len(), 2);
        assert!(!frame.is_empty());
        assert!(frame.timestamp().is_none());
        assert!(frame.sequence().is_none());
    }
}
