/*!
    The frame sink trait and the in-memory sink.
*/

use std::collections::VecDeque;

use ffmpeg_types::RasterFrame;

use crate::error::SinkError;

/**
    Consumer of converted frames.

    `number` counts frames handed to the sink, starting at 1.
*/
pub trait FrameSink {
    fn write_frame(&mut self, number: u64, frame: &RasterFrame) -> Result<(), SinkError>;

    /**
        Flush anything buffered. Called once after the last frame.
    */
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn write_frame(&mut self, number: u64, frame: &RasterFrame) -> Result<(), SinkError> {
        (**self).write_frame(number, frame)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }
}

/**
    Keeps the most recent frames in memory, dropping the oldest when full.
*/
#[derive(Debug)]
pub struct MemorySink {
    capacity: usize,
    frames: VecDeque<(u64, RasterFrame)>,
    dropped: u64,
}

impl MemorySink {
    /**
        Create a sink holding at most `capacity` frames (at least one).
    */
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            frames: VecDeque::with_capacity(capacity),
            dropped: 0,
        }
    }

    pub fn frames(&self) -> impl Iterator<Item = &(u64, RasterFrame)> {
        self.frames.iter()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /**
        Number of frames evicted to stay within capacity.
    */
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn latest(&self) -> Option<&RasterFrame> {
        self.frames.back().map(|(_, frame)| frame)
    }

    /**
        Remove and return all held frames, oldest first.
    */
    pub fn take(&mut self) -> Vec<(u64, RasterFrame)> {
        self.frames.drain(..).collect()
    }
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, number: u64, frame: &RasterFrame) -> Result<(), SinkError> {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
            self.dropped += 1;
        }
        self.frames.push_back((number, frame.clone()));
        Ok(())
    }
}
