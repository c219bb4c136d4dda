// BufferPool - lock-free frame pool with dual SPSC queues
//
// Object pool built from two lock-free SPSC ring buffers so the capture
// callback never allocates.
//
// Buffer flow:
// 1. Capture thread pops an empty frame from the pool queue
// 2. Capture thread fills it with FRAME_SIZE samples (normalised floats)
// 3. Capture thread pushes the filled frame to the data queue
// 4. Analysis thread pops the frame, advances its clock past any dropped
//    samples and runs the detector over it
// 5. Analysis thread pushes the frame back to the pool queue

use rtrb::{Consumer, Producer};

use crate::config::{BUFFER_POOL_SIZE, FRAME_SIZE};

/// One analysis frame of normalised float samples
///
/// Samples stay as floats until the detector has validated them, so a
/// non-finite value from the device is rejected rather than clamped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameBuffer {
    pub samples: Vec<f32>,
    /// Samples lost to pool exhaustion between the previous frame and this one
    pub dropped_before: u64,
}

impl FrameBuffer {
    pub fn new(frame_size: usize) -> Self {
        Self {
            samples: vec![0.0; frame_size],
            dropped_before: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn push(&mut self, sample: f32) {
        self.samples.push(sample);
    }

    /// Empty the frame for refilling; capacity is kept
    pub fn clear(&mut self) {
        self.samples.clear();
        self.dropped_before = 0;
    }
}

/// All four queue endpoints, before they are handed to their threads
pub struct BufferPoolChannels {
    /// Filled frames, capture -> analysis
    pub data_producer: Producer<FrameBuffer>,
    pub data_consumer: Consumer<FrameBuffer>,
    /// Empty frames, analysis -> capture
    pub pool_producer: Producer<FrameBuffer>,
    pub pool_consumer: Consumer<FrameBuffer>,
}

/// Endpoints owned by the capture callback
pub struct CaptureChannels {
    pub data_producer: Producer<FrameBuffer>,
    pub pool_consumer: Consumer<FrameBuffer>,
}

/// Endpoints owned by the analysis thread
pub struct AnalysisChannels {
    pub data_consumer: Consumer<FrameBuffer>,
    pub pool_producer: Producer<FrameBuffer>,
}

impl BufferPoolChannels {
    /// Hand each side its own pair of endpoints
    pub fn split(self) -> (CaptureChannels, AnalysisChannels) {
        (
            CaptureChannels {
                data_producer: self.data_producer,
                pool_consumer: self.pool_consumer,
            },
            AnalysisChannels {
                data_consumer: self.data_consumer,
                pool_producer: self.pool_producer,
            },
        )
    }
}

/// Lock-free pool of pre-allocated frames
pub struct BufferPool;

impl BufferPool {
    /// Create the queues and pre-allocate `buffer_count` frames
    ///
    /// # Panics
    /// Panics if buffer_count is 0 or frame_size is 0
    #[allow(clippy::new_ret_no_self)]
    pub fn new(buffer_count: usize, frame_size: usize) -> BufferPoolChannels {
        assert!(buffer_count > 0, "buffer_count must be greater than 0");
        assert!(frame_size > 0, "frame_size must be greater than 0");

        let (mut pool_producer, pool_consumer) = rtrb::RingBuffer::new(buffer_count);
        let (data_producer, data_consumer) = rtrb::RingBuffer::new(buffer_count);

        // The only heap allocation of the capture path
        for _ in 0..buffer_count {
            let pushed = pool_producer.push(FrameBuffer::new(frame_size));
            debug_assert!(pushed.is_ok());
        }

        BufferPoolChannels {
            data_producer,
            data_consumer,
            pool_producer,
            pool_consumer,
        }
    }

    /// Pool sized for the default frame layout
    pub fn with_defaults() -> BufferPoolChannels {
        Self::new(BUFFER_POOL_SIZE, FRAME_SIZE)
    }
}
