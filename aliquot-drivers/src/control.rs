//! Operator signals for replay
//!
//! A single-producer single-consumer channel between whatever the
//! operator touches (a button task, a serial console) and the replay
//! loop. Requests are consumed at the next checkpoint, between commands.

use aliquot_core::queue::{ReplayControl, Signal};
use heapless::spsc::{Consumer, Producer, Queue};

/// Default channel depth; holds one less request than this
pub const DEFAULT_DEPTH: usize = 4;

/// Operator request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Request {
    /// Stop before the next command; resume with `CommandQueue::resume`
    Pause,
    /// Stop and discard the remaining commands
    Abort,
}

/// Backing storage for a request channel
pub struct SignalChannel<const N: usize = DEFAULT_DEPTH> {
    queue: Queue<Request, N>,
}

impl<const N: usize> Default for SignalChannel<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SignalChannel<N> {
    pub const fn new() -> Self {
        Self {
            queue: Queue::new(),
        }
    }

    /// Split into the operator and replay ends
    pub fn split(&mut self) -> (Operator<'_, N>, Checkpoint<'_, N>) {
        let (producer, consumer) = self.queue.split();
        (Operator { producer }, Checkpoint { consumer })
    }
}

/// Operator end of the channel
pub struct Operator<'a, const N: usize> {
    producer: Producer<'a, Request, N>,
}

impl<const N: usize> Operator<'_, N> {
    /// Post a request; returns it back if the channel is full
    pub fn send(&mut self, request: Request) -> Result<(), Request> {
        self.producer.enqueue(request)
    }

    pub fn pause(&mut self) -> Result<(), Request> {
        self.send(Request::Pause)
    }

    pub fn abort(&mut self) -> Result<(), Request> {
        self.send(Request::Abort)
    }
}

/// Replay end of the channel
pub struct Checkpoint<'a, const N: usize> {
    consumer: Consumer<'a, Request, N>,
}

impl<const N: usize> Checkpoint<'_, N> {
    /// Requests waiting to be consumed
    pub fn pending(&self) -> usize {
        self.consumer.len()
    }
}

impl<const N: usize> ReplayControl for Checkpoint<'_, N> {
    #[cfg_attr(not(feature = "defmt"), allow(unused_variables))]
    fn checkpoint(&mut self, next: usize) -> Signal {
        match self.consumer.dequeue() {
            Some(Request::Pause) => {
                #[cfg(feature = "defmt")]
                defmt::info!("operator: pause before command {}", next);
                Signal::Pause
            }
            Some(Request::Abort) => {
                #[cfg(feature = "defmt")]
                defmt::info!("operator: abort before command {}", next);
                Signal::Abort
            }
            None => Signal::Continue,
        }
    }
}
