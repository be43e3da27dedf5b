//! Strictly ordered feedback playback.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::config::FeedbackConfig;
use crate::engine::{HapticEngine, HapticPulse, SpeechEngine};
use crate::prompt::{Prompt, PromptTable};

/// One step of a feedback sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Play a haptic pulse.
    Pulse(HapticPulse),
    /// Speak a prompt and wait for it to finish.
    Speak(Prompt),
    /// Wait for a fixed time.
    Wait(Duration),
}

/// An ordered list of steps. Each step starts only after the previous one
/// has completed.
///
/// # Example
///
/// ```
/// use scan_feedback::{HapticPulse, Prompt, Sequence, Step};
///
/// let seq = Sequence::new().speak(Prompt::CountdownBegins).pulse(HapticPulse::CountdownTick);
/// assert_eq!(seq.steps()[0], Step::Speak(Prompt::CountdownBegins));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sequence {
    steps: Vec<Step>,
}

impl Sequence {
    /// An empty sequence.
    #[must_use]
    pub const fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Appends a haptic pulse.
    #[must_use]
    pub fn pulse(mut self, pulse: HapticPulse) -> Self {
        self.steps.push(Step::Pulse(pulse));
        self
    }

    /// Appends a spoken prompt.
    #[must_use]
    pub fn speak(mut self, prompt: Prompt) -> Self {
        self.steps.push(Step::Speak(prompt));
        self
    }

    /// Appends a pause.
    #[must_use]
    pub fn wait(mut self, duration: Duration) -> Self {
        self.steps.push(Step::Wait(duration));
        self
    }

    /// The steps in order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

/// How a sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceOutcome {
    /// Every step ran.
    Completed,
    /// Canceled before the last step ran.
    Canceled,
}

/// Resolves when a queued sequence ends.
#[derive(Debug)]
pub struct SequenceHandle {
    done: oneshot::Receiver<SequenceOutcome>,
}

impl SequenceHandle {
    /// Waits for the sequence to end.
    pub async fn finished(self) -> SequenceOutcome {
        self.done.await.unwrap_or(SequenceOutcome::Canceled)
    }
}

struct Queued {
    generation: u64,
    sequence: Sequence,
    done: oneshot::Sender<SequenceOutcome>,
}

struct Inner {
    config: FeedbackConfig,
    haptics: Arc<dyn HapticEngine>,
    queue: mpsc::UnboundedSender<Queued>,
    generation: watch::Sender<u64>,
    scanning_pulses: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(task) = self.scanning_pulses.get_mut().take() {
            task.abort();
        }
    }
}

/// Plays haptic pulses and spoken prompts in a deterministic order.
///
/// Sequences are queued FIFO and run one at a time on a background task; a
/// spoken step holds the queue until the speech engine reports completion.
/// Standalone pulses ([`pulse`](Self::pulse)) and the repeating scanning
/// haptic bypass the queue.
///
/// All cancel operations are idempotent. Must be created inside a Tokio
/// runtime.
#[derive(Clone)]
pub struct FeedbackSequencer {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for FeedbackSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackSequencer")
            .field("config", &self.inner.config)
            .field("generation", &*self.inner.generation.borrow())
            .field("scanning_pulses", &self.is_scanning_pulses_active())
            .finish_non_exhaustive()
    }
}

impl FeedbackSequencer {
    /// Creates the sequencer and spawns its playback task.
    #[must_use]
    pub fn spawn(
        config: FeedbackConfig,
        haptics: Arc<dyn HapticEngine>,
        speech: Arc<dyn SpeechEngine>,
    ) -> Self {
        let (queue, rx) = mpsc::unbounded_channel();
        let (generation, generation_rx) = watch::channel(0);
        tokio::spawn(run_queue(
            rx,
            generation_rx,
            Arc::clone(&haptics),
            speech,
            config.prompts.clone(),
        ));
        Self {
            inner: Arc::new(Inner {
                config,
                haptics,
                queue,
                generation,
                scanning_pulses: Mutex::new(None),
            }),
        }
    }

    /// Queues a sequence behind any sequences already queued.
    pub fn play(&self, sequence: Sequence) -> SequenceHandle {
        let (done, done_rx) = oneshot::channel();
        let queued = Queued {
            generation: *self.inner.generation.borrow(),
            sequence,
            done,
        };
        if let Err(mpsc::error::SendError(queued)) = self.inner.queue.send(queued) {
            warn!("feedback queue closed");
            let _ = queued.done.send(SequenceOutcome::Canceled);
        }
        SequenceHandle { done: done_rx }
    }

    /// Queues a spoken prompt.
    pub fn speak(&self, prompt: Prompt) -> SequenceHandle {
        self.play(Sequence::new().speak(prompt))
    }

    /// Plays a pulse immediately, outside the queue.
    pub fn pulse(&self, pulse: HapticPulse) {
        trace!(?pulse, "haptic");
        self.inner.haptics.play(pulse);
    }

    /// One countdown tick: a pulse now, then the remaining count spoken.
    /// Nothing is spoken at zero.
    pub fn countdown_tick(&self, remaining: u8) {
        self.pulse(HapticPulse::CountdownTick);
        if remaining > 0 {
            drop(self.speak(Prompt::Count(remaining)));
        }
    }

    /// Cancels every queued or running sequence. Their handles resolve with
    /// [`SequenceOutcome::Canceled`]. A no-op when nothing is queued.
    pub fn cancel_sequences(&self) {
        self.inner.generation.send_modify(|generation| {
            *generation = generation.wrapping_add(1);
        });
        debug!("feedback sequences canceled");
    }

    /// Starts the repeating scanning haptic. A no-op if already running.
    pub fn start_scanning_pulses(&self) {
        let mut slot = self.inner.scanning_pulses.lock();
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        let haptics = Arc::clone(&self.inner.haptics);
        let period = self.inner.config.scanning_pulse_interval();
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                haptics.play(HapticPulse::ScanningTick);
            }
        }));
        debug!(?period, "scanning pulses started");
    }

    /// Stops the repeating scanning haptic. Returns whether it was running.
    pub fn stop_scanning_pulses(&self) -> bool {
        let Some(task) = self.inner.scanning_pulses.lock().take() else {
            return false;
        };
        task.abort();
        debug!("scanning pulses stopped");
        true
    }

    /// Whether the repeating scanning haptic is running.
    #[must_use]
    pub fn is_scanning_pulses_active(&self) -> bool {
        self.inner
            .scanning_pulses
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Ends scanning feedback after a finished scan: the scanning haptic
    /// stops and the success pulse follows after the configured delay.
    pub fn scanning_finished(&self) -> SequenceHandle {
        self.stop_scanning_pulses();
        self.play(
            Sequence::new()
                .wait(self.inner.config.success_delay())
                .pulse(HapticPulse::Success),
        )
    }

    /// Ends scanning feedback after a cancel: the scanning haptic stops and
    /// the error pulse plays immediately.
    pub fn scanning_canceled(&self) {
        self.stop_scanning_pulses();
        self.pulse(HapticPulse::Error);
    }
}

async fn run_queue(
    mut rx: mpsc::UnboundedReceiver<Queued>,
    mut generation: watch::Receiver<u64>,
    haptics: Arc<dyn HapticEngine>,
    speech: Arc<dyn SpeechEngine>,
    prompts: PromptTable,
) {
    while let Some(queued) = rx.recv().await {
        let current = *generation.borrow_and_update();
        let outcome = if current == queued.generation {
            run_sequence(
                &queued.sequence,
                &mut generation,
                haptics.as_ref(),
                speech.as_ref(),
                &prompts,
            )
            .await
        } else {
            SequenceOutcome::Canceled
        };
        trace!(?outcome, "sequence ended");
        let _ = queued.done.send(outcome);
    }
    trace!("feedback queue closed");
}

async fn run_sequence(
    sequence: &Sequence,
    generation: &mut watch::Receiver<u64>,
    haptics: &dyn HapticEngine,
    speech: &dyn SpeechEngine,
    prompts: &PromptTable,
) -> SequenceOutcome {
    for step in sequence.steps() {
        if generation.has_changed().unwrap_or(true) {
            return SequenceOutcome::Canceled;
        }
        match *step {
            Step::Pulse(pulse) => haptics.play(pulse),
            Step::Speak(prompt) => {
                let text = prompts.text(prompt);
                tokio::select! {
                    result = speech.speak(&text) => {
                        if let Err(err) = result {
                            warn!(error = %err, ?prompt, "speech failed, continuing");
                        }
                    }
                    _ = generation.changed() => return SequenceOutcome::Canceled,
                }
            }
            Step::Wait(duration) => {
                tokio::select! {
                    () = tokio::time::sleep(duration) => {}
                    _ = generation.changed() => return SequenceOutcome::Canceled,
                }
            }
        }
    }
    SequenceOutcome::Completed
}
