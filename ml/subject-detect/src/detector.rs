//! Debounced subject confirmation.

use std::sync::Arc;

use parking_lot::Mutex;
use sensor_types::ColorFrame;
use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::classifier::Classifier;
use crate::config::DetectorConfig;
use crate::error::Result;
use crate::observation::{Observation, Verdict};

/// Snapshot of the detector gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DetectionSignal {
    /// The subject is within the calibrated distance range.
    pub is_in_range: bool,
    /// The scene is below the brightness threshold.
    pub is_low_light: bool,
    /// The subject has been confirmed since the last reset.
    pub is_confirmed: bool,
}

/// Events emitted by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorEvent {
    /// The subject is present, in range and stable. Emitted once per reset.
    Confirmed,
    /// The subject left the range after being confirmed.
    SubjectLost,
    /// The low-light gate changed.
    LowLightChanged(bool),
}

/// What [`SubjectDetector::submit`] did with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Inference started on this frame.
    Submitted,
    /// An inference is already in flight; the frame was dropped.
    Busy,
    /// The subject is out of range; the frame was dropped.
    OutOfRange,
    /// Detection is disabled or already confirmed; the frame was dropped.
    Inactive,
}

#[derive(Debug)]
struct Gates {
    can_be_detected: bool,
    in_range: bool,
    low_light: bool,
    confirmed: bool,
    timer: Option<JoinHandle<()>>,
    timer_generation: u64,
}

impl Gates {
    const fn new() -> Self {
        Self {
            can_be_detected: true,
            in_range: false,
            low_light: false,
            confirmed: false,
            timer: None,
            timer_generation: 0,
        }
    }

    const fn accepts_result(&self) -> bool {
        self.can_be_detected && self.in_range && !self.confirmed
    }

    fn cancel_timer(&mut self) {
        self.timer_generation = self.timer_generation.wrapping_add(1);
        if let Some(timer) = self.timer.take() {
            timer.abort();
            trace!("confirmation timer canceled");
        }
    }
}

/// Runs the classifier on color frames and confirms the subject.
///
/// At most one inference is in flight: a frame arriving while the classifier
/// is busy is dropped, never queued. A confirmation fires immediately on a
/// strong positive classification, or once the confirmation delay passes
/// with the subject in range and no contrary classification.
///
/// Cloning yields another handle to the same detector. [`submit`] spawns
/// onto the current Tokio runtime.
///
/// [`submit`]: SubjectDetector::submit
#[derive(Clone)]
pub struct SubjectDetector {
    classifier: Arc<dyn Classifier>,
    config: Arc<DetectorConfig>,
    inference: Arc<Semaphore>,
    gates: Arc<Mutex<Gates>>,
    events: mpsc::UnboundedSender<DetectorEvent>,
}

impl std::fmt::Debug for SubjectDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubjectDetector")
            .field("config", &self.config)
            .field("signal", &self.signal())
            .finish_non_exhaustive()
    }
}

impl SubjectDetector {
    /// Creates a detector and the receiver for its events.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(
        config: DetectorConfig,
        classifier: Arc<dyn Classifier>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<DetectorEvent>)> {
        config.validate()?;
        let (events, rx) = mpsc::unbounded_channel();
        let detector = Self {
            classifier,
            config: Arc::new(config),
            inference: Arc::new(Semaphore::new(1)),
            gates: Arc::new(Mutex::new(Gates::new())),
            events,
        };
        Ok((detector, rx))
    }

    /// Current gate values.
    #[must_use]
    pub fn signal(&self) -> DetectionSignal {
        let gates = self.gates.lock();
        DetectionSignal {
            is_in_range: gates.in_range,
            is_low_light: gates.low_light,
            is_confirmed: gates.confirmed,
        }
    }

    /// Whether a classification is running.
    #[must_use]
    pub fn is_inference_in_flight(&self) -> bool {
        self.inference.available_permits() == 0
    }

    /// Offers a frame to the classifier.
    ///
    /// Never waits: the frame is dropped when an inference is already in
    /// flight or the gates make a result useless.
    pub fn submit(&self, frame: ColorFrame) -> SubmitOutcome {
        {
            let gates = self.gates.lock();
            if !gates.can_be_detected || gates.confirmed {
                return SubmitOutcome::Inactive;
            }
            if !gates.in_range {
                return SubmitOutcome::OutOfRange;
            }
        }
        let Ok(permit) = Arc::clone(&self.inference).try_acquire_owned() else {
            trace!("inference in flight, frame dropped");
            return SubmitOutcome::Busy;
        };

        let detector = self.clone();
        tokio::spawn(async move {
            let result = detector.classifier.classify(&frame).await;
            drop(permit);
            detector.on_classified(result);
        });
        SubmitOutcome::Submitted
    }

    fn on_classified(&self, result: Result<Vec<Observation>>) {
        let mut gates = self.gates.lock();
        let verdict = match result {
            Ok(observations) => self.config.evaluate(&observations, gates.low_light),
            Err(err) => {
                warn!(error = %err, "classification failed");
                Verdict::Inconclusive
            }
        };
        if !gates.accepts_result() {
            trace!(?verdict, "classification ignored by gates");
            return;
        }
        debug!(?verdict, low_light = gates.low_light, "classification");
        match verdict {
            Verdict::Positive => self.confirm(&mut gates),
            Verdict::Contrary => gates.cancel_timer(),
            Verdict::Inconclusive => {
                if gates.timer.is_none() {
                    self.arm_timer(&mut gates);
                }
            }
        }
    }

    fn arm_timer(&self, gates: &mut Gates) {
        gates.timer_generation = gates.timer_generation.wrapping_add(1);
        let generation = gates.timer_generation;
        let delay = self.config.confirm_after();
        let detector = self.clone();
        gates.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            detector.on_timer(generation);
        }));
        trace!(generation, "confirmation timer armed");
    }

    fn on_timer(&self, generation: u64) {
        let mut gates = self.gates.lock();
        if gates.timer_generation != generation {
            return;
        }
        gates.timer = None;
        if gates.accepts_result() {
            self.confirm(&mut gates);
        }
    }

    fn confirm(&self, gates: &mut Gates) {
        gates.confirmed = true;
        gates.cancel_timer();
        info!("subject confirmed");
        self.emit(DetectorEvent::Confirmed);
    }

    /// Updates the in-range gate from the latest depth-at-center report.
    ///
    /// Leaving the range cancels a pending confirmation.
    pub fn update_range(&self, in_range: bool) {
        let mut gates = self.gates.lock();
        let was_in_range = std::mem::replace(&mut gates.in_range, in_range);
        if in_range || !was_in_range {
            return;
        }
        gates.cancel_timer();
        if gates.confirmed {
            debug!("subject left range after confirmation");
            self.emit(DetectorEvent::SubjectLost);
        }
    }

    /// Updates the low-light gate from the latest brightness value.
    pub fn update_brightness(&self, brightness: f64) {
        let low_light = self.config.is_low_light(brightness);
        let mut gates = self.gates.lock();
        if gates.low_light != low_light {
            gates.low_light = low_light;
            debug!(brightness, low_light, "lighting changed");
            self.emit(DetectorEvent::LowLightChanged(low_light));
        }
    }

    /// Enables or disables detection. Disabling cancels a pending confirmation.
    pub fn set_enabled(&self, enabled: bool) {
        let mut gates = self.gates.lock();
        gates.can_be_detected = enabled;
        if !enabled {
            gates.cancel_timer();
        }
    }

    /// Clears all gates and cancels the pending timer. Idempotent.
    ///
    /// Afterwards detection is enabled, out of range and unconfirmed.
    pub fn reset(&self) {
        let mut gates = self.gates.lock();
        gates.cancel_timer();
        gates.can_be_detected = true;
        gates.in_range = false;
        gates.confirmed = false;
        if std::mem::take(&mut gates.low_light) {
            self.emit(DetectorEvent::LowLightChanged(false));
        }
    }

    fn emit(&self, event: DetectorEvent) {
        if self.events.send(event).is_err() {
            trace!(?event, "no detector event listener");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::{ClassLabel, DetectError};
    use async_trait::async_trait;
    use sensor_types::Timestamp;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    struct ScriptedClassifier {
        script: Mutex<VecDeque<Result<Vec<Observation>>>>,
        fallback: Vec<Observation>,
        calls: AtomicUsize,
        hold: Option<Arc<Notify>>,
    }

    impl ScriptedClassifier {
        fn always(observations: Vec<Observation>) -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                fallback: observations,
                calls: AtomicUsize::new(0),
                hold: None,
            }
        }

        fn then(self, next: Result<Vec<Observation>>) -> Self {
            self.script.lock().push_back(next);
            self
        }

        fn held(mut self, notify: Arc<Notify>) -> Self {
            self.hold = Some(notify);
            self
        }
    }

    #[async_trait]
    impl Classifier for ScriptedClassifier {
        async fn classify(&self, _frame: &ColorFrame) -> Result<Vec<Observation>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(hold) = &self.hold {
                hold.notified().await;
            }
            let next = self.script.lock().pop_front();
            next.unwrap_or_else(|| Ok(self.fallback.clone()))
        }
    }

    fn scores(confidence: f32, foot: f32, palm: f32) -> Vec<Observation> {
        vec![Observation::new(
            confidence,
            vec![ClassLabel::new("Foot", foot), ClassLabel::new("Palm", palm)],
        )]
    }

    fn strong() -> Vec<Observation> {
        scores(0.9, 0.95, 0.001)
    }

    fn weak() -> Vec<Observation> {
        scores(0.3, 0.6, 0.002)
    }

    fn contrary() -> Vec<Observation> {
        scores(0.9, 0.1, 0.85)
    }

    fn frame() -> ColorFrame {
        ColorFrame::filled(Timestamp::default(), 2, 2, [100, 100, 100, 255])
    }

    fn detector(
        classifier: ScriptedClassifier,
    ) -> (
        SubjectDetector,
        mpsc::UnboundedReceiver<DetectorEvent>,
        Arc<ScriptedClassifier>,
    ) {
        let classifier = Arc::new(classifier);
        let (detector, rx) =
            SubjectDetector::new(DetectorConfig::default(), classifier.clone()).unwrap();
        (detector, rx, classifier)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn strong_positive_confirms_immediately() {
        let (detector, mut rx, _) = detector(ScriptedClassifier::always(strong()));
        detector.update_range(true);
        assert_eq!(detector.submit(frame()), SubmitOutcome::Submitted);
        settle().await;

        assert_eq!(rx.try_recv().unwrap(), DetectorEvent::Confirmed);
        assert!(detector.signal().is_confirmed);
        assert_eq!(detector.submit(frame()), SubmitOutcome::Inactive);
    }

    #[tokio::test(start_paused = true)]
    async fn uncontradicted_subject_confirms_after_delay() {
        let (detector, mut rx, _) = detector(ScriptedClassifier::always(weak()));
        detector.update_range(true);
        detector.submit(frame());
        settle().await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(990)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(rx.try_recv().unwrap(), DetectorEvent::Confirmed);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_weak_results_do_not_rearm_timer() {
        let (detector, mut rx, _) = detector(ScriptedClassifier::always(weak()));
        detector.update_range(true);
        for _ in 0..5 {
            detector.submit(frame());
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        // First result armed the timer at t=0; later results left it alone.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(rx.try_recv().unwrap(), DetectorEvent::Confirmed);
    }

    #[tokio::test(start_paused = true)]
    async fn contrary_result_cancels_pending_confirmation() {
        let classifier = ScriptedClassifier::always(contrary()).then(Ok(weak()));
        let (detector, mut rx, _) = detector(classifier);
        detector.update_range(true);
        detector.submit(frame());
        settle().await;
        detector.submit(frame());
        settle().await;

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
        assert!(!detector.signal().is_confirmed);
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_range_cancels_pending_confirmation() {
        let (detector, mut rx, _) = detector(ScriptedClassifier::always(weak()));
        detector.update_range(true);
        detector.submit(frame());
        settle().await;
        detector.update_range(false);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_range_frames_are_not_classified() {
        let (detector, mut rx, classifier) = detector(ScriptedClassifier::always(strong()));
        assert_eq!(detector.submit(frame()), SubmitOutcome::OutOfRange);
        settle().await;
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn range_lost_during_inference_blocks_confirmation() {
        let hold = Arc::new(Notify::new());
        let (detector, mut rx, _) =
            detector(ScriptedClassifier::always(strong()).held(hold.clone()));
        detector.update_range(true);
        detector.submit(frame());
        settle().await;
        detector.update_range(false);
        hold.notify_one();
        settle().await;

        assert!(rx.try_recv().is_err());
        assert!(!detector.signal().is_confirmed);
    }

    #[tokio::test(start_paused = true)]
    async fn frames_during_inference_are_dropped() {
        let hold = Arc::new(Notify::new());
        let (detector, _rx, classifier) =
            detector(ScriptedClassifier::always(contrary()).held(hold.clone()));
        detector.update_range(true);
        assert_eq!(detector.submit(frame()), SubmitOutcome::Submitted);
        assert_eq!(detector.submit(frame()), SubmitOutcome::Busy);
        settle().await;
        assert!(detector.is_inference_in_flight());
        assert_eq!(detector.submit(frame()), SubmitOutcome::Busy);

        hold.notify_one();
        settle().await;
        assert!(!detector.is_inference_in_flight());
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn classifier_error_is_inconclusive() {
        let classifier = ScriptedClassifier::always(weak())
            .then(Err(DetectError::classifier("model not loaded")));
        let (detector, mut rx, _) = detector(classifier);
        detector.update_range(true);
        detector.submit(frame());
        settle().await;
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(rx.try_recv().unwrap(), DetectorEvent::Confirmed);
    }

    #[tokio::test(start_paused = true)]
    async fn low_light_uses_relaxed_rule() {
        let (detector, mut rx, _) =
            detector(ScriptedClassifier::always(scores(0.21, 0.66, 0.007)));
        detector.update_brightness(-1.0);
        assert_eq!(rx.try_recv().unwrap(), DetectorEvent::LowLightChanged(true));
        detector.update_range(true);
        detector.submit(frame());
        settle().await;
        assert_eq!(rx.try_recv().unwrap(), DetectorEvent::Confirmed);
    }

    #[tokio::test(start_paused = true)]
    async fn low_light_events_only_on_change() {
        let (detector, mut rx, _) = detector(ScriptedClassifier::always(weak()));
        detector.update_brightness(-0.5);
        detector.update_brightness(-0.3);
        detector.update_brightness(0.2);
        assert_eq!(rx.try_recv().unwrap(), DetectorEvent::LowLightChanged(true));
        assert_eq!(rx.try_recv().unwrap(), DetectorEvent::LowLightChanged(false));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn subject_lost_after_confirmation() {
        let (detector, mut rx, _) = detector(ScriptedClassifier::always(strong()));
        detector.update_range(true);
        detector.submit(frame());
        settle().await;
        assert_eq!(rx.try_recv().unwrap(), DetectorEvent::Confirmed);

        detector.update_range(false);
        assert_eq!(rx.try_recv().unwrap(), DetectorEvent::SubjectLost);
        detector.update_range(false);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_detector_drops_frames() {
        let (detector, _rx, classifier) = detector(ScriptedClassifier::always(strong()));
        detector.update_range(true);
        detector.set_enabled(false);
        assert_eq!(detector.submit(frame()), SubmitOutcome::Inactive);
        settle().await;
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_is_idempotent_and_rearms_detection() {
        let (detector, mut rx, _) = detector(ScriptedClassifier::always(strong()));
        detector.update_range(true);
        detector.submit(frame());
        settle().await;
        assert_eq!(rx.try_recv().unwrap(), DetectorEvent::Confirmed);

        detector.reset();
        detector.reset();
        assert_eq!(detector.signal(), DetectionSignal::default());
        assert!(rx.try_recv().is_err());

        detector.update_range(true);
        detector.submit(frame());
        settle().await;
        assert_eq!(rx.try_recv().unwrap(), DetectorEvent::Confirmed);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_cancels_pending_timer() {
        let (detector, mut rx, _) = detector(ScriptedClassifier::always(weak()));
        detector.update_range(true);
        detector.submit(frame());
        settle().await;
        detector.reset();
        detector.update_range(true);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
    }
}
