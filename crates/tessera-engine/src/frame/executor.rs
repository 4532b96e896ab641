use crate::device::FrameError;
use crate::render::DrawCall;

/// What one frame records: a cleared pass with a single draw.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PassPlan {
    pub clear: wgpu::Color,
    pub draw: DrawCall,
}

/// Driver operations a frame needs, in the order the executor calls them.
///
/// Views and command buffers are passed by value: a command buffer can be
/// submitted once and a view presented once because both are moved.
pub trait FrameBackend {
    type View;
    type Commands;

    /// `Ok(None)` skips the frame; `Err` ends the run.
    fn acquire_view(&mut self) -> Result<Option<Self::View>, FrameError>;

    /// Opens an encoder, records the pass into `view` and finishes it.
    ///
    /// Fails, before anything is submitted, when `plan` cannot be recorded.
    fn record(&mut self, view: &Self::View, plan: &PassPlan) -> Result<Self::Commands, FrameError>;

    fn submit(&mut self, commands: Self::Commands);

    fn present(&mut self, view: Self::View);

    /// Non-blocking driver progress (completion callbacks, device-lost).
    fn tick(&mut self);
}

/// Where the current frame is.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FramePhase {
    Idle,
    ViewAcquired,
    Recorded,
    Submitted,
    Presented,
}

impl FramePhase {
    /// Legal successor of `self` on the success path (skips return to `Idle`
    /// from `Idle` without passing through here).
    pub fn next(self) -> FramePhase {
        match self {
            FramePhase::Idle => FramePhase::ViewAcquired,
            FramePhase::ViewAcquired => FramePhase::Recorded,
            FramePhase::Recorded => FramePhase::Submitted,
            FramePhase::Submitted => FramePhase::Presented,
            FramePhase::Presented => FramePhase::Idle,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameOutcome {
    Presented,
    Skipped,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameStats {
    pub presented: u64,
    pub skipped: u64,
}

/// Runs frames strictly one at a time.
#[derive(Debug)]
pub struct FrameExecutor {
    phase: FramePhase,
    stats: FrameStats,
}

impl Default for FrameExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameExecutor {
    pub fn new() -> Self {
        Self {
            phase: FramePhase::Idle,
            stats: FrameStats::default(),
        }
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    fn advance(&mut self) {
        self.phase = self.phase.next();
        log::trace!("frame phase -> {:?}", self.phase);
    }

    /// Executes one tick.
    ///
    /// Skipped frames touch nothing beyond the acquisition attempt: no encoder,
    /// no submit, no present, no tick. A failed recording submits nothing.
    pub fn run_frame<B: FrameBackend>(
        &mut self,
        backend: &mut B,
        plan: &PassPlan,
    ) -> Result<FrameOutcome, FrameError> {
        debug_assert_eq!(self.phase, FramePhase::Idle, "frame started while another is in flight");

        let view = match backend.acquire_view()? {
            Some(view) => view,
            None => {
                self.stats.skipped += 1;
                log::debug!("frame skipped (no surface view)");
                return Ok(FrameOutcome::Skipped);
            }
        };
        self.advance();

        let commands = match backend.record(&view, plan) {
            Ok(commands) => commands,
            Err(err) => {
                // The view is dropped unpresented; the surface discards it.
                self.phase = FramePhase::Idle;
                log::error!("frame recording failed: {err}");
                return Err(err);
            }
        };
        self.advance();

        backend.submit(commands);
        self.advance();

        backend.present(view);
        self.advance();

        backend.tick();
        self.advance();

        self.stats.presented += 1;
        Ok(FrameOutcome::Presented)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Acquire,
        Record(u32, DrawCall),
        Submit(u32),
        Present(u32),
        Tick,
    }

    /// Not `Clone`: a second submit of the same buffer cannot be written.
    struct Commands(u32);

    enum Scripted {
        View(u32),
        Unavailable,
        Fatal,
    }

    #[derive(Default)]
    struct RecordingBackend {
        script: VecDeque<Scripted>,
        calls: Vec<Call>,
        encoders: u32,
        /// Draw the "mesh" provides; `None` accepts any plan.
        mesh_draw: Option<DrawCall>,
    }

    impl RecordingBackend {
        fn scripted(script: impl IntoIterator<Item = Scripted>) -> Self {
            Self {
                script: script.into_iter().collect(),
                ..Self::default()
            }
        }
    }

    impl FrameBackend for RecordingBackend {
        type View = u32;
        type Commands = Commands;

        fn acquire_view(&mut self) -> Result<Option<u32>, FrameError> {
            self.calls.push(Call::Acquire);
            match self.script.pop_front() {
                Some(Scripted::View(id)) => Ok(Some(id)),
                Some(Scripted::Unavailable) | None => Ok(None),
                Some(Scripted::Fatal) => Err(FrameError::SurfaceFatal("out of memory".into())),
            }
        }

        fn record(&mut self, view: &u32, plan: &PassPlan) -> Result<Commands, FrameError> {
            if let Some(mesh) = self.mesh_draw.filter(|&mesh| mesh != plan.draw) {
                return Err(FrameError::PlanMismatch { planned: plan.draw, mesh });
            }
            self.encoders += 1;
            self.calls.push(Call::Record(*view, plan.draw));
            Ok(Commands(*view))
        }

        fn submit(&mut self, commands: Commands) {
            self.calls.push(Call::Submit(commands.0));
        }

        fn present(&mut self, view: u32) {
            self.calls.push(Call::Present(view));
        }

        fn tick(&mut self) {
            self.calls.push(Call::Tick);
        }
    }

    fn plan(draw: DrawCall) -> PassPlan {
        PassPlan {
            clear: wgpu::Color { r: 0.9, g: 0.1, b: 0.2, a: 1.0 },
            draw,
        }
    }

    const SIX_VERTICES: DrawCall = DrawCall::Draw { vertex_count: 6, instance_count: 1 };

    #[test]
    fn presented_frame_follows_strict_order() {
        let mut backend = RecordingBackend::scripted([Scripted::View(1)]);
        let mut exec = FrameExecutor::new();

        let outcome = exec.run_frame(&mut backend, &plan(SIX_VERTICES));

        assert_eq!(outcome, Ok(FrameOutcome::Presented));
        assert_eq!(
            backend.calls,
            [
                Call::Acquire,
                Call::Record(1, SIX_VERTICES),
                Call::Submit(1),
                Call::Present(1),
                Call::Tick,
            ]
        );
        assert_eq!(exec.phase(), FramePhase::Idle);
    }

    #[test]
    fn unavailable_view_touches_nothing() {
        let mut backend = RecordingBackend::scripted([Scripted::Unavailable]);
        let mut exec = FrameExecutor::new();

        assert_eq!(
            exec.run_frame(&mut backend, &plan(SIX_VERTICES)),
            Ok(FrameOutcome::Skipped)
        );
        assert_eq!(backend.calls, [Call::Acquire]);
        assert_eq!(backend.encoders, 0);
        assert_eq!(exec.stats(), FrameStats { presented: 0, skipped: 1 });
    }

    #[test]
    fn rendering_resumes_after_unavailable_surface() {
        let mut backend = RecordingBackend::scripted([
            Scripted::View(1),
            Scripted::Unavailable,
            Scripted::Unavailable,
            Scripted::View(2),
        ]);
        let mut exec = FrameExecutor::new();
        let p = plan(SIX_VERTICES);

        let outcomes: Vec<_> = (0..4).map(|_| exec.run_frame(&mut backend, &p)).collect();
        assert_eq!(
            outcomes,
            [
                Ok(FrameOutcome::Presented),
                Ok(FrameOutcome::Skipped),
                Ok(FrameOutcome::Skipped),
                Ok(FrameOutcome::Presented),
            ]
        );

        let presents: Vec<_> = backend
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Present(_)))
            .collect();
        assert_eq!(presents, [&Call::Present(1), &Call::Present(2)]);
        assert_eq!(exec.stats(), FrameStats { presented: 2, skipped: 2 });
    }

    #[test]
    fn each_submit_is_followed_by_exactly_one_present() {
        let mut backend =
            RecordingBackend::scripted((1..=3).map(Scripted::View).collect::<Vec<_>>());
        let mut exec = FrameExecutor::new();
        let p = plan(DrawCall::DrawIndexed { index_count: 6, instance_count: 1 });
        for _ in 0..3 {
            exec.run_frame(&mut backend, &p).unwrap();
        }

        assert_eq!(backend.encoders, 3);
        let submits_and_presents: Vec<_> = backend
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Submit(_) | Call::Present(_)))
            .cloned()
            .collect();
        assert_eq!(
            submits_and_presents,
            [
                Call::Submit(1),
                Call::Present(1),
                Call::Submit(2),
                Call::Present(2),
                Call::Submit(3),
                Call::Present(3),
            ]
        );
    }

    #[test]
    fn fatal_acquisition_propagates_without_recording() {
        let mut backend = RecordingBackend::scripted([Scripted::Fatal]);
        let mut exec = FrameExecutor::new();

        let outcome = exec.run_frame(&mut backend, &plan(SIX_VERTICES));
        assert!(matches!(outcome, Err(FrameError::SurfaceFatal(_))));
        assert_eq!(backend.calls, [Call::Acquire]);
        assert_eq!(exec.phase(), FramePhase::Idle);
    }

    #[test]
    fn mismatched_plan_is_reported_and_nothing_submitted() {
        let mut backend = RecordingBackend {
            mesh_draw: Some(SIX_VERTICES),
            ..RecordingBackend::scripted([Scripted::View(1), Scripted::View(2)])
        };
        let mut exec = FrameExecutor::new();
        let indexed = DrawCall::DrawIndexed { index_count: 6, instance_count: 1 };

        assert_eq!(
            exec.run_frame(&mut backend, &plan(indexed)),
            Err(FrameError::PlanMismatch { planned: indexed, mesh: SIX_VERTICES })
        );
        assert_eq!(backend.calls, [Call::Acquire]);
        assert_eq!(exec.phase(), FramePhase::Idle);

        // A matching plan still renders afterwards.
        assert_eq!(
            exec.run_frame(&mut backend, &plan(SIX_VERTICES)),
            Ok(FrameOutcome::Presented)
        );
    }

    #[test]
    fn phases_cycle_back_to_idle() {
        let mut phase = FramePhase::Idle;
        let mut seen = vec![phase];
        for _ in 0..5 {
            phase = phase.next();
            seen.push(phase);
        }
        assert_eq!(
            seen,
            [
                FramePhase::Idle,
                FramePhase::ViewAcquired,
                FramePhase::Recorded,
                FramePhase::Submitted,
                FramePhase::Presented,
                FramePhase::Idle,
            ]
        );
    }
}
