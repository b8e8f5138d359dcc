//! Pipeline lifecycle integration tests.
//!
//! These tests drive the controller and trigger service with the mock
//! task runner:
//! - Stage ordering and the stop-on-first-failure rule
//! - Worker pool bounds and wall-clock behavior of waves
//! - Timeout classification
//! - Job state transitions as seen by a polling caller

use std::sync::Arc;
use std::time::{Duration, Instant};

use conductor_core::{
    testing::{fixtures, MockTaskRunner, TaskBehavior},
    JobRegistry, JobState, PipelineController, PipelineJob, PipelineTrigger, StageExecutor,
    StageSpec, TaskOutcome,
};

/// Test helper holding a trigger wired to a mock runner.
struct TestHarness {
    runner: Arc<MockTaskRunner>,
    trigger: PipelineTrigger,
}

impl TestHarness {
    fn new(stages: Vec<StageSpec>, max_concurrency: usize) -> Self {
        let runner = Arc::new(MockTaskRunner::new());
        let controller = PipelineController::new(
            StageExecutor::new(runner.clone(), max_concurrency),
            stages,
            JobRegistry::new(),
        );
        Self {
            runner,
            trigger: PipelineTrigger::new(Arc::new(controller)),
        }
    }

    /// Polls until the job reaches a terminal state.
    async fn wait_for_terminal(&self, job_id: &str) -> PipelineJob {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let job = self
                .trigger
                .status(job_id)
                .await
                .expect("job should exist");
            if job.state.is_terminal() {
                return job;
            }
            assert!(Instant::now() < deadline, "job did not finish in time");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

#[tokio::test]
async fn test_all_stages_succeed() {
    let harness = TestHarness::new(
        vec![
            fixtures::stage("collection", &["fetch_press_releases", "scrape_articles"]),
            fixtures::stage("analysis", &["analyze_sec_filings"]),
            fixtures::stage("forecast", &["generate_forecast"]),
        ],
        3,
    );

    let job = harness.trigger.trigger("AAPL").await.unwrap();
    let job = harness.wait_for_terminal(&job.id).await;

    assert_eq!(job.state, JobState::Completed);
    assert_eq!(job.stages.len(), 3);
    assert!(job.stages.iter().all(|s| s.success));
    let names: Vec<_> = job.stages.iter().map(|s| s.stage.as_str()).collect();
    assert_eq!(names, vec!["collection", "analysis", "forecast"]);
    assert!(job.started_at.is_some());
    assert!(job.finished_at.is_some());
    assert!(job.error.is_none());

    let invocations = harness.runner.invocations().await;
    assert_eq!(invocations.len(), 4);
    assert!(invocations.iter().all(|i| i.subject == "AAPL"));
}

#[tokio::test]
async fn test_failure_in_stage_k_leaves_k_results() {
    let harness = TestHarness::new(
        vec![
            fixtures::stage("one", &["a"]),
            fixtures::stage("two", &["b", "c"]),
            fixtures::stage("three", &["d"]),
            fixtures::stage("four", &["e"]),
        ],
        2,
    );
    harness.runner.set_behavior("c", TaskBehavior::fail(1)).await;

    let job = harness.trigger.trigger("MSFT").await.unwrap();
    let job = harness.wait_for_terminal(&job.id).await;

    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.stages.len(), 2);
    assert_eq!(job.failed_stage.as_deref(), Some("two"));
    assert!(job.error.as_deref().unwrap().contains("c"));
    assert_eq!(harness.runner.invocations_of("d").await, 0);
    assert_eq!(harness.runner.invocations_of("e").await, 0);
}

#[tokio::test]
async fn test_stage_a_stage_b_scenario() {
    let harness = TestHarness::new(
        vec![
            fixtures::stage("StageA", &["t1"]),
            fixtures::stage("StageB", &["t2", "t3"]),
        ],
        3,
    );
    harness
        .runner
        .set_behavior("t1", TaskBehavior::succeed_after(Duration::from_millis(200)))
        .await;
    harness.runner.set_behavior("t3", TaskBehavior::fail(1)).await;

    let job = harness.trigger.trigger("AAPL").await.unwrap();
    let job = harness.wait_for_terminal(&job.id).await;

    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.stages.len(), 2);

    let stage_a = &job.stages[0];
    assert!(stage_a.success);

    let stage_b = &job.stages[1];
    assert!(!stage_b.success);
    assert!(stage_b.task("t2").unwrap().success);
    let t3 = stage_b.task("t3").unwrap();
    assert!(!t3.success);
    assert_eq!(t3.outcome, TaskOutcome::Exited { code: 1 });
}

#[tokio::test]
async fn test_four_tasks_two_slots_run_in_two_waves() {
    let wave = Duration::from_millis(300);
    let harness = TestHarness::new(
        vec![fixtures::stage("parallel", &["w1", "w2", "w3", "w4"])],
        2,
    );
    harness
        .runner
        .set_default_behavior(TaskBehavior::succeed_after(wave))
        .await;

    let start = Instant::now();
    let job = harness.trigger.trigger_and_wait("AAPL").await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(job.state, JobState::Completed);
    assert_eq!(harness.runner.peak_concurrency(), 2);
    // two waves: not one, not four
    assert!(elapsed >= wave * 2, "finished too fast: {:?}", elapsed);
    assert!(elapsed < wave * 3, "finished too slow: {:?}", elapsed);
}

#[tokio::test]
async fn test_timeout_is_recorded_at_deadline() {
    let timeout = Duration::from_millis(300);
    let harness = TestHarness::new(
        vec![fixtures::stage_with_timeout(
            "slow",
            &["sleepy", "quick"],
            timeout,
        )],
        2,
    );
    harness
        .runner
        .set_behavior("sleepy", TaskBehavior::succeed_after(Duration::from_secs(10)))
        .await;

    let start = Instant::now();
    let job = harness.trigger.trigger_and_wait("AAPL").await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(job.state, JobState::Failed);
    let sleepy = job.stages[0].task("sleepy").unwrap();
    assert!(sleepy.timed_out());
    assert_eq!(sleepy.outcome, TaskOutcome::TimedOut { timeout_ms: 300 });
    assert!(job.stages[0].task("quick").unwrap().success);
    assert!(elapsed < Duration::from_secs(2), "waited too long: {:?}", elapsed);
}

#[tokio::test]
async fn test_hanging_task_times_out() {
    let harness = TestHarness::new(
        vec![fixtures::stage_with_timeout(
            "stuck",
            &["hang"],
            Duration::from_millis(100),
        )],
        1,
    );
    harness.runner.set_behavior("hang", TaskBehavior::Hang).await;

    let job = harness.trigger.trigger_and_wait("AAPL").await.unwrap();

    assert_eq!(job.state, JobState::Failed);
    assert!(job.stages[0].tasks[0].timed_out());
}

#[tokio::test]
async fn test_panicking_task_fails_stage_not_controller() {
    let harness = TestHarness::new(
        vec![
            fixtures::stage("one", &["boom", "fine"]),
            fixtures::stage("two", &["never"]),
        ],
        2,
    );
    harness.runner.set_behavior("boom", TaskBehavior::Panic).await;

    let job = harness.trigger.trigger_and_wait("AAPL").await.unwrap();

    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.failed_stage.as_deref(), Some("one"));
    assert_eq!(job.stages.len(), 1);
    assert!(matches!(
        job.stages[0].task("boom").unwrap().outcome,
        TaskOutcome::Crashed { .. }
    ));
    assert!(job.stages[0].task("fine").unwrap().success);
}

#[tokio::test]
async fn test_launch_failure_fails_stage() {
    let harness = TestHarness::new(vec![fixtures::stage("one", &["missing"])], 1);
    harness
        .runner
        .set_behavior("missing", TaskBehavior::LaunchError("program not found".into()))
        .await;

    let job = harness.trigger.trigger_and_wait("AAPL").await.unwrap();

    assert_eq!(job.state, JobState::Failed);
    assert!(matches!(
        job.stages[0].tasks[0].outcome,
        TaskOutcome::LaunchFailed { .. }
    ));
}

#[tokio::test]
async fn test_trigger_does_not_wait_and_job_progresses() {
    let harness = TestHarness::new(vec![fixtures::stage("slow", &["t"])], 1);
    harness
        .runner
        .set_default_behavior(TaskBehavior::succeed_after(Duration::from_millis(400)))
        .await;

    let start = Instant::now();
    let job = harness.trigger.trigger("AAPL").await.unwrap();
    assert!(start.elapsed() < Duration::from_millis(200));
    assert_eq!(job.state, JobState::Queued);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let running = harness.trigger.status(&job.id).await.unwrap();
    assert_eq!(running.state, JobState::Running);
    assert!(running.finished_at.is_none());

    let done = harness.wait_for_terminal(&job.id).await;
    assert_eq!(done.state, JobState::Completed);
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let harness = TestHarness::new(vec![fixtures::stage("one", &["a"])], 1);
    assert!(harness.trigger.status("no-such-job").await.is_none());
}

#[tokio::test]
async fn test_controller_fault_has_no_failed_stage() {
    let harness = TestHarness::new(vec![fixtures::stage("one", &["a"])], 1);
    let registry = harness.trigger.registry();
    let job = registry.create("AAPL").await;
    registry.update(&job.id, PipelineJob::start).await.unwrap();

    let job = harness
        .trigger
        .controller()
        .clone()
        .supervise(job.id)
        .await
        .unwrap();

    assert_eq!(job.state, JobState::Failed);
    assert!(job.failed_stage.is_none());
    assert!(job.stages.is_empty());
    assert!(job.error.is_some());
}

#[tokio::test]
async fn test_concurrent_triggers_same_subject_get_distinct_jobs() {
    let harness = TestHarness::new(vec![fixtures::stage("one", &["a"])], 3);

    let mut ids = Vec::new();
    for _ in 0..10 {
        ids.push(harness.trigger.trigger("AAPL").await.unwrap().id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 10);

    for id in &ids {
        let job = harness.wait_for_terminal(id).await;
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.stages.len(), 1);
    }
}
