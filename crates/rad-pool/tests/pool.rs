use std::time::{Duration, Instant};

use rad_core::config::PoolConfig;
use rad_core::CancelToken;
use rad_pool::{ProcessPool, MAX_CONCURRENT_PROCESSES, WAIT_TIME};

fn fast_pool(max_concurrent: usize) -> ProcessPool {
    ProcessPool::with_limits(max_concurrent, Duration::from_millis(20)).unwrap()
}

#[test]
fn default_limits_are_positive() {
    assert!(MAX_CONCURRENT_PROCESSES > 0);
    assert!(!WAIT_TIME.is_zero());
    let pool = ProcessPool::new();
    assert_eq!(pool.max_concurrent(), MAX_CONCURRENT_PROCESSES);
    assert_eq!(pool.wait_time(), WAIT_TIME);
}

#[test]
fn zero_limits_are_rejected() {
    assert!(ProcessPool::with_limits(0, WAIT_TIME).is_err());
    assert!(ProcessPool::with_limits(2, Duration::ZERO).is_err());
    let config = PoolConfig {
        max_concurrent: 3,
        wait_time_ms: 10,
    };
    let pool = ProcessPool::from_config(&config).unwrap();
    assert_eq!(pool.max_concurrent(), 3);
}

#[test]
fn added_commands_extend_the_queue() {
    let mut pool = ProcessPool::new();
    let before = pool.queued_len();
    pool.add_process_commands(["echo test", "uptime", "true"]);
    assert_eq!(pool.queued_len(), before + 3);
}

#[test]
fn launched_processes_are_counted_live() {
    let mut pool = fast_pool(1);
    let start = pool.number_of_running_processes();
    pool.launch_process("sleep 5").unwrap();
    pool.launch_process("sleep 5").unwrap();
    // Launching bypasses the cap of one.
    assert_eq!(pool.number_of_running_processes(), start + 2);
}

#[test]
fn run_drains_the_queue_within_the_cap() {
    let mut pool = fast_pool(2);
    pool.add_process_commands(vec!["sleep 0.3"; 5]);
    let report = pool.run_processes();
    assert!(report.peak_running <= 2, "peak was {}", report.peak_running);
    assert!(report.peak_running >= 1);
    assert_eq!(report.launched, 5);
    assert_eq!(report.outcomes.len(), 5);
    assert_eq!(pool.queued_len(), 0);
    assert_eq!(pool.number_of_running_processes(), 0);
}

#[test]
fn failing_commands_do_not_stop_the_batch() {
    let mut pool = fast_pool(2);
    pool.add_process_commands(["exit 3", "true", "false", "echo done"]);
    let report = pool.run_processes();
    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(report.failures(), 2);
    let exit3 = report
        .outcomes
        .iter()
        .find(|outcome| outcome.command == "exit 3")
        .unwrap();
    assert_eq!(exit3.exit_code, Some(3));
    assert!(!report.cancelled);
}

#[test]
fn wait_sleeps_at_least_the_interval() {
    let pool = fast_pool(1);
    let start = Instant::now();
    pool.wait();
    assert!(start.elapsed() >= Duration::from_millis(20));
    let start = Instant::now();
    pool.wait_for(Duration::from_millis(50));
    assert!(start.elapsed() >= Duration::from_millis(50));
}

#[test]
fn cancelled_pool_launches_nothing() {
    let token = CancelToken::new();
    token.cancel();
    let mut pool = fast_pool(2).with_cancel_token(token);
    pool.add_process_commands(["true", "true"]);
    let report = pool.run_processes();
    assert!(report.cancelled);
    assert_eq!(report.launched, 0);
    assert_eq!(report.remaining, 2);
    assert_eq!(pool.queued_len(), 2);
}

#[test]
fn stop_sentinel_halts_further_launches() {
    let dir = tempfile::tempdir().unwrap();
    let sentinel = dir.path().join("STOP");
    let token = CancelToken::new().with_sentinel(&sentinel);
    let mut pool = fast_pool(1).with_cancel_token(token);
    pool.add_process_commands([
        format!("touch '{}'", sentinel.display()),
        "sleep 0.1".to_string(),
        "sleep 0.1".to_string(),
    ]);
    let report = pool.run_processes();
    assert!(report.cancelled);
    assert_eq!(report.launched, 1);
    assert_eq!(report.remaining, 2);
    assert!(report.outcomes[0].success);
}
