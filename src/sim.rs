//! Demo, benchmark and timed-run modes for the factory floor CLI.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::{CUT_DURATION_MS, FactoryConfig, RetryPolicy, TRANSIT_DELAY_MS};
use crate::error::OrchestratorError;
use crate::job::Job;
use crate::machine::{CutInHalf, Machine, SourceStation, TypedProcessor};
use crate::material::MaterialKind;
use crate::orchestrator::Orchestrator;
use crate::types::MachineId;

// Demo timing knobs (small for quick CLI feedback).
const DEMO_GENERATION_MS: u64 = 100;
const DEMO_TRANSIT_MS: u64 = 50;
const DEMO_CUT_MS: u64 = 150;
const DEMO_CUT_JOBS: usize = 3;
const DEMO_MAX_WAIT_MS: u64 = 20_000;
// Benchmark waits for the station to be stocked before timing starts.
const BENCH_STOCK_POLL_MS: u64 = 5;
const BENCH_MAX_WAIT_MS: u64 = 120_000;

/// Best-effort CPU user/system time snapshot (seconds) on Unix platforms.
#[cfg(unix)]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    // SAFETY: rusage is plain old data; getrusage fills it in place.
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
    if rc != 0 {
        return None;
    }
    let seconds = |tv: libc::timeval| tv.tv_sec as f64 + tv.tv_usec as f64 / 1_000_000.0;
    Some((seconds(usage.ru_utime), seconds(usage.ru_stime)))
}

#[cfg(not(unix))]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    None
}

/// The standard floor: one source station, two arms, one pipe cutter.
struct Floor {
    orchestrator: Orchestrator,
    station: Arc<SourceStation>,
    cutter: Arc<TypedProcessor>,
    arms: [MachineId; 2],
}

impl Floor {
    fn build(config: FactoryConfig, cut: Duration) -> Result<Self, OrchestratorError> {
        let orchestrator = Orchestrator::new(config);
        let station = Arc::new(SourceStation::new("station"));
        let cutter = Arc::new(TypedProcessor::new("cutter", CutInHalf::new(cut)));
        orchestrator.register(station.clone())?;
        let arms = [
            orchestrator.add_transporter("arm-1")?,
            orchestrator.add_transporter("arm-2")?,
        ];
        orchestrator.register(cutter.clone())?;
        Ok(Self {
            orchestrator,
            station,
            cutter,
            arms,
        })
    }

    fn station_id(&self) -> MachineId {
        self.station.id()
    }

    fn cutter_id(&self) -> MachineId {
        self.cutter.id()
    }

    /// Fetch a pipe from the station and cut it.
    fn cut_pipe_job(&self, index: usize) -> Job {
        cut_pipe_job(index, self.arms, self.station_id(), self.cutter_id())
    }
}

fn cut_pipe_job(index: usize, arms: [MachineId; 2], station: MachineId, cutter: MachineId) -> Job {
    Job::new(format!("cut-pipe-{index}"))
        .move_material(arms[index % arms.len()], MaterialKind::MetalPipe, station, cutter)
        .process(cutter, MaterialKind::MetalPipe, MaterialKind::MetalPipeHalf)
}

/// Run the default demo: three cut jobs and one job that feeds gravel to the
/// cutter, which must abort.
pub fn run_demo() -> Result<(), OrchestratorError> {
    info!("demo start");
    let config = FactoryConfig {
        generation_interval: Duration::from_millis(DEMO_GENERATION_MS),
        transit_delay: Duration::from_millis(DEMO_TRANSIT_MS),
        ..FactoryConfig::default()
    };
    let floor = Floor::build(config, Duration::from_millis(DEMO_CUT_MS))?;
    let orchestrator = &floor.orchestrator;
    let worker_count = orchestrator.config().worker_count;

    orchestrator.start_resource_generation()?;
    orchestrator.start_workers(worker_count)?;

    for index in 1..=DEMO_CUT_JOBS {
        orchestrator.enqueue_job(floor.cut_pipe_job(index))?;
    }
    let misrouted = Job::new("gravel-to-cutter").move_material(
        floor.arms[1],
        MaterialKind::Gravel,
        floor.station_id(),
        floor.cutter_id(),
    );
    orchestrator.enqueue_job(misrouted)?;

    let total = (DEMO_CUT_JOBS + 1) as u64;
    let start = Instant::now();
    if !orchestrator.wait_for_finished_jobs(total, Duration::from_millis(DEMO_MAX_WAIT_MS)) {
        warn!("demo timed out waiting for jobs");
    }
    orchestrator.shutdown();
    info!(elapsed_ms = start.elapsed().as_millis() as u64, "demo finished");

    let stats = orchestrator.stats();
    println!("DEMO SUMMARY");
    println!("machines=4 workers={worker_count}");
    println!("jobs_total={total}");
    println!("jobs_completed={}", stats.jobs_completed);
    println!("jobs_aborted={}", stats.jobs_aborted);
    println!("step_retries={}", stats.step_retries);
    println!("cutter_processed={}", floor.cutter.processed());
    println!("cutter_output={}", floor.cutter.output_len());
    println!("station_generated={}", floor.station.generated());
    Ok(())
}

/// Aggregated metrics from a single benchmark run.
struct BenchResult {
    jobs: usize,
    workers: usize,
    elapsed_ms: f64,
    throughput: f64,
    completed: u64,
    aborted: u64,
    retries: u64,
    cpu_user_s: Option<f64>,
    cpu_sys_s: Option<f64>,
}

fn benchmark_once(
    jobs: usize,
    workers: usize,
    cut: Duration,
    transit: Duration,
) -> Result<BenchResult, OrchestratorError> {
    let config = FactoryConfig {
        worker_count: workers,
        transit_delay: transit,
        retry: RetryPolicy::default(),
        ..FactoryConfig::default()
    };
    let floor = Floor::build(config, cut)?;
    let orchestrator = &floor.orchestrator;

    // Stock one pipe per job so no step has to wait on the generation timer.
    for _ in 0..jobs {
        orchestrator.request_generation(MaterialKind::MetalPipe)?;
    }
    let stock_deadline = Instant::now() + Duration::from_millis(BENCH_MAX_WAIT_MS);
    while floor.station.stock(MaterialKind::MetalPipe) < jobs && Instant::now() < stock_deadline {
        thread::sleep(Duration::from_millis(BENCH_STOCK_POLL_MS));
    }

    for index in 0..jobs {
        orchestrator.enqueue_job(floor.cut_pipe_job(index))?;
    }

    let cpu_start = cpu_times_seconds();
    let start = Instant::now();
    orchestrator.start_workers(workers)?;
    if !orchestrator.wait_for_finished_jobs(jobs as u64, Duration::from_millis(BENCH_MAX_WAIT_MS)) {
        warn!(jobs, "benchmark timed out waiting for jobs");
    }
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    orchestrator.shutdown();

    let stats = orchestrator.stats();
    let throughput = if elapsed_ms > 0.0 {
        stats.jobs_completed as f64 / (elapsed_ms / 1000.0)
    } else {
        0.0
    };
    let (cpu_user_s, cpu_sys_s) = match (cpu_start, cpu_times_seconds()) {
        (Some((user_start, sys_start)), Some((user_end, sys_end))) => {
            (Some(user_end - user_start), Some(sys_end - sys_start))
        }
        _ => (None, None),
    };

    Ok(BenchResult {
        jobs,
        workers,
        elapsed_ms,
        throughput,
        completed: stats.jobs_completed,
        aborted: stats.jobs_aborted,
        retries: stats.step_retries,
        cpu_user_s,
        cpu_sys_s,
    })
}

/// Run one benchmark and print a CSV header plus one row.
pub fn run_benchmark(
    jobs: usize,
    workers: usize,
    cut_ms: u64,
    transit_ms: u64,
) -> Result<(), OrchestratorError> {
    let result = benchmark_once(
        jobs,
        workers,
        Duration::from_millis(cut_ms),
        Duration::from_millis(transit_ms),
    )?;

    let format_cpu = |value: Option<f64>| {
        value
            .map(|v| format!("{v:.4}"))
            .unwrap_or_else(|| "NA".to_string())
    };
    println!(
        "jobs,workers,elapsed_ms,throughput_jobs_per_s,completed,aborted,retries,\
         cpu_user_s,cpu_sys_s"
    );
    println!(
        "{},{},{:.2},{:.2},{},{},{},{},{}",
        result.jobs,
        result.workers,
        result.elapsed_ms,
        result.throughput,
        result.completed,
        result.aborted,
        result.retries,
        format_cpu(result.cpu_user_s),
        format_cpu(result.cpu_sys_s),
    );
    if result.completed + result.aborted < result.jobs as u64 {
        eprintln!(
            "# warning,unfinished_jobs,{}",
            result.jobs as u64 - result.completed - result.aborted
        );
    }
    Ok(())
}

/// Run the full floor with generation and the job spawner for a fixed time.
pub fn run_timed(
    duration: Duration,
    spawn_interval: Duration,
    workers: usize,
) -> Result<(), OrchestratorError> {
    let config = FactoryConfig {
        worker_count: workers,
        ..FactoryConfig::default()
    };
    let floor = Floor::build(config, Duration::from_millis(CUT_DURATION_MS))?;
    let orchestrator = &floor.orchestrator;
    let (arms, station, cutter) = (floor.arms, floor.station_id(), floor.cutter_id());

    orchestrator.start_resource_generation()?;
    orchestrator.start_workers(workers)?;
    let mut spawned = 0usize;
    orchestrator.start_job_spawner(
        move || {
            spawned += 1;
            cut_pipe_job(spawned, arms, station, cutter)
        },
        spawn_interval,
    )?;

    thread::sleep(duration);
    orchestrator.shutdown();

    let stats = orchestrator.stats();
    println!("RUN SUMMARY");
    println!(
        "seconds={:.1} workers={workers} transit_ms={TRANSIT_DELAY_MS}",
        duration.as_secs_f64()
    );
    println!("jobs_enqueued={}", stats.jobs_enqueued);
    println!("jobs_completed={}", stats.jobs_completed);
    println!("jobs_aborted={}", stats.jobs_aborted);
    println!("jobs_pending={}", orchestrator.pending_jobs());
    println!("step_retries={}", stats.step_retries);
    println!("cutter_output={}", floor.cutter.output_len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cut_jobs_alternate_arms() {
        let arms = [MachineId::next(), MachineId::next()];
        let (station, cutter) = (MachineId::next(), MachineId::next());
        let first = cut_pipe_job(0, arms, station, cutter);
        let second = cut_pipe_job(1, arms, station, cutter);
        assert_eq!(first.remaining(), 2);
        assert_eq!(first.next_step().map(|step| step.target()), Some(arms[0]));
        assert_eq!(second.next_step().map(|step| step.target()), Some(arms[1]));
    }
}
