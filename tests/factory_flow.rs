//! End-to-end flows through the public orchestrator API.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use factory_floor::error::TransformError;
use factory_floor::machine::{CutInHalf, Transform};
use factory_floor::{
    FactoryConfig, Job, JobError, Material, MaterialKind, Orchestrator, RetryPolicy,
    SourceStation, StepStatus, TypedProcessor,
};

/// Trims a half pipe down to a quarter of the original length.
struct Trim;

impl Transform for Trim {
    fn input(&self) -> MaterialKind {
        MaterialKind::MetalPipeHalf
    }

    fn output(&self) -> MaterialKind {
        MaterialKind::MetalPipeHalf
    }

    fn duration(&self) -> Duration {
        Duration::ZERO
    }

    fn apply(&self, unit: Material) -> Result<Material, TransformError> {
        let payload = unit.into_payload();
        Ok(Material::new(
            MaterialKind::MetalPipeHalf,
            payload.slice(..payload.len() / 2),
        ))
    }
}

fn fast_config() -> FactoryConfig {
    FactoryConfig {
        transit_delay: Duration::ZERO,
        generation_interval: Duration::from_millis(20),
        retry: RetryPolicy {
            max_retries: 3,
            backoff: Duration::from_millis(20),
        },
        ..FactoryConfig::default()
    }
}

fn wait_for_stock(station: &SourceStation, kind: MaterialKind, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while station.stock(kind) < count {
        assert!(Instant::now() < deadline, "station never stocked {count} {kind}");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn two_stage_pipeline_hands_product_between_processors() {
    let orchestrator = Orchestrator::new(fast_config());
    let station = Arc::new(SourceStation::new("station"));
    let cutter = Arc::new(TypedProcessor::new("cutter", CutInHalf::new(Duration::ZERO)));
    let trimmer = Arc::new(TypedProcessor::new("trimmer", Trim));
    let station_id = orchestrator.register(station.clone()).expect("station");
    let cutter_id = orchestrator.register(cutter.clone()).expect("cutter");
    let trimmer_id = orchestrator.register(trimmer.clone()).expect("trimmer");
    let arm = orchestrator.add_transporter("arm").expect("arm");

    orchestrator
        .request_generation(MaterialKind::MetalPipe)
        .expect("generation request");
    wait_for_stock(&station, MaterialKind::MetalPipe, 1);

    let job = Job::new("pipe-to-quarter")
        .move_material(arm, MaterialKind::MetalPipe, station_id, cutter_id)
        .process(cutter_id, MaterialKind::MetalPipe, MaterialKind::MetalPipeHalf)
        .move_material(arm, MaterialKind::MetalPipeHalf, cutter_id, trimmer_id)
        .process(trimmer_id, MaterialKind::MetalPipeHalf, MaterialKind::MetalPipeHalf);
    let report = orchestrator.execute_job(job).expect("job completes");

    assert_eq!(report.steps, 4);
    assert_eq!(report.retries, 0);
    assert_eq!(cutter.processed(), 1);
    assert_eq!(cutter.output_len(), 0);
    assert_eq!(trimmer.output_len(), 1);
    assert_eq!(station.stock(MaterialKind::MetalPipe), 0);
}

#[test]
fn worker_pool_completes_jobs_fed_by_generation() {
    // Pipes arrive every third tick, so workers may wait several backoffs.
    let config = FactoryConfig {
        retry: RetryPolicy {
            max_retries: 100,
            backoff: Duration::from_millis(20),
        },
        ..fast_config()
    };
    let orchestrator = Orchestrator::new(config);
    let station = Arc::new(SourceStation::new("station"));
    let cutter = Arc::new(TypedProcessor::new("cutter", CutInHalf::new(Duration::ZERO)));
    let station_id = orchestrator.register(station.clone()).expect("station");
    let cutter_id = orchestrator.register(cutter.clone()).expect("cutter");
    let arm = orchestrator.add_transporter("arm").expect("arm");

    orchestrator.start_resource_generation().expect("generation");
    orchestrator.start_workers(2).expect("workers");
    for index in 0..4 {
        let job = Job::new(format!("cut-{index}"))
            .move_material(arm, MaterialKind::MetalPipe, station_id, cutter_id)
            .process(cutter_id, MaterialKind::MetalPipe, MaterialKind::MetalPipeHalf);
        orchestrator.enqueue_job(job).expect("enqueue");
    }

    assert!(
        orchestrator.wait_for_finished_jobs(4, Duration::from_secs(10)),
        "jobs did not finish"
    );
    orchestrator.shutdown();

    let stats = orchestrator.stats();
    assert_eq!(stats.jobs_completed, 4);
    assert_eq!(stats.jobs_aborted, 0);
    assert_eq!(cutter.output_len(), 4);
}

#[test]
fn delivering_wrong_kind_aborts_and_loses_the_unit() {
    let orchestrator = Orchestrator::new(fast_config());
    let station = Arc::new(SourceStation::new("station"));
    let cutter = Arc::new(TypedProcessor::new("cutter", CutInHalf::new(Duration::ZERO)));
    let station_id = orchestrator.register(station.clone()).expect("station");
    let cutter_id = orchestrator.register(cutter.clone()).expect("cutter");
    let arm = orchestrator.add_transporter("arm").expect("arm");

    orchestrator
        .request_generation(MaterialKind::Gravel)
        .expect("generation request");
    wait_for_stock(&station, MaterialKind::Gravel, 1);

    let job = Job::new("gravel-to-cutter").move_material(
        arm,
        MaterialKind::Gravel,
        station_id,
        cutter_id,
    );
    let err = orchestrator.execute_job(job).expect_err("delivery rejected");
    assert!(matches!(err, JobError::StepFailed { step: 1, .. }));
    assert_eq!(station.stock(MaterialKind::Gravel), 0);
    assert_eq!(cutter.input_len(), 0);
}

#[test]
fn missing_material_exhausts_retries() {
    let orchestrator = Orchestrator::new(fast_config());
    let station_id = orchestrator.add_source_station("station").expect("station");
    let cutter_id = orchestrator
        .add_processor("cutter", CutInHalf::new(Duration::ZERO))
        .expect("cutter");
    let arm = orchestrator.add_transporter("arm").expect("arm");

    let step_status = orchestrator.execute_step(
        Job::new("probe")
            .move_material(arm, MaterialKind::TitaniumSlab, station_id, cutter_id)
            .next_step()
            .expect("step"),
    );
    assert_eq!(step_status, StepStatus::Retry);

    let job = Job::new("no-slab").move_material(
        arm,
        MaterialKind::TitaniumSlab,
        station_id,
        cutter_id,
    );
    let err = orchestrator.execute_job(job).expect_err("never available");
    assert!(matches!(err, JobError::RetriesExhausted { attempts: 4, .. }));
}
