// Tiltwatch - Firmware Entry Point
//
// Boot sequence:
//   1. Initialise logging.
//   2. Bring up the board: shared I2C bus, accelerometer, LED matrix,
//      escalation timer (simulated stand-ins on a host).
//   3. Probe the accelerometer and the LED matrix. Either failing is fatal:
//      the error is logged and the device halts.
//   4. Spawn the sampler (higher priority) and evaluator tasks.
//
// The evaluator stops once the critical alarm latches; the sampler follows.
// Firmware then parks with the alarm on display, a host build exits.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use tiltwatch::config::*;
use tiltwatch::drivers::{AccelSource, IndicatorSink};
use tiltwatch::escalation::AlarmLatch;
use tiltwatch::handoff;
use tiltwatch::tasks::evaluator::{evaluator_task, Evaluator};
use tiltwatch::tasks::sampler::sampler_task;
use tiltwatch::timer::DeadlineFlag;

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------
fn main() -> anyhow::Result<()> {
    init_logging();
    log::info!("Tiltwatch starting…");

    let config = MonitorConfig::default();
    let deadline = DeadlineFlag::new();

    // ---- Board ------------------------------------------------------------
    let (mut accel, mut matrix, timer) = board::bring_up(&config, deadline.clone())?;

    // ---- Startup probe ----------------------------------------------------
    if let Err(e) = accel.probe() {
        log::error!("Error initialising accelerometer: {}", e);
        halt();
    }
    if let Err(e) = matrix.probe() {
        log::error!("Error initialising LED matrix: {}", e);
        halt();
    }
    log::info!("Boot complete, monitoring tilt");

    // ---- Pipeline ---------------------------------------------------------
    let (tx, rx) = handoff::channel();
    let latch = AlarmLatch::new();
    let evaluator = Evaluator::new(&config, deadline, timer, matrix);

    let sampler_latch = latch.clone();
    let sampler = spawn_task("sampler", STACK_SAMPLER, PRIORITY_SAMPLER, move || {
        sampler_task(accel, tx, sampler_latch, config.sample_interval);
    })?;

    let evaluator = spawn_task("evaluator", STACK_EVALUATOR, PRIORITY_EVALUATOR, move || {
        let evaluator = evaluator_task(evaluator, rx, latch, config.eval_interval);
        evaluator.phase()
    })?;

    let phase = evaluator
        .join()
        .map_err(|_| anyhow::anyhow!("evaluator task panicked"))?;
    sampler
        .join()
        .map_err(|_| anyhow::anyhow!("sampler task panicked"))?;
    log::info!("Pipeline stopped in phase {:?}", phase);

    // Firmware keeps the alarm on display until power-cycled.
    if cfg!(target_os = "espidf") {
        halt();
    }
    Ok(())
}

/// Park the calling thread forever.
fn halt() -> ! {
    loop {
        thread::sleep(Duration::from_secs(60));
    }
}

// ---------------------------------------------------------------------------
// Firmware platform (ESP-IDF)
// ---------------------------------------------------------------------------

#[cfg(target_os = "espidf")]
fn init_logging() {
    // Link esp-idf-sys runtime patches and initialise logging.
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
}

/// Spawn a named FreeRTOS-backed thread with the given stack and priority.
#[cfg(target_os = "espidf")]
fn spawn_task<F, R>(
    name: &str,
    stack_size: usize,
    priority: u8,
    task: F,
) -> anyhow::Result<JoinHandle<R>>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    use esp_idf_hal::task::thread::ThreadSpawnConfiguration;

    ThreadSpawnConfiguration {
        priority,
        ..Default::default()
    }
    .set()?;
    let handle = thread::Builder::new()
        .name(name.into())
        .stack_size(stack_size)
        .spawn(task)?;
    ThreadSpawnConfiguration::default().set()?;

    Ok(handle)
}

#[cfg(target_os = "espidf")]
mod board {
    use std::sync::Mutex;

    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::prelude::*;

    use tiltwatch::config::*;
    use tiltwatch::drivers::ht16k33::Ht16k33;
    use tiltwatch::drivers::lsm303::Lsm303;
    use tiltwatch::drivers::SharedBus;
    use tiltwatch::timer::{DeadlineFlag, EspEscalationTimer};

    pub fn bring_up(
        config: &MonitorConfig,
        deadline: DeadlineFlag,
    ) -> anyhow::Result<(Lsm303, Ht16k33, EspEscalationTimer)> {
        let peripherals = Peripherals::take()?;

        // ---- I2C bus (shared between LSM303AGR and HT16K33) ---------------
        let i2c_config = I2cConfig::new().baudrate(I2C_BAUDRATE_KHZ.kHz().into());
        let i2c: I2cDriver<'static> = I2cDriver::new(
            peripherals.i2c0,
            peripherals.pins.gpio6, // SDA
            peripherals.pins.gpio7, // SCL
            &i2c_config,
        )?;
        log::info!(
            "I2C bus up on GPIO{} (SDA) / GPIO{} (SCL) at {} kHz",
            PIN_I2C_SDA,
            PIN_I2C_SCL,
            I2C_BAUDRATE_KHZ
        );
        // The bus lives for the entire programme (firmware never exits).
        let bus: SharedBus = Box::leak(Box::new(Mutex::new(i2c)));

        let timer = EspEscalationTimer::new(config.escalation_deadline, deadline)?;

        Ok((Lsm303::new(bus), Ht16k33::new(bus), timer))
    }
}

// ---------------------------------------------------------------------------
// Host platform (simulator)
// ---------------------------------------------------------------------------

#[cfg(not(target_os = "espidf"))]
fn init_logging() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_thread_names(true)
        .init();
}

/// Host threads have no priorities; the name and stack size still apply.
#[cfg(not(target_os = "espidf"))]
fn spawn_task<F, R>(
    name: &str,
    stack_size: usize,
    priority: u8,
    task: F,
) -> anyhow::Result<JoinHandle<R>>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    log::debug!("Spawning {} (priority {} not applied on host)", name, priority);
    let handle = thread::Builder::new()
        .name(name.into())
        .stack_size(stack_size)
        .spawn(task)?;
    Ok(handle)
}

#[cfg(not(target_os = "espidf"))]
mod board {
    use std::time::Duration;

    use tiltwatch::config::MonitorConfig;
    use tiltwatch::drivers::sim::{LogMatrix, ScriptedAccel, Segment};
    use tiltwatch::events::Reading;
    use tiltwatch::timer::{DeadlineFlag, ThreadTimer};

    const LEVEL: Reading = Reading::new(12, -30, 1010);
    const TILTED: Reading = Reading::new(640, 85, 760);

    /// Level, a one-second tilt that has recovered by the deadline, then a
    /// tilt that never recovers.
    pub fn bring_up(
        config: &MonitorConfig,
        deadline: DeadlineFlag,
    ) -> anyhow::Result<(ScriptedAccel, LogMatrix, ThreadTimer)> {
        let recovery = config.escalation_deadline + Duration::from_secs(1);
        let accel = ScriptedAccel::new(vec![
            Segment::new(LEVEL, Duration::from_secs(2)),
            Segment::new(TILTED, Duration::from_secs(1)),
            Segment::new(LEVEL, recovery),
            Segment::new(TILTED, Duration::ZERO),
        ]);
        let timer = ThreadTimer::new(config.escalation_deadline, deadline)?;

        Ok((accel, LogMatrix::new(), timer))
    }
}
