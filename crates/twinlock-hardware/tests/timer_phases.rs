//! Tick counters across successive configure/deinit phases of one unit.

use std::sync::Arc;
use twinlock_hardware::{
    Guarded, TickCounter,
    timer::{ClockSource, SimulatedTimerBank, TimerConfig, TimerDriver, TimerId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    Done,
}

fn run_phase(bank: &SimulatedTimerBank, config: TimerConfig, ticks: u32) -> u32 {
    let handle = bank.configure(&config).unwrap();
    let phase = Arc::new(Guarded::new(Phase::Running));
    let flag = phase.clone();
    let counter = TickCounter::start(bank, handle, ticks, move || flag.set(Phase::Done)).unwrap();

    let mut fired = 0;
    while phase.get() == Phase::Running {
        assert!(bank.fire(config.timer));
        fired += 1;
    }

    counter.stop(bank).unwrap();
    bank.deinit(handle).unwrap();
    fired
}

#[test]
fn gate_cycle_phase_lengths() {
    let bank = SimulatedTimerBank::new();

    let travel = TimerConfig::normal(TimerId::Timer1, ClockSource::Div256);
    let hold = TimerConfig::compare(TimerId::Timer1, ClockSource::Div256, 21_900);

    assert_eq!(run_phase(&bank, travel, 7), 7);
    assert_eq!(run_phase(&bank, hold, 2), 2);
    assert_eq!(run_phase(&bank, travel, 7), 7);

    assert_eq!(bank.generation(TimerId::Timer1), 3);
    assert!(!bank.is_configured(TimerId::Timer1));
    assert!(!bank.has_callback(TimerId::Timer1));
}

#[test]
fn pwm_unit_runs_beside_tick_unit() {
    let bank = SimulatedTimerBank::new();

    let pwm = bank
        .configure(&TimerConfig::pwm(TimerId::Timer0, ClockSource::Div64, 128))
        .unwrap();

    let alarm = TimerConfig::normal(TimerId::Timer1, ClockSource::Div1024);
    assert_eq!(run_phase(&bank, alarm, 8), 8);

    assert!(bank.is_configured(TimerId::Timer0));
    bank.deinit(pwm).unwrap();
}

#[tokio::test]
async fn main_loop_waits_on_interrupt_written_state() {
    let bank = Arc::new(SimulatedTimerBank::new());
    let status = Arc::new(Guarded::new(0u8));

    let driver = bank.clone();
    let shared = status.clone();
    let main_loop = tokio::spawn(async move {
        let handle = driver
            .configure(&TimerConfig::normal(TimerId::Timer1, ClockSource::Div256))
            .unwrap();
        let writer = shared.clone();
        let counter = TickCounter::start(&*driver, handle, 7, move || {
            writer.update(|s| s + 1);
        })
        .unwrap();

        let seen = shared.wait_while(|s| s == 0).await;

        counter.stop(&*driver).unwrap();
        driver.deinit(handle).unwrap();
        seen
    });

    bank.wait_armed(TimerId::Timer1, 0).await;
    assert_eq!(bank.fire_n(TimerId::Timer1, 7), 7);

    assert_eq!(main_loop.await.unwrap(), 1);
}
