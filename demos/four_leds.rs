//! # Four LEDs Demo
//!
//! Connects four pins of a 5x7 matrix to the Raspberry Pi and drives the
//! 2x2 corner they cover:
//!
//! ```text
//!   matrix pin   GPIO (BCM)
//!        1  ---  17
//!        3  ---  18
//!       11  ---  23
//!       12  ---  22
//! ```
//!
//! First each of the four LEDs is lit on its own, top left to bottom right,
//! for five seconds. Then (0,0) and (1,1) are multiplexed at 120 Hz so both
//! appear lit until Ctrl+C.
//!
//! ## Run it
//! ```sh
//! cargo build --release --example four_leds
//! sudo ./target/release/examples/four_leds
//! ```

#[cfg(not(feature = "hardware"))]
fn main() {
    eprintln!("This example requires the 'hardware' feature.");
}

#[cfg(feature = "hardware")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use led_matrix_mux::output::GpioOutputs;
    use led_matrix_mux::{
        Coordinate, DisplayFrame, MatrixDriver, NumberingScheme, PinMapper, PinTopology,
        is_running, setup_signal_handler,
    };
    use std::time::Duration;

    tracing_subscriber::fmt().with_target(false).compact().init();

    // ── Setup ──────────────────────────────────────────────────────
    let mut mapper = PinMapper::new(GpioOutputs::new()?, NumberingScheme::Bcm);
    mapper.bind(1, 17)?;
    mapper.bind(3, 18)?;
    mapper.bind(11, 23)?;
    mapper.bind(12, 22)?;

    let topology = PinTopology::new(vec![1, 3], vec![12, 11])?;
    let mut driver = MatrixDriver::new(topology, &mut mapper);
    let running = setup_signal_handler()?;

    // ── Phase 1: one LED at a time ─────────────────────────────────
    let corner: DisplayFrame = [(0, 0), (1, 0), (0, 1), (1, 1)]
        .into_iter()
        .map(|(x, y)| Coordinate::new(x, y))
        .collect();
    driver.sweep(
        &corner,
        Duration::from_millis(200),
        Some(Duration::from_secs(5)),
        &running,
    )?;

    // ── Phase 2: two LEDs at once ──────────────────────────────────
    if is_running(&running) {
        let diagonal: DisplayFrame = [Coordinate::new(0, 0), Coordinate::new(1, 1)]
            .into_iter()
            .collect();
        driver.render_frame(&diagonal, None, &running)?;
    }

    println!("\nShutting down cleanly.");
    Ok(())
}
