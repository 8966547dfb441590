//! Headless frame dump.
//!
//! Runs the driver with the environment configuration and prints each frame
//! as plain text to stdout.
//!
//! Usage: `frame-dump [COUNT] [--clear] [--fast]`

use std::cell::Cell;
use std::io::Write;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use shock_factor::core::DriverConfig;
use shock_factor::logging::{init_logging, Fallback};
use shock_factor::term::encode_plain_into;

#[derive(Parser)]
#[command(version, about = "Print Shock Factor frames as plain text")]
struct Args {
    /// Frames to print (`0` runs until interrupted)
    #[arg(default_value_t = 20)]
    count: u64,
    /// Clear the screen before each frame
    #[arg(long)]
    clear: bool,
    /// Don't wait SHOCK_FACTOR_TICK_MS between frames
    #[arg(long)]
    fast: bool,
}

fn main() -> Result<()> {
    init_logging(Fallback::Stderr);

    let args = Args::parse();
    let config = DriverConfig::from_env();
    info!(
        schedule = %config.schedule,
        full_view = config.full_view,
        tick_ms = config.tick_ms,
        count = args.count,
        "dumping frames"
    );

    let mut driver = config.build_driver();
    let clear = args.clear;
    let mut buf = Vec::with_capacity(4 * 1024);
    // Set once stdout is gone (e.g. piped into `head`).
    let closed = Rc::new(Cell::new(false));
    {
        let closed = Rc::clone(&closed);
        driver.visualizer_mut().on_frame(move |frame| {
            buf.clear();
            encode_plain_into(frame, clear, &mut buf)?;
            buf.push(b'\n');
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = stdout.write_all(&buf).and_then(|_| stdout.flush()) {
                closed.set(true);
                return Err(e.into());
            }
            Ok(())
        });
    }

    let delay = Duration::from_millis(config.tick_ms);
    let mut printed = 0u64;
    while (args.count == 0 || printed < args.count) && !closed.get() {
        driver.step();
        printed += 1;
        if !args.fast {
            std::thread::sleep(delay);
        }
    }
    Ok(())
}
