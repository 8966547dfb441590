//! Interactive Shock Factor display (default binary).
//!
//! Steps the driver on a fixed cadence, draws every frame in a bordered panel
//! and, unless disabled, serves frames and accepts events over TCP.
//! It uses crossterm for input and a custom framebuffer-based renderer.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use tracing::{info, warn};

use shock_factor::adapter::Adapter;
use shock_factor::core::{Driver, DriverConfig};
use shock_factor::input::{handle_key_event, should_quit};
use shock_factor::logging::{init_logging, Fallback};
use shock_factor::term::{FrameBuffer, FrameView, StatusView, TerminalRenderer, Viewport};
use shock_factor::types::FramePayload;

fn main() -> Result<()> {
    init_logging(Fallback::Discard);

    let config = DriverConfig::from_env();
    let mut driver = config.build_driver();

    let latest: Rc<RefCell<Option<FramePayload>>> = Rc::new(RefCell::new(None));
    {
        let latest = Rc::clone(&latest);
        driver.visualizer_mut().on_frame(move |frame| {
            *latest.borrow_mut() = Some(frame.clone());
            Ok(())
        });
    }

    let mut adapter = match Adapter::start_from_env() {
        Ok(adapter) => adapter,
        Err(e) => {
            warn!(error = %e, "frame adapter unavailable, continuing without it");
            None
        }
    };
    if let Some(adapter) = &adapter {
        let sink = adapter.frame_sink();
        driver
            .visualizer_mut()
            .on_frame(move |frame| sink.publish(frame).map_err(Into::into));
        info!(addr = ?adapter.local_addr(), "frame adapter started");
    }

    let mut term = TerminalRenderer::new();
    term.enter()?;

    let result = run(&mut term, &mut driver, &latest, adapter.as_mut(), &config);

    // Always try to restore terminal state.
    let _ = term.exit();
    result
}

fn run(
    term: &mut TerminalRenderer,
    driver: &mut Driver,
    latest: &RefCell<Option<FramePayload>>,
    mut adapter: Option<&mut Adapter>,
    config: &DriverConfig,
) -> Result<()> {
    let view = FrameView::default();
    let mut fb = FrameBuffer::new(0, 0);

    let tick_duration = Duration::from_millis(config.tick_ms);
    let mut last_tick = Instant::now();
    driver.step();

    loop {
        // Render.
        let (w, h) = crossterm::terminal::size().unwrap_or((80, 24));
        {
            let schedule = driver.schedule().as_str();
            let status = StatusView {
                schedule,
                intensity: driver.event().clamped_intensity(),
                paused: driver.is_paused(),
                clients: adapter.as_deref().map(Adapter::client_count),
            };
            let frame = latest.borrow();
            view.render_into(frame.as_ref(), Some(&status), Viewport::new(w, h), &mut fb);
        }
        term.draw_swap(&mut fb)?;

        // Input with timeout until next tick.
        let timeout = tick_duration
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    if should_quit(key) {
                        return Ok(());
                    }
                    if let Some(action) = handle_key_event(key) {
                        driver.apply_action(action);
                        info!(action = action.as_str(), schedule = %driver.schedule(), "driver action");
                    }
                }
                Event::Resize(_, _) => term.invalidate(),
                _ => {}
            }
        }

        // Apply events from adapter clients.
        if let Some(adapter) = adapter.as_deref_mut() {
            while let Some(inbound) = adapter.try_recv() {
                driver.set_event(inbound.event);
                if let Some(mode) = inbound.mode {
                    driver.set_schedule(mode.into());
                }
                if let Some(full_view) = inbound.full_view {
                    driver.set_full_view(full_view);
                }
                adapter.ack(inbound.client_id, inbound.seq);
            }
        }

        // Tick.
        if last_tick.elapsed() >= tick_duration {
            last_tick = Instant::now();
            driver.step();
        }
    }
}
