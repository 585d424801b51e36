pub mod display;

pub use display::{Display, Font, FrameBuffer, LogDisplay, TerminalDisplay};

use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::RenderError;
use crate::models::{FixtureItem, Item, Query, Snapshot, WeatherItem};
use crate::snapshot::SnapshotStore;

/// Loader ring, clockwise from the top-left of a 4x4 box.
const LOADER_POINTS: [(i32, i32); 8] = [
    (1, 0),
    (2, 0),
    (3, 1),
    (3, 2),
    (2, 3),
    (1, 3),
    (0, 2),
    (0, 1),
];

/// Width of the degree ring drawn after the temperature.
const DEGREE_RING_WIDTH: i32 = 4;

#[derive(Debug, Clone)]
pub struct RenderTiming {
    pub loader_frame: Duration,
    /// How long a fixture stays on screen
    pub item_dwell: Duration,
    /// How long each weather pane stays on screen
    pub pane_dwell: Duration,
    pub empty_message: &'static str,
}

impl RenderTiming {
    pub fn for_query(query: &Query) -> Self {
        RenderTiming {
            loader_frame: Duration::from_millis(150),
            item_dwell: Duration::from_secs(5),
            pane_dwell: Duration::from_secs(3),
            empty_message: if query.is_weather() {
                "No data"
            } else {
                "No match"
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Loading,
    ShowingEmpty,
    Cycling,
}

/// Which half of a weather item is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Value,
    Description,
}

/// What one render step put on the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shown {
    Loader { frame: u64 },
    Empty,
    Item { index: usize, pane: Pane },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub shown: Shown,
    /// How long to hold this frame before the next step
    pub wait: Duration,
}

/// Foreground state machine over {Loading, ShowingEmpty, Cycling}.
///
/// Each [`step`](Renderer::step) draws exactly one frame from the snapshot it
/// is given; the caller decides where snapshots come from and how long to
/// wait. The renderer never touches the network.
pub struct Renderer {
    timing: RenderTiming,
    state: RenderState,
    frame: u64,
    index: usize,
    pane: Pane,
}

impl Renderer {
    pub fn new(timing: RenderTiming) -> Self {
        Renderer {
            timing,
            state: RenderState::Loading,
            frame: 0,
            index: 0,
            pane: Pane::Value,
        }
    }

    /// Draw one frame for `snapshot` and flush it.
    ///
    /// An `Error` snapshot is drawn and then returned as
    /// [`RenderError::Upstream`]; the caller should stop.
    pub fn step(&mut self, snapshot: &Snapshot, display: &mut dyn Display) -> Result<Step, RenderError> {
        display.clear();
        let step = match snapshot {
            Snapshot::Pending => {
                self.transition(RenderState::Loading);
                let frame = self.frame;
                draw_loader(frame, display);
                self.frame = self.frame.wrapping_add(1);
                Step {
                    shown: Shown::Loader { frame },
                    wait: self.timing.loader_frame,
                }
            }
            Snapshot::Empty => {
                self.transition(RenderState::ShowingEmpty);
                draw_centered(self.timing.empty_message, Font::Tiny, display);
                Step {
                    shown: Shown::Empty,
                    wait: self.timing.item_dwell,
                }
            }
            Snapshot::Ready(items) if items.is_empty() => {
                self.transition(RenderState::ShowingEmpty);
                draw_centered(self.timing.empty_message, Font::Tiny, display);
                Step {
                    shown: Shown::Empty,
                    wait: self.timing.item_dwell,
                }
            }
            Snapshot::Ready(items) => {
                self.transition(RenderState::Cycling);
                self.show_item(items, display)
            }
            Snapshot::Error(reason) => {
                display.draw_text(0, 0, reason, Font::Tiny);
                display.flush()?;
                return Err(RenderError::Upstream(reason.clone()));
            }
        };
        display.flush()?;
        Ok(step)
    }

    fn show_item(&mut self, items: &[Item], display: &mut dyn Display) -> Step {
        // The list may have shrunk since the last step
        let index = self.index.min(items.len() - 1);
        let step = match &items[index] {
            Item::Fixture(fixture) => {
                draw_fixture(fixture, display);
                self.pane = Pane::Value;
                self.index = (index + 1) % items.len();
                Step {
                    shown: Shown::Item {
                        index,
                        pane: Pane::Value,
                    },
                    wait: self.timing.item_dwell,
                }
            }
            Item::Weather(weather) => {
                let pane = self.pane;
                match pane {
                    Pane::Value => {
                        draw_temperature(weather, display);
                        self.pane = Pane::Description;
                        self.index = index;
                    }
                    Pane::Description => {
                        display.draw_text(0, 0, &weather.description, Font::Tiny);
                        self.pane = Pane::Value;
                        self.index = (index + 1) % items.len();
                    }
                }
                Step {
                    shown: Shown::Item { index, pane },
                    wait: self.timing.pane_dwell,
                }
            }
        };
        debug!("Showing item {}/{}", index + 1, items.len());
        step
    }

    fn transition(&mut self, next: RenderState) {
        if self.state != next {
            info!("Renderer: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// Render until shutdown is signalled or an error snapshot arrives.
    ///
    /// While loading or showing the empty message the loop wakes early when
    /// a new snapshot is published. On shutdown the display is cleared.
    pub async fn run(
        mut self,
        store: SnapshotStore,
        mut display: Box<dyn Display>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), RenderError> {
        let mut updates = store.subscribe();
        loop {
            let snapshot = updates.borrow_and_update().clone();
            let step = self.step(&snapshot, display.as_mut())?;
            let waiting_for_data = !matches!(step.shown, Shown::Item { .. });

            tokio::select! {
                _ = tokio::time::sleep(step.wait) => {}
                _ = shutdown.changed() => {
                    info!("Renderer shutting down ({:?})", self.state);
                    display.clear();
                    display.flush()?;
                    return Ok(());
                }
                Ok(()) = updates.changed(), if waiting_for_data => {}
            }
        }
    }
}

fn draw_loader(frame: u64, display: &mut dyn Display) {
    let (width, height) = display.size();
    let (ox, oy) = ((width - 4) / 2, (height - 4) / 2);
    let n = LOADER_POINTS.len() as u64;
    let dark = [frame % n, (frame + n - 1) % n];
    for (i, (x, y)) in LOADER_POINTS.iter().enumerate() {
        if !dark.contains(&(i as u64)) {
            display.set_pixel(ox + x, oy + y);
        }
    }
}

/// Text centred horizontally on the top row.
fn draw_centered(text: &str, font: Font, display: &mut dyn Display) {
    let (width, _) = display.size();
    let x = ((width - font.text_width(text)) / 2).max(0);
    display.draw_text(x, 0, text, font);
}

fn draw_fixture(fixture: &FixtureItem, display: &mut dyn Display) {
    display.draw_text(0, 0, &fixture.label(), Font::Tiny);
}

/// Temperature centred together with its degree ring.
fn draw_temperature(weather: &WeatherItem, display: &mut dyn Display) {
    let (width, _) = display.size();
    let label = weather.temperature_label();
    let text_width = Font::Lcd.text_width(&label) + 1;
    let x = ((width - (text_width + DEGREE_RING_WIDTH)) / 2).max(0);
    display.draw_text(x, 0, &label, Font::Lcd);
    for (px, py) in LOADER_POINTS {
        display.set_pixel(x + text_width + px, py);
    }
}
