use iced::{
    mouse, time,
    widget::{
        canvas::{self, Canvas, Frame, Geometry, Path, Stroke},
        column, text, Container,
    },
    Color, Element, Length, Point, Rectangle, Renderer, Subscription, Task, Theme,
};
use powercore::prelude::{PowerReading, VisibleRange};
use serde::Deserialize;
use std::time::Duration;

const BRIDGE_URL: &str = "http://127.0.0.1:9000/power";
/// Default y-axis, widened when readings fall outside it.
const DEFAULT_Y_RANGE: (f64, f64) = (-60.0, 0.0);

fn main() -> iced::Result {
    iced::application(Visualizer::boot, Visualizer::update, Visualizer::view)
        .title(application_title)
        .subscription(application_subscription)
        .theme(application_theme)
        .run()
}

fn application_title(_: &Visualizer) -> String {
    "SDR Power Monitor".into()
}

fn application_subscription(_: &Visualizer) -> Subscription<Message> {
    time::every(Duration::from_millis(100)).map(|_| Message::Tick)
}

fn application_theme(_: &Visualizer) -> Theme {
    Theme::Dark
}

#[derive(Debug)]
struct Visualizer {
    payload: Option<PowerPayload>,
    status: String,
    in_flight: bool,
}

#[derive(Debug, Clone)]
enum Message {
    Tick,
    PayloadFetched(Result<PowerPayload, String>),
}

impl Visualizer {
    fn boot() -> (Self, Task<Message>) {
        (
            Visualizer {
                payload: None,
                status: "Waiting for the monitor bridge...".into(),
                in_flight: true,
            },
            Task::perform(fetch_payload(), Message::PayloadFetched),
        )
    }

    fn update(state: &mut Self, message: Message) -> Task<Message> {
        match message {
            // skip ticks while a request is outstanding so polls never pile up
            Message::Tick if state.in_flight => Task::none(),
            Message::Tick => {
                state.in_flight = true;
                Task::perform(fetch_payload(), Message::PayloadFetched)
            }
            Message::PayloadFetched(Ok(payload)) => {
                state.in_flight = false;
                state.status = match payload.points.last() {
                    Some(latest) => format!(
                        "t = {:.2} s | {:.2} dB | {} points | {}",
                        latest.elapsed_time,
                        latest.power_db,
                        payload.points.len(),
                        payload.status
                    ),
                    None => payload.status.clone(),
                };
                state.payload = Some(payload);
                Task::none()
            }
            Message::PayloadFetched(Err(err)) => {
                state.in_flight = false;
                state.status = format!("Bridge error: {err}");
                Task::none()
            }
        }
    }

    fn view(state: &Self) -> Element<'_, Message> {
        let title = match &state.payload {
            Some(payload) => format!("Power at {:.3} MHz", payload.center_freq_hz / 1e6),
            None => "Power".into(),
        };
        let trace = match &state.payload {
            Some(payload) => PowerTrace::new(&payload.points, payload.x_range),
            None => PowerTrace::new(
                &[],
                VisibleRange {
                    lo: 0.0,
                    hi: 10.0,
                },
            ),
        };
        let axes = format!(
            "Time: {:.1} s to {:.1} s | Relative power: {:.0} dB to {:.0} dB",
            trace.x_range.lo, trace.x_range.hi, trace.y_range.0, trace.y_range.1
        );

        let plot = Canvas::new(trace)
            .width(Length::Fill)
            .height(Length::Fill);

        let layout = column![
            text(title).size(26),
            text(&state.status).size(14),
            plot,
            text(axes).size(12),
        ]
        .spacing(10)
        .padding(20);

        Container::new(layout)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }
}

async fn fetch_payload() -> Result<PowerPayload, String> {
    let response = reqwest::get(BRIDGE_URL)
        .await
        .map_err(|e| e.to_string())?;
    response
        .json::<PowerPayload>()
        .await
        .map_err(|e| e.to_string())
}

#[derive(Debug, Clone, Deserialize)]
struct PowerPayload {
    #[serde(default)]
    points: Vec<PowerReading>,
    x_range: VisibleRange,
    #[serde(default)]
    center_freq_hz: f64,
    #[serde(default)]
    status: String,
}

/// Y-axis bounds: the default range, widened outward to whole 10 dB steps.
fn y_bounds(points: &[PowerReading]) -> (f64, f64) {
    let (mut lo, mut hi) = DEFAULT_Y_RANGE;
    for reading in points.iter().filter(|r| r.power_db.is_finite()) {
        lo = lo.min((reading.power_db / 10.0).floor() * 10.0);
        hi = hi.max((reading.power_db / 10.0).ceil() * 10.0);
    }
    (lo, hi)
}

/// Maps a reading into canvas coordinates, y growing downward.
fn project(
    reading: &PowerReading,
    x_range: VisibleRange,
    y_range: (f64, f64),
    width: f32,
    height: f32,
) -> Point {
    let x_span = x_range.width().max(f64::EPSILON);
    let y_span = (y_range.1 - y_range.0).max(f64::EPSILON);
    let x = (reading.elapsed_time - x_range.lo) / x_span;
    let y = (reading.power_db - y_range.0) / y_span;
    Point::new(x as f32 * width, height - y as f32 * height)
}

#[derive(Clone)]
struct PowerTrace {
    points: Vec<PowerReading>,
    x_range: VisibleRange,
    y_range: (f64, f64),
}

impl PowerTrace {
    fn new(points: &[PowerReading], x_range: VisibleRange) -> Self {
        Self {
            points: points.to_vec(),
            x_range,
            y_range: y_bounds(points),
        }
    }
}

impl canvas::Program<Message> for PowerTrace {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        frame.fill_rectangle(
            Point::ORIGIN,
            bounds.size(),
            Color::from_rgb(0.05, 0.05, 0.05),
        );

        let (width, height) = (bounds.width, bounds.height);
        let grid = Path::new(|builder| {
            let mut level = self.y_range.0;
            while level <= self.y_range.1 {
                let y = project(
                    &PowerReading::new(self.x_range.lo, level),
                    self.x_range,
                    self.y_range,
                    width,
                    height,
                )
                .y;
                builder.move_to(Point::new(0.0, y));
                builder.line_to(Point::new(width, y));
                level += 10.0;
            }
            for step in 1..10 {
                let x = width * step as f32 / 10.0;
                builder.move_to(Point::new(x, 0.0));
                builder.line_to(Point::new(x, height));
            }
        });
        frame.stroke(
            &grid,
            Stroke::default()
                .with_width(1.0)
                .with_color(Color::from_rgb(0.2, 0.2, 0.25)),
        );

        let visible: Vec<&PowerReading> = self
            .points
            .iter()
            .filter(|r| self.x_range.contains(r.elapsed_time) && r.power_db.is_finite())
            .collect();
        if visible.len() > 1 {
            let path = Path::new(|builder| {
                for (i, reading) in visible.iter().enumerate() {
                    let point = project(reading, self.x_range, self.y_range, width, height);
                    if i == 0 {
                        builder.move_to(point);
                    } else {
                        builder.line_to(point);
                    }
                }
            });

            frame.stroke(
                &path,
                Stroke::default()
                    .with_width(2.0)
                    .with_color(Color::from_rgb(0.9, 0.2, 0.2)),
            );
        }

        vec![frame.into_geometry()]
    }
}
