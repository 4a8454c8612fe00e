use crate::gui_bridge::model::VisualizationModel;
use anyhow::Context;
use log::info;
use powercore::prelude::{MonitorError, MonitorResult, VisibleFrame};
use powercore::Renderer;
use std::{
    net::SocketAddr,
    sync::{Arc, RwLock},
    thread,
};
use tokio::runtime::Builder;
use warp::Filter;

pub fn gui_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

type SharedModel = Arc<RwLock<VisualizationModel>>;

/// Renderer that keeps the latest visible window behind an HTTP endpoint.
#[derive(Clone)]
pub struct GuiBridge {
    state: SharedModel,
}

impl GuiBridge {
    pub fn new(center_freq_hz: f64, window_size_s: f64) -> Self {
        Self {
            state: Arc::new(RwLock::new(VisualizationModel::new(
                center_freq_hz,
                window_size_s,
            ))),
        }
    }

    /// Serves `GET /power` on a background thread with its own runtime.
    pub fn serve(&self, address: SocketAddr) -> anyhow::Result<thread::JoinHandle<()>> {
        let routes = routes(self.state.clone());
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("building runtime for the GUI bridge")?;
        let handle = thread::Builder::new()
            .name("gui-bridge".into())
            .spawn(move || {
                runtime.block_on(async move {
                    warp::serve(routes).run(address).await;
                });
            })
            .context("spawning GUI bridge thread")?;
        info!("[bridge] serving visible window on http://{address}/power");
        Ok(handle)
    }

    pub fn publish_status(&self, message: &str) {
        info!("[bridge] {message}");
        if let Ok(mut guard) = self.state.write() {
            guard.status = message.to_string();
        }
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> Option<VisualizationModel> {
        self.state.read().ok().map(|guard| guard.clone())
    }
}

impl Renderer for GuiBridge {
    fn render(&mut self, frame: &VisibleFrame) -> MonitorResult<()> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| MonitorError::RenderPublish("visualization state poisoned".into()))?;
        guard.apply(frame);
        Ok(())
    }
}

fn routes(
    state: SharedModel,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let state_filter = warp::any().map(move || state.clone());
    warp::path("power")
        .and(warp::path::end())
        .and(warp::get())
        .and(state_filter)
        .map(|state: SharedModel| match state.read() {
            Ok(guard) => warp::reply::with_status(
                warp::reply::json(&*guard),
                warp::http::StatusCode::OK,
            ),
            Err(_) => warp::reply::with_status(
                warp::reply::json(&"visualization state poisoned"),
                warp::http::StatusCode::INTERNAL_SERVER_ERROR,
            ),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use powercore::prelude::{PowerReading, VisibleRange};

    fn frame(newest: f64) -> VisibleFrame {
        VisibleFrame {
            points: vec![
                PowerReading::new(newest - 0.05, -42.0),
                PowerReading::new(newest, -12.5),
            ],
            x_range: VisibleRange {
                lo: (newest - 10.0).max(0.0),
                hi: newest.max(10.0),
            },
        }
    }

    #[test]
    fn render_updates_shared_state() {
        let mut bridge = GuiBridge::new(433.92e6, 10.0);
        bridge.render(&frame(0.1)).unwrap();
        bridge.render(&frame(12.0)).unwrap();

        let model = bridge.snapshot().unwrap();
        assert_eq!(model.frames, 2);
        assert_eq!(model.points.len(), 2);
        assert_eq!(model.latest().unwrap().power_db, -12.5);
        assert_eq!(model.x_range, VisibleRange { lo: 2.0, hi: 12.0 });
    }

    #[test]
    fn status_is_published() {
        let bridge = GuiBridge::new(433.92e6, 10.0);
        bridge.publish_status("acquisition running");
        assert_eq!(bridge.snapshot().unwrap().status, "acquisition running");
    }

    #[tokio::test]
    async fn power_route_serves_latest_frame() {
        let mut bridge = GuiBridge::new(433.92e6, 10.0);
        bridge.render(&frame(3.0)).unwrap();

        let response = warp::test::request()
            .method("GET")
            .path("/power")
            .reply(&routes(bridge.state.clone()))
            .await;
        assert_eq!(response.status(), 200);

        let model: VisualizationModel = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(model.points.len(), 2);
        assert_eq!(model.center_freq_hz, 433.92e6);
        assert_eq!(model.x_range.hi, 10.0);
    }

    #[tokio::test]
    async fn unknown_paths_are_rejected() {
        let bridge = GuiBridge::new(433.92e6, 10.0);
        let response = warp::test::request()
            .method("GET")
            .path("/payload")
            .reply(&routes(bridge.state.clone()))
            .await;
        assert_eq!(response.status(), 404);
    }
}
