use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::WatchStream;

use crate::AppState;

/// SSE endpoint that pushes the whole tree to the browser after every rebuild.
/// The current tree, if any, is sent as soon as the stream opens.
pub async fn handle_topology_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let agg = state.aggregator.clone();

    let stream = WatchStream::new(state.aggregator.subscribe()).filter_map(move |version| {
        let data = agg
            .get_tree()
            .and_then(|tree| serde_json::to_string(&*tree).ok());
        async move {
            data.map(|data| {
                Ok(Event::default()
                    .event("topology")
                    .id(version.to_string())
                    .data(data))
            })
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default().interval(Duration::from_secs(15)))
}
