//! SDK tests against an in-process server on an ephemeral port.

use searoute_core::models::Port;
use searoute_core::segment::{RouteType, SegmentMetadata};
use searoute_core::RouteKind;
use searoute_sdk::{ClientError, DistanceUnits, SeaRouteClient, SegmentSaveRequest};
use searoute_server::{api, config::Config, persistence, state::AppState};
use std::sync::Arc;

async fn spawn_server() -> (String, Arc<AppState>) {
    let mut config = Config::from_env();
    config.database_path = std::env::temp_dir()
        .join(format!("searoute-sdk-{}.db", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .to_string();
    let db = persistence::init_database(&config.database_path, 2)
        .await
        .expect("init db");
    let state = Arc::new(AppState::new(db, config));
    let app = api::app(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), state)
}

fn miami() -> Port {
    Port::new("miami", "Miami", 25.7617, -80.1918)
}

fn nassau() -> Port {
    Port::new("nassau", "Nassau", 25.0343, -77.3554)
}

fn save_request(route_coordinates: Vec<[f64; 2]>, route_type: RouteType) -> SegmentSaveRequest {
    SegmentSaveRequest {
        origin_port: miami(),
        destination_port: nassau(),
        route_coordinates,
        route_type,
        distance_nautical_miles: None,
        distance_km: None,
        created_by: Some("sdk-test".to_string()),
        metadata: SegmentMetadata::default(),
    }
}

#[tokio::test]
async fn generate_then_save_generated_route() {
    let (base, _state) = spawn_server().await;
    let client = SeaRouteClient::new(base);

    let route = client
        .generate_route(&miami(), &nassau(), DistanceUnits::NauticalMiles)
        .await
        .unwrap();
    assert_eq!(route.kind, RouteKind::SeaOnly);
    assert!(route.coordinates.len() >= 10);

    let display = route.lat_lng_coordinates();
    assert!((display[0][0] - 25.7617).abs() < 1e-9);
    assert!((display[0][1] + 80.1918).abs() < 1e-9);

    let mut pending = client
        .prepare_save(save_request(display.clone(), RouteType::Generated))
        .unwrap();
    let saved = client.save_segment(&mut pending).await.unwrap();
    assert_eq!(saved.segment_id, "miami-nassau");
    assert_eq!(saved.version, 1);

    let current = client.segment("miami-nassau").await.unwrap();
    assert_eq!(current.route_coordinates.len(), display.len());
    assert_eq!(current.route_type, RouteType::Generated);
    assert_eq!(current.created_by, "sdk-test");
}

#[tokio::test]
async fn non_success_status_is_no_route_found() {
    let (base, _state) = spawn_server().await;
    let client = SeaRouteClient::new(format!("{}/not-here", base));

    let err = client
        .generate_route(&miami(), &nassau(), DistanceUnits::Kilometers)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NoRouteFound { status } if status.as_u16() == 404));
}

#[tokio::test]
async fn retry_reuses_the_validated_candidate() {
    let (base, _state) = spawn_server().await;

    // nothing listens on the discard port
    let offline = SeaRouteClient::new("http://127.0.0.1:9");
    let online = SeaRouteClient::new(base);

    let mut pending = offline
        .prepare_save(save_request(
            vec![[25.7617, -80.1918], [25.4, -78.8], [25.0343, -77.3554]],
            RouteType::Edited,
        ))
        .unwrap();
    let candidate = pending.candidate().clone();

    let err = offline.save_segment(&mut pending).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(pending.attempts(), 1);
    assert!(!pending.is_saved());

    let saved = online.retry_save(&mut pending).await.unwrap();
    assert_eq!(saved.version, 1);
    assert_eq!(pending.attempts(), 2);
    assert_eq!(pending.candidate(), &candidate);

    // already committed: no second version
    let again = online.retry_save(&mut pending).await.unwrap();
    assert_eq!(again.version, 1);
    assert_eq!(online.history("miami-nassau").await.unwrap().len(), 1);
}

#[tokio::test]
async fn resending_a_committed_save_does_not_add_a_version() {
    let (base, _state) = spawn_server().await;
    let client = SeaRouteClient::new(base);

    let mut pending = client
        .prepare_save(save_request(
            vec![[25.7617, -80.1918], [25.4, -78.8], [25.0343, -77.3554]],
            RouteType::Edited,
        ))
        .unwrap();
    // the caller's view if the response had been lost after the commit
    let mut response_lost = pending.clone();

    let saved = client.save_segment(&mut pending).await.unwrap();
    let resent = client.retry_save(&mut response_lost).await.unwrap();
    assert_eq!(resent.version, saved.version);
    assert_eq!(resent.created_at, saved.created_at);
    assert!(resent.message.contains("already saved"));
    assert_eq!(client.history("miami-nassau").await.unwrap().len(), 1);
}

#[tokio::test]
async fn server_side_failure_is_save_failed() {
    let (base, state) = spawn_server().await;
    let client = SeaRouteClient::new(base);
    sqlx::query("DROP TABLE route_segments")
        .execute(state.database().pool())
        .await
        .unwrap();

    let mut pending = client
        .prepare_save(save_request(
            vec![[25.7617, -80.1918], [25.0343, -77.3554]],
            RouteType::Manual,
        ))
        .unwrap();
    let err = client.save_segment(&mut pending).await.unwrap_err();
    match err {
        ClientError::SaveFailed { status, message } => {
            assert_eq!(status.as_u16(), 500);
            assert!(message.contains("failed to save"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn history_tracks_versions() {
    let (base, _state) = spawn_server().await;
    let client = SeaRouteClient::new(base);

    for coords in [
        vec![[25.7617, -80.1918], [25.4, -78.8], [25.0343, -77.3554]],
        vec![[25.7617, -80.1918], [25.6, -79.4], [25.2, -78.3], [25.0343, -77.3554]],
    ] {
        let mut pending = client.prepare_save(save_request(coords, RouteType::Edited)).unwrap();
        client.save_segment(&mut pending).await.unwrap();
    }

    let history = client.history("miami-nassau").await.unwrap();
    assert_eq!(history.iter().map(|r| r.version).collect::<Vec<_>>(), vec![1, 2]);
    assert!(!history[0].is_active);
    assert!(history[1].is_active);
    assert_eq!(history[0].created_at, history[1].created_at);
    assert!(history[0].updated_at < history[1].updated_at);

    let err = client.segment("nowhere-else").await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound { .. }));
}
