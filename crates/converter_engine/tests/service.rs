use converter_engine::{
    ConversionService, PreparedUpload, RemoteStatus, ReqwestService, ServiceError,
    ServiceSettings, SnapshotEntry, StatusReport, SubmitResponse,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CONVERT: &str = "/api/v1/file-encryptor/convert-to-sdp";
const PROGRESS: &str = "/api/v1/file-encryptor/progress";
const LIST: &str = "/api/v1/file-encryptor/list-sdp";
const DOWNLOAD: &str = "/api/v1/file-encryptor/download-sdp";

fn service_for(server: &MockServer) -> ReqwestService {
    ReqwestService::new(ServiceSettings {
        base_url: server.uri(),
        ..ServiceSettings::default()
    })
    .expect("client builds")
}

fn upload() -> PreparedUpload {
    PreparedUpload {
        file_name: "report.xlsx".to_string(),
        content_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            .to_string(),
        bytes: b"sheet-bytes".to_vec(),
    }
}

#[tokio::test]
async fn submit_sends_multipart_file_and_reads_job_id() {
    converter_logging::initialize_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CONVERT))
        .and(body_string_contains("name=\"file\"; filename=\"report.xlsx\""))
        .and(body_string_contains("sheet-bytes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "upload_id": "u-17",
                "converted_filename": "report.sdp",
                "original_filename": "report.xlsx"
            },
            "message": "upload accepted"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = service_for(&server).submit(upload()).await.unwrap();
    assert_eq!(
        response,
        SubmitResponse {
            job_id: "u-17".to_string(),
            output_name: Some("report.sdp".to_string()),
        }
    );
}

#[tokio::test]
async fn submit_accepts_numeric_job_ids_without_output_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CONVERT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "upload_id": 42 }
        })))
        .mount(&server)
        .await;

    let response = service_for(&server).submit(upload()).await.unwrap();
    assert_eq!(response.job_id, "42");
    assert_eq!(response.output_name, None);
}

#[tokio::test]
async fn submit_rejection_carries_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CONVERT))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "message": "unsupported sheet" })),
        )
        .mount(&server)
        .await;

    match service_for(&server).submit(upload()).await {
        Err(ServiceError::Validation(message)) => assert_eq!(message, "unsupported sheet"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn submit_server_error_is_transport() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CONVERT))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    match service_for(&server).submit(upload()).await {
        Err(ServiceError::Transport(message)) => assert_eq!(message, "HTTP 503"),
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn submit_without_job_id_is_protocol_violation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CONVERT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "converted_filename": "report.sdp" }
        })))
        .mount(&server)
        .await;

    let err = service_for(&server).submit(upload()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Protocol(_)), "{err:?}");
}

#[tokio::test]
async fn status_reads_state_and_rounds_progress() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PROGRESS))
        .and(query_param("upload_id", "u-17"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "status": "converting", "progress": 42.6 }
        })))
        .mount(&server)
        .await;

    let report = service_for(&server).status("u-17").await.unwrap();
    assert_eq!(
        report,
        StatusReport {
            status: RemoteStatus::Converting,
            progress: 43,
        }
    );
}

#[tokio::test]
async fn status_with_unknown_state_and_out_of_range_progress() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PROGRESS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "status": "reticulating", "progress": 250 }
        })))
        .mount(&server)
        .await;

    let report = service_for(&server).status("u-1").await.unwrap();
    assert_eq!(report.status, RemoteStatus::Unknown);
    assert_eq!(report.progress, 100);
}

#[tokio::test]
async fn malformed_status_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PROGRESS))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = service_for(&server).status("u-1").await.unwrap_err();
    assert!(matches!(err, ServiceError::Protocol(_)), "{err:?}");
}

#[tokio::test]
async fn status_server_error_is_transport() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PROGRESS))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = service_for(&server).status("u-1").await.unwrap_err();
    assert!(matches!(err, ServiceError::Transport(_)), "{err:?}");
}

#[tokio::test]
async fn list_parses_entries_and_skips_nameless_ones() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LIST))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {
                    "converted_filename": "a.sdp",
                    "original_filename": "a.xlsx",
                    "timestamp": 1_700_000_000_000i64
                },
                {
                    "converted_filename": "b.sdp",
                    "original_filename": "b.csv",
                    "timestamp": "1970-01-01T00:00:05Z"
                },
                { "original_filename": "orphan.xlsx", "timestamp": 7 },
                { "converted_filename": "c.sdp" }
            ]
        })))
        .mount(&server)
        .await;

    let entries = service_for(&server).list().await.unwrap();
    assert_eq!(
        entries,
        vec![
            SnapshotEntry {
                output_name: "a.sdp".to_string(),
                input_name: "a.xlsx".to_string(),
                timestamp: 1_700_000_000_000,
            },
            SnapshotEntry {
                output_name: "b.sdp".to_string(),
                input_name: "b.csv".to_string(),
                timestamp: 5_000,
            },
            SnapshotEntry {
                output_name: "c.sdp".to_string(),
                input_name: String::new(),
                timestamp: 0,
            },
        ]
    );
}

#[tokio::test]
async fn list_without_data_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LIST))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "nothing yet" })))
        .mount(&server)
        .await;

    assert!(service_for(&server).list().await.unwrap().is_empty());
}

#[tokio::test]
async fn download_returns_artifact_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(DOWNLOAD))
        .and(query_param("filename", "report.sdp"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"SDP\x00payload".to_vec()))
        .mount(&server)
        .await;

    let bytes = service_for(&server).download("report.sdp").await.unwrap();
    assert_eq!(&bytes[..], b"SDP\x00payload");
}

#[tokio::test]
async fn missing_artifact_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(DOWNLOAD))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "gone" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DOWNLOAD))
        .and(query_param("filename", "silent.sdp"))
        .respond_with(ResponseTemplate::new(404))
        .with_priority(1)
        .mount(&server)
        .await;

    let service = service_for(&server);
    match service.download("report.sdp").await {
        Err(ServiceError::NotFound(message)) => assert_eq!(message, "gone"),
        other => panic!("expected not found, got {other:?}"),
    }
    match service.download("silent.sdp").await {
        Err(ServiceError::NotFound(message)) => assert_eq!(message, "file not found: silent.sdp"),
        other => panic!("expected not found, got {other:?}"),
    }
}

#[tokio::test]
async fn download_server_error_is_transport() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(DOWNLOAD))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = service_for(&server).download("report.sdp").await.unwrap_err();
    assert!(matches!(err, ServiceError::Transport(_)), "{err:?}");
}

#[tokio::test]
async fn oversized_artifact_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(DOWNLOAD))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 64]))
        .mount(&server)
        .await;

    let service = ReqwestService::new(ServiceSettings {
        base_url: server.uri(),
        max_artifact_bytes: 16,
        ..ServiceSettings::default()
    })
    .unwrap();
    match service.download("big.sdp").await {
        Err(ServiceError::Transport(message)) => {
            assert!(message.contains("too large"), "{message}")
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn probe_finds_a_reachable_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let reached = service_for(&server).probe().await;
    assert_eq!(reached, Some(format!("{}/docs", server.uri())));
}

#[tokio::test]
async fn probe_reports_unreachable_service() {
    let service = ReqwestService::new(ServiceSettings {
        base_url: "http://127.0.0.1:1".to_string(),
        ..ServiceSettings::default()
    })
    .unwrap();
    assert_eq!(service.probe().await, None);
}
