use postcode::compose::compose;
use postcode::http::{Dispatcher, ErrorKind, Method, TransportOptions};
use postcode::model::{BodyMode, KeyValue, RequestAuth, RequestBody, RequestSpec};
use std::time::Duration;
use wiremock::matchers::{body_string, header, header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn dispatch(spec: &RequestSpec, options: &TransportOptions) -> postcode::http::Response {
    let dispatcher = Dispatcher::new().unwrap();
    let composed = compose(spec).unwrap();
    dispatcher.send(&composed, options).await
}

/// 4xx 是正常响应，不是错误
#[tokio::test]
async fn test_not_found_is_a_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&mock_server)
        .await;

    let spec = RequestSpec::new(Method::Get, format!("{}/missing", mock_server.uri()));
    let response = dispatch(&spec, &TransportOptions::default()).await;

    assert!(!response.is_error());
    assert_eq!(response.status, Some(404));
    assert_eq!(response.status_text.as_deref(), Some("Not Found"));
    assert_eq!(response.data.as_deref(), Some("not found"));
    assert!(response.is_client_error());
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    // 端口 1 上通常没有服务
    let spec = RequestSpec::new(Method::Get, "http://127.0.0.1:1/");
    let options = TransportOptions::default().with_timeout(Duration::from_secs(5));
    let response = dispatch(&spec, &options).await;

    assert!(response.is_error());
    assert_eq!(response.status, None);
    let error = response.error.as_ref().unwrap();
    assert_eq!(error.kind, ErrorKind::Network);
    assert!(error.message.starts_with("网络错误: "));
}

#[tokio::test]
async fn test_bearer_and_query_params() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("page", "2"))
        .and(header("Authorization", "Bearer abc"))
        .and(header("X-Trace", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let spec = RequestSpec::new(Method::Get, format!("{}/users", mock_server.uri()))
        .with_query("page", "2")
        .with_header("X-Trace", "1")
        .with_auth(RequestAuth::bearer("abc"));
    let response = dispatch(&spec, &TransportOptions::default()).await;

    assert_eq!(response.status, Some(200));
    assert_eq!(response.text(), "[]");
}

#[tokio::test]
async fn test_basic_auth_header() {
    let mock_server = MockServer::start().await;

    // user:pass
    Mock::given(method("GET"))
        .and(header("Authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let spec = RequestSpec::new(Method::Get, mock_server.uri()).with_auth(RequestAuth::basic("user", "pass"));
    let response = dispatch(&spec, &TransportOptions::default()).await;

    assert_eq!(response.status, Some(204));
    assert_eq!(response.text(), "");
}

#[tokio::test]
async fn test_urlencoded_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(header("Content-Type", "application/x-www-form-urlencoded"))
        .and(body_string("user=a+b&code=1%262"))
        .respond_with(ResponseTemplate::new(201).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let body = RequestBody {
        mode: BodyMode::Urlencoded,
        urlencoded: vec![
            KeyValue::new("user", "a b"),
            KeyValue::new("code", "1&2"),
            KeyValue::new("skipped", "x").disabled(),
        ],
        ..RequestBody::default()
    };
    let spec = RequestSpec::new(Method::Post, format!("{}/login", mock_server.uri())).with_body(body);
    let response = dispatch(&spec, &TransportOptions::default()).await;

    assert_eq!(response.status, Some(201));
}

#[tokio::test]
async fn test_timeout_is_network_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let spec = RequestSpec::new(Method::Get, mock_server.uri());
    let options = TransportOptions::default().with_timeout(Duration::from_millis(200));
    let response = dispatch(&spec, &options).await;

    assert!(response.is_error());
    assert_eq!(response.status, None);
}

#[tokio::test]
async fn test_formdata_sent_as_multipart() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header_regex("Content-Type", r"^multipart/form-data; boundary=\S+$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let body = RequestBody {
        mode: BodyMode::Formdata,
        formdata: vec![
            KeyValue::new("name", "foo"),
            KeyValue::new("note", "a b"),
            KeyValue::new("skipped", "x").disabled(),
        ],
        ..RequestBody::default()
    };
    let spec = RequestSpec::new(Method::Post, format!("{}/upload", mock_server.uri()))
        .with_header("Content-Type", "text/plain")
        .with_body(body);
    let response = dispatch(&spec, &TransportOptions::default()).await;
    assert_eq!(response.status, Some(200));

    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let content_types: Vec<_> = received[0].headers.get_all("content-type").iter().collect();
    assert_eq!(content_types.len(), 1);

    let payload = String::from_utf8_lossy(&received[0].body);
    assert!(payload.contains("Content-Disposition: form-data; name=\"name\"\r\n\r\nfoo\r\n"));
    assert!(payload.contains("Content-Disposition: form-data; name=\"note\"\r\n\r\na b\r\n"));
    assert!(!payload.contains("skipped"));
}
