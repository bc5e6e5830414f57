use crayon_agents::{Tool, ToolContext, WeatherTool};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn wttr_body() -> serde_json::Value {
    json!({
        "current_condition": [{
            "FeelsLikeC": "31",
            "humidity": "70",
            "localObsDateTime": "2026-10-18 01:00 PM",
            "temp_C": "28",
            "weatherDesc": [{ "value": "Sunny" }],
            "windspeedKmph": "20"
        }],
        "nearest_area": [],
        "weather": []
    })
}

fn ctx() -> ToolContext {
    ToolContext {
        channel_id: "42".into(),
        requested_by: Some("ana".into()),
    }
}

#[tokio::test]
async fn successful_lookup_returns_six_typed_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Fortaleza"))
        .and(query_param("format", "j1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(wttr_body()))
        .expect(1)
        .mount(&server)
        .await;

    let tool = WeatherTool::new().with_base_url(server.uri());
    let out = tool
        .execute(&ctx(), json!({ "city": "Fortaleza" }))
        .await
        .unwrap();

    let payload: serde_json::Value = serde_json::from_str(&out.content).unwrap();
    let object = payload.as_object().unwrap();
    assert_eq!(object.len(), 6);
    assert_eq!(payload["city"], "Fortaleza");
    assert_eq!(payload["temperature"], 28.0);
    assert_eq!(payload["feelsLike"], 31.0);
    assert_eq!(payload["description"], "Sunny");
    assert_eq!(payload["humidity"], 70.0);
    assert_eq!(payload["windspeed"], 20.0);
}

#[tokio::test]
async fn upstream_error_becomes_message_string() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let tool = WeatherTool::new().with_base_url(server.uri());
    let out = tool
        .execute(&ctx(), json!({ "city": "Atlantis" }))
        .await
        .unwrap();

    let payload: serde_json::Value = serde_json::from_str(&out.content).unwrap();
    assert_eq!(
        payload,
        json!("Failed to retrieve weather information for Atlantis.")
    );
}

#[tokio::test]
async fn garbage_payload_becomes_message_string() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
        .mount(&server)
        .await;

    let tool = WeatherTool::new().with_base_url(server.uri());
    let out = tool
        .execute(&ctx(), json!({ "city": "Tokyo" }))
        .await
        .unwrap();
    let payload: serde_json::Value = serde_json::from_str(&out.content).unwrap();
    assert!(payload.as_str().unwrap().starts_with("Failed to retrieve"));
}

#[tokio::test]
async fn blank_city_never_reaches_the_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(wttr_body()))
        .expect(0)
        .mount(&server)
        .await;

    let tool = WeatherTool::new().with_base_url(server.uri());
    let out = tool.execute(&ctx(), json!({ "city": "   " })).await.unwrap();
    let payload: serde_json::Value = serde_json::from_str(&out.content).unwrap();
    assert!(payload.as_str().unwrap().starts_with("Invalid city"));
}
