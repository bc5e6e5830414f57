use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use crayon_common::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use url::Url;

use crate::tools::{Tool, ToolContext, ToolOutput};

const WTTR_BASE_URL: &str = "https://wttr.in";
const OBSERVATION_FORMAT: &str = "%Y-%m-%d %I:%M %p";

/// Current conditions for a city, backed by wttr.in's `j1` JSON format.
///
/// Upstream problems are reported as a JSON string payload rather than an
/// `Err`, so the caller can relay the message as-is.
pub struct WeatherTool {
    http: reqwest::Client,
    base_url: String,
}

/// The structured success payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub city: String,
    pub temperature: f64,
    #[serde(rename = "feelsLike")]
    pub feels_like: f64,
    pub description: String,
    pub humidity: f64,
    pub windspeed: f64,
}

#[derive(Debug, Deserialize)]
struct WttrResponse {
    #[serde(default)]
    current_condition: Vec<WttrCondition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WttrCondition {
    #[serde(rename = "temp_C")]
    temp_c: String,
    #[serde(rename = "FeelsLikeC")]
    feels_like_c: String,
    humidity: String,
    #[serde(rename = "windspeedKmph")]
    windspeed_kmph: String,
    #[serde(default)]
    weather_desc: Vec<WttrValue>,
    local_obs_date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WttrValue {
    value: String,
}

impl WeatherTool {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: WTTR_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        self
    }

    fn url_for(&self, city: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::Tool(format!("bad weather url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| Error::Tool("weather url cannot take a path".to_string()))?
            .pop_if_empty()
            .push(city);
        url.query_pairs_mut().append_pair("format", "j1");
        Ok(url)
    }

    async fn lookup(&self, city: &str) -> Result<WeatherReport> {
        let url = self.url_for(city)?;
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Tool(format!("weather request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::Tool(format!(
                "weather service returned status={}",
                resp.status().as_u16()
            )));
        }

        let body: WttrResponse = resp
            .json()
            .await
            .map_err(|e| Error::Tool(format!("unexpected weather payload: {e}")))?;

        report_from(city, body)
    }
}

impl Default for WeatherTool {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick the newest observation and convert the stringly-typed fields.
fn report_from(city: &str, body: WttrResponse) -> Result<WeatherReport> {
    let current = body
        .current_condition
        .into_iter()
        .enumerate()
        .max_by_key(|(index, c)| {
            let observed = c
                .local_obs_date_time
                .as_deref()
                .and_then(|s| NaiveDateTime::parse_from_str(s, OBSERVATION_FORMAT).ok());
            // earlier entries win ties, matching the service's newest-first order
            (observed, std::cmp::Reverse(*index))
        })
        .map(|(_, c)| c)
        .ok_or_else(|| Error::Tool("no current conditions reported".to_string()))?;

    let number = |field: &str, raw: &str| {
        raw.trim()
            .parse::<f64>()
            .map_err(|_| Error::Tool(format!("weather field {field} is not numeric: {raw:?}")))
    };

    Ok(WeatherReport {
        city: city.to_string(),
        temperature: number("temp_C", &current.temp_c)?,
        feels_like: number("FeelsLikeC", &current.feels_like_c)?,
        description: current
            .weather_desc
            .first()
            .map(|d| d.value.trim().to_string())
            .unwrap_or_default(),
        humidity: number("humidity", &current.humidity)?,
        windspeed: number("windspeedKmph", &current.windspeed_kmph)?,
    })
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &'static str {
        "get_weather"
    }

    fn description(&self) -> &'static str {
        "Get the current weather for a city: temperature and feels-like temperature in \
         Celsius, a short description, humidity in percent and wind speed in km/h."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "Name of the city, e.g. 'Fortaleza' or 'Tokyo'"
                }
            },
            "required": ["city"]
        })
    }

    async fn execute(&self, context: &ToolContext, args: serde_json::Value) -> Result<ToolOutput> {
        let city = match args.get("city") {
            Some(serde_json::Value::String(city)) if !city.trim().is_empty() => city.trim(),
            Some(serde_json::Value::String(_)) => {
                return Ok(ToolOutput::error_message("Invalid city: the city name is empty."));
            }
            _ => {
                return Ok(ToolOutput::error_message(
                    "Invalid city: expected the city name as text.",
                ));
            }
        };

        info!(city, channel = %context.channel_id, "checking the weather");

        match self.lookup(city).await {
            Ok(report) => Ok(ToolOutput::json(&serde_json::to_value(&report)?)),
            Err(e) => {
                warn!(city, "weather lookup failed: {e}");
                Ok(ToolOutput::error_message(format!(
                    "Failed to retrieve weather information for {city}."
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn condition(temp: &str, observed: Option<&str>) -> WttrCondition {
        WttrCondition {
            temp_c: temp.into(),
            feels_like_c: "30".into(),
            humidity: "74".into(),
            windspeed_kmph: "19".into(),
            weather_desc: vec![WttrValue {
                value: "Partly cloudy ".into(),
            }],
            local_obs_date_time: observed.map(str::to_string),
        }
    }

    #[test]
    fn report_uses_newest_observation() {
        let body = WttrResponse {
            current_condition: vec![
                condition("25", Some("2026-10-18 08:00 AM")),
                condition("28", Some("2026-10-18 01:00 PM")),
            ],
        };
        let report = report_from("Fortaleza", body).unwrap();
        assert_eq!(report.temperature, 28.0);
        assert_eq!(report.description, "Partly cloudy");
    }

    #[test]
    fn report_falls_back_to_first_without_timestamps() {
        let body = WttrResponse {
            current_condition: vec![condition("21", None), condition("22", None)],
        };
        assert_eq!(report_from("Lisbon", body).unwrap().temperature, 21.0);
    }

    #[test]
    fn empty_conditions_are_an_error() {
        let body = WttrResponse {
            current_condition: vec![],
        };
        assert!(report_from("Nowhere", body).is_err());
    }

    #[test]
    fn non_numeric_field_is_an_error() {
        let body = WttrResponse {
            current_condition: vec![condition("warm", None)],
        };
        let err = report_from("Nowhere", body).unwrap_err();
        assert!(err.to_string().contains("temp_C"));
    }

    #[test]
    fn url_encodes_city_and_requests_json() {
        let tool = WeatherTool::new().with_base_url("http://localhost:1234/");
        let url = tool.url_for("São Paulo").unwrap();
        assert_eq!(url.path(), "/S%C3%A3o%20Paulo");
        assert_eq!(url.query(), Some("format=j1"));
    }

    #[test]
    fn report_serializes_with_camel_case_feels_like() {
        let report = WeatherReport {
            city: "Fortaleza".into(),
            temperature: 28.0,
            feels_like: 31.0,
            description: "Sunny".into(),
            humidity: 70.0,
            windspeed: 20.0,
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["feelsLike"], 31.0);
        assert_eq!(value.as_object().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn empty_city_is_rejected_without_a_request() {
        let tool = WeatherTool::new().with_base_url("http://127.0.0.1:9");
        let out = tool
            .execute(&ToolContext::default(), json!({ "city": "" }))
            .await
            .unwrap();
        let payload: serde_json::Value = serde_json::from_str(&out.content).unwrap();
        assert!(payload.as_str().unwrap().starts_with("Invalid city"));
    }

    #[tokio::test]
    async fn non_string_city_is_rejected() {
        let tool = WeatherTool::new();
        let out = tool
            .execute(&ToolContext::default(), json!({ "city": 42 }))
            .await
            .unwrap();
        let payload: serde_json::Value = serde_json::from_str(&out.content).unwrap();
        assert!(payload.as_str().unwrap().starts_with("Invalid city"));
    }
}
