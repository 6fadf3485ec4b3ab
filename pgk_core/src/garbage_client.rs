//! This client fetches the schedule and the legacy street directory.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    header::{HeaderValue, CONTENT_TYPE, ETAG, IF_NONE_MATCH, USER_AGENT},
    StatusCode,
};
use serde::Deserialize;

use crate::{
    config::EntryConfig,
    error::{Error, Result},
    rsc,
    schedule::ScheduleRow,
};

static LEGACY_API: &str = "https://pgkwywozy.infocity.pl/Api";
static LEGACY_USER_AGENT: &str = "WebKit=Android";
static DIRECTORY_TIMEOUT: Duration = Duration::from_secs(10);

/// The result of asking for the schedule.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    Modified {
        rows: Vec<ScheduleRow>,
        etag: Option<String>,
    },
    /// The cached copy matching the sent ETag is still current.
    NotModified,
}

/// Anything which can provide the schedule of one entry.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn fetch(&self, etag: Option<&str>) -> Result<Fetched>;
}

/// A city or street of the legacy directory.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Place {
    #[serde(rename = "Id")]
    pub id: serde_json::Value,
    #[serde(rename = "Nazwa")]
    pub name: String,
}

impl Place {
    /// The id as it is used in URLs, without quotes for string ids.
    pub fn id_string(&self) -> String {
        match &self.id {
            serde_json::Value::String(id) => id.clone(),
            other => other.to_string(),
        }
    }
}

/// The title of an entry created from a directory lookup.
pub fn entry_title(city: &Place, street: &Place) -> String {
    format!("{} - {}", city.name, street.name)
}

/// Fetches the schedule of one location from the official website.
#[derive(Debug, Clone)]
pub struct GarbageClient {
    client: reqwest::Client,
    customer_type: String,
    region: String,
    location: String,
    timeout: Duration,
}

impl GarbageClient {
    pub fn new(entry: &EntryConfig, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            customer_type: entry.customer_type.clone(),
            region: entry.region.clone(),
            location: entry.location.clone(),
            timeout,
        }
    }
}

#[async_trait]
impl ScheduleSource for GarbageClient {
    async fn fetch(&self, etag: Option<&str>) -> Result<Fetched> {
        let url = rsc::build_rsc_url(&self.customer_type, &self.region, &self.location)?;
        tracing::debug!("fetching schedule from {url}");
        let mut request = self.client.get(url).timeout(self.timeout);
        for (name, value) in rsc::rsc_headers() {
            request = request.header(name, value);
        }
        if let Some(etag) = etag {
            request = request.header(IF_NONE_MATCH, etag);
        }
        let response = request.send().await?;
        let status = response.status();
        let etag = response.headers().get(ETAG).cloned();
        let body = match status {
            StatusCode::OK => response.text().await?,
            _ => String::new(),
        };
        classify(status, etag.as_ref(), &body)
    }
}

/// Interpret a schedule response. Only a `200` has a body worth parsing.
fn classify(status: StatusCode, etag: Option<&HeaderValue>, body: &str) -> Result<Fetched> {
    match status {
        StatusCode::NOT_MODIFIED => Ok(Fetched::NotModified),
        StatusCode::OK => {
            let etag = etag
                .and_then(|value| value.to_str().ok())
                .map(String::from);
            let rows = rsc::parse(body)?;
            Ok(Fetched::Modified { rows, etag })
        }
        status => Err(Error::Status(status.as_u16())),
    }
}

async fn get_places(url: &str) -> Result<Vec<Place>> {
    let client = reqwest::Client::new();
    let places = client
        .get(url)
        .header(USER_AGENT, LEGACY_USER_AGENT)
        .header(CONTENT_TYPE, "application/json")
        .timeout(DIRECTORY_TIMEOUT)
        .send()
        .await?
        .error_for_status()?
        .json::<Vec<Place>>()
        .await?;
    tracing::debug!("{url} returned {} places", places.len());
    Ok(places)
}

/// Get all cities of the legacy directory.
pub async fn get_cities() -> Result<Vec<Place>> {
    get_places(&format!("{LEGACY_API}/GetCities")).await
}

/// Get all streets of a city of the legacy directory.
pub async fn get_streets(city_id: &str) -> Result<Vec<Place>> {
    get_places(&format!("{LEGACY_API}/GetStreets/{city_id}?orderInfo=true")).await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::{header::HeaderValue, StatusCode};
    use serde_json::json;

    use crate::{
        config::EntryConfig,
        error::Error,
        garbage_client::{
            classify, entry_title, get_cities, Fetched, GarbageClient, Place, ScheduleSource,
        },
    };

    static RSC: &str = include_str!("rsc/tests/schedule.rsc");

    #[test]
    fn test_classify_ok_keeps_etag() {
        let etag = HeaderValue::from_static("W/\"abc\"");
        let fetched = classify(StatusCode::OK, Some(&etag), RSC).unwrap();
        let Fetched::Modified { rows, etag } = fetched else {
            panic!("expected new rows");
        };
        assert_eq!(rows.len(), 6);
        assert_eq!(etag.as_deref(), Some("W/\"abc\""));

        let Fetched::Modified { etag, .. } = classify(StatusCode::OK, None, RSC).unwrap() else {
            panic!("expected new rows");
        };
        assert_eq!(etag, None);
    }

    #[test]
    fn test_classify_not_modified() {
        let etag = HeaderValue::from_static("\"v1\"");
        assert_eq!(
            classify(StatusCode::NOT_MODIFIED, Some(&etag), "").unwrap(),
            Fetched::NotModified
        );
    }

    #[test]
    fn test_classify_errors() {
        assert!(matches!(
            classify(StatusCode::INTERNAL_SERVER_ERROR, None, RSC),
            Err(Error::Status(500))
        ));
        assert!(matches!(
            classify(StatusCode::NO_CONTENT, None, ""),
            Err(Error::Status(204))
        ));
        assert!(matches!(
            classify(StatusCode::OK, None, "0:[\"$\",\"div\"]"),
            Err(Error::ScheduleDataMissing)
        ));
    }

    #[test]
    fn test_place_deserialize() {
        let places: Vec<Place> = serde_json::from_value(json!([
            {"Id": 3, "Nazwa": "Słupsk"},
            {"Id": "a-7", "Nazwa": "Długa", "Kolejnosc": 1},
        ]))
        .unwrap();
        assert_eq!(places[0].id_string(), "3");
        assert_eq!(places[1].id_string(), "a-7");
        assert_eq!(entry_title(&places[0], &places[1]), "Słupsk - Długa");
    }

    /// Test whether the directory can be fetched.
    ///
    /// This is an online test!
    #[tokio::test]
    #[ignore]
    async fn test_get_cities() {
        let cities = get_cities().await.unwrap();
        assert!(cities.len() > 0);
    }

    /// Test whether the schedule page can be fetched and parsed.
    ///
    /// This is an online test!
    #[tokio::test]
    #[ignore]
    async fn test_fetch() {
        let entry = EntryConfig {
            region: "Słupsk".to_string(),
            location: "Długa".to_string(),
            ..EntryConfig::default()
        };
        let client = GarbageClient::new(&entry, Duration::from_secs(30));
        match client.fetch(None).await.unwrap() {
            Fetched::Modified { rows, .. } => assert!(rows.len() > 0),
            Fetched::NotModified => panic!("no ETag was sent"),
        }
    }
}
