use crate::config::ApiConfig;
use crate::models::ClaimValue;
use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client, Response};
use reqwest::header::RETRY_AFTER;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::thread::sleep;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub type Params = Vec<(String, String)>;

/// What the crawler needs from MediaWiki and Wikibase.
pub trait WikiApi {
    /// One GET against the wiki's `api.php`, already decoded.
    fn get(&mut self, params: &[(String, String)]) -> Result<Value>;

    /// The first usable main-snak value of `property` on `entity`, if any.
    fn first_claim_value(&mut self, entity: &str, property: &str) -> Result<Option<ClaimValue>>;
}

/// Builds an owned parameter list from string pairs.
pub fn params(pairs: &[(&str, &str)]) -> Params {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Lazily pages through a query by replaying the `continue` object of each response.
pub struct QueryPages<'a, A: WikiApi + ?Sized> {
    api: &'a mut A,
    base: Params,
    continuation: Params,
    done: bool,
}

pub fn query<'a, A: WikiApi + ?Sized>(api: &'a mut A, base: Params) -> QueryPages<'a, A> {
    QueryPages {
        api,
        base,
        continuation: Vec::new(),
        done: false,
    }
}

impl<A: WikiApi + ?Sized> Iterator for QueryPages<'_, A> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let request = merge_params(&self.base, &self.continuation);
        match self.api.get(&request) {
            Ok(page) => {
                match continuation_of(&page) {
                    Some(next) => self.continuation = next,
                    None => self.done = true,
                }
                Some(Ok(page))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// `base` with every key of `overrides` replaced or appended.
fn merge_params(base: &[(String, String)], overrides: &[(String, String)]) -> Params {
    let mut merged: Params = base.to_vec();
    for (key, value) in overrides {
        match merged.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.clone(),
            None => merged.push((key.clone(), value.clone())),
        }
    }
    merged
}

fn continuation_of(page: &Value) -> Option<Params> {
    let obj = page.get("continue")?.as_object()?;
    if obj.is_empty() {
        return None;
    }
    Some(
        obj.iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect(),
    )
}

/// Extracts the first non-deprecated value claim of `property` from a `wbgetclaims` payload.
pub fn first_claim_from_response(payload: &Value, property: &str) -> Option<ClaimValue> {
    payload
        .get("claims")?
        .get(property)?
        .as_array()?
        .iter()
        .filter(|claim| claim.get("rank").and_then(Value::as_str) != Some("deprecated"))
        .filter_map(|claim| claim.get("mainsnak"))
        .filter(|snak| snak.get("snaktype").and_then(Value::as_str) == Some("value"))
        .find_map(|snak| snak.get("datavalue").and_then(ClaimValue::from_datavalue))
}

/// Blocking client for a MediaWiki `api.php` and the Wikidata API, with a fixed
/// delay between requests and bounded retries on throttling and server errors.
pub struct MediaWikiClient {
    client: Client,
    config: ApiConfig,
    last_request_at: Option<Instant>,
    request_count: usize,
}

impl MediaWikiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            config,
            last_request_at: None,
            request_count: 0,
        })
    }

    pub fn request_count(&self) -> usize {
        self.request_count
    }

    fn request_json(&mut self, endpoint: &str, params: &[(String, String)]) -> Result<Value> {
        let url = Url::parse(endpoint).with_context(|| format!("Invalid API URL: {}", endpoint))?;

        let mut pairs: Params = Vec::with_capacity(params.len() + 2);
        pairs.push(("format".to_string(), "json".to_string()));
        pairs.push(("formatversion".to_string(), "2".to_string()));
        pairs.extend(params.iter().cloned());

        for attempt in 0..=self.config.max_retries {
            self.apply_rate_limit();
            debug!(endpoint, attempt, "API request");
            let response = self.client.get(url.clone()).query(&pairs).send();

            match response {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        if attempt < self.config.max_retries && is_retryable_status(status) {
                            let retry_after = retry_after(&response);
                            warn!(%status, attempt, "API request throttled or failed, retrying");
                            self.wait_before_retry(attempt, retry_after);
                            continue;
                        }
                        bail!("API request to {} failed with HTTP {}", endpoint, status);
                    }
                    let payload: Value = response
                        .json()
                        .with_context(|| format!("Failed to decode JSON from {}", endpoint))?;
                    if let Some(error) = payload.get("error") {
                        let code = error
                            .get("code")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown_error");
                        let info = error
                            .get("info")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown info");
                        bail!("API error [{}]: {}", code, info);
                    }
                    return Ok(payload);
                }
                Err(e) => {
                    if attempt < self.config.max_retries && is_retryable_error(&e) {
                        warn!(error = %e, attempt, "API request failed, retrying");
                        self.wait_before_retry(attempt, None);
                        continue;
                    }
                    return Err(e).with_context(|| format!("Failed to call {}", endpoint));
                }
            }
        }

        bail!("API request to {} exhausted retry budget", endpoint)
    }

    fn apply_rate_limit(&mut self) {
        if let Some(last) = self.last_request_at {
            let required = Duration::from_millis(self.config.rate_limit_ms);
            let elapsed = last.elapsed();
            if elapsed < required {
                sleep(required - elapsed);
            }
        }
        self.last_request_at = Some(Instant::now());
        self.request_count = self.request_count.saturating_add(1);
    }

    fn wait_before_retry(&self, attempt: usize, retry_after: Option<Duration>) {
        let delay = retry_after.unwrap_or_else(|| backoff_delay(self.config.retry_delay_ms, attempt));
        sleep(delay);
    }
}

impl WikiApi for MediaWikiClient {
    fn get(&mut self, params: &[(String, String)]) -> Result<Value> {
        let endpoint = self.config.api_url.clone();
        self.request_json(&endpoint, params)
    }

    fn first_claim_value(&mut self, entity: &str, property: &str) -> Result<Option<ClaimValue>> {
        let endpoint = self.config.wikidata_url.clone();
        let request = params(&[
            ("action", "wbgetclaims"),
            ("entity", entity),
            ("property", property),
        ]);
        let payload = self
            .request_json(&endpoint, &request)
            .with_context(|| format!("Failed to fetch {} claims of {}", property, entity))?;
        Ok(first_claim_from_response(&payload, property))
    }
}

fn backoff_delay(base_ms: u64, attempt: usize) -> Duration {
    let exponent = u32::try_from(attempt).unwrap_or(8).min(8);
    Duration::from_millis(base_ms.saturating_mul(1u64 << exponent))
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LatLng;
    use serde_json::json;

    /// Serves a fixed list of responses and records each request.
    struct ScriptedApi {
        responses: Vec<Result<Value>>,
        requests: Vec<Params>,
    }

    impl WikiApi for ScriptedApi {
        fn get(&mut self, params: &[(String, String)]) -> Result<Value> {
            self.requests.push(params.to_vec());
            if self.responses.is_empty() {
                bail!("no more scripted responses");
            }
            self.responses.remove(0)
        }

        fn first_claim_value(&mut self, _: &str, _: &str) -> Result<Option<ClaimValue>> {
            Ok(None)
        }
    }

    fn lookup<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
        params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn query_follows_continuation() {
        let mut api = ScriptedApi {
            responses: vec![
                Ok(json!({"continue": {"cmcontinue": "page|2", "continue": "-||"}, "query": {}})),
                Ok(json!({"continue": {"cmcontinue": "page|3", "continue": "-||"}, "query": {}})),
                Ok(json!({"batchcomplete": true, "query": {}})),
            ],
            requests: Vec::new(),
        };

        let base = params(&[("action", "query"), ("cmtitle", "Categoria:Roma")]);
        let pages: Vec<_> = query(&mut api, base).collect();
        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(|p| p.is_ok()));

        assert_eq!(lookup(&api.requests[0], "cmcontinue"), None);
        assert_eq!(lookup(&api.requests[1], "cmcontinue"), Some("page|2"));
        assert_eq!(lookup(&api.requests[2], "cmcontinue"), Some("page|3"));
        assert_eq!(lookup(&api.requests[2], "cmtitle"), Some("Categoria:Roma"));
        // continuation replaces rather than duplicates keys
        assert_eq!(
            api.requests[2].iter().filter(|(k, _)| k == "cmcontinue").count(),
            1
        );
    }

    #[test]
    fn query_stops_after_error() {
        let mut api = ScriptedApi {
            responses: vec![
                Ok(json!({"continue": {"cmcontinue": "x"}})),
                Err(anyhow::anyhow!("boom")),
                Ok(json!({})),
            ],
            requests: Vec::new(),
        };
        let pages: Vec<_> = query(&mut api, Vec::new()).collect();
        assert_eq!(pages.len(), 2);
        assert!(pages[1].is_err());
        assert_eq!(api.requests.len(), 2);
    }

    #[test]
    fn merge_params_overrides_and_appends() {
        let merged = merge_params(
            &params(&[("a", "1"), ("b", "2")]),
            &params(&[("b", "3"), ("c", "4")]),
        );
        assert_eq!(merged, params(&[("a", "1"), ("b", "3"), ("c", "4")]));
    }

    #[test]
    fn first_claim_skips_deprecated_and_novalue() {
        let payload = json!({
            "claims": {
                "P625": [
                    {"rank": "deprecated", "mainsnak": {"snaktype": "value", "datavalue": {"type": "globecoordinate", "value": {"latitude": 1.0, "longitude": 2.0}}}},
                    {"rank": "normal", "mainsnak": {"snaktype": "novalue"}},
                    {"rank": "normal", "mainsnak": {"snaktype": "value", "datavalue": {"type": "globecoordinate", "value": {"latitude": 41.9, "longitude": 12.5}}}}
                ]
            }
        });
        assert_eq!(
            first_claim_from_response(&payload, "P625"),
            Some(ClaimValue::Coordinate(LatLng::new(41.9, 12.5)))
        );
        assert_eq!(first_claim_from_response(&payload, "P402"), None);
        assert_eq!(first_claim_from_response(&json!({"claims": []}), "P625"), None);
    }

    #[test]
    fn backoff_grows_and_caps() {
        assert_eq!(backoff_delay(100, 0), Duration::from_millis(100));
        assert_eq!(backoff_delay(100, 3), Duration::from_millis(800));
        assert_eq!(backoff_delay(100, 50), Duration::from_millis(25_600));
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
    }

    #[test]
    fn client_rejects_invalid_endpoint_without_network() {
        let config = ApiConfig {
            api_url: "not a url".to_string(),
            ..ApiConfig::default()
        };
        let mut client = MediaWikiClient::new(config).unwrap();
        assert!(client.get(&params(&[("action", "query")])).is_err());
        assert_eq!(client.request_count(), 0);
    }
}
