use crate::config::{NS_CATEGORY, NS_USER, NS_USER_TALK};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// A latitude/longitude pair. Serialized as `[lat, lng]`, stored as `lat;lng`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "[f64; 2]")]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let (lat, lng) = s.trim().split_once(';')?;
        let lat: f64 = lat.trim().parse().ok()?;
        let lng: f64 = lng.trim().parse().ok()?;
        if !lat.is_finite() || !lng.is_finite() {
            return None;
        }
        Some(Self { lat, lng })
    }
}

impl From<LatLng> for [f64; 2] {
    fn from(ll: LatLng) -> Self {
        [ll.lat, ll.lng]
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.lat, self.lng)
    }
}

/// One output record: a category's transitive page count and position in the tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapArea {
    pub title: String,
    pub count: u64,
    pub depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat_lng: Option<LatLng>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub osm_id: Option<String>,
}

impl MapArea {
    pub fn new(title: impl Into<String>, count: u64, depth: u32) -> Self {
        Self {
            title: title.into(),
            count,
            depth,
            lat_lng: None,
            osm_id: None,
        }
    }
}

/// The main value of a Wikibase claim, reduced to what the crawl stores.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimValue {
    Item(String),
    Coordinate(LatLng),
    Text(String),
}

impl ClaimValue {
    /// Reads a `mainsnak.datavalue` object (`{"type": ..., "value": ...}`).
    pub fn from_datavalue(datavalue: &Value) -> Option<Self> {
        let value = datavalue.get("value")?;
        match datavalue.get("type").and_then(Value::as_str)? {
            "wikibase-entityid" => {
                if let Some(id) = value.get("id").and_then(Value::as_str) {
                    return Some(ClaimValue::Item(id.to_string()));
                }
                value
                    .get("numeric-id")
                    .and_then(Value::as_u64)
                    .map(|n| ClaimValue::Item(format!("Q{}", n)))
            }
            "globecoordinate" => {
                let lat = value.get("latitude").and_then(Value::as_f64)?;
                let lng = value.get("longitude").and_then(Value::as_f64)?;
                Some(ClaimValue::Coordinate(LatLng::new(lat, lng)))
            }
            "string" | "external-id" => value.as_str().map(|s| ClaimValue::Text(s.to_string())),
            _ => None,
        }
    }

    /// The single line persisted in the store for this value.
    pub fn to_store_line(&self) -> String {
        match self {
            ClaimValue::Item(id) => id.clone(),
            ClaimValue::Coordinate(ll) => ll.to_string(),
            ClaimValue::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    ChildCategory(String),
    UserPage(String),
    Ignored,
}

/// Sorts a category member by namespace. User and user-talk pages are reduced to
/// the bare user name: the namespace prefix and any sub-page suffix are dropped.
pub fn classify_member(ns: i64, title: &str) -> Member {
    match ns {
        NS_CATEGORY => Member::ChildCategory(title.to_string()),
        NS_USER | NS_USER_TALK => {
            let name = title.split_once(':').map_or(title, |(_, rest)| rest);
            let name = name.split('/').next().unwrap_or_default().trim();
            if name.is_empty() {
                Member::Ignored
            } else {
                Member::UserPage(name.to_string())
            }
        }
        _ => Member::Ignored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_page_strips_prefix_and_subpage() {
        assert_eq!(
            classify_member(2, "Utente:Foo/bar"),
            Member::UserPage("Foo".to_string())
        );
        assert_eq!(
            classify_member(3, "Discussioni utente:Foo Bar/archivio/2020"),
            Member::UserPage("Foo Bar".to_string())
        );
        assert_eq!(classify_member(2, "Utente:Baz"), Member::UserPage("Baz".to_string()));
    }

    #[test]
    fn category_member_is_kept_verbatim() {
        assert_eq!(
            classify_member(14, "Categoria:Bar"),
            Member::ChildCategory("Categoria:Bar".to_string())
        );
    }

    #[test]
    fn other_namespaces_are_ignored() {
        assert_eq!(classify_member(0, "Roma"), Member::Ignored);
        assert_eq!(classify_member(4, "Wikipedia:Bar"), Member::Ignored);
        assert_eq!(classify_member(2, "Utente:/x"), Member::Ignored);
    }

    #[test]
    fn lat_lng_parse() {
        assert_eq!(LatLng::parse("41.9;12.5"), Some(LatLng::new(41.9, 12.5)));
        assert_eq!(LatLng::parse(" -33.5 ; 151 \n"), Some(LatLng::new(-33.5, 151.0)));
        assert_eq!(LatLng::parse("41.9"), None);
        assert_eq!(LatLng::parse("a;b"), None);
        assert_eq!(LatLng::parse("NaN;1"), None);
    }

    #[test]
    fn lat_lng_store_form_parses_back() {
        let ll = LatLng::new(45.4642, 9.19);
        assert_eq!(LatLng::parse(&ll.to_string()), Some(ll));
    }

    #[test]
    fn map_area_json_shape() {
        let mut area = MapArea::new("Categoria:Lazio", 7, 1);
        assert_eq!(
            serde_json::to_value(&area).unwrap(),
            json!({"title": "Categoria:Lazio", "count": 7, "depth": 1})
        );

        area.lat_lng = Some(LatLng::new(41.9, 12.5));
        area.osm_id = Some("40784".to_string());
        assert_eq!(
            serde_json::to_value(&area).unwrap(),
            json!({
                "title": "Categoria:Lazio",
                "count": 7,
                "depth": 1,
                "lat_lng": [41.9, 12.5],
                "osm_id": "40784"
            })
        );
    }

    #[test]
    fn claim_value_from_datavalue() {
        let item = json!({"type": "wikibase-entityid", "value": {"entity-type": "item", "numeric-id": 1282, "id": "Q1282"}});
        assert_eq!(ClaimValue::from_datavalue(&item), Some(ClaimValue::Item("Q1282".into())));

        let numeric_only = json!({"type": "wikibase-entityid", "value": {"numeric-id": 42}});
        assert_eq!(ClaimValue::from_datavalue(&numeric_only), Some(ClaimValue::Item("Q42".into())));

        let coord = json!({"type": "globecoordinate", "value": {"latitude": 41.9, "longitude": 12.5, "precision": 0.01}});
        let parsed = ClaimValue::from_datavalue(&coord).unwrap();
        assert_eq!(parsed, ClaimValue::Coordinate(LatLng::new(41.9, 12.5)));
        assert_eq!(parsed.to_store_line(), "41.9;12.5");

        let osm = json!({"type": "external-id", "value": "40784"});
        assert_eq!(ClaimValue::from_datavalue(&osm), Some(ClaimValue::Text("40784".into())));

        let quantity = json!({"type": "quantity", "value": {"amount": "+5"}});
        assert_eq!(ClaimValue::from_datavalue(&quantity), None);
    }
}
