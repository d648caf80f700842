use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

const MAPS_BASE_URL: &str = "https://maps.apple.com/";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostalAddress {
    pub line1: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Place {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<PostalAddress>,
}

pub fn find_place<'a>(places: &'a HashMap<String, Place>, id: &str) -> Option<&'a Place> {
    places.get(id.trim())
}

/// Coordinates take precedence over the postal address.
pub fn maps_link(place: &Place) -> Option<String> {
    if let Some(coordinates) = place.coordinates {
        return Some(format!(
            "{MAPS_BASE_URL}?ll={},{}",
            coordinates.lat, coordinates.lng
        ));
    }

    let address = place.address.as_ref()?;
    let query = format!(
        "{}, {}, {} {}",
        address.line1, address.city, address.state, address.zip
    );
    Url::parse_with_params(MAPS_BASE_URL, &[("q", query.as_str())])
        .ok()
        .map(String::from)
}
