//! Place-metadata retrieval: nearby search and place-details reviews.
//!
//! Responses are persisted verbatim as JSON, one file per (location,
//! keyword) or per place ID, and a file already on disk is never
//! re-fetched. Separate flatteners turn a retrieval directory into a
//! tabular CSV.

use crate::config::PlacesSettings;
use crate::geo::Location;
use crate::http::{HttpClient, HttpError};
use crate::request::MapsApi;
use crate::retry::{run_with_retry, CancelFlag, RetryError, RetryPolicy};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Primary place types searched when no keywords are configured.
pub const DEFAULT_PLACE_TYPES: &[&str] = &[
    "accounting", "airport", "amusement_park", "aquarium", "art_gallery", "atm", "bakery", "bank",
    "bar", "beauty_salon", "bicycle_store", "book_store", "bowling_alley", "bus_station", "cafe",
    "campground", "car_dealer", "car_rental", "car_repair", "car_wash", "casino", "cemetery",
    "church", "city_hall", "clothing_store", "convenience_store", "courthouse", "dentist",
    "department_store", "doctor", "drugstore", "electrician", "electronics_store", "embassy",
    "fire_station", "florist", "funeral_home", "furniture_store", "gas_station",
    "grocery_or_supermarket", "gym", "hair_care", "hardware_store", "hindu_temple",
    "home_goods_store", "hospital", "insurance_agency", "jewelry_store", "laundry", "lawyer",
    "library", "light_rail_station", "liquor_store", "local_government_office", "locksmith",
    "lodging", "meal_delivery", "meal_takeaway", "mosque", "movie_rental", "movie_theater",
    "moving_company", "museum", "night_club", "painter", "park", "parking", "pet_store",
    "pharmacy", "physiotherapist", "plumber", "police", "post_office", "primary_school",
    "real_estate_agency", "restaurant", "roofing_contractor", "rv_park", "school",
    "secondary_school", "shoe_store", "shopping_mall", "spa", "stadium", "storage", "store",
    "subway_station", "supermarket", "synagogue", "taxi_stand", "tourist_attraction",
    "train_station", "transit_station", "travel_agency", "university", "veterinary_care", "zoo",
];

/// Delay before requesting a follow-up page; the page token takes a few
/// seconds to become valid server-side.
const PAGE_TOKEN_DELAY: Duration = Duration::from_secs(3);

/// Attempts per follow-up page before accepting the partial result.
const PAGE_TOKEN_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum PlacesError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("request failed: {0}")]
    Request(#[from] RetryError<HttpError>),

    #[error("malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),
}

/// Counts of what one retrieval pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RetrievalSummary {
    /// Files newly written.
    pub saved: usize,
    /// Files already present and left alone.
    pub skipped: usize,
    /// Requests whose response status made the file unsaveable.
    pub failed: usize,
    /// Whether cancellation cut the pass short.
    pub cancelled: bool,
}

/// Retrieves and persists place metadata for a set of locations.
pub struct PlacesRetriever<C: HttpClient> {
    client: C,
    api: MapsApi,
    policy: RetryPolicy,
    cancel: CancelFlag,
    page_delay: Duration,
}

impl<C: HttpClient> PlacesRetriever<C> {
    pub fn new(client: C, api: MapsApi, policy: RetryPolicy, cancel: CancelFlag) -> Self {
        Self {
            client,
            api,
            policy,
            cancel,
            page_delay: PAGE_TOKEN_DELAY,
        }
    }

    /// Overrides the follow-up page delay. Tests use zero.
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// Nearby search for every (key, location) against every keyword.
    ///
    /// Output layout: `<dir>/<key>/<keyword>.json`. Existing files are
    /// skipped so an interrupted run resumes where it stopped. A response
    /// with status `OK` or `ZERO_RESULTS` is saved; anything else is
    /// counted as failed and logged.
    pub fn retrieve_nearby(
        &self,
        dir: &Path,
        targets: &[(String, Location)],
        settings: &PlacesSettings,
    ) -> Result<RetrievalSummary, PlacesError> {
        let keywords: Vec<&str> = match &settings.keywords {
            Some(list) => list.iter().map(String::as_str).collect(),
            None => DEFAULT_PLACE_TYPES.to_vec(),
        };
        let radius_m = (settings.radius_km * 1000.0).round() as u32;

        let mut summary = RetrievalSummary::default();
        'outer: for (key, location) in targets {
            let sub_dir = dir.join(key);
            std::fs::create_dir_all(&sub_dir)?;

            for keyword in &keywords {
                if self.cancel.is_cancelled() {
                    summary.cancelled = true;
                    break 'outer;
                }

                let path = sub_dir.join(format!("{keyword}.json"));
                if path.exists() {
                    debug!(key = %key, keyword = %keyword, "nearby result already on disk");
                    summary.skipped += 1;
                    continue;
                }

                let url = self.api.nearby_search_url(location, radius_m, Some(*keyword));
                let mut data = self.fetch_json(&url)?;
                let status = status_of(&data).to_string();

                if status == "OK" {
                    self.follow_pages(&mut data, key, keyword)?;
                }

                if status == "OK" || status == "ZERO_RESULTS" {
                    std::fs::write(&path, data.to_string())?;
                    summary.saved += 1;
                } else {
                    warn!(key = %key, keyword = %keyword, status = %status, "nearby search rejected, not saved");
                    summary.failed += 1;
                }
            }
            info!(key = %key, "nearby retrieval finished for location");
        }
        Ok(summary)
    }

    /// Fetches every follow-up page and merges it into `data`.
    ///
    /// The page token needs a few seconds to activate; an
    /// `INVALID_REQUEST` answer is retried up to [`PAGE_TOKEN_ATTEMPTS`]
    /// times. Giving up keeps the pages collected so far and warns.
    fn follow_pages(&self, data: &mut Value, key: &str, keyword: &str) -> Result<(), PlacesError> {
        while let Some(token) = data
            .get("next_page_token")
            .and_then(Value::as_str)
            .map(str::to_string)
        {
            let url = self.api.nearby_search_page_url(&token);
            let mut page = None;
            for _ in 0..PAGE_TOKEN_ATTEMPTS {
                std::thread::sleep(self.page_delay);
                let candidate = self.fetch_json(&url)?;
                match status_of(&candidate) {
                    "INVALID_REQUEST" => {
                        debug!(key = %key, keyword = %keyword, "page token not active yet");
                        continue;
                    }
                    _ => {
                        page = Some(candidate);
                        break;
                    }
                }
            }

            match page {
                Some(page) if status_of(&page) == "OK" => merge_page(data, page),
                Some(page) => {
                    warn!(
                        key = %key,
                        keyword = %keyword,
                        status = status_of(&page),
                        "giving up on follow-up page"
                    );
                    remove_page_token(data);
                }
                None => {
                    warn!(key = %key, keyword = %keyword, "page token never became valid, partial result kept");
                    remove_page_token(data);
                }
            }
        }
        Ok(())
    }

    /// Place-details reviews, one JSON file per place ID.
    pub fn retrieve_reviews(
        &self,
        dir: &Path,
        place_ids: &[String],
    ) -> Result<RetrievalSummary, PlacesError> {
        std::fs::create_dir_all(dir)?;

        let mut summary = RetrievalSummary::default();
        for place_id in place_ids {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let path = dir.join(format!("{place_id}.json"));
            if path.exists() {
                debug!(place_id = %place_id, "reviews already on disk");
                summary.skipped += 1;
                continue;
            }

            let url = self.api.place_details_url(place_id);
            let data = self.fetch_json(&url)?;
            std::fs::write(&path, data.to_string())?;
            summary.saved += 1;
        }
        Ok(summary)
    }

    fn fetch_json(&self, url: &str) -> Result<Value, PlacesError> {
        let body = run_with_retry(&self.policy, &self.cancel, || self.client.get(url))?;
        serde_json::from_slice(&body).map_err(|e| PlacesError::MalformedResponse {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

fn status_of(value: &Value) -> &str {
    value.get("status").and_then(Value::as_str).unwrap_or("")
}

fn remove_page_token(data: &mut Value) {
    if let Some(map) = data.as_object_mut() {
        map.remove("next_page_token");
    }
}

/// Extends `data["results"]` with the page's results and carries the
/// page's token forward (or clears it on the last page).
fn merge_page(data: &mut Value, mut page: Value) {
    match page.get("next_page_token").cloned() {
        Some(token) => {
            if let Some(map) = data.as_object_mut() {
                map.insert("next_page_token".to_string(), token);
            }
        }
        None => remove_page_token(data),
    }

    let page_results = page
        .get_mut("results")
        .and_then(Value::as_array_mut)
        .map(std::mem::take)
        .unwrap_or_default();
    if let Some(results) = data.get_mut("results").and_then(Value::as_array_mut) {
        results.extend(page_results);
    }
}

// ===== CSV flattening =====

/// Flattens a nearby-search directory into `<dir>.csv`.
///
/// A result row is emitted only when the file's keyword appears in the
/// result's `types`, mirroring the keyword-vs-type distinction of the
/// search endpoint. A rating with zero supporting ratings is blanked.
pub fn flatten_nearby_csv(dir: &Path, keywords: &[&str]) -> Result<PathBuf, PlacesError> {
    let out_path = dir.with_extension("csv");
    if out_path.exists() {
        info!(path = %out_path.display(), "flattened CSV already exists");
        return Ok(out_path);
    }

    let mut writer = csv::Writer::from_path(&out_path)?;
    writer.write_record([
        "id",
        "type",
        "name",
        "place_id",
        "price_level",
        "rating",
        "n_rating",
        "loc",
    ])?;

    let mut sub_dirs: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    sub_dirs.sort();

    for sub_dir in sub_dirs {
        let key = sub_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        for keyword in keywords {
            let path = sub_dir.join(format!("{keyword}.json"));
            if !path.exists() {
                continue;
            }
            let data: Value = read_json(&path)?;
            let results = data
                .get("results")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            for result in &results {
                let types = result
                    .get("types")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                if !types.iter().any(|t| t.as_str() == Some(*keyword)) {
                    continue;
                }

                let n_rating = result.get("user_ratings_total").and_then(Value::as_u64);
                let rating = match n_rating {
                    Some(0) => None,
                    _ => result.get("rating").and_then(Value::as_f64),
                };
                let loc = result
                    .get("geometry")
                    .and_then(|g| g.get("location"))
                    .map(|l| {
                        format!(
                            "{},{}",
                            l.get("lat").and_then(Value::as_f64).unwrap_or_default(),
                            l.get("lng").and_then(Value::as_f64).unwrap_or_default()
                        )
                    })
                    .unwrap_or_default();

                writer.write_record([
                    key.clone(),
                    keyword.to_string(),
                    json_str(result, "name"),
                    json_str(result, "place_id"),
                    result
                        .get("price_level")
                        .and_then(Value::as_u64)
                        .map(|v| v.to_string())
                        .unwrap_or_default(),
                    rating.map(|v| v.to_string()).unwrap_or_default(),
                    n_rating.map(|v| v.to_string()).unwrap_or_default(),
                    loc,
                ])?;
            }
        }
    }
    writer.flush()?;
    Ok(out_path)
}

/// Flattens a reviews directory into `<dir>.csv`, one row per review.
pub fn flatten_reviews_csv(dir: &Path) -> Result<PathBuf, PlacesError> {
    let out_path = dir.with_extension("csv");
    if out_path.exists() {
        info!(path = %out_path.display(), "flattened CSV already exists");
        return Ok(out_path);
    }

    let mut writer = csv::Writer::from_path(&out_path)?;
    writer.write_record([
        "place_id",
        "place_name",
        "review_text",
        "review_rating",
        "review_time",
        "review_language",
    ])?;

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "json"))
        .collect();
    files.sort();

    for path in files {
        let data: Value = read_json(&path)?;
        let Some(result) = data.get("result") else {
            continue;
        };
        let Some(reviews) = result.get("reviews").and_then(Value::as_array) else {
            continue;
        };

        for review in reviews {
            writer.write_record([
                json_str(result, "place_id"),
                json_str(result, "name"),
                json_str(review, "text"),
                review
                    .get("rating")
                    .and_then(Value::as_u64)
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
                review
                    .get("time")
                    .and_then(Value::as_u64)
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
                review
                    .get("language")
                    .and_then(Value::as_str)
                    .unwrap_or("na")
                    .to_string(),
            ])?;
        }
    }
    writer.flush()?;
    Ok(out_path)
}

fn read_json(path: &Path) -> Result<Value, PlacesError> {
    let bytes = std::fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| PlacesError::MalformedResponse {
        url: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn json_str(value: &Value, field: &str) -> String {
    value
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
