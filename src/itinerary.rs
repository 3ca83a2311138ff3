//! Itinerary data model
//!
//! Typed entities (segments, travelers, preferences) with the invariants
//! tool mutations must preserve. Segments are a discriminated union keyed
//! on `type`, dispatched by the executor rather than by subtype
//! polymorphism.

use crate::error::{ItineraryError, ItineraryResult};
use crate::types::{ItineraryId, SegmentId, TravelerId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A named destination, optionally qualified by city/country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Destination {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            city: None,
            country: None,
        }
    }
}

/// Where a segment's data originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentSource {
    Import,
    User,
    Agent,
}

/// Detail attached to agent- or import-sourced segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub timestamp: DateTime<Utc>,
}

/// Full provenance record for a segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub source: SegmentSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_details: Option<SourceDetails>,
}

impl Provenance {
    pub fn agent(model: impl Into<String>, confidence: f32) -> Self {
        Self {
            source: SegmentSource::Agent,
            source_details: Some(SourceDetails {
                model: Some(model.into()),
                confidence: Some(confidence),
                timestamp: Utc::now(),
            }),
        }
    }

    pub fn user() -> Self {
        Self {
            source: SegmentSource::User,
            source_details: None,
        }
    }
}

/// Segment lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SegmentStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

/// Cabin class for a flight segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CabinClass {
    Economy,
    PremiumEconomy,
    Business,
    First,
    Suite,
}

/// An airline or airport, named plus its IATA-style code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedCode {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightDetails {
    pub airline: NamedCode,
    pub flight_number: String,
    pub origin: NamedCode,
    pub destination: NamedCode,
    pub cabin_class: CabinClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelDetails {
    pub property: String,
    pub location: HotelLocation,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub room_count: u32,
    pub room_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDetails {
    pub name: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransferType {
    Private,
    Shuttle,
    Taxi,
    Rental,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferDetails {
    pub transfer_type: TransferType,
    pub pickup_location: String,
    pub dropoff_location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingDetails {
    pub title: String,
    pub location: String,
    #[serde(default)]
    pub attendees: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomDetails {
    pub title: String,
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

/// Per-variant payload of a segment, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum SegmentKind {
    Flight(FlightDetails),
    Hotel(HotelDetails),
    Activity(ActivityDetails),
    Transfer(TransferDetails),
    Meeting(MeetingDetails),
    Custom(CustomDetails),
}

impl SegmentKind {
    /// The tag string as rendered in the summarizer and tool results.
    pub fn type_name(&self) -> &'static str {
        match self {
            SegmentKind::Flight(_) => "FLIGHT",
            SegmentKind::Hotel(_) => "HOTEL",
            SegmentKind::Activity(_) => "ACTIVITY",
            SegmentKind::Transfer(_) => "TRANSFER",
            SegmentKind::Meeting(_) => "MEETING",
            SegmentKind::Custom(_) => "CUSTOM",
        }
    }
}

/// One atomic item in an itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    #[serde(flatten)]
    pub kind: SegmentKind,
    pub status: SegmentStatus,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traveler_ids: Option<Vec<TravelerId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub provenance: Provenance,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub inferred: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inferred_reason: Option<String>,
}

impl Segment {
    pub fn new(
        kind: SegmentKind,
        start_datetime: DateTime<Utc>,
        end_datetime: DateTime<Utc>,
        provenance: Provenance,
    ) -> Self {
        Self {
            id: SegmentId::new(),
            kind,
            status: SegmentStatus::Tentative,
            start_datetime,
            end_datetime,
            traveler_ids: None,
            confirmation_number: None,
            price: None,
            provenance,
            metadata: HashMap::new(),
            inferred: false,
            inferred_reason: None,
        }
    }

    /// Validates `start <= end`; called before insertion and after every mutation.
    pub fn validate(&self) -> ItineraryResult<()> {
        if self.start_datetime > self.end_datetime {
            return Err(ItineraryError::ConstraintViolation(format!(
                "segment {} has startDatetime after endDatetime",
                self.id
            )));
        }
        Ok(())
    }

    /// Shift both endpoints by `delta`, preserving duration.
    pub fn shift(&mut self, delta: chrono::Duration) {
        self.start_datetime += delta;
        self.end_datetime += delta;
    }
}

/// Traveler category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TravelerType {
    Adult,
    Child,
    Infant,
    Senior,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Traveler {
    pub id: TravelerId,
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(rename = "type")]
    pub traveler_type: TravelerType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Traveler {
    pub fn new(first_name: impl Into<String>, traveler_type: TravelerType) -> Self {
        Self {
            id: TravelerId::new(),
            first_name: first_name.into(),
            last_name: None,
            middle_name: None,
            traveler_type,
            email: None,
            phone: None,
            date_of_birth: None,
            age: None,
            metadata: HashMap::new(),
        }
    }

    pub fn is_primary(&self) -> bool {
        self.metadata
            .get("isPrimary")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelerGroup {
    Solo,
    Couple,
    Family,
    Friends,
    Business,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPeriod {
    PerDay,
    PerPerson,
    Total,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub amount: f64,
    pub currency: String,
    pub period: BudgetPeriod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelStyle {
    Luxury,
    Moderate,
    Budget,
    Backpacker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pace {
    Packed,
    Balanced,
    Leisurely,
}

/// Trip-level preferences, nested inside the itinerary and mutated
/// exclusively via `update_preferences` (merge semantics).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripPreferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traveler_type: Option<TravelerGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<Budget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub travel_style: Option<TravelStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pace: Option<Pace>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_flexibility: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dietary_restrictions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mobility_restrictions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accommodation_preference: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activity_preferences: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub avoidances: Vec<String>,
}

impl TripPreferences {
    /// Merge `patch` into `self`: only fields present (`Some`/non-empty) in
    /// `patch` overwrite the corresponding field here. Applying the same
    /// patch twice is idempotent since each field is a plain overwrite.
    pub fn merge(&mut self, patch: TripPreferences) {
        if patch.traveler_type.is_some() {
            self.traveler_type = patch.traveler_type;
        }
        if patch.trip_purpose.is_some() {
            self.trip_purpose = patch.trip_purpose;
        }
        if patch.budget.is_some() {
            self.budget = patch.budget;
        }
        if patch.travel_style.is_some() {
            self.travel_style = patch.travel_style;
        }
        if patch.pace.is_some() {
            self.pace = patch.pace;
        }
        if !patch.interests.is_empty() {
            self.interests = patch.interests;
        }
        if patch.budget_flexibility.is_some() {
            self.budget_flexibility = patch.budget_flexibility;
        }
        if !patch.dietary_restrictions.is_empty() {
            self.dietary_restrictions = patch.dietary_restrictions;
        }
        if !patch.mobility_restrictions.is_empty() {
            self.mobility_restrictions = patch.mobility_restrictions;
        }
        if patch.origin.is_some() {
            self.origin = patch.origin;
        }
        if patch.accommodation_preference.is_some() {
            self.accommodation_preference = patch.accommodation_preference;
        }
        if !patch.activity_preferences.is_empty() {
            self.activity_preferences = patch.activity_preferences;
        }
        if !patch.avoidances.is_empty() {
            self.avoidances = patch.avoidances;
        }
    }
}

/// The aggregate root: a travel itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub id: ItineraryId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub destinations: Vec<Destination>,
    #[serde(default)]
    pub travelers: Vec<Traveler>,
    #[serde(default)]
    pub preferences: TripPreferences,
    #[serde(default)]
    pub segments: Vec<Segment>,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Itinerary {
    pub fn new(title: impl Into<String>, owner_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ItineraryId::new(),
            title: title.into(),
            description: None,
            start_date: None,
            end_date: None,
            destinations: Vec::new(),
            travelers: Vec::new(),
            preferences: TripPreferences::default(),
            segments: Vec::new(),
            owner_id: owner_id.into(),
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    /// Segments sorted by start time, leaving insertion order untouched in storage.
    pub fn segments_chronological(&self) -> Vec<&Segment> {
        let mut sorted: Vec<&Segment> = self.segments.iter().collect();
        sorted.sort_by_key(|s| s.start_datetime);
        sorted
    }

    pub fn find_segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == id)
    }

    pub fn find_segment_mut(&mut self, id: SegmentId) -> Option<&mut Segment> {
        self.segments.iter_mut().find(|s| s.id == id)
    }

    /// Destinations list, falling back to those derivable from flight
    /// destinations and hotel locations when the explicit list is empty.
    pub fn effective_destinations(&self) -> Vec<Destination> {
        if !self.destinations.is_empty() {
            return self.destinations.clone();
        }

        let mut seen = HashSet::new();
        let mut derived = Vec::new();
        for segment in &self.segments {
            match &segment.kind {
                SegmentKind::Flight(f) => {
                    if seen.insert(f.destination.code.clone()) {
                        derived.push(Destination::new(f.destination.name.clone()));
                    }
                }
                SegmentKind::Hotel(h) => {
                    let key = h
                        .location
                        .city
                        .clone()
                        .unwrap_or_else(|| h.property.clone());
                    if seen.insert(key) {
                        derived.push(Destination {
                            name: h
                                .location
                                .city
                                .clone()
                                .unwrap_or_else(|| h.property.clone()),
                            city: h.location.city.clone(),
                            country: h.location.country.clone(),
                        });
                    }
                }
                _ => {}
            }
        }
        derived
    }

    /// Checks the global invariants every mutating tool must preserve
    /// before a result is persisted: unique segment ids, `start <= end`
    /// per segment, and segment datetimes within itinerary bounds when
    /// both the itinerary and the segment bound are set.
    pub fn validate_invariants(&self) -> ItineraryResult<()> {
        let mut seen_ids = HashSet::new();
        for segment in &self.segments {
            if !seen_ids.insert(segment.id) {
                return Err(ItineraryError::ConstraintViolation(format!(
                    "duplicate segment id {}",
                    segment.id
                )));
            }
            segment.validate()?;

            if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
                let trip_start = start.and_hms_opt(0, 0, 0).unwrap().and_utc();
                let trip_end = end.and_hms_opt(23, 59, 59).unwrap().and_utc();
                if segment.start_datetime < trip_start || segment.end_datetime > trip_end {
                    return Err(ItineraryError::ConstraintViolation(format!(
                        "segment {} falls outside itinerary dates [{}, {}]",
                        segment.id, start, end
                    )));
                }
            }
        }
        Ok(())
    }

    /// Append a segment, bumping `updated_at` but not `version` (the
    /// caller/store owns the optimistic-concurrency version bump on save).
    pub fn add_segment(&mut self, segment: Segment) {
        self.updated_at = Utc::now();
        self.segments.push(segment);
    }

    pub fn remove_segment(&mut self, id: SegmentId) -> ItineraryResult<()> {
        let before = self.segments.len();
        self.segments.retain(|s| s.id != id);
        if self.segments.len() == before {
            return Err(ItineraryError::SegmentNotFound(id));
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}
