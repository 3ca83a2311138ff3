//! Itinerary summarization and booking-tier inference
//!
//! Reduces a full itinerary to an LLM-sized context block: a human-readable
//! summary for the system prompt and a compact JSON projection for tool
//! results.

use crate::itinerary::{CabinClass, Itinerary, Segment, SegmentKind};
use serde_json::json;

/// Inferred pricing tier for an existing hotel booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingTier {
    Luxury,
    Moderate,
    Standard,
    Premium,
    Economy,
}

impl BookingTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingTier::Luxury => "LUXURY",
            BookingTier::Moderate => "MODERATE",
            BookingTier::Standard => "STANDARD",
            BookingTier::Premium => "PREMIUM",
            BookingTier::Economy => "ECONOMY",
        }
    }
}

const LUXURY_HOTEL_BRANDS: &[&str] = &[
    "l'esplanade",
    "four seasons",
    "ritz",
    "st. regis",
    "st regis",
    "aman",
    "belmond",
    "peninsula",
    "mandarin oriental",
    "rosewood",
    "park hyatt",
    "bulgari",
    "eden roc",
    "cheval blanc",
    "raffles",
    "six senses",
    "one&only",
    "berkeley",
    "claridge's",
    "claridges",
    "dorchester",
    "savoy",
];

const MODERATE_HOTEL_BRANDS: &[&str] = &[
    "marriott",
    "hilton",
    "hyatt",
    "sheraton",
    "westin",
    "holiday inn",
];

/// Classify a hotel property name into a tier via curated brand lists.
pub fn infer_hotel_tier(property_name: &str) -> BookingTier {
    let lower = property_name.to_lowercase();
    if LUXURY_HOTEL_BRANDS.iter().any(|brand| lower.contains(brand)) {
        BookingTier::Luxury
    } else if MODERATE_HOTEL_BRANDS.iter().any(|brand| lower.contains(brand)) {
        BookingTier::Moderate
    } else {
        BookingTier::Standard
    }
}

/// Classify a flight's cabin class into a tier.
pub fn infer_flight_tier(cabin_class: CabinClass) -> BookingTier {
    match cabin_class {
        CabinClass::First | CabinClass::Suite => BookingTier::Luxury,
        CabinClass::Business | CabinClass::PremiumEconomy => BookingTier::Premium,
        CabinClass::Economy => BookingTier::Economy,
    }
}

/// Rough token estimate (≈4 characters per token), shared with the
/// engine's context-budget check.
pub fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() as f64 / 4.0).ceil() as usize
}

const LARGE_ITINERARY_THRESHOLD: usize = 20;
const MAX_SUMMARY_TOKENS: usize = 2_000;

/// Produce a human-readable, LLM-consumable summary of the itinerary.
pub fn summarize(itinerary: &Itinerary) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Trip: {}", itinerary.title));

    if let (Some(start), Some(end)) = (itinerary.start_date, itinerary.end_date) {
        let days = (end - start).num_days() + 1;
        lines.push(format!("Dates: {} – {} ({} days)", start, end, days));
    }

    let destinations = itinerary.effective_destinations();
    if !destinations.is_empty() {
        let names: Vec<&str> = destinations.iter().map(|d| d.name.as_str()).collect();
        lines.push(format!("Destinations: {}", names.join(", ")));
    }

    if !itinerary.travelers.is_empty() {
        let prefs = &itinerary.preferences;
        let style = prefs
            .travel_style
            .map(|s| format!("{:?}", s))
            .unwrap_or_else(|| "unset".to_string());
        let pace = prefs
            .pace
            .map(|p| format!("{:?}", p))
            .unwrap_or_else(|| "unset".to_string());
        lines.push(format!(
            "Travelers: {}, style: {}, pace: {}, interests: {:?}",
            itinerary.travelers.len(),
            style,
            pace,
            prefs.interests
        ));
    }

    let segments = itinerary.segments_chronological();
    if !segments.is_empty() {
        lines.push(format!(
            "Segments: {} (total)",
            segment_count_breakdown(&segments)
        ));

        let elide_detail = segments.len() > LARGE_ITINERARY_THRESHOLD;
        for segment in &segments {
            if elide_detail {
                lines.push(format!(
                    "  - {}: {}",
                    segment.kind.type_name(),
                    segment.start_datetime.format("%Y-%m-%d")
                ));
            } else {
                lines.push(format!(
                    "  - {}: {}, {}",
                    segment.kind.type_name(),
                    segment.start_datetime.format("%Y-%m-%d %H:%M"),
                    key_field(segment)
                ));
            }
        }
    }

    let bookings = existing_bookings(&segments);
    if !bookings.is_empty() {
        lines.push("EXISTING BOOKINGS (use to infer preferences):".to_string());
        lines.extend(bookings);
    }

    let mut text = lines.join("\n");
    if estimate_tokens(&text) > MAX_SUMMARY_TOKENS {
        let max_chars = MAX_SUMMARY_TOKENS * 4;
        text = text.chars().take(max_chars).collect();
        text.push_str("\n... [truncated]");
    }
    text
}

fn segment_count_breakdown(segments: &[&Segment]) -> String {
    use std::collections::BTreeMap;
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for segment in segments {
        *counts.entry(segment.kind.type_name()).or_insert(0) += 1;
    }
    let parts: Vec<String> = counts
        .into_iter()
        .map(|(ty, n)| format!("{} {}", n, ty.to_lowercase()))
        .collect();
    format!("{} ({})", parts.join(", "), segments.len())
}

fn key_field(segment: &Segment) -> String {
    match &segment.kind {
        SegmentKind::Flight(f) => format!("{} {} -> {}", f.flight_number, f.origin.code, f.destination.code),
        SegmentKind::Hotel(h) => h.property.clone(),
        SegmentKind::Activity(a) => a.name.clone(),
        SegmentKind::Transfer(t) => format!("{} -> {}", t.pickup_location, t.dropoff_location),
        SegmentKind::Meeting(m) => m.title.clone(),
        SegmentKind::Custom(c) => c.title.clone(),
    }
}

fn existing_bookings(segments: &[&Segment]) -> Vec<String> {
    let mut lines = Vec::new();
    for segment in segments {
        match &segment.kind {
            SegmentKind::Hotel(h) => {
                let tier = infer_hotel_tier(&h.property);
                lines.push(format!(
                    "  - 🏨 HOTEL: {} → {} style",
                    h.property,
                    tier.as_str()
                ));
            }
            SegmentKind::Flight(f) => {
                let tier = infer_flight_tier(f.cabin_class);
                lines.push(format!(
                    "  - ✈️ FLIGHT: {} → {} style",
                    f.flight_number,
                    tier.as_str()
                ));
            }
            _ => {}
        }
    }
    lines
}

/// Tier tag attached to a hotel or flight segment in `summarize_for_tool`.
fn segment_tier(segment: &Segment) -> Option<&'static str> {
    match &segment.kind {
        SegmentKind::Hotel(h) => Some(infer_hotel_tier(&h.property).as_str()),
        SegmentKind::Flight(f) => Some(infer_flight_tier(f.cabin_class).as_str()),
        _ => None,
    }
}

/// Compact machine-readable projection of the itinerary for tool results.
pub fn summarize_for_tool(itinerary: &Itinerary) -> serde_json::Value {
    let segments = itinerary.segments_chronological();
    let elide_detail = segments.len() > LARGE_ITINERARY_THRESHOLD;

    let segment_entries: Vec<serde_json::Value> = segments
        .iter()
        .map(|segment| {
            let mut entry = json!({
                "id": segment.id.to_string(),
                "type": segment.kind.type_name(),
                "startDatetime": segment.start_datetime.to_rfc3339(),
            });
            if !elide_detail {
                entry["name"] = json!(key_field(segment));
            }
            if let Some(tier) = segment_tier(segment) {
                entry["inferred_tier"] = json!(tier);
            }
            entry
        })
        .collect();

    json!({
        "id": itinerary.id.to_string(),
        "title": itinerary.title,
        "dates": {
            "start": itinerary.start_date.map(|d| d.to_string()),
            "end": itinerary.end_date.map(|d| d.to_string()),
        },
        "destinations": itinerary.effective_destinations().iter().map(|d| d.name.clone()).collect::<Vec<_>>(),
        "segmentCount": itinerary.segments.len(),
        "segments": segment_entries,
        "tripPreferences": itinerary.preferences,
        "travelers": itinerary.travelers,
    })
}
