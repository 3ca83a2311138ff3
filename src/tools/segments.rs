//! Segment-mutating tools: the five `add_*` tools, `update_segment`,
//! `delete_segment`, `move_segment`, `reorder_segments`
//!
//! `move_segment`'s cascade (spec.md §4.2.1) is implemented as a plain shift
//! of the target plus every later segment whose start precedes the new
//! target end; the all-or-nothing guarantee falls out of
//! [`crate::tools::mutate_with_retry`] operating on a clone and only
//! persisting after `validate_invariants` passes, so a bound violation
//! discards the whole candidate rather than partially-shifted segments.

use crate::date_util::{parse_date_only, parse_flexible_datetime};
use crate::error::{ItineraryError, ToolError, ToolResult as ToolCallResult};
use crate::itinerary::{
    ActivityDetails, CabinClass, FlightDetails, HotelDetails, HotelLocation, MeetingDetails,
    NamedCode, Provenance, Segment, SegmentKind, SegmentStatus, TransferDetails, TransferType,
};
use crate::storage::ItineraryStore;
use crate::tool::{Tool, ToolOutcome};
use crate::tools::mutate_with_retry;
use crate::types::{ItineraryId, SegmentId};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

const DEFAULT_RETRIES: u32 = 1;

fn validation_outcome(message: impl Into<String>) -> ToolOutcome {
    let message = message.into();
    ToolOutcome {
        output: json!({"success": false, "error": message}),
        error: Some(message),
        metadata: Default::default(),
    }
}

fn parse_segment_id(raw: &str) -> Result<SegmentId, String> {
    Uuid::from_str(raw)
        .map(SegmentId::from)
        .map_err(|_| format!("invalid segmentId: {raw}"))
}

fn agent_provenance() -> Provenance {
    Provenance::agent("tool_executor", 1.0)
}

macro_rules! parse_or_return {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => return Ok(validation_outcome(e)),
        }
    };
}

// ---------------------------------------------------------------- add_flight

pub struct AddFlightTool {
    store: Arc<dyn ItineraryStore>,
    schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddFlightArgs {
    airline_name: String,
    airline_code: String,
    flight_number: String,
    origin_name: String,
    origin_code: String,
    destination_name: String,
    destination_code: String,
    cabin_class: CabinClass,
    start_datetime: String,
    end_datetime: String,
}

impl AddFlightTool {
    pub fn new(store: Arc<dyn ItineraryStore>) -> Self {
        Self {
            store,
            schema: json!({
                "type": "object",
                "properties": {
                    "airlineName": {"type": "string"},
                    "airlineCode": {"type": "string"},
                    "flightNumber": {"type": "string"},
                    "originName": {"type": "string"},
                    "originCode": {"type": "string"},
                    "destinationName": {"type": "string"},
                    "destinationCode": {"type": "string"},
                    "cabinClass": {"type": "string", "enum": ["economy", "premium_economy", "business", "first", "suite"]},
                    "startDatetime": {"type": "string"},
                    "endDatetime": {"type": "string"},
                },
                "required": [
                    "airlineName", "airlineCode", "flightNumber", "originName", "originCode",
                    "destinationName", "destinationCode", "cabinClass", "startDatetime", "endDatetime",
                ],
            }),
        }
    }
}

#[async_trait::async_trait]
impl Tool for AddFlightTool {
    fn name(&self) -> &str {
        "add_flight"
    }

    fn description(&self) -> &str {
        "Add a flight segment to the itinerary."
    }

    fn parameters_schema(&self) -> &serde_json::Value {
        &self.schema
    }

    fn is_mutating(&self) -> bool {
        true
    }

    async fn call(
        &self,
        itinerary_id: ItineraryId,
        arguments: serde_json::Value,
    ) -> ToolCallResult<ToolOutcome> {
        let args: AddFlightArgs = match serde_json::from_value(arguments) {
            Ok(a) => a,
            Err(e) => return Ok(validation_outcome(format!("invalid arguments: {e}"))),
        };
        let start = parse_or_return!(parse_flexible_datetime(&args.start_datetime));
        let end = parse_or_return!(parse_flexible_datetime(&args.end_datetime));

        let segment = Segment::new(
            SegmentKind::Flight(FlightDetails {
                airline: NamedCode { name: args.airline_name, code: args.airline_code },
                flight_number: args.flight_number,
                origin: NamedCode { name: args.origin_name, code: args.origin_code },
                destination: NamedCode { name: args.destination_name, code: args.destination_code },
                cabin_class: args.cabin_class,
            }),
            start,
            end,
            agent_provenance(),
        );

        if let Err(e) = segment.validate() {
            return Ok(validation_outcome(e.to_string()));
        }

        let segment_id = segment.id;
        let result = mutate_with_retry(&self.store, itinerary_id, DEFAULT_RETRIES, {
            let segment = segment.clone();
            move |itinerary| {
                itinerary.add_segment(segment.clone());
                Ok(())
            }
        })
        .await;

        match result {
            Ok(itinerary) => Ok(ToolOutcome::ok(json!({
                "success": true,
                "segmentId": segment_id.to_string(),
                "segmentCount": itinerary.segments.len(),
            }))),
            Err(ToolError::Itinerary(ItineraryError::ConstraintViolation(msg))) => Ok(validation_outcome(msg)),
            Err(e) => Err(e),
        }
    }
}

// ----------------------------------------------------------------- add_hotel

pub struct AddHotelTool {
    store: Arc<dyn ItineraryStore>,
    schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddHotelArgs {
    property: String,
    city: Option<String>,
    country: Option<String>,
    check_in: String,
    check_out: String,
    #[serde(default = "default_room_count")]
    room_count: u32,
    room_type: String,
}

fn default_room_count() -> u32 {
    1
}

impl AddHotelTool {
    pub fn new(store: Arc<dyn ItineraryStore>) -> Self {
        Self {
            store,
            schema: json!({
                "type": "object",
                "properties": {
                    "property": {"type": "string"},
                    "city": {"type": "string"},
                    "country": {"type": "string"},
                    "checkIn": {"type": "string", "description": "YYYY-MM-DD"},
                    "checkOut": {"type": "string", "description": "YYYY-MM-DD"},
                    "roomCount": {"type": "integer"},
                    "roomType": {"type": "string"},
                },
                "required": ["property", "checkIn", "checkOut", "roomType"],
            }),
        }
    }
}

#[async_trait::async_trait]
impl Tool for AddHotelTool {
    fn name(&self) -> &str {
        "add_hotel"
    }

    fn description(&self) -> &str {
        "Add a hotel segment to the itinerary, spanning check-in to check-out."
    }

    fn parameters_schema(&self) -> &serde_json::Value {
        &self.schema
    }

    fn is_mutating(&self) -> bool {
        true
    }

    async fn call(
        &self,
        itinerary_id: ItineraryId,
        arguments: serde_json::Value,
    ) -> ToolCallResult<ToolOutcome> {
        let args: AddHotelArgs = match serde_json::from_value(arguments) {
            Ok(a) => a,
            Err(e) => return Ok(validation_outcome(format!("invalid arguments: {e}"))),
        };
        let check_in = parse_or_return!(parse_date_only(&args.check_in));
        let check_out = parse_or_return!(parse_date_only(&args.check_out));
        let start = parse_or_return!(parse_flexible_datetime(&args.check_in));
        let end = parse_or_return!(parse_flexible_datetime(&args.check_out));

        let segment = Segment::new(
            SegmentKind::Hotel(HotelDetails {
                property: args.property,
                location: HotelLocation { city: args.city, country: args.country },
                check_in,
                check_out,
                room_count: args.room_count,
                room_type: args.room_type,
            }),
            start,
            end,
            agent_provenance(),
        );

        if let Err(e) = segment.validate() {
            return Ok(validation_outcome(e.to_string()));
        }

        let segment_id = segment.id;
        let result = mutate_with_retry(&self.store, itinerary_id, DEFAULT_RETRIES, {
            let segment = segment.clone();
            move |itinerary| {
                itinerary.add_segment(segment.clone());
                Ok(())
            }
        })
        .await;

        match result {
            Ok(itinerary) => Ok(ToolOutcome::ok(json!({
                "success": true,
                "segmentId": segment_id.to_string(),
                "segmentCount": itinerary.segments.len(),
            }))),
            Err(ToolError::Itinerary(ItineraryError::ConstraintViolation(msg))) => Ok(validation_outcome(msg)),
            Err(e) => Err(e),
        }
    }
}

// -------------------------------------------------------------- add_activity

pub struct AddActivityTool {
    store: Arc<dyn ItineraryStore>,
    schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddActivityArgs {
    name: String,
    location: String,
    category: Option<String>,
    start_datetime: String,
    end_datetime: String,
}

impl AddActivityTool {
    pub fn new(store: Arc<dyn ItineraryStore>) -> Self {
        Self {
            store,
            schema: json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "location": {"type": "string"},
                    "category": {"type": "string"},
                    "startDatetime": {"type": "string"},
                    "endDatetime": {"type": "string"},
                },
                "required": ["name", "location", "startDatetime", "endDatetime"],
            }),
        }
    }
}

#[async_trait::async_trait]
impl Tool for AddActivityTool {
    fn name(&self) -> &str {
        "add_activity"
    }

    fn description(&self) -> &str {
        "Add an activity segment (tour, excursion, reservation, etc.) to the itinerary."
    }

    fn parameters_schema(&self) -> &serde_json::Value {
        &self.schema
    }

    fn is_mutating(&self) -> bool {
        true
    }

    async fn call(
        &self,
        itinerary_id: ItineraryId,
        arguments: serde_json::Value,
    ) -> ToolCallResult<ToolOutcome> {
        let args: AddActivityArgs = match serde_json::from_value(arguments) {
            Ok(a) => a,
            Err(e) => return Ok(validation_outcome(format!("invalid arguments: {e}"))),
        };
        let start = parse_or_return!(parse_flexible_datetime(&args.start_datetime));
        let end = parse_or_return!(parse_flexible_datetime(&args.end_datetime));

        let segment = Segment::new(
            SegmentKind::Activity(ActivityDetails { name: args.name, location: args.location, category: args.category }),
            start,
            end,
            agent_provenance(),
        );

        if let Err(e) = segment.validate() {
            return Ok(validation_outcome(e.to_string()));
        }

        let segment_id = segment.id;
        let result = mutate_with_retry(&self.store, itinerary_id, DEFAULT_RETRIES, {
            let segment = segment.clone();
            move |itinerary| {
                itinerary.add_segment(segment.clone());
                Ok(())
            }
        })
        .await;

        match result {
            Ok(itinerary) => Ok(ToolOutcome::ok(json!({
                "success": true,
                "segmentId": segment_id.to_string(),
                "segmentCount": itinerary.segments.len(),
            }))),
            Err(ToolError::Itinerary(ItineraryError::ConstraintViolation(msg))) => Ok(validation_outcome(msg)),
            Err(e) => Err(e),
        }
    }
}

// -------------------------------------------------------------- add_transfer

pub struct AddTransferTool {
    store: Arc<dyn ItineraryStore>,
    schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddTransferArgs {
    transfer_type: TransferType,
    pickup_location: String,
    dropoff_location: String,
    start_datetime: String,
    end_datetime: String,
}

impl AddTransferTool {
    pub fn new(store: Arc<dyn ItineraryStore>) -> Self {
        Self {
            store,
            schema: json!({
                "type": "object",
                "properties": {
                    "transferType": {"type": "string", "enum": ["PRIVATE", "SHUTTLE", "TAXI", "RENTAL"]},
                    "pickupLocation": {"type": "string"},
                    "dropoffLocation": {"type": "string"},
                    "startDatetime": {"type": "string"},
                    "endDatetime": {"type": "string"},
                },
                "required": ["transferType", "pickupLocation", "dropoffLocation", "startDatetime", "endDatetime"],
            }),
        }
    }
}

#[async_trait::async_trait]
impl Tool for AddTransferTool {
    fn name(&self) -> &str {
        "add_transfer"
    }

    fn description(&self) -> &str {
        "Add a ground transfer segment (private car, shuttle, taxi, rental) to the itinerary."
    }

    fn parameters_schema(&self) -> &serde_json::Value {
        &self.schema
    }

    fn is_mutating(&self) -> bool {
        true
    }

    async fn call(
        &self,
        itinerary_id: ItineraryId,
        arguments: serde_json::Value,
    ) -> ToolCallResult<ToolOutcome> {
        let args: AddTransferArgs = match serde_json::from_value(arguments) {
            Ok(a) => a,
            Err(e) => return Ok(validation_outcome(format!("invalid arguments: {e}"))),
        };
        let start = parse_or_return!(parse_flexible_datetime(&args.start_datetime));
        let end = parse_or_return!(parse_flexible_datetime(&args.end_datetime));

        let segment = Segment::new(
            SegmentKind::Transfer(TransferDetails {
                transfer_type: args.transfer_type,
                pickup_location: args.pickup_location,
                dropoff_location: args.dropoff_location,
            }),
            start,
            end,
            agent_provenance(),
        );

        if let Err(e) = segment.validate() {
            return Ok(validation_outcome(e.to_string()));
        }

        let segment_id = segment.id;
        let result = mutate_with_retry(&self.store, itinerary_id, DEFAULT_RETRIES, {
            let segment = segment.clone();
            move |itinerary| {
                itinerary.add_segment(segment.clone());
                Ok(())
            }
        })
        .await;

        match result {
            Ok(itinerary) => Ok(ToolOutcome::ok(json!({
                "success": true,
                "segmentId": segment_id.to_string(),
                "segmentCount": itinerary.segments.len(),
            }))),
            Err(ToolError::Itinerary(ItineraryError::ConstraintViolation(msg))) => Ok(validation_outcome(msg)),
            Err(e) => Err(e),
        }
    }
}

// --------------------------------------------------------------- add_meeting

pub struct AddMeetingTool {
    store: Arc<dyn ItineraryStore>,
    schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddMeetingArgs {
    title: String,
    location: String,
    #[serde(default)]
    attendees: Vec<String>,
    start_datetime: String,
    end_datetime: String,
}

impl AddMeetingTool {
    pub fn new(store: Arc<dyn ItineraryStore>) -> Self {
        Self {
            store,
            schema: json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "location": {"type": "string"},
                    "attendees": {"type": "array", "items": {"type": "string"}},
                    "startDatetime": {"type": "string"},
                    "endDatetime": {"type": "string"},
                },
                "required": ["title", "location", "startDatetime", "endDatetime"],
            }),
        }
    }
}

#[async_trait::async_trait]
impl Tool for AddMeetingTool {
    fn name(&self) -> &str {
        "add_meeting"
    }

    fn description(&self) -> &str {
        "Add a meeting or appointment segment to the itinerary."
    }

    fn parameters_schema(&self) -> &serde_json::Value {
        &self.schema
    }

    fn is_mutating(&self) -> bool {
        true
    }

    async fn call(
        &self,
        itinerary_id: ItineraryId,
        arguments: serde_json::Value,
    ) -> ToolCallResult<ToolOutcome> {
        let args: AddMeetingArgs = match serde_json::from_value(arguments) {
            Ok(a) => a,
            Err(e) => return Ok(validation_outcome(format!("invalid arguments: {e}"))),
        };
        let start = parse_or_return!(parse_flexible_datetime(&args.start_datetime));
        let end = parse_or_return!(parse_flexible_datetime(&args.end_datetime));

        let segment = Segment::new(
            SegmentKind::Meeting(MeetingDetails { title: args.title, location: args.location, attendees: args.attendees }),
            start,
            end,
            agent_provenance(),
        );

        if let Err(e) = segment.validate() {
            return Ok(validation_outcome(e.to_string()));
        }

        let segment_id = segment.id;
        let result = mutate_with_retry(&self.store, itinerary_id, DEFAULT_RETRIES, {
            let segment = segment.clone();
            move |itinerary| {
                itinerary.add_segment(segment.clone());
                Ok(())
            }
        })
        .await;

        match result {
            Ok(itinerary) => Ok(ToolOutcome::ok(json!({
                "success": true,
                "segmentId": segment_id.to_string(),
                "segmentCount": itinerary.segments.len(),
            }))),
            Err(ToolError::Itinerary(ItineraryError::ConstraintViolation(msg))) => Ok(validation_outcome(msg)),
            Err(e) => Err(e),
        }
    }
}

// ------------------------------------------------------------ update_segment

pub struct UpdateSegmentTool {
    store: Arc<dyn ItineraryStore>,
    schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateSegmentArgs {
    segment_id: String,
    status: Option<SegmentStatus>,
    start_datetime: Option<String>,
    end_datetime: Option<String>,
    confirmation_number: Option<String>,
    price: Option<f64>,
    details: Option<serde_json::Value>,
}

impl UpdateSegmentTool {
    pub fn new(store: Arc<dyn ItineraryStore>) -> Self {
        Self {
            store,
            schema: json!({
                "type": "object",
                "properties": {
                    "segmentId": {"type": "string"},
                    "status": {"type": "string", "enum": ["CONFIRMED", "TENTATIVE", "CANCELLED"]},
                    "startDatetime": {"type": "string"},
                    "endDatetime": {"type": "string"},
                    "confirmationNumber": {"type": "string"},
                    "price": {"type": "number"},
                    "details": {"type": "object", "description": "Partial patch merged into the segment's type-specific fields"},
                },
                "required": ["segmentId"],
            }),
        }
    }
}

#[async_trait::async_trait]
impl Tool for UpdateSegmentTool {
    fn name(&self) -> &str {
        "update_segment"
    }

    fn description(&self) -> &str {
        "Patch an existing segment's fields by id: status, times, confirmation number, price, or type-specific details."
    }

    fn parameters_schema(&self) -> &serde_json::Value {
        &self.schema
    }

    fn is_mutating(&self) -> bool {
        true
    }

    async fn call(
        &self,
        itinerary_id: ItineraryId,
        arguments: serde_json::Value,
    ) -> ToolCallResult<ToolOutcome> {
        let args: UpdateSegmentArgs = match serde_json::from_value(arguments) {
            Ok(a) => a,
            Err(e) => return Ok(validation_outcome(format!("invalid arguments: {e}"))),
        };
        let segment_id = parse_or_return!(parse_segment_id(&args.segment_id));

        let mut start_dt: Option<DateTime<Utc>> = None;
        if let Some(raw) = &args.start_datetime {
            start_dt = Some(parse_or_return!(parse_flexible_datetime(raw)));
        }
        let mut end_dt: Option<DateTime<Utc>> = None;
        if let Some(raw) = &args.end_datetime {
            end_dt = Some(parse_or_return!(parse_flexible_datetime(raw)));
        }

        let result = mutate_with_retry(&self.store, itinerary_id, DEFAULT_RETRIES, |itinerary| {
            let segment = itinerary
                .find_segment_mut(segment_id)
                .ok_or(ItineraryError::SegmentNotFound(segment_id))?;

            if let Some(status) = args.status {
                segment.status = status;
            }
            if let Some(start) = start_dt {
                segment.start_datetime = start;
            }
            if let Some(end) = end_dt {
                segment.end_datetime = end;
            }
            if let Some(confirmation) = &args.confirmation_number {
                segment.confirmation_number = Some(confirmation.clone());
            }
            if let Some(price) = args.price {
                segment.price = Some(price);
            }
            if let Some(patch) = &args.details {
                let mut kind_value = serde_json::to_value(&segment.kind)?;
                if let (Some(obj), Some(patch_obj)) = (kind_value.as_object_mut(), patch.as_object()) {
                    for (key, value) in patch_obj {
                        obj.insert(key.clone(), value.clone());
                    }
                }
                let new_kind: SegmentKind = serde_json::from_value(kind_value).map_err(|e| {
                    ItineraryError::ConstraintViolation(format!("invalid segment details patch: {e}"))
                })?;
                segment.kind = new_kind;
            }

            segment.validate()
        })
        .await;

        match result {
            Ok(_) => Ok(ToolOutcome::ok(json!({"success": true, "segmentId": segment_id.to_string()}))),
            Err(ToolError::Itinerary(ItineraryError::SegmentNotFound(id))) => {
                Ok(validation_outcome(format!("segment not found: {id}")))
            }
            Err(ToolError::Itinerary(ItineraryError::ConstraintViolation(msg))) => Ok(validation_outcome(msg)),
            Err(e) => Err(e),
        }
    }
}

// ------------------------------------------------------------ delete_segment

pub struct DeleteSegmentTool {
    store: Arc<dyn ItineraryStore>,
    schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteSegmentArgs {
    segment_id: String,
}

impl DeleteSegmentTool {
    pub fn new(store: Arc<dyn ItineraryStore>) -> Self {
        Self {
            store,
            schema: json!({
                "type": "object",
                "properties": { "segmentId": {"type": "string"} },
                "required": ["segmentId"],
            }),
        }
    }
}

#[async_trait::async_trait]
impl Tool for DeleteSegmentTool {
    fn name(&self) -> &str {
        "delete_segment"
    }

    fn description(&self) -> &str {
        "Remove a segment from the itinerary by id."
    }

    fn parameters_schema(&self) -> &serde_json::Value {
        &self.schema
    }

    fn is_mutating(&self) -> bool {
        true
    }

    async fn call(
        &self,
        itinerary_id: ItineraryId,
        arguments: serde_json::Value,
    ) -> ToolCallResult<ToolOutcome> {
        let args: DeleteSegmentArgs = match serde_json::from_value(arguments) {
            Ok(a) => a,
            Err(e) => return Ok(validation_outcome(format!("invalid arguments: {e}"))),
        };
        let segment_id = parse_or_return!(parse_segment_id(&args.segment_id));

        let result = mutate_with_retry(&self.store, itinerary_id, DEFAULT_RETRIES, |itinerary| {
            itinerary.remove_segment(segment_id)
        })
        .await;

        match result {
            Ok(itinerary) => Ok(ToolOutcome::ok(json!({
                "success": true,
                "segmentCount": itinerary.segments.len(),
            }))),
            Err(ToolError::Itinerary(ItineraryError::SegmentNotFound(id))) => {
                Ok(validation_outcome(format!("segment not found: {id}")))
            }
            Err(e) => Err(e),
        }
    }
}

// -------------------------------------------------------------- move_segment

/// Shift `segment_id`'s start to `new_start` preserving its duration, then
/// cascade the same delta to every later segment (by original chronological
/// order) whose start precedes the new target end. Segments before the
/// target are untouched. Bounds validation happens after this call, in
/// `mutate_with_retry`'s `validate_invariants` pass, so a trip-date overrun
/// discards the whole candidate rather than leaving a partial shift.
pub(crate) fn apply_move(
    itinerary: &mut crate::itinerary::Itinerary,
    segment_id: SegmentId,
    new_start: DateTime<Utc>,
) -> Result<(), ItineraryError> {
    let chronological_ids: Vec<SegmentId> = itinerary
        .segments_chronological()
        .iter()
        .map(|s| s.id)
        .collect();

    let target_index = chronological_ids
        .iter()
        .position(|id| *id == segment_id)
        .ok_or(ItineraryError::SegmentNotFound(segment_id))?;

    let target = itinerary
        .find_segment(segment_id)
        .ok_or(ItineraryError::SegmentNotFound(segment_id))?;
    let duration = target.end_datetime - target.start_datetime;
    let delta = new_start - target.start_datetime;
    let new_end = new_start + duration;

    let mut cascaded_ids = Vec::new();
    for id in chronological_ids.iter().skip(target_index + 1) {
        let later = itinerary
            .find_segment(*id)
            .expect("id sourced from this itinerary's own chronological listing");
        if later.start_datetime < new_end {
            cascaded_ids.push(*id);
        } else {
            break;
        }
    }

    itinerary
        .find_segment_mut(segment_id)
        .expect("already located above")
        .shift(delta);

    for id in cascaded_ids {
        itinerary
            .find_segment_mut(id)
            .expect("id sourced from this itinerary's own chronological listing")
            .shift(delta);
    }

    Ok(())
}

pub struct MoveSegmentTool {
    store: Arc<dyn ItineraryStore>,
    schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveSegmentArgs {
    segment_id: String,
    new_start_datetime: Option<String>,
    delta_minutes: Option<i64>,
}

impl MoveSegmentTool {
    pub fn new(store: Arc<dyn ItineraryStore>) -> Self {
        Self {
            store,
            schema: json!({
                "type": "object",
                "properties": {
                    "segmentId": {"type": "string"},
                    "newStartDatetime": {"type": "string", "description": "Exact new start time"},
                    "deltaMinutes": {"type": "integer", "description": "Shift relative to the current start time, in minutes"},
                },
                "required": ["segmentId"],
            }),
        }
    }
}

#[async_trait::async_trait]
impl Tool for MoveSegmentTool {
    fn name(&self) -> &str {
        "move_segment"
    }

    fn description(&self) -> &str {
        "Move a segment to a new start time (absolute or relative), cascading the same shift to later segments that would otherwise overlap it."
    }

    fn parameters_schema(&self) -> &serde_json::Value {
        &self.schema
    }

    fn is_mutating(&self) -> bool {
        true
    }

    async fn call(
        &self,
        itinerary_id: ItineraryId,
        arguments: serde_json::Value,
    ) -> ToolCallResult<ToolOutcome> {
        let args: MoveSegmentArgs = match serde_json::from_value(arguments) {
            Ok(a) => a,
            Err(e) => return Ok(validation_outcome(format!("invalid arguments: {e}"))),
        };
        let segment_id = parse_or_return!(parse_segment_id(&args.segment_id));

        if args.new_start_datetime.is_none() && args.delta_minutes.is_none() {
            return Ok(validation_outcome("one of newStartDatetime or deltaMinutes is required"));
        }

        let explicit_new_start = match &args.new_start_datetime {
            Some(raw) => Some(parse_or_return!(parse_flexible_datetime(raw))),
            None => None,
        };

        let result = mutate_with_retry(&self.store, itinerary_id, DEFAULT_RETRIES, |itinerary| {
            let new_start = match explicit_new_start {
                Some(start) => start,
                None => {
                    let current = itinerary
                        .find_segment(segment_id)
                        .ok_or(ItineraryError::SegmentNotFound(segment_id))?;
                    current.start_datetime + chrono::Duration::minutes(args.delta_minutes.unwrap_or(0))
                }
            };
            apply_move(itinerary, segment_id, new_start)
        })
        .await;

        match result {
            Ok(itinerary) => {
                let moved = itinerary.find_segment(segment_id);
                Ok(ToolOutcome::ok(json!({
                    "success": true,
                    "segmentId": segment_id.to_string(),
                    "newStartDatetime": moved.map(|s| s.start_datetime.to_rfc3339()),
                })))
            }
            Err(ToolError::Itinerary(ItineraryError::SegmentNotFound(id))) => {
                Ok(validation_outcome(format!("segment not found: {id}")))
            }
            Err(ToolError::Itinerary(ItineraryError::ConstraintViolation(msg))) => Ok(validation_outcome(msg)),
            Err(e) => Err(e),
        }
    }
}

// --------------------------------------------------------- reorder_segments

pub struct ReorderSegmentsTool {
    store: Arc<dyn ItineraryStore>,
    schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReorderSegmentsArgs {
    segment_ids: Vec<String>,
}

impl ReorderSegmentsTool {
    pub fn new(store: Arc<dyn ItineraryStore>) -> Self {
        Self {
            store,
            schema: json!({
                "type": "object",
                "properties": {
                    "segmentIds": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Every segment id currently in the itinerary, in the desired display order",
                    },
                },
                "required": ["segmentIds"],
            }),
        }
    }
}

#[async_trait::async_trait]
impl Tool for ReorderSegmentsTool {
    fn name(&self) -> &str {
        "reorder_segments"
    }

    fn description(&self) -> &str {
        "Override the itinerary's segment display order. Must include every current segment id exactly once."
    }

    fn parameters_schema(&self) -> &serde_json::Value {
        &self.schema
    }

    fn is_mutating(&self) -> bool {
        true
    }

    async fn call(
        &self,
        itinerary_id: ItineraryId,
        arguments: serde_json::Value,
    ) -> ToolCallResult<ToolOutcome> {
        let args: ReorderSegmentsArgs = match serde_json::from_value(arguments) {
            Ok(a) => a,
            Err(e) => return Ok(validation_outcome(format!("invalid arguments: {e}"))),
        };

        let mut ids = Vec::with_capacity(args.segment_ids.len());
        for raw in &args.segment_ids {
            ids.push(parse_or_return!(parse_segment_id(raw)));
        }

        let result = mutate_with_retry(&self.store, itinerary_id, DEFAULT_RETRIES, |itinerary| {
            if ids.len() != itinerary.segments.len() {
                return Err(ItineraryError::ConstraintViolation(
                    "segmentIds must include every current segment id exactly once".to_string(),
                ));
            }
            let mut reordered = Vec::with_capacity(ids.len());
            for id in &ids {
                let idx = itinerary
                    .segments
                    .iter()
                    .position(|s| s.id == *id)
                    .ok_or(ItineraryError::SegmentNotFound(*id))?;
                reordered.push(itinerary.segments.remove(idx));
            }
            itinerary.segments = reordered;
            itinerary.updated_at = Utc::now();
            Ok(())
        })
        .await;

        match result {
            Ok(_) => Ok(ToolOutcome::ok(json!({"success": true}))),
            Err(ToolError::Itinerary(ItineraryError::ConstraintViolation(msg))) => Ok(validation_outcome(msg)),
            Err(ToolError::Itinerary(ItineraryError::SegmentNotFound(id))) => {
                Ok(validation_outcome(format!("segment not found: {id}")))
            }
            Err(e) => Err(e),
        }
    }
}
