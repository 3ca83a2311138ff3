//! Itinerary-level mutating tools: `update_itinerary`, `update_preferences`,
//! `add_traveler`
//!
//! Argument shapes are camelCase (the LLM-facing convention this crate uses
//! throughout tool schemas and `summarizeForTool`), translated here into the
//! domain model's own field naming before the mutation is applied.

use crate::date_util::parse_date_only;
use crate::error::{ItineraryError, ToolError, ToolResult as ToolCallResult};
use crate::itinerary::{
    Budget, BudgetPeriod, Destination, Pace, TravelStyle, TravelerGroup, TravelerType, Traveler,
    TripPreferences,
};
use crate::storage::ItineraryStore;
use crate::tool::{Tool, ToolOutcome};
use crate::tools::mutate_with_retry;
use crate::types::ItineraryId;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const DEFAULT_RETRIES: u32 = 1;

fn validation_outcome(message: impl Into<String>) -> ToolOutcome {
    let message = message.into();
    ToolOutcome {
        output: json!({"success": false, "error": message}),
        error: Some(message),
        metadata: Default::default(),
    }
}

/// Updates title/description/dates/destinations (spec.md §4.2).
pub struct UpdateItineraryTool {
    store: Arc<dyn ItineraryStore>,
    schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateItineraryArgs {
    title: Option<String>,
    description: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    destinations: Option<Vec<String>>,
}

impl UpdateItineraryTool {
    pub fn new(store: Arc<dyn ItineraryStore>) -> Self {
        Self {
            store,
            schema: json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "description": {"type": "string"},
                    "startDate": {"type": "string", "description": "YYYY-MM-DD"},
                    "endDate": {"type": "string", "description": "YYYY-MM-DD"},
                    "destinations": {"type": "array", "items": {"type": "string"}},
                },
            }),
        }
    }
}

#[async_trait::async_trait]
impl Tool for UpdateItineraryTool {
    fn name(&self) -> &str {
        "update_itinerary"
    }

    fn description(&self) -> &str {
        "Update the itinerary's title, description, start/end dates, or destination list. Only fields supplied are changed."
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
        let args: UpdateItineraryArgs = match serde_json::from_value(arguments) {
            Ok(a) => a,
            Err(e) => return Ok(validation_outcome(format!("invalid arguments: {e}"))),
        };

        let mut start_date = None;
        if let Some(raw) = &args.start_date {
            match parse_date_only(raw) {
                Ok(d) => start_date = Some(d),
                Err(e) => return Ok(validation_outcome(e)),
            }
        }
        let mut end_date = None;
        if let Some(raw) = &args.end_date {
            match parse_date_only(raw) {
                Ok(d) => end_date = Some(d),
                Err(e) => return Ok(validation_outcome(e)),
            }
        }

        let result = mutate_with_retry(&self.store, itinerary_id, DEFAULT_RETRIES, |itinerary| {
            if let Some(title) = &args.title {
                itinerary.title = title.clone();
            }
            if let Some(description) = &args.description {
                itinerary.description = Some(description.clone());
            }
            if start_date.is_some() {
                itinerary.start_date = start_date;
            }
            if end_date.is_some() {
                itinerary.end_date = end_date;
            }
            if let Some(destinations) = &args.destinations {
                itinerary.destinations = destinations.iter().map(|d| Destination::new(d.clone())).collect();
            }
            Ok(())
        })
        .await;

        match result {
            Ok(itinerary) => Ok(ToolOutcome::ok(json!({
                "success": true,
                "id": itinerary.id.to_string(),
                "title": itinerary.title,
            }))),
            Err(ToolError::Itinerary(ItineraryError::ConstraintViolation(msg))) => {
                Ok(validation_outcome(msg))
            }
            Err(e) => Err(e),
        }
    }
}

/// Merges fields into `tripPreferences` (spec.md §4.2.2): partial updates,
/// missing fields untouched.
pub struct UpdatePreferencesTool {
    store: Arc<dyn ItineraryStore>,
    schema: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePreferencesArgs {
    traveler_type: Option<TravelerGroup>,
    trip_purpose: Option<String>,
    budget_amount: Option<f64>,
    budget_currency: Option<String>,
    budget_period: Option<BudgetPeriod>,
    travel_style: Option<TravelStyle>,
    pace: Option<Pace>,
    #[serde(default)]
    interests: Vec<String>,
    budget_flexibility: Option<u8>,
    #[serde(default)]
    dietary_restrictions: Vec<String>,
    #[serde(default)]
    mobility_restrictions: Vec<String>,
    origin: Option<String>,
    accommodation_preference: Option<String>,
    #[serde(default)]
    activity_preferences: Vec<String>,
    #[serde(default)]
    avoidances: Vec<String>,
}

impl UpdatePreferencesTool {
    pub fn new(store: Arc<dyn ItineraryStore>) -> Self {
        Self {
            store,
            schema: json!({
                "type": "object",
                "properties": {
                    "travelerType": {"type": "string", "enum": ["solo", "couple", "family", "friends", "business", "group"]},
                    "tripPurpose": {"type": "string"},
                    "budgetAmount": {"type": "number"},
                    "budgetCurrency": {"type": "string"},
                    "budgetPeriod": {"type": "string", "enum": ["per_day", "per_person", "total"]},
                    "travelStyle": {"type": "string", "enum": ["luxury", "moderate", "budget", "backpacker"]},
                    "pace": {"type": "string", "enum": ["packed", "balanced", "leisurely"]},
                    "interests": {"type": "array", "items": {"type": "string"}},
                    "budgetFlexibility": {"type": "integer"},
                    "dietaryRestrictions": {"type": "array", "items": {"type": "string"}},
                    "mobilityRestrictions": {"type": "array", "items": {"type": "string"}},
                    "origin": {"type": "string"},
                    "accommodationPreference": {"type": "string"},
                    "activityPreferences": {"type": "array", "items": {"type": "string"}},
                    "avoidances": {"type": "array", "items": {"type": "string"}},
                },
            }),
        }
    }
}

#[async_trait::async_trait]
impl Tool for UpdatePreferencesTool {
    fn name(&self) -> &str {
        "update_preferences"
    }

    fn description(&self) -> &str {
        "Merge the supplied fields into the trip's preferences. Call this immediately after the user answers any discovery question, before asking the next one, so preferences survive even if the conversation is later compacted."
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
        let args: UpdatePreferencesArgs = match serde_json::from_value(arguments) {
            Ok(a) => a,
            Err(e) => return Ok(validation_outcome(format!("invalid arguments: {e}"))),
        };

        let budget = match (&args.budget_amount, &args.budget_currency, &args.budget_period) {
            (Some(amount), Some(currency), Some(period)) => Some(Budget {
                amount: *amount,
                currency: currency.clone(),
                period: *period,
            }),
            (None, None, None) => None,
            _ => return Ok(validation_outcome(
                "budgetAmount, budgetCurrency, and budgetPeriod must be supplied together",
            )),
        };

        let patch = TripPreferences {
            traveler_type: args.traveler_type,
            trip_purpose: args.trip_purpose,
            budget,
            travel_style: args.travel_style,
            pace: args.pace,
            interests: args.interests,
            budget_flexibility: args.budget_flexibility,
            dietary_restrictions: args.dietary_restrictions,
            mobility_restrictions: args.mobility_restrictions,
            origin: args.origin,
            accommodation_preference: args.accommodation_preference,
            activity_preferences: args.activity_preferences,
            avoidances: args.avoidances,
        };

        let result = mutate_with_retry(&self.store, itinerary_id, DEFAULT_RETRIES, |itinerary| {
            itinerary.preferences.merge(patch.clone());
            Ok(())
        })
        .await;

        match result {
            Ok(itinerary) => Ok(ToolOutcome::ok(json!({
                "success": true,
                "tripPreferences": itinerary.preferences,
            }))),
            Err(e) => Err(e),
        }
    }
}

/// Appends a traveler (spec.md §4.2).
pub struct AddTravelerTool {
    store: Arc<dyn ItineraryStore>,
    schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddTravelerArgs {
    first_name: String,
    last_name: Option<String>,
    middle_name: Option<String>,
    #[serde(rename = "type")]
    traveler_type: TravelerType,
    email: Option<String>,
    phone: Option<String>,
    date_of_birth: Option<String>,
    age: Option<u32>,
}

impl AddTravelerTool {
    pub fn new(store: Arc<dyn ItineraryStore>) -> Self {
        Self {
            store,
            schema: json!({
                "type": "object",
                "properties": {
                    "firstName": {"type": "string"},
                    "lastName": {"type": "string"},
                    "middleName": {"type": "string"},
                    "type": {"type": "string", "enum": ["ADULT", "CHILD", "INFANT", "SENIOR"]},
                    "email": {"type": "string"},
                    "phone": {"type": "string"},
                    "dateOfBirth": {"type": "string", "description": "YYYY-MM-DD"},
                    "age": {"type": "integer"},
                },
                "required": ["firstName", "type"],
            }),
        }
    }
}

#[async_trait::async_trait]
impl Tool for AddTravelerTool {
    fn name(&self) -> &str {
        "add_traveler"
    }

    fn description(&self) -> &str {
        "Add a traveler to the trip."
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
        let args: AddTravelerArgs = match serde_json::from_value(arguments) {
            Ok(a) => a,
            Err(e) => return Ok(validation_outcome(format!("invalid arguments: {e}"))),
        };

        let date_of_birth = match &args.date_of_birth {
            Some(raw) => match parse_date_only(raw) {
                Ok(d) => Some(d),
                Err(e) => return Ok(validation_outcome(e)),
            },
            None => None,
        };

        let mut traveler = Traveler::new(args.first_name.clone(), args.traveler_type);
        traveler.last_name = args.last_name.clone();
        traveler.middle_name = args.middle_name.clone();
        traveler.email = args.email.clone();
        traveler.phone = args.phone.clone();
        traveler.date_of_birth = date_of_birth;
        traveler.age = args.age;

        let result = mutate_with_retry(&self.store, itinerary_id, DEFAULT_RETRIES, {
            let traveler = traveler.clone();
            move |itinerary| {
                itinerary.travelers.push(traveler.clone());
                Ok(())
            }
        })
        .await;

        match result {
            Ok(itinerary) => Ok(ToolOutcome::ok(json!({
                "success": true,
                "travelerId": traveler.id.to_string(),
                "travelerCount": itinerary.travelers.len(),
            }))),
            Err(e) => Err(e),
        }
    }
}
