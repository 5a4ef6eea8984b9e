//! The fixed travel deployment
//!
//! Instantiates the routing graph the way the product ships it: a
//! supervisor that greets the user and delegates, plus flight and hotel
//! advisors that each hand back to the supervisor for anything outside
//! their specialty. Also provides the validated query types the advisors'
//! search tools take; the search backends themselves are supplied by the
//! caller through the [`Tool`](crate::tool::Tool) seam.

use std::sync::Arc;

use async_openai::{config::OpenAIConfig, Client};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::{OpenAiEngine, ReasoningEngine};
use crate::error::{GraphError, Result};
use crate::graph::AgentGraph;
use crate::handoff::Handoff;
use crate::node::AgentNode;
use crate::tool::Tool;

pub const SUPERVISOR: &str = "supervisor";
pub const FLIGHTS_ADVISOR: &str = "flights_advisor";
pub const HOTEL_ADVISOR: &str = "hotel_advisor";

/// Builds the travel topology over caller-supplied reasoning engines.
///
/// Supervisor hands off to both advisors; each advisor hands off only to
/// the supervisor. The entry node is the supervisor.
pub fn travel_graph(
    supervisor: Arc<dyn ReasoningEngine>,
    flights_advisor: Arc<dyn ReasoningEngine>,
    hotel_advisor: Arc<dyn ReasoningEngine>,
) -> Result<AgentGraph> {
    AgentGraph::builder(SUPERVISOR)
        .node(AgentNode::new(
            SUPERVISOR,
            supervisor,
            vec![
                Handoff::with_description(FLIGHTS_ADVISOR, "Searches and recommends flights."),
                Handoff::with_description(HOTEL_ADVISOR, "Searches and recommends hotels."),
            ],
        ))
        .node(AgentNode::new(
            FLIGHTS_ADVISOR,
            flights_advisor,
            vec![Handoff::with_description(
                SUPERVISOR,
                "Hands non-flight requests back to the team supervisor.",
            )],
        ))
        .node(AgentNode::new(
            HOTEL_ADVISOR,
            hotel_advisor,
            vec![Handoff::with_description(
                SUPERVISOR,
                "Hands non-hotel requests back to the team supervisor.",
            )],
        ))
        .build()
}

/// Builds the travel topology over OpenAI-backed engines, wiring the given
/// search tools into the two advisors.
pub fn openai_travel_graph(
    client: Arc<Client<OpenAIConfig>>,
    model: &str,
    flight_search: Arc<dyn Tool>,
    hotel_search: Arc<dyn Tool>,
) -> Result<AgentGraph> {
    let supervisor = OpenAiEngine::new(client.clone(), model, supervisor_instructions());
    let flights = OpenAiEngine::new(client.clone(), model, flights_advisor_instructions())
        .with_tool(flight_search);
    let hotels =
        OpenAiEngine::new(client, model, hotel_advisor_instructions()).with_tool(hotel_search);

    travel_graph(Arc::new(supervisor), Arc::new(flights), Arc::new(hotels))
}

pub fn supervisor_instructions() -> String {
    format!(
        "You are a team supervisor for a travel agency managing a hotel advisor and a \
         flights advisor. Today is {today}. On a first request, greet the user and list \
         what you can help with: hotel booking, flight booking, and itinerary suggestions. \
         Use flights_advisor for flights and hotel_advisor for hotels. Transfer to only \
         one agent at a time; transferring to multiple agents at once is not supported. \
         Be friendly, give a human-readable response before any transfer, and do not \
         transfer without asking the user first.",
        today = Utc::now().format("%Y-%m-%d")
    )
}

pub fn flights_advisor_instructions() -> String {
    format!(
        "You are an expert flight advisor. Today is {today}. You search flights between \
         airports using IATA codes and recommend options by price, schedule, airline, \
         stops, and layovers. Always include prices with currency, airlines and flight \
         numbers, departure and arrival times, and durations. For round trips present \
         both the outbound and the return legs; a request for just a 'return flight' is \
         a one-way search. Ask for clarification when airport codes or dates are \
         missing. Do not answer non-flight questions; offer to transfer to the \
         supervisor immediately.",
        today = Utc::now().format("%Y-%m-%d")
    )
}

pub fn hotel_advisor_instructions() -> String {
    format!(
        "You are an expert hotel advisor. Today is {today}. You search hotels worldwide \
         and recommend options by price, rating, amenities, and location. Always include \
         the hotel name, star rating, price per night with currency, location, guest \
         ratings, and key amenities. Summarize the top 3-5 options with clear reasoning. \
         Ask for clarification when the location or dates are missing. Do not answer \
         non-hotel questions; transfer to the supervisor immediately.",
        today = Utc::now().format("%Y-%m-%d")
    )
}

/// Flight trip type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripType {
    RoundTrip,
    OneWay,
}

fn default_adults() -> u32 {
    1
}

fn default_rooms() -> u32 {
    1
}

/// Parameters for a flight search, mirroring the advisor tool's schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightsQuery {
    /// Departure airport code (IATA)
    pub departure_airport: String,
    /// Arrival airport code (IATA)
    pub arrival_airport: String,
    /// Outbound date, YYYY-MM-DD
    pub outbound_date: String,
    /// Return date, YYYY-MM-DD; omit for one-way flights
    #[serde(default)]
    pub return_date: Option<String>,
    #[serde(default = "default_adults")]
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    #[serde(default)]
    pub infants_in_seat: u32,
    #[serde(default)]
    pub infants_on_lap: u32,
    pub trip_type: TripType,
    /// Maximum number of stops, comma-separated values (0,1,2,3)
    #[serde(default)]
    pub stops: Option<String>,
    /// Currency for pricing
    pub currency: String,
}

impl FlightsQuery {
    /// Validates the query against `today`.
    pub fn validate(&self, today: NaiveDate) -> Result<()> {
        validate_airport_code(&self.departure_airport)?;
        validate_airport_code(&self.arrival_airport)?;

        let outbound = validate_date(&self.outbound_date, today)?;

        match (self.trip_type, self.return_date.as_deref()) {
            (TripType::OneWay, Some(d)) if !d.is_empty() => Err(GraphError::User {
                message: "return date should not be provided for one-way flights".to_string(),
            }),
            (TripType::RoundTrip, None) => Err(GraphError::User {
                message: "return date is required for round-trip flights".to_string(),
            }),
            (TripType::RoundTrip, Some(d)) => {
                let ret = validate_date(d, today)?;
                if ret < outbound {
                    return Err(GraphError::User {
                        message: format!(
                            "return date {} must be after outbound date {}",
                            d, self.outbound_date
                        ),
                    });
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// JSON schema for registering the flight search as a tool.
    pub fn parameters_schema() -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "departure_airport": { "type": "string", "description": "Departure airport code (IATA)" },
                "arrival_airport": { "type": "string", "description": "Arrival airport code (IATA)" },
                "outbound_date": { "type": "string", "description": "Outbound date, YYYY-MM-DD" },
                "return_date": { "type": "string", "description": "Return date, YYYY-MM-DD. Omit for one-way flights." },
                "adults": { "type": "integer", "minimum": 1, "description": "Number of adults. Default 1." },
                "children": { "type": "integer", "minimum": 0 },
                "infants_in_seat": { "type": "integer", "minimum": 0 },
                "infants_on_lap": { "type": "integer", "minimum": 0 },
                "trip_type": { "type": "string", "enum": ["round_trip", "one_way"] },
                "stops": { "type": "string", "description": "Maximum stops, comma-separated values (0,1,2,3)" },
                "currency": { "type": "string", "description": "Currency for pricing" }
            },
            "required": ["departure_airport", "arrival_airport", "outbound_date", "trip_type", "currency"]
        })
    }
}

/// Hotel result ordering, as the search backend expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HotelSort {
    PriceLowToHigh,
    PriceHighToLow,
    RatingHighToLow,
    Popularity,
}

impl Default for HotelSort {
    fn default() -> Self {
        Self::RatingHighToLow
    }
}

impl HotelSort {
    /// Numeric code used by the hotel search API.
    pub fn as_param(self) -> u8 {
        match self {
            Self::PriceLowToHigh => 1,
            Self::PriceHighToLow => 2,
            Self::RatingHighToLow => 8,
            Self::Popularity => 16,
        }
    }
}

/// Parameters for a hotel search, mirroring the advisor tool's schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotelsQuery {
    /// Location of the hotel (city, area, or specific hotel name)
    pub location: String,
    /// Check-in date, YYYY-MM-DD
    pub check_in_date: String,
    /// Check-out date, YYYY-MM-DD
    pub check_out_date: String,
    #[serde(default)]
    pub sort_by: HotelSort,
    #[serde(default = "default_adults")]
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    #[serde(default = "default_rooms")]
    pub rooms: u32,
    /// Comma-separated hotel classes to include, e.g. "2,3,4"
    #[serde(default)]
    pub hotel_class: Option<String>,
    /// Currency for pricing
    pub currency: String,
}

impl HotelsQuery {
    /// Validates the query against `today`.
    pub fn validate(&self, today: NaiveDate) -> Result<()> {
        let check_in = validate_date(&self.check_in_date, today)?;
        let check_out = validate_date(&self.check_out_date, today)?;
        if check_out <= check_in {
            return Err(GraphError::User {
                message: format!(
                    "check-out date {} must be after check-in date {}",
                    self.check_out_date, self.check_in_date
                ),
            });
        }

        if let Some(classes) = self.hotel_class.as_deref().filter(|c| !c.is_empty()) {
            for class in classes.split(',') {
                let parsed: u8 = class.trim().parse().map_err(|_| GraphError::User {
                    message: format!("hotel class '{}' is not a number", class.trim()),
                })?;
                if !(1..=5).contains(&parsed) {
                    return Err(GraphError::User {
                        message: format!("hotel class {} must be between 1 and 5", parsed),
                    });
                }
            }
        }

        Ok(())
    }

    /// JSON schema for registering the hotel search as a tool.
    pub fn parameters_schema() -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "location": { "type": "string", "description": "Location of the hotel (city, area, or specific hotel name)" },
                "check_in_date": { "type": "string", "description": "Check-in date, YYYY-MM-DD" },
                "check_out_date": { "type": "string", "description": "Check-out date, YYYY-MM-DD" },
                "sort_by": { "type": "string", "enum": ["price_low_to_high", "price_high_to_low", "rating_high_to_low", "popularity"], "description": "Result ordering. Default rating_high_to_low." },
                "adults": { "type": "integer", "minimum": 1, "description": "Number of adults. Default 1." },
                "children": { "type": "integer", "minimum": 0 },
                "rooms": { "type": "integer", "minimum": 1, "description": "Number of rooms. Default 1." },
                "hotel_class": { "type": "string", "description": "Comma-separated hotel classes to include, e.g. \"2,3,4\". Omit for all." },
                "currency": { "type": "string", "description": "Currency for pricing" }
            },
            "required": ["location", "check_in_date", "check_out_date", "currency"]
        })
    }
}

fn validate_airport_code(code: &str) -> Result<()> {
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(GraphError::User {
            message: format!("airport code '{}' must be a 3-letter IATA code", code),
        });
    }
    Ok(())
}

fn validate_date(value: &str, today: NaiveDate) -> Result<NaiveDate> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| GraphError::User {
        message: format!("date must be in YYYY-MM-DD format, got '{}'", value),
    })?;
    if date < today {
        return Err(GraphError::User {
            message: format!("date {} is in the past", value),
        });
    }
    Ok(date)
}
