use crate::reservation::ParseError;
use crate::spec::pod_helpers::parse_quantity;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde::{Deserialize, Deserializer, Serialize};

pub const RESERVATION_ANNOTATION: &str = "reserve.kubernetes.io/resources";

/// One owner's standing claim on a node's capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationDeclaration {
    pub owner_type: String,
    pub owner_uid: String,
    pub pod_name: String,
    pub reserved_resources: Vec<ReservedResource>,
}

/// A reserved amount, already converted to the resource's accounting unit
/// (millis for cpu, bytes for memory and ephemeral-storage).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservedResource {
    pub resource_type: String,
    pub quantity: i64,
}

#[derive(Deserialize)]
struct RawDeclaration {
    #[serde(default)]
    owner_type: String,
    #[serde(default)]
    owner_uid: String,
    #[serde(default)]
    pod_name: String,
    #[serde(default)]
    reserved_resources: Vec<RawReservedResource>,
}

#[derive(Deserialize)]
struct RawReservedResource {
    resource_type: String,
    #[serde(alias = "reserved_quanty", deserialize_with = "string_or_number")]
    reserved_quantity: Quantity,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Quantity, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => Quantity(s),
        StringOrNumber::Number(n) => Quantity(n.to_string()),
    })
}

/// Decodes the JSON reservation document stored on a node.
pub fn parse_declarations(document: &str) -> Result<Vec<ReservationDeclaration>, ParseError> {
    let raw: Vec<RawDeclaration> = serde_json::from_str(document)?;

    raw.into_iter()
        .map(|item| -> Result<ReservationDeclaration, ParseError> {
            let reserved_resources = item
                .reserved_resources
                .into_iter()
                .map(|r| -> Result<ReservedResource, ParseError> {
                    let quantity = parse_quantity(&r.resource_type, &r.reserved_quantity)?;
                    Ok(ReservedResource {
                        resource_type: r.resource_type,
                        quantity,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            Ok(ReservationDeclaration {
                owner_type: item.owner_type,
                owner_uid: item.owner_uid,
                pod_name: item.pod_name,
                reserved_resources,
            })
        })
        .collect()
}
