//! Reservations declared on nodes through annotations, and the cache the
//! scheduler reads them from.
//!
//! Two annotation forms are understood:
//!
//! * a JSON document under a single key (by default
//!   `reserve.kubernetes.io/resources`) listing every owner's reservation
//! * the older one-annotation-per-entry form `reserve.<resource-type>/<owner-uid>`
//!   whose value is a quantity

mod cache;
mod declaration;
mod legacy;

pub use cache::{ReservationCache, ReservationEntry};
pub use declaration::{
    RESERVATION_ANNOTATION, ReservationDeclaration, ReservedResource, parse_declarations,
};
pub use legacy::{parse_legacy_annotations, parse_legacy_key};

use std::collections::BTreeMap;

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("malformed reservation document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Quantity(#[from] crate::spec::pod_helpers::Error),
}

/// Where reservations are read from on a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationSource {
    pub annotation_key: String,
    pub legacy_annotations: bool,
}

impl Default for ReservationSource {
    fn default() -> Self {
        Self {
            annotation_key: RESERVATION_ANNOTATION.to_string(),
            legacy_annotations: true,
        }
    }
}

impl ReservationSource {
    /// The subset of annotations that can carry reservations. Two nodes with
    /// equal subsets have equal reservations.
    pub fn relevant<'a>(
        &self,
        annotations: &'a BTreeMap<String, String>,
    ) -> BTreeMap<&'a str, &'a str> {
        annotations
            .iter()
            .filter(|(k, _)| {
                *k == &self.annotation_key
                    || (self.legacy_annotations && legacy::is_legacy_candidate(k))
            })
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    /// Decodes every reservation on a node. Returns None when the node carries
    /// no reservation annotation at all.
    pub fn decode(
        &self,
        annotations: &BTreeMap<String, String>,
    ) -> Result<Option<Vec<ReservationDeclaration>>, ParseError> {
        let document = annotations.get(&self.annotation_key);

        let mut legacy = if self.legacy_annotations {
            parse_legacy_annotations(annotations, &self.annotation_key)?
        } else {
            vec![]
        };

        let mut declarations = match document {
            None if legacy.is_empty() => return Ok(None),
            None => vec![],
            Some(document) => parse_declarations(document)?,
        };

        declarations.append(&mut legacy);
        Ok(Some(declarations))
    }
}
