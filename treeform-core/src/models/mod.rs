mod emitter;
mod platform;

pub use emitter::{
    Beam, BeamPositionFiringOrder, BeamPositionSequence, DiscreteValue, DwellDurationValue,
    Emitter, Mode, MostProbableValue, Pri, PriFiringOrder, PriSequence, SuperPeriodValue,
};
pub use platform::Platform;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::merge::Mergeable;

/// Bookkeeping stamped by the service layer. Never merged from a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Audit {
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    #[serde(default)]
    pub updated_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_by: Option<Uuid>,
}

/// A top-level stored record.
pub trait Record: Mergeable + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Store collection holding records of this type.
    const COLLECTION: &'static str;
    /// Human-readable type name used in messages.
    const KIND: &'static str;

    fn id(&self) -> Uuid;
    fn audit(&self) -> &Audit;
    fn audit_mut(&mut self) -> &mut Audit;
}

/// Deserializes a missing or `null` collection as an empty one.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
