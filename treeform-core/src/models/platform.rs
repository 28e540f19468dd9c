use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Audit, Record};
use crate::merge::mergeable;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Platform {
    pub id: Uuid,
    pub platform_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub platform_type: String,
    pub pennant_or_tail_or_plate_number: Option<String>,
    pub platform_category: String,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Platform {
    pub fn new(
        platform_name: impl Into<String>,
        platform_type: impl Into<String>,
        platform_category: impl Into<String>,
    ) -> Self {
        Self {
            platform_name: platform_name.into(),
            platform_type: platform_type.into(),
            platform_category: platform_category.into(),
            ..Default::default()
        }
    }

    pub fn with_position(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }
}

impl Record for Platform {
    const COLLECTION: &'static str = "platforms";
    const KIND: &'static str = "Platform";

    fn id(&self) -> Uuid {
        self.id
    }

    fn audit(&self) -> &Audit {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }
}

mergeable! {
    Platform {
        scalars: [
            platform_name,
            latitude,
            longitude,
            platform_type,
            pennant_or_tail_or_plate_number,
            platform_category,
        ],
        children: [],
    }
}
