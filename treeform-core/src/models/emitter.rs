use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{null_as_empty, Audit, Record};
use crate::merge::mergeable;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Emitter {
    pub id: Uuid,
    /// Alphanumeric emitter notation
    pub notation: String,
    pub emitter_name: String,
    pub spot_no: Option<String>,
    /// Mission code
    pub function: Option<String>,
    pub number_of_modes: Option<i32>,
    #[serde(flatten)]
    pub audit: Audit,
    #[serde(deserialize_with = "null_as_empty")]
    pub modes: Vec<Mode>,
}

impl Emitter {
    pub fn new(notation: impl Into<String>, emitter_name: impl Into<String>) -> Self {
        Self {
            notation: notation.into(),
            emitter_name: emitter_name.into(),
            ..Default::default()
        }
    }

    pub fn with_modes(mut self, modes: Vec<Mode>) -> Self {
        self.modes = modes;
        self
    }
}

impl Record for Emitter {
    const COLLECTION: &'static str = "emitters";
    const KIND: &'static str = "Emitter";

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

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mode {
    pub id: Uuid,
    pub emitter_id: Uuid,
    pub mode_name: String,
    /// Millivolts
    pub amplitude: Option<f64>,
    /// Kilometres
    pub theorical_range: Option<f64>,
    #[serde(deserialize_with = "null_as_empty")]
    pub beams: Vec<Beam>,
    #[serde(deserialize_with = "null_as_empty")]
    pub pris: Vec<Pri>,
}

impl Mode {
    pub fn new(mode_name: impl Into<String>) -> Self {
        Self {
            mode_name: mode_name.into(),
            ..Default::default()
        }
    }

    pub fn with_beams(mut self, beams: Vec<Beam>) -> Self {
        self.beams = beams;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Beam {
    pub id: Uuid,
    pub emitter_mode_id: Uuid,
    pub beam_name: String,
    /// dBi
    pub antenna_gain: Option<f64>,
    /// Degrees
    pub beam_position: Option<f64>,
    pub beam_width_azimute: Option<f64>,
    pub beam_width_elevation: Option<f64>,
    #[serde(deserialize_with = "null_as_empty")]
    pub dwell_duration_values: Vec<DwellDurationValue>,
    #[serde(deserialize_with = "null_as_empty")]
    pub sequences: Vec<BeamPositionSequence>,
}

impl Beam {
    pub fn new(beam_name: impl Into<String>) -> Self {
        Self {
            beam_name: beam_name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DwellDurationValue {
    pub id: Uuid,
    pub emitter_mode_beam_id: Uuid,
    pub beam_w_position_duration: Option<f64>,
    pub beam_w_position_index: i32,
    #[serde(deserialize_with = "null_as_empty")]
    pub firing_orders: Vec<BeamPositionFiringOrder>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamPositionSequence {
    pub id: Uuid,
    pub emitter_mode_beam_id: Uuid,
    pub sequence_name: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub firing_orders: Vec<BeamPositionFiringOrder>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamPositionFiringOrder {
    pub id: Uuid,
    pub emitter_mode_beam_position_sequence_id: Uuid,
    pub emitter_mode_beam_position_dwell_duration_value_id: Uuid,
    pub beam_position_order_index: i32,
    pub beam_position_index: i32,
    pub beam_position_duration: i32,
    pub elevation: Option<f64>,
    pub azimuth: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pri {
    pub id: Uuid,
    pub emitter_mode_id: Uuid,
    pub pri_name: String,
    pub pri_limit: Option<f64>,
    pub prf_limit: Option<f64>,
    /// Microseconds
    pub nominal_pri: Option<f64>,
    pub pri_mean: Option<f64>,
    pub standart_deviation: Option<f64>,
    /// Hertz
    pub prf_mean: Option<f64>,
    pub pulse_to_pulse_mean: Option<f64>,
    pub continuity: Option<String>,
    pub pattern: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub super_periods: Vec<SuperPeriodValue>,
    #[serde(deserialize_with = "null_as_empty")]
    pub most_probable_values: Vec<MostProbableValue>,
    #[serde(deserialize_with = "null_as_empty")]
    pub discrete_values: Vec<DiscreteValue>,
    #[serde(deserialize_with = "null_as_empty")]
    pub sequences: Vec<PriSequence>,
}

impl Pri {
    pub fn new(pri_name: impl Into<String>) -> Self {
        Self {
            pri_name: pri_name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuperPeriodValue {
    pub id: Uuid,
    pub emitter_mode_pri_id: Uuid,
    pub super_period_value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MostProbableValue {
    pub id: Uuid,
    pub emitter_mode_pri_id: Uuid,
    pub most_probable_value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscreteValue {
    pub id: Uuid,
    pub emitter_mode_pri_id: Uuid,
    pub discrete_value: f64,
    pub dwell_duration: Option<f64>,
    pub transition_range: Option<f64>,
    #[serde(deserialize_with = "null_as_empty")]
    pub firing_orders: Vec<PriFiringOrder>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriSequence {
    pub id: Uuid,
    pub emitter_mode_pri_id: Uuid,
    pub sequence_name: Option<String>,
    pub number_of_pulses_in_sequence: Option<i32>,
    pub total_time_for_sequence: Option<f64>,
    #[serde(deserialize_with = "null_as_empty")]
    pub firing_orders: Vec<PriFiringOrder>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriFiringOrder {
    pub id: Uuid,
    pub emitter_mode_pri_sequence_id: Uuid,
    pub emitter_mode_pri_discrete_value_id: Uuid,
    pub order_index: i32,
}

mergeable! {
    Emitter {
        scalars: [notation, emitter_name, spot_no, function, number_of_modes],
        children: [modes => emitter_id],
    }
}

mergeable! {
    Mode {
        scalars: [emitter_id, mode_name, amplitude, theorical_range],
        children: [beams => emitter_mode_id, pris => emitter_mode_id],
    }
}

mergeable! {
    Beam {
        scalars: [
            emitter_mode_id,
            beam_name,
            antenna_gain,
            beam_position,
            beam_width_azimute,
            beam_width_elevation,
        ],
        children: [
            dwell_duration_values => emitter_mode_beam_id,
            sequences => emitter_mode_beam_id,
        ],
    }
}

mergeable! {
    DwellDurationValue {
        scalars: [emitter_mode_beam_id, beam_w_position_duration, beam_w_position_index],
        children: [firing_orders => emitter_mode_beam_position_dwell_duration_value_id],
    }
}

mergeable! {
    BeamPositionSequence {
        scalars: [emitter_mode_beam_id, sequence_name],
        children: [firing_orders => emitter_mode_beam_position_sequence_id],
    }
}

mergeable! {
    BeamPositionFiringOrder {
        scalars: [
            emitter_mode_beam_position_sequence_id,
            emitter_mode_beam_position_dwell_duration_value_id,
            beam_position_order_index,
            beam_position_index,
            beam_position_duration,
            elevation,
            azimuth,
        ],
        children: [],
    }
}

mergeable! {
    Pri {
        scalars: [
            emitter_mode_id,
            pri_name,
            pri_limit,
            prf_limit,
            nominal_pri,
            pri_mean,
            standart_deviation,
            prf_mean,
            pulse_to_pulse_mean,
            continuity,
            pattern,
        ],
        children: [
            super_periods => emitter_mode_pri_id,
            most_probable_values => emitter_mode_pri_id,
            discrete_values => emitter_mode_pri_id,
            sequences => emitter_mode_pri_id,
        ],
    }
}

mergeable! {
    SuperPeriodValue {
        scalars: [emitter_mode_pri_id, super_period_value],
        children: [],
    }
}

mergeable! {
    MostProbableValue {
        scalars: [emitter_mode_pri_id, most_probable_value],
        children: [],
    }
}

mergeable! {
    DiscreteValue {
        scalars: [emitter_mode_pri_id, discrete_value, dwell_duration, transition_range],
        children: [firing_orders => emitter_mode_pri_discrete_value_id],
    }
}

mergeable! {
    PriSequence {
        scalars: [
            emitter_mode_pri_id,
            sequence_name,
            number_of_pulses_in_sequence,
            total_time_for_sequence,
        ],
        children: [firing_orders => emitter_mode_pri_sequence_id],
    }
}

mergeable! {
    PriFiringOrder {
        scalars: [
            emitter_mode_pri_sequence_id,
            emitter_mode_pri_discrete_value_id,
            order_index,
        ],
        children: [],
    }
}
