//! Treeform Core Library
//!
//! Record models for emitters and platforms, and the identity-preserving
//! tree merge used to apply updates to stored records.

pub mod merge;
pub mod models;

pub use merge::{
    apply, merge, merge_with_updates, ApplyError, FieldUpdate, IdPolicy, MergeContext, MergeError,
    Mergeable,
};
pub use models::{
    Audit, Beam, BeamPositionFiringOrder, BeamPositionSequence, DiscreteValue, DwellDurationValue,
    Emitter, Mode, MostProbableValue, Platform, Pri, PriFiringOrder, PriSequence, Record,
    SuperPeriodValue,
};
